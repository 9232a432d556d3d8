use serde::{Deserialize, Serialize};
use super::{TokenError, TokenResult};

/// Global kill-switch for transfers, mints and burns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseSwitch {
    paused: bool,
}

impl PauseSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Strict: pausing twice is an error
    pub fn pause(&mut self) -> TokenResult<()> {
        if self.paused {
            return Err(TokenError::AlreadyPaused);
        }
        self.paused = true;
        Ok(())
    }

    pub fn unpause(&mut self) -> TokenResult<()> {
        if !self.paused {
            return Err(TokenError::AlreadyUnpaused);
        }
        self.paused = false;
        Ok(())
    }

    pub fn ensure_not_paused(&self) -> TokenResult<()> {
        if self.paused {
            return Err(TokenError::Paused);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_is_strict() {
        let mut switch = PauseSwitch::new();
        assert!(switch.ensure_not_paused().is_ok());

        switch.pause().unwrap();
        assert!(switch.is_paused());
        assert_eq!(switch.pause(), Err(TokenError::AlreadyPaused));
        assert_eq!(switch.ensure_not_paused(), Err(TokenError::Paused));

        switch.unpause().unwrap();
        assert!(!switch.is_paused());
        assert_eq!(switch.unpause(), Err(TokenError::AlreadyUnpaused));
    }
}
