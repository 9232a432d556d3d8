use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use primitive_types::H160;
use super::{TokenError, TokenResult};

/// Accounts barred from sending or receiving transfers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocklist {
    blocked: BTreeSet<H160>,
}

impl Blocklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blocked(&self, account: H160) -> bool {
        self.blocked.contains(&account)
    }

    /// Idempotent; returns whether the account was newly added
    pub fn block(&mut self, account: H160) -> bool {
        self.blocked.insert(account)
    }

    /// Idempotent; returns whether the account was present
    pub fn unblock(&mut self, account: H160) -> bool {
        self.blocked.remove(&account)
    }

    /// Veto a transfer; the sender is checked before the receiver
    pub fn check_transfer(&self, from: H160, to: H160) -> TokenResult<()> {
        if self.is_blocked(from) {
            return Err(TokenError::SenderBlocked { account: from });
        }
        if self.is_blocked(to) {
            return Err(TokenError::ReceiverBlocked { account: to });
        }
        Ok(())
    }

    pub fn blocked_accounts(&self) -> Vec<H160> {
        self.blocked.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_is_idempotent() {
        let account = H160::from_low_u64_be(7);
        let mut once = Blocklist::new();
        once.block(account);

        let mut twice = Blocklist::new();
        assert!(twice.block(account));
        assert!(!twice.block(account));

        assert_eq!(once, twice);
        assert!(twice.is_blocked(account));
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn test_unblock_is_idempotent() {
        let account = H160::from_low_u64_be(7);
        let mut blocklist = Blocklist::new();
        blocklist.block(account);

        assert!(blocklist.unblock(account));
        assert!(!blocklist.unblock(account));
        assert!(!blocklist.is_blocked(account));
        assert!(blocklist.is_empty());
    }

    #[test]
    fn test_sender_checked_before_receiver() {
        let from = H160::from_low_u64_be(1);
        let to = H160::from_low_u64_be(2);
        let mut blocklist = Blocklist::new();
        blocklist.block(from);
        blocklist.block(to);

        assert_eq!(
            blocklist.check_transfer(from, to),
            Err(TokenError::SenderBlocked { account: from })
        );

        blocklist.unblock(from);
        assert_eq!(
            blocklist.check_transfer(from, to),
            Err(TokenError::ReceiverBlocked { account: to })
        );

        blocklist.unblock(to);
        assert!(blocklist.check_transfer(from, to).is_ok());
    }
}
