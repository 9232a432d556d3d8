//! HYP token - capped, pausable, role-gated fungible token with an account blocklist
//!
//! The ledger is split into small leaf components (roles, supply, blocklist,
//! pause switch, event log) that are composed by [`CappedToken`], which acts as
//! the single transfer gate for every state change.

pub mod roles;
pub mod supply;
pub mod blocklist;
pub mod pause;
pub mod events;
pub mod ledger;
pub mod rpc;

pub use roles::{Role, RoleRegistry};
pub use supply::SupplyLedger;
pub use blocklist::Blocklist;
pub use pause::PauseSwitch;
pub use events::{EventLog, EventRecord};
pub use ledger::{CappedToken, TokenTransaction, TokenInfo};

use primitive_types::{H160, U256};
use serde::{Deserialize, Serialize};

/// Fixed display denomination; amounts are always handled in base units
pub const DECIMALS: u8 = 18;

/// Token error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Account {account:?} is missing role {role}")]
    Unauthorized { account: H160, role: Role },

    #[error("Token operation rejected while paused")]
    Paused,

    #[error("Token transfer rejected: sender {account:?} is blocked")]
    SenderBlocked { account: H160 },

    #[error("Token transfer rejected: receiver {account:?} is blocked")]
    ReceiverBlocked { account: H160 },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: U256, available: U256 },

    #[error("Cap exceeded: requested supply {requested}, cap {cap}")]
    CapExceeded { cap: U256, requested: U256 },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Token is already paused")]
    AlreadyPaused,

    #[error("Token is not paused")]
    AlreadyUnpaused,

    #[error("Zero address is not a valid account")]
    ZeroAddress,

    #[error("Cap must be greater than zero")]
    InvalidCap,

    #[error("Ledger invariant violated: {reason}")]
    InvariantViolation { reason: String },
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

/// Token events, one per successful state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEvent {
    /// New tokens minted
    Minted {
        to: H160,
        amount: U256,
    },

    /// Tokens burned from the holder's own balance
    Burned {
        from: H160,
        amount: U256,
    },

    /// Tokens moved between accounts
    Transfer {
        from: H160,
        to: H160,
        amount: U256,
    },

    /// Spending allowance set
    Approval {
        owner: H160,
        spender: H160,
        amount: U256,
    },

    Paused {
        account: H160,
    },

    Unpaused {
        account: H160,
    },

    Blocked {
        account: H160,
    },

    UnBlocked {
        account: H160,
    },

    RoleGranted {
        role: Role,
        account: H160,
        sender: H160,
    },

    RoleRevoked {
        role: Role,
        account: H160,
        sender: H160,
    },
}

impl TokenEvent {
    /// Event name as observers know it
    pub fn kind(&self) -> &'static str {
        match self {
            TokenEvent::Minted { .. } => "Minted",
            TokenEvent::Burned { .. } => "Burned",
            TokenEvent::Transfer { .. } => "Transfer",
            TokenEvent::Approval { .. } => "Approval",
            TokenEvent::Paused { .. } => "Paused",
            TokenEvent::Unpaused { .. } => "Unpaused",
            TokenEvent::Blocked { .. } => "Blocked",
            TokenEvent::UnBlocked { .. } => "UnBlocked",
            TokenEvent::RoleGranted { .. } => "RoleGranted",
            TokenEvent::RoleRevoked { .. } => "RoleRevoked",
        }
    }

    /// Accounts involved in the event
    pub fn subjects(&self) -> Vec<H160> {
        match self {
            TokenEvent::Minted { to, .. } => vec![*to],
            TokenEvent::Burned { from, .. } => vec![*from],
            TokenEvent::Transfer { from, to, .. } => vec![*from, *to],
            TokenEvent::Approval { owner, spender, .. } => vec![*owner, *spender],
            TokenEvent::Paused { account }
            | TokenEvent::Unpaused { account }
            | TokenEvent::Blocked { account }
            | TokenEvent::UnBlocked { account } => vec![*account],
            TokenEvent::RoleGranted { account, sender, .. }
            | TokenEvent::RoleRevoked { account, sender, .. } => vec![*account, *sender],
        }
    }

    /// Amount carried by balance-moving events
    pub fn amount(&self) -> Option<U256> {
        match self {
            TokenEvent::Minted { amount, .. }
            | TokenEvent::Burned { amount, .. }
            | TokenEvent::Transfer { amount, .. }
            | TokenEvent::Approval { amount, .. } => Some(*amount),
            _ => None,
        }
    }
}
