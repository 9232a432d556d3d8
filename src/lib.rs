pub mod token;
pub mod storage;
pub mod service;
pub mod config;

pub use token::{
    CappedToken, EventRecord, Role, TokenError, TokenEvent, TokenInfo, TokenResult, TokenTransaction,
};
pub use service::LedgerService;
pub use storage::SnapshotStore;
pub use config::{DeployConfig, InitialMint};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default token name
pub const TOKEN_NAME: &str = "Hypmydata";

/// Default token symbol
pub const TOKEN_SYMBOL: &str = "HYP";

/// HYP ledger errors
#[derive(thiserror::Error, Debug)]
pub enum HypError {
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// HYP result type
pub type Result<T> = std::result::Result<T, HypError>;
