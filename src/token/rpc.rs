//! JSON request codec for token operations
//!
//! A transport layer hands over a method name and JSON params; this module turns
//! them into a [`TokenTransaction`] or a read query and encodes the outcome.

use serde_json::{json, Value};
use primitive_types::{H160, U256};
use super::{CappedToken, EventRecord, Role, TokenError, TokenTransaction, DECIMALS};

/// Request handling errors
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl From<String> for RpcError {
    fn from(reason: String) -> Self {
        RpcError::InvalidParams(reason)
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

/// Read-only requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenQuery {
    BalanceOf { account: H160 },
    TotalSupply,
    Cap,
    IsBlocked { account: H160 },
    Paused,
    HasRole { role: Role, account: H160 },
    RoleMembers { role: Role },
    Allowance { owner: H160, spender: H160 },
    Info,
    Events { account: Option<H160>, since: u64, limit: usize },
}

/// Decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRequest {
    Query(TokenQuery),
    Transaction(TokenTransaction),
}

impl TokenRequest {
    pub fn is_mutating(&self) -> bool {
        matches!(self, TokenRequest::Transaction(_))
    }
}

/// Decode a method name and its params
pub fn decode_request(method: &str, params: &Value) -> RpcResult<TokenRequest> {
    let tx = match method {
        "mint" => TokenTransaction::Mint {
            to: parse_address(field(params, "to")?)?,
            amount: parse_u256(field(params, "amount")?)?,
        },
        "burn" => TokenTransaction::Burn {
            amount: parse_u256(field(params, "amount")?)?,
        },
        "transfer" => TokenTransaction::Transfer {
            to: parse_address(field(params, "to")?)?,
            amount: parse_u256(field(params, "amount")?)?,
        },
        "approve" => TokenTransaction::Approve {
            spender: parse_address(field(params, "spender")?)?,
            amount: parse_u256(field(params, "amount")?)?,
        },
        "transferFrom" => TokenTransaction::TransferFrom {
            from: parse_address(field(params, "tokenOwner")?)?,
            to: parse_address(field(params, "to")?)?,
            amount: parse_u256(field(params, "amount")?)?,
        },
        "pause" => TokenTransaction::Pause,
        "unpause" => TokenTransaction::Unpause,
        "blockAccount" => TokenTransaction::BlockAccount {
            account: parse_address(field(params, "account")?)?,
        },
        "unBlockAccount" => TokenTransaction::UnBlockAccount {
            account: parse_address(field(params, "account")?)?,
        },
        "grantRole" => TokenTransaction::GrantRole {
            role: parse_role(field(params, "role")?)?,
            account: parse_address(field(params, "account")?)?,
        },
        "revokeRole" => TokenTransaction::RevokeRole {
            role: parse_role(field(params, "role")?)?,
            account: parse_address(field(params, "account")?)?,
        },
        "renounceRole" => TokenTransaction::RenounceRole {
            role: parse_role(field(params, "role")?)?,
        },
        _ => return decode_query(method, params).map(TokenRequest::Query),
    };

    Ok(TokenRequest::Transaction(tx))
}

fn decode_query(method: &str, params: &Value) -> RpcResult<TokenQuery> {
    let query = match method {
        "balanceOf" => TokenQuery::BalanceOf {
            account: parse_address(field(params, "account")?)?,
        },
        "totalSupply" => TokenQuery::TotalSupply,
        "cap" => TokenQuery::Cap,
        "isBlocked" => TokenQuery::IsBlocked {
            account: parse_address(field(params, "account")?)?,
        },
        "paused" => TokenQuery::Paused,
        "hasRole" => TokenQuery::HasRole {
            role: parse_role(field(params, "role")?)?,
            account: parse_address(field(params, "account")?)?,
        },
        "getRoleMembers" => TokenQuery::RoleMembers {
            role: parse_role(field(params, "role")?)?,
        },
        "allowance" => TokenQuery::Allowance {
            owner: parse_address(field(params, "owner")?)?,
            spender: parse_address(field(params, "spender")?)?,
        },
        "tokenInfo" => TokenQuery::Info,
        "getEvents" => {
            let account = match params.get("account") {
                Some(value) if !value.is_null() => Some(parse_address(value)?),
                _ => None,
            };
            TokenQuery::Events {
                account,
                since: params.get("since").and_then(|v| v.as_u64()).unwrap_or(0),
                limit: params
                    .get("limit")
                    .and_then(|v| v.as_u64())
                    .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
                    .unwrap_or(50),
            }
        }
        _ => return Err(RpcError::MethodNotFound(method.to_string())),
    };

    Ok(query)
}

/// Answer a read query
pub fn answer_query(token: &CappedToken, query: &TokenQuery) -> Value {
    match query {
        TokenQuery::BalanceOf { account } => {
            let balance = token.balance_of(*account);
            json!({
                "account": format!("0x{:x}", account),
                "balance": balance.to_string(),
                "symbol": token.symbol(),
                "formatted": format_balance(balance, DECIMALS)
            })
        }
        TokenQuery::TotalSupply => json!({
            "totalSupply": token.total_supply().to_string(),
            "symbol": token.symbol(),
            "formatted": format_balance(token.total_supply(), DECIMALS)
        }),
        TokenQuery::Cap => {
            let info = token.info();
            json!({
                "cap": info.cap.to_string(),
                "formatted": format_balance(info.cap, DECIMALS),
                "headroom": info.headroom.to_string()
            })
        }
        TokenQuery::IsBlocked { account } => json!({
            "account": format!("0x{:x}", account),
            "blocked": token.is_blocked(*account)
        }),
        TokenQuery::Paused => json!({ "paused": token.is_paused() }),
        TokenQuery::HasRole { role, account } => json!({
            "role": role.name(),
            "roleId": format!("0x{:x}", role.id()),
            "account": format!("0x{:x}", account),
            "hasRole": token.has_role(*role, *account)
        }),
        TokenQuery::RoleMembers { role } => {
            let members: Vec<String> = token
                .role_members(*role)
                .into_iter()
                .map(|member| format!("0x{:x}", member))
                .collect();
            json!({
                "role": role.name(),
                "roleId": format!("0x{:x}", role.id()),
                "adminRole": token.role_admin(*role).name(),
                "members": members
            })
        }
        TokenQuery::Allowance { owner, spender } => {
            let allowance = token.allowance(*owner, *spender);
            json!({
                "owner": format!("0x{:x}", owner),
                "spender": format!("0x{:x}", spender),
                "allowance": allowance.to_string(),
                "formatted": format_balance(allowance, DECIMALS)
            })
        }
        TokenQuery::Info => {
            let info = token.info();
            json!({
                "name": info.name,
                "symbol": info.symbol,
                "decimals": info.decimals,
                "cap": info.cap.to_string(),
                "totalSupply": info.total_supply.to_string(),
                "headroom": info.headroom.to_string(),
                "formattedTotalSupply": format_balance(info.total_supply, info.decimals),
                "paused": info.paused,
                "holders": info.holders,
                "blockedAccounts": info.blocked_accounts,
                "eventCount": info.event_count
            })
        }
        TokenQuery::Events { account, since, limit } => {
            let matching: Vec<&EventRecord> = token
                .events()
                .since(*since)
                .iter()
                .filter(|record| account.map_or(true, |account| record.involves(account)))
                .collect();
            let events: Vec<Value> = matching.iter().take(*limit).map(|r| encode_event(r)).collect();

            json!({
                "account": account.map(|addr| format!("0x{:x}", addr)),
                "since": since,
                "limit": limit,
                "count": events.len(),
                "hasMore": matching.len() > *limit,
                "events": events
            })
        }
    }
}

/// Encode one event record
pub fn encode_event(record: &EventRecord) -> Value {
    let subjects: Vec<String> = record
        .subjects()
        .into_iter()
        .map(|subject| format!("0x{:x}", subject))
        .collect();

    json!({
        "sequence": record.sequence,
        "kind": record.kind(),
        "actor": format!("0x{:x}", record.actor),
        "subjects": subjects,
        "amount": record.amount().map(|amount| amount.to_string()),
        "recordedAt": record.recorded_at,
        "data": serde_json::to_value(&record.event).unwrap_or(Value::Null)
    })
}

/// Encode the outcome of a mutating call
pub fn encode_receipt(record: Option<&EventRecord>) -> Value {
    json!({
        "status": "success",
        "changed": record.is_some(),
        "event": record.map(encode_event)
    })
}

/// Decode and run one request against the ledger
pub fn dispatch(
    token: &mut CappedToken,
    caller: H160,
    method: &str,
    params: &Value,
) -> RpcResult<Value> {
    match decode_request(method, params)? {
        TokenRequest::Query(query) => Ok(answer_query(token, &query)),
        TokenRequest::Transaction(tx) => {
            let record = token.execute_transaction(caller, tx)?;
            Ok(encode_receipt(record.as_ref()))
        }
    }
}

// Helper functions

fn field<'a>(params: &'a Value, name: &str) -> RpcResult<&'a Value> {
    params
        .get(name)
        .ok_or_else(|| RpcError::InvalidParams(format!("Missing '{}' field", name)))
}

/// Parse address from JSON value
pub fn parse_address(value: &Value) -> Result<H160, String> {
    let addr_str = value.as_str().ok_or("Address must be a string")?;
    parse_address_str(addr_str)
}

/// Parse a 0x-prefixed (or bare) 20-byte hex address
pub fn parse_address_str(addr_str: &str) -> Result<H160, String> {
    let addr_clean = addr_str.strip_prefix("0x").unwrap_or(addr_str);

    if addr_clean.len() != 40 {
        return Err(format!("Invalid address length: {}", addr_str));
    }

    let bytes = hex::decode(addr_clean).map_err(|_| format!("Invalid hex address: {}", addr_str))?;

    Ok(H160::from_slice(&bytes))
}

/// Parse U256 from JSON value
pub fn parse_u256(value: &Value) -> Result<U256, String> {
    match value {
        Value::String(s) => parse_amount_str(s),
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| "Amount must be a non-negative integer below 2^64; use a string".to_string()),
        _ => Err("Amount must be a string or number".to_string()),
    }
}

/// Parse a decimal or 0x-prefixed hex amount
pub fn parse_amount_str(s: &str) -> Result<U256, String> {
    if s.strip_prefix("0x").unwrap_or(s).is_empty() {
        return Err(format!("Empty amount: {:?}", s));
    }

    if let Some(hex_digits) = s.strip_prefix("0x") {
        U256::from_str_radix(hex_digits, 16).map_err(|_| format!("Invalid hex number: {}", s))
    } else {
        U256::from_dec_str(s).map_err(|_| format!("Invalid decimal number: {}", s))
    }
}

fn parse_role(value: &Value) -> Result<Role, String> {
    value.as_str().ok_or("Role must be a string")?.parse()
}

/// Format balance with proper decimals
pub fn format_balance(balance: U256, decimals: u8) -> String {
    let divisor = U256::from(10).pow(U256::from(decimals));
    let integer_part = balance / divisor;
    let fractional_part = balance % divisor;

    if fractional_part.is_zero() {
        return integer_part.to_string();
    }

    let frac_str = format!("{:0width$}", fractional_part, width = decimals as usize);
    let trimmed = frac_str.trim_end_matches('0');
    format!("{}.{}", integer_part, trimmed)
}
