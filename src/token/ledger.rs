use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use primitive_types::{H160, U256};
use super::{
    Blocklist, EventLog, EventRecord, PauseSwitch, Role, RoleRegistry, SupplyLedger, TokenError,
    TokenEvent, TokenResult, DECIMALS,
};

/// Capped, pausable token with role-gated administration and an account blocklist
///
/// Every state-changing method checks all of its preconditions before the first
/// write and returns the appended [`EventRecord`], or `None` when the call was a
/// successful no-op (zero amounts, redundant role changes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CappedToken {
    name: String,
    symbol: String,
    roles: RoleRegistry,
    supply: SupplyLedger,
    blocklist: Blocklist,
    pause: PauseSwitch,

    /// Allowance mapping: owner => spender => amount
    allowances: BTreeMap<H160, BTreeMap<H160, U256>>,

    events: EventLog,
}

impl CappedToken {
    /// Create a token; the deployer receives every role and a zero balance
    pub fn new(name: String, symbol: String, cap: U256, deployer: H160) -> TokenResult<Self> {
        if deployer.is_zero() {
            return Err(TokenError::ZeroAddress);
        }

        let mut token = Self {
            name,
            symbol,
            roles: RoleRegistry::seeded(deployer),
            supply: SupplyLedger::new(cap)?,
            blocklist: Blocklist::new(),
            pause: PauseSwitch::new(),
            allowances: BTreeMap::new(),
            events: EventLog::new(),
        };

        for role in Role::ALL {
            token.events.append(
                deployer,
                TokenEvent::RoleGranted {
                    role,
                    account: deployer,
                    sender: deployer,
                },
            );
        }

        tracing::info!(
            "Deployed token {} ({}) with cap {} by {:?}",
            token.name,
            token.symbol,
            cap,
            deployer
        );

        Ok(token)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    pub fn cap(&self) -> U256 {
        self.supply.cap()
    }

    pub fn total_supply(&self) -> U256 {
        self.supply.total_supply()
    }

    pub fn balance_of(&self, account: H160) -> U256 {
        self.supply.balance_of(account)
    }

    pub fn allowance(&self, owner: H160, spender: H160) -> U256 {
        self.allowances
            .get(&owner)
            .and_then(|allowances| allowances.get(&spender))
            .copied()
            .unwrap_or_else(U256::zero)
    }

    pub fn is_blocked(&self, account: H160) -> bool {
        self.blocklist.is_blocked(account)
    }

    pub fn blocked_accounts(&self) -> Vec<H160> {
        self.blocklist.blocked_accounts()
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn has_role(&self, role: Role, account: H160) -> bool {
        self.roles.has_role(role, account)
    }

    pub fn role_admin(&self, role: Role) -> Role {
        self.roles.role_admin(role)
    }

    pub fn role_members(&self, role: Role) -> Vec<H160> {
        self.roles.role_members(role)
    }

    pub fn role_member_count(&self, role: Role) -> usize {
        self.roles.role_member_count(role)
    }

    pub fn roles_of(&self, account: H160) -> Vec<Role> {
        self.roles.roles_of(account)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Mint new tokens (MINTER role)
    pub fn mint(&mut self, caller: H160, to: H160, amount: U256) -> TokenResult<Option<EventRecord>> {
        self.authorize(Role::Minter, caller)?;
        self.pause.ensure_not_paused()?;
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        if amount.is_zero() {
            return Ok(None);
        }

        self.supply.credit(to, amount)?;

        tracing::info!("Minted {} {} to {:?}", amount, self.symbol, to);
        Ok(Some(self.events.append(caller, TokenEvent::Minted { to, amount })))
    }

    /// Burn tokens from the caller's own balance
    pub fn burn(&mut self, caller: H160, amount: U256) -> TokenResult<Option<EventRecord>> {
        self.pause.ensure_not_paused()?;
        if amount.is_zero() {
            return Ok(None);
        }

        self.supply.debit(caller, amount)?;

        tracing::info!("Burned {} {} from {:?}", amount, self.symbol, caller);
        Ok(Some(self.events.append(caller, TokenEvent::Burned { from: caller, amount })))
    }

    /// Run the transfer gate without applying anything
    ///
    /// Order: pause, sender blocked, receiver blocked, zero receiver, balance.
    pub fn check_transfer(&self, from: H160, to: H160, amount: U256) -> TokenResult<()> {
        self.pause.ensure_not_paused()?;
        self.blocklist.check_transfer(from, to).map_err(|err| {
            tracing::warn!("Transfer {:?} -> {:?} vetoed: {}", from, to, err);
            err
        })?;
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.supply.check_move(from, to, amount)
    }

    /// Transfer tokens from the caller to `to`
    pub fn transfer(&mut self, caller: H160, to: H160, amount: U256) -> TokenResult<Option<EventRecord>> {
        self.check_transfer(caller, to, amount)?;
        if amount.is_zero() {
            return Ok(None);
        }

        self.supply.move_balance(caller, to, amount)?;

        tracing::debug!("Transferred {} {} from {:?} to {:?}", amount, self.symbol, caller, to);
        Ok(Some(self.events.append(
            caller,
            TokenEvent::Transfer {
                from: caller,
                to,
                amount,
            },
        )))
    }

    /// Set the amount `spender` may move out of the caller's balance
    pub fn approve(&mut self, caller: H160, spender: H160, amount: U256) -> TokenResult<Option<EventRecord>> {
        if spender.is_zero() {
            return Err(TokenError::ZeroAddress);
        }

        self.allowances
            .entry(caller)
            .or_default()
            .insert(spender, amount);

        tracing::debug!("{:?} approved {:?} for {} {}", caller, spender, amount, self.symbol);
        Ok(Some(self.events.append(
            caller,
            TokenEvent::Approval {
                owner: caller,
                spender,
                amount,
            },
        )))
    }

    /// Transfer tokens from `from` to `to` against the caller's allowance
    pub fn transfer_from(
        &mut self,
        caller: H160,
        from: H160,
        to: H160,
        amount: U256,
    ) -> TokenResult<Option<EventRecord>> {
        self.pause.ensure_not_paused()?;
        self.blocklist.check_transfer(from, to).map_err(|err| {
            tracing::warn!("Transfer {:?} -> {:?} by {:?} vetoed: {}", from, to, caller, err);
            err
        })?;
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }

        let allowance = self.allowance(from, caller);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                required: amount,
                available: allowance,
            });
        }
        self.supply.check_move(from, to, amount)?;
        if amount.is_zero() {
            return Ok(None);
        }

        self.supply.move_balance(from, to, amount)?;
        self.allowances
            .entry(from)
            .or_default()
            .insert(caller, allowance - amount);

        tracing::debug!(
            "Transferred {} {} from {:?} to {:?} on behalf of {:?}",
            amount,
            self.symbol,
            from,
            to,
            caller
        );
        Ok(Some(self.events.append(caller, TokenEvent::Transfer { from, to, amount })))
    }

    /// Pause transfers, mints and burns (PAUSER role)
    pub fn pause(&mut self, caller: H160) -> TokenResult<Option<EventRecord>> {
        self.authorize(Role::Pauser, caller)?;
        self.pause.pause()?;

        tracing::info!("Token {} paused by {:?}", self.symbol, caller);
        Ok(Some(self.events.append(caller, TokenEvent::Paused { account: caller })))
    }

    /// Lift the pause (PAUSER role)
    pub fn unpause(&mut self, caller: H160) -> TokenResult<Option<EventRecord>> {
        self.authorize(Role::Pauser, caller)?;
        self.pause.unpause()?;

        tracing::info!("Token {} unpaused by {:?}", self.symbol, caller);
        Ok(Some(self.events.append(caller, TokenEvent::Unpaused { account: caller })))
    }

    /// Add an account to the blocklist (BLOCKER role); redundant calls succeed
    pub fn block_account(&mut self, caller: H160, account: H160) -> TokenResult<Option<EventRecord>> {
        self.authorize(Role::Blocker, caller)?;
        let newly_blocked = self.blocklist.block(account);

        tracing::info!("Blocked {:?} (already blocked: {})", account, !newly_blocked);
        Ok(Some(self.events.append(caller, TokenEvent::Blocked { account })))
    }

    /// Remove an account from the blocklist (BLOCKER role); redundant calls succeed
    pub fn unblock_account(&mut self, caller: H160, account: H160) -> TokenResult<Option<EventRecord>> {
        self.authorize(Role::Blocker, caller)?;
        let was_blocked = self.blocklist.unblock(account);

        tracing::info!("Unblocked {:?} (was blocked: {})", account, was_blocked);
        Ok(Some(self.events.append(caller, TokenEvent::UnBlocked { account })))
    }

    /// Grant `role` to `account`; caller must hold the role's admin role
    pub fn grant_role(&mut self, caller: H160, role: Role, account: H160) -> TokenResult<Option<EventRecord>> {
        self.authorize_admin_of(role, caller)?;
        if !self.roles.insert(role, account) {
            return Ok(None);
        }

        tracing::info!("Granted {} to {:?} by {:?}", role, account, caller);
        Ok(Some(self.events.append(
            caller,
            TokenEvent::RoleGranted {
                role,
                account,
                sender: caller,
            },
        )))
    }

    /// Revoke `role` from `account`; caller must hold the role's admin role
    pub fn revoke_role(&mut self, caller: H160, role: Role, account: H160) -> TokenResult<Option<EventRecord>> {
        self.authorize_admin_of(role, caller)?;
        if !self.roles.remove(role, account) {
            return Ok(None);
        }

        tracing::info!("Revoked {} from {:?} by {:?}", role, account, caller);
        Ok(Some(self.events.append(
            caller,
            TokenEvent::RoleRevoked {
                role,
                account,
                sender: caller,
            },
        )))
    }

    /// Drop one of the caller's own roles
    pub fn renounce_role(&mut self, caller: H160, role: Role) -> TokenResult<Option<EventRecord>> {
        if !self.roles.remove(role, caller) {
            return Ok(None);
        }

        tracing::info!("{:?} renounced {}", caller, role);
        Ok(Some(self.events.append(
            caller,
            TokenEvent::RoleRevoked {
                role,
                account: caller,
                sender: caller,
            },
        )))
    }

    /// Execute a token transaction on behalf of `caller`
    pub fn execute_transaction(
        &mut self,
        caller: H160,
        tx: TokenTransaction,
    ) -> TokenResult<Option<EventRecord>> {
        match tx {
            TokenTransaction::Mint { to, amount } => self.mint(caller, to, amount),
            TokenTransaction::Burn { amount } => self.burn(caller, amount),
            TokenTransaction::Transfer { to, amount } => self.transfer(caller, to, amount),
            TokenTransaction::Approve { spender, amount } => self.approve(caller, spender, amount),
            TokenTransaction::TransferFrom { from, to, amount } => {
                self.transfer_from(caller, from, to, amount)
            }
            TokenTransaction::Pause => self.pause(caller),
            TokenTransaction::Unpause => self.unpause(caller),
            TokenTransaction::BlockAccount { account } => self.block_account(caller, account),
            TokenTransaction::UnBlockAccount { account } => self.unblock_account(caller, account),
            TokenTransaction::GrantRole { role, account } => self.grant_role(caller, role, account),
            TokenTransaction::RevokeRole { role, account } => self.revoke_role(caller, role, account),
            TokenTransaction::RenounceRole { role } => self.renounce_role(caller, role),
        }
    }

    /// Check supply conservation, the cap and event log ordering
    pub fn verify_invariants(&self) -> TokenResult<()> {
        self.supply.verify()?;
        if !self.events.is_consistent() {
            return Err(TokenError::InvariantViolation {
                reason: "event sequence numbers are not dense".to_string(),
            });
        }
        Ok(())
    }

    /// Get token info for external queries
    pub fn info(&self) -> TokenInfo {
        TokenInfo {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: DECIMALS,
            cap: self.supply.cap(),
            total_supply: self.supply.total_supply(),
            headroom: self.supply.headroom(),
            paused: self.pause.is_paused(),
            holders: self.supply.holder_count(),
            blocked_accounts: self.blocklist.len(),
            event_count: self.events.len(),
        }
    }

    fn authorize(&self, role: Role, caller: H160) -> TokenResult<()> {
        Self::log_rejection(caller, self.roles.ensure_role(role, caller))
    }

    fn authorize_admin_of(&self, role: Role, caller: H160) -> TokenResult<()> {
        Self::log_rejection(caller, self.roles.ensure_role_admin(role, caller))
    }

    fn log_rejection(caller: H160, result: TokenResult<()>) -> TokenResult<()> {
        result.map_err(|err| {
            tracing::warn!("Rejected call by {:?}: {}", caller, err);
            err
        })
    }
}

/// Token transaction types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenTransaction {
    Mint {
        to: H160,
        amount: U256,
    },
    Burn {
        amount: U256,
    },
    Transfer {
        to: H160,
        amount: U256,
    },
    Approve {
        spender: H160,
        amount: U256,
    },
    TransferFrom {
        from: H160,
        to: H160,
        amount: U256,
    },
    Pause,
    Unpause,
    BlockAccount {
        account: H160,
    },
    UnBlockAccount {
        account: H160,
    },
    GrantRole {
        role: Role,
        account: H160,
    },
    RevokeRole {
        role: Role,
        account: H160,
    },
    RenounceRole {
        role: Role,
    },
}

/// Token information for external queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub cap: U256,
    pub total_supply: U256,
    /// Supply still mintable under the cap
    pub headroom: U256,
    pub paused: bool,
    pub holders: usize,
    pub blocked_accounts: usize,
    pub event_count: usize,
}
