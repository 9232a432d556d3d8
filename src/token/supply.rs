use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use primitive_types::{H160, U256};
use super::{TokenError, TokenResult};

/// Total supply, cap and per-account balances
///
/// Every mutating method validates all of its preconditions before writing,
/// so a returned error always leaves the ledger untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyLedger {
    /// Upper bound on total supply, fixed at construction
    cap: U256,

    total_supply: U256,

    /// Balance mapping: address => balance. Entries are kept at zero once created.
    balances: BTreeMap<H160, U256>,
}

impl SupplyLedger {
    pub fn new(cap: U256) -> TokenResult<Self> {
        if cap.is_zero() {
            return Err(TokenError::InvalidCap);
        }

        Ok(Self {
            cap,
            total_supply: U256::zero(),
            balances: BTreeMap::new(),
        })
    }

    pub fn cap(&self) -> U256 {
        self.cap
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, account: H160) -> U256 {
        self.balances.get(&account).copied().unwrap_or_else(U256::zero)
    }

    /// Supply left before the cap is reached
    pub fn headroom(&self) -> U256 {
        self.cap.saturating_sub(self.total_supply)
    }

    /// Create `amount` new tokens in `to`
    pub fn credit(&mut self, to: H160, amount: U256) -> TokenResult<()> {
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;
        if new_supply > self.cap {
            return Err(TokenError::CapExceeded {
                cap: self.cap,
                requested: new_supply,
            });
        }
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;

        self.total_supply = new_supply;
        self.balances.insert(to, new_balance);
        Ok(())
    }

    /// Destroy `amount` tokens held by `from`
    pub fn debit(&mut self, from: H160, amount: U256) -> TokenResult<()> {
        let available = self.balance_of(from);
        let new_balance = available
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance {
                required: amount,
                available,
            })?;
        let new_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(TokenError::InvariantViolation {
                reason: "balance exceeds total supply".to_string(),
            })?;

        self.balances.insert(from, new_balance);
        self.total_supply = new_supply;
        Ok(())
    }

    /// Validate a move of `amount` from `from` to `to` without applying it
    pub fn check_move(&self, from: H160, to: H160, amount: U256) -> TokenResult<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if from != to {
            self.balance_of(to)
                .checked_add(amount)
                .ok_or(TokenError::ArithmeticOverflow)?;
        }
        Ok(())
    }

    /// Move `amount` from `from` to `to`; total supply is unchanged
    pub fn move_balance(&mut self, from: H160, to: H160, amount: U256) -> TokenResult<()> {
        self.check_move(from, to, amount)?;
        if from == to {
            return Ok(());
        }

        let from_balance = self.balance_of(from) - amount;
        let to_balance = self.balance_of(to) + amount;
        self.balances.insert(from, from_balance);
        self.balances.insert(to, to_balance);
        Ok(())
    }

    /// All accounts that ever held a balance
    pub fn accounts(&self) -> impl Iterator<Item = (H160, U256)> + '_ {
        self.balances.iter().map(|(account, balance)| (*account, *balance))
    }

    /// Accounts with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|balance| !balance.is_zero()).count()
    }

    /// Check conservation and the cap invariant
    pub fn verify(&self) -> TokenResult<()> {
        let mut sum = U256::zero();
        for balance in self.balances.values() {
            sum = sum.checked_add(*balance).ok_or(TokenError::InvariantViolation {
                reason: "sum of balances overflows".to_string(),
            })?;
        }

        if sum != self.total_supply {
            return Err(TokenError::InvariantViolation {
                reason: format!("sum of balances {} != total supply {}", sum, self.total_supply),
            });
        }
        if self.cap.is_zero() {
            return Err(TokenError::InvalidCap);
        }
        if self.total_supply > self.cap {
            return Err(TokenError::InvariantViolation {
                reason: format!("total supply {} exceeds cap {}", self.total_supply, self.cap),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_cap_rejected() {
        assert_eq!(SupplyLedger::new(U256::zero()), Err(TokenError::InvalidCap));
    }

    #[test]
    fn test_credit_up_to_cap() {
        let holder = H160::from_low_u64_be(1);
        let mut supply = SupplyLedger::new(U256::from(100_000_000)).unwrap();

        supply.credit(holder, U256::from(50_000_000)).unwrap();
        let result = supply.credit(holder, U256::from(50_000_001));
        assert_eq!(
            result,
            Err(TokenError::CapExceeded {
                cap: U256::from(100_000_000),
                requested: U256::from(100_000_001),
            })
        );
        assert_eq!(supply.total_supply(), U256::from(50_000_000));

        supply.credit(holder, U256::from(50_000_000)).unwrap();
        assert_eq!(supply.total_supply(), U256::from(100_000_000));
        assert!(supply.headroom().is_zero());
        assert!(supply.verify().is_ok());
    }

    #[test]
    fn test_credit_overflow_fails_closed() {
        let holder = H160::from_low_u64_be(1);
        let mut supply = SupplyLedger::new(U256::MAX).unwrap();

        supply.credit(holder, U256::MAX - 1).unwrap();
        assert_eq!(supply.credit(holder, U256::from(2)), Err(TokenError::ArithmeticOverflow));
        assert_eq!(supply.balance_of(holder), U256::MAX - 1);
    }

    #[test]
    fn test_debit() {
        let holder = H160::from_low_u64_be(1);
        let mut supply = SupplyLedger::new(U256::from(1000)).unwrap();
        supply.credit(holder, U256::from(500)).unwrap();

        supply.debit(holder, U256::from(200)).unwrap();
        assert_eq!(supply.balance_of(holder), U256::from(300));
        assert_eq!(supply.total_supply(), U256::from(300));

        let result = supply.debit(holder, U256::from(301));
        assert_eq!(
            result,
            Err(TokenError::InsufficientBalance {
                required: U256::from(301),
                available: U256::from(300),
            })
        );
        assert_eq!(supply.total_supply(), U256::from(300));
    }

    #[test]
    fn test_move_balance_conserves_supply() {
        let alice = H160::from_low_u64_be(1);
        let bob = H160::from_low_u64_be(2);
        let mut supply = SupplyLedger::new(U256::from(1000)).unwrap();
        supply.credit(alice, U256::from(700)).unwrap();

        supply.move_balance(alice, bob, U256::from(700)).unwrap();
        assert_eq!(supply.balance_of(alice), U256::zero());
        assert_eq!(supply.balance_of(bob), U256::from(700));
        assert_eq!(supply.total_supply(), U256::from(700));
        assert!(supply.verify().is_ok());

        // emptied accounts keep their entry
        assert_eq!(supply.accounts().count(), 2);
        assert_eq!(supply.holder_count(), 1);
    }

    #[test]
    fn test_self_move_is_balance_neutral() {
        let alice = H160::from_low_u64_be(1);
        let mut supply = SupplyLedger::new(U256::from(1000)).unwrap();
        supply.credit(alice, U256::from(10)).unwrap();

        supply.move_balance(alice, alice, U256::from(10)).unwrap();
        assert_eq!(supply.balance_of(alice), U256::from(10));
        assert!(supply.move_balance(alice, alice, U256::from(11)).is_err());
    }
}
