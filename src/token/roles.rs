use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use primitive_types::{H160, H256};
use sha3::{Digest, Keccak256};
use super::{TokenError, TokenResult};

/// Named capabilities gating administrative operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Minter,
    Pauser,
    Blocker,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Minter, Role::Pauser, Role::Blocker];

    /// Canonical role name, e.g. `BLOCKER_ROLE`
    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "DEFAULT_ADMIN_ROLE",
            Role::Minter => "MINTER_ROLE",
            Role::Pauser => "PAUSER_ROLE",
            Role::Blocker => "BLOCKER_ROLE",
        }
    }

    /// 32-byte role identifier: zero for admin, keccak256 of the name otherwise
    pub fn id(&self) -> H256 {
        match self {
            Role::Admin => H256::zero(),
            other => H256::from_slice(&Keccak256::digest(other.name().as_bytes())),
        }
    }

    pub fn from_id(id: H256) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.id() == id)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Accepts `BLOCKER_ROLE`, `blocker` or the 0x-prefixed role id
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hex_id) = s.strip_prefix("0x") {
            let bytes = hex::decode(hex_id).map_err(|_| format!("Invalid role id: {}", s))?;
            if bytes.len() != 32 {
                return Err(format!("Role id must be 32 bytes: {}", s));
            }
            return Role::from_id(H256::from_slice(&bytes)).ok_or_else(|| format!("Unknown role id: {}", s));
        }

        let normalized = s.to_ascii_uppercase();
        let normalized = normalized.strip_suffix("_ROLE").unwrap_or(&normalized);
        match normalized {
            "ADMIN" | "DEFAULT_ADMIN" => Ok(Role::Admin),
            "MINTER" => Ok(Role::Minter),
            "PAUSER" => Ok(Role::Pauser),
            "BLOCKER" => Ok(Role::Blocker),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Role membership table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRegistry {
    members: BTreeMap<Role, BTreeSet<H160>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every role held by `deployer`
    pub fn seeded(deployer: H160) -> Self {
        let mut registry = Self::new();
        for role in Role::ALL {
            registry.insert(role, deployer);
        }
        registry
    }

    pub fn has_role(&self, role: Role, account: H160) -> bool {
        self.members
            .get(&role)
            .map(|members| members.contains(&account))
            .unwrap_or(false)
    }

    /// Role whose holders may grant and revoke `role`
    pub fn role_admin(&self, _role: Role) -> Role {
        Role::Admin
    }

    pub fn ensure_role(&self, role: Role, caller: H160) -> TokenResult<()> {
        if !self.has_role(role, caller) {
            return Err(TokenError::Unauthorized { account: caller, role });
        }
        Ok(())
    }

    pub fn ensure_role_admin(&self, role: Role, caller: H160) -> TokenResult<()> {
        self.ensure_role(self.role_admin(role), caller)
    }

    /// Returns false if the account already held the role
    pub fn insert(&mut self, role: Role, account: H160) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    /// Returns false if the account did not hold the role
    pub fn remove(&mut self, role: Role, account: H160) -> bool {
        self.members
            .get_mut(&role)
            .map(|members| members.remove(&account))
            .unwrap_or(false)
    }

    pub fn role_members(&self, role: Role) -> Vec<H160> {
        self.members
            .get(&role)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn role_member_count(&self, role: Role) -> usize {
        self.members.get(&role).map(BTreeSet::len).unwrap_or(0)
    }

    /// Roles held by an account
    pub fn roles_of(&self, account: H160) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.has_role(*role, account))
            .collect()
    }
}
