use core::fmt;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::errors::{ContractError, ContractResult};

/// Length in bytes of a key into the global state trie.
pub const INSTANCE_ID_LENGTH: usize = 32;

/// A key into the authenticated key-value trie.
///
/// Every object in the global state lives under one of these: coin
/// accounts, auction instances and policy instances alike. Ids of spawned
/// objects are derived from the spawning instruction, so they are the same
/// on every replica.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct InstanceId(pub [u8; INSTANCE_ID_LENGTH]);

/// A coin account key. Accounts are ordinary trie instances.
pub type AccountId = InstanceId;

/// The key of the access-control policy owning an instance.
pub type PolicyId = InstanceId;

impl InstanceId {
    /// The all-zero id, used as the "nobody" placeholder.
    pub fn zero() -> Self {
        Self([0u8; INSTANCE_ID_LENGTH])
    }

    /// Build an id from an ASCII tag, zero-padded to the full width.
    pub fn from_tag(tag: &[u8]) -> Self {
        let mut raw = [0u8; INSTANCE_ID_LENGTH];
        let len = tag.len().min(INSTANCE_ID_LENGTH);
        raw[..len].copy_from_slice(&tag[..len]);
        Self(raw)
    }

    /// Parse an id from a raw byte slice of exactly the id width.
    pub fn from_slice(raw: &[u8]) -> ContractResult<Self> {
        raw.try_into()
            .map(Self)
            .map_err(|_| ContractError::MalformedPayload)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", hex::encode(self.0))
    }
}

/// A quantity of a single coin denomination.
///
/// The `name` tags the denomination; values of different names are never
/// addition-compatible. Balance arithmetic is checked: an operation that
/// would wrap fails with [`ContractError::Overflow`] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Coin {
    pub name: InstanceId,
    pub value: u64,
}

impl Coin {
    pub fn new(name: InstanceId, value: u64) -> Self {
        Self { name, value }
    }

    /// Credit the balance, failing instead of wrapping.
    pub fn safe_add(&mut self, amount: u64) -> ContractResult<()> {
        self.value = self
            .value
            .checked_add(amount)
            .ok_or(ContractError::Overflow)?;
        Ok(())
    }

    /// Debit the balance, failing on overdraft.
    pub fn safe_sub(&mut self, amount: u64) -> ContractResult<()> {
        self.value = self
            .value
            .checked_sub(amount)
            .ok_or(ContractError::Overflow)?;
        Ok(())
    }
}
