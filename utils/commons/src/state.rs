use borsh::{BorshDeserialize, BorshSerialize};

use crate::errors::{ContractError, ContractResult};
use crate::types::{InstanceId, PolicyId};

/// The value stored under one trie key, together with its metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateEntry {
    pub value: Vec<u8>,
    pub version: u64,
    pub contract_id: String,
    pub policy_id: PolicyId,
}

/// A read-only projection of the state trie at a fixed height.
///
/// Contracts only ever read through this trait; mutation happens through
/// the [`StateChange`] lists they return. Implementations must behave as a
/// pure function of the key for the lifetime of the view, since replicas
/// re-evaluate instructions against it and must agree byte for byte.
pub trait StateView {
    /// Look up the entry under a key, or [`ContractError::NotFound`].
    fn get_values(&self, key: &InstanceId) -> ContractResult<StateEntry>;
}

/// What a state change does to its key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum StateChangeKind {
    Create,
    Update,
    Remove,
}

/// One record of the append-only change list a contract invocation
/// returns. The host commits a transaction's records atomically, in
/// order, or not at all.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StateChange {
    pub kind: StateChangeKind,
    pub instance_id: InstanceId,
    pub contract_id: String,
    pub value: Vec<u8>,
    pub policy_id: PolicyId,
}

impl StateChange {
    pub fn create(
        instance_id: InstanceId,
        contract_id: &str,
        value: Vec<u8>,
        policy_id: PolicyId,
    ) -> Self {
        Self {
            kind: StateChangeKind::Create,
            instance_id,
            contract_id: contract_id.to_string(),
            value,
            policy_id,
        }
    }

    pub fn update(
        instance_id: InstanceId,
        contract_id: &str,
        value: Vec<u8>,
        policy_id: PolicyId,
    ) -> Self {
        Self {
            kind: StateChangeKind::Update,
            instance_id,
            contract_id: contract_id.to_string(),
            value,
            policy_id,
        }
    }

    pub fn remove(instance_id: InstanceId, contract_id: &str, policy_id: PolicyId) -> Self {
        Self {
            kind: StateChangeKind::Remove,
            instance_id,
            contract_id: contract_id.to_string(),
            value: Vec::new(),
            policy_id,
        }
    }
}

/// A view overlaying an in-flight change list on a base view.
///
/// Successive sub-invocations inside one instruction, and successive
/// instructions inside one transaction, must observe the changes already
/// produced before them. The overlay is replayed in order on top of the
/// base entry, so the view stays a pure function of `(base, changes)`.
pub struct StagedView<'a> {
    base: &'a dyn StateView,
    overlay: &'a [StateChange],
}

impl<'a> StagedView<'a> {
    pub fn new(base: &'a dyn StateView, overlay: &'a [StateChange]) -> Self {
        Self { base, overlay }
    }
}

impl StateView for StagedView<'_> {
    fn get_values(&self, key: &InstanceId) -> ContractResult<StateEntry> {
        let mut current = match self.base.get_values(key) {
            Ok(entry) => Some(entry),
            Err(ContractError::NotFound) => None,
            Err(err) => return Err(err),
        };

        for change in self.overlay.iter().filter(|c| c.instance_id == *key) {
            match change.kind {
                StateChangeKind::Create => {
                    current = Some(StateEntry {
                        value: change.value.clone(),
                        version: 0,
                        contract_id: change.contract_id.clone(),
                        policy_id: change.policy_id,
                    });
                }
                StateChangeKind::Update => {
                    let version = current.as_ref().map(|e| e.version + 1).unwrap_or(0);
                    current = Some(StateEntry {
                        value: change.value.clone(),
                        version,
                        contract_id: change.contract_id.clone(),
                        policy_id: change.policy_id,
                    });
                }
                StateChangeKind::Remove => current = None,
            }
        }

        current.ok_or(ContractError::NotFound)
    }
}
