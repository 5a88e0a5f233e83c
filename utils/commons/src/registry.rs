use std::collections::BTreeMap;
use std::sync::Arc;

use crate::contract::Contract;
use crate::errors::{ContractError, ContractResult};

/// Builds a contract instance scoped to one account's stored bytes.
///
/// Constructors receive the frozen registry so a contract can materialise
/// peer contracts for sub-invocations; most constructors ignore it.
pub type ContractConstructor =
    fn(Arc<ContractRegistry>, &[u8]) -> ContractResult<Box<dyn Contract>>;

/// The process-wide map from contract id to constructor.
///
/// Written once at start-up through the builder and read-only afterwards;
/// the runtime receives it as a frozen `Arc`.
pub struct ContractRegistry {
    constructors: BTreeMap<String, ContractConstructor>,
}

impl ContractRegistry {
    pub fn builder() -> ContractRegistryBuilder {
        ContractRegistryBuilder {
            constructors: BTreeMap::new(),
        }
    }

    pub fn contains(&self, contract_id: &str) -> bool {
        self.constructors.contains_key(contract_id)
    }

    /// Materialise the contract registered under `contract_id`, bound to
    /// the given stored bytes.
    pub fn construct(
        self: &Arc<Self>,
        contract_id: &str,
        stored: &[u8],
    ) -> ContractResult<Box<dyn Contract>> {
        let constructor = self
            .constructors
            .get(contract_id)
            .ok_or_else(|| ContractError::UnknownContract(contract_id.to_string()))?;
        constructor(Arc::clone(self), stored)
    }
}

pub struct ContractRegistryBuilder {
    constructors: BTreeMap<String, ContractConstructor>,
}

impl ContractRegistryBuilder {
    pub fn register(mut self, contract_id: &str, constructor: ContractConstructor) -> Self {
        self.constructors
            .insert(contract_id.to_string(), constructor);
        self
    }

    /// Freeze the registry; no registration is possible afterwards.
    pub fn freeze(self) -> Arc<ContractRegistry> {
        Arc::new(ContractRegistry {
            constructors: self.constructors,
        })
    }
}
