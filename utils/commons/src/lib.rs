//! Shared ledger model for the auction contracts.
//!
//! Everything a contract needs to be evaluated deterministically against a
//! replicated state trie lives here: instance identifiers, coins,
//! instructions with their named-argument bags, read-only state views,
//! state-change records, the contract trait with its registry, the
//! instruction evaluation envelope, and the client used to sub-invoke the
//! coin contract from another contract.
pub use crate::{
    coins::*, contract::*, errors::*, instruction::*, registry::*, runtime::*, state::*, types::*,
};

mod coins;
mod contract;
mod errors;
mod instruction;
mod macros;
mod registry;
mod runtime;
mod state;
mod types;

#[cfg(feature = "test-infrastructure")]
pub mod test_infrastructure;
