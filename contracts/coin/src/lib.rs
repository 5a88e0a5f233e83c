//! The coin contract.
//!
//! A coin account is a trie instance whose payload is a single
//! [`commons::Coin`]: a denomination tag and a balance. The contract
//! exposes the four primitives everything else settles through: `mint`
//! (privileged credit), `fetch` (debit into the carried coin list),
//! `store` (credit carried coins) and `transfer` (move between accounts
//! of one denomination). It never synthesises coins outside `mint`, so
//! any transaction built from these primitives conserves the total
//! supply.
mod contract;

pub use crate::contract::*;
