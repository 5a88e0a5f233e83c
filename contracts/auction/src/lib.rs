//! The open English-style auction contract.
//!
//! An auction instance tracks one good, its seller and a deposit account.
//! Only the highest bid is live at any time: a new bid must strictly
//! exceed it, the previous highest bidder is refunded immediately from
//! the deposit, and the new bid's coins are escrowed in their place.
//! Closing settles the highest bid to the seller. Every coin movement
//! goes through sub-invocations of the coin contract, so the deposit,
//! bidder and seller balances always sum to the same total.
mod contract;
mod state;

pub use crate::{contract::*, state::*};
