//! The sealed-bid auction contract.
//!
//! Bids accumulate in the instance while the auction is open; every
//! bidder escrows their full amount in the deposit account, raising
//! monotonically across repeat bids. Closing reveals the reserve price
//! against its commitment but decides nothing else, so the close itself
//! is non-informational. Settlement happens in a single `process` step:
//! one scan picks the winner, the deposit pays the seller and refunds
//! every losing bid in insertion order.
mod contract;
mod state;

pub use crate::{contract::*, state::*};
