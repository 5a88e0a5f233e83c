use borsh::{BorshDeserialize, BorshSerialize};

use commons::{ensure, AccountId, ContractError, ContractResult};

/// Lifecycle of an open auction.
///
/// The discriminants are part of the stored encoding and must never be
/// renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum AuctionState {
    Open = 1,
    Closed = 2,
}

/// The stored payload of an open auction instance.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AuctionData {
    /// Description of the good on sale.
    pub good: String,
    /// Account credited on close.
    pub seller: AccountId,
    /// Escrow account holding the live bid.
    pub deposit: AccountId,
    pub state: AuctionState,
    /// The one live bid; zero while no bid was accepted yet.
    pub highest_bid: u64,
    pub highest_bidder: AccountId,
}

impl AuctionData {
    pub fn decode(raw: &[u8]) -> ContractResult<Self> {
        borsh::from_slice(raw).map_err(|_| ContractError::MalformedPayload)
    }

    pub fn encode(&self) -> ContractResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| ContractError::MalformedPayload)
    }

    pub fn is_open(&self) -> bool {
        self.state == AuctionState::Open
    }

    /// Accept an effective bid amount, keeping only the highest bid live.
    ///
    /// Returns the displaced `(bidder, amount)` the caller must refund
    /// from the deposit, or `None` for the first accepted bid.
    pub fn record_bid(
        &mut self,
        bidder: AccountId,
        effective: u64,
    ) -> ContractResult<Option<(AccountId, u64)>> {
        ensure!(effective > 0, ContractError::NonPositiveBid);

        if self.highest_bid == 0 {
            self.highest_bid = effective;
            self.highest_bidder = bidder;
            return Ok(None);
        }

        ensure!(effective > self.highest_bid, ContractError::BidNotHigher);
        let displaced = (self.highest_bidder, self.highest_bid);
        self.highest_bid = effective;
        self.highest_bidder = bidder;
        Ok(Some(displaced))
    }

    /// Flip to `Closed`; returns the amount to settle to the seller.
    pub fn close(&mut self) -> ContractResult<u64> {
        ensure!(self.is_open(), ContractError::AuctionClosed);
        self.state = AuctionState::Closed;
        Ok(self.highest_bid)
    }
}

/// The decoded `bid` argument.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BidData {
    pub bidder: AccountId,
    /// Free-form bidder label, shown when listing an auction.
    pub alias: Option<String>,
    /// Declared amount; the escrowed amount is always the sum of the
    /// carried coins of the bidder's denomination.
    pub amount: u64,
}

impl BidData {
    pub fn decode(raw: &[u8]) -> ContractResult<Self> {
        borsh::from_slice(raw).map_err(|_| ContractError::MalformedBid)
    }

    pub fn encode(&self) -> ContractResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| ContractError::MalformedBid)
    }
}
