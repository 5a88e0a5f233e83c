use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use commons::{bail, ensure, ensure_eq, AccountId, ContractError, ContractResult};

/// Lifecycle of a sealed-bid auction.
///
/// The discriminants are part of the stored encoding and must never be
/// renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum AuctionState {
    Open = 1,
    Closed = 2,
    Processed = 3,
}

/// The reserve price, committed while bidding and revealed on close.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ReservePrice {
    /// Hex-encoded SHA-256 commitment over salt and price.
    Committed(String),
    Revealed(u64),
}

/// The stored payload of a sealed-bid auction instance.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AuctionData {
    pub good: String,
    pub seller: AccountId,
    /// Escrow account accumulating every live bid.
    pub deposit: AccountId,
    pub state: AuctionState,
    /// All accepted bids, one per bidder, in arrival order.
    pub bids: Vec<BidData>,
    pub reserve: ReservePrice,
    pub winner_account: Option<AccountId>,
}

/// One accumulated sealed bid.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BidData {
    pub bidder: AccountId,
    pub alias: Option<String>,
    pub amount: u64,
    /// The amount this bid replaced; zero for a bidder's first bid.
    pub prev_amount: u64,
}

/// The reveal argument of `close`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CloseData {
    pub salt: String,
    pub reserve_price: u64,
}

impl CloseData {
    pub fn decode(raw: &[u8]) -> ContractResult<Self> {
        borsh::from_slice(raw).map_err(|_| ContractError::MalformedPayload)
    }

    pub fn encode(&self) -> ContractResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| ContractError::MalformedPayload)
    }

    /// The commitment the reveal must reproduce:
    /// `hex(sha256(salt ∥ decimal(reserve_price)))`.
    pub fn commitment(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(self.reserve_price.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl BidData {
    pub fn decode(raw: &[u8]) -> ContractResult<Self> {
        borsh::from_slice(raw).map_err(|_| ContractError::MalformedBid)
    }

    pub fn encode(&self) -> ContractResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| ContractError::MalformedBid)
    }
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

    fn find_bid(&self, bidder: &AccountId) -> Option<usize> {
        self.bids.iter().position(|bid| bid.bidder == *bidder)
    }

    /// Accept a sealed bid, appending or monotonically raising it.
    ///
    /// Returns the escrow delta the caller must cover with carried coins:
    /// the full amount for a first bid, the increment for a raise.
    pub fn record_bid(
        &mut self,
        bidder: AccountId,
        alias: Option<String>,
        amount: u64,
    ) -> ContractResult<u64> {
        match self.find_bid(&bidder) {
            None => {
                ensure!(amount > 0, ContractError::NonPositiveBid);
                self.bids.push(BidData {
                    bidder,
                    alias,
                    amount,
                    prev_amount: 0,
                });
                Ok(amount)
            }
            Some(index) => {
                let previous = self.bids[index].amount;
                ensure!(amount >= previous, ContractError::BidNotIncreasing);
                self.bids[index].amount = amount;
                self.bids[index].prev_amount = previous;
                Ok(amount - previous)
            }
        }
    }

    /// Verify the reveal against the commitment and flip to `Closed`.
    ///
    /// The bids stay in place: winner selection is deferred to `process`
    /// so that closing leaks nothing but the reserve itself.
    pub fn reveal(&mut self, close: &CloseData) -> ContractResult<()> {
        ensure!(self.is_open(), ContractError::AuctionClosed);
        match &self.reserve {
            ReservePrice::Committed(commitment) => {
                ensure_eq!(
                    close.commitment(),
                    *commitment,
                    ContractError::CommitmentMismatch
                );
            }
            ReservePrice::Revealed(reserve) => {
                ensure_eq!(
                    close.reserve_price,
                    *reserve,
                    ContractError::CommitmentMismatch
                );
            }
        }
        self.reserve = ReservePrice::Revealed(close.reserve_price);
        self.state = AuctionState::Closed;
        Ok(())
    }

    /// Settle the auction: pick the winner, clear the tally and flip to
    /// `Processed`.
    ///
    /// Returns the winning bid and the losing bids in insertion order;
    /// the caller owes the winner's amount to the seller and each losing
    /// amount back to its bidder. Ties go to the earliest bid. A winner
    /// at or below the reserve fails with `ReserveNotReached` and leaves
    /// the auction `Closed`.
    pub fn settle(&mut self) -> ContractResult<(BidData, Vec<BidData>)> {
        ensure_eq!(
            self.state,
            AuctionState::Closed,
            ContractError::AuctionClosed
        );
        let reserve = match self.reserve {
            ReservePrice::Revealed(reserve) => reserve,
            // Unreachable through the contract: close always reveals.
            ReservePrice::Committed(_) => bail!(ContractError::CommitmentMismatch),
        };

        let mut winner_index = None;
        let mut winning_amount = 0u64;
        for (index, bid) in self.bids.iter().enumerate() {
            if bid.amount > winning_amount {
                winning_amount = bid.amount;
                winner_index = Some(index);
            }
        }
        let winner_index = match winner_index {
            Some(index) if winning_amount > reserve => index,
            _ => bail!(ContractError::ReserveNotReached),
        };

        let winner = self.bids[winner_index].clone();
        let losers: Vec<BidData> = self
            .bids
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != winner_index)
            .map(|(_, bid)| bid.clone())
            .collect();

        self.state = AuctionState::Processed;
        self.winner_account = Some(winner.bidder);
        self.bids.clear();
        Ok((winner, losers))
    }
}
