use thiserror::Error;

/// Alias for results produced by contract evaluation.
pub type ContractResult<T> = Result<T, ContractError>;

/// The failure kinds a contract evaluation can surface.
///
/// Kinds are identifiers, never free-form strings, so every replica agrees
/// on the error identity of a failed instruction. Any failure aborts the
/// instruction and discards its accumulated state changes; there is no
/// local recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// A state-trie lookup found no value under the requested key.
    #[error("no value in the global state for the requested key")]
    NotFound,
    /// The instruction names a different contract than the one evaluated.
    #[error("instruction addresses the wrong contract")]
    WrongContract,
    /// A stored or supplied payload failed to decode.
    #[error("payload could not be decoded")]
    MalformedPayload,
    /// The `bid` argument failed to decode.
    #[error("bid argument could not be decoded")]
    MalformedBid,
    /// A required named argument is absent from the instruction.
    #[error("missing required argument `{0}`")]
    MissingArgument(&'static str),
    /// Bid or premature process against a closed auction.
    #[error("auction is closed")]
    AuctionClosed,
    /// Deletion attempted while the auction still accepts bids.
    #[error("auction is still open")]
    AuctionStillOpen,
    /// The seller tried to bid on their own auction.
    #[error("seller cannot bid on their own auction")]
    SellerCannotBid,
    /// The effective bid amount was zero.
    #[error("effective bid amount must be positive")]
    NonPositiveBid,
    /// An open-variant bid did not exceed the current highest bid.
    #[error("bid does not exceed the current highest bid")]
    BidNotHigher,
    /// A sealed-variant bid was below the bidder's previous bid.
    #[error("bid is below this bidder's previous bid")]
    BidNotIncreasing,
    /// The carried coins do not cover the bid increment to be escrowed.
    #[error("carried coins do not cover the bid increment")]
    BidNotCovered,
    /// The revealed salt and reserve price do not match the commitment.
    #[error("reveal does not match the reserve commitment")]
    CommitmentMismatch,
    /// The winning sealed bid did not reach the reserve price.
    #[error("winning bid does not reach the reserve price")]
    ReserveNotReached,
    /// A coin sub-invocation failed; the inner kind is preserved.
    #[error("coin sub-invocation failed: {0}")]
    CoinSubInvocation(Box<ContractError>),
    /// Checked coin arithmetic would have wrapped.
    #[error("coin arithmetic overflow")]
    Overflow,
    /// Coins of different denominations cannot be moved into one account.
    #[error("coin denominations are incompatible")]
    IncompatibleCoin,
    /// The invoked command is not part of the contract's interface.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    /// No constructor is registered under the contract id.
    #[error("no contract registered under id `{0}`")]
    UnknownContract(String),
    /// The instruction's signature set does not satisfy the owning policy.
    #[error("instruction is not authorized")]
    Unauthorized,
}

impl ContractError {
    /// Wrap a failure that happened inside a coin sub-invocation.
    pub fn sub_invocation(inner: ContractError) -> Self {
        Self::CoinSubInvocation(Box::new(inner))
    }
}
