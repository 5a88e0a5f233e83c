use std::sync::Arc;

use commons::{
    bail, effective_amount, ensure, ensure_eq, ensure_ne, verify_signer_counters,
    verify_with_policy, Coin, CoinBridge, Contract, ContractError, ContractRegistry,
    ContractResult, Instruction, InstructionAction, Outcome, StateChange, StateView, ARG_AUCTION,
    ARG_BID, ARG_CLOSE,
};
use log::{debug, info};

use crate::state::{AuctionData, BidData, CloseData};

/// Id the sealed-bid auction contract is registered under.
pub const CONTRACT_SB_AUCTION_ID: &str = "sb_auction";

/// Sealed-bid auction commands.
pub const CMD_BID: &str = "bid";
pub const CMD_CLOSE: &str = "close";
pub const CMD_PROCESS: &str = "process";

/// A sealed-bid auction contract instance.
pub struct SealedBidAuctionContract {
    auction: Option<AuctionData>,
    registry: Arc<ContractRegistry>,
}

/// Constructor registered under [`CONTRACT_SB_AUCTION_ID`].
pub fn sb_auction_constructor(
    registry: Arc<ContractRegistry>,
    stored: &[u8],
) -> ContractResult<Box<dyn Contract>> {
    let auction = if stored.is_empty() {
        None
    } else {
        Some(AuctionData::decode(stored)?)
    };
    Ok(Box::new(SealedBidAuctionContract { auction, registry }))
}

impl SealedBidAuctionContract {
    fn auction(&self) -> ContractResult<AuctionData> {
        self.auction.clone().ok_or(ContractError::MalformedPayload)
    }
}

impl Contract for SealedBidAuctionContract {
    /// Anyone with a usable signature counter may bid; the owning policy
    /// still gates spawning, closing, processing and deletion.
    fn verify_instruction(&self, view: &dyn StateView, inst: &Instruction) -> ContractResult<()> {
        if let InstructionAction::Invoke { command, .. } = &inst.action {
            if command == CMD_BID {
                return verify_signer_counters(inst);
            }
        }
        verify_with_policy(view, inst)
    }

    fn spawn(&self, view: &dyn StateView, inst: &Instruction, coins: Vec<Coin>) -> Outcome {
        let entry = view.get_values(&inst.instance_id)?;
        ensure_eq!(
            inst.contract_id(),
            CONTRACT_SB_AUCTION_ID,
            ContractError::WrongContract
        );

        let raw = inst.args().require(ARG_AUCTION)?;
        let auction = AuctionData::decode(raw)?;
        ensure!(auction.is_open(), ContractError::MalformedPayload);
        ensure!(auction.bids.is_empty(), ContractError::MalformedPayload);
        ensure!(
            auction.winner_account.is_none(),
            ContractError::MalformedPayload
        );

        let auction_id = inst.derive_id("");
        info!(
            "spawning sealed-bid auction {auction_id} for {:?} by seller {}",
            auction.good, auction.seller
        );
        let changes = vec![StateChange::create(
            auction_id,
            CONTRACT_SB_AUCTION_ID,
            raw.to_vec(),
            entry.policy_id,
        )];
        Ok((changes, coins))
    }

    fn invoke(&self, view: &dyn StateView, inst: &Instruction, coins: Vec<Coin>) -> Outcome {
        let entry = view.get_values(&inst.instance_id)?;
        let InstructionAction::Invoke { command, args, .. } = &inst.action else {
            bail!(ContractError::UnknownCommand("invoke".to_string()));
        };

        let mut auction = self.auction()?;

        match command.as_str() {
            CMD_BID => {
                ensure!(auction.is_open(), ContractError::AuctionClosed);
                let bid = BidData::decode(args.require(ARG_BID)?)?;
                ensure_ne!(bid.bidder, auction.seller, ContractError::SellerCannotBid);

                let mut bridge = CoinBridge::new(&self.registry, view);
                let name = bridge.denomination(&bid.bidder)?;
                let effective = effective_amount(&coins, &name)?;

                let delta = auction.record_bid(bid.bidder, bid.alias.clone(), bid.amount)?;
                debug!(
                    "sealed bid by {} for {}: escrowing increment {delta}",
                    bid.bidder, bid.amount
                );

                let leftover = if delta > 0 {
                    ensure!(effective >= delta, ContractError::BidNotCovered);
                    // Escrow exactly the increment; any surplus of the
                    // bidder's denomination rides on with the foreign
                    // coins to the next instruction.
                    let mut leftover: Vec<Coin> =
                        coins.into_iter().filter(|coin| coin.name != name).collect();
                    let surplus = effective - delta;
                    if surplus > 0 {
                        leftover.push(Coin::new(name, surplus));
                    }
                    let unconsumed =
                        bridge.store(&auction.deposit, vec![Coin::new(name, delta)])?;
                    leftover.extend(unconsumed);
                    leftover
                } else {
                    coins
                };

                let mut changes = vec![StateChange::update(
                    inst.instance_id,
                    CONTRACT_SB_AUCTION_ID,
                    auction.encode()?,
                    entry.policy_id,
                )];
                changes.extend(bridge.finish());
                Ok((changes, leftover))
            }
            CMD_CLOSE => {
                let close = CloseData::decode(args.require(ARG_CLOSE)?)?;
                auction.reveal(&close)?;
                info!(
                    "closing sealed-bid auction {} at revealed reserve {}",
                    inst.instance_id, close.reserve_price
                );

                // The close only reveals and flips the state; settlement
                // and refunds wait for `process`.
                let changes = vec![StateChange::update(
                    inst.instance_id,
                    CONTRACT_SB_AUCTION_ID,
                    auction.encode()?,
                    entry.policy_id,
                )];
                Ok((changes, coins))
            }
            CMD_PROCESS => {
                let (winner, losers) = auction.settle()?;
                info!(
                    "processing auction {}: winner {} at {}",
                    inst.instance_id, winner.bidder, winner.amount
                );

                let mut bridge = CoinBridge::new(&self.registry, view);
                bridge.transfer(&auction.deposit, &auction.seller, winner.amount)?;
                for loser in &losers {
                    bridge.transfer(&auction.deposit, &loser.bidder, loser.amount)?;
                }

                let mut changes = bridge.finish();
                changes.push(StateChange::update(
                    inst.instance_id,
                    CONTRACT_SB_AUCTION_ID,
                    auction.encode()?,
                    entry.policy_id,
                ));
                Ok((changes, coins))
            }
            other => bail!(ContractError::UnknownCommand(other.to_string())),
        }
    }

    fn delete(&self, view: &dyn StateView, inst: &Instruction, coins: Vec<Coin>) -> Outcome {
        let entry = view.get_values(&inst.instance_id)?;
        let auction = self.auction()?;
        ensure!(!auction.is_open(), ContractError::AuctionStillOpen);

        let changes = vec![StateChange::remove(
            inst.instance_id,
            CONTRACT_SB_AUCTION_ID,
            entry.policy_id,
        )];
        Ok((changes, coins))
    }
}
