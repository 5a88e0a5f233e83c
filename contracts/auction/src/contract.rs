use std::sync::Arc;

use commons::{
    bail, effective_amount, ensure, ensure_eq, ensure_ne, verify_signer_counters,
    verify_with_policy, Coin, CoinBridge, Contract, ContractError, ContractRegistry,
    ContractResult, Instruction, InstructionAction, Outcome, StateChange, StateView, ARG_AUCTION,
    ARG_BID,
};
use log::{debug, info};

use crate::state::{AuctionData, AuctionState, BidData};

/// Id the open auction contract is registered under.
pub const CONTRACT_AUCTION_ID: &str = "auction";

/// Auction commands.
pub const CMD_BID: &str = "bid";
pub const CMD_CLOSE: &str = "close";

/// An open-auction contract instance.
///
/// Its only per-call memory is the auction decoded from its own account;
/// the registry handle is what lets it materialise the coin contract for
/// escrow and settlement sub-invocations.
pub struct AuctionContract {
    auction: Option<AuctionData>,
    registry: Arc<ContractRegistry>,
}

/// Constructor registered under [`CONTRACT_AUCTION_ID`].
pub fn auction_constructor(
    registry: Arc<ContractRegistry>,
    stored: &[u8],
) -> ContractResult<Box<dyn Contract>> {
    let auction = if stored.is_empty() {
        None
    } else {
        Some(AuctionData::decode(stored)?)
    };
    Ok(Box::new(AuctionContract { auction, registry }))
}

impl AuctionContract {
    fn auction(&self) -> ContractResult<AuctionData> {
        self.auction.clone().ok_or(ContractError::MalformedPayload)
    }
}

impl Contract for AuctionContract {
    /// Anyone with a usable signature counter may bid; the owning policy
    /// still gates spawning, closing and deletion.
    fn verify_instruction(&self, view: &dyn StateView, inst: &Instruction) -> ContractResult<()> {
        if let InstructionAction::Invoke { command, .. } = &inst.action {
            if command == CMD_BID {
                return verify_signer_counters(inst);
            }
        }
        verify_with_policy(view, inst)
    }

    fn spawn(&self, view: &dyn StateView, inst: &Instruction, coins: Vec<Coin>) -> Outcome {
        // The owning policy is inherited from the destination key.
        let entry = view.get_values(&inst.instance_id)?;
        ensure_eq!(
            inst.contract_id(),
            CONTRACT_AUCTION_ID,
            ContractError::WrongContract
        );

        let raw = inst.args().require(ARG_AUCTION)?;
        let auction = AuctionData::decode(raw)?;
        ensure!(auction.is_open(), ContractError::MalformedPayload);
        ensure!(auction.highest_bid == 0, ContractError::MalformedPayload);
        ensure!(
            auction.highest_bidder.is_zero(),
            ContractError::MalformedPayload
        );

        let auction_id = inst.derive_id("");
        info!(
            "spawning auction {auction_id} for {:?} by seller {}",
            auction.good, auction.seller
        );
        // The instance stores the argument bytes verbatim, so the spawn
        // is byte-stable across codec versions.
        let changes = vec![StateChange::create(
            auction_id,
            CONTRACT_AUCTION_ID,
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
                debug!(
                    "bid by {} carries {effective} effective against highest {}",
                    bid.bidder, auction.highest_bid
                );

                let displaced = auction.record_bid(bid.bidder, effective)?;
                if let Some((previous_bidder, previous_amount)) = displaced {
                    bridge.transfer(&auction.deposit, &previous_bidder, previous_amount)?;
                }
                let leftover = bridge.store(&auction.deposit, coins)?;

                // The auction update leads, the coin changes follow, in
                // sub-invocation order.
                let mut changes = vec![StateChange::update(
                    inst.instance_id,
                    CONTRACT_AUCTION_ID,
                    auction.encode()?,
                    entry.policy_id,
                )];
                changes.extend(bridge.finish());
                Ok((changes, leftover))
            }
            CMD_CLOSE => {
                let settled = auction.close()?;

                let mut bridge = CoinBridge::new(&self.registry, view);
                if settled > 0 {
                    info!(
                        "closing auction {}: settling {settled} to {}",
                        inst.instance_id, auction.seller
                    );
                    bridge.transfer(&auction.deposit, &auction.seller, settled)?;
                }

                let mut changes = bridge.finish();
                changes.push(StateChange::update(
                    inst.instance_id,
                    CONTRACT_AUCTION_ID,
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
            CONTRACT_AUCTION_ID,
            entry.policy_id,
        )];
        Ok((changes, coins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coin::coin_constructor;
    use commons::test_infrastructure::{init_logging, TestLedger};
    use commons::{encode_amount, AccountId, Arguments, InstanceId, ARG_COINS, CMD_FETCH,
        CONTRACT_COIN_ID};

    const GOOD: &str = "bananas";

    fn new_ledger() -> TestLedger {
        init_logging();
        let registry = ContractRegistry::builder()
            .register(CONTRACT_COIN_ID, coin_constructor)
            .register(CONTRACT_AUCTION_ID, auction_constructor)
            .freeze();
        TestLedger::new(registry)
    }

    fn create_seller_and_deposit(ledger: &mut TestLedger) -> (AccountId, AccountId) {
        let seller = ledger.spawn_account().expect("seller account");
        let deposit = ledger.spawn_account().expect("deposit account");
        (seller, deposit)
    }

    fn create_auction(
        ledger: &mut TestLedger,
        seller: AccountId,
        deposit: AccountId,
    ) -> (InstanceId, AuctionData) {
        let auction = AuctionData {
            good: GOOD.to_string(),
            seller,
            deposit,
            state: AuctionState::Open,
            highest_bid: 0,
            highest_bidder: InstanceId::zero(),
        };
        let counter = ledger.next_counter();
        let inst = Instruction::spawn(
            ledger.genesis(),
            CONTRACT_AUCTION_ID,
            Arguments::new().with(ARG_AUCTION, auction.encode().expect("encoding cannot fail")),
        )
        .with_counters(vec![counter]);
        let auction_id = inst.derive_id("");
        ledger.execute(&[inst]).expect("spawn should pass");
        (auction_id, auction)
    }

    /// One fetch-then-bid transaction, the way a client submits it.
    fn bid(
        ledger: &mut TestLedger,
        auction_id: InstanceId,
        bidder: AccountId,
        amount: u64,
    ) -> ContractResult<Vec<StateChange>> {
        let fetch_counter = ledger.next_counter();
        let bid_counter = ledger.next_counter();
        let fetch = Instruction::invoke(
            bidder,
            CONTRACT_COIN_ID,
            CMD_FETCH,
            Arguments::new().with(ARG_COINS, encode_amount(amount)),
        )
        .with_counters(vec![fetch_counter]);
        let bid_data = BidData {
            bidder,
            alias: None,
            amount,
        };
        let bid = Instruction::invoke(
            auction_id,
            CONTRACT_AUCTION_ID,
            CMD_BID,
            Arguments::new().with(ARG_BID, bid_data.encode().expect("encoding cannot fail")),
        )
        .with_counters(vec![bid_counter]);
        ledger.execute(&[fetch, bid])
    }

    fn close(ledger: &mut TestLedger, auction_id: InstanceId) -> ContractResult<Vec<StateChange>> {
        let counter = ledger.next_counter();
        let inst = Instruction::invoke(
            auction_id,
            CONTRACT_AUCTION_ID,
            CMD_CLOSE,
            Arguments::new(),
        )
        .with_counters(vec![counter]);
        ledger.execute(&[inst])
    }

    #[test]
    fn spawn_stores_the_payload_verbatim() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let (auction_id, auction) = create_auction(&mut ledger, seller, deposit);

        let stored: AuctionData = ledger.decode_value(&auction_id).expect("auction decodes");
        assert_eq!(stored, auction);
    }

    #[test]
    fn spawn_requires_the_auction_argument() {
        let mut ledger = new_ledger();
        let counter = ledger.next_counter();
        let inst = Instruction::spawn(ledger.genesis(), CONTRACT_AUCTION_ID, Arguments::new())
            .with_counters(vec![counter]);
        assert_eq!(
            ledger.execute(&[inst]),
            Err(ContractError::MissingArgument(ARG_AUCTION))
        );
    }

    #[test]
    fn spawn_rejects_a_closed_payload() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let auction = AuctionData {
            good: GOOD.to_string(),
            seller,
            deposit,
            state: AuctionState::Closed,
            highest_bid: 0,
            highest_bidder: InstanceId::zero(),
        };
        let counter = ledger.next_counter();
        let inst = Instruction::spawn(
            ledger.genesis(),
            CONTRACT_AUCTION_ID,
            Arguments::new().with(ARG_AUCTION, auction.encode().expect("encoding cannot fail")),
        )
        .with_counters(vec![counter]);
        assert_eq!(
            ledger.execute(&[inst]),
            Err(ContractError::MalformedPayload)
        );
    }

    #[test]
    fn spawn_rejects_the_wrong_contract_id() {
        let registry = ContractRegistry::builder()
            .register(CONTRACT_COIN_ID, coin_constructor)
            .register(CONTRACT_AUCTION_ID, auction_constructor)
            .freeze();
        let ledger = TestLedger::new(Arc::clone(&registry));

        let contract = registry
            .construct(CONTRACT_AUCTION_ID, &[])
            .expect("constructor should pass");
        let inst = Instruction::spawn(ledger.genesis(), CONTRACT_COIN_ID, Arguments::new())
            .with_counters(vec![1]);
        assert_eq!(
            contract.spawn(&ledger, &inst, Vec::new()).err(),
            Some(ContractError::WrongContract)
        );
    }

    /// Two bidders outbid each other; the close settles the highest bid
    /// to the seller and the total supply never changes.
    #[test]
    fn bid_and_close_settles_the_highest_bid() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let bidder1 = ledger.funded_account(200).expect("bidder one");
        let bidder2 = ledger.funded_account(200).expect("bidder two");
        let (auction_id, _) = create_auction(&mut ledger, seller, deposit);

        bid(&mut ledger, auction_id, bidder1, 20).expect("first bid should pass");
        assert_eq!(ledger.balance(&bidder1), 180);
        assert_eq!(ledger.balance(&deposit), 20);
        let stored: AuctionData = ledger.decode_value(&auction_id).expect("auction decodes");
        assert_eq!(stored.highest_bid, 20);
        assert_eq!(stored.highest_bidder, bidder1);

        bid(&mut ledger, auction_id, bidder2, 40).expect("higher bid should pass");
        assert_eq!(ledger.balance(&bidder1), 200);
        assert_eq!(ledger.balance(&bidder2), 160);
        assert_eq!(ledger.balance(&deposit), 40);
        let stored: AuctionData = ledger.decode_value(&auction_id).expect("auction decodes");
        assert_eq!(stored.highest_bid, 40);
        assert_eq!(stored.highest_bidder, bidder2);

        close(&mut ledger, auction_id).expect("close should pass");
        assert_eq!(ledger.balance(&seller), 40);
        assert_eq!(ledger.balance(&deposit), 0);
        assert_eq!(ledger.balance(&bidder2), 160);
        let stored: AuctionData = ledger.decode_value(&auction_id).expect("auction decodes");
        assert_eq!(stored.state, AuctionState::Closed);

        // Conservation: every coin is still on one of the four accounts.
        let total = ledger.balance(&seller)
            + ledger.balance(&deposit)
            + ledger.balance(&bidder1)
            + ledger.balance(&bidder2);
        assert_eq!(total, 400);
    }

    #[test]
    fn a_bid_that_is_not_higher_is_rejected() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let bidder1 = ledger.funded_account(200).expect("bidder one");
        let bidder2 = ledger.funded_account(200).expect("bidder two");
        let (auction_id, _) = create_auction(&mut ledger, seller, deposit);

        bid(&mut ledger, auction_id, bidder2, 40).expect("first bid should pass");
        assert_eq!(
            bid(&mut ledger, auction_id, bidder1, 40),
            Err(ContractError::BidNotHigher)
        );

        // The whole fetch-and-bid transaction aborted.
        assert_eq!(ledger.balance(&bidder1), 200);
        assert_eq!(ledger.balance(&deposit), 40);
    }

    #[test]
    fn bidding_after_close_fails() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let bidder = ledger.funded_account(200).expect("bidder");
        let (auction_id, _) = create_auction(&mut ledger, seller, deposit);

        bid(&mut ledger, auction_id, bidder, 20).expect("bid should pass");
        close(&mut ledger, auction_id).expect("close should pass");

        assert_eq!(
            bid(&mut ledger, auction_id, bidder, 50),
            Err(ContractError::AuctionClosed)
        );
        assert_eq!(ledger.balance(&bidder), 180);
        assert_eq!(ledger.balance(&seller), 20);
    }

    #[test]
    fn the_seller_cannot_bid() {
        let mut ledger = new_ledger();
        let seller = ledger.funded_account(200).expect("seller");
        let deposit = ledger.spawn_account().expect("deposit");
        let (auction_id, _) = create_auction(&mut ledger, seller, deposit);

        assert_eq!(
            bid(&mut ledger, auction_id, seller, 50),
            Err(ContractError::SellerCannotBid)
        );
        assert_eq!(ledger.balance(&seller), 200);
    }

    #[test]
    fn a_zero_bid_moves_no_coins() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let bidder = ledger.funded_account(200).expect("bidder");
        let (auction_id, _) = create_auction(&mut ledger, seller, deposit);

        assert_eq!(
            bid(&mut ledger, auction_id, bidder, 0),
            Err(ContractError::NonPositiveBid)
        );
        assert_eq!(ledger.balance(&bidder), 200);
        assert_eq!(ledger.balance(&deposit), 0);
    }

    #[test]
    fn closing_twice_fails_without_resettling() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let bidder = ledger.funded_account(200).expect("bidder");
        let (auction_id, _) = create_auction(&mut ledger, seller, deposit);

        bid(&mut ledger, auction_id, bidder, 20).expect("bid should pass");
        close(&mut ledger, auction_id).expect("close should pass");
        assert_eq!(ledger.balance(&seller), 20);

        assert_eq!(
            close(&mut ledger, auction_id),
            Err(ContractError::AuctionClosed)
        );
        assert_eq!(ledger.balance(&seller), 20);
    }

    #[test]
    fn closing_without_bids_moves_no_coins() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let (auction_id, _) = create_auction(&mut ledger, seller, deposit);

        let changes = close(&mut ledger, auction_id).expect("close should pass");
        // Only the auction update itself; no coin sub-invocations.
        assert_eq!(changes.len(), 1);
        assert_eq!(ledger.balance(&seller), 0);
    }

    #[test]
    fn delete_requires_a_closed_auction() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let (auction_id, _) = create_auction(&mut ledger, seller, deposit);

        let counter = ledger.next_counter();
        let delete =
            Instruction::delete(auction_id, CONTRACT_AUCTION_ID).with_counters(vec![counter]);
        assert_eq!(
            ledger.execute(&[delete]),
            Err(ContractError::AuctionStillOpen)
        );

        close(&mut ledger, auction_id).expect("close should pass");
        let counter = ledger.next_counter();
        let delete =
            Instruction::delete(auction_id, CONTRACT_AUCTION_ID).with_counters(vec![counter]);
        ledger.execute(&[delete]).expect("delete should pass");
        assert_eq!(
            ledger.decode_value::<AuctionData>(&auction_id).err(),
            Some(ContractError::NotFound)
        );
    }

    #[test]
    fn bids_are_open_to_any_signed_caller() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let bidder = ledger.funded_account(200).expect("bidder");
        let (auction_id, _) = create_auction(&mut ledger, seller, deposit);

        // A bid without a signature counter set is still rejected.
        let bid_data = BidData {
            bidder,
            alias: Some("alice".to_string()),
            amount: 20,
        };
        let unsigned = Instruction::invoke(
            auction_id,
            CONTRACT_AUCTION_ID,
            CMD_BID,
            Arguments::new().with(ARG_BID, bid_data.encode().expect("encoding cannot fail")),
        );
        assert_eq!(
            ledger.execute(&[unsigned]),
            Err(ContractError::Unauthorized)
        );

        // With a counter the same instruction passes, carried coins and
        // all, even though the bidder does not own the auction's policy.
        bid(&mut ledger, auction_id, bidder, 20).expect("signed bid should pass");
    }

    #[test]
    fn a_missing_deposit_account_surfaces_the_inner_kind() {
        let mut ledger = new_ledger();
        let seller = ledger.spawn_account().expect("seller");
        let bidder = ledger.funded_account(200).expect("bidder");
        // The deposit id resolves to nothing in the trie.
        let (auction_id, _) = create_auction(&mut ledger, seller, InstanceId::from_tag(b"void"));

        assert_eq!(
            bid(&mut ledger, auction_id, bidder, 20),
            Err(ContractError::sub_invocation(ContractError::NotFound))
        );
        assert_eq!(ledger.balance(&bidder), 200);
    }

    #[test]
    fn unknown_commands_are_rejected() {
        let mut ledger = new_ledger();
        let (seller, deposit) = create_seller_and_deposit(&mut ledger);
        let (auction_id, _) = create_auction(&mut ledger, seller, deposit);

        let counter = ledger.next_counter();
        let inst = Instruction::invoke(auction_id, CONTRACT_AUCTION_ID, "drop", Arguments::new())
            .with_counters(vec![counter]);
        assert_eq!(
            ledger.execute(&[inst]),
            Err(ContractError::UnknownCommand("drop".to_string()))
        );
    }

    /// Two identical ledgers produce byte-identical change lists for the
    /// same instruction bytes.
    #[test]
    fn execution_is_deterministic() {
        let run = || -> Vec<u8> {
            let mut ledger = new_ledger();
            let (seller, deposit) = create_seller_and_deposit(&mut ledger);
            let bidder = ledger.funded_account(200).expect("bidder");
            let (auction_id, _) = create_auction(&mut ledger, seller, deposit);
            let changes = bid(&mut ledger, auction_id, bidder, 20).expect("bid should pass");
            borsh::to_vec(&changes).expect("encoding cannot fail")
        };
        assert_eq!(run(), run());
    }
}
