//! In-memory ledger and helpers for contract tests.
//!
//! The ledger plays the host's part: it implements [`StateView`] over a
//! plain map, runs transactions through the [`Runtime`] and commits the
//! returned change lists atomically. Tests drive contracts exactly the
//! way the real host would, instruction by instruction.

use std::collections::BTreeMap;
use std::sync::Arc;

use borsh::BorshDeserialize;
use log::debug;

use crate::coins::{encode_amount, CMD_MINT, CONTRACT_COIN_ID};
use crate::errors::{ContractError, ContractResult};
use crate::instruction::{Arguments, Instruction, ARG_COINS};
use crate::registry::ContractRegistry;
use crate::runtime::Runtime;
use crate::state::{StateChange, StateChangeKind, StateEntry, StateView};
use crate::types::{AccountId, Coin, InstanceId};

/// Contract id recorded on the genesis policy instance. Nothing ever
/// invokes it; it only has to resolve as an owning policy.
pub const GENESIS_POLICY_CONTRACT: &str = "policy";

/// The policy rules a genesis configuration declares for the auction
/// system. Rule evaluation belongs to the host; the ledger model only
/// names them.
pub const GENESIS_RULES: &[&str] = &[
    "spawn:auction",
    "invoke:auction.bid",
    "invoke:auction.close",
    "invoke:auction.process",
    "spawn:coin",
    "invoke:coin.mint",
    "invoke:coin.fetch",
];

/// Hook `env_logger` up for a test binary; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An in-memory stand-in for the replicated ledger.
pub struct TestLedger {
    runtime: Runtime,
    entries: BTreeMap<InstanceId, StateEntry>,
    genesis: InstanceId,
    counter: u64,
}

impl TestLedger {
    /// A fresh ledger seeded with a genesis policy instance that owns
    /// everything spawned in the tests.
    pub fn new(registry: Arc<ContractRegistry>) -> Self {
        debug!("genesis declares rules {:?}", GENESIS_RULES);
        let genesis = InstanceId::from_tag(b"genesis-policy");
        let mut entries = BTreeMap::new();
        entries.insert(
            genesis,
            StateEntry {
                value: Vec::new(),
                version: 0,
                contract_id: GENESIS_POLICY_CONTRACT.to_string(),
                policy_id: genesis,
            },
        );
        Self {
            runtime: Runtime::new(registry),
            entries,
            genesis,
            counter: 0,
        }
    }

    /// The genesis policy instance id, used as every spawn destination.
    pub fn genesis(&self) -> InstanceId {
        self.genesis
    }

    /// The next signer replay counter.
    pub fn next_counter(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    /// Run one transaction; on success the changes are committed and
    /// returned, on failure the ledger is untouched.
    pub fn execute(&mut self, instructions: &[Instruction]) -> ContractResult<Vec<StateChange>> {
        let (changes, leftover) = self.runtime.execute_transaction(self, instructions)?;
        if !leftover.is_empty() {
            debug!("transaction left {} coin(s) uncarried", leftover.len());
        }
        self.apply(&changes);
        Ok(changes)
    }

    /// Commit a change list to the map, bumping versions like the trie.
    pub fn apply(&mut self, changes: &[StateChange]) {
        for change in changes {
            match change.kind {
                StateChangeKind::Create => {
                    self.entries.insert(
                        change.instance_id,
                        StateEntry {
                            value: change.value.clone(),
                            version: 0,
                            contract_id: change.contract_id.clone(),
                            policy_id: change.policy_id,
                        },
                    );
                }
                StateChangeKind::Update => {
                    let version = self
                        .entries
                        .get(&change.instance_id)
                        .map(|entry| entry.version + 1)
                        .unwrap_or(0);
                    self.entries.insert(
                        change.instance_id,
                        StateEntry {
                            value: change.value.clone(),
                            version,
                            contract_id: change.contract_id.clone(),
                            policy_id: change.policy_id,
                        },
                    );
                }
                StateChangeKind::Remove => {
                    self.entries.remove(&change.instance_id);
                }
            }
        }
    }

    /// Spawn a fresh coin account under the genesis policy.
    pub fn spawn_account(&mut self) -> ContractResult<AccountId> {
        let counter = self.next_counter();
        let inst = Instruction::spawn(self.genesis, CONTRACT_COIN_ID, Arguments::new())
            .with_counters(vec![counter]);
        let account = inst.derive_id("");
        self.execute(&[inst])?;
        Ok(account)
    }

    /// Mint coins into an account (the privileged genesis credit).
    pub fn mint(&mut self, account: &AccountId, amount: u64) -> ContractResult<()> {
        let counter = self.next_counter();
        let inst = Instruction::invoke(
            *account,
            CONTRACT_COIN_ID,
            CMD_MINT,
            Arguments::new().with(ARG_COINS, encode_amount(amount)),
        )
        .with_counters(vec![counter]);
        self.execute(&[inst])?;
        Ok(())
    }

    /// Spawn an account and mint a starting balance into it.
    pub fn funded_account(&mut self, amount: u64) -> ContractResult<AccountId> {
        let account = self.spawn_account()?;
        self.mint(&account, amount)?;
        Ok(account)
    }

    /// An account's coin balance; missing accounts read as zero.
    pub fn balance(&self, account: &AccountId) -> u64 {
        self.get_values(account)
            .ok()
            .and_then(|entry| borsh::from_slice::<Coin>(&entry.value).ok())
            .map(|coin| coin.value)
            .unwrap_or(0)
    }

    /// Decode the payload stored under a key.
    pub fn decode_value<T: BorshDeserialize>(&self, key: &InstanceId) -> ContractResult<T> {
        let entry = self.get_values(key)?;
        borsh::from_slice(&entry.value).map_err(|_| ContractError::MalformedPayload)
    }
}

impl StateView for TestLedger {
    fn get_values(&self, key: &InstanceId) -> ContractResult<StateEntry> {
        self.entries
            .get(key)
            .cloned()
            .ok_or(ContractError::NotFound)
    }
}
