//! Client side of the coin contract, used by contracts that escrow and
//! settle coins through sub-invocations.

use std::sync::Arc;

use log::debug;

use crate::errors::{ContractError, ContractResult};
use crate::instruction::{Arguments, Instruction, ARG_COINS, ARG_DESTINATION};
use crate::registry::ContractRegistry;
use crate::state::{StagedView, StateChange, StateView};
use crate::types::{AccountId, Coin, InstanceId};

/// Id the coin contract is registered under.
pub const CONTRACT_COIN_ID: &str = "coin";

/// Coin contract commands.
pub const CMD_MINT: &str = "mint";
pub const CMD_FETCH: &str = "fetch";
pub const CMD_STORE: &str = "store";
pub const CMD_TRANSFER: &str = "transfer";

/// Encode a coin amount the way coin-command arguments carry it.
pub fn encode_amount(amount: u64) -> Vec<u8> {
    amount.to_le_bytes().to_vec()
}

/// Decode a little-endian `u64` coin-command argument.
pub fn decode_amount(raw: &[u8]) -> ContractResult<u64> {
    raw.try_into()
        .map(u64::from_le_bytes)
        .map_err(|_| ContractError::MalformedPayload)
}

/// Sum the carried coins of one denomination, with checked arithmetic.
/// Coins of other denominations are ignored; they are not
/// addition-compatible with the account being credited.
pub fn effective_amount(coins: &[Coin], name: &InstanceId) -> ContractResult<u64> {
    let mut total: u64 = 0;
    for coin in coins.iter().filter(|coin| coin.name == *name) {
        total = total
            .checked_add(coin.value)
            .ok_or(ContractError::Overflow)?;
    }
    Ok(total)
}

/// Sub-invokes the coin contract on behalf of another contract.
///
/// Each call materialises a coin contract scoped to the target account's
/// bytes as seen through the changes accumulated so far, invokes it with a
/// synthetic instruction and splices the returned changes onto the
/// bridge's list in order. The calling contract observes nothing of the
/// coin contract beyond those returned changes, which keeps the composed
/// execution deterministic and modular.
pub struct CoinBridge<'a> {
    registry: &'a Arc<ContractRegistry>,
    view: &'a dyn StateView,
    changes: Vec<StateChange>,
}

impl<'a> CoinBridge<'a> {
    pub fn new(registry: &'a Arc<ContractRegistry>, view: &'a dyn StateView) -> Self {
        Self {
            registry,
            view,
            changes: Vec::new(),
        }
    }

    /// Read an account's coin denomination through the staged view.
    pub fn denomination(&self, account: &AccountId) -> ContractResult<InstanceId> {
        let staged = StagedView::new(self.view, &self.changes);
        let entry = staged.get_values(account)?;
        let coin: Coin =
            borsh::from_slice(&entry.value).map_err(|_| ContractError::MalformedPayload)?;
        Ok(coin.name)
    }

    /// Credit the carried coins into an account; returns the coins the
    /// account did not consume.
    pub fn store(&mut self, account: &AccountId, coins: Vec<Coin>) -> ContractResult<Vec<Coin>> {
        debug!("storing {} carried coin(s) into {account}", coins.len());
        let inst = Instruction::invoke(*account, CONTRACT_COIN_ID, CMD_STORE, Arguments::new());
        self.sub_invoke(inst, coins)
    }

    /// Move `amount` coins between two accounts of the same denomination.
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> ContractResult<()> {
        debug!("transferring {amount} from {from} to {to}");
        let args = Arguments::new()
            .with(ARG_COINS, encode_amount(amount))
            .with(ARG_DESTINATION, to.as_bytes().to_vec());
        let inst = Instruction::invoke(*from, CONTRACT_COIN_ID, CMD_TRANSFER, args);
        self.sub_invoke(inst, Vec::new())?;
        Ok(())
    }

    /// The accumulated coin state changes, in sub-invocation order.
    pub fn finish(self) -> Vec<StateChange> {
        self.changes
    }

    fn sub_invoke(&mut self, inst: Instruction, coins: Vec<Coin>) -> ContractResult<Vec<Coin>> {
        let staged = StagedView::new(self.view, &self.changes);
        let entry = staged
            .get_values(&inst.instance_id)
            .map_err(ContractError::sub_invocation)?;
        let contract = self
            .registry
            .construct(CONTRACT_COIN_ID, &entry.value)
            .map_err(ContractError::sub_invocation)?;
        let (changes, leftover) = contract
            .invoke(&staged, &inst, coins)
            .map_err(ContractError::sub_invocation)?;
        self.changes.extend(changes);
        Ok(leftover)
    }
}
