use std::sync::Arc;

use commons::{
    bail, decode_amount, ensure, ensure_eq, Coin, Contract, ContractError, ContractRegistry,
    ContractResult, Instruction, InstructionAction, InstanceId, Outcome, StateChange, StateView,
    ARG_COINS, ARG_COIN_ID, ARG_DESTINATION, CMD_FETCH, CMD_MINT, CMD_STORE, CMD_TRANSFER,
    CONTRACT_COIN_ID,
};
use log::debug;

/// Denomination of accounts spawned without a `coinID` override.
pub fn default_coin_name() -> InstanceId {
    InstanceId::from_tag(b"auctionCoin")
}

/// A coin contract instance, scoped to one account's decoded payload.
pub struct CoinContract {
    account: Coin,
}

/// Constructor registered under [`CONTRACT_COIN_ID`].
pub fn coin_constructor(
    _registry: Arc<ContractRegistry>,
    stored: &[u8],
) -> ContractResult<Box<dyn Contract>> {
    let account = if stored.is_empty() {
        Coin::new(default_coin_name(), 0)
    } else {
        borsh::from_slice(stored).map_err(|_| ContractError::MalformedPayload)?
    };
    Ok(Box::new(CoinContract { account }))
}

fn encode(account: &Coin) -> ContractResult<Vec<u8>> {
    borsh::to_vec(account).map_err(|_| ContractError::MalformedPayload)
}

impl Contract for CoinContract {
    fn spawn(&self, view: &dyn StateView, inst: &Instruction, coins: Vec<Coin>) -> Outcome {
        let entry = view.get_values(&inst.instance_id)?;
        ensure_eq!(
            inst.contract_id(),
            CONTRACT_COIN_ID,
            ContractError::WrongContract
        );

        let name = match inst.args().search(ARG_COIN_ID) {
            Some(raw) => InstanceId::from_slice(raw)?,
            None => default_coin_name(),
        };
        let account = Coin::new(name, 0);

        let account_id = inst.derive_id("");
        debug!("spawning coin account {account_id} of denomination {name}");
        let changes = vec![StateChange::create(
            account_id,
            CONTRACT_COIN_ID,
            encode(&account)?,
            entry.policy_id,
        )];
        Ok((changes, coins))
    }

    fn invoke(&self, view: &dyn StateView, inst: &Instruction, coins: Vec<Coin>) -> Outcome {
        let entry = view.get_values(&inst.instance_id)?;
        let InstructionAction::Invoke { command, args, .. } = &inst.action else {
            bail!(ContractError::UnknownCommand("invoke".to_string()));
        };

        let mut account = self.account;
        let mut carried = coins;

        match command.as_str() {
            CMD_MINT => {
                let amount = decode_amount(args.require(ARG_COINS)?)?;
                account.safe_add(amount)?;
                debug!("minted {amount} into {}", inst.instance_id);
            }
            CMD_FETCH => {
                let amount = decode_amount(args.require(ARG_COINS)?)?;
                account.safe_sub(amount)?;
                carried.push(Coin::new(account.name, amount));
                debug!("fetched {amount} from {}", inst.instance_id);
            }
            CMD_STORE => {
                let mut unconsumed = Vec::new();
                for coin in carried {
                    if coin.name == account.name {
                        account.safe_add(coin.value)?;
                    } else {
                        unconsumed.push(coin);
                    }
                }
                carried = unconsumed;
            }
            CMD_TRANSFER => {
                let amount = decode_amount(args.require(ARG_COINS)?)?;
                let destination = InstanceId::from_slice(args.require(ARG_DESTINATION)?)?;
                // A self-transfer would apply the credit on top of the
                // stale pre-debit balance and mint coins out of thin air.
                ensure!(
                    destination != inst.instance_id,
                    ContractError::MalformedPayload
                );

                account.safe_sub(amount)?;

                let destination_entry = view.get_values(&destination)?;
                ensure_eq!(
                    destination_entry.contract_id,
                    CONTRACT_COIN_ID,
                    ContractError::WrongContract
                );
                let mut destination_account: Coin =
                    borsh::from_slice(&destination_entry.value)
                        .map_err(|_| ContractError::MalformedPayload)?;
                ensure_eq!(
                    destination_account.name,
                    account.name,
                    ContractError::IncompatibleCoin
                );
                destination_account.safe_add(amount)?;

                debug!(
                    "transferred {amount} from {} to {destination}",
                    inst.instance_id
                );
                // Debit before credit, so the change order is fixed.
                let changes = vec![
                    StateChange::update(
                        inst.instance_id,
                        CONTRACT_COIN_ID,
                        encode(&account)?,
                        entry.policy_id,
                    ),
                    StateChange::update(
                        destination,
                        CONTRACT_COIN_ID,
                        encode(&destination_account)?,
                        destination_entry.policy_id,
                    ),
                ];
                return Ok((changes, carried));
            }
            other => bail!(ContractError::UnknownCommand(other.to_string())),
        }

        let changes = vec![StateChange::update(
            inst.instance_id,
            CONTRACT_COIN_ID,
            encode(&account)?,
            entry.policy_id,
        )];
        Ok((changes, carried))
    }
}
