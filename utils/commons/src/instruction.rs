use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use crate::errors::{ContractError, ContractResult};
use crate::types::InstanceId;

/// Name of the encoded auction payload argument on spawn.
pub const ARG_AUCTION: &str = "auction";
/// Name of the encoded bid payload argument.
pub const ARG_BID: &str = "bid";
/// Name of the sealed-bid reveal argument on close.
pub const ARG_CLOSE: &str = "close";
/// Name of the little-endian `u64` amount argument of coin commands.
pub const ARG_COINS: &str = "coins";
/// Name of the 32-byte destination account argument of a coin transfer.
pub const ARG_DESTINATION: &str = "destination";
/// Name of the optional denomination override on coin spawn.
pub const ARG_COIN_ID: &str = "coinID";

/// One named argument of an instruction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Argument {
    pub name: String,
    pub value: Vec<u8>,
}

/// The ordered named-argument bag carried by an instruction.
///
/// Order is preserved and significant for hashing; lookups return the
/// first argument with a matching name.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Arguments(pub Vec<Argument>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument, builder style.
    pub fn with(mut self, name: &str, value: Vec<u8>) -> Self {
        self.0.push(Argument {
            name: name.to_string(),
            value,
        });
        self
    }

    /// Find the first argument with the given name.
    pub fn search(&self, name: &str) -> Option<&[u8]> {
        self.0
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| arg.value.as_slice())
    }

    /// Like [`Arguments::search`], but absence is an error.
    pub fn require(&self, name: &'static str) -> ContractResult<&[u8]> {
        self.search(name)
            .ok_or(ContractError::MissingArgument(name))
    }
}

/// What an instruction asks the ledger to do at its destination key.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum InstructionAction {
    /// Create a new instance of the named contract.
    Spawn {
        contract_id: String,
        args: Arguments,
    },
    /// Run a command of the contract stored at the destination.
    Invoke {
        contract_id: String,
        command: String,
        args: Arguments,
    },
    /// Remove the instance stored at the destination.
    Delete {
        contract_id: String,
        args: Arguments,
    },
}

/// One ledger instruction, evaluated atomically within its transaction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Instruction {
    /// Destination key: the policy instance to spawn under, or the
    /// instance to invoke or delete.
    pub instance_id: InstanceId,
    pub action: InstructionAction,
    /// Per-signer replay counters. Empty on synthetic sub-invocations,
    /// which are never verified individually.
    pub signer_counters: Vec<u64>,
}

impl Instruction {
    pub fn spawn(destination: InstanceId, contract_id: &str, args: Arguments) -> Self {
        Self {
            instance_id: destination,
            action: InstructionAction::Spawn {
                contract_id: contract_id.to_string(),
                args,
            },
            signer_counters: Vec::new(),
        }
    }

    pub fn invoke(
        destination: InstanceId,
        contract_id: &str,
        command: &str,
        args: Arguments,
    ) -> Self {
        Self {
            instance_id: destination,
            action: InstructionAction::Invoke {
                contract_id: contract_id.to_string(),
                command: command.to_string(),
                args,
            },
            signer_counters: Vec::new(),
        }
    }

    pub fn delete(destination: InstanceId, contract_id: &str) -> Self {
        Self {
            instance_id: destination,
            action: InstructionAction::Delete {
                contract_id: contract_id.to_string(),
                args: Arguments::new(),
            },
            signer_counters: Vec::new(),
        }
    }

    pub fn with_counters(mut self, counters: Vec<u64>) -> Self {
        self.signer_counters = counters;
        self
    }

    /// The contract id the instruction addresses.
    pub fn contract_id(&self) -> &str {
        match &self.action {
            InstructionAction::Spawn { contract_id, .. }
            | InstructionAction::Invoke { contract_id, .. }
            | InstructionAction::Delete { contract_id, .. } => contract_id,
        }
    }

    /// The named-argument bag of the instruction.
    pub fn args(&self) -> &Arguments {
        match &self.action {
            InstructionAction::Spawn { args, .. }
            | InstructionAction::Invoke { args, .. }
            | InstructionAction::Delete { args, .. } => args,
        }
    }

    /// Derive the id of an object created by this instruction.
    ///
    /// The derivation hashes the full instruction, so one instruction can
    /// deterministically yield several fresh ids by varying the suffix,
    /// and every replica derives the same ids.
    pub fn derive_id(&self, suffix: &str) -> InstanceId {
        let encoded = borsh::to_vec(self).expect("instruction encoding cannot fail");
        let mut hasher = Sha256::new();
        hasher.update(b"derive:");
        hasher.update(&encoded);
        hasher.update(suffix.as_bytes());
        InstanceId(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_returns_first_match_in_order() {
        let args = Arguments::new()
            .with("bid", vec![1])
            .with("bid", vec![2])
            .with("coins", vec![3]);
        assert_eq!(args.search("bid"), Some(&[1u8][..]));
        assert_eq!(args.search("coins"), Some(&[3u8][..]));
        assert_eq!(args.search("auction"), None);
    }

    #[test]
    fn require_reports_the_missing_name() {
        let args = Arguments::new();
        assert_eq!(
            args.require(ARG_BID),
            Err(ContractError::MissingArgument(ARG_BID))
        );
    }

    #[test]
    fn derived_ids_are_deterministic_and_suffix_sensitive() {
        let inst = Instruction::spawn(
            InstanceId::from_tag(b"genesis"),
            "auction",
            Arguments::new().with(ARG_AUCTION, vec![1, 2, 3]),
        )
        .with_counters(vec![1]);

        assert_eq!(inst.derive_id(""), inst.derive_id(""));
        assert_ne!(inst.derive_id(""), inst.derive_id("deposit"));

        let other = inst.clone().with_counters(vec![2]);
        assert_ne!(inst.derive_id(""), other.derive_id(""));
    }

    #[test]
    fn arguments_round_trip() {
        let args = Arguments::new()
            .with(ARG_COINS, 40u64.to_le_bytes().to_vec())
            .with(ARG_DESTINATION, vec![9; 32]);
        let encoded = borsh::to_vec(&args).expect("encoding cannot fail");
        let decoded: Arguments = borsh::from_slice(&encoded).expect("decoding should pass");
        assert_eq!(args, decoded);
    }
}
