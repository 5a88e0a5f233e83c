use crate::errors::{ContractError, ContractResult};
use crate::instruction::Instruction;
use crate::state::{StateChange, StateView};
use crate::types::Coin;
use crate::{bail, ensure};

/// The result of a contract entry point: the state changes to splice into
/// the transaction log and the coins left over for the next instruction.
pub type Outcome = ContractResult<(Vec<StateChange>, Vec<Coin>)>;

/// A contract scoped to one instance's stored bytes.
///
/// Instances are materialised per call by the registry; their only
/// per-call memory is the struct decoded from their own account. Entry
/// points run to completion against an immutable view, never yield and
/// never perform I/O, so identical inputs produce identical outputs on
/// every replica.
pub trait Contract {
    /// Decide whether the instruction may run at all.
    ///
    /// The default requires a usable signer-counter set and a resolvable
    /// owning policy at the destination key; evaluating the signature set
    /// against the policy rules is the host's job. Contracts override
    /// this to widen access, e.g. to accept bids from any signed caller.
    fn verify_instruction(&self, view: &dyn StateView, inst: &Instruction) -> ContractResult<()> {
        verify_with_policy(view, inst)
    }

    fn spawn(&self, _view: &dyn StateView, _inst: &Instruction, _coins: Vec<Coin>) -> Outcome {
        bail!(ContractError::UnknownCommand("spawn".to_string()))
    }

    fn invoke(&self, _view: &dyn StateView, _inst: &Instruction, _coins: Vec<Coin>) -> Outcome {
        bail!(ContractError::UnknownCommand("invoke".to_string()))
    }

    fn delete(&self, _view: &dyn StateView, _inst: &Instruction, _coins: Vec<Coin>) -> Outcome {
        bail!(ContractError::UnknownCommand("delete".to_string()))
    }
}

/// The default instruction verifier: a present, all-positive signer
/// counter set and an owning policy that resolves at the destination key.
pub fn verify_with_policy(view: &dyn StateView, inst: &Instruction) -> ContractResult<()> {
    verify_signer_counters(inst)?;
    view.get_values(&inst.instance_id)?;
    Ok(())
}

/// The relaxed verifier used for commands open to every signed caller.
pub fn verify_signer_counters(inst: &Instruction) -> ContractResult<()> {
    ensure!(
        !inst.signer_counters.is_empty(),
        ContractError::Unauthorized
    );
    ensure!(
        inst.signer_counters.iter().all(|counter| *counter > 0),
        ContractError::Unauthorized
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensure_eq;
    use crate::instruction::Arguments;
    use crate::state::StateEntry;
    use crate::types::InstanceId;

    struct OneKeyView(InstanceId);

    impl StateView for OneKeyView {
        fn get_values(&self, key: &InstanceId) -> ContractResult<StateEntry> {
            ensure_eq!(*key, self.0, ContractError::NotFound);
            Ok(StateEntry {
                value: Vec::new(),
                version: 0,
                contract_id: "policy".to_string(),
                policy_id: self.0,
            })
        }
    }

    #[test]
    fn default_verify_needs_counters_and_a_policy() {
        let policy = InstanceId::from_tag(b"policy");
        let view = OneKeyView(policy);

        let unsigned = Instruction::spawn(policy, "auction", Arguments::new());
        assert_eq!(
            verify_with_policy(&view, &unsigned),
            Err(ContractError::Unauthorized)
        );

        let stale = unsigned.clone().with_counters(vec![0]);
        assert_eq!(
            verify_with_policy(&view, &stale),
            Err(ContractError::Unauthorized)
        );

        let missing = Instruction::spawn(InstanceId::zero(), "auction", Arguments::new())
            .with_counters(vec![1]);
        assert_eq!(
            verify_with_policy(&view, &missing),
            Err(ContractError::NotFound)
        );

        let good = unsigned.with_counters(vec![1]);
        assert_eq!(verify_with_policy(&view, &good), Ok(()));
    }
}
