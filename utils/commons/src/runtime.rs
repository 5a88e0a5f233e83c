use std::sync::Arc;

use log::debug;

use crate::contract::Outcome;
use crate::errors::ContractResult;
use crate::instruction::{Instruction, InstructionAction};
use crate::registry::ContractRegistry;
use crate::state::{StagedView, StateChange, StateView};
use crate::types::Coin;

/// The instruction evaluation envelope.
///
/// Resolves the target contract through the frozen registry, runs its
/// verification hook and dispatches the instruction. All evaluation is
/// synchronous and single-threaded; the runtime holds no state besides
/// the registry handle, so it can be shared freely across transactions.
pub struct Runtime {
    registry: Arc<ContractRegistry>,
}

impl Runtime {
    pub fn new(registry: Arc<ContractRegistry>) -> Self {
        Self { registry }
    }

    /// Evaluate one instruction against a view.
    ///
    /// A spawn is dispatched to the declared contract with empty stored
    /// bytes; an invoke or delete is dispatched to the contract recorded
    /// in the destination's trie entry, bound to its stored bytes.
    pub fn execute_instruction(
        &self,
        view: &dyn StateView,
        inst: &Instruction,
        coins: Vec<Coin>,
    ) -> Outcome {
        let contract = match &inst.action {
            InstructionAction::Spawn { contract_id, .. } => {
                self.registry.construct(contract_id, &[])?
            }
            InstructionAction::Invoke { .. } | InstructionAction::Delete { .. } => {
                let entry = view.get_values(&inst.instance_id)?;
                self.registry.construct(&entry.contract_id, &entry.value)?
            }
        };

        contract.verify_instruction(view, inst)?;

        match &inst.action {
            InstructionAction::Spawn { .. } => contract.spawn(view, inst, coins),
            InstructionAction::Invoke { .. } => contract.invoke(view, inst, coins),
            InstructionAction::Delete { .. } => contract.delete(view, inst, coins),
        }
    }

    /// Evaluate a transaction: a list of instructions that commits
    /// atomically.
    ///
    /// Coins left over by instruction `n` are carried into instruction
    /// `n + 1` (a preceding coin `fetch` carries its coins to a `bid` this
    /// way), and every instruction observes the changes of its
    /// predecessors through a staged view. The first failure aborts the
    /// whole batch; no partial change list is ever returned. Coins still
    /// carried after the last instruction are handed back to the host,
    /// which decides how to restore them.
    pub fn execute_transaction(
        &self,
        view: &dyn StateView,
        instructions: &[Instruction],
    ) -> ContractResult<(Vec<StateChange>, Vec<Coin>)> {
        let mut changes: Vec<StateChange> = Vec::new();
        let mut carried: Vec<Coin> = Vec::new();

        for inst in instructions {
            let staged = StagedView::new(view, &changes);
            let (produced, leftover) = self.execute_instruction(&staged, inst, carried)?;
            debug!(
                "instruction on {} produced {} change(s)",
                inst.instance_id,
                produced.len()
            );
            changes.extend(produced);
            carried = leftover;
        }

        Ok((changes, carried))
    }
}
