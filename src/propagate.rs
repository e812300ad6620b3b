//! Fixed-point propagation: chaotic iteration over a FIFO worklist until no
//! constraint can narrow anything further, or a conflict is detected.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use crate::constraint::{Constraint, ConstraintId, DomainSource};
use crate::error::{VResult, VulcanError};
use crate::store::HybridStore;
use crate::term::VarId;

fn var_constraint_index(store: &HybridStore) -> HashMap<VarId, Vec<ConstraintId>> {
    let mut index: HashMap<VarId, Vec<ConstraintId>> = HashMap::new();
    for c in store.constraints() {
        for v in c.variables() {
            index.entry(v).or_default().push(c.id());
        }
    }
    index
}

fn constraint_by_id(store: &HybridStore) -> HashMap<ConstraintId, Constraint> {
    store.constraints().map(|c| (c.id(), c.clone())).collect()
}

/// Upper bound on fixpoint iterations: `Σ |dom_i|` over every FD variable
/// referenced by the store's constraints. Each successful propagation
/// strictly shrinks some domain under monotone pruning, so this many
/// iterations cannot all succeed — a provable, non-arbitrary cap.
fn iteration_cap(store: &HybridStore, dom: &dyn DomainSource, vars: &HashSet<VarId>) -> u64 {
    vars.iter()
        .map(|v| dom.domain(store, *v).count() as u64)
        .sum::<u64>()
        .max(1)
}

/// Run every constraint touching a changed variable, and everything they in
/// turn mark changed, until the worklist drains or a conflict is found. If
/// `store.changed_vars()` is empty (e.g. the very first propagation over a
/// freshly built model), every constraint is run once to seed the process.
pub fn propagate_to_fixpoint(store: &HybridStore, dom: &dyn DomainSource) -> VResult<HybridStore> {
    let index = var_constraint_index(store);
    let mut by_id = constraint_by_id(store);
    let all_vars: HashSet<VarId> = index.keys().copied().collect();
    let cap = iteration_cap(store, dom, &all_vars);

    let mut queue: VecDeque<ConstraintId> = VecDeque::new();
    let mut queued: HashSet<ConstraintId> = HashSet::new();

    let seed_vars: Vec<VarId> = if store.changed_vars().is_empty() {
        all_vars.iter().copied().collect()
    } else {
        store.changed_vars().iter().copied().collect()
    };
    for v in seed_vars {
        if let Some(ids) = index.get(&v) {
            for &id in ids {
                if queued.insert(id) {
                    queue.push_back(id);
                }
            }
        }
    }

    let mut current = store.clone();
    let mut iterations: u64 = 0;

    while let Some(cid) = queue.pop_front() {
        queued.remove(&cid);
        iterations += 1;
        if iterations > cap {
            return Err(VulcanError::Internal(format!(
                "propagation did not reach a fixpoint within {} iterations",
                cap
            )));
        }

        let constraint = by_id.get(&cid).expect("constraint id present in index").clone();
        trace!(constraint = ?constraint.id(), "propagation wave");
        match constraint.propagate(&current, dom)? {
            None => continue,
            Some(next) => {
                current = next;
                by_id = constraint_by_id(&current);
                for v in constraint.variables() {
                    if let Some(ids) = index.get(&v) {
                        for &id in ids {
                            if id != cid && queued.insert(id) {
                                queue.push_back(id);
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(current.clear_changed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{CmpOp, ConstraintKind};
    use crate::domain::Domain;
    use crate::model::Model;

    #[test]
    fn reaches_fixpoint_on_arithmetic_chain() {
        let mut model = Model::new(10);
        let x = model.new_variable(Domain::range(1, 3, 10));
        let y = model.new_variable(Domain::full(10));
        model
            .add_constraint(ConstraintKind::Arithmetic { dst: y, src: x, k: 5 })
            .unwrap();
        let store = model.initial_store();
        let result = propagate_to_fixpoint(&store, &model).unwrap();
        assert_eq!(model.domain(&result, y).iterate().collect::<Vec<_>>(), vec![6, 7, 8]);
        assert!(result.changed_vars().is_empty());
    }

    #[test]
    fn idempotent_second_call_is_noop() {
        let mut model = Model::new(10);
        let x = model.new_variable(Domain::range(1, 3, 10));
        let y = model.new_variable(Domain::full(10));
        model
            .add_constraint(ConstraintKind::Arithmetic { dst: y, src: x, k: 5 })
            .unwrap();
        let store = model.initial_store();
        let once = propagate_to_fixpoint(&store, &model).unwrap();
        let twice = propagate_to_fixpoint(&once, &model).unwrap();
        assert_eq!(model.domain(&once, y), model.domain(&twice, y));
        assert_eq!(model.domain(&once, x), model.domain(&twice, x));
    }

    #[test]
    fn propagates_across_two_constraints() {
        let mut model = Model::new(10);
        let x = model.new_variable(Domain::range(1, 3, 10));
        let y = model.new_variable(Domain::full(10));
        let z = model.new_variable(Domain::full(10));
        model
            .add_constraint(ConstraintKind::Arithmetic { dst: y, src: x, k: 5 })
            .unwrap();
        model
            .add_constraint(ConstraintKind::Inequality { x: z, y, op: CmpOp::Lt })
            .unwrap();
        let store = model.initial_store();
        let result = propagate_to_fixpoint(&store, &model).unwrap();
        // y in [6,8], so z < min(y) = 6 => z in [1,5]
        assert_eq!(model.domain(&result, z).max(), Some(5));
    }

    #[test]
    fn self_reference_conflict_surfaces() {
        let mut model = Model::new(10);
        let x = model.new_variable(Domain::full(10));
        model
            .add_constraint(ConstraintKind::Inequality { x, y: x, op: CmpOp::Lt })
            .unwrap();
        let store = model.initial_store();
        assert!(matches!(propagate_to_fixpoint(&store, &model), Err(VulcanError::Conflict)));
    }
}
