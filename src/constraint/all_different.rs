//! All-different via bipartite matching (Régin's algorithm): a maximum
//! matching between variables and candidate values must be complete, and
//! any edge not supported by *some* complete matching is pruned.

use std::collections::HashMap;

use crate::domain::Domain;
use crate::error::{VResult, VulcanError};
use crate::store::HybridStore;
use crate::term::VarId;

use super::DomainSource;

/// Kuhn's algorithm: try to find an augmenting path from left node `v`,
/// avoiding the value at `forbidden` (already claimed by the edge under
/// test). `match_var[value] = Some(left)` records the current matching.
fn try_augment(
    v: usize,
    adj: &[Vec<usize>],
    match_var: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for &val in &adj[v] {
        if visited[val] {
            continue;
        }
        visited[val] = true;
        if match_var[val].is_none() || try_augment(match_var[val].unwrap(), adj, match_var, visited) {
            match_var[val] = Some(v);
            return true;
        }
    }
    false
}

pub fn propagate(
    store: &HybridStore,
    dom: &dyn DomainSource,
    vars: &[VarId],
) -> VResult<Option<HybridStore>> {
    let max_value = dom.max_value();
    let domains: Vec<Domain> = vars.iter().map(|v| dom.domain(store, *v).clone()).collect();

    let mut value_index: HashMap<u32, usize> = HashMap::new();
    for d in &domains {
        for v in d.iterate() {
            let next_idx = value_index.len();
            value_index.entry(v).or_insert(next_idx);
        }
    }
    let index_value: Vec<u32> = {
        let mut pairs: Vec<(u32, usize)> = value_index.iter().map(|(k, v)| (*k, *v)).collect();
        pairs.sort_by_key(|(_, idx)| *idx);
        pairs.into_iter().map(|(k, _)| k).collect()
    };
    let n_values = index_value.len();

    let adj: Vec<Vec<usize>> = domains
        .iter()
        .map(|d| d.iterate().map(|v| value_index[&v]).collect())
        .collect();

    // Seed with singleton variables first for a deterministic matching, then
    // augment from smallest domains first.
    let mut order: Vec<usize> = (0..vars.len()).collect();
    order.sort_by_key(|&i| (!domains[i].is_singleton(), domains[i].count()));

    let mut match_var: Vec<Option<usize>> = vec![None; n_values];
    let mut matched_count = 0;
    for &v in &order {
        let mut visited = vec![false; n_values];
        if try_augment(v, &adj, &mut match_var, &mut visited) {
            matched_count += 1;
        }
    }
    if matched_count < vars.len() {
        return Err(VulcanError::Conflict);
    }

    let match_val_of: Vec<Option<usize>> = {
        let mut out = vec![None; vars.len()];
        for (val, v) in match_var.iter().enumerate() {
            if let Some(v) = v {
                out[*v] = Some(val);
            }
        }
        out
    };

    let mut keep: Vec<Vec<bool>> = adj.iter().map(|edges| vec![false; edges.len()]).collect();

    for (vi, edges) in adj.iter().enumerate() {
        for (ei, &val) in edges.iter().enumerate() {
            if match_val_of[vi] == Some(val) {
                keep[vi][ei] = true;
                continue;
            }
            // Test: force vi -> val. Temporarily detach vi from its current
            // match and val from its current owner, then try to re-augment
            // the displaced owner (if any) into a different value.
            let mut trial = match_var.clone();
            let displaced = trial[val];
            if let Some(old_val) = match_val_of[vi] {
                trial[old_val] = None;
            }
            trial[val] = Some(vi);
            let ok = match displaced {
                None => true,
                Some(owner) if owner == vi => true,
                Some(owner) => {
                    let mut visited = vec![false; n_values];
                    visited[val] = true;
                    try_augment(owner, &adj, &mut trial, &mut visited)
                }
            };
            keep[vi][ei] = ok;
        }
    }

    let mut next = store.clone();
    let mut changed = false;
    for (vi, edges) in adj.iter().enumerate() {
        let d = &domains[vi];
        let mut pruned = d.clone();
        for (ei, &val_idx) in edges.iter().enumerate() {
            if !keep[vi][ei] {
                pruned = pruned.remove(index_value[val_idx]);
            }
        }
        if &pruned != d {
            next = next.set_domain(vars[vi], pruned)?;
            changed = true;
        }
    }

    Ok(if changed { Some(next) } else { None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    #[test]
    fn detects_infeasibility() {
        let mut model = Model::new(3);
        let vars = model.new_variables(4, Domain::full(3));
        let store = model.initial_store();
        let result = propagate(&store, &model, &vars);
        assert!(matches!(result, Err(VulcanError::Conflict)));
    }

    #[test]
    fn prunes_value_fixed_elsewhere() {
        let mut model = Model::new(2);
        let a = model.new_variable(Domain::singleton(1, 2));
        let b = model.new_variable(Domain::full(2));
        let store = model.initial_store();
        let result = propagate(&store, &model, &[a, b]).unwrap().unwrap();
        assert_eq!(model.domain(&result, b).singleton_value(), Some(2));
    }
}
