//! Depth-first labeling search, the default strategy.

use std::time::Instant;

use rand_chacha::ChaCha8Rng;

use crate::constraint::DomainSource;
use crate::error::{VResult, VulcanError};
use crate::model::Model;
use crate::propagate::propagate_to_fixpoint;
use crate::store::HybridStore;

use super::labeling::{active_strategy, order_values, select_variable};
use super::{is_complete, maybe_compress, next_unassigned, SearchConfig};

fn deadline_hit(deadline: Option<Instant>) -> bool {
    deadline.map(|d| Instant::now() >= d).unwrap_or(false)
}

/// Recursive depth-first labeling, collecting up to `config.solution_limit`
/// solutions (or all of them, if unset) within `config.deadline`.
pub fn solve(model: &Model, config: &SearchConfig, rng: &mut ChaCha8Rng) -> VResult<Vec<HybridStore>> {
    solve_limited(model, config, rng, u32::MAX)
}

/// As `solve`, but additionally bounds recursion to `depth_limit` labeling
/// decisions (used by `SearchStrategy::LimitedDepth` and by `iddfs`).
pub fn solve_limited(
    model: &Model,
    config: &SearchConfig,
    rng: &mut ChaCha8Rng,
    depth_limit: u32,
) -> VResult<Vec<HybridStore>> {
    let store = propagate_to_fixpoint(&model.initial_store(), model)?;
    solve_from(model, config, rng, store, depth_limit)
}

/// As `solve_limited`, but starting from a caller-supplied (already
/// propagated) store instead of the model's declared initial domains. Used
/// by branch-and-bound to restart search from a bound-tightened store.
pub(crate) fn solve_from(
    model: &Model,
    config: &SearchConfig,
    rng: &mut ChaCha8Rng,
    store: HybridStore,
    depth_limit: u32,
) -> VResult<Vec<HybridStore>> {
    let mut solutions = Vec::new();
    let mut decisions: usize = 0;
    label(model, config, rng, store, 0, depth_limit, &mut decisions, &mut solutions)?;
    Ok(solutions)
}

fn label(
    model: &Model,
    config: &SearchConfig,
    rng: &mut ChaCha8Rng,
    store: HybridStore,
    depth: u32,
    depth_limit: u32,
    decisions: &mut usize,
    solutions: &mut Vec<HybridStore>,
) -> VResult<()> {
    if let Some(limit) = config.solution_limit {
        if solutions.len() >= limit {
            return Ok(());
        }
    }
    if deadline_hit(config.deadline) {
        return Err(VulcanError::Cancelled { partial: solutions.len() });
    }

    if is_complete(model, &store) {
        solutions.push(store);
        return Ok(());
    }
    if depth >= depth_limit {
        return Ok(());
    }

    let candidates = next_unassigned(model, &store);
    let strategy = active_strategy(&config.strategy, *decisions);
    let var = match select_variable(model, &store, &candidates, strategy, rng) {
        Some(v) => v,
        None => return Ok(()),
    };
    *decisions += 1;

    let domain = model.domain(&store, var).clone();
    let values = order_values(&domain, strategy, rng);

    for v in values {
        if let Some(limit) = config.solution_limit {
            if solutions.len() >= limit {
                break;
            }
        }
        let attempt = store
            .set_domain(var, crate::domain::Domain::singleton(v, model.max_value()))
            .and_then(|narrowed| propagate_to_fixpoint(&narrowed, model));
        match attempt {
            Ok(next) => {
                let next = maybe_compress(next.with_depth(depth + 1), model.variables());
                match label(model, config, rng, next, depth + 1, depth_limit, decisions, solutions) {
                    Ok(()) => {}
                    Err(VulcanError::Cancelled { partial }) => {
                        return Err(VulcanError::Cancelled { partial });
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(VulcanError::Conflict) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintKind;
    use crate::domain::Domain;
    use crate::search::LabelingStrategy;

    #[test]
    fn finds_all_different_assignments_for_two_variables() {
        let mut model = Model::new(2);
        let xs = model.new_variables(2, Domain::full(2));
        model.add_constraint(ConstraintKind::AllDifferent { vars: xs.clone() }).unwrap();
        let config = SearchConfig {
            strategy: LabelingStrategy::Lexicographic,
            ..SearchConfig::default()
        };
        let mut rng = seeded_rng();
        let solutions = solve(&model, &config, &mut rng).unwrap();
        assert_eq!(solutions.len(), 2);
    }

    fn seeded_rng() -> ChaCha8Rng {
        use rand_core::SeedableRng;
        ChaCha8Rng::seed_from_u64(0)
    }

    #[test]
    fn respects_solution_limit() {
        let mut model = Model::new(4);
        let xs = model.new_variables(4, Domain::full(4));
        model.add_constraint(ConstraintKind::AllDifferent { vars: xs }).unwrap();
        let config = SearchConfig {
            solution_limit: Some(3),
            ..SearchConfig::default()
        };
        let mut rng = seeded_rng();
        let solutions = solve(&model, &config, &mut rng).unwrap();
        assert_eq!(solutions.len(), 3);
    }
}
