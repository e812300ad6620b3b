//! Branch-and-bound optimization over a single FD objective variable.

use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

use crate::constraint::DomainSource;
use crate::domain::Domain;
use crate::error::{VResult, VulcanError};
use crate::model::Model;
use crate::propagate::propagate_to_fixpoint;
use crate::store::HybridStore;
use crate::term::VarId;

use super::dfs;
use super::SearchConfig;

/// Search for the assignment minimizing (or maximizing) `objective`, by
/// repeatedly finding one solution and then re-searching with the
/// objective's domain restricted to values strictly better than the last
/// one found. Returns the last (best) solution found before the deadline
/// or the search space is exhausted; `Ok(None)` if the model is
/// unsatisfiable.
pub fn solve_optimal(
    model: &Model,
    objective: VarId,
    minimize: bool,
    config: &SearchConfig,
) -> VResult<Option<HybridStore>> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut best: Option<HybridStore> = None;
    let mut round_config = SearchConfig {
        strategy: config.strategy.clone(),
        search: config.search,
        deadline: config.deadline,
        solution_limit: Some(1),
        seed: config.seed,
    };

    let mut store = propagate_to_fixpoint(&model.initial_store(), model)?;

    loop {
        let round = dfs::solve_from(model, &round_config, &mut rng, store.clone(), u32::MAX);
        let solutions = match round {
            Ok(s) => s,
            Err(VulcanError::Cancelled { .. }) => break,
            Err(e) => return Err(e),
        };
        let Some(found) = solutions.into_iter().next() else {
            break;
        };
        let value = model
            .domain(&found, objective)
            .singleton_value()
            .expect("objective variable must be ground in a complete solution");
        best = Some(found);
        round_config.deadline = config.deadline;

        let bound = if minimize {
            Domain::range(1, value.saturating_sub(1).max(1), model.max_value())
        } else {
            Domain::range((value + 1).min(model.max_value()), model.max_value(), model.max_value())
        };
        let tightened = if minimize && value <= 1 {
            break;
        } else if !minimize && value >= model.max_value() {
            break;
        } else {
            model
                .initial_store()
                .set_domain(objective, bound)
                .and_then(|s| propagate_to_fixpoint(&s, model))
        };
        match tightened {
            Ok(s) => store = s,
            Err(VulcanError::Conflict) => break,
            Err(e) => return Err(e),
        }
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintKind;
    use crate::search::LabelingStrategy;

    #[test]
    fn minimizes_objective_under_all_different() {
        let mut model = Model::new(4);
        let xs = model.new_variables(3, Domain::full(4));
        model.add_constraint(ConstraintKind::AllDifferent { vars: xs.clone() }).unwrap();
        let objective = xs[0];
        let config = SearchConfig {
            strategy: LabelingStrategy::Lexicographic,
            ..SearchConfig::default()
        };
        let best = solve_optimal(&model, objective, true, &config).unwrap().unwrap();
        assert_eq!(model.domain(&best, objective).singleton_value(), Some(1));
    }

    #[test]
    fn maximizes_objective_under_all_different() {
        let mut model = Model::new(4);
        let xs = model.new_variables(3, Domain::full(4));
        model.add_constraint(ConstraintKind::AllDifferent { vars: xs.clone() }).unwrap();
        let objective = xs[0];
        let config = SearchConfig {
            strategy: LabelingStrategy::Lexicographic,
            ..SearchConfig::default()
        };
        let best = solve_optimal(&model, objective, false, &config).unwrap().unwrap();
        assert_eq!(model.domain(&best, objective).singleton_value(), Some(4));
    }
}
