//! Iterative deepening: repeatedly re-run depth-first search with an
//! increasing depth cutoff, discarding work between rounds. Bounds memory
//! to a single DFS branch's stack while still guaranteeing completeness for
//! finite search spaces, at the cost of redoing shallow work each round.

use rand_chacha::ChaCha8Rng;

use crate::error::VResult;
use crate::model::Model;
use crate::store::HybridStore;

use super::dfs;
use super::SearchConfig;

pub fn solve(model: &Model, config: &SearchConfig, rng: &mut ChaCha8Rng) -> VResult<Vec<HybridStore>> {
    let ceiling = model.variables().len() as u32;
    let mut depth_limit = 1u32.min(ceiling.max(1));
    loop {
        let solutions = dfs::solve_limited(model, config, rng, depth_limit)?;
        let satisfied_limit = config
            .solution_limit
            .map(|limit| solutions.len() >= limit)
            .unwrap_or(false);
        if satisfied_limit || !solutions.is_empty() || depth_limit >= ceiling {
            return Ok(solutions);
        }
        depth_limit += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintKind;
    use crate::domain::Domain;
    use crate::search::{LabelingStrategy, SearchStrategy};
    use rand_core::SeedableRng;

    #[test]
    fn finds_solution_by_increasing_depth() {
        let mut model = Model::new(3);
        let xs = model.new_variables(3, Domain::full(3));
        model.add_constraint(ConstraintKind::AllDifferent { vars: xs }).unwrap();
        let config = SearchConfig {
            strategy: LabelingStrategy::Lexicographic,
            search: SearchStrategy::IterativeDeepening,
            solution_limit: Some(1),
            ..SearchConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let solutions = solve(&model, &config, &mut rng).unwrap();
        assert_eq!(solutions.len(), 1);
    }
}
