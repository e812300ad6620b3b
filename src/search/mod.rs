//! Search and labeling: variable/value ordering strategies, the DFS
//! (default), BFS, and iterative-deepening search strategies, and
//! branch-and-bound optimization.

mod bfs;
mod dfs;
mod iddfs;
pub mod labeling;
mod optimize;

use std::time::Instant;

use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

use crate::constraint::DomainSource;
use crate::error::VResult;
use crate::model::Model;
use crate::store::HybridStore;
use crate::term::VarId;

pub use labeling::LabelingStrategy;
pub use optimize::solve_optimal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStrategy {
    DepthFirst,
    BreadthFirst,
    LimitedDepth(u32),
    IterativeDeepening,
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy::DepthFirst
    }
}

pub struct SearchConfig {
    pub strategy: LabelingStrategy,
    pub search: SearchStrategy,
    pub deadline: Option<Instant>,
    pub solution_limit: Option<usize>,
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            strategy: LabelingStrategy::FirstFail,
            search: SearchStrategy::DepthFirst,
            deadline: None,
            solution_limit: None,
            seed: 0,
        }
    }
}

/// How often (in committed labeling decisions) the search flattens a fresh
/// `HybridStore` snapshot so the parent chain's lookup depth doesn't grow
/// without bound across a long branch.
pub const PATH_COMPRESS_INTERVAL: u32 = 64;

pub(crate) fn maybe_compress(store: HybridStore, vars: &[VarId]) -> HybridStore {
    if store.depth() > 0 && store.depth() % PATH_COMPRESS_INTERVAL == 0 {
        store.flatten(vars)
    } else {
        store
    }
}

/// Run search to collect solutions (every declared variable a singleton)
/// from `model`'s initial store, honoring `config`.
pub fn solve(model: &Model, config: &SearchConfig) -> VResult<Vec<HybridStore>> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    match config.search {
        SearchStrategy::DepthFirst => dfs::solve(model, config, &mut rng),
        SearchStrategy::BreadthFirst => bfs::solve(model, config, &mut rng),
        SearchStrategy::LimitedDepth(limit) => dfs::solve_limited(model, config, &mut rng, limit),
        SearchStrategy::IterativeDeepening => iddfs::solve(model, config, &mut rng),
    }
}

/// Run depth-first labeling starting from an already-propagated `store`
/// rather than the model's declared initial domains. Used by the parallel
/// worker pool to resume search on a frontier node handed out by the work
/// queue.
pub(crate) fn solve_subtree(
    model: &Model,
    config: &SearchConfig,
    rng: &mut ChaCha8Rng,
    store: HybridStore,
) -> VResult<Vec<HybridStore>> {
    dfs::solve_from(model, config, rng, store, u32::MAX)
}

pub(crate) fn is_complete(model: &Model, store: &HybridStore) -> bool {
    model
        .variables()
        .iter()
        .all(|v| model.domain(store, *v).is_singleton())
}

pub(crate) fn next_unassigned(model: &Model, store: &HybridStore) -> Vec<VarId> {
    model
        .variables()
        .iter()
        .copied()
        .filter(|v| !model.domain(store, *v).is_singleton())
        .collect()
}
