//! A shared-memory worker pool for search: the root is split into an
//! initial frontier of independent subtrees, workers pull subtrees off a
//! shared queue and run depth-first labeling on each, and results (or
//! cancellation) flow back over a bounded channel.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Instant;

use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use tracing::debug;

use crate::constraint::DomainSource;
use crate::domain::Domain;
use crate::error::{VResult, VulcanError};
use crate::model::Model;
use crate::propagate::propagate_to_fixpoint;
use crate::search::{self, SearchConfig};
use crate::store::HybridStore;

pub struct ParallelConfig {
    pub worker_count: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig {
            worker_count: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        }
    }
}

/// Expand the root store by branching on declared variables (smallest
/// domain first, matching `LabelingStrategy::FirstFail`) until the
/// frontier has at least `target` nodes or every variable is already
/// ground. Each frontier entry is independently propagated and conflict-free
/// branches are dropped on the spot.
fn build_frontier(model: &Model, root: HybridStore, target: usize) -> VResult<Vec<HybridStore>> {
    let mut frontier = vec![root];
    loop {
        if frontier.len() >= target {
            return Ok(frontier);
        }
        let split_point = frontier
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                let candidates = search::next_unassigned(model, s);
                candidates
                    .into_iter()
                    .map(|v| (model.domain(s, v).count(), v))
                    .min()
                    .map(|(count, v)| (i, v, count))
            })
            .min_by_key(|(_, _, count)| *count);

        let Some((i, var, _)) = split_point else {
            return Ok(frontier);
        };

        let parent = frontier.remove(i);
        let domain = model.domain(&parent, var).clone();
        for v in domain.iterate() {
            let attempt = parent
                .set_domain(var, Domain::singleton(v, model.max_value()))
                .and_then(|narrowed| propagate_to_fixpoint(&narrowed, model));
            if let Ok(next) = attempt {
                frontier.push(next);
            }
        }
        if frontier.is_empty() {
            return Ok(frontier);
        }
    }
}

/// Solve `model` using `parallel.worker_count` threads. The root is split
/// into a frontier of at least `worker_count` independent subtrees (fewer
/// only if the search space itself is smaller), each worker pulls subtrees
/// from a shared queue and runs depth-first labeling with `config`'s
/// strategy, feeding solutions back over a bounded channel until the
/// channel-wide `solution_limit` is reached or `deadline` passes.
pub fn solve_parallel(model: &Model, config: &SearchConfig, parallel: &ParallelConfig) -> VResult<Vec<HybridStore>> {
    let worker_count = parallel.worker_count.max(1);
    let root = propagate_to_fixpoint(&model.initial_store(), model)?;
    let frontier = build_frontier(model, root, worker_count * 4)?;

    if frontier.is_empty() {
        return Ok(Vec::new());
    }

    let queue = Arc::new(Mutex::new(frontier));
    let cancelled = Arc::new(AtomicBool::new(false));
    let found = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel::<HybridStore>();
    let solution_limit = config.solution_limit;
    let deadline = config.deadline;

    thread::scope(|scope| {
        for worker_id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let cancelled = Arc::clone(&cancelled);
            let found = Arc::clone(&found);
            let tx = tx.clone();
            let seed = config.seed.wrapping_add(worker_id as u64);
            let worker_config = SearchConfig {
                strategy: config.strategy.clone(),
                search: config.search,
                deadline,
                solution_limit: None,
                seed,
            };

            scope.spawn(move || {
                debug!(worker_id, "worker starting");
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                loop {
                    if cancelled.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Some(limit) = solution_limit {
                        if found.load(Ordering::Relaxed) >= limit {
                            cancelled.store(true, Ordering::Relaxed);
                            break;
                        }
                    }
                    if deadline.map(|d| Instant::now() >= d).unwrap_or(false) {
                        cancelled.store(true, Ordering::Relaxed);
                        break;
                    }

                    let node = {
                        let mut q = queue.lock().expect("frontier queue mutex poisoned");
                        q.pop()
                    };
                    let Some(node) = node else {
                        break;
                    };

                    match search::solve_subtree(model, &worker_config, &mut rng, node) {
                        Ok(solutions) => {
                            for s in solutions {
                                if let Some(limit) = solution_limit {
                                    if found.fetch_add(1, Ordering::Relaxed) >= limit {
                                        cancelled.store(true, Ordering::Relaxed);
                                        break;
                                    }
                                } else {
                                    found.fetch_add(1, Ordering::Relaxed);
                                }
                                if tx.send(s).is_err() {
                                    cancelled.store(true, Ordering::Relaxed);
                                    break;
                                }
                            }
                        }
                        Err(VulcanError::Cancelled { .. }) => {
                            cancelled.store(true, Ordering::Relaxed);
                            break;
                        }
                        Err(_) => continue,
                    }
                }
                debug!(worker_id, "worker exiting");
            });
        }
        drop(tx);
    });

    let mut solutions: Vec<HybridStore> = rx.into_iter().collect();
    if let Some(limit) = solution_limit {
        solutions.truncate(limit);
    }
    if cancelled.load(Ordering::Relaxed) && deadline.map(|d| Instant::now() >= d).unwrap_or(false) {
        return Err(VulcanError::Cancelled { partial: solutions.len() });
    }
    Ok(solutions)
}
