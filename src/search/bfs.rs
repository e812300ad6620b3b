//! Breadth-first labeling search: an explicit FIFO frontier instead of the
//! call stack, so partial solutions at the same depth are explored before
//! any of them goes deeper.

use std::collections::VecDeque;
use std::time::Instant;

use rand_chacha::ChaCha8Rng;

use crate::constraint::DomainSource;
use crate::domain::Domain;
use crate::error::{VResult, VulcanError};
use crate::model::Model;
use crate::propagate::propagate_to_fixpoint;
use crate::store::HybridStore;

use super::labeling::{active_strategy, order_values, select_variable};
use super::{is_complete, maybe_compress, next_unassigned, SearchConfig};

struct Frontier {
    store: HybridStore,
    decisions: usize,
}

fn deadline_hit(deadline: Option<Instant>) -> bool {
    deadline.map(|d| Instant::now() >= d).unwrap_or(false)
}

pub fn solve(model: &Model, config: &SearchConfig, rng: &mut ChaCha8Rng) -> VResult<Vec<HybridStore>> {
    let mut solutions = Vec::new();
    let root = propagate_to_fixpoint(&model.initial_store(), model)?;
    let mut queue: VecDeque<Frontier> = VecDeque::new();
    queue.push_back(Frontier { store: root, decisions: 0 });

    while let Some(Frontier { store, decisions }) = queue.pop_front() {
        if let Some(limit) = config.solution_limit {
            if solutions.len() >= limit {
                break;
            }
        }
        if deadline_hit(config.deadline) {
            return Err(VulcanError::Cancelled { partial: solutions.len() });
        }

        if is_complete(model, &store) {
            solutions.push(store);
            continue;
        }

        let candidates = next_unassigned(model, &store);
        let strategy = active_strategy(&config.strategy, decisions);
        let var = match select_variable(model, &store, &candidates, strategy, rng) {
            Some(v) => v,
            None => continue,
        };

        let domain = model.domain(&store, var).clone();
        let values = order_values(&domain, strategy, rng);
        for v in values {
            let attempt = store
                .set_domain(var, Domain::singleton(v, model.max_value()))
                .and_then(|narrowed| propagate_to_fixpoint(&narrowed, model));
            if let Ok(next) = attempt {
                let next = maybe_compress(next.with_depth(store.depth() + 1), model.variables());
                queue.push_back(Frontier {
                    store: next,
                    decisions: decisions + 1,
                });
            }
        }
    }

    Ok(solutions)
}
