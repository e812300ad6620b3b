//! Variable and value ordering strategies.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::constraint::DomainSource;
use crate::domain::Domain;
use crate::store::HybridStore;
use crate::term::VarId;

#[derive(Clone, Debug)]
pub enum LabelingStrategy {
    FirstFail,
    DomainSize,
    Degree,
    Lexicographic,
    Random,
    Composite(Vec<LabelingStrategy>),
    Adaptive { strategies: Vec<LabelingStrategy>, rotate_every: usize },
}

fn degree_of(var: VarId, store: &HybridStore) -> usize {
    store.constraints().filter(|c| c.variables().contains(&var)).count()
}

/// Lower is better. `DomainSize` prefers the smallest domain outright;
/// `FirstFail` prefers the smallest domain-size-per-constraint, weighting
/// down variables that are already heavily constrained elsewhere; `Degree`
/// prefers the most-constrained variable regardless of domain size;
/// `Lexicographic` prefers the smallest id.
fn score(var: VarId, dom: &dyn DomainSource, store: &HybridStore, strategy: &LabelingStrategy) -> i64 {
    match strategy {
        LabelingStrategy::FirstFail => {
            dom.domain(store, var).count() as i64 / (1 + degree_of(var, store) as i64)
        }
        LabelingStrategy::DomainSize => dom.domain(store, var).count() as i64,
        LabelingStrategy::Degree => -(degree_of(var, store) as i64),
        LabelingStrategy::Lexicographic => var.raw() as i64,
        LabelingStrategy::Random | LabelingStrategy::Composite(_) | LabelingStrategy::Adaptive { .. } => 0,
    }
}

/// Select the next variable to branch on, given the strategy active for
/// this decision (the caller resolves `Adaptive` to its current rotation
/// before calling). Returns `None` if `candidates` is empty.
pub fn select_variable(
    dom: &dyn DomainSource,
    store: &HybridStore,
    candidates: &[VarId],
    strategy: &LabelingStrategy,
    rng: &mut ChaCha8Rng,
) -> Option<VarId> {
    if candidates.is_empty() {
        return None;
    }
    match strategy {
        LabelingStrategy::Random => candidates.choose(rng).copied(),
        LabelingStrategy::Composite(strategies) => {
            let mut remaining = candidates.to_vec();
            for s in strategies {
                if remaining.len() <= 1 {
                    break;
                }
                if matches!(s, LabelingStrategy::Random) {
                    continue;
                }
                let best = remaining.iter().map(|v| score(*v, dom, store, s)).min().unwrap();
                remaining.retain(|v| score(*v, dom, store, s) == best);
            }
            remaining.into_iter().min_by_key(|v| v.raw())
        }
        LabelingStrategy::Adaptive { .. } => {
            unreachable!("Adaptive must be resolved to its active leaf strategy before selection")
        }
        other => {
            let best = candidates.iter().map(|v| score(*v, dom, store, other)).min().unwrap();
            candidates
                .iter()
                .copied()
                .filter(|v| score(*v, dom, store, other) == best)
                .min_by_key(|v| v.raw())
        }
    }
}

/// The leaf strategy active for the `n`-th labeling decision (0-indexed).
/// Non-adaptive strategies are their own "current" strategy forever.
pub fn active_strategy(strategy: &LabelingStrategy, decision_index: usize) -> &LabelingStrategy {
    match strategy {
        LabelingStrategy::Adaptive { strategies, rotate_every } if !strategies.is_empty() => {
            let idx = (decision_index / (*rotate_every).max(1)) % strategies.len();
            &strategies[idx]
        }
        other => other,
    }
}

/// Values in ascending order by default; the `Random` strategy (or a
/// `Composite`/`Adaptive` containing it) shuffles them.
pub fn order_values(domain: &Domain, strategy: &LabelingStrategy, rng: &mut ChaCha8Rng) -> Vec<u32> {
    let mut values: Vec<u32> = domain.iterate().collect();
    if uses_random(strategy) {
        values.shuffle(rng);
    }
    values
}

fn uses_random(strategy: &LabelingStrategy) -> bool {
    match strategy {
        LabelingStrategy::Random => true,
        LabelingStrategy::Composite(strategies) => strategies.iter().any(uses_random),
        LabelingStrategy::Adaptive { strategies, .. } => strategies.iter().any(uses_random),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use rand_core::SeedableRng;

    #[test]
    fn first_fail_picks_smallest_domain() {
        let mut model = Model::new(10);
        let a = model.new_variable(Domain::full(10));
        let b = model.new_variable(Domain::range(1, 2, 10));
        let store = model.initial_store();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let picked = select_variable(&model, &store, &[a, b], &LabelingStrategy::FirstFail, &mut rng);
        assert_eq!(picked, Some(b));
    }

    #[test]
    fn lexicographic_picks_smallest_id() {
        let mut model = Model::new(10);
        let a = model.new_variable(Domain::full(10));
        let b = model.new_variable(Domain::full(10));
        let store = model.initial_store();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let picked = select_variable(&model, &store, &[b, a], &LabelingStrategy::Lexicographic, &mut rng);
        assert_eq!(picked, Some(a));
    }

    #[test]
    fn adaptive_rotates_every_k_decisions() {
        let s = LabelingStrategy::Adaptive {
            strategies: vec![LabelingStrategy::FirstFail, LabelingStrategy::Lexicographic],
            rotate_every: 2,
        };
        assert!(matches!(active_strategy(&s, 0), LabelingStrategy::FirstFail));
        assert!(matches!(active_strategy(&s, 1), LabelingStrategy::FirstFail));
        assert!(matches!(active_strategy(&s, 2), LabelingStrategy::Lexicographic));
    }
}
