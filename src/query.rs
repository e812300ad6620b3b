//! The relational-layer query surface: run a goal against a fresh store and
//! collect up to `n` answers, optionally under a wall-clock deadline.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{VResult, VulcanError};
use crate::goal::{Ctx, Goal};
use crate::store::HybridStore;
use crate::stream::Step;

pub struct Query {
    ctx: Arc<Ctx>,
}

impl Query {
    pub fn new(max_value: u32) -> Query {
        Query {
            ctx: Arc::new(Ctx::new(max_value)),
        }
    }

    pub fn ctx(&self) -> Arc<Ctx> {
        self.ctx.clone()
    }

    /// Collect up to `n` answers (`None` for "all of them").
    pub fn run(&self, n: Option<usize>, goal: Goal) -> Vec<HybridStore> {
        goal(self.ctx.clone(), HybridStore::new()).take(n)
    }

    /// Like `run`, but checked against a wall-clock deadline between every
    /// stream step; returns `Cancelled { partial }` with whatever was
    /// collected so far if the deadline passes first.
    pub fn run_with_deadline(&self, n: Option<usize>, deadline: Instant, goal: Goal) -> VResult<Vec<HybridStore>> {
        let mut stream = goal(self.ctx.clone(), HybridStore::new());
        let mut out = Vec::new();
        loop {
            if let Some(limit) = n {
                if out.len() >= limit {
                    break;
                }
            }
            if Instant::now() >= deadline {
                return Err(VulcanError::Cancelled { partial: out.len() });
            }
            match stream.step() {
                Step::Done => break,
                Step::Pending(rest) => stream = rest,
                Step::Value(store, rest) => {
                    out.push(store);
                    stream = rest;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{disj, eq};
    use crate::term::Term;

    #[test]
    fn run_collects_all_answers() {
        let q = Query::new(10);
        let x = Term::fresh();
        let g = disj(vec![eq(x.clone(), Term::int(1)), eq(x.clone(), Term::int(2))]);
        let out = q.run(None, g);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn run_respects_limit() {
        let q = Query::new(10);
        let x = Term::fresh();
        let g = disj(vec![eq(x.clone(), Term::int(1)), eq(x.clone(), Term::int(2))]);
        let out = q.run(Some(1), g);
        assert_eq!(out.len(), 1);
    }
}
