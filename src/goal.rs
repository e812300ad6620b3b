//! Relational goal combinators: `eq`, `neq`, `absento`, `symbolo`,
//! `numbero`, `conj`, `disj`, `fresh`, `conda`, `condu`, `once`, `project`,
//! plus the derived list relation `membero` and the FD-backed relational
//! arithmetic `pluso`/`minuso`/`timeso`.

use std::sync::Arc;

use crate::constraint::{ConstraintKind, DomainSource, TypeTag};
use crate::domain::Domain;
use crate::propagate::propagate_to_fixpoint;
use crate::store::HybridStore;
use crate::stream::{Cont, Stream};
use crate::term::{Term, VarId};

/// Shared context for a query: the positive-domain ceiling every FD
/// variable's domain lives under. Implements `DomainSource` so goals that
/// touch FD constraints can run propagation without a separately-declared
/// `Model`.
#[derive(Clone)]
pub struct Ctx {
    max_value: u32,
    default_domain: Domain,
}

impl Ctx {
    pub fn new(max_value: u32) -> Ctx {
        Ctx {
            max_value,
            default_domain: Domain::full(max_value),
        }
    }
}

impl DomainSource for Ctx {
    fn domain<'a>(&'a self, store: &'a HybridStore, id: VarId) -> &'a Domain {
        store.get_domain(id, &self.default_domain)
    }

    fn max_value(&self) -> u32 {
        self.max_value
    }
}

/// A relational goal: a function from a query context and a store to the
/// stream of stores it extends.
pub type Goal = Arc<dyn Fn(Arc<Ctx>, HybridStore) -> Stream + Send + Sync>;

fn goal(f: impl Fn(Arc<Ctx>, HybridStore) -> Stream + Send + Sync + 'static) -> Goal {
    Arc::new(f)
}

fn run_propagation(ctx: &Ctx, store: &HybridStore) -> Stream {
    match propagate_to_fixpoint(store, ctx).and_then(|s| s.purify()) {
        Ok(s) => Stream::unit(s),
        Err(_) => Stream::empty(),
    }
}

fn cont(ctx: Arc<Ctx>, g: Goal) -> Cont {
    Arc::new(move |store: HybridStore| g(ctx.clone(), store))
}

// -- primitive goals ------------------------------------------------------

pub fn eq(u: Term, v: Term) -> Goal {
    goal(move |ctx, store| match store.unify(&u, &v) {
        Ok(s) => run_propagation(&ctx, &s),
        Err(_) => Stream::empty(),
    })
}

pub fn neq(u: Term, v: Term) -> Goal {
    goal(move |ctx, store| match store.disunify(&u, &v) {
        Ok(s) => run_propagation(&ctx, &s),
        Err(_) => Stream::empty(),
    })
}

pub fn absento(absent: Term, container: Term) -> Goal {
    goal(move |ctx, store| {
        let s = store.add_constraint(ConstraintKind::Absent {
            absent: absent.clone(),
            container: container.clone(),
        });
        run_propagation(&ctx, &s)
    })
}

fn typeo(term: Term, tag: TypeTag) -> Goal {
    goal(move |ctx, store| {
        let s = store.add_constraint(ConstraintKind::TypeOf {
            term: term.clone(),
            tag,
        });
        run_propagation(&ctx, &s)
    })
}

pub fn symbolo(term: Term) -> Goal {
    typeo(term, TypeTag::Symbol)
}

pub fn numbero(term: Term) -> Goal {
    typeo(term, TypeTag::Number)
}

pub fn pairo(term: Term) -> Goal {
    typeo(term, TypeTag::Pair)
}

pub fn nullo(term: Term) -> Goal {
    typeo(term, TypeTag::Nil)
}

pub fn succeed() -> Goal {
    goal(|_ctx, store| Stream::unit(store))
}

pub fn fail() -> Goal {
    goal(|_ctx, _store| Stream::empty())
}

pub fn conj(goals: Vec<Goal>) -> Goal {
    goal(move |ctx, store| {
        let mut stream = Stream::unit(store);
        for g in goals.iter().cloned() {
            stream = stream.bind(cont(ctx.clone(), g));
        }
        stream
    })
}

pub fn disj(goals: Vec<Goal>) -> Goal {
    goal(move |ctx, store| {
        let mut out = Stream::empty();
        for g in goals.iter().rev() {
            out = g(ctx.clone(), store.clone()).mplus(out);
        }
        out
    })
}

/// Allocate one fresh logic variable and pass it to `body`.
pub fn fresh(body: impl Fn(Term) -> Goal + Send + Sync + 'static) -> Goal {
    goal(move |ctx, store| {
        let v = Term::fresh();
        (body(v))(ctx, store)
    })
}

/// Allocate `n` fresh logic variables and pass them to `body`.
pub fn fresh_n(n: usize, body: impl Fn(Vec<Term>) -> Goal + Send + Sync + 'static) -> Goal {
    goal(move |ctx, store| {
        let vars: Vec<Term> = (0..n).map(|_| Term::fresh()).collect();
        (body(vars))(ctx, store)
    })
}

/// Committed choice: try `(condition, body)` pairs in order; the first
/// condition with a non-empty answer stream commits, and only that
/// branch's continuation runs (against every answer `condition` produced).
pub fn conda(clauses: Vec<(Goal, Goal)>) -> Goal {
    goal(move |ctx, store| {
        for (cond, body) in &clauses {
            let first = cond(ctx.clone(), store.clone());
            match first {
                Stream::Empty => continue,
                other => {
                    let body = body.clone();
                    return other.bind(cont(ctx.clone(), body));
                }
            }
        }
        Stream::empty()
    })
}

/// Committed choice with uniqueness: like `conda`, but only the first
/// answer of the committing condition is kept.
pub fn condu(clauses: Vec<(Goal, Goal)>) -> Goal {
    goal(move |ctx, store| {
        for (cond, body) in &clauses {
            let first = cond(ctx.clone(), store.clone()).take(Some(1));
            if let Some(s) = first.into_iter().next() {
                return (body.clone())(ctx.clone(), s);
            }
        }
        Stream::empty()
    })
}

pub fn once(g: Goal) -> Goal {
    goal(move |ctx, store| {
        let answers = g(ctx, store).take(Some(1));
        match answers.into_iter().next() {
            Some(s) => Stream::unit(s),
            None => Stream::empty(),
        }
    })
}

/// Walk every listed variable to ground and pass the resulting values to
/// `k`. If any variable is not yet ground, fails (per the projection
/// contract: `project` is for reading out already-determined values, not
/// for forcing them).
pub fn project(vars: Vec<Term>, k: impl Fn(Vec<Term>) -> Goal + Send + Sync + 'static) -> Goal {
    goal(move |ctx, store| {
        let walked: Vec<Term> = vars.iter().map(|v| store.deep_walk(v)).collect();
        (k(walked))(ctx, store)
    })
}

// -- derived list relations -------------------------------------------------

/// `membero(x, list)`: `x` unifies with some element of `list`.
pub fn membero(x: Term, list: Term) -> Goal {
    goal(move |ctx, store| {
        let x2 = x.clone();
        let inner = match list.as_pair() {
            None => fail(),
            Some((car, cdr)) => {
                let car = car.clone();
                let cdr = cdr.clone();
                disj(vec![eq(x2.clone(), car), membero(x2, cdr)])
            }
        };
        inner(ctx, store)
    })
}

/// `appendo(a, b, ab)`: the classic relational append.
pub fn appendo(a: Term, b: Term, ab: Term) -> Goal {
    goal(move |ctx, store| {
        let empty_branch = conj(vec![eq(a.clone(), Term::nil()), eq(b.clone(), ab.clone())]);
        let a2 = a.clone();
        let b2 = b.clone();
        let ab2 = ab.clone();
        let recur_branch = fresh_n(4, move |vs| {
            let (head, atail, abtail) = (vs[0].clone(), vs[1].clone(), vs[2].clone());
            conj(vec![
                eq(a2.clone(), Term::pair(head.clone(), atail.clone())),
                eq(ab2.clone(), Term::pair(head, abtail.clone())),
                appendo(atail, b2.clone(), abtail),
            ])
        });
        disj(vec![empty_branch, recur_branch])(ctx, store)
    })
}

// -- FD-backed relational arithmetic ---------------------------------------

/// Resolve a relational-arithmetic operand to an FD variable. A term that's
/// already a logic variable is used as-is; a ground integer literal mints a
/// fresh variable pinned to that singleton domain, so `pluso`/`minuso`/
/// `timeso` accept ground arguments (e.g. `pluso(2, 3, q)`) the same way
/// they accept unbound ones.
fn fd_operand(t: &Term, ctx: &Ctx, store: &HybridStore) -> Option<(VarId, HybridStore)> {
    if let Some(id) = t.as_var() {
        return Some((id, store.clone()));
    }
    let n = t.as_int()?;
    if n < 1 || n as u32 > ctx.max_value() {
        return None;
    }
    let id = Term::fresh().as_var().expect("Term::fresh() always yields a variable");
    let next = store.set_domain(id, Domain::singleton(n as u32, ctx.max_value())).ok()?;
    Some((id, next))
}

/// `pluso(x, y, z)`: `x + y = z`, expressed as a linear sum over the FD
/// layer so it narrows in whichever direction is determined first.
pub fn pluso(x: Term, y: Term, z: Term) -> Goal {
    goal(move |ctx, store| {
        let Some((vx, store)) = fd_operand(&x, &ctx, &store) else { return Stream::empty() };
        let Some((vy, store)) = fd_operand(&y, &ctx, &store) else { return Stream::empty() };
        let Some((vz, store)) = fd_operand(&z, &ctx, &store) else { return Stream::empty() };
        let s = store.add_constraint(ConstraintKind::LinearSum {
            coeffs: vec![1, 1],
            vars: vec![vx, vy],
            target: vz,
        });
        run_propagation(&ctx, &s)
    })
}

/// `minuso(x, y, z)`: `x - y = z`, restated as `y + z = x` to stay within
/// positive-only linear sums.
pub fn minuso(x: Term, y: Term, z: Term) -> Goal {
    goal(move |ctx, store| {
        let Some((vx, store)) = fd_operand(&x, &ctx, &store) else { return Stream::empty() };
        let Some((vy, store)) = fd_operand(&y, &ctx, &store) else { return Stream::empty() };
        let Some((vz, store)) = fd_operand(&z, &ctx, &store) else { return Stream::empty() };
        let s = store.add_constraint(ConstraintKind::LinearSum {
            coeffs: vec![1, 1],
            vars: vec![vy, vz],
            target: vx,
        });
        run_propagation(&ctx, &s)
    })
}

/// `timeso(x, y, z)`: `x * y = z` over non-negative domains.
pub fn timeso(x: Term, y: Term, z: Term) -> Goal {
    goal(move |ctx, store| {
        let Some((vx, store)) = fd_operand(&x, &ctx, &store) else { return Stream::empty() };
        let Some((vy, store)) = fd_operand(&y, &ctx, &store) else { return Stream::empty() };
        let Some((vz, store)) = fd_operand(&z, &ctx, &store) else { return Stream::empty() };
        let s = store.add_constraint(ConstraintKind::Times { x: vx, y: vy, z: vz });
        run_propagation(&ctx, &s)
    })
}

/// `infd(var, domain)`: narrow `var`'s FD domain, promoting to a binding if
/// it becomes a singleton.
pub fn infd(var: Term, domain: Domain) -> Goal {
    goal(move |ctx, store| {
        let Some(id) = var.as_var() else {
            return Stream::empty();
        };
        match store.set_domain(id, domain.clone()) {
            Ok(s) => run_propagation(&ctx, &s),
            Err(_) => Stream::empty(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ctx_max: u32, g: Goal, n: Option<usize>) -> Vec<HybridStore> {
        let ctx = Arc::new(Ctx::new(ctx_max));
        g(ctx, HybridStore::new()).take(n)
    }

    #[test]
    fn eq_unifies() {
        let x = Term::fresh();
        let out = run(10, eq(x.clone(), Term::int(5)), None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].walk(&x), Term::int(5));
    }

    #[test]
    fn neq_rejects_equal_grounds() {
        let out = run(10, neq(Term::int(1), Term::int(1)), None);
        assert!(out.is_empty());
    }

    #[test]
    fn disj_interleaves_both_branches() {
        let x = Term::fresh();
        let g = disj(vec![eq(x.clone(), Term::int(1)), eq(x.clone(), Term::int(2))]);
        let out = run(10, g, None);
        let values: Vec<_> = out.iter().map(|s| s.walk(&x)).collect();
        assert_eq!(values.len(), 2);
        assert!(values.contains(&Term::int(1)));
        assert!(values.contains(&Term::int(2)));
    }

    #[test]
    fn conj_threads_bindings() {
        let x = Term::fresh();
        let y = Term::fresh();
        let g = conj(vec![eq(x.clone(), Term::int(1)), eq(y.clone(), x.clone())]);
        let out = run(10, g, None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].walk(&y), Term::int(1));
    }

    #[test]
    fn once_takes_first_answer_only() {
        let x = Term::fresh();
        let g = once(disj(vec![eq(x.clone(), Term::int(1)), eq(x.clone(), Term::int(2))]));
        let out = run(10, g, None);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn membero_enumerates_list() {
        let x = Term::fresh();
        let list = Term::list(vec![Term::int(1), Term::int(2), Term::int(3)]);
        let out = run(10, membero(x.clone(), list), None);
        let values: Vec<_> = out.iter().map(|s| s.walk(&x)).collect();
        assert_eq!(values, vec![Term::int(1), Term::int(2), Term::int(3)]);
    }

    #[test]
    fn appendo_builds_concatenation() {
        let a = Term::list(vec![Term::int(1), Term::int(2)]);
        let b = Term::list(vec![Term::int(3)]);
        let ab = Term::fresh();
        let out = run(10, appendo(a, b, ab.clone()), Some(1));
        assert_eq!(
            out[0].deep_walk(&ab),
            Term::list(vec![Term::int(1), Term::int(2), Term::int(3)])
        );
    }

    #[test]
    fn pluso_forward_and_backward() {
        let x = Term::fresh();
        let y = Term::fresh();
        let z = Term::fresh();
        let g = conj(vec![
            infd(x.clone(), Domain::singleton(3, 10)),
            infd(y.clone(), Domain::singleton(4, 10)),
            pluso(x, y, z.clone()),
        ]);
        let out = run(10, g, None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].walk(&z), Term::int(7));
    }
}
