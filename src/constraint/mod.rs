//! Constraint kinds and their propagators.
//!
//! A `Constraint` pairs a unique id with a `ConstraintKind`. Every kind
//! implements `variables()` (for the propagation engine's worklist index),
//! and one or both of `check` (satisfied/violated/pending against the
//! current store) and `propagate` (domain pruning, returning the narrowed
//! store or `None` if nothing changed).

mod all_different;
mod cumulative;
mod element;
mod gcc;
mod lex;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::Domain;
use crate::error::{VResult, VulcanError};
use crate::store::HybridStore;
use crate::term::{Term, VarId};

pub use cumulative::Task;

static CONSTRAINT_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ConstraintId(u64);

impl ConstraintId {
    fn fresh() -> ConstraintId {
        ConstraintId(CONSTRAINT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeTag {
    Symbol,
    Number,
    Pair,
    Nil,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
}

#[derive(Clone, Debug)]
pub enum ConstraintKind {
    Disequality {
        u: Term,
        v: Term,
    },
    Absent {
        absent: Term,
        container: Term,
    },
    TypeOf {
        term: Term,
        tag: TypeTag,
    },
    Arithmetic {
        dst: VarId,
        src: VarId,
        k: i64,
    },
    Inequality {
        x: VarId,
        y: VarId,
        op: CmpOp,
    },
    Modulo {
        x: VarId,
        m: u32,
        remainder: VarId,
    },
    Lex {
        xs: Vec<VarId>,
        ys: Vec<VarId>,
        strict: bool,
    },
    GlobalCardinality {
        vars: Vec<VarId>,
        /// `(value, min_count, max_count)` per constrained value.
        bounds: Vec<(u32, u32, u32)>,
    },
    Element {
        index: VarId,
        values: Vec<VarId>,
        result: VarId,
    },
    LinearSum {
        coeffs: Vec<i64>,
        vars: Vec<VarId>,
        target: VarId,
    },
    /// `x * y = z` over positive domains. Not part of the original
    /// propagator table; added to support `timeso` (see `relation.rs`),
    /// restated over non-negative values only.
    Times {
        x: VarId,
        y: VarId,
        z: VarId,
    },
    BooleanSum {
        bools: Vec<VarId>,
        target: VarId,
    },
    Reified {
        b: VarId,
        inner: Box<ConstraintKind>,
    },
    ValueEqualsReified {
        b: VarId,
        x: VarId,
        v: u32,
    },
    Cumulative {
        tasks: Vec<Task>,
        capacity: u32,
    },
    AllDifferent {
        vars: Vec<VarId>,
    },
    Fresh {
        name: Term,
        term: Term,
    },
    AlphaEq {
        a: Term,
        b: Term,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CheckResult {
    Satisfied,
    Violated,
    Pending,
}

#[derive(Clone, Debug)]
pub struct Constraint {
    id: ConstraintId,
    kind: ConstraintKind,
}

/// Anything that can hand back the current domain for a variable id, so
/// propagators don't need direct access to the model's initial-domain
/// table. The model and the search layer both implement this trivially.
pub trait DomainSource {
    fn domain<'a>(&'a self, store: &'a HybridStore, id: VarId) -> &'a Domain;
    fn max_value(&self) -> u32;
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Constraint {
        Constraint {
            id: ConstraintId::fresh(),
            kind,
        }
    }

    pub fn id(&self) -> ConstraintId {
        self.id
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Term-level variable ids referenced anywhere in the (unwalked) term
    /// arguments of a relational constraint. FD constraints report their FD
    /// variable ids directly.
    pub fn variables(&self) -> Vec<VarId> {
        self.kind.variables()
    }

    pub fn check(&self, store: &HybridStore) -> CheckResult {
        self.kind.check(store)
    }

    pub fn propagate(
        &self,
        store: &HybridStore,
        domains: &dyn DomainSource,
    ) -> VResult<Option<HybridStore>> {
        self.kind.propagate(store, domains)
    }
}

fn term_vars(t: &Term, out: &mut Vec<VarId>) {
    if let Some(id) = t.as_var() {
        out.push(id);
    } else if let Some((car, cdr)) = t.as_pair() {
        term_vars(car, out);
        term_vars(cdr, out);
    }
}

impl ConstraintKind {
    pub fn variables(&self) -> Vec<VarId> {
        match self {
            ConstraintKind::Disequality { u, v } => {
                let mut out = Vec::new();
                term_vars(u, &mut out);
                term_vars(v, &mut out);
                out
            }
            ConstraintKind::Absent { absent, container } => {
                let mut out = Vec::new();
                term_vars(absent, &mut out);
                term_vars(container, &mut out);
                out
            }
            ConstraintKind::TypeOf { term, .. } => {
                let mut out = Vec::new();
                term_vars(term, &mut out);
                out
            }
            ConstraintKind::Arithmetic { dst, src, .. } => vec![*dst, *src],
            ConstraintKind::Inequality { x, y, .. } => vec![*x, *y],
            ConstraintKind::Modulo { x, remainder, .. } => vec![*x, *remainder],
            ConstraintKind::Lex { xs, ys, .. } => xs.iter().chain(ys.iter()).copied().collect(),
            ConstraintKind::GlobalCardinality { vars, .. } => vars.clone(),
            ConstraintKind::Element {
                index,
                values,
                result,
            } => {
                let mut out = vec![*index, *result];
                out.extend(values.iter().copied());
                out
            }
            ConstraintKind::LinearSum { vars, target, .. } => {
                let mut out = vars.clone();
                out.push(*target);
                out
            }
            ConstraintKind::Times { x, y, z } => vec![*x, *y, *z],
            ConstraintKind::BooleanSum { bools, target } => {
                let mut out = bools.clone();
                out.push(*target);
                out
            }
            ConstraintKind::Reified { b, inner } => {
                let mut out = vec![*b];
                out.extend(inner.variables());
                out
            }
            ConstraintKind::ValueEqualsReified { b, x, .. } => vec![*b, *x],
            ConstraintKind::Cumulative { tasks, .. } => tasks.iter().map(|t| t.start).collect(),
            ConstraintKind::AllDifferent { vars } => vars.clone(),
            ConstraintKind::Fresh { name, term } => {
                let mut out = Vec::new();
                term_vars(name, &mut out);
                term_vars(term, &mut out);
                out
            }
            ConstraintKind::AlphaEq { a, b } => {
                let mut out = Vec::new();
                term_vars(a, &mut out);
                term_vars(b, &mut out);
                out
            }
        }
    }

    pub fn check(&self, store: &HybridStore) -> CheckResult {
        match self {
            ConstraintKind::Disequality { u, v } => {
                let wu = store.deep_walk(u);
                let wv = store.deep_walk(v);
                if is_fully_ground(&wu) && is_fully_ground(&wv) {
                    if wu == wv {
                        CheckResult::Violated
                    } else {
                        CheckResult::Satisfied
                    }
                } else {
                    CheckResult::Pending
                }
            }
            ConstraintKind::Absent { absent, container } => {
                let wa = store.deep_walk(absent);
                let wc = store.deep_walk(container);
                if is_fully_ground(&wa) && is_fully_ground(&wc) {
                    if occurs_in(&wa, &wc) {
                        CheckResult::Violated
                    } else {
                        CheckResult::Satisfied
                    }
                } else {
                    CheckResult::Pending
                }
            }
            ConstraintKind::TypeOf { term, tag } => {
                let w = store.deep_walk(term);
                if w.is_var() {
                    return CheckResult::Pending;
                }
                let matches = match tag {
                    TypeTag::Symbol => matches!(w.as_atom(), Some(crate::term::Atom::Str(_))),
                    TypeTag::Number => matches!(w.as_atom(), Some(crate::term::Atom::Int(_))),
                    TypeTag::Pair => w.is_pair(),
                    TypeTag::Nil => w.is_nil(),
                };
                if matches {
                    CheckResult::Satisfied
                } else {
                    CheckResult::Violated
                }
            }
            ConstraintKind::Fresh { name, term } => {
                let wname = store.deep_walk(name);
                let wterm = store.deep_walk(term);
                if is_fully_ground(&wname) && is_fully_ground(&wterm) {
                    if occurs_in(&wname, &wterm) {
                        CheckResult::Violated
                    } else {
                        CheckResult::Satisfied
                    }
                } else {
                    CheckResult::Pending
                }
            }
            ConstraintKind::AlphaEq { a, b } => {
                let wa = store.deep_walk(a);
                let wb = store.deep_walk(b);
                if is_fully_ground(&wa) && is_fully_ground(&wb) {
                    if alpha_equivalent(&wa, &wb) {
                        CheckResult::Satisfied
                    } else {
                        CheckResult::Violated
                    }
                } else {
                    CheckResult::Pending
                }
            }
            // FD constraints are pruning-style and have no term-level
            // groundness test; `Reified` decides their status through
            // `as_ref_check` against live domains instead of `check()`.
            _ => {
                let _ = store;
                CheckResult::Pending
            }
        }
    }

    pub fn propagate(
        &self,
        store: &HybridStore,
        domains: &dyn DomainSource,
    ) -> VResult<Option<HybridStore>> {
        match self {
            ConstraintKind::Disequality { .. }
            | ConstraintKind::Absent { .. }
            | ConstraintKind::TypeOf { .. }
            | ConstraintKind::Fresh { .. }
            | ConstraintKind::AlphaEq { .. } => Ok(None),
            ConstraintKind::Arithmetic { dst, src, k } => propagate_arithmetic(store, domains, *dst, *src, *k),
            ConstraintKind::Inequality { x, y, op } => propagate_inequality(store, domains, *x, *y, *op),
            ConstraintKind::Modulo { x, m, remainder } => propagate_modulo(store, domains, *x, *m, *remainder),
            ConstraintKind::Lex { xs, ys, strict } => lex::propagate(store, domains, xs, ys, *strict),
            ConstraintKind::GlobalCardinality { vars, bounds } => gcc::propagate(store, domains, vars, bounds),
            ConstraintKind::Element {
                index,
                values,
                result,
            } => element::propagate(store, domains, *index, values, *result),
            ConstraintKind::LinearSum {
                coeffs,
                vars,
                target,
            } => propagate_linear_sum(store, domains, coeffs, vars, *target),
            ConstraintKind::Times { x, y, z } => propagate_times(store, domains, *x, *y, *z),
            ConstraintKind::BooleanSum { bools, target } => propagate_boolean_sum(store, domains, bools, *target),
            ConstraintKind::Reified { b, inner } => propagate_reified(store, domains, *b, inner),
            ConstraintKind::ValueEqualsReified { b, x, v } => {
                propagate_value_equals_reified(store, domains, *b, *x, *v)
            }
            ConstraintKind::Cumulative { tasks, capacity } => cumulative::propagate(store, domains, tasks, *capacity),
            ConstraintKind::AllDifferent { vars } => all_different::propagate(store, domains, vars),
        }
    }
}

fn is_fully_ground(t: &Term) -> bool {
    if t.is_var() {
        return false;
    }
    match t.as_pair() {
        Some((car, cdr)) => is_fully_ground(car) && is_fully_ground(cdr),
        None => true,
    }
}

fn occurs_in(needle: &Term, hay: &Term) -> bool {
    if needle == hay {
        return true;
    }
    match hay.as_pair() {
        Some((car, cdr)) => occurs_in(needle, car) || occurs_in(needle, cdr),
        None => false,
    }
}

/// Structural alpha-equivalence up to consistent renaming of bound names.
/// Binders are represented as `[name, body]` pairs; a fresh correspondence
/// map is threaded through the comparison.
fn alpha_equivalent(a: &Term, b: &Term) -> bool {
    fn go(a: &Term, b: &Term, map: &mut Vec<(Term, Term)>) -> bool {
        match (a.as_pair(), b.as_pair()) {
            (Some((aname, abody)), Some((bname, bbody))) if aname.is_atom() && abody.is_pair() => {
                // Treat a [name, body] pair as a binder when its car is an atom.
                map.push((aname.clone(), bname.clone()));
                let ok = go(abody, bbody, map);
                map.pop();
                ok
            }
            (Some((aa, ad)), Some((ba, bd))) => go(aa, ba, map) && go(ad, bd, map),
            (None, None) => {
                if let (Some(_), Some(_)) = (a.as_atom(), b.as_atom()) {
                    for (an, bn) in map.iter().rev() {
                        if an == a {
                            return bn == b;
                        }
                    }
                    a == b
                } else {
                    a == b
                }
            }
            _ => false,
        }
    }
    go(a, b, &mut Vec::new())
}

fn propagate_arithmetic(
    store: &HybridStore,
    dom: &dyn DomainSource,
    dst: VarId,
    src: VarId,
    k: i64,
) -> VResult<Option<HybridStore>> {
    if dst == src {
        return if k == 0 { Ok(None) } else { Err(VulcanError::Conflict) };
    }
    let max_value = dom.max_value();
    let dsrc = dom.domain(store, src).clone();
    let ddst = dom.domain(store, dst).clone();

    let forward: Vec<u32> = dsrc
        .iterate()
        .filter_map(|v| {
            let shifted = v as i64 + k;
            if shifted >= 1 && shifted <= max_value as i64 {
                Some(shifted as u32)
            } else {
                None
            }
        })
        .collect();
    let new_dst = ddst.intersect(&Domain::from_values(forward, max_value));

    let backward: Vec<u32> = new_dst
        .iterate()
        .filter_map(|v| {
            let shifted = v as i64 - k;
            if shifted >= 1 && shifted <= max_value as i64 {
                Some(shifted as u32)
            } else {
                None
            }
        })
        .collect();
    let new_src = dsrc.intersect(&Domain::from_values(backward, max_value));

    let mut next = store.clone();
    let mut changed = false;
    if new_dst != ddst {
        next = next.set_domain(dst, new_dst)?;
        changed = true;
    }
    if new_src != dsrc {
        next = next.set_domain(src, new_src)?;
        changed = true;
    }
    Ok(if changed { Some(next) } else { None })
}

fn propagate_inequality(
    store: &HybridStore,
    dom: &dyn DomainSource,
    x: VarId,
    y: VarId,
    op: CmpOp,
) -> VResult<Option<HybridStore>> {
    if x == y {
        return match op {
            CmpOp::Lt | CmpOp::Gt | CmpOp::Ne => Err(VulcanError::Conflict),
            CmpOp::Le | CmpOp::Ge => Ok(None),
        };
    }
    let dx = dom.domain(store, x).clone();
    let dy = dom.domain(store, y).clone();

    let (new_x, new_y) = match op {
        CmpOp::Lt => (
            dy.max().map(|m| dx.remove_at_or_above(m)).unwrap_or_else(|| dx.clone()),
            dx.min().map(|m| dy.remove_at_or_below(m)).unwrap_or_else(|| dy.clone()),
        ),
        CmpOp::Le => (
            dy.max().map(|m| dx.remove_above(m)).unwrap_or_else(|| dx.clone()),
            dx.min().map(|m| dy.remove_below(m)).unwrap_or_else(|| dy.clone()),
        ),
        CmpOp::Gt => (
            dy.min().map(|m| dx.remove_at_or_below(m)).unwrap_or_else(|| dx.clone()),
            dx.max().map(|m| dy.remove_at_or_above(m)).unwrap_or_else(|| dy.clone()),
        ),
        CmpOp::Ge => (
            dy.min().map(|m| dx.remove_below(m)).unwrap_or_else(|| dx.clone()),
            dx.max().map(|m| dy.remove_above(m)).unwrap_or_else(|| dy.clone()),
        ),
        CmpOp::Ne => {
            let nx = if let Some(v) = dy.singleton_value() {
                dx.remove(v)
            } else {
                dx.clone()
            };
            let ny = if let Some(v) = dx.singleton_value() {
                dy.remove(v)
            } else {
                dy.clone()
            };
            (nx, ny)
        }
    };

    let mut next = store.clone();
    let mut changed = false;
    if new_x != dx {
        next = next.set_domain(x, new_x)?;
        changed = true;
    }
    if new_y != dy {
        next = next.set_domain(y, new_y)?;
        changed = true;
    }
    Ok(if changed { Some(next) } else { None })
}

fn propagate_modulo(
    store: &HybridStore,
    dom: &dyn DomainSource,
    x: VarId,
    m: u32,
    remainder: VarId,
) -> VResult<Option<HybridStore>> {
    if m == 0 {
        return Err(VulcanError::Internal("modulo with m = 0".into()));
    }
    let max_value = dom.max_value();
    if x == remainder {
        let dx = dom.domain(store, x).clone();
        let restricted = dx.intersect(&Domain::range(1, m.saturating_sub(1).max(1), max_value));
        return if restricted != dx {
            Ok(Some(store.set_domain(x, restricted)?))
        } else {
            Ok(None)
        };
    }
    let dx = dom.domain(store, x).clone();
    let drem = dom.domain(store, remainder).clone();

    let encode = |v: u32| -> u32 {
        let r = v % m;
        if r == 0 {
            m
        } else {
            r
        }
    };
    let decode = |r: u32| -> u32 {
        if r == m {
            0
        } else {
            r
        }
    };

    let forward: Vec<u32> = dx.iterate().map(encode).collect();
    let new_rem = drem.intersect(&Domain::from_values(forward, max_value));

    let mut backward = Vec::new();
    for r in new_rem.iterate() {
        let base = decode(r);
        let mut k = 0i64;
        loop {
            let v = base as i64 + k * m as i64;
            if v > max_value as i64 {
                break;
            }
            if v >= 1 {
                backward.push(v as u32);
            }
            k += 1;
        }
    }
    let new_x = dx.intersect(&Domain::from_values(backward, max_value));

    let mut next = store.clone();
    let mut changed = false;
    if new_rem != drem {
        next = next.set_domain(remainder, new_rem)?;
        changed = true;
    }
    if new_x != dx {
        next = next.set_domain(x, new_x)?;
        changed = true;
    }
    Ok(if changed { Some(next) } else { None })
}

fn propagate_linear_sum(
    store: &HybridStore,
    dom: &dyn DomainSource,
    coeffs: &[i64],
    vars: &[VarId],
    target: VarId,
) -> VResult<Option<HybridStore>> {
    let max_value = dom.max_value();
    let domains: Vec<Domain> = vars.iter().map(|v| dom.domain(store, *v).clone()).collect();
    let bounds: Vec<(i64, i64)> = domains
        .iter()
        .zip(coeffs.iter())
        .map(|(d, c)| {
            let lo = d.min().unwrap_or(1) as i64;
            let hi = d.max().unwrap_or(1) as i64;
            if *c >= 0 {
                (c * lo, c * hi)
            } else {
                (c * hi, c * lo)
            }
        })
        .collect();
    let sum_min: i64 = bounds.iter().map(|(lo, _)| lo).sum();
    let sum_max: i64 = bounds.iter().map(|(_, hi)| hi).sum();

    let dtarget = dom.domain(store, target).clone();
    let new_target = dtarget.intersect(&Domain::range(
        sum_min.max(1) as u32,
        sum_max.min(max_value as i64).max(0) as u32,
        max_value,
    ));

    let mut next = store.clone();
    let mut changed = false;
    if new_target != dtarget {
        next = next.set_domain(target, new_target.clone())?;
        changed = true;
    }

    let tmin = new_target.min().unwrap_or(1) as i64;
    let tmax = new_target.max().unwrap_or(max_value as i64) as i64;

    for (i, (var, c)) in vars.iter().zip(coeffs.iter()).enumerate() {
        if *c == 0 {
            continue;
        }
        let others_min: i64 = bounds
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (lo, _))| lo)
            .sum();
        let others_max: i64 = bounds
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (_, hi))| hi)
            .sum();
        // c * x = target - others  =>  x = (target - others) / c
        let lo_num = tmin - others_max;
        let hi_num = tmax - others_min;
        let (xlo, xhi) = if *c > 0 {
            (
                div_ceil(lo_num, *c),
                div_floor(hi_num, *c),
            )
        } else {
            (
                div_ceil(hi_num, *c),
                div_floor(lo_num, *c),
            )
        };
        let old = dom.domain(&next, *var).clone();
        let new = old.intersect(&Domain::range(
            xlo.max(1) as u32,
            xhi.min(max_value as i64).max(0) as u32,
            max_value,
        ));
        if new != old {
            next = next.set_domain(*var, new)?;
            changed = true;
        }
    }

    Ok(if changed { Some(next) } else { None })
}

/// `x * y = z`, bounds-consistent by enumeration (domains are bounded by
/// `max_value`, so the cross product is finite and cheap at the sizes this
/// crate targets).
fn propagate_times(
    store: &HybridStore,
    dom: &dyn DomainSource,
    x: VarId,
    y: VarId,
    z: VarId,
) -> VResult<Option<HybridStore>> {
    let max_value = dom.max_value();
    let dx = dom.domain(store, x).clone();
    let dy = dom.domain(store, y).clone();
    let dz = dom.domain(store, z).clone();

    let mut reachable_z = Vec::new();
    let mut reachable_x = std::collections::HashSet::new();
    let mut reachable_y = std::collections::HashSet::new();
    for a in dx.iterate() {
        for b in dy.iterate() {
            let p = a as i64 * b as i64;
            if p >= 1 && p <= max_value as i64 && dz.has(p as u32) {
                reachable_z.push(p as u32);
                reachable_x.insert(a);
                reachable_y.insert(b);
            }
        }
    }

    let new_z = dz.intersect(&Domain::from_values(reachable_z, max_value));
    let new_x = dx.intersect(&Domain::from_values(reachable_x, max_value));
    let new_y = dy.intersect(&Domain::from_values(reachable_y, max_value));

    let mut next = store.clone();
    let mut changed = false;
    if new_z != dz {
        next = next.set_domain(z, new_z)?;
        changed = true;
    }
    if new_x != dx {
        next = next.set_domain(x, new_x)?;
        changed = true;
    }
    if new_y != dy {
        next = next.set_domain(y, new_y)?;
        changed = true;
    }
    Ok(if changed { Some(next) } else { None })
}

fn div_floor(a: i64, b: i64) -> i64 {
    if b == 0 {
        return i64::MIN;
    }
    let d = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        d - 1
    } else {
        d
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    if b == 0 {
        return i64::MAX;
    }
    let d = a / b;
    if (a % b != 0) && ((a < 0) == (b < 0)) {
        d + 1
    } else {
        d
    }
}

/// Booleans are encoded `1 = false, 2 = true`, and `target = count-of-trues + 1`
/// ranging over `[1, n+1]`.
fn propagate_boolean_sum(
    store: &HybridStore,
    dom: &dyn DomainSource,
    bools: &[VarId],
    target: VarId,
) -> VResult<Option<HybridStore>> {
    let max_value = dom.max_value();
    let n = bools.len() as u32;
    let domains: Vec<Domain> = bools.iter().map(|b| dom.domain(store, *b).clone()).collect();

    let lb: u32 = domains.iter().filter(|d| d.singleton_value() == Some(2)).count() as u32;
    let ub: u32 = domains.iter().filter(|d| d.has(2)).count() as u32;

    let dtarget = dom.domain(store, target).clone();
    let new_target = dtarget.intersect(&Domain::range(lb + 1, ub + 1, max_value));

    let mut next = store.clone();
    let mut changed = false;
    if new_target != dtarget {
        next = next.set_domain(target, new_target.clone())?;
        changed = true;
    }

    let tmin = new_target.min().unwrap_or(1) as i64;
    let tmax = new_target.max().unwrap_or((n + 1) as i64) as i64;

    for (i, b) in bools.iter().enumerate() {
        let d = dom.domain(&next, *b).clone();
        let bmin = if d.singleton_value() == Some(2) { 1 } else { 0 };
        let bmax = if d.has(2) { 1 } else { 0 };
        let other_lb = lb as i64 - bmin;
        let other_ub = ub as i64 - bmax;
        if tmin - 1 > other_ub {
            // b_i must be true
            let narrowed = d.intersect(&Domain::singleton(2, max_value));
            if narrowed != d {
                next = next.set_domain(*b, narrowed)?;
                changed = true;
            }
        } else if tmax - 1 < other_lb {
            // b_i must be false
            let narrowed = d.intersect(&Domain::singleton(1, max_value));
            if narrowed != d {
                next = next.set_domain(*b, narrowed)?;
                changed = true;
            }
        }
    }

    Ok(if changed { Some(next) } else { None })
}

fn propagate_value_equals_reified(
    store: &HybridStore,
    dom: &dyn DomainSource,
    b: VarId,
    x: VarId,
    v: u32,
) -> VResult<Option<HybridStore>> {
    let max_value = dom.max_value();
    let dx = dom.domain(store, x).clone();
    let db = dom.domain(store, b).clone();

    let mut next = store.clone();
    let mut changed = false;

    if !dx.has(v) {
        let narrowed = db.intersect(&Domain::singleton(1, max_value));
        if narrowed != db {
            next = next.set_domain(b, narrowed)?;
            changed = true;
        }
    } else if dx.singleton_value() == Some(v) {
        let narrowed = db.intersect(&Domain::singleton(2, max_value));
        if narrowed != db {
            next = next.set_domain(b, narrowed)?;
            changed = true;
        }
    }

    let db_now = dom.domain(&next, b).clone();
    if db_now.singleton_value() == Some(2) {
        let narrowed = dom.domain(&next, x).clone().intersect(&Domain::singleton(v, max_value));
        if narrowed != *dom.domain(&next, x) {
            next = next.set_domain(x, narrowed)?;
            changed = true;
        }
    } else if db_now.singleton_value() == Some(1) {
        let old = dom.domain(&next, x).clone();
        let narrowed = old.remove(v);
        if narrowed != old {
            next = next.set_domain(x, narrowed)?;
            changed = true;
        }
    }

    Ok(if changed { Some(next) } else { None })
}

fn propagate_reified(
    store: &HybridStore,
    dom: &dyn DomainSource,
    b: VarId,
    inner: &ConstraintKind,
) -> VResult<Option<HybridStore>> {
    let max_value = dom.max_value();
    let db = dom.domain(store, b).clone();

    if db.singleton_value() == Some(2) {
        return inner.propagate(store, dom);
    }
    if db.singleton_value() == Some(1) {
        // Force the negation: only disequality/inequality kinds have a
        // well-defined negation here; others are left pending (they are
        // only meant to be reified through `ValueEqualsReified`, which is
        // handled as its own kind).
        return match inner {
            ConstraintKind::Inequality { x, y, op } => {
                let negated = match op {
                    CmpOp::Lt => CmpOp::Ge,
                    CmpOp::Le => CmpOp::Gt,
                    CmpOp::Gt => CmpOp::Le,
                    CmpOp::Ge => CmpOp::Lt,
                    CmpOp::Ne => CmpOp::Ne, // handled below
                };
                if matches!(op, CmpOp::Ne) {
                    // negation of != is =: equalize domains.
                    let dx = dom.domain(store, *x).clone();
                    let dy = dom.domain(store, *y).clone();
                    let merged = dx.intersect(&dy);
                    let mut next = store.clone();
                    let mut changed = false;
                    if merged != dx {
                        next = next.set_domain(*x, merged.clone())?;
                        changed = true;
                    }
                    if merged != dy {
                        next = next.set_domain(*y, merged)?;
                        changed = true;
                    }
                    Ok(if changed { Some(next) } else { None })
                } else {
                    propagate_inequality(store, dom, *x, *y, negated)
                }
            }
            _ => Ok(None),
        };
    }

    // b still unbound: check whether inner is already decided by the store
    // and force b accordingly.
    match inner.as_ref_check(store, dom) {
        CheckResult::Satisfied => {
            let narrowed = db.intersect(&Domain::singleton(2, max_value));
            Ok(Some(store.set_domain(b, narrowed)?))
        }
        CheckResult::Violated => {
            let narrowed = db.intersect(&Domain::singleton(1, max_value));
            Ok(Some(store.set_domain(b, narrowed)?))
        }
        CheckResult::Pending => Ok(None),
    }
}

impl ConstraintKind {
    /// A variant of `check` usable for FD inner constraints of `Reified`,
    /// where boundedness (not groundness) decides satisfaction.
    fn as_ref_check(&self, store: &HybridStore, dom: &dyn DomainSource) -> CheckResult {
        match self {
            ConstraintKind::Inequality { x, y, op } => {
                let dx = dom.domain(store, *x);
                let dy = dom.domain(store, *y);
                let (xmin, xmax) = (dx.min(), dx.max());
                let (ymin, ymax) = (dy.min(), dy.max());
                match (xmin, xmax, ymin, ymax) {
                    (Some(xmin), Some(xmax), Some(ymin), Some(ymax)) => match op {
                        CmpOp::Lt => {
                            if xmax < ymin {
                                CheckResult::Satisfied
                            } else if xmin >= ymax {
                                CheckResult::Violated
                            } else {
                                CheckResult::Pending
                            }
                        }
                        CmpOp::Le => {
                            if xmax <= ymin {
                                CheckResult::Satisfied
                            } else if xmin > ymax {
                                CheckResult::Violated
                            } else {
                                CheckResult::Pending
                            }
                        }
                        CmpOp::Gt => {
                            if xmin > ymax {
                                CheckResult::Satisfied
                            } else if xmax <= ymin {
                                CheckResult::Violated
                            } else {
                                CheckResult::Pending
                            }
                        }
                        CmpOp::Ge => {
                            if xmin >= ymax {
                                CheckResult::Satisfied
                            } else if xmax < ymin {
                                CheckResult::Violated
                            } else {
                                CheckResult::Pending
                            }
                        }
                        CmpOp::Ne => {
                            if dx.is_singleton() && dy.is_singleton() {
                                if xmin == ymin {
                                    CheckResult::Violated
                                } else {
                                    CheckResult::Satisfied
                                }
                            } else if dx.is_disjoint(dy) {
                                CheckResult::Satisfied
                            } else {
                                CheckResult::Pending
                            }
                        }
                    },
                    _ => CheckResult::Pending,
                }
            }
            _ => CheckResult::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    #[test]
    fn disequality_check_transitions() {
        let s = HybridStore::new();
        let a = Term::fresh();
        let b = Term::int(3);
        let c = ConstraintKind::Disequality { u: a.clone(), v: b.clone() };
        assert_eq!(c.check(&s), CheckResult::Pending);
        let s2 = s.unify(&a, &Term::int(3)).unwrap();
        assert_eq!(c.check(&s2), CheckResult::Violated);
        let s3 = s.unify(&a, &Term::int(4)).unwrap();
        assert_eq!(c.check(&s3), CheckResult::Satisfied);
    }

    #[test]
    fn arithmetic_forward_and_backward() {
        let mut model = Model::new(10);
        let x = model.new_variable(Domain::full(10));
        let y = model.new_variable(Domain::full(10));
        let store = model
            .initial_store()
            .set_domain(x, Domain::range(1, 3, 10))
            .unwrap();
        let result = propagate_arithmetic(&store, &model, y, x, 5).unwrap().unwrap();
        assert_eq!(model.domain(&result, y).iterate().collect::<Vec<_>>(), vec![6, 7, 8]);
    }

    #[test]
    fn alpha_equivalence_basic() {
        let lam = |n: &str, body: Term| Term::pair(Term::string(n), body);
        let t1 = lam("x", Term::string("x"));
        let t2 = lam("y", Term::string("y"));
        assert!(alpha_equivalent(&t1, &t2));
        let t3 = lam("y", Term::string("z"));
        assert!(!alpha_equivalent(&t1, &t3));
    }
}
