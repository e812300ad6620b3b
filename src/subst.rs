//! Persistent substitution: a map from variable id to term, backed by
//! `im::HashMap` so every version is cheap to clone and every branch shares
//! structure with its ancestors instead of copying.
//!
//! `extend` never mutates an existing `Subst`; it returns a new persistent
//! value that shares most of its internal tree with the one it was built
//! from.

use im::HashMap;

use crate::term::{Term, VarId};

/// A persistent substitution. The empty substitution is `Subst::new()`.
#[derive(Clone, Debug, Default)]
pub struct Subst(HashMap<VarId, Term>);

impl Subst {
    pub fn new() -> Subst {
        Subst(HashMap::new())
    }

    fn get(&self, id: VarId) -> Option<&Term> {
        self.0.get(&id)
    }

    /// Extend with one new binding, returning a new `Subst`. Does not check
    /// occurs or re-bind an existing variable; callers are expected to have
    /// already walked and occurs-checked.
    pub fn extend(&self, id: VarId, t: Term) -> Subst {
        Subst(self.0.update(id, t))
    }

    /// Follow a variable chain to its deepest non-variable binding, or to an
    /// unbound variable. Does not recurse into pairs.
    pub fn walk(&self, t: &Term) -> Term {
        let mut cur = t.clone();
        while let Some(id) = cur.as_var() {
            match self.get(id) {
                Some(bound) => cur = bound.clone(),
                None => break,
            }
        }
        cur
    }

    /// Like `walk`, but also rewrites inside pairs, producing a fully walked
    /// term tree.
    pub fn deep_walk(&self, t: &Term) -> Term {
        let walked = self.walk(t);
        match walked.as_pair() {
            Some((car, cdr)) => Term::pair(self.deep_walk(car), self.deep_walk(cdr)),
            None => walked,
        }
    }

    /// True iff `id` occurs free in `t` after walking. Used by unification to
    /// reject cyclic bindings.
    pub fn occurs_check(&self, id: VarId, t: &Term) -> bool {
        let walked = self.walk(t);
        match walked.as_var() {
            Some(v) => v == id,
            None => match walked.as_pair() {
                Some((car, cdr)) => self.occurs_check(id, car) || self.occurs_check(id, cdr),
                None => false,
            },
        }
    }

    pub fn is_bound(&self, id: VarId) -> bool {
        self.get(id).is_some()
    }

    /// Restrict to the bindings of each id in `vars`. `im::HashMap` already
    /// shares structure across versions in O(log n), so unlike a hand-rolled
    /// parent chain this isn't load-bearing for lookup speed; it only exists
    /// so callers that want to drop dead variables (e.g. ones local to a
    /// discarded search branch) can do so explicitly.
    pub fn flatten(&self, vars: &[VarId]) -> Subst {
        let mut out = HashMap::new();
        for &id in vars {
            if let Some(t) = self.get(id) {
                out.insert(id, t.clone());
            }
        }
        Subst(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_unbound_returns_self() {
        let s = Subst::new();
        let v = Term::fresh();
        assert_eq!(s.walk(&v), v);
    }

    #[test]
    fn walk_chain() {
        let s = Subst::new();
        let a = Term::fresh();
        let b = Term::fresh();
        let ida = a.as_var().unwrap();
        let idb = b.as_var().unwrap();
        let s = s.extend(ida, b.clone());
        let s = s.extend(idb, Term::int(7));
        assert_eq!(s.walk(&a), Term::int(7));
    }

    #[test]
    fn deep_walk_rewrites_pairs() {
        let s = Subst::new();
        let a = Term::fresh();
        let ida = a.as_var().unwrap();
        let s = s.extend(ida, Term::int(1));
        let list = Term::list(vec![a.clone(), Term::int(2)]);
        assert_eq!(s.deep_walk(&list), Term::list(vec![Term::int(1), Term::int(2)]));
    }

    #[test]
    fn occurs_check_detects_self_reference() {
        let s = Subst::new();
        let a = Term::fresh();
        let ida = a.as_var().unwrap();
        let list = Term::list(vec![a.clone()]);
        assert!(s.occurs_check(ida, &list));
        assert!(!s.occurs_check(ida, &Term::int(3)));
    }

    #[test]
    fn parent_chain_lookup() {
        let s0 = Subst::new();
        let a = Term::fresh();
        let ida = a.as_var().unwrap();
        let s1 = s0.extend(ida, Term::int(42));
        let b = Term::fresh();
        let idb = b.as_var().unwrap();
        let s2 = s1.extend(idb, Term::int(43));
        assert_eq!(s2.walk(&a), Term::int(42));
        assert_eq!(s2.walk(&b), Term::int(43));
        assert_eq!(s0.walk(&a), a);
    }
}
