//! The hybrid store: persistent, copy-on-write, carrying bindings, FD
//! domains, the constraint list, and the set of variables touched since the
//! last propagation wave.

use std::collections::HashSet;
use std::sync::Arc;

use crate::constraint::{CheckResult, Constraint, ConstraintKind};
use crate::constraints_log::ConstraintLog;
use crate::domain::Domain;
use crate::domains::DomainStore;
use crate::error::{VResult, VulcanError};
use crate::subst::Subst;
use crate::term::{Term, VarId};

/// A store version. Cheap to clone (a handful of `Arc` bumps); cloning two
/// stores from the same ancestor shares everything above the point they
/// diverged.
#[derive(Clone, Debug)]
pub struct HybridStore {
    subst: Subst,
    domains: DomainStore,
    constraints: ConstraintLog,
    changed_vars: Arc<HashSet<VarId>>,
    depth: u32,
}

impl HybridStore {
    pub fn new() -> HybridStore {
        HybridStore {
            subst: Subst::new(),
            domains: DomainStore::new(),
            constraints: ConstraintLog::new(),
            changed_vars: Arc::new(HashSet::new()),
            depth: 0,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn with_depth(&self, depth: u32) -> HybridStore {
        let mut next = self.clone();
        next.depth = depth;
        next
    }

    /// Rebuild the bindings and domains of `vars` at a fresh root, bounding
    /// parent-chain lookup depth. The constraint log is left untouched (an
    /// append-only list is already O(1) to extend and cheap to share).
    pub fn flatten(&self, vars: &[VarId]) -> HybridStore {
        let mut next = self.clone();
        next.subst = self.subst.flatten(vars);
        next.domains = self.domains.flatten(vars);
        next
    }

    pub fn changed_vars(&self) -> &HashSet<VarId> {
        &self.changed_vars
    }

    /// Clear `changed_vars`; called by the propagation engine once a
    /// fixpoint is reached (invariant I3).
    pub fn clear_changed(&self) -> HybridStore {
        let mut next = self.clone();
        next.changed_vars = Arc::new(HashSet::new());
        next
    }

    fn mark_changed(&self, id: VarId) -> Arc<HashSet<VarId>> {
        let mut set = (*self.changed_vars).clone();
        set.insert(id);
        Arc::new(set)
    }

    // -- bindings --------------------------------------------------------

    pub fn get_binding(&self, id: VarId) -> Option<Term> {
        let t = Term::var(id);
        let walked = self.subst.walk(&t);
        if walked == t {
            None
        } else {
            Some(walked)
        }
    }

    pub fn walk(&self, t: &Term) -> Term {
        self.subst.walk(t)
    }

    pub fn deep_walk(&self, t: &Term) -> Term {
        self.subst.deep_walk(t)
    }

    /// Add a binding without occurs-check (caller must have already
    /// performed it, as `unify` does).
    pub fn add_binding(&self, id: VarId, t: Term) -> HybridStore {
        let mut next = self.clone();
        next.subst = next.subst.extend(id, t);
        next.changed_vars = self.mark_changed(id);
        next
    }

    // -- domains -----------------------------------------------------------

    /// The effective domain for `id`, or `initial` if nothing in the store
    /// narrows it yet (the `FDVariable`'s declared initial domain lives
    /// outside the store, per the model).
    pub fn get_domain<'a>(&'a self, id: VarId, initial: &'a Domain) -> &'a Domain {
        self.domains.get(id).unwrap_or(initial)
    }

    pub fn domains_raw(&self) -> &DomainStore {
        &self.domains
    }

    /// Narrow `id`'s domain to `domain`. An empty result is a conflict. A
    /// singleton result is also promoted to a binding so relational goals
    /// observing the variable see it as ground.
    pub fn set_domain(&self, id: VarId, domain: Domain) -> VResult<HybridStore> {
        if domain.is_empty() {
            return Err(VulcanError::Conflict);
        }
        let mut next = self.clone();
        next.domains = next.domains.set(id, domain.clone());
        next.changed_vars = self.mark_changed(id);
        if let Some(v) = domain.singleton_value() {
            if next.get_binding(id).is_none() {
                next.subst = next.subst.extend(id, Term::int(v as i64));
            }
        }
        Ok(next)
    }

    pub fn exclude_from_domain(&self, id: VarId, v: u32, initial: &Domain) -> VResult<HybridStore> {
        let cur = self.get_domain(id, initial).clone();
        self.set_domain(id, cur.remove(v))
    }

    // -- constraints ---------------------------------------------------------

    pub fn add_constraint(&self, kind: ConstraintKind) -> HybridStore {
        let mut next = self.clone();
        next.constraints = next.constraints.push(Constraint::new(kind));
        next
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    // -- unification -----------------------------------------------------

    /// `unify(u, v)`: walk both, bind an unbound variable to the other side
    /// (occurs-checked), recurse into pairs, compare atoms by value.
    pub fn unify(&self, u: &Term, v: &Term) -> VResult<HybridStore> {
        let wu = self.walk(u);
        let wv = self.walk(v);
        match (wu.as_var(), wv.as_var()) {
            (Some(a), Some(b)) if a == b => Ok(self.clone()),
            (Some(a), _) => self.bind(a, &wv),
            (_, Some(b)) => self.bind(b, &wu),
            (None, None) => {
                if let (Some((ucar, ucdr)), Some((vcar, vcdr))) = (wu.as_pair(), wv.as_pair()) {
                    let s1 = self.unify(ucar, vcar)?;
                    s1.unify(ucdr, vcdr)
                } else if wu == wv {
                    Ok(self.clone())
                } else {
                    Err(VulcanError::Conflict)
                }
            }
        }
    }

    fn bind(&self, id: VarId, t: &Term) -> VResult<HybridStore> {
        if self.subst.occurs_check(id, t) {
            return Err(VulcanError::Conflict);
        }
        Ok(self.add_binding(id, t.clone()))
    }

    /// `disunify`: add a disequality constraint unless it is already
    /// trivially satisfied or violated once both sides are walked.
    pub fn disunify(&self, u: &Term, v: &Term) -> VResult<HybridStore> {
        let wu = self.deep_walk(u);
        let wv = self.deep_walk(v);
        if wu == wv && !wu.is_var() {
            return Err(VulcanError::Conflict);
        }
        Ok(self.add_constraint(ConstraintKind::Disequality { u: wu, v: wv }))
    }

    pub fn reify(&self, t: &Term) -> Term {
        self.deep_walk(t)
    }

    /// Drop disequality/absence/type/nominal constraints that are already
    /// `Satisfied` against the current bindings, and fail if any is
    /// `Violated`. Pruning-style (FD) constraints always read `Pending`
    /// here and are left untouched. Called after every unify so a
    /// disequality becomes irrelevant as soon as its variables diverge.
    pub fn purify(&self) -> VResult<HybridStore> {
        let mut kept = Vec::new();
        for c in self.constraints() {
            match c.check(self) {
                CheckResult::Violated => return Err(VulcanError::Conflict),
                CheckResult::Satisfied => {}
                CheckResult::Pending => kept.push(c.clone()),
            }
        }
        let mut next = self.clone();
        next.constraints = ConstraintLog::from_entries(kept);
        Ok(next)
    }
}

impl Default for HybridStore {
    fn default() -> Self {
        HybridStore::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unify_vars() {
        let s = HybridStore::new();
        let a = Term::fresh();
        let b = Term::fresh();
        let s = s.unify(&a, &b).unwrap();
        assert_eq!(s.walk(&a), s.walk(&b));
    }

    #[test]
    fn unify_atoms_conflict() {
        let s = HybridStore::new();
        assert!(s.unify(&Term::int(1), &Term::int(2)).is_err());
        assert!(s.unify(&Term::int(1), &Term::int(1)).is_ok());
    }

    #[test]
    fn unify_occurs_check_rejects_cycle() {
        let s = HybridStore::new();
        let a = Term::fresh();
        let id = a.as_var().unwrap();
        let list = Term::list(vec![a.clone()]);
        assert!(matches!(s.unify(&a, &list), Err(VulcanError::Conflict)));
        let _ = id;
    }

    #[test]
    fn unify_pairs_recurse() {
        let s = HybridStore::new();
        let a = Term::fresh();
        let pair_a = Term::pair(a.clone(), Term::int(2));
        let pair_b = Term::pair(Term::int(1), Term::int(2));
        let s = s.unify(&pair_a, &pair_b).unwrap();
        assert_eq!(s.walk(&a), Term::int(1));
    }

    #[test]
    fn set_domain_promotes_singleton_to_binding() {
        let s = HybridStore::new();
        let a = Term::fresh();
        let id = a.as_var().unwrap();
        let s = s.set_domain(id, Domain::singleton(4, 10)).unwrap();
        assert_eq!(s.get_binding(id), Some(Term::int(4)));
    }

    #[test]
    fn set_domain_empty_is_conflict() {
        let s = HybridStore::new();
        let id = VarId::fresh();
        assert!(matches!(
            s.set_domain(id, Domain::empty(10)),
            Err(VulcanError::Conflict)
        ));
    }

    #[test]
    fn disunify_ground_equal_conflicts() {
        let s = HybridStore::new();
        assert!(s.disunify(&Term::int(1), &Term::int(1)).is_err());
        assert!(s.disunify(&Term::int(1), &Term::int(2)).is_ok());
    }

    #[test]
    fn branches_from_same_ancestor_are_isolated() {
        let base = HybridStore::new();
        let a = Term::fresh();
        let branch1 = base.unify(&a, &Term::int(1)).unwrap();
        let branch2 = base.unify(&a, &Term::int(2)).unwrap();
        assert_eq!(branch1.walk(&a), Term::int(1));
        assert_eq!(branch2.walk(&a), Term::int(2));
        assert_eq!(base.walk(&a), a);
    }
}
