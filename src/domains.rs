//! Persistent domain store: a map from FD variable id to `Domain`,
//! structured exactly like [`crate::subst::Subst`] (an `im::HashMap`) but
//! keyed on variable id with `Domain` values instead of `Term` bindings.

use im::HashMap;

use crate::domain::Domain;
use crate::term::VarId;

#[derive(Clone, Debug, Default)]
pub struct DomainStore(HashMap<VarId, Domain>);

impl DomainStore {
    pub fn new() -> DomainStore {
        DomainStore(HashMap::new())
    }

    pub fn get(&self, id: VarId) -> Option<&Domain> {
        self.0.get(&id)
    }

    /// Tighten `id`'s domain to `domain`, returning a new store. The caller
    /// is responsible for ensuring `domain` is a subset of the previous
    /// domain (monotone narrowing).
    pub fn set(&self, id: VarId, domain: Domain) -> DomainStore {
        DomainStore(self.0.update(id, domain))
    }

    /// Restrict to the domains of each id in `vars`. See `Subst::flatten`.
    pub fn flatten(&self, vars: &[VarId]) -> DomainStore {
        let mut out = HashMap::new();
        for &id in vars {
            if let Some(d) = self.get(id) {
                out.insert(id, d.clone());
            }
        }
        DomainStore(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let s0 = DomainStore::new();
        let id = VarId::fresh();
        assert!(s0.get(id).is_none());
        let s1 = s0.set(id, Domain::full(5));
        assert_eq!(s1.get(id).unwrap().count(), 5);
        assert!(s0.get(id).is_none());
    }

    #[test]
    fn chain_narrowing() {
        let id = VarId::fresh();
        let s0 = DomainStore::new().set(id, Domain::full(10));
        let s1 = s0.set(id, Domain::range(1, 5, 10));
        assert_eq!(s1.get(id).unwrap().count(), 5);
        assert_eq!(s0.get(id).unwrap().count(), 10);
    }
}
