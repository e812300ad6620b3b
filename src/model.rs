//! The FD model builder: declares variables and their initial domains,
//! validates and accumulates constraints, and hands out the initial store
//! for search to branch from.

use std::collections::HashMap;

use crate::constraint::{CmpOp, ConstraintKind, DomainSource};
use crate::domain::Domain;
use crate::error::{VResult, VulcanError};
use crate::store::HybridStore;
use crate::term::VarId;

pub struct Model {
    max_value: u32,
    initial_domains: HashMap<VarId, Domain>,
    var_order: Vec<VarId>,
    store: HybridStore,
}

impl Model {
    pub fn new(max_value: u32) -> Model {
        Model {
            max_value,
            initial_domains: HashMap::new(),
            var_order: Vec::new(),
            store: HybridStore::new(),
        }
    }

    pub fn new_variable(&mut self, domain: Domain) -> VarId {
        let id = VarId::fresh();
        self.initial_domains.insert(id, domain);
        self.var_order.push(id);
        id
    }

    pub fn new_variables(&mut self, k: usize, domain: Domain) -> Vec<VarId> {
        (0..k).map(|_| self.new_variable(domain.clone())).collect()
    }

    pub fn variables(&self) -> &[VarId] {
        &self.var_order
    }

    pub fn add_constraint(&mut self, kind: ConstraintKind) -> VResult<()> {
        validate(&kind)?;
        self.store = self.store.add_constraint(kind);
        Ok(())
    }

    /// Expands `count(vars, value) = n` into `n` value-equals-reified
    /// booleans plus one boolean-sum, as the component table specifies.
    pub fn add_count(&mut self, vars: &[VarId], value: u32, n_count: VarId) -> VResult<()> {
        if vars.is_empty() {
            return Err(VulcanError::Validation("count over an empty variable list".into()));
        }
        let mut bools = Vec::with_capacity(vars.len());
        for &x in vars {
            let b = self.new_variable(Domain::range(1, 2, self.max_value.max(2)));
            self.add_constraint(ConstraintKind::ValueEqualsReified { b, x, v: value })?;
            bools.push(b);
        }
        // BooleanSum's target encodes count-of-trues + 1; callers reading
        // `n_count` as the literal count must offset by -1 themselves, or a
        // convenience `n_count` variable can be wired through an Arithmetic
        // constraint `n_count = target - 1`. We do the wiring here so the
        // caller sees the plain count.
        let target = self.new_variable(Domain::range(1, vars.len() as u32 + 1, vars.len() as u32 + 1));
        self.add_constraint(ConstraintKind::BooleanSum { bools, target })?;
        self.add_constraint(ConstraintKind::Arithmetic {
            dst: n_count,
            src: target,
            k: -1,
        })
    }

    pub fn initial_store(&self) -> HybridStore {
        self.store.clone()
    }
}

impl DomainSource for Model {
    fn domain<'a>(&'a self, store: &'a HybridStore, id: VarId) -> &'a Domain {
        let initial = self
            .initial_domains
            .get(&id)
            .unwrap_or_else(|| panic!("variable {:?} was never declared on this model", id));
        store.get_domain(id, initial)
    }

    fn max_value(&self) -> u32 {
        self.max_value
    }
}

fn validate(kind: &ConstraintKind) -> VResult<()> {
    match kind {
        ConstraintKind::Modulo { m, .. } => {
            if *m == 0 {
                return Err(VulcanError::Validation("modulo constraint requires m > 0".into()));
            }
        }
        ConstraintKind::LinearSum { coeffs, vars, .. } => {
            if vars.is_empty() {
                return Err(VulcanError::Validation("linear sum over an empty variable list".into()));
            }
            if coeffs.len() != vars.len() {
                return Err(VulcanError::Validation(format!(
                    "linear sum coefficient/variable length mismatch: {} coefficients, {} variables",
                    coeffs.len(),
                    vars.len()
                )));
            }
        }
        ConstraintKind::BooleanSum { bools, .. } => {
            if bools.is_empty() {
                return Err(VulcanError::Validation("boolean sum over an empty variable list".into()));
            }
        }
        ConstraintKind::AllDifferent { vars } => {
            if vars.is_empty() {
                return Err(VulcanError::Validation("all-different over an empty variable list".into()));
            }
        }
        ConstraintKind::Lex { xs, ys, .. } => {
            if xs.len() != ys.len() {
                return Err(VulcanError::Validation(format!(
                    "lexicographic constraint vector length mismatch: {} vs {}",
                    xs.len(),
                    ys.len()
                )));
            }
        }
        ConstraintKind::Element { values, .. } => {
            if values.is_empty() {
                return Err(VulcanError::Validation("element constraint over an empty value list".into()));
            }
        }
        ConstraintKind::GlobalCardinality { vars, bounds } => {
            if vars.is_empty() {
                return Err(VulcanError::Validation(
                    "global cardinality over an empty variable list".into(),
                ));
            }
            let mut min_sum = 0u32;
            for (value, min_v, max_v) in bounds {
                if min_v > max_v {
                    return Err(VulcanError::Validation(format!(
                        "infeasible cardinality bounds for value {}: min {} > max {}",
                        value, min_v, max_v
                    )));
                }
                min_sum += min_v;
            }
            if min_sum > vars.len() as u32 {
                return Err(VulcanError::Validation(format!(
                    "infeasible cardinality bounds: sum of minimums {} exceeds {} variables",
                    min_sum,
                    vars.len()
                )));
            }
        }
        ConstraintKind::Inequality { op: CmpOp::Ne, .. }
        | ConstraintKind::Inequality { .. }
        | ConstraintKind::Arithmetic { .. }
        | ConstraintKind::Times { .. }
        | ConstraintKind::Reified { .. }
        | ConstraintKind::ValueEqualsReified { .. }
        | ConstraintKind::Cumulative { .. }
        | ConstraintKind::Disequality { .. }
        | ConstraintKind::Absent { .. }
        | ConstraintKind::TypeOf { .. }
        | ConstraintKind::Fresh { .. }
        | ConstraintKind::AlphaEq { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_modulus() {
        let mut m = Model::new(10);
        let x = m.new_variable(Domain::full(10));
        let r = m.new_variable(Domain::full(10));
        let err = m
            .add_constraint(ConstraintKind::Modulo { x, m: 0, remainder: r })
            .unwrap_err();
        assert!(matches!(err, VulcanError::Validation(_)));
    }

    #[test]
    fn rejects_coefficient_length_mismatch() {
        let mut m = Model::new(10);
        let xs = m.new_variables(3, Domain::full(10));
        let t = m.new_variable(Domain::full(10));
        let err = m
            .add_constraint(ConstraintKind::LinearSum {
                coeffs: vec![1, 2],
                vars: xs,
                target: t,
            })
            .unwrap_err();
        assert!(matches!(err, VulcanError::Validation(_)));
    }

    #[test]
    fn rejects_infeasible_cardinality() {
        let mut m = Model::new(10);
        let xs = m.new_variables(2, Domain::full(10));
        let err = m
            .add_constraint(ConstraintKind::GlobalCardinality {
                vars: xs,
                bounds: vec![(1, 3, 5)],
            })
            .unwrap_err();
        assert!(matches!(err, VulcanError::Validation(_)));
    }
}
