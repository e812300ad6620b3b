//! Append-only constraint list, backed by `im::Vector` so pushing a new
//! constraint returns a new `ConstraintLog` that shares structure with every
//! other version descended from the same point, exactly like `Subst` and
//! `DomainStore`.

use std::sync::Arc;

use im::Vector;

use crate::constraint::Constraint;

#[derive(Clone, Debug, Default)]
pub struct ConstraintLog(Vector<Arc<Constraint>>);

impl ConstraintLog {
    pub fn new() -> ConstraintLog {
        ConstraintLog(Vector::new())
    }

    pub fn push(&self, entry: Constraint) -> ConstraintLog {
        let mut next = self.0.clone();
        next.push_back(Arc::new(entry));
        ConstraintLog(next)
    }

    /// Rebuild a fresh log from a filtered set of entries (used by
    /// `purify`, which drops disequality/absence constraints already
    /// decided as satisfied).
    pub fn from_entries(entries: Vec<Constraint>) -> ConstraintLog {
        ConstraintLog(entries.into_iter().map(Arc::new).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.0.iter().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
