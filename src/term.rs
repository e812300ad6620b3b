//! Logic terms: variables, atoms, and pairs.
//!
//! Variable identity is by id only; names are for display. `Atom::Nil`
//! serves as the empty list. Terms are logically immutable, and structural
//! sharing is the norm: cloning a `Term` is an `Arc` bump.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static VAR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique logic variable id. Monotonically allocated, so id order
/// also reflects creation order (used by the lexicographic labeling
/// strategy).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct VarId(u64);

impl VarId {
    pub fn fresh() -> VarId {
        VarId(VAR_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Atom {
    Int(i64),
    Str(Arc<str>),
    Bool(bool),
    Nil,
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Int(n) => write!(f, "{}", n),
            Atom::Str(s) => write!(f, "{}", s),
            Atom::Bool(b) => write!(f, "{}", b),
            Atom::Nil => write!(f, "[]"),
        }
    }
}

#[derive(Debug)]
enum TermInner {
    Var(VarId, Option<Arc<str>>),
    Atom(Atom),
    Pair(Term, Term),
}

/// A logic term: a variable, an atom, or a cons pair. Cheap to clone (an
/// `Arc` bump); equality is structural with variables compared by id.
#[derive(Clone, Debug)]
pub struct Term(Arc<TermInner>);

impl Term {
    pub fn var(id: VarId) -> Term {
        Term(Arc::new(TermInner::Var(id, None)))
    }

    pub fn named_var(id: VarId, name: &str) -> Term {
        Term(Arc::new(TermInner::Var(id, Some(Arc::from(name)))))
    }

    pub fn fresh() -> Term {
        Term::var(VarId::fresh())
    }

    pub fn atom(a: Atom) -> Term {
        Term(Arc::new(TermInner::Atom(a)))
    }

    pub fn int(v: i64) -> Term {
        Term::atom(Atom::Int(v))
    }

    pub fn bool(v: bool) -> Term {
        Term::atom(Atom::Bool(v))
    }

    pub fn string(s: impl Into<String>) -> Term {
        Term::atom(Atom::Str(Arc::from(s.into())))
    }

    pub fn nil() -> Term {
        Term::atom(Atom::Nil)
    }

    pub fn pair(car: Term, cdr: Term) -> Term {
        Term(Arc::new(TermInner::Pair(car, cdr)))
    }

    pub fn cons(car: Term, cdr: Term) -> Term {
        Term::pair(car, cdr)
    }

    pub fn list(items: impl IntoIterator<Item = Term, IntoIter: DoubleEndedIterator>) -> Term {
        let mut tail = Term::nil();
        for item in items.into_iter().rev() {
            tail = Term::pair(item, tail);
        }
        tail
    }

    pub fn is_var(&self) -> bool {
        matches!(self.0.as_ref(), TermInner::Var(_, _))
    }

    pub fn as_var(&self) -> Option<VarId> {
        match self.0.as_ref() {
            TermInner::Var(id, _) => Some(*id),
            _ => None,
        }
    }

    pub fn is_atom(&self) -> bool {
        matches!(self.0.as_ref(), TermInner::Atom(_))
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self.0.as_ref() {
            TermInner::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.0.as_ref() {
            TermInner::Atom(Atom::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self.0.as_ref(), TermInner::Pair(_, _))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.0.as_ref(), TermInner::Atom(Atom::Nil))
    }

    pub fn as_pair(&self) -> Option<(&Term, &Term)> {
        match self.0.as_ref() {
            TermInner::Pair(car, cdr) => Some((car, cdr)),
            _ => None,
        }
    }

    /// Structural occurrence test on the *unwalked* term tree (no
    /// substitution lookups); used internally by `deep_walk` consumers.
    pub fn contains_var(&self, id: VarId) -> bool {
        match self.0.as_ref() {
            TermInner::Var(v, _) => *v == id,
            TermInner::Atom(_) => false,
            TermInner::Pair(car, cdr) => car.contains_var(id) || cdr.contains_var(id),
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self.0.as_ref(), other.0.as_ref()) {
            (TermInner::Var(a, _), TermInner::Var(b, _)) => a == b,
            (TermInner::Atom(a), TermInner::Atom(b)) => a == b,
            (TermInner::Pair(ac, ad), TermInner::Pair(bc, bd)) => ac == bc && ad == bd,
            _ => false,
        }
    }
}
impl Eq for Term {}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_ref() {
            TermInner::Var(id, name) => match name {
                Some(n) => write!(f, "{}", n),
                None => write!(f, "{}", id),
            },
            TermInner::Atom(a) => write!(f, "{}", a),
            TermInner::Pair(_, _) => {
                write!(f, "[")?;
                let mut cur = self;
                let mut first = true;
                loop {
                    match cur.0.as_ref() {
                        TermInner::Pair(car, cdr) => {
                            if !first {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", car)?;
                            first = false;
                            cur = cdr;
                        }
                        TermInner::Atom(Atom::Nil) => break,
                        _ => {
                            write!(f, " | {}", cur)?;
                            break;
                        }
                    }
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_identity_by_id() {
        let a = Term::fresh();
        let b = Term::fresh();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn atoms_compare_by_value() {
        assert_eq!(Term::int(3), Term::int(3));
        assert_ne!(Term::int(3), Term::int(4));
        assert_ne!(Term::int(3), Term::bool(true));
    }

    #[test]
    fn list_display() {
        let l = Term::list(vec![Term::int(1), Term::int(2), Term::int(3)]);
        assert_eq!(format!("{}", l), "[1, 2, 3]");
    }

    #[test]
    fn contains_var() {
        let v = Term::fresh();
        let id = v.as_var().unwrap();
        let l = Term::list(vec![Term::int(1), v.clone()]);
        assert!(l.contains_var(id));
        assert!(!l.contains_var(VarId::fresh()));
    }
}
