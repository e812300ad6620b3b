//! Lazy, fairly-interleaved streams of store versions: the result type of a
//! relational goal.
//!
//! A `Stream` is either exhausted, holds one ready answer plus a (possibly
//! lazy) continuation, or is a suspended computation that hasn't produced
//! anything yet. `mplus` interleaves two streams one answer at a time so
//! that `disj` never starves a later branch behind an infinite earlier one;
//! `bind` threads every answer of a stream through a continuation goal.

use std::sync::Arc;

use crate::store::HybridStore;

/// A suspended stream computation. Boxed so `Stream` stays a plain enum
/// instead of needing to be generic over closure types.
pub struct Thunk(Box<dyn FnOnce() -> Stream + Send>);

impl Thunk {
    pub fn new(f: impl FnOnce() -> Stream + Send + 'static) -> Thunk {
        Thunk(Box::new(f))
    }

    fn force(self) -> Stream {
        (self.0)()
    }
}

pub enum Stream {
    Empty,
    Choice(HybridStore, Box<Stream>),
    Suspend(Thunk),
}

pub enum Step {
    Done,
    Value(HybridStore, Stream),
    Pending(Stream),
}

/// A goal continuation: a function from one store to the stream of stores
/// it produces. Shared via `Arc` so it can be called from multiple points
/// in a lazily-unfolding `bind`.
pub type Cont = Arc<dyn Fn(HybridStore) -> Stream + Send + Sync>;

impl Stream {
    pub fn empty() -> Stream {
        Stream::Empty
    }

    pub fn unit(store: HybridStore) -> Stream {
        Stream::Choice(store, Box::new(Stream::Empty))
    }

    pub fn suspend(f: impl FnOnce() -> Stream + Send + 'static) -> Stream {
        Stream::Suspend(Thunk::new(f))
    }

    /// Interleave `self` and `other`, producing at most one answer from
    /// `self` before giving `other` a turn — this is the fairness guarantee
    /// `disj` relies on.
    pub fn mplus(self, other: Stream) -> Stream {
        match self {
            Stream::Empty => other,
            Stream::Choice(a, rest) => Stream::Choice(a, Box::new(other.mplus(*rest))),
            Stream::Suspend(t) => Stream::suspend(move || other.mplus(t.force())),
        }
    }

    /// Thread every answer through `f`, preserving fairness across answers
    /// the same way `mplus` does across branches.
    pub fn bind(self, f: Cont) -> Stream {
        match self {
            Stream::Empty => Stream::Empty,
            Stream::Choice(a, rest) => {
                let here = f(a);
                let f2 = f.clone();
                here.mplus(Stream::suspend(move || rest.bind(f2)))
            }
            Stream::Suspend(t) => Stream::suspend(move || t.force().bind(f)),
        }
    }

    /// Advance exactly one step: produce a ready answer, force one
    /// suspension, or report exhaustion. Lets callers interleave their own
    /// cancellation checks between steps (the parallel pool and
    /// deadline-aware queries use this instead of `take`).
    pub fn step(self) -> Step {
        match self {
            Stream::Empty => Step::Done,
            Stream::Choice(a, rest) => Step::Value(a, *rest),
            Stream::Suspend(t) => Step::Pending(t.force()),
        }
    }

    /// Drain up to `limit` answers (or all of them, if `limit` is `None`),
    /// trampolining through suspensions iteratively so a long-running
    /// search doesn't grow the native call stack.
    pub fn take(mut self, limit: Option<usize>) -> Vec<HybridStore> {
        let mut out = Vec::new();
        loop {
            if let Some(n) = limit {
                if out.len() >= n {
                    break;
                }
            }
            match self {
                Stream::Empty => break,
                Stream::Suspend(t) => self = t.force(),
                Stream::Choice(a, rest) => {
                    out.push(a);
                    self = *rest;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk(n: u32) -> HybridStore {
        use crate::term::Term;
        let store = HybridStore::new();
        let v = Term::fresh();
        store.unify(&v, &Term::int(n as i64)).unwrap()
    }

    #[test]
    fn unit_yields_one() {
        let s = Stream::unit(mk(1));
        assert_eq!(s.take(None).len(), 1);
    }

    #[test]
    fn mplus_interleaves() {
        let s1 = Stream::Choice(mk(1), Box::new(Stream::Choice(mk(2), Box::new(Stream::Empty))));
        let s2 = Stream::Choice(mk(10), Box::new(Stream::Empty));
        let out = s1.mplus(s2).take(None);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn bind_chains_and_takes_n() {
        let s = Stream::Choice(
            mk(1),
            Box::new(Stream::Choice(mk(2), Box::new(Stream::Empty))),
        );
        let f: Cont = Arc::new(|store: HybridStore| Stream::unit(store));
        let out = s.bind(f).take(Some(1));
        assert_eq!(out.len(), 1);
    }
}
