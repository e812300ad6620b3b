//! Variant-keyed tabling: memoizes a goal's answers for a given call
//! pattern, so repeated (or recursive) calls with the same argument shape
//! replay cached answers instead of re-deriving them. Eviction is LRU by
//! last-used time, bounded by a maximum entry count, with an optional TTL.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::goal::{Ctx, Goal};
use crate::store::HybridStore;
use crate::stream::Stream;
use crate::term::{Atom, Term, VarId};

/// A call pattern's variant fingerprint: the argument terms with every
/// distinct free variable renamed to its rank of first appearance, so two
/// calls that differ only by which concrete variable ids they used (but
/// agree on shape and ground values) share a table entry.
fn variant_key(store: &HybridStore, args: &[Term]) -> String {
    let mut renaming: HashMap<VarId, u32> = HashMap::new();
    let mut out = String::new();
    for (i, t) in args.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        write_canonical(store, t, &mut renaming, &mut out);
    }
    out
}

fn write_canonical(store: &HybridStore, t: &Term, renaming: &mut HashMap<VarId, u32>, out: &mut String) {
    let walked = store.walk(t);
    if let Some(id) = walked.as_var() {
        let next = renaming.len() as u32;
        let idx = *renaming.entry(id).or_insert(next);
        out.push_str(&format!("$v{}", idx));
    } else if let Some((car, cdr)) = walked.as_pair() {
        out.push('(');
        write_canonical(store, car, renaming, out);
        out.push(',');
        write_canonical(store, cdr, renaming, out);
        out.push(')');
    } else if let Some(a) = walked.as_atom() {
        match a {
            Atom::Int(n) => out.push_str(&format!("i{}", n)),
            Atom::Str(s) => out.push_str(&format!("s{:?}", s)),
            Atom::Bool(b) => out.push_str(&format!("b{}", b)),
            Atom::Nil => out.push_str("nil"),
        }
    }
}

struct Entry {
    /// Each cached answer, as the deep-walked argument terms at the point
    /// the underlying goal succeeded.
    answers: Vec<Vec<Term>>,
    inserted: Instant,
    last_used: Instant,
}

/// A memoization table shared across calls to a tabled goal. Cheap to
/// clone (an `Arc` around a `Mutex`), so the same `Tabling` can be captured
/// by every recursive invocation of the relation it tables.
#[derive(Clone)]
pub struct Tabling {
    inner: Arc<Mutex<TableInner>>,
}

struct TableInner {
    max_entries: usize,
    ttl: Option<Duration>,
    entries: HashMap<String, Entry>,
}

impl Tabling {
    pub fn new(max_entries: usize) -> Tabling {
        Tabling {
            inner: Arc::new(Mutex::new(TableInner {
                max_entries: max_entries.max(1),
                ttl: None,
                entries: HashMap::new(),
            })),
        }
    }

    pub fn with_ttl(max_entries: usize, ttl: Duration) -> Tabling {
        Tabling {
            inner: Arc::new(Mutex::new(TableInner {
                max_entries: max_entries.max(1),
                ttl: Some(ttl),
                entries: HashMap::new(),
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("tabling mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> Option<Vec<Vec<Term>>> {
        let mut inner = self.inner.lock().expect("tabling mutex poisoned");
        let ttl = inner.ttl;
        let now = Instant::now();
        if let Some(entry) = inner.entries.get(key) {
            if let Some(ttl) = ttl {
                if now.duration_since(entry.inserted) > ttl {
                    inner.entries.remove(key);
                    return None;
                }
            }
        }
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.last_used = now;
            Some(entry.answers.clone())
        } else {
            None
        }
    }

    fn insert(&self, key: String, answers: Vec<Vec<Term>>) {
        let mut inner = self.inner.lock().expect("tabling mutex poisoned");
        let now = Instant::now();
        if inner.entries.len() >= inner.max_entries && !inner.entries.contains_key(&key) {
            if let Some(lru_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            {
                inner.entries.remove(&lru_key);
            }
        }
        inner.entries.insert(
            key,
            Entry {
                answers,
                inserted: now,
                last_used: now,
            },
        );
    }
}

impl Default for Tabling {
    fn default() -> Self {
        Tabling::new(1024)
    }
}

/// Wrap `g` (a goal over `args`) with memoization against `table`. On a
/// call whose variant key is already cached, replays the cached answers by
/// unifying `args` against each cached answer's terms instead of rerunning
/// `g`. On a miss, runs `g` to exhaustion, caches the deep-walked answers,
/// and replays the same stream — eager, rather than the fully incremental
/// SLG resolution a production tabling engine would use, which is adequate
/// at the finite, terminating goals this crate's relations are built from.
pub fn tabled(table: Tabling, args: Vec<Term>, g: Goal) -> Goal {
    Arc::new(move |ctx: Arc<Ctx>, store: HybridStore| -> Stream {
        let key = variant_key(&store, &args);
        if let Some(answers) = table.lookup(&key) {
            return replay(&store, &args, answers);
        }

        let produced = g(ctx, store.clone()).take(None);
        let answers: Vec<Vec<Term>> = produced
            .iter()
            .map(|s| args.iter().map(|a| s.deep_walk(a)).collect())
            .collect();
        table.insert(key, answers);

        let mut out = Stream::empty();
        for s in produced.into_iter().rev() {
            out = Stream::Choice(s, Box::new(out));
        }
        out
    })
}

fn replay(store: &HybridStore, args: &[Term], answers: Vec<Vec<Term>>) -> Stream {
    let mut out = Stream::empty();
    for answer in answers.into_iter().rev() {
        let mut unified = Ok(store.clone());
        for (a, v) in args.iter().zip(answer.iter()) {
            unified = unified.and_then(|s| s.unify(a, v));
        }
        if let Ok(s) = unified {
            out = Stream::Choice(s, Box::new(out));
        }
    }
    out
}
