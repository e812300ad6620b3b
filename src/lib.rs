//! A relational (miniKanren-family) engine with a cooperating finite-domain
//! constraint solver: unification and goal combinators over a persistent
//! store, a chaotic-iteration propagation engine, global constraints
//! (all-different, cumulative, global cardinality, element, ...), labeling
//! and search strategies, a shared-memory parallel worker pool, and
//! variant-keyed tabling.

pub mod constraint;
pub mod constraints_log;
pub mod domain;
pub mod domains;
pub mod error;
pub mod goal;
pub mod model;
pub mod parallel;
pub mod propagate;
pub mod query;
pub mod search;
pub mod store;
pub mod stream;
pub mod subst;
pub mod tabling;
pub mod term;

pub mod prelude {
    pub use crate::constraint::{CmpOp, ConstraintKind, DomainSource, Task, TypeTag};
    pub use crate::domain::Domain;
    pub use crate::error::{VResult, VulcanError};
    pub use crate::goal::{
        absento, appendo, conda, condu, conj, disj, eq, fresh, fresh_n, infd, membero, minuso, neq,
        numbero, once, pairo, pluso, project, symbolo, timeso, Ctx, Goal,
    };
    pub use crate::model::Model;
    pub use crate::parallel::{solve_parallel, ParallelConfig};
    pub use crate::query::Query;
    pub use crate::search::{solve, solve_optimal, LabelingStrategy, SearchConfig, SearchStrategy};
    pub use crate::store::HybridStore;
    pub use crate::tabling::{tabled, Tabling};
    pub use crate::term::{Atom, Term, VarId};
}
