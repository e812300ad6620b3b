//! Lexicographic ordering `X <lex Y` (strict or weak) over equal-length
//! vectors, propagated under an "equal-prefix-so-far" hypothesis.

use crate::error::VResult;
use crate::store::HybridStore;
use crate::term::VarId;

use super::DomainSource;

pub fn propagate(
    store: &HybridStore,
    dom: &dyn DomainSource,
    xs: &[VarId],
    ys: &[VarId],
    strict: bool,
) -> VResult<Option<HybridStore>> {
    let mut next = store.clone();
    let mut changed = false;
    let mut prefix_may_be_equal = true;

    for (x, y) in xs.iter().zip(ys.iter()) {
        if !prefix_may_be_equal {
            break;
        }
        let dx = dom.domain(&next, *x).clone();
        let dy = dom.domain(&next, *y).clone();

        if let Some(ymax) = dy.max() {
            let narrowed = dx.remove_above(ymax);
            if narrowed != dx {
                next = next.set_domain(*x, narrowed)?;
                changed = true;
            }
        }
        let dx = dom.domain(&next, *x).clone();
        if let Some(xmin) = dx.min() {
            let narrowed = dy.remove_below(xmin);
            if narrowed != dy {
                next = next.set_domain(*y, narrowed)?;
                changed = true;
            }
        }

        let dx = dom.domain(&next, *x).clone();
        let dy = dom.domain(&next, *y).clone();
        if let (Some(xmax), Some(ymin)) = (dx.max(), dy.min()) {
            if xmax < ymin {
                // already strictly satisfied from here on
                break;
            }
        }
        prefix_may_be_equal = !dx.is_disjoint(&dy);
    }

    if strict {
        let all_equal_singletons = xs.iter().zip(ys.iter()).all(|(x, y)| {
            let dx = dom.domain(&next, *x);
            let dy = dom.domain(&next, *y);
            dx.is_singleton() && dx == dy
        });
        if all_equal_singletons {
            return Err(crate::error::VulcanError::Conflict);
        }
    }

    Ok(if changed { Some(next) } else { None })
}
