//! `result = values[index]`, with `index` ranging over `[1, n]` (1-based,
//! matching the rest of this crate's positive-only domains).

use crate::domain::Domain;
use crate::error::VResult;
use crate::store::HybridStore;
use crate::term::VarId;

use super::DomainSource;

pub fn propagate(
    store: &HybridStore,
    dom: &dyn DomainSource,
    index: VarId,
    values: &[VarId],
    result: VarId,
) -> VResult<Option<HybridStore>> {
    let n = values.len() as u32;
    let max_value = dom.max_value();

    let mut next = store.clone();
    let mut changed = false;

    let dindex = dom.domain(&next, index).clone();
    let clamped = dindex.intersect(&Domain::range(1, n, max_value));
    if clamped != dindex {
        next = next.set_domain(index, clamped.clone())?;
        changed = true;
    }

    // Prune `result` to values reachable from currently possible indices.
    let dresult = dom.domain(&next, result).clone();
    let mut reachable = Domain::empty(max_value);
    for i in clamped.iterate() {
        let vi = dom.domain(&next, values[(i - 1) as usize]).clone();
        reachable = reachable.union(&vi);
    }
    let new_result = dresult.intersect(&reachable);
    if new_result != dresult {
        next = next.set_domain(result, new_result.clone())?;
        changed = true;
    }

    // Prune `index` to positions whose value domain can still match result.
    let dindex2 = dom.domain(&next, index).clone();
    let mut surviving = Domain::empty(max_value);
    for i in dindex2.iterate() {
        let vi = dom.domain(&next, values[(i - 1) as usize]).clone();
        if !vi.is_disjoint(&new_result) {
            surviving = surviving.union(&Domain::singleton(i, max_value));
        }
    }
    if surviving != dindex2 {
        next = next.set_domain(index, surviving.clone())?;
        changed = true;
    }

    // Singleton index forces singleton result (when the pointed-to variable
    // is itself a singleton).
    if let Some(i) = surviving.singleton_value() {
        let vi = dom.domain(&next, values[(i - 1) as usize]).clone();
        if let Some(v) = vi.singleton_value() {
            let forced = dom.domain(&next, result).clone().intersect(&Domain::singleton(v, max_value));
            if forced != *dom.domain(&next, result) {
                next = next.set_domain(result, forced)?;
                changed = true;
            }
        }
    }

    Ok(if changed { Some(next) } else { None })
}
