//! Global cardinality: each value `v` may appear on between `min_v` and
//! `max_v` of the variables in `vars`.

use crate::error::{VResult, VulcanError};
use crate::store::HybridStore;
use crate::term::VarId;

use super::DomainSource;

pub fn propagate(
    store: &HybridStore,
    dom: &dyn DomainSource,
    vars: &[VarId],
    bounds: &[(u32, u32, u32)],
) -> VResult<Option<HybridStore>> {
    let mut next = store.clone();
    let mut changed = false;

    for &(value, min_v, max_v) in bounds {
        let domains: Vec<_> = vars.iter().map(|v| dom.domain(&next, *v).clone()).collect();
        let lb = domains.iter().filter(|d| d.singleton_value() == Some(value)).count() as u32;
        let ub = domains.iter().filter(|d| d.has(value)).count() as u32;

        if lb > max_v || ub < min_v {
            return Err(VulcanError::Conflict);
        }

        if lb == max_v {
            for (v, d) in vars.iter().zip(domains.iter()) {
                if d.singleton_value() != Some(value) && d.has(value) {
                    let narrowed = d.remove(value);
                    next = next.set_domain(*v, narrowed)?;
                    changed = true;
                }
            }
        }

        if ub == min_v && min_v > 0 {
            for (v, d) in vars.iter().zip(domains.iter()) {
                if d.has(value) && !d.is_singleton() {
                    let narrowed = crate::domain::Domain::singleton(value, dom.max_value());
                    next = next.set_domain(*v, narrowed)?;
                    changed = true;
                }
            }
        }
    }

    let total_min: u32 = bounds.iter().map(|(_, min_v, _)| min_v).sum();
    if total_min > vars.len() as u32 {
        return Err(VulcanError::Conflict);
    }

    Ok(if changed { Some(next) } else { None })
}
