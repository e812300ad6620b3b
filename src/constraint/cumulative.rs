//! Cumulative scheduling via time-table filtering: at every instant in the
//! horizon, the mandatory demand of tasks that must overlap it may not
//! exceed the resource's capacity.

use crate::domain::Domain;
use crate::error::{VResult, VulcanError};
use crate::store::HybridStore;
use crate::term::VarId;

use super::DomainSource;

#[derive(Clone, Copy, Debug)]
pub struct Task {
    pub start: VarId,
    pub duration: u32,
    pub demand: u32,
}

/// The instants at which `task` is *mandatorily* running: the intersection
/// of every start time in its current domain's window, i.e.
/// `[max(start) , min(start) + duration)`. Empty when the task isn't
/// pinned down enough to have a mandatory part.
fn mandatory_part(dom: &Domain, duration: u32) -> Option<(u32, u32)> {
    let lo = dom.max()?;
    let hi = dom.min()? + duration;
    if lo < hi {
        Some((lo, hi)) // [lo, hi)
    } else {
        None
    }
}

pub fn propagate(
    store: &HybridStore,
    dom: &dyn DomainSource,
    tasks: &[Task],
    capacity: u32,
) -> VResult<Option<HybridStore>> {
    let max_value = dom.max_value();
    let starts: Vec<Domain> = tasks.iter().map(|t| dom.domain(store, t.start).clone()).collect();

    let horizon_end = starts
        .iter()
        .zip(tasks.iter())
        .filter_map(|(d, t)| d.max().map(|m| m + t.duration))
        .max()
        .unwrap_or(1);

    let mut profile = vec![0u32; (horizon_end + 1) as usize];
    for (d, t) in starts.iter().zip(tasks.iter()) {
        if let Some((lo, hi)) = mandatory_part(d, t.duration) {
            for slot in profile.iter_mut().take(hi as usize).skip(lo as usize) {
                *slot += t.demand;
                if *slot > capacity {
                    return Err(VulcanError::Conflict);
                }
            }
        }
    }

    let mut next = store.clone();
    let mut changed = false;

    for (i, t) in tasks.iter().enumerate() {
        let d = dom.domain(&next, t.start).clone();
        let mut allowed = Vec::new();
        for s in d.iterate() {
            let mut ok = true;
            for slot in s..(s + t.duration) {
                let idx = slot as usize;
                let existing = if idx < profile.len() { profile[idx] } else { 0 };
                // Subtract this task's own mandatory contribution at slot
                // before checking, so a task doesn't conflict with itself.
                let self_contrib = match mandatory_part(&starts[i], t.duration) {
                    Some((lo, hi)) if slot >= lo && slot < hi => t.demand,
                    _ => 0,
                };
                if existing - self_contrib + t.demand > capacity {
                    ok = false;
                    break;
                }
            }
            if ok {
                allowed.push(s);
            }
        }
        let new_d = d.intersect(&Domain::from_values(allowed, max_value));
        if new_d != d {
            next = next.set_domain(t.start, new_d)?;
            changed = true;
        }
    }

    Ok(if changed { Some(next) } else { None })
}
