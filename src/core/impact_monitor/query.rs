//! Ranking helpers for the query surface.

use std::cmp::Ordering;

use super::types::{ImpactCategory, ProcessImpact};

/// Snapshots of running entities, optionally hiding system processes
pub fn running_snapshots<'a, I>(processes: I, include_system: bool) -> Vec<ProcessImpact>
where
    I: IntoIterator<Item = &'a ProcessImpact>,
{
    processes
        .into_iter()
        .filter(|p| p.running && (include_system || !p.is_system_process))
        .map(ProcessImpact::snapshot)
        .collect()
}

/// Sort by the metric of `category`, highest first unless `ascending`.
///
/// Ties are broken by pid so the order is stable across calls.
pub fn sort_by_category(processes: &mut [ProcessImpact], category: ImpactCategory, ascending: bool) {
    processes.sort_by(|a, b| {
        let ordering = category
            .metric(a)
            .partial_cmp(&category.metric(b))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.pid.cmp(&b.pid));
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

pub fn top_by_category(
    mut processes: Vec<ProcessImpact>,
    category: ImpactCategory,
    count: usize,
) -> Vec<ProcessImpact> {
    sort_by_category(&mut processes, category, false);
    processes.truncate(count);
    processes
}
