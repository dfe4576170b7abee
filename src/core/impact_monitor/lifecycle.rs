//! Lifecycle notifications.
//!
//! The state of every entity is captured before a pass and compared with the
//! result afterwards. Events are observational only.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::types::{ImpactCategory, ProcessImpact};

/// Categories whose scores are checked against the high-impact threshold
pub const SCORED_CATEGORIES: [ImpactCategory; 2] =
    [ImpactCategory::BatteryDrain, ImpactCategory::OverallImpact];

/// Notification emitted by a sampling pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImpactEvent {
    DataUpdated,
    ProcessStarted {
        pid: u32,
        name: String,
    },
    ProcessEnded {
        pid: u32,
        name: String,
    },
    HighImpactDetected {
        pid: u32,
        name: String,
        category: ImpactCategory,
        score: f64,
    },
}

#[derive(Debug, Clone, Copy)]
struct PriorState {
    running: bool,
    battery_score: f64,
    overall_score: f64,
}

/// State of every entity captured before a pass
#[derive(Debug, Default)]
pub struct LifecycleSnapshot {
    prior: HashMap<u32, PriorState>,
}

impl LifecycleSnapshot {
    pub fn capture(processes: &BTreeMap<u32, ProcessImpact>) -> Self {
        let prior = processes
            .iter()
            .map(|(&pid, impact)| {
                (
                    pid,
                    PriorState {
                        running: impact.running,
                        battery_score: impact.battery_impact_score,
                        overall_score: impact.overall_impact_score,
                    },
                )
            })
            .collect();
        Self { prior }
    }

    /// Compare the post-pass entities with the captured state
    pub fn diff(
        &self,
        processes: &BTreeMap<u32, ProcessImpact>,
        high_impact_threshold: f64,
    ) -> Vec<ImpactEvent> {
        let mut events = Vec::new();

        for (&pid, impact) in processes {
            let prior = self.prior.get(&pid);
            let was_running = prior.is_some_and(|p| p.running);

            if impact.running && !was_running {
                log::debug!("Process started: {} ({})", impact.name, pid);
                events.push(ImpactEvent::ProcessStarted {
                    pid,
                    name: impact.name.clone(),
                });
            } else if !impact.running && was_running {
                log::debug!("Process ended: {} ({})", impact.name, pid);
                events.push(ImpactEvent::ProcessEnded {
                    pid,
                    name: impact.name.clone(),
                });
            }

            if !impact.running {
                continue;
            }

            for category in SCORED_CATEGORIES {
                let before = prior.map_or(0.0, |p| match category {
                    ImpactCategory::BatteryDrain => p.battery_score,
                    _ => p.overall_score,
                });
                let after = category.metric(impact);

                if before < high_impact_threshold && after >= high_impact_threshold {
                    events.push(ImpactEvent::HighImpactDetected {
                        pid,
                        name: impact.name.clone(),
                        category,
                        score: after,
                    });
                }
            }
        }

        events
    }
}
