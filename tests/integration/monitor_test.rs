use chrono::{DateTime, TimeZone, Utc};
use impactmon::core::impact_monitor::{
    ImpactCategory, ImpactMonitor, PassOutcome, SourceCapabilities,
};
use impactmon::ImpactMonitorConfig;
use std::time::Duration;

use super::scripted_source::{ScriptHandle, ScriptedSource};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn monitor(processors: usize) -> (ImpactMonitor, ScriptHandle) {
    monitor_with(processors, ImpactMonitorConfig::default())
}

fn monitor_with(processors: usize, config: ImpactMonitorConfig) -> (ImpactMonitor, ScriptHandle) {
    let (source, handle) = ScriptedSource::new(processors);
    (ImpactMonitor::with_config(source, config), handle)
}

fn completed(outcome: PassOutcome) -> impactmon::core::impact_monitor::PassReport {
    match outcome {
        PassOutcome::Completed(report) => report,
        PassOutcome::Skipped => panic!("pass was skipped"),
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_cpu_percent_normalised_by_processors() {
    let (monitor, script) = monitor(4);
    script.spawn(100, "worker");
    monitor.refresh_at(at(0));

    script.update(100, |c| {
        c.cpu_kernel += Duration::from_millis(50);
        c.cpu_user += Duration::from_millis(50);
    });
    script.advance_system_cpu(Duration::from_millis(1000));
    monitor.refresh_at(at(1));

    let history = monitor.process_history(100);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].cpu_percent, 0.0);
    assert!(approx(history[1].cpu_percent, 2.5));

    let impact = monitor.process_impact(100).unwrap();
    assert!(approx(impact.avg_cpu_percent, 1.25));
    assert!(approx(impact.peak_cpu_percent, 2.5));
    assert_eq!(impact.total_cpu_time, Duration::from_millis(100));
}

#[test]
fn test_unchanged_counters_give_zero_rates() {
    let (monitor, script) = monitor(2);
    script.spawn(7, "idle");
    script.update(7, |c| {
        c.cpu_user = Duration::from_secs(3);
        c.disk_read_bytes = 10_000;
        c.working_set_bytes = 4096;
    });

    for t in 0..3 {
        script.advance_system_cpu(Duration::from_secs(1));
        monitor.refresh_at(at(t));
    }

    for sample in monitor.process_history(7) {
        assert_eq!(sample.cpu_percent, 0.0);
        assert_eq!(sample.disk_read_rate, 0.0);
        assert_eq!(sample.disk_write_rate, 0.0);
        assert_eq!(sample.memory_bytes, 4096);
    }
    let impact = monitor.process_impact(7).unwrap();
    assert_eq!(impact.total_disk_read_bytes, 0);
    assert_eq!(impact.cpu_spike_count, 0);
}

#[test]
fn test_disk_totals_and_rates() {
    let (monitor, script) = monitor(1);
    script.spawn(9, "copier");
    monitor.refresh_at(at(0));

    script.update(9, |c| {
        c.disk_read_bytes += 4_000;
        c.disk_write_bytes += 1_000;
    });
    monitor.refresh_at(at(2));

    let impact = monitor.process_impact(9).unwrap();
    assert_eq!(impact.total_disk_read_bytes, 4_000);
    assert_eq!(impact.total_disk_write_bytes, 1_000);
    assert!(approx(impact.peak_disk_read_rate, 2_000.0));
    assert!(approx(impact.avg_disk_read_rate, 1_000.0));
    assert!(approx(impact.avg_disk_write_rate, 250.0));
}

#[test]
fn test_sliding_window_evicts_old_samples() {
    let config = ImpactMonitorConfig {
        sample_interval_ms: 2000,
        history_window_minutes: 5,
        ..Default::default()
    };
    let (monitor, script) = monitor_with(1, config);
    script.spawn(42, "long-runner");

    for t in (0..=400).step_by(2) {
        script.update(42, |c| c.cpu_user += Duration::from_millis(100));
        script.advance_system_cpu(Duration::from_secs(2));
        monitor.refresh_at(at(t));
    }

    let history = monitor.process_history(42);
    assert!(!history.is_empty());
    assert!(history.len() <= 150);
    assert!(history.iter().all(|s| s.timestamp >= at(100)));
    assert_eq!(history.last().unwrap().timestamp, at(400));
    assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn test_process_impact_omits_history() {
    let (monitor, script) = monitor(1);
    script.spawn(5, "app");
    monitor.refresh_at(at(0));
    monitor.refresh_at(at(1));

    let impact = monitor.process_impact(5).unwrap();
    assert!(impact.samples.is_empty());
    assert_eq!(monitor.process_history(5).len(), 2);

    assert!(monitor.process_impact(6).is_none());
    assert!(monitor.process_history(6).is_empty());
}

#[test]
fn test_identity_fields_carried_from_enumeration() {
    let (monitor, script) = monitor(1);
    let mut entry = impactmon::core::impact_monitor::ProcessEntry::new(9, "editor");
    entry.parent_pid = Some(1);
    entry.description = Some("editor --wait notes.txt".to_string());
    script.spawn_entry(entry);
    script.spawn(10, "shell");
    monitor.refresh_at(at(0));

    let editor = monitor.process_impact(9).unwrap();
    assert_eq!(editor.parent_pid, Some(1));
    assert_eq!(editor.description.as_deref(), Some("editor --wait notes.txt"));
    assert!(monitor.process_impact(10).unwrap().description.is_none());
}

#[test]
fn test_ended_process_kept_for_grace_period() {
    let (monitor, script) = monitor(1);
    script.spawn(1, "short-lived");
    monitor.refresh_at(at(0));

    script.kill(1);
    monitor.refresh_at(at(2));

    let ended = monitor.process_impact(1).unwrap();
    assert!(!ended.running);
    assert_eq!(ended.last_seen, at(0));
    assert!(monitor.all_processes(true).is_empty());

    // Exactly at the grace boundary it is still kept
    monitor.refresh_at(at(60));
    assert!(monitor.process_impact(1).is_some());

    let report = completed(monitor.refresh_at(at(61)));
    assert_eq!(report.purged, 1);
    assert!(monitor.process_impact(1).is_none());
    assert_eq!(monitor.tracked_count(), 0);
}

#[test]
fn test_restarted_pid_after_purge_starts_fresh() {
    let (monitor, script) = monitor(1);
    script.spawn(3, "first");
    script.update(3, |c| c.disk_read_bytes = 1_000_000);
    monitor.refresh_at(at(0));

    script.kill(3);
    monitor.refresh_at(at(1));
    monitor.refresh_at(at(100));
    assert!(monitor.process_impact(3).is_none());

    script.spawn(3, "second");
    monitor.refresh_at(at(101));

    let impact = monitor.process_impact(3).unwrap();
    assert_eq!(impact.name, "second");
    assert_eq!(impact.first_seen, at(101));
    assert_eq!(impact.total_disk_read_bytes, 0);
}

#[test]
fn test_unreadable_process_keeps_last_values() {
    let (monitor, script) = monitor(1);
    script.spawn(11, "guarded");
    script.update(11, |c| c.working_set_bytes = 1 << 20);
    monitor.refresh_at(at(0));

    script.with_state(|s| {
        s.unreadable.insert(11);
    });
    let report = completed(monitor.refresh_at(at(2)));
    assert_eq!(report.skipped, 1);
    assert_eq!(report.sampled, 0);

    let impact = monitor.process_impact(11).unwrap();
    assert!(impact.running);
    assert_eq!(impact.last_seen, at(0));
    assert_eq!(impact.current_memory_bytes, 1 << 20);
    assert_eq!(monitor.process_history(11).len(), 1);
}

#[test]
fn test_unreadable_process_does_not_block_others() {
    let (monitor, script) = monitor(1);
    script.spawn(1, "locked");
    script.spawn(2, "open");
    script.with_state(|s| {
        s.unreadable.insert(1);
    });

    let report = completed(monitor.refresh_at(at(0)));
    assert_eq!(report.sampled, 1);
    assert!(monitor.process_impact(1).is_none());
    assert!(monitor.process_impact(2).is_some());
}

#[test]
fn test_system_totals_failure_carries_cpu_forward() {
    let (monitor, script) = monitor(1);
    script.spawn(8, "busy");
    monitor.refresh_at(at(0));

    script.update(8, |c| c.cpu_user += Duration::from_millis(100));
    script.advance_system_cpu(Duration::from_millis(1000));
    monitor.refresh_at(at(1));
    assert!(approx(monitor.process_history(8)[1].cpu_percent, 10.0));

    script.with_state(|s| s.fail_totals = true);
    script.update(8, |c| {
        c.cpu_user += Duration::from_millis(500);
        c.disk_write_bytes += 300;
    });
    script.advance_system_cpu(Duration::from_millis(1000));
    monitor.refresh_at(at(2));

    let history = monitor.process_history(8);
    assert_eq!(history.len(), 3);
    assert!(approx(history[2].cpu_percent, 10.0));
    assert!(approx(history[2].disk_write_rate, 300.0));
    assert!(approx(monitor.process_impact(8).unwrap().peak_cpu_percent, 10.0));

    // Baseline from the last good pass spans both intervals
    script.with_state(|s| s.fail_totals = false);
    script.update(8, |c| c.cpu_user += Duration::from_millis(100));
    script.advance_system_cpu(Duration::from_millis(1000));
    monitor.refresh_at(at(3));

    let history = monitor.process_history(8);
    assert!(approx(history[3].cpu_percent, 30.0));
}

#[test]
fn test_enumeration_failure_ends_everything() {
    let (monitor, script) = monitor(1);
    script.spawn(1, "a");
    script.spawn(2, "b");
    monitor.refresh_at(at(0));
    assert_eq!(monitor.all_processes(true).len(), 2);

    script.with_state(|s| s.fail_enumeration = true);
    let report = completed(monitor.refresh_at(at(2)));

    assert!(monitor.all_processes(true).is_empty());
    assert_eq!(monitor.tracked_count(), 2);
    assert_eq!(report.sampled, 0);
}

#[test]
fn test_idle_pseudo_process_is_ignored() {
    let (monitor, script) = monitor(1);
    script.spawn(0, "Idle");
    script.spawn(1, "init-like");
    monitor.refresh_at(at(0));

    assert!(monitor.process_impact(0).is_none());
}

#[test]
fn test_system_processes_filtered() {
    let (monitor, script) = monitor(1);
    script.spawn(1, "systemd");
    script.spawn(500, "editor");
    monitor.refresh_at(at(0));

    assert!(monitor.process_impact(1).is_none());
    assert_eq!(monitor.tracked_count(), 1);

    let config = ImpactMonitorConfig {
        track_system_processes: true,
        ..Default::default()
    };
    let (monitor, script) = monitor_with(1, config);
    script.spawn(1, "systemd");
    script.spawn(500, "editor");
    monitor.refresh_at(at(0));

    assert!(monitor.process_impact(1).unwrap().is_system_process);
    assert_eq!(monitor.all_processes(false).len(), 1);
    assert_eq!(monitor.all_processes(true).len(), 2);
}

#[test]
fn test_background_processes_filtered() {
    let config = ImpactMonitorConfig {
        track_background_processes: false,
        ..Default::default()
    };
    let (monitor, script) = monitor_with(1, config);
    let mut daemon = impactmon::core::impact_monitor::ProcessEntry::new(20, "indexer");
    daemon.is_background = true;
    script.spawn_entry(daemon);
    script.spawn(21, "window");
    monitor.refresh_at(at(0));

    assert!(monitor.process_impact(20).is_none());
    assert!(monitor.process_impact(21).is_some());
}

#[test]
fn test_tracked_cap_makes_room_for_heavy_newcomer() {
    let config = ImpactMonitorConfig {
        max_tracked_processes: 2,
        ..Default::default()
    };
    let (monitor, script) = monitor_with(1, config);
    script.spawn(1, "idle-a");
    script.spawn(2, "idle-b");
    script.spawn(3, "renderer");

    let report = completed(monitor.refresh_at(at(0)));
    assert_eq!(report.rejected, 1);
    assert!(monitor.process_impact(3).is_none());

    for t in 1..=20 {
        script.update(3, |c| c.cpu_user += Duration::from_millis(900));
        script.advance_system_cpu(Duration::from_secs(1));
        monitor.refresh_at(at(t));
    }

    assert_eq!(monitor.tracked_count(), 2);
    let heavy = monitor.process_impact(3).unwrap();
    assert!(heavy.avg_cpu_percent > 80.0);

    let top = monitor.top_processes(ImpactCategory::CpuUsage, 1, true);
    assert_eq!(top[0].pid, 3);
}

#[test]
fn test_tracked_cap_prefers_ended_processes() {
    let config = ImpactMonitorConfig {
        max_tracked_processes: 2,
        ..Default::default()
    };
    let (monitor, script) = monitor_with(1, config);
    script.spawn(1, "a");
    script.spawn(2, "b");
    monitor.refresh_at(at(0));

    script.kill(1);
    script.spawn(3, "c");
    let report = completed(monitor.refresh_at(at(1)));
    assert_eq!(report.rejected, 0);
    assert!(monitor.process_impact(1).is_none());
    assert!(monitor.process_impact(2).is_some());
    assert!(monitor.process_impact(3).is_some());
}

#[test]
fn test_per_pass_budget() {
    let config = ImpactMonitorConfig {
        max_processes_per_pass: 1,
        ..Default::default()
    };
    let (monitor, script) = monitor_with(1, config);
    script.spawn(1, "a");
    script.spawn(2, "b");

    let report = completed(monitor.refresh_at(at(0)));
    assert_eq!(report.sampled, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(monitor.tracked_count(), 1);
}

#[test]
fn test_per_pass_budget_reaches_every_process() {
    let config = ImpactMonitorConfig {
        max_processes_per_pass: 2,
        ..Default::default()
    };
    let (monitor, script) = monitor_with(1, config);
    for pid in 1..=5 {
        script.spawn(pid, &format!("worker-{}", pid));
    }

    // ceil(5 / 2) passes
    for t in 0..3 {
        let report = completed(monitor.refresh_at(at(t)));
        assert_eq!(report.sampled, 2);
    }
    assert_eq!(monitor.tracked_count(), 5);

    // Keeps rotating afterwards
    for t in 3..8 {
        monitor.refresh_at(at(t));
    }
    for pid in 1..=5 {
        assert!(monitor.process_history(pid).len() >= 2, "pid {} starved", pid);
    }
}

#[test]
fn test_network_metrics_only_when_supported() {
    let (monitor, script) = monitor(1);
    script.spawn(1, "browser");
    monitor.refresh_at(at(0));
    monitor.refresh_at(at(1));
    assert!(monitor.process_impact(1).unwrap().network.is_none());
    assert!(monitor.process_history(1)[1].network_sent_rate.is_none());

    let (source, script) = ScriptedSource::new(1);
    let source = source.with_capabilities(SourceCapabilities {
        per_process_network: true,
        ..Default::default()
    });
    let monitor = ImpactMonitor::new(source);
    assert!(monitor.capabilities().per_process_network);

    script.spawn(1, "browser");
    script.update(1, |c| {
        c.network_sent_bytes = Some(0);
        c.network_recv_bytes = Some(0);
    });
    monitor.refresh_at(at(0));
    script.update(1, |c| {
        c.network_sent_bytes = Some(600);
        c.network_recv_bytes = Some(400);
    });
    monitor.refresh_at(at(1));

    let network = monitor.process_impact(1).unwrap().network.unwrap();
    assert_eq!(network.total_sent_bytes, 600);
    assert_eq!(network.total_recv_bytes, 400);
    assert!(approx(network.peak_rate, 1_000.0));
    assert!(approx(network.avg_rate, 500.0));
}

#[test]
fn test_memory_growth_over_window() {
    let (monitor, script) = monitor(1);
    script.spawn(1, "leaky");
    for (t, memory) in [(0, 1_000u64), (1, 3_000), (2, 6_000)] {
        script.update(1, |c| c.working_set_bytes = memory);
        monitor.refresh_at(at(t));
    }

    let impact = monitor.process_impact(1).unwrap();
    assert_eq!(impact.memory_growth_bytes, 5_000);
    assert_eq!(impact.peak_memory_bytes, 6_000);
    assert_eq!(impact.avg_memory_bytes, 3_333);
    assert_eq!(impact.current_memory_bytes, 6_000);
}

#[test]
fn test_overlapping_pass_is_skipped() {
    let (monitor, script) = monitor(1);
    script.spawn(1, "slow");
    script.with_state(|s| s.enumeration_delay = Some(Duration::from_millis(400)));

    std::thread::scope(|scope| {
        let first = scope.spawn(|| monitor.refresh_at(at(0)));
        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(monitor.refresh_at(at(0)), PassOutcome::Skipped);
        assert!(matches!(first.join().unwrap(), PassOutcome::Completed(_)));
    });

    assert_eq!(monitor.total_passes(), 1);
    assert_eq!(script.enumerations(), 1);
}

#[test]
fn test_window_coverage() {
    let (monitor, _script) = monitor(1);
    assert_eq!(monitor.window_coverage_at(at(10)), 0.0);
    assert_eq!(monitor.analysis_window(), Duration::from_secs(300));

    monitor.refresh_at(at(0));
    assert!(approx(monitor.window_coverage_at(at(150)), 0.5));
    assert_eq!(monitor.window_coverage_at(at(900)), 1.0);
    assert_eq!(monitor.window_coverage_at(at(-5)), 0.0);
}

#[test]
fn test_set_analysis_window() {
    let (monitor, _script) = monitor(1);

    monitor.set_analysis_window(120);
    assert_eq!(monitor.analysis_window(), Duration::from_secs(120));
    assert_eq!(monitor.config().history_window_minutes, 2);

    monitor.set_analysis_window(30);
    assert_eq!(monitor.analysis_window(), Duration::from_secs(30));
    assert_eq!(monitor.config().history_window_minutes, 1);
}

#[test]
fn test_clear_history() {
    let (monitor, script) = monitor(1);
    script.spawn(1, "a");
    monitor.refresh_at(at(0));
    monitor.clear_history();

    assert_eq!(monitor.tracked_count(), 0);

    // Next pass treats the process as a first observation again
    script.update(1, |c| c.disk_read_bytes = 50_000);
    monitor.refresh_at(at(1));
    assert_eq!(monitor.process_impact(1).unwrap().total_disk_read_bytes, 0);
}

#[test]
fn test_recalculate_after_weight_change() {
    let (monitor, script) = monitor(1);
    script.spawn(1, "cruncher");
    monitor.refresh_at(at(0));
    script.update(1, |c| c.cpu_user += Duration::from_millis(800));
    script.advance_system_cpu(Duration::from_millis(1000));
    monitor.refresh_at(at(1));

    // avg cpu 40 -> min(80, 100) * 0.4
    assert!(approx(monitor.process_impact(1).unwrap().battery_impact_score, 32.0));

    let mut config = monitor.config();
    config.scoring.battery_cpu_weight = 0.5;
    monitor.update_config(config);

    let mut events = monitor.subscribe();
    monitor.recalculate_impacts();

    assert!(approx(monitor.process_impact(1).unwrap().battery_impact_score, 40.0));
    assert_eq!(
        events.try_recv().unwrap(),
        impactmon::ImpactEvent::DataUpdated
    );
}

#[test]
fn test_refresh_counts_passes_and_sets_start() {
    let (monitor, _script) = monitor(1);
    assert_eq!(monitor.total_passes(), 0);
    assert!(!monitor.is_running());

    monitor.refresh();
    monitor.refresh();
    assert_eq!(monitor.total_passes(), 2);
    assert!(monitor.window_coverage() >= 0.0);
}
