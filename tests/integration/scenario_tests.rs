//! End-to-end scenarios: samples and edge traffic flowing through the
//! orchestrator over several ticks.

use crate::mock_hw::{DEVICE, DisplayCall, RecordingSink, TestOrchestrator, connected_idle, idle};

use tavolo::app::commands::Command;
use tavolo::app::events::AppEvent;
use tavolo::app::ports::{BlinkPattern, ConnectionState};
use tavolo::config::SystemConfig;
use tavolo::fsm::StateId;
use tavolo::fsm::context::DeviceStatus;

// ── Threshold ─────────────────────────────────────────────────

#[test]
fn overweight_load_then_raised_threshold() {
    let (mut orch, mut sink, _) = connected_idle(SystemConfig::default());
    sink.clear();

    orch.sensor_mut().feed(150.0);
    orch.tick(5_100, &mut sink);
    assert_eq!(orch.state(), StateId::Measuring);
    // The flag follows the state, which trips on the next rule.
    assert!(!orch.is_threshold_exceeded());
    assert_eq!(orch.display().last_weight(), Some((150.0, "NORMAL")));
    assert_eq!(orch.link().reported_weights(), vec![150.0]);

    orch.tick(5_200, &mut sink);
    assert_eq!(orch.state(), StateId::ThresholdExceeded);
    assert!(orch.is_threshold_exceeded());
    assert_eq!(orch.led().pattern, BlinkPattern::On);
    assert_eq!(sink.threshold_changes(), vec![true]);
    assert_eq!(orch.display().last_weight(), Some((150.0, "OVER LIMIT")));

    orch.link_mut().send_command(Command::SetThreshold(200.0), 5_250);
    orch.tick(5_300, &mut sink);
    assert_eq!(orch.config().weight_threshold_g, 200.0);
    assert_eq!(orch.state(), StateId::Measuring);
    assert_eq!(sink.threshold_changes(), vec![true, false]);
    assert!(!orch.is_threshold_exceeded());
    assert_eq!(orch.display().last_weight(), Some((150.0, "NORMAL")));

    assert_eq!(
        sink.transitions(),
        vec![
            (StateId::Idle, StateId::Measuring),
            (StateId::Measuring, StateId::ThresholdExceeded),
            (StateId::ThresholdExceeded, StateId::Measuring),
        ]
    );
}

#[test]
fn band_between_release_and_trip_holds() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    sink.clear();

    orch.sensor_mut().feed(150.0);
    orch.tick(5_100, &mut sink);
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.state(), StateId::ThresholdExceeded);

    orch.sensor_mut().feed(95.0);
    orch.tick(5_300, &mut sink);
    assert_eq!(orch.state(), StateId::ThresholdExceeded);
    assert!(orch.is_threshold_exceeded());

    orch.sensor_mut().feed(90.0);
    orch.tick(5_400, &mut sink);
    assert_eq!(orch.state(), StateId::ThresholdExceeded, "release is strict");

    orch.sensor_mut().feed(89.0);
    orch.tick(5_500, &mut sink);
    assert_eq!(orch.state(), StateId::Measuring);
    assert!(!orch.is_threshold_exceeded());
    assert_eq!(sink.threshold_changes(), vec![true, false]);
}

/// Overweight load tripped at 5200.
fn tripped(connected: bool) -> (TestOrchestrator, RecordingSink) {
    let (mut orch, mut sink, _) = if connected {
        connected_idle(SystemConfig::default())
    } else {
        idle(SystemConfig::default())
    };
    orch.sensor_mut().feed(150.0);
    orch.tick(5_100, &mut sink);
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.state(), StateId::ThresholdExceeded);
    assert_eq!(orch.display().last_weight(), Some((150.0, "OVER LIMIT")));
    (orch, sink)
}

fn assert_normal(orch: &TestOrchestrator) {
    assert!(!orch.is_threshold_exceeded());
    assert!(!orch.measurement().threshold_exceeded);
    assert!(!orch.status_report().threshold_exceeded);
}

#[test]
fn stop_then_light_load_reads_normal() {
    let (mut orch, mut sink) = tripped(false);
    assert!(orch.stop_measurement(&mut sink));
    assert_eq!(orch.state(), StateId::Idle);
    assert_normal(&orch);
    assert_eq!(sink.threshold_changes(), vec![true, false]);

    orch.tick(5_250, &mut sink);
    assert_eq!(orch.display().last_weight(), Some((150.0, "NORMAL")));

    // 95 g sits inside the release band but the load was never re-tripped.
    orch.sensor_mut().feed(95.0);
    for i in 1..=6 {
        orch.tick(5_300 + i * 100, &mut sink);
    }
    assert_eq!(orch.state(), StateId::Measuring);
    assert_normal(&orch);
    assert_eq!(orch.display().last_weight(), Some((95.0, "NORMAL")));
    assert_eq!(sink.threshold_changes(), vec![true, false]);
}

#[test]
fn link_recovery_from_overweight_reads_normal() {
    let (mut orch, mut sink) = tripped(true);
    orch.link_mut().go(ConnectionState::Error);
    orch.tick(5_300, &mut sink);
    assert_eq!(orch.state(), StateId::CommunicationError);
    assert_normal(&orch);

    orch.link_mut().go(ConnectionState::Connected);
    orch.tick(5_400, &mut sink);
    assert_eq!(orch.state(), StateId::Idle);

    orch.sensor_mut().feed(95.0);
    orch.tick(5_500, &mut sink);
    orch.tick(5_600, &mut sink);
    assert_eq!(orch.state(), StateId::Measuring);
    assert_normal(&orch);
    assert_eq!(orch.display().last_weight(), Some((95.0, "NORMAL")));
}

#[test]
fn commands_leaving_overweight_clear_flag() {
    let (mut orch, mut sink) = tripped(false);
    orch.handle_command(Command::Maintenance, &mut sink);
    assert_eq!(orch.state(), StateId::Maintenance);
    assert_normal(&orch);
    orch.handle_command(Command::Resume, &mut sink);
    assert_eq!(orch.state(), StateId::Idle);
    assert_normal(&orch);

    let (mut orch, mut sink) = tripped(false);
    orch.calibrate(&mut sink);
    assert_eq!(orch.state(), StateId::Calibrating);
    assert_normal(&orch);
    assert_eq!(sink.threshold_changes(), vec![true, false]);
}

#[test]
fn exact_threshold_does_not_trip() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    orch.sensor_mut().feed(100.0);
    orch.tick(5_100, &mut sink);
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.state(), StateId::Measuring);
    assert!(!orch.is_threshold_exceeded());
}

// ── Report throttle ───────────────────────────────────────────

#[test]
fn reports_on_delta_or_age() {
    let (mut orch, mut sink, _) = connected_idle(SystemConfig::default());

    orch.sensor_mut().feed(150.0);
    orch.tick(5_100, &mut sink);
    orch.sensor_mut().feed(156.0);
    orch.tick(5_200, &mut sink);
    orch.sensor_mut().feed(158.0);
    orch.tick(5_300, &mut sink);
    orch.tick(10_199, &mut sink);
    assert_eq!(orch.link().reported_weights(), vec![150.0, 156.0]);

    orch.tick(10_200, &mut sink);
    let timestamps: Vec<u64> = orch.link().weights.iter().map(|(_, _, ts)| *ts).collect();
    assert_eq!(orch.link().reported_weights(), vec![150.0, 156.0, 158.0]);
    assert_eq!(timestamps, vec![5_100, 5_200, 10_200]);
    assert_eq!(orch.link().weights[0].0, DEVICE);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::WeightReported { .. })),
        3
    );
}

#[test]
fn failed_send_is_retried_next_tick() {
    let (mut orch, mut sink, _) = connected_idle(SystemConfig::default());
    orch.link_mut().accept_sends = false;

    orch.sensor_mut().feed(150.0);
    orch.tick(5_100, &mut sink);
    assert!(orch.link().weights.is_empty());
    assert_eq!(orch.measurement().last_report_ms, None);

    orch.link_mut().accept_sends = true;
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.link().weights, vec![(String::from(DEVICE), 150.0, 5_200)]);
    assert_eq!(orch.measurement().last_report_ms, Some(5_200));
    assert_eq!(orch.measurement().last_reported_weight, 150.0);
}

#[test]
fn nothing_reported_while_disconnected() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    orch.sensor_mut().feed(150.0);
    orch.tick(5_100, &mut sink);
    orch.tick(5_200, &mut sink);
    assert!(orch.link().weights.is_empty());

    orch.link_mut().go(ConnectionState::Connected);
    orch.tick(5_300, &mut sink);
    assert_eq!(orch.link().reported_weights(), vec![150.0]);
}

#[test]
fn nothing_reported_before_first_sample() {
    let (mut orch, mut sink, now) = connected_idle(SystemConfig::default());
    orch.tick(now + 10_000, &mut sink);
    assert!(orch.link().weights.is_empty());
}

// ── Communication errors ──────────────────────────────────────

#[test]
fn link_error_interrupts_measuring_and_recovers() {
    let (mut orch, mut sink, _) = connected_idle(SystemConfig::default());
    orch.sensor_mut().feed(50.0);
    orch.tick(5_100, &mut sink);
    assert_eq!(orch.state(), StateId::Measuring);

    orch.link_mut().go(ConnectionState::Error);
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.state(), StateId::CommunicationError);
    assert_eq!(orch.device_status(), DeviceStatus::Error);
    assert_eq!(orch.led().pattern, BlinkPattern::FastBlink);
    assert_eq!(
        orch.display().calls.last(),
        Some(&DisplayCall::Error("Comm Error".into(), 5_000))
    );

    // Samples keep arriving but do not move the state.
    orch.sensor_mut().feed(300.0);
    orch.tick(5_300, &mut sink);
    assert_eq!(orch.state(), StateId::CommunicationError);

    orch.link_mut().go(ConnectionState::Connected);
    orch.tick(5_400, &mut sink);
    assert_eq!(orch.state(), StateId::Idle);
    assert_eq!(orch.device_status(), DeviceStatus::Ready);
}

#[test]
fn link_error_exits_threshold_exceeded() {
    let (mut orch, mut sink, _) = connected_idle(SystemConfig::default());
    orch.sensor_mut().feed(150.0);
    orch.tick(5_100, &mut sink);
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.state(), StateId::ThresholdExceeded);

    orch.link_mut().go(ConnectionState::Error);
    orch.tick(5_300, &mut sink);
    assert_eq!(orch.state(), StateId::CommunicationError);
    assert_eq!(sink.threshold_changes(), vec![true, false]);
    assert!(
        sink.transitions()
            .contains(&(StateId::ThresholdExceeded, StateId::CommunicationError))
    );
}

#[test]
fn link_error_preempts_maintenance() {
    let (mut orch, mut sink, _) = connected_idle(SystemConfig::default());
    orch.handle_command(Command::Maintenance, &mut sink);
    orch.link_mut().go(ConnectionState::Error);
    orch.tick(5_100, &mut sink);
    assert_eq!(orch.state(), StateId::CommunicationError);

    orch.link_mut().go(ConnectionState::Connected);
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.state(), StateId::Idle);
}

#[test]
fn weight_screen_tracks_link() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    assert_eq!(orch.display().last_link(), None);

    orch.link_mut().go(ConnectionState::Connected);
    orch.tick(5_100, &mut sink);
    assert_eq!(orch.display().last_link(), Some(true));

    orch.link_mut().go(ConnectionState::Disconnected);
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.display().last_link(), Some(false));
}

#[test]
fn reconnect_outside_comm_error_changes_nothing() {
    let (mut orch, mut sink, _) = connected_idle(SystemConfig::default());
    orch.link_mut().go(ConnectionState::Disconnected);
    orch.tick(5_100, &mut sink);
    orch.link_mut().go(ConnectionState::Connected);
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.state(), StateId::Idle);
    assert!(sink.events.contains(&AppEvent::LinkChanged(ConnectionState::Disconnected)));
}

// ── Device status publishing ──────────────────────────────────

#[test]
fn device_status_published_on_change() {
    let (mut orch, mut sink, _) = connected_idle(SystemConfig::default());
    assert_eq!(orch.link().statuses, vec!["READY"]);

    orch.sensor_mut().feed(50.0);
    orch.tick(5_100, &mut sink);
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.link().statuses, vec!["READY", "ACTIVE"]);

    orch.link_mut().go(ConnectionState::Error);
    orch.tick(5_300, &mut sink);
    orch.link_mut().go(ConnectionState::Connected);
    orch.tick(5_400, &mut sink);
    assert_eq!(orch.link().statuses, vec!["READY", "ACTIVE", "READY"]);
}

#[test]
fn device_status_retried_until_accepted() {
    let (mut orch, mut sink, _) = connected_idle(SystemConfig::default());
    orch.link_mut().accept_sends = false;
    orch.handle_command(Command::Maintenance, &mut sink);
    orch.tick(5_100, &mut sink);
    assert_eq!(orch.link().statuses, vec!["READY"]);

    orch.link_mut().accept_sends = true;
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.link().statuses, vec!["READY", "MAINTENANCE"]);
}

// ── Edge commands ─────────────────────────────────────────────

#[test]
fn edge_commands_apply_during_tick() {
    let (mut orch, mut sink, now) = connected_idle(SystemConfig::default());
    orch.link_mut().send_command(Command::Maintenance, 1_234);
    orch.tick(now + 100, &mut sink);
    assert_eq!(orch.state(), StateId::Maintenance);
    assert!(sink.events.contains(&AppEvent::CommandApplied(Command::Maintenance)));

    orch.link_mut().send_command(Command::Resume, 1_300);
    orch.tick(now + 200, &mut sink);
    assert_eq!(orch.state(), StateId::Idle);
}

#[test]
fn calibrate_from_measuring_returns_to_idle() {
    let (mut orch, mut sink, _) = connected_idle(SystemConfig::default());
    orch.sensor_mut().feed(50.0);
    orch.tick(5_100, &mut sink);
    assert_eq!(orch.state(), StateId::Measuring);

    let tares = orch.sensor().tare_calls;
    orch.link_mut().send_command(Command::Calibrate, 5_150);
    orch.tick(5_200, &mut sink);
    assert_eq!(orch.sensor().tare_calls, tares + 1);
    // Calibrating entered during link update; the same tick's rule ends it.
    assert_eq!(orch.state(), StateId::Idle);
    assert!(
        sink.transitions()
            .ends_with(&[(StateId::Measuring, StateId::Calibrating), (StateId::Calibrating, StateId::Idle)])
    );
}
