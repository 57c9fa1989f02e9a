//! Orchestrator lifecycle, entry actions, commands and queries, driven
//! through mock capabilities.

use crate::mock_hw::{DEVICE, DisplayCall, RecordingSink, connected_idle, idle, orchestrator};

use tavolo::app::commands::Command;
use tavolo::app::events::AppEvent;
use tavolo::app::ports::{BlinkPattern, ConnectionState};
use tavolo::config::SystemConfig;
use tavolo::fsm::StateId;
use tavolo::fsm::context::DeviceStatus;

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn start_shows_boot_screen_and_enters_initializing() {
    let mut orch = orchestrator(SystemConfig::default());
    let mut sink = RecordingSink::default();
    orch.start(0, &mut sink);

    assert_eq!(orch.state(), StateId::Initializing);
    assert_eq!(orch.device_status(), DeviceStatus::Initializing);
    assert_eq!(orch.display().calls[0], DisplayCall::Boot(DEVICE.into()));
    assert_eq!(orch.led().pattern, BlinkPattern::FastBlink);
    assert_eq!(orch.sensor().calibration_factor, Some(0.42));
    assert_eq!(orch.link().begun_at, Some(0));
    assert_eq!(sink.events, vec![AppEvent::Started(StateId::Initializing)]);
}

#[test]
fn initializing_waits_for_sensor() {
    let mut orch = orchestrator(SystemConfig::default());
    orch.sensor_mut().fail_begin = true;
    let mut sink = RecordingSink::default();
    orch.start(0, &mut sink);
    for t in (0..20_000).step_by(500) {
        orch.tick(t, &mut sink);
    }
    assert_eq!(orch.state(), StateId::Initializing);

    orch.sensor_mut().ready = true;
    orch.tick(20_000, &mut sink);
    assert_eq!(orch.state(), StateId::Calibrating);
}

#[test]
fn calibrating_entry_tares_and_shows_message() {
    let mut orch = orchestrator(SystemConfig::default());
    let mut sink = RecordingSink::default();
    orch.start(0, &mut sink);
    orch.tick(0, &mut sink);

    assert_eq!(orch.state(), StateId::Calibrating);
    assert_eq!(orch.led().pattern, BlinkPattern::Pulse);
    assert_eq!(orch.sensor().tare_calls, 1);
    assert!(
        orch.display()
            .calls
            .contains(&DisplayCall::Status("Calibrating...".into(), 3_000))
    );
}

#[test]
fn calibrating_skips_tare_when_disabled() {
    let config = SystemConfig {
        auto_tare: false,
        ..SystemConfig::default()
    };
    let mut orch = orchestrator(config);
    let mut sink = RecordingSink::default();
    orch.start(0, &mut sink);
    orch.tick(0, &mut sink);
    assert_eq!(orch.state(), StateId::Calibrating);
    assert_eq!(orch.sensor().tare_calls, 0);
}

#[test]
fn calibrating_lasts_five_seconds_from_boot() {
    let mut orch = orchestrator(SystemConfig::default());
    let mut sink = RecordingSink::default();
    orch.start(1_000, &mut sink);
    orch.tick(1_000, &mut sink);
    orch.tick(5_999, &mut sink);
    assert_eq!(orch.state(), StateId::Calibrating);
    orch.tick(6_000, &mut sink);
    assert_eq!(orch.state(), StateId::Idle);
}

#[test]
fn idle_entry_turns_led_off_and_marks_ready() {
    let (orch, sink, _) = idle(SystemConfig::default());
    assert_eq!(orch.led().pattern, BlinkPattern::Off);
    assert_eq!(orch.device_status(), DeviceStatus::Ready);
    assert_eq!(
        sink.transitions(),
        vec![
            (StateId::Initializing, StateId::Calibrating),
            (StateId::Calibrating, StateId::Idle),
        ]
    );
    assert!(sink.events.contains(&AppEvent::DeviceStatusChanged {
        from: DeviceStatus::Initializing,
        to: DeviceStatus::Ready,
    }));
}

#[test]
fn idle_shows_weight_screen() {
    let (orch, _, _) = idle(SystemConfig::default());
    assert_eq!(orch.display().last_weight(), Some((0.0, "NORMAL")));
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn self_transition_is_silent() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    let led_writes = orch.led().history.len();
    sink.clear();

    orch.handle_command(Command::Resume, &mut sink);

    assert_eq!(orch.state(), StateId::Idle);
    assert!(sink.transitions().is_empty());
    assert_eq!(orch.led().history.len(), led_writes, "entry must not rerun");
}

#[test]
fn led_commands_override_pattern() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    orch.handle_command(Command::LedOn, &mut sink);
    assert_eq!(orch.led().pattern, BlinkPattern::On);
    orch.handle_command(Command::LedOff, &mut sink);
    assert_eq!(orch.led().pattern, BlinkPattern::Off);
    assert_eq!(orch.state(), StateId::Idle);
}

#[test]
fn tare_command_zeroes_and_confirms() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    let before = orch.sensor().tare_calls;
    orch.tare(&mut sink);
    assert_eq!(orch.sensor().tare_calls, before + 1);
    assert_eq!(
        orch.display().calls.last(),
        Some(&DisplayCall::Status("Tare Complete".into(), 2_000))
    );
    assert!(sink.events.contains(&AppEvent::CommandApplied(Command::Tare)));
}

#[test]
fn set_threshold_command_updates_config() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    orch.handle_command(Command::SetThreshold(250.0), &mut sink);
    assert_eq!(orch.config().weight_threshold_g, 250.0);
    assert!(sink.events.contains(&AppEvent::ThresholdUpdated(250.0)));
    assert!(
        sink.events
            .contains(&AppEvent::CommandApplied(Command::SetThreshold(250.0)))
    );
}

#[test]
fn invalid_threshold_is_rejected() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    sink.clear();
    orch.handle_command(Command::SetThreshold(-5.0), &mut sink);
    orch.handle_command(Command::SetThreshold(f32::NAN), &mut sink);
    assert!(!orch.set_weight_threshold(0.0, &mut sink));
    assert_eq!(orch.config().weight_threshold_g, 100.0);
    assert!(sink.events.is_empty());
}

#[test]
fn calibrate_command_reenters_calibrating() {
    let (mut orch, mut sink, now) = idle(SystemConfig::default());
    let tares = orch.sensor().tare_calls;
    orch.calibrate(&mut sink);
    assert_eq!(orch.state(), StateId::Calibrating);
    assert_eq!(orch.sensor().tare_calls, tares + 1);

    // Already past the boot window, so the next tick hands back to Idle.
    orch.tick(now + 20, &mut sink);
    assert_eq!(orch.state(), StateId::Idle);
}

#[test]
fn maintenance_parks_until_resume() {
    let (mut orch, mut sink, now) = idle(SystemConfig::default());
    orch.handle_command(Command::Maintenance, &mut sink);

    assert_eq!(orch.state(), StateId::Maintenance);
    assert_eq!(orch.device_status(), DeviceStatus::Maintenance);
    assert_eq!(orch.led().pattern, BlinkPattern::SlowBlink);
    assert_eq!(
        orch.display().calls.last(),
        Some(&DisplayCall::Status("Maintenance Mode".into(), 0))
    );

    orch.sensor_mut().feed(500.0);
    orch.tick(now + 100, &mut sink);
    orch.tick(now + 200, &mut sink);
    assert_eq!(orch.state(), StateId::Maintenance, "samples are ignored");
    assert_eq!(orch.measurement().current_weight, 500.0);

    orch.handle_command(Command::Resume, &mut sink);
    assert_eq!(orch.state(), StateId::Idle);
    assert_eq!(orch.led().pattern, BlinkPattern::Off);
}

// ── Local control ─────────────────────────────────────────────

#[test]
fn start_and_stop_measurement() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    assert!(!orch.stop_measurement(&mut sink));
    assert!(orch.start_measurement(&mut sink));
    assert_eq!(orch.state(), StateId::Measuring);
    assert_eq!(orch.device_status(), DeviceStatus::Active);
    assert!(!orch.start_measurement(&mut sink));
    assert!(orch.stop_measurement(&mut sink));
    assert_eq!(orch.state(), StateId::Idle);
}

#[test]
fn calibration_factor_forwarded_to_sensor() {
    let (mut orch, _, _) = idle(SystemConfig::default());
    assert!(orch.set_calibration_factor(2.5));
    assert_eq!(orch.config().calibration_factor, 2.5);
    assert_eq!(orch.sensor().calibration_factor, Some(2.5));

    assert!(!orch.set_calibration_factor(0.0));
    assert!(!orch.set_calibration_factor(f32::INFINITY));
    assert_eq!(orch.sensor().calibration_factor, Some(2.5));
}

#[test]
fn measurement_interval_must_be_positive() {
    let (mut orch, _, _) = idle(SystemConfig::default());
    assert!(!orch.set_measurement_interval(0));
    assert!(orch.set_measurement_interval(250));
    assert_eq!(orch.config().measurement_interval_ms, 250);
}

// ── Construction and queries ──────────────────────────────────

#[test]
fn invalid_config_falls_back_to_defaults() {
    let config = SystemConfig {
        weight_threshold_g: -1.0,
        ..SystemConfig::default()
    };
    let orch = orchestrator(config);
    assert_eq!(*orch.config(), SystemConfig::default());
}

#[test]
fn status_report_summarises_system() {
    let (mut orch, mut sink, now) = connected_idle(SystemConfig::default());
    orch.sensor_mut().feed(42.5);
    orch.tick(now + 100, &mut sink);

    let report = orch.status_report();
    assert_eq!(report.device_id.as_str(), DEVICE);
    assert_eq!(report.state, StateId::Measuring);
    assert_eq!(report.device_status, DeviceStatus::Active);
    assert_eq!(report.weight_g, 42.5);
    assert_eq!(report.threshold_g, 100.0);
    assert!(!report.threshold_exceeded);
    assert_eq!(report.link, ConnectionState::Connected);
    assert_eq!(report.uptime_ms, now + 100);

    let line = report.to_string();
    assert!(line.contains("state=MEASURING (ACTIVE)"));
    assert!(line.contains("weight=42.5g"));
    assert!(line.contains("exceeded=NO"));
    assert!(line.contains("edge=connected"));
}

#[test]
fn state_names_are_upper_case() {
    let (mut orch, mut sink, _) = idle(SystemConfig::default());
    assert_eq!(orch.state_name(), "IDLE");
    orch.handle_command(Command::Maintenance, &mut sink);
    assert_eq!(orch.state_name(), "MAINTENANCE");
}

#[test]
fn long_device_id_is_truncated() {
    let long = "TAVOLO_0123456789ABCDEF0123456789ABCDEF";
    let orch = tavolo::app::service::Orchestrator::new(
        crate::mock_hw::MockSensor::default(),
        crate::mock_hw::MockLed::default(),
        crate::mock_hw::MockDisplay::default(),
        crate::mock_hw::MockLink::default(),
        long,
        SystemConfig::default(),
    );
    assert_eq!(orch.device_id(), &long[..32]);
}

#[test]
fn tick_count_advances() {
    let (mut orch, mut sink, now) = idle(SystemConfig::default());
    let before = orch.tick_count();
    orch.tick(now + 1, &mut sink);
    orch.tick(now + 2, &mut sink);
    assert_eq!(orch.tick_count(), before + 2);
}
