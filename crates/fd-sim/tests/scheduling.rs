//! Rate divisors, degraded models, and halting on a non-finite state.

mod common;

use fd_bus::BusValue;
use fd_sim::{ExecConfig, ExecState, FrameStatus, HaltReason, ScheduledModel, SimError};

fn with_counter(rate: u32) -> ExecConfig {
    let mut config = ExecConfig::new(0.01).with_model(common::mass(10.0));
    config.models.push(ScheduledModel {
        rate,
        ..ScheduledModel::every_frame(Box::new(common::Counter::default()))
    });
    config
}

#[test]
fn rate_divisor_runs_every_nth_frame_with_scaled_step() {
    let mut exec = common::running(with_counter(3), &Default::default());
    let runs = |exec: &fd_sim::Executive| exec.get_bus_value("test/runs").unwrap().as_f64();
    let mut seen = Vec::new();
    for _ in 0..10 {
        let r = exec.advance_frame().unwrap();
        seen.push(runs(&exec));
        assert!(r.degraded.is_empty());
    }
    // frames 3, 6 and 9
    assert_eq!(seen, vec![0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0]);
    let step = exec.get_bus_value("test/step-s").unwrap().as_f64();
    assert!((step - 0.03).abs() < 1e-12, "step {step}");
}

#[test]
fn failing_model_is_degraded_and_frames_continue() {
    let config = ExecConfig::new(0.01)
        .with_model(common::mass(10.0))
        .with_model(Box::new(common::Faulty::default()));
    let mut exec = common::running(config, &Default::default());
    exec.set_bus_value("test/fail", BusValue::Float(1.0)).unwrap();
    for n in 1..=5 {
        let r = exec.advance_frame().unwrap();
        assert_eq!(r.status, FrameStatus::Running);
        assert_eq!(r.degraded, vec!["faulty".to_string()]);
        assert_eq!(exec.failure_count("faulty"), Some(n));
    }

    exec.set_bus_value("test/fail", BusValue::Float(0.0)).unwrap();
    let r = exec.advance_frame().unwrap();
    assert!(r.degraded.is_empty());
    assert_eq!(exec.failure_count("faulty"), Some(0));
    assert_eq!(exec.failure_count("missing"), None);
}

#[test]
fn non_finite_contribution_is_dropped_not_integrated() {
    let config = ExecConfig::new(0.01)
        .with_model(common::mass(10.0))
        .with_model(Box::new(common::Faulty::default()));
    let mut exec = common::running(config, &Default::default());
    exec.set_bus_value("test/poison", BusValue::Float(1.0))
        .unwrap();
    let r = exec.advance_frame().unwrap();
    assert_eq!(r.status, FrameStatus::Running);
    assert_eq!(r.degraded, vec!["faulty".to_string()]);
    assert!(exec.rigid_body().is_finite());
}

#[test]
fn non_finite_state_halts_and_refuses_frames() {
    let mut exec = common::running(common::lifter(100.0), &Default::default());
    exec.advance_frame().unwrap();
    exec.set_bus_value(common::PITCHER_PATH, BusValue::Float(f64::MAX))
        .unwrap();
    let before = *exec.rigid_body();

    let r = exec.advance_frame().unwrap();
    assert!(matches!(r.status, FrameStatus::Halted(HaltReason::NonFinite { .. })));
    assert_eq!(exec.state(), ExecState::Terminated);
    assert!(matches!(exec.halt_reason(), Some(HaltReason::NonFinite { .. })));
    assert_eq!(*exec.rigid_body(), before);

    let err = exec.advance_frame().unwrap_err();
    assert!(matches!(err, SimError::NotRunnable { .. }));
}
