use fd_bus::BusValue;
use fd_config::*;
use fd_models::{AtmosphereConfig, InertialConfig};
use fd_script::{Action, ActionValue, CompareOp, Condition, EventDef, Transition, TriggerMode};

fn sample() -> CaseDef {
    CaseDef {
        version: CURRENT_VERSION,
        name: "roundtrip".to_string(),
        dt_s: 0.005,
        start_time_s: 0.0,
        integration: Default::default(),
        models: vec![
            ModelDef {
                name: "atmosphere".to_string(),
                rate: 1,
                overrides: Vec::new(),
                kind: ModelKind::Atmosphere(AtmosphereConfig {
                    delta_t_k: 10.0,
                    wind_ned_mps: [5.0, 0.0, 0.0],
                }),
            },
            ModelDef {
                name: "inertial".to_string(),
                rate: 4,
                overrides: Vec::new(),
                kind: ModelKind::Inertial(InertialConfig::default()),
            },
        ],
        initial_values: vec![InitialValueDef {
            path: "atmosphere/delta-t-k".to_string(),
            value: BusValue::Float(-5.0),
        }],
        initial_condition: IcDef::default(),
        events: vec![EventDef {
            name: "warm".to_string(),
            condition: Condition::Any {
                conditions: vec![
                    Condition::compare("simulation/sim-time-sec", CompareOp::Ge, 2.0),
                    Condition::Not {
                        condition: Box::new(Condition::Always),
                    },
                ],
            },
            mode: TriggerMode::Rearming,
            delay_s: 0.5,
            actions: vec![
                Action::Set {
                    target: "atmosphere/delta-t-k".to_string(),
                    value: ActionValue::Property("atmosphere/delta-t-k".to_string()),
                    transition: Transition::Exponential { tau_s: 3.0 },
                },
                Action::Increment {
                    target: "atmosphere/delta-t-k".to_string(),
                    delta: ActionValue::Const(1.0),
                },
                Action::Halt {
                    reason: Some("done".to_string()),
                },
            ],
            notify: vec!["atmosphere/delta-t-k".to_string()],
        }],
        trim: None,
        run: RunDef::default(),
    }
}

#[test]
fn roundtrip_yaml() {
    let case = sample();
    let path = std::env::temp_dir().join("fd_config_roundtrip.yaml");
    save_yaml(&path, &case).unwrap();
    let loaded = load_yaml(&path).unwrap();
    assert_eq!(case, loaded);
}

#[test]
fn roundtrip_json() {
    let case = sample();
    let path = std::env::temp_dir().join("fd_config_roundtrip.json");
    save_json(&path, &case).unwrap();
    let loaded = load(&path).unwrap();
    assert_eq!(case, loaded);
}

#[test]
fn save_refuses_invalid_case() {
    let mut case = sample();
    case.dt_s = -1.0;
    let path = std::env::temp_dir().join("fd_config_invalid.yaml");
    assert!(matches!(
        save_yaml(&path, &case),
        Err(ConfigError::Validation(_))
    ));
}
