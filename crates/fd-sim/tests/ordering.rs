//! Two-model ordering fixture and the host bus contract.

mod common;

use fd_bus::{BusError, BusValue, PropertyId};
use fd_models::{Model, ModelContext, ModelResult, Registrar, paths};
use fd_sim::{ExecConfig, Executive, ScheduledModel};

/// Publishes the frame number.
#[derive(Clone)]
struct Producer {
    out: Option<PropertyId>,
}

impl Model for Producer {
    fn name(&self) -> &str {
        "producer"
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        self.out = Some(reg.output("test/counter", 0.0)?);
        Ok(())
    }

    fn run(&mut self, ctx: &mut ModelContext<'_>) -> bool {
        match self.out {
            Some(id) => ctx.bus.publish_f64(id, ctx.frame as f64).is_ok(),
            None => false,
        }
    }

    fn box_clone(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }
}

/// Copies whatever the producer last published.
#[derive(Clone)]
struct Consumer {
    io: Option<(PropertyId, PropertyId)>,
}

impl Model for Consumer {
    fn name(&self) -> &str {
        "consumer"
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        self.io = Some((reg.input("test/counter", 0.0)?, reg.output("test/seen", 0.0)?));
        Ok(())
    }

    fn run(&mut self, ctx: &mut ModelContext<'_>) -> bool {
        let Some((input, output)) = self.io else {
            return false;
        };
        match ctx.bus.read_f64(input) {
            Ok(v) => ctx.bus.publish_f64(output, v).is_ok(),
            Err(_) => false,
        }
    }

    fn box_clone(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }
}

fn exec_with(order: Vec<Box<dyn Model>>) -> Executive {
    let mut config = ExecConfig::new(0.01).with_model(common::mass(10.0));
    config
        .models
        .extend(order.into_iter().map(ScheduledModel::every_frame));
    common::running(config, &Default::default())
}

fn seen(exec: &Executive) -> f64 {
    exec.get_bus_value("test/seen").unwrap().as_f64()
}

#[test]
fn downstream_model_sees_same_frame_value() {
    let mut exec = exec_with(vec![
        Box::new(Producer { out: None }),
        Box::new(Consumer { io: None }),
    ]);
    for frame in 1..=5 {
        exec.advance_frame().unwrap();
        assert_eq!(seen(&exec), frame as f64);
    }
}

#[test]
fn upstream_reader_lags_one_frame() {
    let mut exec = exec_with(vec![
        Box::new(Consumer { io: None }),
        Box::new(Producer { out: None }),
    ]);
    for frame in 1..=5 {
        exec.advance_frame().unwrap();
        assert_eq!(seen(&exec), (frame - 1) as f64);
    }
    let records = exec.model_records();
    assert_eq!(records[1].name, "consumer");
    assert_eq!(records[2].order, 2);
}

#[test]
fn host_cannot_write_derived_paths() {
    let mut exec = exec_with(vec![Box::new(Producer { out: None })]);
    exec.advance_frame().unwrap();
    let before = exec.get_bus_value(paths::ALTITUDE).unwrap();
    let err = exec
        .set_bus_value(paths::ALTITUDE, BusValue::Float(123.0))
        .unwrap_err();
    assert!(matches!(err, BusError::ReadOnlyViolation { .. }));
    assert_eq!(exec.get_bus_value(paths::ALTITUDE).unwrap(), before);

    assert!(matches!(
        exec.get_bus_value("no/such/path"),
        Err(BusError::UnknownPath { .. })
    ));
    assert!(matches!(
        exec.set_bus_value("no/such/path", BusValue::Float(1.0)),
        Err(BusError::UnknownPath { .. })
    ));
    // failed writes do not halt the run
    assert!(!exec.advance_frame().unwrap().is_halted());
}

#[test]
fn duplicate_writer_is_rejected_without_override() {
    let mut config = ExecConfig::new(0.01)
        .with_model(common::mass(10.0))
        .with_model(Box::new(Producer { out: None }));
    config.models.push(ScheduledModel {
        model: Box::new(Renamed("producer-2", Producer { out: None })),
        rate: 1,
        overrides: Vec::new(),
    });
    let mut exec = Executive::new();
    let err = exec.initialize(config.clone()).unwrap_err();
    assert!(err.to_string().contains("test/counter"), "{err}");

    config.models[2].overrides = vec!["test/counter".to_string()];
    exec.initialize(config).unwrap();
    assert_eq!(
        exec.bus().entry("test/counter").unwrap().writer.as_deref(),
        Some("producer-2")
    );
}

#[test]
fn catalog_lists_registered_paths() {
    let exec = exec_with(vec![Box::new(Producer { out: None })]);
    let test_paths = exec.catalog("test");
    assert_eq!(test_paths, vec!["test/counter"]);
    assert!(exec.catalog("").len() > 50);
}

/// Same behavior under a different name.
#[derive(Clone)]
struct Renamed(&'static str, Producer);

impl Model for Renamed {
    fn name(&self) -> &str {
        self.0
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        self.1.initialize(reg)
    }

    fn run(&mut self, ctx: &mut ModelContext<'_>) -> bool {
        self.1.run(ctx)
    }

    fn box_clone(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }
}
