//! Property tests for the bus access contract.

use fd_bus::{Access, BusError, BusValue, StateBus};
use proptest::prelude::*;

proptest! {
    #[test]
    fn derived_entries_never_change_through_set(initial in -1e6f64..1e6, attempt in -1e6f64..1e6) {
        let mut bus = StateBus::new();
        bus.register_f64("velocities/u-mps", Access::Derived, initial).unwrap();

        let result = bus.set("velocities/u-mps", BusValue::Float(attempt));
        prop_assert!(
            matches!(result, Err(BusError::ReadOnlyViolation { .. })),
            "expected a read-only violation"
        );
        prop_assert_eq!(bus.get_f64("velocities/u-mps").unwrap(), initial);
    }

    #[test]
    fn settable_entries_hold_last_write(writes in proptest::collection::vec(-1e3f64..1e3, 1..20)) {
        let mut bus = StateBus::new();
        bus.register_f64("fcs/throttle-cmd-norm", Access::Settable, 0.0).unwrap();
        for w in &writes {
            bus.set("fcs/throttle-cmd-norm", BusValue::Float(*w)).unwrap();
        }
        prop_assert_eq!(bus.get_f64("fcs/throttle-cmd-norm").unwrap(), *writes.last().unwrap());
    }

    #[test]
    fn unregistered_paths_are_unknown(segment in "[a-z]{1,8}") {
        let mut bus = StateBus::new();
        bus.register_f64("known/path", Access::Settable, 0.0).unwrap();
        let path = format!("missing/{segment}");
        let unknown_get = matches!(bus.get(&path), Err(BusError::UnknownPath { .. }));
        let unknown_set = matches!(
            bus.set(&path, BusValue::Float(1.0)),
            Err(BusError::UnknownPath { .. })
        );
        prop_assert!(unknown_get);
        prop_assert!(unknown_set);
    }
}
