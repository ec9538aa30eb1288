//! Interrupt control facade over the simulated firmware protocol.

use core::sync::atomic::Ordering;

use gicmap_abi::TriggerType;
use gicmap_core::{IrqError, acknowledge, install_handler, set_trigger_type};
use gicmap_lib::testing::TestResult;
use gicmap_lib::{assert_eq_test, assert_err, assert_ok, assert_test, define_test_suite, pass};

use crate::sim::{LAST_FIRED, LAST_HANDLER, SimController, record_fired, record_fired_alt};

const LPI_ID: u32 = 0x204C;
const SPI_ID: u32 = 40;

pub fn test_install_on_free_source() -> TestResult {
    let mut ctrl = SimController::new();
    assert_ok!(install_handler(&mut ctrl, LPI_ID, record_fired));
    assert_eq_test!(ctrl.disabled, 1, "source not disabled before install");

    LAST_FIRED.store(0, Ordering::Relaxed);
    assert_test!(ctrl.fire(LPI_ID), "no handler registered");
    assert_eq_test!(LAST_FIRED.load(Ordering::Relaxed), LPI_ID);
    pass!()
}

pub fn test_install_replaces_handler() -> TestResult {
    let mut ctrl = SimController::new();
    assert_ok!(install_handler(&mut ctrl, SPI_ID, record_fired));
    assert_ok!(install_handler(&mut ctrl, SPI_ID, record_fired_alt));

    assert_test!(ctrl.fire(SPI_ID));
    assert_eq_test!(LAST_HANDLER.load(Ordering::Relaxed), 2);
    assert_eq_test!(LAST_FIRED.load(Ordering::Relaxed), SPI_ID);
    pass!()
}

pub fn test_acknowledge_and_trigger() -> TestResult {
    let mut ctrl = SimController::new();
    assert_ok!(acknowledge(&mut ctrl, SPI_ID));
    assert_eq_test!(ctrl.eoi_count, 1);

    assert_ok!(set_trigger_type(&mut ctrl, SPI_ID, TriggerType::EdgeRising));
    assert_eq_test!(
        ctrl.last_trigger,
        Some((SPI_ID, TriggerType::EdgeRising))
    );
    assert_err!(
        set_trigger_type(&mut ctrl, 3, TriggerType::LevelHigh),
        IrqError::Unsupported { int_id: 3 }
    );
    pass!()
}

define_test_suite!(
    irq,
    [
        test_install_on_free_source,
        test_install_replaces_handler,
        test_acknowledge_and_trigger,
    ]
);
