//! Interrupt control facade over the firmware interrupt service.

use gicmap_abi::TriggerType;
use gicmap_lib::klog_debug;

use crate::platform::{InterruptController, InterruptHandler, IrqResult};

/// Install `handler` for `int_id`.
///
/// The source is disabled first so the handoff is clean. If registration is
/// refused, whatever handler the firmware holds is removed and registration is
/// retried once; the retry's outcome is returned.
pub fn install_handler<C>(ctrl: &mut C, int_id: u32, handler: InterruptHandler) -> IrqResult
where
    C: InterruptController + ?Sized,
{
    if let Err(err) = ctrl.disable_source(int_id) {
        klog_debug!("IRQ {}: disable failed: {}", int_id, err);
    }

    let Err(err) = ctrl.register_source(int_id, Some(handler)) else {
        return Ok(());
    };
    klog_debug!("IRQ {}: register failed ({}), replacing handler", int_id, err);
    if let Err(err) = ctrl.register_source(int_id, None) {
        klog_debug!("IRQ {}: deregister failed: {}", int_id, err);
    }
    ctrl.register_source(int_id, Some(handler))
}

/// Signal end of interrupt for `int_id`.
#[inline]
pub fn acknowledge<C>(ctrl: &mut C, int_id: u32) -> IrqResult
where
    C: InterruptController + ?Sized,
{
    ctrl.end_of_interrupt(int_id)
}

#[inline]
pub fn set_trigger_type<C>(ctrl: &mut C, int_id: u32, trigger: TriggerType) -> IrqResult
where
    C: InterruptController + ?Sized,
{
    ctrl.set_trigger_type(int_id, trigger)
}
