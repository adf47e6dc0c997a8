use crate::error::Error;
use crate::value::ParameterValue;
use alloc::rc::Rc;
use core::cell::RefCell;

/// Per parameter side effects, registered with [`crate::ParameterStore::register_hook`].
/// Every method defaults to doing nothing.
pub trait ParameterHook {
    /// Called once during init, after the value was loaded from its default or the snapshot.
    /// May replace the value with live state and push it to collaborators (e.g. re-arm a timer).
    fn on_init(&mut self, value: &mut ParameterValue) {
        self.on_read(value)
    }

    /// Called before every read, lets live backed parameters refresh the payload.
    fn on_read(&mut self, _value: &mut ParameterValue) {}

    /// Called first on every write. An error rejects the write before anything is changed.
    fn validate(&mut self, _value: &ParameterValue) -> Result<(), Error> {
        Ok(())
    }

    /// Called once the write is accepted and persisted, applies the value to collaborators.
    fn on_write(&mut self, _value: &ParameterValue) {}
}

/// The hook of every parameter without a registered one.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoopHook;

impl ParameterHook for NoopHook {}

/// Allows one hook to serve several parameters while the owner keeps a handle to it.
impl<H: ParameterHook> ParameterHook for Rc<RefCell<H>> {
    fn on_init(&mut self, value: &mut ParameterValue) {
        self.borrow_mut().on_init(value)
    }

    fn on_read(&mut self, value: &mut ParameterValue) {
        self.borrow_mut().on_read(value)
    }

    fn validate(&mut self, value: &ParameterValue) -> Result<(), Error> {
        self.borrow_mut().validate(value)
    }

    fn on_write(&mut self, value: &ParameterValue) {
        self.borrow_mut().on_write(value)
    }
}
