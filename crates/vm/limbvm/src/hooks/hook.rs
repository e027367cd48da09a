use std::{cell::RefCell, rc::Rc};

use crate::{
    errors::{ContextResult, VMError},
    hooks::default_hook::DefaultHook,
    vm::VM,
};

/// Code run around the top-level frame of a message.
pub trait Hook {
    fn prepare_execution(&mut self, vm: &mut VM<'_>) -> Result<(), VMError>;

    fn finalize_execution(
        &mut self,
        vm: &mut VM<'_>,
        report: &mut ContextResult,
    ) -> Result<(), VMError>;
}

pub fn get_hooks() -> Vec<Rc<RefCell<dyn Hook + 'static>>> {
    vec![Rc::new(RefCell::new(DefaultHook))]
}
