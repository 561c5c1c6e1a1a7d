// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Developer-facing warnings.
use std::fmt;
use std::rc::Rc;

/// A property trap was invoked as a method.
pub const W_NOT_CALLABLE: u16 = 650;
/// `index` was assigned on a node without a parent.
pub const W_INDEX_WITHOUT_PARENT: u16 = 651;
/// `reset_by_id` named an id that is not registered.
pub const W_RESET_UNKNOWN_ID: u16 = 652;

/// A non-fatal diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Stable warning code.
    pub code: u16,
    /// Human-readable detail.
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}: {}", self.code, self.message)
    }
}

/// Callback receiving every warning.
pub type WarningHandler = Rc<dyn Fn(&Warning)>;

#[derive(Default)]
pub(crate) struct Diagnostics {
    handlers: Vec<WarningHandler>,
}

impl Diagnostics {
    pub(crate) fn add(&mut self, handler: WarningHandler) {
        self.handlers.push(handler);
    }

    pub(crate) fn report(&self, warning: &Warning) {
        tracing::warn!(code = warning.code, message = %warning.message, "graph warning");
        for handler in &self.handlers {
            handler(warning);
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
