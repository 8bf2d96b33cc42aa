//! # Opaque work descriptor.
//!
//! [`TaskPayload`] bundles a task name with free-form JSON input and options.
//! The dispatcher never inspects the contents; providers interpret them.
//!
//! ## Example
//! ```
//! use serde_json::json;
//! use taskrouter::TaskPayload;
//!
//! let payload = TaskPayload::new("generate", json!({"prompt": "a red fox"}))
//!     .with_options(json!({"steps": 20}));
//!
//! assert_eq!(payload.task(), "generate");
//! ```

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of work, opaque to the dispatcher.
///
/// Carries the task name (which provider-side operation to run), the input
/// payload, and free-form options. All three pass through to the provider
/// untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskPayload {
    task: Cow<'static, str>,
    input: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    options: Value,
}

impl TaskPayload {
    /// Creates a payload with the given task name and input.
    pub fn new(task: impl Into<Cow<'static, str>>, input: Value) -> Self {
        Self {
            task: task.into(),
            input,
            options: Value::Null,
        }
    }

    /// Attaches free-form options.
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    /// Returns the task name.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Returns the input payload.
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Returns the options (`Value::Null` when unset).
    pub fn options(&self) -> &Value {
        &self.options
    }
}
