//! Test doubles for exercising the registry and dispatcher.
//!
//! Available to this crate's unit tests and, behind the `test-support`
//! feature, to workspace integration tests that need a scriptable module
//! without shelling out to real system tools.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

use rootd_protocol::{ModuleCapability, Parameters};

use crate::error::ModuleError;
use crate::module::Module;

/// Scriptable module stub recording every interaction.
pub struct StubModule {
    name: String,
    capabilities: Vec<ModuleCapability>,
    fail_initialize: bool,
    fail_shutdown: bool,
    execute_delay: Duration,
    result: Value,
    execute_calls: AtomicUsize,
    shutdown_calls: AtomicUsize,
    last_call: Mutex<Option<(String, Parameters)>>,
}

impl StubModule {
    /// Creates a stub with a single declared `probe` capability.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: vec![ModuleCapability::new("probe", "Stub probe action")],
            fail_initialize: false,
            fail_shutdown: false,
            execute_delay: Duration::ZERO,
            result: json!({"probe": true}),
            execute_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            last_call: Mutex::new(None),
        }
    }

    /// Replaces the declared capability list.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Vec<ModuleCapability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Makes `initialize` fail with an unavailable-prerequisite error.
    #[must_use]
    pub const fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Makes `shutdown` report a cleanup failure.
    #[must_use]
    pub const fn failing_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    /// Delays every `execute` call, for concurrency tests.
    #[must_use]
    pub const fn with_execute_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = delay;
        self
    }

    /// Sets the value every successful `execute` call returns.
    #[must_use]
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    /// Number of times `execute` has been invoked.
    #[must_use]
    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    /// Number of times `shutdown` has been invoked.
    #[must_use]
    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    /// The `(action, parameters)` pair from the most recent `execute` call.
    #[must_use]
    pub fn last_call(&self) -> Option<(String, Parameters)> {
        self.last_call
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Module for StubModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "0.0.0"
    }

    fn description(&self) -> &str {
        "Scriptable stub module"
    }

    fn capabilities(&self) -> Vec<ModuleCapability> {
        self.capabilities.clone()
    }

    fn initialize(&self) -> Result<(), ModuleError> {
        if self.fail_initialize {
            return Err(ModuleError::unavailable("stub prerequisite missing"));
        }
        Ok(())
    }

    fn shutdown(&self) -> Result<(), ModuleError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_shutdown {
            return Err(ModuleError::internal("stub cleanup failed"));
        }
        Ok(())
    }

    fn execute(&self, action: &str, parameters: &Parameters) -> Result<Value, ModuleError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_call
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) =
            Some((action.to_owned(), parameters.clone()));
        if !self.execute_delay.is_zero() {
            thread::sleep(self.execute_delay);
        }
        Ok(self.result.clone())
    }
}
