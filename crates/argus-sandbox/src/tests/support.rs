//! Shared doubles for sandbox tests.

use std::sync::Arc;

use argus_config::SandboxLimits;
use argus_plugins::{ExecutionContext, LogLevel, Logger};
use mockall::mock;
use parking_lot::Mutex;

use crate::monitor::ResourceMonitor;
use crate::sandbox::Sandbox;

mock! {
    pub Monitor {}
    impl ResourceMonitor for Monitor {
        fn memory_usage_bytes(&self) -> Option<u64>;
    }
}

/// A monitor that never has a measurement.
pub fn quiet_monitor() -> Arc<dyn ResourceMonitor> {
    monitor_reporting(None)
}

/// A monitor that always reports `bytes`.
pub fn monitor_reporting(bytes: Option<u64>) -> Arc<dyn ResourceMonitor> {
    let mut monitor = MockMonitor::new();
    monitor
        .expect_memory_usage_bytes()
        .returning(move || bytes);
    Arc::new(monitor)
}

pub fn sandbox_with(limits: SandboxLimits) -> Sandbox {
    Sandbox::new(limits, quiet_monitor())
}

pub fn context() -> ExecutionContext {
    ExecutionContext::new("/srv/project")
}

/// Logger that keeps every message it receives.
#[derive(Default)]
pub struct RecordingLogger {
    messages: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogger {
    pub fn messages(&self) -> Vec<(LogLevel, String)> {
        self.messages.lock().clone()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.messages.lock().push((level, message.to_owned()));
    }
}
