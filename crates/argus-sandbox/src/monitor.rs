//! Resource sampling used to enforce the memory ceiling.

use parking_lot::Mutex;
use sysinfo::{Pid, Process, ProcessesToUpdate, System};

/// Source of resource usage samples.
///
/// The sandbox polls the monitor on a fixed interval while a plugin runs.
/// Returning `None` means no measurement is available, which never counts as
/// a breach.
pub trait ResourceMonitor: Send + Sync {
    /// Current memory usage in bytes.
    fn memory_usage_bytes(&self) -> Option<u64>;
}

/// Samples the resident memory of the current process via `sysinfo`.
///
/// Plugins run as tasks inside the host process, so the process total is the
/// tightest bound available.
#[derive(Debug)]
pub struct ProcessMemoryMonitor {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessMemoryMonitor {
    /// Creates a monitor for the current process.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pid: sysinfo::get_current_pid().ok(),
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessMemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceMonitor for ProcessMemoryMonitor {
    fn memory_usage_bytes(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).map(Process::memory)
    }
}
