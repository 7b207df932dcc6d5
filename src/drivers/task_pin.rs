//! Core-pinned task spawning for the ESP32-S3 dual core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::Builder::spawn`
//! creates a FreeRTOS task pinned to a specific CPU core with explicit
//! priority and stack size. On non-ESP targets, falls back to a plain named
//! thread.
//!
//! `esp_pthread_set_cfg()` sets thread-local configuration that applies to
//! the *next* `pthread_create()` from the calling thread, so the config and
//! spawn pair must not be interleaved with other thread creation.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers for the ESP32-S3 Xtensa LX7 dual core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): Wi-Fi, lwIP, MQTT client.
    Pro = 0,
    /// Core 1 (APP_CPU): publish path.
    App = 1,
}

/// Placement and sizing of one firmware task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    /// Null-terminated task name.
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

impl TaskSpec {
    pub fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Publish coordinator. Above the supervisor so button presses are served
/// while a reconnect loop is running.
pub const PUBLISHER_TASK: TaskSpec = TaskSpec {
    name: "publisher\0",
    core: Core::App,
    priority: 6,
    stack_kb: 6,
};

/// Connection supervisor, next to the network stack.
pub const SUPERVISOR_TASK: TaskSpec = TaskSpec {
    name: "supervisor\0",
    core: Core::Pro,
    priority: 5,
    stack_kb: 8,
};

/// Spawn `f` as the task described by `spec`.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    spec: &TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    // SAFETY: the default config is a plain struct; `spec.name` is a
    // 'static null-terminated string as esp_pthread_cfg_t requires.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = spec.priority as i32;
        cfg.stack_size = (spec.stack_kb * 1024) as _;
        cfg.thread_name = spec.name.as_ptr() as *const _;
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
}

/// Simulation fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    spec: &TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn task_names_are_null_terminated() {
        for spec in [PUBLISHER_TASK, SUPERVISOR_TASK] {
            assert!(spec.name.ends_with('\0'));
            assert!(!spec.display_name().contains('\0'));
        }
    }

    #[test]
    fn publisher_outranks_supervisor() {
        assert!(PUBLISHER_TASK.priority > SUPERVISOR_TASK.priority);
        assert_ne!(PUBLISHER_TASK.core, SUPERVISOR_TASK.core);
    }

    #[test]
    fn sim_spawn_uses_display_name() {
        let handle = spawn_on_core(&PUBLISHER_TASK, || {
            assert_eq!(std::thread::current().name(), Some("publisher"));
        })
        .unwrap();
        handle.join().unwrap();
    }
}
