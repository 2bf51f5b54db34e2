use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;

use super::detector::SystemProbe;

/// Source of truth for daemon installation and liveness
#[cfg_attr(test, mockall::automock)]
pub trait EnvironmentProbe: Send + Sync {
    fn daemon_installed(&self) -> bool;
    fn daemon_running(&self) -> bool;
}

/// Lazily computed, cached environment checks
///
/// Each check runs at most once; afterwards the cached answer is returned
/// until one of the `refresh` methods is called.
#[derive(Debug)]
pub struct EnvironmentState<P = SystemProbe> {
    probe: P,
    installed: Option<bool>,
    running: Option<bool>,
}

impl<P: EnvironmentProbe> EnvironmentState<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            installed: None,
            running: None,
        }
    }

    pub fn is_installed(&mut self) -> bool {
        *self
            .installed
            .get_or_insert_with(|| self.probe.daemon_installed())
    }

    pub fn is_running(&mut self) -> bool {
        *self
            .running
            .get_or_insert_with(|| self.probe.daemon_running())
    }

    /// Re-run the installation check, replacing the cached value
    pub fn refresh_installed(&mut self) -> bool {
        self.installed = None;
        self.is_installed()
    }

    /// Re-run the process scan, replacing the cached value
    pub fn refresh_running(&mut self) -> bool {
        self.running = None;
        self.is_running()
    }

    pub fn refresh(&mut self) {
        self.refresh_installed();
        self.refresh_running();
    }

    /// Cached values without triggering any check
    pub fn cached(&self) -> (Option<bool>, Option<bool>) {
        (self.installed, self.running)
    }
}

/// Environment state shared between initializers
pub type SharedEnvironment<P = SystemProbe> = Arc<Mutex<EnvironmentState<P>>>;

static SHARED_ENVIRONMENT: OnceCell<SharedEnvironment> = OnceCell::new();

/// Process-wide environment state
///
/// Created on first call with `binary`; later calls return the same state
/// and ignore their argument.
pub fn shared_environment(binary: &str) -> SharedEnvironment {
    SHARED_ENVIRONMENT
        .get_or_init(|| Arc::new(Mutex::new(EnvironmentState::new(SystemProbe::new(binary)))))
        .clone()
}

/// Wrap a probe in a fresh, unshared state
pub fn environment_with<P: EnvironmentProbe>(probe: P) -> SharedEnvironment<P> {
    Arc::new(Mutex::new(EnvironmentState::new(probe)))
}
