//! Lifecycle hooks supplied by application code.
//!
//! Hooks are plain closures registered on an entry type. Each phase keeps
//! its hooks in registration order.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::composite::Configuration;

/// Error returned by a hook body.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by a hook body.
pub type HookResult = Result<(), HookError>;

type HookFn = dyn Fn(&Configuration) -> HookResult + Send + Sync;

/// Lifecycle phase a hook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Init,
    Start,
    Stop,
    Destroy,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookPhase::Init => "init",
            HookPhase::Start => "start",
            HookPhase::Stop => "stop",
            HookPhase::Destroy => "destroy",
        };
        f.write_str(name)
    }
}

/// A hook failed.
#[derive(Debug, Error)]
#[error("{phase} hook '{hook}' failed: {source}")]
pub struct HookInvocationError {
    pub phase: HookPhase,
    pub hook: String,
    #[source]
    pub source: HookError,
}

/// A single named hook.
#[derive(Clone)]
pub struct Hook {
    label: String,
    body: Arc<HookFn>,
}

impl Hook {
    pub fn new<F>(label: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Configuration) -> HookResult + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            body: Arc::new(body),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn invoke(&self, phase: HookPhase, config: &Configuration) -> Result<(), HookInvocationError> {
        (self.body)(config).map_err(|source| HookInvocationError {
            phase,
            hook: self.label.clone(),
            source,
        })
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").field("label", &self.label).finish()
    }
}

/// Ordered hooks for every phase.
#[derive(Debug, Clone, Default)]
pub struct HookSet {
    init: Vec<Hook>,
    start: Vec<Hook>,
    stop: Vec<Hook>,
    destroy: Vec<Hook>,
}

impl HookSet {
    pub fn push(&mut self, phase: HookPhase, hook: Hook) {
        self.phase_mut(phase).push(hook);
    }

    /// Append all hooks of `other` after the ones already held.
    pub fn extend(&mut self, other: &HookSet) {
        self.init.extend(other.init.iter().cloned());
        self.start.extend(other.start.iter().cloned());
        self.stop.extend(other.stop.iter().cloned());
        self.destroy.extend(other.destroy.iter().cloned());
    }

    pub fn hooks(&self, phase: HookPhase) -> &[Hook] {
        match phase {
            HookPhase::Init => &self.init,
            HookPhase::Start => &self.start,
            HookPhase::Stop => &self.stop,
            HookPhase::Destroy => &self.destroy,
        }
    }

    fn phase_mut(&mut self, phase: HookPhase) -> &mut Vec<Hook> {
        match phase {
            HookPhase::Init => &mut self.init,
            HookPhase::Start => &mut self.start,
            HookPhase::Stop => &mut self.stop,
            HookPhase::Destroy => &mut self.destroy,
        }
    }

    /// Run hooks in order, stopping at the first failure.
    pub fn run_strict(&self, phase: HookPhase, config: &Configuration) -> Result<usize, HookInvocationError> {
        let hooks = self.hooks(phase);
        for hook in hooks {
            tracing::debug!(phase = %phase, hook = %hook.label(), "Invoking hook");
            hook.invoke(phase, config)?;
        }
        Ok(hooks.len())
    }

    /// Run every hook; failures are logged and returned without stopping the rest.
    pub fn run_best_effort(&self, phase: HookPhase, config: &Configuration) -> Vec<HookInvocationError> {
        let mut failures = Vec::new();
        for hook in self.hooks(phase) {
            tracing::debug!(phase = %phase, hook = %hook.label(), "Invoking hook");
            if let Err(e) = hook.invoke(phase, config) {
                tracing::error!(phase = %phase, hook = %hook.label(), error = %e, "Hook failed, continuing shutdown");
                failures.push(e);
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording(log: &Arc<Mutex<Vec<String>>>, name: &'static str, fail: bool) -> Hook {
        let log = log.clone();
        Hook::new(name, move |_| {
            log.lock().unwrap().push(name.to_string());
            if fail {
                Err(format!("{} exploded", name).into())
            } else {
                Ok(())
            }
        })
    }

    #[test]
    fn test_strict_run_stops_at_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookSet::default();
        hooks.push(HookPhase::Init, recording(&log, "a", false));
        hooks.push(HookPhase::Init, recording(&log, "b", true));
        hooks.push(HookPhase::Init, recording(&log, "c", false));

        let err = hooks.run_strict(HookPhase::Init, &Configuration::empty()).unwrap_err();
        assert_eq!(err.hook, "b");
        assert_eq!(err.phase, HookPhase::Init);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_best_effort_runs_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookSet::default();
        hooks.push(HookPhase::Stop, recording(&log, "a", true));
        hooks.push(HookPhase::Stop, recording(&log, "b", false));
        hooks.push(HookPhase::Stop, recording(&log, "c", true));

        let failures = hooks.run_best_effort(HookPhase::Stop, &Configuration::empty());
        assert_eq!(failures.len(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }
}
