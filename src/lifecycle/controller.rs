//! Lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! CREATED ─start()─▶ DESCRIPTOR_RESOLVED ─▶ CONFIG_LOADED ─▶ CONTAINER_STARTING ─▶ RUNNING
//!    │                     │                     │                    │               │
//!    └──────── any startup failure ──────────────┴────────────────────┴──▶ FAILED     │
//!                                                                                  stop()
//!                                                                                     ▼
//!                                                              STOPPED ◀── STOPPING
//! ```
//!
//! # Design Decisions
//! - State lives in a `watch` channel: transitions are compare-and-set under
//!   the channel lock, and waiters observe the terminal state without polling
//! - Exactly one `stop()` caller wins RUNNING → STOPPING; the others wait for STOPPED
//! - A `stop()` during startup is remembered and runs once RUNNING is reached

use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use crate::assembly::{Assembled, AssemblyError, ConfigAssembler};
use crate::composite::{Configuration, Layer};
use crate::config::BootstrapConfig;
use crate::descriptor::{AppDescriptor, AppRegistry, DescriptorError, DescriptorResolver};
use crate::lifecycle::container::{Container, ContainerError, NoContainer};
use crate::lifecycle::hooks::{HookInvocationError, HookPhase, HookSet};
use crate::remote::{BridgeHandle, RemoteStore};
use crate::sources::read_arguments;

/// Lifecycle states. STOPPED and FAILED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Created,
    DescriptorResolved,
    ConfigLoaded,
    ContainerStarting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Stopped | LifecycleState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Created => "CREATED",
            LifecycleState::DescriptorResolved => "DESCRIPTOR_RESOLVED",
            LifecycleState::ConfigLoaded => "CONFIG_LOADED",
            LifecycleState::ContainerStarting => "CONTAINER_STARTING",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Stopping => "STOPPING",
            LifecycleState::Stopped => "STOPPED",
            LifecycleState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Hook(#[from] HookInvocationError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("Application '{0}' requires a container but none was supplied")]
    ContainerRequired(String),

    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: LifecycleState,
    },
}

#[derive(Debug, Clone, Copy)]
struct Status {
    state: LifecycleState,
    /// `start()` has claimed the instance.
    started: bool,
    /// `stop()` arrived before RUNNING.
    stop_requested: bool,
}

#[derive(Default)]
struct Runtime {
    container: Option<Box<dyn Container>>,
    hooks: HookSet,
    bridge: Option<BridgeHandle>,
}

struct Inner {
    registry: AppRegistry,
    settings: BootstrapConfig,
    arguments: Layer,
    explicit_type: Option<String>,
    store: Option<Arc<dyn RemoteStore>>,
    status: watch::Sender<Status>,
    descriptor: OnceLock<AppDescriptor>,
    configuration: OnceLock<Configuration>,
    runtime: Mutex<Runtime>,
}

/// Builder for [`Lifecycle`].
pub struct LifecycleBuilder {
    registry: AppRegistry,
    settings: BootstrapConfig,
    arguments: Layer,
    explicit_type: Option<String>,
    store: Option<Arc<dyn RemoteStore>>,
    container: Option<Box<dyn Container>>,
}

impl LifecycleBuilder {
    pub fn settings(mut self, settings: BootstrapConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Process arguments, parsed into the highest-precedence layer.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.arguments = read_arguments(args);
        self
    }

    /// Introspect only this registered type instead of scanning.
    pub fn explicit_type(mut self, type_name: impl Into<String>) -> Self {
        self.explicit_type = Some(type_name.into());
        self
    }

    pub fn remote_store(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn container<C: Container + 'static>(mut self, container: C) -> Self {
        self.container = Some(Box::new(container));
        self
    }

    pub fn boxed_container(mut self, container: Option<Box<dyn Container>>) -> Self {
        self.container = container;
        self
    }

    pub fn build(self) -> Lifecycle {
        let (status, _) = watch::channel(Status {
            state: LifecycleState::Created,
            started: false,
            stop_requested: false,
        });
        Lifecycle {
            inner: Arc::new(Inner {
                registry: self.registry,
                settings: self.settings,
                arguments: self.arguments,
                explicit_type: self.explicit_type,
                store: self.store,
                status,
                descriptor: OnceLock::new(),
                configuration: OnceLock::new(),
                runtime: Mutex::new(Runtime {
                    container: self.container,
                    ..Runtime::default()
                }),
            }),
        }
    }
}

enum StopAction {
    Perform,
    Wait,
    Queued,
    Done,
}

/// Drives one application through startup and shutdown. Clones share the instance.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle").field("state", &self.state()).finish()
    }
}

impl Lifecycle {
    pub fn builder(registry: AppRegistry) -> LifecycleBuilder {
        LifecycleBuilder {
            registry,
            settings: BootstrapConfig::default(),
            arguments: Layer::default(),
            explicit_type: None,
            store: None,
            container: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.status.borrow().state
    }

    /// The resolved descriptor, once DESCRIPTOR_RESOLVED has been reached.
    pub fn descriptor(&self) -> Option<&AppDescriptor> {
        self.inner.descriptor.get()
    }

    /// The assembled configuration, once CONFIG_LOADED has been reached.
    pub fn configuration(&self) -> Option<Configuration> {
        self.inner.configuration.get().cloned()
    }

    /// Resolve once STOPPED or FAILED is reached, returning that state.
    pub async fn wait_for_terminal(&self) -> LifecycleState {
        let mut rx = self.inner.status.subscribe();
        let reached = match rx.wait_for(|s| s.state.is_terminal()).await {
            Ok(status) => Some(status.state),
            Err(_) => None,
        };
        reached.unwrap_or_else(|| self.state())
    }

    fn transition(&self, to: LifecycleState) {
        let mut from = to;
        self.inner.status.send_modify(|s| {
            from = s.state;
            s.state = to;
        });
        tracing::info!(from = %from, to = %to, "Lifecycle transition");
    }

    /// Run startup to RUNNING.
    ///
    /// Not reentrant: a second call fails with [`LifecycleError::InvalidState`].
    /// On failure the instance is FAILED and the error is returned.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        let claimed = self.inner.status.send_if_modified(|s| {
            if s.state == LifecycleState::Created && !s.started {
                s.started = true;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(LifecycleError::InvalidState {
                action: "start",
                state: self.state(),
            });
        }

        if let Err(e) = self.startup().await {
            tracing::error!(error = %e, "Startup failed");
            self.fail().await;
            return Err(e);
        }

        if self.inner.status.borrow().stop_requested {
            tracing::info!("Stop was requested during startup, stopping now");
            self.stop().await;
        }
        Ok(())
    }

    async fn startup(&self) -> Result<(), LifecycleError> {
        let inner = &self.inner;
        let resolver = DescriptorResolver::new(&inner.registry);
        let descriptor = resolver.resolve(inner.explicit_type.as_deref())?;
        let hooks = resolver.hooks_for(&descriptor)?;
        let descriptor = inner.descriptor.get_or_init(|| descriptor);
        self.transition(LifecycleState::DescriptorResolved);

        let mut runtime = inner.runtime.lock().await;
        if runtime.container.is_none() {
            if descriptor.requires_container {
                return Err(LifecycleError::ContainerRequired(descriptor.name.clone()));
            }
            runtime.container = Some(Box::new(NoContainer));
        }

        let Assembled { configuration, bridge } = ConfigAssembler::new(&inner.settings, inner.arguments.clone())
            .with_store(inner.store.clone())
            .assemble(descriptor)
            .await?;
        runtime.bridge = bridge;
        runtime.hooks = hooks;
        let configuration = inner.configuration.get_or_init(|| configuration).clone();
        self.transition(LifecycleState::ConfigLoaded);

        let ran = runtime.hooks.run_strict(HookPhase::Init, &configuration)?;
        tracing::debug!(hooks = ran, "Init hooks completed");
        self.transition(LifecycleState::ContainerStarting);

        let Runtime { container, hooks, .. } = &mut *runtime;
        let Some(container) = container.as_mut() else {
            return Err(LifecycleError::ContainerRequired(descriptor.name.clone()));
        };
        container.start(descriptor, &configuration).await?;

        if let Err(e) = hooks.run_strict(HookPhase::Start, &configuration) {
            if let Err(stop_err) = container.stop().await {
                tracing::error!(error = %stop_err, "Container stop after failed start hook also failed");
            }
            return Err(e.into());
        }

        self.transition(LifecycleState::Running);
        tracing::info!(app = %descriptor.name, "Application running");
        Ok(())
    }

    async fn fail(&self) {
        let bridge = self.inner.runtime.lock().await.bridge.take();
        if let Some(bridge) = bridge {
            bridge.stop().await;
        }
        self.transition(LifecycleState::Failed);
    }

    /// Stop the application.
    ///
    /// Only the first caller from RUNNING performs shutdown; concurrent
    /// callers wait for STOPPED. A call during startup waits for startup to
    /// finish and the queued stop to complete. A call before `start()` is
    /// queued and returns at once. Returns the state observed at the end.
    pub async fn stop(&self) -> LifecycleState {
        let mut action = StopAction::Wait;
        self.inner.status.send_if_modified(|s| match s.state {
            LifecycleState::Running => {
                s.state = LifecycleState::Stopping;
                action = StopAction::Perform;
                true
            }
            LifecycleState::Stopping => false,
            LifecycleState::Stopped | LifecycleState::Failed => {
                action = StopAction::Done;
                false
            }
            _ => {
                s.stop_requested = true;
                if !s.started {
                    action = StopAction::Queued;
                }
                false
            }
        });

        match action {
            StopAction::Perform => {
                tracing::info!(from = %LifecycleState::Running, to = %LifecycleState::Stopping, "Lifecycle transition");
                self.shutdown().await;
                LifecycleState::Stopped
            }
            StopAction::Wait => self.wait_for_terminal().await,
            StopAction::Queued => {
                tracing::info!("Stop requested before start, queued");
                LifecycleState::Created
            }
            StopAction::Done => self.state(),
        }
    }

    async fn shutdown(&self) {
        let configuration = self.configuration().unwrap_or_else(Configuration::empty);
        let mut runtime = self.inner.runtime.lock().await;

        if let Some(container) = runtime.container.as_mut() {
            if let Err(e) = container.stop().await {
                tracing::error!(error = %e, "Container stop failed, continuing shutdown");
            }
        }

        let hooks = std::mem::take(&mut runtime.hooks);
        let stop_failures = hooks.run_best_effort(HookPhase::Stop, &configuration);
        let destroy_failures = hooks.run_best_effort(HookPhase::Destroy, &configuration);

        if let Some(bridge) = runtime.bridge.take() {
            bridge.stop().await;
        }
        drop(runtime);

        self.transition(LifecycleState::Stopped);
        tracing::info!(
            stop_hook_failures = stop_failures.len(),
            destroy_hook_failures = destroy_failures.len(),
            "Application stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AppMeta, EntryType, Marker};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry(meta: AppMeta, configure: impl FnOnce(EntryType) -> EntryType) -> AppRegistry {
        let mut registry = AppRegistry::new();
        registry.register(configure(EntryType::new("app::Main").marker(Marker::application(meta))));
        registry
    }

    fn settings() -> BootstrapConfig {
        let mut settings = BootstrapConfig::default();
        settings.local.resource_root = std::env::temp_dir().join("app-bootstrap-lifecycle-tests");
        settings
    }

    #[tokio::test]
    async fn test_descriptor_failure_runs_no_hooks() {
        let lifecycle = Lifecycle::builder(AppRegistry::new()).settings(settings()).build();
        let err = lifecycle.start().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Descriptor(DescriptorError::NoEntryPoint { .. })));
        assert_eq!(lifecycle.state(), LifecycleState::Failed);
        assert!(lifecycle.configuration().is_none());
    }

    #[tokio::test]
    async fn test_start_then_stop_runs_every_phase() {
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = |name: &'static str| {
            let calls = calls.clone();
            move |_: &Configuration| {
                calls.lock().unwrap().push(name);
                Ok(())
            }
        };
        let registry = registry(AppMeta::new("orders"), |t| {
            t.on_init(log("init"))
                .on_start(log("start"))
                .on_stop(log("stop"))
                .on_destroy(log("destroy"))
        });

        let lifecycle = Lifecycle::builder(registry).settings(settings()).build();
        lifecycle.start().await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Running);
        assert_eq!(lifecycle.descriptor().map(|d| d.name.as_str()), Some("orders"));

        assert_eq!(lifecycle.stop().await, LifecycleState::Stopped);
        assert_eq!(*calls.lock().unwrap(), vec!["init", "start", "stop", "destroy"]);
        assert_eq!(lifecycle.stop().await, LifecycleState::Stopped);
        assert_eq!(calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_init_failure_skips_container() {
        struct Recording(Arc<AtomicUsize>);

        #[async_trait::async_trait]
        impl Container for Recording {
            async fn start(&mut self, _: &AppDescriptor, _: &Configuration) -> Result<(), ContainerError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            async fn stop(&mut self) -> Result<(), ContainerError> {
                Ok(())
            }
        }

        let started = Arc::new(AtomicUsize::new(0));
        let registry = registry(AppMeta::new("orders"), |t| t.on_init(|_| Err("bad init".into())));
        let lifecycle = Lifecycle::builder(registry)
            .settings(settings())
            .container(Recording(started.clone()))
            .build();

        let err = lifecycle.start().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Hook(_)));
        assert_eq!(lifecycle.state(), LifecycleState::Failed);
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_required_container_fails() {
        let registry = registry(AppMeta::new("orders").requires_container(true), |t| t);
        let lifecycle = Lifecycle::builder(registry).settings(settings()).build();
        assert!(matches!(
            lifecycle.start().await,
            Err(LifecycleError::ContainerRequired(_))
        ));
        assert_eq!(lifecycle.wait_for_terminal().await, LifecycleState::Failed);
    }

    #[tokio::test]
    async fn test_start_is_not_reentrant() {
        let lifecycle = Lifecycle::builder(registry(AppMeta::new("orders"), |t| t))
            .settings(settings())
            .build();
        lifecycle.start().await.unwrap();
        assert!(matches!(
            lifecycle.start().await,
            Err(LifecycleError::InvalidState {
                state: LifecycleState::Running,
                ..
            })
        ));
        lifecycle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_before_start_is_queued() {
        let stops = Arc::new(AtomicUsize::new(0));
        let counter = stops.clone();
        let registry = registry(AppMeta::new("orders"), move |t| {
            t.on_stop(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });
        let lifecycle = Lifecycle::builder(registry).settings(settings()).build();

        assert_eq!(lifecycle.stop().await, LifecycleState::Created);
        lifecycle.start().await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
