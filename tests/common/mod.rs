//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use app_bootstrap::composite::{ChangeEvent, Configuration};
use app_bootstrap::config::BootstrapConfig;
use app_bootstrap::descriptor::{AppDescriptor, AppMeta, AppRegistry, EntryType, Marker};

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Run `fut` with a deadline, panicking with `what` on timeout.
pub async fn within<T>(what: &str, timeout: Duration, fut: impl Future<Output = T>) -> T {
    match tokio::time::timeout(timeout, fut).await {
        Ok(value) => value,
        Err(_) => panic!("timed out waiting for {}", what),
    }
}

/// Settings resolving `classpath:` resources inside `dir`, with fast reconnects.
pub fn settings_in(dir: &Path) -> BootstrapConfig {
    let mut settings = BootstrapConfig::default();
    settings.local.resource_root = dir.to_path_buf();
    settings.remote.reconnect_base_ms = 10;
    settings.remote.reconnect_max_ms = 100;
    settings
}

pub fn descriptor(name: &str) -> AppDescriptor {
    AppDescriptor {
        type_name: "app::Main".into(),
        name: name.into(),
        properties_location: None,
        requires_container: false,
        container_entry_points: Vec::new(),
        remote_required: false,
        version: None,
    }
}

/// Collects every event delivered to a subscription.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl EventLog {
    pub fn attach(config: &Configuration) -> Self {
        let log = Self::default();
        let sink = log.events.clone();
        config.subscribe(|_| true, move |event| sink.lock().unwrap().push(event.clone()));
        log
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.key).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// Counts hook invocations per phase.
#[derive(Clone, Default)]
pub struct HookCounters {
    pub init: Arc<AtomicUsize>,
    pub start: Arc<AtomicUsize>,
    pub stop: Arc<AtomicUsize>,
    pub destroy: Arc<AtomicUsize>,
}

impl HookCounters {
    pub fn get(counter: &Arc<AtomicUsize>) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

fn counting(counter: &Arc<AtomicUsize>) -> impl Fn(&Configuration) -> app_bootstrap::lifecycle::HookResult {
    let counter = counter.clone();
    move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A registry holding one application type whose hooks bump `counters`.
pub fn counting_registry(meta: AppMeta, counters: &HookCounters) -> AppRegistry {
    let mut registry = AppRegistry::new();
    registry.register(
        EntryType::new("app::Main")
            .marker(Marker::application(meta))
            .on_init(counting(&counters.init))
            .on_start(counting(&counters.start))
            .on_stop(counting(&counters.stop))
            .on_destroy(counting(&counters.destroy)),
    );
    registry
}
