//! Extraction tests: file replacement, remote merge semantics, and a
//! remote extraction read back through assembly.

use std::sync::Arc;

use app_bootstrap::assembly::ConfigAssembler;
use app_bootstrap::composite::{Configuration, Layer, LayerKind};
use app_bootstrap::config::BootstrapConfig;
use app_bootstrap::extract::{ConfigExtractor, ExtractionError, ExtractionTarget};
use app_bootstrap::remote::{FsStore, MemoryStore, RemoteStore};
use app_bootstrap::sources::read_properties;

mod common;
use common::{descriptor, settings_in};

fn config_of(pairs: &[(&str, &str)]) -> Configuration {
    let layer = Layer::from_entries(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Configuration::from_layers([(LayerKind::Arguments, layer)])
}

#[tokio::test]
async fn test_file_extraction_replaces_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let target_path = dir.path().join("orders.properties");
    let target = ExtractionTarget::file(target_path.to_string_lossy());
    let settings = BootstrapConfig::default();
    let extractor = ConfigExtractor::new(&settings, None);
    let app = descriptor("orders");

    let first = extractor
        .extract(&app, &config_of(&[("a", "1"), ("b", "2")]), &target)
        .await
        .unwrap();
    assert_eq!(first.written, 2);

    extractor
        .extract(&app, &config_of(&[("c", "3")]), &target)
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&target_path).unwrap(), "c=3\n");

    let reread = read_properties(&target_path).unwrap().unwrap();
    assert_eq!(reread.get("c"), Some("3"));
    assert!(!reread.contains("a"));
}

#[tokio::test]
async fn test_file_extraction_reads_back_the_same_entries() {
    let dir = tempfile::tempdir().unwrap();
    let target_path = dir.path().join("orders.properties");
    let entries = [
        ("motd", "hello\ninjected=1"),
        ("odd=key:name", "v"),
        ("#not.a.comment", "x"),
        ("padded", "  both ends\t "),
        ("windows.path", "C:\\data\\orders"),
        ("empty", ""),
    ];
    let config = config_of(&entries);

    let settings = BootstrapConfig::default();
    ConfigExtractor::new(&settings, None)
        .extract(&descriptor("orders"), &config, &ExtractionTarget::file(target_path.to_string_lossy()))
        .await
        .unwrap();

    let reread = read_properties(&target_path).unwrap().unwrap();
    assert_eq!(reread.len(), entries.len());
    assert!(!reread.contains("injected"));
    for (key, value) in entries {
        assert_eq!(reread.get(key), Some(value), "key {:?}", key);
    }
}

#[tokio::test]
async fn test_file_extraction_into_missing_directory_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let target_path = dir.path().join("absent").join("orders.properties");
    let settings = BootstrapConfig::default();

    let result = ConfigExtractor::new(&settings, None)
        .extract(
            &descriptor("orders"),
            &config_of(&[("a", "1")]),
            &ExtractionTarget::file(target_path.to_string_lossy()),
        )
        .await;
    assert!(matches!(result, Err(ExtractionError::Write { .. })));
    assert!(!target_path.exists());
}

#[tokio::test]
async fn test_remote_extraction_respects_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    store.set("/dev/orders/1.0/config/a", "old").await.unwrap();

    let settings = BootstrapConfig::default();
    let shared: Arc<dyn RemoteStore> = Arc::new(store.clone());
    let extractor = ConfigExtractor::new(&settings, Some(shared));
    let app = descriptor("orders");
    let config = config_of(&[("a", "new"), ("b", "2")]);

    let kept = extractor
        .extract(&app, &config, &ExtractionTarget::remote(false))
        .await
        .unwrap();
    assert_eq!((kept.written, kept.skipped), (1, 1));
    let tree = store.read_children("/dev/orders/1.0/config").await.unwrap().unwrap();
    assert_eq!(tree, vec![("a".to_string(), "old".to_string()), ("b".to_string(), "2".to_string())]);

    let replaced = extractor
        .extract(&app, &config, &ExtractionTarget::remote(true))
        .await
        .unwrap();
    assert!(replaced.is_success());
    assert_eq!(replaced.written, 2);
    let tree = store.read_children("/dev/orders/1.0/config").await.unwrap().unwrap();
    assert_eq!(tree[0], ("a".to_string(), "new".to_string()));
}

#[tokio::test]
async fn test_remote_extraction_without_store_is_rejected() {
    let settings = BootstrapConfig::default();
    let result = ConfigExtractor::new(&settings, None)
        .extract(&descriptor("orders"), &config_of(&[("a", "1")]), &ExtractionTarget::remote(true))
        .await;
    assert!(matches!(result, Err(ExtractionError::NoRemoteStore)));
}

#[tokio::test]
async fn test_extracted_tree_feeds_the_next_assembly() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("orders.properties"), "db.host=filehost\n").unwrap();
    let settings = settings_in(dir.path());
    let app = descriptor("orders");

    // Assemble from local files only, then publish to the remote store.
    let local_only = ConfigAssembler::new(&settings, Layer::default())
        .assemble(&app)
        .await
        .unwrap()
        .shutdown()
        .await;

    let memory = MemoryStore::new();
    let store: Arc<dyn RemoteStore> = Arc::new(memory.clone());
    let report = ConfigExtractor::new(&settings, Some(store.clone()))
        .extract(&app, &local_only, &ExtractionTarget::remote(false))
        .await
        .unwrap();
    assert_eq!(report.written, local_only.snapshot().len());
    assert_eq!(memory.value("/dev/orders/1.0/config/db.host").as_deref(), Some("filehost"));

    // The next start reads the published value from the remote layer.
    let assembled = ConfigAssembler::new(&settings, Layer::default())
        .with_store(Some(store))
        .assemble(&app)
        .await
        .unwrap();
    assert_eq!(assembled.configuration.source_of("db.host"), Some(LayerKind::Remote));
    assembled.shutdown().await;
}
