use std::sync::Arc;
use std::thread;

use super::*;
use crate::testing::{sample_registry, CallLog};

fn mount(log: &CallLog) -> FeatureFs {
    FeatureFs::mount(sample_registry(log), &Settings::default()).unwrap()
}

fn mount_with(log: &CallLog, settings: Settings) -> Result<FeatureFs> {
    FeatureFs::mount(sample_registry(log), &settings)
}

fn names(entries: &[DirEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

fn put(fs: &FeatureFs, path: &str, data: &str) -> Result<usize> {
    fs.write(path, data.as_bytes(), WriteMode::Replace)
}

// ==================== Mount Tests ====================

#[test]
fn test_mount_root_layout() {
    let log = CallLog::default();
    let fs = mount(&log);

    let root = fs.list("/").unwrap();
    assert_eq!(
        names(&root),
        vec![
            "set_features",
            "available_features",
            "activate",
            "configs",
            "tuned",
            "__hidden"
        ]
    );
    assert_eq!(names(&fs.list("/tuned").unwrap()), vec!["level", "mask"]);
    assert!(fs.list("/configs").unwrap().is_empty());
    assert_eq!(fs.config_names(), vec![ROOT_CONFIG.to_string()]);
    assert_eq!(fs.node_count(), 10);
}

#[test]
fn test_mount_marks_control_files() {
    let log = CallLog::default();
    let fs = mount(&log);

    let root = fs.list("/").unwrap();
    let available = root.iter().find(|e| e.name == "available_features").unwrap();
    assert_eq!(available.kind, NodeKind::File);
    assert!(!available.writable);
    let configs = root.iter().find(|e| e.name == "configs").unwrap();
    assert_eq!(configs.kind, NodeKind::Dir);
}

#[test]
fn test_available_features_hides_internal() {
    let log = CallLog::default();
    let fs = mount(&log);

    assert_eq!(
        fs.read("/available_features").unwrap(),
        "A\nB\nbad_enable\nbad_disable\ntuned\n"
    );
    assert_eq!(
        fs.read("/available_features").unwrap(),
        fs.available_features()
    );
}

#[test]
fn test_internal_param_dirs_hidden() {
    let log = CallLog::default();
    let mut settings = Settings::default();
    settings.namespace.internal_param_dirs = InternalParamDirs::Hide;
    let fs = mount_with(&log, settings).unwrap();

    assert!(!names(&fs.list("/").unwrap()).contains(&"__hidden"));
}

#[test]
fn test_internal_param_dirs_read_only() {
    let log = CallLog::default();
    let mut settings = Settings::default();
    settings.namespace.internal_param_dirs = InternalParamDirs::ReadOnly;
    let fs = mount_with(&log, settings).unwrap();

    let err = put(&fs, "/__hidden/depth", "3").unwrap_err();
    assert!(matches!(err, FeatfsError::PermissionDenied(_)));
    assert_eq!(fs.read("/__hidden/depth").unwrap(), "");
    assert!(put(&fs, "/tuned/level", "3").is_ok());
}

#[test]
fn test_mount_out_of_resources() {
    let log = CallLog::default();
    let mut settings = Settings::default();
    settings.namespace.max_nodes = 5;

    let err = mount_with(&log, settings).err().unwrap();
    assert!(matches!(err, FeatfsError::OutOfResources(_)));
}

// ==================== Boot Tests ====================

#[test]
fn test_boot_features_activate_root() {
    let log = CallLog::default();
    let mut settings = Settings::default();
    settings.boot.features = vec!["A".into(), "B".into()];
    let fs = mount_with(&log, settings).unwrap();

    assert_eq!(fs.read("/activate").unwrap(), "1\n");
    assert_eq!(fs.read("/set_features").unwrap(), "A\nB\n");
    assert_eq!(log.calls(), vec!["enable A", "enable B"]);
}

#[test]
fn test_boot_failure_tolerated() {
    let log = CallLog::default();
    let mut settings = Settings::default();
    settings.boot.features = vec!["A".into(), "bad_enable".into()];
    let fs = mount_with(&log, settings).unwrap();

    assert_eq!(fs.read("/activate").unwrap(), "0\n");
    assert!(fs.registry().is_enabled("A"));
}

#[test]
fn test_boot_failure_strict() {
    let log = CallLog::default();
    let mut settings = Settings::default();
    settings.boot.features = vec!["A".into(), "bad_enable".into()];
    settings.boot.strict = true;
    let registry = sample_registry(&log);

    let result = FeatureFs::mount(Arc::clone(&registry), &settings);

    assert!(matches!(result, Err(FeatfsError::FeatureFailed { .. })));
    assert!(!registry.is_enabled("A"));
}

// ==================== Config Lifecycle Tests ====================

#[test]
fn test_mkdir_creates_config_subtree() {
    let log = CallLog::default();
    let fs = mount(&log);

    fs.mkdir("/configs/net").unwrap();

    assert_eq!(names(&fs.list("/configs").unwrap()), vec!["net"]);
    assert_eq!(
        names(&fs.list("/configs/net").unwrap()),
        vec![
            "set_features",
            "available_features",
            "activate",
            "tuned",
            "__hidden"
        ]
    );
    assert_eq!(fs.read("/configs/net/activate").unwrap(), "0\n");
    assert_eq!(fs.read("/configs/net/set_features").unwrap(), "");
    assert_eq!(fs.config_count(), 2);
    assert_eq!(fs.node_count(), 19);
}

#[test]
fn test_mkdir_duplicate_fails() {
    let log = CallLog::default();
    let fs = mount(&log);

    fs.mkdir("/configs/net").unwrap();
    let err = fs.mkdir("/configs/net").unwrap_err();

    assert!(matches!(err, FeatfsError::AlreadyExists(_)));
    assert_eq!(fs.config_count(), 2);
}

#[test]
fn test_mkdir_root_name_taken() {
    let log = CallLog::default();
    let fs = mount(&log);

    let err = fs.mkdir("/configs/root").unwrap_err();
    assert!(matches!(err, FeatfsError::AlreadyExists(_)));
}

#[test]
fn test_mkdir_outside_configs_denied() {
    let log = CallLog::default();
    let fs = mount(&log);

    assert!(matches!(
        fs.mkdir("/tuned/extra"),
        Err(FeatfsError::PermissionDenied(_))
    ));
    assert!(matches!(
        fs.mkdir("/configs/net/nested").err(),
        Some(FeatfsError::NotFound(_))
    ));
    assert!(matches!(
        fs.mkdir("/activate/x"),
        Err(FeatfsError::NotADirectory(_))
    ));
}

#[test]
fn test_mkdir_out_of_resources_leaves_nothing() {
    let log = CallLog::default();
    let mut settings = Settings::default();
    settings.namespace.max_nodes = 15;
    let fs = mount_with(&log, settings).unwrap();

    let err = fs.mkdir("/configs/net").unwrap_err();

    assert!(matches!(err, FeatfsError::OutOfResources(_)));
    assert!(fs.list("/configs").unwrap().is_empty());
    assert_eq!(fs.config_count(), 1);
    assert_eq!(fs.node_count(), 10);
}

#[test]
fn test_rmdir_removes_config() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();

    fs.rmdir("/configs/net").unwrap();

    assert!(fs.list("/configs").unwrap().is_empty());
    assert_eq!(fs.config_count(), 1);
    assert_eq!(fs.node_count(), 10);
    assert!(matches!(
        fs.read("/configs/net/activate"),
        Err(FeatfsError::NotFound(_))
    ));
}

#[test]
fn test_rmdir_rejects_non_configs() {
    let log = CallLog::default();
    let fs = mount(&log);

    assert!(matches!(
        fs.rmdir("/configs"),
        Err(FeatfsError::PermissionDenied(_))
    ));
    assert!(matches!(
        fs.rmdir("/tuned"),
        Err(FeatfsError::PermissionDenied(_))
    ));
    assert!(matches!(
        fs.rmdir("/activate"),
        Err(FeatfsError::NotADirectory(_))
    ));
    assert!(matches!(
        fs.rmdir("/configs/absent"),
        Err(FeatfsError::NotFound(_))
    ));
}

#[test]
fn test_rmdir_active_config_deactivates() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();
    put(&fs, "/configs/net/set_features", "A,B").unwrap();
    put(&fs, "/configs/net/activate", "1").unwrap();
    log.clear();

    fs.rmdir("/configs/net").unwrap();

    assert_eq!(log.calls(), vec!["disable B", "disable A"]);
    assert!(!fs.registry().is_enabled("A"));
}

#[test]
fn test_rmdir_after_failed_disable_still_removes() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();
    put(&fs, "/configs/net/set_features", "bad_disable").unwrap();
    put(&fs, "/configs/net/activate", "1").unwrap();

    fs.rmdir("/configs/net").unwrap();

    assert_eq!(fs.config_count(), 1);
    assert!(!fs.registry().is_enabled("bad_disable"));
}

#[test]
fn test_recreate_config_starts_empty() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();
    put(&fs, "/configs/net/set_features", "A").unwrap();
    fs.rmdir("/configs/net").unwrap();

    fs.mkdir("/configs/net").unwrap();

    assert_eq!(fs.read("/configs/net/set_features").unwrap(), "");
}

#[test]
fn test_invalid_config_names() {
    let log = CallLog::default();
    let fs = mount(&log);

    assert!(matches!(
        fs.create_config(".."),
        Err(FeatfsError::InvalidInput(_))
    ));
    assert!(matches!(
        fs.create_config(""),
        Err(FeatfsError::InvalidInput(_))
    ));
    assert!(matches!(fs.mkdir("/"), Err(FeatfsError::AlreadyExists(_))));
}

// ==================== Parameter Write Tests ====================

#[test]
fn test_selection_write_and_read() {
    let log = CallLog::default();
    let fs = mount(&log);

    let n = put(&fs, "/set_features", "A, B,,\n").unwrap();

    assert_eq!(n, 7);
    assert_eq!(fs.read("/set_features").unwrap(), "A\nB\n");
}

#[test]
fn test_write_replaces_values() {
    let log = CallLog::default();
    let fs = mount(&log);

    put(&fs, "/set_features", "A,B").unwrap();
    put(&fs, "/set_features", "tuned").unwrap();

    assert_eq!(fs.read("/set_features").unwrap(), "tuned\n");
}

#[test]
fn test_write_append_keeps_values() {
    let log = CallLog::default();
    let fs = mount(&log);

    put(&fs, "/tuned/level", "1,2").unwrap();
    fs.write("/tuned/level", b"-3", WriteMode::Append).unwrap();

    assert_eq!(fs.read("/tuned/level").unwrap(), "1\n2\n-3\n");
}

#[test]
fn test_empty_write_clears_values() {
    let log = CallLog::default();
    let fs = mount(&log);
    put(&fs, "/tuned/level", "1,2").unwrap();

    assert_eq!(put(&fs, "/tuned/level", "").unwrap(), 0);

    assert_eq!(fs.read("/tuned/level").unwrap(), "");
}

#[test]
fn test_write_parse_error() {
    let log = CallLog::default();
    let fs = mount(&log);

    let err = put(&fs, "/tuned/level", "4,abc,5").unwrap_err();

    match err {
        FeatfsError::Parse { param, token, .. } => {
            assert_eq!(param, "level");
            assert_eq!(token, "abc");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs.read("/tuned/level").unwrap(), "4\n");
}

#[test]
fn test_unsigned_param_hex() {
    let log = CallLog::default();
    let fs = mount(&log);

    put(&fs, "/tuned/mask", "0x10,7").unwrap();

    assert_eq!(fs.read("/tuned/mask").unwrap(), "16\n7\n");
    assert!(put(&fs, "/tuned/mask", "-1").is_err());
}

#[test]
fn test_write_spans_chunks() {
    let log = CallLog::default();
    let mut settings = Settings::default();
    settings.namespace.chunk_size = 8;
    let fs = mount_with(&log, settings).unwrap();

    let data = "1,22,333,4444,55555,666666";
    let n = put(&fs, "/tuned/level", data).unwrap();

    assert_eq!(n, data.len());
    assert_eq!(
        fs.read("/tuned/level").unwrap(),
        "1\n22\n333\n4444\n55555\n666666\n"
    );
}

#[test]
fn test_write_token_exceeds_chunk() {
    let log = CallLog::default();
    let mut settings = Settings::default();
    settings.namespace.chunk_size = 4;
    let fs = mount_with(&log, settings).unwrap();

    let err = put(&fs, "/tuned/level", "1,123456").unwrap_err();

    assert!(matches!(err, FeatfsError::InvalidInput(_)));
}

#[test]
fn test_write_read_only_file() {
    let log = CallLog::default();
    let fs = mount(&log);

    assert!(matches!(
        put(&fs, "/available_features", "A"),
        Err(FeatfsError::PermissionDenied(_))
    ));
    assert!(matches!(
        put(&fs, "/tuned", "A"),
        Err(FeatfsError::IsADirectory(_))
    ));
    assert!(matches!(fs.read("/configs"), Err(FeatfsError::IsADirectory(_))));
    assert!(matches!(
        fs.list("/activate"),
        Err(FeatfsError::NotADirectory(_))
    ));
}

#[test]
fn test_write_active_config_busy() {
    let log = CallLog::default();
    let fs = mount(&log);
    put(&fs, "/set_features", "tuned").unwrap();
    put(&fs, "/tuned/level", "4").unwrap();
    put(&fs, "/activate", "1").unwrap();

    let err = put(&fs, "/tuned/level", "9").unwrap_err();
    assert!(matches!(err, FeatfsError::Busy(ref name) if name == ROOT_CONFIG));
    let err = put(&fs, "/set_features", "A").unwrap_err();
    assert!(matches!(err, FeatfsError::Busy(_)));

    assert_eq!(fs.read("/tuned/level").unwrap(), "4\n");
    assert_eq!(fs.read("/set_features").unwrap(), "tuned\n");
}

#[test]
fn test_configs_keep_separate_values() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();

    put(&fs, "/tuned/level", "1").unwrap();
    put(&fs, "/configs/net/tuned/level", "2").unwrap();

    assert_eq!(fs.read("/tuned/level").unwrap(), "1\n");
    assert_eq!(fs.read("/configs/net/tuned/level").unwrap(), "2\n");
}

// ==================== Activation Tests ====================

#[test]
fn test_activate_and_deactivate_through_files() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();
    put(&fs, "/configs/net/set_features", "B,A").unwrap();

    put(&fs, "/configs/net/activate", "1\n").unwrap();
    assert_eq!(fs.read("/configs/net/activate").unwrap(), "1\n");
    put(&fs, "/configs/net/activate", "0\n").unwrap();
    assert_eq!(fs.read("/configs/net/activate").unwrap(), "0\n");

    assert_eq!(
        log.calls(),
        vec!["enable B", "enable A", "disable A", "disable B"]
    );
}

#[test]
fn test_activate_accepts_bool_words() {
    let log = CallLog::default();
    let fs = mount(&log);
    put(&fs, "/set_features", "A").unwrap();

    put(&fs, "/activate", "Yes").unwrap();
    assert_eq!(fs.read("/activate").unwrap(), "1\n");
    put(&fs, "/activate", "off").unwrap();
    assert_eq!(fs.read("/activate").unwrap(), "0\n");
}

#[test]
fn test_activate_rejects_garbage() {
    let log = CallLog::default();
    let fs = mount(&log);

    assert!(matches!(
        put(&fs, "/activate", "maybe"),
        Err(FeatfsError::InvalidInput(_))
    ));
    assert!(matches!(
        fs.write("/activate", &[0xff, 0xfe], WriteMode::Replace),
        Err(FeatfsError::InvalidInput(_))
    ));
    assert_eq!(fs.read("/activate").unwrap(), "0\n");
}

#[test]
fn test_activate_twice_is_noop() {
    let log = CallLog::default();
    let fs = mount(&log);
    put(&fs, "/set_features", "A").unwrap();

    put(&fs, "/activate", "1").unwrap();
    put(&fs, "/activate", "1").unwrap();

    assert_eq!(log.calls(), vec!["enable A"]);
    assert_eq!(fs.registry().enable_count("A"), 1);
}

#[test]
fn test_activate_unknown_feature() {
    let log = CallLog::default();
    let fs = mount(&log);
    put(&fs, "/set_features", "A,nope").unwrap();

    let err = put(&fs, "/activate", "1").unwrap_err();

    assert!(matches!(err, FeatfsError::UnknownFeature(ref f) if f == "nope"));
    assert_eq!(fs.read("/activate").unwrap(), "0\n");
    assert!(fs.registry().is_enabled("A"));

    put(&fs, "/activate", "0").unwrap();
    assert!(!fs.registry().is_enabled("A"));
}

#[test]
fn test_failed_activation_allows_edit() {
    let log = CallLog::default();
    let fs = mount(&log);
    put(&fs, "/set_features", "bad_enable").unwrap();
    assert!(put(&fs, "/activate", "1").is_err());

    put(&fs, "/set_features", "A").unwrap();
    put(&fs, "/activate", "1").unwrap();

    assert!(fs.registry().is_enabled("A"));
}

#[test]
fn test_feature_sees_merged_values() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();
    put(&fs, "/set_features", "A").unwrap();
    put(&fs, "/tuned/level", "1").unwrap();
    put(&fs, "/activate", "1").unwrap();
    put(&fs, "/configs/net/set_features", "tuned").unwrap();
    put(&fs, "/configs/net/tuned/level", "2,1").unwrap();
    log.clear();

    put(&fs, "/configs/net/activate", "1").unwrap();

    assert_eq!(log.calls(), vec!["enable tuned level=[Signed(1),Signed(2)]"]);
}

#[test]
fn test_shared_feature_between_configs() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/a").unwrap();
    fs.mkdir("/configs/b").unwrap();
    put(&fs, "/configs/a/set_features", "A").unwrap();
    put(&fs, "/configs/b/set_features", "A").unwrap();
    put(&fs, "/configs/a/activate", "1").unwrap();
    put(&fs, "/configs/b/activate", "1").unwrap();

    put(&fs, "/configs/a/activate", "0").unwrap();
    assert!(fs.registry().is_enabled("A"));
    put(&fs, "/configs/b/activate", "0").unwrap();
    assert!(!fs.registry().is_enabled("A"));

    assert_eq!(log.calls(), vec!["enable A", "disable A"]);
}

#[test]
fn test_set_active_by_name() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();
    put(&fs, "/configs/net/set_features", "B").unwrap();

    fs.set_active("net", true).unwrap();
    assert_eq!(fs.read("/configs/net/activate").unwrap(), "1\n");
    fs.set_active("net", false).unwrap();

    assert!(matches!(
        fs.set_active("absent", true),
        Err(FeatfsError::NotFound(_))
    ));
}

// ==================== Stale Binding Tests ====================

#[test]
fn test_binding_outliving_config_is_not_found() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();
    let level = NsPath::parse("/configs/net/tuned/level").unwrap();
    let activate = NsPath::parse("/configs/net/activate").unwrap();
    let (level_binding, _, _) = fs.resolve(&level).unwrap();
    let (activate_binding, _, _) = fs.resolve(&activate).unwrap();

    fs.rmdir("/configs/net").unwrap();

    assert!(matches!(
        fs.write_bound(&level, level_binding, b"1", WriteMode::Replace),
        Err(FeatfsError::NotFound(_))
    ));
    assert!(matches!(
        fs.read_bound(&level, level_binding),
        Err(FeatfsError::NotFound(_))
    ));
    assert!(matches!(
        fs.write_bound(&activate, activate_binding, b"1", WriteMode::Replace),
        Err(FeatfsError::NotFound(_))
    ));
    assert!(matches!(
        fs.read_bound(&activate, activate_binding),
        Err(FeatfsError::NotFound(_))
    ));
}

#[test]
fn test_binding_never_aliases_recreated_config() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();
    let level = NsPath::parse("/configs/net/tuned/level").unwrap();
    let (old_binding, _, _) = fs.resolve(&level).unwrap();

    fs.rmdir("/configs/net").unwrap();
    fs.mkdir("/configs/net").unwrap();

    assert!(matches!(
        fs.write_bound(&level, old_binding, b"7", WriteMode::Replace),
        Err(FeatfsError::NotFound(_))
    ));
    assert_eq!(fs.read("/configs/net/tuned/level").unwrap(), "");
}

// ==================== Unmount Tests ====================

#[test]
fn test_unmount_deactivates_everything() {
    let log = CallLog::default();
    let registry = sample_registry(&log);
    let fs = FeatureFs::mount(Arc::clone(&registry), &Settings::default()).unwrap();
    fs.mkdir("/configs/net").unwrap();
    put(&fs, "/set_features", "A").unwrap();
    put(&fs, "/activate", "1").unwrap();
    put(&fs, "/configs/net/set_features", "B,bad_disable").unwrap();
    put(&fs, "/configs/net/activate", "1").unwrap();

    fs.unmount();

    assert_eq!(fs.config_count(), 0);
    assert_eq!(fs.node_count(), 1);
    assert!(!registry.is_enabled("A"));
    assert!(!registry.is_enabled("B"));
    assert!(!registry.is_enabled("bad_disable"));

    fs.unmount();
}

#[test]
fn test_drop_unmounts() {
    let log = CallLog::default();
    let registry = sample_registry(&log);
    {
        let fs = FeatureFs::mount(Arc::clone(&registry), &Settings::default()).unwrap();
        put(&fs, "/set_features", "A").unwrap();
        put(&fs, "/activate", "1").unwrap();
    }
    assert!(!registry.is_enabled("A"));
}

// ==================== Snapshot Tests ====================

#[test]
fn test_snapshot() {
    let log = CallLog::default();
    let fs = mount(&log);
    fs.mkdir("/configs/net").unwrap();
    put(&fs, "/configs/net/tuned/mask", "0x2").unwrap();
    put(&fs, "/set_features", "A").unwrap();
    put(&fs, "/activate", "1").unwrap();

    let snapshot = fs.snapshot();

    assert_eq!(snapshot.len(), 2);
    let root = snapshot.iter().find(|c| c.name == ROOT_CONFIG).unwrap();
    assert_eq!(root.path, "/");
    assert_eq!(root.state, ActivationState::Active);
    assert_eq!(root.held, vec!["A".to_string()]);
    let net = snapshot.iter().find(|c| c.name == "net").unwrap();
    assert_eq!(net.path, "/configs/net");
    let mask = net.entries.iter().find(|e| e.param == "tuned/mask").unwrap();
    assert_eq!(mask.values, vec!["2".to_string()]);
    assert!(net.entries.iter().any(|e| e.param == "set_features"));
}

// ==================== Concurrency Tests ====================

#[test]
fn test_concurrent_config_churn() {
    let log = CallLog::default();
    let fs = Arc::new(mount(&log));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for i in 0..20 {
                    let path = format!("/configs/c{}_{}", t, i);
                    fs.mkdir(&path).unwrap();
                    put(&fs, &format!("{}/set_features", path), "A").unwrap();
                    put(&fs, &format!("{}/activate", path), "1").unwrap();
                    let _ = fs.read("/configs/c0_0/activate");
                    if i % 2 == 0 {
                        fs.rmdir(&path).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(fs.config_count(), 1 + 8 * 10);
    assert_eq!(fs.list("/configs").unwrap().len(), 8 * 10);
    assert_eq!(fs.registry().enable_count("A"), 8 * 10);
}
