use std::sync::Arc;

use pathlock::guard::{Decision, Guard, GuardConfig, GuardRule, Role, TargetExtractor};
use pathlock::instance::{LockManager, MemoryStore};
use pathlock::registry::normalize;
use serde_json::json;

const INSTANCE: &str = "survival";

fn manager(locked: &[&str]) -> LockManager {
    let manager = LockManager::new(Arc::new(MemoryStore::new()));
    let paths: Vec<_> = locked.iter().map(|p| normalize(p)).collect();
    if !paths.is_empty() {
        manager.lock(INSTANCE, &paths).unwrap();
    }
    manager
}

fn check(guard: &Guard, locks: &LockManager, op: &str, payload: serde_json::Value) -> Decision {
    guard
        .check(locks, op, INSTANCE, &payload, Role::User)
        .expect("guard check")
}

#[test]
fn delete_of_locked_path_is_rejected_for_users_only() {
    let locks = manager(&["world/level.dat"]);
    let guard = Guard::default();
    let payload = json!({ "targets": ["world/level.dat"] });

    match check(&guard, &locks, "file/delete", payload.clone()) {
        Decision::Reject(v) => {
            assert_eq!(v.target, normalize("world/level.dat"));
            assert_eq!(v.to_string(), "world/level.dat is locked");
        }
        Decision::Proceed => panic!("locked delete must be rejected"),
    }

    let admin = guard
        .check(&locks, "file/delete", INSTANCE, &payload, Role::Admin)
        .unwrap();
    assert_eq!(admin, Decision::Proceed);
}

#[test]
fn batch_is_rejected_when_any_target_hits() {
    let locks = manager(&["b"]);
    let guard = Guard::default();
    let decision = check(
        &guard,
        &locks,
        "file/delete",
        json!({ "targets": ["a", "b/c", "d"] }),
    );
    match decision {
        Decision::Reject(v) => {
            assert_eq!(v.target, normalize("b/c"));
            assert_eq!(v.locked, normalize("b"));
        }
        Decision::Proceed => panic!("batch containing a locked target must be rejected"),
    }
}

#[test]
fn folder_operations_check_contents() {
    let locks = manager(&["plugins/core.jar"]);
    let guard = Guard::default();

    let decision = check(
        &guard,
        &locks,
        "file/move",
        json!({ "targets": [["plugins", "disabled-plugins"]] }),
    );
    match decision {
        Decision::Reject(v) => {
            assert_eq!(v.locked, normalize("plugins/core.jar"));
            assert_eq!(v.to_string(), "plugins contains locked path plugins/core.jar");
        }
        Decision::Proceed => panic!("moving a folder with a locked file must be rejected"),
    }

    // Only the source of a pair participates.
    let decision = check(
        &guard,
        &locks,
        "file/copy",
        json!({ "targets": [["readme.txt", "plugins/core.jar"]] }),
    );
    assert_eq!(decision, Decision::Proceed);
}

#[test]
fn list_checks_only_the_directory_itself() {
    let locks = manager(&["world/region", "secret"]);
    let guard = Guard::default();

    assert_eq!(
        check(&guard, &locks, "file/list", json!({ "target": "world" })),
        Decision::Proceed
    );
    assert!(matches!(
        check(&guard, &locks, "file/list", json!({ "target": "world/region/sub" })),
        Decision::Reject(_)
    ));
    assert!(matches!(
        check(&guard, &locks, "file/list", json!({ "target": "secret" })),
        Decision::Reject(_)
    ));
}

#[test]
fn malformed_or_root_payloads_fail_open() {
    let locks = manager(&["a"]);
    let guard = Guard::default();

    for (op, payload) in [
        ("file/edit", json!({})),
        ("file/edit", json!({ "target": "/" })),
        ("file/chmod", json!({ "target": 755 })),
        ("file/delete", json!({ "targets": "a" })),
        ("file/compress", json!({ "targets": [] })),
        ("file/move", json!({ "targets": [["a"]] })),
    ] {
        assert_eq!(check(&guard, &locks, op, payload), Decision::Proceed, "{op}");
    }
}

#[test]
fn ungoverned_operations_pass_through() {
    let locks = manager(&["a"]);
    let guard = Guard::default();
    for op in ["file/lock", "file/unlock", "file/check_lock", "file/upload"] {
        assert_eq!(
            check(&guard, &locks, op, json!({ "targets": ["a"], "target": "a" })),
            Decision::Proceed,
            "{op}"
        );
    }
}

#[test]
fn payload_admin_flag_is_ignored() {
    let locks = manager(&["a"]);
    let guard = Guard::default();
    let decision = check(
        &guard,
        &locks,
        "file/delete",
        json!({ "targets": ["a"], "isAdmin": true }),
    );
    assert!(matches!(decision, Decision::Reject(_)));
}

#[test]
fn rule_table_is_configurable() {
    let raw = r#"{
        "file/touch": { "extractors": [{ "kind": "single", "field": "target" }] },
        "file/delete": { "extractors": [{ "kind": "list", "field": "paths" }], "check_contents": true }
    }"#;
    let config = GuardConfig::from_json_str(raw).unwrap();
    assert_eq!(
        config.rule("file/touch"),
        Some(&GuardRule {
            extractors: vec![TargetExtractor::Single {
                field: "target".into()
            }],
            check_contents: false,
        })
    );
    assert!(config.rule("file/list").is_none());

    let locks = manager(&["a"]);
    let guard = Guard::new(config);
    assert!(matches!(
        check(&guard, &locks, "file/touch", json!({ "target": "a/new.txt" })),
        Decision::Reject(_)
    ));
    assert_eq!(
        check(&guard, &locks, "file/delete", json!({ "targets": ["a"] })),
        Decision::Proceed
    );
    assert!(matches!(
        check(&guard, &locks, "file/delete", json!({ "paths": ["a"] })),
        Decision::Reject(_)
    ));
}

#[test]
fn default_config_governs_the_fixed_operation_set() {
    let config = GuardConfig::default();
    let ops: Vec<&str> = config.operations().collect();
    assert_eq!(
        ops,
        vec![
            "file/chmod",
            "file/compress",
            "file/copy",
            "file/delete",
            "file/edit",
            "file/list",
            "file/mkdir",
            "file/move",
            "file/touch"
        ]
    );
    assert!(!config.rule("file/list").unwrap().check_contents);
    assert!(config.rule("file/chmod").unwrap().check_contents);
}

#[test]
fn rule_table_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guard.json");
    let table = serde_json::to_vec_pretty(&GuardConfig::default()).unwrap();
    std::fs::write(&path, table).unwrap();

    let loaded = GuardConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, GuardConfig::default());
    assert!(GuardConfig::from_json_file(dir.path().join("missing.json")).is_err());
}

#[test]
fn create_operations_cannot_clear_locks() {
    let locks = manager(&["secret", "vault/keys.pem", "backup.zip"]);
    let guard = Guard::default();

    for (op, payload) in [
        ("file/mkdir", json!({ "target": "secret" })),
        ("file/mkdir", json!({ "target": "vault" })),
        ("file/touch", json!({ "target": "secret/new.txt" })),
        ("file/touch", json!({ "target": "backup.zip" })),
    ] {
        assert!(
            matches!(check(&guard, &locks, op, payload.clone()), Decision::Reject(_)),
            "{op} {payload}"
        );
    }
    assert_eq!(
        check(&guard, &locks, "file/touch", json!({ "target": "notes.txt" })),
        Decision::Proceed
    );
}

#[test]
fn compress_checks_archive_and_inputs() {
    let locks = manager(&["backup.zip", "world/level.dat"]);
    let guard = Guard::default();

    match check(
        &guard,
        &locks,
        "file/compress",
        json!({ "source": "backup.zip", "targets": ["config"] }),
    ) {
        Decision::Reject(v) => assert_eq!(v.target, normalize("backup.zip")),
        Decision::Proceed => panic!("overwriting a locked archive must be rejected"),
    }
    assert!(matches!(
        check(
            &guard,
            &locks,
            "file/compress",
            json!({ "source": "out.zip", "targets": ["world"] }),
        ),
        Decision::Reject(_)
    ));
    assert_eq!(
        check(
            &guard,
            &locks,
            "file/compress",
            json!({ "source": "out.zip", "targets": ["config"] }),
        ),
        Decision::Proceed
    );
}
