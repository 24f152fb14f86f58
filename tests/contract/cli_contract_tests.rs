//! CLI contract tests for pathlock argument validation and output.

use pathlock::cli::{check, show, OutputFormat};
use pathlock::instance::{ConfigKind, ConfigStore, JsonFileStore};
use pathlock::registry::{normalize, LockQueryResult};
use pathlock::Error;
use tempfile::tempdir;

fn expect_error(args: &[&str], expected: Error) {
    let err = pathlock::run(args.iter().copied()).expect_err("command should fail");
    let actual = err
        .downcast_ref::<Error>()
        .unwrap_or_else(|| panic!("unexpected error type: {err:?}"));
    match expected {
        Error::Cli(ref expected_msg) => {
            assert!(matches!(actual, Error::Cli(msg) if msg == expected_msg));
        }
        _ => {
            assert_eq!(
                std::mem::discriminant(actual),
                std::mem::discriminant(&expected)
            );
        }
    }
}

#[test]
fn lock_requires_store_instance_and_paths() {
    expect_error(
        &["pathlock", "lock", "--instance", "main", "world"],
        Error::Cli("state_dir is required".into()),
    );

    let state = tempdir().unwrap();
    let dir = state.path().to_str().unwrap();
    expect_error(
        &["pathlock", "lock", "--state-dir", dir, "world"],
        Error::Cli("instance is required".into()),
    );
    expect_error(
        &["pathlock", "unlock", "--state-dir", dir, "--instance", "main"],
        Error::Cli("at least one path is required".into()),
    );
    expect_error(
        &["pathlock", "check", "--state-dir", dir, "--instance", "../etc", "x"],
        Error::InvalidInstanceId(String::new()),
    );
}

#[test]
fn root_cannot_be_locked_from_cli() {
    let state = tempdir().unwrap();
    let dir = state.path().to_str().unwrap();
    expect_error(
        &["pathlock", "lock", "--state-dir", dir, "--instance", "main", "/"],
        Error::InvalidPath(String::new()),
    );
}

#[test]
fn lock_then_unlock_persists_to_state_dir() {
    let state = tempdir().unwrap();
    let dir = state.path().to_str().unwrap();

    pathlock::run([
        "pathlock", "lock", "--state-dir", dir, "--instance", "main", "world\\region", "eula.txt",
    ])
    .expect("lock succeeds");

    let store = JsonFileStore::new(state.path()).unwrap();
    let config = store
        .load(ConfigKind::Instance, "main")
        .unwrap()
        .expect("record written");
    assert_eq!(
        config.locked_paths,
        vec![normalize("eula.txt"), normalize("world/region")]
    );
    assert_eq!(config.locked_ancestors, vec![normalize("world")]);

    pathlock::run([
        "pathlock", "unlock", "--state-dir", dir, "--instance", "main", "eula.txt",
    ])
    .expect("unlock succeeds");
    let config = store.load(ConfigKind::Instance, "main").unwrap().unwrap();
    assert_eq!(config.locked_paths, vec![normalize("world/region")]);

    pathlock::run([
        "pathlock", "check", "--state-dir", dir, "--instance", "main", "--contents", "world",
    ])
    .expect("check succeeds");
    pathlock::run([
        "pathlock", "show", "--state-dir", dir, "--instance", "main", "--format", "json",
    ])
    .expect("show succeeds");
}

#[test]
fn check_render_formats() {
    let clean = LockQueryResult {
        has_locked: false,
        locked_paths: vec![],
    };
    assert_eq!(
        check::render(&clean, OutputFormat::Text).unwrap(),
        "no locked paths"
    );

    let hit = LockQueryResult {
        has_locked: true,
        locked_paths: vec![normalize("a"), normalize("b/c")],
    };
    assert_eq!(
        check::render(&hit, OutputFormat::Text).unwrap(),
        "locked\ta\nlocked\tb/c"
    );
    let json: serde_json::Value =
        serde_json::from_str(&check::render(&hit, OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(json["hasLocked"], true);
    assert_eq!(json["lockedPaths"], serde_json::json!(["a", "b/c"]));
}

#[test]
fn show_render_lists_registry_and_index() {
    let mut config = pathlock::InstanceConfig::new("main");
    let state = pathlock::LockState::from_paths([normalize("a/b/c"), normalize("d")]);
    config.record_locks(&state);

    let text = show::render(&config, OutputFormat::Text).unwrap();
    assert_eq!(
        text,
        "instance=main\nlocked=a/b/c\nlocked=d\nancestor=a\nancestor=a/b\n"
    );

    let json: serde_json::Value =
        serde_json::from_str(&show::render(&config, OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(json["instanceId"], "main");
    assert_eq!(json["lockedAncestors"], serde_json::json!(["a", "a/b"]));
}

#[test]
fn clap_command_exposes_subcommands() {
    let command = pathlock::cli::clap_command();
    let names: Vec<&str> = command.get_subcommands().map(|c| c.get_name()).collect();
    for expected in ["lock", "unlock", "check", "show"] {
        assert!(names.contains(&expected), "missing subcommand {expected}");
    }
    command.debug_assert();
}

#[test]
fn logging_init_is_repeatable() {
    use pathlock::logging::{init_logging, LogFormat};
    init_logging(LogFormat::Json).expect("first init");
    init_logging(LogFormat::Human).expect("second init is a no-op");
}
