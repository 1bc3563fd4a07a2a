mod common;

use common::{FakeBackend, Harness, STATE_FILE};
use declarative::{
    CancelToken, Connector, Context, ExternalClient, Managed, ReconcileOutcome, reconcile,
};
use provider::workspace::{BACKEND_FILE, PRIMARY_FILE, VARIABLES_FILE};
use provider::{BackendSpec, DesiredSpec, ErrorKind, ObservePolicy, ProviderOptions};
use std::fs;
use std::thread;
use std::time::Duration;
use tfkit::Phase;

const CONFIG: &str = "resource \"null_resource\" \"x\" {}\n";

fn spec() -> DesiredSpec {
    DesiredSpec::new(CONFIG)
}

#[test]
fn test_create_twice_applies_once() {
    let h = Harness::new();
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();

    client.create(&ctx, &spec()).unwrap();
    client.create(&ctx, &spec()).unwrap();

    assert_eq!(h.backend.count("plan"), 2);
    assert_eq!(h.backend.count("apply"), 1);
}

#[test]
fn test_update_follows_spec_changes() {
    let h = Harness::new();
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();

    client.create(&ctx, &spec()).unwrap();
    client
        .update(&ctx, &spec().with_variable("size", "large"))
        .unwrap();
    client
        .update(&ctx, &spec().with_variable("size", "large"))
        .unwrap();

    assert_eq!(h.backend.count("apply"), 2);
    assert_eq!(
        fs::read_to_string(client.workspace().file(VARIABLES_FILE)).unwrap(),
        "size = \"large\"\n"
    );
}

#[test]
fn test_observe_existence() {
    let h = Harness::new();
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();

    let before = client.observe(&ctx, &spec()).unwrap();
    assert!(!before.exists);

    client.create(&ctx, &spec()).unwrap();

    let after = client.observe(&ctx, &spec()).unwrap();
    assert!(after.exists);
    assert!(after.up_to_date);
}

#[test]
fn test_every_session_starts_with_init() {
    let h = Harness::new();
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();

    client.observe(&ctx, &spec()).unwrap();
    client.create(&ctx, &spec()).unwrap();

    assert_eq!(
        h.backend.calls_in(client.workspace().path()),
        vec![
            "init",
            "workspace",
            "show",
            "init",
            "workspace",
            "plan",
            "apply",
            "output"
        ]
    );
}

#[test]
fn test_delete_is_terminal() {
    let h = Harness::new();
    let ctx = Context::background();

    let client = h.connector.connect(&ctx, "db").unwrap();
    client.create(&ctx, &spec()).unwrap();
    let dir = client.workspace().path().to_path_buf();

    client.delete(&ctx, &spec()).unwrap();
    assert!(!dir.exists());

    let again = h.connector.connect(&ctx, "db").unwrap();
    assert_eq!(again.workspace().path(), dir);
    assert!(!again.observe(&ctx, &spec()).unwrap().exists);
}

#[test]
fn test_workspaces_are_isolated_under_concurrency() {
    let h = Harness::new();
    let ctx = Context::background();

    let a = spec().with_variable("owner", "a");
    let b = DesiredSpec::new("locals { b = 1 }\n")
        .with_backend(BackendSpec::new("local").with_setting("path", "b.tfstate"));

    let (ws_a, ws_b) = thread::scope(|s| {
        let run = |name: &'static str, spec: &DesiredSpec| {
            let client = h.connector.connect(&ctx, name).unwrap();
            for _ in 0..5 {
                client.create(&ctx, spec).unwrap();
                client.observe(&ctx, spec).unwrap();
            }
            client.workspace().clone()
        };
        let ta = s.spawn(move || run("a", &a));
        let tb = s.spawn(move || run("b", &b));
        (ta.join().unwrap(), tb.join().unwrap())
    });

    assert_ne!(ws_a.path(), ws_b.path());
    assert_eq!(fs::read_to_string(ws_a.file(PRIMARY_FILE)).unwrap(), CONFIG);
    assert!(ws_a.file(VARIABLES_FILE).exists());
    assert!(!ws_a.file(BACKEND_FILE).exists());

    assert_eq!(
        fs::read_to_string(ws_b.file(PRIMARY_FILE)).unwrap(),
        "locals { b = 1 }\n"
    );
    assert!(ws_b.file(BACKEND_FILE).exists());
    assert!(!ws_b.file(VARIABLES_FILE).exists());

    assert_eq!(h.backend.count("apply"), 2);
}

#[test]
fn test_create_with_backend_and_variables() {
    let h = Harness::new();
    let ctx = Context::background();
    let spec = spec()
        .with_variable("region", "us-east-1")
        .with_backend(BackendSpec::new("s3").with_setting("bucket", "x"));

    let client = h.connector.connect(&ctx, "network").unwrap();
    let details = client.create(&ctx, &spec).unwrap();
    let ws = client.workspace();

    assert_eq!(fs::read_to_string(ws.file(PRIMARY_FILE)).unwrap(), CONFIG);
    let backend = fs::read_to_string(ws.file(BACKEND_FILE)).unwrap();
    assert!(backend.contains("backend \"s3\" {"));
    assert!(backend.contains("bucket = \"x\""));
    assert_eq!(
        fs::read_to_string(ws.file(VARIABLES_FILE)).unwrap(),
        "region = \"us-east-1\"\n"
    );

    assert_eq!(
        h.backend.calls_in(ws.path()),
        vec!["init", "workspace", "plan", "apply", "output"]
    );
    assert!(details.is_empty());
}

#[test]
fn test_delete_never_created() {
    let h = Harness::new();
    let ctx = Context::background();

    let client = h.connector.connect(&ctx, "ghost").unwrap();
    let dir = client.workspace().path().to_path_buf();
    assert!(dir.is_dir());

    client.delete(&ctx, &DesiredSpec::new("")).unwrap();

    assert_eq!(
        h.backend.calls_in(&dir),
        vec!["init", "workspace", "destroy"]
    );
    assert!(!dir.exists());
}

#[test]
fn test_observe_show_failure_means_absent() {
    let h = Harness::with(
        FakeBackend {
            fail_show: true,
            ..Default::default()
        },
        ProviderOptions::default(),
    );
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();

    let observation = client.observe(&ctx, &spec()).unwrap();

    assert!(!observation.exists);
    assert!(!observation.up_to_date);
}

#[test]
fn test_plan_policy_detects_drift() {
    let ctx = Context::background();
    let changed = spec().with_variable("size", "large");

    let existence = Harness::new();
    let client = existence.connector.connect(&ctx, "db").unwrap();
    client.create(&ctx, &spec()).unwrap();
    assert!(client.observe(&ctx, &changed).unwrap().up_to_date);

    let plan = Harness::with(
        FakeBackend::default(),
        ProviderOptions {
            observe_policy: ObservePolicy::Plan,
        },
    );
    let client = plan.connector.connect(&ctx, "db").unwrap();
    client.create(&ctx, &spec()).unwrap();

    let drifted = client.observe(&ctx, &changed).unwrap();
    assert!(drifted.exists);
    assert!(!drifted.up_to_date);
    assert!(client.observe(&ctx, &spec()).unwrap().up_to_date);
}

#[test]
fn test_outputs_become_connection_details() {
    let h = Harness::with(
        FakeBackend::with_outputs(&[("endpoint", "db.internal:5432")]),
        ProviderOptions::default(),
    );
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();

    let created = client.create(&ctx, &spec()).unwrap();
    assert_eq!(created["endpoint"], b"db.internal:5432");

    let observed = client.observe(&ctx, &spec()).unwrap();
    assert_eq!(observed.connection_details["endpoint"], b"db.internal:5432");
}

#[test]
fn test_engine_workspace_selection() {
    let h = Harness::new();
    let ctx = Context::background();

    let client = h.connector.connect(&ctx, "named").unwrap();
    client
        .create(&ctx, &spec().with_workspace("staging"))
        .unwrap();
    assert_eq!(
        h.backend.calls_in(client.workspace().path()),
        vec!["init", "workspace", "plan", "apply", "output"]
    );
    assert_eq!(h.backend.selected(), vec!["staging"]);

    // Dropping the name moves the directory back to the default workspace
    client.update(&ctx, &spec()).unwrap();
    client.delete(&ctx, &spec().with_workspace("  ")).unwrap();
    assert_eq!(h.backend.selected(), vec!["staging", "default", "default"]);
}

#[test]
fn test_apply_failure_fails_create() {
    let h = Harness::with(
        FakeBackend {
            fail_apply: true,
            ..Default::default()
        },
        ProviderOptions::default(),
    );
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();

    let err = client.create(&ctx, &spec()).unwrap_err();

    assert_eq!(err.operation(), Some("create"));
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.phase(), Some(Phase::Apply));
    assert!(!err.is_transient());
    // No outputs read, no state recorded
    assert_eq!(h.backend.count("output"), 0);
    assert!(!client.workspace().file(STATE_FILE).exists());
}

#[test]
fn test_plan_failure_skips_apply() {
    let h = Harness::with(
        FakeBackend {
            fail_plan: true,
            ..Default::default()
        },
        ProviderOptions::default(),
    );
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();

    let err = client.update(&ctx, &spec()).unwrap_err();

    assert_eq!(err.operation(), Some("update"));
    assert_eq!(err.phase(), Some(Phase::Plan));
    assert_eq!(h.backend.count("apply"), 0);
}

#[test]
fn test_destroy_failure_keeps_workspace() {
    let h = Harness::with(
        FakeBackend {
            fail_destroy: true,
            ..Default::default()
        },
        ProviderOptions::default(),
    );
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();
    client.create(&ctx, &spec()).unwrap();

    let err = client.delete(&ctx, &spec()).unwrap_err();

    assert_eq!(err.operation(), Some("delete"));
    assert_eq!(err.phase(), Some(Phase::Destroy));
    assert!(client.workspace().path().is_dir());
    assert!(client.workspace().file(STATE_FILE).exists());
}

#[cfg(unix)]
#[test]
fn test_teardown_failure_after_destroy_still_deletes() {
    use std::os::unix::fs::PermissionsExt;

    let h = Harness::new();
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();
    client.create(&ctx, &spec()).unwrap();

    let root = h.connector.workspaces().root().to_path_buf();
    fs::set_permissions(&root, fs::Permissions::from_mode(0o500)).unwrap();
    let restore = || fs::set_permissions(&root, fs::Permissions::from_mode(0o700)).unwrap();

    // Privileged users ignore directory modes; nothing to check then
    if fs::write(root.join("writable"), "").is_ok() {
        restore();
        return;
    }

    let result = client.delete(&ctx, &spec());
    restore();

    result.unwrap();
    assert_eq!(h.backend.count("destroy"), 1);
    assert!(!client.workspace().file(STATE_FILE).exists());
    assert!(client.workspace().path().exists());
}

#[test]
fn test_cancelled_observe_is_transient_error() {
    let h = Harness::new();
    let token = CancelToken::new();
    let ctx = Context::with_token(token.clone());
    let client = h.connector.connect(&ctx, "db").unwrap();

    token.cancel();
    let err = client.observe(&ctx, &spec()).unwrap_err();

    assert_eq!(err.operation(), Some("observe"));
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.phase(), Some(Phase::Init));
    assert!(err.is_transient());
    assert_eq!(h.backend.count("init"), 0);
}

#[test]
fn test_expired_deadline_fails_create() {
    let h = Harness::new();
    let ctx = Context::background().with_timeout(Duration::ZERO);
    let client = h.connector.connect(&ctx, "db").unwrap();

    let err = client.create(&ctx, &spec()).unwrap_err();

    assert_eq!(err.operation(), Some("create"));
    assert!(err.is_transient());
    assert!(!client.workspace().file(STATE_FILE).exists());
}

#[test]
fn test_invalid_input_is_serialization_error() {
    let h = Harness::new();
    let ctx = Context::background();
    let client = h.connector.connect(&ctx, "db").unwrap();

    let err = client
        .create(&ctx, &spec().with_variable("not valid", "x"))
        .unwrap_err();

    assert_eq!(err.operation(), Some("create"));
    assert_eq!(err.kind(), ErrorKind::Serialization);
    assert!(!err.is_transient());
    assert_eq!(h.backend.count("init"), 0);
}

#[test]
fn test_empty_identity_fails_connect() {
    let h = Harness::new();
    let err = h
        .connector
        .connect(&Context::background(), "")
        .err()
        .unwrap();

    assert_eq!(err.operation(), Some("connect"));
    assert_eq!(err.kind(), ErrorKind::Workspace);
}

#[test]
fn test_reconcile_pass_through_connector() {
    let h = Harness::new();
    let ctx = Context::background();
    let resource = Managed::new("app", spec());

    let created = reconcile(&h.connector, &ctx, &resource).unwrap();
    assert_eq!(created.outcome, ReconcileOutcome::Created);

    let steady = reconcile(&h.connector, &ctx, &resource).unwrap();
    assert_eq!(steady.outcome, ReconcileOutcome::UpToDate);

    let deleted = reconcile(&h.connector, &ctx, &resource.clone().deleting()).unwrap();
    assert_eq!(deleted.outcome, ReconcileOutcome::Deleted);
    assert!(h.connector.workspaces().list().unwrap().is_empty());
    assert_eq!(h.backend.count("apply"), 1);
}
