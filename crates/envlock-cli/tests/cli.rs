//! Integration tests for the envlock binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// One scratch project plus a key directory shared by the simulated machines.
struct Workspace {
    project: TempDir,
    keys: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            project: TempDir::new().unwrap(),
            keys: TempDir::new().unwrap(),
        }
    }

    /// `envlock` acting as the machine whose key is called `key_name`.
    fn envlock(&self, key_name: &str) -> Command {
        let mut cmd = Command::cargo_bin("envlock").unwrap();
        cmd.env_remove("ENVLOCK_LOG")
            .arg("-C")
            .arg(self.project.path())
            .arg("--config-dir")
            .arg(self.keys.path())
            .arg("--key-name")
            .arg(key_name);
        cmd
    }

    fn stdout(&self, key_name: &str, args: &[&str]) -> String {
        let output = self.envlock(key_name).args(args).assert().success();
        String::from_utf8(output.get_output().stdout.clone()).unwrap()
    }

    /// A machine with a key and the project already set up.
    fn bootstrapped() -> Self {
        let ws = Self::new();
        ws.stdout("laptop", &["init", "--name", "laptop"]);
        ws.stdout("laptop", &["project", "init", "--app", "demo"]);
        ws
    }
}

fn value_after<'a>(stdout: &'a str, label: &str) -> &'a str {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(label))
        .map(str::trim)
        .unwrap_or_else(|| panic!("no {label:?} in output:\n{stdout}"))
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("envlock").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("recipients"));
}

#[test]
fn test_usage_error_exits_one() {
    let mut cmd = Command::cargo_bin("envlock").unwrap();
    cmd.args(["requests", "approve"]).assert().code(1);
}

#[test]
fn test_init_refuses_to_overwrite() {
    let ws = Workspace::new();

    let out = ws.stdout("default", &["init", "--name", "laptop"]);
    assert!(out.contains("Created local device key:"));
    assert!(out.contains("Device name: laptop"));
    assert!(value_after(&out, "Public key:").starts_with("age1"));
    assert_eq!(value_after(&out, "Fingerprint:").len(), 16);

    ws.envlock("default")
        .args(["init", "--name", "laptop"])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("error: key already exists"));

    ws.envlock("default")
        .args(["init", "--name", "other", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Device name: other"));
}

#[test]
fn test_key_name_with_separator_is_rejected() {
    let ws = Workspace::new();
    ws.envlock("a/b")
        .arg("init")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("path separators"));
}

#[test]
fn test_project_init_requires_local_key() {
    let ws = Workspace::new();
    ws.envlock("default")
        .args(["project", "init", "--app", "demo"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("run `envlock init` first"));
}

#[test]
fn test_project_init_adds_local_device() {
    let ws = Workspace::new();
    ws.stdout("laptop", &["init", "--name", "laptop"]);

    let out = ws.stdout("laptop", &["project", "init", "--app", "demo", "--backend", "sqlite"]);
    assert!(out.contains("Project initialized:"));
    assert!(out.contains("Added local device recipient: laptop ("));

    let out = ws.stdout("laptop", &["project", "show"]);
    assert!(out.contains("App: demo"));
    assert!(out.contains("Prefix: envlock/demo"));
    assert!(out.contains("Backend: sqlite (.envlock/metadata.db)"));
    assert!(out.contains("Invite TTL: 15m"));

    ws.envlock("laptop")
        .args(["project", "init", "--app", "demo"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    let out = ws.stdout(
        "laptop",
        &["project", "init", "--app", "demo", "--backend", "sqlite", "--force"],
    );
    assert!(out.contains("Local device already a recipient: laptop"));
}

#[test]
fn test_commands_outside_project_fail() {
    let ws = Workspace::new();
    ws.envlock("default")
        .args(["recipients", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no envlock project found"));
}

#[test]
fn test_enrollment_flow() {
    let ws = Workspace::bootstrapped();

    let out = ws.stdout("laptop", &["invite", "create", "--ttl", "10m"]);
    let invite_id = value_after(&out, "Created invite:").to_string();
    let token = value_after(&out, "Invite token (share with new machine):").to_string();
    assert!(token.starts_with(&format!("envlock-invite-{invite_id}.")));

    ws.stdout("desktop", &["init", "--name", "desktop"]);
    let url = format!("https://example.test/join?token={token}");
    let out = ws.stdout("desktop", &["invite", "join", &url]);
    let request_id = value_after(&out, "Created enrollment request:").to_string();
    assert!(out.contains("Device: desktop ("));

    let out = ws.stdout("laptop", &["requests", "ls"]);
    assert!(out.contains(&format!("- {request_id}")));
    assert!(out.contains("status: pending"));
    assert!(out.contains(&format!("invite_id: {invite_id}")));

    let out = ws.stdout("laptop", &["requests", "approve", &request_id, "--note", "ok"]);
    assert!(out.contains(&format!(
        "Approved request {request_id} and added recipient: desktop ("
    )));

    let out = ws.stdout("laptop", &["requests", "ls"]);
    assert!(out.contains("No pending enrollment requests"));
    let out = ws.stdout("laptop", &["requests", "ls", "--all"]);
    assert!(out.contains("status: approved"));
    assert!(out.contains("note: ok"));

    let out = ws.stdout("laptop", &["invite", "ls"]);
    assert!(out.contains("status: used"));
    assert!(out.contains(&format!("used_by_request: {request_id}")));

    // the invite is single-use
    ws.stdout("phone", &["init", "--name", "phone"]);
    ws.envlock("phone")
        .args(["invite", "join", "--token", &token])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invite already used"));

    let out = ws.stdout("laptop", &["recipients", "list"]);
    assert!(out.contains("- desktop"));
    assert!(out.contains("- laptop"));
    assert!(out.contains("source: enroll-approve"));
    assert!(out.contains("source: local-init"));

    let out = ws.stdout("laptop", &["status"]);
    assert!(out.contains("Local key: present"));
    assert!(out.contains("Device: laptop"));
    assert!(out.contains("Recipients: 2 active / 2 total"));
}

#[test]
fn test_join_requires_token() {
    let ws = Workspace::bootstrapped();
    ws.envlock("laptop")
        .args(["invite", "join"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "invite token is required (pass <token-or-url> or --token)",
        ));
}

#[test]
fn test_reject_and_revoke_invite() {
    let ws = Workspace::bootstrapped();

    let out = ws.stdout("laptop", &["invite", "create"]);
    let token = value_after(&out, "Invite token (share with new machine):").to_string();

    ws.stdout("desktop", &["init", "--name", "desktop"]);
    let out = ws.stdout("desktop", &["invite", "join", &token]);
    let request_id = value_after(&out, "Created enrollment request:").to_string();

    ws.stdout("phone", &["init", "--name", "phone"]);
    ws.envlock("phone")
        .args(["invite", "join", &token])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("pending request already exists"));

    let out = ws.stdout("laptop", &["requests", "reject", &request_id, "--reason", "unknown"]);
    assert!(out.contains(&format!("Rejected request {request_id} for desktop (")));

    ws.envlock("laptop")
        .args(["requests", "approve", &request_id])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("expected pending"));

    let out = ws.stdout("laptop", &["invite", "create"]);
    let invite_id = value_after(&out, "Created invite:").to_string();
    let out = ws.stdout("laptop", &["invite", "revoke", &invite_id]);
    assert!(out.contains(&format!("Revoked invite {invite_id}")));
}

#[test]
fn test_recipient_add_and_remove() {
    let ws = Workspace::bootstrapped();

    ws.envlock("laptop")
        .args(["recipients", "add", "ci", "age1notakey"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid recipient public key"));

    let out = ws.stdout("spare", &["init", "--name", "spare"]);
    let public_key = value_after(&out, "Public key:").to_string();
    let fingerprint = value_after(&out, "Fingerprint:").to_string();

    let out = ws.stdout("laptop", &["recipients", "add", "ci", &public_key, "--note", "runner"]);
    assert!(out.contains(&format!("Added recipient \"ci\" ({fingerprint})")));

    ws.envlock("laptop")
        .args(["recipients", "add", "ci2", &public_key])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("duplicate recipient"));

    let out = ws.stdout("laptop", &["recipients", "remove", &fingerprint]);
    assert!(out.contains("Revoked recipient \"ci\""));
    assert!(out.contains("remain decryptable until rekeyed"));

    let out = ws.stdout("laptop", &["recipients", "list"]);
    assert!(!out.contains("- ci"));
    let out = ws.stdout("laptop", &["recipients", "list", "--all"]);
    assert!(out.contains("status: revoked"));

    let out = ws.stdout("laptop", &["devices", "rm", "ci", "--hard"]);
    assert!(out.contains("Deleted recipient \"ci\""));

    ws.envlock("laptop")
        .args(["recipients", "remove", "ci"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("recipient not found"));
}

#[test]
fn test_status_without_key_or_project() {
    let ws = Workspace::new();
    let out = ws.stdout("default", &["status"]);
    assert!(out.contains("Local key: missing"));
    assert!(out.contains("Project config: not found in"));
}
