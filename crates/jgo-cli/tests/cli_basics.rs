use assert_cmd::Command;
use predicates::prelude::*;

fn jgo() -> Command {
    let mut cmd = Command::cargo_bin("jgo").unwrap();
    // Isolate from the user's real caches and settings.
    let tmp = tempfile::tempdir().unwrap().keep();
    cmd.env("JGO_CACHE_DIR", tmp.join("jgo"));
    cmd.env("M2_REPO", tmp.join("m2"));
    cmd.env_remove("JGO_OFFLINE");
    cmd.env_remove("JGO_UPDATE");
    cmd.env_remove("JAVA_VERSION");
    cmd
}

#[test]
fn help_lists_commands() {
    jgo()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("tree"))
        .stdout(predicate::str::contains("Maven coordinates"));
}

#[test]
fn version_prints() {
    jgo()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jgo"));
}

#[test]
fn malformed_endpoint_exits_2() {
    jgo()
        .args(["tree", "not-a-coordinate", "--offline"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("groupId:artifactId"));
}

#[test]
fn conflicting_placement_is_a_parse_error() {
    jgo()
        .args(["tree", "g:a(c)+g:a(m)", "--offline"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn offline_miss_exits_2() {
    jgo()
        .args(["tree", "org.example:missing-artifact:1.0", "--offline"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn unsupported_resolver_is_rejected() {
    jgo()
        .args(["tree", "g:a:1.0", "--resolver", "mvn"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unsupported resolver"));
}

#[test]
fn run_without_endpoint_or_spec_fails() {
    let empty = tempfile::tempdir().unwrap();
    jgo()
        .current_dir(empty.path())
        .args(["run", "--offline"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("jgo.toml"));
}

#[test]
fn cache_clean_succeeds_on_empty_cache() {
    jgo().args(["cache", "clean"]).assert().success();
}
