//! End-to-end runs: input discovery, output files and compare mode

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use yacls::model::{finalize, Artifact, Group, Source, User};
use yacls::render;
use yacls::run::{output_name, RunOptions, Runner};
use yacls::ErrorKind;

const SLACK: &str = "username,email,status,fullname,displayname\nalice,alice@ex.com,Active,Alice,al\nbob,bob@ex.com,Admin,Bob,bob\n";

fn snapshot(kind: &str, date: &str, users: Vec<User>, groups: Vec<Group>) -> Artifact {
    let mut a = Artifact::new(Source {
        kind: kind.to_string(),
        source_date: date.to_string(),
        ..Default::default()
    });
    a.users = users;
    a.groups = groups;
    finalize(&mut a);
    a
}

fn user(account: &str, permissions: &[&str]) -> User {
    User {
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        ..User::new(account)
    }
}

fn write(dir: &Path, name: &str, a: &Artifact) {
    fs::write(dir.join(name), render::artifact_yaml(a).unwrap()).unwrap();
}

#[test]
fn test_stdout_documents_are_separated() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("slack.csv");
    fs::write(&input, SLACK).unwrap();

    let mut out = Vec::new();
    let opts = RunOptions {
        input: Some(input),
        ..Default::default()
    };
    Runner::default().run(&opts, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("---\nmetadata:\n"), "{text}");
    assert!(text.contains("- account: alice@ex.com\n"));
    assert!(text.contains("\n\n- account: bob@ex.com\n"));
}

#[test]
fn test_in_dir_writes_one_file_per_input() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    fs::write(input.path().join("slack.csv"), SLACK).unwrap();
    fs::write(
        input.path().join("secureframe.csv"),
        "Name (email),Access role\ncarol@ex.com,Admin\n",
    )
    .unwrap();
    fs::create_dir(input.path().join("ignored")).unwrap();

    let opts = RunOptions {
        in_dir: Some(input.path().to_path_buf()),
        out_dir: Some(output.path().to_path_buf()),
        ..Default::default()
    };
    let mut stdout = Vec::new();
    Runner::default().run(&opts, &mut stdout).unwrap();
    assert!(stdout.is_empty());

    let mut written: Vec<String> = fs::read_dir(output.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    written.sort();
    assert_eq!(written, vec!["secureframe.yaml", "slack.yaml"]);

    let back = render::parse_artifact(
        &fs::read_to_string(output.path().join("secureframe.yaml")).unwrap(),
    )
    .unwrap();
    assert_eq!(back.users[0].account, "carol");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(output.path().join("slack.yaml"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn test_output_name_includes_id() {
    let mut a = snapshot("gcp", "2024-01-01", vec![], vec![]);
    assert_eq!(output_name(&a), "gcp.yaml");
    a.metadata.id = "web".to_string();
    assert_eq!(output_name(&a), "gcp_web.yaml");
}

#[test]
fn test_missing_input_is_no_input() {
    let err = Runner::default()
        .snapshots(&RunOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoInput);

    let opts = RunOptions {
        kind: Some("slack".to_string()),
        ..Default::default()
    };
    let err = Runner::default().snapshots(&opts).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoInput);
}

#[test]
fn test_unguessable_kind() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, "hello").unwrap();
    let opts = RunOptions {
        input: Some(input),
        ..Default::default()
    };
    let err = Runner::default().snapshots(&opts).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownKind);
}

#[test]
fn test_unreadable_input_is_io_error() {
    let opts = RunOptions {
        input: Some("/nonexistent/slack.csv".into()),
        ..Default::default()
    };
    let err = Runner::default().snapshots(&opts).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

// =============================================================================
// Compare mode
// =============================================================================

#[test]
fn test_compare_files() {
    let dir = TempDir::new().unwrap();
    let from = snapshot(
        "slack",
        "2024-01-01",
        vec![user("alice", &["read"]), user("bob", &[])],
        vec![],
    );
    let to = snapshot(
        "slack",
        "2024-02-01",
        vec![user("alice", &["read", "write"])],
        vec![Group {
            name: "eng".to_string(),
            members: vec!["alice".to_string()],
            ..Default::default()
        }],
    );
    write(dir.path(), "old.yaml", &from);
    write(dir.path(), "new.yaml", &to);

    let opts = RunOptions {
        input: Some(dir.path().join("old.yaml")),
        compare: Some(dir.path().join("new.yaml")),
        ..Default::default()
    };
    let mut out = Vec::new();
    Runner::default().run(&opts, &mut out).unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "kind,id,entity,mod,from_date,to_date\n\
         slack,slack,alice,add permission: write,2024-01-01,2024-02-01\n\
         slack,slack,bob,remove user,2024-01-01,2024-02-01\n\
         slack,slack,alice,joined group: eng,2024-01-01,2024-02-01\n"
    );
}

#[test]
fn test_compare_directories_pairs_by_name() {
    let old = TempDir::new().unwrap();
    let new = TempDir::new().unwrap();
    let a = snapshot("slack", "2024-01-01", vec![user("alice", &[])], vec![]);
    let b = snapshot("slack", "2024-02-01", vec![user("alice", &[]), user("carol", &[])], vec![]);
    let c = snapshot("vercel", "2024-01-01", vec![user("dan", &[])], vec![]);
    write(old.path(), "slack.yaml", &a);
    write(new.path(), "slack.yaml", &b);
    write(old.path(), "vercel.yaml", &c);
    write(new.path(), "vercel.yaml", &c);

    let opts = RunOptions {
        in_dir: Some(old.path().to_path_buf()),
        ..Default::default()
    };
    let changes = yacls::run::compare(&opts, new.path()).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].entity, "carol");
    assert_eq!(changes[0].modification, "add user");
}

#[test]
fn test_compare_identical_is_empty() {
    let a = snapshot("slack", "2024-01-01", vec![user("alice", &["read"])], vec![]);
    assert!(yacls::summary(&a, &a).is_empty());
}
