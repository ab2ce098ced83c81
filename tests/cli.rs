// tests/cli.rs

use std::io::Write;

use clap::Parser;
use forge::cli::{CliArgs, Command, SessionAction};
use forge::run;
use tempfile::{tempdir, NamedTempFile};

fn json_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_parse_subcommands_and_globals() {
    let args = CliArgs::try_parse_from([
        "forge", "--log-level", "debug", "ready", "--graph", "g.json", "--json",
    ])
    .unwrap();
    assert!(args.json);
    assert!(args.log_level.is_some());
    match args.command {
        Command::Ready(g) => assert_eq!(g.graph.to_str(), Some("g.json")),
        other => panic!("unexpected command {other:?}"),
    }

    let args = CliArgs::try_parse_from(["forge", "milestones", "--completed", "1,2"]).unwrap();
    match args.command {
        Command::Milestones(m) => assert_eq!(m.completed, vec![1, 2]),
        other => panic!("unexpected command {other:?}"),
    }

    let args = CliArgs::try_parse_from(["forge", "sessions", "prune"]).unwrap();
    assert!(matches!(
        args.command,
        Command::Sessions(s) if matches!(s.action, SessionAction::Prune)
    ));

    let args = CliArgs::try_parse_from(["forge", "verify", "types", "lint"]).unwrap();
    match args.command {
        Command::Verify(v) => {
            assert_eq!(v.gates, vec!["types", "lint"]);
            assert_eq!(v.iteration, 1);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[tokio::test]
async fn test_validate_fails_on_error_findings() {
    let graph = json_file(
        r#"{ "groups": { "core": { "name": "Core" } },
             "requirements": [ { "id": "a", "group": "core", "depends_on": ["ghost"] } ] }"#,
    );
    let path = graph.path().to_str().unwrap();

    let args = CliArgs::try_parse_from([
        "forge", "--config", "/no/such/Forge.toml", "validate", "--graph", path,
    ])
    .unwrap();
    let err = run(args).await.unwrap_err();
    assert!(err.to_string().contains("error finding"));
}

#[tokio::test]
async fn test_waves_and_milestones_commands_succeed() {
    let graph = json_file(
        r#"{ "groups": { "core": { "name": "Core" } },
             "requirements": [ { "id": "a", "group": "core" }, { "id": "b", "group": "core" } ] }"#,
    );
    let args = CliArgs::try_parse_from([
        "forge",
        "--config",
        "/no/such/Forge.toml",
        "waves",
        "--graph",
        graph.path().to_str().unwrap(),
    ])
    .unwrap();
    run(args).await.unwrap();

    let milestones = json_file(r#"[{"number": 1}, {"number": 2, "depends_on": [1]}]"#);
    let args = CliArgs::try_parse_from([
        "forge",
        "--config",
        "/no/such/Forge.toml",
        "--json",
        "milestones",
        "--file",
        milestones.path().to_str().unwrap(),
    ])
    .unwrap();
    run(args).await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_verify_reports_failed_gates() {
    let dir = tempdir().unwrap();
    let config = json_file("[gate.ok]\ncmd = \"true\"\n\n[gate.broken]\ncmd = \"exit 3\"\n");

    let args = CliArgs::try_parse_from([
        "forge",
        "--config",
        config.path().to_str().unwrap(),
        "verify",
        "--project-dir",
        dir.path().to_str().unwrap(),
    ])
    .unwrap();
    let err = run(args).await.unwrap_err();
    assert!(err.to_string().contains("broken"));
}
