//! Integration tests for YAML parsing

mod common;

use common::create_test_config;
use whisk::config::{parse_config, parse_config_file, validate_config, ValueKind};

#[test]
fn test_parse_complete_config() {
    let yaml = r#"
name: my-app
usage: My test application

options:
  environment:
    usage: Environment to target
    default: staging

tasks:
  build:
    usage: Build the project
    options:
      release:
        usage: Build in release mode
        type: bool
        short: r
        rewrite: --release
    run:
      - command: cargo build ${release}

  test:
    usage: Run tests
    run: cargo test

  deploy:
    usage: Deploy the application
    run:
      - when:
          equal:
            environment: production
        command: echo "Deploying to production"
      - command: echo "Deployment complete"
"#;

    let config = parse_config(yaml, None).unwrap();
    validate_config(&config).unwrap();

    assert_eq!(config.name, Some("my-app".to_string()));
    assert_eq!(config.usage, Some("My test application".to_string()));
    assert_eq!(config.tasks.len(), 3);
    assert_eq!(config.options[0].name, "environment");

    let build = config.task("build").unwrap();
    assert_eq!(build.usage, Some("Build the project".to_string()));
    assert_eq!(build.options[0].kind, ValueKind::Bool);
    assert_eq!(build.options[0].short.as_deref(), Some("r"));
    assert_eq!(build.options[0].rewrite.as_deref(), Some("--release"));

    let deploy = config.task("deploy").unwrap();
    assert_eq!(deploy.run.len(), 2);
    assert_eq!(
        deploy.run[0].when[0].equal,
        vec![("environment".to_string(), vec!["production".to_string()])]
    );
}

#[test]
fn test_parse_polymorphic_run_shapes() {
    let yaml = r#"
tasks:
  shapes:
    run:
      - echo plain string
      - command: echo single mapping
      - command:
          - echo first of list
          - exec: echo full form
            print: building...
            quiet: true
"#;
    let config = parse_config(yaml, None).unwrap();
    let task = config.task("shapes").unwrap();

    assert_eq!(task.run.len(), 3);
    assert_eq!(task.run[0].command[0].exec, "echo plain string");
    assert_eq!(task.run[1].command[0].exec, "echo single mapping");
    assert_eq!(task.run[2].command.len(), 2);
    assert_eq!(task.run[2].command[1].print, "building...");
    assert!(task.run[2].command[1].quiet);
}

#[test]
fn test_parse_single_string_run() {
    let yaml = "tasks:\n  quick:\n    run: echo done\n";
    let config = parse_config(yaml, None).unwrap();
    let task = config.task("quick").unwrap();
    assert_eq!(task.run.len(), 1);
    assert_eq!(task.run[0].command[0].exec, "echo done");
}

#[test]
fn test_parse_default_candidate_shapes() {
    let yaml = r#"
tasks:
  t:
    options:
      literal:
        default: plain
      derived:
        default:
          command: git rev-parse HEAD
      guarded:
        default:
          - when:
              os: linux
            value: a
          - value: b
    run: echo ok
"#;
    let config = parse_config(yaml, None).unwrap();
    let task = config.task("t").unwrap();

    let literal = &task.options[0];
    assert_eq!(literal.default[0].value.as_deref(), Some("plain"));

    let derived = &task.options[1];
    assert_eq!(
        derived.default[0].command.as_deref(),
        Some("git rev-parse HEAD")
    );

    let guarded = &task.options[2];
    assert_eq!(guarded.default.len(), 2);
    assert_eq!(guarded.default[0].when[0].os, vec!["linux".to_string()]);
}

#[test]
fn test_parse_bare_when_string_is_command() {
    let yaml = r#"
tasks:
  t:
    run:
      - when: test -d .git
        command: echo in a repo
"#;
    let config = parse_config(yaml, None).unwrap();
    let task = config.task("t").unwrap();
    assert_eq!(task.run[0].when[0].command, vec!["test -d .git".to_string()]);
}

#[test]
fn test_parse_finally_and_source_target() {
    let yaml = r#"
tasks:
  build:
    source:
      - src/**
      - "!src/**/*.tmp"
    target: out/bin
    run: echo build
    finally:
      - echo cleanup
"#;
    let config = parse_config(yaml, None).unwrap();
    validate_config(&config).unwrap();
    let task = config.task("build").unwrap();
    assert_eq!(task.source.len(), 2);
    assert_eq!(task.target, vec!["out/bin".to_string()]);
    assert_eq!(task.finally.len(), 1);
}

#[test]
fn test_parse_rejects_unknown_task_key() {
    let yaml = "tasks:\n  broken:\n    runs: echo oops\n";
    assert!(parse_config(yaml, None).is_err());
}

#[test]
fn test_parse_rejects_mixed_run_item() {
    let yaml = r#"
tasks:
  broken:
    run:
      - command: echo hi
        task: other
"#;
    assert!(parse_config(yaml, None).is_err());
}

#[test]
fn test_parse_file_with_include() {
    let (_temp, config_path) = create_test_config("tasks:\n  lint:\n    include: lint.yml\n");
    std::fs::write(
        config_path.parent().unwrap().join("lint.yml"),
        "usage: Lint everything\nrun: echo lint\n",
    )
    .unwrap();

    let config = parse_config_file(&config_path).unwrap();
    let task = config.task("lint").unwrap();
    assert_eq!(task.name, "lint");
    assert_eq!(task.usage.as_deref(), Some("Lint everything"));
}

#[test]
fn test_round_trip_preserves_catalogue() {
    let yaml = r#"
name: round-trip
tasks:
  greet:
    usage: Say hello
    options:
      name:
        default: world
      excited:
        type: bool
        rewrite: "!"
    run:
      - when:
          equal:
            name: world
        command: echo hello ${name}${excited}
    finally:
      - echo bye
"#;
    let config = parse_config(yaml, None).unwrap();
    let serialized = serde_yaml::to_string(&config).unwrap();
    let reparsed = parse_config(&serialized, None).unwrap();

    assert_eq!(reparsed.name, config.name);
    assert_eq!(reparsed.tasks.len(), config.tasks.len());

    let task = reparsed.task("greet").unwrap();
    assert_eq!(task.usage.as_deref(), Some("Say hello"));
    assert_eq!(task.options.len(), 2);
    assert_eq!(task.options[0].default[0].value.as_deref(), Some("world"));
    assert_eq!(task.options[1].kind, ValueKind::Bool);
    assert_eq!(task.options[1].rewrite.as_deref(), Some("!"));
    assert_eq!(
        task.run[0].when[0].equal,
        vec![("name".to_string(), vec!["world".to_string()])]
    );
    assert_eq!(task.run[0].command[0].exec, "echo hello ${name}${excited}");
    assert_eq!(task.finally[0].command[0].exec, "echo bye");
}
