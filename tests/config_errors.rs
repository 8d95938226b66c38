// tests/config_errors.rs

mod common;
use crate::common::builders::ExerciseFixture;

use exerun::config::{default_config_path, load_and_validate, CONFIG_FILE_NAME};
use exerun::errors::ExerunError;
use exerun::style::Locale;
use exerun::types::{ProjectKind, TestExecution, ValgrindStrategy};

fn load(contents: &str) -> (ExerciseFixture, Result<exerun::config::ProjectConfig, ExerunError>) {
    let fixture = ExerciseFixture::new("cfg");
    let path = fixture.write(CONFIG_FILE_NAME, contents);
    let result = load_and_validate(path);
    (fixture, result)
}

#[test]
fn unknown_kind_is_a_config_error() {
    let (_fixture, result) = load("[project]\nkind = \"gradle\"\n");
    match result {
        Err(ExerunError::Config(msg)) => assert!(msg.contains("gradle"), "{msg}"),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn backend_execution_requires_langs() {
    let (_fixture, result) = load("[project]\nkind = \"managed\"\ntest_execution = \"backend\"\n");
    match result {
        Err(ExerunError::Config(msg)) => assert!(msg.contains("[tools].langs"), "{msg}"),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn zero_memory_limit_is_rejected() {
    let (_fixture, result) = load("[project]\nkind = \"simple\"\nmemory_limit = 0\n");
    assert!(matches!(result, Err(ExerunError::Config(_))));
}

#[test]
fn unsupported_locale_is_rejected() {
    let (_fixture, result) = load("[project]\nkind = \"simple\"\n\n[style]\nlocale = \"sv\"\n");
    match result {
        Err(ExerunError::Config(msg)) => assert!(msg.contains("'sv'"), "{msg}"),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn locale_accepts_what_the_style_checker_accepts() {
    for locale in ["FI", " en ", "Fi"] {
        let (_fixture, result) = load(&format!(
            "[project]\nkind = \"simple\"\n\n[style]\nlocale = \"{locale}\"\n"
        ));
        let cfg = result.unwrap_or_else(|e| panic!("{locale:?}: {e}"));
        assert!(cfg.style.locale.parse::<Locale>().is_ok());
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let (_fixture, result) = load("[project\nkind = \"simple\"\n");
    assert!(matches!(result, Err(ExerunError::Toml(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let fixture = ExerciseFixture::new("nothing");
    let result = load_and_validate(default_config_path(fixture.root()));
    assert!(matches!(result, Err(ExerunError::Io(_))));
}

#[test]
fn full_config_flows_into_descriptor_and_settings() {
    let (fixture, result) = load(
        r#"
[project]
name = "ex-42"
kind = "native"
memory_limit = 256
valgrind = "always"
test_execution = "backend"

[tools]
make = "/usr/bin/gmake"
langs = "tmc-langs-cli"

[submit]
cmd = ["./submit.sh", "--now"]
auto = true
"#,
    );
    let cfg = result.unwrap();

    let descriptor = cfg.descriptor(fixture.root());
    assert_eq!(descriptor.name, "ex-42");
    assert_eq!(descriptor.kind, ProjectKind::Native);
    assert_eq!(descriptor.root, fixture.root());
    assert_eq!(descriptor.memory_limit, Some(256));

    let settings = cfg.pipeline_settings();
    assert_eq!(settings.test_execution, TestExecution::Backend);
    assert_eq!(settings.valgrind, ValgrindStrategy::Always);
    assert_eq!(settings.tools.make, "/usr/bin/gmake");
    assert_eq!(settings.tools.java, "java");
    assert_eq!(settings.tools.langs.as_deref(), Some("tmc-langs-cli"));

    let submit = cfg.submit.unwrap();
    assert_eq!(submit.cmd, vec!["./submit.sh", "--now"]);
    assert!(submit.auto);
}

#[test]
fn descriptor_name_defaults_to_directory_name() {
    let (fixture, result) = load("[project]\nkind = \"managed\"\n");
    let cfg = result.unwrap();
    let descriptor = cfg.descriptor(fixture.path("my-exercise"));
    assert_eq!(descriptor.name, "my-exercise");
}
