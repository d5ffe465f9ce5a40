//! Whole documents through extraction, execution and reporting

use lesson_check::config::CheckConfig;
use lesson_check::document::{parse_document, Converter};
use lesson_check::episode::EpisodeRunner;
use lesson_check::runner::{CodeRunner, SharedBuffer, StdoutSlot};
use lesson_check::Error;

const EPISODE: &str = r#"{"doc": {"type": "root", "children": [
  {"type": "header", "options": {"level": 2}, "children": [{"type": "text", "value": "Variables"}]},
  {"type": "codeblock", "attr": {"class": "language-python"}, "value": "weight_kg = 60\n"},
  {"type": "codeblock", "attr": {"class": "language-python"}, "value": "print(weight_kg)\n"},
  {"type": "codeblock", "attr": {"class": "output"}, "value": "60\n"},
  {"type": "p", "attr": {"class": "language-python"}, "children": [
    {"type": "text", "value": "~~~\nprint("},
    {"type": "smart_quote", "value": "lsquo"},
    {"type": "text", "value": "weight in pounds:"},
    {"type": "smart_quote", "value": "rsquo"},
    {"type": "text", "value": ", 2.2 * weight_kg)\n~~~"}
  ]},
  {"type": "codeblock", "attr": {"class": "output"}, "value": "weight in pounds: 132\n"},
  {"type": "codeblock", "attr": {"class": "language-python"}, "value": "print(weight_lb)\n"},
  {"type": "codeblock", "attr": {"class": "error"}, "value": "NameError: name 'weight_lb' is not defined\n"}
]}}"#;

fn quiet_episode() -> EpisodeRunner {
    EpisodeRunner::new()
        .with_runner(CodeRunner::new().with_slot(StdoutSlot::with_sink(SharedBuffer::new())))
}

fn python_available() -> bool {
    if CodeRunner::new().is_available() {
        return true;
    }
    eprintln!("Python not available, skipping test");
    false
}

#[test]
fn test_episode_reports_every_block() {
    if !python_available() {
        return;
    }
    let elements = parse_document(EPISODE).unwrap();
    let report = quiet_episode().run(&elements).unwrap();

    assert_eq!(report.len(), 4);
    let mismatches: Vec<_> = report.mismatches().collect();
    assert_eq!(mismatches.len(), 1);

    let block = mismatches[0];
    assert_eq!(block.index, 3);
    assert_eq!(block.code.as_deref(), Some("print('weight in pounds:', 2.2 * weight_kg)"));
    assert_eq!(block.expected_output.as_deref(), Some("weight in pounds: 132"));
    assert_eq!(block.actual_output.as_deref(), Some("weight in pounds: 132.0"));
    let diff: Vec<String> = block
        .output_diff
        .as_ref()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(diff, vec!["- weight in pounds: 132", "+ weight in pounds: 132.0"]);
}

#[test]
fn test_report_json_shape() {
    if !python_available() {
        return;
    }
    let elements = parse_document(EPISODE).unwrap();
    let report = quiet_episode().run(&elements).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json[0], serde_json::json!({"code_block": 1}));
    assert_eq!(json[2]["output_diff"][1], "+ weight in pounds: 132.0");
    assert!(json[3].get("error_diff").is_none());
}

#[test]
fn test_output_before_code_aborts_document() {
    let json = r#"[
        {"attr": {"class": "output"}, "value": "1\n"},
        {"attr": {"class": "language-python"}, "value": "1\n"}
    ]"#;
    let elements = parse_document(json).unwrap();
    let err = quiet_episode().run(&elements).unwrap_err();
    assert!(matches!(err, Error::Format(_)));
}

#[test]
fn test_output_after_empty_code_aborts_document() {
    let json = r#"[
        {"attr": {"class": "language-python"}, "value": "\n"},
        {"attr": {"class": "output"}, "value": "1\n"}
    ]"#;
    let elements = parse_document(json).unwrap();
    let err = quiet_episode().run(&elements).unwrap_err();
    assert_eq!(
        err.to_string(),
        "format error: There should always be code before output."
    );
}

#[test]
fn test_blank_output_is_not_compared() {
    if !python_available() {
        return;
    }
    let json = r#"[
        {"attr": {"class": "language-python"}, "value": "x = 1\n"},
        {"attr": {"class": "output"}, "value": "\n"},
        {"attr": {"class": "language-python"}, "value": "print(x)\n"},
        {"attr": {"class": "output"}, "value": "1\n"}
    ]"#;
    let elements = parse_document(json).unwrap();
    let report = quiet_episode().run(&elements).unwrap();
    assert_eq!(report.len(), 2);
    assert!(report.passed());
    assert_eq!(serde_json::to_value(&report).unwrap()[0], serde_json::json!({"code_block": 1}));
}

#[test]
fn test_dead_interpreter_aborts_document() {
    if !python_available() {
        return;
    }
    let json = r#"[
        {"attr": {"class": "language-python"}, "value": "import os\nos._exit(3)\n"},
        {"attr": {"class": "language-python"}, "value": "1\n"}
    ]"#;
    let elements = parse_document(json).unwrap();
    let episode = quiet_episode();
    let err = episode.run(&elements).unwrap_err();
    assert!(matches!(err, Error::Interpreter(_)));

    let json = r#"[
        {"attr": {"class": "language-python"}, "value": "1 + 1\n"},
        {"attr": {"class": "output"}, "value": "2\n"}
    ]"#;
    assert!(episode.run(&parse_document(json).unwrap()).unwrap().passed());
}

#[test]
fn test_unterminated_fence_aborts_document() {
    let json = r#"[
        {"attr": {"class": "language-python"}, "children": [
            {"value": "~~~\n"}, {"value": "x = 1\n"}
        ]}
    ]"#;
    let elements = parse_document(json).unwrap();
    let err = quiet_episode().run(&elements).unwrap_err();
    assert_eq!(err.to_string(), "format error: There should be a closing ~~~.");
}

#[test]
fn test_configured_roles_and_allow_list() {
    if !python_available() {
        return;
    }
    let json = r#"[
        {"attr": {"class": "language-py"}, "value": "1/0\n"},
        {"attr": {"class": "err"}, "value": "ZeroDivisionError: division by zero\n"}
    ]"#;
    let elements = parse_document(json).unwrap();

    let mut config = CheckConfig::default();
    config.roles.code = "language-py".to_string();
    config.roles.error = "err".to_string();
    config.runner.allowed_errors.push("ZeroDivisionError".to_string());

    let episode = EpisodeRunner::from_config(&config)
        .with_runner(
            CodeRunner::with_config(config.runner.clone())
                .with_slot(StdoutSlot::with_sink(SharedBuffer::new())),
        );
    let report = episode.run(&elements).unwrap();
    assert_eq!(report.len(), 1);
    assert!(report.passed());
}

#[cfg(unix)]
#[test]
fn test_converter_pipeline() {
    if !python_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("01-intro.md");
    std::fs::write(&path, EPISODE).unwrap();

    let converter = Converter::from_command(&["cat".to_string()]).unwrap();
    let elements = converter.convert(&path).unwrap();
    let report = quiet_episode().run(&elements).unwrap();
    assert_eq!(report.len(), 4);
    assert!(!report.passed());
}
