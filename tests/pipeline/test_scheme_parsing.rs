mod support;

use std::fs;
use support::{six_step_scheme, SIX_STEP_TEXT};
use tempfile::TempDir;
use tierflow::core::pipeline::{LintSeverity, Location, Scheme, StepMetadata};

#[test]
fn test_text_and_programmatic_schemes_agree() {
    let parsed = Scheme::parse(SIX_STEP_TEXT);
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    assert_eq!(parsed.scheme, six_step_scheme());
    assert_eq!(parsed.scheme.len(), 6);
    assert_eq!(
        parsed.scheme.provider_types().collect::<Vec<_>>(),
        vec!["Arithmetic"]
    );
}

#[test]
fn test_bad_lines_are_reported_and_good_lines_kept() {
    let text = "\
{Arithmetic; Add3; i16; i16; (0,0)}
{Arithmetic; Add3; i16; (0,1)}
{Arithmetic; Add3; i16; i16; (0,0)}
{Arithmetic; Subtract3; i16; i16; (zero,1)}
";
    let parsed = Scheme::parse(text);
    assert_eq!(parsed.scheme.len(), 1);
    assert!(parsed.has_errors());

    let codes: Vec<(usize, &str, LintSeverity)> = parsed
        .diagnostics
        .iter()
        .map(|d| (d.line, d.code.as_str(), d.severity))
        .collect();
    assert_eq!(
        codes,
        vec![
            (2, "TF-PARSE-003", LintSeverity::Error),
            (3, "TF-PARSE-004", LintSeverity::Warning),
            (4, "TF-PARSE-003", LintSeverity::Error),
        ]
    );

    let err = parsed.into_result().unwrap_err();
    assert_eq!(err.code, "TF-PARSE-003");
    assert_eq!(err.context.get("line").map(String::as_str), Some("2"));
}

#[test]
fn test_scheme_display_round_trips() {
    let scheme = six_step_scheme();
    let reparsed: Scheme = scheme.to_string().parse().unwrap();
    assert_eq!(reparsed, scheme);
}

#[test]
fn test_scheme_clone_is_independent() {
    let original = six_step_scheme();
    let mut copy = original.clone();
    let first = copy.steps().next().cloned().unwrap();
    assert!(copy.remove_step(&first));
    assert_eq!(copy.len(), 5);
    assert_eq!(original.len(), 6);
}

#[test]
fn test_buckets_keep_first_seen_order() {
    let mut scheme = Scheme::new();
    assert!(scheme.try_add(StepMetadata::typed::<i16, i16>(
        "Signs",
        "Negate",
        Location::new(0, 1)
    )));
    assert!(scheme.try_add_line("{Arithmetic; Add3; i16; i16; (0,0)}"));
    assert!(scheme.try_add(StepMetadata::typed::<i16, i16>(
        "Signs",
        "Double",
        Location::new(0, 2)
    )));
    assert!(!scheme.try_add_line("not a step"));

    assert_eq!(
        scheme.provider_types().collect::<Vec<_>>(),
        vec!["Signs", "Arithmetic"]
    );
    assert_eq!(scheme.try_get("Signs").map(<[_]>::len), Some(2));
    assert!(scheme.try_remove("Signs").is_some());
    assert!(scheme.try_get("Signs").is_none());
}

#[test]
fn test_load_from_file_and_missing_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("arithmetic.scheme");
    fs::write(&path, SIX_STEP_TEXT).unwrap();

    let parsed = Scheme::load(&path).unwrap();
    assert_eq!(parsed.scheme.len(), 6);

    let err = Scheme::load(&temp.path().join("missing.scheme")).unwrap_err();
    assert_eq!(err.code, "TF-IO-001");
}

#[test]
fn test_parse_reader_accepts_bytes() {
    let parsed = Scheme::parse_reader(SIX_STEP_TEXT.as_bytes()).unwrap();
    assert_eq!(parsed.scheme, six_step_scheme());
}
