//! Malformed source (`§4.2`): every `ParseError` carries a line/column and
//! a caret-annotated context snippet that includes the offending line.

use glint::Engine;

#[test]
fn missing_initializer_reports_a_dedicated_message() {
    let engine = Engine::new();
    let err = engine.parse("const x;").unwrap_err();
    assert!(err.message().to_lowercase().contains("initializer"), "{}", err.message());
}

#[test]
fn unterminated_string_is_reported_rather_than_panicking() {
    let engine = Engine::new();
    let err = engine.parse("let s = \"never closed;").unwrap_err();
    assert!(err.message().to_lowercase().contains("string"), "{}", err.message());
}

#[test]
fn unterminated_template_literal_is_reported() {
    let engine = Engine::new();
    let err = engine.parse("let s = `never closed ${1 + 1};").unwrap_err();
    assert!(err.message().to_lowercase().contains("template"), "{}", err.message());
}

#[test]
fn context_snippet_contains_the_offending_line_and_a_caret() {
    let engine = Engine::new();
    let source = "let good = 1;\nlet bad = ;\nlet alsoGood = 2;";
    let err = engine.parse(source).unwrap_err();
    assert_eq!(err.line, 2);
    let snippet = err.context_snippet();
    assert!(snippet.contains("let bad = ;"), "{snippet}");
    assert!(snippet.contains('^'), "{snippet}");
}

#[test]
fn very_long_lines_are_truncated_with_ellipses_but_keep_the_error_column_visible() {
    let engine = Engine::new();
    let source = format!("let x = {};", "1 + ".repeat(200));
    let err = engine.parse(&source).unwrap_err();
    let snippet = err.context_snippet();
    assert!(snippet.contains("..."), "{snippet}");
    assert!(snippet.len() < source.len(), "{snippet}");
}

#[test]
fn display_format_includes_syntax_error_prefix_and_position() {
    let engine = Engine::new();
    let err = engine.parse("let x = ;").unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("SyntaxError"), "{rendered}");
    assert!(rendered.contains("1:"), "{rendered}");
}

#[test]
fn a_syntactically_valid_program_parses_without_error() {
    let engine = Engine::new();
    engine
        .parse("class C extends Object { #p = 1; get p() { return this.#p; } } async function f() { return await 1; }")
        .unwrap();
}

#[test]
fn parse_succeeds_exactly_when_evaluate_does_not_raise_a_parse_error() {
    let engine = Engine::new();
    let bad = "let x = ;";
    assert!(engine.parse(bad).is_err());
    let mut engine2 = Engine::new();
    match engine2.evaluate(bad) {
        Err(glint::EngineError::Parse(_)) => {}
        other => panic!("expected a parse error, got {other:?}"),
    }
}
