//! End-to-end scenarios against the public DSL, rather than against the
//! atom arena directly (see the `#[cfg(test)]` modules alongside each
//! module for that level of detail).

use parsalex::dsl::*;
use parsalex::Value;

#[test]
fn s1_literal_match_and_premature_end() {
    let grammar = GrammarBuilder::new().rule("foo", str("foo")).build();
    assert_eq!(grammar.parse("foo").unwrap().as_str(), Some("foo"));

    let err = grammar.parse("fo").unwrap_err();
    assert!(err.message.starts_with("Premature end of input"));
}

#[test]
fn s2_alternative_left_bias_and_failure() {
    let grammar = GrammarBuilder::new()
        .rule("ab", str("a").or(str("b")))
        .build();
    assert_eq!(grammar.parse("b").unwrap().as_str(), Some("b"));

    let err = grammar.parse("c").unwrap_err();
    assert!(err.message.starts_with("Expected one of"));
}

#[test]
fn s3_repetition_bounds() {
    let grammar = GrammarBuilder::new()
        .rule("a23", str("a").repeat(2, Some(3)))
        .build();

    assert_eq!(grammar.parse("aaa").unwrap().as_str(), Some("aaa"));

    let err = grammar.parse("a").unwrap_err();
    assert!(err.message.starts_with("Expected at least 2 of 'a'"));

    let err = grammar.parse("aaaa").unwrap_err();
    assert!(err.message.starts_with("Don't know what to do with"));
}

#[test]
fn s4_quoted_string_with_escapes() {
    // "..." with \" as an escaped quote: ('"' (('\\' .) | ('"'!.)).repeat.as(s) '"')
    let grammar = GrammarBuilder::new()
        .rule(
            "quoted",
            str("\"")
                .then(
                    str("\\")
                        .then(any())
                        .or(str("\"").absent().then(any()))
                        .many()
                        .label("s"),
                )
                .then(str("\"")),
        )
        .build();

    let value = grammar.parse("\"a\\\"b\"").unwrap();
    assert_eq!(value.get("s").and_then(|v| v.as_str()), Some("a\\\"b"));
}

#[test]
fn s5_two_named_fields() {
    let grammar = GrammarBuilder::new()
        .rule("pair", str("a").label("x").then(str("b").label("y")))
        .build();

    let value = grammar.parse("ab").unwrap();
    assert_eq!(value.get("x").and_then(|v| v.as_str()), Some("a"));
    assert_eq!(value.get("y").and_then(|v| v.as_str()), Some("b"));
}

#[test]
fn s6_recursive_tag_grammar() {
    // doc := '<' name '>' doc '</' name '>' | text
    // A much-simplified stand-in: tags nest but don't need to match names,
    // since the atom algebra itself has no notion of back-references.
    let grammar = GrammarBuilder::new()
        .rule(
            "doc",
            str("<")
                .then(re("[a-z]").many1().label("tag"))
                .then(str(">"))
                .then(rule_ref("doc").label("inner"))
                .then(str("</"))
                .then(re("[a-z]").many1())
                .then(str(">"))
                .or(re("[a-z]").many1().label("text")),
        )
        .build();

    let value = grammar.parse("<a><b>hi</b></a>").unwrap();
    let outer_tag = value.get("tag").and_then(|v| v.as_str());
    assert_eq!(outer_tag, Some("a"));

    let inner = value.get("inner").expect("inner field present");
    assert_eq!(inner.get("tag").and_then(|v| v.as_str()), Some("b"));
    assert_eq!(
        inner
            .get("inner")
            .and_then(|v| v.get("text"))
            .and_then(|v| v.as_str()),
        Some("hi")
    );
}

#[test]
fn sequence_of_strings_concatenates() {
    let grammar = GrammarBuilder::new()
        .rule("ab", str("a").then(str("b")))
        .build();
    assert_eq!(grammar.parse("ab").unwrap(), Value::Str("ab".to_string()));
}

#[test]
fn naming_dominates_surrounding_text() {
    let grammar = GrammarBuilder::new()
        .rule("bracketed", str("[").then(re("[a-z]").many1().label("k")).then(str("]")))
        .build();
    let value = grammar.parse("[abc]").unwrap();
    assert_eq!(
        value,
        Value::Mapping(vec![("k".to_string(), Value::Str("abc".to_string()))])
    );
}

#[test]
fn lookahead_never_contributes_to_tree_or_consumes_input() {
    let grammar = GrammarBuilder::new()
        .rule("peek", str("a").present().then(re(".").many1()))
        .build();
    assert_eq!(grammar.parse("abc").unwrap().as_str(), Some("abc"));
}
