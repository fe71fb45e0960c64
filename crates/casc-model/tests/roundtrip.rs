//! Property tests for the document round-trip law.
//!
//! The binder renders nodes to text and parses text back into nodes on every
//! bind and export, so `parse(render(n)) == n` has to hold for anything the
//! parser itself can produce.

use casc_model::{parse, parse_json, render, render_json, Mapping, Node, Scalar, ScalarFormat};
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        "[ -~]{0,12}".prop_map(Scalar::string),
        "(true|false|null|~|[0-9]{1,4}|-[0-9]{1,3}|0x1F|1e3| lead|trail |a: b|#x|- y|caf\u{e9})"
            .prop_map(Scalar::string),
        any::<i64>().prop_map(Scalar::number),
        any::<bool>().prop_map(Scalar::boolean),
        (-10_000i32..10_000, 1u8..4)
            .prop_map(|(whole, quarters)| Scalar::number(f64::from(whole) + f64::from(quarters) * 0.25)),
    ]
}

// YAML only: JSON has no spelling for these
fn non_finite() -> impl Strategy<Value = Scalar> {
    prop_oneof![Just(".inf"), Just("-.inf"), Just(".nan")]
        .prop_map(|text| Scalar::new(text, ScalarFormat::Number))
}

fn yaml_scalar() -> BoxedStrategy<Scalar> {
    prop_oneof![6 => scalar(), 1 => non_finite()].boxed()
}

fn node(leaf: BoxedStrategy<Scalar>) -> impl Strategy<Value = Node> {
    leaf.prop_map(Node::Scalar).prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Node::Sequence),
            prop::collection::vec(("[a-zA-Z_][a-zA-Z0-9_]{0,8}", inner), 0..5).prop_map(
                |entries| Node::Mapping(entries.into_iter().collect::<Mapping>())
            ),
        ]
    })
}

fn document(leaf: BoxedStrategy<Scalar>) -> impl Strategy<Value = Node> {
    prop::collection::vec(("[a-z]{1,6}", node(leaf)), 0..6)
        .prop_map(|entries| Node::Mapping(entries.into_iter().collect::<Mapping>()))
}

proptest! {
    #[test]
    fn prop_yaml_render_parse_roundtrip(doc in document(yaml_scalar())) {
        let text = render(&doc).unwrap();
        prop_assert_eq!(parse(&text).unwrap(), doc);
    }

    #[test]
    fn prop_json_render_parse_roundtrip(doc in document(scalar().boxed())) {
        let text = render_json(&doc).unwrap();
        prop_assert_eq!(parse_json(&text).unwrap(), doc.clone());
        // JSON output is valid YAML input as well
        prop_assert_eq!(parse(&text).unwrap(), doc);
    }
}

#[test]
fn credential_document_roundtrip() {
    let text = r#"
credentials:
  system:
    domainCredentials:
      - credentials:
          - usernamePassword:
              scope: GLOBAL
              id: db
              username: some-user
              password: "${SECRET:db_pw}"
"#;
    let doc = parse(text).unwrap();
    let reparsed = parse(&render(&doc).unwrap()).unwrap();
    pretty_assertions::assert_eq!(reparsed, doc);
}
