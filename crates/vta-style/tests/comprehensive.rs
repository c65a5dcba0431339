//! Comprehensive tests for vta-style
//!
//! Parsing edge cases, value canonicalization and stable re-serialization.

use vta_style::{
    canonicalize, parse_declarations, parse_stylesheet, resolve, serialize_stylesheet, Color,
    Diagnostic, PropertyValue, ResourceKind, Selector, TypedValue, Unit, VariableTable,
};

#[test]
fn test_parse_empty() {
    let parsed = parse_stylesheet("");
    assert!(parsed.value.is_empty());
    assert!(parsed.is_clean());
}

#[test]
fn test_parse_multiple_rules() {
    let css = r#"
        .foo { color: red; }
        .bar { background-color: #00f; }
        #baz { flex-direction: row; }
    "#;
    let parsed = parse_stylesheet(css);
    assert_eq!(parsed.value.len(), 3);
    assert!(parsed.is_clean());
}

#[test]
fn test_parse_selector_list() {
    let parsed = parse_stylesheet("Label, .title > Button:hover { margin: 0; }");
    let rule = &parsed.value[0];
    assert_eq!(rule.selectors.len(), 2);
    assert_eq!(rule.selectors[1].to_string(), ".title > Button:hover");
}

#[test]
fn test_attribute_selector_is_rejected() {
    let parsed = parse_stylesheet("input[type=\"text\"] { margin: 0; }\n.ok { margin: 1px; }");
    assert_eq!(parsed.value.len(), 1);
    assert!(matches!(parsed.diagnostics[0], Diagnostic::MalformedSelector { line: 1, .. }));
}

#[test]
fn test_parse_unity_properties() {
    let css = r#"
        .label {
            -unity-font-style: bold;
            -unity-text-align: middle-center;
            -unity-background-image-tint-color: rgba(255, 255, 255, 0.5);
            background-image: resource("Icons/star");
            transition-duration: 150ms;
            rotate: 90deg;
        }
    "#;
    let parsed = parse_stylesheet(css);
    assert!(parsed.is_clean(), "{:?}", parsed.diagnostics);

    let declarations = &parsed.value[0].declarations;
    assert_eq!(declarations.len(), 6);
    assert_eq!(declarations[2].value.to_string(), "rgba(255, 255, 255, 0.5)");
    match &declarations[3].value {
        PropertyValue::Single(TypedValue::ResourceRef(resource)) => {
            assert_eq!(resource.kind, ResourceKind::Resource);
            assert_eq!(resource.path, "Icons/star");
        }
        other => panic!("expected resource, got {other:?}"),
    }
    match &declarations[4].value {
        PropertyValue::Single(TypedValue::Dimension(d)) => assert_eq!(d.unit, Unit::Millisecond),
        other => panic!("expected dimension, got {other:?}"),
    }
}

#[test]
fn test_color_parsing() {
    let red = Color::from_hex("#ff0000").unwrap();
    assert_eq!(red.to_rgba8(), [255, 0, 0, 255]);

    let short = Color::from_hex("#f00").unwrap();
    assert_eq!(short, red);

    assert!(Color::from_hex("#12345").is_none());
}

#[test]
fn test_canonical_spellings() {
    assert_eq!(canonicalize("#abcdef").unwrap(), "#ABCDEF");
    assert_eq!(canonicalize("10PX").unwrap(), "10px");
    assert_eq!(canonicalize("1.0").unwrap(), "1");
    assert_eq!(canonicalize("url('a.png')").unwrap(), "url(\"a.png\")");
}

#[test]
fn test_reserialize_is_fixed_point() {
    let css = r#"
        /* theme */
        :root { --accent: #1976d2; }
        .title, #header > Label {
            color: var(--accent);
            margin: 4PX 8px;
            -unity-font-definition: url('Fonts/Inter.ttf');
        }
    "#;
    let first = serialize_stylesheet(&parse_stylesheet(css).value);
    let second = serialize_stylesheet(&parse_stylesheet(&first).value);
    assert_eq!(first, second);
    assert!(first.contains("    margin: 4px 8px;\n"));
}

#[test]
fn test_error_is_local() {
    let css = ".a { width: 10px; height 4px; }\n.b { color: blue; }";
    let parsed = parse_stylesheet(css);
    assert_eq!(parsed.value.len(), 2);
    assert_eq!(parsed.value[0].declarations.len(), 1);
    assert_eq!(parsed.diagnostics.len(), 1);
}

#[test]
fn test_raw_value_survives_reserialize() {
    let parsed = parse_declarations("width: calc(100% - 4px)");
    assert!(parsed.is_clean());
    assert_eq!(parsed.value[0].value.to_string(), "calc(100% - 4px)");

    let parsed = parse_declarations("width: 3em");
    assert_eq!(parsed.value[0].value, PropertyValue::Raw("3em".into()));
    assert_eq!(parsed.value[0].to_string(), "width: 3em");
}

#[test]
fn test_resolve_with_linked_variables() {
    let theme = parse_stylesheet(":root { --accent: #FF0000; }").value;
    let rules = parse_stylesheet(".a { color: var(--accent); border-color: var(--other); }").value;

    let resolved = resolve(&rules, &VariableTable::from_rules(&theme));
    let declarations = &resolved.value[0].declarations;
    assert_eq!(declarations[0].value.to_string(), "#FF0000");
    assert_eq!(declarations[1].value.to_string(), "var(--other)");
    assert!(resolved.diagnostics.iter().all(Diagnostic::is_reference));
}

#[test]
fn test_escaped_names_survive_reserialize() {
    let css = "UnityEngine\\.UIElements\\.Label > .\\31 st {\n    -unity-font: Roboto\\ Bold;\n    -unity-font-definition: \"Inter Bold\";\n}\n";
    let rules = parse_stylesheet(css);
    assert!(rules.is_clean(), "{:?}", rules.diagnostics);
    let rule = &rules.value[0];
    assert_eq!(rule.selectors[0].compounds[0].parts, vec![vta_style::SelectorPart::Type("UnityEngine.UIElements.Label".into())]);
    assert_eq!(rule.declarations[0].value, PropertyValue::Single(TypedValue::Keyword("Roboto Bold".into())));
    assert_eq!(rule.declarations[1].value, PropertyValue::Single(TypedValue::String("Inter Bold".into())));
    assert_eq!(serialize_stylesheet(&rules.value), css);
}

#[test]
fn test_lost_brace_recovers_next_rule() {
    let css = ".a { color: red; }\n.b { color: blue;\n.c { width: 1px; }\n.d { height: 1px; }";
    let parsed = parse_stylesheet(css);
    let selectors: Vec<String> = parsed.value.iter().map(|r| r.selectors[0].to_string()).collect();
    assert_eq!(selectors, vec![".a", ".c", ".d"]);
    assert_eq!(parsed.diagnostics.len(), 1);
}

#[test]
fn test_selector_specificity_order() {
    let id = Selector::parse("#a").unwrap().specificity();
    let class = Selector::parse(".a.b").unwrap().specificity();
    let element = Selector::parse("Label Button").unwrap().specificity();
    assert!(id > class);
    assert!(class > element);
}
