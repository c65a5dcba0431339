//! Integration tests - Full pipeline between binary assets and UXML text
//!
//! Tests the complete workflow: BinaryAsset → Document → UXML → Document → BinaryAsset

use vta_codec::asset::{
    BinaryAsset, Bookkeeping, ComplexSelectorRecord, ElementRecord, PropertyRecord, Relationship, Rgba, RuleRecord,
    SelectorPartKind, SelectorPartRecord, SelectorRecord, SheetPropertyRecord, SheetRecord, TableKind, TemplateBinding,
    TemplateUsing, ValueHandle, ValueKind, NO_PARENT,
};
use vta_codec::dom::HierarchyError;
use vta_codec::{build_binary_asset, export, parse, render, Codec, Config, TransformError, Warning};

const LAYOUT: &str = r#"<ui:UXML xmlns:ui="UnityEngine.UIElements" xmlns:uie="UnityEditor.UIElements">
    <ui:Template name="Row" src="Assets/UI/Row.uxml" />
    <ui:Template name="Footer" />
    <ui:Style src="Assets/UI/Theme.uss" />
    <ui:VisualElement name="root" class="panel dark" style="flex-direction: row; margin: 4px 8px" vta-id="1">
        <ui:Label name="title" class="title" text="Main &amp; Menu" vta-id="2" />
        <ui:Instance template="Row" vta-id="3" />
        <ui:Instance template="Row" vta-id="4" />
        <uie:ObjectField label="Target" vta-id="5" />
        <My.Game.Widget power="9" style="color: var(--accent)" vta-id="6">
            <ui:Button text="Go" vta-id="7" />
        </My.Game.Widget>
    </ui:VisualElement>
    <ui:Style><![CDATA[
:root {
    --accent: #1976D2;
}

.title {
    color: #FF0000;
    padding: 4px;
    transition-duration: 150ms;
}

#root > Label:hover, .panel {
    -unity-font-style: bold;
    background-image: resource("Icons/star");
}
]]></ui:Style>
</ui:UXML>
"#;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// ROUND TRIPS
// ============================================================================

#[test]
fn test_text_survives_import_and_export() {
    let codec = Codec::default();
    let imported = codec.import_text(LAYOUT, None).unwrap();
    assert!(imported.is_clean(), "{:?}", imported.warnings);

    let exported = codec.export_text(&imported.value).unwrap();
    assert!(exported.is_clean(), "{:?}", exported.warnings);
    assert_eq!(exported.value, LAYOUT);
}

#[test]
fn test_asset_survives_text() {
    let original = build_binary_asset(&parse(LAYOUT).unwrap().value, None).unwrap().value;

    let text = render(&export(&original).unwrap().value);
    let rebuilt = build_binary_asset(&parse(&text).unwrap().value, Some(&original)).unwrap().value;

    assert_eq!(rebuilt, original);
}

#[test]
fn test_render_of_parse_is_identity_on_exported_text() {
    let mut asset = BinaryAsset {
        strings: strings(&["UnityEngine.UIElements.VisualElement", "UnityEngine.UIElements.Label", "text", "x < y"]),
        ..Default::default()
    };
    let mut label = ElementRecord::new(2, 1, 0, 1);
    label.properties = vec![PropertyRecord { name: 2, value: 3 }];
    asset.elements = vec![ElementRecord::new(1, NO_PARENT, 0, 0), label];

    let text = render(&export(&asset).unwrap().value);
    assert_eq!(render(&parse(&text).unwrap().value), text);
    assert!(text.contains("text=\"x &lt; y\""));
}

/// Asset written by hand rather than by the importer: a fractional color,
/// keywords that are not plain identifiers, a quoted string, a dotted type
/// selector and element text.
fn hand_built_asset() -> BinaryAsset {
    let property = |name: u32, kind: ValueKind, index: u32| SheetPropertyRecord {
        name,
        values: vec![ValueHandle::new(kind, index)],
    };
    let mut label = ElementRecord::new(2, 1, 0, 1);
    label.text = Some(10);

    BinaryAsset {
        strings: strings(&[
            "UnityEngine.UIElements.VisualElement",
            "UnityEngine.UIElements.Label",
            "color",
            "-unity-font",
            "Roboto Bold",
            "-unity-font-definition",
            "Inter Bold",
            "My.Game.Widget",
            "cursor",
            "#abc",
            " Play & win\n",
        ]),
        colors: vec![Rgba::new(0.3, 0.3, 0.3, 0.5)],
        elements: vec![ElementRecord::new(1, NO_PARENT, 0, 0), label],
        inline_sheet: Some(SheetRecord {
            rules: vec![RuleRecord {
                properties: vec![
                    property(2, ValueKind::Color, 0),
                    property(3, ValueKind::Keyword, 4),
                    property(5, ValueKind::String, 6),
                    property(8, ValueKind::Keyword, 9),
                ],
            }],
            complex_selectors: vec![ComplexSelectorRecord {
                rule_index: 0,
                specificity: 1,
                selectors: vec![SelectorRecord {
                    parts: vec![SelectorPartRecord { kind: SelectorPartKind::Type, value: 7 }],
                    previous_relationship: Relationship::None,
                }],
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[test]
fn test_hand_built_asset_survives_text() {
    let original = hand_built_asset();
    let codec = Codec::default();
    let exported = codec.export_text(&original).unwrap();
    assert!(exported.is_clean(), "{:?}", exported.warnings);
    let text = exported.value;

    assert!(text.contains("My\\.Game\\.Widget {"), "{text}");
    assert!(text.contains("color: rgba(76.5, 76.5, 76.5, 0.5);"), "{text}");
    assert!(text.contains("-unity-font: Roboto\\ Bold;"), "{text}");
    assert!(text.contains("-unity-font-definition: \"Inter Bold\";"), "{text}");
    assert!(text.contains("cursor: \\#abc;"), "{text}");
    assert!(text.contains("<ui:Label vta-id=\"2\">&#32;Play &amp; win&#10;</ui:Label>"), "{text}");

    let rebuilt = codec.import_text(&text, Some(&original)).unwrap();
    assert!(rebuilt.is_clean(), "{:?}", rebuilt.warnings);
    let rebuilt = rebuilt.value;

    assert_eq!(rebuilt.colors, original.colors);
    let label = rebuilt.element(2).unwrap();
    assert_eq!(label.text.map(|i| rebuilt.string(i).unwrap()), Some(" Play & win\n"));

    let sheet = rebuilt.inline_sheet.as_ref().unwrap();
    let selector = &sheet.complex_selectors[0].selectors[0];
    assert_eq!(selector.parts.len(), 1);
    assert_eq!(rebuilt.string(selector.parts[0].value).unwrap(), "My.Game.Widget");
    let values: Vec<(ValueKind, &str)> = sheet.rules[0]
        .properties
        .iter()
        .flat_map(|p| p.values.iter())
        .filter(|v| v.kind != ValueKind::Color)
        .map(|v| (v.kind, rebuilt.string(v.index).unwrap()))
        .collect();
    assert_eq!(
        values,
        vec![(ValueKind::Keyword, "Roboto Bold"), (ValueKind::String, "Inter Bold"), (ValueKind::Keyword, "#abc")]
    );

    assert_eq!(codec.export_text(&rebuilt).unwrap().value, text);
}

#[test]
fn test_deep_hierarchy_survives_text() {
    let mut original = BinaryAsset { strings: strings(&["UnityEngine.UIElements.VisualElement"]), ..Default::default() };
    original.elements.push(ElementRecord::new(1, NO_PARENT, 0, 0));
    for id in 2..=5_000 {
        original.elements.push(ElementRecord::new(id, id - 1, 0, 0));
    }

    let codec = Codec::new(Config { indent_width: 1, ..Config::default() });
    let text = codec.export_text(&original).unwrap().value;
    assert_eq!(text.matches("</ui:VisualElement>").count(), 4_999);

    let rebuilt = codec.import_text(&text, Some(&original)).unwrap().value;
    assert_eq!(rebuilt.elements, original.elements);
}

#[test]
fn test_control_characters_survive_text() {
    let mut asset = BinaryAsset {
        strings: strings(&["UnityEngine.UIElements.Label", "esc\u{1B}", "text", "bell\u{7}tab\tend"]),
        ..Default::default()
    };
    let mut label = ElementRecord::new(1, NO_PARENT, 0, 0);
    label.text = Some(1);
    label.properties = vec![PropertyRecord { name: 2, value: 3 }];
    asset.elements.push(label);

    let codec = Codec::default();
    let text = codec.export_text(&asset).unwrap().value;
    assert!(text.contains("text=\"bell&#7;tab&#9;end\""), "{text}");
    assert_eq!(codec.import_text(&text, Some(&asset)).unwrap().value, asset);
}

// ============================================================================
// HIERARCHY
// ============================================================================

#[test]
fn test_children_ordered_by_order_in_document() {
    let mut asset = BinaryAsset {
        strings: strings(&["UnityEngine.UIElements.VisualElement", "UnityEngine.UIElements.Label", "name", "a", "b"]),
        ..Default::default()
    };
    let mut a = ElementRecord::new(2, 1, 1, 1);
    a.name = Some(3);
    let mut b = ElementRecord::new(3, 1, 0, 1);
    b.name = Some(4);
    asset.elements = vec![ElementRecord::new(1, NO_PARENT, 0, 0), a, b];

    let text = render(&export(&asset).unwrap().value);
    let b_at = text.find("name=\"b\"").unwrap();
    let a_at = text.find("name=\"a\"").unwrap();
    assert!(b_at < a_at);
}

#[test]
fn test_dangling_parent_yields_no_document() {
    let mut asset = BinaryAsset { strings: strings(&["UnityEngine.UIElements.Label"]), ..Default::default() };
    asset.elements = vec![ElementRecord::new(1, NO_PARENT, 0, 0), ElementRecord::new(2, 99, 0, 0)];

    let failure = export(&asset).unwrap_err();
    assert_eq!(
        failure.error,
        TransformError::Hierarchy(HierarchyError::DanglingParentReference { serial_id: 2, parent_id: 99 })
    );
}

#[test]
fn test_cycle_yields_no_document() {
    let mut asset = BinaryAsset { strings: strings(&["UnityEngine.UIElements.Label"]), ..Default::default() };
    asset.elements = vec![ElementRecord::new(1, 2, 0, 0), ElementRecord::new(2, 1, 0, 0)];
    assert!(matches!(
        export(&asset).unwrap_err().error,
        TransformError::Hierarchy(HierarchyError::HierarchyCycle { .. })
    ));
}

// ============================================================================
// TEMPLATES
// ============================================================================

#[test]
fn test_many_instances_one_declaration() {
    let mut asset = BinaryAsset {
        strings: strings(&["UnityEngine.UIElements.VisualElement", "UnityEngine.UIElements.Instance", "Row", "Row.uxml"]),
        template_usings: vec![TemplateUsing { alias: 2, path: Some(3) }],
        ..Default::default()
    };
    asset.elements.push(ElementRecord::new(1, NO_PARENT, 0, 0));
    for id in 2..5 {
        asset.elements.push(ElementRecord::new(id, 1, id as i32, 1));
        asset.template_bindings.push(TemplateBinding { serial_id: id, alias: 2 });
    }

    let report = export(&asset).unwrap();
    assert!(report.is_clean());
    let text = render(&report.value);
    assert_eq!(text.matches("<ui:Template ").count(), 1);
    assert_eq!(text.matches("template=\"Row\"").count(), 3);
}

#[test]
fn test_binding_for_unknown_element_is_fatal() {
    let asset = BinaryAsset {
        strings: strings(&["UnityEngine.UIElements.Label", "Row"]),
        elements: vec![ElementRecord::new(1, NO_PARENT, 0, 0)],
        template_bindings: vec![TemplateBinding { serial_id: 8, alias: 1 }],
        ..Default::default()
    };
    assert_eq!(
        export(&asset).unwrap_err().error,
        TransformError::Hierarchy(HierarchyError::UnknownTemplateBinding { serial_id: 8 })
    );
}

// ============================================================================
// IDENTITY AND BOOKKEEPING
// ============================================================================

#[test]
fn test_bookkeeping_comes_from_base() {
    let mut base = build_binary_asset(&parse(LAYOUT).unwrap().value, None).unwrap().value;
    for (i, element) in base.elements.iter_mut().enumerate() {
        element.bookkeeping = Bookkeeping { object_id: 9000 + i as i64, flags: 1 };
    }
    base.name = "MainMenu".into();

    let codec = Codec::default();
    let text = codec.export_text(&base).unwrap().value;
    let edited = text.replace("<ui:Button text=\"Go\" vta-id=\"7\" />", "<ui:Button text=\"Go\" vta-id=\"7\" />\n<ui:Button text=\"Stop\" />");
    let rebuilt = codec.import_text(&edited, Some(&base)).unwrap().value;

    assert_eq!(rebuilt.name, "MainMenu");
    assert_eq!(rebuilt.elements.len(), base.elements.len() + 1);
    for element in &base.elements {
        assert_eq!(rebuilt.element(element.serial_id).unwrap().bookkeeping, element.bookkeeping);
    }
    let added = rebuilt.element(1_000_000).unwrap();
    assert_eq!(added.parent_id, 6);
    assert_eq!(added.order_in_document, 1);
    assert_eq!(added.bookkeeping, Bookkeeping::default());
}

#[test]
fn test_fresh_ids_respect_config() {
    let text = "<ui:UXML xmlns:ui=\"UnityEngine.UIElements\">\n<ui:Label vta-id=\"40\" />\n<ui:Label />\n</ui:UXML>";
    let codec = Codec::new(Config { fresh_id_base: 10, ..Config::default() });
    let asset = codec.import_text(text, None).unwrap().value;
    let ids: Vec<i64> = asset.elements.iter().map(|e| e.serial_id).collect();
    assert_eq!(ids, vec![40, 41]);
}

// ============================================================================
// FAILURES AND WARNINGS
// ============================================================================

#[test]
fn test_unresolved_color_is_fatal() {
    let mut asset = build_binary_asset(&parse(LAYOUT).unwrap().value, None).unwrap().value;
    asset.colors.clear();
    assert!(matches!(
        export(&asset).unwrap_err().error,
        TransformError::UnresolvedTableIndex { table: TableKind::Colors, .. }
    ));
}

#[test]
fn test_missing_variable_is_reported_not_fatal() {
    let text = "<ui:UXML xmlns:ui=\"UnityEngine.UIElements\">\n<ui:Label style=\"color: var(--missing)\" />\n</ui:UXML>";
    let codec = Codec::default();
    let asset = codec.import_text(text, None).unwrap().value;
    let report = codec.export_text(&asset).unwrap();
    assert_eq!(
        report.warnings,
        vec![Warning::Style(vta_codec::style::Diagnostic::MissingVariable { name: "missing".into() })]
    );
    assert!(report.value.contains("style=\"color: var(--missing)\""));
}

#[test]
fn test_malformed_markup_is_fatal() {
    let failure = Codec::default().import_text("<ui:UXML xmlns:ui=\"UnityEngine.UIElements\"><ui:Label>", None).unwrap_err();
    assert!(matches!(failure.error, TransformError::Markup(_)));
}

#[test]
fn test_config_from_json() {
    let config = Config::from_json(r#"{ "indent_width": 2, "emit_serial_ids": false }"#).unwrap();
    let text = Codec::new(config)
        .export_text(&BinaryAsset {
            strings: strings(&["UnityEngine.UIElements.Label"]),
            elements: vec![ElementRecord::new(1, NO_PARENT, 0, 0)],
            ..Default::default()
        })
        .unwrap()
        .value;
    assert_eq!(
        text,
        "<ui:UXML xmlns:ui=\"UnityEngine.UIElements\" xmlns:uie=\"UnityEditor.UIElements\">\n  <ui:Label />\n</ui:UXML>\n"
    );
}
