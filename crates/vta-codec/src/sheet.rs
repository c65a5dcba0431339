//! Binary stylesheet translation
//!
//! [`SheetDecoder`] turns the rule/selector arrays of a [`SheetRecord`] back
//! into style rules; [`SheetBuilder`] does the reverse while sharing the
//! asset-wide string and color tables.

use std::collections::HashSet;

use vta_asset::{
    BinaryAsset, ComplexSelectorRecord, DimensionRecord, DimensionUnit, Interner, Relationship, Rgba,
    RuleRecord, SelectorPartKind, SelectorPartRecord, SelectorRecord, SheetPropertyRecord, SheetRecord,
    ValueHandle, ValueKind,
};
use vta_style::{
    Color, Combinator, CompoundSelector, Dimension, PropertyValue, ResourceKind, ResourceRef, Selector,
    SelectorPart, StyleDeclaration, StyleRule, TypedValue, Unit,
};

use crate::TransformError;

/// Reads rules out of an asset's inline sheet
pub struct SheetDecoder<'a> {
    asset: &'a BinaryAsset,
    sheet: &'a SheetRecord,
}

impl<'a> SheetDecoder<'a> {
    pub fn new(asset: &'a BinaryAsset, sheet: &'a SheetRecord) -> Self {
        Self { asset, sheet }
    }

    /// Declarations of rule `index`, in stored order
    pub fn declarations(&self, index: u32) -> Result<Vec<StyleDeclaration>, TransformError> {
        self.sheet
            .rule(index)?
            .properties
            .iter()
            .map(|property| self.declaration(property))
            .collect()
    }

    /// Selector-bound rules. Consecutive complex selectors that share a rule
    /// index form one comma-separated selector list.
    pub fn rules(&self) -> Result<Vec<StyleRule>, TransformError> {
        let mut rules = Vec::new();
        let mut current: Option<(u32, Vec<Selector>)> = None;

        for complex in &self.sheet.complex_selectors {
            let selector = self.selector(complex)?;
            match current.as_mut() {
                Some((index, selectors)) if *index == complex.rule_index => selectors.push(selector),
                _ => {
                    if let Some((index, selectors)) = current.replace((complex.rule_index, vec![selector])) {
                        rules.push(StyleRule { selectors, declarations: self.declarations(index)? });
                    }
                }
            }
        }
        if let Some((index, selectors)) = current {
            rules.push(StyleRule { selectors, declarations: self.declarations(index)? });
        }
        Ok(rules)
    }

    /// Rule indices no selector and no element refers to
    pub fn unreferenced_rules(&self) -> Vec<u32> {
        let mut used: HashSet<u32> = self.sheet.complex_selectors.iter().map(|c| c.rule_index).collect();
        used.extend(self.asset.elements.iter().filter_map(|e| e.rule_index));
        (0..self.sheet.rules.len() as u32).filter(|i| !used.contains(i)).collect()
    }

    fn declaration(&self, property: &SheetPropertyRecord) -> Result<StyleDeclaration, TransformError> {
        let name = self.asset.string(property.name)?.to_string();
        let value = match property.values.as_slice() {
            [] => PropertyValue::Raw(String::new()),
            [handle] if handle.kind == ValueKind::Opaque => {
                PropertyValue::Raw(self.asset.string(handle.index)?.to_string())
            }
            handles => PropertyValue::from_values(
                handles.iter().map(|&handle| self.value(handle)).collect::<Result<_, _>>()?,
            ),
        };
        Ok(StyleDeclaration { property: name, value })
    }

    fn value(&self, handle: ValueHandle) -> Result<TypedValue, TransformError> {
        let string = |index| self.asset.string(index).map(str::to_string);
        Ok(match handle.kind {
            // Opaque text inside a multi-value list can only come back as a keyword.
            ValueKind::Keyword | ValueKind::Opaque => TypedValue::Keyword(string(handle.index)?),
            ValueKind::String => TypedValue::String(string(handle.index)?),
            ValueKind::Float => TypedValue::Number(self.sheet.float(handle.index)?),
            ValueKind::Dimension => {
                let DimensionRecord { value, unit } = self.sheet.dimension(handle.index)?;
                match unit_from_record(unit) {
                    Unit::Unitless => TypedValue::Number(value),
                    unit => TypedValue::Dimension(Dimension::new(value, unit)),
                }
            }
            ValueKind::Color => {
                let Rgba { r, g, b, a } = self.asset.color(handle.index)?;
                TypedValue::Color(Color::rgba(r, g, b, a))
            }
            ValueKind::Url => TypedValue::ResourceRef(ResourceRef::url(string(handle.index)?)),
            ValueKind::Resource => TypedValue::ResourceRef(ResourceRef::resource(string(handle.index)?)),
            ValueKind::Variable => TypedValue::VariableRef(string(handle.index)?),
        })
    }

    fn selector(&self, complex: &ComplexSelectorRecord) -> Result<Selector, TransformError> {
        if complex.selectors.is_empty() || complex.selectors.iter().any(|s| s.parts.is_empty()) {
            return Err(TransformError::EmptySelector { rule_index: complex.rule_index });
        }

        let mut compounds = Vec::with_capacity(complex.selectors.len());
        for (i, record) in complex.selectors.iter().enumerate() {
            // The first compound has no predecessor whatever the record says.
            let combinator = match record.previous_relationship {
                _ if i == 0 => Combinator::None,
                Relationship::Child => Combinator::Child,
                Relationship::Descendant | Relationship::None => Combinator::Descendant,
            };
            let parts = record
                .parts
                .iter()
                .map(|part| self.selector_part(*part))
                .collect::<Result<_, _>>()?;
            compounds.push(CompoundSelector { combinator, parts });
        }
        Ok(Selector { compounds })
    }

    fn selector_part(&self, part: SelectorPartRecord) -> Result<SelectorPart, TransformError> {
        if part.kind == SelectorPartKind::Wildcard {
            return Ok(SelectorPart::Universal);
        }
        let value = self.asset.string(part.value)?.to_string();
        Ok(match part.kind {
            SelectorPartKind::Type => SelectorPart::Type(value),
            SelectorPartKind::Class => SelectorPart::Class(value),
            SelectorPartKind::Name => SelectorPart::Name(value),
            SelectorPartKind::PseudoClass => SelectorPart::PseudoClass(value),
            SelectorPartKind::Wildcard => SelectorPart::Universal,
        })
    }
}

/// Asset-wide tables shared by element records and the sheet
#[derive(Debug, Default)]
pub struct Tables {
    pub strings: Interner<String>,
    pub colors: Interner<Rgba>,
}

/// Builds a [`SheetRecord`] rule by rule
#[derive(Debug, Default)]
pub struct SheetBuilder {
    floats: Interner<f32>,
    dimensions: Interner<DimensionRecord>,
    rules: Vec<RuleRecord>,
    complex_selectors: Vec<ComplexSelectorRecord>,
}

impl SheetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule that no selector refers to (an element's inline style)
    pub fn push_declarations(&mut self, declarations: &[StyleDeclaration], tables: &mut Tables) -> u32 {
        let properties = declarations
            .iter()
            .map(|declaration| SheetPropertyRecord {
                name: tables.strings.intern_str(&declaration.property),
                values: self.encode_value(&declaration.value, tables),
            })
            .collect();
        let index = self.rules.len() as u32;
        self.rules.push(RuleRecord { properties });
        index
    }

    /// Append a rule plus one complex selector per entry of its selector list
    pub fn push_rule(&mut self, rule: &StyleRule, tables: &mut Tables) -> u32 {
        let rule_index = self.push_declarations(&rule.declarations, tables);
        for selector in &rule.selectors {
            let selectors = selector
                .compounds
                .iter()
                .map(|compound| SelectorRecord {
                    parts: compound.parts.iter().map(|part| encode_part(part, tables)).collect(),
                    previous_relationship: match compound.combinator {
                        Combinator::None => Relationship::None,
                        Combinator::Descendant => Relationship::Descendant,
                        Combinator::Child => Relationship::Child,
                    },
                })
                .collect();
            self.complex_selectors.push(ComplexSelectorRecord {
                rule_index,
                specificity: selector.specificity().packed(),
                selectors,
            });
        }
        rule_index
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn finish(self) -> SheetRecord {
        SheetRecord {
            floats: self.floats.into_values(),
            dimensions: self.dimensions.into_values(),
            rules: self.rules,
            complex_selectors: self.complex_selectors,
        }
    }

    fn encode_value(&mut self, value: &PropertyValue, tables: &mut Tables) -> Vec<ValueHandle> {
        match value {
            PropertyValue::Raw(raw) if raw.is_empty() => Vec::new(),
            PropertyValue::Raw(raw) => vec![ValueHandle::new(ValueKind::Opaque, tables.strings.intern_str(raw))],
            typed => typed.values().iter().map(|value| self.encode_typed(value, tables)).collect(),
        }
    }

    fn encode_typed(&mut self, value: &TypedValue, tables: &mut Tables) -> ValueHandle {
        match value {
            TypedValue::Color(color) => {
                let index = tables.colors.intern(Rgba::new(color.r, color.g, color.b, color.a));
                ValueHandle::new(ValueKind::Color, index)
            }
            TypedValue::Dimension(dimension) => {
                let record = DimensionRecord { value: dimension.magnitude, unit: unit_to_record(dimension.unit) };
                ValueHandle::new(ValueKind::Dimension, self.dimensions.intern(record))
            }
            TypedValue::Number(number) => ValueHandle::new(ValueKind::Float, self.floats.intern(*number)),
            TypedValue::Keyword(text) => ValueHandle::new(ValueKind::Keyword, tables.strings.intern_str(text)),
            TypedValue::String(text) => ValueHandle::new(ValueKind::String, tables.strings.intern_str(text)),
            TypedValue::VariableRef(name) => ValueHandle::new(ValueKind::Variable, tables.strings.intern_str(name)),
            TypedValue::ResourceRef(resource) => {
                let kind = match resource.kind {
                    ResourceKind::Url => ValueKind::Url,
                    ResourceKind::Resource => ValueKind::Resource,
                };
                ValueHandle::new(kind, tables.strings.intern_str(&resource.path))
            }
        }
    }
}

fn encode_part(part: &SelectorPart, tables: &mut Tables) -> SelectorPartRecord {
    let (kind, value) = match part {
        SelectorPart::Universal => (SelectorPartKind::Wildcard, "*"),
        SelectorPart::Type(name) => (SelectorPartKind::Type, name.as_str()),
        SelectorPart::Class(name) => (SelectorPartKind::Class, name.as_str()),
        SelectorPart::Name(name) => (SelectorPartKind::Name, name.as_str()),
        SelectorPart::PseudoClass(name) => (SelectorPartKind::PseudoClass, name.as_str()),
    };
    SelectorPartRecord { kind, value: tables.strings.intern_str(value) }
}

fn unit_to_record(unit: Unit) -> DimensionUnit {
    match unit {
        Unit::Unitless => DimensionUnit::Unitless,
        Unit::Px => DimensionUnit::Pixel,
        Unit::Percent => DimensionUnit::Percent,
        Unit::Second => DimensionUnit::Second,
        Unit::Millisecond => DimensionUnit::Millisecond,
        Unit::Degree => DimensionUnit::Degree,
        Unit::Radian => DimensionUnit::Radian,
        Unit::Gradian => DimensionUnit::Gradian,
        Unit::Turn => DimensionUnit::Turn,
    }
}

fn unit_from_record(unit: DimensionUnit) -> Unit {
    match unit {
        DimensionUnit::Unitless => Unit::Unitless,
        DimensionUnit::Pixel => Unit::Px,
        DimensionUnit::Percent => Unit::Percent,
        DimensionUnit::Second => Unit::Second,
        DimensionUnit::Millisecond => Unit::Millisecond,
        DimensionUnit::Degree => Unit::Degree,
        DimensionUnit::Radian => Unit::Radian,
        DimensionUnit::Gradian => Unit::Gradian,
        DimensionUnit::Turn => Unit::Turn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vta_asset::TableKind;
    use vta_style::parse_stylesheet;

    fn encode(css: &str) -> BinaryAsset {
        let mut tables = Tables::default();
        let mut builder = SheetBuilder::new();
        for rule in &parse_stylesheet(css).value {
            builder.push_rule(rule, &mut tables);
        }
        BinaryAsset {
            strings: tables.strings.into_values(),
            colors: tables.colors.into_values(),
            inline_sheet: Some(builder.finish()),
            ..Default::default()
        }
    }

    fn decode(asset: &BinaryAsset) -> Result<Vec<StyleRule>, TransformError> {
        let sheet = asset.inline_sheet.as_ref().expect("sheet");
        SheetDecoder::new(asset, sheet).rules()
    }

    #[test]
    fn test_rule_round_trip() {
        let css = ".title, #root > Label:hover {\n    color: #FF0000;\n    margin: 4px 0.5;\n}\n\n* {\n    background-image: resource(\"Icons/star\");\n    width: var(--w);\n}\n";
        let asset = encode(css);
        let rules = decode(&asset).unwrap();
        assert_eq!(vta_style::serialize_stylesheet(&rules), css);
    }

    #[test]
    fn test_strings_and_escaped_keywords_round_trip() {
        let css = "Unity\\.Label {\n    -unity-font: Roboto\\ Bold \\34 px \\#abc;\n    -unity-font-definition: \"Inter Bold\";\n}\n";
        let asset = encode(css);
        let sheet = asset.inline_sheet.as_ref().unwrap();
        let kinds: Vec<ValueKind> = sheet.rules[0].properties.iter().flat_map(|p| p.values.iter().map(|v| v.kind)).collect();
        assert_eq!(kinds, vec![ValueKind::Keyword, ValueKind::Keyword, ValueKind::Keyword, ValueKind::String]);
        assert!(asset.strings.contains(&"Roboto Bold".to_string()));
        assert!(asset.strings.contains(&"Unity.Label".to_string()));

        let rules = decode(&asset).unwrap();
        assert_eq!(vta_style::serialize_stylesheet(&rules), css);
    }

    #[test]
    fn test_fractional_color_round_trip() {
        let mut asset = encode(".a { color: #FF0000; }");
        asset.colors[0] = Rgba::new(0.3, 0.3, 0.3, 0.5);
        let text = vta_style::serialize_stylesheet(&decode(&asset).unwrap());
        assert!(text.contains("color: rgba(76.5, 76.5, 76.5, 0.5);"), "{text}");
        assert_eq!(encode(&text).colors, vec![Rgba::new(0.3, 0.3, 0.3, 0.5)]);
    }

    #[test]
    fn test_selector_records() {
        let asset = encode("#root > Label { width: 1px; }");
        let sheet = asset.inline_sheet.as_ref().unwrap();
        assert_eq!(sheet.complex_selectors.len(), 1);
        let complex = &sheet.complex_selectors[0];
        assert_eq!(complex.specificity, 10_001);
        assert_eq!(complex.selectors[0].previous_relationship, Relationship::None);
        assert_eq!(complex.selectors[1].previous_relationship, Relationship::Child);
        assert_eq!(sheet.dimensions, vec![DimensionRecord { value: 1.0, unit: DimensionUnit::Pixel }]);
    }

    #[test]
    fn test_shared_tables_dedup() {
        let asset = encode(".a { color: #FF0000; } .b { border-color: #FF0000; margin: 2px 2px; }");
        assert_eq!(asset.colors.len(), 1);
        let sheet = asset.inline_sheet.as_ref().unwrap();
        assert_eq!(sheet.dimensions.len(), 1);
    }

    #[test]
    fn test_raw_values() {
        let asset = encode(".a { width: 3em; content: ; }");
        let rules = decode(&asset).unwrap();
        assert_eq!(rules[0].declarations[0].value, PropertyValue::Raw("3em".into()));
        assert_eq!(rules[0].declarations[1].value, PropertyValue::Raw(String::new()));
    }

    #[test]
    fn test_split_groups_stay_apart() {
        let mut asset = encode(".a { width: 1px; } .b { width: 2px; }");
        let sheet = asset.inline_sheet.as_mut().unwrap();
        // .a, .b, .a again: not consecutive, so three rules
        let again = sheet.complex_selectors[0].clone();
        sheet.complex_selectors.push(again);
        assert_eq!(decode(&asset).unwrap().len(), 3);
    }

    #[test]
    fn test_unresolved_indices() {
        let mut asset = encode(".a { color: #FF0000; }");
        asset.colors.clear();
        assert_eq!(
            decode(&asset),
            Err(TransformError::UnresolvedTableIndex { table: TableKind::Colors, index: 0 })
        );

        let mut asset = encode(".a { color: red; }");
        asset.inline_sheet.as_mut().unwrap().complex_selectors[0].rule_index = 9;
        assert_eq!(
            decode(&asset),
            Err(TransformError::UnresolvedTableIndex { table: TableKind::Rules, index: 9 })
        );
    }

    #[test]
    fn test_unitless_dimension_reads_as_number() {
        let mut asset = encode(".a { flex-grow: 1px; }");
        asset.inline_sheet.as_mut().unwrap().dimensions[0].unit = DimensionUnit::Unitless;
        let rules = decode(&asset).unwrap();
        assert_eq!(rules[0].declarations[0].value, PropertyValue::Single(TypedValue::Number(1.0)));
    }

    #[test]
    fn test_unreferenced_rules() {
        let mut tables = Tables::default();
        let mut builder = SheetBuilder::new();
        builder.push_declarations(&parse_stylesheet(".x { width: 1px; }").value[0].declarations, &mut tables);
        let asset = BinaryAsset {
            strings: tables.strings.into_values(),
            inline_sheet: Some(builder.finish()),
            ..Default::default()
        };
        let sheet = asset.inline_sheet.as_ref().unwrap();
        assert_eq!(SheetDecoder::new(&asset, sheet).unreferenced_rules(), vec![0]);
    }
}
