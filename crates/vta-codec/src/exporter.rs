//! Exporter - binary asset to Document
//!
//! Every table index is resolved up front; a dangling one means the asset is
//! corrupt and nothing is returned.

use std::collections::HashSet;

use vta_asset::{BinaryAsset, ElementRecord};
use vta_dom::{reconstruct, Attribute, Document, Element, FlatElement, TemplateBinding, TemplateDeclaration};
use vta_style::{resolve, serialize_declarations, StyleDeclaration, StyleRule, VariableTable};

use crate::error::Warnings;
use crate::sheet::SheetDecoder;
use crate::{Outcome, TransformError, Warning};

/// Converts one binary asset into a Document
pub struct Exporter<'a> {
    asset: &'a BinaryAsset,
    warnings: Warnings,
}

impl<'a> Exporter<'a> {
    pub fn new(asset: &'a BinaryAsset) -> Self {
        Self { asset, warnings: Warnings::default() }
    }

    pub fn export(mut self) -> Outcome<Document> {
        match self.build() {
            Ok(document) => {
                tracing::info!(
                    "Exported `{}`: {} elements, {} warnings",
                    self.asset.name,
                    document.element_count(),
                    self.warnings.len()
                );
                Ok(self.warnings.report(document))
            }
            Err(error) => Err(self.warnings.fail(error)),
        }
    }

    fn build(&mut self) -> Result<Document, TransformError> {
        let asset = self.asset;
        let decoder = asset.inline_sheet.as_ref().map(|sheet| SheetDecoder::new(asset, sheet));
        tracing::debug!(
            "Exporting {} elements, {} strings, {} colors",
            asset.elements.len(),
            asset.strings.len(),
            asset.colors.len()
        );

        let mut styles = Vec::new();
        let mut flat = Vec::with_capacity(asset.elements.len());
        for record in &asset.elements {
            let declarations = match (record.rule_index, decoder.as_ref()) {
                (Some(index), Some(decoder)) => Some(decoder.declarations(index)?),
                (Some(index), None) => {
                    return Err(TransformError::UnresolvedTableIndex { table: vta_asset::TableKind::Rules, index });
                }
                (None, _) => None,
            };
            let element = self.element(record, declarations.as_deref())?;
            if holds_nul(&element) {
                self.warnings.push(Warning::UnrepresentableCharacter { serial_id: record.serial_id });
            }
            flat.push(FlatElement {
                serial_id: record.serial_id,
                parent_id: record.parent_id,
                order_in_document: record.order_in_document,
                element,
            });
            styles.extend(declarations);
        }

        let mut declared_templates = Vec::with_capacity(asset.template_usings.len());
        for using in &asset.template_usings {
            let name = asset.string(using.alias)?.to_string();
            let src = using.path.map(|path| asset.string(path)).transpose()?.map(str::to_string);
            if declared_templates.iter().all(|t: &TemplateDeclaration| t.name != name) {
                declared_templates.push(TemplateDeclaration { name, src });
            }
        }

        let mut bindings = Vec::with_capacity(asset.template_bindings.len());
        let mut missing = HashSet::new();
        for binding in &asset.template_bindings {
            let template = asset.string(binding.alias)?.to_string();
            let declared = declared_templates.iter().any(|t| t.name == template);
            if !declared && missing.insert(template.clone()) {
                self.warnings.push(Warning::MissingTemplateTarget { template: template.clone() });
            }
            bindings.push(TemplateBinding { serial_id: binding.serial_id, template });
        }

        let stylesheet_references = asset
            .stylesheets
            .iter()
            .map(|&index| asset.string(index).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        let inline_style_rules = match decoder.as_ref() {
            Some(decoder) => {
                for rule_index in decoder.unreferenced_rules() {
                    self.warnings.push(Warning::UnreferencedRule { rule_index });
                }
                let rules = decoder.rules()?;
                self.check_variables(&rules, &styles);
                Some(rules).filter(|rules| !rules.is_empty())
            }
            None => None,
        };

        let root = reconstruct(flat, &bindings, &mut declared_templates)?;

        Ok(Document {
            root,
            declared_templates,
            stylesheet_references,
            inline_style_rules,
            ..Document::default()
        })
    }

    /// Attributes in authored order: `name`, `class`, `style`, then the rest
    fn element(&self, record: &ElementRecord, style: Option<&[StyleDeclaration]>) -> Result<Element, TransformError> {
        let asset = self.asset;
        let mut element = Element::new(asset.string(record.type_name)?);
        if let Some(text) = record.text {
            element.text = Some(asset.string(text)?.to_string());
        }

        if let Some(name) = record.name {
            element.attributes.push(Attribute::new("name", asset.string(name)?));
        }
        if !record.classes.is_empty() {
            let classes = record
                .classes
                .iter()
                .map(|&index| asset.string(index))
                .collect::<Result<Vec<_>, _>>()?;
            element.attributes.push(Attribute::new("class", classes.join(" ")));
        }
        if let Some(declarations) = style {
            element.attributes.push(Attribute::new("style", serialize_declarations(declarations)));
        }
        for property in &record.properties {
            element
                .attributes
                .push(Attribute::new(asset.string(property.name)?, asset.string(property.value)?));
        }
        Ok(element)
    }

    /// Report variable references the inline sheet cannot satisfy. The
    /// references themselves are kept; the definitions may live in a linked
    /// stylesheet.
    fn check_variables(&mut self, rules: &[StyleRule], styles: &[Vec<StyleDeclaration>]) {
        let table = VariableTable::from_rules(rules);
        let element_rules: Vec<StyleRule> = styles
            .iter()
            .map(|declarations| StyleRule { selectors: Vec::new(), declarations: declarations.clone() })
            .collect();

        let mut seen = Vec::new();
        for diagnostic in [rules, element_rules.as_slice()]
            .into_iter()
            .flat_map(|rules| resolve(rules, &table).diagnostics)
        {
            if !seen.contains(&diagnostic) {
                seen.push(diagnostic.clone());
                self.warnings.push(diagnostic);
            }
        }
    }
}

/// NUL has no character reference; the renderer substitutes U+FFFD
fn holds_nul(element: &Element) -> bool {
    element.text.as_deref().is_some_and(|text| text.contains('\0'))
        || element.attributes.iter().any(|a| a.name.contains('\0') || a.value.contains('\0'))
}

/// Convert a binary asset into a Document
pub fn export(asset: &BinaryAsset) -> Outcome<Document> {
    Exporter::new(asset).export()
}
