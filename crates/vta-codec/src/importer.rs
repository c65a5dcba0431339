//! Importer - Document to binary asset
//!
//! Flattens the element trees, interns every literal into the shared tables
//! and compiles style text into the inline sheet. An optional base asset
//! supplies the bookkeeping that markup cannot carry.

use std::collections::{HashMap, HashSet};

use vta_asset::{BinaryAsset, Bookkeeping, ElementRecord, PropertyRecord, TemplateBinding, TemplateUsing};
use vta_dom::{flatten, Document, FlatNode};
use vta_style::parse_declarations;

use crate::error::Warnings;
use crate::sheet::{SheetBuilder, Tables};
use crate::{Config, Outcome, Warning};

/// Converts one Document into a binary asset
pub struct Importer<'a> {
    document: &'a Document,
    base: Option<&'a BinaryAsset>,
    fresh_id_base: i64,
    tables: Tables,
    sheet: SheetBuilder,
    warnings: Warnings,
}

impl<'a> Importer<'a> {
    pub fn new(document: &'a Document, base: Option<&'a BinaryAsset>, config: &Config) -> Self {
        Self {
            document,
            base,
            fresh_id_base: config.fresh_id_base,
            tables: Tables::default(),
            sheet: SheetBuilder::new(),
            warnings: Warnings::default(),
        }
    }

    pub fn import(mut self) -> Outcome<BinaryAsset> {
        let document = self.document;
        let flattened = flatten(&document.root, self.fresh_id_base);
        for reminted in &flattened.reminted {
            self.warnings.push(Warning::DuplicateSerialId {
                original: reminted.original,
                assigned: reminted.assigned,
            });
        }

        // Selector rules come first so their indices do not depend on elements.
        for rule in document.inline_style_rules.iter().flatten() {
            self.sheet.push_rule(rule, &mut self.tables);
        }

        let bookkeeping: HashMap<i64, Bookkeeping> = self
            .base
            .map(|base| base.elements.iter().map(|e| (e.serial_id, e.bookkeeping)).collect())
            .unwrap_or_default();

        let mut elements = Vec::with_capacity(flattened.nodes.len());
        let mut template_bindings = Vec::new();
        let mut missing = HashSet::new();
        for node in &flattened.nodes {
            let mut record = self.element(node);
            if let Some(kept) = bookkeeping.get(&node.serial_id) {
                record.bookkeeping = *kept;
            }
            elements.push(record);

            if let Some(template) = node.element.template_reference.as_deref() {
                if document.template(template).is_none() && missing.insert(template) {
                    self.warnings.push(Warning::MissingTemplateTarget { template: template.to_string() });
                }
                template_bindings.push(TemplateBinding {
                    serial_id: node.serial_id,
                    alias: self.tables.strings.intern_str(template),
                });
            }
        }

        let template_usings = document
            .declared_templates
            .iter()
            .map(|template| TemplateUsing {
                alias: self.tables.strings.intern_str(&template.name),
                path: template.src.as_deref().map(|src| self.tables.strings.intern_str(src)),
            })
            .collect();
        let stylesheets = document
            .stylesheet_references
            .iter()
            .map(|path| self.tables.strings.intern_str(path))
            .collect();

        let inline_sheet = (document.inline_style_rules.is_some() || !self.sheet.is_empty())
            .then(|| self.sheet.finish());
        let (name, content_hash) = self
            .base
            .map(|base| (base.name.clone(), base.content_hash.clone()))
            .unwrap_or_default();

        let asset = BinaryAsset {
            name,
            content_hash,
            strings: self.tables.strings.into_values(),
            colors: self.tables.colors.into_values(),
            elements,
            template_bindings,
            template_usings,
            stylesheets,
            inline_sheet,
        };
        tracing::info!(
            "Built asset: {} elements ({} new ids), {} strings, {} warnings",
            asset.elements.len(),
            flattened.minted,
            asset.strings.len(),
            self.warnings.len()
        );
        Ok(self.warnings.report(asset))
    }

    fn element(&mut self, node: &FlatNode<'_>) -> ElementRecord {
        let element = node.element;
        let type_name = self.tables.strings.intern_str(&element.type_name);
        let mut record = ElementRecord::new(node.serial_id, node.parent_id, node.order_in_document, type_name);
        record.text = element.text.as_deref().map(|text| self.tables.strings.intern_str(text));

        for attribute in &element.attributes {
            match attribute.name.as_str() {
                "name" => record.name = Some(self.tables.strings.intern_str(&attribute.value)),
                "class" => {
                    record.classes = attribute
                        .value
                        .split_whitespace()
                        .map(|class| self.tables.strings.intern_str(class))
                        .collect();
                }
                "style" => {
                    let parsed = parse_declarations(&attribute.value);
                    self.warnings.extend(parsed.diagnostics);
                    record.rule_index = Some(self.sheet.push_declarations(&parsed.value, &mut self.tables));
                }
                name => {
                    let property = PropertyRecord {
                        name: self.tables.strings.intern_str(name),
                        value: self.tables.strings.intern_str(&attribute.value),
                    };
                    record.properties.push(property);
                }
            }
        }
        record
    }
}

/// Convert a Document into a binary asset
pub fn build_binary_asset(document: &Document, base: Option<&BinaryAsset>, config: &Config) -> Outcome<BinaryAsset> {
    Importer::new(document, base, config).import()
}
