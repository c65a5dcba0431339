//! Variable Resolution
//!
//! Substitutes `var(--name)` leaves from a [`VariableTable`]. Names the table
//! does not know stay as references and are reported, since they may be
//! defined in a stylesheet this document only links to.

use std::collections::HashMap;

use crate::value::{PropertyValue, TypedValue};
use crate::{Diagnostic, Parsed, StyleDeclaration, StyleRule};

/// Custom property values keyed by name (without the leading `--`)
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    values: HashMap<String, PropertyValue>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect `--name: value` declarations; later definitions win.
    pub fn from_rules(rules: &[StyleRule]) -> Self {
        let mut table = Self::new();
        for declaration in rules.iter().flat_map(|rule| &rule.declarations) {
            if let Some(name) = declaration.property.strip_prefix("--") {
                table.insert(name, declaration.value.clone());
            }
        }
        table
    }

    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn expand(
        &self,
        value: &TypedValue,
        out: &mut Vec<TypedValue>,
        stack: &mut Vec<String>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(name) = value.as_variable() else {
            out.push(value.clone());
            return;
        };

        if stack.iter().any(|seen| seen == name) {
            diagnostics.push(Diagnostic::CyclicVariable { name: name.to_string() });
            out.push(value.clone());
            return;
        }

        match self.get(name) {
            Some(definition) if !definition.is_raw() => {
                stack.push(name.to_string());
                for inner in definition.values() {
                    self.expand(inner, out, stack, diagnostics);
                }
                stack.pop();
            }
            Some(_) => out.push(value.clone()),
            None => {
                diagnostics.push(Diagnostic::MissingVariable { name: name.to_string() });
                out.push(value.clone());
            }
        }
    }
}

/// Resolve every variable reference in `rules`
pub fn resolve(rules: &[StyleRule], variables: &VariableTable) -> Parsed<Vec<StyleRule>> {
    let mut diagnostics = Vec::new();
    let resolved = rules
        .iter()
        .map(|rule| StyleRule {
            selectors: rule.selectors.clone(),
            declarations: rule
                .declarations
                .iter()
                .map(|declaration| resolve_declaration(declaration, variables, &mut diagnostics))
                .collect(),
        })
        .collect();
    Parsed { value: resolved, diagnostics }
}

fn resolve_declaration(
    declaration: &StyleDeclaration,
    variables: &VariableTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> StyleDeclaration {
    if declaration.value.is_raw() {
        return declaration.clone();
    }
    let mut values = Vec::with_capacity(declaration.value.values().len());
    let mut stack = Vec::new();
    for value in declaration.value.values() {
        variables.expand(value, &mut values, &mut stack, diagnostics);
    }
    StyleDeclaration {
        property: declaration.property.clone(),
        value: PropertyValue::from_values(values),
    }
}
