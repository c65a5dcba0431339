//! Document - High-level document API

use vta_style::StyleRule;

use crate::{Attribute, Element};

/// Runtime element namespace
pub const UI_NAMESPACE: &str = "UnityEngine.UIElements";
/// Editor-only element namespace
pub const EDITOR_NAMESPACE: &str = "UnityEditor.UIElements";

/// Named, reusable subtree referenced by instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDeclaration {
    pub name: String,
    /// Path of the template asset, if known
    pub src: Option<String>,
}

/// `xmlns:prefix="uri"` declaration on the root wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub prefix: String,
    pub uri: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), uri: uri.into() }
    }
}

/// Visual tree document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Top-level elements, in order
    pub root: Vec<Element>,
    pub declared_templates: Vec<TemplateDeclaration>,
    pub stylesheet_references: Vec<String>,
    /// Embedded rule set, present only when the source carried one
    pub inline_style_rules: Option<Vec<StyleRule>>,
    pub namespaces: Vec<Namespace>,
    /// Non-namespace attributes of the root wrapper
    pub wrapper_attributes: Vec<Attribute>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            root: Vec::new(),
            declared_templates: Vec::new(),
            stylesheet_references: Vec::new(),
            inline_style_rules: None,
            namespaces: default_namespaces(),
            wrapper_attributes: Vec::new(),
        }
    }
}

/// `ui` and `uie`
pub fn default_namespaces() -> Vec<Namespace> {
    vec![Namespace::new("ui", UI_NAMESPACE), Namespace::new("uie", EDITOR_NAMESPACE)]
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every element, pre-order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.root.iter().flat_map(Element::descendants)
    }

    pub fn element_count(&self) -> usize {
        self.elements().count()
    }

    pub fn find_by_serial_id(&self, serial_id: i64) -> Option<&Element> {
        self.elements().find(|e| e.serial_id == Some(serial_id))
    }

    pub fn template(&self, name: &str) -> Option<&TemplateDeclaration> {
        self.declared_templates.iter().find(|t| t.name == name)
    }

    /// Declare a template unless one with that name exists. Returns `true`
    /// when a new declaration was added.
    pub fn declare_template(&mut self, name: &str, src: Option<String>) -> bool {
        declare(&mut self.declared_templates, name, src)
    }

    /// Namespace URI bound to `prefix`
    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.namespaces.iter().find(|ns| ns.prefix == prefix).map(|ns| ns.uri.as_str())
    }

    /// First prefix bound to `uri`
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.namespaces.iter().find(|ns| ns.uri == uri).map(|ns| ns.prefix.as_str())
    }
}

pub(crate) fn declare(templates: &mut Vec<TemplateDeclaration>, name: &str, src: Option<String>) -> bool {
    if templates.iter().any(|t| t.name == name) {
        return false;
    }
    templates.push(TemplateDeclaration { name: name.to_string(), src });
    true
}
