//! VTA Style System
//!
//! USS parsing, typed values, variable resolution and canonical
//! serialization.

mod parser;
mod resolve;
mod selectors;
mod serializer;
mod tokens;
pub mod value;

use std::fmt;

pub use parser::StyleParser;
pub use resolve::{resolve, VariableTable};
pub use selectors::{Combinator, CompoundSelector, Selector, SelectorPart, Specificity};
pub use serializer::{serialize_declarations, serialize_stylesheet, DECLARATION_INDENT};
pub use value::{
    canonicalize, Color, Dimension, PropertyValue, ResourceKind, ResourceRef, TypedValue, Unit,
    UnrecognizedValue,
};

/// Parse a USS stylesheet
pub fn parse_stylesheet(css: &str) -> Parsed<Vec<StyleRule>> {
    StyleParser::new().parse(css)
}

/// Parse the body of an element `style` attribute
pub fn parse_declarations(block: &str) -> Parsed<Vec<StyleDeclaration>> {
    StyleParser::new().parse_declarations(block)
}

/// Style rule
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<StyleDeclaration>,
}

/// Property declaration (property: value)
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDeclaration {
    pub property: String,
    pub value: PropertyValue,
}

impl StyleDeclaration {
    pub fn new(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self { property: property.into(), value: value.into() }
    }
}

impl fmt::Display for StyleDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "{}:", self.property)
        } else {
            write!(f, "{}: {}", self.property, self.value)
        }
    }
}

/// A result that carries non-fatal diagnostics alongside the value
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Parsed<T> {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Non-fatal style problem
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    #[error("malformed declaration at line {line}: `{raw}`")]
    MalformedDeclaration { raw: String, line: usize },

    #[error("malformed selector at line {line}: `{raw}`")]
    MalformedSelector { raw: String, line: usize },

    #[error("unrecognized value for `{property}` at line {line}: `{raw}`")]
    UnrecognizedValue { property: String, raw: String, line: usize },

    #[error("variable `--{name}` is not defined")]
    MissingVariable { name: String },

    #[error("variable `--{name}` refers to itself")]
    CyclicVariable { name: String },
}

impl Diagnostic {
    /// Source line, for diagnostics that have one
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedDeclaration { line, .. }
            | Self::MalformedSelector { line, .. }
            | Self::UnrecognizedValue { line, .. } => Some(*line),
            Self::MissingVariable { .. } | Self::CyclicVariable { .. } => None,
        }
    }

    /// Shift line numbers by `lines`, for text embedded in a larger document.
    pub fn offset_lines(mut self, lines: usize) -> Self {
        match &mut self {
            Self::MalformedDeclaration { line, .. }
            | Self::MalformedSelector { line, .. }
            | Self::UnrecognizedValue { line, .. } => *line += lines,
            Self::MissingVariable { .. } | Self::CyclicVariable { .. } => {}
        }
        self
    }

    /// Raised by variable resolution rather than by parsing
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::MissingVariable { .. } | Self::CyclicVariable { .. })
    }
}
