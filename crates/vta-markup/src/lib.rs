//! VTA Markup
//!
//! UXML text to [`Document`] and back.

mod parser;
mod renderer;

use vta_dom::Document;
use vta_style::Parsed;

pub use parser::UxmlParser;
pub use renderer::{qualified_name, RenderOptions, UxmlRenderer};

/// Attribute carrying an element's serial id in text
pub const SERIAL_ID_ATTRIBUTE: &str = "vta-id";

/// Parse a UXML string
pub fn parse(text: &str) -> Result<Parsed<Document>, MarkupError> {
    UxmlParser::new().parse(text)
}

/// Render a document with the given options
pub fn render(document: &Document, options: RenderOptions) -> String {
    UxmlRenderer::new(options).render(document)
}

/// Whitespace as XML defines it
pub(crate) fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Role of an element in the markup, decided once per start tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// The single `<UXML>` root
    Wrapper,
    Ordinary,
    /// `<Template name=... src=...>`
    TemplateDeclaration,
    /// `<Style src=...>`
    StylesheetReference,
    /// `<Style>` with a rule body
    InlineStylesheet,
}

/// Markup error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("Malformed markup at {line}:{column}: {message}")]
    MalformedMarkup { line: usize, column: usize, message: String },
}

impl MarkupError {
    pub(crate) fn at(text: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = parser::line_column(text, offset);
        Self::MalformedMarkup { line, column, message: message.into() }
    }
}
