//! UXML Parser implementation
//!
//! Event-driven on top of quick-xml. Every element is classified once, as
//! soon as its start tag is read, and declarations are diverted into the
//! document lists wherever they appear.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use vta_dom::{default_namespaces, Attribute, Document, Element, Namespace, UI_NAMESPACE};
use vta_style::{parse_declarations, parse_stylesheet, serialize_declarations, Diagnostic, Parsed};

use crate::{is_xml_space, ElementKind, MarkupError, SERIAL_ID_ATTRIBUTE};

/// UXML parser
#[derive(Debug, Clone, Copy, Default)]
pub struct UxmlParser;

enum Frame {
    Wrapper { raw: String },
    Ordinary { raw: String, element: Element },
    Declaration { raw: String },
    InlineStylesheet { raw: String, body: String, line_offset: usize },
}

impl Frame {
    fn raw(&self) -> &str {
        match self {
            Self::Wrapper { raw }
            | Self::Ordinary { raw, .. }
            | Self::Declaration { raw }
            | Self::InlineStylesheet { raw, .. } => raw,
        }
    }
}

/// Tag read from the input, before classification
struct Tag {
    raw: String,
    type_name: String,
    attributes: Vec<Attribute>,
}

struct State<'a> {
    text: &'a str,
    document: Document,
    stack: Vec<Frame>,
    seen_wrapper: bool,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl UxmlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse markup into a Document plus value diagnostics
    pub fn parse(&self, text: &str) -> Result<Parsed<Document>, MarkupError> {
        let mut diagnostics = Vec::new();
        let document = self.parse_into(text, &mut diagnostics)?;
        Ok(Parsed { value: document, diagnostics })
    }

    /// Parse markup, appending diagnostics to `diagnostics` as they are found
    /// so they survive a later fatal error.
    pub fn parse_into(&self, text: &str, diagnostics: &mut Vec<Diagnostic>) -> Result<Document, MarkupError> {
        check_characters(text)?;

        let mut reader = Reader::from_str(text);
        reader.config_mut().check_end_names = false;
        let mut state = State {
            text,
            document: Document { namespaces: Vec::new(), ..Document::default() },
            stack: Vec::new(),
            seen_wrapper: false,
            diagnostics,
        };

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader
                .read_event()
                .map_err(|e| MarkupError::at(text, reader.error_position() as usize, e.to_string()))?;
            let end = reader.buffer_position() as usize;

            match event {
                Event::Start(tag) => {
                    let tag = state.read_tag(&tag, start)?;
                    state.open(tag, start, end, false)?;
                }
                Event::Empty(tag) => {
                    let tag = state.read_tag(&tag, start)?;
                    state.open(tag, start, end, true)?;
                }
                Event::End(tag) => {
                    let raw = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                    state.close(&raw, start)?;
                }
                Event::Text(content) => {
                    let raw = String::from_utf8_lossy(&content).into_owned();
                    state.text_content(&raw, start)?;
                }
                Event::CData(content) => {
                    let content = String::from_utf8_lossy(&content).into_owned();
                    state.character_data(&content, start)?;
                }
                Event::Eof => break,
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }

        if let Some(frame) = state.stack.last() {
            return Err(MarkupError::at(text, text.len(), format!("unclosed element <{}>", frame.raw())));
        }
        if !state.seen_wrapper {
            return Err(MarkupError::at(text, text.len(), "missing <UXML> root wrapper"));
        }

        let mut document = state.document;
        if document.namespaces.is_empty() {
            document.namespaces = default_namespaces();
        }
        tracing::debug!(
            "Parsed UXML: {} elements, {} templates, {} stylesheets",
            document.element_count(),
            document.declared_templates.len(),
            document.stylesheet_references.len()
        );
        Ok(document)
    }
}

impl State<'_> {
    fn read_tag(&mut self, tag: &BytesStart<'_>, offset: usize) -> Result<Tag, MarkupError> {
        let raw = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in tag.attributes() {
            let attribute = attribute.map_err(|e| MarkupError::at(self.text, offset, e.to_string()))?;
            let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| MarkupError::at(self.text, offset, e.to_string()))?;
            attributes.push(Attribute { name, value: value.into_owned() });
        }

        // The wrapper declares the namespaces its own name may use.
        if self.stack.is_empty() && !self.seen_wrapper {
            for attribute in &attributes {
                if let Some(prefix) = namespace_prefix(&attribute.name) {
                    self.document.namespaces.push(Namespace::new(prefix, attribute.value.as_str()));
                }
            }
        }

        let type_name = self.resolve_type(&raw, offset)?;
        Ok(Tag { raw, type_name, attributes })
    }

    /// Full dotted type name of a tag name
    fn resolve_type(&self, raw: &str, offset: usize) -> Result<String, MarkupError> {
        if let Some((prefix, local)) = raw.split_once(':') {
            let Some(uri) = self.document.namespace_uri(prefix) else {
                return Err(MarkupError::at(self.text, offset, format!("undeclared namespace prefix `{prefix}`")));
            };
            return Ok(qualify(uri, local));
        }
        match self.document.namespace_uri("") {
            Some(uri) if !raw.contains('.') => Ok(qualify(uri, raw)),
            _ => Ok(raw.to_string()),
        }
    }

    fn open(&mut self, tag: Tag, start: usize, end: usize, empty: bool) -> Result<(), MarkupError> {
        let kind = match self.stack.last() {
            None if self.seen_wrapper => {
                return Err(MarkupError::at(self.text, start, format!("<{}> outside the root wrapper", tag.raw)));
            }
            None if ElementKind::is_wrapper(&tag.type_name) => ElementKind::Wrapper,
            None => {
                return Err(MarkupError::at(self.text, start, format!("expected <UXML> root wrapper, found <{}>", tag.raw)));
            }
            Some(Frame::Declaration { raw } | Frame::InlineStylesheet { raw, .. }) => {
                return Err(MarkupError::at(self.text, start, format!("<{}> cannot contain <{}>", raw, tag.raw)));
            }
            Some(Frame::Wrapper { .. } | Frame::Ordinary { .. }) => {
                ElementKind::classify(&tag.type_name, &tag.attributes)
            }
        };

        let frame = match kind {
            ElementKind::Wrapper => {
                self.seen_wrapper = true;
                self.document.wrapper_attributes = tag
                    .attributes
                    .into_iter()
                    .filter(|a| namespace_prefix(&a.name).is_none())
                    .collect();
                Frame::Wrapper { raw: tag.raw }
            }
            ElementKind::Ordinary => {
                let element = self.build_element(tag.type_name, tag.attributes, start)?;
                Frame::Ordinary { raw: tag.raw, element }
            }
            ElementKind::TemplateDeclaration => {
                let name = attribute(&tag.attributes, "name").unwrap_or_default();
                if name.is_empty() {
                    return Err(MarkupError::at(self.text, start, "template declaration without a name"));
                }
                let src = source_path(&tag.attributes).map(str::to_string);
                if !self.document.declare_template(name, src) {
                    tracing::debug!("Template `{}` declared more than once", name);
                }
                Frame::Declaration { raw: tag.raw }
            }
            ElementKind::StylesheetReference => {
                let src = source_path(&tag.attributes).unwrap_or_default();
                self.document.stylesheet_references.push(src.to_string());
                Frame::Declaration { raw: tag.raw }
            }
            ElementKind::InlineStylesheet => {
                self.document.inline_style_rules.get_or_insert_with(Vec::new);
                Frame::InlineStylesheet {
                    raw: tag.raw,
                    body: String::new(),
                    line_offset: line_column(self.text, end).0 - 1,
                }
            }
        };

        self.stack.push(frame);
        if empty {
            let raw = self.stack.last().map(|f| f.raw().to_string()).unwrap_or_default();
            self.close(&raw, start)?;
        }
        Ok(())
    }

    fn close(&mut self, raw: &str, offset: usize) -> Result<(), MarkupError> {
        let Some(frame) = self.stack.pop() else {
            return Err(MarkupError::at(self.text, offset, format!("unexpected closing tag </{raw}>")));
        };
        if frame.raw() != raw {
            return Err(MarkupError::at(
                self.text,
                offset,
                format!("expected </{}>, found </{raw}>", frame.raw()),
            ));
        }

        match frame {
            Frame::Ordinary { element, .. } => match self.stack.last_mut() {
                Some(Frame::Ordinary { element: parent, .. }) => parent.children.push(element),
                _ => self.document.root.push(element),
            },
            Frame::InlineStylesheet { body, line_offset, .. } => {
                let parsed = parse_stylesheet(&body);
                self.diagnostics
                    .extend(parsed.diagnostics.into_iter().map(|d| d.offset_lines(line_offset)));
                if let Some(rules) = self.document.inline_style_rules.as_mut() {
                    rules.extend(parsed.value);
                }
            }
            Frame::Wrapper { .. } | Frame::Declaration { .. } => {}
        }
        Ok(())
    }

    /// Escaped text between tags. Inside an ordinary element the layout
    /// whitespace around it is dropped before references are expanded.
    fn text_content(&mut self, raw: &str, offset: usize) -> Result<(), MarkupError> {
        let (raw, offset) = match self.stack.last() {
            Some(Frame::Ordinary { .. }) => {
                let trimmed = raw.trim_start_matches(is_xml_space);
                (trimmed.trim_end_matches(is_xml_space), offset + raw.len() - trimmed.len())
            }
            _ => (raw, offset),
        };
        let content = unescape(raw).map_err(|e| MarkupError::at(self.text, offset, e.to_string()))?;
        self.character_data(&content, offset)
    }

    fn character_data(&mut self, content: &str, offset: usize) -> Result<(), MarkupError> {
        match self.stack.last_mut() {
            Some(Frame::InlineStylesheet { body, .. }) => body.push_str(content),
            Some(Frame::Ordinary { element, .. }) => {
                if !content.is_empty() {
                    element.text.get_or_insert_with(String::new).push_str(content);
                }
            }
            _ => {
                if let Some((at, _)) = content.char_indices().find(|(_, c)| !c.is_whitespace()) {
                    return Err(MarkupError::at(self.text, offset + at, "unexpected text content"));
                }
            }
        }
        Ok(())
    }

    fn build_element(
        &mut self,
        type_name: String,
        attributes: Vec<Attribute>,
        offset: usize,
    ) -> Result<Element, MarkupError> {
        let line = line_column(self.text, offset).0;
        let mut element = Element::new(type_name);

        for Attribute { name, value } in attributes {
            match name.as_str() {
                SERIAL_ID_ATTRIBUTE => {
                    let id = value.trim().parse::<i64>().map_err(|_| {
                        MarkupError::at(self.text, offset, format!("invalid {SERIAL_ID_ATTRIBUTE} `{value}`"))
                    })?;
                    element.serial_id = Some(id);
                }
                "template" => element.template_reference = Some(value),
                "class" => {
                    let classes: Vec<&str> = value.split_whitespace().collect();
                    element.attributes.push(Attribute { name, value: classes.join(" ") });
                }
                "style" => {
                    let parsed = parse_declarations(&value);
                    let value = if parsed.diagnostics.is_empty() {
                        serialize_declarations(&parsed.value)
                    } else {
                        self.diagnostics
                            .extend(parsed.diagnostics.into_iter().map(|d| d.offset_lines(line - 1)));
                        value
                    };
                    element.attributes.push(Attribute { name, value });
                }
                _ => element.attributes.push(Attribute { name, value }),
            }
        }
        Ok(element)
    }
}

impl ElementKind {
    fn is_wrapper(type_name: &str) -> bool {
        type_name == "UXML" || type_name == ui_type("UXML")
    }

    /// Classify a non-wrapper element
    pub fn classify(type_name: &str, attributes: &[Attribute]) -> Self {
        let local = match type_name.rsplit_once('.') {
            Some((namespace, local)) if namespace == UI_NAMESPACE => local,
            Some(_) => return Self::Ordinary,
            None => type_name,
        };
        match local {
            "Template" => Self::TemplateDeclaration,
            "Style" if source_path(attributes).is_some() => Self::StylesheetReference,
            "Style" => Self::InlineStylesheet,
            _ => Self::Ordinary,
        }
    }
}

fn ui_type(local: &str) -> String {
    qualify(UI_NAMESPACE, local)
}

fn qualify(namespace: &str, local: &str) -> String {
    if namespace.is_empty() {
        local.to_string()
    } else {
        format!("{namespace}.{local}")
    }
}

fn attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes.iter().find(|a| a.name == name).map(|a| a.value.as_str())
}

/// `src`, or the older `path` spelling
fn source_path(attributes: &[Attribute]) -> Option<&str> {
    attribute(attributes, "src").or_else(|| attribute(attributes, "path"))
}

/// `xmlns:ui` → `ui`, `xmlns` → ``
fn namespace_prefix(name: &str) -> Option<&str> {
    if name == "xmlns" {
        return Some("");
    }
    name.strip_prefix("xmlns:")
}

fn check_characters(text: &str) -> Result<(), MarkupError> {
    let illegal = text
        .char_indices()
        .find(|&(_, c)| (c.is_control() && !matches!(c, '\t' | '\n' | '\r')) || matches!(c, '\u{FFFE}' | '\u{FFFF}'));
    match illegal {
        Some((offset, c)) => Err(MarkupError::at(text, offset, format!("illegal character U+{:04X}", c as u32))),
        None => Ok(()),
    }
}

/// 1-based line and column (in characters) of a byte offset
pub(crate) fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count() + 1)
}
