//! Canonical UXML rendering
//!
//! Output depends only on the document: fixed attribute order, fixed
//! indentation, `\n` line endings and a final newline.

use vta_dom::{Document, Element, Namespace, UI_NAMESPACE};
use vta_style::serialize_stylesheet;

use crate::{is_xml_space, SERIAL_ID_ATTRIBUTE};

/// Attributes rendered ahead of all others, in this order
const LEADING_ATTRIBUTES: [&str; 3] = ["name", "class", "style"];

enum Step<'a> {
    Open(&'a Element, usize),
    Close(String, usize),
}

/// Renderer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Spaces per nesting level
    pub indent_width: usize,
    /// Write each element's serial id as a `vta-id` attribute
    pub emit_serial_ids: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { indent_width: 4, emit_serial_ids: true }
    }
}

/// UXML renderer
#[derive(Debug, Clone, Default)]
pub struct UxmlRenderer {
    options: RenderOptions,
}

impl UxmlRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn render(&self, document: &Document) -> String {
        let mut out = String::new();
        let wrapper = element_name(document, "UXML");

        out.push('<');
        out.push_str(&wrapper);
        for Namespace { prefix, uri } in &document.namespaces {
            if prefix.is_empty() {
                push_attribute(&mut out, "xmlns", uri);
            } else {
                push_attribute(&mut out, &format!("xmlns:{prefix}"), uri);
            }
        }
        for attribute in &document.wrapper_attributes {
            push_attribute(&mut out, &attribute.name, &attribute.value);
        }
        out.push_str(">\n");

        let template = element_name(document, "Template");
        for declaration in &document.declared_templates {
            self.indent(&mut out, 1);
            out.push('<');
            out.push_str(&template);
            push_attribute(&mut out, "name", &declaration.name);
            if let Some(src) = &declaration.src {
                push_attribute(&mut out, "src", src);
            }
            out.push_str(" />\n");
        }

        let style = element_name(document, "Style");
        for src in &document.stylesheet_references {
            self.indent(&mut out, 1);
            out.push('<');
            out.push_str(&style);
            push_attribute(&mut out, "src", src);
            out.push_str(" />\n");
        }

        self.render_elements(document, &mut out);

        if let Some(rules) = &document.inline_style_rules {
            self.indent(&mut out, 1);
            if rules.is_empty() {
                out.push_str(&format!("<{style} />\n"));
            } else {
                let css = serialize_stylesheet(rules);
                out.push_str(&format!("<{style}>"));
                if css.contains("]]>") {
                    out.push('\n');
                    escape_text(&css, &mut out);
                } else {
                    out.push_str("<![CDATA[\n");
                    out.push_str(&css);
                    out.push_str("]]>");
                }
                out.push_str(&format!("</{style}>\n"));
            }
        }

        out.push_str(&format!("</{wrapper}>\n"));
        out
    }

    /// Pre-order walk over an explicit stack; closing tags are queued behind
    /// the children they wrap.
    fn render_elements(&self, document: &Document, out: &mut String) {
        let mut steps: Vec<Step<'_>> = document.root.iter().rev().map(|element| Step::Open(element, 1)).collect();

        while let Some(step) = steps.pop() {
            match step {
                Step::Open(element, depth) => {
                    let name = qualified_name(document, &element.type_name);
                    self.indent(out, depth);
                    self.start_tag(element, &name, out);

                    let text = element.text.as_deref().filter(|text| !text.is_empty());
                    match (text, element.children.is_empty()) {
                        (None, true) => out.push_str(" />\n"),
                        (Some(text), true) => {
                            out.push('>');
                            escape_element_text(text, out);
                            out.push_str(&format!("</{name}>\n"));
                        }
                        (text, false) => {
                            out.push('>');
                            if let Some(text) = text {
                                escape_element_text(text, out);
                            }
                            out.push('\n');
                            steps.push(Step::Close(name, depth));
                            steps.extend(element.children.iter().rev().map(|child| Step::Open(child, depth + 1)));
                        }
                    }
                }
                Step::Close(name, depth) => {
                    self.indent(out, depth);
                    out.push_str(&format!("</{name}>\n"));
                }
            }
        }
    }

    /// `<name` and the attributes, without the closing bracket
    fn start_tag(&self, element: &Element, name: &str, out: &mut String) {
        out.push('<');
        out.push_str(name);
        for leading in LEADING_ATTRIBUTES {
            if let Some(value) = element.attribute(leading) {
                push_attribute(out, leading, value);
            }
        }
        if let Some(template) = &element.template_reference {
            push_attribute(out, "template", template);
        }
        for attribute in &element.attributes {
            if !LEADING_ATTRIBUTES.contains(&attribute.name.as_str()) {
                push_attribute(out, &attribute.name, &attribute.value);
            }
        }
        if self.options.emit_serial_ids {
            if let Some(serial_id) = element.serial_id {
                push_attribute(out, SERIAL_ID_ATTRIBUTE, &serial_id.to_string());
            }
        }
    }

    fn indent(&self, out: &mut String, depth: usize) {
        out.extend(std::iter::repeat_n(' ', depth * self.options.indent_width));
    }
}

/// Tag name for a type: `prefix:Local` when a declared namespace matches,
/// otherwise the full dotted name.
pub fn qualified_name(document: &Document, type_name: &str) -> String {
    if let Some((namespace, local)) = type_name.rsplit_once('.') {
        match document.prefix_for(namespace) {
            Some("") => return local.to_string(),
            Some(prefix) => return format!("{prefix}:{local}"),
            None => {}
        }
    }
    type_name.to_string()
}

fn element_name(document: &Document, local: &str) -> String {
    qualified_name(document, &format!("{UI_NAMESPACE}.{local}"))
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_attribute(value, out);
    out.push('"');
}

/// Escape character data
fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            c => push_char(c, out),
        }
    }
}

/// Escape element text. The parser trims layout whitespace around text, so
/// whitespace at either edge is written as character references.
fn escape_element_text(text: &str, out: &mut String) {
    let start = text.len() - text.trim_start_matches(is_xml_space).len();
    let end = text.trim_end_matches(is_xml_space).len().max(start);
    for c in text[..start].chars() {
        push_reference(c, out);
    }
    escape_text(&text[start..end], out);
    for c in text[end..].chars() {
        push_reference(c, out);
    }
}

/// Escape an attribute value; whitespace other than spaces becomes a
/// character reference so it survives a re-parse
fn escape_attribute(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' | '\r' | '\t' => push_reference(c, out),
            c => push_char(c, out),
        }
    }
}

/// Characters the parser refuses as literals go out as references. NUL has
/// no reference form and becomes U+FFFD.
fn push_char(c: char, out: &mut String) {
    match c {
        '\0' => out.push(char::REPLACEMENT_CHARACTER),
        '\t' | '\n' => out.push(c),
        c if c.is_control() || matches!(c, '\u{FFFE}' | '\u{FFFF}') => push_reference(c, out),
        c => out.push(c),
    }
}

fn push_reference(c: char, out: &mut String) {
    out.push_str(&format!("&#{};", c as u32));
}
