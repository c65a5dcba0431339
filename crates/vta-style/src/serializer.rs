//! USS Serializer
//!
//! Deterministic text form of a rule set: one block per rule, declarations
//! in stored order, canonical values.

use std::fmt::Write;

use crate::{StyleDeclaration, StyleRule};

/// Indentation of declarations inside a rule block
pub const DECLARATION_INDENT: &str = "    ";

pub fn serialize_stylesheet(rules: &[StyleRule]) -> String {
    let mut out = String::new();
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for (j, selector) in rule.selectors.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{selector}");
        }
        out.push_str(" {\n");
        for declaration in &rule.declarations {
            let _ = writeln!(out, "{DECLARATION_INDENT}{declaration};");
        }
        out.push_str("}\n");
    }
    out
}

/// Single-line form used for the element `style` attribute
pub fn serialize_declarations(declarations: &[StyleDeclaration]) -> String {
    let mut out = String::new();
    for (i, declaration) in declarations.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{declaration}");
    }
    out
}
