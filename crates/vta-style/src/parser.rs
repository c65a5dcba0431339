//! USS Parser
//!
//! Rule and declaration structure on top of the cssparser tokenizer. Errors
//! are local: a bad declaration or selector becomes a [`Diagnostic`] and
//! parsing carries on with the next declaration or rule. A rule that loses
//! its closing brace ends where the next rule's selector begins.

use cssparser::{ParseError, Parser, ParserInput, Token};

use crate::value::PropertyValue;
use crate::{Diagnostic, Parsed, Selector, StyleDeclaration, StyleRule};

/// USS Parser
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleParser;

impl StyleParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a stylesheet into rules plus diagnostics
    pub fn parse(&self, css: &str) -> Parsed<Vec<StyleRule>> {
        let mut sheet = Sheet { css, rules: Vec::new(), diagnostics: Vec::new() };
        let mut resume = Some(0);
        while let Some(from) = resume {
            resume = sheet.parse_rules(from);
        }

        tracing::debug!("Parsed {} style rules ({} diagnostics)", sheet.rules.len(), sheet.diagnostics.len());
        Parsed { value: sheet.rules, diagnostics: sheet.diagnostics }
    }

    /// Parse a bare declaration block (the body of an element `style` attribute)
    pub fn parse_declarations(&self, block: &str) -> Parsed<Vec<StyleDeclaration>> {
        let mut input = ParserInput::new(block);
        let mut parser = Parser::new(&mut input);
        let body = scan_body(&mut parser);

        let mut diagnostics = Vec::new();
        let declarations = body.declarations(block, 0, &mut diagnostics);
        Parsed { value: declarations, diagnostics }
    }
}

struct Sheet<'a> {
    css: &'a str,
    rules: Vec<StyleRule>,
    diagnostics: Vec<Diagnostic>,
}

impl Sheet<'_> {
    /// Parse rules from byte `from` to the end. Returns the offset to restart
    /// at when a rule body turns out to contain the next rule.
    fn parse_rules(&mut self, from: usize) -> Option<usize> {
        let css = &self.css[from..];
        let lines = self.css[..from].matches('\n').count() + 1;
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);

        'rules: loop {
            let start = parser.position();
            let mut first_line = None;

            let (open, selector_line) = loop {
                let line = lines + parser.current_source_location().line as usize;
                let before = parser.position();
                let token = match parser.next_including_whitespace_and_comments() {
                    Ok(token) => token.clone(),
                    Err(_) => {
                        let leftover = parser.slice_from(start).trim();
                        if !leftover.is_empty() {
                            self.diagnostics.push(Diagnostic::MalformedDeclaration {
                                raw: leftover.to_string(),
                                line: first_line.unwrap_or(line),
                            });
                        }
                        return None;
                    }
                };
                match token {
                    Token::WhiteSpace(_) | Token::Comment(_) => {}
                    Token::CurlyBracketBlock => break (before.byte_index(), line),
                    Token::CloseCurlyBracket => {
                        self.diagnostics.push(Diagnostic::MalformedDeclaration {
                            raw: parser.slice_from(start).trim().to_string(),
                            line,
                        });
                        continue 'rules;
                    }
                    token => {
                        first_line.get_or_insert(line);
                        consume_block(&mut parser, &token);
                    }
                }
            };

            let selector_text = css[start.byte_index()..open].trim();
            let body = match parser.parse_nested_block(scan_block) {
                Ok(body) => body,
                Err(_) => return None,
            };

            if let Some(resume) = body.nested {
                self.diagnostics.push(Diagnostic::MalformedDeclaration {
                    raw: css[start.byte_index()..resume].trim().to_string(),
                    line: selector_line,
                });
                return Some(from + resume);
            }
            if parser.position().byte_index() <= body.end {
                self.diagnostics.push(Diagnostic::MalformedDeclaration {
                    raw: css[start.byte_index()..].trim().to_string(),
                    line: selector_line,
                });
                return None;
            }

            match Selector::parse_list(selector_text) {
                Some(selectors) => {
                    let declarations = body.declarations(css, lines - 1, &mut self.diagnostics);
                    self.rules.push(StyleRule { selectors, declarations });
                }
                None => self.diagnostics.push(Diagnostic::MalformedSelector {
                    raw: selector_text.to_string(),
                    line: selector_line,
                }),
            }
        }
    }
}

/// Declarations of one block, as byte spans of the parsed text
#[derive(Debug, Default)]
struct Body {
    spans: Vec<Span>,
    /// Where a rule opened inside this body starts: just after the last
    /// `;` or line break before its `{`
    nested: Option<usize>,
    end: usize,
}

#[derive(Debug)]
struct Span {
    start: usize,
    end: usize,
    /// 0-based line of the first token
    line: usize,
    property: Option<String>,
    value_start: Option<usize>,
    malformed: bool,
}

impl Span {
    fn open(start: usize, line: usize, token: &Token<'_>) -> Self {
        let property = match token {
            Token::Ident(name) => Some(name.to_string()),
            _ => None,
        };
        Self { start, end: start, line, malformed: property.is_none(), property, value_start: None }
    }

    /// Only the token after the property name matters: it must be the colon.
    fn feed(&mut self, token: &Token<'_>, after: usize) {
        if self.malformed || self.value_start.is_some() {
            return;
        }
        match token {
            Token::Colon => self.value_start = Some(after),
            _ => self.malformed = true,
        }
    }
}

impl Body {
    fn declarations(&self, text: &str, lines: usize, diagnostics: &mut Vec<Diagnostic>) -> Vec<StyleDeclaration> {
        let mut declarations = Vec::new();

        for span in &self.spans {
            let raw = text[span.start..span.end].trim();
            let line = lines + span.line + 1;
            let (Some(property), Some(value_start), false) = (&span.property, span.value_start, span.malformed) else {
                diagnostics.push(Diagnostic::MalformedDeclaration { raw: raw.to_string(), line });
                continue;
            };

            let value_text = text[value_start..span.end].trim();
            let value = PropertyValue::parse(value_text).unwrap_or_else(|_| {
                diagnostics.push(Diagnostic::UnrecognizedValue {
                    property: property.clone(),
                    raw: value_text.to_string(),
                    line,
                });
                PropertyValue::Raw(value_text.to_string())
            });
            declarations.push(StyleDeclaration { property: property.clone(), value });
        }

        declarations
    }
}

fn scan_block<'i>(parser: &mut Parser<'i, '_>) -> Result<Body, ParseError<'i, ()>> {
    Ok(scan_body(parser))
}

/// Split a block into declaration spans at top-level semicolons
fn scan_body(parser: &mut Parser<'_, '_>) -> Body {
    let mut body = Body::default();
    let mut current: Option<Span> = None;
    let mut last_break = parser.position().byte_index();

    loop {
        let before = parser.position().byte_index();
        let line = parser.current_source_location().line as usize;
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Comment(_) => {}
            Token::WhiteSpace(space) => {
                if let Some(i) = space.rfind('\n') {
                    last_break = before + i + 1;
                }
            }
            Token::Semicolon => {
                last_break = before + 1;
                if let Some(mut span) = current.take() {
                    span.end = before;
                    body.spans.push(span);
                }
            }
            token => {
                if matches!(token, Token::CurlyBracketBlock) {
                    body.nested.get_or_insert(last_break);
                }
                consume_block(parser, &token);
                match current.as_mut() {
                    Some(span) => span.feed(&token, parser.position().byte_index()),
                    None => current = Some(Span::open(before, line, &token)),
                }
            }
        }
    }

    body.end = parser.position().byte_index();
    if let Some(mut span) = current {
        span.end = body.end;
        body.spans.push(span);
    }
    body
}

/// Step over the contents of the block `token` opened, if it opened one
fn consume_block(parser: &mut Parser<'_, '_>, token: &Token<'_>) {
    if matches!(
        token,
        Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock | Token::CurlyBracketBlock
    ) {
        // skip_block consumes everything, so this cannot fail
        let _ = parser.parse_nested_block(skip_block);
    }
}

fn skip_block<'i>(parser: &mut Parser<'i, '_>) -> Result<(), ParseError<'i, ()>> {
    while parser.next_including_whitespace_and_comments().is_ok() {}
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Color, Dimension, TypedValue};

    #[test]
    fn test_parse_simple() {
        let css = r#"
            .foo { display: flex; }
            #bar { color: red; }
        "#;

        let parsed = StyleParser::new().parse(css);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        assert_eq!(parsed.value.len(), 2);
    }

    #[test]
    fn test_parse_title_rule() {
        let parsed = StyleParser::new().parse(".title { color: #FF0000; padding: 4px; }");
        assert!(parsed.diagnostics.is_empty());
        let rule = &parsed.value[0];
        assert_eq!(rule.declarations.len(), 2);
        assert_eq!(
            rule.declarations[0].value,
            PropertyValue::Single(TypedValue::Color(Color::from_rgba8(255, 0, 0, 255)))
        );
        assert_eq!(
            rule.declarations[1].value,
            PropertyValue::Single(TypedValue::Dimension(Dimension::px(4.0)))
        );
    }

    #[test]
    fn test_missing_colon_is_local() {
        let css = ".a { color red; width: 10px; }\n.b { height: 2px; }";
        let parsed = StyleParser::new().parse(css);
        assert_eq!(parsed.value.len(), 2);
        assert_eq!(parsed.value[0].declarations.len(), 1);
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::MalformedDeclaration { raw: "color red".into(), line: 1 }]
        );
    }

    #[test]
    fn test_unbalanced_braces() {
        let css = ".a { color: red; }\n.b { color: blue;\n.c { width: 1px; }\n.d { height: 1px; }";
        let parsed = StyleParser::new().parse(css);
        let selectors: Vec<String> = parsed.value.iter().map(|r| r.selectors[0].to_string()).collect();
        assert_eq!(selectors, vec![".a", ".c", ".d"]);
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::MalformedDeclaration { raw: ".b { color: blue;".into(), line: 2 }]
        );
        assert_eq!(parsed.value[1].declarations[0].to_string(), "width: 1px");
    }

    #[test]
    fn test_unclosed_rule_on_one_line() {
        let css = ".a { color: red; .b { width: 1px; }\n.c { height: 1px; }";
        let parsed = StyleParser::new().parse(css);
        let selectors: Vec<String> = parsed.value.iter().map(|r| r.selectors[0].to_string()).collect();
        assert_eq!(selectors, vec![".b", ".c"]);
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::MalformedDeclaration { raw: ".a { color: red;".into(), line: 1 }]
        );
    }

    #[test]
    fn test_nested_rule_without_break() {
        let parsed = StyleParser::new().parse(".a { .b { width: 1px; } }\n.c { height: 1px; }");
        let selectors: Vec<String> = parsed.value.iter().map(|r| r.selectors[0].to_string()).collect();
        assert_eq!(selectors, vec![".b", ".c"]);
        assert!(matches!(
            parsed.diagnostics.as_slice(),
            [
                Diagnostic::MalformedDeclaration { line: 1, .. },
                Diagnostic::MalformedDeclaration { line: 1, .. },
            ]
        ));
    }

    #[test]
    fn test_stray_closing_brace() {
        let parsed = StyleParser::new().parse(".a { width: 1px; }\n}\n.b { width: 2px; }");
        assert_eq!(parsed.value.len(), 2);
        assert_eq!(parsed.diagnostics, vec![Diagnostic::MalformedDeclaration { raw: "}".into(), line: 2 }]);
    }

    #[test]
    fn test_unterminated_block() {
        let parsed = StyleParser::new().parse(".a { color: red; }\n.b { color: blue;");
        assert_eq!(parsed.value.len(), 1);
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn test_unrecognized_value_passthrough() {
        let parsed = StyleParser::new().parse(".a {\n  width: 12em;\n}");
        let declaration = &parsed.value[0].declarations[0];
        assert_eq!(declaration.value, PropertyValue::Raw("12em".into()));
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::UnrecognizedValue {
                property: "width".into(),
                raw: "12em".into(),
                line: 2,
            }]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let css = "/* header\n comment */\n.a { /* inline } */ color: red; }";
        let parsed = StyleParser::new().parse(css);
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.value[0].declarations.len(), 1);
        assert_eq!(parsed.value[0].declarations[0].to_string(), "color: red");
    }

    #[test]
    fn test_malformed_selector_skips_rule() {
        let parsed = StyleParser::new().parse(".a > { color: red; }\n.b { color: blue; }");
        assert_eq!(parsed.value.len(), 1);
        assert!(matches!(parsed.diagnostics[0], Diagnostic::MalformedSelector { line: 1, .. }));
    }

    #[test]
    fn test_parse_declarations() {
        let parsed = StyleParser::new().parse_declarations("color: #1976d2; margin: 4px 8px;");
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.value.len(), 2);
        assert_eq!(parsed.value[1].value.to_string(), "4px 8px");
    }

    #[test]
    fn test_semicolon_inside_quotes() {
        let parsed = StyleParser::new().parse_declarations("-unity-font: \"a;b\"; color: red");
        assert_eq!(parsed.value.len(), 2);
        assert_eq!(parsed.value[0].value.to_string(), "\"a;b\"");
    }
}
