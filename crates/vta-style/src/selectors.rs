//! USS Selectors
//!
//! A selector is a sequence of compound selectors joined by combinators.
//! Each compound keeps its relationship to the previous one, which is how
//! the binary sheet stores them.

use std::fmt;

use cssparser::{serialize_identifier, Parser, ParserInput, Token};

/// Selector specificity (names, classes + pseudo-classes, types)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Specificity {
    /// Single integer form stored in the binary sheet
    pub fn packed(self) -> u32 {
        self.0.saturating_mul(10_000)
            .saturating_add(self.1.saturating_mul(100))
            .saturating_add(self.2)
    }
}

/// One simple selector inside a compound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorPart {
    /// `*`
    Universal,
    /// `Label`
    Type(String),
    /// `.title`
    Class(String),
    /// `#header` (element name)
    Name(String),
    /// `:hover`
    PseudoClass(String),
}

impl fmt::Display for SelectorPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Universal => f.write_str("*"),
            Self::Type(name) => serialize_identifier(name, f),
            Self::Class(name) => {
                f.write_str(".")?;
                serialize_identifier(name, f)
            }
            Self::Name(name) => {
                f.write_str("#")?;
                serialize_identifier(name, f)
            }
            Self::PseudoClass(name) => {
                f.write_str(":")?;
                serialize_identifier(name, f)
            }
        }
    }
}

/// Relationship of a compound selector to the one before it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// First compound of a selector
    #[default]
    None,
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    pub combinator: Combinator,
    pub parts: Vec<SelectorPart>,
}

/// Complex selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub compounds: Vec<CompoundSelector>,
}

impl Selector {
    /// Parse a single (comma-free) selector; `None` if malformed.
    pub fn parse(text: &str) -> Option<Self> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let mut compounds = Vec::new();
        let mut current = Vec::new();
        let mut lead = Combinator::None;
        let mut spaced = false;
        let mut child_marked = false;

        loop {
            let token = match parser.next_including_whitespace_and_comments() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };
            let part = match token {
                Token::WhiteSpace(_) => {
                    spaced = true;
                    continue;
                }
                Token::Comment(_) => continue,
                Token::Delim('>') => {
                    if !current.is_empty() {
                        finish(&mut current, &mut lead, &mut compounds);
                    } else if compounds.is_empty() || child_marked {
                        return None;
                    }
                    lead = Combinator::Child;
                    child_marked = true;
                    spaced = false;
                    continue;
                }
                Token::Delim('*') => SelectorPart::Universal,
                Token::Delim('.') => SelectorPart::Class(take_ident(&mut parser)?),
                Token::Colon => SelectorPart::PseudoClass(take_ident(&mut parser)?),
                Token::IDHash(name) | Token::Hash(name) => SelectorPart::Name(name.to_string()),
                Token::Ident(name) => SelectorPart::Type(name.to_string()),
                _ => return None,
            };

            if spaced && !current.is_empty() {
                finish(&mut current, &mut lead, &mut compounds);
                child_marked = false;
            }
            spaced = false;
            current.push(part);
        }

        if current.is_empty() {
            return None;
        }
        finish(&mut current, &mut lead, &mut compounds);
        Some(Self { compounds })
    }

    /// Parse a comma-separated selector list
    pub fn parse_list(text: &str) -> Option<Vec<Self>> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        parser
            .parse_comma_separated(|selector| {
                let start = selector.position();
                while selector.next_including_whitespace_and_comments().is_ok() {}
                Self::parse(selector.slice_from(start)).ok_or_else(|| selector.new_custom_error::<(), ()>(()))
            })
            .ok()
    }

    pub fn specificity(&self) -> Specificity {
        let mut specificity = Specificity::default();
        for part in self.compounds.iter().flat_map(|c| &c.parts) {
            match part {
                SelectorPart::Name(_) => specificity.0 += 1,
                SelectorPart::Class(_) | SelectorPart::PseudoClass(_) => specificity.1 += 1,
                SelectorPart::Type(_) => specificity.2 += 1,
                SelectorPart::Universal => {}
            }
        }
        specificity
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, compound) in self.compounds.iter().enumerate() {
            if i > 0 {
                match compound.combinator {
                    Combinator::Child => f.write_str(" > ")?,
                    Combinator::None | Combinator::Descendant => f.write_str(" ")?,
                }
            }
            for part in &compound.parts {
                part.fmt(f)?;
            }
        }
        Ok(())
    }
}

fn finish(parts: &mut Vec<SelectorPart>, lead: &mut Combinator, compounds: &mut Vec<CompoundSelector>) {
    compounds.push(CompoundSelector { combinator: *lead, parts: std::mem::take(parts) });
    *lead = Combinator::Descendant;
}

/// Identifier directly after `.` or `:`
fn take_ident(parser: &mut Parser<'_, '_>) -> Option<String> {
    match parser.next_including_whitespace_and_comments() {
        Ok(Token::Ident(name)) => Some(name.to_string()),
        _ => None,
    }
}
