//! Component splitting on top of the cssparser tokenizer
//!
//! cssparser closes open blocks and strings silently at end of input, so
//! balance is checked here: a block is closed only if the parser moved past
//! the end of its contents.

use cssparser::{ParseError, Parser, ParserInput, SourcePosition, Token};

/// A block, string or url token that never closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Unbalanced;

/// Split text into whitespace-separated component values.
///
/// Whitespace and comments separate components except inside blocks and
/// strings. Returns `None` when the text is unbalanced.
pub(crate) fn split_components(text: &str) -> Option<Vec<&str>> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut components = Vec::new();
    let mut start: Option<usize> = None;

    loop {
        let before = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) | Token::Comment(_) => {
                if let Some(s) = start.take() {
                    components.push(&text[s..before.byte_index()]);
                }
            }
            token => {
                start.get_or_insert(before.byte_index());
                check_component(&mut parser, &token, before).ok()?;
            }
        }
    }

    if let Some(s) = start {
        components.push(&text[s..]);
    }
    Some(components)
}

/// Check the token just read, descending into it if it opens a block
pub(crate) fn check_component<'i>(
    parser: &mut Parser<'i, '_>,
    token: &Token<'i>,
    start: SourcePosition,
) -> Result<(), ParseError<'i, Unbalanced>> {
    match token {
        Token::BadString(_)
        | Token::BadUrl(_)
        | Token::CloseParenthesis
        | Token::CloseSquareBracket
        | Token::CloseCurlyBracket => Err(parser.new_custom_error(Unbalanced)),
        Token::QuotedString(_) if !is_terminated(parser.slice_from(start)) => {
            Err(parser.new_custom_error(Unbalanced))
        }
        Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock | Token::CurlyBracketBlock => {
            let end = parser.parse_nested_block(check_block)?;
            if parser.position().byte_index() > end.byte_index() {
                Ok(())
            } else {
                Err(parser.new_custom_error(Unbalanced))
            }
        }
        _ => Ok(()),
    }
}

fn check_block<'i>(parser: &mut Parser<'i, '_>) -> Result<SourcePosition, ParseError<'i, Unbalanced>> {
    loop {
        let before = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(parser.position()),
        };
        check_component(parser, &token, before)?;
    }
}

/// A quoted string token ends with its own, unescaped quote
fn is_terminated(raw: &str) -> bool {
    let Some(quote) = raw.chars().next() else {
        return false;
    };
    let Some(body) = raw[quote.len_utf8()..].strip_suffix(quote) else {
        return false;
    };
    body.chars().rev().take_while(|&c| c == '\\').count() % 2 == 0
}
