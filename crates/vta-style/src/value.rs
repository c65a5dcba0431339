//! Typed Style Values
//!
//! Every USS value token deserializes to exactly one [`TypedValue`].
//! Rendering (`Display`) is the inverse and always produces the canonical
//! spelling: lower-case units, upper-case hex colors, shortest floats.
//! Tokens come from cssparser; numbers are read from their source text so
//! that shortest float spellings read back exactly.

use std::fmt;
use std::str::FromStr;

use cssparser::{serialize_identifier, serialize_string, BasicParseError, ParseError, Parser, ParserInput, Token};

use crate::tokens::split_components;

/// A token that matches no value grammar rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized value `{token}`")]
pub struct UnrecognizedValue {
    pub token: String,
}

impl UnrecognizedValue {
    fn new(token: &str) -> Self {
        Self { token: token.to_string() }
    }
}

/// Single typed style value
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Color(Color),
    Dimension(Dimension),
    /// Identifier (unescaped) or any other well-formed component no rule
    /// claims (`flex-start`, `rotate(45deg)`)
    Keyword(String),
    /// Quoted text, stored without its quotes
    String(String),
    /// `var(--name)`, stored without the leading dashes
    VariableRef(String),
    ResourceRef(ResourceRef),
    Number(f32),
}

impl TypedValue {
    /// Parse one component value.
    ///
    /// Numeric tokens give `Number` or `Dimension`; hashes and `rgb(`/`rgba(`
    /// give `Color`; `var(` gives `VariableRef`; `url(`/`resource(` give
    /// `ResourceRef`; a quoted string gives `String`; anything else is a
    /// `Keyword`.
    pub fn parse(token: &str) -> Result<Self, UnrecognizedValue> {
        let token = token.trim();
        let unrecognized = || UnrecognizedValue::new(token);

        // A value is a single component; whitespace is only allowed inside
        // blocks or quotes.
        match split_components(token) {
            Some(components) if components.len() == 1 => {}
            _ => return Err(unrecognized()),
        }

        let mut input = ParserInput::new(token);
        let mut parser = Parser::new(&mut input);
        let first = parser.next_including_whitespace_and_comments().cloned().map_err(|_| unrecognized())?;
        let value = match first {
            Token::Number { .. } | Token::Percentage { .. } | Token::Dimension { .. } => {
                is_last(&mut parser).then(|| parse_numeric(token)).flatten()
            }
            Token::Hash(_) | Token::IDHash(_) => {
                is_last(&mut parser).then(|| Color::from_hex(token)).flatten().map(Self::Color)
            }
            Token::Function(name) => function_value(&mut parser, &name, token),
            Token::UnquotedUrl(path) if !path.is_empty() && is_last(&mut parser) => {
                Some(Self::ResourceRef(ResourceRef::url(path.to_string())))
            }
            Token::UnquotedUrl(_) => None,
            Token::QuotedString(text) if is_last(&mut parser) => Some(Self::String(text.to_string())),
            Token::Ident(name) if is_last(&mut parser) => Some(Self::Keyword(name.to_string())),
            _ => Some(Self::Keyword(token.to_string())),
        };
        value.ok_or_else(unrecognized)
    }

    /// Render to canonical text
    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::VariableRef(name) => Some(name),
            _ => None,
        }
    }
}

impl FromStr for TypedValue {
    type Err = UnrecognizedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(color) => color.fmt(f),
            Self::Dimension(dimension) => dimension.fmt(f),
            // Written bare only when it reads back as the same keyword.
            Self::Keyword(text) => match Self::parse(text) {
                Ok(Self::Keyword(same)) if same == *text => f.write_str(text),
                _ => serialize_identifier(text, f),
            },
            Self::String(text) => serialize_string(text, f),
            Self::VariableRef(name) => write!(f, "var(--{name})"),
            Self::ResourceRef(resource) => resource.fmt(f),
            Self::Number(value) => write!(f, "{value}"),
        }
    }
}

/// Canonical spelling of a single token
pub fn canonicalize(token: &str) -> Result<String, UnrecognizedValue> {
    TypedValue::parse(token).map(|value| value.to_string())
}

/// The token just read was the last one
fn is_last(parser: &mut Parser<'_, '_>) -> bool {
    parser.next_including_whitespace_and_comments().is_err()
}

fn function_value(parser: &mut Parser<'_, '_>, name: &str, token: &str) -> Option<TypedValue> {
    let value = match name.to_ascii_lowercase().as_str() {
        "rgb" => parser.parse_nested_block(number_args).ok().and_then(|args| Color::from_channels(&args, false)).map(TypedValue::Color),
        "rgba" => parser.parse_nested_block(number_args).ok().and_then(|args| Color::from_channels(&args, true)).map(TypedValue::Color),
        "var" => parser.parse_nested_block(variable_name).ok().map(TypedValue::VariableRef),
        "url" => parser.parse_nested_block(resource_path).ok().map(|path| TypedValue::ResourceRef(ResourceRef::url(path))),
        "resource" => {
            parser.parse_nested_block(resource_path).ok().map(|path| TypedValue::ResourceRef(ResourceRef::resource(path)))
        }
        _ => return Some(TypedValue::Keyword(token.to_string())),
    };
    value.filter(|_| is_last(parser))
}

/// Source text of each comma-separated number
fn number_args<'i>(parser: &mut Parser<'i, '_>) -> Result<Vec<&'i str>, ParseError<'i, ()>> {
    let mut args = Vec::new();
    loop {
        parser.skip_whitespace();
        let start = parser.position();
        if !matches!(parser.next()?, Token::Number { .. }) {
            return Err(parser.new_custom_error(()));
        }
        args.push(parser.slice_from(start));
        match parser.next() {
            Ok(Token::Comma) => {}
            Ok(_) => return Err(parser.new_custom_error(())),
            Err(_) => return Ok(args),
        }
    }
}

/// `--name` → `name`
fn variable_name<'i>(parser: &mut Parser<'i, '_>) -> Result<String, ParseError<'i, ()>> {
    let ident = parser.expect_ident()?.to_string();
    match ident.strip_prefix("--") {
        Some(name) if !name.is_empty() => {
            parser.expect_exhausted()?;
            Ok(name.to_string())
        }
        _ => Err(parser.new_custom_error(())),
    }
}

/// A quoted path, or the unquoted text of the block
fn resource_path<'i>(parser: &mut Parser<'i, '_>) -> Result<String, ParseError<'i, ()>> {
    let quoted = parser.try_parse(|p| -> Result<String, BasicParseError<'i>> {
        let path = p.expect_string()?.to_string();
        p.expect_exhausted()?;
        Ok(path)
    });
    if let Ok(path) = quoted {
        return if path.is_empty() { Err(parser.new_custom_error(())) } else { Ok(path) };
    }

    parser.skip_whitespace();
    let start = parser.position();
    while parser.next_including_whitespace_and_comments().is_ok() {}
    let path = parser.slice_from(start).trim();
    if path.is_empty() || path.contains(['"', '\'']) {
        return Err(parser.new_custom_error(()));
    }
    Ok(path.to_string())
}

/// RGBA color, channels in `0.0..=1.0`
///
/// Text form is hex when 8 bits per channel hold the color exactly, and
/// `rgba()` with fractional channels otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: from_255(f64::from(r)),
            g: from_255(f64::from(g)),
            b: from_255(f64::from(b)),
            a: from_255(f64::from(a)),
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        [quantize(self.r), quantize(self.g), quantize(self.b), quantize(self.a)]
    }

    /// Parse a hex color (#RGB, #RGBA, #RRGGBB, #RRGGBBAA)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => Some(Self::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
            4 => Some(Self::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
            6 => Some(Self::from_rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// `rgb(r, g, b)` / `rgba(r, g, b, a)` arguments; r/g/b in 0-255, a in 0-1
    fn from_channels(args: &[&str], has_alpha: bool) -> Option<Self> {
        if args.len() != if has_alpha { 4 } else { 3 } {
            return None;
        }

        let mut channels = [0.0f32; 3];
        for (slot, arg) in channels.iter_mut().zip(args) {
            let value: f64 = arg.parse().ok()?;
            if !(0.0..=255.0).contains(&value) {
                return None;
            }
            *slot = from_255(value);
        }
        let alpha = if has_alpha {
            let alpha: f32 = args[3].parse().ok()?;
            if !(0.0..=1.0).contains(&alpha) {
                return None;
            }
            alpha
        } else {
            1.0
        };
        Some(Self::rgba(channels[0], channels[1], channels[2], alpha))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba8();
        if Self::from_rgba8(r, g, b, a) != *self {
            return write!(
                f,
                "rgba({}, {}, {}, {})",
                channel_text(self.r),
                channel_text(self.g),
                channel_text(self.b),
                self.a
            );
        }
        if a == 255 {
            write!(f, "#{r:02X}{g:02X}{b:02X}")
        } else {
            write!(f, "#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

fn quantize(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn from_255(value: f64) -> f32 {
    (value / 255.0) as f32
}

/// Shortest 0-255 spelling that reads back as exactly `channel`
fn channel_text(channel: f32) -> String {
    let short = (channel * 255.0).to_string();
    match short.parse::<f64>() {
        Ok(value) if from_255(value) == channel => short,
        // f32 * 255 is exact in f64
        _ => (f64::from(channel) * 255.0).to_string(),
    }
}

/// Numeric value with a unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension {
    pub magnitude: f32,
    pub unit: Unit,
}

impl Dimension {
    pub fn new(magnitude: f32, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    pub fn px(magnitude: f32) -> Self {
        Self::new(magnitude, Unit::Px)
    }

    pub fn percent(magnitude: f32) -> Self {
        Self::new(magnitude, Unit::Percent)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.suffix())
    }
}

/// Dimension units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Unitless,
    Px,
    Percent,
    Second,
    Millisecond,
    Degree,
    Radian,
    Gradian,
    Turn,
}

impl Unit {
    /// Unit for a (case-insensitive) suffix; the empty suffix is not a unit
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix.to_ascii_lowercase().as_str() {
            "px" => Self::Px,
            "%" => Self::Percent,
            "s" => Self::Second,
            "ms" => Self::Millisecond,
            "deg" => Self::Degree,
            "rad" => Self::Radian,
            "grad" => Self::Gradian,
            "turn" => Self::Turn,
            _ => return None,
        })
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Unitless => "",
            Self::Px => "px",
            Self::Percent => "%",
            Self::Second => "s",
            Self::Millisecond => "ms",
            Self::Degree => "deg",
            Self::Radian => "rad",
            Self::Gradian => "grad",
            Self::Turn => "turn",
        }
    }
}

/// Which function introduced a resource reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `url("...")`, a project path
    Url,
    /// `resource("...")`, a path inside a Resources folder
    Resource,
}

/// `url(...)` / `resource(...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub path: String,
}

impl ResourceRef {
    pub fn url(path: impl Into<String>) -> Self {
        Self { kind: ResourceKind::Url, path: path.into() }
    }

    pub fn resource(path: impl Into<String>) -> Self {
        Self { kind: ResourceKind::Resource, path: path.into() }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let function = match self.kind {
            ResourceKind::Url => "url",
            ResourceKind::Resource => "resource",
        };
        write!(f, "{function}(")?;
        serialize_string(&self.path, f)?;
        f.write_str(")")
    }
}

/// Declared value of a property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Single(TypedValue),
    /// Space-separated values (`margin: 4px 8px`)
    List(Vec<TypedValue>),
    /// Verbatim text of a value no grammar rule matched
    Raw(String),
}

impl PropertyValue {
    /// Parse a whole declaration value
    pub fn parse(text: &str) -> Result<Self, UnrecognizedValue> {
        let text = text.trim();
        let components = split_components(text).ok_or_else(|| UnrecognizedValue::new(text))?;
        let values = components
            .into_iter()
            .map(TypedValue::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_values(values))
    }

    pub fn from_values(mut values: Vec<TypedValue>) -> Self {
        match values.len() {
            0 => Self::Raw(String::new()),
            1 => Self::Single(values.remove(0)),
            _ => Self::List(values),
        }
    }

    /// Typed values, empty for raw text
    pub fn values(&self) -> &[TypedValue] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::List(values) => values,
            Self::Raw(_) => &[],
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Raw(raw) if raw.is_empty())
    }
}

impl From<TypedValue> for PropertyValue {
    fn from(value: TypedValue) -> Self {
        Self::Single(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(value) => value.fmt(f),
            Self::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    value.fmt(f)?;
                }
                Ok(())
            }
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

fn parse_numeric(token: &str) -> Option<TypedValue> {
    let split = token
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '+' || c == '-'))))
        .map_or(token.len(), |(i, _)| i);
    let (number, suffix) = token.split_at(split);
    let magnitude: f32 = number.parse().ok()?;
    if !magnitude.is_finite() {
        return None;
    }
    if suffix.is_empty() {
        return Some(TypedValue::Number(magnitude));
    }
    Unit::from_suffix(suffix).map(|unit| TypedValue::Dimension(Dimension::new(magnitude, unit)))
}
