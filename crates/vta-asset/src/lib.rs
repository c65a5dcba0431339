//! VTA Binary Asset Model
//!
//! The table-of-records shape a compiled visual tree asset has once the
//! container layer has decoded it. Elements, template metadata and the inline
//! stylesheet refer to literal values through shared, deduplicated tables.

mod tables;

use serde::{Deserialize, Serialize};

pub use tables::{Internable, Interner, TableError, TableKind};

/// Parent id of a tree root
pub const NO_PARENT: i64 = -1;

/// Compiled visual tree asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryAsset {
    pub name: String,
    pub content_hash: String,
    pub strings: Vec<String>,
    pub colors: Vec<Rgba>,
    pub elements: Vec<ElementRecord>,
    pub template_bindings: Vec<TemplateBinding>,
    pub template_usings: Vec<TemplateUsing>,
    /// Linked stylesheet paths (string indices)
    pub stylesheets: Vec<u32>,
    pub inline_sheet: Option<SheetRecord>,
}

impl BinaryAsset {
    pub fn string(&self, index: u32) -> Result<&str, TableError> {
        self.strings
            .get(index as usize)
            .map(String::as_str)
            .ok_or(TableError::UnresolvedIndex { table: TableKind::Strings, index })
    }

    pub fn color(&self, index: u32) -> Result<Rgba, TableError> {
        self.colors
            .get(index as usize)
            .copied()
            .ok_or(TableError::UnresolvedIndex { table: TableKind::Colors, index })
    }

    pub fn element(&self, serial_id: i64) -> Option<&ElementRecord> {
        self.elements.iter().find(|element| element.serial_id == serial_id)
    }
}

/// One element of the flat hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub serial_id: i64,
    pub parent_id: i64,
    pub order_in_document: i32,
    pub type_name: u32,
    #[serde(default)]
    pub name: Option<u32>,
    #[serde(default)]
    pub classes: Vec<u32>,
    /// Rule in the inline sheet holding this element's `style` declarations
    #[serde(default)]
    pub rule_index: Option<u32>,
    /// Pass-through attributes, in authored order
    #[serde(default)]
    pub properties: Vec<PropertyRecord>,
    /// Text content (string index)
    #[serde(default)]
    pub text: Option<u32>,
    #[serde(default)]
    pub bookkeeping: Bookkeeping,
}

impl ElementRecord {
    pub fn new(serial_id: i64, parent_id: i64, order_in_document: i32, type_name: u32) -> Self {
        Self {
            serial_id,
            parent_id,
            order_in_document,
            type_name,
            name: None,
            classes: Vec::new(),
            rule_index: None,
            properties: Vec::new(),
            text: None,
            bookkeeping: Bookkeeping::default(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id == NO_PARENT
    }
}

/// Attribute name/value pair (string indices)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub name: u32,
    pub value: u32,
}

/// Container-level identifiers with no textual counterpart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookkeeping {
    pub object_id: i64,
    pub flags: u32,
}

/// Element `serial_id` instantiates the template known as `alias`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateBinding {
    pub serial_id: i64,
    pub alias: u32,
}

/// Template `alias` comes from the asset at `path`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateUsing {
    pub alias: u32,
    #[serde(default)]
    pub path: Option<u32>,
}

/// RGBA color, channels in `0.0..=1.0`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Compiled stylesheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetRecord {
    pub floats: Vec<f32>,
    pub dimensions: Vec<DimensionRecord>,
    pub rules: Vec<RuleRecord>,
    pub complex_selectors: Vec<ComplexSelectorRecord>,
}

impl SheetRecord {
    pub fn float(&self, index: u32) -> Result<f32, TableError> {
        self.floats
            .get(index as usize)
            .copied()
            .ok_or(TableError::UnresolvedIndex { table: TableKind::Floats, index })
    }

    pub fn dimension(&self, index: u32) -> Result<DimensionRecord, TableError> {
        self.dimensions
            .get(index as usize)
            .copied()
            .ok_or(TableError::UnresolvedIndex { table: TableKind::Dimensions, index })
    }

    pub fn rule(&self, index: u32) -> Result<&RuleRecord, TableError> {
        self.rules
            .get(index as usize)
            .ok_or(TableError::UnresolvedIndex { table: TableKind::Rules, index })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionRecord {
    pub value: f32,
    pub unit: DimensionUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionUnit {
    Unitless,
    Pixel,
    Percent,
    Second,
    Millisecond,
    Degree,
    Gradian,
    Radian,
    Turn,
}

/// Ordered declarations of one rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub properties: Vec<SheetPropertyRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetPropertyRecord {
    pub name: u32,
    pub values: Vec<ValueHandle>,
}

/// Typed reference to a value table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueHandle {
    pub kind: ValueKind,
    pub index: u32,
}

impl ValueHandle {
    pub fn new(kind: ValueKind, index: u32) -> Self {
        Self { kind, index }
    }

    /// Table this handle indexes into
    pub fn table(self) -> TableKind {
        match self.kind {
            ValueKind::Float => TableKind::Floats,
            ValueKind::Dimension => TableKind::Dimensions,
            ValueKind::Color => TableKind::Colors,
            ValueKind::Keyword
            | ValueKind::String
            | ValueKind::Url
            | ValueKind::Resource
            | ValueKind::Variable
            | ValueKind::Opaque => TableKind::Strings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Keyword,
    /// Quoted text without its quotes
    String,
    Float,
    Dimension,
    Color,
    Url,
    Resource,
    /// Custom property name without the leading dashes
    Variable,
    /// Verbatim text of a value no grammar rule matched
    Opaque,
}

/// One comma-free selector bound to a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexSelectorRecord {
    pub rule_index: u32,
    pub specificity: u32,
    pub selectors: Vec<SelectorRecord>,
}

/// Compound selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRecord {
    pub parts: Vec<SelectorPartRecord>,
    pub previous_relationship: Relationship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorPartRecord {
    pub kind: SelectorPartKind,
    /// String index; the wildcard stores `*`
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorPartKind {
    Wildcard,
    Type,
    Class,
    Name,
    PseudoClass,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    #[default]
    None,
    Descendant,
    Child,
}
