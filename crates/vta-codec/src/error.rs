//! Errors, warnings and call results

use vta_asset::{TableError, TableKind};
use vta_dom::HierarchyError;
use vta_markup::MarkupError;
use vta_style::Diagnostic;

/// Fatal transform error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error("unresolved {table} index {index}")]
    UnresolvedTableIndex { table: TableKind, index: u32 },

    #[error("rule {rule_index} has a selector with no parts")]
    EmptySelector { rule_index: u32 },

    #[error(transparent)]
    Markup(#[from] MarkupError),
}

impl From<TableError> for TransformError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::UnresolvedIndex { table, index } => Self::UnresolvedTableIndex { table, index },
        }
    }
}

/// Non-fatal problem found during a transform
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error(transparent)]
    Style(#[from] Diagnostic),

    #[error("template `{template}` has no source asset")]
    MissingTemplateTarget { template: String },

    #[error("rule {rule_index} is not used by any selector or element")]
    UnreferencedRule { rule_index: u32 },

    #[error("serial id {original} was used more than once; the copy became {assigned}")]
    DuplicateSerialId { original: i64, assigned: i64 },

    #[error("element {serial_id} holds a NUL character, which markup cannot carry")]
    UnrepresentableCharacter { serial_id: i64 },
}

/// Successful result plus the warnings raised on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Report<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Report<T> {
    pub fn new(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Report<U> {
        Report { value: f(self.value), warnings: self.warnings }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// First fatal error plus the warnings raised before it
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct Failure {
    #[source]
    pub error: TransformError,
    pub warnings: Vec<Warning>,
}

impl Failure {
    pub fn new(error: impl Into<TransformError>, warnings: Vec<Warning>) -> Self {
        Self { error: error.into(), warnings }
    }
}

/// Result of a codec call
pub type Outcome<T> = Result<Report<T>, Failure>;

/// Collects warnings, logging each once as it arrives
#[derive(Debug, Default)]
pub(crate) struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub(crate) fn push(&mut self, warning: impl Into<Warning>) {
        let warning = warning.into();
        tracing::warn!("{}", warning);
        self.items.push(warning);
    }

    pub(crate) fn extend(&mut self, warnings: impl IntoIterator<Item = impl Into<Warning>>) {
        for warning in warnings {
            self.push(warning);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn report<T>(self, value: T) -> Report<T> {
        Report::new(value, self.items)
    }

    pub(crate) fn fail(self, error: impl Into<TransformError>) -> Failure {
        let failure = Failure::new(error, self.items);
        tracing::debug!("Transform failed: {}", failure.error);
        failure
    }
}
