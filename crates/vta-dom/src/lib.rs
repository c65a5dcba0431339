//! VTA DOM - Visual tree document model
//!
//! Owned element trees plus conversion to and from the flat records of a
//! compiled asset.

mod document;
mod element;
mod hierarchy;

pub use document::{default_namespaces, Document, Namespace, TemplateDeclaration, EDITOR_NAMESPACE, UI_NAMESPACE};
pub use element::{Attribute, Descendants, Element};
pub use hierarchy::{
    flatten, reconstruct, FlatElement, FlatNode, Flattened, HierarchyError, Reminted, TemplateBinding, NO_PARENT,
};

/// Node identifier (index into the reconstruction arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}
