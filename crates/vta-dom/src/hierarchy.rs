//! Hierarchy Reconstruction
//!
//! Converts between the flat `(serial_id, parent_id, order_in_document)`
//! records of a binary asset and nested [`Element`] trees. Reconstruction
//! links nodes through an index arena first and only materializes nested
//! children once the whole structure has been validated.

use std::collections::{HashMap, HashSet};

use crate::document::declare;
use crate::{Element, NodeId, TemplateDeclaration};

/// Parent id of a tree root
pub const NO_PARENT: i64 = -1;

/// Structural failure of a flat hierarchy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("element {serial_id} refers to missing parent {parent_id}")]
    DanglingParentReference { serial_id: i64, parent_id: i64 },

    #[error("element {serial_id} is part of a parent cycle")]
    HierarchyCycle { serial_id: i64 },

    #[error("serial id {serial_id} is used by more than one element")]
    DuplicateSerialId { serial_id: i64 },

    #[error("template binding for unknown element {serial_id}")]
    UnknownTemplateBinding { serial_id: i64 },
}

/// Element as it appears in the flat record list, children empty
#[derive(Debug, Clone, PartialEq)]
pub struct FlatElement {
    pub serial_id: i64,
    pub parent_id: i64,
    pub order_in_document: i32,
    pub element: Element,
}

/// Element `serial_id` instantiates `template`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBinding {
    pub serial_id: i64,
    pub template: String,
}

struct Slot {
    order: i32,
    element: Option<Element>,
    children: Vec<NodeId>,
}

/// Index arena used while linking
struct Arena {
    slots: Vec<Slot>,
}

impl Arena {
    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.index()]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.index()]
    }

    /// Take the element at `id` out of the arena with its subtree attached.
    ///
    /// Post-order over an explicit stack: a node is assembled once all of
    /// its children have been, so depth costs heap, not call stack.
    fn materialize(&mut self, id: NodeId) -> Element {
        let mut built: Vec<Element> = Vec::new();
        let mut stack = vec![(id, false)];

        while let Some((id, expanded)) = stack.pop() {
            if !expanded {
                stack.push((id, true));
                stack.extend(self.slot(id).children.iter().rev().map(|&child| (child, false)));
                continue;
            }
            let count = self.slot(id).children.len();
            let mut element = self.slot_mut(id).element.take().unwrap_or_default();
            element.children = built.split_off(built.len() - count);
            built.push(element);
        }
        built.pop().unwrap_or_default()
    }
}

/// Rebuild nested trees from flat records.
///
/// Siblings are ordered by ascending `order_in_document`; equal orders keep
/// their position in `flat`. Each binding sets `template_reference` and makes
/// sure `templates` declares that name exactly once.
pub fn reconstruct(
    flat: Vec<FlatElement>,
    bindings: &[TemplateBinding],
    templates: &mut Vec<TemplateDeclaration>,
) -> Result<Vec<Element>, HierarchyError> {
    let mut by_serial: HashMap<i64, NodeId> = HashMap::with_capacity(flat.len());
    let mut links = Vec::with_capacity(flat.len());
    let mut arena = Arena { slots: Vec::with_capacity(flat.len()) };

    for (index, record) in flat.into_iter().enumerate() {
        let id = NodeId::from_index(index);
        if by_serial.insert(record.serial_id, id).is_some() {
            return Err(HierarchyError::DuplicateSerialId { serial_id: record.serial_id });
        }
        links.push((record.serial_id, record.parent_id));
        let mut element = record.element;
        element.serial_id = Some(record.serial_id);
        arena.slots.push(Slot { order: record.order_in_document, element: Some(element), children: Vec::new() });
    }

    let mut roots = Vec::new();
    for (index, &(serial_id, parent_id)) in links.iter().enumerate() {
        let id = NodeId::from_index(index);
        if parent_id == NO_PARENT {
            roots.push(id);
            continue;
        }
        let Some(&parent) = by_serial.get(&parent_id) else {
            return Err(HierarchyError::DanglingParentReference { serial_id, parent_id });
        };
        arena.slot_mut(parent).children.push(id);
    }

    // Stable: equal orders keep array position.
    for index in 0..arena.slots.len() {
        let mut children = std::mem::take(&mut arena.slots[index].children);
        children.sort_by_key(|&child| arena.slot(child).order);
        arena.slots[index].children = children;
    }
    roots.sort_by_key(|&root| arena.slot(root).order);

    // Every parent exists, so anything unreachable from a root sits on a cycle.
    let mut reached = HashSet::with_capacity(links.len());
    let mut stack = roots.clone();
    while let Some(id) = stack.pop() {
        if reached.insert(id) {
            stack.extend(arena.slot(id).children.iter().copied());
        }
    }
    if let Some(index) = (0..links.len()).find(|&i| !reached.contains(&NodeId::from_index(i))) {
        return Err(HierarchyError::HierarchyCycle { serial_id: links[index].0 });
    }

    for binding in bindings {
        let Some(&id) = by_serial.get(&binding.serial_id) else {
            return Err(HierarchyError::UnknownTemplateBinding { serial_id: binding.serial_id });
        };
        if let Some(element) = arena.slot_mut(id).element.as_mut() {
            element.template_reference = Some(binding.template.clone());
        }
        declare(templates, &binding.template, None);
    }

    tracing::debug!("Reconstructed {} elements under {} roots", links.len(), roots.len());
    Ok(roots.into_iter().map(|root| arena.materialize(root)).collect())
}

/// One flattened element
#[derive(Debug, Clone, PartialEq)]
pub struct FlatNode<'a> {
    pub serial_id: i64,
    pub parent_id: i64,
    pub order_in_document: i32,
    pub element: &'a Element,
}

/// A serial id that was already taken and got replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reminted {
    pub original: i64,
    pub assigned: i64,
}

/// Flat form of a tree
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened<'a> {
    /// Depth-first pre-order
    pub nodes: Vec<FlatNode<'a>>,
    /// Elements that had no id
    pub minted: usize,
    /// Duplicate ids that were replaced, in walk order
    pub reminted: Vec<Reminted>,
}

/// Flatten nested trees.
///
/// Existing ids are kept. Elements without one, and any repeat of an id seen
/// earlier in the walk, draw fresh ids counting up from
/// `max(fresh_id_base, largest existing id + 1)`.
pub fn flatten(roots: &[Element], fresh_id_base: i64) -> Flattened<'_> {
    let largest = roots
        .iter()
        .flat_map(Element::descendants)
        .filter_map(|e| e.serial_id)
        .max();
    let mut next_id = largest.map_or(fresh_id_base, |id| fresh_id_base.max(id.saturating_add(1)));

    let mut flattened = Flattened { nodes: Vec::new(), minted: 0, reminted: Vec::new() };
    let mut seen = HashSet::new();
    let mut stack: Vec<(&Element, i64, i32)> = roots
        .iter()
        .enumerate()
        .rev()
        .map(|(order, root)| (root, NO_PARENT, order as i32))
        .collect();

    while let Some((element, parent_id, order_in_document)) = stack.pop() {
        let serial_id = match element.serial_id {
            Some(id) if seen.insert(id) => id,
            Some(original) => {
                let assigned = next_id;
                next_id += 1;
                seen.insert(assigned);
                flattened.reminted.push(Reminted { original, assigned });
                assigned
            }
            None => {
                let assigned = next_id;
                next_id += 1;
                seen.insert(assigned);
                flattened.minted += 1;
                assigned
            }
        };

        flattened.nodes.push(FlatNode { serial_id, parent_id, order_in_document, element });
        stack.extend(
            element
                .children
                .iter()
                .enumerate()
                .rev()
                .map(|(order, child)| (child, serial_id, order as i32)),
        );
    }

    tracing::debug!(
        "Flattened {} elements ({} minted, {} reminted)",
        flattened.nodes.len(),
        flattened.minted,
        flattened.reminted.len()
    );
    flattened
}
