//! Element - one node of the UI hierarchy

/// Single attribute, kept in authored order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// UI element with materialized children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// `None` until flattening mints one
    pub serial_id: Option<i64>,
    /// Full dotted type name (`UnityEngine.UIElements.Label`)
    pub type_name: String,
    pub attributes: Vec<Attribute>,
    /// Name of the template this element instantiates
    pub template_reference: Option<String>,
    /// Character data written directly inside the element
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            serial_id: None,
            type_name: type_name.into(),
            attributes: Vec::new(),
            template_reference: None,
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_serial_id(mut self, serial_id: i64) -> Self {
        self.serial_id = Some(serial_id);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.name == name).map(|a| a.value.as_str())
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }

    pub fn name(&self) -> Option<&str> {
        self.attribute("name")
    }

    /// Class tokens in authored order, duplicates included
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class").unwrap_or_default().split_whitespace()
    }

    /// Namespace part of the type name (empty for an unqualified type)
    pub fn namespace(&self) -> &str {
        self.type_name.rsplit_once('.').map_or("", |(ns, _)| ns)
    }

    pub fn local_name(&self) -> &str {
        self.type_name.rsplit_once('.').map_or(self.type_name.as_str(), |(_, local)| local)
    }

    /// Pre-order walk of this element and everything below it
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

// Subtrees are unlinked onto a worklist so dropping a deep chain does not
// recurse once per level.
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut child) = pending.pop() {
            pending.append(&mut child.children);
        }
    }
}

/// Pre-order iterator over an element subtree
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}
