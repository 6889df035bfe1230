//! Host page abstraction.
//!
//! The client never owns the document it decorates. Everything it needs
//! from the host (lookup, attachment checks, insertion of the two injected
//! element kinds) goes through [`HostPage`].

use std::fmt;
use std::sync::{Arc, Mutex};

use mnemo_core::{CacheKey, Facet};

// ============================================================================
// NODE HANDLES
// ============================================================================

/// Opaque handle to a node in the host document.
///
/// Two handles are equal exactly when they name the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

// ============================================================================
// SELECTORS
// ============================================================================

/// Attribute condition inside a [`Selector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    /// `None` matches on presence only.
    pub value: Option<String>,
}

/// A compound CSS selector: optional tag, id, classes and attribute conditions.
///
/// ```ignore
/// let label = Selector::tag("label")
///     .with_attr_eq("for", "user-response")
///     .with_attr("data-subject-id");
/// assert_eq!(label.to_string(), r#"label[for="user-response"][data-subject-id]"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeMatch>,
}

impl Selector {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self::default().with_class(class)
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(AttributeMatch {
            name: name.into(),
            value: None,
        });
        self
    }

    pub fn with_attr_eq(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(AttributeMatch {
            name: name.into(),
            value: Some(value.into()),
        });
        self
    }

    /// Test an element given its tag name and an attribute accessor.
    ///
    /// `id` and `class` are read through the accessor like any attribute.
    pub fn matches<'a, F>(&self, tag: &str, attribute: F) -> bool
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        if let Some(wanted) = &self.tag {
            if !wanted.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(wanted) = &self.id {
            if attribute("id") != Some(wanted.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let classes = attribute("class").unwrap_or_default();
            let has = |class: &String| classes.split_whitespace().any(|c| c == class);
            if !self.classes.iter().all(has) {
                return false;
            }
        }
        self.attributes.iter().all(|condition| {
            match (attribute(&condition.name), &condition.value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            }
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{}", id)?;
        }
        for class in &self.classes {
            write!(f, ".{}", class)?;
        }
        for condition in &self.attributes {
            match &condition.value {
                Some(value) => write!(f, "[{}=\"{}\"]", condition.name, value)?,
                None => write!(f, "[{}]", condition.name)?,
            }
        }
        if self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty() {
            f.write_str("*")?;
        }
        Ok(())
    }
}

// ============================================================================
// INJECTED ELEMENTS
// ============================================================================

/// Where a new element goes relative to an existing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Next sibling of the node.
    After(NodeId),
    /// Previous sibling of the node.
    Before(NodeId),
    /// Last child of the node.
    AppendTo(NodeId),
}

impl Placement {
    pub fn reference(&self) -> NodeId {
        match *self {
            Placement::After(node) | Placement::Before(node) | Placement::AppendTo(node) => node,
        }
    }
}

/// The two element kinds the client ever injects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotElement {
    Image { id: String, src: String },
    Control { id: String, label: String, busy: bool },
}

impl SlotElement {
    pub fn image(key: &CacheKey, src: impl Into<String>) -> Self {
        SlotElement::Image {
            id: image_element_id(key),
            src: src.into(),
        }
    }

    pub fn control(key: &CacheKey, facet: Facet) -> Self {
        SlotElement::Control {
            id: control_element_id(key),
            label: idle_label(facet),
            busy: false,
        }
    }

    pub fn element_id(&self) -> &str {
        match self {
            SlotElement::Image { id, .. } | SlotElement::Control { id, .. } => id,
        }
    }
}

/// Element id of the rendered image for a slot.
pub fn image_element_id(key: &CacheKey) -> String {
    format!("mnemonic-image-{}", key.stem())
}

/// Element id of the generation control for a slot.
pub fn control_element_id(key: &CacheKey) -> String {
    format!("mnemonic-generate-{}", key.stem())
}

pub fn idle_label(facet: Facet) -> String {
    format!("Generate {} image...", facet)
}

pub fn busy_label(facet: Facet) -> String {
    format!("Generating {} image...", facet)
}

// ============================================================================
// HOST PAGE
// ============================================================================

/// The document the client decorates.
///
/// Mutating calls return `None`/`false` when their target is gone; callers
/// treat that as a no-op.
pub trait HostPage: Send {
    /// First attached element matching `selector`, in document order.
    fn query(&self, selector: &Selector) -> Option<NodeId>;

    /// First attached descendant of `scope` matching `selector`.
    fn query_within(&self, scope: NodeId, selector: &Selector) -> Option<NodeId>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Whether the node is still part of the document.
    fn is_attached(&self, node: NodeId) -> bool;

    /// Attached element carrying `id`.
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    fn insert(&mut self, placement: Placement, element: SlotElement) -> Option<NodeId>;

    /// Put `element` where `node` is and detach `node`.
    fn replace(&mut self, node: NodeId, element: SlotElement) -> Option<NodeId>;

    fn remove(&mut self, node: NodeId) -> bool;

    /// Toggle a control between its idle and busy presentation.
    fn set_control_state(&mut self, node: NodeId, busy: bool, label: &str) -> bool;

    /// Whether a control is in its busy presentation. Busy controls carry
    /// the `disabled` attribute.
    fn control_busy(&self, node: NodeId) -> bool {
        self.attribute(node, "disabled").is_some()
    }
}

/// The page shared between the watcher, its probe tasks and control flows.
pub type SharedPage<P> = Arc<Mutex<P>>;

/// Whether an image or a control for `key` is currently in the document.
pub fn slot_present(page: &dyn HostPage, key: &CacheKey) -> bool {
    page.element_by_id(&image_element_id(key)).is_some()
        || page.element_by_id(&control_element_id(key)).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::SubjectId;
    use std::collections::HashMap;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_selector_display() {
        let label = Selector::tag("label")
            .with_attr_eq("for", "user-response")
            .with_attr("data-subject-id");
        assert_eq!(label.to_string(), r#"label[for="user-response"][data-subject-id]"#);
        assert_eq!(Selector::id("section-reading").to_string(), "#section-reading");
        assert_eq!(
            Selector::class("subject-section__note").to_string(),
            ".subject-section__note"
        );
        assert_eq!(Selector::default().to_string(), "*");
    }

    #[test]
    fn test_selector_matching() {
        let element = attrs(&[
            ("for", "user-response"),
            ("data-subject-id", "12"),
            ("class", "wk-label  answer"),
        ]);
        let lookup = |name: &str| element.get(name).map(String::as_str);

        assert!(Selector::tag("label").with_attr("data-subject-id").matches("LABEL", lookup));
        assert!(Selector::class("answer").with_class("wk-label").matches("label", lookup));
        assert!(!Selector::tag("meta").matches("label", lookup));
        assert!(!Selector::default().with_attr_eq("for", "other").matches("label", lookup));
        assert!(!Selector::id("x").matches("label", lookup));
    }

    #[test]
    fn test_slot_ids() {
        let key = CacheKey::new(SubjectId::new(12).unwrap(), Facet::Meaning);
        assert_eq!(image_element_id(&key), "mnemonic-image-00012_meaning");
        assert_eq!(control_element_id(&key), "mnemonic-generate-00012_meaning");
        assert_eq!(
            SlotElement::control(&key, Facet::Meaning),
            SlotElement::Control {
                id: "mnemonic-generate-00012_meaning".to_string(),
                label: "Generate meaning image...".to_string(),
                busy: false,
            }
        );
    }
}
