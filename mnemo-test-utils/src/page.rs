//! In-memory host document.

use std::collections::{BTreeMap, HashMap};

use mnemo_client::{HostPage, NodeId, Placement, Selector, SlotElement};

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    slot: Option<SlotElement>,
}

impl Node {
    fn element(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            slot: None,
        }
    }
}

/// A tree of elements rooted at `body`, implementing [`HostPage`].
///
/// Detached nodes keep their handle and attributes, so stale handles behave
/// like removed DOM nodes: still readable, no longer attached.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
    root: NodeId,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::element("body"));
        Self {
            nodes,
            next_id: 1,
            root,
        }
    }

    pub fn body(&self) -> NodeId {
        self.root
    }

    /// Append an element under `parent` and return its handle.
    pub fn append(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut node = Node::element(tag);
        for (name, value) in attributes {
            node.attributes.insert(name.to_string(), value.to_string());
        }
        let id = self.allocate(node);
        self.attach(parent, id, None);
        id
    }

    /// Remove `node` (and its subtree) from the document.
    pub fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes.get(&node).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|child| *child != node);
        }
        if let Some(node) = self.nodes.get_mut(&node) {
            node.parent = None;
        }
        true
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// The injected element behind `node`, if it is one.
    pub fn slot(&self, node: NodeId) -> Option<&SlotElement> {
        self.nodes.get(&node).and_then(|n| n.slot.as_ref())
    }

    /// Number of attached elements carrying `id`.
    pub fn count_with_id(&self, id: &str) -> usize {
        self.attached_in_order()
            .into_iter()
            .filter(|node| self.attr(*node, "id") == Some(id))
            .count()
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            match index {
                Some(index) if index <= parent_node.children.len() => {
                    parent_node.children.insert(index, child)
                }
                _ => parent_node.children.push(child),
            }
        }
        if let Some(child) = self.nodes.get_mut(&child) {
            child.parent = Some(parent);
        }
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(&node)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        match self.nodes.get(&node) {
            Some(n) => selector.matches(&n.tag, |name| n.attributes.get(name).map(String::as_str)),
            None => false,
        }
    }

    /// Pre-order walk below `scope`, excluding `scope` itself.
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        out
    }

    fn attached_in_order(&self) -> Vec<NodeId> {
        let mut all = vec![self.root];
        all.extend(self.descendants(self.root));
        all
    }

    fn position(&self, node: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(node)?;
        let index = self.nodes.get(&parent)?.children.iter().position(|c| *c == node)?;
        Some((parent, index))
    }

    fn slot_node(element: SlotElement) -> Node {
        let mut node = match &element {
            SlotElement::Image { id, src } => {
                let mut node = Node::element("img");
                node.attributes.insert("id".to_string(), id.clone());
                node.attributes.insert("src".to_string(), src.clone());
                node
            }
            SlotElement::Control { id, .. } => {
                let mut node = Node::element("button");
                node.attributes.insert("id".to_string(), id.clone());
                node.attributes
                    .insert("class".to_string(), "generate-image-button".to_string());
                node
            }
        };
        node.slot = Some(element);
        node
    }
}

impl HostPage for MemoryPage {
    fn query(&self, selector: &Selector) -> Option<NodeId> {
        self.attached_in_order()
            .into_iter()
            .find(|node| self.matches(*node, selector))
    }

    fn query_within(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        if !self.is_attached(scope) {
            return None;
        }
        self.descendants(scope)
            .into_iter()
            .find(|node| self.matches(*node, selector))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.attr(node, name).map(str::to_string)
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.attached_in_order()
            .into_iter()
            .find(|node| self.attr(*node, "id") == Some(id))
    }

    fn insert(&mut self, placement: Placement, element: SlotElement) -> Option<NodeId> {
        let reference = placement.reference();
        if !self.is_attached(reference) {
            return None;
        }
        let (parent, index) = match placement {
            Placement::AppendTo(container) => (container, None),
            Placement::Before(anchor) => {
                let (parent, index) = self.position(anchor)?;
                (parent, Some(index))
            }
            Placement::After(anchor) => {
                let (parent, index) = self.position(anchor)?;
                (parent, Some(index + 1))
            }
        };
        let id = self.allocate(Self::slot_node(element));
        self.attach(parent, id, index);
        Some(id)
    }

    fn replace(&mut self, node: NodeId, element: SlotElement) -> Option<NodeId> {
        if !self.is_attached(node) {
            return None;
        }
        let (parent, index) = self.position(node)?;
        self.detach(node);
        let id = self.allocate(Self::slot_node(element));
        self.attach(parent, id, Some(index));
        Some(id)
    }

    fn remove(&mut self, node: NodeId) -> bool {
        node != self.root && self.detach(node)
    }

    fn set_control_state(&mut self, node: NodeId, busy: bool, label: &str) -> bool {
        if !self.is_attached(node) {
            return false;
        }
        let Some(entry) = self.nodes.get_mut(&node) else {
            return false;
        };
        match &mut entry.slot {
            Some(SlotElement::Control {
                label: current_label,
                busy: current_busy,
                ..
            }) => {
                *current_label = label.to_string();
                *current_busy = busy;
                if busy {
                    entry
                        .attributes
                        .insert("disabled".to_string(), "disabled".to_string());
                } else {
                    entry.attributes.remove("disabled");
                }
                true
            }
            _ => false,
        }
    }
}
