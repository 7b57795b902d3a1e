//! Document object model
//!
//! A [`Document`] owns a tree of nodes stored in a slot map. Object nodes have
//! an ordered child list and may carry a reflected object; attribute nodes hold
//! a name and a text value. Parent and sibling links always mirror the child
//! lists, and every change goes through [`Document::add_child`] or
//! [`Document::remove_child`].
//!
//! Listeners observe those changes. Pre-hooks can refuse a change:
//!
//! ```ignore
//! let mut doc = Document::new();
//! doc.on_child_adding(|doc, event| match doc.get(event.child) {
//!     Some(node) if node.name().is_empty() => Err(Veto::new("unnamed node")),
//!     _ => Ok(()),
//! });
//! ```

pub mod events;

use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

pub use events::{ChildEvent, ListenerKey, PostHook, PreHook, Veto};

use events::{EventType, Listener, Listeners};

use crate::object::ObjectPtr;
use crate::registry::Composite;
use crate::visitor::{visit_reference, Visitor};

new_key_type! {
    /// Key of a node in its document
    pub struct NodeKey;
}

/// Errors raised by document mutations
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeKey),

    /// Attribute nodes cannot have children
    #[error("Node {0:?} is not an object node")]
    NotAnObject(NodeKey),

    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeKey, child: NodeKey },

    /// The child is the parent itself or one of its ancestors
    #[error("Adding {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeKey, child: NodeKey },

    #[error("The document root cannot be moved or destroyed")]
    RootNode,

    #[error("Change vetoed: {0}")]
    Vetoed(#[from] Veto),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Node payload
#[derive(Debug)]
pub enum NodeKind {
    Object {
        children: Vec<NodeKey>,
        payload: Option<ObjectPtr>,
    },
    Attribute {
        value: String,
    },
}

/// One node of a document
#[derive(Debug)]
pub struct DocumentNode {
    name: String,
    kind: NodeKind,
    parent: Option<NodeKey>,
    next_sibling: Option<NodeKey>,
    previous_sibling: Option<NodeKey>,
    attached: bool,
}

impl DocumentNode {
    fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            kind,
            parent: None,
            next_sibling: None,
            previous_sibling: None,
            attached: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, NodeKind::Object { .. })
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn next_sibling(&self) -> Option<NodeKey> {
        self.next_sibling
    }

    pub fn previous_sibling(&self) -> Option<NodeKey> {
        self.previous_sibling
    }

    /// Whether the node is reachable from the document root
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Ordered children; always empty for attributes
    pub fn children(&self) -> &[NodeKey] {
        match &self.kind {
            NodeKind::Object { children, .. } => children,
            NodeKind::Attribute { .. } => &[],
        }
    }

    pub fn payload(&self) -> Option<&ObjectPtr> {
        match &self.kind {
            NodeKind::Object { payload, .. } => payload.as_ref(),
            NodeKind::Attribute { .. } => None,
        }
    }

    /// Attribute value
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Attribute { value } => Some(value),
            NodeKind::Object { .. } => None,
        }
    }
}

/// A tree of nodes with change notification
#[derive(Debug)]
pub struct Document {
    nodes: SlotMap<NodeKey, DocumentNode>,
    root: NodeKey,
    listeners: Listeners,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let mut root = DocumentNode::new(
            "Document".to_string(),
            NodeKind::Object {
                children: Vec::new(),
                payload: None,
            },
        );
        root.attached = true;
        let root = nodes.insert(root);
        Self {
            nodes,
            root,
            listeners: Listeners::default(),
        }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of nodes, attached or not, the root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: NodeKey) -> Option<&DocumentNode> {
        self.nodes.get(key)
    }

    fn node(&self, key: NodeKey) -> DocumentResult<&DocumentNode> {
        self.nodes.get(key).ok_or(DocumentError::UnknownNode(key))
    }

    /// Create an unattached object node
    pub fn create_object(&mut self, name: impl Into<String>, payload: Option<ObjectPtr>) -> NodeKey {
        self.nodes.insert(DocumentNode::new(
            name.into(),
            NodeKind::Object {
                children: Vec::new(),
                payload,
            },
        ))
    }

    /// Create an unattached attribute node
    pub fn create_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> NodeKey {
        self.nodes.insert(DocumentNode::new(
            name.into(),
            NodeKind::Attribute {
                value: value.into(),
            },
        ))
    }

    pub fn set_payload(&mut self, key: NodeKey, object: Option<ObjectPtr>) -> DocumentResult<()> {
        match &mut self.nodes.get_mut(key).ok_or(DocumentError::UnknownNode(key))?.kind {
            NodeKind::Object { payload, .. } => {
                *payload = object;
                Ok(())
            }
            NodeKind::Attribute { .. } => Err(DocumentError::NotAnObject(key)),
        }
    }

    /// Replace an attribute's value; returns `false` for object nodes
    pub fn set_value(&mut self, key: NodeKey, text: impl Into<String>) -> DocumentResult<bool> {
        match &mut self.nodes.get_mut(key).ok_or(DocumentError::UnknownNode(key))?.kind {
            NodeKind::Attribute { value } => {
                *value = text.into();
                Ok(true)
            }
            NodeKind::Object { .. } => Ok(false),
        }
    }

    /// Append `child` to `parent`'s children
    ///
    /// A child that already has a parent is removed from it first, raising the
    /// removal events; if the add is then vetoed the child stays unattached.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> DocumentResult<()> {
        let index = self.node(parent)?.children().len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` among `parent`'s children, clamped to the end
    pub fn insert_child(&mut self, parent: NodeKey, index: usize, child: NodeKey) -> DocumentResult<()> {
        if !self.node(parent)?.is_object() {
            return Err(DocumentError::NotAnObject(parent));
        }
        self.node(child)?;
        if child == self.root {
            return Err(DocumentError::RootNode);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(DocumentError::Cycle { parent, child });
        }

        let mut index = index;
        if let Some(previous) = self.nodes[child].parent {
            let position = self.nodes[previous]
                .children()
                .iter()
                .position(|&key| key == child);
            self.remove_child(previous, child)?;
            // Moving within one parent shifts later slots down by one
            if previous == parent && position.is_some_and(|position| position < index) {
                index -= 1;
            }
        }

        let event = ChildEvent { parent, child };
        self.fire_pre(EventType::ChildAdding, &event)?;

        if let NodeKind::Object { children, .. } = &mut self.nodes[parent].kind {
            let index = index.min(children.len());
            children.insert(index, child);
        }
        self.nodes[child].parent = Some(parent);
        self.relink(parent);
        let attached = self.nodes[parent].attached;
        self.set_attached(child, attached);
        debug!(
            "Added {} under {}",
            self.nodes[child].name, self.nodes[parent].name
        );

        self.fire_post(EventType::ChildAdded, &event);
        Ok(())
    }

    /// Detach `child` from `parent`; the node and its subtree stay in the arena
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> DocumentResult<()> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Err(DocumentError::NotAChild { parent, child });
        }

        let event = ChildEvent { parent, child };
        self.fire_pre(EventType::ChildRemoving, &event)?;

        if let NodeKind::Object { children, .. } = &mut self.nodes[parent].kind {
            children.retain(|&key| key != child);
        }
        let node = &mut self.nodes[child];
        node.parent = None;
        node.next_sibling = None;
        node.previous_sibling = None;
        self.relink(parent);
        self.set_attached(child, false);
        debug!(
            "Removed {} from {}",
            self.nodes[child].name, self.nodes[parent].name
        );

        self.fire_post(EventType::ChildRemoved, &event);
        Ok(())
    }

    /// Detach a node if needed, then drop it and its subtree from the arena
    pub fn destroy(&mut self, key: NodeKey) -> DocumentResult<()> {
        if key == self.root {
            return Err(DocumentError::RootNode);
        }
        if let Some(parent) = self.node(key)?.parent {
            self.remove_child(parent, key)?;
        }
        for node in self.descendants(key) {
            self.nodes.remove(node);
        }
        Ok(())
    }

    /// `key` and every node below it, depth first in child order
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.get(next) else {
                continue;
            };
            out.push(next);
            stack.extend(node.children().iter().rev());
        }
        out
    }

    /// First child of `parent` named `name`
    pub fn find_child(&self, parent: NodeKey, name: &str) -> Option<NodeKey> {
        let node = self.nodes.get(parent)?;
        node.children()
            .iter()
            .copied()
            .find(|&child| self.nodes[child].name == name)
    }

    /// Value of the attribute child `name` of `parent`
    pub fn attribute(&self, parent: NodeKey, name: &str) -> Option<&str> {
        let node = self.nodes.get(parent)?;
        node.children()
            .iter()
            .map(|&child| &self.nodes[child])
            .find(|child| child.name == name && !child.is_object())
            .and_then(DocumentNode::value)
    }

    /// Attached nodes whose payload is of `class` or derives from it
    pub fn nodes_of_type(&self, class: &Composite) -> Vec<NodeKey> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&key| {
                self.nodes[key]
                    .payload()
                    .is_some_and(|payload| payload.read().is_type(class))
            })
            .collect()
    }

    /// Offer every attached payload to `visitor`, in document order
    pub fn accept(&self, visitor: &mut dyn Visitor) {
        for key in self.descendants(self.root) {
            if let Some(payload) = self.nodes[key].payload() {
                visit_reference(&mut payload.clone(), visitor);
            }
        }
    }

    /// Check parent, sibling and attachment links against the child lists
    pub fn verify(&self) -> bool {
        if self.nodes[self.root].parent.is_some() || !self.nodes[self.root].attached {
            return false;
        }

        for (key, node) in &self.nodes {
            if let Some(parent) = node.parent {
                let Some(parent_node) = self.nodes.get(parent) else {
                    return false;
                };
                let count = parent_node.children().iter().filter(|&&c| c == key).count();
                if count != 1 || node.attached != parent_node.attached {
                    return false;
                }
            } else if key != self.root && node.attached {
                return false;
            }

            let children = node.children();
            for (i, &child) in children.iter().enumerate() {
                let Some(child_node) = self.nodes.get(child) else {
                    return false;
                };
                let previous = i.checked_sub(1).map(|j| children[j]);
                let next = children.get(i + 1).copied();
                if child_node.parent != Some(key)
                    || child_node.previous_sibling != previous
                    || child_node.next_sibling != next
                {
                    return false;
                }
            }
        }
        true
    }

    // Listeners

    pub fn on_child_adding<F>(&mut self, callback: F) -> ListenerKey
    where
        F: FnMut(&Document, &ChildEvent) -> Result<(), Veto> + Send + 'static,
    {
        self.listeners.insert(Listener::ChildAdding(Box::new(callback)))
    }

    pub fn on_child_added<F>(&mut self, callback: F) -> ListenerKey
    where
        F: FnMut(&Document, &ChildEvent) + Send + 'static,
    {
        self.listeners.insert(Listener::ChildAdded(Box::new(callback)))
    }

    pub fn on_child_removing<F>(&mut self, callback: F) -> ListenerKey
    where
        F: FnMut(&Document, &ChildEvent) -> Result<(), Veto> + Send + 'static,
    {
        self.listeners.insert(Listener::ChildRemoving(Box::new(callback)))
    }

    pub fn on_child_removed<F>(&mut self, callback: F) -> ListenerKey
    where
        F: FnMut(&Document, &ChildEvent) + Send + 'static,
    {
        self.listeners.insert(Listener::ChildRemoved(Box::new(callback)))
    }

    /// Returns `true` if the listener was found and removed
    pub fn remove_listener(&mut self, key: ListenerKey) -> bool {
        self.listeners.remove(key)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn fire_pre(&mut self, kind: EventType, event: &ChildEvent) -> Result<(), Veto> {
        let mut listeners = std::mem::take(&mut self.listeners);
        let result = listeners.fire_pre(kind, self, event);
        self.listeners = listeners;
        if let Err(veto) = &result {
            debug!("{:?} vetoed: {}", kind, veto);
        }
        result
    }

    fn fire_post(&mut self, kind: EventType, event: &ChildEvent) {
        let mut listeners = std::mem::take(&mut self.listeners);
        listeners.fire_post(kind, self, event);
        self.listeners = listeners;
    }

    // Link maintenance

    fn is_ancestor_or_self(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(next) = current {
            if next == ancestor {
                return true;
            }
            current = self.nodes.get(next).and_then(|node| node.parent);
        }
        false
    }

    /// Rebuild the sibling chain of `parent`'s children
    fn relink(&mut self, parent: NodeKey) {
        let children = self.nodes[parent].children().to_vec();
        for (i, &child) in children.iter().enumerate() {
            let node = &mut self.nodes[child];
            node.previous_sibling = i.checked_sub(1).map(|j| children[j]);
            node.next_sibling = children.get(i + 1).copied();
        }
    }

    fn set_attached(&mut self, key: NodeKey, attached: bool) {
        for node in self.descendants(key) {
            trace!("Node {:?} attached: {}", node, attached);
            self.nodes[node].attached = attached;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    fn record(doc: &mut Document) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let names = |doc: &Document, event: &ChildEvent| {
            format!(
                "{}>{}",
                doc.get(event.parent).map_or("?", DocumentNode::name),
                doc.get(event.child).map_or("?", DocumentNode::name)
            )
        };

        let out = log.clone();
        doc.on_child_adding(move |doc, event| {
            out.lock().push(format!("adding {}", names(doc, event)));
            Ok(())
        });
        let out = log.clone();
        doc.on_child_added(move |doc, event| out.lock().push(format!("added {}", names(doc, event))));
        let out = log.clone();
        doc.on_child_removing(move |doc, event| {
            out.lock().push(format!("removing {}", names(doc, event)));
            Ok(())
        });
        let out = log.clone();
        doc.on_child_removed(move |doc, event| {
            out.lock().push(format!("removed {}", names(doc, event)))
        });
        log
    }

    #[test]
    fn test_add_and_remove() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_object("a", None);
        let b = doc.create_object("b", None);
        let c = doc.create_attribute("c", "1");

        doc.add_child(root, a).unwrap();
        doc.add_child(root, b).unwrap();
        doc.add_child(a, c).unwrap();
        assert!(doc.verify());

        assert_eq!(doc.get(root).unwrap().children(), &[a, b]);
        assert_eq!(doc.get(a).unwrap().next_sibling(), Some(b));
        assert_eq!(doc.get(b).unwrap().previous_sibling(), Some(a));
        assert!(doc.get(c).unwrap().is_attached());
        assert_eq!(doc.attribute(a, "c"), Some("1"));

        doc.remove_child(root, a).unwrap();
        assert!(doc.verify());
        assert!(!doc.get(a).unwrap().is_attached());
        assert!(!doc.get(c).unwrap().is_attached());
        assert_eq!(doc.get(b).unwrap().previous_sibling(), None);
    }

    #[test]
    fn test_invalid_changes() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_object("a", None);
        let b = doc.create_object("b", None);
        let attr = doc.create_attribute("x", "y");
        doc.add_child(root, a).unwrap();
        doc.add_child(a, b).unwrap();

        assert!(matches!(doc.add_child(b, a), Err(DocumentError::Cycle { .. })));
        assert!(matches!(doc.add_child(a, a), Err(DocumentError::Cycle { .. })));
        assert!(matches!(doc.add_child(attr, b), Err(DocumentError::NotAnObject(_))));
        assert!(matches!(doc.add_child(a, root), Err(DocumentError::RootNode)));
        assert!(matches!(
            doc.remove_child(root, b),
            Err(DocumentError::NotAChild { .. })
        ));
        assert!(doc.verify());
    }

    #[test]
    fn test_veto_leaves_document_unchanged() {
        let mut doc = Document::new();
        let root = doc.root();
        let key = doc.on_child_adding(|doc, event| match doc.get(event.child) {
            Some(node) if node.name() == "blocked" => Err(Veto::new("blocked by test")),
            _ => Ok(()),
        });

        let blocked = doc.create_object("blocked", None);
        let err = doc.add_child(root, blocked).unwrap_err();
        assert!(matches!(err, DocumentError::Vetoed(ref veto) if veto.reason() == "blocked by test"));
        assert!(doc.get(root).unwrap().children().is_empty());
        assert!(doc.get(blocked).unwrap().parent().is_none());

        assert!(doc.remove_listener(key));
        assert!(!doc.remove_listener(key));
        doc.add_child(root, blocked).unwrap();
        assert!(doc.verify());
    }

    #[test]
    fn test_reparent_fires_removal_first() {
        let mut doc = Document::new();
        let root = doc.root();
        let p1 = doc.create_object("p1", None);
        let p2 = doc.create_object("p2", None);
        let first = doc.create_object("first", None);
        let node = doc.create_object("node", None);
        let last = doc.create_object("last", None);
        doc.add_child(root, p1).unwrap();
        doc.add_child(root, p2).unwrap();
        doc.add_child(p1, first).unwrap();
        doc.add_child(p1, node).unwrap();
        doc.add_child(p1, last).unwrap();

        let log = record(&mut doc);
        doc.add_child(p2, node).unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "removing p1>node",
                "removed p1>node",
                "adding p2>node",
                "added p2>node",
            ]
        );
        assert_eq!(doc.get(p1).unwrap().children(), &[first, last]);
        assert_eq!(doc.get(first).unwrap().next_sibling(), Some(last));
        assert_eq!(doc.get(node).unwrap().parent(), Some(p2));
        assert!(doc.verify());
    }

    #[test]
    fn test_move_within_parent() {
        let mut doc = Document::new();
        let root = doc.root();
        let keys: Vec<NodeKey> = (0..3)
            .map(|i| doc.create_object(format!("n{}", i), None))
            .collect();
        for &key in &keys {
            doc.add_child(root, key).unwrap();
        }

        doc.insert_child(root, 3, keys[0]).unwrap();
        assert_eq!(doc.get(root).unwrap().children(), &[keys[1], keys[2], keys[0]]);
        doc.insert_child(root, 0, keys[0]).unwrap();
        assert_eq!(doc.get(root).unwrap().children(), &keys[..]);
        assert!(doc.verify());
    }

    #[test]
    fn test_destroy_subtree() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_object("a", None);
        let b = doc.create_attribute("b", "");
        doc.add_child(root, a).unwrap();
        doc.add_child(a, b).unwrap();
        assert_eq!(doc.descendants(root), vec![root, a, b]);

        doc.destroy(a).unwrap();
        assert_eq!(doc.len(), 1);
        assert!(doc.get(b).is_none());
        assert!(matches!(doc.destroy(root), Err(DocumentError::RootNode)));
        assert!(doc.verify());
    }
}
