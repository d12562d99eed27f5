use crate::Result;
use std::fmt;
use tokio::sync::broadcast;

/// Opaque handle to an element in a page tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes,
    Text,
}

/// One structural change observed in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeMutation {
    pub kind: MutationKind,
    pub target: NodeId,
}

/// Detached element description, materialised by [`PageTree::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSpec {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub styles: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if let Some((_, existing)) = self.attributes.iter_mut().find(|(k, _)| k == "class") {
            existing.push(' ');
            existing.push_str(&class);
            return self;
        }
        self.attr("class", class)
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    #[must_use]
    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.push((property.into(), value.into()));
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Live, mutable page tree owned by the host page.
///
/// Implementations use interior locking; every call is short and synchronous.
/// Calls on nodes that were removed report [`crate::PageError::NodeNotFound`]
/// or [`crate::PageError::Detached`] instead of panicking.
pub trait PageTree: Send + Sync {
    /// Current location of the page.
    fn url(&self) -> String;

    fn body(&self) -> NodeId;

    /// First element in document order matching `selector`.
    fn query(&self, selector: &str) -> Result<Option<NodeId>>;

    fn query_all(&self, selector: &str) -> Result<Vec<NodeId>>;

    /// First descendant of `scope` matching `selector`.
    fn query_within(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>>;

    fn query_all_within(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>>;

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>>;

    /// Concatenated text of the node and its descendants.
    fn text(&self, node: NodeId) -> Result<String>;

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>>;

    fn first_child(&self, node: NodeId) -> Result<Option<NodeId>>;

    fn is_attached(&self, node: NodeId) -> bool;

    /// Materialises a detached subtree and returns its root.
    fn create(&self, spec: &ElementSpec) -> Result<NodeId>;

    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()>;

    /// Inserts `child` under `parent` before `reference`, or last when `reference` is `None`.
    fn insert_before(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>)
        -> Result<()>;

    /// Removes the node and its subtree. Removing an unknown node is a no-op.
    fn remove(&self, node: NodeId) -> Result<()>;

    fn set_styles(&self, node: NodeId, styles: &[(&str, &str)]) -> Result<()>;

    /// Mutation stream scoped to the document body.
    fn subscribe(&self) -> broadcast::Receiver<TreeMutation>;
}
