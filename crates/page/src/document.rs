use crate::{ElementSpec, MutationKind, NodeId, PageError, PageTree, Result, TreeMutation};
use ego_tree::NodeRef;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

const MUTATION_CHANNEL_CAPACITY: usize = 256;

const SKELETON: &str = "<!DOCTYPE html><html><head></head><body></body></html>";

type Handle = ego_tree::NodeId;

#[derive(Debug)]
struct Inner {
    url: String,
    html: Html,
    /// Element handles exposed through [`NodeId`]. Removed subtrees stay in the
    /// arena but lose their entries here.
    handles: HashMap<NodeId, Handle>,
    ids: HashMap<Handle, NodeId>,
    next_id: u64,
    root: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Inner {
    fn register(&mut self, handle: Handle) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.handles.insert(id, handle);
        self.ids.insert(handle, id);
        id
    }

    fn handle(&self, id: NodeId) -> Result<Handle> {
        self.handles.get(&id).copied().ok_or(PageError::NodeNotFound(id))
    }

    fn node_ref(&self, id: NodeId) -> Result<NodeRef<'_, Node>> {
        let handle = self.handle(id)?;
        self.html.tree.get(handle).ok_or(PageError::NodeNotFound(id))
    }

    fn element(&self, id: NodeId) -> Result<ElementRef<'_>> {
        self.node_ref(id)
            .and_then(|node| ElementRef::wrap(node).ok_or(PageError::NodeNotFound(id)))
    }

    fn id_of(&self, handle: Handle) -> Option<NodeId> {
        self.ids.get(&handle).copied()
    }

    fn element_children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self
            .node_ref(id)?
            .children()
            .filter_map(|child| self.id_of(child.id()))
            .collect())
    }

    fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self
            .node_ref(id)?
            .parent()
            .and_then(|parent| self.id_of(parent.id())))
    }

    fn is_attached(&self, id: NodeId) -> bool {
        let root = self.html.tree.root().id();
        self.node_ref(id)
            .is_ok_and(|node| node.ancestors().any(|ancestor| ancestor.id() == root))
    }

    fn is_ancestor_or_self(&self, candidate: Handle, of: Handle) -> bool {
        candidate == of
            || self
                .html
                .tree
                .get(of)
                .is_some_and(|node| node.ancestors().any(|ancestor| ancestor.id() == candidate))
    }

    /// Copies `source` and its subtree from a parsed fragment into the page
    /// arena as an orphan, registering every element on the way.
    fn graft(&mut self, source: NodeRef<'_, Node>) -> Handle {
        let handle = self.html.tree.orphan(source.value().clone()).id();
        if source.value().is_element() {
            self.register(handle);
        }
        for child in source.children() {
            let child_handle = self.graft(child);
            if let Some(mut parent) = self.html.tree.get_mut(handle) {
                parent.append_id(child_handle);
            }
        }
        handle
    }

    fn unregister_subtree(&mut self, handle: Handle) {
        let Some(node) = self.html.tree.get(handle) else {
            return;
        };
        let stale: Vec<Handle> = node.descendants().map(|n| n.id()).collect();
        for handle in stale {
            if let Some(id) = self.ids.remove(&handle) {
                self.handles.remove(&id);
            }
        }
    }

    fn detach(&mut self, handle: Handle) {
        if let Some(mut node) = self.html.tree.get_mut(handle) {
            node.detach();
        }
    }

    fn attributes(&self, id: NodeId) -> Result<(String, Vec<(String, String)>)> {
        let element = self.element(id)?;
        let value = element.value();
        let attributes = value
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Ok((value.name().to_string(), attributes))
    }

    /// Swaps the element at `id` for one with `attributes`, keeping children.
    fn rewrite(&mut self, id: NodeId, attributes: &[(String, String)]) -> Result<()> {
        let (tag, _) = self.attributes(id)?;
        let element = parse_element(&tag, attributes)?;
        let handle = self.handle(id)?;
        if let Some(mut node) = self.html.tree.get_mut(handle) {
            *node.value() = Node::Element(element);
        }
        Ok(())
    }
}

/// In-memory [`PageTree`] backed by a [`scraper::Html`] document.
///
/// Elements are materialised by parsing their markup, so the tree holds the
/// same nodes a parsed page would. Structural changes publish
/// [`TreeMutation`]s. Changing the URL does not, mirroring history-API
/// navigation that only a poll can observe.
#[derive(Debug)]
pub struct Document {
    inner: Mutex<Inner>,
    mutations: broadcast::Sender<TreeMutation>,
}

impl Document {
    pub fn new(url: impl Into<String>) -> Self {
        let html = Html::parse_document(SKELETON);
        let (root_handle, section_handles) = {
            let root: NodeRef<'_, Node> = *html.root_element();
            let sections: Vec<Handle> = root
                .children()
                .filter(|section| section.value().is_element())
                .map(|section| section.id())
                .collect();
            (root.id(), sections)
        };
        let mut inner = Inner {
            url: url.into(),
            html,
            handles: HashMap::new(),
            ids: HashMap::new(),
            next_id: 1,
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
        };
        inner.root = inner.register(root_handle);
        let mut sections = Vec::with_capacity(section_handles.len());
        for handle in section_handles {
            sections.push(inner.register(handle));
        }
        inner.head = sections.first().copied().unwrap_or(inner.root);
        inner.body = sections.get(1).copied().unwrap_or(inner.root);

        let (mutations, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(inner),
            mutations,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, kind: MutationKind, target: NodeId) {
        // No receivers simply means nobody observes the page.
        let _ = self.mutations.send(TreeMutation { kind, target });
    }

    /// Number of live mutation subscribers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.mutations.receiver_count()
    }

    #[must_use]
    pub fn head(&self) -> NodeId {
        self.lock().head
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.lock().url = url.into();
    }

    /// Creates `spec` and appends it under `parent`.
    pub fn append(&self, parent: NodeId, spec: ElementSpec) -> Result<NodeId> {
        let node = self.create(&spec)?;
        self.append_child(parent, node)?;
        Ok(node)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        {
            let mut inner = self.lock();
            let (_, mut attributes) = inner.attributes(node)?;
            match attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
            inner.rewrite(node, &attributes)?;
        }
        self.publish(MutationKind::Attributes, node);
        Ok(())
    }

    /// Replaces the node's own text, leaving child elements in place.
    pub fn set_text(&self, node: NodeId, text: &str) -> Result<()> {
        {
            let mut inner = self.lock();
            let stale: Vec<Handle> = inner
                .node_ref(node)?
                .children()
                .filter(|child| child.value().is_text())
                .map(|child| child.id())
                .collect();
            for handle in stale {
                inner.detach(handle);
            }
            if !text.is_empty() {
                let value = parse_text(text)?;
                let handle = inner.handle(node)?;
                let tree = &mut inner.html.tree;
                let text_handle = tree.orphan(value).id();
                let first = tree
                    .get(handle)
                    .and_then(|n| n.first_child())
                    .map(|child| child.id());
                match first {
                    Some(first) => {
                        if let Some(mut first) = tree.get_mut(first) {
                            first.insert_id_before(text_handle);
                        }
                    }
                    None => {
                        if let Some(mut target) = tree.get_mut(handle) {
                            target.append_id(text_handle);
                        }
                    }
                }
            }
        }
        self.publish(MutationKind::Text, node);
        Ok(())
    }

    /// Inline style value, mainly for assertions.
    pub fn style(&self, node: NodeId, property: &str) -> Result<Option<String>> {
        let inner = self.lock();
        let element = inner.element(node)?;
        Ok(element.value().attr("style").and_then(|style| {
            parse_styles(style)
                .into_iter()
                .rev()
                .find(|(k, _)| k == property)
                .map(|(_, v)| v)
        }))
    }

    /// Element children in document order.
    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        self.lock().element_children(node)
    }

    pub fn tag(&self, node: NodeId) -> Result<String> {
        Ok(self.lock().element(node)?.value().name().to_string())
    }

    fn select(&self, scope: Option<NodeId>, selector: &str, first: bool) -> Result<Vec<NodeId>> {
        let parsed = Selector::parse(selector).map_err(|err| PageError::InvalidSelector {
            selector: selector.to_string(),
            reason: err.to_string(),
        })?;
        let inner = self.lock();
        let scope = match scope {
            Some(scope) => inner.node_ref(scope)?,
            None => inner.html.tree.root(),
        };
        let matches = scope
            .descendants()
            .skip(1)
            .filter(|node| ElementRef::wrap(*node).is_some_and(|element| parsed.matches(&element)))
            .filter_map(|node| inner.id_of(node.id()));
        Ok(if first {
            matches.take(1).collect()
        } else {
            matches.collect()
        })
    }
}

impl PageTree for Document {
    fn url(&self) -> String {
        self.lock().url.clone()
    }

    fn body(&self) -> NodeId {
        self.lock().body
    }

    fn query(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.select(None, selector, true)?.into_iter().next())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.select(None, selector, false)
    }

    fn query_within(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.select(Some(scope), selector, true)?.into_iter().next())
    }

    fn query_all_within(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        self.select(Some(scope), selector, false)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>> {
        let inner = self.lock();
        Ok(inner.element(node)?.value().attr(name).map(str::to_string))
    }

    fn text(&self, node: NodeId) -> Result<String> {
        Ok(self.lock().element(node)?.text().collect())
    }

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        self.lock().parent_of(node)
    }

    fn first_child(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.lock().element_children(node)?.first().copied())
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.lock().is_attached(node)
    }

    fn create(&self, spec: &ElementSpec) -> Result<NodeId> {
        let mut markup = String::new();
        render(spec, &mut markup)?;
        let fragment = Html::parse_fragment(&markup);
        // The parser drops or moves elements that are not valid in a body.
        let source = first_element(&fragment)
            .filter(|element| element.value().name().eq_ignore_ascii_case(spec.tag.trim()))
            .ok_or_else(|| {
                PageError::InsertRejected(format!("<{}> cannot be created here", spec.tag))
            })?;

        let mut inner = self.lock();
        let handle = inner.graft(*source);
        inner
            .id_of(handle)
            .ok_or_else(|| PageError::Other(format!("<{}> was not registered", spec.tag)))
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        {
            let mut inner = self.lock();
            let parent_handle = inner.handle(parent)?;
            let child_handle = inner.handle(child)?;
            if !inner.is_attached(parent) {
                return Err(PageError::Detached(parent));
            }
            if inner.is_ancestor_or_self(child_handle, parent_handle) {
                return Err(PageError::InsertRejected(format!(
                    "{child} is an ancestor of {parent}"
                )));
            }
            match reference {
                Some(reference) => {
                    if inner.parent_of(reference)? != Some(parent) {
                        return Err(PageError::InsertRejected(format!(
                            "{reference} is not a child of {parent}"
                        )));
                    }
                    if reference != child {
                        let reference_handle = inner.handle(reference)?;
                        if let Some(mut sibling) = inner.html.tree.get_mut(reference_handle) {
                            sibling.insert_id_before(child_handle);
                        }
                    }
                }
                None => {
                    if let Some(mut target) = inner.html.tree.get_mut(parent_handle) {
                        target.append_id(child_handle);
                    }
                }
            }
        }
        self.publish(MutationKind::ChildList, parent);
        Ok(())
    }

    fn remove(&self, node: NodeId) -> Result<()> {
        let parent = {
            let mut inner = self.lock();
            if node == inner.root || node == inner.body || node == inner.head {
                return Err(PageError::Other(format!("{node} cannot be removed")));
            }
            let Ok(handle) = inner.handle(node) else {
                return Ok(());
            };
            let parent = inner.parent_of(node)?;
            inner.unregister_subtree(handle);
            inner.detach(handle);
            parent
        };
        if let Some(parent) = parent {
            self.publish(MutationKind::ChildList, parent);
        }
        Ok(())
    }

    fn set_styles(&self, node: NodeId, styles: &[(&str, &str)]) -> Result<()> {
        {
            let mut inner = self.lock();
            let (_, mut attributes) = inner.attributes(node)?;
            let mut declarations = attributes
                .iter()
                .find(|(k, _)| k == "style")
                .map(|(_, v)| parse_styles(v))
                .unwrap_or_default();
            for (property, value) in styles {
                declarations.retain(|(k, _)| k != property);
                declarations.push(((*property).to_string(), (*value).to_string()));
            }
            let style = join_styles(&declarations);
            match attributes.iter_mut().find(|(k, _)| k == "style") {
                Some((_, existing)) => *existing = style,
                None => attributes.push(("style".to_string(), style)),
            }
            inner.rewrite(node, &attributes)?;
        }
        self.publish(MutationKind::Attributes, node);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<TreeMutation> {
        self.mutations.subscribe()
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

fn open_tag(tag: &str, attributes: &[(String, String)], out: &mut String) -> Result<()> {
    if !is_valid_name(tag) {
        return Err(PageError::InsertRejected(format!("invalid element tag {tag:?}")));
    }
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes {
        if !is_valid_name(name) {
            return Err(PageError::InsertRejected(format!(
                "invalid attribute name {name:?}"
            )));
        }
        let _ = write!(out, r#" {name}="{}""#, escape(value));
    }
    out.push('>');
    Ok(())
}

fn render(spec: &ElementSpec, out: &mut String) -> Result<()> {
    let tag = spec.tag.trim();
    let mut attributes = spec.attributes.clone();
    if !spec.styles.is_empty() {
        let mut declarations = attributes
            .iter()
            .find(|(k, _)| k == "style")
            .map(|(_, v)| parse_styles(v))
            .unwrap_or_default();
        declarations.extend(spec.styles.iter().cloned());
        attributes.retain(|(k, _)| k != "style");
        attributes.push(("style".to_string(), join_styles(&declarations)));
    }
    open_tag(tag, &attributes, out)?;
    if let Some(text) = spec.text.as_deref() {
        out.push_str(&escape(text));
    }
    for child in &spec.children {
        render(child, out)?;
    }
    let _ = write!(out, "</{tag}>");
    Ok(())
}

fn first_element(fragment: &Html) -> Option<ElementRef<'_>> {
    fragment
        .root_element()
        .children()
        .find_map(ElementRef::wrap)
}

fn parse_element(tag: &str, attributes: &[(String, String)]) -> Result<Element> {
    let mut markup = String::new();
    open_tag(tag, attributes, &mut markup)?;
    let _ = write!(markup, "</{tag}>");
    let fragment = Html::parse_fragment(&markup);
    first_element(&fragment)
        .map(|element| element.value().clone())
        .ok_or_else(|| PageError::InsertRejected(format!("<{tag}> cannot be rebuilt")))
}

fn parse_text(text: &str) -> Result<Node> {
    let fragment = Html::parse_fragment(&format!("<span>{}</span>", escape(text)));
    first_element(&fragment)
        .and_then(|span| span.first_child())
        .map(|node| node.value().clone())
        .ok_or_else(|| PageError::Other("text node could not be built".to_string()))
}

fn parse_styles(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .map(|(property, value)| (property.trim().to_string(), value.trim().to_string()))
        .filter(|(property, _)| !property.is_empty())
        .collect()
}

fn join_styles(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(property, value)| format!("{property}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}
