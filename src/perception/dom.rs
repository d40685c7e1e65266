//! In-memory page model.
//!
//! `MemoryPage` keeps a small element tree with the properties the scanner
//! reads (attributes, rendered size, inline style, text, value) and logs
//! every interaction the executor performs, in order. It backs the CLI's
//! fixture mode and the test suite.
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::errors::{NavigatorError, NavigatorResult};
use crate::perception::selector;
use crate::perception::traits::{DomEvent, ElementHandle, ElementSnapshot, Page};

const FORM_CONTROLS: [&str; 3] = ["input", "textarea", "select"];
const HANDLE_ATTR: &str = "data-node";
const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Declarative description of an element subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}

fn default_width() -> f64 {
    120.0
}

fn default_height() -> f64 {
    24.0
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            value: None,
            style: BTreeMap::new(),
            width: default_width(),
            height: default_height(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.style.insert(property.to_string(), value.to_string());
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// One logged interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Dispatched(DomEvent),
    ValueSet(String),
    TextSet(String),
    ScrolledIntoView,
    StyleSet {
        property: String,
        value: Option<String>,
    },
}

#[derive(Debug)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    value: Option<String>,
    style: BTreeMap<String, String>,
    width: f64,
    height: f64,
    parent: Option<usize>,
    children: Vec<usize>,
    connected: bool,
}

#[derive(Debug, Default)]
struct DomTree {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    log: Vec<(ElementHandle, PageEvent)>,
    location: String,
}

impl DomTree {
    fn node(&self, handle: ElementHandle) -> Option<&Node> {
        self.nodes.get(handle.0 as usize).filter(|n| n.connected)
    }

    fn node_mut(&mut self, handle: ElementHandle) -> NavigatorResult<&mut Node> {
        self.nodes
            .get_mut(handle.0 as usize)
            .filter(|n| n.connected)
            .ok_or_else(|| NavigatorError::Page(format!("element {} is detached", handle.0)))
    }

    fn insert(&mut self, parent: Option<usize>, spec: ElementSpec) -> usize {
        let idx = self.nodes.len();
        let value = spec.value.or_else(|| {
            FORM_CONTROLS
                .contains(&spec.tag.as_str())
                .then(|| spec.attributes.get("value").cloned().unwrap_or_default())
        });
        self.nodes.push(Node {
            tag: spec.tag.to_lowercase(),
            attributes: spec.attributes,
            text: spec.text,
            value,
            style: spec.style,
            width: spec.width,
            height: spec.height,
            parent,
            children: Vec::new(),
            connected: true,
        });
        match parent {
            Some(p) => self.nodes[p].children.push(idx),
            None => self.roots.push(idx),
        }
        for child in spec.children {
            self.insert(Some(idx), child);
        }
        idx
    }

    fn preorder(&self, idx: usize, out: &mut Vec<ElementHandle>) {
        let node = &self.nodes[idx];
        if !node.connected {
            return;
        }
        out.push(ElementHandle(idx as u64));
        for &child in &node.children {
            self.preorder(child, out);
        }
    }

    fn ancestors(&self, idx: usize) -> impl Iterator<Item = &Node> {
        std::iter::successors(Some(&self.nodes[idx]), move |n| n.parent.map(|p| &self.nodes[p]))
    }

    fn computed_display(&self, idx: usize) -> String {
        if self.ancestors(idx).any(|n| n.style.get("display").map(String::as_str) == Some("none")) {
            return "none".into();
        }
        self.nodes[idx]
            .style
            .get("display")
            .cloned()
            .unwrap_or_else(|| "block".into())
    }

    fn computed_visibility(&self, idx: usize) -> String {
        self.ancestors(idx)
            .find_map(|n| n.style.get("visibility").cloned())
            .unwrap_or_else(|| "visible".into())
    }

    fn computed_opacity(&self, idx: usize) -> f64 {
        self.ancestors(idx)
            .filter_map(|n| n.style.get("opacity").and_then(|o| o.trim().parse::<f64>().ok()))
            .product()
    }

    fn inner_text(&self, idx: usize) -> String {
        if self.computed_display(idx) == "none" {
            return String::new();
        }
        let node = &self.nodes[idx];
        let mut parts = vec![node.text.trim().to_string()];
        parts.extend(node.children.iter().map(|&c| self.inner_text(c)));
        join_words(parts)
    }

    fn text_content(&self, idx: usize) -> String {
        let node = &self.nodes[idx];
        let mut parts = vec![node.text.trim().to_string()];
        parts.extend(node.children.iter().map(|&c| self.text_content(c)));
        join_words(parts)
    }

    fn render(&self, idx: usize, out: &mut String) {
        let node = &self.nodes[idx];
        if !node.connected {
            return;
        }
        out.push('<');
        out.push_str(&node.tag);
        for (name, value) in &node.attributes {
            // `type` keywords are ASCII case-insensitive in HTML.
            let value = if name == "type" { value.to_ascii_lowercase() } else { value.clone() };
            out.push_str(&format!(" {name}=\"{}\"", escape_attr(&value)));
        }
        out.push_str(&format!(" {HANDLE_ATTR}=\"{idx}\">"));
        for &child in &node.children {
            self.render(child, out);
        }
        if !VOID_ELEMENTS.contains(&node.tag.as_str()) {
            out.push_str(&format!("</{}>", node.tag));
        }
    }

    fn disconnect(&mut self, idx: usize) {
        self.nodes[idx].connected = false;
        for child in self.nodes[idx].children.clone() {
            self.disconnect(child);
        }
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

fn join_words(parts: Vec<String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Default)]
pub struct MemoryPage {
    tree: Mutex<DomTree>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: Vec<ElementSpec>) -> Self {
        let mut tree = DomTree::default();
        for spec in specs {
            tree.insert(None, spec);
        }
        Self { tree: Mutex::new(tree) }
    }

    /// Load a JSON array of `ElementSpec` roots.
    pub fn load_fixture(path: &Path) -> NavigatorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let specs: Vec<ElementSpec> = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), roots = specs.len(), "page fixture loaded");
        Ok(Self::from_specs(specs))
    }

    fn tree(&self) -> NavigatorResult<MutexGuard<'_, DomTree>> {
        self.tree
            .lock()
            .map_err(|_| NavigatorError::Page("page lock poisoned".into()))
    }

    /// Append `spec` (and its children) under `parent`, or as a new root.
    /// Returns the handle of the subtree root.
    pub fn append(&self, parent: Option<ElementHandle>, spec: ElementSpec) -> NavigatorResult<ElementHandle> {
        let mut tree = self.tree()?;
        let parent = match parent {
            Some(p) => {
                tree.node_mut(p)?;
                Some(p.0 as usize)
            }
            None => None,
        };
        Ok(ElementHandle(tree.insert(parent, spec) as u64))
    }

    /// Every attached element, in document order.
    pub fn elements(&self) -> Vec<ElementHandle> {
        let Ok(tree) = self.tree() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for &root in &tree.roots {
            tree.preorder(root, &mut out);
        }
        out
    }

    /// The attached tree as HTML, each element tagged with its handle.
    pub fn to_html(&self) -> NavigatorResult<String> {
        let tree = self.tree()?;
        let mut out = String::new();
        for &root in &tree.roots {
            tree.render(root, &mut out);
        }
        Ok(out)
    }

    /// Detach an element and its subtree.
    pub fn remove(&self, element: ElementHandle) {
        if let Ok(mut tree) = self.tree() {
            if (element.0 as usize) < tree.nodes.len() {
                tree.disconnect(element.0 as usize);
            }
        }
    }

    pub fn set_attribute(&self, element: ElementHandle, name: &str, value: &str) -> NavigatorResult<()> {
        let mut tree = self.tree()?;
        tree.node_mut(element)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn value_of(&self, element: ElementHandle) -> Option<String> {
        self.tree().ok()?.node(element)?.value.clone()
    }

    pub fn text_of(&self, element: ElementHandle) -> Option<String> {
        let tree = self.tree().ok()?;
        tree.node(element)?;
        Some(tree.text_content(element.0 as usize))
    }

    /// Every interaction so far, oldest first.
    pub fn log(&self) -> Vec<(ElementHandle, PageEvent)> {
        self.tree().map(|t| t.log.clone()).unwrap_or_default()
    }

    /// Dispatched events only, oldest first.
    pub fn dispatched(&self) -> Vec<(ElementHandle, DomEvent)> {
        self.log()
            .into_iter()
            .filter_map(|(el, ev)| match ev {
                PageEvent::Dispatched(event) => Some((el, event)),
                _ => None,
            })
            .collect()
    }

}

impl Page for MemoryPage {
    fn query_all(&self, selectors: &str) -> NavigatorResult<Vec<ElementHandle>> {
        let selector = selector::compile(selectors)?;
        let html = Html::parse_fragment(&self.to_html()?);
        let matched: HashSet<u64> = selector::select_attr(&html, &selector, HANDLE_ATTR)
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        // The HTML parser may re-parent odd nestings; report the tree's own order.
        Ok(self
            .elements()
            .into_iter()
            .filter(|h| matched.contains(&h.0))
            .collect())
    }

    fn snapshot(&self, element: ElementHandle) -> Option<ElementSnapshot> {
        let tree = self.tree().ok()?;
        let node = tree.node(element)?;
        let idx = element.0 as usize;
        let display = tree.computed_display(idx);
        let rendered = display != "none";
        Some(ElementSnapshot {
            tag: node.tag.clone(),
            attributes: node.attributes.clone(),
            width: if rendered { node.width } else { 0.0 },
            height: if rendered { node.height } else { 0.0 },
            display,
            visibility: tree.computed_visibility(idx),
            opacity: tree.computed_opacity(idx),
            inner_text: tree.inner_text(idx),
            text_content: tree.text_content(idx),
            value: node.value.clone(),
            content_editable: matches!(
                node.attributes.get("contenteditable").map(String::as_str),
                Some("true") | Some("")
            ),
        })
    }

    fn is_connected(&self, element: ElementHandle) -> bool {
        self.tree().map(|t| t.node(element).is_some()).unwrap_or(false)
    }

    fn dispatch_event(&self, element: ElementHandle, event: DomEvent) -> NavigatorResult<()> {
        let mut tree = self.tree()?;
        let node = tree.node_mut(element)?;
        let follow = match (&event, node.tag.as_str()) {
            (DomEvent::Click, "a") => node.attributes.get("href").cloned(),
            _ => None,
        };
        if let Some(href) = follow {
            tree.location = href;
        }
        tree.log.push((element, PageEvent::Dispatched(event)));
        Ok(())
    }

    fn set_value(&self, element: ElementHandle, value: &str) -> NavigatorResult<()> {
        let mut tree = self.tree()?;
        tree.node_mut(element)?.value = Some(value.to_string());
        tree.log.push((element, PageEvent::ValueSet(value.to_string())));
        Ok(())
    }

    fn set_text_content(&self, element: ElementHandle, text: &str) -> NavigatorResult<()> {
        let mut tree = self.tree()?;
        let idx = element.0 as usize;
        tree.node_mut(element)?.text = text.to_string();
        for child in tree.nodes[idx].children.clone() {
            tree.disconnect(child);
        }
        tree.nodes[idx].children.clear();
        tree.log.push((element, PageEvent::TextSet(text.to_string())));
        Ok(())
    }

    fn form_ancestor(&self, element: ElementHandle) -> Option<ElementHandle> {
        let tree = self.tree().ok()?;
        tree.node(element)?;
        let mut current = tree.nodes[element.0 as usize].parent;
        while let Some(idx) = current {
            if tree.nodes[idx].tag == "form" {
                return Some(ElementHandle(idx as u64));
            }
            current = tree.nodes[idx].parent;
        }
        None
    }

    fn scroll_into_view(&self, element: ElementHandle) -> NavigatorResult<()> {
        let mut tree = self.tree()?;
        tree.node_mut(element)?;
        tree.log.push((element, PageEvent::ScrolledIntoView));
        Ok(())
    }

    fn style(&self, element: ElementHandle, property: &str) -> Option<String> {
        self.tree().ok()?.node(element)?.style.get(property).cloned()
    }

    fn set_style(&self, element: ElementHandle, property: &str, value: Option<&str>) -> NavigatorResult<()> {
        let mut tree = self.tree()?;
        let node = tree.node_mut(element)?;
        match value {
            Some(v) => node.style.insert(property.to_string(), v.to_string()),
            None => node.style.remove(property),
        };
        tree.log.push((
            element,
            PageEvent::StyleSet {
                property: property.to_string(),
                value: value.map(str::to_string),
            },
        ));
        Ok(())
    }

    /// Last href followed by a click on an anchor.
    fn location(&self) -> String {
        self.tree().map(|t| t.location.clone()).unwrap_or_default()
    }
}
