use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::NavigatorResult;

/// Opaque reference to one element of a live page. Stable for the element's
/// lifetime, unlike scan identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementHandle(pub u64);

/// Everything the scanner reads from one element in a single call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementSnapshot {
    /// Lowercase tag name.
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub width: f64,
    pub height: f64,
    /// Computed `display`.
    pub display: String,
    /// Computed `visibility`.
    pub visibility: String,
    /// Computed opacity, ancestors included.
    pub opacity: f64,
    pub inner_text: String,
    pub text_content: String,
    /// Current value for form controls.
    pub value: Option<String>,
    pub content_editable: bool,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

/// DOM events the executor can fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomEvent {
    Click,
    Input,
    Change,
    KeyDown {
        key: String,
        bubbles: bool,
        cancelable: bool,
    },
    Submit,
}

/// The live interface the scanner reads and the executor drives.
/// Implemented by `BrowserPage` over Chrome, or by `MemoryPage` offline.
pub trait Page: Send + Sync {
    /// Attached elements matching a CSS selector list, in document order.
    fn query_all(&self, selectors: &str) -> NavigatorResult<Vec<ElementHandle>>;

    fn snapshot(&self, element: ElementHandle) -> Option<ElementSnapshot>;

    fn is_connected(&self, element: ElementHandle) -> bool;

    fn dispatch_event(&self, element: ElementHandle, event: DomEvent) -> NavigatorResult<()>;

    /// Write through the element's native value setter so framework-bound
    /// inputs observe the change when the following input event fires.
    fn set_value(&self, element: ElementHandle, value: &str) -> NavigatorResult<()>;

    /// Replace the rendered text of a contenteditable element.
    fn set_text_content(&self, element: ElementHandle, text: &str) -> NavigatorResult<()>;

    /// Nearest enclosing `<form>`, if any.
    fn form_ancestor(&self, element: ElementHandle) -> Option<ElementHandle>;

    /// Scroll so the element sits in the middle of the viewport.
    fn scroll_into_view(&self, element: ElementHandle) -> NavigatorResult<()>;

    /// Inline style property, `None` when unset.
    fn style(&self, element: ElementHandle, property: &str) -> Option<String>;

    /// Set or (with `None`) remove an inline style property.
    fn set_style(&self, element: ElementHandle, property: &str, value: Option<&str>) -> NavigatorResult<()>;

    /// Current URL, or the last followed href offline.
    fn location(&self) -> String;
}
