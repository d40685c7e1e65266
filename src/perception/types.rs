use serde::{Deserialize, Serialize};

use crate::perception::traits::{ElementHandle, ElementSnapshot};

const TEXT_INPUT_TYPES: [&str; 7] = ["text", "search", "email", "password", "number", "tel", "url"];
const BUTTON_INPUT_TYPES: [&str; 4] = ["submit", "button", "reset", "image"];

/// One interactive element as sent to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// Scan-scoped id; meaningless after the next scan.
    pub id: u32,
    pub tag: String,
    pub text: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeableKind {
    /// `<input>` / `<textarea>` with a native value.
    TextLike,
    /// Editable content with no value property.
    ContentEditable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickableKind {
    Anchor,
    Button,
    Generic,
}

/// How the executor interacts with an element, fixed at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "variant", rename_all = "snake_case")]
pub enum ElementKind {
    Typeable(TypeableKind),
    Clickable(ClickableKind),
}

impl ElementKind {
    pub fn resolve(snapshot: &ElementSnapshot) -> Self {
        match snapshot.tag.as_str() {
            "input" => {
                let input_type = input_type_of(snapshot);
                if TEXT_INPUT_TYPES.contains(&input_type.as_str()) {
                    ElementKind::Typeable(TypeableKind::TextLike)
                } else if BUTTON_INPUT_TYPES.contains(&input_type.as_str()) {
                    ElementKind::Clickable(ClickableKind::Button)
                } else {
                    ElementKind::Clickable(ClickableKind::Generic)
                }
            }
            "textarea" => ElementKind::Typeable(TypeableKind::TextLike),
            _ if snapshot.content_editable => ElementKind::Typeable(TypeableKind::ContentEditable),
            "a" => ElementKind::Clickable(ClickableKind::Anchor),
            "button" => ElementKind::Clickable(ClickableKind::Button),
            _ if snapshot.attr("role") == Some("button") => ElementKind::Clickable(ClickableKind::Button),
            _ => ElementKind::Clickable(ClickableKind::Generic),
        }
    }
}

/// Lowercased `type` of an input, defaulting to `text` like browsers do.
pub fn input_type_of(snapshot: &ElementSnapshot) -> String {
    snapshot
        .attr("type")
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "text".into())
}

/// Arena entry tying a scan id to a live element.
#[derive(Debug, Clone)]
pub struct ScannedElement {
    pub handle: ElementHandle,
    pub kind: ElementKind,
    /// Explicit `type=search` or a placeholder mentioning "search".
    pub search_field: bool,
    pub descriptor: ElementDescriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(tag: &str, attrs: &[(&str, &str)]) -> ElementSnapshot {
        ElementSnapshot {
            tag: tag.into(),
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            content_editable: attrs.iter().any(|(k, v)| *k == "contenteditable" && *v == "true"),
            ..ElementSnapshot::default()
        }
    }

    #[test]
    fn kinds_resolve_once_from_markup() {
        assert_eq!(
            ElementKind::resolve(&snapshot("input", &[])),
            ElementKind::Typeable(TypeableKind::TextLike)
        );
        assert_eq!(
            ElementKind::resolve(&snapshot("input", &[("type", "submit")])),
            ElementKind::Clickable(ClickableKind::Button)
        );
        assert_eq!(
            ElementKind::resolve(&snapshot("input", &[("type", "checkbox")])),
            ElementKind::Clickable(ClickableKind::Generic)
        );
        assert_eq!(
            ElementKind::resolve(&snapshot("div", &[("contenteditable", "true")])),
            ElementKind::Typeable(TypeableKind::ContentEditable)
        );
        assert_eq!(
            ElementKind::resolve(&snapshot("a", &[("href", "/")])),
            ElementKind::Clickable(ClickableKind::Anchor)
        );
        assert_eq!(
            ElementKind::resolve(&snapshot("span", &[("role", "button")])),
            ElementKind::Clickable(ClickableKind::Button)
        );
    }

    #[test]
    fn descriptor_omits_absent_fields() {
        let descriptor = ElementDescriptor {
            id: 0,
            tag: "button".into(),
            text: "Add to cart".into(),
            input_type: None,
            placeholder: None,
            value: None,
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json, serde_json::json!({"id": 0, "tag": "button", "text": "Add to cart"}));
    }
}
