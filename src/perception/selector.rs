//! The configured "interactive element" selector list.
//!
//! Parsing and matching go through `scraper`, so the list accepts full CSS
//! and follows HTML matching rules (ASCII case-insensitive `type` values
//! and so on).
use scraper::{Html, Selector};

use crate::errors::{NavigatorError, NavigatorResult};

#[derive(Debug, Clone)]
pub struct SelectorList {
    css: String,
}

impl SelectorList {
    /// Validate each entry on its own so the error names the bad one.
    pub fn parse(selectors: &[String]) -> NavigatorResult<Self> {
        if selectors.is_empty() {
            return Err(NavigatorError::Config("scanner.selectors is empty".into()));
        }
        for entry in selectors {
            compile(entry)?;
        }
        Ok(Self {
            css: selectors.join(", "),
        })
    }

    /// The union as one CSS selector list, for `querySelectorAll`.
    pub fn as_css(&self) -> &str {
        &self.css
    }
}

pub fn compile(css: &str) -> NavigatorResult<Selector> {
    if css.trim().is_empty() {
        return Err(NavigatorError::Config("invalid selector '': empty".into()));
    }
    Selector::parse(css).map_err(|e| NavigatorError::Config(format!("invalid selector '{css}': {e}")))
}

/// Values of `attribute` on every element of `html` matching `selector`,
/// in tree order.
pub fn select_attr(html: &Html, selector: &Selector, attribute: &str) -> Vec<String> {
    html.select(selector)
        .filter_map(|el| el.value().attr(attribute))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_selectors;

    fn ids(html: &str, css: &str) -> Vec<String> {
        let doc = Html::parse_fragment(html);
        select_attr(&doc, &compile(css).unwrap(), "id")
    }

    #[test]
    fn default_list_parses() {
        let list = SelectorList::parse(&default_selectors()).unwrap();
        assert!(list.as_css().starts_with("button, a[href]"));
    }

    #[test]
    fn matching_follows_html_rules() {
        let html = r#"
            <a id="home" href="/">Home</a>
            <a id="plain">Plain</a>
            <div id="role" role="button"></div>
            <span id="card" class="card clickable"></span>
            <input id="search" type="Search">
            <input id="text" type="TEXT">
        "#;
        assert_eq!(ids(html, "a[href]"), vec!["home"]);
        assert_eq!(ids(html, "[role='button']"), vec!["role"]);
        assert_eq!(ids(html, ".clickable"), vec!["card"]);
        assert_eq!(ids(html, "input[type=\"search\"], input[type=\"text\"]"), vec!["search", "text"]);
    }

    #[test]
    fn combinators_are_supported() {
        let html = r#"<form id="f"><input id="q" type="search"></form><input id="outside">"#;
        assert_eq!(ids(html, "form > input"), vec!["q"]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(compile("").is_err());
        assert!(compile("input[type").is_err());
        assert!(compile(".").is_err());
        let err = SelectorList::parse(&["button".into(), "a[".into()]).unwrap_err();
        assert!(err.to_string().contains("'a['"));
        assert!(SelectorList::parse(&[]).is_err());
    }
}
