use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::ScannerConfig;
use crate::errors::NavigatorResult;
use crate::perception::selector::SelectorList;
use crate::perception::traits::{ElementHandle, ElementSnapshot, Page};
use crate::perception::types::{input_type_of, ElementDescriptor, ElementKind, ScannedElement};

const INPUT_LIKE: [&str; 3] = ["input", "textarea", "select"];
const HIGHLIGHT_PROPERTY: &str = "outline";
const HIGHLIGHT_STYLE: &str = "3px solid #ff6b35";

#[derive(Debug, Default)]
struct ScanArena {
    generation: u64,
    entries: Vec<ScannedElement>,
}

/// Original outline of a highlighted element plus the token of the most
/// recent highlight; only the matching revert restores it.
type HighlightTable = HashMap<ElementHandle, (u64, Option<String>)>;

/// Enumerates interactive elements and owns the id → element arena.
pub struct ElementScanner {
    page: Arc<dyn Page>,
    selectors: SelectorList,
    max_text_length: usize,
    arena: Mutex<ScanArena>,
    highlights: Arc<Mutex<HighlightTable>>,
    next_token: Mutex<u64>,
}

impl ElementScanner {
    pub fn new(page: Arc<dyn Page>, config: &ScannerConfig) -> NavigatorResult<Self> {
        Ok(Self {
            page,
            selectors: SelectorList::parse(&config.selectors)?,
            max_text_length: config.max_text_length,
            arena: Mutex::new(ScanArena::default()),
            highlights: Arc::new(Mutex::new(HashMap::new())),
            next_token: Mutex::new(0),
        })
    }

    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }

    /// Scan the page. Ids are dense and 0-based in document order; every id
    /// handed out by an earlier scan is invalidated.
    pub fn scan(&self) -> Vec<ElementDescriptor> {
        let candidates = self.page.query_all(self.selectors.as_css()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "element query failed; treating page as empty");
            Vec::new()
        });
        let mut entries = Vec::new();
        for handle in candidates {
            let Some(snapshot) = self.page.snapshot(handle) else {
                continue;
            };
            if !is_visible(&snapshot) || is_disabled(&snapshot) {
                continue;
            }
            let id = entries.len() as u32;
            entries.push(ScannedElement {
                handle,
                kind: ElementKind::resolve(&snapshot),
                search_field: is_search_field(&snapshot),
                descriptor: self.describe(id, &snapshot),
            });
        }

        let descriptors: Vec<ElementDescriptor> = entries.iter().map(|e| e.descriptor.clone()).collect();
        match self.arena.lock() {
            Ok(mut arena) => {
                arena.generation += 1;
                arena.entries = entries;
                tracing::debug!(
                    generation = arena.generation,
                    elements = descriptors.len(),
                    "page scanned"
                );
            }
            Err(_) => tracing::error!("scan arena lock poisoned; ids will not resolve"),
        }
        descriptors
    }

    /// Arena entry for `id` from the latest scan, if its element is still attached.
    pub fn resolve(&self, id: u32) -> Option<ScannedElement> {
        let entry = self.arena.lock().ok()?.entries.get(id as usize).cloned()?;
        self.page.is_connected(entry.handle).then_some(entry)
    }

    /// Number of ids issued by the latest scan.
    pub fn len(&self) -> usize {
        self.arena.lock().map(|a| a.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.arena.lock().map(|a| a.generation).unwrap_or(0)
    }

    /// Outline the element for `duration`, then restore its previous outline.
    /// No-op for stale ids, or outside a Tokio runtime since nothing could
    /// schedule the revert.
    pub fn highlight(&self, id: u32, duration: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(id, "highlight skipped: no async runtime to revert it");
            return;
        };
        let Some(entry) = self.resolve(id) else {
            tracing::debug!(id, "highlight skipped: id does not resolve");
            return;
        };
        let handle = entry.handle;
        let token = match self.next_token.lock() {
            Ok(mut next) => {
                *next += 1;
                *next
            }
            Err(_) => return,
        };
        {
            let Ok(mut table) = self.highlights.lock() else {
                return;
            };
            let original = match table.get(&handle) {
                Some((_, original)) => original.clone(),
                None => self.page.style(handle, HIGHLIGHT_PROPERTY),
            };
            table.insert(handle, (token, original));
        }
        if let Err(e) = self.page.set_style(handle, HIGHLIGHT_PROPERTY, Some(HIGHLIGHT_STYLE)) {
            tracing::warn!(id, error = %e, "highlight failed");
            return;
        }

        let page = self.page.clone();
        let highlights = self.highlights.clone();
        runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            let original = {
                let Ok(mut table) = highlights.lock() else {
                    return;
                };
                let latest = table.get(&handle).map(|(t, _)| *t);
                if latest == Some(token) {
                    table.remove(&handle).map(|(_, o)| o)
                } else {
                    None
                }
            };
            if let Some(original) = original {
                if page.is_connected(handle) {
                    let _ = page.set_style(handle, HIGHLIGHT_PROPERTY, original.as_deref());
                }
            }
        });
    }

    /// Center the element in the viewport. No-op for stale ids.
    pub fn scroll_into_view(&self, id: u32) {
        let Some(entry) = self.resolve(id) else {
            tracing::debug!(id, "scroll skipped: id does not resolve");
            return;
        };
        if let Err(e) = self.page.scroll_into_view(entry.handle) {
            tracing::warn!(id, error = %e, "scroll into view failed");
        }
    }

    fn describe(&self, id: u32, snapshot: &ElementSnapshot) -> ElementDescriptor {
        let input_like = INPUT_LIKE.contains(&snapshot.tag.as_str());
        let candidates: Vec<Option<&str>> = if input_like {
            vec![
                snapshot.attr("placeholder"),
                snapshot.value.as_deref(),
                snapshot.attr("aria-label"),
                snapshot.attr("title"),
            ]
        } else {
            vec![
                Some(snapshot.inner_text.as_str()),
                Some(snapshot.text_content.as_str()),
                snapshot.attr("aria-label"),
                snapshot.attr("title"),
                snapshot.attr("alt"),
            ]
        };
        let text = candidates
            .into_iter()
            .flatten()
            .map(collapse_whitespace)
            .find(|t| !t.is_empty())
            .map(|t| truncate_chars(&t, self.max_text_length))
            .unwrap_or_default();

        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);
        ElementDescriptor {
            id,
            tag: snapshot.tag.clone(),
            text,
            input_type: match snapshot.tag.as_str() {
                "input" => Some(input_type_of(snapshot)),
                _ if input_like => non_empty(snapshot.attr("type")),
                _ => None,
            },
            placeholder: if input_like { non_empty(snapshot.attr("placeholder")) } else { None },
            value: if input_like { non_empty(snapshot.value.as_deref()) } else { None },
        }
    }
}

fn is_visible(s: &ElementSnapshot) -> bool {
    s.width > 0.0
        && s.height > 0.0
        && s.display != "none"
        && s.visibility != "hidden"
        && s.opacity > 0.0
        && !s.has_attr("hidden")
        && s.attr("aria-hidden") != Some("true")
}

fn is_disabled(s: &ElementSnapshot) -> bool {
    s.has_attr("disabled") || s.attr("aria-disabled") == Some("true")
}

fn is_search_field(s: &ElementSnapshot) -> bool {
    let explicit = s.tag == "input" && input_type_of(s) == "search";
    let hinted = s
        .attr("placeholder")
        .map(|p| p.to_lowercase().contains("search"))
        .unwrap_or(false);
    explicit || hinted
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
