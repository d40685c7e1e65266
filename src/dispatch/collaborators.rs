use std::sync::Mutex;

use crate::errors::{NavigatorError, NavigatorResult};

/// Session state owned by the storefront (cart, search, filters).
pub trait ShopStore: Send + Sync {
    fn set_search_query(&self, query: &str) -> NavigatorResult<()>;
    fn set_category(&self, category: &str) -> NavigatorResult<()>;
    fn clear_cart(&self) -> NavigatorResult<()>;
}

/// Client-side routing.
pub trait Router: Send + Sync {
    fn navigate(&self, path: &str) -> NavigatorResult<()>;
    fn back(&self) -> NavigatorResult<()>;
}

/// Spoken or displayed feedback. A text-to-speech transport sits behind this.
pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str);
}

fn poisoned(what: &str) -> NavigatorError {
    NavigatorError::Dispatch(format!("{what} lock poisoned"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub search_query: String,
    pub category: Option<String>,
    pub cart_items: Vec<String>,
}

/// In-process store used by the CLI and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreSnapshot>,
}

impl MemoryStore {
    pub fn with_cart(items: &[&str]) -> Self {
        Self {
            inner: Mutex::new(StoreSnapshot {
                cart_items: items.iter().map(|s| s.to_string()).collect(),
                ..StoreSnapshot::default()
            }),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ShopStore for MemoryStore {
    fn set_search_query(&self, query: &str) -> NavigatorResult<()> {
        let mut state = self.inner.lock().map_err(|_| poisoned("store"))?;
        state.search_query = query.to_string();
        Ok(())
    }

    fn set_category(&self, category: &str) -> NavigatorResult<()> {
        let mut state = self.inner.lock().map_err(|_| poisoned("store"))?;
        state.category = Some(category.to_string());
        Ok(())
    }

    fn clear_cart(&self) -> NavigatorResult<()> {
        let mut state = self.inner.lock().map_err(|_| poisoned("store"))?;
        state.cart_items.clear();
        Ok(())
    }
}

/// Records the route stack.
#[derive(Debug)]
pub struct MemoryRouter {
    stack: Mutex<Vec<String>>,
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self {
            stack: Mutex::new(vec!["/".to_string()]),
        }
    }
}

impl MemoryRouter {
    pub fn current(&self) -> String {
        self.stack
            .lock()
            .ok()
            .and_then(|s| s.last().cloned())
            .unwrap_or_else(|| "/".to_string())
    }
}

impl Router for MemoryRouter {
    fn navigate(&self, path: &str) -> NavigatorResult<()> {
        self.stack.lock().map_err(|_| poisoned("router"))?.push(path.to_string());
        Ok(())
    }

    fn back(&self) -> NavigatorResult<()> {
        let mut stack = self.stack.lock().map_err(|_| poisoned("router"))?;
        if stack.len() > 1 {
            stack.pop();
        }
        Ok(())
    }
}

/// Keeps every spoken line; also logs it.
#[derive(Debug, Default)]
pub struct TranscriptSpeaker {
    lines: Mutex<Vec<String>>,
}

impl TranscriptSpeaker {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl Speaker for TranscriptSpeaker {
    fn speak(&self, text: &str) {
        tracing::info!(text = %text, "speak");
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}
