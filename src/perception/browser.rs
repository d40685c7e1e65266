//! Chrome-backed page over the DevTools protocol.
//!
//! Elements are addressed by a `data-sfn-handle` attribute written on first
//! sight, so handles stay stable while the element lives. Every read and
//! write is a small script evaluated in the tab; scripts hand results back
//! as JSON strings. `headless_chrome` blocks the calling thread for each
//! round trip, which the multi-threaded runtime absorbs.
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::BrowserConfig;
use crate::errors::{NavigatorError, NavigatorResult};
use crate::perception::traits::{DomEvent, ElementHandle, ElementSnapshot, Page};

const HANDLE_ATTR: &str = "data-sfn-handle";
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Assigns a handle to an element that has none. Seeded from the clock so
/// handles from a previous document never alias new elements.
const HANDLE_FN: &str = r#"
const handleOf = (el) => {
  if (!el.hasAttribute('data-sfn-handle')) {
    window.__sfnNext = (window.__sfnNext || Date.now() * 1000) + 1;
    el.setAttribute('data-sfn-handle', String(window.__sfnNext));
  }
  return Number(el.getAttribute('data-sfn-handle'));
};
"#;

const SNAPSHOT_BODY: &str = r#"
const style = getComputedStyle(el);
const rect = el.getBoundingClientRect();
const attributes = {};
for (const a of el.attributes) {
  if (a.name !== 'data-sfn-handle') attributes[a.name] = a.value;
}
let opacity = 1;
for (let n = el; n instanceof Element; n = n.parentElement) {
  opacity *= parseFloat(getComputedStyle(n).opacity);
}
return JSON.stringify({
  tag: el.tagName.toLowerCase(),
  attributes,
  width: rect.width,
  height: rect.height,
  display: style.display,
  visibility: style.visibility,
  opacity,
  innerText: el.innerText || '',
  textContent: el.textContent || '',
  value: typeof el.value === 'string' ? el.value : null,
  contentEditable: el.isContentEditable,
});
"#;

/// Writes through the prototype's `value` setter, which is what frameworks
/// that track the property themselves listen to.
const SET_VALUE_BODY: &str = r#"
const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype
  : el instanceof HTMLSelectElement ? HTMLSelectElement.prototype
  : HTMLInputElement.prototype;
const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
setter.call(el, __ARG__);
return JSON.stringify(true);
"#;

#[derive(Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
}

pub struct BrowserPage {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserPage {
    /// Attach to the Chrome answering on `config.debug_url`, or launch one.
    /// With `url`, the tab is navigated there first.
    pub async fn open(config: &BrowserConfig, url: Option<&str>) -> NavigatorResult<Self> {
        let debugger = discover_debugger(&config.debug_url).await;
        let config = config.clone();
        let url = url.map(str::to_string);
        tokio::task::spawn_blocking(move || {
            let page = match debugger {
                Some(ws) => Self::attach(&ws).or_else(|e| {
                    tracing::warn!(error = %e, "attach failed; launching Chrome");
                    Self::launch(&config)
                })?,
                None => Self::launch(&config)?,
            };
            if let Some(url) = url {
                page.goto(&url)?;
            }
            Ok(page)
        })
        .await
        .map_err(|e| NavigatorError::Page(format!("browser task failed: {e}")))?
    }

    pub fn attach(ws_url: &str) -> NavigatorResult<Self> {
        let browser = Browser::connect(ws_url.to_string()).map_err(page_err)?;
        let existing = browser
            .get_tabs()
            .lock()
            .map_err(|_| NavigatorError::Page("tab list lock poisoned".into()))?
            .first()
            .cloned();
        let tab = match existing {
            Some(tab) => {
                tracing::info!(url = %tab.get_url(), "attached to running Chrome");
                tab
            }
            None => browser.new_tab().map_err(page_err)?,
        };
        Ok(Self { _browser: browser, tab })
    }

    pub fn launch(config: &BrowserConfig) -> NavigatorResult<Self> {
        let options = LaunchOptions {
            headless: config.headless,
            path: config.chrome_path.clone(),
            idle_browser_timeout: Duration::from_secs(config.idle_timeout_secs),
            args: vec![OsStr::new("--no-first-run"), OsStr::new("--no-default-browser-check")],
            ..Default::default()
        };
        tracing::info!(headless = config.headless, "launching Chrome");
        let browser = Browser::new(options).map_err(page_err)?;
        let tab = browser.new_tab().map_err(page_err)?;
        Ok(Self { _browser: browser, tab })
    }

    pub fn goto(&self, url: &str) -> NavigatorResult<()> {
        self.tab.navigate_to(url).map_err(page_err)?;
        self.tab.wait_until_navigated().map_err(page_err)?;
        tracing::info!(url, "page loaded");
        Ok(())
    }

    fn eval<T: DeserializeOwned>(&self, script: &str) -> NavigatorResult<T> {
        let result = self.tab.evaluate(script, false).map_err(page_err)?;
        let raw = result
            .value
            .and_then(|v| v.as_str().map(String::from))
            .ok_or_else(|| NavigatorError::Page("script returned no JSON".into()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Run `body` against the element, failing if it is gone.
    fn on_element<T: DeserializeOwned>(&self, element: ElementHandle, body: &str) -> NavigatorResult<T> {
        self.eval::<Option<T>>(&element_script(element, body))?
            .ok_or_else(|| NavigatorError::Page(format!("element {} is detached", element.0)))
    }

    fn act(&self, element: ElementHandle, body: &str) -> NavigatorResult<()> {
        self.on_element::<bool>(element, body).map(|_| ())
    }
}

impl Page for BrowserPage {
    fn query_all(&self, selectors: &str) -> NavigatorResult<Vec<ElementHandle>> {
        let handles: Vec<u64> = self.eval(&query_script(selectors))?;
        Ok(handles.into_iter().map(ElementHandle).collect())
    }

    fn snapshot(&self, element: ElementHandle) -> Option<ElementSnapshot> {
        self.on_element(element, SNAPSHOT_BODY)
            .map_err(|e| tracing::debug!(handle = element.0, error = %e, "snapshot failed"))
            .ok()
    }

    fn is_connected(&self, element: ElementHandle) -> bool {
        self.on_element::<bool>(element, "return JSON.stringify(el.isConnected);")
            .unwrap_or(false)
    }

    fn dispatch_event(&self, element: ElementHandle, event: DomEvent) -> NavigatorResult<()> {
        self.act(element, &event_body(&event))
    }

    fn set_value(&self, element: ElementHandle, value: &str) -> NavigatorResult<()> {
        self.act(element, &with_arg(SET_VALUE_BODY, value))
    }

    fn set_text_content(&self, element: ElementHandle, text: &str) -> NavigatorResult<()> {
        self.act(
            element,
            &with_arg("el.textContent = __ARG__;\nreturn JSON.stringify(true);", text),
        )
    }

    fn form_ancestor(&self, element: ElementHandle) -> Option<ElementHandle> {
        let body = "const form = el.parentElement && el.parentElement.closest('form');\n\
                    return JSON.stringify(form ? handleOf(form) : null);";
        self.on_element::<Option<u64>>(element, body).ok().flatten().map(ElementHandle)
    }

    fn scroll_into_view(&self, element: ElementHandle) -> NavigatorResult<()> {
        self.act(
            element,
            "el.scrollIntoView({ block: 'center', inline: 'center' });\nreturn JSON.stringify(true);",
        )
    }

    fn style(&self, element: ElementHandle, property: &str) -> Option<String> {
        let body = with_arg(
            "const v = el.style.getPropertyValue(__ARG__);\nreturn JSON.stringify(v === '' ? null : v);",
            property,
        );
        self.on_element::<Option<String>>(element, &body).ok().flatten()
    }

    fn set_style(&self, element: ElementHandle, property: &str, value: Option<&str>) -> NavigatorResult<()> {
        let body = match value {
            Some(v) => format!(
                "el.style.setProperty({}, {});\nreturn JSON.stringify(true);",
                js_string(property),
                js_string(v)
            ),
            None => with_arg("el.style.removeProperty(__ARG__);\nreturn JSON.stringify(true);", property),
        };
        self.act(element, &body)
    }

    fn location(&self) -> String {
        self.tab.get_url()
    }
}

/// DevTools websocket URL of a Chrome started with `--remote-debugging-port`.
pub async fn discover_debugger(debug_url: &str) -> Option<String> {
    let url = format!("{}/json/version", debug_url.trim_end_matches('/'));
    // The debugging port is always local.
    let client = reqwest::Client::builder().no_proxy().build().ok()?;
    let lookup = async {
        let response = client.get(&url).send().await.ok()?.error_for_status().ok()?;
        response.json::<VersionInfo>().await.ok()
    };
    match tokio::time::timeout(DISCOVERY_TIMEOUT, lookup).await {
        Ok(Some(info)) => {
            tracing::debug!(ws = %info.web_socket_debugger_url, "found running Chrome");
            Some(info.web_socket_debugger_url)
        }
        _ => {
            tracing::debug!(url = %url, "no Chrome answering");
            None
        }
    }
}

fn page_err(e: impl std::fmt::Display) -> NavigatorError {
    NavigatorError::Page(e.to_string())
}

/// JSON string literal, which is also a valid JS string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn with_arg(body: &str, arg: &str) -> String {
    body.replace("__ARG__", &js_string(arg))
}

fn query_script(selectors: &str) -> String {
    format!(
        "(() => {{\n{HANDLE_FN}\nconst out = [];\nfor (const el of document.querySelectorAll({})) out.push(handleOf(el));\nreturn JSON.stringify(out);\n}})()",
        js_string(selectors)
    )
}

fn element_script(element: ElementHandle, body: &str) -> String {
    format!(
        "(() => {{\n{HANDLE_FN}\nconst el = document.querySelector('[{HANDLE_ATTR}=\"{}\"]');\nif (!el) return JSON.stringify(null);\n{body}\n}})()",
        element.0
    )
}

fn event_body(event: &DomEvent) -> String {
    let fire = match event {
        DomEvent::Click => "el.click();".to_string(),
        DomEvent::Input => "el.dispatchEvent(new Event('input', { bubbles: true }));".to_string(),
        DomEvent::Change => "el.dispatchEvent(new Event('change', { bubbles: true }));".to_string(),
        DomEvent::KeyDown {
            key,
            bubbles,
            cancelable,
        } => format!(
            "el.dispatchEvent(new KeyboardEvent('keydown', {{ key: {}, bubbles: {bubbles}, cancelable: {cancelable} }}));",
            js_string(key)
        ),
        DomEvent::Submit => "el.dispatchEvent(new Event('submit', { bubbles: true, cancelable: true }));".to_string(),
    };
    format!("{fire}\nreturn JSON.stringify(true);")
}
