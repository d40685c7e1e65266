use std::sync::Arc;
use std::time::Duration;

use crate::config::AgentConfig;
use crate::errors::{NavigatorError, NavigatorResult};
use crate::executor::text_input::{self, TypingDelays};
use crate::perception::scanner::ElementScanner;
use crate::perception::traits::DomEvent;
use crate::perception::types::{ElementKind, ScannedElement, TypeableKind};
use crate::planner::types::AgentAction;

/// Carries out planner actions against the elements of the latest scan.
pub struct ActionExecutor {
    scanner: Arc<ElementScanner>,
    highlight: Duration,
    settle: Duration,
    post_click: Duration,
    typing: TypingDelays,
}

impl ActionExecutor {
    pub fn new(scanner: Arc<ElementScanner>, agent: &AgentConfig, highlight: Duration) -> Self {
        Self {
            scanner,
            highlight,
            settle: Duration::from_millis(agent.settle_delay_ms),
            post_click: Duration::from_millis(agent.post_click_delay_ms),
            typing: TypingDelays {
                clear: Duration::from_millis(agent.type_clear_delay_ms),
                submit: Duration::from_millis(agent.type_submit_delay_ms),
            },
        }
    }

    /// `Done` is always valid; element actions only while their id resolves.
    pub fn validate(&self, action: &AgentAction) -> bool {
        match action.element_id() {
            Some(id) => self.scanner.resolve(id).is_some(),
            None => true,
        }
    }

    pub async fn apply(&self, action: &AgentAction) -> NavigatorResult<()> {
        match action {
            AgentAction::Done { .. } => Ok(()),
            AgentAction::Click { element_id } => {
                let target = self.target(*element_id)?;
                self.bring_into_view(*element_id).await;
                self.scanner.page().dispatch_event(target.handle, DomEvent::Click)?;
                tracing::info!(id = element_id, tag = %target.descriptor.tag, "clicked element");
                tokio::time::sleep(self.post_click).await;
                Ok(())
            }
            AgentAction::Type { element_id, text } => {
                let target = self.target(*element_id)?;
                let ElementKind::Typeable(kind) = target.kind else {
                    tracing::warn!(id = element_id, kind = ?target.kind, "element cannot receive text");
                    return Err(NavigatorError::NotTypeable(*element_id));
                };
                self.bring_into_view(*element_id).await;
                let page = self.scanner.page().as_ref();
                match kind {
                    TypeableKind::TextLike => {
                        text_input::fill_text_like(page, target.handle, text, target.search_field, self.typing).await?
                    }
                    TypeableKind::ContentEditable => text_input::fill_content_editable(page, target.handle, text)?,
                }
                tracing::info!(
                    id = element_id,
                    chars = text.chars().count(),
                    search = target.search_field,
                    "typed into element"
                );
                Ok(())
            }
        }
    }

    fn target(&self, id: u32) -> NavigatorResult<ScannedElement> {
        self.scanner.resolve(id).ok_or_else(|| {
            tracing::warn!(id, "element not found in current scan");
            NavigatorError::ElementNotFound(id)
        })
    }

    async fn bring_into_view(&self, id: u32) {
        self.scanner.scroll_into_view(id);
        self.scanner.highlight(id, self.highlight);
        tokio::time::sleep(self.settle).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScannerConfig;
    use crate::perception::dom::{ElementSpec, MemoryPage, PageEvent};
    use crate::perception::traits::{ElementHandle, Page};

    fn executor(page: Arc<MemoryPage>) -> (ActionExecutor, Arc<ElementScanner>) {
        let scanner = Arc::new(ElementScanner::new(page, &ScannerConfig::default()).unwrap());
        scanner.scan();
        let agent = AgentConfig::default().without_delays();
        // Long enough that no highlight reverts mid-test.
        (ActionExecutor::new(scanner.clone(), &agent, Duration::from_secs(60)), scanner)
    }

    fn search_page() -> (Arc<MemoryPage>, ElementHandle, ElementHandle) {
        let page = Arc::new(MemoryPage::new());
        let form = page.append(None, ElementSpec::new("form").attr("action", "/search")).unwrap();
        let input = page.append(
            Some(form),
            ElementSpec::new("input").attr("type", "search").attr("placeholder", "Search products"),
        )
        .unwrap();
        page.append(None, ElementSpec::new("a").attr("href", "/cart").text("Cart")).unwrap();
        (page, form, input)
    }

    #[tokio::test]
    async fn typing_into_search_field_fires_events_in_order() {
        let (page, form, input) = search_page();
        let (executor, _) = executor(page.clone());

        executor
            .apply(&AgentAction::Type {
                element_id: 0,
                text: "desk lamp".into(),
            })
            .await
            .unwrap();

        assert_eq!(
            page.dispatched(),
            vec![
                (input, DomEvent::Input),
                (input, DomEvent::Input),
                (input, DomEvent::Change),
                (
                    input,
                    DomEvent::KeyDown {
                        key: "Enter".into(),
                        bubbles: true,
                        cancelable: true
                    }
                ),
                (form, DomEvent::Submit),
            ]
        );
        let values: Vec<PageEvent> = page
            .log()
            .into_iter()
            .filter(|(_, e)| matches!(e, PageEvent::ValueSet(_)))
            .map(|(_, e)| e)
            .collect();
        assert_eq!(
            values,
            vec![PageEvent::ValueSet(String::new()), PageEvent::ValueSet("desk lamp".into())]
        );
    }

    #[tokio::test]
    async fn scroll_precedes_the_interaction() {
        let (page, _, _) = search_page();
        let (executor, _) = executor(page.clone());

        executor.apply(&AgentAction::Click { element_id: 1 }).await.unwrap();

        let log = page.log();
        assert_eq!(log[0].1, PageEvent::ScrolledIntoView);
        assert!(matches!(log[1].1, PageEvent::StyleSet { .. }));
        assert_eq!(log.last().map(|(_, e)| e.clone()), Some(PageEvent::Dispatched(DomEvent::Click)));
        assert_eq!(page.location(), "/cart");
    }

    #[tokio::test]
    async fn typing_into_a_link_is_rejected() {
        let (page, _, _) = search_page();
        let (executor, _) = executor(page.clone());
        let err = executor
            .apply(&AgentAction::Type {
                element_id: 1,
                text: "x".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NavigatorError::NotTypeable(1)));
        assert!(page.dispatched().is_empty());
    }

    #[tokio::test]
    async fn missing_element_is_reported() {
        let (page, _, _) = search_page();
        let (executor, _) = executor(page);
        let err = executor.apply(&AgentAction::Click { element_id: 9 }).await.unwrap_err();
        assert!(matches!(err, NavigatorError::ElementNotFound(9)));
    }

    #[tokio::test]
    async fn done_is_a_no_op() {
        let (page, _, _) = search_page();
        let (executor, _) = executor(page.clone());
        executor
            .apply(&AgentAction::Done {
                summary: "finished".into(),
            })
            .await
            .unwrap();
        assert!(page.log().is_empty());
    }

    #[test]
    fn validate_rejects_stale_ids() {
        let (page, form, _) = search_page();
        let (executor, scanner) = executor(page.clone());
        assert!(executor.validate(&AgentAction::Done { summary: String::new() }));
        assert!(executor.validate(&AgentAction::Click { element_id: 1 }));
        assert!(!executor.validate(&AgentAction::Click { element_id: 2 }));

        page.remove(form);
        scanner.scan();
        // The cart link is id 0 now; id 1 belonged to the previous scan.
        assert!(!executor.validate(&AgentAction::Click { element_id: 1 }));
        assert!(executor.validate(&AgentAction::Click { element_id: 0 }));
    }
}
