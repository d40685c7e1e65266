// Text entry on scanned elements.
// Values go through the native setter followed by input/change events so
// framework-bound fields see the update.
use std::time::Duration;

use crate::errors::NavigatorResult;
use crate::perception::traits::{DomEvent, ElementHandle, Page};

#[derive(Debug, Clone, Copy, Default)]
pub struct TypingDelays {
    /// Between clearing the field and writing the new text.
    pub clear: Duration,
    /// Between writing the text and pressing Enter on a search field.
    pub submit: Duration,
}

/// Clear then fill an `<input>`/`<textarea>`. Search fields additionally
/// get an Enter keydown and, when wrapped in a form, a submit.
pub async fn fill_text_like(
    page: &dyn Page,
    element: ElementHandle,
    text: &str,
    search_field: bool,
    delays: TypingDelays,
) -> NavigatorResult<()> {
    page.set_value(element, "")?;
    page.dispatch_event(element, DomEvent::Input)?;
    tokio::time::sleep(delays.clear).await;

    page.set_value(element, text)?;
    page.dispatch_event(element, DomEvent::Input)?;
    page.dispatch_event(element, DomEvent::Change)?;

    if search_field {
        tokio::time::sleep(delays.submit).await;
        page.dispatch_event(element, enter_key())?;
        if let Some(form) = page.form_ancestor(element) {
            tracing::debug!(form = form.0, "submitting enclosing form");
            page.dispatch_event(form, DomEvent::Submit)?;
        }
    }
    Ok(())
}

/// Editable content has no value property; replace its text instead.
pub fn fill_content_editable(page: &dyn Page, element: ElementHandle, text: &str) -> NavigatorResult<()> {
    page.set_text_content(element, text)?;
    page.dispatch_event(element, DomEvent::Input)
}

fn enter_key() -> DomEvent {
    DomEvent::KeyDown {
        key: "Enter".into(),
        bubbles: true,
        cancelable: true,
    }
}
