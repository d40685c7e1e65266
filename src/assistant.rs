//! Local voice/text path: utterance in, exactly one spoken reply out.
use std::sync::Arc;

use crate::dispatch::collaborators::{Router, ShopStore, Speaker};
use crate::dispatch::dispatcher::CommandDispatcher;
use crate::errors::NavigatorResult;
use crate::intent::parser::IntentParser;
use crate::intent::types::ParsedCommand;

const NOT_UNDERSTOOD: &str = "Sorry, I didn't understand that.";

pub struct Assistant {
    parser: IntentParser,
    dispatcher: CommandDispatcher,
    speaker: Arc<dyn Speaker>,
}

impl Assistant {
    pub fn new(store: Arc<dyn ShopStore>, router: Arc<dyn Router>, speaker: Arc<dyn Speaker>) -> NavigatorResult<Self> {
        Ok(Self {
            parser: IntentParser::new()?,
            dispatcher: CommandDispatcher::new(store, router),
            speaker,
        })
    }

    pub fn parse(&self, text: &str) -> ParsedCommand {
        self.parser.parse(text)
    }

    /// Parse, apply and speak. Returns the spoken text.
    pub fn handle_utterance(&self, text: &str) -> String {
        let parsed = self.parser.parse(text);
        let reply = match &parsed.command {
            Some(command) => self.dispatcher.execute(command),
            None => {
                let hint = parsed
                    .suggestions
                    .as_deref()
                    .and_then(|s| s.first())
                    .map(|s| format!("{NOT_UNDERSTOOD} Try: {s}"));
                hint.unwrap_or_else(|| NOT_UNDERSTOOD.to_string())
            }
        };
        self.speaker.speak(&reply);
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::collaborators::{MemoryRouter, MemoryStore, TranscriptSpeaker};

    struct Fixture {
        store: Arc<MemoryStore>,
        router: Arc<MemoryRouter>,
        speaker: Arc<TranscriptSpeaker>,
        assistant: Assistant,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::with_cart(&["mug", "lamp"]));
        let router = Arc::new(MemoryRouter::default());
        let speaker = Arc::new(TranscriptSpeaker::default());
        let assistant = Assistant::new(store.clone(), router.clone(), speaker.clone()).unwrap();
        Fixture {
            store,
            router,
            speaker,
            assistant,
        }
    }

    #[test]
    fn navigation_routes_and_acknowledges() {
        let f = fixture();
        let reply = f.assistant.handle_utterance("go to products");
        assert_eq!(reply, "Taking you to the products page");
        assert_eq!(f.router.current(), "/products");
        assert_eq!(f.speaker.lines(), vec![reply]);
    }

    #[test]
    fn search_updates_the_store() {
        let f = fixture();
        let reply = f.assistant.handle_utterance("search for Running Shoes");
        assert_eq!(reply, "Searching for Running Shoes");
        assert_eq!(f.store.snapshot().search_query, "Running Shoes");
    }

    #[test]
    fn clear_cart_empties_it() {
        let f = fixture();
        f.assistant.handle_utterance("clear cart");
        assert!(f.store.snapshot().cart_items.is_empty());
        assert_eq!(f.speaker.lines().len(), 1);
    }

    #[test]
    fn gibberish_speaks_one_suggestion() {
        let f = fixture();
        let reply = f.assistant.handle_utterance("asdkjhasd");
        assert_eq!(reply, "Sorry, I didn't understand that. Try: search for laptops");
        assert_eq!(f.speaker.lines(), vec![reply]);
        assert_eq!(f.router.current(), "/");
    }
}
