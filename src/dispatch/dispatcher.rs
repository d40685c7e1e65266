use std::sync::Arc;

use crate::dispatch::collaborators::{Router, ShopStore};
use crate::errors::{NavigatorError, NavigatorResult};
use crate::intent::rules::page_name;
use crate::intent::types::{Command, CommandType};

pub const DISPATCH_ERROR_MESSAGE: &str = "Sorry, I encountered an error while processing your command.";
pub const UNSUPPORTED_MESSAGE: &str = "I'm not sure how to do that yet.";
pub const HELP_MESSAGE: &str = "I can help you navigate the store, search for products, \
filter by category, and manage your cart. Try \"go to products\", \
\"search for running shoes\", \"show electronics\" or \"view cart\".";

/// Turns a `Command` into exactly one effect plus one acknowledgment.
pub struct CommandDispatcher {
    store: Arc<dyn ShopStore>,
    router: Arc<dyn Router>,
}

impl CommandDispatcher {
    pub fn new(store: Arc<dyn ShopStore>, router: Arc<dyn Router>) -> Self {
        Self { store, router }
    }

    /// Apply `command` and return the acknowledgment. Failures never escape:
    /// they are logged and replaced by a generic apology.
    pub fn execute(&self, command: &Command) -> String {
        match self.apply(command) {
            Ok(ack) => {
                tracing::info!(
                    command_type = ?command.command_type,
                    action = %command.action,
                    "command dispatched"
                );
                ack
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    command_type = ?command.command_type,
                    action = %command.action,
                    "command dispatch failed"
                );
                DISPATCH_ERROR_MESSAGE.to_string()
            }
        }
    }

    fn apply(&self, command: &Command) -> NavigatorResult<String> {
        match (command.command_type, command.action.as_str()) {
            (CommandType::Navigation, "navigate") => {
                let path = required(command, "path")?;
                self.router.navigate(path)?;
                Ok(format!("Taking you to the {} page", page_name(path)))
            }
            (CommandType::Navigation, "back") => {
                self.router.back()?;
                Ok("Going back".to_string())
            }
            (CommandType::Search, "search") => {
                let query = required(command, "query")?;
                self.store.set_search_query(query)?;
                Ok(format!("Searching for {query}"))
            }
            (CommandType::Category, "filter") => {
                let category = required(command, "category")?;
                self.store.set_category(category)?;
                Ok(format!("Showing {category} products"))
            }
            (CommandType::Cart, "view") => {
                self.router.navigate("/cart")?;
                Ok("Opening your cart".to_string())
            }
            (CommandType::Cart, "clear") => {
                self.store.clear_cart()?;
                Ok("Your cart has been cleared".to_string())
            }
            // Acknowledge only: items are added from their product page.
            (CommandType::Cart, "add") => {
                let product = required(command, "product")?;
                Ok(format!(
                    "To add {product} to your cart, please open its product page first"
                ))
            }
            (CommandType::Product, "info") => {
                let product = required(command, "product")?;
                self.store.set_search_query(product)?;
                Ok(format!("Looking up {product}"))
            }
            (CommandType::Help, _) => Ok(HELP_MESSAGE.to_string()),
            _ => Ok(UNSUPPORTED_MESSAGE.to_string()),
        }
    }
}

fn required<'a>(command: &'a Command, key: &str) -> NavigatorResult<&'a str> {
    command
        .param(key)
        .ok_or_else(|| NavigatorError::Dispatch(format!("missing parameter '{key}'")))
}
