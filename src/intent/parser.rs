use regex::Regex;

use crate::errors::NavigatorResult;
use crate::intent::rules::{
    CART_CONFIDENCE, CART_LEADS, CART_SUGGESTIONS, CATEGORIES, CATEGORY_CONFIDENCE, CATEGORY_LEADS,
    EXACT_CONFIDENCE, EXACT_PHRASES, FALLBACK_SUGGESTIONS, HELP_CONFIDENCE, HELP_LEADS, LOCATIONS,
    NAVIGATION_CONFIDENCE, NAVIGATION_LEADS, NAVIGATION_SUGGESTIONS, PRODUCT_CONFIDENCE,
    PRODUCT_PATTERNS, SEARCH_CONFIDENCE, SEARCH_LEADS, SEARCH_SUGGESTIONS, STARTER_SUGGESTIONS,
};
use crate::intent::types::{Command, CommandType, ParsedCommand};

/// Rule-based classifier. Construction compiles the product templates;
/// `parse` itself is pure and never fails.
pub struct IntentParser {
    product_patterns: Vec<Regex>,
}

impl IntentParser {
    pub fn new() -> NavigatorResult<Self> {
        let product_patterns = PRODUCT_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { product_patterns })
    }

    /// Classify `input`. Rules run in a fixed priority order and the first
    /// hit wins: exact phrase, navigation, search, category, cart, help,
    /// product info. No hit yields suggestions instead of a command.
    pub fn parse(&self, input: &str) -> ParsedCommand {
        let trimmed = input.trim();
        let lower = trimmed.to_lowercase();

        let command = exact_phrase(&lower)
            .or_else(|| navigation(trimmed))
            .or_else(|| search(trimmed))
            .or_else(|| category(&lower))
            .or_else(|| cart(trimmed))
            .or_else(|| help(&lower))
            .or_else(|| self.product_info(trimmed));

        match command {
            Some(command) => {
                tracing::debug!(
                    input = %trimmed,
                    command_type = ?command.command_type,
                    action = %command.action,
                    confidence = command.confidence,
                    "utterance classified"
                );
                ParsedCommand::matched(input, command)
            }
            None => {
                tracing::debug!(input = %trimmed, "no rule matched");
                ParsedCommand::unmatched(input, suggestions(&lower))
            }
        }
    }

    fn product_info(&self, input: &str) -> Option<Command> {
        self.product_patterns.iter().find_map(|re| {
            let product = re.captures(input)?.get(1)?.as_str().trim();
            (product.chars().count() > 1).then(|| {
                Command::new(CommandType::Product, "info", PRODUCT_CONFIDENCE)
                    .with_param("product", product)
            })
        })
    }
}

fn exact_phrase(lower: &str) -> Option<Command> {
    EXACT_PHRASES
        .iter()
        .find(|(phrase, ..)| *phrase == lower)
        .map(|(_, command_type, action, path)| {
            let command = Command::new(*command_type, action, EXACT_CONFIDENCE);
            match path {
                Some(path) => command.with_param("path", *path),
                None => command,
            }
        })
}

fn navigation(input: &str) -> Option<Command> {
    NAVIGATION_LEADS.iter().find_map(|lead| {
        let rest = strip_lead(input, lead)?.to_lowercase();
        LOCATIONS
            .iter()
            .find(|(name, _)| rest.contains(name))
            .map(|(_, path)| {
                Command::new(CommandType::Navigation, "navigate", NAVIGATION_CONFIDENCE)
                    .with_param("path", *path)
            })
    })
}

fn search(input: &str) -> Option<Command> {
    SEARCH_LEADS.iter().find_map(|lead| {
        let query = strip_lead(input, lead)?;
        (query.chars().count() > 1).then(|| {
            Command::new(CommandType::Search, "search", SEARCH_CONFIDENCE).with_param("query", query)
        })
    })
}

fn category(lower: &str) -> Option<Command> {
    CATEGORY_LEADS
        .iter()
        .filter(|lead| lower.contains(*lead))
        .find_map(|_| CATEGORIES.iter().find(|c| lower.contains(*c)))
        .map(|category| {
            Command::new(CommandType::Category, "filter", CATEGORY_CONFIDENCE)
                .with_param("category", *category)
        })
}

fn cart(input: &str) -> Option<Command> {
    CART_LEADS.iter().find_map(|lead| {
        let product = strip_lead(input, lead)?;
        (product.chars().count() > 1).then(|| {
            Command::new(CommandType::Cart, "add", CART_CONFIDENCE).with_param("product", product)
        })
    })
}

fn help(lower: &str) -> Option<Command> {
    HELP_LEADS
        .iter()
        .any(|lead| lower.contains(lead))
        .then(|| Command::new(CommandType::Help, "help", HELP_CONFIDENCE))
}

fn suggestions(lower: &str) -> Vec<String> {
    let bucket = if lower.chars().count() < 3 {
        STARTER_SUGGESTIONS
    } else if lower.contains("go") || lower.contains("navigate") {
        NAVIGATION_SUGGESTIONS
    } else if lower.contains("find") || lower.contains("search") {
        SEARCH_SUGGESTIONS
    } else if lower.contains("cart") || lower.contains("buy") {
        CART_SUGGESTIONS
    } else {
        FALLBACK_SUGGESTIONS
    };
    bucket.iter().map(|s| s.to_string()).collect()
}

/// Remove the first case-insensitive occurrence of `lead` from `input` and
/// trim the result. The rest of the input keeps its original casing.
fn strip_lead(input: &str, lead: &str) -> Option<String> {
    let (start, end) = find_ignore_case(input, lead)?;
    let mut rest = String::with_capacity(input.len());
    rest.push_str(&input[..start]);
    rest.push_str(&input[end..]);
    Some(rest.trim().to_string())
}

/// Byte range in `haystack` whose lowercase form equals `needle`.
/// `needle` must already be lowercase.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return Some((0, 0));
    }
    for (start, _) in haystack.char_indices() {
        let mut pending = needle.chars().peekable();
        for (offset, ch) in haystack[start..].char_indices() {
            let matches = ch.to_lowercase().all(|lower| pending.next() == Some(lower));
            if !matches {
                break;
            }
            if pending.peek().is_none() {
                return Some((start, start + offset + ch.len_utf8()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> IntentParser {
        IntentParser::new().unwrap()
    }

    fn command(input: &str) -> Command {
        parser().parse(input).command.unwrap_or_else(|| panic!("no command for {input:?}"))
    }

    #[test]
    fn exact_phrases_have_full_confidence() {
        for (phrase, command_type, action, _) in EXACT_PHRASES {
            let cmd = command(phrase);
            assert_eq!(cmd.command_type, *command_type, "{phrase}");
            assert_eq!(cmd.action, *action, "{phrase}");
            assert_eq!(cmd.confidence, 1.0, "{phrase}");
        }
        assert_eq!(command("  Go Home ").param("path"), Some("/"));
    }

    #[test]
    fn go_to_products() {
        let cmd = command("go to products");
        assert_eq!(cmd.command_type, CommandType::Navigation);
        assert_eq!(cmd.action, "navigate");
        assert_eq!(cmd.param("path"), Some("/products"));
        assert_eq!(cmd.confidence, 0.9);
    }

    #[test]
    fn aliases_share_a_canonical_path() {
        for input in ["go to shop", "go to store", "browse the catalog", "take me to products"] {
            assert_eq!(command(input).param("path"), Some("/products"), "{input}");
        }
        for input in ["open my basket", "take me to my cart"] {
            assert_eq!(command(input).param("path"), Some("/cart"), "{input}");
        }
        assert_eq!(command("visit the payment page").param("path"), Some("/checkout"));
    }

    #[test]
    fn search_for_running_shoes() {
        let cmd = command("search for running shoes");
        assert_eq!(cmd.command_type, CommandType::Search);
        assert_eq!(cmd.action, "search");
        assert_eq!(cmd.param("query"), Some("running shoes"));
        assert_eq!(cmd.confidence, 0.9);
    }

    #[test]
    fn search_query_keeps_original_case() {
        let cmd = command("Search for Nike Air Max");
        assert_eq!(cmd.param("query"), Some("Nike Air Max"));
    }

    #[test]
    fn first_search_lead_in_list_order_wins() {
        // "find" precedes "find me" in the table.
        assert_eq!(command("find me a lamp").param("query"), Some("me a lamp"));
    }

    #[test]
    fn show_me_with_location_is_navigation() {
        let cmd = command("show me the store");
        assert_eq!(cmd.command_type, CommandType::Navigation);
        assert_eq!(cmd.param("path"), Some("/products"));

        let cmd = command("show me red sneakers");
        assert_eq!(cmd.command_type, CommandType::Search);
        assert_eq!(cmd.param("query"), Some("red sneakers"));
    }

    #[test]
    fn short_search_remainder_is_rejected() {
        // "find x" has a one-character remainder, so search does not claim it.
        let parsed = parser().parse("find x");
        assert!(parsed.command.map(|c| c.command_type) != Some(CommandType::Search));
    }

    #[test]
    fn category_needs_lead_and_vocabulary() {
        let cmd = command("filter by electronics");
        assert_eq!(cmd.command_type, CommandType::Category);
        assert_eq!(cmd.action, "filter");
        assert_eq!(cmd.param("category"), Some("electronics"));
        assert_eq!(cmd.confidence, 0.8);
    }

    #[test]
    fn cart_add_keeps_product_text() {
        let cmd = command("buy Wireless Mouse");
        assert_eq!(cmd.command_type, CommandType::Cart);
        assert_eq!(cmd.action, "add");
        assert_eq!(cmd.param("product"), Some("Wireless Mouse"));
        assert_eq!(cmd.confidence, 0.8);
    }

    #[test]
    fn help_lead_in() {
        let cmd = command("how do i pay");
        assert_eq!(cmd.command_type, CommandType::Help);
        assert_eq!(cmd.confidence, 0.9);
    }

    #[test]
    fn product_info_templates() {
        let cmd = command("tell me about the Pixel 9");
        assert_eq!(cmd.command_type, CommandType::Product);
        assert_eq!(cmd.action, "info");
        assert_eq!(cmd.param("product"), Some("the Pixel 9"));
        assert_eq!(cmd.confidence, 0.7);

        assert_eq!(command("price of headphones").param("product"), Some("headphones"));
        assert_eq!(command("Describe Laptop").param("product"), Some("Laptop"));
    }

    #[test]
    fn gibberish_falls_back_to_generic_suggestions() {
        let parsed = parser().parse("asdkjhasd");
        assert!(parsed.command.is_none());
        let suggestions = parsed.suggestions.unwrap();
        assert!(!suggestions.is_empty());
        assert_eq!(suggestions, FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    #[test]
    fn suggestion_buckets_follow_cues() {
        let bucket = |input: &str| parser().parse(input).suggestions.unwrap();
        assert_eq!(bucket("")[0], STARTER_SUGGESTIONS[0]);
        assert_eq!(bucket("zq")[0], STARTER_SUGGESTIONS[0]);
        assert_eq!(bucket("lets go xyz")[0], NAVIGATION_SUGGESTIONS[0]);
        assert_eq!(bucket("searchy")[0], SEARCH_SUGGESTIONS[0]);
        assert_eq!(bucket("buy")[0], CART_SUGGESTIONS[0]);
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let parsed = parser().parse("");
        assert_eq!(parsed.text, "");
        assert!(parsed.command.is_none());
        assert!(parsed.suggestions.is_some());
    }

    #[test]
    fn parse_is_idempotent() {
        let p = parser();
        for input in ["go to cart", "search for Socks", "qwerty", "show books"] {
            assert_eq!(p.parse(input), p.parse(input));
        }
    }

    #[test]
    fn find_ignore_case_reports_original_offsets() {
        assert_eq!(find_ignore_case("Search FOR x", "search for"), Some((0, 10)));
        assert_eq!(find_ignore_case("Über Find", "find"), Some((6, 10)));
        assert_eq!(find_ignore_case("nothing", "find"), None);
    }
}
