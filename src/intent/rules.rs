//! Keyword tables for the intent parser.
//!
//! Every table is an ordered slice: the parser walks them front to back and
//! the first hit wins, so reordering entries changes classification.

use crate::intent::types::CommandType;

/// Whole-utterance matches: (phrase, type, action, optional path).
pub const EXACT_PHRASES: &[(&str, CommandType, &str, Option<&str>)] = &[
    ("help", CommandType::Help, "help", None),
    ("what can you do", CommandType::Help, "help", None),
    ("view cart", CommandType::Cart, "view", None),
    ("show cart", CommandType::Cart, "view", None),
    ("open cart", CommandType::Cart, "view", None),
    ("clear cart", CommandType::Cart, "clear", None),
    ("empty cart", CommandType::Cart, "clear", None),
    ("go home", CommandType::Navigation, "navigate", Some("/")),
    ("home", CommandType::Navigation, "navigate", Some("/")),
    ("checkout", CommandType::Navigation, "navigate", Some("/checkout")),
    ("go back", CommandType::Navigation, "back", None),
];

pub const NAVIGATION_LEADS: &[&str] = &[
    "go to",
    "navigate to",
    "take me to",
    "show me",
    "open",
    "visit",
    "browse",
];

/// Location aliases and their canonical routes.
pub const LOCATIONS: &[(&str, &str)] = &[
    ("home", "/"),
    ("main page", "/"),
    ("start", "/"),
    ("products", "/products"),
    ("shop", "/products"),
    ("store", "/products"),
    ("catalog", "/products"),
    ("cart", "/cart"),
    ("shopping cart", "/cart"),
    ("basket", "/cart"),
    ("checkout", "/checkout"),
    ("payment", "/checkout"),
    ("order", "/checkout"),
];

pub const SEARCH_LEADS: &[&str] = &[
    "search for",
    "find",
    "look for",
    "find me",
    "search",
    "look up",
    "show me",
];

pub const CATEGORY_LEADS: &[&str] = &["show", "filter by", "category", "in", "from", "type"];

pub const CATEGORIES: &[&str] = &[
    "electronics",
    "clothing",
    "books",
    "home",
    "sports",
    "beauty",
    "toys",
    "garden",
    "accessories",
    "shoes",
];

pub const CART_LEADS: &[&str] = &["add to cart", "buy", "purchase", "order", "get", "add", "cart"];

pub const HELP_LEADS: &[&str] = &[
    "help",
    "what can you do",
    "how do i",
    "how to",
    "guide",
    "assist",
];

/// Product-info templates; group 1 captures the product.
pub const PRODUCT_PATTERNS: &[&str] = &[
    r"(?i)^(?:show|display|view|see)\s+(.+)$",
    r"(?i)^(?:tell me about|what is|describe)\s+(.+)$",
    r"(?i)^(?:price of|cost of)\s+(.+)$",
];

pub const EXACT_CONFIDENCE: f32 = 1.0;
pub const NAVIGATION_CONFIDENCE: f32 = 0.9;
pub const SEARCH_CONFIDENCE: f32 = 0.9;
pub const CATEGORY_CONFIDENCE: f32 = 0.8;
pub const CART_CONFIDENCE: f32 = 0.8;
pub const HELP_CONFIDENCE: f32 = 0.9;
pub const PRODUCT_CONFIDENCE: f32 = 0.7;

pub const STARTER_SUGGESTIONS: &[&str] = &[
    "Try \"help\" to see what I can do",
    "Say \"go to products\" to browse the store",
];

pub const NAVIGATION_SUGGESTIONS: &[&str] = &[
    "go to products",
    "take me to the cart",
    "navigate to checkout",
];

pub const SEARCH_SUGGESTIONS: &[&str] = &[
    "search for running shoes",
    "find wireless headphones",
    "look for a winter jacket",
];

pub const CART_SUGGESTIONS: &[&str] = &["view cart", "clear cart", "go to checkout"];

pub const FALLBACK_SUGGESTIONS: &[&str] = &[
    "search for laptops",
    "show electronics",
    "help",
];

/// Human name of a canonical route, used in acknowledgments.
pub fn page_name(path: &str) -> &str {
    match path {
        "/" => "home",
        "/products" => "products",
        "/cart" => "cart",
        "/checkout" => "checkout",
        other => other.trim_start_matches('/'),
    }
}
