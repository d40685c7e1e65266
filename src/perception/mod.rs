pub mod browser;
pub mod dom;
pub mod scanner;
pub mod selector;
pub mod traits;
pub mod types;

pub use browser::BrowserPage;
pub use dom::{ElementSpec, MemoryPage, PageEvent};
pub use scanner::ElementScanner;
pub use selector::SelectorList;
pub use traits::{DomEvent, ElementHandle, ElementSnapshot, Page};
pub use types::{ElementDescriptor, ElementKind, ScannedElement};
