//! Stock HTML components for the Lively component system, plus the [`Page`]
//! document root.
//!
//! Components are plain [`HtmlComponent`](lively_core::HtmlComponent) values
//! configured by constructor functions; insert them into a tree and mutate
//! them through it:
//!
//! ```
//! use lively_html::{elements, Page, PageConfig};
//!
//! # fn main() -> Result<(), lively_core::ComponentError> {
//! let mut page = Page::new(PageConfig::default())?;
//! page.set_title("Counter")?;
//!
//! let count = page.add_to_body(elements::label("0")?)?;
//! let bump = page.add_to_body(elements::button("+1")?)?;
//! # let _ = (count, bump);
//! let html = page.render()?;
//! assert!(html.starts_with("<!DOCTYPE html>"));
//! # Ok(())
//! # }
//! ```

pub mod elements;
pub mod page;
pub mod theme;

pub use page::{error_page, OpenGraph, Page, PageConfig, TwitterCard};
pub use theme::Theme;

use askama_escape::{escape, Html};

/// HTML-escape user text. Widget constructors run their text arguments
/// through this; raw bodies (scripts, styles, trusted markup) bypass it by
/// setting inner text directly.
pub fn escape_text(text: &str) -> String {
    escape(text, Html).to_string()
}
