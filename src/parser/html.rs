//! HTML helpers shared by the page parsers.

use scraper::{ElementRef, Selector};

use crate::error::{AppError, Result};

/// Compile a CSS selector, surfacing failures as parse errors.
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Parsing(format!("invalid selector '{css}': {e}")))
}

/// Trimmed text content of an element.
pub fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text content with every whitespace run collapsed to a single space.
pub fn collapsed_text_of(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The next sibling that is an element, skipping text and comment nodes.
pub fn next_element_sibling<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.next_siblings().find_map(ElementRef::wrap)
}
