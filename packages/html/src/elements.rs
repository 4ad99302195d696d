//! Constructor functions for the stock components.
//!
//! Each returns a configured [`HtmlComponent`] ready to be inserted into a
//! tree. Text arguments are HTML-escaped; components whose body is code
//! (`script`, `style`) take their content raw.

use lively_core::{ComponentError, HtmlComponent};

use crate::escape_text;
use crate::theme::Theme;

/// A plain `<div>` container.
pub fn container() -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("div")
}

/// A `<div>` with flex layout.
pub fn flex_container() -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("div")?
        .with_style_prop("display", "flex")?
        .with_prop("class", "flex-container")
}

pub fn button(text: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("button")?
        .with_text(escape_text(text))?
        .with_style([
            ("background", Theme::PRIMARY_COLOR),
            ("color", "#ffffff"),
            ("border-radius", "5px"),
            ("padding", "10px 20px"),
            ("cursor", "pointer"),
        ])
}

pub fn label(text: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("label")?.with_text(escape_text(text))
}

pub fn paragraph(text: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("p")?.with_text(escape_text(text))
}

/// `<h1>`–`<h6>`. Levels outside that range clamp.
pub fn heading(level: u8, text: &str) -> Result<HtmlComponent, ComponentError> {
    let level = level.clamp(1, 6);
    HtmlComponent::inner(&format!("h{level}"))?.with_text(escape_text(text))
}

pub fn section() -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("section")
}

pub fn span(text: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("span")?.with_text(escape_text(text))
}

pub fn link(url: &str, text: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("a")?
        .with_text(escape_text(text))?
        .with_prop("class", "link")?
        .with_prop("href", url)?
        .with_style_prop("text-decoration", "none")
}

pub fn image(src: &str, alt: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::leaf("img")?
        .with_prop("src", src)?
        .with_prop("alt", alt)
}

/// A `<span>` carrying an icon class; rendering depends on the page's CSS
/// bundle.
pub fn icon(class: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("span")?.with_prop("class", class)
}

pub fn input(kind: &str, name: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::leaf("input")?
        .with_prop("type", kind)?
        .with_prop("name", name)?
        .with_style([
            ("padding", "10px"),
            ("border", "1px solid #ccc"),
            ("border-radius", Theme::BORDER_RADIUS),
            ("font-size", Theme::NORMAL_FONT_SIZE),
        ])
}

pub fn checkbox(name: &str, checked: bool) -> Result<HtmlComponent, ComponentError> {
    let component = input("checkbox", name)?
        .with_style_prop("margin", "10px")?
        .with_style_prop("cursor", "pointer")?;
    if checked {
        component.with_prop("checked", "true")
    } else {
        Ok(component)
    }
}

pub fn textarea(name: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("textarea")?.with_prop("name", name)
}

pub fn form(action: &str, method: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("form")?
        .with_prop("action", action)?
        .with_prop("method", method)
}

/// A flex card with the stock elevation styling.
pub fn card() -> Result<HtmlComponent, ComponentError> {
    flex_container()?
        .with_prop("class", "flex-card")?
        .with_style([
            ("padding", Theme::PADDING),
            ("min-height", "100px"),
            ("text-align", "center"),
            ("flex-direction", "column"),
            ("align-items", "center"),
            ("justify-content", "center"),
            ("transition", "all 0.3s ease 0s"),
            ("border-radius", Theme::BORDER_RADIUS),
            ("box-shadow", "0 4px 12px rgba(0, 0, 0, 0.1)"),
        ])
}

/// An inline `<script>`. The code is raw, never escaped.
pub fn script_inline(code: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("script")?.with_text(code)
}

/// An external `<script src=…>`.
pub fn script_src(src: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("script")?.with_prop("src", src)
}

/// An inline `<style>` block. The CSS is raw, never escaped.
pub fn style_inline(css: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("style")?.with_text(css)
}

pub fn stylesheet(href: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::leaf("link")?
        .with_prop("rel", "stylesheet")?
        .with_prop("href", href)
}

/// The reload progress indicator pages mount when the runtime is active.
pub fn progress_bar(id: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("div")?
        .with_prop("id", id)?
        .with_prop("class", "progress-bar")?
        .with_style([
            ("width", "0%"),
            ("height", "3px"),
            ("background", Theme::SECONDARY_COLOR),
            ("transition", "width 0.2s ease"),
        ])
}

/// The network-status snackbar pages mount when the runtime is active.
pub fn snackbar(id: &str) -> Result<HtmlComponent, ComponentError> {
    HtmlComponent::inner("div")?
        .with_prop("id", id)?
        .with_prop("class", "snackbar")?
        .with_style([
            ("display", "flex"),
            ("color", "white"),
            ("height", ".5px"),
            ("font-size", ".5rem"),
        ])
}
