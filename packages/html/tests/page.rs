//! The initial HTML page contract and document-event rules.

use lively_core::prelude::*;
use lively_html::{elements, error_page, escape_text, Page, PageConfig};

fn quiet_config() -> PageConfig {
    PageConfig {
        disable_lively: true,
        ..PageConfig::default()
    }
}

#[test]
fn pages_render_the_document_skeleton() {
    let mut page = Page::new(quiet_config()).unwrap();
    page.set_title("Home").unwrap();
    let html = page.render().unwrap();

    assert!(html.starts_with("<!DOCTYPE html><html"));
    assert!(html.contains(r#"lang="en""#));
    assert!(html.contains("<head>") || html.contains("<head "));
    assert!(html.contains("<body") && html.ends_with("</html>"));
    assert!(html.contains(r#"<meta charset="UTF-8"/>"#));
    assert!(html.contains(r#"name="viewport""#));
    assert!(html.contains(r#"name="robots""#));
    assert!(html.contains(r#"http-equiv="Content-Language""#));
    assert!(html.contains("<title"));
    assert!(html.contains(">Home</title>"));
}

#[test]
fn active_pages_inject_the_runtime() {
    let mut page = Page::new(PageConfig {
        debug: true,
        ..PageConfig::default()
    })
    .unwrap();
    let html = page.render().unwrap();

    assert!(html.contains("window.PAGE_UID='"));
    assert!(html.contains("window.LIVELY_WS_URL = '/ws/lively/'"));
    assert!(html.contains("window.LIVELY_DEBUG = true"));
    assert!(html.contains("/lively/static/msgpack.min.js"));
    assert!(html.contains("/lively/static/lively.js"));
    assert!(html.contains(r#"id="page-snackbar""#));
    assert!(html.contains(r#"id="page-progress-bar""#));
}

#[test]
fn disabled_pages_skip_the_runtime() {
    let mut page = Page::new(quiet_config()).unwrap();
    let html = page.render().unwrap();

    assert!(!html.contains("PAGE_UID"));
    assert!(!html.contains("lively.js"));
    assert!(!html.contains("page-snackbar"));
}

#[test]
fn csp_nonces_reach_inline_scripts_and_styles() {
    let mut page = Page::new(PageConfig {
        csp_nonce: Some("abc123".into()),
        ..PageConfig::default()
    })
    .unwrap();
    page.add_inline_style("body{margin:0}").unwrap();
    let html = page.render().unwrap();

    assert!(html.contains(r#"nonce="abc123""#));
    // External scripts carry no nonce
    assert!(!html.contains(r#"msgpack.min.js" nonce"#));
}

#[test]
fn metadata_helpers_fill_the_head() {
    let mut page = Page::new(quiet_config()).unwrap();
    page.set_description("a demo").unwrap();
    page.set_keywords(&["demo", "lively"]).unwrap();
    page.set_canonical("https://example.com/").unwrap();
    page.set_pagination(Some("/page/1"), Some("/page/3")).unwrap();
    page.set_favicon("/favicon.png", "image/png", "icon", None)
        .unwrap();
    page.set_opengraph(&lively_html::OpenGraph {
        title: "Demo".into(),
        description: "a demo".into(),
        url: "https://example.com/".into(),
        image: None,
        kind: String::new(),
    })
    .unwrap();
    page.set_json_ld(&serde_json::json!({"@type": "WebSite"}))
        .unwrap();

    let html = page.render().unwrap();
    assert!(html.contains(r#"content="a demo""#));
    assert!(html.contains(r#"content="demo, lively""#));
    assert!(html.contains(r#"rel="canonical""#));
    assert!(html.contains(r#"rel="prev""#));
    assert!(html.contains(r#"rel="next""#));
    assert!(html.contains(r#"rel="icon""#));
    assert!(html.contains(r#"property="og:title""#));
    assert!(html.contains(r#"type="application/ld+json""#));
    assert!(html.contains(r#"{"@type":"WebSite"}"#));
}

#[test]
fn document_events_bind_on_pages_only() {
    let mut page = Page::new(quiet_config()).unwrap();
    page.document_bind(
        "DOMContentLoaded",
        EventHandler::sync(|_| Ok(Vec::new())),
        BindOptions::new(),
    )
    .unwrap();

    // Rebinding the same event is refused
    let again = page.document_bind(
        "DOMContentLoaded",
        EventHandler::sync(|_| Ok(Vec::new())),
        BindOptions::new(),
    );
    assert!(matches!(
        again,
        Err(ComponentError::Binding(BindingError::AlreadyBound(_)))
    ));

    // Unknown document events need force_bind
    let unknown = page.document_bind(
        "MadeUpEvent",
        EventHandler::sync(|_| Ok(Vec::new())),
        BindOptions::new(),
    );
    assert!(matches!(
        unknown,
        Err(ComponentError::Binding(BindingError::UnknownEvent(_)))
    ));

    // And plain components cannot carry them at all
    let body = page.body();
    let result = page.tree_mut().document_bind(
        body,
        "DOMContentLoaded",
        EventHandler::sync(|_| Ok(Vec::new())),
        BindOptions::new(),
    );
    assert!(matches!(
        result,
        Err(ComponentError::Binding(BindingError::NotAPage))
    ));
}

#[test]
fn bound_document_events_render_as_data_props() {
    let mut page = Page::new(PageConfig::default()).unwrap();
    page.document_bind(
        "DOMContentLoaded",
        EventHandler::sync(|_| Ok(Vec::new())),
        BindOptions::new(),
    )
    .unwrap();

    let html = page.render().unwrap();
    assert!(html.contains(r#"data-document-events="DOMContentLoaded""#));
}

#[test]
fn widget_text_is_escaped() {
    assert_eq!(escape_text("<b>&\"x\"</b>"), "&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;");

    let mut page = Page::new(quiet_config()).unwrap();
    page.add_to_body(elements::paragraph("<script>alert(1)</script>").unwrap())
        .unwrap();
    let html = page.render().unwrap();
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>alert(1)</script>"));
}

#[test]
fn widgets_produce_their_expected_tags() {
    let mut page = Page::new(quiet_config()).unwrap();
    page.add_to_body(elements::button("Go").unwrap()).unwrap();
    page.add_to_body(elements::link("/about", "About").unwrap())
        .unwrap();
    page.add_to_body(elements::input("email", "user-email").unwrap())
        .unwrap();
    page.add_to_body(elements::heading(2, "Section").unwrap())
        .unwrap();
    page.add_to_body(elements::image("/logo.png", "logo").unwrap())
        .unwrap();

    let html = page.render().unwrap();
    assert!(html.contains("<button") && html.contains(">Go</button>"));
    assert!(html.contains(r#"href="/about""#));
    assert!(html.contains(r#"type="email""#));
    assert!(html.contains("<h2") && html.contains(">Section</h2>"));
    assert!(html.contains(r#"<img src="/logo.png" alt="logo"/>"#));
}

#[test]
fn fullpage_reload_policy_is_adjustable() {
    let mut page = Page::new(quiet_config()).unwrap();
    page.set_fullpage_reload(true).unwrap();
    page.set_fullpage_reload_headers(vec!["set-cookie".into(), "x-refresh".into()])
        .unwrap();

    let tree = page.tree();
    let state = tree.get(tree.root()).unwrap().page().unwrap();
    assert!(state.fullpage_reload);
    assert_eq!(state.fullpage_reload_headers.len(), 2);
}

#[test]
fn error_pages_show_status_and_message() {
    let mut page = error_page(404, "Nothing here", quiet_config()).unwrap();
    let html = page.render().unwrap();
    assert!(html.contains(">404</h1>"));
    assert!(html.contains("Nothing here"));
}
