//! The `Page` component: the document root owning `<html>/<head>/<body>`,
//! SEO metadata, document-scoped events and the runtime script injection.

use lively_core::{
    BindOptions, ComponentError, ComponentId, EventHandler, HtmlComponent, PageState, Tree,
};

use crate::elements::{
    progress_bar, script_inline, script_src, snackbar, style_inline, stylesheet,
};
use crate::escape_text;

/// Transition CSS for nodes the client patches in and out.
const PATCH_CSS: &str = "\
.patch-fade-in{opacity:0;animation:fadeIn 0.1s forwards;}\
@keyframes fadeIn{to{opacity:1;}}\
.patch-fade-out{opacity:1;animation:fadeOut 0.1s forwards;}\
@keyframes fadeOut{to{opacity:0;}}";

/// Settings a page needs from its host at construction time.
#[derive(Debug, Clone)]
pub struct PageConfig {
    pub lang: String,
    pub title: String,
    /// Resolved WebSocket endpoint, exposed as `window.LIVELY_WS_URL`.
    pub ws_url: String,
    /// Base path of the runtime scripts (`msgpack.min.js`, `lively.js`).
    pub static_url: String,
    /// Mirrored to `window.LIVELY_DEBUG`.
    pub debug: bool,
    /// Skip runtime script injection entirely for this page.
    pub disable_lively: bool,
    /// CSP nonce from the host's request, injected into inline scripts and
    /// styles.
    pub csp_nonce: Option<String>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            lang: "en".into(),
            title: String::new(),
            ws_url: "/ws/lively/".into(),
            static_url: "/lively/static".into(),
            debug: false,
            disable_lively: false,
            csp_nonce: None,
        }
    }
}

/// Open Graph metadata for social embeds.
#[derive(Debug, Clone, Default)]
pub struct OpenGraph {
    pub title: String,
    pub description: String,
    pub url: String,
    pub image: Option<String>,
    /// `og:type`, defaults to `website` when empty.
    pub kind: String,
}

/// Twitter card metadata.
#[derive(Debug, Clone, Default)]
pub struct TwitterCard {
    /// `summary` when empty.
    pub card: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

/// A root component specialization owning the document skeleton.
///
/// A page is a [`Tree`] whose root is the `<html>` element, with the head and
/// body prebuilt, standard meta tags in place and (unless disabled) the
/// Lively client runtime wired in.
#[derive(Debug)]
pub struct Page {
    tree: Tree,
    head: ComponentId,
    body: ComponentId,
    title: ComponentId,
    description: ComponentId,
    keywords: ComponentId,
    robots: ComponentId,
    lang_meta: ComponentId,
    canonical: Option<ComponentId>,
    prev_link: Option<ComponentId>,
    next_link: Option<ComponentId>,
    json_ld: Option<ComponentId>,
    csp_nonce: Option<String>,
}

impl Page {
    pub fn new(config: PageConfig) -> Result<Self, ComponentError> {
        let mut root_component = HtmlComponent::inner("html")?
            .with_page_state(PageState::new())
            .with_prop("lang", config.lang.clone())?;
        if config.disable_lively {
            // Disabling the runtime on the root strips data-* injection for
            // the whole tree
            root_component = root_component.with_lively_disabled();
        }
        let mut tree = Tree::new(root_component)?;
        let root = tree.root();

        let head = tree.create(HtmlComponent::inner("head")?)?;
        let body = tree.create(HtmlComponent::inner("body")?.with_style([
            ("display", "flex"),
            ("flex-direction", "column"),
        ])?)?;
        tree.append_child(root, head)?;
        tree.append_child(root, body)?;

        let meta = |props: &[(&str, &str)]| -> Result<HtmlComponent, ComponentError> {
            HtmlComponent::leaf("meta")?.with_props(props.iter().copied())
        };

        let charset = tree.create(meta(&[("charset", "UTF-8")])?)?;
        let viewport = tree.create(meta(&[
            ("name", "viewport"),
            ("content", "width=device-width, initial-scale=1.0"),
        ])?)?;
        let description = tree.create(meta(&[("name", "description"), ("content", "")])?)?;
        let robots = tree.create(meta(&[("name", "robots"), ("content", "index, follow")])?)?;
        let keywords = tree.create(meta(&[("name", "keywords"), ("content", "")])?)?;
        let lang_meta = tree.create(meta(&[
            ("http-equiv", "Content-Language"),
            ("content", config.lang.as_str()),
        ])?)?;
        let title = tree.create(HtmlComponent::inner("title")?.with_text(escape_text(&config.title))?)?;

        for id in [charset, viewport, description, robots, keywords, lang_meta, title] {
            tree.append_child(head, id)?;
        }

        let mut page = Self {
            tree,
            head,
            body,
            title,
            description,
            keywords,
            robots,
            lang_meta,
            canonical: None,
            prev_link: None,
            next_link: None,
            json_ld: None,
            csp_nonce: config.csp_nonce.clone(),
        };

        if !config.disable_lively {
            page.inject_runtime(&config)?;
        }
        Ok(page)
    }

    /// Wire in everything the client runtime needs: the page UID, the patch
    /// transition CSS, the MessagePack and Lively scripts, and the
    /// progress/snackbar elements.
    fn inject_runtime(&mut self, config: &PageConfig) -> Result<(), ComponentError> {
        // The UID script must come before the runtime scripts so they can
        // resolve the page
        let page_uid = self.tree.ensure_root_uid();
        self.add_inline_script(&format!("window.PAGE_UID='{page_uid}';"))?;

        let css = self.with_nonce(style_inline(PATCH_CSS)?);
        let css = self.tree.create(css)?;
        self.tree.append_child(self.head, css)?;

        // msgpack first, then globals, then the runtime; lively.js must not
        // load async or the client breaks
        let msgpack = script_src(&format!("{}/msgpack.min.js", config.static_url))?
            .with_prop("async", "true")?;
        let msgpack = self.tree.create(msgpack)?;
        self.tree.append_child(self.head, msgpack)?;

        self.add_inline_script(&format!(
            "window.LIVELY_WS_URL = '{}';window.LIVELY_DEBUG = {};",
            config.ws_url,
            if config.debug { "true" } else { "false" },
        ))?;

        let runtime = self
            .tree
            .create(script_src(&format!("{}/lively.js", config.static_url))?)?;
        self.tree.append_child(self.head, runtime)?;

        // Page chrome: network snackbar with its label, reload progress bar
        let snack = self.tree.create(snackbar("page-snackbar")?)?;
        let snack_label = self.tree.create(
            HtmlComponent::inner("label")?
                .with_prop("id", "snackbar-label")?
                .with_style([("text-align", "center"), ("margin", "auto")])?,
        )?;
        self.tree.append_child(snack, snack_label)?;
        self.tree.append_child(self.body, snack)?;

        let progress = self.tree.create(
            progress_bar("page-progress-bar")?
                .with_style_prop("position", "fixed")?
                .with_style_prop("z-index", "5000")?,
        )?;
        self.tree.append_child(self.body, progress)?;
        Ok(())
    }

    fn with_nonce(&self, component: HtmlComponent) -> HtmlComponent {
        match &self.csp_nonce {
            Some(nonce) => component
                .with_prop("nonce", nonce.clone())
                .expect("nonce is a valid prop"),
            None => component,
        }
    }

    // tree access ----------------------------------------------------------

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Hand the page over for registration with the live system.
    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub fn root(&self) -> ComponentId {
        self.tree.root()
    }

    pub fn head(&self) -> ComponentId {
        self.head
    }

    pub fn body(&self) -> ComponentId {
        self.body
    }

    /// Insert a component and mount it in the head.
    pub fn add_to_head(
        &mut self,
        component: HtmlComponent,
    ) -> Result<ComponentId, ComponentError> {
        let id = self.tree.create(component)?;
        self.tree.append_child(self.head, id)?;
        Ok(id)
    }

    /// Insert a component and mount it in the body.
    pub fn add_to_body(
        &mut self,
        component: HtmlComponent,
    ) -> Result<ComponentId, ComponentError> {
        let id = self.tree.create(component)?;
        self.tree.append_child(self.body, id)?;
        Ok(id)
    }

    // rendering ------------------------------------------------------------

    /// The full initial HTML response, doctype included.
    pub fn render(&mut self) -> Result<String, ComponentError> {
        let html = self.tree.render_root()?;
        Ok(format!("<!DOCTYPE html>{html}"))
    }

    // metadata -------------------------------------------------------------

    pub fn set_title(&mut self, title: &str) -> Result<(), ComponentError> {
        self.tree.set_inner_text(self.title, escape_text(title))
    }

    pub fn set_description(&mut self, description: &str) -> Result<(), ComponentError> {
        self.tree.set_prop(self.description, "content", description)
    }

    pub fn set_keywords(&mut self, keywords: &[&str]) -> Result<(), ComponentError> {
        self.tree.set_prop(self.keywords, "content", keywords.join(", "))
    }

    pub fn set_robots(&mut self, content: &str) -> Result<(), ComponentError> {
        self.tree.set_prop(self.robots, "content", content)
    }

    pub fn set_lang(&mut self, lang: &str) -> Result<(), ComponentError> {
        self.tree.set_prop(self.tree.root(), "lang", lang)?;
        self.tree.set_prop(self.lang_meta, "content", lang)
    }

    pub fn set_author(&mut self, author: &str) -> Result<(), ComponentError> {
        self.add_meta(&[("name", "author"), ("content", author)])?;
        Ok(())
    }

    pub fn add_meta(&mut self, props: &[(&str, &str)]) -> Result<ComponentId, ComponentError> {
        let meta = HtmlComponent::leaf("meta")?.with_props(props.iter().copied())?;
        self.add_to_head(meta)
    }

    pub fn set_favicon(
        &mut self,
        source: &str,
        icon_type: &str,
        rel: &str,
        sizes: Option<&str>,
    ) -> Result<ComponentId, ComponentError> {
        let mut favicon = HtmlComponent::leaf("link")?
            .with_prop("rel", rel)?
            .with_prop("type", icon_type)?
            .with_prop("href", source)?;
        if let Some(sizes) = sizes {
            favicon = favicon.with_prop("sizes", sizes)?;
        }
        self.add_to_head(favicon)
    }

    pub fn set_canonical(&mut self, url: &str) -> Result<(), ComponentError> {
        self.canonical = Some(self.upsert_link(self.canonical, "canonical", url)?);
        Ok(())
    }

    pub fn set_pagination(
        &mut self,
        prev_url: Option<&str>,
        next_url: Option<&str>,
    ) -> Result<(), ComponentError> {
        if let Some(url) = prev_url {
            self.prev_link = Some(self.upsert_link(self.prev_link, "prev", url)?);
        }
        if let Some(url) = next_url {
            self.next_link = Some(self.upsert_link(self.next_link, "next", url)?);
        }
        Ok(())
    }

    fn upsert_link(
        &mut self,
        existing: Option<ComponentId>,
        rel: &str,
        href: &str,
    ) -> Result<ComponentId, ComponentError> {
        if let Some(id) = existing {
            self.tree.set_prop(id, "href", href)?;
            return Ok(id);
        }
        let link = HtmlComponent::leaf("link")?
            .with_prop("rel", rel)?
            .with_prop("href", href)?;
        self.add_to_head(link)
    }

    pub fn set_opengraph(&mut self, og: &OpenGraph) -> Result<(), ComponentError> {
        let kind = if og.kind.is_empty() { "website" } else { &og.kind };
        self.add_meta(&[("property", "og:type"), ("content", kind)])?;
        self.add_meta(&[("property", "og:title"), ("content", &og.title)])?;
        self.add_meta(&[("property", "og:description"), ("content", &og.description)])?;
        self.add_meta(&[("property", "og:url"), ("content", &og.url)])?;
        if let Some(image) = &og.image {
            self.add_meta(&[("property", "og:image"), ("content", image)])?;
        }
        Ok(())
    }

    pub fn set_twitter_card(&mut self, card: &TwitterCard) -> Result<(), ComponentError> {
        let kind = if card.card.is_empty() { "summary" } else { &card.card };
        self.add_meta(&[("name", "twitter:card"), ("content", kind)])?;
        self.add_meta(&[("name", "twitter:title"), ("content", &card.title)])?;
        self.add_meta(&[
            ("name", "twitter:description"),
            ("content", &card.description),
        ])?;
        if let Some(image) = &card.image {
            self.add_meta(&[("name", "twitter:image"), ("content", image)])?;
        }
        Ok(())
    }

    /// Embed structured data as `application/ld+json`. Replaces any previous
    /// block.
    pub fn set_json_ld(&mut self, data: &serde_json::Value) -> Result<(), ComponentError> {
        let json = data.to_string();
        if let Some(id) = self.json_ld {
            self.tree.set_inner_text(id, json)?;
            return Ok(());
        }
        let script = self.with_nonce(
            HtmlComponent::inner("script")?
                .with_prop("type", "application/ld+json")?
                .with_text(json)?,
        );
        self.json_ld = Some(self.add_to_head(script)?);
        Ok(())
    }

    // scripts & styles -----------------------------------------------------

    pub fn add_inline_script(&mut self, code: &str) -> Result<ComponentId, ComponentError> {
        let script = self.with_nonce(script_inline(code)?);
        self.add_to_head(script)
    }

    pub fn add_script_src(&mut self, src: &str) -> Result<ComponentId, ComponentError> {
        self.add_to_head(script_src(src)?)
    }

    pub fn add_stylesheet(&mut self, href: &str) -> Result<ComponentId, ComponentError> {
        self.add_to_head(stylesheet(href)?)
    }

    pub fn add_inline_style(&mut self, css: &str) -> Result<ComponentId, ComponentError> {
        let style = self.with_nonce(style_inline(css)?);
        self.add_to_head(style)
    }

    // document events & navigation policy ----------------------------------

    /// Bind a document-scoped event (`DOMContentLoaded`, `LivelyNavigated`).
    pub fn document_bind(
        &mut self,
        event: &str,
        handler: EventHandler,
        options: BindOptions,
    ) -> Result<(), ComponentError> {
        let root = self.tree.root();
        self.tree.document_bind(root, event, handler, options)
    }

    pub fn document_unbind(&mut self, event: &str, failsafe: bool) -> Result<(), ComponentError> {
        let root = self.tree.root();
        self.tree.document_unbind(root, event, failsafe)
    }

    /// Force clients to reload instead of accepting patches when they
    /// navigate to this page.
    pub fn set_fullpage_reload(&mut self, fullpage_reload: bool) -> Result<(), ComponentError> {
        let root = self.tree.root();
        if let Some(state) = self.tree.page_state_mut(root)? {
            state.fullpage_reload = fullpage_reload;
        }
        Ok(())
    }

    /// Response headers (lowercased) that force a fullpage reload on
    /// navigation. `set-cookie` is present by default.
    pub fn set_fullpage_reload_headers(
        &mut self,
        headers: Vec<String>,
    ) -> Result<(), ComponentError> {
        let root = self.tree.root();
        if let Some(state) = self.tree.page_state_mut(root)? {
            state.fullpage_reload_headers = headers;
        }
        Ok(())
    }
}

/// A minimal error page: status heading plus message.
pub fn error_page(
    status_code: u16,
    message: &str,
    config: PageConfig,
) -> Result<Page, ComponentError> {
    let mut page = Page::new(config)?;
    page.set_title(&format!("Error {status_code}"))?;

    let wrapper = crate::elements::flex_container()?.with_style([
        ("flex-direction", "column"),
        ("align-items", "center"),
        ("justify-content", "center"),
        ("min-height", "60vh"),
    ])?;
    let wrapper = page.add_to_body(wrapper)?;

    let heading = crate::elements::heading(1, &status_code.to_string())?;
    let heading = page.tree_mut().create(heading)?;
    page.tree_mut().append_child(wrapper, heading)?;

    let message = crate::elements::paragraph(message)?;
    let message = page.tree_mut().create(message)?;
    page.tree_mut().append_child(wrapper, message)?;

    Ok(page)
}
