//! Navigation: streamed patches between registered pages and the fullreload
//! fallbacks.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{recv_value, send_value};
use http::{HeaderMap, HeaderValue, StatusCode};
use parking_lot::Mutex;
use rmpv::Value;
use tokio::io::DuplexStream;

use lively_core::prelude::*;
use lively_core::HtmlComponent;
use lively_liveview::{
    HostApp, HostRequest, HostResponse, LivelyConfig, LivelyServer, SocketOptions,
};

/// A host serving one canned response.
struct OneShotHost {
    response: Mutex<Option<HostResponse>>,
}

impl OneShotHost {
    fn new(response: Option<HostResponse>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(response),
        })
    }
}

#[async_trait]
impl HostApp for OneShotHost {
    async fn serve_request(&self, _request: HostRequest) -> HostResponse {
        self.response.lock().take().unwrap_or(HostResponse::Other {
            status: StatusCode::NOT_FOUND,
            headers: HeaderMap::new(),
        })
    }

    fn resolve(&self, _name: &str) -> Option<String> {
        None
    }

    fn debug_enabled(&self) -> bool {
        true
    }
}

fn server_with(host: Arc<dyn HostApp>) -> Arc<LivelyServer> {
    let config = LivelyConfig {
        debug: true,
        ..LivelyConfig::default()
    };
    Arc::new(LivelyServer::new(host, config))
}

async fn connect(server: &Arc<LivelyServer>) -> DuplexStream {
    let (client, stream) = tokio::io::duplex(1 << 16);
    let server = Arc::clone(server);
    tokio::spawn(async move {
        let _ = server.serve(stream, SocketOptions::default()).await;
    });
    client
}

fn page_tree(root_uid: &str, text: &str) -> Tree {
    let mut tree = Tree::new(HtmlComponent::inner("div").unwrap()).unwrap();
    tree.set_root_uid(root_uid).unwrap();
    let root = tree.root();
    let label = tree
        .create(
            HtmlComponent::inner("label")
                .unwrap()
                .with_text(text)
                .unwrap(),
        )
        .unwrap();
    tree.append_child(root, label).unwrap();
    tree
}

fn navigate_to(prev: &str, next: Option<&str>, path: &str) -> Value {
    Value::Array(vec![
        Value::from(120),
        Value::from(prev),
        next.map(Value::from).unwrap_or(Value::Nil),
        Value::from(path),
        Value::Map(vec![(Value::from("referer"), Value::from("/"))]),
    ])
}

fn fullreload_result(path: &str) -> Value {
    Value::Array(vec![
        Value::from(121),
        Value::from(path),
        Value::from(true),
        Value::Nil,
        Value::Array(Vec::new()),
        Value::from(true),
    ])
}

#[tokio::test]
async fn unknown_previous_pages_force_a_full_reload() {
    let server = server_with(OneShotHost::new(None));
    let mut client = connect(&server).await;

    send_value(&mut client, &navigate_to("gone", None, "/target")).await;
    assert_eq!(recv_value(&mut client).await, fullreload_result("/target"));
}

#[tokio::test]
async fn non_component_responses_force_a_full_reload() {
    let server = server_with(OneShotHost::new(None));
    server.register_page(page_tree("prev-page", "old"));

    let mut client = connect(&server).await;
    send_value(&mut client, &navigate_to("prev-page", None, "/missing")).await;
    assert_eq!(recv_value(&mut client).await, fullreload_result("/missing"));
}

#[tokio::test]
async fn known_targets_stream_patches_then_a_final_marker() {
    let server = server_with(OneShotHost::new(None));
    server.register_page(page_tree("prev-page", "old"));
    server.register_page(page_tree("next-page", "new"));

    let mut client = connect(&server).await;
    send_value(
        &mut client,
        &navigate_to("prev-page", Some("next-page"), "/next"),
    )
    .await;

    // The root keeps its DOM node but must learn the new page uid first
    let reprops = recv_value(&mut client).await;
    assert_eq!(
        reprops,
        Value::Array(vec![
            Value::from(121),
            Value::from("/next"),
            Value::from(false),
            Value::from("next-page"),
            Value::Array(vec![Value::Array(vec![
                Value::from(4),
                Value::from("prev-page"),
                Value::Map(vec![(Value::from("data-uid"), Value::from("next-page"))]),
            ])]),
            Value::from(false),
        ])
    );

    let patch = recv_value(&mut client).await;
    assert_eq!(
        patch,
        Value::Array(vec![
            Value::from(121),
            Value::from("/next"),
            Value::from(false),
            Value::from("next-page"),
            Value::Array(vec![Value::Array(vec![
                Value::from(3),
                Value::from("0.0"),
                Value::from("new"),
            ])]),
            Value::from(false),
        ])
    );

    let done = recv_value(&mut client).await;
    assert_eq!(
        done,
        Value::Array(vec![
            Value::from(121),
            Value::from("/next"),
            Value::from(false),
            Value::from("next-page"),
            Value::Array(Vec::new()),
            Value::from(true),
        ])
    );
}

#[tokio::test]
async fn set_cookie_responses_force_a_full_reload() {
    // The materialized page defaults to reloading on set-cookie
    let mut next = Tree::new(
        HtmlComponent::inner("html")
            .unwrap()
            .with_page_state(PageState::new()),
    )
    .unwrap();
    next.set_root_uid("cookie-page").unwrap();

    let mut headers = HeaderMap::new();
    headers.insert("set-cookie", HeaderValue::from_static("session=1"));
    let response = HostResponse::Component {
        tree: Arc::new(tokio::sync::Mutex::new(next)),
        headers,
    };

    let server = server_with(OneShotHost::new(Some(response)));
    server.register_page(page_tree("prev-page", "old"));

    let mut client = connect(&server).await;
    send_value(&mut client, &navigate_to("prev-page", None, "/cookie")).await;
    assert_eq!(recv_value(&mut client).await, fullreload_result("/cookie"));
}

#[tokio::test]
async fn explicit_fullpage_reload_pages_never_patch() {
    let mut next = Tree::new(
        HtmlComponent::inner("html")
            .unwrap()
            .with_page_state(PageState::new()),
    )
    .unwrap();
    next.set_root_uid("strict-page").unwrap();
    let root = next.root();
    next.page_state_mut(root).unwrap().unwrap().fullpage_reload = true;

    let response = HostResponse::Component {
        tree: Arc::new(tokio::sync::Mutex::new(next)),
        headers: HeaderMap::new(),
    };
    let server = server_with(OneShotHost::new(Some(response)));
    server.register_page(page_tree("prev-page", "old"));

    let mut client = connect(&server).await;
    send_value(&mut client, &navigate_to("prev-page", None, "/strict")).await;
    assert_eq!(recv_value(&mut client).await, fullreload_result("/strict"));
}
