//! End-to-end event dispatch over an in-memory connection.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{arr, dispatch_event, recv_value, send_value};
use rmpv::Value;
use tokio::io::DuplexStream;

use lively_core::prelude::*;
use lively_core::{
    BoxFuture, EventHandler, EventScope, HandlerResult, HtmlComponent, JsExecutionError,
};
use lively_liveview::{LivelyConfig, LivelyServer, NoRoutes, SocketOptions};

fn debug_config() -> LivelyConfig {
    LivelyConfig {
        debug: true,
        ..LivelyConfig::default()
    }
}

fn new_server() -> Arc<LivelyServer> {
    Arc::new(LivelyServer::new(Arc::new(NoRoutes), debug_config()))
}

async fn connect(server: &Arc<LivelyServer>) -> DuplexStream {
    let (client, stream) = tokio::io::duplex(1 << 16);
    let server = Arc::clone(server);
    tokio::spawn(async move {
        let _ = server.serve(stream, SocketOptions::default()).await;
    });
    client
}

/// A page-less root with one child, rendered so UIDs and data props are
/// in place, then registered.
fn register_labeled_tree(
    server: &Arc<LivelyServer>,
    root_uid: &str,
    texts: &[&str],
) -> Vec<ComponentId> {
    let mut tree = Tree::new(HtmlComponent::inner("div").unwrap()).unwrap();
    tree.set_root_uid(root_uid).unwrap();
    let root = tree.root();
    let mut children = Vec::new();
    for text in texts {
        let child = tree
            .create(
                HtmlComponent::inner("label")
                    .unwrap()
                    .with_text(*text)
                    .unwrap(),
            )
            .unwrap();
        tree.append_child(root, child).unwrap();
        children.push(child);
    }
    tree.render_root().unwrap();
    server.register_page(tree);
    children
}

#[tokio::test]
async fn text_update_streams_exactly_one_patch() {
    let server = new_server();

    let mut tree = Tree::new(HtmlComponent::inner("div").unwrap()).unwrap();
    tree.set_root_uid("root-page").unwrap();
    let root = tree.root();
    let label = tree
        .create(HtmlComponent::inner("label").unwrap().with_text("a").unwrap())
        .unwrap();
    tree.append_child(root, label).unwrap();
    tree.bind(
        label,
        "click",
        EventHandler::sync(|scope: EventScope<'_>| {
            scope.tree.set_inner_text(scope.component, "b")?;
            Ok(Vec::new())
        }),
        BindOptions::new(),
    )
    .unwrap();
    tree.render_root().unwrap();
    server.register_page(tree);

    let mut client = connect(&server).await;
    send_value(
        &mut client,
        &dispatch_event("root-page", "0.0", "click", "", false),
    )
    .await;

    let message = recv_value(&mut client).await;
    assert_eq!(
        message,
        Value::Array(vec![
            Value::from(1),
            Value::Array(vec![Value::Array(vec![
                Value::from(3),
                Value::from("0.0"),
                Value::from("b"),
            ])]),
        ])
    );
}

#[tokio::test]
async fn appended_children_arrive_as_insert_patches() {
    let server = new_server();

    let mut tree = Tree::new(HtmlComponent::inner("div").unwrap()).unwrap();
    tree.set_root_uid("parent-page").unwrap();
    let root = tree.root();
    let first = tree
        .create(HtmlComponent::inner("label").unwrap().with_text("a").unwrap())
        .unwrap();
    tree.append_child(root, first).unwrap();
    tree.bind(
        root,
        "click",
        EventHandler::sync(|scope: EventScope<'_>| {
            let span = scope.tree.create(
                HtmlComponent::inner("span")?
                    .with_text("new")?,
            )?;
            scope.tree.append_child(scope.component, span)?;
            Ok(Vec::new())
        }),
        BindOptions::new(),
    )
    .unwrap();
    tree.render_root().unwrap();
    server.register_page(tree);

    let mut client = connect(&server).await;
    send_value(
        &mut client,
        &dispatch_event("parent-page", "parent-page", "click", "", false),
    )
    .await;

    let message = recv_value(&mut client).await;
    let outer = arr(&message);
    assert_eq!(outer[0], Value::from(1));
    let patch = arr(&arr(&outer[1])[0]);
    assert_eq!(patch[0], Value::from(2));
    assert_eq!(patch[1], Value::from("parent-page"));
    // Payload is [index, serialized_node]
    let payload = arr(&patch[2]);
    assert_eq!(payload[0], Value::from(1));
    let node = arr(&payload[1]);
    assert_eq!(node[0], Value::from("span"));
    assert_eq!(node[1], Value::from("0.1"));
    assert_eq!(node[4], Value::from("new"));
}

#[tokio::test]
async fn removed_children_stream_remove_then_shift_patches() {
    let server = new_server();

    let mut tree = Tree::new(HtmlComponent::inner("div").unwrap()).unwrap();
    tree.set_root_uid("list-page").unwrap();
    let root = tree.root();
    let first = tree
        .create(
            HtmlComponent::inner("label")
                .unwrap()
                .with_text("first")
                .unwrap(),
        )
        .unwrap();
    let second = tree
        .create(
            HtmlComponent::inner("label")
                .unwrap()
                .with_text("second")
                .unwrap(),
        )
        .unwrap();
    tree.extend_children(root, [first, second]).unwrap();
    tree.bind(
        root,
        "click",
        EventHandler::sync(move |scope: EventScope<'_>| {
            let victim = scope.tree.children_of(scope.component)[0];
            scope.tree.remove_child(scope.component, victim)?;
            Ok(Vec::new())
        }),
        BindOptions::new(),
    )
    .unwrap();
    tree.render_root().unwrap();
    server.register_page(tree);

    let mut client = connect(&server).await;
    send_value(
        &mut client,
        &dispatch_event("list-page", "list-page", "click", "", false),
    )
    .await;

    let removal = recv_value(&mut client).await;
    assert_eq!(
        removal,
        Value::Array(vec![
            Value::from(1),
            Value::Array(vec![Value::Array(vec![
                Value::from(1),
                Value::from("0.1"),
            ])]),
        ])
    );
    // Positional uids shift the surviving text onto the first slot
    let shift = recv_value(&mut client).await;
    assert_eq!(
        shift,
        Value::Array(vec![
            Value::from(1),
            Value::Array(vec![Value::Array(vec![
                Value::from(3),
                Value::from("0.0"),
                Value::from("second"),
            ])]),
        ])
    );
}

#[tokio::test]
async fn style_writes_replace_the_style_map() {
    let server = new_server();
    let children = register_labeled_tree(&server, "btn-page", &["press"]);
    let button = children[0];

    // Rebind on the registered tree through the registry
    let shared = server.registry().get("btn-page").unwrap();
    {
        let mut tree = shared.lock().await;
        tree.bind(
            button,
            "click",
            EventHandler::sync(|scope: EventScope<'_>| {
                scope.tree.set_style(scope.component, "color", "red")?;
                Ok(Vec::new())
            }),
            BindOptions::new(),
        )
        .unwrap();
        tree.render_root().unwrap();
    }

    let mut client = connect(&server).await;
    send_value(
        &mut client,
        &dispatch_event("btn-page", "0.0", "click", "", false),
    )
    .await;

    let message = recv_value(&mut client).await;
    assert_eq!(
        message,
        Value::Array(vec![
            Value::from(1),
            Value::Array(vec![Value::Array(vec![
                Value::from(5),
                Value::from("0.0"),
                Value::Map(vec![(Value::from("color"), Value::from("red"))]),
            ])]),
        ])
    );
}

#[tokio::test]
async fn unknown_components_answer_with_component_unknown() {
    let server = new_server();
    register_labeled_tree(&server, "root-page", &["a"]);

    let mut client = connect(&server).await;
    send_value(
        &mut client,
        &dispatch_event("root-page", "does-not-exist", "click", "", false),
    )
    .await;

    let message = recv_value(&mut client).await;
    assert_eq!(
        message,
        Value::Array(vec![
            Value::from(130),
            Value::Array(vec![Value::from("does-not-exist"), Value::from(true)]),
        ])
    );
}

#[tokio::test]
async fn handlers_can_round_trip_javascript() {
    let server = new_server();

    let mut tree = Tree::new(HtmlComponent::inner("div").unwrap()).unwrap();
    tree.set_root_uid("js-page").unwrap();
    let root = tree.root();
    let label = tree
        .create(HtmlComponent::inner("label").unwrap().with_text("?").unwrap())
        .unwrap();
    tree.append_child(root, label).unwrap();
    fn on_click(scope: EventScope<'_>) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            let result = scope
                .client
                .execute_js("1 + 1", Some(Duration::from_secs(2)), true)
                .await?;
            let text = match result {
                Some(Value::String(s)) => s.into_str().unwrap_or_default().to_string(),
                other => format!("unexpected {other:?}"),
            };
            scope.tree.set_inner_text(scope.component, text)?;
            Ok(Vec::new())
        })
    }
    tree.bind(
        label,
        "click",
        EventHandler::asynchronous(on_click),
        BindOptions::new(),
    )
    .unwrap();
    tree.render_root().unwrap();
    server.register_page(tree);

    let mut client = connect(&server).await;
    send_value(
        &mut client,
        &dispatch_event("js-page", "0.0", "click", "", false),
    )
    .await;

    // The server asks for execution first
    let request = recv_value(&mut client).await;
    let Value::Array(items) = &request else {
        panic!("expected array");
    };
    assert_eq!(items[0], Value::from(101));
    assert_eq!(items[1], Value::from("1 + 1"));
    assert_eq!(items[4], Value::from(true));
    let uid = items[5].as_str().unwrap().to_string();

    // Answer like a client would
    send_value(
        &mut client,
        &Value::Array(vec![
            Value::from(111),
            Value::from("2"),
            Value::Nil,
            Value::from(uid),
        ]),
    )
    .await;

    let patch = recv_value(&mut client).await;
    assert_eq!(
        patch,
        Value::Array(vec![
            Value::from(1),
            Value::Array(vec![Value::Array(vec![
                Value::from(3),
                Value::from("0.0"),
                Value::from("2"),
            ])]),
        ])
    );
}

#[tokio::test]
async fn unanswered_js_executions_time_out() {
    let server = new_server();

    let mut tree = Tree::new(HtmlComponent::inner("div").unwrap()).unwrap();
    tree.set_root_uid("slow-page").unwrap();
    let root = tree.root();
    let label = tree
        .create(HtmlComponent::inner("label").unwrap().with_text("?").unwrap())
        .unwrap();
    tree.append_child(root, label).unwrap();
    fn on_click(scope: EventScope<'_>) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            let outcome = scope
                .client
                .execute_js("stall()", Some(Duration::from_millis(50)), true)
                .await;
            let text = match outcome {
                Err(JsExecutionError::TimedOut(_)) => "timed out",
                other => panic!("expected a timeout, got {other:?}"),
            };
            scope.tree.set_inner_text(scope.component, text)?;
            Ok(Vec::new())
        })
    }
    tree.bind(
        label,
        "click",
        EventHandler::asynchronous(on_click),
        BindOptions::new(),
    )
    .unwrap();
    tree.render_root().unwrap();
    server.register_page(tree);

    let mut client = connect(&server).await;
    send_value(
        &mut client,
        &dispatch_event("slow-page", "0.0", "click", "", false),
    )
    .await;

    // The execution request goes out, but nobody answers
    let request = recv_value(&mut client).await;
    assert_eq!(arr(&request)[0], Value::from(101));

    let patch = recv_value(&mut client).await;
    assert_eq!(
        patch,
        Value::Array(vec![
            Value::from(1),
            Value::Array(vec![Value::Array(vec![
                Value::from(3),
                Value::from("0.0"),
                Value::from("timed out"),
            ])]),
        ])
    );
}

#[tokio::test]
async fn dom_content_loaded_runs_at_most_once() {
    let server = new_server();

    let mut tree = Tree::new(
        HtmlComponent::inner("html")
            .unwrap()
            .with_page_state(PageState::new()),
    )
    .unwrap();
    tree.set_root_uid("doc-page").unwrap();
    let root = tree.root();
    let body = tree.create(HtmlComponent::inner("body").unwrap()).unwrap();
    tree.append_child(root, body).unwrap();
    tree.document_bind(
        root,
        "DOMContentLoaded",
        EventHandler::sync(move |scope: EventScope<'_>| {
            let body = scope.tree.children_of(scope.component)[0];
            let seen = scope
                .tree
                .get(body)?
                .inner_text()
                .parse::<u32>()
                .unwrap_or(0);
            scope.tree.set_inner_text(body, (seen + 1).to_string())?;
            Ok(Vec::new())
        }),
        BindOptions::new(),
    )
    .unwrap();
    tree.render_root().unwrap();
    server.register_page(tree);

    let mut client = connect(&server).await;
    send_value(
        &mut client,
        &dispatch_event("doc-page", "doc-page", "DOMContentLoaded", "", true),
    )
    .await;
    let first = recv_value(&mut client).await;
    assert_eq!(arr(&first)[0], Value::from(1));

    // Replays (back navigation) are deduplicated: no further patches
    send_value(
        &mut client,
        &dispatch_event("doc-page", "doc-page", "DOMContentLoaded", "", true),
    )
    .await;
    let silence =
        tokio::time::timeout(Duration::from_millis(200), recv_value(&mut client)).await;
    assert!(silence.is_err(), "second DOMContentLoaded produced output");
}
