//! One WebSocket connection: frame loops, message reassembly and the handle
//! handlers use to talk back to the client.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use rmpv::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use lively_core::{
    JsExecutionError, LiveClient, Patch, Registry, SharedTree, Tree,
};
use lively_websocket::{CloseCode, Frame, FrameExtension, OpCode, PerMessageDeflate, WsError};

use crate::config::LivelyConfig;
use crate::error::LiveViewError;
use crate::events;
use crate::host::HostApp;
use crate::js::{self, JsFutures};
use crate::navigation;
use crate::protocol::{self, Inbound, Outbound};

/// Negotiated permessage-deflate parameters for one connection. Compression
/// contexts are per-direction, so each side of the connection builds its own
/// instance from this.
#[derive(Debug, Clone)]
pub struct DeflateConfig {
    pub client_no_context_takeover: bool,
    pub server_no_context_takeover: bool,
    pub client_max_window_bits: u8,
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            client_no_context_takeover: false,
            server_no_context_takeover: false,
            client_max_window_bits: 15,
        }
    }
}

impl DeflateConfig {
    fn build(&self) -> Result<PerMessageDeflate, WsError> {
        PerMessageDeflate::new(
            self.client_no_context_takeover,
            self.server_no_context_takeover,
            self.client_max_window_bits,
        )
    }
}

/// Per-connection options, carried over from the HTTP upgrade.
#[derive(Debug, Clone, Default)]
pub struct SocketOptions {
    /// Negotiated compression, if the client offered it.
    pub deflate: Option<DeflateConfig>,
    /// CSP nonce of the upgrade request, reused for navigation requests.
    pub csp_nonce: Option<String>,
}

/// The live component system: the registry of page trees, the settings and
/// the host application, shared by every connection.
pub struct LivelyServer {
    registry: Arc<Registry>,
    config: Arc<LivelyConfig>,
    host: Arc<dyn HostApp>,
}

impl LivelyServer {
    pub fn new(host: Arc<dyn HostApp>, config: LivelyConfig) -> Self {
        Self {
            registry: Arc::new(Registry::default()),
            config: Arc::new(config),
            host,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &LivelyConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<dyn HostApp> {
        &self.host
    }

    /// Register a rendered page so client events can find it.
    pub fn register_page(&self, tree: Tree) -> (String, SharedTree) {
        self.registry.register(tree)
    }

    /// Drive one upgraded connection until it closes. The stream is the raw
    /// byte stream after the HTTP upgrade; the host owns the handshake.
    pub async fn serve<S>(&self, stream: S, options: SocketOptions) -> Result<(), LiveViewError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);

        let encode_extensions = build_extensions(&options)?;
        let decode_extensions = build_extensions(&options)?;

        let (out_tx, out_rx) = mpsc::unbounded_channel::<Frame>();
        let writer_task = tokio::spawn(write_loop(writer, out_rx, encode_extensions));

        let handle = LiveHandle {
            out: out_tx,
            futures: Arc::new(JsFutures::new()),
        };
        let ctx = ConnCtx {
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
            host: Arc::clone(&self.host),
            handle: handle.clone(),
            csp_nonce: options.csp_nonce.clone(),
        };

        let result = read_loop(reader, decode_extensions, ctx).await;

        // Cancel outstanding JS futures so awaiters unblock
        handle.futures.cancel_all();
        drop(handle);
        let _ = writer_task.await;
        result
    }
}

impl std::fmt::Debug for LivelyServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivelyServer")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn build_extensions(
    options: &SocketOptions,
) -> Result<Vec<Box<dyn FrameExtension>>, LiveViewError> {
    let mut extensions: Vec<Box<dyn FrameExtension>> = Vec::new();
    if let Some(deflate) = &options.deflate {
        extensions.push(Box::new(deflate.build()?));
    }
    Ok(extensions)
}

/// Everything a spawned dispatch task needs, cloned per message.
#[derive(Clone)]
pub(crate) struct ConnCtx {
    pub registry: Arc<Registry>,
    pub config: Arc<LivelyConfig>,
    pub host: Arc<dyn HostApp>,
    pub handle: LiveHandle,
    pub csp_nonce: Option<String>,
}

async fn write_loop<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Frame>,
    mut extensions: Vec<Box<dyn FrameExtension>>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        match frame.serialize(false, &mut extensions) {
            Ok(bytes) => {
                if writer.write_all(&bytes).await.is_err() {
                    break;
                }
            }
            Err(error) => {
                warn!(%error, "failed to serialize outbound frame");
                break;
            }
        }
    }
    let _ = writer.shutdown().await;
}

async fn read_loop<R>(
    mut reader: R,
    mut extensions: Vec<Box<dyn FrameExtension>>,
    ctx: ConnCtx,
) -> Result<(), LiveViewError>
where
    R: AsyncRead + Unpin,
{
    let max_size = ctx.config.max_message_size;
    // Reassembly buffer for fragmented messages
    let mut message: Option<Vec<u8>> = None;

    loop {
        let frame = match Frame::parse(&mut reader, true, max_size, &mut extensions).await {
            Ok(frame) => frame,
            Err(WsError::Io(_)) => return Ok(()),
            Err(error) => {
                ctx.handle.send_close(error.close_code(), &error.to_string());
                return Err(error.into());
            }
        };

        match frame.opcode {
            OpCode::Ping => {
                let _ = ctx.handle.send_frame(Frame::pong(frame.payload));
            }
            OpCode::Pong => {}
            OpCode::Close => {
                let (code, _reason) = frame.parse_close();
                debug!(code, "client closed the connection");
                ctx.handle.send_close(CloseCode::NormalClosure, "");
                return Ok(());
            }
            OpCode::Text => {
                ctx.handle
                    .send_close(CloseCode::InvalidData, "Expecting MessagePack binary data.");
                return Ok(());
            }
            OpCode::Binary => {
                if message.is_some() {
                    ctx.handle.send_close(
                        CloseCode::ProtocolError,
                        "data frame while a fragmented message is in flight",
                    );
                    return Ok(());
                }
                if frame.fin {
                    if handle_message(&ctx, &frame.payload).is_break() {
                        return Ok(());
                    }
                } else {
                    message = Some(frame.payload.to_vec());
                }
            }
            OpCode::Continuation => {
                let Some(buffer) = message.as_mut() else {
                    ctx.handle
                        .send_close(CloseCode::ProtocolError, "unexpected continuation frame");
                    return Ok(());
                };
                buffer.extend_from_slice(&frame.payload);
                if frame.fin {
                    let complete = message.take().expect("buffer checked above");
                    if handle_message(&ctx, &complete).is_break() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Dispatch one complete inbound message. Breaks the connection on protocol
/// failures; handler work runs on its own task so JS results keep flowing
/// while a handler awaits them.
fn handle_message(ctx: &ConnCtx, bytes: &[u8]) -> std::ops::ControlFlow<()> {
    match protocol::decode(bytes) {
        Err(error) => {
            if ctx.config.debug {
                warn!(%error, "dropping connection on undecodable message");
            }
            ctx.handle
                .send_close(CloseCode::InvalidData, "Failed to decode MessagePack data.");
            std::ops::ControlFlow::Break(())
        }
        Ok(Inbound::JsExecutionResult {
            result,
            exception,
            uid,
        }) => {
            let outcome = match exception {
                Some(exception) => Err(JsExecutionError::Failed(exception)),
                None => Ok(result),
            };
            ctx.handle.futures.complete(&uid, outcome);
            std::ops::ControlFlow::Continue(())
        }
        Ok(Inbound::DispatchComponentEvent {
            root_uid,
            uid,
            event,
            value,
            is_document_event,
        }) => {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let result = events::dispatch_component_event(
                    &ctx,
                    &root_uid,
                    &uid,
                    &event,
                    &value,
                    is_document_event,
                )
                .await;
                if let Err(error) = result {
                    if ctx.config.debug {
                        warn!(%error, uid, event, "component event dispatch failed");
                    }
                }
            });
            std::ops::ControlFlow::Continue(())
        }
        Ok(Inbound::NavigateTo {
            prev_root_uid,
            next_uid,
            path,
            headers,
        }) => {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                navigation::handle_navigation(&ctx, &prev_root_uid, next_uid, &path, headers)
                    .await;
            });
            std::ops::ControlFlow::Continue(())
        }
    }
}

/// The per-connection handle handlers and background tasks use to reach the
/// client: outbound messages, patches and JS round-trips.
#[derive(Clone)]
pub struct LiveHandle {
    out: mpsc::UnboundedSender<Frame>,
    pub(crate) futures: Arc<JsFutures>,
}

impl LiveHandle {
    pub(crate) fn send_frame(&self, frame: Frame) -> Result<(), LiveViewError> {
        self.out
            .send(frame)
            .map_err(|_| LiveViewError::ConnectionClosed)
    }

    pub(crate) fn send_close(&self, code: CloseCode, reason: &str) {
        let _ = self.send_frame(Frame::close(code, reason));
    }

    /// Queue an outbound message. FIFO per connection.
    pub fn send(&self, message: &Outbound) -> Result<(), LiveViewError> {
        let bytes = protocol::encode(message)?;
        self.send_frame(Frame::binary(bytes))
    }

    /// Queue a patch batch.
    pub fn send_patches(&self, patches: Vec<Patch>) -> Result<(), LiveViewError> {
        self.send(&Outbound::ApplyPatch { patches })
    }

    /// Ask the client to execute JavaScript. With `wait_for_result` the call
    /// resolves once the client acknowledges execution (bounded by `timeout`
    /// when given); without it the call is fire-and-forget and a timeout is
    /// an error.
    pub async fn execute_js(
        &self,
        code: &str,
        timeout: Option<Duration>,
        wait_for_result: bool,
    ) -> Result<Option<Value>, LiveViewError> {
        if !wait_for_result && timeout.is_some() {
            return Err(LiveViewError::InvalidJsRequest(
                "a timeout was specified but wait_for_result is false".into(),
            ));
        }
        self.js_round_trip(code, None, timeout, wait_for_result)
            .await
    }

    /// Execute `code` and fetch the value of `variable` afterwards.
    pub async fn get_js_result(
        &self,
        code: &str,
        variable: &str,
        timeout: Option<Duration>,
    ) -> Result<Value, LiveViewError> {
        let result = self
            .js_round_trip(code, Some(variable), timeout, true)
            .await?;
        Ok(result.unwrap_or(Value::Nil))
    }

    async fn js_round_trip(
        &self,
        code: &str,
        variable: Option<&str>,
        timeout: Option<Duration>,
        wait_for_result: bool,
    ) -> Result<Option<Value>, LiveViewError> {
        let uid = js::generate_uid();
        let message = Outbound::ExecuteJs {
            code: code.to_owned(),
            variable: variable.map(str::to_owned),
            timeout_secs: timeout.map(|t| t.as_secs_f64()),
            wait_for_result,
            uid: uid.clone(),
        };

        if !wait_for_result {
            self.send(&message)?;
            return Ok(None);
        }

        let receiver = self.futures.register(&uid);
        if let Err(error) = self.send(&message) {
            self.futures.forget(&uid);
            return Err(error);
        }

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(received) => received,
                Err(_) => {
                    self.futures.forget(&uid);
                    return Err(JsExecutionError::TimedOut(format!(
                        "JavaScript execution timed out for uid '{uid}'"
                    ))
                    .into());
                }
            },
            None => receiver.await,
        };

        match outcome {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(error)) => Err(error.into()),
            // The sender side was dropped with the connection
            Err(_) => Err(JsExecutionError::Failed(
                "javascript execution failed because the websocket has been disconnected".into(),
            )
            .into()),
        }
    }
}

impl std::fmt::Debug for LiveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveHandle")
            .field("futures", &self.futures)
            .finish_non_exhaustive()
    }
}

fn into_js_error(error: LiveViewError) -> JsExecutionError {
    match error {
        LiveViewError::Js(error) => error,
        other => JsExecutionError::Failed(other.to_string()),
    }
}

impl LiveClient for LiveHandle {
    fn execute_js<'a>(
        &'a self,
        code: &'a str,
        timeout: Option<Duration>,
        wait_for_result: bool,
    ) -> BoxFuture<'a, Result<Option<Value>, JsExecutionError>> {
        Box::pin(async move {
            LiveHandle::execute_js(self, code, timeout, wait_for_result)
                .await
                .map_err(into_js_error)
        })
    }

    fn get_js_result<'a>(
        &'a self,
        code: &'a str,
        variable: &'a str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<Value, JsExecutionError>> {
        Box::pin(async move {
            LiveHandle::get_js_result(self, code, variable, timeout)
                .await
                .map_err(into_js_error)
        })
    }
}
