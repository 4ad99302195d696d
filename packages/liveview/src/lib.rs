//! WebSocket transport for the Lively component system.
//!
//! Each connection runs one [`LivelyServer::serve`] call over the upgraded
//! byte stream. Inbound MessagePack messages dispatch to component event
//! handlers, complete pending JS-execution futures, or drive navigation;
//! outbound messages carry DOM patches, JS-execution requests and navigation
//! results.
//!
//! HTTP itself — routing, the upgrade handshake, static files — stays with
//! the host application, which plugs in through [`HostApp`].

pub mod config;
pub mod error;
pub mod host;
pub mod protocol;
pub mod socket;

mod events;
mod js;
mod navigation;

pub use config::LivelyConfig;
pub use error::LiveViewError;
pub use host::{HostApp, HostRequest, HostResponse, NoRoutes};
pub use js::generate_uid;
pub use protocol::{EventOpCode, Inbound, Outbound};
pub use socket::{DeflateConfig, LiveHandle, LivelyServer, SocketOptions};

pub mod prelude {
    pub use crate::config::LivelyConfig;
    pub use crate::error::LiveViewError;
    pub use crate::host::{HostApp, HostRequest, HostResponse};
    pub use crate::protocol::{EventOpCode, Inbound, Outbound};
    pub use crate::socket::{DeflateConfig, LiveHandle, LivelyServer, SocketOptions};
    pub use lively_core::prelude::*;
}
