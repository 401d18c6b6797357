//! Wire types shared by tool clients and tool providers.
//!
//! Both sides exchange newline-delimited JSON-RPC 2.0 style frames over
//! the provider process's stdio. This crate only describes the shape of
//! those frames, the framing itself is up to the transport.

#![deny(missing_docs)]

mod frame;
mod tool;

pub use frame::*;
pub use tool::*;

/// The protocol version announced during the handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Method names understood by tool providers.
pub mod method {
    /// The handshake request.
    pub const INITIALIZE: &str = "initialize";
    /// The notification sent once the handshake is acknowledged.
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Lists the tools a provider advertises.
    pub const LIST_TOOLS: &str = "tools/list";
    /// Calls a tool.
    pub const CALL_TOOL: &str = "tools/call";
}
