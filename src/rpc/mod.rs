//! Minimal RPC framework: envelopes, errors, handler registry, and the HTTP
//! transport. Supports exactly the two-method surface the control service
//! needs (tool discovery + tool invocation); not a general-purpose framework.

pub mod auth;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod server;

pub use envelope::{ContentSegment, RequestBody, RequestEnvelope, ResponseEnvelope};
pub use error::RpcError;
pub use registry::{HandlerRegistry, Next};
pub use server::{ListeningServer, ProtocolError, ProtocolServer, RouterOptions, ServerInfo};
