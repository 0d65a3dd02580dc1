//! edlink — remote control protocol server for editor sessions.
//!
//! A paired device (typically a phone) drives a running editor over a small
//! HTTP RPC surface: two methods (`list_tools`, `call_tool`), one tool
//! (`cursorControl`) with six sub-commands, schema-validated arguments, and
//! a per-session credential bootstrapped through a scannable QR code.
//!
//! The editor itself is never touched directly: all side effects go through
//! the [`target::CapabilityTarget`] trait, implemented by the hosting editor
//! integration. The `edlink` binary wires a log-only target for standalone
//! runs.

pub mod config;
pub mod control;
pub mod credential;
pub mod pairing;
pub mod rpc;
pub mod schema;
pub mod target;
pub mod tools;
