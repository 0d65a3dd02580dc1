//! The capability seam between the protocol server and the editor.
//!
//! The server never touches editor internals directly; every side effect goes
//! through [`CapabilityTarget`], a narrow async interface implemented by the
//! hosting editor integration. Whatever "active editing surface" exists at
//! call time is the target's concern — when there is none, operations fail
//! with [`TargetError::NoActiveTarget`] and the error is surfaced to the
//! remote client as a handler-level failure, never a crash.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

/// Cursor movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Viewport scroll directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(ScrollDirection::Up),
            "down" => Some(ScrollDirection::Down),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
        }
    }
}

/// Failures raised by a capability target.
#[derive(Debug, Error)]
pub enum TargetError {
    /// No editing surface is currently focused.
    #[error("no active editing surface")]
    NoActiveTarget,

    /// The target accepted the operation but could not complete it.
    #[error("target operation failed: {0}")]
    Failed(String),
}

/// The remote-controllable editing surface.
///
/// Implementations live in the editor integration layer; the protocol server
/// only ever holds an `Arc<dyn CapabilityTarget>`.
#[async_trait]
pub trait CapabilityTarget: Send + Sync {
    async fn move_cursor(&self, direction: Direction) -> Result<(), TargetError>;
    async fn insert_text(&self, text: &str) -> Result<(), TargetError>;
    async fn execute_named_command(&self, command_id: &str) -> Result<(), TargetError>;
    async fn scroll(&self, direction: ScrollDirection) -> Result<(), TargetError>;
    async fn open_file(&self, path: &str) -> Result<(), TargetError>;
    async fn run_shell_command(&self, command: &str) -> Result<(), TargetError>;
}

/// Target that logs every action instead of performing it.
///
/// Used by the standalone `edlink serve` binary, which has no editor attached;
/// real deployments supply an adapter over the editor's own APIs.
pub struct TracingTarget;

#[async_trait]
impl CapabilityTarget for TracingTarget {
    async fn move_cursor(&self, direction: Direction) -> Result<(), TargetError> {
        tracing::info!(direction = direction.as_str(), "move cursor");
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<(), TargetError> {
        tracing::info!(chars = text.len(), "insert text");
        Ok(())
    }

    async fn execute_named_command(&self, command_id: &str) -> Result<(), TargetError> {
        tracing::info!(command_id, "execute editor command");
        Ok(())
    }

    async fn scroll(&self, direction: ScrollDirection) -> Result<(), TargetError> {
        tracing::info!(direction = direction.as_str(), "scroll window");
        Ok(())
    }

    async fn open_file(&self, path: &str) -> Result<(), TargetError> {
        tracing::info!(path, "open file");
        Ok(())
    }

    async fn run_shell_command(&self, command: &str) -> Result<(), TargetError> {
        tracing::info!(command, "run shell command");
        Ok(())
    }
}

/// One recorded capability call.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetCall {
    MoveCursor(Direction),
    InsertText(String),
    ExecuteNamedCommand(String),
    Scroll(ScrollDirection),
    OpenFile(String),
    RunShellCommand(String),
}

/// Test double that records calls instead of acting on an editor.
///
/// `set_no_active_target(true)` makes every operation fail with
/// [`TargetError::NoActiveTarget`] without recording, mimicking a session
/// where no editing surface is focused.
#[derive(Default)]
pub struct RecordingTarget {
    calls: Mutex<Vec<TargetCall>>,
    no_active_target: std::sync::atomic::AtomicBool,
}

impl RecordingTarget {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_no_active_target(&self, value: bool) {
        self.no_active_target
            .store(value, std::sync::atomic::Ordering::Release);
    }

    pub fn calls(&self) -> Vec<TargetCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, call: TargetCall) -> Result<(), TargetError> {
        if self
            .no_active_target
            .load(std::sync::atomic::Ordering::Acquire)
        {
            return Err(TargetError::NoActiveTarget);
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl CapabilityTarget for RecordingTarget {
    async fn move_cursor(&self, direction: Direction) -> Result<(), TargetError> {
        self.record(TargetCall::MoveCursor(direction))
    }

    async fn insert_text(&self, text: &str) -> Result<(), TargetError> {
        self.record(TargetCall::InsertText(text.to_string()))
    }

    async fn execute_named_command(&self, command_id: &str) -> Result<(), TargetError> {
        self.record(TargetCall::ExecuteNamedCommand(command_id.to_string()))
    }

    async fn scroll(&self, direction: ScrollDirection) -> Result<(), TargetError> {
        self.record(TargetCall::Scroll(direction))
    }

    async fn open_file(&self, path: &str) -> Result<(), TargetError> {
        self.record(TargetCall::OpenFile(path.to_string()))
    }

    async fn run_shell_command(&self, command: &str) -> Result<(), TargetError> {
        self.record(TargetCall::RunShellCommand(command.to_string()))
    }
}
