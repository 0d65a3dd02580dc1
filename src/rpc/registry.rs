//! Method registry and middleware chain.
//!
//! Handlers are keyed by logical method name; registering a name twice
//! replaces the earlier handler. Middlewares run in registration order, each
//! receiving the envelope and a [`Next`] continuation — returning an error or
//! simply not invoking `next` short-circuits dispatch, which is how
//! authentication is wired in.
//!
//! The registry is populated at startup and read-only afterwards, so it is
//! shared across concurrent requests behind an `Arc` without further locking.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use super::envelope::RequestEnvelope;
use super::error::RpcError;

/// Boxed future returned by handlers and middleware.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, RpcError>> + Send>>;

type Handler = Arc<dyn Fn(RequestEnvelope) -> HandlerFuture + Send + Sync>;
type Middleware = Arc<dyn Fn(RequestEnvelope, Next) -> HandlerFuture + Send + Sync>;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
    middlewares: Vec<Middleware>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method`, replacing any existing one.
    pub fn register<F, Fut>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Fn(RequestEnvelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        self.handlers.insert(
            method.into(),
            Arc::new(move |envelope| Box::pin(handler(envelope)) as HandlerFuture),
        );
    }

    /// Append a middleware to the chain. Middlewares run in registration
    /// order on every dispatch.
    pub fn use_middleware<F, Fut>(&mut self, middleware: F)
    where
        F: Fn(RequestEnvelope, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        self.middlewares.push(Arc::new(move |envelope, next| {
            Box::pin(middleware(envelope, next)) as HandlerFuture
        }));
    }

    /// Run the middleware chain, then the handler registered for
    /// `envelope.method`. An unregistered method yields
    /// [`RpcError::MethodNotFound`] without invoking any handler.
    pub async fn dispatch(self: Arc<Self>, envelope: RequestEnvelope) -> Result<Value, RpcError> {
        Next {
            registry: self,
            index: 0,
        }
        .run(envelope)
        .await
    }
}

/// Continuation handed to each middleware: invokes the rest of the chain and
/// finally the handler. Dropping it without calling [`Next::run`]
/// short-circuits the request.
pub struct Next {
    registry: Arc<HandlerRegistry>,
    index: usize,
}

impl Next {
    pub fn run(self, envelope: RequestEnvelope) -> HandlerFuture {
        Box::pin(async move {
            if let Some(middleware) = self.registry.middlewares.get(self.index) {
                let middleware = Arc::clone(middleware);
                let next = Next {
                    registry: Arc::clone(&self.registry),
                    index: self.index + 1,
                };
                middleware(envelope, next).await
            } else {
                match self.registry.handlers.get(&envelope.method) {
                    Some(handler) => Arc::clone(handler)(envelope).await,
                    None => Err(RpcError::MethodNotFound(envelope.method)),
                }
            }
        })
    }
}
