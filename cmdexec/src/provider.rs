//! Provider contract and a reusable tool-backed provider.
//!
//! A provider installs domain tools into the context before the first command
//! runs and reports a [`Signal`] for each command that invoked one.

use crate::signal::{Signal, SignalSlot};
use cmdlang::{Bindings, CallArgs, CallKind, Context, Function, RuntimeError, RuntimeResult, Value};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Domain executor the command loop talks to.
pub trait Provider {
    /// Called once before the first command. Installs tools and/or observes
    /// the context.
    fn set_context(&mut self, context: &mut Context);

    /// Outcome recorded for the most recently completed command.
    fn get_signal(&self) -> Option<Signal>;

    /// Resets the mailbox so each signal is delivered exactly once.
    fn clear_signal(&mut self);

    /// Called after each command's bindings were merged, so tools can write
    /// their side effects back into the context. Does nothing by default.
    fn sync_context(&mut self, _context: &mut Context) {}
}

/// What a tool hands back: the call's value, an optional signal for the
/// mailbox, and context updates applied once the command finishes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub value: Value,
    pub signal: Option<Signal>,
    pub updates: Bindings,
}

impl ToolOutput {
    pub fn new(value: Value) -> Self {
        ToolOutput {
            value,
            ..Default::default()
        }
    }

    /// A `None`-valued output that only reports a signal.
    pub fn signal(signal: Signal) -> Self {
        Self::new(Value::None).with_signal(signal)
    }

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_update(mut self, name: impl Into<String>, value: Value) -> Self {
        self.updates.insert(name.into(), value);
        self
    }
}

pub type SyncTool = Arc<dyn Fn(CallArgs) -> RuntimeResult<ToolOutput> + Send + Sync>;
pub type AsyncTool =
    Arc<dyn Fn(CallArgs) -> BoxFuture<'static, RuntimeResult<ToolOutput>> + Send + Sync>;

#[derive(Clone)]
pub enum ToolHandler {
    Sync(SyncTool),
    Async(AsyncTool),
}

impl ToolHandler {
    pub fn kind(&self) -> CallKind {
        match self {
            ToolHandler::Sync(_) => CallKind::Sync,
            ToolHandler::Async(_) => CallKind::Async,
        }
    }
}

impl std::fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ToolHandler::{:?}", self.kind())
    }
}

/// Provider built from named tool handlers.
///
/// Installed tools are context functions that forward to their handler,
/// record the handler's signal into the shared mailbox (a later signal from
/// the same command replaces an earlier one) and queue its context updates.
#[derive(Debug, Clone)]
pub struct ToolProvider {
    name: String,
    tools: IndexMap<String, ToolHandler>,
    mailbox: SignalSlot,
    pending: Arc<Mutex<Bindings>>,
}

impl ToolProvider {
    pub fn new(name: impl Into<String>) -> Self {
        ToolProvider {
            name: name.into(),
            tools: IndexMap::new(),
            mailbox: SignalSlot::new(),
            pending: Arc::new(Mutex::new(Bindings::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_tool<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CallArgs) -> RuntimeResult<ToolOutput> + Send + Sync + 'static,
    {
        self.register(name, ToolHandler::Sync(Arc::new(handler)));
        self
    }

    pub fn with_async_tool<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RuntimeResult<ToolOutput>> + Send + 'static,
    {
        self.register(
            name,
            ToolHandler::Async(Arc::new(move |args| Box::pin(handler(args)))),
        );
        self
    }

    /// Adds or replaces a tool. Takes effect at the next `set_context`.
    pub fn register(&mut self, name: impl Into<String>, handler: ToolHandler) {
        self.tools.insert(name.into(), handler);
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    fn install(&self, name: &str, handler: &ToolHandler) -> Function {
        let delivery = Delivery {
            tool: name.to_string(),
            mailbox: self.mailbox.clone(),
            pending: self.pending.clone(),
        };
        match handler {
            ToolHandler::Sync(handler) => {
                let handler = handler.clone();
                Function::native(name, move |args| {
                    debug!(tool = %delivery.tool, "invoking tool");
                    let output = handler(args)?;
                    Ok(delivery.deliver(output))
                })
            }
            ToolHandler::Async(handler) => {
                let handler = handler.clone();
                Function::async_native(name, move |args| {
                    let handler = handler.clone();
                    let delivery = delivery.clone();
                    async move {
                        debug!(tool = %delivery.tool, "invoking async tool");
                        let output = handler(args).await?;
                        Ok::<_, RuntimeError>(delivery.deliver(output))
                    }
                })
            }
        }
    }
}

#[derive(Clone)]
struct Delivery {
    tool: String,
    mailbox: SignalSlot,
    pending: Arc<Mutex<Bindings>>,
}

impl Delivery {
    fn deliver(&self, output: ToolOutput) -> Value {
        if let Some(signal) = output.signal {
            if let Some(replaced) = self.mailbox.record(signal) {
                debug!(
                    tool = %self.tool,
                    replaced_status = %replaced.status,
                    "signal replaced before delivery"
                );
            }
        }
        if !output.updates.is_empty() {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(output.updates);
        }
        output.value
    }
}

impl Provider for ToolProvider {
    fn set_context(&mut self, context: &mut Context) {
        self.mailbox.clear();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        for (name, handler) in &self.tools {
            context.define_function(self.install(name, handler));
        }
        info!(provider = %self.name, tools = self.tools.len(), "installed tools");
    }

    fn get_signal(&self) -> Option<Signal> {
        self.mailbox.peek()
    }

    fn clear_signal(&mut self) {
        self.mailbox.clear();
    }

    fn sync_context(&mut self, context: &mut Context) {
        let updates = std::mem::take(
            &mut *self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if !updates.is_empty() {
            let names = context.merge(updates);
            debug!(provider = %self.name, ?names, "applied tool updates");
        }
    }
}
