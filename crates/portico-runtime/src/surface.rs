// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host surface seam and the thread-safe proxy the router delivers through.
//
// The proxy never touches the surface itself. It enqueues commands for the
// lifecycle coordinator's delivery task, which is the only code that ever
// dereferences the surface. Deliveries from any thread are therefore
// serialized onto one context, in the order they were submitted.

use std::sync::Weak;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use portico_core::error::Result;

use crate::script::ScriptMessage;

/// The embedded script execution context (a web view, in practice).
pub trait HostSurface: Send + Sync {
    /// Run the callback described by `message`. Implementations usually
    /// evaluate `message.to_script()`.
    fn post_message(&self, message: &ScriptMessage) -> Result<()>;

    /// Show a short, transient message to the user.
    fn show_toast(&self, text: &str);
}

pub(crate) enum Command {
    Deliver(ScriptMessage),
    Toast(String),
    Bind(Weak<dyn HostSurface>),
    Unbind,
    Flush(oneshot::Sender<()>),
}

/// Cloneable, `Send + Sync` handle for handing messages to the surface.
#[derive(Clone)]
pub struct SurfaceProxy {
    tx: mpsc::UnboundedSender<Command>,
}

impl SurfaceProxy {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Queue a script callback. Never blocks.
    pub fn deliver(&self, message: ScriptMessage) {
        let callback = message.callback();
        if self.tx.send(Command::Deliver(message)).is_err() {
            warn!(callback, "delivery task stopped; script message dropped");
        }
    }

    /// Queue a toast. Dropped if no surface is bound when it is processed.
    pub fn toast(&self, text: impl Into<String>) {
        if self.tx.send(Command::Toast(text.into())).is_err() {
            warn!("delivery task stopped; toast dropped");
        }
    }

    pub(crate) fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("delivery task stopped; lifecycle command dropped");
        }
    }
}
