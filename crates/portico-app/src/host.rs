// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line-oriented stdio host.
//
// Stands in for the native shell: each stdin line is one JSON command (a
// script call, a lifecycle transition or a native callback). Whatever the
// bound surface is asked to do comes out on stdout, one JSON line each:
//
//   {"t":"eval","script":"if (typeof window.onFCMTokenReceived ..."}
//   {"t":"toast","text":"No gallery app found."}

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use portico_bridge::traits::PurchaseUpdate;
use portico_core::error::{PorticoError, Result};
use portico_core::human_errors::humanize_error;
use portico_core::types::{NotificationEvent, NotificationPayload, Permission, PushMessage, ScriptCall};
use portico_runtime::{BridgeRouter, HostSurface, LifecycleCoordinator, ScriptMessage};

/// One stdin line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum HostCommand {
    /// Script code called into the bridge.
    Call { call: ScriptCall },
    /// The surface was (re)created.
    Bind,
    /// The surface was destroyed.
    Unbind,
    /// Answer to an OS permission prompt; absent `granted` means dismissed.
    Permission {
        permission: Permission,
        #[serde(default)]
        granted: Option<bool>,
    },
    Purchases { update: PurchaseUpdate },
    /// The user opened a notification.
    Notification { data: NotificationPayload },
    Push { message: PushMessage },
    Token { token: String },
}

/// One stdout line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum HostEvent {
    Eval { script: String },
    Toast { text: String },
}

pub type SharedOutput = Arc<Mutex<dyn Write + Send>>;

/// Surface that prints what it is asked to run.
pub struct StdioSurface {
    out: SharedOutput,
}

impl StdioSurface {
    pub fn new(out: SharedOutput) -> Self {
        Self { out }
    }

    fn emit(&self, event: &HostEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

impl HostSurface for StdioSurface {
    fn post_message(&self, message: &ScriptMessage) -> Result<()> {
        self.emit(&HostEvent::Eval {
            script: message.to_script(),
        })
    }

    fn show_toast(&self, text: &str) {
        let event = HostEvent::Toast { text: text.into() };
        if let Err(e) = self.emit(&event) {
            warn!(error = %e, "could not write toast");
        }
    }
}

pub struct Host {
    router: BridgeRouter,
    lifecycle: LifecycleCoordinator,
    out: SharedOutput,
    /// The host owns the surface; the coordinator only holds it weakly.
    surface: Option<Arc<dyn HostSurface>>,
    created: bool,
}

impl Host {
    pub fn new(router: BridgeRouter, lifecycle: LifecycleCoordinator, out: SharedOutput) -> Self {
        Self {
            router,
            lifecycle,
            out,
            surface: None,
            created: false,
        }
    }

    pub fn handle(&mut self, command: HostCommand) {
        debug!(?command, "host command");
        match command {
            HostCommand::Call { call } => {
                if let Err(e) = self.router.invoke(call) {
                    self.reject(&e);
                }
            }
            HostCommand::Bind => {
                let surface: Arc<dyn HostSurface> = Arc::new(StdioSurface::new(Arc::clone(&self.out)));
                self.lifecycle.bind(&surface);
                self.surface = Some(surface);
                if !self.created {
                    self.created = true;
                    self.router.on_host_created();
                }
            }
            HostCommand::Unbind => {
                self.lifecycle.unbind();
                self.surface = None;
            }
            HostCommand::Permission {
                permission,
                granted,
            } => self.router.on_permission_result(permission, granted),
            HostCommand::Purchases { update } => self.router.on_purchases_updated(update),
            HostCommand::Notification { data } => self
                .router
                .on_notification_opened(NotificationEvent::new(data)),
            HostCommand::Push { message } => self.router.on_push_message(message),
            HostCommand::Token { token } => self.router.on_new_push_token(token),
        }
    }

    /// Immediate rejections never reach script code; the user gets a toast.
    fn reject(&self, err: &PorticoError) {
        let human = humanize_error(err);
        info!(error = %err, "call rejected");
        self.lifecycle.proxy().toast(human.message);
    }

    /// Process commands until EOF.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> io::Result<()> {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<HostCommand>(line) {
                Ok(command) => self.handle(command),
                Err(e) => warn!(error = %e, "malformed command skipped"),
            }
        }
        self.lifecycle.flush().await;
        info!(bound = self.surface.is_some(), "input closed");
        Ok(())
    }
}
