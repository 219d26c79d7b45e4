// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Permission gatekeeper.
//
// The OS shows at most one permission prompt at a time. The gatekeeper owns
// that single slot plus a table of continuations keyed by capability kind.
// When the prompt resolves, every continuation waiting on that permission is
// handed back to the router, which re-dispatches or fails each one.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use portico_core::error::{PorticoError, Result};
use portico_core::types::{CapabilityKind, CapabilityRequest, Permission};

use crate::in_flight::Ticket;

/// What asked for the permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOrigin {
    /// Script code called `request*Permission` directly.
    Explicit,
    /// A capability that needs the permission before it can run.
    Capability {
        request: CapabilityRequest,
        ticket: Ticket,
    },
}

/// A continuation parked behind the permission prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPermissionRequest {
    pub permission: Permission,
    pub origin: PermissionOrigin,
    pub requested_at: DateTime<Utc>,
}

impl PendingPermissionRequest {
    /// Direct `request*Permission` call from script code.
    pub fn explicit(permission: Permission) -> Self {
        Self {
            permission,
            origin: PermissionOrigin::Explicit,
            requested_at: Utc::now(),
        }
    }

    /// Capability `request` holding `ticket`, waiting on `permission`.
    pub fn for_capability(permission: Permission, request: CapabilityRequest, ticket: Ticket) -> Self {
        Self {
            permission,
            origin: PermissionOrigin::Capability { request, ticket },
            requested_at: Utc::now(),
        }
    }

    /// Table key: the originating capability kind.
    pub fn kind(&self) -> CapabilityKind {
        match &self.origin {
            PermissionOrigin::Explicit => CapabilityKind::PermissionGrant,
            PermissionOrigin::Capability { request, .. } => request.kind,
        }
    }
}

/// What the caller has to do after `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
    /// Show the OS prompt; `Ticket` identifies it for the timeout.
    Prompt(Ticket),
    /// Same permission is already being prompted; wait for that answer.
    Joined,
}

/// A resolved prompt and everything that was waiting on it.
#[derive(Debug)]
pub struct PermissionResolution {
    pub permission: Permission,
    pub granted: bool,
    pub continuations: Vec<PendingPermissionRequest>,
}

struct Prompt {
    permission: Permission,
    id: Ticket,
    timer: Option<AbortHandle>,
}

#[derive(Default)]
pub struct PermissionGatekeeper {
    prompt: Option<Prompt>,
    pending: HashMap<CapabilityKind, PendingPermissionRequest>,
    /// Prompts that timed out; the OS may still answer them later.
    expired: HashSet<Permission>,
}

impl PermissionGatekeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a continuation behind the prompt for its permission.
    ///
    /// Rejects with `PromptOutstanding` if a prompt for a different
    /// permission is up.
    pub fn begin(&mut self, request: PendingPermissionRequest) -> Result<PromptAction> {
        let kind = request.kind();
        let permission = request.permission;

        let action = match &self.prompt {
            Some(prompt) if prompt.permission == permission => {
                debug!(%kind, %permission, "joining outstanding permission prompt");
                PromptAction::Joined
            }
            Some(prompt) => {
                warn!(
                    %kind,
                    %permission,
                    outstanding = %prompt.permission,
                    "another permission prompt is outstanding"
                );
                return Err(PorticoError::PromptOutstanding(prompt.permission));
            }
            None => {
                self.expired.remove(&permission);
                let id = Ticket::new();
                self.prompt = Some(Prompt {
                    permission,
                    id,
                    timer: None,
                });
                info!(%kind, %permission, prompt = %id, "permission prompt opened");
                PromptAction::Prompt(id)
            }
        };

        if let Some(previous) = self.pending.insert(kind, request) {
            debug!(%kind, requested_at = %previous.requested_at, "replaced parked continuation");
        }
        Ok(action)
    }

    /// Attach the timeout task to the prompt it belongs to.
    pub fn attach_timer(&mut self, id: Ticket, timer: AbortHandle) {
        match self.prompt.as_mut() {
            Some(prompt) if prompt.id == id => {
                if let Some(previous) = prompt.timer.replace(timer) {
                    previous.abort();
                }
            }
            _ => timer.abort(),
        }
    }

    /// Apply the OS answer. `None` (prompt dismissed) counts as a denial.
    ///
    /// Returns `None` when nothing was waiting on `permission`.
    pub fn resolve(&mut self, permission: Permission, granted: Option<bool>) -> Option<PermissionResolution> {
        let granted = granted.unwrap_or(false);

        match self.prompt.take() {
            Some(prompt) if prompt.permission == permission => {
                if let Some(timer) = prompt.timer {
                    timer.abort();
                }
            }
            other => {
                // A result for some other permission leaves the slot alone.
                self.prompt = other;
            }
        }

        let kinds: Vec<CapabilityKind> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.permission == permission)
            .map(|(kind, _)| *kind)
            .collect();
        if kinds.is_empty() {
            debug!(%permission, granted, "permission result with no parked continuations");
            return None;
        }

        let continuations = kinds
            .into_iter()
            .filter_map(|kind| self.pending.remove(&kind))
            .collect();
        info!(%permission, granted, "permission prompt resolved");
        Some(PermissionResolution {
            permission,
            granted,
            continuations,
        })
    }

    /// Resolve prompt `id` as dismissed, if it is still the outstanding one.
    pub fn expire(&mut self, id: Ticket) -> Option<PermissionResolution> {
        let permission = match &self.prompt {
            Some(prompt) if prompt.id == id => prompt.permission,
            _ => return None,
        };
        warn!(%permission, prompt = %id, "permission prompt timed out; treating as dismissed");
        self.expired.insert(permission);
        self.resolve(permission, None)
    }

    /// Consume the expiry mark for `permission`. True means an answer now
    /// belongs to a prompt that was already reported as dismissed.
    pub fn take_expired(&mut self, permission: Permission) -> bool {
        self.expired.remove(&permission)
    }

    /// Permission currently being prompted, if any.
    pub fn prompting(&self) -> Option<Permission> {
        self.prompt.as_ref().map(|prompt| prompt.permission)
    }

    /// Whether `kind` is waiting behind a prompt.
    pub fn is_parked(&self, kind: CapabilityKind) -> bool {
        self.pending.contains_key(&kind)
    }
}
