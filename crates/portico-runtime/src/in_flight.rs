// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outstanding-request table, keyed by capability kind.
//
// Each acquisition hands out a fresh ticket. Completions, timeouts and
// external callbacks must present the ticket they were issued; anything
// else is stale and gets discarded by the caller.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;
use tracing::debug;
use uuid::Uuid;

use portico_core::error::{PorticoError, Result};
use portico_core::types::CapabilityKind;

/// Identifies one acquisition of a capability slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(Uuid);

impl Ticket {
    /// A fresh, random ticket.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Ticket {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Slot {
    ticket: Ticket,
    started_at: DateTime<Utc>,
    timer: Option<AbortHandle>,
}

/// At most one outstanding request per kind.
#[derive(Default)]
pub struct InFlightTable {
    slots: HashMap<CapabilityKind, Slot>,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `kind`. Fails while an earlier request is pending.
    pub fn acquire(&mut self, kind: CapabilityKind) -> Result<Ticket> {
        if let Some(slot) = self.slots.get(&kind) {
            debug!(%kind, ticket = %slot.ticket, since = %slot.started_at, "slot busy");
            return Err(PorticoError::Busy(kind));
        }
        let ticket = Ticket::new();
        self.slots.insert(
            kind,
            Slot {
                ticket,
                started_at: Utc::now(),
                timer: None,
            },
        );
        Ok(ticket)
    }

    /// Attach the timeout task for an acquisition. If the slot has already
    /// moved on, the timer is cancelled on the spot.
    pub fn attach_timer(&mut self, kind: CapabilityKind, ticket: Ticket, timer: AbortHandle) {
        match self.slots.get_mut(&kind) {
            Some(slot) if slot.ticket == ticket => {
                if let Some(previous) = slot.timer.replace(timer) {
                    previous.abort();
                }
            }
            _ => timer.abort(),
        }
    }

    /// Free the slot if `ticket` still owns it. Returns false for stale
    /// tickets, whose result must be dropped.
    pub fn release(&mut self, kind: CapabilityKind, ticket: Ticket) -> bool {
        match self.slots.get(&kind) {
            Some(slot) if slot.ticket == ticket => {
                self.release_current(kind);
                true
            }
            _ => false,
        }
    }

    /// Free the slot regardless of owner. Used for results that arrive
    /// out of band and carry no ticket (purchase updates).
    pub fn release_current(&mut self, kind: CapabilityKind) -> Option<Ticket> {
        let slot = self.slots.remove(&kind)?;
        if let Some(timer) = slot.timer {
            timer.abort();
        }
        Some(slot.ticket)
    }

    /// Ticket holding the slot for `kind`, if any.
    pub fn current(&self, kind: CapabilityKind) -> Option<Ticket> {
        self.slots.get(&kind).map(|slot| slot.ticket)
    }

    pub fn is_in_flight(&self, kind: CapabilityKind) -> bool {
        self.slots.contains_key(&kind)
    }
}
