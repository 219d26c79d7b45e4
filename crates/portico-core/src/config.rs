// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shell configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::CapabilityKind;

/// Persistent shell settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// How long a dispatched capability may stay outstanding.
    pub capability_timeout_secs: u64,
    /// Purchases wait on the store UI, so they get a longer window.
    pub purchase_timeout_secs: u64,
    /// How long an OS permission prompt may stay unanswered.
    pub permission_timeout_secs: u64,
    /// Web client identifier for federated sign-in.
    pub sign_in_client_id: Option<String>,
    /// File name of the temporary recording inside the cache directory.
    pub audio_artifact_name: String,
    /// Outcomes kept for replay while no surface is bound.
    pub max_queued_outcomes: usize,
    /// Prompt for the notification permission when the host is created.
    pub request_notifications_on_launch: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            capability_timeout_secs: 120,
            purchase_timeout_secs: 600,
            permission_timeout_secs: 60,
            sign_in_client_id: None,
            audio_artifact_name: "audio_record.3gp".into(),
            max_queued_outcomes: 16,
            request_notifications_on_launch: true,
        }
    }
}

impl ShellConfig {
    /// Timeout applied to an in-flight request of the given kind.
    pub fn capability_timeout(&self, kind: CapabilityKind) -> Duration {
        match kind {
            CapabilityKind::Purchase => Duration::from_secs(self.purchase_timeout_secs),
            _ => Duration::from_secs(self.capability_timeout_secs),
        }
    }

    pub fn permission_timeout(&self) -> Duration {
        Duration::from_secs(self.permission_timeout_secs)
    }
}
