// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable messages for failures that are shown locally (toasts)
// instead of being handed to script code.

use crate::error::PorticoError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth trying again as-is.
    Transient,
    /// User must do something (install an app, grant a permission).
    ActionRequired,
    /// Cannot be fixed on this device or in this build.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary, suitable for a toast.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `PorticoError` into a `HumanError`.
pub fn humanize_error(err: &PorticoError) -> HumanError {
    match err {
        PorticoError::PermissionDenied(permission) => HumanError {
            message: format!("Access to the {permission} was not allowed."),
            suggestion: "You can allow it from the app's settings page.".into(),
            severity: Severity::ActionRequired,
        },

        PorticoError::UserCancelled => HumanError {
            message: "Cancelled.".into(),
            suggestion: String::new(),
            severity: Severity::Transient,
        },

        PorticoError::PreconditionUnavailable(detail) => humanize_unavailable(detail),

        PorticoError::Busy(_) => HumanError {
            message: "Already working on it.".into(),
            suggestion: "Wait for the current request to finish.".into(),
            severity: Severity::Transient,
        },

        PorticoError::PromptOutstanding(_) => HumanError {
            message: "Please answer the permission prompt first.".into(),
            suggestion: "Then try again.".into(),
            severity: Severity::Transient,
        },

        PorticoError::NativeOperation(_) | PorticoError::Io(_) => HumanError {
            message: "Something went wrong on the device.".into(),
            suggestion: "Please try again.".into(),
            severity: Severity::Transient,
        },

        PorticoError::Configuration(_) => HumanError {
            message: "This feature is not set up correctly.".into(),
            suggestion: "Please contact support.".into(),
            severity: Severity::Permanent,
        },

        PorticoError::RecordingTooShort => HumanError {
            message: "Recording too short.".into(),
            suggestion: "Hold the button a little longer while speaking.".into(),
            severity: Severity::ActionRequired,
        },

        PorticoError::TimedOut(_) => HumanError {
            message: "That took too long.".into(),
            suggestion: "Please try again.".into(),
            severity: Severity::Transient,
        },

        PorticoError::InvalidDataUrl(_)
        | PorticoError::Base64(_)
        | PorticoError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            severity: Severity::Transient,
        },

        PorticoError::PlatformUnavailable => HumanError {
            message: "This feature isn't available on your device.".into(),
            suggestion: "Some features require a phone or tablet.".into(),
            severity: Severity::Permanent,
        },
    }
}

/// Pick a message for a missing-handler style failure.
fn humanize_unavailable(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    // Busy rejections reach here as an outcome's reason text.
    if lower.contains("already in flight") || lower.contains("prompt already showing") {
        HumanError {
            message: "Already working on it.".into(),
            suggestion: "Wait for the current request to finish.".into(),
            severity: Severity::Transient,
        }
    } else if lower.contains("gallery") {
        HumanError {
            message: "No gallery app found.".into(),
            suggestion: "Install a photo gallery app and try again.".into(),
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("camera") {
        HumanError {
            message: "No camera app found.".into(),
            suggestion: "Install a camera app and try again.".into(),
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("file") {
        HumanError {
            message: "No app found to choose files.".into(),
            suggestion: "Install a file manager and try again.".into(),
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("billing") || lower.contains("store") {
        HumanError {
            message: "Could not connect to the store.".into(),
            suggestion: "Check your connection and try again.".into(),
            severity: Severity::Transient,
        }
    } else {
        HumanError {
            message: "This isn't available right now.".into(),
            suggestion: format!("Please try again later. ({detail})"),
            severity: Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CapabilityKind, Permission};

    #[test]
    fn missing_gallery_app_is_action_required() {
        let err = PorticoError::PreconditionUnavailable("no gallery app installed".into());
        let human = humanize_error(&err);
        assert_eq!(human.message, "No gallery app found.");
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn busy_kind_is_transient() {
        for kind in [
            CapabilityKind::Camera,
            CapabilityKind::Gallery,
            CapabilityKind::FilePicker,
            CapabilityKind::SignIn,
        ] {
            let human = humanize_error(&PorticoError::Busy(kind));
            assert_eq!(human.message, "Already working on it.", "{kind}");
            assert_eq!(human.severity, Severity::Transient, "{kind}");
        }
    }

    #[test]
    fn busy_reason_text_is_not_a_missing_app() {
        let err = PorticoError::PreconditionUnavailable(
            PorticoError::Busy(CapabilityKind::Gallery).to_string(),
        );
        let human = humanize_error(&err);
        assert_eq!(human.message, "Already working on it.");
        assert_eq!(human.severity, Severity::Transient);
    }

    #[test]
    fn outstanding_prompt_does_not_blame_the_camera() {
        let human = humanize_error(&PorticoError::PromptOutstanding(Permission::Camera));
        assert_eq!(human.message, "Please answer the permission prompt first.");
        assert_eq!(human.severity, Severity::Transient);
    }

    #[test]
    fn denied_permission_names_it() {
        let human = humanize_error(&PorticoError::PermissionDenied(Permission::Microphone));
        assert!(human.message.contains("microphone"));
    }

    #[test]
    fn platform_unavailable_is_permanent() {
        let human = humanize_error(&PorticoError::PlatformUnavailable);
        assert_eq!(human.severity, Severity::Permanent);
    }
}
