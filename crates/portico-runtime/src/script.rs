// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native-to-script messages.
//
// Every callback the native side can invoke is a variant of `ScriptMessage`.
// Arguments are rendered as JSON literals, so payloads containing quotes,
// backslashes or line terminators can never break out of the invocation.

use serde::Serialize;
use tracing::warn;

use portico_core::types::{
    CapabilityKind, CapabilityOutcome, NotificationPayload, Payload, Permission,
};

use crate::codec::{encode_base64, encode_data_url};

/// How the lifecycle coordinator treats a message while no surface is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryClass {
    /// Queued in order and replayed on the next bind.
    Outcome,
    /// Only the most recent one is kept for replay.
    NotificationOpen,
}

/// A typed invocation of a script-global callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptMessage {
    PermissionResult {
        permission: Permission,
        granted: bool,
    },
    AudioRecordingComplete {
        base64_audio: String,
    },
    ImageCaptureComplete {
        data_url: String,
    },
    GalleryImageSelected {
        data_url: String,
    },
    FileSelected {
        data_url: String,
        file_name: String,
        mime_type: String,
    },
    PurchaseFinished {
        purchase_token: Option<String>,
        product_id: Option<String>,
    },
    PushTokenReceived {
        token: String,
    },
    NotificationClicked {
        payload: NotificationPayload,
    },
    SignInSuccess {
        id_token: String,
    },
    SignInError {
        message: String,
    },
    /// Failure of a kind that has no dedicated error callback.
    CapabilityFailed {
        kind: CapabilityKind,
        status: &'static str,
        message: Option<String>,
    },
}

#[derive(Serialize)]
struct NotificationArg<'a> {
    data: &'a NotificationPayload,
}

impl ScriptMessage {
    /// Name of the script-global function this message invokes.
    pub fn callback(&self) -> &'static str {
        match self {
            Self::PermissionResult { .. } => "onPermissionResult",
            Self::AudioRecordingComplete { .. } => "onAudioRecordingComplete",
            Self::ImageCaptureComplete { .. } => "onImageCaptureComplete",
            Self::GalleryImageSelected { .. } => "onGalleryImageSelected",
            Self::FileSelected { .. } => "onFileSelected",
            Self::PurchaseFinished { .. } => "onGooglePlayPurchaseFinished",
            Self::PushTokenReceived { .. } => "onFCMTokenReceived",
            Self::NotificationClicked { .. } => "onNotificationClicked",
            Self::SignInSuccess { .. } => "onGoogleSignInSuccess",
            Self::SignInError { .. } => "onGoogleSignInError",
            Self::CapabilityFailed { .. } => "onNativeCapabilityFailed",
        }
    }

    pub fn class(&self) -> DeliveryClass {
        match self {
            Self::NotificationClicked { .. } => DeliveryClass::NotificationOpen,
            _ => DeliveryClass::Outcome,
        }
    }

    /// Arguments as JSON literals, in call order.
    pub fn arguments(&self) -> Vec<String> {
        match self {
            Self::PermissionResult {
                permission,
                granted,
            } => vec![js_literal(permission.script_name()), js_literal(granted)],
            Self::AudioRecordingComplete { base64_audio } => vec![js_literal(base64_audio)],
            Self::ImageCaptureComplete { data_url } | Self::GalleryImageSelected { data_url } => {
                vec![js_literal(data_url)]
            }
            Self::FileSelected {
                data_url,
                file_name,
                mime_type,
            } => vec![
                js_literal(data_url),
                js_literal(file_name),
                js_literal(mime_type),
            ],
            Self::PurchaseFinished {
                purchase_token,
                product_id,
            } => vec![js_literal(purchase_token), js_literal(product_id)],
            Self::PushTokenReceived { token } => vec![js_literal(token)],
            Self::NotificationClicked { payload } => {
                vec![js_literal(&NotificationArg { data: payload })]
            }
            Self::SignInSuccess { id_token } => vec![js_literal(id_token)],
            Self::SignInError { message } => vec![js_literal(message)],
            Self::CapabilityFailed {
                kind,
                status,
                message,
            } => vec![js_literal(kind.as_str()), js_literal(status), js_literal(message)],
        }
    }

    /// Comma-separated argument list, as placed between the call parentheses.
    pub fn argument_list(&self) -> String {
        self.arguments().join(", ")
    }

    /// Render as a script snippet for the embedded surface. Calls the
    /// callback only if the page registered it.
    pub fn to_script(&self) -> String {
        let callback = self.callback();
        format!(
            "if (typeof window.{callback} === 'function') {{ window.{callback}({}); }}",
            self.argument_list()
        )
    }

    /// Message that resolves a capability outcome on the script side.
    ///
    /// Returns `None` for outcomes that are only surfaced locally
    /// (`Unavailable`) and for permission grants, which are reported through
    /// `onPermissionResult` by the gatekeeper path.
    pub fn for_outcome(kind: CapabilityKind, outcome: &CapabilityOutcome) -> Option<Self> {
        use CapabilityKind as K;

        if matches!(outcome, CapabilityOutcome::Unavailable(_)) {
            return None;
        }

        let message = match (kind, outcome) {
            (K::PermissionGrant, _) => return None,

            (K::Camera, CapabilityOutcome::Success(Payload::Image { bytes, mime })) => {
                Self::ImageCaptureComplete {
                    data_url: encode_data_url(mime, bytes),
                }
            }
            (K::Gallery, CapabilityOutcome::Success(Payload::Image { bytes, mime })) => {
                Self::GalleryImageSelected {
                    data_url: encode_data_url(mime, bytes),
                }
            }
            (
                K::FilePicker,
                CapabilityOutcome::Success(Payload::File {
                    bytes,
                    file_name,
                    mime,
                }),
            ) => Self::FileSelected {
                data_url: encode_data_url(mime, bytes),
                file_name: file_name.clone(),
                mime_type: mime.clone(),
            },
            (K::AudioRecordStop, CapabilityOutcome::Success(Payload::Audio(bytes))) => {
                Self::AudioRecordingComplete {
                    base64_audio: encode_base64(bytes),
                }
            }
            (K::Purchase, CapabilityOutcome::Success(Payload::Purchase { token, product_id })) => {
                Self::PurchaseFinished {
                    purchase_token: Some(token.clone()),
                    product_id: Some(product_id.clone()),
                }
            }
            // Every unsuccessful purchase looks like "nothing happened".
            (K::Purchase, _) => Self::PurchaseFinished {
                purchase_token: None,
                product_id: None,
            },
            (K::PushToken, CapabilityOutcome::Success(Payload::Token(token))) => {
                Self::PushTokenReceived {
                    token: token.clone(),
                }
            }
            (K::SignIn, CapabilityOutcome::Success(Payload::Token(id_token))) => {
                Self::SignInSuccess {
                    id_token: id_token.clone(),
                }
            }
            (K::SignIn, other) => Self::SignInError {
                message: failure_detail(other).unwrap_or_else(|| other.status().to_string()),
            },

            (kind, CapabilityOutcome::Success(_)) => {
                warn!(%kind, "capability produced a payload of the wrong shape");
                Self::CapabilityFailed {
                    kind,
                    status: "error",
                    message: Some("unexpected payload".into()),
                }
            }
            (kind, other) => Self::CapabilityFailed {
                kind,
                status: other.status(),
                message: failure_detail(other),
            },
        };
        Some(message)
    }
}

fn failure_detail(outcome: &CapabilityOutcome) -> Option<String> {
    match outcome {
        CapabilityOutcome::NativeError(message) | CapabilityOutcome::Unavailable(message) => {
            Some(message.clone())
        }
        CapabilityOutcome::TimedOut => Some("timed out".into()),
        CapabilityOutcome::Cancelled => Some("cancelled".into()),
        CapabilityOutcome::PermissionDenied => Some("permission denied".into()),
        CapabilityOutcome::Success(_) => None,
    }
}

/// Serialize a value as a JavaScript literal.
///
/// JSON is a subset of JavaScript except for raw U+2028 / U+2029, which
/// older engines treat as line terminators inside string literals.
fn js_literal<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029"),
        Err(e) => {
            warn!(error = %e, "failed to encode script argument; passing null");
            "null".into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_data_url;
    use serde_json::Value;

    fn parsed_arguments(message: &ScriptMessage) -> Vec<Value> {
        serde_json::from_str(&format!("[{}]", message.argument_list())).expect("valid JSON args")
    }

    #[test]
    fn hostile_strings_survive_as_arguments() {
        let nasty = "it's a \\ \"quoted\" '); alert(1); //\u{2028}next";
        let message = ScriptMessage::SignInError {
            message: nasty.into(),
        };
        let script = message.to_script();
        assert!(script.contains(&message.argument_list()));
        assert!(!script.contains('\u{2028}'));
        assert_eq!(parsed_arguments(&message), vec![Value::String(nasty.into())]);
    }

    #[test]
    fn file_selected_carries_three_arguments() {
        let message = ScriptMessage::for_outcome(
            CapabilityKind::FilePicker,
            &CapabilityOutcome::Success(Payload::File {
                bytes: b"%PDF-1.7".to_vec(),
                file_name: "o'brien \\ report.pdf".into(),
                mime: "application/pdf".into(),
            }),
        )
        .expect("message");

        let args = parsed_arguments(&message);
        assert_eq!(args.len(), 3);
        assert_eq!(args[1], "o'brien \\ report.pdf");
        let url = decode_data_url(args[0].as_str().expect("string")).expect("data url");
        assert_eq!(url.bytes, b"%PDF-1.7");
        assert_eq!(url.mime_type, "application/pdf");
    }

    #[test]
    fn script_is_guarded_by_typeof() {
        let script = ScriptMessage::PushTokenReceived { token: "abc".into() }.to_script();
        assert_eq!(
            script,
            "if (typeof window.onFCMTokenReceived === 'function') { window.onFCMTokenReceived(\"abc\"); }"
        );
    }

    #[test]
    fn failed_purchase_is_null_null() {
        for outcome in [
            CapabilityOutcome::Cancelled,
            CapabilityOutcome::NativeError("boom".into()),
            CapabilityOutcome::TimedOut,
        ] {
            let message =
                ScriptMessage::for_outcome(CapabilityKind::Purchase, &outcome).expect("message");
            assert_eq!(message.argument_list(), "null, null");
        }
    }

    #[test]
    fn unavailable_is_not_sent_to_script() {
        let outcome = CapabilityOutcome::Unavailable("no gallery app".into());
        assert!(ScriptMessage::for_outcome(CapabilityKind::Gallery, &outcome).is_none());
    }

    #[test]
    fn cancelled_camera_uses_generic_failure_callback() {
        let message =
            ScriptMessage::for_outcome(CapabilityKind::Camera, &CapabilityOutcome::Cancelled)
                .expect("message");
        assert_eq!(message.callback(), "onNativeCapabilityFailed");
        assert_eq!(
            parsed_arguments(&message),
            vec![
                Value::from("camera"),
                Value::from("cancelled"),
                Value::from("cancelled")
            ]
        );
    }

    #[test]
    fn notification_payload_keeps_order() {
        let payload: NotificationPayload =
            [("type", "bill_reminder"), ("id", "42"), ("amount", "9.99")]
                .into_iter()
                .collect();
        let message = ScriptMessage::NotificationClicked { payload };
        assert_eq!(message.class(), DeliveryClass::NotificationOpen);
        assert_eq!(
            message.argument_list(),
            r#"{"data":{"type":"bill_reminder","id":"42","amount":"9.99"}}"#
        );
    }
}
