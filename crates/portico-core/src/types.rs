// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Portico capability bridge.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PorticoError;

/// OS-level permissions that gate device capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Camera,
    Microphone,
    Notifications,
}

impl Permission {
    /// Name reported to script code in `onPermissionResult`.
    pub fn script_name(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Microphone => "microphone",
            Self::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.script_name())
    }
}

/// The fixed catalog of capability calls.
///
/// At most one request of each kind is outstanding at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityKind {
    Camera,
    Gallery,
    FilePicker,
    AudioRecordStart,
    AudioRecordStop,
    Purchase,
    PushToken,
    SignIn,
    PermissionGrant,
}

impl CapabilityKind {
    /// Permission that must be granted before the capability is dispatched.
    pub fn required_permission(&self) -> Option<Permission> {
        match self {
            Self::Camera => Some(Permission::Camera),
            Self::AudioRecordStart => Some(Permission::Microphone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Gallery => "gallery",
            Self::FilePicker => "file-picker",
            Self::AudioRecordStart => "audio-record-start",
            Self::AudioRecordStop => "audio-record-stop",
            Self::Purchase => "purchase",
            Self::PushToken => "push-token",
            Self::SignIn => "sign-in",
            Self::PermissionGrant => "permission-grant",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityParams {
    None,
    /// MIME filter for the file chooser (e.g. `image/*`).
    MimeFilter(String),
    /// Store product identifier for the purchase flow.
    ProductId(String),
    /// Permission requested explicitly by script code.
    Permission(Permission),
}

/// A named capability request from script code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRequest {
    pub kind: CapabilityKind,
    pub params: CapabilityParams,
}

impl CapabilityRequest {
    pub fn new(kind: CapabilityKind) -> Self {
        Self {
            kind,
            params: CapabilityParams::None,
        }
    }

    pub fn with_params(kind: CapabilityKind, params: CapabilityParams) -> Self {
        Self { kind, params }
    }
}

/// Kind-specific success payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Captured or picked image, delivered as a data URL.
    Image { bytes: Vec<u8>, mime: String },
    /// Arbitrary picked file, delivered as a data URL plus name and type.
    File {
        bytes: Vec<u8>,
        file_name: String,
        mime: String,
    },
    /// Recorded audio, delivered as bare base64.
    Audio(Vec<u8>),
    /// Opaque token (push registration or identity token).
    Token(String),
    /// Completed purchase.
    Purchase { token: String, product_id: String },
}

/// Terminal result of a capability invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityOutcome {
    Success(Payload),
    Cancelled,
    PermissionDenied,
    /// Nothing on the device can satisfy the request (no app, no billing
    /// connection). Surfaced to the user locally, not to script code.
    Unavailable(String),
    NativeError(String),
    TimedOut,
}

impl CapabilityOutcome {
    /// Short status keyword used in the generic failure callback.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Cancelled => "cancelled",
            Self::PermissionDenied => "permission-denied",
            Self::Unavailable(_) => "unavailable",
            Self::NativeError(_) => "error",
            Self::TimedOut => "timed-out",
        }
    }
}

impl From<PorticoError> for CapabilityOutcome {
    fn from(err: PorticoError) -> Self {
        match err {
            PorticoError::PermissionDenied(_) => Self::PermissionDenied,
            PorticoError::UserCancelled => Self::Cancelled,
            PorticoError::PreconditionUnavailable(reason) => Self::Unavailable(reason),
            PorticoError::Busy(_)
            | PorticoError::PromptOutstanding(_)
            | PorticoError::PlatformUnavailable => Self::Unavailable(err.to_string()),
            PorticoError::TimedOut(_) => Self::TimedOut,
            other => Self::NativeError(other.to_string()),
        }
    }
}

/// Script-to-native call surface.
///
/// Wire form: `{"method": "openFileChooser", "args": "image/*"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "args", rename_all = "camelCase")]
pub enum ScriptCall {
    ShowToast(String),
    RequestCameraPermission,
    RequestMicrophonePermission,
    RequestNotificationPermission,
    StartAudioRecording,
    StopAudioRecording,
    OpenCamera,
    OpenGallery,
    OpenFileChooser(String),
    LaunchPurchaseFlow(String),
    #[serde(rename = "getFCMToken")]
    GetFcmToken,
    SignInWithGoogle,
}

impl ScriptCall {
    /// Capability request for this call, or `None` for local UI feedback.
    pub fn to_request(&self) -> Option<CapabilityRequest> {
        use CapabilityKind as K;
        let request = match self {
            Self::ShowToast(_) => return None,
            Self::RequestCameraPermission => CapabilityRequest::with_params(
                K::PermissionGrant,
                CapabilityParams::Permission(Permission::Camera),
            ),
            Self::RequestMicrophonePermission => CapabilityRequest::with_params(
                K::PermissionGrant,
                CapabilityParams::Permission(Permission::Microphone),
            ),
            Self::RequestNotificationPermission => CapabilityRequest::with_params(
                K::PermissionGrant,
                CapabilityParams::Permission(Permission::Notifications),
            ),
            Self::StartAudioRecording => CapabilityRequest::new(K::AudioRecordStart),
            Self::StopAudioRecording => CapabilityRequest::new(K::AudioRecordStop),
            Self::OpenCamera => CapabilityRequest::new(K::Camera),
            Self::OpenGallery => CapabilityRequest::new(K::Gallery),
            Self::OpenFileChooser(filter) => CapabilityRequest::with_params(
                K::FilePicker,
                CapabilityParams::MimeFilter(filter.clone()),
            ),
            Self::LaunchPurchaseFlow(product_id) => CapabilityRequest::with_params(
                K::Purchase,
                CapabilityParams::ProductId(product_id.clone()),
            ),
            Self::GetFcmToken => CapabilityRequest::new(K::PushToken),
            Self::SignInWithGoogle => CapabilityRequest::new(K::SignIn),
        };
        Some(request)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Ordered string-to-string mapping carried by push notifications.
///
/// Insertion order is preserved on both serialization and deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPayload(Vec<(String, String)>);

impl NotificationPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Replacing keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NotificationPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = Self::new();
        for (k, v) in iter {
            payload.insert(k, v);
        }
        payload
    }
}

impl Serialize for NotificationPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NotificationPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = NotificationPayload;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of string keys to string values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut payload = NotificationPayload::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    payload.insert(k, v);
                }
                Ok(payload)
            }
        }

        deserializer.deserialize_map(PayloadVisitor)
    }
}

/// A notification the user opened, waiting to be handed to script code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub payload: NotificationPayload,
    pub received_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(payload: NotificationPayload) -> Self {
        Self {
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Visible part of a push message, when the sender included one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Push message delivered by the messaging service while the app runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    pub notification: Option<NotificationContent>,
    #[serde(default)]
    pub data: NotificationPayload,
}

/// OS notification to post for an incoming push message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNotification {
    pub title: String,
    pub body: String,
    /// Use the expanded (big text) style.
    pub expanded: bool,
    /// Attached to the tap intent; comes back through notification-open.
    pub data: NotificationPayload,
}
