// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native capabilities.
//
// Each trait is a thin seam over one device API. Methods block until the
// native side has an answer; the runtime calls them from the blocking pool,
// never from the script-facing thread. Results that the platform delivers
// out of band (permission prompts, purchase updates) come back through the
// router's `on_*` entry points instead of a return value.

use std::path::Path;

use portico_core::error::Result;
use portico_core::types::{LocalNotification, Permission};
use serde::{Deserialize, Serialize};

/// Unified bridge that groups all native capabilities.
pub trait PlatformBridge:
    NativePermissions
    + NativeCamera
    + NativeGallery
    + NativeFilePicker
    + NativeAudioRecorder
    + NativeBilling
    + NativePushMessaging
    + NativeSignIn
    + Send
    + Sync
{
    /// Human-readable platform name (e.g. "Android 14").
    fn platform_name(&self) -> &str;
}

/// OS-level runtime permissions.
pub trait NativePermissions {
    /// Whether the permission is currently granted.
    fn is_granted(&self, permission: Permission) -> bool;

    /// Show the OS permission prompt. Returns once the prompt is up; the
    /// answer arrives later through `BridgeRouter::on_permission_result`.
    fn request_permission(&self, permission: Permission) -> Result<()>;
}

/// Capture images from the device camera.
pub trait NativeCamera {
    /// Launch the system camera and return the captured image.
    /// Returns Ok(None) if the user cancelled.
    fn capture_image(&self) -> Result<Option<CapturedImage>>;
}

/// Pick an image from the gallery.
pub trait NativeGallery {
    /// Returns Ok(None) if the user backed out of the picker.
    fn pick_image(&self) -> Result<Option<CapturedImage>>;
}

/// Pick files from the device storage.
pub trait NativeFilePicker {
    /// Show a chooser filtered to `mime_filter` (e.g. `*/*`, `image/*`).
    /// Returns Ok(None) if cancelled.
    fn pick_file(&self, mime_filter: &str) -> Result<Option<PickedFile>>;
}

/// Microphone recording into a file.
pub trait NativeAudioRecorder {
    /// Start recording into `output`.
    fn start_recording(&self, output: &Path) -> Result<()>;

    /// Stop and finalize the recording. Fails with
    /// `PorticoError::RecordingTooShort` below the codec's minimum length.
    fn stop_recording(&self) -> Result<()>;
}

/// In-app purchase via the platform store.
pub trait NativeBilling {
    /// Whether the billing connection is established.
    fn is_ready(&self) -> bool;

    /// Look up store metadata for a single product.
    fn query_product(&self, product_id: &str) -> Result<Option<ProductDetails>>;

    /// Show the store purchase UI. Results arrive later through
    /// `BridgeRouter::on_purchases_updated`.
    fn launch_purchase_flow(&self, product: &ProductDetails) -> Result<()>;
}

/// Push messaging registration and local notification display.
pub trait NativePushMessaging {
    /// Fetch the current push registration token.
    fn fetch_token(&self) -> Result<String>;

    /// Post an OS notification whose tap reopens the host with `data` attached.
    fn post_notification(&self, notification: &LocalNotification) -> Result<()>;
}

/// Federated sign-in with an identity provider.
pub trait NativeSignIn {
    /// Forget any cached account so the next attempt shows the account picker.
    fn sign_out(&self) -> Result<()>;

    /// Run the provider's sign-in UI for the given web client id.
    fn sign_in(&self, client_id: &str) -> Result<SignInResponse>;
}

// ---------------------------------------------------------------------------
// Native result types
// ---------------------------------------------------------------------------

/// Image returned by the camera or gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    /// MIME type of `bytes` (camera and gallery re-encode to JPEG).
    pub mime_type: String,
}

/// File returned by the document chooser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub bytes: Vec<u8>,
    /// Display name, when the provider exposes one.
    pub file_name: Option<String>,
    /// MIME type reported by the content provider.
    pub mime_type: Option<String>,
}

/// Store metadata for a purchasable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub product_id: String,
    pub title: Option<String>,
}

/// Response code attached to a purchase update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingResponse {
    Ok,
    UserCanceled,
    Error(i32),
}

/// Lifecycle state of a single purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseState {
    Purchased,
    Pending,
    Unspecified,
}

/// One purchase reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub purchase_token: String,
    pub product_ids: Vec<String>,
    pub state: PurchaseState,
}

/// Purchase-update callback payload. May arrive at any time, not only in
/// response to a launched flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseUpdate {
    pub response: BillingResponse,
    #[serde(default)]
    pub purchases: Vec<PurchaseRecord>,
}

/// Result of the provider's sign-in UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInResponse {
    /// The provider returned an account.
    Account {
        id_token: Option<String>,
        email: Option<String>,
    },
    /// The provider reported a status code.
    Failed { status_code: i32, message: String },
    /// The provider returned neither an account nor an error.
    NoAccount,
}
