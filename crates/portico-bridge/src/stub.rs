// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where native mobile APIs are unavailable.
//
// Every capability returns `PlatformUnavailable`; no permission is ever
// granted.

use std::path::Path;

use portico_core::error::{PorticoError, Result};
use portico_core::types::{LocalNotification, Permission};

use crate::traits::*;

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativePermissions for StubBridge {
    fn is_granted(&self, _permission: Permission) -> bool {
        false
    }

    fn request_permission(&self, permission: Permission) -> Result<()> {
        tracing::warn!(%permission, "NativePermissions::request_permission called on stub bridge");
        Err(PorticoError::PlatformUnavailable)
    }
}

impl NativeCamera for StubBridge {
    fn capture_image(&self) -> Result<Option<CapturedImage>> {
        tracing::warn!("NativeCamera::capture_image called on stub bridge");
        Err(PorticoError::PlatformUnavailable)
    }
}

impl NativeGallery for StubBridge {
    fn pick_image(&self) -> Result<Option<CapturedImage>> {
        tracing::warn!("NativeGallery::pick_image called on stub bridge");
        Err(PorticoError::PlatformUnavailable)
    }
}

impl NativeFilePicker for StubBridge {
    fn pick_file(&self, _mime_filter: &str) -> Result<Option<PickedFile>> {
        tracing::warn!("NativeFilePicker::pick_file called on stub bridge");
        Err(PorticoError::PlatformUnavailable)
    }
}

impl NativeAudioRecorder for StubBridge {
    fn start_recording(&self, _output: &Path) -> Result<()> {
        tracing::warn!("NativeAudioRecorder::start_recording called on stub bridge");
        Err(PorticoError::PlatformUnavailable)
    }

    fn stop_recording(&self) -> Result<()> {
        Err(PorticoError::PlatformUnavailable)
    }
}

impl NativeBilling for StubBridge {
    fn is_ready(&self) -> bool {
        false
    }

    fn query_product(&self, _product_id: &str) -> Result<Option<ProductDetails>> {
        Err(PorticoError::PlatformUnavailable)
    }

    fn launch_purchase_flow(&self, _product: &ProductDetails) -> Result<()> {
        Err(PorticoError::PlatformUnavailable)
    }
}

impl NativePushMessaging for StubBridge {
    fn fetch_token(&self) -> Result<String> {
        tracing::warn!("NativePushMessaging::fetch_token called on stub bridge");
        Err(PorticoError::PlatformUnavailable)
    }

    fn post_notification(&self, _notification: &LocalNotification) -> Result<()> {
        Err(PorticoError::PlatformUnavailable)
    }
}

impl NativeSignIn for StubBridge {
    fn sign_out(&self) -> Result<()> {
        Ok(())
    }

    fn sign_in(&self, _client_id: &str) -> Result<SignInResponse> {
        tracing::warn!("NativeSignIn::sign_in called on stub bridge");
        Err(PorticoError::PlatformUnavailable)
    }
}
