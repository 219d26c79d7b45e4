// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test doubles: a scriptable platform and a surface that records deliveries.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use portico_bridge::traits::*;
use portico_core::error::{PorticoError, Result};
use portico_core::types::{LocalNotification, Permission};

use crate::lock;
use crate::script::ScriptMessage;
use crate::surface::HostSurface;

/// Knobs and call log for `FakePlatform`. Defaults: nothing granted, every
/// picker cancels, billing not ready.
#[derive(Default)]
pub struct FakeState {
    pub granted: HashSet<Permission>,
    pub camera_image: Option<CapturedImage>,
    pub gallery_image: Option<CapturedImage>,
    pub gallery_missing: bool,
    pub picked_file: Option<PickedFile>,
    /// Stop succeeds but the codec rejects the length.
    pub recording_too_short: bool,
    pub recorder_fails: bool,
    /// Start leaves the artifact untouched when false.
    pub recorder_writes: bool,
    pub billing_ready: bool,
    pub products: Vec<ProductDetails>,
    pub push_token: Option<String>,
    pub posted: Vec<LocalNotification>,
    pub sign_out_fails: bool,
    pub sign_in_responses: VecDeque<SignInResponse>,
    pub calls: Vec<String>,
}

pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    /// Bytes the fake recorder writes into its artifact.
    pub const AUDIO_BYTES: &'static [u8] = b"#!AMR\nfake-audio";

    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                recorder_writes: true,
                ..FakeState::default()
            }),
        }
    }

    pub fn configure(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut lock(&self.state));
    }

    /// Native calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    pub fn posted(&self) -> Vec<LocalNotification> {
        lock(&self.state).posted.clone()
    }

    fn record(&self, call: impl Into<String>) -> MutexGuard<'_, FakeState> {
        let mut state = lock(&self.state);
        state.calls.push(call.into());
        state
    }
}

impl PlatformBridge for FakePlatform {
    fn platform_name(&self) -> &str {
        "Fake"
    }
}

impl NativePermissions for FakePlatform {
    fn is_granted(&self, permission: Permission) -> bool {
        lock(&self.state).granted.contains(&permission)
    }

    fn request_permission(&self, permission: Permission) -> Result<()> {
        self.record(format!("request_permission:{permission}"));
        Ok(())
    }
}

impl NativeCamera for FakePlatform {
    fn capture_image(&self) -> Result<Option<CapturedImage>> {
        Ok(self.record("capture_image").camera_image.clone())
    }
}

impl NativeGallery for FakePlatform {
    fn pick_image(&self) -> Result<Option<CapturedImage>> {
        let state = self.record("pick_image");
        if state.gallery_missing {
            return Err(PorticoError::PreconditionUnavailable("no gallery app installed".into()));
        }
        Ok(state.gallery_image.clone())
    }
}

impl NativeFilePicker for FakePlatform {
    fn pick_file(&self, mime_filter: &str) -> Result<Option<PickedFile>> {
        Ok(self.record(format!("pick_file:{mime_filter}")).picked_file.clone())
    }
}

impl NativeAudioRecorder for FakePlatform {
    fn start_recording(&self, output: &Path) -> Result<()> {
        let state = self.record("start_recording");
        if state.recorder_fails {
            return Err(PorticoError::NativeOperation("microphone busy".into()));
        }
        if state.recorder_writes {
            fs::write(output, Self::AUDIO_BYTES)?;
        }
        Ok(())
    }

    fn stop_recording(&self) -> Result<()> {
        if self.record("stop_recording").recording_too_short {
            return Err(PorticoError::RecordingTooShort);
        }
        Ok(())
    }
}

impl NativeBilling for FakePlatform {
    fn is_ready(&self) -> bool {
        lock(&self.state).billing_ready
    }

    fn query_product(&self, product_id: &str) -> Result<Option<ProductDetails>> {
        let state = self.record(format!("query_product:{product_id}"));
        Ok(state
            .products
            .iter()
            .find(|product| product.product_id == product_id)
            .cloned())
    }

    fn launch_purchase_flow(&self, product: &ProductDetails) -> Result<()> {
        self.record(format!("launch_purchase_flow:{}", product.product_id));
        Ok(())
    }
}

impl NativePushMessaging for FakePlatform {
    fn fetch_token(&self) -> Result<String> {
        self.record("fetch_token")
            .push_token
            .clone()
            .ok_or_else(|| PorticoError::NativeOperation("no token".into()))
    }

    fn post_notification(&self, notification: &LocalNotification) -> Result<()> {
        self.record("post_notification")
            .posted
            .push(notification.clone());
        Ok(())
    }
}

impl NativeSignIn for FakePlatform {
    fn sign_out(&self) -> Result<()> {
        if self.record("sign_out").sign_out_fails {
            return Err(PorticoError::NativeOperation("sign-out failed".into()));
        }
        Ok(())
    }

    fn sign_in(&self, client_id: &str) -> Result<SignInResponse> {
        Ok(self
            .record(format!("sign_in:{client_id}"))
            .sign_in_responses
            .pop_front()
            .unwrap_or(SignInResponse::NoAccount))
    }
}

/// Surface that records everything it is asked to run or show.
#[derive(Default)]
pub struct RecordingSurface {
    messages: Mutex<Vec<ScriptMessage>>,
    toasts: Mutex<Vec<String>>,
}

impl RecordingSurface {
    /// Returns the recorder and the same object as a bindable surface.
    pub fn new() -> (Arc<Self>, Arc<dyn HostSurface>) {
        let recording = Arc::new(Self::default());
        let surface: Arc<dyn HostSurface> = recording.clone();
        (recording, surface)
    }

    pub fn messages(&self) -> Vec<ScriptMessage> {
        lock(&self.messages).clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        lock(&self.toasts).clone()
    }
}

impl HostSurface for RecordingSurface {
    fn post_message(&self, message: &ScriptMessage) -> Result<()> {
        lock(&self.messages).push(message.clone());
        Ok(())
    }

    fn show_toast(&self, text: &str) {
        lock(&self.toasts).push(text.to_string());
    }
}

/// Poll `condition` until it holds. Panics after a few seconds.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
