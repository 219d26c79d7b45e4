// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge router: the core of the capability bridge.
//
// Flow of a request:
//
//   invoke ─► in-flight slot ─► permission check ─► dispatch ─► native call
//                                   │                              │
//                                   └─► gatekeeper ─► OS prompt    ▼
//                                        (resumes on result)   finish ─► proxy
//
// `invoke` never blocks on native work. Native calls run on the blocking
// pool, audio commands on a dedicated ordered worker, and every result is
// matched against the ticket it was issued before it reaches script code.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use portico_bridge::PlatformBridge;
use portico_bridge::traits::PurchaseUpdate;
use portico_core::config::ShellConfig;
use portico_core::error::{PorticoError, Result};
use portico_core::human_errors::humanize_error;
use portico_core::types::{
    CapabilityKind, CapabilityOutcome, CapabilityParams, CapabilityRequest, NotificationEvent,
    Payload, Permission, PushMessage, ScriptCall,
};

use crate::audio::AudioSession;
use crate::in_flight::{InFlightTable, Ticket};
use crate::lock;
use crate::permissions::{
    PendingPermissionRequest, PermissionGatekeeper, PermissionOrigin, PermissionResolution,
    PromptAction,
};
use crate::purchase::{self, PurchaseTracker};
use crate::script::ScriptMessage;
use crate::surface::SurfaceProxy;
use crate::{media, push, signin};

enum AudioCommand {
    Start(Ticket),
    Stop(Ticket),
}

struct Inner {
    platform: Arc<dyn PlatformBridge>,
    proxy: SurfaceProxy,
    config: ShellConfig,
    runtime: Handle,
    in_flight: Mutex<InFlightTable>,
    gatekeeper: Mutex<PermissionGatekeeper>,
    purchases: Mutex<PurchaseTracker>,
    audio: mpsc::UnboundedSender<AudioCommand>,
}

/// Routes script calls to native capabilities and outcomes back to script.
///
/// Cheap to clone; all clones share one set of tables.
#[derive(Clone)]
pub struct BridgeRouter {
    inner: Arc<Inner>,
}

impl BridgeRouter {
    /// Build a router delivering through `proxy`. Recording artifacts go to
    /// `cache_dir`. Must be called from within a Tokio runtime.
    pub fn new(
        platform: Arc<dyn PlatformBridge>,
        proxy: SurfaceProxy,
        config: ShellConfig,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        let runtime = Handle::current();
        let session = AudioSession::new(cache_dir.into().join(&config.audio_artifact_name));
        let (audio_tx, audio_rx) = mpsc::unbounded_channel();

        info!(platform = platform.platform_name(), "bridge router starting");
        let inner = Arc::new(Inner {
            platform,
            proxy,
            config,
            runtime: runtime.clone(),
            in_flight: Mutex::new(InFlightTable::new()),
            gatekeeper: Mutex::new(PermissionGatekeeper::new()),
            purchases: Mutex::new(PurchaseTracker::new()),
            audio: audio_tx,
        });
        runtime.spawn(audio_worker(Arc::downgrade(&inner), session, audio_rx));

        Self { inner }
    }

    /// Name reported by the native platform.
    pub fn platform_name(&self) -> &str {
        self.inner.platform.platform_name()
    }

    /// Whether a request of `kind` holds its slot.
    pub fn is_in_flight(&self, kind: CapabilityKind) -> bool {
        lock(&self.inner.in_flight).is_in_flight(kind)
    }

    // -----------------------------------------------------------------------
    // Script-facing entry point
    // -----------------------------------------------------------------------

    /// Handle one call from script code.
    ///
    /// Returns once the request is registered. `Err` is an immediate
    /// rejection (kind already in flight, another permission prompt up);
    /// the outcome of an accepted request always arrives through the proxy.
    #[instrument(skip(self))]
    pub fn invoke(&self, call: ScriptCall) -> Result<()> {
        match call.to_request() {
            Some(request) => self.request(request),
            None => {
                if let ScriptCall::ShowToast(text) = call {
                    self.inner.proxy.toast(text);
                }
                Ok(())
            }
        }
    }

    /// Handle a typed capability request.
    pub fn request(&self, request: CapabilityRequest) -> Result<()> {
        let kind = request.kind;
        if kind == CapabilityKind::PermissionGrant {
            return self.request_permission(request.params);
        }

        let ticket = lock(&self.inner.in_flight).acquire(kind)?;
        debug!(%kind, %ticket, "slot acquired");

        if let Some(permission) = kind.required_permission() {
            if !self.inner.platform.is_granted(permission) {
                let pending = PendingPermissionRequest::for_capability(permission, request, ticket);
                if let Err(e) = self.park(pending) {
                    lock(&self.inner.in_flight).release(kind, ticket);
                    return Err(e);
                }
                return Ok(());
            }
        }

        self.dispatch(request, ticket);
        Ok(())
    }

    fn request_permission(&self, params: CapabilityParams) -> Result<()> {
        let CapabilityParams::Permission(permission) = params else {
            return Err(PorticoError::Configuration(
                "permission request without a permission".into(),
            ));
        };

        if self.inner.platform.is_granted(permission) {
            debug!(%permission, "already granted; no prompt needed");
            self.inner.proxy.deliver(ScriptMessage::PermissionResult {
                permission,
                granted: true,
            });
            return Ok(());
        }
        self.park(PendingPermissionRequest::explicit(permission))
    }

    // -----------------------------------------------------------------------
    // Native-facing entry points
    // -----------------------------------------------------------------------

    /// OS answer to a permission prompt. `None` means dismissed.
    #[instrument(skip(self))]
    pub fn on_permission_result(&self, permission: Permission, granted: Option<bool>) {
        let resolution = {
            let mut gatekeeper = lock(&self.inner.gatekeeper);
            if gatekeeper.take_expired(permission) {
                // Script code was already told `false` when the prompt expired.
                info!(%permission, ?granted, "answer for an expired prompt dropped");
                return;
            }
            gatekeeper.resolve(permission, granted)
        };
        self.inner.proxy.deliver(ScriptMessage::PermissionResult {
            permission,
            granted: granted.unwrap_or(false),
        });
        if let Some(resolution) = resolution {
            self.resume(resolution);
        }
    }

    /// Purchase update from the store. May arrive without a pending flow.
    #[instrument(skip_all, fields(response = ?update.response, purchases = update.purchases.len()))]
    pub fn on_purchases_updated(&self, update: PurchaseUpdate) {
        let outcomes = lock(&self.inner.purchases).on_update(&update);
        if outcomes.is_empty() {
            return;
        }
        lock(&self.inner.in_flight).release_current(CapabilityKind::Purchase);
        for outcome in outcomes {
            self.report(CapabilityKind::Purchase, outcome);
        }
    }

    /// The user tapped a notification.
    pub fn on_notification_opened(&self, event: NotificationEvent) {
        info!(keys = event.payload.len(), received_at = %event.received_at, "notification opened");
        self.inner
            .proxy
            .deliver(ScriptMessage::NotificationClicked {
                payload: event.payload,
            });
    }

    /// The messaging service rotated the registration token.
    pub fn on_new_push_token(&self, token: String) {
        info!(token_len = token.len(), "push token refreshed");
        self.inner
            .proxy
            .deliver(ScriptMessage::PushTokenReceived { token });
    }

    /// A push message arrived while the app is running.
    pub fn on_push_message(&self, message: PushMessage) {
        let Some(notification) = push::resolve_display(&message) else {
            return;
        };
        let platform = Arc::clone(&self.inner.platform);
        self.inner.runtime.spawn_blocking(move || {
            match platform.post_notification(&notification) {
                Ok(()) => info!(expanded = notification.expanded, "notification posted"),
                Err(e) => warn!(error = %e, "could not post notification"),
            }
        });
    }

    /// The host surface was created for the first time.
    pub fn on_host_created(&self) {
        if !self.inner.config.request_notifications_on_launch
            || self.inner.platform.is_granted(Permission::Notifications)
        {
            return;
        }
        let request = CapabilityRequest::with_params(
            CapabilityKind::PermissionGrant,
            CapabilityParams::Permission(Permission::Notifications),
        );
        if let Err(e) = self.request(request) {
            debug!(error = %e, "launch notification prompt skipped");
        }
    }

    // -----------------------------------------------------------------------
    // Permission plumbing
    // -----------------------------------------------------------------------

    fn park(&self, pending: PendingPermissionRequest) -> Result<()> {
        let permission = pending.permission;
        let action = lock(&self.inner.gatekeeper).begin(pending)?;
        let PromptAction::Prompt(id) = action else {
            return Ok(());
        };

        let weak = Arc::downgrade(&self.inner);
        let timeout = self.inner.config.permission_timeout();
        let timer = self.inner.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = weak.upgrade() {
                BridgeRouter { inner }.expire_prompt(id);
            }
        });
        lock(&self.inner.gatekeeper).attach_timer(id, timer.abort_handle());

        let router = self.clone();
        self.inner.runtime.spawn_blocking(move || {
            if let Err(e) = router.inner.platform.request_permission(permission) {
                warn!(%permission, error = %e, "permission prompt could not be shown");
                router.on_permission_result(permission, None);
            }
        });
        Ok(())
    }

    fn expire_prompt(&self, id: Ticket) {
        let resolution = lock(&self.inner.gatekeeper).expire(id);
        if let Some(resolution) = resolution {
            self.inner.proxy.deliver(ScriptMessage::PermissionResult {
                permission: resolution.permission,
                granted: false,
            });
            self.resume(resolution);
        }
    }

    fn resume(&self, resolution: PermissionResolution) {
        for pending in resolution.continuations {
            let PermissionOrigin::Capability { request, ticket } = pending.origin else {
                continue;
            };
            let kind = request.kind;
            if lock(&self.inner.in_flight).current(kind) != Some(ticket) {
                debug!(%kind, %ticket, "parked request no longer current; dropped");
                continue;
            }
            if resolution.granted {
                self.dispatch(request, ticket);
            } else {
                self.finish(kind, ticket, Some(CapabilityOutcome::PermissionDenied));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch and completion
    // -----------------------------------------------------------------------

    fn dispatch(&self, request: CapabilityRequest, ticket: Ticket) {
        let kind = request.kind;
        self.arm_timeout(kind, ticket);
        info!(%kind, %ticket, "dispatching capability");

        match kind {
            CapabilityKind::AudioRecordStart => self.send_audio(kind, AudioCommand::Start(ticket)),
            CapabilityKind::AudioRecordStop => self.send_audio(kind, AudioCommand::Stop(ticket)),
            _ => {
                if let (CapabilityKind::Purchase, CapabilityParams::ProductId(product_id)) =
                    (kind, &request.params)
                {
                    lock(&self.inner.purchases).begin(product_id.clone());
                }
                let router = self.clone();
                self.inner.runtime.spawn_blocking(move || {
                    if let Some(outcome) = router.perform(&request) {
                        router.finish(kind, ticket, Some(outcome));
                    }
                });
            }
        }
    }

    /// Run a blocking capability. `None` means the result arrives later
    /// through a native callback.
    fn perform(&self, request: &CapabilityRequest) -> Option<CapabilityOutcome> {
        let platform = &*self.inner.platform;
        let outcome = match (request.kind, &request.params) {
            (CapabilityKind::Camera, _) => media::capture_image(platform),
            (CapabilityKind::Gallery, _) => media::pick_image(platform),
            (CapabilityKind::FilePicker, CapabilityParams::MimeFilter(filter)) => {
                media::pick_file(platform, filter)
            }
            (CapabilityKind::FilePicker, _) => media::pick_file(platform, ""),
            (CapabilityKind::Purchase, CapabilityParams::ProductId(product_id)) => {
                return purchase::launch(platform, product_id);
            }
            (CapabilityKind::PushToken, _) => match platform.fetch_token() {
                Ok(token) if !token.is_empty() => CapabilityOutcome::Success(Payload::Token(token)),
                Ok(_) => CapabilityOutcome::NativeError("empty push token".into()),
                Err(e) => e.into(),
            },
            (CapabilityKind::SignIn, _) => {
                signin::sign_in(platform, self.inner.config.sign_in_client_id.as_deref())
            }
            (kind, params) => {
                warn!(%kind, ?params, "request cannot be dispatched");
                CapabilityOutcome::NativeError(format!("{kind} cannot be dispatched"))
            }
        };
        Some(outcome)
    }

    fn send_audio(&self, kind: CapabilityKind, command: AudioCommand) {
        let ticket = match &command {
            AudioCommand::Start(ticket) | AudioCommand::Stop(ticket) => *ticket,
        };
        if self.inner.audio.send(command).is_err() {
            warn!(%kind, "audio worker stopped");
            self.finish(
                kind,
                ticket,
                Some(CapabilityOutcome::NativeError("audio recorder unavailable".into())),
            );
        }
    }

    fn arm_timeout(&self, kind: CapabilityKind, ticket: Ticket) {
        let timeout = self.inner.config.capability_timeout(kind);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let timer = self.inner.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = weak.upgrade() {
                warn!(%kind, %ticket, ?timeout, "capability timed out");
                BridgeRouter { inner }.finish(kind, ticket, Some(CapabilityOutcome::TimedOut));
            }
        });
        lock(&self.inner.in_flight).attach_timer(kind, ticket, timer.abort_handle());
    }

    /// Release the slot and report the outcome. A stale ticket (timed out or
    /// superseded) is discarded.
    fn finish(&self, kind: CapabilityKind, ticket: Ticket, outcome: Option<CapabilityOutcome>) {
        if !lock(&self.inner.in_flight).release(kind, ticket) {
            debug!(%kind, %ticket, "stale completion discarded");
            return;
        }
        if kind == CapabilityKind::Purchase {
            lock(&self.inner.purchases).clear();
        }
        match outcome {
            Some(outcome) => self.report(kind, outcome),
            None => debug!(%kind, %ticket, "completed without a script-visible result"),
        }
    }

    fn report(&self, kind: CapabilityKind, outcome: CapabilityOutcome) {
        info!(%kind, status = outcome.status(), "capability resolved");
        if let CapabilityOutcome::Unavailable(reason) = &outcome {
            let human = humanize_error(&PorticoError::PreconditionUnavailable(reason.clone()));
            self.inner.proxy.toast(human.message);
            return;
        }
        if let Some(message) = ScriptMessage::for_outcome(kind, &outcome) {
            self.inner.proxy.deliver(message);
        }
    }
}

/// Runs audio start/stop strictly in arrival order.
async fn audio_worker(
    router: Weak<Inner>,
    session: AudioSession,
    mut rx: mpsc::UnboundedReceiver<AudioCommand>,
) {
    let session = Arc::new(Mutex::new(session));
    while let Some(command) = rx.recv().await {
        let Some(inner) = router.upgrade() else {
            break;
        };
        let (kind, ticket) = match &command {
            AudioCommand::Start(ticket) => (CapabilityKind::AudioRecordStart, *ticket),
            AudioCommand::Stop(ticket) => (CapabilityKind::AudioRecordStop, *ticket),
        };

        let platform = Arc::clone(&inner.platform);
        let shared = Arc::clone(&session);
        let result = inner
            .runtime
            .spawn_blocking(move || {
                let mut session = lock(&shared);
                match command {
                    AudioCommand::Start(_) => session.start(&*platform).err().map(CapabilityOutcome::from),
                    AudioCommand::Stop(_) => session.stop(&*platform),
                }
            })
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => Some(CapabilityOutcome::NativeError(format!("audio task failed: {e}"))),
        };
        BridgeRouter { inner }.finish(kind, ticket, outcome);
    }
    debug!("audio worker finished");
}
