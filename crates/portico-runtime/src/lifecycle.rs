// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lifecycle coordinator: tracks the single live host surface across
// destroy/recreate cycles and replays deliveries that arrived while it was
// gone.
//
// State machine: Unbound -> Bound -> Unbound -> Bound -> ...
//
// While Unbound:
//   * notification-open messages: only the latest is kept
//   * capability outcomes: queued in order, capped (oldest dropped)
//   * toasts: dropped
//
// On Bound the queued outcomes are replayed in order, then the latest
// notification-open exactly once.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::script::{DeliveryClass, ScriptMessage};
use crate::surface::{Command, HostSurface, SurfaceProxy};

/// Binding of the host surface, as observed by listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    /// `generation` increases with every bind.
    Bound { generation: u64 },
}

/// Owner of the surface binding and the single delivery task.
pub struct LifecycleCoordinator {
    proxy: SurfaceProxy,
    state: watch::Receiver<BindingState>,
}

impl LifecycleCoordinator {
    /// Start the delivery task. Must be called from within a Tokio runtime.
    pub fn spawn(max_queued_outcomes: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(BindingState::Unbound);
        let delivery = DeliveryLoop::new(max_queued_outcomes, state_tx);
        tokio::spawn(delivery.run(rx));

        Self {
            proxy: SurfaceProxy::new(tx),
            state: state_rx,
        }
    }

    /// Attach a newly created surface. Only a weak reference is kept; the
    /// host owns the surface's lifetime.
    pub fn bind(&self, surface: &Arc<dyn HostSurface>) {
        self.proxy.send(Command::Bind(Arc::downgrade(surface)));
    }

    /// Detach the surface (destroyed, backgrounded, being recreated).
    pub fn unbind(&self) {
        self.proxy.send(Command::Unbind);
    }

    /// Handle for delivering messages; hand this to the router.
    pub fn proxy(&self) -> SurfaceProxy {
        self.proxy.clone()
    }

    /// Binding state as of the last processed command.
    pub fn state(&self) -> BindingState {
        *self.state.borrow()
    }

    /// Listen for bind/unbind transitions.
    pub fn subscribe(&self) -> watch::Receiver<BindingState> {
        self.state.clone()
    }

    /// Wait until every command submitted before this call has been handled.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.proxy.send(Command::Flush(tx));
        // An Err means the task is gone, so nothing is left to wait for.
        let _ = rx.await;
    }
}

/// State owned exclusively by the delivery task.
struct DeliveryLoop {
    surface: Option<Weak<dyn HostSurface>>,
    generation: u64,
    outcomes: VecDeque<ScriptMessage>,
    notification: Option<ScriptMessage>,
    max_queued_outcomes: usize,
    state_tx: watch::Sender<BindingState>,
}

impl DeliveryLoop {
    fn new(max_queued_outcomes: usize, state_tx: watch::Sender<BindingState>) -> Self {
        Self {
            surface: None,
            generation: 0,
            outcomes: VecDeque::new(),
            notification: None,
            max_queued_outcomes: max_queued_outcomes.max(1),
            state_tx,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        debug!("delivery task finished");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Deliver(message) => self.deliver(message),
            Command::Toast(text) => match self.live_surface() {
                Some(surface) => surface.show_toast(&text),
                None => debug!("no surface bound; toast dropped"),
            },
            Command::Bind(surface) => self.bind(surface),
            Command::Unbind => {
                if self.surface.take().is_some() {
                    info!(generation = self.generation, "host surface unbound");
                }
                self.publish(BindingState::Unbound);
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    fn bind(&mut self, surface: Weak<dyn HostSurface>) {
        self.generation += 1;
        self.surface = Some(surface);
        info!(
            generation = self.generation,
            queued_outcomes = self.outcomes.len(),
            pending_notification = self.notification.is_some(),
            "host surface bound"
        );
        self.publish(BindingState::Bound {
            generation: self.generation,
        });

        let replay: Vec<ScriptMessage> = self
            .outcomes
            .drain(..)
            .chain(self.notification.take())
            .collect();
        for message in replay {
            self.deliver(message);
        }
    }

    fn deliver(&mut self, message: ScriptMessage) {
        match self.live_surface() {
            Some(surface) => {
                if let Err(e) = surface.post_message(&message) {
                    error!(callback = message.callback(), error = %e, "script delivery failed");
                }
            }
            None => self.hold(message),
        }
    }

    fn hold(&mut self, message: ScriptMessage) {
        match message.class() {
            DeliveryClass::NotificationOpen => {
                if self.notification.replace(message).is_some() {
                    debug!("older notification-open superseded while unbound");
                }
            }
            DeliveryClass::Outcome => {
                if self.outcomes.len() >= self.max_queued_outcomes {
                    if let Some(dropped) = self.outcomes.pop_front() {
                        warn!(
                            callback = dropped.callback(),
                            "replay queue full; oldest outcome dropped"
                        );
                    }
                }
                debug!(callback = message.callback(), "no surface bound; outcome queued");
                self.outcomes.push_back(message);
            }
        }
    }

    /// Upgrade the weak reference. A surface that died without an unbind is
    /// treated as unbound from here on.
    fn live_surface(&mut self) -> Option<Arc<dyn HostSurface>> {
        let weak = self.surface.as_ref()?;
        match weak.upgrade() {
            Some(surface) => Some(surface),
            None => {
                warn!(generation = self.generation, "host surface dropped without unbind");
                self.surface = None;
                self.publish(BindingState::Unbound);
                None
            }
        }
    }

    fn publish(&self, state: BindingState) {
        self.state_tx.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSurface;
    use portico_core::types::{NotificationPayload, Permission};

    fn notification(id: &str) -> ScriptMessage {
        let payload: NotificationPayload = [("id", id)].into_iter().collect();
        ScriptMessage::NotificationClicked { payload }
    }

    fn token(t: &str) -> ScriptMessage {
        ScriptMessage::PushTokenReceived { token: t.into() }
    }

    #[tokio::test]
    async fn delivers_immediately_while_bound() {
        let lifecycle = LifecycleCoordinator::spawn(16);
        let (recording, surface) = RecordingSurface::new();
        lifecycle.bind(&surface);
        lifecycle.proxy().deliver(token("a"));
        lifecycle.proxy().toast("hello");
        lifecycle.flush().await;

        assert_eq!(recording.messages(), vec![token("a")]);
        assert_eq!(recording.toasts(), vec!["hello".to_string()]);
        assert_eq!(lifecycle.state(), BindingState::Bound { generation: 1 });
    }

    #[tokio::test]
    async fn latest_notification_is_replayed_exactly_once() {
        let lifecycle = LifecycleCoordinator::spawn(16);
        let proxy = lifecycle.proxy();
        proxy.deliver(notification("first"));
        proxy.deliver(notification("second"));
        proxy.deliver(notification("third"));

        let (recording, surface) = RecordingSurface::new();
        lifecycle.bind(&surface);
        lifecycle.flush().await;
        assert_eq!(recording.messages(), vec![notification("third")]);

        // A later rebind must not replay it again.
        lifecycle.unbind();
        let (again, surface2) = RecordingSurface::new();
        lifecycle.bind(&surface2);
        lifecycle.flush().await;
        assert!(again.messages().is_empty());
        assert_eq!(recording.messages().len(), 1);
    }

    #[tokio::test]
    async fn toasts_are_dropped_while_unbound() {
        let lifecycle = LifecycleCoordinator::spawn(16);
        lifecycle.proxy().toast("lost");
        let (recording, surface) = RecordingSurface::new();
        lifecycle.bind(&surface);
        lifecycle.flush().await;
        assert!(recording.toasts().is_empty());
    }

    #[tokio::test]
    async fn outcomes_replay_in_order_before_notification() {
        let lifecycle = LifecycleCoordinator::spawn(2);
        let proxy = lifecycle.proxy();
        proxy.deliver(token("dropped"));
        proxy.deliver(notification("n"));
        proxy.deliver(token("kept-1"));
        proxy.deliver(ScriptMessage::PermissionResult {
            permission: Permission::Camera,
            granted: true,
        });

        let (recording, surface) = RecordingSurface::new();
        lifecycle.bind(&surface);
        lifecycle.flush().await;
        assert_eq!(
            recording.messages(),
            vec![
                token("kept-1"),
                ScriptMessage::PermissionResult {
                    permission: Permission::Camera,
                    granted: true,
                },
                notification("n"),
            ]
        );
    }

    #[tokio::test]
    async fn dropped_surface_counts_as_unbound() {
        let lifecycle = LifecycleCoordinator::spawn(16);
        let (recording, surface) = RecordingSurface::new();
        lifecycle.bind(&surface);
        lifecycle.flush().await;
        drop(surface);
        drop(recording);

        lifecycle.proxy().deliver(token("held"));
        lifecycle.flush().await;
        assert_eq!(lifecycle.state(), BindingState::Unbound);

        let (next, surface) = RecordingSurface::new();
        lifecycle.bind(&surface);
        lifecycle.flush().await;
        assert_eq!(next.messages(), vec![token("held")]);
        assert_eq!(lifecycle.state(), BindingState::Bound { generation: 2 });
    }

    #[tokio::test]
    async fn listeners_observe_transitions() {
        let lifecycle = LifecycleCoordinator::spawn(16);
        let mut listener = lifecycle.subscribe();
        let (_recording, surface) = RecordingSurface::new();

        lifecycle.bind(&surface);
        listener.changed().await.expect("bound");
        assert_eq!(*listener.borrow(), BindingState::Bound { generation: 1 });

        lifecycle.unbind();
        listener.changed().await.expect("unbound");
        assert_eq!(*listener.borrow(), BindingState::Unbound);
    }
}
