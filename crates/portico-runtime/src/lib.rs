// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Portico: Bridge orchestration runtime.
//
// Routes script calls to native capabilities, correlates their asynchronous
// results and delivers them to the hosted page across surface
// destroy/recreate cycles.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod audio;
pub mod codec;
pub mod in_flight;
pub mod lifecycle;
pub mod media;
pub mod permissions;
pub mod purchase;
pub mod push;
pub mod router;
pub mod script;
pub mod signin;
pub mod surface;

#[cfg(test)]
mod testing;

pub use lifecycle::{BindingState, LifecycleCoordinator};
pub use router::BridgeRouter;
pub use script::ScriptMessage;
pub use surface::{HostSurface, SurfaceProxy};

/// Lock a table, recovering the data if a holder panicked. The tables stay
/// consistent between statements, so a poisoned lock is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
