// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Portico: Native platform bridge abstractions.
//
// Defines the capability traits the runtime dispatches to and selects the
// implementation for the target operating system. Mobile hosts supply their
// own `PlatformBridge` (JNI / Objective-C glue) and hand it to the router
// directly; everything else gets the stub.

use std::sync::Arc;

pub mod stub;
pub mod traits;

pub use traits::PlatformBridge;

/// Default bridge implementation for this build.
///
/// RETURNS: a shared trait object (`dyn PlatformBridge`) that abstracts away
/// the underlying native SDK details.
pub fn platform_bridge() -> Arc<dyn PlatformBridge> {
    // DESKTOP/CI: no device capabilities; every call reports unavailable.
    Arc::new(stub::StubBridge)
}
