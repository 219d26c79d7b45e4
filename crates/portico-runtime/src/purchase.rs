// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-app purchase flow.
//
// Launching is request/response up to the store UI. The result comes later
// through purchase updates, which may also arrive unprompted (pending
// purchases completing, purchases made on another device).

use tracing::{debug, info, instrument, warn};

use portico_bridge::traits::{BillingResponse, NativeBilling, PurchaseState, PurchaseUpdate};
use portico_core::types::{CapabilityOutcome, Payload};

/// Remembers which product the outstanding flow was launched for.
#[derive(Debug, Default)]
pub struct PurchaseTracker {
    outstanding: Option<String>,
}

impl PurchaseTracker {
    /// Tracker with no outstanding purchase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `product_id` as the purchase being waited on.
    pub fn begin(&mut self, product_id: impl Into<String>) {
        self.outstanding = Some(product_id.into());
    }

    /// Forget the outstanding purchase.
    pub fn clear(&mut self) {
        self.outstanding = None;
    }

    /// Product id of the purchase being waited on.
    pub fn outstanding(&self) -> Option<&str> {
        self.outstanding.as_deref()
    }

    /// Translate a purchase update into outcomes.
    ///
    /// A non-OK response yields exactly one `Cancelled`. An OK response
    /// yields one `Success` per purchased item that matches the outstanding
    /// product (every purchased item when nothing is outstanding).
    pub fn on_update(&mut self, update: &PurchaseUpdate) -> Vec<CapabilityOutcome> {
        if update.response != BillingResponse::Ok {
            info!(response = ?update.response, "purchase flow ended without a purchase");
            self.clear();
            return vec![CapabilityOutcome::Cancelled];
        }

        let outcomes: Vec<CapabilityOutcome> = update
            .purchases
            .iter()
            .filter(|purchase| purchase.state == PurchaseState::Purchased)
            .filter(|purchase| match &self.outstanding {
                Some(wanted) => purchase.product_ids.iter().any(|id| id == wanted),
                None => true,
            })
            .filter_map(|purchase| {
                let Some(product_id) = purchase.product_ids.first() else {
                    warn!("purchased item carries no product id; skipped");
                    return None;
                };
                Some(CapabilityOutcome::Success(Payload::Purchase {
                    token: purchase.purchase_token.clone(),
                    product_id: product_id.clone(),
                }))
            })
            .collect();

        if outcomes.is_empty() {
            debug!(
                purchases = update.purchases.len(),
                outstanding = ?self.outstanding,
                "purchase update matched nothing"
            );
        } else {
            info!(matched = outcomes.len(), "purchase completed");
            self.clear();
        }
        outcomes
    }
}

/// Look up `product_id` and show the store UI.
///
/// Returns `None` once the store UI is up (the result arrives as a purchase
/// update), or the terminal outcome if the flow could not start.
#[instrument(skip(billing))]
pub fn launch<B: NativeBilling + ?Sized>(billing: &B, product_id: &str) -> Option<CapabilityOutcome> {
    if !billing.is_ready() {
        warn!("billing client not ready");
        return Some(CapabilityOutcome::Unavailable("billing client not ready".into()));
    }

    let product = match billing.query_product(product_id) {
        Ok(Some(product)) => product,
        Ok(None) => {
            warn!("product not found in store");
            return Some(CapabilityOutcome::Cancelled);
        }
        Err(e) => return Some(e.into()),
    };

    match billing.launch_purchase_flow(&product) {
        Ok(()) => {
            info!("purchase UI launched");
            None
        }
        Err(e) => Some(e.into()),
    }
}
