// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Federated sign-in.
//
// Every attempt clears the cached session first, so a stale account can
// never be returned without the user choosing it again.

use std::fmt;

use tracing::{info, instrument, warn};

use portico_bridge::traits::{NativeSignIn, SignInResponse};
use portico_core::error::PorticoError;
use portico_core::types::{CapabilityOutcome, Payload};

/// User-facing reason for a failed sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInFailure {
    MisconfiguredClient,
    UserCancelled,
    ProviderFailure,
    SignInRequired,
    Unknown(i32),
}

impl SignInFailure {
    /// Map a provider status code.
    pub fn from_status_code(code: i32) -> Self {
        match code {
            10 => Self::MisconfiguredClient,
            12501 => Self::UserCancelled,
            12502 => Self::ProviderFailure,
            12500 => Self::SignInRequired,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for SignInFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MisconfiguredClient => f.write_str("misconfigured-client"),
            Self::UserCancelled => f.write_str("user-cancelled"),
            Self::ProviderFailure => f.write_str("provider-failure"),
            Self::SignInRequired => f.write_str("sign-in-required"),
            Self::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

/// Run one sign-in attempt. Never succeeds without a non-empty token.
#[instrument(skip_all)]
pub fn sign_in<S: NativeSignIn + ?Sized>(provider: &S, client_id: Option<&str>) -> CapabilityOutcome {
    let Some(client_id) = client_id.map(str::trim).filter(|id| !id.is_empty()) else {
        let err = PorticoError::Configuration("sign-in client id is not set".into());
        warn!(error = %err, "sign-in aborted");
        return CapabilityOutcome::NativeError(err.to_string());
    };

    if let Err(e) = provider.sign_out() {
        warn!(error = %e, "could not clear cached session; sign-in aborted");
        return CapabilityOutcome::NativeError(format!("could not clear cached session: {e}"));
    }

    match provider.sign_in(client_id) {
        Ok(SignInResponse::Account { id_token, email }) => {
            match id_token.filter(|token| !token.is_empty()) {
                Some(token) => {
                    info!(has_email = email.is_some(), token_len = token.len(), "signed in");
                    CapabilityOutcome::Success(Payload::Token(token))
                }
                None => {
                    warn!("provider returned an account without an identity token");
                    CapabilityOutcome::NativeError("no identity token returned".into())
                }
            }
        }
        Ok(SignInResponse::Failed {
            status_code,
            message,
        }) => {
            let failure = SignInFailure::from_status_code(status_code);
            warn!(status_code, %failure, provider_message = %message, "sign-in failed");
            CapabilityOutcome::NativeError(failure.to_string())
        }
        Ok(SignInResponse::NoAccount) => {
            warn!("provider returned no account");
            CapabilityOutcome::NativeError("no account returned".into())
        }
        Err(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;

    fn account(token: &str) -> SignInResponse {
        SignInResponse::Account {
            id_token: Some(token.into()),
            email: None,
        }
    }

    #[test]
    fn status_codes_map_to_reasons() {
        assert_eq!(SignInFailure::from_status_code(10), SignInFailure::MisconfiguredClient);
        assert_eq!(SignInFailure::from_status_code(12501), SignInFailure::UserCancelled);
        assert_eq!(SignInFailure::from_status_code(12502), SignInFailure::ProviderFailure);
        assert_eq!(SignInFailure::from_status_code(12500), SignInFailure::SignInRequired);
        assert_eq!(SignInFailure::from_status_code(7).to_string(), "unknown(7)");
    }

    #[test]
    fn blank_client_id_is_a_configuration_error() {
        let fake = FakePlatform::new();
        let outcome = sign_in(&fake, Some("  "));
        assert!(matches!(outcome, CapabilityOutcome::NativeError(ref m) if m.contains("configuration")));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn every_attempt_signs_out_first() {
        let fake = FakePlatform::new();
        fake.configure(|s| {
            s.sign_in_responses.push_back(account("token-a"));
            s.sign_in_responses.push_back(account("token-b"));
        });

        assert_eq!(
            sign_in(&fake, Some("web-client")),
            CapabilityOutcome::Success(Payload::Token("token-a".into()))
        );
        assert_eq!(
            sign_in(&fake, Some("web-client")),
            CapabilityOutcome::Success(Payload::Token("token-b".into()))
        );
        assert_eq!(
            fake.calls(),
            vec!["sign_out", "sign_in:web-client", "sign_out", "sign_in:web-client"]
        );
    }

    #[test]
    fn empty_token_is_never_success() {
        let fake = FakePlatform::new();
        fake.configure(|s| s.sign_in_responses.push_back(account("")));
        assert!(matches!(
            sign_in(&fake, Some("web-client")),
            CapabilityOutcome::NativeError(_)
        ));
    }

    #[test]
    fn failed_sign_out_aborts() {
        let fake = FakePlatform::new();
        fake.configure(|s| {
            s.sign_out_fails = true;
            s.sign_in_responses.push_back(account("stale"));
        });
        assert!(matches!(
            sign_in(&fake, Some("web-client")),
            CapabilityOutcome::NativeError(_)
        ));
        assert_eq!(fake.calls(), vec!["sign_out"]);
    }

    #[test]
    fn provider_status_is_reported_by_reason() {
        let fake = FakePlatform::new();
        fake.configure(|s| {
            s.sign_in_responses.push_back(SignInResponse::Failed {
                status_code: 10,
                message: "DEVELOPER_ERROR".into(),
            })
        });
        assert_eq!(
            sign_in(&fake, Some("web-client")),
            CapabilityOutcome::NativeError("misconfigured-client".into())
        );
    }
}
