// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Authentication of control messages.
//!
//! A control datagram claims that a host is now reachable through a new attachment point. The
//! claim is accepted only if
//!
//! 1. the host identifier is derived from the enclosed public key,
//! 2. the signature over the inner message verifies under that key, and
//! 3. the timestamp is newer than the last accepted one of the same host.
//!
//! Checks run in this order and stop at the first failure. Rejected messages never modify the
//! [`HostDirectory`] and are never answered.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::{debug, info};
use xia_scion_proto::{
    control::{ControlDecodeError, SignedControlMessage},
    xia::Xid,
};

use crate::directory::{HostDirectory, HostRecord};

/// Verifies signatures of control messages.
pub trait SignatureVerifier {
    /// Returns true if `signature` over `data` verifies under `public_key`.
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// Ed25519 signature verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::try_from(public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(data, &signature).is_ok()
    }
}

/// Reasons a control message is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum AuthError {
    /// The datagram is not a well-formed control message.
    #[error("malformed control message: {0}")]
    Decode(#[from] ControlDecodeError),
    /// The host identifier does not belong to the enclosed public key.
    #[error("host identifier {declared} does not match public key ({derived})")]
    IdentityMismatch {
        /// Identifier claimed by the message.
        declared: String,
        /// Identifier derived from the public key.
        derived: Xid,
    },
    /// The signature does not verify.
    #[error("invalid signature")]
    InvalidSignature,
    /// The timestamp is not newer than the last accepted one.
    #[error("stale timestamp {received}, last accepted {previous}")]
    StaleTimestamp {
        /// Timestamp of the last accepted message.
        previous: f64,
        /// Timestamp of the rejected message.
        received: f64,
    },
    /// The attachment DAG names no attachment domain.
    #[error("attachment DAG names no attachment domain")]
    MissingAttachmentDomain,
}

impl AuthError {
    /// Short label of the rejection reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Decode(_) => "malformed",
            Self::IdentityMismatch { .. } => "identity_mismatch",
            Self::InvalidSignature => "invalid_signature",
            Self::StaleTimestamp { .. } => "stale_timestamp",
            Self::MissingAttachmentDomain => "missing_attachment_domain",
        }
    }
}

/// An accepted attachment point update.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedUpdate {
    /// The host that moved.
    pub host: Xid,
    /// The new record of the host.
    pub record: HostRecord,
    /// The record replaced by this update.
    pub previous: Option<HostRecord>,
}

/// Authenticates control messages and applies accepted ones to a [`HostDirectory`].
#[derive(Debug, Default)]
pub struct ControlMessageAuthenticator<V = Ed25519Verifier> {
    verifier: V,
}

impl<V: SignatureVerifier> ControlMessageAuthenticator<V> {
    /// Creates an authenticator using `verifier` for signatures.
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }

    /// Authenticates one control datagram and records the update it carries in `directory`.
    pub fn authenticate(
        &self,
        directory: &mut HostDirectory,
        datagram: &[u8],
    ) -> Result<AcceptedUpdate, AuthError> {
        let envelope = SignedControlMessage::decode(datagram)?;
        let message = envelope.inner()?;
        debug!(
            host = %message.host_identifier,
            dag = %message.attachment_dag,
            timestamp = message.timestamp,
            "Decoded control message"
        );

        let derived = Xid::host_from_public_key(&envelope.public_key);
        let host = message
            .host_identifier
            .parse::<Xid>()
            .ok()
            .filter(|declared| *declared == derived)
            .ok_or_else(|| {
                AuthError::IdentityMismatch {
                    declared: message.host_identifier.clone(),
                    derived,
                }
            })?;

        if !self
            .verifier
            .verify(&envelope.message, &envelope.signature, &envelope.public_key)
        {
            return Err(AuthError::InvalidSignature);
        }

        if let Some(previous) = directory.last_timestamp(&host) {
            if message.timestamp <= previous {
                return Err(AuthError::StaleTimestamp {
                    previous,
                    received: message.timestamp,
                });
            }
        }

        let attachment_domain = message
            .attachment_domain()
            .ok_or(AuthError::MissingAttachmentDomain)?
            .to_string();
        let record = HostRecord {
            attachment_domain,
            timestamp: message.timestamp,
        };
        let previous = directory.upsert(host, record.clone());
        info!(
            %host,
            attachment_domain = %record.attachment_domain,
            moved = previous.is_some(),
            "Accepted attachment point update"
        );

        Ok(AcceptedUpdate {
            host,
            record,
            previous,
        })
    }
}
