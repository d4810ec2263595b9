//! Two-phase key rotation for local DIDs.
//!
//! ```text
//!   Active ──rotate_did_keypair_start──► PendingRotation { next_verkey }
//!     ▲                                        │
//!     └──────────rotate_did_keypair_apply──────┘
//! ```
//!
//! Starting stores the new keypair and records its verkey under
//! `metadata.next_verkey`. Applying swaps it in and clears the marker.
//! Starting again before applying replaces the pending key. Both steps
//! hold the DID record lock for their whole read-modify-write.

use tracing::{info, warn};

use super::{fetch_did_for_update, write_did, Wallet};
use crate::crypto::{KeyType, LocalKey};
use crate::error::{Error, Result};
use crate::identity::{DidInfo, DidMethod, NEXT_VERKEY};
use crate::storage::Tags;

/// Where a DID is in its rotation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationState {
    /// No rotation in progress
    Active,
    /// A next key has been generated but not applied
    PendingRotation {
        /// Verkey that will replace the current one
        next_verkey: String,
    },
}

impl RotationState {
    /// Rotation state recorded on a DID
    pub fn of(info: &DidInfo) -> Self {
        match info.next_verkey() {
            Some(next_verkey) => Self::PendingRotation {
                next_verkey: next_verkey.to_string(),
            },
            None => Self::Active,
        }
    }
}

impl Wallet {
    /// Current rotation state of a local DID
    pub fn rotation_state(&self, did: &str) -> Result<RotationState> {
        Ok(RotationState::of(&self.get_local_did(did)?))
    }

    /// Generate the next keypair for `did` and mark the rotation pending
    ///
    /// Returns the new verkey. The DID keeps its current verkey until
    /// [`Wallet::rotate_did_keypair_apply`].
    pub fn rotate_did_keypair_start(&self, did: &str, next_seed: Option<&str>) -> Result<String> {
        let method = DidMethod::from_did(did)?;
        if !method.supports_rotation() {
            return Err(Error::RotationNotSupported(format!(
                "DID method '{}' does not support key rotation",
                method
            )));
        }

        let mut session = self.session()?;
        let (entry, mut info) = fetch_did_for_update(session.as_mut(), did)?;

        let key = LocalKey::generate(KeyType::Ed25519, next_seed)?;
        let next_verkey = key.verkey();
        match session.insert_key(&next_verkey, &key, Some("{}"), &Tags::new()) {
            Err(e) if e.is_duplicate() => {
                warn!(%did, %next_verkey, "Next key already present in wallet");
            }
            other => other?,
        }

        info.metadata
            .insert(NEXT_VERKEY.to_string(), next_verkey.clone().into());
        write_did(session.as_mut(), &info, &entry.tags)?;
        session.commit()?;

        info!(%did, %next_verkey, "Key rotation started");
        Ok(next_verkey)
    }

    /// Make the pending verkey the DID's current verkey
    ///
    /// `RotationNotStarted` if no rotation is pending.
    pub fn rotate_did_keypair_apply(&self, did: &str) -> Result<DidInfo> {
        let mut session = self.session()?;
        let (entry, mut info) = fetch_did_for_update(session.as_mut(), did)?;

        let next_verkey = match RotationState::of(&info) {
            RotationState::PendingRotation { next_verkey } => next_verkey,
            RotationState::Active => {
                return Err(Error::RotationNotStarted(format!(
                    "No key rotation in progress for DID {}",
                    did
                )))
            }
        };
        if session.fetch_key(&next_verkey, false)?.is_none() {
            return Err(Error::NotFound(format!(
                "Next verkey for DID {} is not in the wallet",
                did
            )));
        }

        let previous = std::mem::replace(&mut info.verkey, next_verkey);
        info.metadata.remove(NEXT_VERKEY);
        write_did(session.as_mut(), &info, &entry.tags)?;
        session.commit()?;

        info!(%did, %previous, verkey = %info.verkey, "Key rotation applied");
        Ok(info)
    }
}

// ============================================================================
// TESTS
// ============================================================================
