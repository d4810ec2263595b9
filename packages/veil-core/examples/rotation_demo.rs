//! # Key Rotation Demo
//!
//! Rotating the key behind a sov DID stored in SQLite:
//! 1. Open an encrypted on-disk wallet
//! 2. Start a rotation
//! 3. Apply it
//! 4. Receive a message on the new key
//!
//! ## Run
//!
//! ```bash
//! cargo run --example rotation_demo
//! ```

use veil_core::crypto::StoreKey;
use veil_core::{DidMethod, KeyType, StorageConfig, Wallet, WalletConfig};

fn main() -> veil_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veil_core=info".into()),
        )
        .init();

    println!("=================================================");
    println!("             VEIL KEY ROTATION DEMO");
    println!("=================================================\n");

    // =========================================================================
    // STEP 1: Open the wallet
    // =========================================================================
    let dir = tempfile::tempdir().map_err(|e| veil_core::Error::StoreError(e.to_string()))?;
    let config = WalletConfig {
        storage: StorageConfig::Sqlite {
            path: dir.path().join("demo-wallet.db"),
        },
        store_key: Some(StoreKey::generate_base58()),
    };
    println!("1. Opening wallet at {:?}...\n", dir.path());

    let wallet = Wallet::open(&config)?;
    let did = wallet.create_local_did(DidMethod::Sov, KeyType::Ed25519, None, None, None)?;
    println!("   DID:    {}", did.did);
    println!("   Verkey: {}", did.verkey);
    println!();

    // =========================================================================
    // STEP 2: Start
    // =========================================================================
    println!("2. Starting rotation...\n");

    let next = wallet.rotate_did_keypair_start(&did.did, None)?;
    println!("   Next verkey: {}", next);
    println!("   State:       {:?}", wallet.rotation_state(&did.did)?);
    println!();

    // =========================================================================
    // STEP 3: Apply
    // =========================================================================
    println!("3. Applying rotation...\n");

    let rotated = wallet.rotate_did_keypair_apply(&did.did)?;
    println!("   Verkey: {}", rotated.verkey);
    println!("   State:  {:?}", wallet.rotation_state(&did.did)?);
    println!();

    // =========================================================================
    // STEP 4: Receive on the new key
    // =========================================================================
    println!("4. Receiving on the rotated key...\n");

    let packed = Wallet::in_memory().pack_message(b"Welcome back", &[&rotated.verkey], None)?;
    let unpacked = wallet.unpack_message(&packed)?;
    println!("   Message: {}", String::from_utf8_lossy(&unpacked.plaintext));
    println!(
        "   Owner:   {}",
        wallet.get_local_did_for_verkey(&unpacked.recipient_verkey)?.did
    );
    println!();

    println!("=== Example Complete ===");
    Ok(())
}
