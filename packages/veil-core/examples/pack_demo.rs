//! # Envelope Demo
//!
//! Two wallets exchanging packed messages:
//! 1. Create a DID in each wallet
//! 2. Authcrypt a message from Alice to Bob
//! 3. Anoncrypt a message to Bob
//! 4. Show that Alice cannot open Bob's mail
//!
//! ## Run
//!
//! ```bash
//! RUST_LOG=veil_core=debug cargo run --example pack_demo
//! ```

use veil_core::{DidMethod, KeyType, Wallet};

fn main() -> veil_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veil_core=info".into()),
        )
        .init();

    println!("=================================================");
    println!("              VEIL ENVELOPE DEMO");
    println!("=================================================\n");

    // =========================================================================
    // STEP 1: One DID per wallet
    // =========================================================================
    println!("1. Creating DIDs...\n");

    let alice = Wallet::in_memory();
    let bob = Wallet::in_memory();
    let alice_did = alice.create_local_did(DidMethod::Sov, KeyType::Ed25519, None, None, None)?;
    let bob_did = bob.create_local_did(DidMethod::Key, KeyType::Ed25519, None, None, None)?;

    println!("   Alice: {} ({})", alice_did.did, alice_did.verkey);
    println!("   Bob:   {} ({})", bob_did.did, bob_did.verkey);
    println!();

    // =========================================================================
    // STEP 2: Authcrypt
    // =========================================================================
    println!("2. Authcrypt from Alice to Bob...\n");

    let packed = alice.pack_message(
        b"Hi Bob, it's Alice",
        &[&bob_did.verkey],
        Some(&alice_did.verkey),
    )?;
    println!("   Envelope: {} bytes", packed.len());

    let unpacked = bob.unpack_message(&packed)?;
    println!("   Message:   {}", String::from_utf8_lossy(&unpacked.plaintext));
    println!("   Sender:    {:?}", unpacked.sender_verkey);
    println!("   Recipient: {}", unpacked.recipient_verkey);
    println!();

    // =========================================================================
    // STEP 3: Anoncrypt
    // =========================================================================
    println!("3. Anoncrypt to Bob...\n");

    let packed = alice.pack_message(b"Guess who", &[&bob_did.verkey], None)?;
    let unpacked = bob.unpack_message(&packed)?;
    println!("   Message: {}", String::from_utf8_lossy(&unpacked.plaintext));
    println!("   Sender:  {:?}", unpacked.sender_verkey);
    println!();

    // =========================================================================
    // STEP 4: Wrong wallet
    // =========================================================================
    println!("4. Alice tries to open Bob's envelope...\n");

    match alice.unpack_message(&packed) {
        Ok(_) => println!("   [FAILED] Alice opened it"),
        Err(e) => println!("   [OK] Rejected: {} (code {})", e, e.code()),
    }
    println!();

    println!("=== Example Complete ===");
    Ok(())
}
