//! Demo flows, one per subcommand.

use std::fmt::Display;

use vetkeys_client::{
    Backend, Environment, Principal, StateViolation, TimelockState, VetKeyClient, VetKeyError,
};
use vetkeys_harness::{SimBackend, SimEnv};

use crate::system_env::SystemEnv;

/// Client as wired by the demo: simulated backend, real randomness.
pub type DemoClient = VetKeyClient<SimBackend, SystemEnv>;

#[allow(clippy::print_stdout)]
fn report(label: &str, value: impl Display) {
    println!("{label:>12}: {value}");
}

/// Fetch key material, encrypt `message` and decrypt it again.
pub async fn symmetric(client: &DemoClient, message: &str) -> Result<(), VetKeyError> {
    let material = client.fetch_derived_key_material().await?;
    report("context", &client.config().symmetric_context);

    let ciphertext = client.encrypt_symmetric(&material, message.as_bytes());
    report("ciphertext", &ciphertext);

    // A second fetch proves the key is stable for the caller.
    let again = client.fetch_derived_key_material().await?;
    let plaintext = client.decrypt_symmetric(&again, &ciphertext)?;
    report("decrypted", String::from_utf8_lossy(&plaintext));
    Ok(())
}

/// IBE-encrypt `message` to `recipient`; decrypt it when the recipient is
/// the caller.
pub async fn ibe(
    client: &DemoClient,
    recipient: &Principal,
    message: &str,
) -> Result<(), VetKeyError> {
    let ciphertext = client.ibe_encrypt(recipient, message.as_bytes()).await?;
    report("recipient", recipient);
    report("ciphertext", &ciphertext);

    if *recipient == client.backend().caller() {
        let plaintext = client.ibe_decrypt(&ciphertext).await?;
        report("decrypted", String::from_utf8_lossy(&plaintext));
    } else {
        report("decrypted", "skipped (recipient is not the caller)");
    }
    Ok(())
}

/// Create a timelock, show that it is locked, fast-forward the simulated
/// backend clock past the unlock time and decrypt.
pub async fn timelock(
    client: &DemoClient,
    backend_clock: &SimEnv,
    title: &str,
    content: &str,
    unlock_timestamp: u64,
) -> Result<(), VetKeyError> {
    let timelocks = client.timelocks();

    let created = timelocks.create_timelock(title, content, unlock_timestamp).await?;
    report("created", &created.id);
    report("unlocks at", created.unlock_timestamp);

    match timelocks.decrypt_timelock(&created.id).await {
        Err(VetKeyError::State { violation: StateViolation::Locked { .. }, .. }) => {
            report("status", "locked");
        },
        Err(err) => return Err(err),
        Ok(_) => tracing::warn!(record_id = %created.id, "timelock opened before its unlock time"),
    }

    let remaining = unlock_timestamp.saturating_sub(backend_clock.wall_clock_secs());
    backend_clock.advance(remaining);
    tracing::info!(secs = remaining, "advanced simulated backend clock");

    for entry in timelocks.list_timelocks().await? {
        let status = if entry.state == TimelockState::Unlockable { "unlockable" } else { "locked" };
        report("listed", format!("{} [{}] {status}", entry.id, entry.title));
    }

    let decrypted = timelocks.decrypt_timelock(&created.id).await?;
    report("decrypted", &decrypted.content);
    Ok(())
}
