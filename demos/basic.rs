//! Basic example: probe for legacy data, then register and read back credentials.
//!
//! Run with: `cargo run --example basic`

use std::sync::Arc;
use messenger_storage::{
    generate_password, IdentityStore, LegacyStoreProbe, MemoryDatabaseEngine, MemoryStore,
    SetCredentials,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::try_init().ok();

    let probe = LegacyStoreProbe::new(Arc::new(MemoryDatabaseEngine::new()));
    if probe.exists().await? {
        println!("Legacy database found; removing it.");
        probe.remove();
    } else {
        println!("No legacy database.");
    }

    let identity = IdentityStore::new(Arc::new(MemoryStore::new()));
    identity
        .on_credentials_change(|| println!("[Event] Credentials changed."))
        .await;

    identity
        .set_credentials(SetCredentials {
            identifier: Some(uuid::Uuid::new_v4().to_string()),
            number: "+15550001111".to_string(),
            device_id: 1,
            device_name: Some("Rust demo".to_string()),
            password: generate_password(),
        })
        .await?;

    let creds = identity.get_web_service_credentials();
    println!("Username: {}", creds.username);
    println!("Device id: {:?}", identity.get_device_id());

    identity.remove_credentials().await?;
    println!("Logged out: {}", identity.get_web_service_credentials().is_empty());

    Ok(())
}
