use passio_vault::VaultDocument;
use passio_vault::prelude::*;
use std::sync::Arc;

pub const USERNAME: &str = "john_doe";
pub const PASSWORD: &str = "correct horse battery staple";

/// Low iteration count keeps the suite fast; the vectors elsewhere cover the default.
#[must_use]
pub fn config() -> VaultConfig {
    VaultConfig { iterations: 10, ..VaultConfig::default() }
}

/// # Panics
/// * If the vault cannot be built.
#[must_use]
pub fn vault(store: &Arc<MemoryPersistence>, password: &str) -> Vault<MemoryPersistence> {
    Vault::builder()
        .username(USERNAME)
        .password(password)
        .config(config())
        .shared_persistence(Arc::clone(store))
        .build()
        .expect("vault setup failed")
}

/// A fresh store and a vault initialized on it.
/// # Panics
/// * If the vault cannot be initialized.
pub async fn ready_vault() -> (Arc<MemoryPersistence>, Vault<MemoryPersistence>) {
    let store = Arc::new(MemoryPersistence::new());
    let vault = vault(&store, PASSWORD);
    vault.init().await.expect("vault init failed");
    (store, vault)
}

/// The user-visible fields of each entry, for comparisons that ignore timestamps.
#[must_use]
pub fn visible(entries: &[Entry]) -> Vec<(u64, String, String, String, String)> {
    entries
        .iter()
        .map(|e| {
            (e.id, e.description.clone(), e.url.clone(), e.username.clone(), e.password.clone())
        })
        .collect()
}

/// Encrypts `document` under the fixture account's master password.
/// # Panics
/// * If the encryption service cannot be set up.
pub async fn seal(document: &VaultDocument) -> String {
    let service = passio_crypto::EncryptionService::builder()
        .password(PASSWORD)
        .iterations(config().iterations)
        .build()
        .expect("service setup failed");
    service.init().await.expect("service init failed");
    service.encrypt(document).expect("encrypt failed")
}
