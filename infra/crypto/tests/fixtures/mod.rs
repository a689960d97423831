use passio_crypto::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub next_id: u64,
    pub labels: Vec<String>,
}

impl Document {
    #[must_use]
    pub fn sample() -> Self {
        Self { next_id: 3, labels: vec!["mail".to_owned(), "bank ✓".to_owned()] }
    }
}

/// Builds and initializes a service for `password` on the given backend.
/// # Panics
/// * If the service cannot be built or initialized.
pub async fn service(password: &str, backend: BackendPreference) -> EncryptionService {
    let service = EncryptionService::builder()
        .password(password)
        .backend(backend)
        .build()
        .expect("service setup failed");
    service.init().await.expect("service init failed");
    service
}
