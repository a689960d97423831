//! Runtime-selected cipher backends.
//!
//! Two interchangeable implementations produce byte-identical output:
//!
//! * [`Backend::Provider`] uses the RustCrypto mode-level crates (`pbkdf2`, `cbc`).
//! * [`Backend::Portable`] composes the raw AES block cipher and HMAC-SHA1 by hand.
//!
//! A capability probe runs once per process. It checks OS randomness and known-answer
//! vectors for each backend; concurrent callers share the same in-flight probe.

mod portable;
mod provider;

use crate::error::CryptoError;
use crate::mac::{MAC_LEN, hmac_sha1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// AES block and IV length in bytes.
pub const BLOCK_LEN: usize = 16;

static PROBE: OnceCell<ProbeReport> = OnceCell::const_new();
static PROBE_RUNS: AtomicUsize = AtomicUsize::new(0);

/// A concrete implementation of the vault primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Provider,
    Portable,
}

/// Which backend a service should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// The provider backend when it passes the probe, otherwise the portable one.
    #[default]
    Auto,
    Provider,
    Portable,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Provider => "provider",
            Self::Portable => "portable",
        })
    }
}

impl Backend {
    /// Runs PBKDF2-HMAC-SHA1, filling `out`.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidConfiguration`] if `iterations` is zero.
    pub fn derive_key(
        self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        out: &mut [u8],
    ) -> Result<(), CryptoError> {
        if iterations == 0 {
            return Err(CryptoError::InvalidConfiguration {
                message: "PBKDF2 iteration count must be at least 1".into(),
                context: None,
            });
        }
        match self {
            Self::Provider => {
                provider::derive_key(password, salt, iterations, out);
                Ok(())
            },
            Self::Portable => portable::derive_key(password, salt, iterations, out),
        }
    }

    /// Encrypts with AES-256-CBC and PKCS#7 padding.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidConfiguration`] if the key is rejected by the cipher.
    pub fn encrypt_cbc(
        self,
        key: &[u8],
        iv: &[u8; BLOCK_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        match self {
            Self::Provider => provider::encrypt_cbc(key, iv, plaintext),
            Self::Portable => portable::encrypt_cbc(key, iv, plaintext),
        }
    }

    /// Decrypts AES-256-CBC and strips PKCS#7 padding.
    ///
    /// # Errors
    /// Returns [`CryptoError::DecryptionFailed`] if the ciphertext length or the padding is
    /// invalid.
    pub fn decrypt_cbc(
        self,
        key: &[u8],
        iv: &[u8; BLOCK_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        match self {
            Self::Provider => provider::decrypt_cbc(key, iv, ciphertext),
            Self::Portable => portable::decrypt_cbc(key, iv, ciphertext),
        }
    }

    /// Computes HMAC-SHA1. Both backends share the same MAC.
    ///
    /// # Errors
    /// Returns [`CryptoError::Internal`] if the MAC rejects the key.
    pub fn hmac_sha1(self, key: &[u8], message: &[u8]) -> Result<[u8; MAC_LEN], CryptoError> {
        hmac_sha1(key, &[message])
    }
}

/// Outcome of the process-wide capability probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub rng: bool,
    pub provider: bool,
    pub portable: bool,
}

impl ProbeReport {
    /// Names of the capabilities that failed their checks.
    #[must_use]
    pub fn unsupported(&self) -> Vec<&'static str> {
        [("rng", self.rng), ("provider", self.provider), ("portable", self.portable)]
            .into_iter()
            .filter_map(|(name, ok)| (!ok).then_some(name))
            .collect()
    }

    /// Picks a backend for the given preference.
    ///
    /// # Errors
    /// Returns [`CryptoError::UnsupportedEnvironment`] when the requested backend (or, for
    /// [`BackendPreference::Auto`], every backend) failed the probe.
    pub fn select(&self, preference: BackendPreference) -> Result<Backend, CryptoError> {
        let selected = match preference {
            BackendPreference::Auto if self.provider => Some(Backend::Provider),
            BackendPreference::Auto if self.portable => Some(Backend::Portable),
            BackendPreference::Provider if self.provider => Some(Backend::Provider),
            BackendPreference::Portable if self.portable => Some(Backend::Portable),
            _ => None,
        };

        selected.ok_or_else(|| CryptoError::UnsupportedEnvironment {
            message: format!("unsupported: {}", self.unsupported().join(", ")).into(),
            context: Some(format!("{preference:?} backend requested").into()),
        })
    }
}

/// Returns the memoized capability report, running the probe on first use.
///
/// The probe executes known-answer checks on a blocking worker thread.
pub async fn probe() -> ProbeReport {
    *PROBE
        .get_or_init(|| async {
            let report = tokio::task::spawn_blocking(run_probe).await.unwrap_or_else(|err| {
                warn!(error = %err, "Backend probe task failed");
                ProbeReport::default()
            });

            if report.provider {
                info!(?report, "Backend probe finished");
            } else {
                warn!(?report, unsupported = ?report.unsupported(), "Provider backend unavailable");
            }
            report
        })
        .await
}

/// How many times the probe has actually executed in this process.
#[must_use]
pub fn probe_runs() -> usize {
    PROBE_RUNS.load(Ordering::Relaxed)
}

fn run_probe() -> ProbeReport {
    PROBE_RUNS.fetch_add(1, Ordering::Relaxed);

    let mut iv = [0u8; BLOCK_LEN];
    let rng = getrandom::fill(&mut iv).is_ok();

    ProbeReport {
        rng,
        provider: rng && known_answers(Backend::Provider),
        portable: rng && known_answers(Backend::Portable),
    }
}

// RFC 6070, c = 2.
const KAT_PBKDF2: &str = "ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957";
// NIST SP 800-38A F.2.5, first block.
const KAT_CBC_KEY: &str = "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4";
const KAT_CBC_PLAIN: &str = "6bc1bee22e409f96e93d7e117393172a";
const KAT_CBC_CIPHER: &str = "f58c4c04d6e5f1ba779eabfb5f7bfbd6";
// RFC 2202, test case 2.
const KAT_HMAC: &str = "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79";

fn known_answers(backend: Backend) -> bool {
    let checks = || -> Result<bool, Box<dyn std::error::Error>> {
        let mut derived = [0u8; 20];
        backend.derive_key(b"password", b"salt", 2, &mut derived)?;
        let pbkdf2_ok = hex::encode(derived) == KAT_PBKDF2;

        let key = hex::decode(KAT_CBC_KEY)?;
        let plain = hex::decode(KAT_CBC_PLAIN)?;
        let iv: [u8; BLOCK_LEN] = std::array::from_fn(|i| u8::try_from(i).unwrap_or_default());
        let sealed = backend.encrypt_cbc(&key, &iv, &plain)?;
        let opened = backend.decrypt_cbc(&key, &iv, &sealed)?;
        let cbc_ok = sealed.get(..BLOCK_LEN).map(hex::encode).as_deref() == Some(KAT_CBC_CIPHER)
            && opened == plain;

        let tag = backend.hmac_sha1(b"Jefe", b"what do ya want for nothing?")?;
        let hmac_ok = hex::encode(tag) == KAT_HMAC;

        Ok(pbkdf2_ok && cbc_ok && hmac_ok)
    };

    match checks() {
        Ok(passed) => passed,
        Err(err) => {
            warn!(%backend, error = %err, "Backend self-test errored");
            false
        },
    }
}
