//! The credential sealer
//!
//! [`Sealer`] binds a [`SecretSource`] to the sealing operations. It holds
//! no other state: every call loads the secret, derives a fresh key from a
//! fresh salt, and forgets both before returning. One `Sealer` can be shared
//! freely across threads.
//!
//! Each call runs 100k PBKDF2 rounds. Callers on latency-sensitive paths
//! should move the work onto a blocking worker pool.

use tracing::{debug, warn};

use crate::armor;
use crate::error::{CredsealError, ErrorKind, Result};
use crate::secret::{CachingSecret, ConstantSecret, EnvSecret, MasterSecret, SecretSource};
use crate::secretcrypt;

/// Seals and opens stored credentials under one master secret.
pub struct Sealer {
    source: Box<dyn SecretSource>,
}

impl Sealer {
    /// A sealer using a fixed, injected master secret.
    ///
    /// An empty secret is accepted here and reported by the first
    /// `encrypt`/`decrypt` call.
    pub fn new(secret: impl Into<MasterSecret>) -> Self {
        Self::with_source(ConstantSecret::new(secret))
    }

    /// A sealer asking `source` for the master secret on every call.
    pub fn with_source(source: impl SecretSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// A sealer reading `CREDSEAL_MASTER_SECRET` from the environment.
    ///
    /// Nothing is read until the first `encrypt`/`decrypt` call; the secret
    /// is cached after the first successful read.
    pub fn from_env() -> Self {
        Self::with_source(CachingSecret::new(Box::new(EnvSecret::new())))
    }

    /// Seal a plaintext credential, returning its stored text form.
    ///
    /// Sealing the same plaintext twice gives different results.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let secret = self.source.load()?;
        let sealed = secretcrypt::seal(secret.expose(), plaintext.as_bytes())?;
        debug!(sealed_len = sealed.len(), "sealed credential");
        Ok(armor::wrap(&sealed))
    }

    /// Open a stored value produced by [`Sealer::encrypt`].
    ///
    /// Returns the exact original plaintext or an error; malformed input,
    /// a wrong master secret and tampering all yield the same
    /// [`ErrorKind::Decryption`] error.
    pub fn decrypt(&self, blob: &str) -> Result<String> {
        let secret = self.source.load()?;
        let result = armor::unwrap(blob)
            .and_then(|sealed| secretcrypt::open(secret.expose(), &sealed))
            .and_then(|plaintext| {
                String::from_utf8(plaintext).map_err(|_| CredsealError::decryption())
            });

        match &result {
            Ok(_) => debug!(blob_len = blob.len(), "opened credential"),
            Err(e) if e.kind == ErrorKind::Decryption => {
                warn!(blob_len = blob.len(), "stored credential failed to open")
            }
            Err(_) => {}
        }
        result
    }

    /// See [`armor::looks_encrypted`].
    pub fn looks_encrypted(&self, value: &str) -> bool {
        armor::looks_encrypted(value)
    }
}
