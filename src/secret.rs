//! Master secret handling
//!
//! The master secret is never looked up globally. A [`SecretSource`] is
//! handed to the [`Sealer`](crate::Sealer), which asks it for the secret on
//! every call. Sources report an absent or empty secret as a configuration
//! error, so the problem surfaces at first use rather than at startup.

use std::fmt;
use std::io::{self, IsTerminal, Read, Write};
use std::sync::{Mutex, OnceLock};

use zeroize::Zeroizing;

use crate::config::{MASTER_SECRET_VAR, Settings};
use crate::error::{CredsealError, ErrorCategory, ErrorKind, Result};

/// The long-lived secret every per-value key is derived from.
///
/// The bytes are wiped from memory when the last copy is dropped and are
/// never shown by `Debug`.
#[derive(Clone)]
pub struct MasterSecret(Zeroizing<Vec<u8>>);

impl MasterSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret([redacted])")
    }
}

impl From<&str> for MasterSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret.as_bytes())
    }
}

impl From<String> for MasterSecret {
    fn from(secret: String) -> Self {
        Self::new(secret.into_bytes())
    }
}

impl From<Vec<u8>> for MasterSecret {
    fn from(secret: Vec<u8>) -> Self {
        Self::new(secret)
    }
}

/// Trait for obtaining the master secret from various places
pub trait SecretSource: Send + Sync {
    /// Return the master secret, or a configuration error if none is
    /// available.
    fn load(&self) -> Result<MasterSecret>;
}

fn ensure_present(secret: MasterSecret, origin: &str) -> Result<MasterSecret> {
    if secret.is_empty() {
        return Err(CredsealError::configuration(format!(
            "master secret from {} is empty",
            origin
        )));
    }
    Ok(secret)
}

/// Returns a fixed secret (injected configuration, tests)
pub struct ConstantSecret {
    secret: MasterSecret,
}

impl ConstantSecret {
    pub fn new(secret: impl Into<MasterSecret>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl SecretSource for ConstantSecret {
    fn load(&self) -> Result<MasterSecret> {
        ensure_present(self.secret.clone(), "configuration")
    }
}

/// Reads the secret from `CREDSEAL_MASTER_SECRET`
#[derive(Default)]
pub struct EnvSecret {
    vars: Option<config::Map<String, String>>,
}

impl EnvSecret {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve against an explicit variable map rather than the process
    /// environment.
    pub fn with_vars(vars: config::Map<String, String>) -> Self {
        Self { vars: Some(vars) }
    }
}

impl SecretSource for EnvSecret {
    fn load(&self) -> Result<MasterSecret> {
        let settings = match &self.vars {
            Some(vars) => Settings::from_vars(vars.clone())?,
            None => Settings::from_env()?,
        };
        let secret = settings.master_secret.ok_or_else(|| {
            CredsealError::configuration(format!("{} is not set", MASTER_SECRET_VAR))
        })?;
        ensure_present(MasterSecret::from(secret), MASTER_SECRET_VAR)
    }
}

/// Reads the secret from any io::Read source, e.g. stdin
///
/// A single trailing newline is dropped so `echo secret | credseal ...`
/// works as expected. The reader is drained by the first load; wrap this
/// in a [`CachingSecret`] when the secret is needed more than once.
pub struct ReaderSecret {
    reader: Mutex<Box<dyn Read + Send>>,
}

impl ReaderSecret {
    pub fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }
}

impl SecretSource for ReaderSecret {
    fn load(&self) -> Result<MasterSecret> {
        let mut reader = self.reader.lock().map_err(|_| {
            CredsealError::new(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "secret reader lock poisoned",
            )
        })?;
        let mut data = Zeroizing::new(Vec::new());
        reader.read_to_end(&mut data).map_err(|e| {
            CredsealError::io(
                ErrorCategory::Internal,
                format!("error reading master secret: {}", e),
                e,
            )
        })?;
        if data.last() == Some(&b'\n') {
            data.pop();
            if data.last() == Some(&b'\r') {
                data.pop();
            }
        }
        ensure_present(MasterSecret::new(data.as_slice()), "reader")
    }
}

/// Prompts for the secret on the terminal with no echo
///
/// Terminal input is limited to UTF-8 by rpassword; use [`ReaderSecret`]
/// for arbitrary bytes.
#[derive(Default)]
pub struct TerminalSecret;

impl TerminalSecret {
    pub fn new() -> Self {
        Self
    }
}

impl SecretSource for TerminalSecret {
    fn load(&self) -> Result<MasterSecret> {
        if !io::stdin().is_terminal() {
            return Err(CredsealError::configuration(
                "cannot prompt for master secret - stdin is not a terminal",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(b"Master secret (credseal): ")
            .and_then(|()| stderr.flush())
            .map_err(|e| {
                CredsealError::io(
                    ErrorCategory::Internal,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;

        let secret = rpassword::read_password().map_err(|e| {
            CredsealError::io(
                ErrorCategory::Internal,
                format!("failure reading master secret: {}", e),
                e,
            )
        })?;

        ensure_present(MasterSecret::from(secret), "terminal")
    }
}

/// Wraps another SecretSource and caches the result
///
/// Provides "at most once" semantics for successful loads: the upstream is
/// consulted until it first succeeds, and the cached secret is returned from
/// then on. Failures are not cached.
pub struct CachingSecret {
    upstream: Box<dyn SecretSource>,
    cached: OnceLock<MasterSecret>,
}

impl CachingSecret {
    pub fn new(upstream: Box<dyn SecretSource>) -> Self {
        Self {
            upstream,
            cached: OnceLock::new(),
        }
    }
}

impl SecretSource for CachingSecret {
    fn load(&self) -> Result<MasterSecret> {
        if let Some(secret) = self.cached.get() {
            return Ok(secret.clone());
        }
        let secret = self.upstream.load()?;
        // Another thread may have won the race; either value is the same secret.
        Ok(self.cached.get_or_init(|| secret).clone())
    }
}
