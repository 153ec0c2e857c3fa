//! credseal - at-rest encryption for stored account credentials
//!
//! Each value is sealed with AES-256-GCM under a key derived with PBKDF2
//! from a master secret and a fresh random salt. The result is a single
//! base64 string that can be stored in place of the plaintext.
//!
//! ```no_run
//! use credseal::Sealer;
//!
//! # fn main() -> credseal::Result<()> {
//! let sealer = Sealer::new("master secret from configuration");
//! let stored = sealer.encrypt("imap-pass-123")?;
//! assert_eq!(sealer.decrypt(&stored)?, "imap-pass-123");
//! assert!(credseal::looks_encrypted(&stored));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod armor;
pub mod config;
pub mod error;
pub mod file_ops;
pub mod migrate;
pub mod sealer;
pub mod secret;
pub mod secretcrypt;

pub use armor::looks_encrypted;
pub use error::{CredsealError, ErrorCategory, ErrorKind, Result};
pub use sealer::Sealer;
pub use secret::MasterSecret;
