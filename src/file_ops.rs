//! File sealing, opening and migration
//!
//! High-level operations used by the `credseal` tool. Every file written
//! here is created with mode 0o600 on Unix systems.

use crate::error::{CredsealError, ErrorCategory, ErrorKind, Result};
use crate::migrate::{self, MigrationReport};
use crate::sealer::Sealer;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Seal the credential stored in a file
///
/// Reads the UTF-8 plaintext from `input_path` verbatim and writes its
/// sealed text form to `output_path`.
pub fn encrypt_file(input_path: &Path, output_path: &Path, sealer: &Sealer) -> Result<()> {
    let plaintext = read_utf8(input_path)?;
    let blob = sealer
        .encrypt(&plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, blob.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    Ok(())
}

/// Open a sealed credential stored in a file
///
/// Surrounding whitespace (such as a trailing newline added by an editor)
/// is ignored; the sealed text form never contains any.
pub fn decrypt_file(input_path: &Path, output_path: &Path, sealer: &Sealer) -> Result<()> {
    let blob = read_utf8(input_path)?;
    let plaintext = sealer
        .decrypt(blob.trim())
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_secure(output_path, plaintext.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    Ok(())
}

/// Report whether a file's contents look like a sealed value
///
/// Whitespace is trimmed the same way [`decrypt_file`] trims it, so any
/// file that opens also checks as sealed.
pub fn check_file(input_path: &Path) -> Result<bool> {
    let value = read_utf8(input_path)?;
    Ok(crate::armor::looks_encrypted(value.trim()))
}

/// Migrate a file of stored credentials, one per line, in place
///
/// This function:
/// 1. Reads every line of `path`
/// 2. Seals each non-empty line that does not already look sealed
/// 3. Atomically replaces `path` (tempfile + fsync + rename)
///
/// The atomic write ensures that either the old file or the new file exists,
/// never a partial one. Nothing is written when every line was already
/// sealed.
pub fn migrate_file(path: &Path, sealer: &Sealer) -> Result<MigrationReport> {
    let text = read_utf8(path)?;
    let (migrated, report) =
        migrate::migrate_lines(sealer, &text).map_err(|e| e.with_context("failed to migrate"))?;

    if report.sealed == 0 {
        return Ok(report);
    }

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| CredsealError::io(ErrorCategory::Internal, "failed to create tempfile", e))?;

    temp_file
        .write_all(migrated.as_bytes())
        .map_err(|e| CredsealError::io(ErrorCategory::Internal, "failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| CredsealError::io(ErrorCategory::Internal, "failed to flush tempfile", e))?;
    temp_file.as_file().sync_all().map_err(|e| {
        CredsealError::io(
            ErrorCategory::Internal,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = temp_file
            .as_file()
            .metadata()
            .map_err(|e| {
                CredsealError::io(
                    ErrorCategory::Internal,
                    "failed to get tempfile metadata",
                    e,
                )
            })?
            .permissions();
        perms.set_mode(0o600);
        temp_file.as_file().set_permissions(perms).map_err(|e| {
            CredsealError::io(
                ErrorCategory::Internal,
                "failed to set tempfile permissions",
                e,
            )
        })?;
    }
    temp_file.persist(path).map_err(|e| {
        CredsealError::io(
            ErrorCategory::Internal,
            format!("failed to rename to target file {}", path.display()),
            e.error,
        )
    })?;

    Ok(report)
}

fn read_utf8(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        CredsealError::with_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("{} is not valid UTF-8", path.display()),
            e.utf8_error(),
        )
    })
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| {
                CredsealError::io(
                    ErrorCategory::User,
                    format!("failed to open {}", path.display()),
                    e,
                )
            })?;

        file.write_all(contents).map_err(|e| {
            CredsealError::io(
                ErrorCategory::Internal,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| {
            CredsealError::io(
                ErrorCategory::User,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }
}

fn read_error(path: &Path, err: io::Error) -> CredsealError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    CredsealError::io(
        category,
        format!("failed to read from {}", path.display()),
        err,
    )
}
