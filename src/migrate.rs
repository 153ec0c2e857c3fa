//! One-time migration of legacy plaintext credentials
//!
//! Values stored before sealing was introduced sit next to sealed ones. A
//! value that already looks sealed is left alone; anything else is sealed.
//! The check is heuristic, see [`looks_encrypted`](crate::armor::looks_encrypted).

use tracing::debug;

use crate::armor;
use crate::error::Result;
use crate::sealer::Sealer;

/// Outcome of migrating one stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Migrated {
    /// The value already had the sealed shape and was not touched.
    AlreadySealed,
    /// The value was plaintext; this is its sealed replacement.
    Sealed(String),
}

/// Counts from migrating a batch of values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub sealed: usize,
    pub already_sealed: usize,
    pub empty: usize,
}

pub fn migrate_value(sealer: &Sealer, value: &str) -> Result<Migrated> {
    if armor::looks_encrypted(value) {
        return Ok(Migrated::AlreadySealed);
    }
    Ok(Migrated::Sealed(sealer.encrypt(value)?))
}

/// Migrate newline-separated stored values, one per line.
///
/// Line endings (`\n` or `\r\n`) are preserved exactly and empty lines are
/// kept as they are. Returns the rewritten text and what was done to it.
pub fn migrate_lines(sealer: &Sealer, text: &str) -> Result<(String, MigrationReport)> {
    let mut report = MigrationReport::default();
    let mut output = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        let (value, ending) = split_line_ending(line);
        if value.is_empty() {
            report.empty += 1;
            output.push_str(line);
            continue;
        }
        match migrate_value(sealer, value)? {
            Migrated::AlreadySealed => {
                report.already_sealed += 1;
                output.push_str(value);
            }
            Migrated::Sealed(blob) => {
                report.sealed += 1;
                output.push_str(&blob);
            }
        }
        output.push_str(ending);
    }

    debug!(
        sealed = report.sealed,
        already_sealed = report.already_sealed,
        "migrated stored credentials"
    );
    Ok((output, report))
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(value) = line.strip_suffix("\r\n") {
        (value, "\r\n")
    } else if let Some(value) = line.strip_suffix('\n') {
        (value, "\n")
    } else {
        (line, "")
    }
}
