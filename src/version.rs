//! Migration version minting and validation.

use chrono::{NaiveDateTime, Utc};

use crate::error::{MigrateError, MigrateResult};

/// Layout of migration versions: a UTC timestamp down to the second.
pub const VERSION_FORMAT: &str = "%Y%m%d%H%M%S";

/// Mint a new migration version from the current UTC time.
pub fn new_version() -> String {
    Utc::now().format(VERSION_FORMAT).to_string()
}

/// Check that `v` is a valid migration version.
pub fn check_version(v: &str) -> MigrateResult<()> {
    // %Y accepts variable-width years; the layout is exactly 14 digits.
    if v.len() == 14 && NaiveDateTime::parse_from_str(v, VERSION_FORMAT).is_ok() {
        return Ok(());
    }
    Err(MigrateError::InvalidVersion { value: v.to_string(), expected: VERSION_FORMAT })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_versions_validate() {
        let v = new_version();
        assert_eq!(v.len(), 14);
        check_version(&v).unwrap();
    }

    #[test]
    fn known_good_versions_validate() {
        check_version("20240102150405").unwrap();
        check_version("19991231235959").unwrap();
    }

    #[test]
    fn deviations_are_rejected() {
        for v in ["", "2024", "2024010215040", "202401021504055", "2024010215040x", "20241301000000", "20240132000000", "20240102250405"] {
            let err = check_version(v).unwrap_err();
            assert!(matches!(err, MigrateError::InvalidVersion { .. }), "{v:?}");
            assert!(err.to_string().contains(VERSION_FORMAT));
        }
    }
}
