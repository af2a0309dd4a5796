//! Token derivation: seed vs. dated "active" token.
//!
//! A *seed* token is the user-supplied stable identifier (e.g. `build1234`).
//! An *active* token is `<seed>_YYYY_MM_DD_HH_MM_SS`. Re-derivation strips
//! an existing date suffix before re-dating, so re-deriving from an already
//! active token is idempotent modulo the date itself.

use chrono::{DateTime, NaiveDateTime, Utc};

const DATE_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Find the index (in underscore-separated parts) where a trailing date
/// suffix begins, if `token` ends in one.
fn date_suffix_boundary(token: &str) -> Option<usize> {
    let parts: Vec<&str> = token.split('_').collect();
    if parts.len() <= 6 {
        return None;
    }
    let suffix = parts[parts.len() - 6..].join("_");
    NaiveDateTime::parse_from_str(&suffix, DATE_FORMAT)
        .ok()
        .map(|_| parts.len() - 6)
}

/// Whether `token` already carries a trailing active-token date suffix
#[must_use]
pub fn is_dated(token: &str) -> bool {
    date_suffix_boundary(token).is_some()
}

/// Strip a trailing active-token date suffix, returning the seed prefix.
/// If `token` has no such suffix, it is returned unchanged.
#[must_use]
pub fn strip_date_suffix(token: &str) -> String {
    match date_suffix_boundary(token) {
        Some(boundary) => token.split('_').take(boundary).collect::<Vec<_>>().join("_"),
        None => token.to_owned(),
    }
}

/// Derive the active token for a seed at a given instant.
///
/// If `seed` already has an active date suffix it is stripped and
/// re-dated; otherwise the current date is appended.
#[must_use]
pub fn derive_active_token(seed: &str, now: DateTime<Utc>) -> String {
    let prefix = strip_date_suffix(seed);
    format!("{prefix}_{}", now.format(DATE_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 28, 10, 30, 0).unwrap()
    }

    #[test]
    fn derives_dated_token_from_plain_seed() {
        let active = derive_active_token("build1234", fixed_time());
        assert_eq!(active, "build1234_2026_07_28_10_30_00");
    }

    #[test]
    fn seed_with_underscores_is_preserved() {
        let active = derive_active_token("my_build_1234", fixed_time());
        assert_eq!(active, "my_build_1234_2026_07_28_10_30_00");
    }

    #[test]
    fn re_derivation_is_idempotent_modulo_date() {
        let first = derive_active_token("t", fixed_time());
        let later = Utc.with_ymd_and_hms(2026, 7, 28, 11, 0, 0).unwrap();
        let second = derive_active_token(&first, later);
        assert_eq!(strip_date_suffix(&second), "t");
        assert_eq!(second, "t_2026_07_28_11_00_00");
    }

    #[test]
    fn re_derivation_from_same_instant_is_stable() {
        let first = derive_active_token("t", fixed_time());
        let second = derive_active_token(&first, fixed_time());
        assert_eq!(first, second);
    }

    #[test]
    fn is_dated_detects_suffix() {
        assert!(!is_dated("build1234"));
        assert!(is_dated("build1234_2026_07_28_10_30_00"));
    }
}
