//! Reference naming: the fixed layout used by the sync and git-style
//! validation of arbitrary names.
//!
//! Valid names:
//! - Must be non-empty
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` or `@{`
//! - Must not end with `.lock` or `/`
//! - Components between slashes must be non-empty and not start with `.`

use aus_types::AccountId;

use crate::error::{RefError, Result};

/// Prefix under which every per-account reference lives.
pub const ACCOUNTS_PREFIX: &str = "accounts/";

/// The single shared reference for the external-identity ledger.
pub const EXTERNAL_IDS_REF: &str = "external-identities";

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// Reference name for an account: `accounts/<id mod 100, 2 digits>/<id>`.
///
/// ```
/// use aus_refs::names::account_ref_name;
/// use aus_types::AccountId;
///
/// assert_eq!(account_ref_name(AccountId::new(7)), "accounts/07/7");
/// assert_eq!(account_ref_name(AccountId::new(1000096)), "accounts/96/1000096");
/// ```
pub fn account_ref_name(id: AccountId) -> String {
    format!("{ACCOUNTS_PREFIX}{:02}/{}", id.shard(), id)
}

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a reference name, returning `Ok(())` if valid.
///
/// Names double as relative paths in the filesystem store, so anything that
/// could escape the refs directory is rejected.
pub fn validate_ref_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "ref name must not be empty"));
    }
    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| name.contains(**ch)) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_layout() {
        assert_eq!(account_ref_name(AccountId::new(0)), "accounts/00/0");
        assert_eq!(account_ref_name(AccountId::new(7)), "accounts/07/7");
        assert_eq!(account_ref_name(AccountId::new(1234)), "accounts/34/1234");
    }

    #[test]
    fn layout_names_are_valid() {
        assert!(validate_ref_name(&account_ref_name(AccountId::new(42))).is_ok());
        assert!(validate_ref_name(EXTERNAL_IDS_REF).is_ok());
    }

    #[test]
    fn reject_empty_and_traversal() {
        assert!(validate_ref_name("").is_err());
        assert!(validate_ref_name("accounts/../escape").is_err());
        assert!(validate_ref_name("/absolute").is_err());
        assert!(validate_ref_name("trailing/").is_err());
        assert!(validate_ref_name("a//b").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        for bad in ["a b", "a~b", "a^b", "a:b", "a?b", "a*b", "a[b", "a\\b", "a\nb"] {
            assert!(validate_ref_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn reject_hidden_components_and_lock() {
        assert!(validate_ref_name(".hidden").is_err());
        assert!(validate_ref_name("accounts/.tmpXYZ").is_err());
        assert!(validate_ref_name("external-identities.lock").is_err());
        assert!(validate_ref_name("ref@{0}").is_err());
    }
}
