//! Namespaced key layout.
//!
//! Key format in the medium: `{encoded_namespace}:{key}`. The namespace is percent-encoded,
//! so it never contains the separator and two namespaces can never share a prefix.

use trellis_core::constants::NAMESPACE_SEPARATOR;

use crate::{StorageError, StorageResult};

/// Medium-level prefix shared by every key of `namespace`.
pub(crate) fn namespace_prefix(namespace: &str) -> StorageResult<String> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidNamespace(
            "namespace must not be empty".to_string(),
        ));
    }
    Ok(format!(
        "{}{}",
        urlencoding::encode(namespace),
        NAMESPACE_SEPARATOR
    ))
}

pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_escapes_separator() {
        assert_eq!(namespace_prefix("app-x").unwrap(), "app-x:");
        assert_eq!(namespace_prefix("a:b").unwrap(), "a%3Ab:");
    }

    #[test]
    fn nested_namespaces_do_not_collide() {
        // key "b:x" in namespace "a" must not alias key "x" in namespace "a:b"
        let outer = format!("{}{}", namespace_prefix("a").unwrap(), "b:x");
        let inner = format!("{}{}", namespace_prefix("a:b").unwrap(), "x");
        assert_ne!(outer, inner);
        assert!(!inner.starts_with(&namespace_prefix("a").unwrap()));
    }

    #[test]
    fn rejects_empty_namespace_and_key() {
        assert!(matches!(
            namespace_prefix(""),
            Err(StorageError::InvalidNamespace(_))
        ));
        assert!(matches!(validate_key(""), Err(StorageError::InvalidKey(_))));
    }
}
