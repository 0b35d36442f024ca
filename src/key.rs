//! Cache key derivation
//!
//! A key is the SHA-256 of a small JSON document describing what was rendered
//! and at which sizes. Fields are written in sorted order, so the document,
//! and therefore the key, only depends on the field values.

use crate::{CacheError, ScreenshotKind, WindowSize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(
        kind: ScreenshotKind,
        digest: &str,
        window_size: WindowSize,
        thumb_size: WindowSize,
    ) -> Self {
        let material = key_material(kind, digest, window_size, thumb_size);
        Self(format!("{:x}", Sha256::digest(material.to_string().as_bytes())))
    }

    /// Wrap a previously derived key, e.g. one read back from a job queue.
    pub fn parse(key: &str) -> Result<Self, CacheError> {
        let is_hex = key.len() == 64 && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !is_hex {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The field mapping hashed into a [`CacheKey`].
pub fn key_material(
    kind: ScreenshotKind,
    digest: &str,
    window_size: WindowSize,
    thumb_size: WindowSize,
) -> Value {
    let fields = BTreeMap::from([
        ("thumbnail_type", json!(kind.thumbnail_type())),
        ("digest", json!(digest)),
        ("type", json!("thumb")),
        ("window_size", json!([window_size.width, window_size.height])),
        ("thumb_size", json!([thumb_size.width, thumb_size.height])),
    ]);

    Value::Object(
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: WindowSize = WindowSize::new(800, 600);
    const THUMB: WindowSize = WindowSize::new(400, 300);

    #[test]
    fn same_inputs_same_key() {
        let a = CacheKey::derive(ScreenshotKind::Chart, "abc123", WINDOW, THUMB);
        let b = CacheKey::derive(ScreenshotKind::Chart, "abc123", WINDOW, THUMB);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn every_field_changes_the_key() {
        let base = CacheKey::derive(ScreenshotKind::Chart, "abc123", WINDOW, THUMB);
        let variants = [
            CacheKey::derive(ScreenshotKind::Dashboard, "abc123", WINDOW, THUMB),
            CacheKey::derive(ScreenshotKind::Chart, "abc124", WINDOW, THUMB),
            CacheKey::derive(ScreenshotKind::Chart, "abc123", WindowSize::new(800, 601), THUMB),
            CacheKey::derive(ScreenshotKind::Chart, "abc123", WINDOW, WindowSize::new(300, 400)),
        ];
        for variant in variants {
            assert_ne!(base, variant);
        }
    }

    #[test]
    fn window_and_thumb_are_not_interchangeable() {
        let a = CacheKey::derive(ScreenshotKind::Chart, "d", WINDOW, THUMB);
        let b = CacheKey::derive(ScreenshotKind::Chart, "d", THUMB, WINDOW);
        assert_ne!(a, b);
    }

    #[test]
    fn material_lists_all_fields_sorted() {
        let material = key_material(ScreenshotKind::Chart, "abc123", WINDOW, WINDOW);
        assert_eq!(
            material.to_string(),
            concat!(
                r#"{"digest":"abc123","thumb_size":[800,600],"#,
                r#""thumbnail_type":"chart","type":"thumb","window_size":[800,600]}"#
            )
        );
    }

    #[test]
    fn parse_round_trips_derived_keys() {
        let key = CacheKey::derive(ScreenshotKind::Dashboard, "d", WINDOW, THUMB);
        assert_eq!(CacheKey::parse(key.as_str()).unwrap(), key);
        assert!(CacheKey::parse("../../etc/passwd").is_err());
        assert!(CacheKey::parse(&key.as_str().to_uppercase()).is_err());
    }
}
