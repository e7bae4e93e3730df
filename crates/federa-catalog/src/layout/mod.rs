//! Opaque, type-tagged physical storage descriptors.
//!
//! A [`Layout`] is a closed `{type, data}` pair. The core never inspects the
//! bytes: everything content-derived (the partition spec, transform plans) is
//! computed by the [`LayoutCodec`] registered for the layout type in a
//! [`LayoutRegistry`]. Two layouts are equal when their type and bytes are equal.

pub mod hive;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Physical storage description of a table or partition.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    layout_type: String,
    #[serde(with = "base64_bytes")]
    layout_data: Bytes,
}

impl Layout {
    /// Creates a layout from a type tag and an opaque payload.
    #[must_use]
    pub fn new(layout_type: impl Into<String>, layout_data: impl Into<Bytes>) -> Self {
        Self {
            layout_type: layout_type.into(),
            layout_data: layout_data.into(),
        }
    }

    /// Returns the type tag identifying the producing connector's encoding.
    #[must_use]
    pub fn layout_type(&self) -> &str {
        &self.layout_type
    }

    /// Returns the opaque payload.
    #[must_use]
    pub fn raw_data(&self) -> &Bytes {
        &self.layout_data
    }

    /// Returns the content-derived identity string of this layout.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownLayout`] if no codec is registered for
    /// the layout type, or [`CatalogError::LayoutDecode`] if the payload is malformed.
    pub fn spec(&self, registry: &LayoutRegistry) -> Result<String> {
        registry.codec(&self.layout_type)?.spec(&self.layout_data)
    }

    /// Asks the producing connector for an alternate physical representation.
    ///
    /// A format the connector cannot produce yields
    /// [`TransformOutcome::NotSupported`], not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the codec is missing or the payload cannot be decoded.
    pub fn to_transform_spec(
        &self,
        registry: &LayoutRegistry,
        target_format: &str,
    ) -> Result<TransformOutcome> {
        registry
            .codec(&self.layout_type)?
            .transform(&self.layout_data, target_format)
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("layout_type", &self.layout_type)
            .field("layout_data_len", &self.layout_data.len())
            .finish()
    }
}

/// Plan for re-encoding a table or partition into another physical format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformSpec {
    /// Requested format (e.g. `parquet`).
    pub target_format: String,
    /// Where the current data lives.
    pub source_location: String,
    /// Where the transformed data should be written.
    pub output_location: String,
    /// Layout describing the transformed data once written.
    pub output_layout: Layout,
}

/// Answer to a transform request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// The connector can produce the requested format.
    Supported(TransformSpec),
    /// The connector cannot produce the requested format.
    NotSupported {
        /// Why the request cannot be served.
        reason: String,
    },
}

impl TransformOutcome {
    /// Creates a not-supported outcome.
    #[must_use]
    pub fn not_supported(reason: impl Into<String>) -> Self {
        Self::NotSupported {
            reason: reason.into(),
        }
    }

    /// Returns true when the transform is supported.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }
}

/// Connector-supplied decoding capability for one layout type.
///
/// Implementations must be deterministic: equal bytes yield equal specs.
pub trait LayoutCodec: Send + Sync + 'static {
    /// Layout type tag this codec decodes.
    fn layout_type(&self) -> &str;

    /// Derives the identity string of a payload.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::LayoutDecode`] if the payload is malformed.
    fn spec(&self, data: &[u8]) -> Result<String>;

    /// Plans a transform into `target_format`.
    ///
    /// The default supports nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::LayoutDecode`] if the payload is malformed.
    fn transform(&self, data: &[u8], target_format: &str) -> Result<TransformOutcome> {
        let _ = data;
        Ok(TransformOutcome::not_supported(format!(
            "layout '{}' does not support transforms to '{target_format}'",
            self.layout_type()
        )))
    }
}

/// Codecs keyed by layout type.
#[derive(Clone, Default)]
pub struct LayoutRegistry {
    codecs: HashMap<String, Arc<dyn LayoutCodec>>,
}

impl LayoutRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the codecs shipped in this crate.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut codecs: HashMap<String, Arc<dyn LayoutCodec>> = HashMap::new();
        codecs.insert(hive::HIVE_LAYOUT_TYPE.to_string(), Arc::new(hive::HiveLayoutCodec));
        Self { codecs }
    }

    /// Registers a codec.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Registry`] if a codec is already registered for the type.
    pub fn register(&mut self, codec: Arc<dyn LayoutCodec>) -> Result<()> {
        let layout_type = codec.layout_type().to_string();
        if self.codecs.contains_key(&layout_type) {
            return Err(CatalogError::Registry {
                message: format!("layout codec '{layout_type}' already registered"),
            });
        }
        self.codecs.insert(layout_type, codec);
        Ok(())
    }

    /// Returns the codec for a layout type.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownLayout`] if none is registered.
    pub fn codec(&self, layout_type: &str) -> Result<&Arc<dyn LayoutCodec>> {
        self.codecs
            .get(layout_type)
            .ok_or_else(|| CatalogError::UnknownLayout {
                layout_type: layout_type.to_string(),
            })
    }

    /// Returns the registered layout types, sorted.
    #[must_use]
    pub fn layout_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutRegistry")
            .field("layout_types", &self.layout_types())
            .finish()
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(data: &Bytes, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(data))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperCodec;

    impl LayoutCodec for UpperCodec {
        fn layout_type(&self) -> &str {
            "upper"
        }

        fn spec(&self, data: &[u8]) -> Result<String> {
            std::str::from_utf8(data)
                .map(str::to_ascii_uppercase)
                .map_err(|e| CatalogError::LayoutDecode {
                    layout_type: "upper".into(),
                    message: e.to_string(),
                })
        }
    }

    fn registry() -> LayoutRegistry {
        let mut registry = LayoutRegistry::new();
        registry.register(Arc::new(UpperCodec)).unwrap();
        registry
    }

    #[test]
    fn spec_is_computed_by_registered_codec() {
        let layout = Layout::new("upper", Bytes::from_static(b"col1=0"));
        assert_eq!(layout.spec(&registry()).unwrap(), "COL1=0");
    }

    #[test]
    fn spec_is_stable_across_decodes() {
        let registry = registry();
        let a = Layout::new("upper", Bytes::from_static(b"x=1"));
        let b = Layout::new("upper", Bytes::copy_from_slice(b"x=1"));
        assert_eq!(a, b);
        assert_eq!(a.spec(&registry).unwrap(), b.spec(&registry).unwrap());
        assert_eq!(a.spec(&registry).unwrap(), a.spec(&registry).unwrap());
    }

    #[test]
    fn unknown_layout_type_is_an_error() {
        let layout = Layout::new("iceberg", Bytes::new());
        assert!(matches!(
            layout.spec(&registry()),
            Err(CatalogError::UnknownLayout { .. })
        ));
    }

    #[test]
    fn bad_payload_is_decode_error() {
        let layout = Layout::new("upper", Bytes::from_static(&[0xff, 0xfe]));
        assert!(matches!(
            layout.spec(&registry()),
            Err(CatalogError::LayoutDecode { .. })
        ));
    }

    #[test]
    fn default_transform_is_not_supported() {
        let layout = Layout::new("upper", Bytes::from_static(b"a"));
        let outcome = layout.to_transform_spec(&registry(), "parquet").unwrap();
        assert!(!outcome.is_supported());
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = registry();
        assert!(registry.register(Arc::new(UpperCodec)).is_err());
        assert_eq!(registry.layout_types(), vec!["upper"]);
    }

    #[test]
    fn equality_is_by_type_and_bytes() {
        let a = Layout::new("upper", Bytes::from_static(b"a"));
        assert_ne!(a, Layout::new("lower", Bytes::from_static(b"a")));
        assert_ne!(a, Layout::new("upper", Bytes::from_static(b"b")));
    }

    #[test]
    fn serde_encodes_payload_as_base64() {
        let layout = Layout::new("upper", Bytes::from_static(b"hi"));
        let json = serde_json::to_string(&layout).unwrap();
        assert_eq!(json, r#"{"layoutType":"upper","layoutData":"aGk="}"#);
        assert_eq!(serde_json::from_str::<Layout>(&json).unwrap(), layout);
    }
}
