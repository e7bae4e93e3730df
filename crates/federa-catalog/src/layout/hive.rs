//! Hive-style partition layout.
//!
//! The payload is a [`PartitionInfo`] serialized as compact JSON. Struct fields
//! are written in declaration order and parameters in key order, so equal
//! content always encodes to equal bytes. The spec of a Hive layout is its
//! partition name, a `key=value` path segment such as `col1=0`.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::{Layout, LayoutCodec, TransformOutcome, TransformSpec};
use crate::error::{CatalogError, Result};

/// Layout type tag of Hive layouts.
pub const HIVE_LAYOUT_TYPE: &str = "hive";

/// Target format for which Hive layouts can plan a transform.
pub const PARQUET_FORMAT: &str = "parquet";

const PARQUET_INPUT_FORMAT: &str = "org.apache.hadoop.hive.ql.io.parquet.MapredParquetInputFormat";
const PARQUET_SERDE: &str = "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe";

/// Storage description of one Hive partition (or of an unpartitioned table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    /// Database the partition belongs to.
    pub db_name: String,
    /// Table the partition belongs to.
    pub table_name: String,
    /// Partition name (`col=value[/col=value...]`); the table name for table layouts.
    pub partition_name: String,
    /// Storage location URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Hadoop input format class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    /// Serialization library class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serde: Option<String>,
    /// Partition parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl PartitionInfo {
    /// Creates partition info with only the identifying names set.
    #[must_use]
    pub fn new(
        db_name: impl Into<String>,
        table_name: impl Into<String>,
        partition_name: impl Into<String>,
    ) -> Self {
        Self {
            db_name: db_name.into(),
            table_name: table_name.into(),
            partition_name: partition_name.into(),
            ..Self::default()
        }
    }

    /// Sets the storage location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the input format and serde classes.
    #[must_use]
    pub fn with_format(mut self, input_format: impl Into<String>, serde: impl Into<String>) -> Self {
        self.input_format = Some(input_format.into());
        self.serde = Some(serde.into());
        self
    }

    fn is_parquet(&self) -> bool {
        self.input_format.as_deref() == Some(PARQUET_INPUT_FORMAT)
    }
}

/// Builds and reads Hive layouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiveLayout;

impl HiveLayout {
    /// Encodes partition info into a layout.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Serialization`] if encoding fails.
    pub fn encode(info: &PartitionInfo) -> Result<Layout> {
        let data = serde_json::to_vec(info)?;
        Ok(Layout::new(HIVE_LAYOUT_TYPE, Bytes::from(data)))
    }

    /// Decodes the partition info carried by a Hive layout.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::LayoutDecode`] if the layout is not a Hive
    /// layout or its payload is malformed.
    pub fn decode(layout: &Layout) -> Result<PartitionInfo> {
        if layout.layout_type() != HIVE_LAYOUT_TYPE {
            return Err(CatalogError::LayoutDecode {
                layout_type: layout.layout_type().to_string(),
                message: format!("expected a '{HIVE_LAYOUT_TYPE}' layout"),
            });
        }
        decode_payload(layout.raw_data())
    }
}

fn decode_payload(data: &[u8]) -> Result<PartitionInfo> {
    serde_json::from_slice(data).map_err(|e| CatalogError::LayoutDecode {
        layout_type: HIVE_LAYOUT_TYPE.to_string(),
        message: e.to_string(),
    })
}

/// Codec registered for [`HIVE_LAYOUT_TYPE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HiveLayoutCodec;

impl LayoutCodec for HiveLayoutCodec {
    fn layout_type(&self) -> &str {
        HIVE_LAYOUT_TYPE
    }

    fn spec(&self, data: &[u8]) -> Result<String> {
        Ok(decode_payload(data)?.partition_name)
    }

    fn transform(&self, data: &[u8], target_format: &str) -> Result<TransformOutcome> {
        let info = decode_payload(data)?;

        if !target_format.eq_ignore_ascii_case(PARQUET_FORMAT) {
            return Ok(TransformOutcome::not_supported(format!(
                "hive layouts can only be transformed to '{PARQUET_FORMAT}', not '{target_format}'"
            )));
        }
        if info.is_parquet() {
            return Ok(TransformOutcome::not_supported(
                "partition is already stored as parquet",
            ));
        }
        let Some(location) = info.location.clone() else {
            return Ok(TransformOutcome::not_supported(
                "partition has no storage location",
            ));
        };

        let output_location = format!("{}_{PARQUET_FORMAT}", location.trim_end_matches('/'));
        let output = PartitionInfo {
            location: Some(output_location.clone()),
            input_format: Some(PARQUET_INPUT_FORMAT.to_string()),
            serde: Some(PARQUET_SERDE.to_string()),
            ..info
        };

        Ok(TransformOutcome::Supported(TransformSpec {
            target_format: PARQUET_FORMAT.to_string(),
            source_location: location,
            output_location,
            output_layout: HiveLayout::encode(&output)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutRegistry;

    fn layout(info: &PartitionInfo) -> Layout {
        HiveLayout::encode(info).unwrap()
    }

    #[test]
    fn spec_is_partition_name() {
        let registry = LayoutRegistry::with_builtin();
        let l = layout(&PartitionInfo::new("db", "t", "col1=0"));
        assert_eq!(l.layout_type(), HIVE_LAYOUT_TYPE);
        assert_eq!(l.spec(&registry).unwrap(), "col1=0");
    }

    #[test]
    fn equal_content_encodes_to_equal_bytes() {
        let mut a = PartitionInfo::new("db", "t", "col1=0");
        a.parameters.insert("z".into(), "1".into());
        a.parameters.insert("a".into(), "2".into());
        let mut b = PartitionInfo::new("db", "t", "col1=0");
        b.parameters.insert("a".into(), "2".into());
        b.parameters.insert("z".into(), "1".into());
        assert_eq!(layout(&a).raw_data(), layout(&b).raw_data());
    }

    #[test]
    fn decode_roundtrips_and_rejects_other_types() {
        let info = PartitionInfo::new("db", "t", "col1=3").with_location("s3://bucket/t/col1=3");
        assert_eq!(HiveLayout::decode(&layout(&info)).unwrap(), info);
        assert!(HiveLayout::decode(&Layout::new("iceberg", Bytes::new())).is_err());
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        let registry = LayoutRegistry::with_builtin();
        let l = Layout::new(HIVE_LAYOUT_TYPE, Bytes::from_static(b"not json"));
        assert!(matches!(
            l.spec(&registry),
            Err(CatalogError::LayoutDecode { .. })
        ));
        assert!(l.to_transform_spec(&registry, PARQUET_FORMAT).is_err());
    }

    #[test]
    fn parquet_transform_is_planned() {
        let registry = LayoutRegistry::with_builtin();
        let info = PartitionInfo::new("db", "t", "col1=0").with_location("s3://bucket/t/col1=0/");
        let outcome = layout(&info)
            .to_transform_spec(&registry, "PARQUET")
            .unwrap();

        let TransformOutcome::Supported(spec) = outcome else {
            panic!("expected supported transform");
        };
        assert_eq!(spec.source_location, "s3://bucket/t/col1=0/");
        assert_eq!(spec.output_location, "s3://bucket/t/col1=0_parquet");
        let out = HiveLayout::decode(&spec.output_layout).unwrap();
        assert!(out.is_parquet());
        assert_eq!(spec.output_layout.spec(&registry).unwrap(), "col1=0");
    }

    #[test]
    fn unsupported_transforms_are_values_not_errors() {
        let registry = LayoutRegistry::with_builtin();
        let with_location =
            PartitionInfo::new("db", "t", "col1=0").with_location("s3://bucket/t/col1=0");

        let orc = layout(&with_location).to_transform_spec(&registry, "orc").unwrap();
        assert!(!orc.is_supported());

        let no_location = layout(&PartitionInfo::new("db", "t", "col1=0"))
            .to_transform_spec(&registry, PARQUET_FORMAT)
            .unwrap();
        assert!(!no_location.is_supported());

        let already = with_location.with_format(PARQUET_INPUT_FORMAT, PARQUET_SERDE);
        let outcome = layout(&already).to_transform_spec(&registry, PARQUET_FORMAT).unwrap();
        assert!(matches!(outcome, TransformOutcome::NotSupported { .. }));
    }
}
