//! Per-column statistics reported by a connector.
//!
//! Statistics are kept per scope: one [`ColumnStatisticsSet`] for the table and
//! one for each partition. A column absent from a scope has no statistics in
//! that scope; nothing is inherited from the other layer.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when statistics metadata is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatisticsError {
    /// Two entries in one scope share a column name.
    #[error("statistics error: duplicate entry for column '{column}'")]
    DuplicateColumn {
        /// The repeated column name.
        column: String,
    },

    /// An entry has an empty column name.
    #[error("statistics error: entry with empty column name")]
    EmptyColumnName,
}

/// Integer column statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongStats {
    /// Smallest value, if known.
    #[serde(default)]
    pub low_value: Option<i64>,
    /// Largest value, if known.
    #[serde(default)]
    pub high_value: Option<i64>,
    /// Number of nulls.
    #[serde(default)]
    pub num_nulls: u64,
    /// Number of distinct values, if known.
    #[serde(default)]
    pub num_distincts: Option<u64>,
}

/// Floating point column statistics.
///
/// Equality compares bit patterns so a `NaN` bound equals itself and an
/// unchanged partition never looks updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoubleStats {
    /// Smallest value, if known.
    #[serde(default)]
    pub low_value: Option<f64>,
    /// Largest value, if known.
    #[serde(default)]
    pub high_value: Option<f64>,
    /// Number of nulls.
    #[serde(default)]
    pub num_nulls: u64,
    /// Number of distinct values, if known.
    #[serde(default)]
    pub num_distincts: Option<u64>,
}

impl PartialEq for DoubleStats {
    fn eq(&self, other: &Self) -> bool {
        self.low_value.map(f64::to_bits) == other.low_value.map(f64::to_bits)
            && self.high_value.map(f64::to_bits) == other.high_value.map(f64::to_bits)
            && self.num_nulls == other.num_nulls
            && self.num_distincts == other.num_distincts
    }
}

impl Eq for DoubleStats {}

/// String column statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringStats {
    /// Longest value in bytes.
    #[serde(default)]
    pub max_col_len: u64,
    /// Average value length in bytes.
    #[serde(default)]
    pub avg_col_len: f64,
    /// Number of nulls.
    #[serde(default)]
    pub num_nulls: u64,
    /// Number of distinct values, if known.
    #[serde(default)]
    pub num_distincts: Option<u64>,
}

impl PartialEq for StringStats {
    fn eq(&self, other: &Self) -> bool {
        self.max_col_len == other.max_col_len
            && self.avg_col_len.to_bits() == other.avg_col_len.to_bits()
            && self.num_nulls == other.num_nulls
            && self.num_distincts == other.num_distincts
    }
}

impl Eq for StringStats {}

/// Binary column statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryStats {
    /// Longest value in bytes.
    #[serde(default)]
    pub max_col_len: u64,
    /// Average value length in bytes.
    #[serde(default)]
    pub avg_col_len: f64,
    /// Number of nulls.
    #[serde(default)]
    pub num_nulls: u64,
}

impl PartialEq for BinaryStats {
    fn eq(&self, other: &Self) -> bool {
        self.max_col_len == other.max_col_len
            && self.avg_col_len.to_bits() == other.avg_col_len.to_bits()
            && self.num_nulls == other.num_nulls
    }
}

impl Eq for BinaryStats {}

/// Boolean column statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanStats {
    /// Number of `true` values.
    #[serde(default)]
    pub num_trues: u64,
    /// Number of `false` values.
    #[serde(default)]
    pub num_falses: u64,
    /// Number of nulls.
    #[serde(default)]
    pub num_nulls: u64,
}

/// Date column statistics. Bounds are days since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateStats {
    /// Earliest date, if known.
    #[serde(default)]
    pub low_value: Option<i64>,
    /// Latest date, if known.
    #[serde(default)]
    pub high_value: Option<i64>,
    /// Number of nulls.
    #[serde(default)]
    pub num_nulls: u64,
    /// Number of distinct values, if known.
    #[serde(default)]
    pub num_distincts: Option<u64>,
}

/// Exact decimal value as unscaled integer and scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decimal {
    /// Unscaled integer value. Serialized as a decimal string.
    #[serde(with = "unscaled_string")]
    pub unscaled: i128,
    /// Number of digits after the decimal point.
    pub scale: u32,
}

// Tagged enums buffer their content, and the buffer has no 128-bit integers.
mod unscaled_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &i128, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(value)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i128, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Decimal column statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecimalStats {
    /// Smallest value, if known.
    #[serde(default)]
    pub low_value: Option<Decimal>,
    /// Largest value, if known.
    #[serde(default)]
    pub high_value: Option<Decimal>,
    /// Number of nulls.
    #[serde(default)]
    pub num_nulls: u64,
    /// Number of distinct values, if known.
    #[serde(default)]
    pub num_distincts: Option<u64>,
}

/// Statistic payload for one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ColumnStatisticsData {
    /// Integer statistics.
    Long(LongStats),
    /// Floating point statistics.
    Double(DoubleStats),
    /// String statistics.
    String(StringStats),
    /// Boolean statistics.
    Boolean(BooleanStats),
    /// Date statistics.
    Date(DateStats),
    /// Decimal statistics.
    Decimal(DecimalStats),
    /// Binary statistics.
    Binary(BinaryStats),
    /// The connector has no statistics for the column.
    #[default]
    NoStats,
}

/// Statistics entry for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStatistics {
    /// Column the entry describes.
    pub col_name: String,
    /// Column type tag.
    pub col_type: String,
    /// Statistic payload.
    pub data: ColumnStatisticsData,
}

impl ColumnStatistics {
    /// Creates a statistics entry.
    #[must_use]
    pub fn new(
        col_name: impl Into<String>,
        col_type: impl Into<String>,
        data: ColumnStatisticsData,
    ) -> Self {
        Self {
            col_name: col_name.into(),
            col_type: col_type.into(),
            data,
        }
    }
}

/// Statistics for one scope (a table or a single partition), keyed by column name.
///
/// Iteration is in column-name order, so equality does not depend on the
/// order the connector listed the entries in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnStatistics>", into = "Vec<ColumnStatistics>")]
pub struct ColumnStatisticsSet {
    entries: BTreeMap<String, ColumnStatistics>,
}

impl ColumnStatisticsSet {
    /// Builds a set, rejecting duplicate column names.
    ///
    /// # Errors
    ///
    /// Returns [`StatisticsError::DuplicateColumn`] if two entries name the
    /// same column, or [`StatisticsError::EmptyColumnName`] for an unnamed entry.
    pub fn new(entries: Vec<ColumnStatistics>) -> Result<Self, StatisticsError> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if entry.col_name.is_empty() {
                return Err(StatisticsError::EmptyColumnName);
            }
            if map.contains_key(&entry.col_name) {
                return Err(StatisticsError::DuplicateColumn {
                    column: entry.col_name,
                });
            }
            map.insert(entry.col_name.clone(), entry);
        }
        Ok(Self { entries: map })
    }

    /// Returns an empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the entry for a column, if present.
    #[must_use]
    pub fn get(&self, col_name: &str) -> Option<&ColumnStatistics> {
        self.entries.get(col_name)
    }

    /// Returns the statistic payload for a column, or
    /// [`ColumnStatisticsData::NoStats`] when this scope has no entry.
    #[must_use]
    pub fn data_or_no_stats(&self, col_name: &str) -> Cow<'_, ColumnStatisticsData> {
        self.entries.get(col_name).map_or(
            Cow::Owned(ColumnStatisticsData::NoStats),
            |e| Cow::Borrowed(&e.data),
        )
    }

    /// Iterates entries in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnStatistics> {
        self.entries.values()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<ColumnStatistics>> for ColumnStatisticsSet {
    type Error = StatisticsError;

    fn try_from(entries: Vec<ColumnStatistics>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<ColumnStatisticsSet> for Vec<ColumnStatistics> {
    fn from(set: ColumnStatisticsSet) -> Self {
        set.entries.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(col: &str) -> ColumnStatistics {
        ColumnStatistics::new(col, "int", ColumnStatisticsData::Long(LongStats::default()))
    }

    #[test]
    fn rejects_duplicate_column() {
        let err = ColumnStatisticsSet::new(vec![long("col2"), long("col2")]).unwrap_err();
        assert_eq!(
            err,
            StatisticsError::DuplicateColumn {
                column: "col2".into()
            }
        );
    }

    #[test]
    fn equality_ignores_listing_order() {
        let a = ColumnStatisticsSet::new(vec![long("a"), long("b")]).unwrap();
        let b = ColumnStatisticsSet::new(vec![long("b"), long("a")]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_column_reads_as_no_stats() {
        let set = ColumnStatisticsSet::new(vec![long("col2")]).unwrap();
        let missing = set.data_or_no_stats("col1");
        assert!(matches!(missing, Cow::Owned(ColumnStatisticsData::NoStats)));
        let present = set.data_or_no_stats("col2");
        assert!(matches!(present, Cow::Borrowed(ColumnStatisticsData::Long(_))));
    }

    #[test]
    fn nan_bounds_compare_equal_to_themselves() {
        let stats = DoubleStats {
            low_value: Some(f64::NAN),
            high_value: Some(1.5),
            num_nulls: 0,
            num_distincts: None,
        };
        assert_eq!(stats, stats.clone());
    }

    #[test]
    fn serde_uses_kind_tag_and_validates() {
        let set = ColumnStatisticsSet::new(vec![
            long("col2"),
            ColumnStatistics::new("flag", "boolean", ColumnStatisticsData::NoStats),
        ])
        .unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains("\"kind\":\"long\""));
        assert!(json.contains("\"kind\":\"noStats\""));
        assert_eq!(serde_json::from_str::<ColumnStatisticsSet>(&json).unwrap(), set);

        let dup = r#"[{"colName":"a","colType":"int","data":{"kind":"noStats"}},
                      {"colName":"a","colType":"int","data":{"kind":"noStats"}}]"#;
        assert!(serde_json::from_str::<ColumnStatisticsSet>(dup).is_err());
    }

    #[test]
    fn decimal_stats_roundtrip() {
        let data = ColumnStatisticsData::Decimal(DecimalStats {
            low_value: Some(Decimal {
                unscaled: -12_345,
                scale: 2,
            }),
            high_value: None,
            num_nulls: 3,
            num_distincts: Some(10),
        });
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(serde_json::from_str::<ColumnStatisticsData>(&json).unwrap(), data);
    }
}
