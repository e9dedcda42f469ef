//! Reference profile
//!
//! Per-feature type classification and summary statistics computed once
//! from the reference (training-time) dataset.

use crate::drift::data_drift::{bin_counts, equal_width_edges};
use crate::error::{DriftError, Result};
use chrono::{DateTime, Utc};
use ndarray::ArrayView1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// How a feature is compared, decided once from the reference column's dtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

impl FeatureKind {
    /// Integers, floats and booleans are numeric; everything else is read
    /// as text and treated as categorical.
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64 => FeatureKind::Numeric,
            _ => FeatureKind::Categorical,
        }
    }
}

/// Non-missing values of one column
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValues {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl FeatureValues {
    /// Read a column as `kind`, dropping nulls (and NaN / infinities for
    /// numeric columns). Values that cannot be cast become missing.
    pub fn from_column(column: &Column, kind: FeatureKind) -> Result<Self> {
        match kind {
            FeatureKind::Numeric => {
                let casted = column.cast(&DataType::Float64)?;
                let values = casted
                    .as_materialized_series()
                    .f64()?
                    .into_iter()
                    .flatten()
                    .filter(|v| v.is_finite())
                    .collect();
                Ok(FeatureValues::Numeric(values))
            }
            FeatureKind::Categorical => {
                let casted = column.cast(&DataType::String)?;
                let values = casted
                    .as_materialized_series()
                    .str()?
                    .into_iter()
                    .flatten()
                    .map(str::to_string)
                    .collect();
                Ok(FeatureValues::Categorical(values))
            }
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValues::Numeric(_) => FeatureKind::Numeric,
            FeatureValues::Categorical(_) => FeatureKind::Categorical,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FeatureValues::Numeric(v) => v.len(),
            FeatureValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sample mean and standard deviation (ddof = 1). A single value has std 0.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let view = ArrayView1::from(values);
    let mean = view.mean().unwrap_or(0.0);
    let std = if values.len() > 1 { view.std(1.0) } else { 0.0 };
    (mean, std)
}

/// Quartiles with linear interpolation between order statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantiles {
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
}

impl Quantiles {
    fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            q25: quantile_sorted(sorted, 0.25),
            q50: quantile_sorted(sorted, 0.50),
            q75: quantile_sorted(sorted, 0.75),
        }
    }
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Equal-width histogram over the reference range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `n_bins + 1` bin edges
    pub edges: Vec<f64>,
    /// Count per bin
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Bin `values` into `n_bins` bins spanning their own min..max. A
    /// constant sample is given the range `[v - 0.5, v + 0.5]`.
    pub fn from_values(values: &[f64], n_bins: usize) -> Self {
        let (mut lo, mut hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let edges = equal_width_edges(lo, hi, n_bins);
        let counts = bin_counts(values, &edges);
        Self { edges, counts }
    }
}

/// Summary of a numeric reference feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub quantiles: Quantiles,
    pub histogram: Histogram,
}

impl NumericStats {
    pub fn from_values(values: &[f64], n_bins: usize) -> Result<Self> {
        if values.is_empty() {
            return Err(DriftError::EmptyInput(
                "Cannot summarise an empty numeric column".to_string(),
            ));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let (mean, std) = mean_std(values);

        Ok(Self {
            count: values.len(),
            mean,
            std,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            quantiles: Quantiles::from_sorted(&sorted),
            histogram: Histogram::from_values(values, n_bins.max(1)),
        })
    }
}

/// Summary of a categorical reference feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    pub count: usize,
    /// Category -> share of the column, summing to 1
    pub distribution: BTreeMap<String, f64>,
    /// Categories by descending frequency, ties in first-seen order
    pub categories: Vec<String>,
}

impl CategoricalStats {
    pub fn from_values(values: &[String]) -> Result<Self> {
        if values.is_empty() {
            return Err(DriftError::EmptyInput(
                "Cannot summarise an empty categorical column".to_string(),
            ));
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut seen: Vec<(&str, usize)> = Vec::new();
        for value in values {
            let slot = *index.entry(value.as_str()).or_insert_with(|| {
                seen.push((value.as_str(), 0));
                seen.len() - 1
            });
            seen[slot].1 += 1;
        }
        // Stable sort keeps first-seen order among equal counts
        seen.sort_by(|a, b| b.1.cmp(&a.1));

        let n = values.len() as f64;
        let distribution = seen
            .iter()
            .map(|&(cat, c)| (cat.to_string(), c as f64 / n))
            .collect();
        let categories = seen.iter().map(|&(cat, _)| cat.to_string()).collect();

        Ok(Self {
            count: values.len(),
            distribution,
            categories,
        })
    }

    /// Reference share of `category`, 0 when it was never observed
    pub fn proportion(&self, category: &str) -> f64 {
        self.distribution.get(category).copied().unwrap_or(0.0)
    }
}

/// Per-feature statistics, tagged by feature type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeatureStats {
    Numeric(NumericStats),
    Categorical(CategoricalStats),
}

impl FeatureStats {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureStats::Numeric(_) => FeatureKind::Numeric,
            FeatureStats::Categorical(_) => FeatureKind::Categorical,
        }
    }

    fn from_values(values: &FeatureValues, n_bins: usize) -> Result<Self> {
        match values {
            FeatureValues::Numeric(v) => {
                Ok(FeatureStats::Numeric(NumericStats::from_values(v, n_bins)?))
            }
            FeatureValues::Categorical(v) => {
                Ok(FeatureStats::Categorical(CategoricalStats::from_values(v)?))
            }
        }
    }
}

/// One profiled reference feature: its statistics and the non-missing
/// reference values the tests are run against
#[derive(Debug, Clone)]
pub struct FeatureProfile {
    pub name: String,
    pub stats: FeatureStats,
    pub values: FeatureValues,
}

impl FeatureProfile {
    pub fn kind(&self) -> FeatureKind {
        self.stats.kind()
    }
}

/// Immutable reference profile. Feature order is the reference column order.
#[derive(Debug, Clone)]
pub struct ReferenceProfile {
    features: Vec<FeatureProfile>,
    n_samples: usize,
    n_bins: usize,
    created_at: DateTime<Utc>,
}

impl ReferenceProfile {
    /// Profile every column of `data`. Missing values are dropped per column.
    /// Columns that cannot be read, or with no usable value, are left out; a
    /// frame with no rows, no columns or nothing profileable is rejected.
    pub fn from_dataframe(data: &DataFrame, n_bins: usize) -> Result<Self> {
        if data.width() == 0 {
            return Err(DriftError::EmptyReference("reference data has no columns".to_string()));
        }
        if data.height() == 0 {
            return Err(DriftError::EmptyReference("reference data has no rows".to_string()));
        }

        let mut features = Vec::with_capacity(data.width());
        for column in data.get_columns() {
            let name = column.name().to_string();
            let kind = FeatureKind::from_dtype(column.dtype());
            let values = match FeatureValues::from_column(column, kind) {
                Ok(values) => values,
                Err(err) => {
                    warn!(
                        feature = %name,
                        error = %err,
                        "Reference feature cannot be read, excluding it from the profile"
                    );
                    continue;
                }
            };

            if values.is_empty() {
                warn!(
                    feature = %name,
                    "Reference feature has no valid data, excluding it from the profile"
                );
                continue;
            }

            let stats = FeatureStats::from_values(&values, n_bins)?;
            features.push(FeatureProfile { name, stats, values });
        }

        if features.is_empty() {
            return Err(DriftError::EmptyReference(
                "no reference column has non-missing values".to_string(),
            ));
        }

        Ok(Self {
            features,
            n_samples: data.height(),
            n_bins,
            created_at: Utc::now(),
        })
    }

    /// Profiled features in reference column order
    pub fn features(&self) -> &[FeatureProfile] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureProfile> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Row count of the reference frame
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_reference_frame() -> DataFrame {
        df!(
            "age" => &[Some(25.0), Some(30.0), None, Some(40.0), Some(45.0)],
            "city" => &[Some("NYC"), Some("LA"), Some("NYC"), None, Some("SF")],
            "clicks" => &[1i64, 2, 3, 4, 5]
        )
        .unwrap()
    }

    #[test]
    fn test_feature_kind_from_dtype() {
        assert_eq!(FeatureKind::from_dtype(&DataType::Float64), FeatureKind::Numeric);
        assert_eq!(FeatureKind::from_dtype(&DataType::Int32), FeatureKind::Numeric);
        assert_eq!(FeatureKind::from_dtype(&DataType::Boolean), FeatureKind::Numeric);
        assert_eq!(FeatureKind::from_dtype(&DataType::String), FeatureKind::Categorical);
    }

    #[test]
    fn test_profile_preserves_column_order() {
        let profile = ReferenceProfile::from_dataframe(&create_reference_frame(), 10).unwrap();
        assert_eq!(profile.feature_names(), vec!["age", "city", "clicks"]);
        assert_eq!(profile.n_samples(), 5);
        assert_eq!(profile.feature("city").unwrap().kind(), FeatureKind::Categorical);
        assert_eq!(profile.feature("clicks").unwrap().kind(), FeatureKind::Numeric);
    }

    #[test]
    fn test_missing_values_dropped_per_column() {
        let profile = ReferenceProfile::from_dataframe(&create_reference_frame(), 10).unwrap();

        let age = profile.feature("age").unwrap();
        assert_eq!(age.values.len(), 4);
        match &age.stats {
            FeatureStats::Numeric(s) => {
                assert_eq!(s.count, 4);
                assert!((s.mean - 35.0).abs() < 1e-12);
                assert_eq!(s.min, 25.0);
                assert_eq!(s.max, 45.0);
            }
            other => panic!("expected numeric stats, got {:?}", other),
        }

        // The null in `city` sits on a different row than the one in `age`
        assert_eq!(profile.feature("city").unwrap().values.len(), 4);
        assert_eq!(profile.feature("clicks").unwrap().values.len(), 5);
    }

    #[test]
    fn test_numeric_stats() {
        let values: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let stats = NumericStats::from_values(&values, 5).unwrap();

        assert!((stats.mean - 5.5).abs() < 1e-12);
        // Sample std of 1..=10
        assert!((stats.std - 3.0276503540974917).abs() < 1e-12);
        assert!((stats.quantiles.q25 - 3.25).abs() < 1e-12);
        assert!((stats.quantiles.q50 - 5.5).abs() < 1e-12);
        assert!((stats.quantiles.q75 - 7.75).abs() < 1e-12);
        assert_eq!(stats.histogram.edges.len(), 6);
        assert_eq!(stats.histogram.counts.iter().sum::<u64>(), 10);
        assert_eq!(stats.histogram.edges[0], 1.0);
        assert_eq!(stats.histogram.edges[5], 10.0);
    }

    #[test]
    fn test_single_value_stats() {
        let stats = NumericStats::from_values(&[7.0], 10).unwrap();
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.quantiles.q50, 7.0);
        assert_eq!(stats.histogram.edges[0], 6.5);
        assert_eq!(stats.histogram.edges[10], 7.5);
        assert_eq!(stats.histogram.counts.iter().sum::<u64>(), 1);
    }

    #[test]
    fn test_categorical_stats_ordering() {
        let values: Vec<String> = ["b", "a", "c", "a", "b", "d", "a"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let stats = CategoricalStats::from_values(&values).unwrap();

        // a=3, then b=2, then c and d tied at 1 in first-seen order
        assert_eq!(stats.categories, vec!["a", "b", "c", "d"]);
        let total: f64 = stats.distribution.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((stats.proportion("a") - 3.0 / 7.0).abs() < 1e-12);
        assert_eq!(stats.proportion("zzz"), 0.0);
    }

    #[test]
    fn test_all_null_column_excluded() {
        let df = df!(
            "x" => &[1.0, 2.0, 3.0],
            "empty" => &[None::<f64>, None, None]
        )
        .unwrap();
        let profile = ReferenceProfile::from_dataframe(&df, 10).unwrap();
        assert_eq!(profile.feature_names(), vec!["x"]);
    }

    #[test]
    fn test_unreadable_column_excluded() {
        let nested = Series::new(
            "nested".into(),
            &[
                Series::new("".into(), &[1.0, 2.0]),
                Series::new("".into(), &[3.0]),
                Series::new("".into(), &[4.0, 5.0]),
            ],
        );
        let df = DataFrame::new(vec![
            Column::new("x".into(), &[1.0, 2.0, 3.0]),
            nested.into(),
        ])
        .unwrap();

        let profile = ReferenceProfile::from_dataframe(&df, 10).unwrap();
        assert_eq!(profile.feature_names(), vec!["x"]);
    }

    #[test]
    fn test_empty_reference_rejected() {
        let no_rows = df!("x" => Vec::<f64>::new()).unwrap();
        assert!(matches!(
            ReferenceProfile::from_dataframe(&no_rows, 10),
            Err(DriftError::EmptyReference(_))
        ));

        let no_columns = DataFrame::empty();
        assert!(matches!(
            ReferenceProfile::from_dataframe(&no_columns, 10),
            Err(DriftError::EmptyReference(_))
        ));

        let all_null = df!("x" => &[None::<f64>, None]).unwrap();
        assert!(matches!(
            ReferenceProfile::from_dataframe(&all_null, 10),
            Err(DriftError::EmptyReference(_))
        ));
    }

    #[test]
    fn test_nan_treated_as_missing() {
        let df = df!("x" => &[1.0, f64::NAN, 3.0]).unwrap();
        let column = df.column("x").unwrap();
        let values = FeatureValues::from_column(column, FeatureKind::Numeric).unwrap();
        assert_eq!(values, FeatureValues::Numeric(vec![1.0, 3.0]));
    }

    #[test]
    fn test_uncastable_values_become_missing() {
        let df = df!("x" => &["1.5", "oops", "2.5"]).unwrap();
        let column = df.column("x").unwrap();
        let values = FeatureValues::from_column(column, FeatureKind::Numeric).unwrap();
        assert_eq!(values, FeatureValues::Numeric(vec![1.5, 2.5]));
    }
}
