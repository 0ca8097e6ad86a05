//! Declarative configuration for a validation run.
//!
//! A run is described by a YAML or JSON document:
//!
//! ```yaml
//! metadata:
//!   dq_check_name: orders_daily
//!   date_column: order_date
//!   id_column: order_id
//! execution:
//!   parallel_enabled: true
//!   max_workers: 4
//! checks:
//!   completeness:
//!     amount:
//!       thresholds:
//!         absolute_critical: 0.05
//!   drift:
//!     amount:
//!       drift_method: psi
//!       bins: 10
//! ```
//!
//! Check types and their columns keep the order they were written in. Names
//! are lower-cased on load so they match the normalized dataset.

use crate::core::{ExitPolicy, ThresholdSet};
use crate::prelude::*;
use crate::security::SqlSecurity;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which period a check compares the current period against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PeriodSelector {
    /// The latest period strictly before the current one.
    Previous,
    /// The earliest period in the slice.
    First,
    /// A specific period.
    Date(NaiveDate),
}

impl FromStr for PeriodSelector {
    type Err = SentriError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "previous" => Ok(PeriodSelector::Previous),
            "first" => Ok(PeriodSelector::First),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(PeriodSelector::Date)
                .map_err(|_| {
                    SentriError::config(format!(
                        "invalid period '{s}': expected 'previous', 'first' or YYYY-MM-DD"
                    ))
                }),
        }
    }
}

impl TryFrom<String> for PeriodSelector {
    type Error = SentriError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PeriodSelector> for String {
    fn from(value: PeriodSelector) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PeriodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodSelector::Previous => f.write_str("previous"),
            PeriodSelector::First => f.write_str("first"),
            PeriodSelector::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Statistical measures computed by the statistical check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatMeasure {
    Mean,
    Median,
    #[serde(alias = "stdev", alias = "stddev")]
    Std,
    Sum,
    Count,
    Min,
    Max,
    #[serde(alias = "skewness")]
    Skew,
    Kurtosis,
}

impl StatMeasure {
    pub const ALL: [StatMeasure; 9] = [
        StatMeasure::Mean,
        StatMeasure::Median,
        StatMeasure::Std,
        StatMeasure::Sum,
        StatMeasure::Count,
        StatMeasure::Min,
        StatMeasure::Max,
        StatMeasure::Skew,
        StatMeasure::Kurtosis,
    ];

    /// The measure a per-measure threshold key refers to.
    pub fn from_threshold_key(key: &str) -> Option<StatMeasure> {
        Self::ALL
            .into_iter()
            .find(|m| m.threshold_keys().contains(&key))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatMeasure::Mean => "mean",
            StatMeasure::Median => "median",
            StatMeasure::Std => "std",
            StatMeasure::Sum => "sum",
            StatMeasure::Count => "count",
            StatMeasure::Min => "min",
            StatMeasure::Max => "max",
            StatMeasure::Skew => "skew",
            StatMeasure::Kurtosis => "kurtosis",
        }
    }

    /// Names under which per-measure thresholds may be configured.
    fn threshold_keys(&self) -> &'static [&'static str] {
        match self {
            StatMeasure::Mean => &["mean"],
            StatMeasure::Median => &["median"],
            StatMeasure::Std => &["std", "stdev", "stddev"],
            StatMeasure::Sum => &["sum"],
            StatMeasure::Count => &["count"],
            StatMeasure::Min => &["min"],
            StatMeasure::Max => &["max"],
            StatMeasure::Skew => &["skew", "skewness"],
            StatMeasure::Kurtosis => &["kurtosis"],
        }
    }
}

impl fmt::Display for StatMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the correlation check pairs its two series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationType {
    /// Same column, current vs comparison period, joined by identifier.
    #[default]
    Temporal,
    /// Two columns within the current period.
    #[serde(alias = "cross-column", alias = "crosscolumn")]
    CrossColumn,
}

impl CorrelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationType::Temporal => "temporal",
            CorrelationType::CrossColumn => "cross_column",
        }
    }
}

/// Scoring method for the drift check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftMethod {
    #[default]
    Psi,
    Ks,
    #[serde(alias = "js", alias = "jensen-shannon")]
    JensenShannon,
}

impl DriftMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftMethod::Psi => "psi",
            DriftMethod::Ks => "ks",
            DriftMethod::JensenShannon => "jensen_shannon",
        }
    }
}

/// Keys of a uniform threshold set.
const BOUND_KEYS: [&str; 4] = [
    "absolute_critical",
    "absolute_warning",
    "delta_critical",
    "delta_warning",
];

/// Thresholds for a column: one set, or one set per statistical measure.
///
/// A mapping whose keys are all bound names is a uniform set; otherwise every
/// key must name a statistical measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ThresholdSpec {
    Uniform(ThresholdSet),
    PerMeasure(BTreeMap<String, ThresholdSet>),
}

impl TryFrom<BTreeMap<String, serde_json::Value>> for ThresholdSpec {
    type Error = SentriError;

    fn try_from(map: BTreeMap<String, serde_json::Value>) -> Result<Self> {
        if map.keys().all(|k| BOUND_KEYS.contains(&k.as_str())) {
            let set = serde_json::from_value(serde_json::Value::Object(map.into_iter().collect()))?;
            return Ok(ThresholdSpec::Uniform(set));
        }
        let mut per_measure = BTreeMap::new();
        for (key, value) in map {
            if StatMeasure::from_threshold_key(&key).is_none() {
                return Err(SentriError::config(format!(
                    "unknown threshold key '{key}': expected one of {} or a statistical measure",
                    BOUND_KEYS.join(", ")
                )));
            }
            let set: ThresholdSet = serde_json::from_value(value)
                .map_err(|e| SentriError::config(format!("thresholds.{key}: {e}")))?;
            per_measure.insert(key, set);
        }
        Ok(ThresholdSpec::PerMeasure(per_measure))
    }
}

impl<'de> Deserialize<'de> for ThresholdSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
        ThresholdSpec::try_from(map.unwrap_or_default()).map_err(serde::de::Error::custom)
    }
}

impl Default for ThresholdSpec {
    fn default() -> Self {
        ThresholdSpec::Uniform(ThresholdSet::default())
    }
}

impl ThresholdSpec {
    /// The uniform set, or `None` when thresholds are keyed by measure.
    pub fn uniform(&self) -> Option<&ThresholdSet> {
        match self {
            ThresholdSpec::Uniform(set) => Some(set),
            ThresholdSpec::PerMeasure(_) => None,
        }
    }

    /// Thresholds for one statistical measure.
    pub fn for_measure(&self, measure: StatMeasure) -> ThresholdSet {
        match self {
            ThresholdSpec::Uniform(set) => set.clone(),
            ThresholdSpec::PerMeasure(map) => measure
                .threshold_keys()
                .iter()
                .find_map(|k| map.get(*k))
                .cloned()
                .unwrap_or_default(),
        }
    }

    fn validate(&self, context: &str) -> Result<()> {
        match self {
            ThresholdSpec::Uniform(set) => set.validate(context),
            ThresholdSpec::PerMeasure(map) => map.iter().try_for_each(|(key, set)| {
                if StatMeasure::from_threshold_key(key).is_none() {
                    return Err(SentriError::config(format!(
                        "{context}: unknown measure '{key}' in thresholds"
                    )));
                }
                set.validate(&format!("{context}.{key}"))
            }),
        }
    }
}

/// Per-column settings for one check type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCheckConfig {
    #[serde(default)]
    pub thresholds: ThresholdSpec,
    #[serde(default, alias = "filter", skip_serializing_if = "Option::is_none")]
    pub filter_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_to: Option<PeriodSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_period: Option<PeriodSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<StatMeasure>,
    #[serde(default)]
    pub correlation_type: CorrelationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_with: Option<String>,
    #[serde(default)]
    pub drift_method: DriftMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bins: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for ColumnCheckConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdSpec::default(),
            filter_condition: None,
            column_alias: None,
            description: None,
            enabled: true,
            compare_to: None,
            baseline_period: None,
            min_value: None,
            max_value: None,
            measures: Vec::new(),
            correlation_type: CorrelationType::default(),
            correlation_with: None,
            drift_method: DriftMethod::default(),
            bins: None,
        }
    }
}

impl ColumnCheckConfig {
    /// Settings with a uniform threshold set.
    pub fn with_thresholds(thresholds: ThresholdSet) -> Self {
        Self {
            thresholds: ThresholdSpec::Uniform(thresholds),
            ..Self::default()
        }
    }

    /// Uniform thresholds, or an empty set when keyed by measure.
    pub fn threshold_set(&self) -> ThresholdSet {
        self.thresholds.uniform().cloned().unwrap_or_default()
    }

    /// Comparison directive, preferring `baseline_period` over `compare_to`.
    pub fn comparison(&self) -> Option<PeriodSelector> {
        self.baseline_period.or(self.compare_to)
    }

    fn normalize(mut self, context: &str) -> Result<Self> {
        self.thresholds.validate(context)?;
        if let Some(partner) = self.correlation_with.take() {
            SqlSecurity::validate_column_name(&partner)?;
            self.correlation_with = Some(partner.to_lowercase());
        }
        if let Some(filter) = &self.filter_condition {
            if filter.trim().is_empty() {
                self.filter_condition = None;
            }
        }
        Ok(self)
    }
}

/// Descriptive information about the run and its key columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(alias = "dq_check_name")]
    pub name: String,
    pub date_column: String,
    pub id_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Metadata {
    pub fn new(
        name: impl Into<String>,
        date_column: impl Into<String>,
        id_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            date_column: date_column.into().to_lowercase(),
            id_column: id_column.into().to_lowercase(),
            description: None,
        }
    }
}

/// Worker pool and timeout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default, alias = "parallel")]
    pub parallel_enabled: bool,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Seconds each check type may run before it is abandoned.
    #[serde(default = "default_timeout", alias = "timeout_per_check_secs")]
    pub timeout_per_check: u64,
}

fn default_max_workers() -> usize {
    4
}

fn default_timeout() -> u64 {
    300
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallel_enabled: false,
            max_workers: default_max_workers(),
            timeout_per_check: default_timeout(),
        }
    }
}

impl ExecutionConfig {
    /// Sequential execution on a single worker.
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Parallel execution with `workers` workers.
    pub fn parallel(workers: usize) -> Self {
        Self {
            parallel_enabled: true,
            max_workers: workers,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_per_check = seconds;
        self
    }

    /// Number of check types allowed to run at once.
    pub fn worker_count(&self) -> usize {
        if self.parallel_enabled {
            self.max_workers.clamp(1, 16)
        } else {
            1
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=16).contains(&self.max_workers) {
            return Err(SentriError::config(format!(
                "execution.max_workers must be between 1 and 16, got {}",
                self.max_workers
            )));
        }
        if self.timeout_per_check == 0 {
            return Err(SentriError::config(
                "execution.timeout_per_check must be at least 1 second",
            ));
        }
        Ok(())
    }
}

/// Output-related settings consumed by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub pretty_print: bool,
    #[serde(default)]
    pub exit_code: ExitPolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty_print: true,
            exit_code: ExitPolicy::default(),
        }
    }
}

/// Logging preferences read from the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

/// Settings for each column of one check type, in configuration order.
pub type ColumnMap = IndexMap<String, ColumnCheckConfig>;

/// Column settings for every configured check type, in configuration order.
pub type ChecksConfig = IndexMap<String, ColumnMap>;

/// The complete configuration of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Source descriptor; interpreted only by [`crate::sources`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<serde_json::Value>,
    pub metadata: Metadata,
    pub checks: ChecksConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl ValidationConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: ValidationConfig =
            serde_yaml::from_str(text).context("invalid YAML configuration")?;
        config.normalize()
    }

    /// Parses a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ValidationConfig =
            serde_json::from_str(text).context("invalid JSON configuration")?;
        config.normalize()
    }

    /// Loads a configuration file, choosing the parser from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SentriError::config(format!("cannot read '{}': {e}", path.display()))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("yaml") | Some("yml") | None => Self::from_yaml_str(&text),
            Some(other) => Err(SentriError::config(format!(
                "unsupported configuration format '.{other}'"
            ))),
        }
    }

    /// Lower-cases names and validates values the type system cannot express.
    pub fn normalize(mut self) -> Result<Self> {
        SqlSecurity::validate_column_name(&self.metadata.date_column)?;
        SqlSecurity::validate_column_name(&self.metadata.id_column)?;
        self.metadata.date_column = self.metadata.date_column.to_lowercase();
        self.metadata.id_column = self.metadata.id_column.to_lowercase();
        self.execution.validate()?;
        self.checks = normalize_checks(self.checks)?;
        Ok(self)
    }
}

/// Lower-cases check types and column names and validates column settings.
pub fn normalize_checks(checks: ChecksConfig) -> Result<ChecksConfig> {
    let mut out = ChecksConfig::with_capacity(checks.len());
    for (check_type, columns) in checks {
        let check_type = check_type.trim().to_lowercase();
        let mut normalized = ColumnMap::with_capacity(columns.len());
        for (column, settings) in columns {
            SqlSecurity::validate_column_name(&column)?;
            let column = column.to_lowercase();
            let settings = settings.normalize(&format!("{check_type}.{column}"))?;
            if normalized.insert(column.clone(), settings).is_some() {
                return Err(duplicate_key(&column));
            }
        }
        if out.insert(check_type.clone(), normalized).is_some() {
            return Err(duplicate_key(&check_type));
        }
    }
    Ok(out)
}

fn duplicate_key(key: &str) -> SentriError {
    SentriError::config(format!("duplicate key '{key}' after name normalization"))
}
