//! Built-in check variants and the registry that constructs them.
//!
//! Every variant implements [`Check`](crate::core::Check) and is built from the
//! column settings configured under its check type name. Construction validates
//! the settings; a configuration error there aborts the run before any check
//! is dispatched.
//!
//! | Check type     | Primary metric                               | Default comparison |
//! |----------------|----------------------------------------------|--------------------|
//! | `completeness` | null fraction                                | none               |
//! | `uniqueness`   | duplicate count                              | none               |
//! | `range`        | out-of-range fraction                        | none               |
//! | `turnover`     | (added + dropped) / union of identifiers     | previous           |
//! | `value_spike`  | maximum current / previous multiplier        | previous           |
//! | `frequency`    | maximum change in category share             | previous           |
//! | `correlation`  | Pearson coefficient                          | previous           |
//! | `statistical`  | one record per configured measure            | none               |
//! | `distribution` | two-sample KS p-value                        | previous           |
//! | `drift`        | PSI, KS statistic or Jensen-Shannon          | first              |
//!
//! # Examples
//!
//! ```rust
//! use sentri_guard::checks::CheckRegistry;
//!
//! let registry = CheckRegistry::builtin();
//! assert!(registry.contains("drift"));
//! assert_eq!(registry.names().count(), 10);
//! ```

mod completeness;
mod correlation;
mod distribution;
mod drift;
mod frequency;
mod range;
mod statistical;
mod turnover;
mod uniqueness;
mod value_spike;

pub use completeness::CompletenessCheck;
pub use correlation::CorrelationCheck;
pub use distribution::DistributionCheck;
pub use drift::DriftCheck;
pub use frequency::FrequencyCheck;
pub use range::RangeCheck;
pub use statistical::StatisticalCheck;
pub use turnover::TurnoverCheck;
pub use uniqueness::UniquenessCheck;
pub use value_spike::ValueSpikeCheck;

use crate::config::ColumnMap;
use crate::core::Check;
use crate::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Builds a check from the column settings of its check type.
pub type CheckConstructor = fn(ColumnMap) -> Result<Arc<dyn Check>>;

/// Maps check type names to constructors.
///
/// The registry is passed to the [`CheckManager`](crate::core::CheckManager)
/// explicitly, so callers can add their own check types next to the built-in
/// ones.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    constructors: BTreeMap<String, CheckConstructor>,
}

impl fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckRegistry")
            .field("check_types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn shared<C: Check + 'static>(check: Result<C>) -> Result<Arc<dyn Check>> {
    check.map(|c| Arc::new(c) as Arc<dyn Check>)
}

impl CheckRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the ten built-in check types.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(CompletenessCheck::NAME, |c| shared(CompletenessCheck::new(c)));
        registry.register(UniquenessCheck::NAME, |c| shared(UniquenessCheck::new(c)));
        registry.register(RangeCheck::NAME, |c| shared(RangeCheck::new(c)));
        registry.register(TurnoverCheck::NAME, |c| shared(TurnoverCheck::new(c)));
        registry.register(ValueSpikeCheck::NAME, |c| shared(ValueSpikeCheck::new(c)));
        registry.register(FrequencyCheck::NAME, |c| shared(FrequencyCheck::new(c)));
        registry.register(CorrelationCheck::NAME, |c| shared(CorrelationCheck::new(c)));
        registry.register(StatisticalCheck::NAME, |c| shared(StatisticalCheck::new(c)));
        registry.register(DistributionCheck::NAME, |c| shared(DistributionCheck::new(c)));
        registry.register(DriftCheck::NAME, |c| shared(DriftCheck::new(c)));
        registry
    }

    /// Adds or replaces a check type.
    pub fn register(&mut self, name: impl Into<String>, constructor: CheckConstructor) {
        self.constructors.insert(name.into().to_lowercase(), constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered check type names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Constructs the check registered as `name`.
    ///
    /// Returns `Ok(None)` for unknown names and an error when the settings are
    /// invalid for the check type.
    pub fn create(
        &self,
        name: &str,
        columns: ColumnMap,
    ) -> Result<Option<Arc<dyn Check>>> {
        match self.constructors.get(name) {
            Some(constructor) => constructor(columns).map(Some),
            None => Ok(None),
        }
    }
}

/// Prefix for configuration errors about one column of one check type.
fn context(check_type: &str, column: &str) -> String {
    format!("checks.{check_type}.{column}")
}

/// Requires at least one configured bound on every enabled column.
fn require_thresholds(check_type: &str, columns: &ColumnMap) -> Result<()> {
    for (column, settings) in columns {
        if settings.enabled && settings.threshold_set().is_empty() {
            return Err(SentriError::config(format!(
                "{}: at least one threshold is required",
                context(check_type, column)
            )));
        }
    }
    Ok(())
}

/// Fails with a calculation error when `value` overflowed or is undefined.
fn finite(what: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SentriError::calculation(format!(
            "{what} is not a finite number ({value})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnCheckConfig;
    use crate::test_helpers::{absolute, columns};

    #[test]
    fn test_builtin_names() {
        let registry = CheckRegistry::builtin();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "completeness",
                "correlation",
                "distribution",
                "drift",
                "frequency",
                "range",
                "statistical",
                "turnover",
                "uniqueness",
                "value_spike",
            ]
        );
    }

    #[test]
    fn test_unknown_name_is_none() {
        let registry = CheckRegistry::builtin();
        assert!(registry.create("nope", ColumnMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_settings_are_configuration_errors() {
        let registry = CheckRegistry::builtin();
        let err = registry
            .create(
                "completeness",
                columns(vec![("amount", ColumnCheckConfig::default())]),
            )
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("checks.completeness.amount"));

        let ok = registry
            .create(
                "completeness",
                columns(vec![(
                    "amount",
                    ColumnCheckConfig::with_thresholds(absolute(Some(0.1), None)),
                )]),
            )
            .unwrap();
        assert_eq!(ok.unwrap().check_type(), "completeness");
    }

    #[test]
    fn test_disabled_columns_skip_validation() {
        let registry = CheckRegistry::builtin();
        let settings = ColumnCheckConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(registry
            .create("uniqueness", columns(vec![("id", settings)]))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_finite_guard() {
        assert_eq!(finite("sum", 2.5).unwrap(), 2.5);
        let err = finite("sum", f64::INFINITY).unwrap_err();
        assert_eq!(err.kind().as_str(), "CalculationError");
        assert!(err.to_string().contains("sum is not a finite number"));
    }
}
