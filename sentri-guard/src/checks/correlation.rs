//! Pearson correlation over time or between two columns.

use super::{context, finite};
use crate::config::{ColumnCheckConfig, ColumnMap, CorrelationType, PeriodSelector};
use crate::core::{
    evaluate_directed, Check, CheckContext, ColumnScope, Direction, ResultRecord, ThresholdKind,
};
use crate::prelude::*;
use crate::stats;
use async_trait::async_trait;

const DEFAULT_MIN_CORRELATION: f64 = 0.80;

/// Correlates either a column with itself in the comparison period (paired by
/// identifier) or two columns within the current period.
///
/// Thresholds are minimums on `|r|`: a weaker correlation fails.
#[derive(Debug, Clone)]
pub struct CorrelationCheck {
    columns: ColumnMap,
}

impl CorrelationCheck {
    pub const NAME: &'static str = "correlation";

    pub fn new(columns: ColumnMap) -> Result<Self> {
        for (column, settings) in &columns {
            if settings.enabled
                && settings.correlation_type == CorrelationType::CrossColumn
                && settings.correlation_with.is_none()
            {
                return Err(SentriError::config(format!(
                    "{}: cross_column correlation requires correlation_with",
                    context(Self::NAME, column)
                )));
            }
        }
        Ok(Self { columns })
    }
}

/// Verbal strength of a coefficient.
pub(crate) fn strength(r: f64) -> &'static str {
    match r.abs() {
        a if a < 0.3 => "weak",
        a if a < 0.7 => "moderate",
        a if a < 0.9 => "strong",
        _ => "very strong",
    }
}

/// Paired series for the configured mode, or `None` when the temporal mode
/// has no comparison period.
fn paired_series(scope: &ColumnScope<'_>) -> Result<Option<(Vec<f64>, Vec<f64>, String)>> {
    let current = scope.current_frame()?;
    match scope.settings.correlation_type {
        CorrelationType::Temporal => {
            let Some(previous_date) = scope.comparison_period(Some(PeriodSelector::Previous))
            else {
                return Ok(None);
            };
            let now = current.first_by_id(scope.id_column, scope.column)?;
            let before = scope
                .frame
                .period(previous_date)?
                .first_by_id(scope.id_column, scope.column)?;
            let (x, y): (Vec<f64>, Vec<f64>) = now
                .iter()
                .filter_map(|(id, v)| before.get(id).map(|b| (*b, *v)))
                .unzip();
            Ok(Some((x, y, previous_date.to_string())))
        }
        CorrelationType::CrossColumn => {
            let partner = scope
                .settings
                .correlation_with
                .as_deref()
                .ok_or_else(|| SentriError::config("correlation_with is not set"))?;
            let (x, y): (Vec<f64>, Vec<f64>) = current
                .numeric(scope.column)?
                .into_iter()
                .zip(current.numeric(partner)?)
                .filter_map(|pair| match pair {
                    (Some(a), Some(b)) => Some((a, b)),
                    _ => None,
                })
                .unzip();
            Ok(Some((x, y, partner.to_string())))
        }
    }
}

#[async_trait]
impl Check for CorrelationCheck {
    fn check_type(&self) -> &str {
        Self::NAME
    }

    fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn required_columns<'a>(
        &self,
        settings: &'a ColumnCheckConfig,
        ctx: &'a CheckContext,
    ) -> Vec<&'a str> {
        match settings.correlation_type {
            CorrelationType::Temporal => vec![ctx.id_column.as_str()],
            CorrelationType::CrossColumn => settings.correlation_with.as_deref().into_iter().collect(),
        }
    }

    fn evaluate_column(&self, scope: &ColumnScope<'_>) -> Result<Vec<ResultRecord>> {
        let Some((x, y, with)) = paired_series(scope)? else {
            return Ok(vec![
                scope.no_comparison_record(Some(PeriodSelector::Previous))
            ]);
        };
        if x.len() < 3 {
            return Err(SentriError::insufficient(
                "correlation needs at least 3 paired values",
                3,
                x.len(),
            ));
        }
        let r = stats::pearson(&x, &y).ok_or_else(|| {
            SentriError::calculation("correlation undefined for a constant series")
        })?;
        let r = finite("correlation coefficient", r)?;
        let p_value = stats::pearson_p_value(r, x.len())?;

        let thresholds = scope
            .settings
            .threshold_set()
            .with_absolute_defaults(DEFAULT_MIN_CORRELATION, None);
        let evaluation =
            evaluate_directed(r.abs(), &thresholds, ThresholdKind::Absolute, Direction::Lower);
        Ok(vec![scope
            .record()
            .metric(r)
            .thresholds(thresholds)
            .evaluation(evaluation)
            .value("correlation_type", scope.settings.correlation_type.as_str())
            .value("correlation_with", with)
            .value("sample_size", x.len())
            .number("p_value", p_value)
            .value("strength", strength(r))
            .build()])
    }
}
