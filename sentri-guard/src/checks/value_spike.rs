//! Per-identifier value jumps between two periods.

use super::{context, finite};
use crate::config::{ColumnCheckConfig, ColumnMap, PeriodSelector};
use crate::core::{
    evaluate, Check, CheckContext, ColumnScope, ResultRecord, ThresholdBound, ThresholdKind,
};
use crate::prelude::*;
use crate::stats;
use async_trait::async_trait;

/// Compares each identifier's value with its value in the comparison period.
///
/// The multiplier is `|current / previous|`. Identifiers whose previous value
/// is zero are skipped and counted separately. The column verdict is the
/// evaluation of the largest multiplier against the absolute bounds, which
/// every enabled column must configure.
#[derive(Debug, Clone)]
pub struct ValueSpikeCheck {
    columns: ColumnMap,
}

impl ValueSpikeCheck {
    pub const NAME: &'static str = "value_spike";

    pub fn new(columns: ColumnMap) -> Result<Self> {
        for (column, settings) in &columns {
            if settings.enabled && !settings.threshold_set().has_absolute() {
                return Err(SentriError::config(format!(
                    "{}: absolute_warning or absolute_critical is required; multipliers are not compared with delta bounds",
                    context(Self::NAME, column)
                )));
            }
        }
        Ok(Self { columns })
    }
}

#[async_trait]
impl Check for ValueSpikeCheck {
    fn check_type(&self) -> &str {
        Self::NAME
    }

    fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn required_columns<'a>(
        &self,
        _settings: &'a ColumnCheckConfig,
        ctx: &'a CheckContext,
    ) -> Vec<&'a str> {
        vec![ctx.id_column.as_str()]
    }

    fn evaluate_column(&self, scope: &ColumnScope<'_>) -> Result<Vec<ResultRecord>> {
        let default = Some(PeriodSelector::Previous);
        let Some(previous_date) = scope.comparison_period(default) else {
            return Ok(vec![scope.no_comparison_record(default)]);
        };

        let current = scope
            .current_frame()?
            .first_by_id(scope.id_column, scope.column)?;
        let previous = scope
            .frame
            .period(previous_date)?
            .first_by_id(scope.id_column, scope.column)?;

        let mut zero_baseline = 0usize;
        let mut multipliers: Vec<(&String, f64)> = Vec::new();
        for (id, value) in &current {
            let Some(prev) = previous.get(id) else { continue };
            if *prev == 0.0 {
                zero_baseline += 1;
                continue;
            }
            multipliers.push((id, (value / prev).abs()));
        }

        let thresholds = scope.settings.threshold_set();
        let flag_level = thresholds.trigger_level(ThresholdKind::Absolute);
        let critical_level = match thresholds.absolute_critical {
            Some(ThresholdBound::Scalar(v)) => Some(v),
            _ => None,
        };
        let flagged: Vec<(&String, f64)> = multipliers
            .iter()
            .copied()
            .filter(|(_, m)| flag_level.is_some_and(|level| *m > level))
            .collect();
        let critical_count = multipliers
            .iter()
            .filter(|(_, m)| critical_level.is_some_and(|level| *m > level))
            .count();
        let flagged_values: Vec<f64> = flagged.iter().map(|(_, m)| *m).collect();
        let max_multiplier = stats::max(&multipliers.iter().map(|(_, m)| *m).collect::<Vec<_>>())
            .map(|max| finite("maximum multiplier", max))
            .transpose()?;

        let mut builder = scope
            .record()
            .value("previous_date", previous_date.to_string())
            .value("records_compared", multipliers.len())
            .value("zero_baseline_count", zero_baseline)
            .value("flagged_count", flagged.len())
            .value("critical_count", critical_count)
            .maybe_number("max_multiplier", max_multiplier)
            .maybe_number("mean_flagged_multiplier", stats::mean(&flagged_values))
            .sample(
                "flagged_ids_sample",
                flagged.iter().map(|(id, _)| (*id).clone()),
            );
        builder = match max_multiplier {
            Some(max) => builder
                .metric(max)
                .evaluation(evaluate(max, &thresholds, ThresholdKind::Absolute)),
            None => builder.message("no identifiers with a non-zero value in both periods"),
        };
        Ok(vec![builder.build()])
    }
}
