//! Monthly rollups: running totals across the (up to) five week-of-month
//! buckets of each month, plus the month's grand totals.

use crate::calendar::{month_key_of, month_label, shift_month};
use crate::error::{Result, RollupError};
use crate::facts::{DayFact, MetricSums};
use crate::schema::RollupConfig;
use crate::series::LabeledSeries;
use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

pub const WEEK_LABELS: [&str; 5] = ["Wk 1", "Wk 2", "Wk 3", "Wk 4", "Wk 5"];

pub const CURRENT_MONTH_LABEL: &str = "Current Month";
pub const SAME_MONTH_PY_LABEL: &str = "Same Month PY";

#[derive(Debug, Clone, Serialize)]
pub struct MonthRow {
    pub month_key: String,
    pub month_label: String,
    pub row_label: String,
    /// Metric name to its `Wk 1`..`Wk 5` cumulative series.
    #[serde(flatten)]
    pub weekly: BTreeMap<String, LabeledSeries>,
    /// `<metric>_total` to the month's grand total.
    #[serde(flatten)]
    pub totals: BTreeMap<String, f64>,
}

impl MonthRow {
    pub fn series(&self, metric: &str) -> Option<&LabeledSeries> {
        self.weekly.get(metric)
    }

    pub fn total(&self, metric: &str) -> Option<f64> {
        self.totals.get(&total_key(metric)).copied()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyTrends {
    pub months: Vec<MonthRow>,
    pub weeks: Vec<String>,
}

fn total_key(metric: &str) -> String {
    format!("{}_total", metric)
}

fn row_label(months_back: usize) -> String {
    match months_back {
        0 => CURRENT_MONTH_LABEL.to_string(),
        1 => "1 Month Ago".to_string(),
        n => format!("{} Months Ago", n),
    }
}

/// Raw sums per week-of-month bucket. `None` marks a bucket with no days.
type MonthBuckets = [Option<MetricSums>; 5];

pub struct MonthlyRollupBuilder<'a> {
    config: &'a RollupConfig,
}

impl<'a> MonthlyRollupBuilder<'a> {
    pub fn new(config: &'a RollupConfig) -> Self {
        Self { config }
    }

    /// Builds the current month, the preceding months and the same month one
    /// year earlier. A preceding month with no facts still gets a row with
    /// every week `null` so rows line up by position; a missing current month
    /// is an error.
    pub fn build(&self, facts: &[DayFact], as_of: NaiveDate) -> Result<MonthlyTrends> {
        let grouped = group_by_month(facts);

        let empty = MonthBuckets::default();
        let mut months = Vec::new();
        for back in 0..self.config.trailing_months {
            let (year, month) = shift_month(as_of.year(), as_of.month(), -(back as i32));
            let key = month_key_of(year, month);

            let buckets = match grouped.get(&key) {
                Some(buckets) => buckets,
                None if back == 0 => {
                    return Err(RollupError::NoCurrentMonthData { month_key: key });
                }
                None => {
                    debug!("No facts for {}, emitting an empty monthly row", key);
                    &empty
                }
            };
            months.push(self.month_row(&key, year, month, row_label(back), buckets));
        }

        let (py_year, py_month) = shift_month(as_of.year(), as_of.month(), -12);
        let py_key = month_key_of(py_year, py_month);
        let already_listed = months.iter().any(|m| m.month_key == py_key);
        if let (Some(buckets), false) = (grouped.get(&py_key), already_listed) {
            months.push(self.month_row(
                &py_key,
                py_year,
                py_month,
                SAME_MONTH_PY_LABEL.to_string(),
                buckets,
            ));
        }

        debug!("Monthly rollup produced {} rows", months.len());

        Ok(MonthlyTrends {
            months,
            weeks: WEEK_LABELS.iter().map(|w| w.to_string()).collect(),
        })
    }

    fn month_row(
        &self,
        key: &str,
        year: i32,
        month: u32,
        row_label: String,
        buckets: &MonthBuckets,
    ) -> MonthRow {
        // Walk buckets in order; an empty bucket has no cumulative value
        let mut running = MetricSums::default();
        let cumulative: Vec<Option<MetricSums>> = buckets
            .iter()
            .map(|bucket| {
                bucket.as_ref().map(|sums| {
                    running.merge(sums);
                    running.clone()
                })
            })
            .collect();

        let mut weekly = BTreeMap::new();
        let mut totals = BTreeMap::new();
        for metric in self.config.metric_names() {
            let mut series = LabeledSeries::new();
            for (label, slot) in WEEK_LABELS.iter().zip(&cumulative) {
                series.push(
                    *label,
                    slot.as_ref().map(|sums| self.config.value_of(metric, sums)),
                );
            }
            weekly.insert(metric.to_string(), series);
            totals.insert(total_key(metric), self.config.value_of(metric, &running));
        }

        MonthRow {
            month_key: key.to_string(),
            month_label: month_label(year, month),
            row_label,
            weekly,
            totals,
        }
    }
}

fn group_by_month(facts: &[DayFact]) -> BTreeMap<String, MonthBuckets> {
    let mut grouped: BTreeMap<String, MonthBuckets> = BTreeMap::new();
    for fact in facts {
        let buckets = grouped.entry(fact.month_key.clone()).or_default();
        let idx = (fact.week_of_month.clamp(1, 5) - 1) as usize;
        buckets[idx]
            .get_or_insert_with(MetricSums::default)
            .merge(&fact.metrics);
    }
    grouped
}
