use crate::calendar::{iso_week, month_key, week_of_month};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summed raw metric values over some window. Missing names read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSums(BTreeMap<String, f64>);

impl MetricSums {
    pub fn get(&self, metric: &str) -> f64 {
        self.0.get(metric).copied().unwrap_or(0.0)
    }

    pub fn add(&mut self, metric: &str, value: f64) {
        *self.0.entry(metric.to_string()).or_insert(0.0) += value;
    }

    pub fn merge(&mut self, other: &MetricSums) {
        for (metric, value) in other.iter() {
            self.add(metric, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for MetricSums {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut sums = MetricSums::default();
        for (metric, value) in iter {
            sums.add(&metric, value);
        }
        sums
    }
}

/// One normalized calendar day of raw additive metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayFact {
    pub date: NaiveDate,
    pub year: i32,
    pub month_key: String,
    pub day_of_month: u32,
    pub week_of_month: u32,
    pub iso_week: u32,
    pub metrics: MetricSums,
}

impl DayFact {
    pub fn new(date: NaiveDate, metrics: MetricSums) -> Self {
        Self {
            date,
            year: date.year(),
            month_key: month_key(date),
            day_of_month: date.day(),
            week_of_month: week_of_month(date.day()),
            iso_week: iso_week(date),
            metrics,
        }
    }
}

/// Sums facts sharing a date into one fact per date, sorted by date.
pub fn merge_by_date<'a>(facts: impl IntoIterator<Item = &'a DayFact>) -> Vec<DayFact> {
    let mut by_date: BTreeMap<NaiveDate, MetricSums> = BTreeMap::new();
    for fact in facts {
        by_date.entry(fact.date).or_default().merge(&fact.metrics);
    }
    by_date
        .into_iter()
        .map(|(date, metrics)| DayFact::new(date, metrics))
        .collect()
}

/// Date-ordered lookup over a fact list, used for window sums.
pub struct FactIndex<'a> {
    by_date: BTreeMap<NaiveDate, &'a DayFact>,
}

impl<'a> FactIndex<'a> {
    pub fn new(facts: &'a [DayFact]) -> Self {
        Self {
            by_date: facts.iter().map(|f| (f.date, f)).collect(),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&'a DayFact> {
        self.by_date.get(&date).copied()
    }

    /// Sums every fact in `[start, end]`. An inverted range sums nothing.
    pub fn sum_range(&self, start: NaiveDate, end: NaiveDate) -> MetricSums {
        let mut sums = MetricSums::default();
        if end < start {
            return sums;
        }
        for fact in self.by_date.range(start..=end).map(|(_, f)| f) {
            sums.merge(&fact.metrics);
        }
        sums
    }
}
