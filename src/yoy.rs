//! Year-over-year tables keyed by ISO week and by calendar month.

use crate::calendar::{iso_week, iso_year, month_abbrev};
use crate::facts::{DayFact, MetricSums};
use crate::schema::RollupConfig;
use chrono::Datelike;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const YOY_WEEKS: u32 = 52;
pub const YOY_MONTHS: u32 = 12;

fn year_key(year: i32) -> String {
    format!("y{}", year)
}

#[derive(Debug, Clone, Serialize)]
pub struct YoyWeekRow {
    pub week_num: u32,
    pub week_label: String,
    /// `y<year>` to the value for that year, `null` when the year has no rows in this week.
    #[serde(flatten)]
    pub years: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct YoyMonthRow {
    pub month_num: u32,
    pub month_label: String,
    #[serde(flatten)]
    pub years: BTreeMap<String, Option<f64>>,
}

impl YoyWeekRow {
    pub fn value(&self, year: i32) -> Option<f64> {
        self.years.get(&year_key(year)).copied().flatten()
    }
}

impl YoyMonthRow {
    pub fn value(&self, year: i32) -> Option<f64> {
        self.years.get(&year_key(year)).copied().flatten()
    }
}

#[derive(Debug, Clone, Default)]
pub struct YoyTables {
    /// Compared years, oldest first.
    pub years: Vec<i32>,
    pub weekly: BTreeMap<String, Vec<YoyWeekRow>>,
    pub monthly: BTreeMap<String, Vec<YoyMonthRow>>,
}

pub struct YoyBuilder<'a> {
    config: &'a RollupConfig,
}

impl<'a> YoyBuilder<'a> {
    pub fn new(config: &'a RollupConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, facts: &[DayFact]) -> YoyTables {
        let years = self.compared_years(facts);
        debug!("Year-over-year tables comparing years {:?}", years);

        // Weeks are keyed by ISO year so the days around January 1st land in
        // the week they belong to.
        let mut by_week: BTreeMap<(i32, u32), MetricSums> = BTreeMap::new();
        let mut by_month: BTreeMap<(i32, u32), MetricSums> = BTreeMap::new();
        for fact in facts {
            by_week
                .entry((iso_year(fact.date), iso_week(fact.date)))
                .or_default()
                .merge(&fact.metrics);
            by_month
                .entry((fact.year, fact.date.month()))
                .or_default()
                .merge(&fact.metrics);
        }

        let mut weekly = BTreeMap::new();
        let mut monthly = BTreeMap::new();
        for metric in self.config.metric_names() {
            let week_rows = (1..=YOY_WEEKS)
                .map(|week| YoyWeekRow {
                    week_num: week,
                    week_label: format!("Week {}", week),
                    years: self.year_values(metric, &years, |year| by_week.get(&(year, week))),
                })
                .collect();

            let month_rows = (1..=YOY_MONTHS)
                .map(|month| YoyMonthRow {
                    month_num: month,
                    month_label: month_abbrev(month).to_string(),
                    years: self.year_values(metric, &years, |year| by_month.get(&(year, month))),
                })
                .collect();

            weekly.insert(metric.to_string(), week_rows);
            monthly.insert(metric.to_string(), month_rows);
        }

        YoyTables {
            years,
            weekly,
            monthly,
        }
    }

    /// The most recent `yoy_years` calendar years at or after the cutoff, oldest first.
    fn compared_years(&self, facts: &[DayFact]) -> Vec<i32> {
        let observed: BTreeSet<i32> = facts
            .iter()
            .map(|f| f.year)
            .filter(|y| *y >= self.config.yoy_min_year)
            .collect();

        let skip = observed.len().saturating_sub(self.config.yoy_years);
        observed.into_iter().skip(skip).collect()
    }

    fn year_values<'s>(
        &self,
        metric: &str,
        years: &[i32],
        lookup: impl Fn(i32) -> Option<&'s MetricSums>,
    ) -> BTreeMap<String, Option<f64>> {
        years
            .iter()
            .map(|&year| {
                let value = lookup(year).map(|sums| self.config.value_of(metric, sums));
                (year_key(year), value)
            })
            .collect()
    }
}
