//! Day-by-day cumulative series for the current week, the preceding weeks
//! and the weekday-aligned week one year earlier.

use crate::calendar::{add_days, closest_weekday_last_year, start_of_week, weekday_label};
use crate::facts::{FactIndex, MetricSums};
use crate::schema::RollupConfig;
use crate::series::LabeledSeries;
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

pub const CURRENT_WEEK_LABEL: &str = "Current Week";
pub const SAME_WEEK_LY_LABEL: &str = "Same Week LY";

#[derive(Debug, Clone, Serialize)]
pub struct WeekTrend {
    pub week_label: String,
    pub week_start: NaiveDate,
    pub daily_cumulative: LabeledSeries,
    /// `None` when no day of the week has a fact yet.
    pub week_total: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyTrends {
    pub data: BTreeMap<String, Vec<WeekTrend>>,
    pub days: Vec<String>,
}

fn week_label(weeks_back: usize) -> String {
    match weeks_back {
        0 => CURRENT_WEEK_LABEL.to_string(),
        1 => "Last Week".to_string(),
        n => format!("{} Weeks Ago", n),
    }
}

/// Running sums for each day of one week; `None` for days after the as-of date.
struct WeekWalk {
    label: String,
    start: NaiveDate,
    daily: Vec<Option<MetricSums>>,
    total: Option<MetricSums>,
}

pub struct WeeklyTrendBuilder<'a> {
    config: &'a RollupConfig,
}

impl<'a> WeeklyTrendBuilder<'a> {
    pub fn new(config: &'a RollupConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, index: &FactIndex<'_>, as_of: NaiveDate) -> WeeklyTrends {
        let current_start = start_of_week(as_of, self.config.week_start.weekday());

        let mut walks: Vec<WeekWalk> = (0..self.config.trailing_weeks)
            .map(|back| {
                let start = add_days(current_start, -7 * back as i64);
                walk_week(index, week_label(back), start, as_of)
            })
            .collect();

        let ly_start = closest_weekday_last_year(current_start);
        walks.push(walk_week(index, SAME_WEEK_LY_LABEL.to_string(), ly_start, as_of));

        debug!(
            "Weekly trends from {} ({} weeks plus {} last year)",
            current_start,
            self.config.trailing_weeks,
            ly_start
        );

        let days: Vec<&'static str> = self
            .config
            .week_start
            .days()
            .iter()
            .map(|d| weekday_label(*d))
            .collect();

        let mut data = BTreeMap::new();
        for metric in self.config.metric_names() {
            let trends = walks
                .iter()
                .map(|walk| {
                    let mut daily_cumulative = LabeledSeries::new();
                    for (label, slot) in days.iter().zip(&walk.daily) {
                        daily_cumulative.push(
                            *label,
                            slot.as_ref().map(|sums| self.config.value_of(metric, sums)),
                        );
                    }
                    WeekTrend {
                        week_label: walk.label.clone(),
                        week_start: walk.start,
                        daily_cumulative,
                        week_total: walk
                            .total
                            .as_ref()
                            .map(|sums| self.config.value_of(metric, sums)),
                    }
                })
                .collect();
            data.insert(metric.to_string(), trends);
        }

        WeeklyTrends {
            data,
            days: days.iter().map(|d| d.to_string()).collect(),
        }
    }
}

fn walk_week(index: &FactIndex<'_>, label: String, start: NaiveDate, as_of: NaiveDate) -> WeekWalk {
    let mut running = MetricSums::default();
    let mut has_data = false;

    let daily = (0..7)
        .map(|offset| {
            let day = add_days(start, offset);
            if day > as_of {
                return None;
            }
            if let Some(fact) = index.get(day) {
                running.merge(&fact.metrics);
                has_data = true;
            }
            Some(running.clone())
        })
        .collect();

    WeekWalk {
        label,
        start,
        daily,
        total: has_data.then_some(running),
    }
}
