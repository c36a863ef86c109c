//! Headline KPIs: yesterday, week-to-date, month-to-date and year-to-date,
//! each against its prior-year window.
//!
//! Yesterday and week-to-date use weekday-aligned prior-year dates; the
//! month and year windows are aligned on calendar days.

use crate::calendar::{
    add_days, closest_weekday_last_year, first_of_month, first_of_year, same_day_last_year,
    start_of_week,
};
use crate::facts::{FactIndex, MetricSums};
use crate::schema::RollupConfig;
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }
}

/// A current window and the prior-year window it is compared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPair {
    pub current: DateWindow,
    pub prior: DateWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiWindows {
    pub today: DateWindow,
    pub yesterday: WindowPair,
    pub this_week: WindowPair,
    pub mtd: WindowPair,
    pub ytd: WindowPair,
}

impl KpiWindows {
    pub fn for_date(as_of: NaiveDate, config: &RollupConfig) -> Self {
        let yesterday = add_days(as_of, -1);
        let yesterday_py = closest_weekday_last_year(yesterday);

        // Prior-year week covers the same number of elapsed days, not the full week
        let week_start = start_of_week(as_of, config.week_start.weekday());
        let elapsed = (as_of - week_start).num_days();
        let week_start_py = closest_weekday_last_year(week_start);

        let month_start = first_of_month(as_of);
        let year_start = first_of_year(as_of);
        let as_of_py = same_day_last_year(as_of);

        Self {
            today: DateWindow::day(as_of),
            yesterday: WindowPair {
                current: DateWindow::day(yesterday),
                prior: DateWindow::day(yesterday_py),
            },
            this_week: WindowPair {
                current: DateWindow::new(week_start, as_of),
                prior: DateWindow::new(week_start_py, add_days(week_start_py, elapsed)),
            },
            mtd: WindowPair {
                current: DateWindow::new(month_start, as_of),
                prior: DateWindow::new(same_day_last_year(month_start), as_of_py),
            },
            ytd: WindowPair {
                current: DateWindow::new(year_start, as_of),
                prior: DateWindow::new(same_day_last_year(year_start), as_of_py),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiComparison {
    pub value: f64,
    pub py: f64,
    pub change_pct: f64,
    pub diff: f64,
}

impl KpiComparison {
    pub fn new(value: f64, py: f64) -> Self {
        Self {
            value,
            py,
            change_pct: change_pct(value, py),
            diff: value - py,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricKpi {
    pub today: f64,
    pub yesterday: KpiComparison,
    pub this_week: KpiComparison,
    pub mtd: KpiComparison,
    pub ytd: KpiComparison,
}

/// Percent change rounded to one decimal; 0 against a zero baseline.
pub fn change_pct(value: f64, py: f64) -> f64 {
    if py == 0.0 {
        return 0.0;
    }
    ((value - py) / py * 100.0 * 10.0).round() / 10.0
}

struct PairSums {
    current: MetricSums,
    prior: MetricSums,
}

impl PairSums {
    fn new(index: &FactIndex<'_>, pair: &WindowPair) -> Self {
        Self {
            current: index.sum_range(pair.current.start, pair.current.end),
            prior: index.sum_range(pair.prior.start, pair.prior.end),
        }
    }

    fn compare(&self, config: &RollupConfig, metric: &str) -> KpiComparison {
        KpiComparison::new(
            config.value_of(metric, &self.current),
            config.value_of(metric, &self.prior),
        )
    }
}

pub struct KpiBuilder<'a> {
    config: &'a RollupConfig,
}

impl<'a> KpiBuilder<'a> {
    pub fn new(config: &'a RollupConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, index: &FactIndex<'_>, as_of: NaiveDate) -> BTreeMap<String, MetricKpi> {
        let windows = KpiWindows::for_date(as_of, self.config);
        debug!("KPI windows for {}: {:?}", as_of, windows);

        let today = index.sum_range(windows.today.start, windows.today.end);
        let yesterday = PairSums::new(index, &windows.yesterday);
        let this_week = PairSums::new(index, &windows.this_week);
        let mtd = PairSums::new(index, &windows.mtd);
        let ytd = PairSums::new(index, &windows.ytd);

        self.config
            .metric_names()
            .map(|metric| {
                let kpi = MetricKpi {
                    today: self.config.value_of(metric, &today),
                    yesterday: yesterday.compare(self.config, metric),
                    this_week: this_week.compare(self.config, metric),
                    mtd: mtd.compare(self.config, metric),
                    ytd: ytd.compare(self.config, metric),
                };
                (metric.to_string(), kpi)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::DayFact;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fact(date: NaiveDate, clicks: f64, spend: f64) -> DayFact {
        let mut sums = MetricSums::default();
        sums.add("clicks", clicks);
        sums.add("spend", spend);
        DayFact::new(date, sums)
    }

    #[test]
    fn test_change_pct() {
        assert_eq!(change_pct(150.0, 100.0), 50.0);
        assert_eq!(change_pct(2.0, 3.0), -33.3);
        assert_eq!(change_pct(10.0, 0.0), 0.0);
        assert_eq!(change_pct(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_windows_for_monday() {
        let config = RollupConfig::advertising();
        // Monday 2026-10-19, week starts Sunday 2026-10-18
        let w = KpiWindows::for_date(d(2026, 10, 19), &config);

        assert_eq!(w.yesterday.current, DateWindow::day(d(2026, 10, 18)));
        assert_eq!(w.yesterday.prior, DateWindow::day(d(2025, 10, 19)));

        assert_eq!(w.this_week.current, DateWindow::new(d(2026, 10, 18), d(2026, 10, 19)));
        assert_eq!(w.this_week.prior, DateWindow::new(d(2025, 10, 19), d(2025, 10, 20)));

        assert_eq!(w.mtd.current, DateWindow::new(d(2026, 10, 1), d(2026, 10, 19)));
        assert_eq!(w.mtd.prior, DateWindow::new(d(2025, 10, 1), d(2025, 10, 19)));

        assert_eq!(w.ytd.current, DateWindow::new(d(2026, 1, 1), d(2026, 10, 19)));
        assert_eq!(w.ytd.prior, DateWindow::new(d(2025, 1, 1), d(2025, 10, 19)));
    }

    #[test]
    fn test_leap_day_prior_year_window() {
        let config = RollupConfig::advertising();
        let w = KpiWindows::for_date(d(2028, 2, 29), &config);
        assert_eq!(w.mtd.prior, DateWindow::new(d(2027, 2, 1), d(2027, 2, 28)));
    }

    #[test]
    fn test_yesterday_with_zero_baseline() {
        let config = RollupConfig::advertising();
        let facts = vec![fact(d(2026, 10, 18), 10.0, 4.0)];
        let index = FactIndex::new(&facts);

        let kpis = KpiBuilder::new(&config).build(&index, d(2026, 10, 19));
        let clicks = &kpis["clicks"];
        assert_eq!(clicks.today, 0.0);
        assert_eq!(clicks.yesterday.value, 10.0);
        assert_eq!(clicks.yesterday.py, 0.0);
        assert_eq!(clicks.yesterday.change_pct, 0.0);
        assert!(clicks.yesterday.change_pct.is_finite());
        assert_eq!(clicks.yesterday.diff, 10.0);
    }

    #[test]
    fn test_this_week_compares_elapsed_days_only() {
        let config = RollupConfig::advertising();
        let facts = vec![
            fact(d(2026, 10, 18), 10.0, 1.0),
            fact(d(2026, 10, 19), 10.0, 1.0),
            // Prior-year aligned window is 2025-10-19..=2025-10-20
            fact(d(2025, 10, 19), 5.0, 1.0),
            fact(d(2025, 10, 20), 5.0, 1.0),
            // Later in the prior-year week: outside the elapsed window
            fact(d(2025, 10, 22), 100.0, 1.0),
        ];
        let index = FactIndex::new(&facts);

        let kpis = KpiBuilder::new(&config).build(&index, d(2026, 10, 19));
        let week = kpis["clicks"].this_week;
        assert_eq!(week.value, 20.0);
        assert_eq!(week.py, 10.0);
        assert_eq!(week.change_pct, 100.0);
        assert_eq!(week.diff, 10.0);
    }

    #[test]
    fn test_mtd_and_ytd_calendar_aligned() {
        let config = RollupConfig::advertising();
        let facts = vec![
            fact(d(2026, 2, 10), 30.0, 3.0),
            fact(d(2026, 10, 2), 10.0, 5.0),
            fact(d(2026, 10, 19), 20.0, 15.0),
            fact(d(2025, 10, 19), 8.0, 2.0),
            fact(d(2025, 10, 20), 99.0, 9.0),
            fact(d(2025, 3, 1), 12.0, 3.0),
        ];
        let index = FactIndex::new(&facts);

        let kpis = KpiBuilder::new(&config).build(&index, d(2026, 10, 19));
        let clicks = &kpis["clicks"];
        assert_eq!(clicks.today, 20.0);
        assert_eq!(clicks.mtd.value, 30.0);
        assert_eq!(clicks.mtd.py, 8.0);
        assert_eq!(clicks.ytd.value, 60.0);
        assert_eq!(clicks.ytd.py, 20.0);
        assert_eq!(clicks.ytd.change_pct, 200.0);

        // Ratio over the month-to-date window, not an average of daily ratios
        let cpc = kpis["avg_cpc"].mtd.value;
        assert!((cpc - 20.0 / 30.0).abs() < 1e-9);
    }
}
