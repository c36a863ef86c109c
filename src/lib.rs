//! # Metric Rollups
//!
//! A library for turning a flat list of daily marketing metrics (ad-platform
//! exports, traffic spreadsheets) into the monthly, weekly, year-over-year and
//! KPI views a dashboard renders.
//!
//! ## Core Concepts
//!
//! - **Raw rows**: Spreadsheet/export rows with a date cell and metric cells as text
//! - **Day facts**: One normalized record per calendar day of raw additive metrics
//! - **Derived metrics**: Ratios (CPC, CTR, share) recomputed from summed components
//!   for every window, never averaged across days
//! - **Null vs zero**: `null` means the period has not elapsed or has no rows,
//!   `0` means the period elapsed with zero activity
//! - **As-of date**: Every computation is a pure function of the facts and an
//!   explicit as-of date
//!
//! ## Example
//!
//! ```rust,ignore
//! use metric_rollups::*;
//! use chrono::NaiveDate;
//!
//! let config = RollupConfig::advertising();
//! let rows = vec![
//!     RawRow::from_pairs([("Date", "10/1/2026"), ("Clicks", "10"), ("Cost", "$5.00")]),
//!     RawRow::from_pairs([("Date", "10/2/2026"), ("Clicks", "20"), ("Cost", "$15.00")]),
//! ];
//!
//! let as_of = NaiveDate::from_ymd_opt(2026, 10, 2).unwrap();
//! let rollups = build_rollups(&rows, &config, as_of).unwrap();
//! println!("{}", rollups.to_json_pretty().unwrap());
//! ```

pub mod calendar;
pub mod engine;
pub mod error;
pub mod facts;
pub mod ingestion;
pub mod kpi;
pub mod monthly;
pub mod schema;
pub mod series;
pub mod weekly;
pub mod yoy;

pub use calendar::{closest_weekday_last_year, iso_week, week_of_month};
pub use engine::{DashboardRollups, RollupEngine};
pub use error::{Result, RollupError};
pub use facts::{merge_by_date, DayFact, FactIndex, MetricSums};
pub use ingestion::*;
pub use kpi::{KpiBuilder, KpiComparison, KpiWindows, MetricKpi};
pub use monthly::{MonthRow, MonthlyRollupBuilder, MonthlyTrends};
pub use schema::*;
pub use series::LabeledSeries;
pub use weekly::{WeekTrend, WeeklyTrendBuilder, WeeklyTrends};
pub use yoy::{YoyBuilder, YoyMonthRow, YoyTables, YoyWeekRow};

use chrono::NaiveDate;
use log::{debug, info};

pub struct RollupProcessor;

impl RollupProcessor {
    /// Normalizes raw rows and builds every view as of `as_of`.
    pub fn process(
        rows: &[RawRow],
        config: &RollupConfig,
        as_of: NaiveDate,
    ) -> Result<DashboardRollups> {
        config.validate()?;

        info!(
            "Processing {} raw rows for family '{}' as of {}",
            rows.len(),
            config.family,
            as_of
        );

        let facts = normalize_rows(rows, config);
        if facts.is_empty() {
            return Err(RollupError::NoData);
        }

        Self::process_facts(&facts, config, as_of)
    }

    /// Builds every view from already-normalized facts.
    pub fn process_facts(
        facts: &[DayFact],
        config: &RollupConfig,
        as_of: NaiveDate,
    ) -> Result<DashboardRollups> {
        debug!(
            "Facts span {:?} to {:?}",
            facts.iter().map(|f| f.date).min(),
            facts.iter().map(|f| f.date).max()
        );
        RollupEngine::new(config).run(facts, as_of)
    }

    /// Awaits the upstream fetch, then runs synchronously on the fetched rows.
    pub async fn process_source(
        source: &dyn RowSource,
        config: &RollupConfig,
        as_of: NaiveDate,
    ) -> Result<DashboardRollups> {
        let rows = source.fetch_rows().await?;
        Self::process(&rows, config, as_of)
    }

    /// Uses the local calendar date as the as-of date.
    pub fn process_today(rows: &[RawRow], config: &RollupConfig) -> Result<DashboardRollups> {
        Self::process(rows, config, chrono::Local::now().date_naive())
    }
}

pub fn build_rollups(
    rows: &[RawRow],
    config: &RollupConfig,
    as_of: NaiveDate,
) -> Result<DashboardRollups> {
    RollupProcessor::process(rows, config, as_of)
}

pub fn build_rollups_from_facts(
    facts: &[DayFact],
    config: &RollupConfig,
    as_of: NaiveDate,
) -> Result<DashboardRollups> {
    RollupProcessor::process_facts(facts, config, as_of)
}
