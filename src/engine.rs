use crate::calendar::iso_week;
use crate::error::{Result, RollupError};
use crate::facts::{merge_by_date, DayFact, FactIndex};
use crate::kpi::{KpiBuilder, MetricKpi};
use crate::monthly::{MonthlyRollupBuilder, MonthlyTrends};
use crate::schema::RollupConfig;
use crate::weekly::{WeeklyTrendBuilder, WeeklyTrends};
use crate::yoy::{YoyBuilder, YoyMonthRow, YoyWeekRow};
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;

/// Every view the dashboard consumes, for one metric family and one as-of date.
/// The structure is the same for every family; only the metric keys differ.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardRollups {
    pub monthly_trends: MonthlyTrends,
    pub weekly_trends: WeeklyTrends,
    pub weekly_yoy: BTreeMap<String, Vec<YoyWeekRow>>,
    pub monthly_yoy: BTreeMap<String, Vec<YoyMonthRow>>,
    pub kpi: BTreeMap<String, MetricKpi>,
    pub current_week: u32,
    pub current_month: u32,
}

impl DashboardRollups {
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs the four builders over one fact list. Holds no state between runs.
pub struct RollupEngine<'a> {
    config: &'a RollupConfig,
}

impl<'a> RollupEngine<'a> {
    pub fn new(config: &'a RollupConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, facts: &[DayFact], as_of: NaiveDate) -> Result<DashboardRollups> {
        if facts.is_empty() {
            return Err(RollupError::NoData);
        }

        // Every builder sees one fact per date
        let facts = merge_by_date(facts);

        info!(
            "Building {} rollups from {} day facts as of {}",
            self.config.family,
            facts.len(),
            as_of
        );

        let monthly_trends = MonthlyRollupBuilder::new(self.config).build(&facts, as_of)?;

        let index = FactIndex::new(&facts);
        let weekly_trends = WeeklyTrendBuilder::new(self.config).build(&index, as_of);
        let yoy = YoyBuilder::new(self.config).build(&facts);
        let kpi = KpiBuilder::new(self.config).build(&index, as_of);

        debug!(
            "Rollups ready: {} monthly rows, {} yoy years, {} kpi metrics",
            monthly_trends.months.len(),
            yoy.years.len(),
            kpi.len()
        );

        Ok(DashboardRollups {
            monthly_trends,
            weekly_trends,
            weekly_yoy: yoy.weekly,
            monthly_yoy: yoy.monthly,
            kpi,
            current_week: iso_week(as_of),
            current_month: as_of.month(),
        })
    }
}
