use crate::error::{Result, RollupError};
use crate::MetricSums;
use chrono::Weekday;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema, Default)]
#[serde(rename_all = "PascalCase")]
pub enum WeekStart {
    #[default]
    #[schemars(description = "Weeks run Sunday to Saturday (day labels Sun..Sat).")]
    Sunday,

    #[schemars(description = "Weeks run Monday to Sunday (day labels Mon..Sun).")]
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }

    /// The seven weekdays in display order, starting with the first day of the week.
    pub fn days(self) -> [Weekday; 7] {
        let first = self.weekday();
        std::array::from_fn(|i| (0..i).fold(first, |day, _| day.succ()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MetricDef {
    #[schemars(description = "Metric name used as the key in every output table (e.g. 'spend').")]
    pub name: String,

    #[schemars(description = "Header of the export column holding this metric (e.g. 'Cost').")]
    pub column: String,
}

impl MetricDef {
    pub fn new(name: &str, column: &str) -> Self {
        Self {
            name: name.to_string(),
            column: column.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedFormula {
    /// `numerator / denominator * scale`, computed from aggregated sums.
    Ratio {
        numerator: String,
        denominator: String,
        #[serde(default = "default_scale")]
        #[schemars(description = "Multiplier applied to the ratio. Use 100 for percentages.")]
        scale: f64,
    },
}

fn default_scale() -> f64 {
    1.0
}

/// A ratio metric recomputed from aggregated raw sums for every window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DerivedMetricSpec {
    pub name: String,
    pub formula: DerivedFormula,
}

impl DerivedMetricSpec {
    pub fn ratio(name: &str, numerator: &str, denominator: &str) -> Self {
        Self::scaled_ratio(name, numerator, denominator, 1.0)
    }

    pub fn scaled_ratio(name: &str, numerator: &str, denominator: &str, scale: f64) -> Self {
        Self {
            name: name.to_string(),
            formula: DerivedFormula::Ratio {
                numerator: numerator.to_string(),
                denominator: denominator.to_string(),
                scale,
            },
        }
    }

    /// Evaluates the formula over summed raw values. A zero denominator yields 0.
    pub fn evaluate(&self, sums: &MetricSums) -> f64 {
        match &self.formula {
            DerivedFormula::Ratio {
                numerator,
                denominator,
                scale,
            } => {
                let den = sums.get(denominator);
                if den == 0.0 {
                    0.0
                } else {
                    sums.get(numerator) / den * scale
                }
            }
        }
    }

    pub fn components(&self) -> Vec<&str> {
        match &self.formula {
            DerivedFormula::Ratio {
                numerator,
                denominator,
                ..
            } => vec![numerator.as_str(), denominator.as_str()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RollupConfig {
    #[schemars(description = "Name of the metric family, used in log output (e.g. 'advertising').")]
    pub family: String,

    #[serde(default = "default_date_column")]
    #[schemars(description = "Header of the date column. Dates are M/D/YYYY or YYYY-MM-DD.")]
    pub date_column: String,

    #[schemars(description = "Raw additive metrics read from each row.")]
    pub metrics: Vec<MetricDef>,

    #[serde(default)]
    #[schemars(description = "Ratio metrics recomputed from aggregated raw sums.")]
    pub derived: Vec<DerivedMetricSpec>,

    #[serde(default)]
    pub week_start: WeekStart,

    #[serde(default = "default_yoy_min_year")]
    #[schemars(description = "Years before this are ignored by the year-over-year tables.")]
    pub yoy_min_year: i32,

    #[serde(default = "default_yoy_years")]
    #[schemars(description = "How many of the most recent observed years the year-over-year tables compare.")]
    pub yoy_years: usize,

    #[serde(default = "default_trailing_months")]
    pub trailing_months: usize,

    #[serde(default = "default_trailing_weeks")]
    pub trailing_weeks: usize,
}

fn default_date_column() -> String {
    "Date".to_string()
}

fn default_yoy_min_year() -> i32 {
    2024
}

fn default_yoy_years() -> usize {
    3
}

fn default_trailing_months() -> usize {
    6
}

fn default_trailing_weeks() -> usize {
    6
}

impl RollupConfig {
    pub fn new(family: &str, metrics: Vec<MetricDef>, derived: Vec<DerivedMetricSpec>) -> Self {
        Self {
            family: family.to_string(),
            date_column: default_date_column(),
            metrics,
            derived,
            week_start: WeekStart::default(),
            yoy_min_year: default_yoy_min_year(),
            yoy_years: default_yoy_years(),
            trailing_months: default_trailing_months(),
            trailing_weeks: default_trailing_weeks(),
        }
    }

    /// Ad-platform export: clicks, impressions, cost and conversions.
    pub fn advertising() -> Self {
        Self::new(
            "advertising",
            vec![
                MetricDef::new("clicks", "Clicks"),
                MetricDef::new("impressions", "Impressions"),
                MetricDef::new("spend", "Cost"),
                MetricDef::new("conversions", "Conversions"),
            ],
            vec![
                DerivedMetricSpec::ratio("avg_cpc", "spend", "clicks"),
                DerivedMetricSpec::ratio("cost_per_conversion", "spend", "conversions"),
                DerivedMetricSpec::scaled_ratio("ctr", "clicks", "impressions", 100.0),
                DerivedMetricSpec::scaled_ratio("conversion_rate", "conversions", "clicks", 100.0),
            ],
        )
    }

    /// Traffic-source spreadsheet: sessions per acquisition channel plus their total.
    pub fn traffic() -> Self {
        Self::new(
            "traffic",
            vec![
                MetricDef::new("organic", "Organic"),
                MetricDef::new("direct", "Direct"),
                MetricDef::new("referral", "Referral"),
                MetricDef::new("paid", "Paid"),
                MetricDef::new("total", "Total"),
            ],
            vec![
                DerivedMetricSpec::scaled_ratio("organic_share", "organic", "total", 100.0),
                DerivedMetricSpec::scaled_ratio("paid_share", "paid", "total", 100.0),
            ],
        )
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn with_yoy_min_year(mut self, year: i32) -> Self {
        self.yoy_min_year = year;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RollupConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(RollupError::InvalidConfig(
                "at least one raw metric is required".to_string(),
            ));
        }

        let mut names = BTreeSet::new();
        for name in self.metric_names() {
            if name.is_empty() {
                return Err(RollupError::InvalidConfig(
                    "metric names must not be empty".to_string(),
                ));
            }
            if !names.insert(name) {
                return Err(RollupError::InvalidConfig(format!(
                    "metric '{}' is defined more than once",
                    name
                )));
            }
        }

        for spec in &self.derived {
            for component in spec.components() {
                if !self.is_raw(component) {
                    return Err(RollupError::InvalidConfig(format!(
                        "derived metric '{}' references unknown raw metric '{}'",
                        spec.name, component
                    )));
                }
            }
        }

        if self.yoy_years == 0 || self.trailing_months == 0 || self.trailing_weeks == 0 {
            return Err(RollupError::InvalidConfig(
                "yoy_years, trailing_months and trailing_weeks must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_raw(&self, name: &str) -> bool {
        self.metrics.iter().any(|m| m.name == name)
    }

    /// Raw metric names followed by derived metric names.
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics
            .iter()
            .map(|m| m.name.as_str())
            .chain(self.derived.iter().map(|d| d.name.as_str()))
    }

    /// Value of `metric` over a window: the raw sum, or the derived formula
    /// applied to the window's sums. Unknown names yield 0.
    pub fn value_of(&self, metric: &str, sums: &MetricSums) -> f64 {
        match self.derived.iter().find(|d| d.name == metric) {
            Some(spec) => spec.evaluate(sums),
            None => sums.get(metric),
        }
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RollupConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::json_schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(RollupConfig::advertising().validate().is_ok());
        assert!(RollupConfig::traffic().validate().is_ok());
    }

    #[test]
    fn test_ratio_divide_by_zero_is_zero() {
        let spec = DerivedMetricSpec::ratio("avg_cpc", "spend", "clicks");
        let mut sums = MetricSums::default();
        sums.add("spend", 12.0);
        assert_eq!(spec.evaluate(&sums), 0.0);

        sums.add("clicks", 4.0);
        assert!((spec.evaluate(&sums) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let json = r#"{
            "family": "custom",
            "metrics": [{"name": "clicks", "column": "Clicks"}, {"name": "spend", "column": "Cost"}],
            "derived": [{"name": "avg_cpc", "formula": {"kind": "ratio", "numerator": "spend", "denominator": "clicks"}}]
        }"#;
        let config = RollupConfig::from_json_str(json).unwrap();
        assert_eq!(config.date_column, "Date");
        assert_eq!(config.week_start, WeekStart::Sunday);
        assert_eq!(config.yoy_min_year, 2024);
        assert_eq!(config.yoy_years, 3);
        assert_eq!(
            config.derived[0].formula,
            DerivedFormula::Ratio {
                numerator: "spend".to_string(),
                denominator: "clicks".to_string(),
                scale: 1.0
            }
        );
    }

    #[test]
    fn test_validate_rejects_unknown_component() {
        let config = RollupConfig::new(
            "broken",
            vec![MetricDef::new("clicks", "Clicks")],
            vec![DerivedMetricSpec::ratio("avg_cpc", "spend", "clicks")],
        );
        assert!(matches!(config.validate(), Err(RollupError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let config = RollupConfig::new(
            "dupes",
            vec![MetricDef::new("clicks", "Clicks"), MetricDef::new("clicks", "Clicks 2")],
            vec![],
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_week_start_days() {
        let labels: Vec<Weekday> = WeekStart::Monday.days().to_vec();
        assert_eq!(labels[0], Weekday::Mon);
        assert_eq!(labels[6], Weekday::Sun);
        assert_eq!(WeekStart::Sunday.days()[6], Weekday::Sat);
    }

    #[test]
    fn test_schema_generation() {
        let schema = RollupConfig::schema_as_json().unwrap();
        assert!(schema.contains("week_start"));
        assert!(schema.contains("yoy_min_year"));
    }
}
