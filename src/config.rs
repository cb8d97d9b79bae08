// Dashboard configuration.
//
// Everything that used to be a literal in the dashboard (column headers,
// status names, colors, chart titles) lives here and can be overridden from
// `sd_dashboard.toml`. Every field has a default, so an empty or missing
// file yields the standard dashboard.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "sd_dashboard.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub columns: ColumnMap,

    #[serde(default)]
    pub vocabulary: StatusVocabulary,

    #[serde(default)]
    pub aggregate: AggregateSettings,

    #[serde(default)]
    pub presenter: PresenterConfig,
}

/// Header names expected in the uploaded sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub order_id: String,
    pub net_order_value: String,
    pub status: String,
    pub rider_name: String,
    pub payment_code: String,
    pub hours: String,
    pub sla_status: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            order_id: "Order ID".to_string(),
            net_order_value: "Net Order Value".to_string(),
            status: "Status".to_string(),
            rider_name: "Rider Name".to_string(),
            payment_code: "Payment Code".to_string(),
            hours: "Hours".to_string(),
            sla_status: "SLA STS".to_string(),
        }
    }
}

/// Status and SLA literals matched by the aggregator. Matching is exact and
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusVocabulary {
    pub complete: String,
    pub unsuccessful: String,
    pub cancel: String,
    pub sla_within: String,
    pub sla_over: String,
    pub sla_dispatched: String,
    pub sla_pending: String,
    pub sla_cancel: String,
    /// Rollup label for within/pending/dispatched.
    pub sla_dot: String,
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        Self {
            complete: "COMPLETE".to_string(),
            unsuccessful: "UNSUCCESSFUL ON DEMAND DELIVERY".to_string(),
            cancel: "CANCEL".to_string(),
            sla_within: "Within SLA".to_string(),
            sla_over: "Over SLA".to_string(),
            sla_dispatched: "Dispatched".to_string(),
            sla_pending: "Pending".to_string(),
            sla_cancel: "Cancel".to_string(),
            sla_dot: "DOT".to_string(),
        }
    }
}

impl StatusVocabulary {
    /// SLA statuses in the order the hourly chart stacks them.
    pub fn sla_stack_order(&self) -> [&str; 5] {
        [
            self.sla_within.as_str(),
            self.sla_over.as_str(),
            self.sla_dispatched.as_str(),
            self.sla_pending.as_str(),
            self.sla_cancel.as_str(),
        ]
    }
}

/// Which headline cards the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiSet {
    /// Order, value, complete, cancel, rider.
    #[default]
    Standard,
    /// Adds on-process and over-SLA rate, value rounded up.
    Monitoring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateSettings {
    pub include_cancelled_in_rider_ranking: bool,
    pub kpi_set: KpiSet,
    pub rider_top_n: usize,
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self {
            include_cancelled_in_rider_ranking: true,
            kpi_set: KpiSet::Standard,
            rider_top_n: 20,
        }
    }
}

/// Options handed to the aggregator. `columns` is only used to name the
/// column behind an unavailable figure.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub include_cancelled_in_rider_ranking: bool,
    pub kpi_set: KpiSet,
    pub rider_top_n: usize,
    pub vocabulary: StatusVocabulary,
    pub columns: ColumnMap,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Config::default().aggregate_options()
    }
}

impl Config {
    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            include_cancelled_in_rider_ranking: self.aggregate.include_cancelled_in_rider_ranking,
            kpi_set: self.aggregate.kpi_set,
            rider_top_n: self.aggregate.rider_top_n,
            vocabulary: self.vocabulary.clone(),
            columns: self.columns.clone(),
        }
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Defaults rendered as TOML, for users who want a starting file.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).context("Failed to render default config")
    }
}

/// Left-hand chart next to the rider ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryChart {
    #[default]
    Payment,
    SlaDonut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    pub title: String,
    pub idle_prompt: String,
    pub load_failure_hint: String,
    pub summary_chart: SummaryChart,
    pub payment_title: String,
    pub sla_donut_title: String,
    pub rider_title: String,
    pub hourly_title: String,
    pub hour_axis_label: String,
    pub total_series_label: String,
    pub fallback_color: String,
    pub total_line_color: String,
    pub alert_color: String,
    pub ok_color: String,
    /// Rows shown by the raw data view.
    pub raw_preview_rows: usize,
    /// Hourly chart series colors keyed by SLA status.
    pub sla_colors: BTreeMap<String, String>,
    /// Donut slice colors keyed by rollup label.
    pub sla_donut_colors: BTreeMap<String, String>,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        let sla_colors = [
            ("Within SLA", "#0099FF"),
            ("Over SLA", "#FF3300"),
            ("Dispatched", "#CC00FF"),
            ("Pending", "#8ED973"),
            ("Cancel", "#B2B2B2"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let sla_donut_colors = [("DOT", "#0099FF"), ("Over SLA", "#d62728")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            title: "SD Monitoring Dashboard".to_string(),
            idle_prompt: "Upload an Excel file (.xlsx, .xls) to get started.".to_string(),
            load_failure_hint: "Check that the file is a valid .xlsx or .xls workbook."
                .to_string(),
            summary_chart: SummaryChart::Payment,
            payment_title: "Total Order by Payment".to_string(),
            sla_donut_title: "SLA Status".to_string(),
            rider_title: "Total Order by Rider".to_string(),
            hourly_title: "Status Order by Hour".to_string(),
            hour_axis_label: "Hour of Day".to_string(),
            total_series_label: "Total".to_string(),
            fallback_color: "#B2B2B2".to_string(),
            total_line_color: "#FFCC66".to_string(),
            alert_color: "red".to_string(),
            ok_color: "blue".to_string(),
            raw_preview_rows: 20,
            sla_colors,
            sla_donut_colors,
        }
    }
}

impl PresenterConfig {
    pub fn color_for(&self, status: &str) -> String {
        self.sla_colors
            .get(status)
            .cloned()
            .unwrap_or_else(|| self.fallback_color.clone())
    }

    pub fn donut_color_for(&self, category: &str) -> String {
        self.sla_donut_colors
            .get(category)
            .cloned()
            .unwrap_or_else(|| self.fallback_color.clone())
    }
}
