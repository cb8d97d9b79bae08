// Turns derived metrics into the ordered blocks a dashboard front-end
// draws. No counting happens here; every number comes from the aggregator.

use crate::config::{AggregateOptions, KpiSet, PresenterConfig, SummaryChart};
use crate::error::{FeatureUnavailable, LoadError};
use crate::types::{DerivedMetrics, Feature, HourlyStatusCounts, Kpis};
use crate::util::{format_int, format_number};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: usize,
    pub color: Option<String>,
    /// Drawn pulled out of the donut.
    pub pulled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarEntry {
    pub label: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub color: String,
    pub values: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayBlock {
    Metric {
        label: String,
        value: String,
        accent: Option<String>,
    },
    Pie {
        title: String,
        hole: f64,
        slices: Vec<Slice>,
    },
    /// Horizontal bars, largest first.
    Bar {
        title: String,
        value_label: String,
        bars: Vec<BarEntry>,
    },
    StackedBar {
        title: String,
        x_label: String,
        categories: Vec<String>,
        series: Vec<Series>,
        overlay: Series,
    },
    Warning {
        slot: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardView {
    /// Nothing uploaded yet.
    Idle { prompt: String },
    Failed { message: String, hint: String },
    Ready {
        title: String,
        blocks: Vec<DisplayBlock>,
    },
}

impl DashboardView {
    pub fn failed(err: &LoadError, cfg: &PresenterConfig) -> Self {
        DashboardView::Failed {
            message: err.to_string(),
            hint: cfg.load_failure_hint.clone(),
        }
    }
}

pub fn present(
    metrics: Option<&DerivedMetrics>,
    opts: &AggregateOptions,
    cfg: &PresenterConfig,
) -> DashboardView {
    let Some(m) = metrics else {
        return DashboardView::Idle {
            prompt: cfg.idle_prompt.clone(),
        };
    };

    let mut blocks = kpi_blocks(&m.kpis, opts.kpi_set, cfg);

    blocks.push(match cfg.summary_chart {
        SummaryChart::Payment => match &m.payment_breakdown {
            Feature::Available(counts) => DisplayBlock::Pie {
                title: cfg.payment_title.clone(),
                hole: 0.3,
                slices: counts
                    .iter()
                    .map(|c| Slice {
                        label: c.payment_code.clone(),
                        value: c.count,
                        color: None,
                        pulled: false,
                    })
                    .collect(),
            },
            Feature::Unavailable(why) => warning(&cfg.payment_title, why),
        },
        SummaryChart::SlaDonut => match &m.sla_rollup {
            Feature::Available(counts) => DisplayBlock::Pie {
                title: cfg.sla_donut_title.clone(),
                hole: 0.4,
                slices: counts
                    .iter()
                    .map(|c| Slice {
                        label: c.category.clone(),
                        value: c.count,
                        color: Some(cfg.donut_color_for(&c.category)),
                        pulled: c.category == opts.vocabulary.sla_over,
                    })
                    .collect(),
            },
            Feature::Unavailable(why) => warning(&cfg.sla_donut_title, why),
        },
    });

    let rider_title = format!("{} (Top {})", cfg.rider_title, opts.rider_top_n);
    blocks.push(match &m.rider_ranking {
        Feature::Available(ranking) => DisplayBlock::Bar {
            value_label: format!("Number of Orders ({} riders)", ranking.len()),
            bars: ranking
                .top(opts.rider_top_n)
                .iter()
                .map(|r| BarEntry {
                    label: r.rider_name.clone(),
                    value: r.total_orders,
                })
                .collect(),
            title: rider_title,
        },
        Feature::Unavailable(why) => warning(&rider_title, why),
    });

    blocks.push(match &m.hourly {
        Feature::Available(hourly) => hourly_block(hourly, opts, cfg),
        Feature::Unavailable(why) => warning(&cfg.hourly_title, why),
    });

    DashboardView::Ready {
        title: cfg.title.clone(),
        blocks,
    }
}

fn warning(slot: &str, why: &FeatureUnavailable) -> DisplayBlock {
    DisplayBlock::Warning {
        slot: slot.to_string(),
        message: format!("Cannot build '{}': {}", slot, why),
    }
}

fn metric(label: &str, value: String) -> DisplayBlock {
    DisplayBlock::Metric {
        label: label.to_string(),
        value,
        accent: None,
    }
}

fn feature_metric<T>(label: &str, f: &Feature<T>, fmt: impl FnOnce(&T) -> String) -> DisplayBlock {
    match f {
        Feature::Available(v) => metric(label, fmt(v)),
        Feature::Unavailable(why) => warning(label, why),
    }
}

fn kpi_blocks(k: &Kpis, set: KpiSet, cfg: &PresenterConfig) -> Vec<DisplayBlock> {
    match set {
        KpiSet::Standard => vec![
            metric("Total Order", format_int(k.total_orders)),
            feature_metric("Total Value", &k.total_value, |v| format_number(*v, 2)),
            metric("Total Complete", format_int(k.total_complete)),
            metric("Total Cancel", format_int(k.total_unsuccessful)),
            feature_metric("Total Rider", &k.total_riders, |v| format_int(*v)),
        ],
        KpiSet::Monitoring => {
            let over_sla = match &k.over_sla_rate {
                Feature::Available(rate) => DisplayBlock::Metric {
                    label: "Over SLA Rate".to_string(),
                    value: format!("{}%", format_number(*rate, 2)),
                    accent: Some(if *rate > 0.0 {
                        cfg.alert_color.clone()
                    } else {
                        cfg.ok_color.clone()
                    }),
                },
                Feature::Unavailable(why) => warning("Over SLA Rate", why),
            };
            vec![
                metric("Total Order", format_int(k.total_orders)),
                metric("Total Complete", format_int(k.total_complete)),
                metric("On Process", format_number(k.total_on_process as f64, 0)),
                metric("Total Cancel", format_int(k.total_unsuccessful)),
                feature_metric("Total Rider", &k.total_riders, |v| format_int(*v)),
                feature_metric("Total Value", &k.total_value_ceil, |v| format_number(*v as f64, 0)),
                over_sla,
            ]
        }
    }
}

fn hourly_block(h: &HourlyStatusCounts, opts: &AggregateOptions, cfg: &PresenterConfig) -> DisplayBlock {
    let known = opts.vocabulary.sla_stack_order();
    let mut order: Vec<&str> = known
        .iter()
        .copied()
        .filter(|k| h.statuses.iter().any(|s| s == k))
        .collect();
    order.extend(
        h.statuses
            .iter()
            .map(String::as_str)
            .filter(|s| !known.contains(s)),
    );

    let series = order
        .into_iter()
        .map(|status| Series {
            name: status.to_string(),
            color: cfg.color_for(status),
            values: h.hours.iter().map(|hour| h.count(*hour, status)).collect(),
        })
        .collect();

    DisplayBlock::StackedBar {
        title: cfg.hourly_title.clone(),
        x_label: cfg.hour_axis_label.clone(),
        categories: h.hours.iter().map(|hour| hour.to_string()).collect(),
        series,
        overlay: Series {
            name: cfg.total_series_label.clone(),
            color: cfg.total_line_color.clone(),
            values: h.hours.iter().map(|hour| h.total(*hour)).collect(),
        },
    }
}
