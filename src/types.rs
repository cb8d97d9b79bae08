use crate::error::FeatureUnavailable;
use crate::util::format_number;
use serde::Serialize;
use std::fmt;
use tabled::Tabled;

/// Hour of day after normalization. `"08"`, `"8"` and `8.0` are all `Hour(8)`
/// and display as `8`; ordering follows the integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Hour(pub u32);

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the uploaded sheet. An order can span several rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderRecord {
    pub order_id: Option<String>,
    pub net_order_value: Option<f64>,
    pub status: Option<String>,
    pub rider_name: Option<String>,
    pub payment_code: Option<String>,
    pub hour: Option<Hour>,
    pub sla_status: Option<String>,
}

/// One uploaded row as shown in the raw data view; empty cells print blank.
#[derive(Debug, Clone, Tabled)]
pub struct RawDataRow {
    #[tabled(rename = "Order ID")]
    pub order_id: String,
    #[tabled(rename = "Net Order Value")]
    pub net_order_value: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Rider Name")]
    pub rider_name: String,
    #[tabled(rename = "Payment Code")]
    pub payment_code: String,
    #[tabled(rename = "Hours")]
    pub hour: String,
    #[tabled(rename = "SLA STS")]
    pub sla_status: String,
}

impl From<&OrderRecord> for RawDataRow {
    fn from(r: &OrderRecord) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            order_id: text(&r.order_id),
            net_order_value: r.net_order_value.map(|v| format_number(v, 2)).unwrap_or_default(),
            status: text(&r.status),
            rider_name: text(&r.rider_name),
            payment_code: text(&r.payment_code),
            hour: r.hour.map(|h| h.to_string()).unwrap_or_default(),
            sla_status: text(&r.sla_status),
        }
    }
}

/// Optional columns the sheet actually carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPresence {
    pub net_order_value: bool,
    pub rider_name: bool,
    pub payment_code: bool,
    pub hours: bool,
    pub sla_status: bool,
}

impl ColumnPresence {
    #[cfg(test)]
    pub fn all() -> Self {
        Self {
            net_order_value: true,
            rider_name: true,
            payment_code: true,
            hours: true,
            sla_status: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawOrderTable {
    pub records: Vec<OrderRecord>,
    pub columns: ColumnPresence,
}

/// A figure that may be missing because its input column is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Feature<T> {
    Available(T),
    Unavailable(FeatureUnavailable),
}

impl<T> Feature<T> {
    pub fn missing(column: &str) -> Self {
        Feature::Unavailable(FeatureUnavailable::MissingColumn {
            column: column.to_string(),
        })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Feature<U> {
        match self {
            Feature::Available(v) => Feature::Available(f(v)),
            Feature::Unavailable(why) => Feature::Unavailable(why),
        }
    }

    #[cfg(test)]
    pub fn available(&self) -> Option<&T> {
        match self {
            Feature::Available(v) => Some(v),
            Feature::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_orders: usize,
    pub total_value: Feature<f64>,
    pub total_value_ceil: Feature<i64>,
    /// Row count of complete-status rows.
    pub total_complete: usize,
    /// Row count of unsuccessful-delivery rows.
    pub total_unsuccessful: usize,
    pub total_riders: Feature<usize>,
    /// `total_orders - total_complete`; negative when complete orders span
    /// several rows.
    pub total_on_process: i64,
    pub over_sla_rate: Feature<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentCount {
    pub payment_code: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiderCount {
    pub rider_name: String,
    pub total_orders: usize,
}

/// Riders by distinct order count, highest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RiderRanking(pub Vec<RiderCount>);

impl RiderRanking {
    pub fn top(&self, n: usize) -> &[RiderCount] {
        &self.0[..n.min(self.0.len())]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyCell {
    pub hour: Hour,
    pub sla_status: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourTotal {
    pub hour: Hour,
    pub total: usize,
}

/// Row counts per (hour, SLA status), hours ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyStatusCounts {
    pub hours: Vec<Hour>,
    /// Distinct SLA statuses in first-seen order.
    pub statuses: Vec<String>,
    pub cells: Vec<HourlyCell>,
    pub totals: Vec<HourTotal>,
}

impl HourlyStatusCounts {
    pub fn count(&self, hour: Hour, status: &str) -> usize {
        self.cells
            .iter()
            .find(|c| c.hour == hour && c.sla_status == status)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    pub fn total(&self, hour: Hour) -> usize {
        self.totals
            .iter()
            .find(|t| t.hour == hour)
            .map(|t| t.total)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub kpis: Kpis,
    pub payment_breakdown: Feature<Vec<PaymentCount>>,
    pub rider_ranking: Feature<RiderRanking>,
    pub hourly: Feature<HourlyStatusCounts>,
    pub sla_rollup: Feature<Vec<SlaCount>>,
}
