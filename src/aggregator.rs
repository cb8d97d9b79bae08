// Derived dashboard figures.
//
// Everything here is a pure function of the loaded table. "Orders" always
// means distinct `order_id` values; the status counters, payment breakdown,
// SLA rollup and hourly chart count rows.

use crate::config::{AggregateOptions, StatusVocabulary};
use crate::error::FeatureUnavailable;
use crate::types::{
    DerivedMetrics, Feature, Hour, HourTotal, HourlyCell, HourlyStatusCounts, Kpis, OrderRecord,
    PaymentCount, RawOrderTable, RiderCount, RiderRanking, SlaCount,
};
use std::collections::{BTreeMap, HashMap, HashSet};

pub fn aggregate(table: &RawOrderTable, opts: &AggregateOptions) -> DerivedMetrics {
    DerivedMetrics {
        kpis: compute_kpis(table, opts),
        payment_breakdown: payment_breakdown(table, opts),
        rider_ranking: rider_ranking(table, opts),
        hourly: hourly_status_counts(table, opts),
        sla_rollup: sla_rollup(table, opts),
    }
}

/// Number of distinct non-empty order ids among `rows`.
pub fn distinct_orders<'a>(rows: impl IntoIterator<Item = &'a OrderRecord>) -> usize {
    rows.into_iter()
        .filter_map(|r| r.order_id.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

fn status_is(r: &OrderRecord, literal: &str) -> bool {
    r.status.as_deref() == Some(literal)
}

fn is_cancelled(r: &OrderRecord, vocab: &StatusVocabulary) -> bool {
    status_is(r, &vocab.cancel)
}

pub fn compute_kpis(table: &RawOrderTable, opts: &AggregateOptions) -> Kpis {
    let records = &table.records;
    let vocab = &opts.vocabulary;

    let total_orders = distinct_orders(records);
    let total_complete = records.iter().filter(|r| status_is(r, &vocab.complete)).count();
    let total_unsuccessful = records
        .iter()
        .filter(|r| status_is(r, &vocab.unsuccessful))
        .count();

    let total_value = if table.columns.net_order_value {
        Feature::Available(records.iter().filter_map(|r| r.net_order_value).sum::<f64>())
    } else {
        Feature::missing(&opts.columns.net_order_value)
    };
    let total_value_ceil = total_value.clone().map(|v| v.ceil() as i64);

    let total_riders = if table.columns.rider_name {
        Feature::Available(
            records
                .iter()
                .filter_map(|r| r.rider_name.as_deref())
                .collect::<HashSet<_>>()
                .len(),
        )
    } else {
        Feature::missing(&opts.columns.rider_name)
    };

    Kpis {
        total_orders,
        total_value,
        total_value_ceil,
        total_complete,
        total_unsuccessful,
        total_riders,
        total_on_process: total_orders as i64 - total_complete as i64,
        over_sla_rate: over_sla_rate(table, opts),
    }
}

/// Share of non-cancelled orders that went over SLA, as a percentage.
/// Zero when there are no non-cancelled orders.
pub fn over_sla_rate(table: &RawOrderTable, opts: &AggregateOptions) -> Feature<f64> {
    if !table.columns.sla_status {
        return Feature::missing(&opts.columns.sla_status);
    }
    let vocab = &opts.vocabulary;
    let non_cancel: Vec<&OrderRecord> = table
        .records
        .iter()
        .filter(|r| !is_cancelled(r, vocab))
        .collect();

    let denominator = distinct_orders(non_cancel.iter().copied());
    if denominator == 0 {
        return Feature::Available(0.0);
    }
    let over = distinct_orders(
        non_cancel
            .iter()
            .copied()
            .filter(|r| r.sla_status.as_deref() == Some(vocab.sla_over.as_str())),
    );
    Feature::Available(over as f64 / denominator as f64 * 100.0)
}

fn sla_available(table: &RawOrderTable, opts: &AggregateOptions) -> Result<(), FeatureUnavailable> {
    let column = opts.columns.sla_status.clone();
    if !table.columns.sla_status {
        return Err(FeatureUnavailable::MissingColumn { column });
    }
    if table.records.iter().all(|r| r.sla_status.is_none()) {
        return Err(FeatureUnavailable::NoUsableValues { column });
    }
    Ok(())
}

/// Counts values in first-seen order, then orders by count descending. The
/// sort is stable so ties keep first-seen order.
fn ordered_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for v in values {
        let i = *index.entry(v).or_insert_with(|| {
            counts.push((v.to_string(), 0));
            counts.len() - 1
        });
        counts[i].1 += 1;
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

pub fn payment_breakdown(table: &RawOrderTable, opts: &AggregateOptions) -> Feature<Vec<PaymentCount>> {
    if !table.columns.payment_code {
        return Feature::missing(&opts.columns.payment_code);
    }
    let counts = ordered_counts(table.records.iter().filter_map(|r| r.payment_code.as_deref()));
    Feature::Available(
        counts
            .into_iter()
            .map(|(payment_code, count)| PaymentCount { payment_code, count })
            .collect(),
    )
}

pub fn rider_ranking(table: &RawOrderTable, opts: &AggregateOptions) -> Feature<RiderRanking> {
    if !table.columns.rider_name {
        return Feature::missing(&opts.columns.rider_name);
    }
    let vocab = &opts.vocabulary;

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, HashSet<&str>)> = Vec::new();
    let rows = table
        .records
        .iter()
        .filter(|r| opts.include_cancelled_in_rider_ranking || !is_cancelled(r, vocab));
    for r in rows {
        let Some(rider) = r.rider_name.as_deref() else {
            continue;
        };
        let i = *index.entry(rider).or_insert_with(|| {
            groups.push((rider, HashSet::new()));
            groups.len() - 1
        });
        if let Some(id) = r.order_id.as_deref() {
            groups[i].1.insert(id);
        }
    }

    let mut ranking: Vec<RiderCount> = groups
        .into_iter()
        .map(|(rider, orders)| RiderCount {
            rider_name: rider.to_string(),
            total_orders: orders.len(),
        })
        .collect();
    ranking.sort_by(|a, b| b.total_orders.cmp(&a.total_orders));
    Feature::Available(RiderRanking(ranking))
}

pub fn hourly_status_counts(
    table: &RawOrderTable,
    opts: &AggregateOptions,
) -> Feature<HourlyStatusCounts> {
    let columns = &opts.columns;
    if !table.columns.hours {
        return Feature::missing(&columns.hours);
    }
    if !table.columns.sla_status {
        return Feature::missing(&columns.sla_status);
    }

    let mut statuses: Vec<String> = Vec::new();
    let mut by_hour: BTreeMap<Hour, Vec<usize>> = BTreeMap::new();
    for r in &table.records {
        let (Some(hour), Some(sla)) = (r.hour, r.sla_status.as_deref()) else {
            continue;
        };
        let s = match statuses.iter().position(|s| s == sla) {
            Some(s) => s,
            None => {
                statuses.push(sla.to_string());
                statuses.len() - 1
            }
        };
        let counts = by_hour.entry(hour).or_default();
        if counts.len() <= s {
            counts.resize(s + 1, 0);
        }
        counts[s] += 1;
    }

    if by_hour.is_empty() {
        let column = if table.records.iter().any(|r| r.hour.is_some()) {
            columns.sla_status.clone()
        } else {
            columns.hours.clone()
        };
        return Feature::Unavailable(FeatureUnavailable::NoUsableValues { column });
    }

    let mut cells = Vec::new();
    let mut totals = Vec::new();
    for (hour, counts) in &by_hour {
        for (s, &count) in counts.iter().enumerate() {
            if count > 0 {
                cells.push(HourlyCell {
                    hour: *hour,
                    sla_status: statuses[s].clone(),
                    count,
                });
            }
        }
        totals.push(HourTotal {
            hour: *hour,
            total: counts.iter().sum(),
        });
    }

    Feature::Available(HourlyStatusCounts {
        hours: by_hour.keys().copied().collect(),
        statuses,
        cells,
        totals,
    })
}

/// Collapses within/pending/dispatched into the DOT label and drops
/// cancelled rows. Other labels pass through unchanged.
pub fn sla_rollup(table: &RawOrderTable, opts: &AggregateOptions) -> Feature<Vec<SlaCount>> {
    if let Err(why) = sla_available(table, opts) {
        return Feature::Unavailable(why);
    }
    let vocab = &opts.vocabulary;
    let dot_members = [&vocab.sla_within, &vocab.sla_pending, &vocab.sla_dispatched];

    let mapped = table
        .records
        .iter()
        .filter_map(|r| r.sla_status.as_deref())
        .filter(|s| *s != vocab.sla_cancel)
        .map(|s| {
            if dot_members.iter().any(|m| m.as_str() == s) {
                vocab.sla_dot.as_str()
            } else {
                s
            }
        });

    Feature::Available(
        ordered_counts(mapped)
            .into_iter()
            .map(|(category, count)| SlaCount { category, count })
            .collect(),
    )
}
