use crate::presenter::{DashboardView, DisplayBlock};
use crate::types::{RawDataRow, RawOrderTable};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

#[derive(Serialize)]
struct JsonEnvelope<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    view: &'a DashboardView,
}

/// The view as pretty JSON, stamped with the render time.
pub fn to_json(view: &DashboardView, generated_at: DateTime<Utc>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonEnvelope { generated_at, view })
}

fn markdown_table<I, R>(header: [&str; 2], rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut builder = Builder::default();
    builder.push_record(header.iter().map(|h| h.to_string()));
    for r in rows {
        builder.push_record(r);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)\n".to_string();
    }
    format!("{}\n", Table::new(slice).with(Style::markdown()))
}

/// The uploaded rows as a markdown table, capped at `max_rows`.
pub fn render_raw_data(table: &RawOrderTable, max_rows: usize) -> String {
    let rows: Vec<RawDataRow> = table.records.iter().take(max_rows).map(RawDataRow::from).collect();
    let mut out = preview_table_rows(&rows, max_rows);
    if table.records.len() > max_rows {
        out.push_str(&format!(
            "(showing {} of {} rows)\n",
            max_rows,
            table.records.len()
        ));
    }
    out
}

/// Plain-text rendering for the terminal.
pub fn render_text(view: &DashboardView) -> String {
    match view {
        DashboardView::Idle { prompt } => format!("{}\n", prompt),
        DashboardView::Failed { message, hint } => format!("Error: {}\n{}\n", message, hint),
        DashboardView::Ready { title, blocks } => {
            let mut out = format!("{}\n\n", title);

            let cards: Vec<Vec<String>> = blocks
                .iter()
                .filter_map(|b| match b {
                    DisplayBlock::Metric { label, value, accent } => Some(vec![
                        label.clone(),
                        match accent {
                            Some(a) => format!("{} [{}]", value, a),
                            None => value.clone(),
                        },
                    ]),
                    _ => None,
                })
                .collect();
            if !cards.is_empty() {
                out.push_str(&markdown_table(["KPI", "Value"], cards));
                out.push_str("\n\n");
            }

            for block in blocks {
                if let Some(section) = render_block(block) {
                    out.push_str(&section);
                    out.push('\n');
                }
            }
            out
        }
    }
}

fn render_block(block: &DisplayBlock) -> Option<String> {
    let text = match block {
        DisplayBlock::Metric { .. } => return None,
        DisplayBlock::Warning { message, .. } => format!("Warning: {}\n", message),
        DisplayBlock::Pie { title, slices, .. } => {
            let total: usize = slices.iter().map(|s| s.value).sum();
            let rows = slices.iter().map(|s| {
                let pct = if total == 0 {
                    0.0
                } else {
                    s.value as f64 / total as f64 * 100.0
                };
                vec![s.label.clone(), format!("{} ({:.1}%)", s.value, pct)]
            });
            format!("{}\n\n{}\n", title, markdown_table(["Label", "Count"], rows))
        }
        DisplayBlock::Bar {
            title,
            value_label,
            bars,
        } => {
            let rows = bars
                .iter()
                .map(|b| vec![b.label.clone(), b.value.to_string()]);
            format!(
                "{}\n\n{}\n",
                title,
                markdown_table(["Name", value_label.as_str()], rows)
            )
        }
        DisplayBlock::StackedBar {
            title,
            x_label,
            categories,
            series,
            overlay,
        } => {
            let mut builder = Builder::default();
            let mut header = vec![x_label.clone()];
            header.extend(series.iter().map(|s| s.name.clone()));
            header.push(overlay.name.clone());
            builder.push_record(header);
            for (i, cat) in categories.iter().enumerate() {
                let mut row = vec![cat.clone()];
                row.extend(series.iter().map(|s| s.values[i].to_string()));
                row.push(overlay.values[i].to_string());
                builder.push_record(row);
            }
            let table = builder.build().with(Style::markdown()).to_string();
            format!("{}\n\n{}\n", title, table)
        }
    };
    Some(text)
}
