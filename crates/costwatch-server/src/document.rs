//! Report document rendering.
//!
//! Renders the gathered per-subscription tables into a standalone HTML
//! document via an embedded handlebars template and writes it to the output
//! directory. The download endpoint serves the file as-is.

use std::collections::HashMap;
use std::path::Path;

use chrono::{Duration, NaiveDate, Utc};
use costwatch::report::ReportTable;
use costwatch::{Error, Result, Subscription};
use handlebars::Handlebars;

const TEMPLATE: &str = include_str!("../templates/report.hbs");

/// Render the report document and return its filename.
///
/// Sections appear in the fixed order `[prod, dev, test, main]`; subscriptions
/// without a table are left out.
pub fn render(
    output_dir: &Path,
    tables: &HashMap<Subscription, ReportTable>,
    num_days: u32,
    end_date: NaiveDate,
) -> Result<String> {
    let mut registry = Handlebars::new();
    registry
        .register_template_string("report", TEMPLATE)
        .map_err(|e| Error::Template(e.to_string()))?;

    let sections: Vec<serde_json::Value> = Subscription::CHECK_ORDER
        .into_iter()
        .filter_map(|subscription| {
            tables.get(&subscription).map(|table| {
                serde_json::json!({
                    "name": subscription.name(),
                    "heading": format!("{} Environment", capitalize(subscription.name())),
                    "headers": table.headers,
                    "cost_rows": table.cost_rows,
                    "percent_rows": table.percent_rows,
                })
            })
        })
        .collect();

    let data = serde_json::json!({
        "title": "Azure Cost Summary Report",
        "date_range": date_range_label(num_days, end_date),
        "sections": sections,
    });

    let html = registry
        .render("report", &data)
        .map_err(|e| Error::Template(e.to_string()))?;

    let filename = format!(
        "Azure_Cost_Report_{}.html",
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    std::fs::create_dir_all(output_dir)?;
    std::fs::write(output_dir.join(&filename), html)?;

    Ok(filename)
}

/// `"Monday (06/09), Tuesday (06/10), ..."` for the report window.
fn date_range_label(num_days: u32, end_date: NaiveDate) -> String {
    let start_date = end_date - Duration::days(i64::from(num_days) - 1);
    (0..i64::from(num_days))
        .map(|offset| {
            let date = start_date + Duration::days(offset);
            format!("{} ({})", date.format("%A"), date.format("%m/%d"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
