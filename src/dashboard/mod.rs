pub mod compliance;
pub mod daily_view;

pub use compliance::*;
pub use daily_view::*;

use crate::models::COST_PER_RESIDENT_DAY;
use anyhow::Result;
use std::fmt::Write;

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| "-".to_string())
}

/// Plain-text dashboard: KPIs, cost trend, nutrition stats, compliance, waste.
pub fn render_report(view: &DailyView, kpis: &Kpis, checks: Option<&ComplianceChecks>) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "Memory Care Meals: Cost, Nutrition & Waste")?;
    if let Some((first, last)) = view.date_bounds()? {
        writeln!(out, "Days {} to {}", first, last)?;
    }
    writeln!(out)?;

    writeln!(out, "{:<34}{}", "Residents", kpis.residents)?;
    if let Some(cost) = kpis.avg_cost_per_resident_day {
        writeln!(out, "{:<34}{:.2}", "Avg Cost / Resident-Day (USD)", cost)?;
    }
    if let Some(waste) = kpis.avg_waste_pct {
        writeln!(out, "{:<34}{:.1}%", "Avg Waste %", waste)?;
    }
    writeln!(out, "{:<34}{}", "Days in View", kpis.days_in_view)?;

    writeln!(out, "\n== Cost ==")?;
    match view.column(COST_PER_RESIDENT_DAY)? {
        Some(costs) => {
            for (day, cost) in view.days()?.iter().zip(costs) {
                writeln!(out, "{}  {:>10}", day, fmt_opt(cost, 2))?;
            }
        }
        None => writeln!(
            out,
            "Column '{}' not found in daily summary.",
            COST_PER_RESIDENT_DAY
        )?,
    }

    writeln!(out, "\n== Nutrition ==")?;
    let stats = view.nutrition_stats()?;
    if stats.is_empty() {
        writeln!(out, "Nutrition columns not found in daily summary.")?;
    } else {
        writeln!(
            out,
            "{:<16}{:>7}{:>12}{:>12}{:>12}{:>12}",
            "column", "count", "mean", "std", "min", "max"
        )?;
        for s in &stats {
            writeln!(
                out,
                "{:<16}{:>7}{:>12}{:>12}{:>12}{:>12}",
                s.column,
                s.count,
                fmt_opt(s.mean, 2),
                fmt_opt(s.std, 2),
                fmt_opt(s.min, 2),
                fmt_opt(s.max, 2)
            )?;
        }
    }

    writeln!(out, "\n== Compliance ==")?;
    match checks {
        None => writeln!(out, "Compliance checks not found.")?,
        Some(checks) => {
            writeln!(out, "{} day(s) checked", checks.rows())?;
            match checks.pass_rate()? {
                Some(rate) => writeln!(out, "Overall pass rate {:.1}%", rate)?,
                None => writeln!(out, "No '_ok' columns to score.")?,
            }
        }
    }

    writeln!(out, "\n== Waste ==")?;
    match view.waste_table()? {
        Some(rows) => {
            writeln!(
                out,
                "{:<12}{:>10}{:>10}{:>10}{:>10}",
                "day", "prepared", "served", "leftover", "waste %"
            )?;
            for row in rows {
                writeln!(
                    out,
                    "{:<12}{:>10}{:>10}{:>10}{:>10}",
                    row.day.to_string(),
                    fmt_opt(row.prepared, 0),
                    fmt_opt(row.served, 0),
                    fmt_opt(row.leftover, 0),
                    fmt_opt(row.waste_pct, 1)
                )?;
            }
        }
        None => writeln!(out, "No waste data found.")?,
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn view() -> DailyView {
        let df = df!(
            "day" => ["2024-01-01"],
            "calories_kcal" => [1800.0],
            "prepared" => [20i64],
            "served" => [18i64],
            "leftover" => [2i64],
            "waste_pct" => [0.1],
            "approx_cost_per_resident_day_usd" => [45.0]
        )
        .unwrap();
        DailyView::from_frame(&df).unwrap()
    }

    #[test]
    fn test_report_sections() {
        let view = view();
        let kpis = view.kpis(1).unwrap();

        let report = render_report(&view, &kpis, None).unwrap();
        assert!(report.contains(&format!("{:<34}45.00", "Avg Cost / Resident-Day (USD)")));
        assert!(report.contains(&format!("{:<34}10.0%", "Avg Waste %")));
        assert!(report.contains("Days 2024-01-01 to 2024-01-01"));
        assert!(report.contains("Compliance checks not found."));
        assert!(report.contains("calories_kcal"));
    }

    #[test]
    fn test_report_with_compliance() {
        let view = view();
        let kpis = view.kpis(1).unwrap();
        let checks = ComplianceChecks::from_frame(
            &df!("day" => ["2024-01-01"], "sodium_ok" => ["true"]).unwrap(),
        )
        .unwrap();

        let report = render_report(&view, &kpis, Some(&checks)).unwrap();
        assert!(report.contains("1 day(s) checked"));
        assert!(report.contains("Overall pass rate 100.0%"));
    }
}
