//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the evaluation/comparison code stays clean and testable
//! - output changes are localized
//!
//! Non-finite values are printed verbatim (`NaN`, `inf`) with a trailing `!`.

use crate::domain::{GrowthCurve, ParameterOrigin, ParameterSet};
use crate::io::ingest::IngestedObservations;
use crate::report::compare::{Comparison, ComparisonRow, Deviations, ResidualSummary};

/// Format the active parameter table and where it came from.
pub fn format_parameter_table(set: &ParameterSet, origin: &ParameterOrigin) -> String {
    let mut out = String::new();
    out.push_str(&format!("Parameters: {origin} ({} row(s))\n", set.len()));
    out.push_str(&header_line(&format!(
        "{:<20} {:>12} {:>12} {:>12}",
        "id", "b0", "b1", "b2"
    )));
    out.push_str(&rule_line(&[20, 12, 12, 12]));
    for p in set {
        out.push_str(&format!(
            "{:<20} {:>12} {:>12} {:>12}\n",
            truncate(&p.id, 20),
            p.b0,
            p.b1,
            p.b2
        ));
    }
    out
}

/// Format predicted values of one curve over its time domain.
pub fn format_curve_table(curve: &GrowthCurve) -> String {
    let p = &curve.params;
    let mut out = String::new();
    out.push_str(&format!(
        "Curve: {} (b0={}, b1={}, b2={})\n",
        p.id, p.b0, p.b1, p.b2
    ));
    out.push_str(&header_line(&format!("{:>10} {:>14}", "t", "predicted")));
    out.push_str(&rule_line(&[10, 14]));
    for &(t, y) in &curve.points {
        out.push_str(&format!("{t:>10.2} {}\n", fmt_value(y, 14)));
    }

    let bad = curve.non_finite_count();
    if bad > 0 {
        out.push_str(&format!("! {bad} non-finite prediction(s)\n"));
    }
    out
}

/// Format a full comparison: rows, unmatched identifiers, summaries.
pub fn format_comparison(cmp: &Comparison, summaries: &[ResidualSummary]) -> String {
    let mut out = String::new();

    out.push_str(&format!("Comparison: {} row(s)\n", cmp.rows.len()));
    out.push_str(&format_rows(&cmp.rows));

    if !cmp.unmatched.is_empty() {
        out.push_str(&format!("\nUnmatched identifiers ({}):\n", cmp.unmatched.len()));
        for u in &cmp.unmatched {
            match u.line {
                Some(line) => out.push_str(&format!("- line {line}: {u}\n")),
                None => out.push_str(&format!("- {u}\n")),
            }
        }
    }

    if !summaries.is_empty() {
        out.push_str("\nSummary by identifier:\n");
        out.push_str(&format_summaries(summaries));
    }

    out
}

/// Format the largest deviations above/below the curve.
pub fn format_deviations(dev: &Deviations) -> String {
    let mut out = String::new();

    out.push_str("Top above curve (positive residual):\n");
    out.push_str(&format_rows(&dev.above));
    out.push('\n');

    out.push_str("Top below curve (negative residual):\n");
    out.push_str(&format_rows(&dev.below));

    out
}

/// One-line account of what the observation loader read and skipped.
pub fn format_ingest_notes(ingest: &IngestedObservations) -> String {
    let mut out = format!(
        "Observations: {} ({} of {} row(s) usable)\n",
        ingest.origin,
        ingest.records.len(),
        ingest.rows_read
    );
    for e in &ingest.row_errors {
        let id = e.id.as_deref().unwrap_or("-");
        out.push_str(&format!("  skipped line {} ({id}): {}\n", e.line, e.message));
    }
    out
}

fn format_rows(rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    out.push_str(&header_line(&format!(
        "{:<20} {:>6} {:>10} {:>12} {:>14} {:>14}",
        "id", "line", "t", "observed", "predicted", "residual"
    )));
    out.push_str(&rule_line(&[20, 6, 10, 12, 14, 14]));

    for r in rows {
        let line = r.line.map(|l| l.to_string()).unwrap_or_default();
        out.push_str(
            format!(
                "{:<20} {:>6} {:>10.2} {:>12.4} {} {}",
                truncate(&r.id, 20),
                line,
                r.time,
                r.observed,
                fmt_value(r.predicted, 14),
                fmt_value(r.residual, 14),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn format_summaries(summaries: &[ResidualSummary]) -> String {
    let mut out = String::new();
    out.push_str(&header_line(&format!(
        "{:<20} {:>6} {:>10} {:>12} {:>12} {:>12}",
        "id", "n", "non-finite", "mean", "rmse", "max|res|"
    )));
    out.push_str(&rule_line(&[20, 6, 10, 12, 12, 12]));

    for s in summaries {
        out.push_str(
            format!(
                "{:<20} {:>6} {:>10} {:>12} {:>12} {:>12}",
                truncate(&s.id, 20),
                s.n,
                s.non_finite,
                fmt_stat(s.mean_residual),
                fmt_stat(s.rmse),
                fmt_stat(s.max_abs_residual),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Right-aligned value; non-finite values keep their text and gain a `!`.
fn fmt_value(v: f64, width: usize) -> String {
    if v.is_finite() {
        format!("{v:>width$.4}")
    } else {
        let text = format!("{v}!");
        format!("{text:>width$}")
    }
}

fn fmt_stat(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "-".to_string())
}

fn header_line(s: &str) -> String {
    format!("{}\n", s.trim_end())
}

fn rule_line(widths: &[usize]) -> String {
    let parts: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    format!("{}\n", parts.join(" "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
