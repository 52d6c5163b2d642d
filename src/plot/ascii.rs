//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - reference curve: `-` line
//! - optional highlights: `^` (above curve), `v` (below curve)
//!
//! Non-finite predictions are not drawn; the header says how many were skipped.

use std::collections::HashSet;

use crate::domain::{CurveFile, GrowthCurve};
use crate::io::curve::curve_from_entry;
use crate::models::{DEFAULT_TIME_END, DEFAULT_TIME_START};
use crate::report::{ComparisonRow, Deviations};

/// Render one curve with optional observation overlay.
pub fn render_ascii_plot(
    curve: &GrowthCurve,
    observations: &[ComparisonRow],
    width: usize,
    height: usize,
    deviations: Option<&Deviations>,
) -> String {
    let curve_points: Vec<(f64, f64)> = curve.finite_points().collect();
    let obs_points: Vec<(f64, f64)> = observations.iter().map(|r| (r.time, r.observed)).collect();

    let (t_min, t_max) = time_range(&curve_points, &obs_points).unwrap_or((DEFAULT_TIME_START, DEFAULT_TIME_END));

    let mut out = String::new();
    out.push_str(&render_plot(
        curve.id(),
        &curve.points,
        &obs_points,
        t_min,
        t_max,
        width,
        height,
        deviations,
    ));

    let skipped = curve.non_finite_count();
    if skipped > 0 {
        out.push_str(&format!("({skipped} non-finite prediction(s) not drawn)\n"));
    }
    out
}

/// Render every curve of a saved curve JSON file, one plot per identifier.
pub fn render_ascii_plot_from_curve_file(curve: &CurveFile, width: usize, height: usize) -> String {
    let mut out = format!("Curves from {} ({} curve(s))\n", curve.origin, curve.curves.len());
    for entry in &curve.curves {
        out.push('\n');
        out.push_str(&render_ascii_plot(&curve_from_entry(entry), &[], width, height, None));
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn render_plot(
    label: &str,
    curve_points: &[(f64, f64)],
    obs_points: &[(f64, f64)],
    t_min: f64,
    t_max: f64,
    width: usize,
    height: usize,
    deviations: Option<&Deviations>,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    // Determine y-range from observed points and finite curve points.
    let (y_min, y_max) = y_range(obs_points, curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    draw_curve(&mut grid, curve_points, t_min, t_max, y_min, y_max);

    let (above, below) = deviations
        .map(|d| (point_keys(&d.above), point_keys(&d.below)))
        .unwrap_or_else(|| (HashSet::new(), HashSet::new()));

    for &(t, y) in obs_points {
        let x = map_x(t, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);

        let key = (t.to_bits(), y.to_bits());
        let ch = if above.contains(&key) {
            '^'
        } else if below.contains(&key) {
            'v'
        } else {
            'o'
        };

        grid[row][x] = ch;
    }

    // Build final string. We include a small header with ranges.
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {label} | t=[{t_min:.1}, {t_max:.1}] | y=[{y_min:.2}, {y_max:.2}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn point_keys(rows: &[ComparisonRow]) -> HashSet<(u64, u64)> {
    rows.iter().map(|r| (r.time.to_bits(), r.observed.to_bits())).collect()
}

fn time_range(curve: &[(f64, f64)], obs: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_t = f64::INFINITY;
    let mut max_t = f64::NEG_INFINITY;
    for &(t, _) in curve.iter().chain(obs.iter()) {
        min_t = min_t.min(t);
        max_t = max_t.max(t);
    }
    if min_t.is_finite() && max_t.is_finite() && max_t > min_t {
        Some((min_t, max_t))
    } else {
        None
    }
}

fn y_range(obs: &[(f64, f64)], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in obs.iter().chain(curve.iter()) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        // Flat data: center the single level.
        Some((min_y - 1.0, min_y + 1.0))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Draw the curve as connected segments; a non-finite point breaks the line.
fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        if !(t.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
