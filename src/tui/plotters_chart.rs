//! Plotters-powered growth-curve chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct GrowthChart<'a> {
    /// Curve as finite line segments (a non-finite prediction splits the line).
    pub segments: &'a [Vec<(f64, f64)>],
    /// Observations for the shown identifier.
    pub points: &'a [(f64, f64)],
    /// Largest deviations above the curve (a subset of `points`).
    pub above: &'a [(f64, f64)],
    /// Largest deviations below the curve (a subset of `points`).
    pub below: &'a [(f64, f64)],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
}

impl<'a> Widget for GrowthChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| format!("{v:.0}"))
                .y_label_formatter(&|v| format!("{v:.1}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let curve_color = RGBColor(0, 255, 255); // cyan
            let points_color = WHITE;
            let above_color = RGBColor(0, 255, 0); // green
            let below_color = RGBColor(255, 0, 0); // red

            for segment in self.segments {
                chart.draw_series(LineSeries::new(segment.iter().copied(), &curve_color))?;
            }

            chart.draw_series(self.points.iter().map(|&(x, y)| Pixel::new((x, y), points_color)))?;

            // `Circle` radii are mis-scaled by the ratatui backend; pixels render as clean dots.
            chart.draw_series(self.above.iter().map(|&(x, y)| Pixel::new((x, y), above_color)))?;
            chart.draw_series(self.below.iter().map(|&(x, y)| Pixel::new((x, y), below_color)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
