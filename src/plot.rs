//! PNG rendering of trajectory projections.
//!
//! The vertical axis is inverted: points are drawn at `-y` and the tick labels
//! are negated back, so larger `y` is drawn lower while the labels keep
//! showing the true `y`.

use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;

use leaf_calc::TrajectoryDatabase;

/// One labeled `(x, y)` polyline.
pub type Series<'a> = (&'a str, Vec<(f64, f64)>);

/// Axis ranges with padding applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PlotBounds {
    /// Bounding box of all points, padded by `pad` of the span on each side.
    /// A flat extent is widened to one unit. `None` without any point.
    pub fn of(series: &[Series<'_>], pad: f64) -> Option<Self> {
        let mut points = series.iter().flat_map(|(_, pts)| pts.iter());
        let &(x0, y0) = points.next()?;
        let (mut x_min, mut x_max, mut y_min, mut y_max) = (x0, x0, y0, y0);
        for &(x, y) in points {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        let (x_min, x_max) = padded(x_min, x_max, pad);
        let (y_min, y_max) = padded(y_min, y_max, pad);
        Some(Self {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }
}

fn padded(lo: f64, hi: f64, pad: f64) -> (f64, f64) {
    let span = hi - lo;
    if span > 0.0 {
        (lo - pad * span, hi + pad * span)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

/// `(x, y)` projection of every run, cut at the first non-finite state.
pub fn projections(db: &TrajectoryDatabase) -> Vec<Series<'_>> {
    db.iter()
        .map(|(label, trajectory)| {
            let end = trajectory.first_non_finite().unwrap_or(trajectory.len());
            (label, trajectory.states()[..end].iter().map(|s| (s.x, s.y)).collect())
        })
        .collect()
}

/// Chart coordinates of a physical point: the vertical axis is flipped.
fn to_chart((x, y): (f64, f64)) -> (f64, f64) {
    (x, -y)
}

/// Draw the labeled series into a PNG at `path`.
pub fn plot_trajectories(series: &[Series<'_>], path: &Path, size: (u32, u32)) -> Result<()> {
    let bounds = PlotBounds::of(series, 0.05).context("no finite points to plot")?;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    // 纵轴翻转: 绘制 -y, 刻度显示真实 y
    let mut chart = ChartBuilder::on(&root)
        .caption("Precomputed Trajectories", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(bounds.x_min..bounds.x_max, -bounds.y_max..-bounds.y_min)?;

    chart
        .configure_mesh()
        .x_desc("X Position (m)")
        .y_desc("Y Position (m)")
        .y_label_formatter(&|v| format!("{:.2}", -v))
        .draw()?;

    for (idx, (label, points)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(
                points.iter().copied().map(to_chart),
                color.stroke_width(2),
            ))?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("failed to write plot {}", path.display()))?;
    Ok(())
}
