//! Side-by-side bar charts rendered to PNG
//!
//! A chart is drawn once into a temporary file next to its final path, read
//! back, then renamed into place. The same bytes feed the artifact on disk
//! and the base64 data URI in the stage payload.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::full_palette::{ORANGE, TEAL};

use crate::pipeline::artifacts::{persist, temp_file_beside};
use crate::pipeline::error::StageError;

pub const CHART_WIDTH: u32 = 1400;
pub const CHART_HEIGHT: u32 = 600;

/// Whether captions, axis labels and bar annotations are drawn. Without a
/// font backend plotters cannot draw glyphs, so text-free builds draw bars
/// and reference lines only.
pub const DRAWS_TEXT: bool = cfg!(feature = "chart-text");

/// Selected features.
pub const HIGHLIGHT: RGBColor = RED;
/// Everything else.
pub const NEUTRAL: RGBColor = BLUE;
pub const BEFORE: RGBColor = ORANGE;
pub const AFTER: RGBColor = TEAL;

/// One panel of bars over categorical labels.
#[derive(Debug, Clone)]
pub struct BarPanel<'a> {
    pub title: &'a str,
    pub y_label: &'a str,
    pub labels: &'a [String],
    /// Bar heights; pass them through [`plottable_heights`] first.
    pub heights: Vec<f64>,
    /// One color per bar.
    pub colors: Vec<RGBColor>,
    /// Horizontal reference line, e.g. a significance threshold.
    pub reference_line: Option<f64>,
    /// Print each bar's height above it.
    pub annotate: bool,
}

/// A chart persisted to disk.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub path: PathBuf,
    pub png: Vec<u8>,
}

impl RenderedChart {
    /// `data:image/png;base64,...` form of the chart.
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Map heights to drawable values: infinite bars take the height of the
/// tallest finite bar, NaN bars are drawn as zero.
pub fn plottable_heights(values: &[f64]) -> Vec<f64> {
    let tallest = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                0.0
            } else if v.is_infinite() {
                if v > 0.0 {
                    tallest
                } else {
                    0.0
                }
            } else {
                v.max(0.0)
            }
        })
        .collect()
}

/// Draw `panels` side by side and write the PNG to `path`.
pub fn render_bar_panels(path: &Path, panels: &[BarPanel]) -> Result<RenderedChart, StageError> {
    let tmp = temp_file_beside(path, ".png")?;

    {
        let root = BitMapBackend::new(tmp.path(), (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let areas = root.split_evenly((1, panels.len().max(1)));
        for (area, panel) in areas.iter().zip(panels) {
            draw_panel(area, panel)?;
        }
        root.present().map_err(chart_error)?;
    }

    let png = std::fs::read(tmp.path()).map_err(|e| {
        StageError::artifact(format!("Failed to read rendered chart: {}", e))
    })?;
    persist(tmp, path)?;

    Ok(RenderedChart {
        path: path.to_path_buf(),
        png,
    })
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &BarPanel,
) -> Result<(), StageError> {
    let bars = panel.labels.len() as i32;
    let tallest = panel.heights.iter().copied().fold(0.0_f64, f64::max);
    let tallest = panel.reference_line.map_or(tallest, |r| tallest.max(r));
    let top = if tallest > 0.0 { tallest * 1.15 } else { 1.0 };

    let mut builder = ChartBuilder::on(area);
    builder.margin(15);
    if DRAWS_TEXT {
        builder
            .caption(panel.title, ("sans-serif", 22).into_font())
            .x_label_area_size(70)
            .y_label_area_size(60);
    }
    let mut chart = builder
        .build_cartesian_2d((0..bars.max(1)).into_segmented(), 0.0..top)
        .map_err(chart_error)?;

    if DRAWS_TEXT {
        let labels = panel.labels;
        let label_at = |value: &SegmentValue<i32>| match value {
            SegmentValue::CenterOf(idx) => labels
                .get(*idx as usize)
                .cloned()
                .unwrap_or_default(),
            _ => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len().max(1))
            .x_label_formatter(&label_at)
            .y_desc(panel.y_label)
            .draw()
            .map_err(chart_error)?;
    }

    chart
        .draw_series(panel.heights.iter().enumerate().map(|(idx, &height)| {
            let color = panel.colors.get(idx).copied().unwrap_or(NEUTRAL);
            let idx = idx as i32;
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(idx), 0.0),
                    (SegmentValue::Exact(idx + 1), height),
                ],
                color.filled(),
            );
            bar.set_margin(0, 0, 4, 4);
            bar
        }))
        .map_err(chart_error)?;

    if let Some(threshold) = panel.reference_line {
        chart
            .draw_series(LineSeries::new(
                vec![
                    (SegmentValue::Exact(0), threshold),
                    (SegmentValue::Exact(bars.max(1)), threshold),
                ],
                RED.stroke_width(2),
            ))
            .map_err(chart_error)?;
    }

    if panel.annotate && DRAWS_TEXT {
        chart
            .draw_series(panel.heights.iter().enumerate().map(|(idx, &height)| {
                Text::new(
                    format!("{:.0}", height),
                    (SegmentValue::CenterOf(idx as i32), height + top * 0.02),
                    ("sans-serif", 14).into_font(),
                )
            }))
            .map_err(chart_error)?;
    }

    Ok(())
}

fn chart_error(e: impl std::fmt::Display) -> StageError {
    StageError::artifact(format!("Failed to render chart: {}", e))
}
