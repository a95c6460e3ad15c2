//! SVG rendering of the figure specifications.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use chrono::DateTime;
use chrono_tz::Tz;
use plotters::{coord::Shift, prelude::*};

use crate::{
    chart::{Figure, HeatmapPanel, LinePanel, Panel, StackedBarPanel},
    core::pivot::HourColumn,
    prelude::*,
};

const WIDTH: u32 = 1200;
const PANEL_HEIGHT: u32 = 400;
const FONT: &str = "sans-serif";

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

/// Write each figure as an SVG drawing along with its JSON specification.
#[instrument(skip_all, fields(output_dir = %output_dir.display(), n_figures = figures.len()))]
pub fn write_figures(figures: &[Figure], output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create `{}`", output_dir.display()))?;
    let mut paths = Vec::with_capacity(figures.len());
    for figure in figures {
        let svg_path = output_dir.join(format!("{}.svg", figure.name));
        render_svg(figure, &svg_path)
            .with_context(|| format!("failed to render `{}`", svg_path.display()))?;
        let json_path = output_dir.join(format!("{}.json", figure.name));
        let writer = BufWriter::new(File::create(&json_path)?);
        serde_json::to_writer_pretty(writer, figure)
            .with_context(|| format!("failed to write `{}`", json_path.display()))?;
        debug!(path = %svg_path.display(), "written");
        paths.push(svg_path);
    }
    info!(n_files = paths.len() * 2, "written the figures");
    Ok(paths)
}

pub fn render_svg(figure: &Figure, path: &Path) -> Result {
    let n_panels = figure.panels.len().max(1);
    let height = PANEL_HEIGHT * u32::try_from(n_panels)?;
    let root = SVGBackend::new(path, (WIDTH, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&figure.title, (FONT, 24))?;
    let areas = root.split_evenly((n_panels, 1));
    for (panel, area) in figure.panels.iter().zip(&areas) {
        match panel {
            Panel::Line(panel) => draw_line_panel(area, panel)?,
            Panel::Heatmap(panel) => draw_heatmap_panel(area, panel)?,
            Panel::StackedBar(panel) => draw_stacked_bar_panel(area, panel)?,
        }
    }
    root.present()?;
    Ok(())
}

fn draw_line_panel(area: &Area, panel: &LinePanel) -> Result {
    let points = || panel.traces.iter().flat_map(|trace| &trace.points);
    let Some(time_zone) = points().next().map(|point| point.timestamp.timezone()) else {
        return draw_placeholder(area, &panel.title);
    };
    let (x_min, x_max) = bounds(points().map(|point| seconds(point.timestamp)))
        .unwrap_or_default();
    let Some((y_min, y_max)) =
        bounds(points().filter_map(|point| point.value).chain(panel.reference))
    else {
        return draw_placeholder(area, &panel.title);
    };
    let y_padding = if y_max - y_min > 1e-6 { (y_max - y_min) * 0.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(
            x_min..x_max.max(x_min + 1.0),
            (y_min - y_padding)..(y_max + y_padding),
        )?;
    chart
        .configure_mesh()
        .y_desc(&panel.y_label)
        .x_label_formatter(&|x: &f64| format_seconds(*x, time_zone))
        .light_line_style(BLACK.mix(0.15))
        .draw()?;

    for (index, trace) in panel.traces.iter().enumerate() {
        let style = Palette99::pick(index).stroke_width(if index == 0 { 1 } else { 2 });
        let mut is_labelled = false;
        // Missing values break the line:
        let segments =
            trace.points.chunk_by(|lhs, rhs| lhs.value.is_some() == rhs.value.is_some());
        for segment in segments {
            let segment: Vec<_> = segment
                .iter()
                .filter_map(|point| Some((seconds(point.timestamp), point.value?)))
                .collect();
            if segment.is_empty() {
                continue;
            }
            let annotation = chart.draw_series(LineSeries::new(segment, style))?;
            if !is_labelled {
                annotation.label(&trace.name).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], style)
                });
                is_labelled = true;
            }
        }
    }

    if let Some(reference) = panel.reference {
        let step = (x_max - x_min) / 100.0;
        let dashes = (0..50).map(|index| {
            let start = x_min + step * f64::from(2 * index);
            let dash = vec![(start, reference), (start + step, reference)];
            PathElement::new(dash, RED.stroke_width(2))
        });
        chart.draw_series(dashes)?.label(format!("Mean: {reference:.2}")).legend(|(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2))
        });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// Dates run along the x axis, and hour zero is at the top.
fn draw_heatmap_panel(area: &Area, panel: &HeatmapPanel) -> Result {
    let title = format!("{} ({})", panel.title, panel.color_label);
    let Some(range) = value_range(&panel.values) else {
        return draw_placeholder(area, &title);
    };
    #[allow(clippy::cast_precision_loss)]
    let n_days = panel.dates.len() as f64;

    let mut chart = ChartBuilder::on(area)
        .caption(&title, (FONT, 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..n_days, 0.0..24.0)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .y_labels(7)
        .y_label_formatter(&|y: &f64| format!("{:02}:00", hour_at(*y)))
        .x_label_formatter(&|x: &f64| date_at(panel, *x))
        .draw()?;

    chart.draw_series(cells(&panel.values).map(|(rectangle, value)| {
        Rectangle::new(rectangle, heat_color(value, range).filled())
    }))?;
    if let Some(overlay) = &panel.overlay
        && let Some(overlay_range) = value_range(overlay)
    {
        chart.draw_series(cells(overlay).map(|(rectangle, value)| {
            let alpha = overlay_alpha(normalize(value, overlay_range));
            Rectangle::new(rectangle, WHITE.mix(alpha).filled())
        }))?;
    }
    Ok(())
}

fn draw_stacked_bar_panel(area: &Area, panel: &StackedBarPanel) -> Result {
    let n_categories = panel.categories.len();
    let mut bottoms = vec![0.0; n_categories];
    for stack in &panel.stacks {
        for (bottom, value) in bottoms.iter_mut().zip(&stack.values) {
            *bottom += value;
        }
    }
    let y_max = bottoms.iter().copied().fold(0.0, f64::max).max(f64::EPSILON) * 1.05;
    bottoms.fill(0.0);

    #[allow(clippy::cast_precision_loss)]
    let x_max = n_categories as f64;
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n_categories)
        .x_label_formatter(&|x: &f64| category_at(&panel.categories, *x))
        .x_desc(&panel.x_label)
        .y_desc(&panel.y_label)
        .draw()?;

    for (index, stack) in panel.stacks.iter().enumerate() {
        let color = Palette99::pick(index).filled();
        let mut bars = Vec::with_capacity(n_categories);
        for (category, (bottom, value)) in bottoms.iter_mut().zip(&stack.values).enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let x = category as f64;
            bars.push(Rectangle::new([(x + 0.1, *bottom), (x + 0.9, *bottom + value)], color));
            *bottom += value;
        }
        chart.draw_series(bars)?.label(&stack.name).legend(move |(x, y)| {
            Rectangle::new([(x, y - 5), (x + 10, y + 5)], color)
        });
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_placeholder(area: &Area, title: &str) -> Result {
    area.titled(&format!("{title}: no data"), (FONT, 18))?;
    Ok(())
}

/// Rectangle of every present cell, in `(day, hour)` plot coordinates.
fn cells(columns: &[HourColumn]) -> impl Iterator<Item = ([(f64, f64); 2], f64)> + '_ {
    columns.iter().enumerate().flat_map(|(day, column)| {
        column.iter().enumerate().filter_map(move |(hour, value)| {
            #[allow(clippy::cast_precision_loss)]
            let (x, y) = (day as f64, 24.0 - hour as f64);
            Some(([(x, y), (x + 1.0, y - 1.0)], (*value)?))
        })
    })
}

fn value_range(columns: &[HourColumn]) -> Option<(f64, f64)> {
    bounds(columns.iter().flatten().flatten().copied())
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |bounds, value| match bounds {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

fn normalize(value: f64, (min, max): (f64, f64)) -> f64 {
    if max - min > f64::EPSILON { (value - min) / (max - min) } else { 0.5 }
}

/// Blue for the lowest value through to red for the highest.
fn heat_color(value: f64, range: (f64, f64)) -> HSLColor {
    HSLColor((1.0 - normalize(value, range)) * 0.66, 0.9, 0.5)
}

/// Opacity of the white overlay: transparent in the lower quarter, then quickly opaque.
fn overlay_alpha(level: f64) -> f64 {
    if level <= 0.25 {
        0.0
    } else if level <= 0.5 {
        (level - 0.25) / 0.25 * 0.75
    } else {
        0.75 + (level - 0.5) / 0.5 * 0.25
    }
}

#[allow(clippy::cast_precision_loss)]
fn seconds(timestamp: DateTime<Tz>) -> f64 {
    timestamp.timestamp() as f64
}

#[allow(clippy::cast_possible_truncation)]
fn format_seconds(seconds: f64, time_zone: Tz) -> String {
    DateTime::from_timestamp(seconds.round() as i64, 0).map_or_else(String::new, |timestamp| {
        timestamp.with_timezone(&time_zone).format("%Y-%m-%d").to_string()
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn hour_at(y: f64) -> u32 {
    (24.0 - y).round().clamp(0.0, 24.0) as u32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn date_at(panel: &HeatmapPanel, x: f64) -> String {
    panel
        .dates
        .get(x.floor().max(0.0) as usize)
        .map_or_else(String::new, |date| date.format("%b %d").to_string())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn category_at(categories: &[String], x: f64) -> String {
    categories.get(x.floor().max(0.0) as usize).cloned().unwrap_or_default()
}
