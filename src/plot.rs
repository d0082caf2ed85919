use std::path::Path;
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use log::debug;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use crate::color::generate_palette;

// ---------------------------------------------------------------------------
// Offscreen class plot
// ---------------------------------------------------------------------------

/// One series on a class plot.
#[derive(Debug, Clone)]
pub struct PlotLine {
    pub sample_id: String,
    /// (mass, intensity) points in ascending mass order.
    pub points: Vec<(f64, f64)>,
}

/// Size and layout of a rendered plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    /// At most this many lines are drawn.
    pub max_lines: usize,
    /// Line `k` is shifted up by `line_offset * k`.
    pub line_offset: f64,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 1000,
            max_lines: 10,
            line_offset: 0.5,
        }
    }
}

const FONT_FAMILY: &str = "sans-serif";
static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Register the bundled font once per process; plotters has no system
/// font lookup in this build.
fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED
        .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());
    if ok {
        Ok(())
    } else {
        Err(anyhow!("bundled font could not be parsed"))
    }
}

/// Render overlaid lines for one compound class and write them as PNG.
///
/// Returns the number of lines actually drawn.
pub fn render_class_plot(
    path: &Path,
    title: &str,
    lines: &[PlotLine],
    style: &PlotStyle,
) -> Result<usize> {
    let (buffer, drawn) = render_rgb(title, lines, style)?;

    image::save_buffer_with_format(
        path,
        &buffer,
        style.width,
        style.height,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("writing {}", path.display()))?;

    Ok(drawn)
}

/// Draw into an RGB8 buffer of `style.width * style.height` pixels.
fn render_rgb(title: &str, lines: &[PlotLine], style: &PlotStyle) -> Result<(Vec<u8>, usize)> {
    ensure_font()?;

    let shown: Vec<&PlotLine> = lines.iter().take(style.max_lines).collect();
    let (x_range, y_range) = axis_ranges(&shown, style.line_offset);
    let palette = generate_palette(shown.len());

    let (w, h) = (style.width, style.height);
    let mut buffer = vec![0u8; w as usize * h as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (w, h)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT_FAMILY, 28))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc("Mass")
            .y_desc("Intensity")
            .label_style((FONT_FAMILY, 14))
            .axis_desc_style((FONT_FAMILY, 16))
            .light_line_style(RGBColor(235, 235, 235).stroke_width(1))
            .draw()
            .map_err(draw_err)?;

        for (k, (line, color)) in shown.iter().zip(palette.iter()).enumerate() {
            let offset = style.line_offset * k as f64;
            debug!("plotting {} ({} points) at offset {offset}", line.sample_id, line.points.len());
            chart
                .draw_series(LineSeries::new(
                    line.points.iter().map(|&(x, y)| (x, y + offset)),
                    color.stroke_width(2),
                ))
                .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
    }

    Ok((buffer, shown.len()))
}

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("drawing failed: {e}")
}

/// Axis extents covering every shown point, offsets included.
fn axis_ranges(lines: &[&PlotLine], line_offset: f64) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = 0.0f64;
    let mut y_max = f64::NEG_INFINITY;

    for (k, line) in lines.iter().enumerate() {
        let offset = line_offset * k as f64;
        for &(x, y) in &line.points {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y + offset);
            y_max = y_max.max(y + offset);
        }
    }

    if !x_min.is_finite() || !x_max.is_finite() {
        (x_min, x_max) = (0.0, 1.0);
    }
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if !y_max.is_finite() || y_max <= y_min {
        y_max = y_min + 1.0;
    }
    // Headroom above the top line.
    let pad = (y_max - y_min) * 0.05;
    (x_min..x_max, y_min..y_max + pad)
}
