//! Park time-series chart for the legacy park view, rendered to an RGBA buffer.

use plotters::prelude::*;

use crate::model::TimeseriesSample;

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("chart size {width}x{height} is too large")]
    TooLarge { width: u32, height: u32 },

    #[error("drawing failed: {0}")]
    Draw(String),
}

const MARGIN: i32 = 24;
const NDVI_COLOR: RGBColor = RGBColor(46, 125, 50);
const NDRE_COLOR: RGBColor = RGBColor(33, 150, 243);
const PSRI_COLOR: RGBColor = RGBColor(255, 152, 0);
const AXIS_COLOR: RGBColor = RGBColor(120, 120, 120);
const GRID_COLOR: RGBColor = RGBColor(225, 225, 225);

/// Draws the NDVI, NDRE and PSRI series as lines with dot markers.
///
/// Samples are plotted in the order given; the x axis is evenly spaced by
/// sample index. An empty series yields axes only.
pub fn render_timeseries_rgba(
    width: u32,
    height: u32,
    samples: &[TimeseriesSample],
) -> Result<Vec<u8>, ChartError> {
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }
    let too_large = || ChartError::TooLarge { width, height };
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(too_large)?;
    let rgb_len = pixel_count.checked_mul(3).ok_or_else(too_large)?;
    let rgba_len = pixel_count.checked_mul(4).ok_or_else(too_large)?;

    let mut rgb = vec![255u8; rgb_len];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let plot = PlotArea::new(width, height, samples);

        for step in 0..=4 {
            let y = plot.top + (plot.bottom - plot.top) * step / 4;
            root.draw(&PathElement::new([(plot.left, y), (plot.right, y)], GRID_COLOR))
                .map_err(draw_err)?;
        }
        root.draw(&PathElement::new(
            [(plot.left, plot.top), (plot.left, plot.bottom), (plot.right, plot.bottom)],
            AXIS_COLOR,
        ))
        .map_err(draw_err)?;

        let series: [(fn(&TimeseriesSample) -> f64, RGBColor); 3] = [
            (|s| s.ndvi, NDVI_COLOR),
            (|s| s.ndre, NDRE_COLOR),
            (|s| s.psri, PSRI_COLOR),
        ];
        for (value, color) in series {
            let points: Vec<(i32, i32)> = samples
                .iter()
                .enumerate()
                .map(|(i, s)| plot.to_pixel(i, value(s)))
                .collect();
            if points.len() > 1 {
                root.draw(&PathElement::new(points.clone(), color.stroke_width(2)))
                    .map_err(draw_err)?;
            }
            for point in points {
                root.draw(&Circle::new(point, 3, color.filled()))
                    .map_err(draw_err)?;
            }
        }

        root.present().map_err(draw_err)?;
    }

    let mut rgba = Vec::with_capacity(rgba_len);
    for px in rgb.chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    Ok(rgba)
}

fn draw_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Draw(e.to_string())
}

struct PlotArea {
    left: i32,
    right: i32,
    top: i32,
    bottom: i32,
    count: usize,
    min: f64,
    max: f64,
}

impl PlotArea {
    fn new(width: u32, height: u32, samples: &[TimeseriesSample]) -> Self {
        let (mut min, mut max) = samples
            .iter()
            .flat_map(|s| [s.ndvi, s.ndre, s.psri])
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !min.is_finite() || !max.is_finite() {
            (min, max) = (0.0, 1.0);
        }
        if (max - min).abs() < 1e-9 {
            min -= 0.5;
            max += 0.5;
        }
        let w = width as i32;
        let h = height as i32;
        Self {
            left: MARGIN.min(w / 4),
            right: (w - MARGIN).max(w * 3 / 4),
            top: MARGIN.min(h / 4),
            bottom: (h - MARGIN).max(h * 3 / 4),
            count: samples.len(),
            min,
            max,
        }
    }

    fn to_pixel(&self, index: usize, value: f64) -> (i32, i32) {
        let x = if self.count > 1 {
            self.left + ((self.right - self.left) as f64 * index as f64 / (self.count - 1) as f64) as i32
        } else {
            (self.left + self.right) / 2
        };
        let t = if value.is_finite() {
            ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let y = self.bottom - ((self.bottom - self.top) as f64 * t).round() as i32;
        (x, y)
    }
}
