//! Confidence bar chart rendering.
//!
//! Draws the per-class confidence distribution as a PNG with the `image`
//! crate: white canvas, light gridlines, one bar per class in class-list
//! order. The label-to-value association travels in the JSON response, so
//! the chart itself stays text-free.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use thiserror::Error;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;
const MARGIN_LEFT: u32 = 40;
const MARGIN_RIGHT: u32 = 20;
const MARGIN_TOP: u32 = 20;
const MARGIN_BOTTOM: u32 = 30;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRIDLINE: Rgb<u8> = Rgb([225, 225, 225]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);

const BAR_PALETTE: [Rgb<u8>; 6] = [
    Rgb([66, 133, 244]),
    Rgb([219, 68, 55]),
    Rgb([244, 180, 0]),
    Rgb([15, 157, 88]),
    Rgb([171, 71, 188]),
    Rgb([255, 112, 67]),
];

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("no confidences to chart")]
    Empty,
    #[error("failed to encode chart: {0}")]
    Encode(#[from] image::ImageError),
}

fn fill_rect(canvas: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..y1.min(canvas.height()) {
        for x in x0..x1.min(canvas.width()) {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Render per-class confidence percentages (0-100) to an in-memory PNG.
/// Deterministic for fixed inputs.
pub fn render_confidence_chart(percentages: &[f32]) -> Result<Vec<u8>, ChartError> {
    if percentages.is_empty() {
        return Err(ChartError::Empty);
    }

    let mut canvas = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    let plot_left = MARGIN_LEFT;
    let plot_right = WIDTH - MARGIN_RIGHT;
    let plot_top = MARGIN_TOP;
    let plot_bottom = HEIGHT - MARGIN_BOTTOM;
    let plot_height = (plot_bottom - plot_top) as f32;

    // Horizontal gridlines at 25% steps.
    for step in 1..=4u32 {
        let y = plot_bottom - (plot_height * step as f32 / 4.0) as u32;
        fill_rect(&mut canvas, plot_left, y, plot_right, y + 1, GRIDLINE);
    }

    let slot = ((plot_right - plot_left) / percentages.len() as u32).max(1);
    let bar_width = (slot * 3 / 5).max(1);
    let bar_inset = slot.saturating_sub(bar_width) / 2;

    for (i, pct) in percentages.iter().enumerate() {
        let fraction = (pct / 100.0).clamp(0.0, 1.0);
        let bar_height = (plot_height * fraction) as u32;
        let x0 = plot_left + slot * i as u32 + bar_inset;
        let color = BAR_PALETTE[i % BAR_PALETTE.len()];
        fill_rect(
            &mut canvas,
            x0,
            plot_bottom - bar_height,
            x0 + bar_width,
            plot_bottom,
            color,
        );
    }

    // Axis baseline and y-axis.
    fill_rect(&mut canvas, plot_left, plot_bottom, plot_right, plot_bottom + 2, AXIS);
    fill_rect(&mut canvas, plot_left.saturating_sub(2), plot_top, plot_left, plot_bottom + 2, AXIS);

    let mut buf = Cursor::new(Vec::new());
    canvas.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_decodable_png_of_fixed_size() {
        let png = render_confidence_chart(&[72.5, 12.0, 10.0, 5.5]).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), WIDTH);
        assert_eq!(decoded.height(), HEIGHT);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            render_confidence_chart(&[]),
            Err(ChartError::Empty)
        ));
    }

    #[test]
    fn is_deterministic() {
        let a = render_confidence_chart(&[40.0, 60.0]).unwrap();
        let b = render_confidence_chart(&[40.0, 60.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        // Values outside [0, 100] must not panic or overflow the canvas.
        let png = render_confidence_chart(&[150.0, -20.0]).unwrap();
        assert!(image::load_from_memory(&png).is_ok());
    }
}
