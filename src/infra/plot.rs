// ============================================================
// Layer 6 — Learning-Rate Plot
// ============================================================
// Writes the learning-rate sweep to disk twice:
//
//   plots/mnist_lr_finder_for_{optimizer}.png  ← line plot
//   plots/mnist_lr_finder_for_{optimizer}.csv  ← raw (lr, loss) rows
//
// The PNG is drawn pixel by pixel with the `image` crate:
// log10(lr) on the x axis, smoothed loss on the y axis, light
// grid lines at every decade of the learning rate.

use anyhow::{ensure, Context, Result};
use image::{Rgb, RgbImage};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::ml::lr_finder::LrPoint;

const WIDTH:  u32 = 800;
const HEIGHT: u32 = 500;
const MARGIN: u32 = 40;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS:       Rgb<u8> = Rgb([0, 0, 0]);
const GRID:       Rgb<u8> = Rgb([220, 220, 220]);
const CURVE:      Rgb<u8> = Rgb([31, 119, 180]);

/// Writes the PNG and CSV of one sweep into a plots directory.
pub struct LrPlotWriter {
    dir: PathBuf,
}

impl LrPlotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn png_path(&self, optimizer: &str) -> PathBuf {
        self.dir.join(format!("mnist_lr_finder_for_{optimizer}.png"))
    }

    pub fn csv_path(&self, optimizer: &str) -> PathBuf {
        self.dir.join(format!("mnist_lr_finder_for_{optimizer}.csv"))
    }

    /// Write both files, returning the PNG path.
    pub fn write(&self, optimizer: &str, history: &[LrPoint]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create plots dir '{}'", self.dir.display()))?;

        let csv = self.csv_path(optimizer);
        write_csv(&csv, history)?;

        let png = self.png_path(optimizer);
        render(history)?
            .save(&png)
            .with_context(|| format!("Cannot write plot '{}'", png.display()))?;

        tracing::info!("Saved LR plot to '{}'", png.display());
        Ok(png)
    }
}

fn write_csv(path: &Path, history: &[LrPoint]) -> Result<()> {
    let mut f = fs::File::create(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    writeln!(f, "lr,loss")?;
    for p in history {
        writeln!(f, "{:e},{:.6}", p.lr, p.loss)?;
    }
    Ok(())
}

/// Render the sweep as an RGB image.
pub fn render(history: &[LrPoint]) -> Result<RgbImage> {
    let points: Vec<(f64, f64)> = history
        .iter()
        .filter(|p| p.lr > 0.0 && p.loss.is_finite())
        .map(|p| (p.lr.log10(), p.loss))
        .collect();
    ensure!(!points.is_empty(), "learning rate history is empty, nothing to plot");

    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    let (x_min, x_max) = span(points.iter().map(|p| p.0));
    let (y_min, y_max) = span(points.iter().map(|p| p.1));

    let left   = MARGIN as f64;
    let right  = (WIDTH - MARGIN) as f64;
    let top    = MARGIN as f64;
    let bottom = (HEIGHT - MARGIN) as f64;

    let to_px = |x: f64, y: f64| -> (i64, i64) {
        let px = left + (x - x_min) / (x_max - x_min) * (right - left);
        let py = bottom - (y - y_min) / (y_max - y_min) * (bottom - top);
        (px.round() as i64, py.round() as i64)
    };

    // decade grid
    let mut decade = x_min.ceil();
    while decade <= x_max {
        let (gx, _) = to_px(decade, y_min);
        draw_line(&mut img, (gx, top as i64), (gx, bottom as i64), GRID);
        decade += 1.0;
    }

    draw_line(&mut img, (left as i64, bottom as i64), (right as i64, bottom as i64), AXIS);
    draw_line(&mut img, (left as i64, top as i64), (left as i64, bottom as i64), AXIS);

    let pixels: Vec<(i64, i64)> = points.iter().map(|&(x, y)| to_px(x, y)).collect();
    if pixels.len() == 1 {
        draw_line(&mut img, pixels[0], pixels[0], CURVE);
    }
    for pair in pixels.windows(2) {
        draw_line(&mut img, pair[0], pair[1], CURVE);
    }

    Ok(img)
}

/// Min and max of the values, widened when they coincide so the
/// scale never divides by zero.
fn span(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if hi - lo < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

/// Bresenham line, clipped to the image.
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx  = (to.0 - x).abs();
    let dy  = -(to.1 - y).abs();
    let sx  = if x < to.0 { 1 } else { -1 };
    let sy  = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x   += sx;
        }
        if e2 <= dx {
            err += dx;
            y   += sy;
        }
    }
}
