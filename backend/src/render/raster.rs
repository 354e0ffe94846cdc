//! Rasterization of resolved SVG markup into PNG bytes.
//!
//! - `SvgRasterizer` renders through `resvg`.
//! - `BoundedRasterizer` wraps any rasterizer with a deadline so one hung
//!   slide cannot stall a whole batch.
//! - `FallbackRasterizer` ignores the markup and paints a generic placeholder
//!   card; the batch renderer uses it when the real rasterizer fails.

use crate::error::{ServiceError, ServiceResult};
use image::{Rgba, RgbaImage};
use log::warn;
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Largest canvas side, in pixels, any rasterizer will allocate.
pub const MAX_DIMENSION: u32 = 4096;

/// Rejects canvases that are empty or larger than `MAX_DIMENSION` per side.
pub fn check_canvas(width: u32, height: u32) -> ServiceResult<()> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ServiceError::Rasterization(format!(
            "canvas {}x{} is outside 1..={} pixels per side",
            width, height, MAX_DIMENSION
        )));
    }
    Ok(())
}

/// Converts markup into PNG bytes of exactly `width` x `height` pixels.
pub trait Rasterizer: Send + Sync {
    fn render_to_raster(&self, markup: &str, width: u32, height: u32) -> ServiceResult<Vec<u8>>;
}

pub struct SvgRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl SvgRasterizer {
    /// Loads the system fonts once; they are shared by every render.
    pub fn new() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        SvgRasterizer {
            fontdb: Arc::new(fontdb),
        }
    }

    /// A rasterizer without any fonts. Text is not drawn.
    pub fn without_fonts() -> Self {
        SvgRasterizer {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        }
    }
}

impl Default for SvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for SvgRasterizer {
    fn render_to_raster(&self, markup: &str, width: u32, height: u32) -> ServiceResult<Vec<u8>> {
        check_canvas(width, height)?;
        let mut options = usvg::Options::default();
        options.fontdb = self.fontdb.clone();

        let tree = usvg::Tree::from_str(markup, &options)
            .map_err(|e| ServiceError::Rasterization(format!("invalid SVG: {}", e)))?;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            ServiceError::Rasterization(format!("cannot allocate a {}x{} canvas", width, height))
        })?;

        // Stretch the document onto the requested canvas.
        let size = tree.size();
        let transform = Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| ServiceError::Rasterization(format!("PNG encoding failed: {}", e)))
    }
}

/// Runs the inner rasterizer on its own thread and gives up after `timeout`.
///
/// A render that overruns keeps its thread until it finishes; its result is
/// discarded.
pub struct BoundedRasterizer {
    inner: Arc<dyn Rasterizer>,
    timeout: Duration,
}

impl BoundedRasterizer {
    pub fn new(inner: Arc<dyn Rasterizer>, timeout: Duration) -> Self {
        BoundedRasterizer { inner, timeout }
    }
}

impl Rasterizer for BoundedRasterizer {
    fn render_to_raster(&self, markup: &str, width: u32, height: u32) -> ServiceResult<Vec<u8>> {
        let (tx, rx) = mpsc::channel();
        let inner = self.inner.clone();
        let markup = markup.to_string();

        thread::Builder::new()
            .name("rasterizer".to_string())
            .spawn(move || {
                // The receiver is gone when the deadline already passed.
                let _ = tx.send(inner.render_to_raster(&markup, width, height));
            })
            .map_err(|e| ServiceError::Rasterization(format!("cannot start render thread: {}", e)))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("Rasterization exceeded {:?}, giving up on this slide", self.timeout);
                Err(ServiceError::Rasterization(format!(
                    "timed out after {:?}",
                    self.timeout
                )))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ServiceError::Rasterization(
                "render thread panicked".to_string(),
            )),
        }
    }
}

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PLATE: Rgba<u8> = Rgba([236, 236, 236, 255]);
const INK: Rgba<u8> = Rgba([64, 64, 64, 255]);
const LABEL: &str = "GENERATED IMAGE";

/// Paints a white canvas with a grey plate reading "GENERATED IMAGE".
#[derive(Default)]
pub struct FallbackRasterizer;

impl Rasterizer for FallbackRasterizer {
    fn render_to_raster(&self, _markup: &str, width: u32, height: u32) -> ServiceResult<Vec<u8>> {
        check_canvas(width, height)?;
        let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

        // Each glyph is 5x7 cells plus one cell of spacing.
        let label_cells = LABEL.chars().count() as u32 * 6 - 1;
        let cell = (width * 3 / 4 / label_cells).clamp(1, 8);
        let label_w = label_cells * cell;
        let label_h = 7 * cell;
        let pad = cell * 2;

        let plate_w = (label_w + pad * 2).min(width);
        let plate_h = (label_h + pad * 2).min(height);
        let plate_x = (width - plate_w) / 2;
        let plate_y = (height - plate_h) / 2;
        fill_rect(&mut canvas, plate_x, plate_y, plate_w, plate_h, PLATE);

        let mut x = width.saturating_sub(label_w) / 2;
        let y = height.saturating_sub(label_h) / 2;
        for ch in LABEL.chars() {
            for (row, bits) in glyph(ch).iter().enumerate() {
                for col in 0..5u32 {
                    if bits & (0b10000 >> col) != 0 {
                        fill_rect(&mut canvas, x + col * cell, y + row as u32 * cell, cell, cell, INK);
                    }
                }
            }
            x += 6 * cell;
        }

        encode_png(&canvas)
    }
}

fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    let x_end = (x + w).min(canvas.width());
    let y_end = (y + h).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            canvas.put_pixel(px, py, color);
        }
    }
}

/// Rows of a 5x7 bitmap glyph, most significant bit on the left.
fn glyph(ch: char) -> [u8; 7] {
    match ch {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        _ => [0; 7],
    }
}

fn encode_png(canvas: &RgbaImage) -> ServiceResult<Vec<u8>> {
    let (w, h) = canvas.dimensions();
    let mut bytes = Vec::new();
    {
        let mut encoder = PngEncoder::new(&mut bytes, w, h);
        encoder.set_color(PngColorType::Rgba);
        encoder.set_depth(PngBitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| ServiceError::Rasterization(e.to_string()))?;
        writer
            .write_image_data(canvas.as_raw())
            .map_err(|e| ServiceError::Rasterization(e.to_string()))?;
    }
    Ok(bytes)
}
