use crate::picture::*;
use crate::MAX_THUMBNAIL_SIZE;

use image::imageops::{self, FilterType};
use log::debug;

#[derive(Debug, Clone, Copy)]
pub struct ScaleOptions {
    /// Color the resampled image is composited over
    pub background: RGBA,
    /// Resampling filter, bicubic by default
    pub filter: FilterType,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            background: (255, 255, 255, 255).into(),
            filter: FilterType::CatmullRom,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scaler {
    pub options: ScaleOptions,
}

impl Scaler {
    pub fn new(options: ScaleOptions) -> Self {
        Self { options }
    }

    /// Draws `image` over the background and resamples the result into a new `width`x`height` picture.
    /// Returns `None` if a dimension is zero or exceeds `MAX_THUMBNAIL_SIZE`.
    pub fn resize(&self, image: &Picture, width: usize, height: usize) -> Option<Picture> {
        let max = MAX_THUMBNAIL_SIZE as usize;

        if width == 0 || height == 0 || width > max || height > max {
            debug!("refusing to scale to {}x{}", width, height);
            return None;
        }

        if image.width() == 0 || image.height() == 0 {
            debug!("refusing to scale an empty image");
            return None;
        }

        // flatten first so transparent pixels cannot bleed into the resampled edges
        let mut canvas = Picture::new(image.width(), image.height());
        canvas.fill(&self.options.background);

        let mut flattened = canvas.to_rgba_image()?;
        imageops::overlay(&mut flattened, &image.to_rgba_image()?, 0, 0);

        let mut pic: Picture = imageops::resize(&flattened, width as u32, height as u32, self.options.filter).into();
        pic.set_resolution(image.resolution());

        Some(pic)
    }
}

/// Largest size with the aspect ratio of `width`x`height` that fits into a `cx`x`cx` box
pub fn fit_size(width: usize, height: usize, cx: usize) -> (usize, usize) {
    let scale = (cx as f64 / width as f64).min(cx as f64 / height as f64);

    (
        (width as f64 * scale).floor() as usize,
        (height as f64 * scale).floor() as usize,
    )
}
