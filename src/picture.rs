use std::convert::From;
use std::io::{Cursor, Write};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;

/// Resolution assumed for bitmaps that do not carry one
pub const DEFAULT_DPI: f32 = 96.0;

const METERS_PER_INCH: f32 = 0.0254;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RGBA {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<(u8, u8, u8, u8)> for RGBA {
    fn from(rgba: (u8, u8, u8, u8)) -> Self {
        Self {
            r: rgba.0,
            g: rgba.1,
            b: rgba.2,
            a: rgba.3,
        }
    }
}

impl FromStr for RGBA {
    type Err = anyhow::Error;

    /// Parses `RRGGBBAA`
    fn from_str(rgba: &str) -> Result<Self> {
        if rgba.len() != 8 || !rgba.is_ascii() {
            return Err(anyhow!("expected a color in the form RRGGBBAA, got '{}'", rgba));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&rgba[i..i + 2], 16).with_context(|| format!("invalid color '{}'", rgba))
        };

        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: channel(6)?,
        })
    }
}

/// Horizontal and vertical resolution in dots per inch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub x: f32,
    pub y: f32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            x: DEFAULT_DPI,
            y: DEFAULT_DPI,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Picture {
    data: Vec<u8>,
    width: usize,
    height: usize,
    depth: usize,
    resolution: Resolution,
}

impl Picture {
    pub fn new(width: usize, height: usize) -> Self {
        let depth = 4;
        let mut data = Vec::new();
        data.resize(width * height * depth, 0);

        let mut pic = Picture {
            data,
            width,
            height,
            depth,
            resolution: Resolution::default(),
        };

        pic.fill(&(0, 0, 0, 255).into());
        pic
    }

    /// Decodes an encoded image (PNG, JPEG, ...) into an RGBA picture
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).context("unable to decode embedded image")?;
        let mut pic: Picture = image.to_rgba8().into();

        if let Some(resolution) = png_resolution(bytes) {
            pic.resolution = resolution;
        }

        Ok(pic)
    }

    pub fn stride(&self) -> usize {
        self.width * self.depth
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
    }

    pub fn fill(&mut self, rgba: &RGBA) {
        for px in self.data.chunks_exact_mut(self.depth) {
            px.copy_from_slice(&[rgba.r, rgba.g, rgba.b, rgba.a]);
        }
    }

    pub fn set(&mut self, x: usize, y: usize, rgba: &RGBA) {
        if x >= self.width || y >= self.height {
            return;
        }

        let stride = self.stride();
        self.data[stride * y + (x * self.depth)] = rgba.r;
        self.data[stride * y + (x * self.depth) + 1] = rgba.g;
        self.data[stride * y + (x * self.depth) + 2] = rgba.b;
        self.data[stride * y + (x * self.depth) + 3] = rgba.a;
    }

    pub fn get(&self, x: usize, y: usize) -> RGBA {
        let stride = self.stride();
        (
            self.data[stride * y + (x * self.depth)],
            self.data[stride * y + (x * self.depth) + 1],
            self.data[stride * y + (x * self.depth) + 2],
            self.data[stride * y + (x * self.depth) + 3],
        )
            .into()
    }

    pub fn write_png<W: Write>(&self, w: W) -> Result<()> {
        let mut encoder = png::Encoder::new(w, self.width as u32, self.height as u32);

        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.data)?;
        writer.finish()?;

        Ok(())
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_png(&mut buf)?;
        Ok(buf)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path).with_context(|| format!("unable to create '{}'", path))?;
        self.write_png(std::io::BufWriter::new(file))
    }
}

impl From<RgbaImage> for Picture {
    fn from(image: RgbaImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            depth: 4,
            data: image.into_raw(),
            resolution: Resolution::default(),
        }
    }
}

/// Physical resolution from a PNG `pHYs` chunk, if present and in meters
fn png_resolution(bytes: &[u8]) -> Option<Resolution> {
    let reader = png::Decoder::new(Cursor::new(bytes)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;

    match dims.unit {
        png::Unit::Meter => Some(Resolution {
            x: dims.xppu as f32 * METERS_PER_INCH,
            y: dims.yppu as f32 * METERS_PER_INCH,
        }),
        _ => None,
    }
}
