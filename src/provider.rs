use crate::parser::{extract_candidates, select_best, Candidate};
use crate::picture::Picture;
use crate::scaler::{fit_size, ScaleOptions, Scaler};
use crate::MAX_THUMBNAIL_SIZE;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info, warn};
use std::io;
use std::panic::{self, AssertUnwindSafe};

/// Alpha channel hint handed to the host together with the bitmap
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaType {
    Unknown = 0,
    Rgb = 1,
}

#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub picture: Picture,
    pub alpha: AlphaType,
}

/// Turns G-code documents into thumbnails. Holds no per-request state,
/// construct one per request or share it freely.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailProvider {
    scaler: Scaler,
}

impl ThumbnailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ScaleOptions) -> Self {
        Self {
            scaler: Scaler::new(options),
        }
    }

    /// Extracts the largest embedded thumbnail and fits it into a `cx`x`cx` box.
    ///
    /// Every failure (invalid size, nothing embedded, undecodable payload, a panic
    /// while reading or decoding) yields `None`.
    pub fn get_thumbnail<R: io::BufRead>(&self, reader: R, cx: u32) -> Option<Thumbnail> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.extract(reader, cx))) {
            Ok(thumbnail) => thumbnail,
            Err(_) => {
                warn!("thumbnail extraction panicked");
                None
            }
        }
    }

    fn extract<R: io::BufRead>(&self, reader: R, cx: u32) -> Option<Thumbnail> {
        if cx == 0 || cx > MAX_THUMBNAIL_SIZE {
            debug!("requested size {} is out of range", cx);
            return None;
        }

        let candidate = match select_best(extract_candidates(reader)) {
            Some(candidate) => candidate,
            None => {
                debug!("no embedded thumbnail found");
                return None;
            }
        };

        let picture = match decode_candidate(&candidate) {
            Ok(picture) => picture,
            Err(err) => {
                debug!("{:#}", err);
                return None;
            }
        };

        info!(
            "decoded {}x{} thumbnail from {} characters of base64",
            picture.width(),
            picture.height(),
            candidate.len()
        );

        let picture = self.fit(picture, cx as usize)?;

        Some(Thumbnail {
            picture,
            alpha: AlphaType::Rgb,
        })
    }

    fn fit(&self, picture: Picture, cx: usize) -> Option<Picture> {
        // only a picture of exactly cx by cx is passed through as is
        if picture.width() == cx && picture.height() == cx {
            return Some(picture);
        }

        let (width, height) = fit_size(picture.width(), picture.height(), cx);
        debug!(
            "scaling {}x{} to {}x{}",
            picture.width(),
            picture.height(),
            width,
            height
        );

        self.scaler.resize(&picture, width, height)
    }
}

/// Decodes the base64 payload of a candidate into a picture, ignoring embedded whitespace
pub fn decode_candidate(candidate: &Candidate) -> Result<Picture> {
    let payload: String = candidate
        .payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD
        .decode(payload.as_bytes())
        .context("thumbnail payload is not valid base64")?;

    Picture::decode(&bytes)
}
