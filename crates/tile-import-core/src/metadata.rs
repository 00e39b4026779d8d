//! Per-file image introspection behind a provider boundary.
//!
//! The default provider reads image headers through the `image` crate; hosts with
//! their own image library implement [`ImageProvider`] and [`ImageHandle`].

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::{ImageDecoder, ImageReader};
use tracing::{debug, instrument, warn};

use crate::error::{ImportError, Result};
use crate::model::{Candidate, Resolution, TileRecord};

/// Provider-specific attribute attached to an image spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttribute {
    pub name: String,
    pub value: u32,
}

/// Header information reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub channel_count: Option<u32>,
    pub extra_attributes: Vec<ImageAttribute>,
}

impl ImageSpec {
    /// Bit depth is the value of the first extra attribute, if any.
    pub fn bit_depth(&self) -> Option<u32> {
        self.extra_attributes.first().map(|a| a.value)
    }
}

pub trait ImageHandle {
    fn spec(&mut self) -> Result<ImageSpec>;
    /// Releases the underlying resource. Must tolerate repeated calls.
    fn close(&mut self);
}

pub trait ImageProvider {
    type Handle: ImageHandle;
    fn open(&self, path: &Path) -> Result<Self::Handle>;
}

/// Closes the wrapped handle when dropped, whichever way the caller leaves.
struct OpenImage<H: ImageHandle> {
    handle: H,
}

impl<H: ImageHandle> Drop for OpenImage<H> {
    fn drop(&mut self) {
        self.handle.close();
    }
}

/// Opens `candidate` through `provider` and builds its [`TileRecord`].
pub fn read_tile<P: ImageProvider>(provider: &P, candidate: Candidate) -> Result<TileRecord> {
    if !candidate.path.exists() {
        return Err(ImportError::ImageNotFound {
            path: candidate.path,
        });
    }
    let mut image = OpenImage {
        handle: provider.open(&candidate.path)?,
    };
    let spec = image.handle.spec().map_err(|e| match e {
        e @ ImportError::Metadata { .. } => e,
        other => ImportError::Metadata {
            path: candidate.path.clone(),
            reason: other.to_string(),
        },
    })?;
    let resolution = Resolution::new(spec.width, spec.height);
    Ok(TileRecord::from_candidate(
        candidate,
        resolution,
        spec.bit_depth(),
        spec.channel_count,
    ))
}

/// Reads metadata for every candidate in order, skipping files that fail.
///
/// `on_file` runs once per candidate with the error when that file was skipped.
#[instrument(skip_all, fields(count = candidates.len()))]
pub fn read_tiles<P, F>(provider: &P, candidates: Vec<Candidate>, mut on_file: F) -> Vec<TileRecord>
where
    P: ImageProvider,
    F: FnMut(&Path, Option<&ImportError>),
{
    let mut records = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let path = candidate.path.clone();
        match read_tile(provider, candidate) {
            Ok(record) => {
                on_file(&path, None);
                records.push(record);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skip tile");
                on_file(&path, Some(&e));
            }
        }
    }
    debug!(read = records.len(), "metadata pass finished");
    records
}

/// Provider backed by the `image` crate's header decoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateProvider;

pub struct ImageCrateHandle {
    path: PathBuf,
    reader: Option<ImageReader<BufReader<File>>>,
    spec: Option<ImageSpec>,
}

impl ImageProvider for ImageCrateProvider {
    type Handle = ImageCrateHandle;

    fn open(&self, path: &Path) -> Result<ImageCrateHandle> {
        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| ImportError::Metadata {
                path: path.to_path_buf(),
                reason: format!("failed to open image: {e}"),
            })?;
        Ok(ImageCrateHandle {
            path: path.to_path_buf(),
            reader: Some(reader),
            spec: None,
        })
    }
}

impl ImageHandle for ImageCrateHandle {
    fn spec(&mut self) -> Result<ImageSpec> {
        if let Some(spec) = &self.spec {
            return Ok(spec.clone());
        }
        let reader = self.reader.take().ok_or_else(|| ImportError::Metadata {
            path: self.path.clone(),
            reason: "image handle already closed".into(),
        })?;
        let decoder = reader.into_decoder().map_err(|e| ImportError::Metadata {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let (width, height) = decoder.dimensions();
        let color = decoder.color_type();
        let channels = u32::from(color.channel_count());
        let mut extra_attributes = Vec::new();
        if channels > 0 {
            extra_attributes.push(ImageAttribute {
                name: "bitdepth".into(),
                value: u32::from(color.bits_per_pixel()) / channels,
            });
        }
        let spec = ImageSpec {
            width,
            height,
            channel_count: Some(channels),
            extra_attributes,
        };
        self.spec = Some(spec.clone());
        Ok(spec)
    }

    fn close(&mut self) {
        self.reader = None;
    }
}
