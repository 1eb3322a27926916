//! Frame catalog — loading and validation.
//!
//! The default catalog is embedded at compile time from
//! `contrib/catalog.toml`. A replacement can be loaded from any TOML file
//! with the same `[[frames]]` layout.

use crate::types::Frame;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

const EMBEDDED_CATALOG: &str = include_str!("../../../contrib/catalog.toml");

static EMBEDDED: OnceLock<Catalog> = OnceLock::new();

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("bad catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog has no frames")]
    Empty,
    #[error("frame at position {0} has an empty id")]
    EmptyId(usize),
    #[error("duplicate frame id: {0}")]
    DuplicateId(String),
    #[error("frame {0} has a zero price")]
    ZeroPrice(String),
    #[error("frame {0} is not in the catalog")]
    UnknownFrame(String),
}

/// Top-level catalog file structure.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    frames: Vec<Frame>,
}

/// An ordered, validated, immutable list of frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    frames: Vec<Frame>,
}

impl Catalog {
    /// Build a catalog from frames in display order.
    pub fn new(frames: Vec<Frame>) -> Result<Self, CatalogError> {
        if frames.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::with_capacity(frames.len());
        for (pos, frame) in frames.iter().enumerate() {
            if frame.id.is_empty() {
                return Err(CatalogError::EmptyId(pos));
            }
            if !seen.insert(frame.id.as_str()) {
                return Err(CatalogError::DuplicateId(frame.id.clone()));
            }
            if frame.price == 0 {
                return Err(CatalogError::ZeroPrice(frame.id.clone()));
            }
        }

        Ok(Self { frames })
    }

    /// The catalog shipped with the crate, parsed on first use.
    ///
    /// A parse failure is not cached; every call reports it again.
    pub fn embedded() -> Result<Self, CatalogError> {
        if let Some(catalog) = EMBEDDED.get() {
            return Ok(catalog.clone());
        }
        let parsed = Self::from_toml_str(EMBEDDED_CATALOG)?;
        Ok(EMBEDDED.get_or_init(|| parsed).clone())
    }

    pub fn from_toml_str(src: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(src)?;
        Self::new(file.frames)
    }

    /// Load and validate a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let src = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_toml_str(&src)?;
        tracing::info!(path = %path.display(), frames = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for a validated catalog.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id == id)
    }

    /// Look up a frame that must exist.
    pub fn require(&self, id: &str) -> Result<&Frame, CatalogError> {
        self.get(id)
            .ok_or_else(|| CatalogError::UnknownFrame(id.to_string()))
    }
}
