//! tryon-core — Frame catalog, face shapes and recommendation ranking.
//!
//! Everything here is pure data and pure functions; capture hardware and
//! session state live in `tryon-hw` and `tryon-session`.

pub mod catalog;
pub mod detector;
pub mod ranker;
pub mod types;

pub use catalog::{Catalog, CatalogError};
pub use detector::{FixedShapeDetector, RandomShapeDetector, ShapeDetector};
pub use types::{Category, FaceShape, Frame, ParseShapeError};
