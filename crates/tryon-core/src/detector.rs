//! Face shape detection.
//!
//! No classifier ships with the crate: `RandomShapeDetector` picks a shape
//! uniformly at random as a stand-in. A real model can be dropped in behind
//! [`ShapeDetector`] without touching the session state machine.

use crate::types::FaceShape;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Strategy for classifying the face currently in front of the camera.
pub trait ShapeDetector {
    fn detect(&mut self) -> FaceShape;
}

impl<D: ShapeDetector + ?Sized> ShapeDetector for Box<D> {
    fn detect(&mut self) -> FaceShape {
        (**self).detect()
    }
}

/// Uniform random choice over [`FaceShape::ALL`].
pub struct RandomShapeDetector {
    rng: StdRng,
}

impl RandomShapeDetector {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence of shapes for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomShapeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeDetector for RandomShapeDetector {
    fn detect(&mut self) -> FaceShape {
        let shape = *FaceShape::ALL
            .choose(&mut self.rng)
            .unwrap_or(&FaceShape::Oval);
        tracing::debug!(%shape, "random shape selected");
        shape
    }
}

/// Always reports the same shape.
#[derive(Debug, Clone, Copy)]
pub struct FixedShapeDetector(pub FaceShape);

impl ShapeDetector for FixedShapeDetector {
    fn detect(&mut self) -> FaceShape {
        self.0
    }
}
