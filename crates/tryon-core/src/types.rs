use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Facial-geometry class used to match frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaceShape {
    Round,
    Oval,
    Square,
    Heart,
}

impl FaceShape {
    /// Every shape, in declaration order.
    pub const ALL: [FaceShape; 4] = [
        FaceShape::Round,
        FaceShape::Oval,
        FaceShape::Square,
        FaceShape::Heart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FaceShape::Round => "ROUND",
            FaceShape::Oval => "OVAL",
            FaceShape::Square => "SQUARE",
            FaceShape::Heart => "HEART",
        }
    }
}

impl fmt::Display for FaceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown face shape: {0:?} (expected round, oval, square or heart)")]
pub struct ParseShapeError(pub String);

impl FromStr for FaceShape {
    type Err = ParseShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FaceShape::ALL
            .into_iter()
            .find(|shape| shape.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseShapeError(s.to_string()))
    }
}

/// Product line a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Sunglasses,
    Ophthalmic,
}

/// An eyewear catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub id: String,
    pub name: String,
    pub brand: String,
    /// Whole currency units; no minor units.
    pub price: u64,
    pub category: Category,
    /// Opaque image reference handed to the renderer.
    pub image: String,
    /// Shapes this frame suits. Empty means no specific shape, not every shape.
    #[serde(default)]
    pub recommended_for: BTreeSet<FaceShape>,
}

impl Frame {
    pub fn is_recommended_for(&self, shape: FaceShape) -> bool {
        self.recommended_for.contains(&shape)
    }

    /// Price with `.` thousands separators, e.g. `$680.000`.
    pub fn formatted_price(&self) -> String {
        let digits = self.price.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        format!("${grouped}")
    }
}
