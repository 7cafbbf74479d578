// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User-drawn custom areas and their local validation.

use crate::error::ValidationError;
use geo::{Area, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Maximum length of an area name, in characters, after trimming.
pub const MAX_AREA_NAME_LEN: usize = 100;

/// Minimum number of distinct vertices in an area outline.
pub const MIN_AREA_VERTICES: u64 = 3;

/// A vertex, serialized as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng(pub f64, pub f64);

impl LatLng {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lng(&self) -> f64 {
        self.1
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_finite()
            && self.1.is_finite()
            && (-90.0..=90.0).contains(&self.0)
            && (-180.0..=180.0).contains(&self.1)
    }
}

/// Custom area stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomArea {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub coordinates: Vec<LatLng>,
    /// Absent until a coverage calculation has completed
    #[serde(default)]
    pub coverage_percentage: Option<f64>,
    #[serde(default)]
    pub activities_count: u32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl CustomArea {
    /// Whether the stored coverage is absent or a finite value in `[0, 100]`.
    pub fn has_valid_coverage(&self) -> bool {
        self.coverage_percentage
            .map_or(true, |pct| pct.is_finite() && (0.0..=100.0).contains(&pct))
    }

    /// Width of a coverage bar in percent. Only the display is clamped.
    pub fn coverage_bar_width(&self) -> f64 {
        match self.coverage_percentage {
            Some(pct) if pct.is_finite() => pct.clamp(0.0, 100.0),
            _ => 0.0,
        }
    }

    pub fn coverage_label(&self) -> Option<String> {
        self.coverage_percentage
            .filter(|pct| pct.is_finite())
            .map(|pct| format!("Coverage: {:.1}%", pct))
    }

    /// Outline as a closed polygon (`x` = lng, `y` = lat).
    pub fn polygon(&self) -> Polygon<f64> {
        outline_polygon(&self.coordinates)
    }
}

/// Request body for creating or replacing a custom area.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct NewCustomArea {
    #[validate(custom(function = "validate_area_name"))]
    pub name: String,
    #[validate(
        length(min = 3, code = "too_few_vertices"),
        custom(function = "validate_vertices")
    )]
    pub coordinates: Vec<LatLng>,
}

impl NewCustomArea {
    /// Build a request; the name is trimmed.
    pub fn new(name: &str, coordinates: Vec<LatLng>) -> Self {
        Self {
            name: name.trim().to_string(),
            coordinates,
        }
    }

    /// Build a request from an encoded polyline (precision 5).
    pub fn from_polyline(name: &str, encoded: &str) -> Result<Self, ValidationError> {
        let line = polyline::decode_polyline(encoded, 5).map_err(|e| ValidationError::Invalid {
            field: "coordinates",
            message: format!("invalid polyline: {}", e),
        })?;
        Ok(Self::new(name, ring_vertices(&line)))
    }

    /// Run local validation, reporting the first offending field.
    pub fn check(&self) -> Result<(), ValidationError> {
        self.validate().map_err(|errors| first_error(&errors))
    }
}

/// Convert a ring (`x` = lng, `y` = lat) into vertices, dropping the closing point.
pub fn ring_vertices(ring: &LineString<f64>) -> Vec<LatLng> {
    let mut vertices: Vec<LatLng> = ring.coords().map(|c| LatLng(c.y, c.x)).collect();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}

fn outline_polygon(vertices: &[LatLng]) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = vertices
        .iter()
        .map(|v| Coord { x: v.lng(), y: v.lat() })
        .collect();
    // Polygon::new closes the ring.
    Polygon::new(LineString::from(ring), vec![])
}

fn validate_area_name(name: &str) -> Result<(), validator::ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(validator::ValidationError::new("required"));
    }
    if trimmed.chars().count() > MAX_AREA_NAME_LEN {
        return Err(validator::ValidationError::new("too_long"));
    }
    Ok(())
}

fn validate_vertices(vertices: &[LatLng]) -> Result<(), validator::ValidationError> {
    if vertices.iter().any(|v| !v.is_valid()) {
        return Err(validator::ValidationError::new("out_of_range")
            .with_message("vertices must be finite lat/lng within range".into()));
    }
    if vertices.len() as u64 >= MIN_AREA_VERTICES && outline_polygon(vertices).unsigned_area() == 0.0
    {
        return Err(validator::ValidationError::new("degenerate")
            .with_message("the outline encloses no area".into()));
    }
    Ok(())
}

fn first_error(errors: &validator::ValidationErrors) -> ValidationError {
    let fields = errors.field_errors();
    for field in ["name", "coordinates"] {
        let Some(err) = fields.get(field).and_then(|list| list.first()) else {
            continue;
        };
        return match err.code.as_ref() {
            "required" => ValidationError::Required { field },
            "too_long" => ValidationError::TooLong {
                field,
                max: MAX_AREA_NAME_LEN,
            },
            "too_few_vertices" => ValidationError::Invalid {
                field,
                message: format!("at least {} vertices are required", MIN_AREA_VERTICES),
            },
            code => ValidationError::Invalid {
                field,
                message: err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| code.to_string()),
            },
        };
    }
    ValidationError::Invalid {
        field: "area",
        message: errors.to_string(),
    }
}
