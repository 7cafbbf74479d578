// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Adapter between custom areas and an interactive map surface.
//!
//! [`MapSurface`] is whatever actually draws (an embedded map widget, or
//! [`GeoJsonSurface`] for headless export). [`AreaDrawingSession`] owns one
//! surface for its whole life: it redraws the existing areas, turns draw
//! events into [`DrawnArea`]s and tears the surface down exactly once.

use crate::models::custom_area::{ring_vertices, MIN_AREA_VERTICES};
use crate::models::{CustomArea, LatLng};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DrawingError {
    #[error("Unsupported shape: {0}")]
    UnsupportedShape(String),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Map surface error: {0}")]
    Surface(String),

    #[error("Drawing session already disposed")]
    Disposed,
}

/// Drawing backend.
pub trait MapSurface {
    /// Add one polygon layer with a hover tooltip.
    fn add_polygon(&mut self, vertices: &[LatLng], tooltip: &str) -> Result<(), DrawingError>;

    /// Remove every polygon layer.
    fn clear_layers(&mut self);

    /// Destroy the surface. Called exactly once.
    fn remove(&mut self);
}

/// An area as shown on (or drawn on) the map.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnArea {
    pub id: String,
    pub name: String,
    pub coordinates: Vec<LatLng>,
    pub coverage: Option<f64>,
}

impl DrawnArea {
    /// Hover text: the name, plus the coverage when known.
    pub fn tooltip(&self) -> String {
        match self.coverage.filter(|c| c.is_finite()) {
            Some(coverage) => format!("{}\nCoverage: {:.1}%", self.name, coverage),
            None => self.name.clone(),
        }
    }
}

impl From<&CustomArea> for DrawnArea {
    fn from(area: &CustomArea) -> Self {
        Self {
            id: area.id.to_string(),
            name: area.name.clone(),
            coordinates: area.coordinates.clone(),
            coverage: area.coverage_percentage,
        }
    }
}

/// Events raised by the drawing tools.
#[derive(Debug, Clone)]
pub enum DrawEvent {
    DrawStart,
    DrawStop,
    /// A finished polygon or rectangle, as GeoJSON (`[lng, lat]` positions)
    Created(Feature),
    Edited,
    Deleted,
}

type DrawnCallback = Box<dyn FnMut(&DrawnArea) + Send>;

pub struct AreaDrawingSession<M: MapSurface> {
    surface: Option<M>,
    on_drawn: Option<DrawnCallback>,
    layers: usize,
    drawing: bool,
    last_id: i64,
}

impl<M: MapSurface> AreaDrawingSession<M> {
    pub fn new(surface: M) -> Self {
        Self {
            surface: Some(surface),
            on_drawn: None,
            layers: 0,
            drawing: false,
            last_id: 0,
        }
    }

    pub fn on_area_drawn(&mut self, callback: impl FnMut(&DrawnArea) + Send + 'static) {
        self.on_drawn = Some(Box::new(callback));
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn is_disposed(&self) -> bool {
        self.surface.is_none()
    }

    /// The owned surface, until disposal.
    pub fn surface(&self) -> Option<&M> {
        self.surface.as_ref()
    }

    /// Replace all layers with `areas`, skipping invalid vertices and areas
    /// left without an outline. Returns how many areas were drawn.
    pub fn render(&mut self, areas: &[DrawnArea]) -> Result<usize, DrawingError> {
        let surface = self.surface.as_mut().ok_or(DrawingError::Disposed)?;
        surface.clear_layers();
        self.layers = 0;

        for area in areas {
            let vertices: Vec<LatLng> = area
                .coordinates
                .iter()
                .copied()
                .filter(LatLng::is_valid)
                .collect();
            if !is_outline(&vertices) {
                tracing::warn!(
                    area = %area.name,
                    valid = vertices.len(),
                    "Skipping area without enough valid coordinates"
                );
                continue;
            }
            surface.add_polygon(&vertices, &area.tooltip())?;
            self.layers += 1;
        }

        Ok(self.layers)
    }

    /// Feed one event from the drawing tools.
    ///
    /// A created shape is added to the surface, passed to the callback and
    /// returned.
    pub fn handle_event(&mut self, event: DrawEvent) -> Result<Option<DrawnArea>, DrawingError> {
        if self.surface.is_none() {
            return Err(DrawingError::Disposed);
        }

        match event {
            DrawEvent::DrawStart => self.drawing = true,
            DrawEvent::DrawStop => self.drawing = false,
            DrawEvent::Edited | DrawEvent::Deleted => {
                tracing::debug!("Ignoring edit/delete on drawn areas");
            }
            DrawEvent::Created(feature) => {
                let coordinates = outline_of(&feature)?;
                let name = format!("Custom Area {}", self.layers + 1);
                let area = DrawnArea {
                    id: self.next_id(),
                    name,
                    coordinates,
                    coverage: None,
                };

                if let Some(surface) = self.surface.as_mut() {
                    surface.add_polygon(&area.coordinates, &area.tooltip())?;
                }
                self.layers += 1;
                self.drawing = false;

                if let Some(callback) = self.on_drawn.as_mut() {
                    callback(&area);
                }
                return Ok(Some(area));
            }
        }

        Ok(None)
    }

    /// Tear the surface down. Returns `false` if it was already gone.
    pub fn dispose(&mut self) -> bool {
        match self.surface.take() {
            Some(mut surface) => {
                surface.remove();
                self.on_drawn = None;
                true
            }
            None => false,
        }
    }

    /// Millisecond timestamp id, unique within this session.
    fn next_id(&mut self) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id.to_string()
    }
}

impl<M: MapSurface> Drop for AreaDrawingSession<M> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn is_outline(vertices: &[LatLng]) -> bool {
    vertices.len() as u64 >= MIN_AREA_VERTICES
}

/// Normalize a drawn polygon or rectangle into `[lat, lng]` vertices.
fn outline_of(feature: &Feature) -> Result<Vec<LatLng>, DrawingError> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| DrawingError::InvalidShape("feature has no geometry".to_string()))?;

    let polygon = match &geometry.value {
        Value::Polygon(_) => geo::Polygon::<f64>::try_from(geometry.value.clone())
            .map_err(|e| DrawingError::InvalidShape(e.to_string()))?,
        other => return Err(DrawingError::UnsupportedShape(shape_name(other).to_string())),
    };

    let vertices = ring_vertices(polygon.exterior());
    if !is_outline(&vertices) {
        return Err(DrawingError::InvalidShape(format!(
            "outline has {} vertices",
            vertices.len()
        )));
    }
    Ok(vertices)
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Headless surface that collects layers as GeoJSON features.
#[derive(Debug, Default)]
pub struct GeoJsonSurface {
    features: Vec<Feature>,
    removed: bool,
}

impl GeoJsonSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.clone(),
            foreign_members: None,
        }
    }
}

impl MapSurface for GeoJsonSurface {
    fn add_polygon(&mut self, vertices: &[LatLng], tooltip: &str) -> Result<(), DrawingError> {
        if self.removed {
            return Err(DrawingError::Surface("surface was removed".to_string()));
        }

        let mut ring: Vec<Vec<f64>> = vertices.iter().map(|v| vec![v.lng(), v.lat()]).collect();
        if let Some(first) = ring.first().cloned() {
            ring.push(first);
        }

        let mut properties = JsonObject::new();
        properties.insert("tooltip".to_string(), tooltip.into());

        self.features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
        Ok(())
    }

    fn clear_layers(&mut self) {
        self.features.clear();
    }

    fn remove(&mut self) {
        self.removed = true;
    }
}
