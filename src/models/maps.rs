// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Map layer helpers: bounds fitting and activity styling.

use geo::{BoundingRect, Coord, Geometry, Rect};
use geojson::GeoJson;

/// Fallback color for activity types without their own color.
pub const DEFAULT_ACTIVITY_COLOR: &str = "#9C27B0";

/// Line color for an activity feature, by activity type then sport type.
pub fn activity_color(activity_type: Option<&str>, sport_type: Option<&str>) -> &'static str {
    fn lookup(kind: &str) -> Option<&'static str> {
        match kind {
            "Ride" | "MountainBikeRide" => Some("#FF6B35"),
            "Run" => Some("#4CAF50"),
            "Walk" => Some("#2196F3"),
            "Hike" => Some("#795548"),
            "VirtualRide" => Some("#FF9800"),
            "VirtualRun" => Some("#8BC34A"),
            _ => None,
        }
    }

    let Some(activity_type) = activity_type else {
        return DEFAULT_ACTIVITY_COLOR;
    };
    lookup(activity_type)
        .or_else(|| sport_type.and_then(lookup))
        .unwrap_or(DEFAULT_ACTIVITY_COLOR)
}

/// Number of features in a layer.
pub fn feature_count(layer: &GeoJson) -> usize {
    match layer {
        GeoJson::FeatureCollection(fc) => fc.features.len(),
        GeoJson::Feature(_) | GeoJson::Geometry(_) => 1,
    }
}

/// Bounding box (`x` = lng, `y` = lat) of every geometry in a layer.
///
/// Returns `None` for empty layers or layers without convertible geometry.
pub fn feature_bounds(layer: &GeoJson) -> Option<Rect<f64>> {
    let geometries: Vec<&geojson::Geometry> = match layer {
        GeoJson::FeatureCollection(fc) => fc
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .collect(),
        GeoJson::Feature(f) => f.geometry.iter().collect(),
        GeoJson::Geometry(g) => vec![g],
    };

    geometries
        .into_iter()
        .filter_map(|g| Geometry::<f64>::try_from(g.value.clone()).ok())
        .filter_map(|g| g.bounding_rect())
        .reduce(|acc, rect| {
            Rect::new(
                Coord {
                    x: acc.min().x.min(rect.min().x),
                    y: acc.min().y.min(rect.min().y),
                },
                Coord {
                    x: acc.max().x.max(rect.max().x),
                    y: acc.max().y.max(rect.max().y),
                },
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_color_fallbacks() {
        assert_eq!(activity_color(Some("Run"), None), "#4CAF50");
        assert_eq!(activity_color(Some("Workout"), Some("Hike")), "#795548");
        assert_eq!(activity_color(Some("Workout"), Some("Yoga")), DEFAULT_ACTIVITY_COLOR);
        assert_eq!(activity_color(None, Some("Run")), DEFAULT_ACTIVITY_COLOR);
    }

    #[test]
    fn test_feature_bounds() {
        let layer: GeoJson = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"activity_type": "Run"},
                 "geometry": {"type": "LineString", "coordinates": [[-1.47, 53.38], [-1.46, 53.39]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [-1.50, 53.40]}},
                {"type": "Feature", "properties": {}, "geometry": null}
            ]
        }"#
        .parse()
        .unwrap();

        assert_eq!(feature_count(&layer), 3);
        let bounds = feature_bounds(&layer).unwrap();
        assert_eq!(bounds.min().x, -1.50);
        assert_eq!(bounds.max().x, -1.46);
        assert_eq!(bounds.min().y, 53.38);
        assert_eq!(bounds.max().y, 53.40);
    }

    #[test]
    fn test_empty_layer_has_no_bounds() {
        let layer: GeoJson = r#"{"type": "FeatureCollection", "features": []}"#.parse().unwrap();
        assert!(feature_bounds(&layer).is_none());
    }
}
