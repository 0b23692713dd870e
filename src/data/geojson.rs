use crate::core::geo::{LatLng, LatLngBounds};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A GeoJSON position. Extra ordinates (altitude) are accepted and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Position {
    pub lng: f64,
    pub lat: f64,
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(values: Vec<f64>) -> std::result::Result<Self, Self::Error> {
        match values.as_slice() {
            [lng, lat, ..] => Ok(Position {
                lng: *lng,
                lat: *lat,
            }),
            _ => Err(format!("position needs at least 2 values, got {}", values.len())),
        }
    }
}

impl From<Position> for [f64; 2] {
    fn from(position: Position) -> Self {
        [position.lng, position.lat]
    }
}

impl From<Position> for LatLng {
    fn from(position: Position) -> Self {
        LatLng::new(position.lat, position.lng)
    }
}

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: Position,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

impl GeoJsonGeometry {
    /// Gets the bounding box of the geometry, `None` when it has no positions
    pub fn bounds(&self) -> Option<LatLngBounds> {
        let mut bounds: Option<LatLngBounds> = None;
        self.visit_positions(&mut |position| {
            let point = LatLng::from(*position);
            bounds = Some(match bounds.take() {
                Some(mut b) => {
                    b.extend(&point);
                    b
                }
                None => LatLngBounds::new(point, point),
            });
        });
        bounds
    }

    fn visit_positions(&self, visit: &mut dyn FnMut(&Position)) {
        match self {
            GeoJsonGeometry::Point { coordinates } => visit(coordinates),
            GeoJsonGeometry::LineString { coordinates }
            | GeoJsonGeometry::MultiPoint { coordinates } => coordinates.iter().for_each(visit),
            GeoJsonGeometry::Polygon { coordinates }
            | GeoJsonGeometry::MultiLineString { coordinates } => {
                coordinates.iter().flatten().for_each(visit)
            }
            GeoJsonGeometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().for_each(visit)
            }
            GeoJsonGeometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.visit_positions(visit);
                }
            }
        }
    }
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    pub id: Option<Value>,
    pub geometry: Option<GeoJsonGeometry>,
    pub properties: Option<HashMap<String, Value>>,
}

impl GeoJsonFeature {
    pub fn from_geometry(geometry: GeoJsonGeometry) -> Self {
        Self {
            id: None,
            geometry: Some(geometry),
            properties: None,
        }
    }

    /// Looks up a property value by name
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(name)
    }
}

/// Root GeoJSON object of a tile payload
#[derive(Debug, Clone, PartialEq)]
pub enum GeoJson {
    Feature(GeoJsonFeature),
    FeatureCollection { features: Vec<GeoJsonFeature> },
    Geometry(GeoJsonGeometry),
}

impl GeoJson {
    /// Decodes a tile payload; anything that is not GeoJSON is a decode error
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(payload)?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| MapError::ParseError("GeoJSON object without a type".into()))?;

        match kind.as_str() {
            "FeatureCollection" => {
                let features = value
                    .get_mut("features")
                    .map(Value::take)
                    .ok_or_else(|| {
                        MapError::ParseError("FeatureCollection without features".into())
                    })?;
                Ok(GeoJson::FeatureCollection {
                    features: serde_json::from_value(features)?,
                })
            }
            "Feature" => Ok(GeoJson::Feature(serde_json::from_value(value)?)),
            _ => Ok(GeoJson::Geometry(serde_json::from_value(value)?)),
        }
    }

    /// Flattens the object into features; a bare geometry becomes one feature
    pub fn into_features(self) -> Vec<GeoJsonFeature> {
        match self {
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::FeatureCollection { features } => features,
            GeoJson::Geometry(geometry) => vec![GeoJsonFeature::from_geometry(geometry)],
        }
    }
}

/// Style information for rendering GeoJSON features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStyle {
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
    pub stroke_opacity: Option<f64>,
    pub fill: Option<String>,
    pub fill_opacity: Option<f64>,
    pub marker_color: Option<String>,
    pub marker_size: Option<String>,
    pub marker_symbol: Option<String>,
}

impl Default for FeatureStyle {
    fn default() -> Self {
        Self {
            stroke: Some("#3388ff".to_string()),
            stroke_width: Some(3.0),
            stroke_opacity: Some(1.0),
            fill: Some("#3388ff".to_string()),
            fill_opacity: Some(0.2),
            marker_color: Some("#3388ff".to_string()),
            marker_size: Some("medium".to_string()),
            marker_symbol: None,
        }
    }
}

type StyleFn = Arc<dyn Fn(&GeoJsonFeature) -> FeatureStyle + Send + Sync>;
type FilterFn = Arc<dyn Fn(&GeoJsonFeature) -> bool + Send + Sync>;

/// A feature ready to be drawn
#[derive(Debug, Clone, PartialEq)]
pub struct StyledFeature {
    pub feature: GeoJsonFeature,
    pub style: FeatureStyle,
}

/// How tile payloads are turned into overlay features: a default style,
/// an optional per-feature style function and an optional filter.
#[derive(Clone, Default)]
pub struct RenderOptions {
    style: FeatureStyle,
    style_function: Option<StyleFn>,
    filter: Option<FilterFn>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default style for all features
    pub fn with_style(mut self, style: FeatureStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets a function to style features based on their properties
    pub fn with_style_function<F>(mut self, style_fn: F) -> Self
    where
        F: Fn(&GeoJsonFeature) -> FeatureStyle + Send + Sync + 'static,
    {
        self.style_function = Some(Arc::new(style_fn));
        self
    }

    /// Sets a filter function to show/hide features
    pub fn with_filter<F>(mut self, filter_fn: F) -> Self
    where
        F: Fn(&GeoJsonFeature) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter_fn));
        self
    }

    /// Gets the style for a specific feature
    pub fn feature_style(&self, feature: &GeoJsonFeature) -> FeatureStyle {
        match &self.style_function {
            Some(style_fn) => style_fn(feature),
            None => self.style.clone(),
        }
    }

    /// Applies the filter and styles to every feature of a payload
    pub fn render(&self, data: GeoJson) -> Vec<StyledFeature> {
        data.into_features()
            .into_iter()
            .filter(|feature| self.filter.as_ref().map_or(true, |keep| keep(feature)))
            .map(|feature| StyledFeature {
                style: self.feature_style(&feature),
                feature,
            })
            .collect()
    }
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("style", &self.style)
            .field("style_function", &self.style_function.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}
