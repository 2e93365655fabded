//! Polygon capture and bounding-box geometry.
//!
//! A polygon is captured through an explicit [`PolygonDraft`] session: start
//! drawing, push vertices as the operator clicks, then [`PolygonDraft::close`]
//! to obtain an immutable [`Polygon`]. Closure is implied, so the first and
//! last vertex need not coincide.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned rectangle covering a set of vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Min/max of each coordinate. `None` for an empty slice.
    pub fn from_vertices(vertices: &[LatLng]) -> Option<Self> {
        let first = vertices.first()?;
        let init = Self {
            min_lat: first.lat,
            min_lng: first.lng,
            max_lat: first.lat,
            max_lng: first.lng,
        };
        Some(vertices.iter().skip(1).fold(init, |b, v| Self {
            min_lat: b.min_lat.min(v.lat),
            min_lng: b.min_lng.min(v.lng),
            max_lat: b.max_lat.max(v.lat),
            max_lng: b.max_lng.max(v.lng),
        }))
    }

    /// WFS `BBOX` parameter: `minLng,minLat,maxLng,maxLat`.
    pub fn to_query_param(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lng, self.min_lat, self.max_lng, self.max_lat
        )
    }
}

/// An in-progress polygon drawing session.
#[derive(Debug, Default)]
pub struct PolygonDraft {
    vertices: Vec<LatLng>,
}

impl PolygonDraft {
    /// Begin a new drawing session with no vertices.
    pub fn start() -> Self {
        Self::default()
    }

    pub fn push(&mut self, vertex: LatLng) -> &mut Self {
        self.vertices.push(vertex);
        self
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Remove the most recently placed vertex.
    pub fn undo(&mut self) -> Option<LatLng> {
        self.vertices.pop()
    }

    /// Finish drawing. Fails if fewer than 3 vertices were placed.
    pub fn close(self) -> Result<Polygon, CoreError> {
        let bbox = match BoundingBox::from_vertices(&self.vertices) {
            Some(bbox) if self.vertices.len() >= 3 => bbox,
            _ => return Err(CoreError::TooFewVertices(self.vertices.len())),
        };
        Ok(Polygon {
            vertices: self.vertices,
            bbox,
        })
    }
}

/// A closed polygon with at least 3 vertices. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<LatLng>,
    bbox: BoundingBox,
}

impl Polygon {
    pub fn vertices(&self) -> &[LatLng] {
        &self.vertices
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}

impl TryFrom<Vec<LatLng>> for Polygon {
    type Error = CoreError;

    fn try_from(vertices: Vec<LatLng>) -> Result<Self, Self::Error> {
        let mut draft = PolygonDraft::start();
        for v in vertices {
            draft.push(v);
        }
        draft.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<LatLng> {
        vec![
            LatLng::new(37.39, 127.11),
            LatLng::new(37.41, 127.10),
            LatLng::new(37.40, 127.13),
        ]
    }

    #[test]
    fn bounding_box_covers_all_vertices() {
        let bbox = BoundingBox::from_vertices(&triangle()).unwrap();
        assert_eq!(bbox.min_lat, 37.39);
        assert_eq!(bbox.max_lat, 37.41);
        assert_eq!(bbox.min_lng, 127.10);
        assert_eq!(bbox.max_lng, 127.13);
    }

    #[test]
    fn bbox_param_is_lng_first() {
        let bbox = BoundingBox::from_vertices(&triangle()).unwrap();
        assert_eq!(bbox.to_query_param(), "127.1,37.39,127.13,37.41");
    }

    #[test]
    fn empty_vertices_have_no_bbox() {
        assert!(BoundingBox::from_vertices(&[]).is_none());
    }

    #[test]
    fn draft_closes_with_three_vertices() {
        let mut draft = PolygonDraft::start();
        for v in triangle() {
            draft.push(v);
        }
        let polygon = draft.close().unwrap();
        assert_eq!(polygon.vertices().len(), 3);
        assert_eq!(polygon.bounding_box().max_lng, 127.13);
    }

    #[test]
    fn draft_rejects_two_vertices() {
        let mut draft = PolygonDraft::start();
        draft
            .push(LatLng::new(37.0, 127.0))
            .push(LatLng::new(37.1, 127.1));
        assert_eq!(draft.close(), Err(CoreError::TooFewVertices(2)));
    }

    #[test]
    fn undo_removes_last_vertex() {
        let mut draft = PolygonDraft::start();
        for v in triangle() {
            draft.push(v);
        }
        assert_eq!(draft.undo(), Some(LatLng::new(37.40, 127.13)));
        assert_eq!(draft.len(), 2);
        assert!(draft.close().is_err());
    }

    #[test]
    fn polygon_from_json_vertices() {
        let json = r#"[{"lat":37.39,"lng":127.11},{"lat":37.41,"lng":127.10},{"lat":37.40,"lng":127.13}]"#;
        let vertices: Vec<LatLng> = serde_json::from_str(json).unwrap();
        let polygon = Polygon::try_from(vertices).unwrap();
        assert_eq!(polygon.vertices(), triangle().as_slice());
    }
}
