use crate::types::{AdminBoundary, AdminLevel, Detection, FlashError, FlashResult};
use geo::{BoundingRect, Contains, Intersects, MultiPolygon, Point};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Point-to-polygon relationship used by the spatial joins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpatialPredicate {
    /// Point lies inside or on the boundary
    #[default]
    Intersects,
    /// Point lies strictly inside
    Contains,
}

impl SpatialPredicate {
    pub fn evaluate(&self, polygon: &MultiPolygon<f64>, point: &Point<f64>) -> bool {
        match self {
            SpatialPredicate::Intersects => polygon.intersects(point),
            SpatialPredicate::Contains => polygon.contains(point),
        }
    }
}

type BoundaryEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// One level of administrative reference polygons with an R-tree over their
/// bounding boxes
pub struct BoundaryLayer {
    level: AdminLevel,
    boundaries: Vec<Arc<AdminBoundary>>,
    index: RTree<BoundaryEnvelope>,
}

impl BoundaryLayer {
    /// Build a layer; every boundary must belong to `level` and carry geometry
    pub fn new(level: AdminLevel, boundaries: Vec<AdminBoundary>) -> FlashResult<Self> {
        let mut envelopes = Vec::with_capacity(boundaries.len());

        for (i, boundary) in boundaries.iter().enumerate() {
            if boundary.level != level {
                return Err(FlashError::InvalidInput(format!(
                    "Boundary {} ({}) is {} but layer is {}",
                    i, boundary.pcode, boundary.level, level
                )));
            }
            let bbox = boundary.geometry.bounding_rect().ok_or_else(|| {
                FlashError::InvalidInput(format!(
                    "Boundary {} ({}) has empty geometry",
                    i, boundary.pcode
                ))
            })?;
            let rect = Rectangle::from_corners(
                [bbox.min().x, bbox.min().y],
                [bbox.max().x, bbox.max().y],
            );
            envelopes.push(GeomWithData::new(rect, i));
        }

        log::debug!("Indexed {} {} boundaries", boundaries.len(), level);

        Ok(Self {
            level,
            boundaries: boundaries.into_iter().map(Arc::new).collect(),
            index: RTree::bulk_load(envelopes),
        })
    }

    pub fn level(&self) -> AdminLevel {
        self.level
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn boundaries(&self) -> &[Arc<AdminBoundary>] {
        &self.boundaries
    }

    /// Boundaries that satisfy `predicate` for `point`, in layer order
    #[cfg(test)]
    fn matches(&self, point: &Point<f64>, predicate: SpatialPredicate) -> Vec<&Arc<AdminBoundary>> {
        let mut hits: Vec<usize> = self
            .index
            .locate_all_at_point(&[point.x(), point.y()])
            .map(|envelope| envelope.data)
            .filter(|&i| predicate.evaluate(&self.boundaries[i].geometry, point))
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|i| &self.boundaries[i]).collect()
    }

    /// Whether any boundary in the layer covers `point`
    pub fn covers(&self, point: &Point<f64>, predicate: SpatialPredicate) -> bool {
        self.index
            .locate_all_at_point(&[point.x(), point.y()])
            .any(|envelope| predicate.evaluate(&self.boundaries[envelope.data].geometry, point))
    }
}

impl std::fmt::Debug for BoundaryLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryLayer")
            .field("level", &self.level)
            .field("boundaries", &self.boundaries.len())
            .finish()
    }
}

/// Reference boundaries, finest level first
#[derive(Debug)]
pub struct AdminHierarchy {
    pub urban: BoundaryLayer,
    pub regional: BoundaryLayer,
    pub national: Option<BoundaryLayer>,
}

impl AdminHierarchy {
    pub fn new(urban: BoundaryLayer, regional: BoundaryLayer) -> FlashResult<Self> {
        if urban.level() != AdminLevel::Urban || regional.level() != AdminLevel::Regional {
            return Err(FlashError::InvalidInput(format!(
                "Hierarchy expects urban/regional layers, got {}/{}",
                urban.level(),
                regional.level()
            )));
        }
        Ok(Self {
            urban,
            regional,
            national: None,
        })
    }

    pub fn with_national(mut self, national: BoundaryLayer) -> FlashResult<Self> {
        if national.level() != AdminLevel::National {
            return Err(FlashError::InvalidInput(format!(
                "Expected national layer, got {}",
                national.level()
            )));
        }
        self.national = Some(national);
        Ok(self)
    }
}

/// Keep only the detections whose reported center falls inside `region`
pub fn restrict_to_region(
    detections: Vec<Detection>,
    region: &BoundaryLayer,
    predicate: SpatialPredicate,
) -> Vec<Detection> {
    let total = detections.len();
    let kept: Vec<Detection> = detections
        .into_iter()
        .filter(|d| region.covers(&d.center(), predicate))
        .collect();

    log::info!(
        "Intersecting detections with {} geometry: kept {}/{}",
        region.level(),
        kept.len(),
        total
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn square(min: f64, max: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: min, y: min),
            (x: max, y: min),
            (x: max, y: max),
            (x: min, y: max)
        ]])
    }

    fn boundary(pcode: &str, level: AdminLevel, min: f64, max: f64) -> AdminBoundary {
        AdminBoundary {
            name_en: pcode.to_string(),
            name_ua: pcode.to_string(),
            pcode: pcode.to_string(),
            level,
            geometry: square(min, max),
        }
    }

    #[test]
    fn test_layer_matches_by_predicate() {
        let layer = BoundaryLayer::new(
            AdminLevel::Urban,
            vec![
                boundary("UA01", AdminLevel::Urban, 0.0, 1.0),
                boundary("UA02", AdminLevel::Urban, 2.0, 3.0),
            ],
        )
        .unwrap();

        let inside = Point::new(2.5, 2.5);
        let hits = layer.matches(&inside, SpatialPredicate::Intersects);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pcode, "UA02");

        // On the edge: intersects but is not contained
        let edge = Point::new(1.0, 0.5);
        assert_eq!(layer.matches(&edge, SpatialPredicate::Intersects).len(), 1);
        assert!(layer.matches(&edge, SpatialPredicate::Contains).is_empty());

        assert!(!layer.covers(&Point::new(1.5, 1.5), SpatialPredicate::Intersects));
    }

    #[test]
    fn test_layer_rejects_mixed_levels() {
        let result = BoundaryLayer::new(
            AdminLevel::Urban,
            vec![boundary("UA01", AdminLevel::Regional, 0.0, 1.0)],
        );
        assert!(matches!(result, Err(FlashError::InvalidInput(_))));
    }

    #[test]
    fn test_layer_rejects_empty_geometry() {
        let mut b = boundary("UA01", AdminLevel::Urban, 0.0, 1.0);
        b.geometry = MultiPolygon::new(Vec::new());
        assert!(BoundaryLayer::new(AdminLevel::Urban, vec![b]).is_err());
    }

    #[test]
    fn test_hierarchy_checks_levels() {
        let urban = BoundaryLayer::new(AdminLevel::Urban, Vec::new()).unwrap();
        let regional = BoundaryLayer::new(AdminLevel::Regional, Vec::new()).unwrap();
        let hierarchy = AdminHierarchy::new(urban, regional).unwrap();

        let wrong = BoundaryLayer::new(AdminLevel::Urban, Vec::new()).unwrap();
        assert!(hierarchy.with_national(wrong).is_err());

        let urban = BoundaryLayer::new(AdminLevel::Regional, Vec::new()).unwrap();
        let regional = BoundaryLayer::new(AdminLevel::Regional, Vec::new()).unwrap();
        assert!(AdminHierarchy::new(urban, regional).is_err());
    }
}
