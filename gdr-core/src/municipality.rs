use crate::{coordinate::Coordinate, error::DataQualityError};
use geo::{Centroid, MultiPolygon};

/// A municipality with its boundary and centroid.
///
/// The boundary is a multipolygon in planar lon/lat (`x` is longitude, `y`
/// latitude). Multi-part municipalities have several polygons; enclaves are
/// interior rings. The centroid is computed once at construction.
#[derive(Debug, Clone)]
pub struct Municipality {
    id: String,
    name: String,
    boundary: MultiPolygon<f64>,
    centroid: Coordinate,
}

impl Municipality {
    /// Build a municipality. A supplied centroid overrides the area-weighted
    /// one.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        boundary: MultiPolygon<f64>,
        centroid: Option<Coordinate>,
    ) -> Result<Self, DataQualityError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DataQualityError::EmptyIdentifier);
        }
        // rings are closed, so a triangle has four positions
        if !boundary.iter().any(|polygon| polygon.exterior().0.len() >= 4) {
            return Err(DataQualityError::EmptyBoundary { id });
        }
        for polygon in boundary.iter() {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                for position in ring.coords() {
                    Coordinate::new(position.y, position.x).validate(&id)?;
                }
            }
        }
        let centroid = match centroid {
            Some(c) => {
                c.validate(&id)?;
                c
            }
            None => match boundary.centroid() {
                Some(point) => Coordinate::new(point.y(), point.x()),
                None => return Err(DataQualityError::EmptyBoundary { id }),
            },
        };
        Ok(Municipality {
            id,
            name: name.into(),
            boundary,
            centroid,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn boundary(&self) -> &MultiPolygon<f64> {
        &self.boundary
    }

    pub fn centroid(&self) -> Coordinate {
        self.centroid
    }
}
