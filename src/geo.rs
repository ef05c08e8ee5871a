//! One-shot device location.
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::model::GeoPoint;

#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<GeoPoint>;
}

/// Position known up front (e.g. from the command line), or a denied request.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPosition(pub Option<GeoPoint>);

impl FixedPosition {
    /// Both coordinates or nothing; out-of-range values count as unavailable.
    pub fn from_coords(lat: Option<f64>, lng: Option<f64>) -> Self {
        match (lat, lng) {
            (Some(lat), Some(lng))
                if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) =>
            {
                Self(Some(GeoPoint { lat, lng }))
            }
            _ => Self(None),
        }
    }
}

#[async_trait]
impl Geolocator for FixedPosition {
    async fn current_position(&self) -> Result<GeoPoint> {
        self.0.ok_or_else(|| anyhow!("location unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_position() {
        let p = FixedPosition::from_coords(Some(47.2), Some(39.7));
        assert_eq!(p.current_position().await.unwrap(), GeoPoint { lat: 47.2, lng: 39.7 });
        assert!(FixedPosition::from_coords(Some(47.2), None)
            .current_position()
            .await
            .is_err());
        assert!(FixedPosition::from_coords(Some(120.0), Some(0.0)).0.is_none());
    }
}
