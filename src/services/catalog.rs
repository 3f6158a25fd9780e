use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    app_error::AppError,
    domain::{Medicine, Pharmacy},
    repositories::CatalogRepository,
};

const EARTH_RADIUS_KM: f64 = 6371.0;
const DEFAULT_RADIUS_KM: f64 = 10.0;
const ALTERNATIVES_LIMIT: i64 = 10;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NearbyQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Defaults to 10 km.
    pub radius_km: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PharmacyListing {
    #[serde(flatten)]
    pub pharmacy: Pharmacy,
    /// Kilometres from the requested location, two decimals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// All pharmacies, or only those within the radius of the given location
    /// sorted nearest first. Pharmacies without coordinates never match a
    /// location search.
    pub async fn list_pharmacies(
        &self,
        query: NearbyQuery,
    ) -> Result<Vec<PharmacyListing>, AppError> {
        let pharmacies = self.catalog.list_pharmacies().await?;

        let (Some(latitude), Some(longitude)) = (query.latitude, query.longitude) else {
            return Ok(pharmacies
                .into_iter()
                .map(|pharmacy| PharmacyListing {
                    pharmacy,
                    distance: None,
                })
                .collect());
        };
        let radius = query.radius_km.unwrap_or(DEFAULT_RADIUS_KM);

        let mut nearby: Vec<PharmacyListing> = pharmacies
            .into_iter()
            .filter_map(|pharmacy| {
                let distance = haversine_km(
                    latitude,
                    longitude,
                    pharmacy.latitude?,
                    pharmacy.longitude?,
                );
                (distance <= radius).then(|| PharmacyListing {
                    pharmacy,
                    distance: Some(round2(distance)),
                })
            })
            .collect();

        nearby.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(nearby)
    }

    pub async fn get_pharmacy(&self, id: Uuid) -> Result<Pharmacy, AppError> {
        self.catalog
            .find_pharmacy(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pharmacy not found".to_string()))
    }

    pub async fn list_medicines(&self, pharmacy_id: Uuid) -> Result<Vec<Medicine>, AppError> {
        Ok(self.catalog.list_medicines(pharmacy_id).await?)
    }

    pub async fn get_medicine(&self, id: Uuid) -> Result<Medicine, AppError> {
        self.catalog
            .find_medicine(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Medicine not found".to_string()))
    }

    /// Other medicines of the same category.
    pub async fn alternatives(&self, medicine_id: Uuid) -> Result<Vec<Medicine>, AppError> {
        let medicine = self.get_medicine(medicine_id).await?;

        Ok(self
            .catalog
            .find_medicines_by_category(&medicine.category, medicine.id, ALTERNATIVES_LIMIT)
            .await?)
    }
}
