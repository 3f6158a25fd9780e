use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{Medicine, Pharmacy},
    services::catalog::{NearbyQuery, PharmacyListing},
};

/// Public, read-only catalog routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(list_pharmacies))
        .routes(utoipa_axum::routes!(get_pharmacy))
        .routes(utoipa_axum::routes!(list_pharmacy_medicines))
        .routes(utoipa_axum::routes!(get_medicine))
        .routes(utoipa_axum::routes!(get_alternatives))
}

/// List pharmacies, optionally only those near a location.
#[utoipa::path(
    get,
    path = "/pharmacies",
    tags = ["Catalog"],
    params(NearbyQuery),
    responses(
        (status = 200, description = "List pharmacies", body = StdResponse<Vec<PharmacyListing>, String>)
    )
)]
async fn list_pharmacies(
    Query(query): Query<NearbyQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let pharmacies = state.catalog.list_pharmacies(query).await?;

    Ok(StdResponse {
        data: Some(pharmacies),
        message: Some("Get pharmacies successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/pharmacies/{id}",
    tags = ["Catalog"],
    params(
        ("id" = Uuid, Path, description = "Pharmacy ID to fetch")
    ),
    responses(
        (status = 200, description = "Get pharmacy successfully", body = StdResponse<Pharmacy, String>),
        (status = 404, description = "Pharmacy not found")
    )
)]
async fn get_pharmacy(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let pharmacy = state.catalog.get_pharmacy(id).await?;

    Ok(StdResponse {
        data: Some(pharmacy),
        message: Some("Get pharmacy successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/pharmacies/{id}/medicines",
    tags = ["Catalog"],
    params(
        ("id" = Uuid, Path, description = "Pharmacy whose medicines to list")
    ),
    responses(
        (status = 200, description = "List medicines of a pharmacy", body = StdResponse<Vec<Medicine>, String>)
    )
)]
async fn list_pharmacy_medicines(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let medicines = state.catalog.list_medicines(id).await?;

    Ok(StdResponse {
        data: Some(medicines),
        message: Some("Get medicines successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/medicines/{id}",
    tags = ["Catalog"],
    params(
        ("id" = Uuid, Path, description = "Medicine ID to fetch")
    ),
    responses(
        (status = 200, description = "Get medicine successfully", body = StdResponse<Medicine, String>),
        (status = 404, description = "Medicine not found")
    )
)]
async fn get_medicine(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let medicine = state.catalog.get_medicine(id).await?;

    Ok(StdResponse {
        data: Some(medicine),
        message: Some("Get medicine successfully"),
    })
}

/// Medicines of the same category, at most ten.
#[utoipa::path(
    get,
    path = "/medicines/{id}/alternatives",
    tags = ["Catalog"],
    params(
        ("id" = Uuid, Path, description = "Medicine to find alternatives for")
    ),
    responses(
        (status = 200, description = "List alternatives", body = StdResponse<Vec<Medicine>, String>),
        (status = 404, description = "Medicine not found")
    )
)]
async fn get_alternatives(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let alternatives = state.catalog.alternatives(id).await?;

    Ok(StdResponse {
        data: Some(alternatives),
        message: Some("Get alternatives successfully"),
    })
}
