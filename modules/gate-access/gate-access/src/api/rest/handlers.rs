//! REST handlers for gate access.
//!
//! Handlers are thin: parse input, call a domain service, map errors to Problem.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query};
use axum::http::{StatusCode, Uri, header};
use axum::response::IntoResponse;
use gate_access_sdk::{CallContext, ListKind};
use serde::Serialize;
use uuid::Uuid;

use super::dto::{
    AccessDecisionDto, AuditQuery, AuditRecordDto, CheckAccessRequest, CreateEntitlementRequest,
    CreateIdentityRequest, CreateListEntryRequest, CreateVehicleRequest, EntitlementDto,
    HealthResponse, IdentityDto, LinkVehicleRequest, ListEntryDto, PageQuery,
    RevokeEntitlementRequest, SetActiveRequest, SweepResponse, UpdateListEntryRequest, VehicleDto,
};
use super::error::ApiResult;
use crate::domain::service::Service;

/// 201 with a `Location` pointing at the new resource.
fn created_json<T: Serialize>(body: T, uri: &Uri, id: Uuid) -> impl IntoResponse + use<T> {
    let location = format!("{}/{id}", uri.path().trim_end_matches('/'));
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
}

// === Health ===

/// GET /gate/v1/health
pub async fn health(Extension(svc): Extension<Arc<Service>>) -> Json<HealthResponse> {
    let recognizer_up = svc.engine.recognizer_healthy(&CallContext::new()).await;
    Json(HealthResponse {
        status: if recognizer_up { "ok" } else { "degraded" }.to_owned(),
        recognizer: if recognizer_up { "up" } else { "down" }.to_owned(),
    })
}

// === Access ===

/// POST /gate/v1/access/check
#[tracing::instrument(skip_all)]
pub async fn check_access(
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CheckAccessRequest>, JsonRejection>,
) -> ApiResult<Json<AccessDecisionDto>> {
    let Json(req) = payload?;
    let request = req.into_request()?;
    let decision = svc.engine.check_access(&CallContext::new(), request).await?;
    Ok(Json(AccessDecisionDto::from(decision)))
}

/// GET /gate/v1/access/logs
pub async fn list_access_logs(
    Extension(svc): Extension<Arc<Service>>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<AuditRecordDto>>> {
    let Query(query) = query?;
    let (filter, params) = query.into_filter()?;
    let records = svc
        .engine
        .list_audit(&CallContext::new(), filter, params)
        .await?;
    Ok(Json(records.into_iter().map(AuditRecordDto::from).collect()))
}

// === Priority lists ===
//
// One set of handlers per operation; the router binds the list kind.

pub async fn create_list_entry(
    kind: ListKind,
    uri: Uri,
    svc: Arc<Service>,
    payload: Result<Json<CreateListEntryRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let entry = svc
        .lists
        .create(&CallContext::new(), kind, req.into())
        .await?;
    let id = entry.id;
    Ok(created_json(ListEntryDto::from(entry), &uri, id))
}

pub async fn list_list_entries(
    kind: ListKind,
    svc: Arc<Service>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ListEntryDto>>> {
    let Query(query) = query?;
    let entries = svc
        .lists
        .list(&CallContext::new(), kind, query.into())
        .await?;
    Ok(Json(entries.into_iter().map(ListEntryDto::from).collect()))
}

pub async fn get_list_entry(
    kind: ListKind,
    svc: Arc<Service>,
    id: Uuid,
) -> ApiResult<Json<ListEntryDto>> {
    let entry = svc.lists.get(&CallContext::new(), kind, id).await?;
    Ok(Json(ListEntryDto::from(entry)))
}

pub async fn update_list_entry(
    kind: ListKind,
    svc: Arc<Service>,
    id: Uuid,
    payload: Result<Json<UpdateListEntryRequest>, JsonRejection>,
) -> ApiResult<Json<ListEntryDto>> {
    let Json(req) = payload?;
    let entry = svc
        .lists
        .update(&CallContext::new(), kind, id, req.into())
        .await?;
    Ok(Json(ListEntryDto::from(entry)))
}

pub async fn delete_list_entry(
    kind: ListKind,
    svc: Arc<Service>,
    id: Uuid,
) -> ApiResult<impl IntoResponse> {
    svc.lists.delete(&CallContext::new(), kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn sweep_list(kind: ListKind, svc: Arc<Service>) -> ApiResult<Json<SweepResponse>> {
    let removed = svc.lists.sweep_expired(&CallContext::new(), kind).await?;
    Ok(Json(SweepResponse { removed }))
}

// === Entitlements ===

/// POST /gate/v1/entitlements
#[tracing::instrument(skip_all)]
pub async fn create_entitlement(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CreateEntitlementRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let new = req.into_new()?;
    let vehicle_ids = new.vehicle_ids.clone();
    let entitlement = svc.entitlements.create(&CallContext::new(), new).await?;
    let id = entitlement.id;
    Ok(created_json(
        EntitlementDto::from(entitlement).with_vehicles(vehicle_ids),
        &uri,
        id,
    ))
}

/// GET /gate/v1/entitlements/{id}
pub async fn get_entitlement(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EntitlementDto>> {
    let ctx = CallContext::new();
    let entitlement = svc.entitlements.get(&ctx, id).await?;
    let vehicle_ids = svc.entitlements.vehicle_ids(&ctx, id).await?;
    Ok(Json(
        EntitlementDto::from(entitlement).with_vehicles(vehicle_ids),
    ))
}

/// POST /gate/v1/entitlements/{id}/revoke
#[tracing::instrument(skip_all, fields(entitlement_id = %id))]
pub async fn revoke_entitlement(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<RevokeEntitlementRequest>, JsonRejection>,
) -> ApiResult<Json<EntitlementDto>> {
    let Json(req) = payload?;
    let revoked = svc
        .entitlements
        .revoke(&CallContext::new(), id, req.revoked_by, &req.reason)
        .await?;
    Ok(Json(EntitlementDto::from(revoked)))
}

/// POST /gate/v1/entitlements/{id}/vehicles
pub async fn link_vehicle(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<LinkVehicleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    svc.entitlements
        .add_vehicle(&CallContext::new(), id, req.vehicle_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /gate/v1/entitlements/{id}/vehicles/{vehicle_id}
pub async fn unlink_vehicle(
    Extension(svc): Extension<Arc<Service>>,
    Path((id, vehicle_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    svc.entitlements
        .remove_vehicle(&CallContext::new(), id, vehicle_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /gate/v1/entitlements/expired
pub async fn list_expired_entitlements(
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Vec<EntitlementDto>>> {
    let expired = svc
        .entitlements
        .list_expired_temporary(&CallContext::new())
        .await?;
    Ok(Json(expired.into_iter().map(EntitlementDto::from).collect()))
}

// === Registry ===

/// POST /gate/v1/identities
pub async fn create_identity(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CreateIdentityRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let identity = svc
        .registry
        .register_identity(&CallContext::new(), req.into())
        .await?;
    let id = identity.id;
    Ok(created_json(IdentityDto::from(identity), &uri, id))
}

/// GET /gate/v1/identities/{id}
pub async fn get_identity(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<IdentityDto>> {
    let identity = svc.registry.get_identity(&CallContext::new(), id).await?;
    Ok(Json(IdentityDto::from(identity)))
}

/// PUT /gate/v1/identities/{id}/active
pub async fn set_identity_active(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<SetActiveRequest>, JsonRejection>,
) -> ApiResult<Json<IdentityDto>> {
    let Json(req) = payload?;
    let identity = svc
        .registry
        .set_identity_active(&CallContext::new(), id, req.active)
        .await?;
    Ok(Json(IdentityDto::from(identity)))
}

/// GET /gate/v1/identities/{id}/vehicles
pub async fn list_identity_vehicles(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<VehicleDto>>> {
    let vehicles = svc.registry.list_vehicles(&CallContext::new(), id).await?;
    Ok(Json(vehicles.into_iter().map(VehicleDto::from).collect()))
}

/// GET /gate/v1/identities/{id}/entitlements
pub async fn list_identity_entitlements(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<EntitlementDto>>> {
    let entitlements = svc
        .entitlements
        .list_by_identity(&CallContext::new(), id)
        .await?;
    Ok(Json(
        entitlements.into_iter().map(EntitlementDto::from).collect(),
    ))
}

/// POST /gate/v1/vehicles
pub async fn create_vehicle(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CreateVehicleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let vehicle = svc
        .registry
        .register_vehicle(&CallContext::new(), req.into())
        .await?;
    let id = vehicle.id;
    Ok(created_json(VehicleDto::from(vehicle), &uri, id))
}

/// GET /gate/v1/vehicles/{id}
pub async fn get_vehicle(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<VehicleDto>> {
    let vehicle = svc.registry.get_vehicle(&CallContext::new(), id).await?;
    Ok(Json(VehicleDto::from(vehicle)))
}

/// PUT /gate/v1/vehicles/{id}/active
pub async fn set_vehicle_active(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<SetActiveRequest>, JsonRejection>,
) -> ApiResult<Json<VehicleDto>> {
    let Json(req) = payload?;
    let vehicle = svc
        .registry
        .set_vehicle_active(&CallContext::new(), id, req.active)
        .await?;
    Ok(Json(VehicleDto::from(vehicle)))
}
