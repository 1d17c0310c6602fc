//! REST route registration for gate access.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::Uri;
use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router};
use gate_access_sdk::ListKind;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::dto::{CreateListEntryRequest, PageQuery, UpdateListEntryRequest};
use super::handlers;
use crate::domain::service::Service;

pub const BASE_PATH: &str = "/gate/v1";

fn path(suffix: &str) -> String {
    format!("{BASE_PATH}{suffix}")
}

/// Allow-list or deny-list routes, with the list kind bound per router.
fn priority_list_routes(router: Router, kind: ListKind, segment: &str) -> Router {
    let collection = path(&format!("/{segment}"));
    let item = format!("{collection}/{{id}}");
    let sweep = format!("{collection}/sweep");

    router
        .route(
            &collection,
            post(
                move |uri: Uri,
                      Extension(svc): Extension<Arc<Service>>,
                      payload: Result<Json<CreateListEntryRequest>, JsonRejection>| {
                    handlers::create_list_entry(kind, uri, svc, payload)
                },
            )
            .get(
                move |Extension(svc): Extension<Arc<Service>>,
                      query: Result<Query<PageQuery>, QueryRejection>| {
                    handlers::list_list_entries(kind, svc, query)
                },
            ),
        )
        .route(
            &item,
            get(
                move |Extension(svc): Extension<Arc<Service>>, Path(id): Path<Uuid>| {
                    handlers::get_list_entry(kind, svc, id)
                },
            )
            .patch(
                move |Extension(svc): Extension<Arc<Service>>,
                      Path(id): Path<Uuid>,
                      payload: Result<Json<UpdateListEntryRequest>, JsonRejection>| {
                    handlers::update_list_entry(kind, svc, id, payload)
                },
            )
            .delete(
                move |Extension(svc): Extension<Arc<Service>>, Path(id): Path<Uuid>| {
                    handlers::delete_list_entry(kind, svc, id)
                },
            ),
        )
        .route(
            &sweep,
            post(move |Extension(svc): Extension<Arc<Service>>| {
                handlers::sweep_list(kind, svc)
            }),
        )
}

/// All gate access routes under [`BASE_PATH`].
pub fn router(service: Arc<Service>) -> Router {
    let router = Router::new()
        .route(&path("/health"), get(handlers::health))
        .route(&path("/access/check"), post(handlers::check_access))
        .route(&path("/access/logs"), get(handlers::list_access_logs))
        .route(&path("/entitlements"), post(handlers::create_entitlement))
        .route(
            &path("/entitlements/expired"),
            get(handlers::list_expired_entitlements),
        )
        .route(&path("/entitlements/{id}"), get(handlers::get_entitlement))
        .route(
            &path("/entitlements/{id}/revoke"),
            post(handlers::revoke_entitlement),
        )
        .route(
            &path("/entitlements/{id}/vehicles"),
            post(handlers::link_vehicle),
        )
        .route(
            &path("/entitlements/{id}/vehicles/{vehicle_id}"),
            delete(handlers::unlink_vehicle),
        )
        .route(&path("/identities"), post(handlers::create_identity))
        .route(&path("/identities/{id}"), get(handlers::get_identity))
        .route(
            &path("/identities/{id}/active"),
            put(handlers::set_identity_active),
        )
        .route(
            &path("/identities/{id}/vehicles"),
            get(handlers::list_identity_vehicles),
        )
        .route(
            &path("/identities/{id}/entitlements"),
            get(handlers::list_identity_entitlements),
        )
        .route(&path("/vehicles"), post(handlers::create_vehicle))
        .route(&path("/vehicles/{id}"), get(handlers::get_vehicle))
        .route(
            &path("/vehicles/{id}/active"),
            put(handlers::set_vehicle_active),
        );

    let router = priority_list_routes(router, ListKind::Allow, "allow-list");
    let router = priority_list_routes(router, ListKind::Deny, "deny-list");

    router
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
}
