use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::{Router, middleware};
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::role::require_admin;
use crate::modules::attendance::router::init_attendance_router;
use crate::modules::auth::router::init_auth_router;
use crate::modules::imports::router::init_imports_router;
use crate::modules::institutions::router::init_institution_router;
use crate::modules::invites::router::init_invites_router;
use crate::modules::sections::router::init_sections_router;
use crate::modules::users::router::init_users_router;
use crate::state::AppState;

pub fn init_router(state: AppState) -> Router {
    let rate_limit = &state.rate_limit_config;

    let mut auth_router = init_auth_router();
    if rate_limit.enabled
        && let Some(config) = rate_limit.auth_governor_config()
    {
        auth_router = auth_router.layer(GovernorLayer::new(Arc::new(config)));
    }

    let mut api = Router::new()
        .nest("/auth", auth_router)
        .nest("/users", init_users_router())
        .nest("/institution", init_institution_router())
        .nest(
            "/invites",
            init_invites_router()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_admin)),
        )
        .nest("/sections", init_sections_router())
        .nest("/attendance", init_attendance_router())
        .nest(
            "/imports",
            init_imports_router(state.import_config.max_upload_bytes)
                .route_layer(middleware::from_fn_with_state(state.clone(), require_admin)),
        );

    if rate_limit.enabled
        && let Some(config) = rate_limit.general_governor_config()
    {
        api = api.layer(GovernorLayer::new(Arc::new(config)));
    } else if rate_limit.enabled {
        warn!("Invalid general rate limit settings; limiting is off");
    }

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest("/api", api)
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
