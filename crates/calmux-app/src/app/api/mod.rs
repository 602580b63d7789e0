mod feeds;
mod healthcheck;

use salvo::Router;

use crate::middleware::auth::AuthMiddleware;

pub use calmux_core::constants::{API_ROUTE_COMPONENT, API_ROUTE_PREFIX};

/// ## Summary
/// Constructs the API router: every feed endpoint behind the auth middleware.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .hoop(AuthMiddleware)
        .push(Router::with_path("app").push(healthcheck::routes()))
        .push(feeds::routes())
}
