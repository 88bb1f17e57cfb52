use axum::Router;

pub mod identities;
pub mod system;
pub mod transfers;

/// Router for all banking endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/identities", identities::router())
        .nest("/transfers", transfers::router())
}
