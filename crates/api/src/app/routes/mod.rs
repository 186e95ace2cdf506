use axum::Router;

pub mod accounts;
pub mod listings;
pub mod system;
pub mod webhooks;

pub fn router() -> Router {
    Router::new()
        .nest("/webhooks", webhooks::router())
        .nest("/accounts", accounts::router())
        .nest("/listings", listings::router())
}
