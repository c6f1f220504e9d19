pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::employees::handlers as employees;
use crate::images::handlers as images;
use crate::prediction::handlers as prediction;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(health::home_handler))
        .route("/health", get(health::health_handler))
        .route("/data", get(employees::handle_list_employees))
        .route("/register", post(auth::handle_register))
        .route("/login", post(auth::handle_login))
        .route("/predict", post(prediction::handle_predict))
        .route(
            "/upload-image",
            post(images::handle_upload_image)
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route("/images/:filename", get(images::handle_get_image));

    if state.config.expose_debug_routes {
        router = router.route(
            "/test-image-path/:filename",
            get(images::handle_inspect_image_path),
        );
    }

    router.with_state(state)
}
