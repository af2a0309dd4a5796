//! Serve the OpenAPI docs for every route group under one Swagger UI

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::basic::BasicApiDocs;
use super::management::ManagementApiDocs;
use super::user::UserApiDocs;
use crate::utils::AppState;

/// Add the docs routes to our router
///
/// # Arguments
///
/// * `router` - The router to add routes too
pub fn mount(router: Router<AppState>) -> Router<AppState> {
    router.merge(
        SwaggerUi::new("/api/docs/swagger-ui")
            .url("/api/openapi.json", BasicApiDocs::openapi())
            .url("/api/user/openapi.json", UserApiDocs::openapi())
            .url("/api/management/openapi.json", ManagementApiDocs::openapi()),
    )
}
