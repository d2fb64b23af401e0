use axum::Json;
use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiSpec;

use super::dto::ApiDoc;

pub async fn api_docs() -> Json<OpenApiSpec> {
    Json(ApiDoc::openapi())
}
