use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;
use crate::scope;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::auth::login,
        routes::auth::me,
        routes::auth::logout,
        routes::users::list_users,
        routes::users::create_user,
        routes::users::view_user,
        routes::users::update_user,
        routes::users::delete_user,
        routes::tasks::list_tasks,
        routes::tasks::create_task,
        routes::tasks::view_task,
        routes::tasks::update_task,
        routes::tasks::delete_task,
    ),
    components(
        schemas(
            models::role::Role,
            models::role::Status,
            models::user::User,
            models::user::AuthResponse,
            models::user::LoginRequest,
            models::user::CreateUserRequest,
            models::user::UpdateUserRequest,
            models::task::Task,
            models::task::TaskCreateRequest,
            models::task::TaskUpdateRequest,
            scope::TaskPage,
            scope::UserPage,
            routes::health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "User management, gated by the role hierarchy"),
        (name = "Tasks", description = "Task management and scoped listings"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn swagger_routes() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi()))
}
