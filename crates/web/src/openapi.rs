use utoipa::OpenApi;

use crate::features::{admin, analyses, auth};

#[derive(OpenApi)]
#[openapi(
    paths(
        analyses::handlers::list_analyses,
        analyses::handlers::create_analysis,
        analyses::handlers::get_analysis,
        analyses::handlers::get_analysis_status,
        analyses::handlers::get_opponents,
        auth::handlers::register,
        auth::handlers::login,
        auth::handlers::logout,
        auth::handlers::profile,
        admin::handlers::mark_paid,
    ),
    components(
        schemas(
            storage::dto::analysis::CreateAnalysisRequest,
            storage::dto::analysis::CreateAnalysisResponse,
            storage::dto::analysis::AnalysisResponse,
            storage::dto::analysis::AnalysisStatusResponse,
            storage::dto::analysis::OpponentsResponse,
            storage::dto::analysis::OpponentRatingResponse,
            storage::dto::analysis::MarkPaidRequest,
            storage::dto::auth::RegisterRequest,
            storage::dto::auth::LoginRequest,
            storage::dto::auth::UserProfile,
            storage::dto::auth::AuthResponse,
            storage::dto::auth::MessageResponse,
            storage::models::GameMode,
            storage::models::AnalysisStatus,
        )
    ),
    tags(
        (name = "analyses", description = "Rating evolution analyses of the signed-in user"),
        (name = "auth", description = "Accounts and session tokens"),
        (name = "admin", description = "Operator endpoints guarded by API keys"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("Session token")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            );
        }
    }
}
