use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use auth_cell::SessionEvents;
use doctor_cell::router::doctor_routes;
use medical_records_cell::router::medical_records_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>, events: SessionEvents) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/auth", auth_routes(state.clone(), events))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/records", medical_records_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    use shared_utils::test_utils::TestConfig;

    fn app() -> Router {
        create_router(TestConfig::default().to_arc(), SessionEvents::default())
    }

    #[tokio::test]
    async fn root_reports_running() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cells_are_mounted_behind_auth() {
        for uri in ["/appointments/mine", "/records/patients/a7b85492-b672-43ad-989a-1acef574a942"] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn pricing_quote_is_public() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/doctors/pricing/quote?specialization=Dentist&years_of_experience=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
