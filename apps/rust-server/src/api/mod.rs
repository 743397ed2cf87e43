// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_roles, RoleGate, ADMIN_ROLE},
    state::AppState,
    storage::{StoredRole, UserProfile, UserView},
};

pub mod account;
pub mod admin;
pub mod health;
pub mod roles;
pub mod users;
pub mod validation;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/login", post(account::login))
        .route("/user/activate", put(account::activate_account))
        .route("/user/forgot-password", post(account::forgot_password))
        .route("/user/reset-password", put(account::reset_password))
        .route("/user-profile/{user_id}", get(users::get_user_profile))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let user_routes = Router::new()
        .route("/me", get(users::get_current_user))
        .route("/user/{user_id}", get(users::get_user))
        .route("/user/email", put(users::update_email))
        .route("/user/phone-number", put(users::update_phone_number))
        .route("/user/wallet", put(users::set_wallet))
        .route_layer(from_fn_with_state(
            RoleGate::authenticated(state.clone()),
            require_roles,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/user", post(admin::create_user))
        .route("/user/{user_id}", put(admin::update_user))
        .route("/users/{user_id}", delete(admin::delete_user))
        .route("/user/{user_id}/roles", post(admin::add_user_role))
        .route(
            "/user/{user_id}/roles/{role_name}",
            delete(admin::remove_user_role),
        )
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route(
            "/roles/{role_name}",
            put(roles::rename_role).delete(roles::delete_role),
        )
        .route_layer(from_fn_with_state(
            RoleGate::any_of(state.clone(), &[ADMIN_ROLE]),
            require_roles,
        ));

    let cors = cors_layer(&state.frontend_url);

    let v1_routes = public_routes
        .merge(user_routes)
        .merge(admin_routes)
        .with_state(state);

    Router::new()
        .nest("/api/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
}

/// CORS restricted to the frontend origin.
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]));

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!(frontend_url, error = %e, "Invalid frontend origin, CORS disabled");
            cors
        }
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        account::login,
        account::activate_account,
        account::forgot_password,
        account::reset_password,
        users::get_user_profile,
        users::get_current_user,
        users::get_user,
        users::update_email,
        users::update_phone_number,
        users::set_wallet,
        admin::list_users,
        admin::create_user,
        admin::update_user,
        admin::delete_user,
        admin::add_user_role,
        admin::remove_user_role,
        roles::list_roles,
        roles::create_role,
        roles::rename_role,
        roles::delete_role,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            UserView,
            StoredRole,
            account::LoginRequest,
            account::LoginResponse,
            account::TokenPasswordRequest,
            account::ForgotPasswordRequest,
            account::MessageResponse,
            UserProfile,
            users::UserProfileResponse,
            users::MeResponse,
            users::UpdateEmailRequest,
            users::UpdatePhoneNumberRequest,
            users::SetWalletRequest,
            admin::UserListResponse,
            admin::CreateUserRequest,
            admin::UpdateUserRequest,
            admin::AddRoleRequest,
            roles::RoleRequest,
            health::HealthResponse,
            health::ReadyResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Account", description = "Login, activation and password reset"),
        (name = "Users", description = "User profiles and the signed-in user's account"),
        (name = "Admin", description = "User management"),
        (name = "Roles", description = "Role catalogue"),
        (name = "Health", description = "Probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::notify::MailKind;
    use crate::state::testing::test_state;
    use crate::storage::NewUser;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn seed_active(state: &AppState, email: &str, password: &str, roles: &[&str]) -> u64 {
        let user = state
            .db
            .create_user(NewUser {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                phone_number: None,
                password_hash: "unset".to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            })
            .unwrap();
        state
            .db
            .activate_user(user.id, hash_password(password).unwrap())
            .unwrap();
        user.id
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &Router, email: &str, password: &str) -> String {
        let response = send(
            app,
            Method::POST,
            "/api/v1/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn liveness_is_public() {
        let (state, _mailer, _dir) = test_state();
        let app = router(state);

        let response = send(&app, Method::GET, "/api/v1/health/live", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn protected_route_requires_bearer_header() {
        let (state, _mailer, _dir) = test_state();
        let app = router(state);

        let response = send(&app, Method::GET, "/api/v1/me", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn login_then_me() {
        let (state, _mailer, _dir) = test_state();
        let id = seed_active(&state, "t@example.com", "Tender#Pass1", &["tender"]);
        let app = router(state);

        let token = login(&app, "t@example.com", "Tender#Pass1").await;
        let response = send(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["userId"], id);
        assert_eq!(body["roles"], json!(["tender"]));
    }

    #[tokio::test]
    async fn non_admin_is_forbidden_from_admin_routes() {
        let (state, _mailer, _dir) = test_state();
        seed_active(&state, "t@example.com", "Tender#Pass1", &["tender"]);
        let app = router(state);
        let token = login(&app, "t@example.com", "Tender#Pass1").await;

        let response = send(&app, Method::GET, "/api/v1/users", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await["error_code"],
            "insufficient_permissions"
        );

        let response = send(
            &app,
            Method::POST,
            "/api/v1/roles",
            Some(&token),
            Some(json!({ "name": "auditor" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_onboards_user_who_then_activates_and_logs_in() {
        let (state, mailer, _dir) = test_state();
        seed_active(&state, "root@example.com", "Admin#Pass1", &["admin"]);
        let app = router(state);
        let admin_token = login(&app, "root@example.com", "Admin#Pass1").await;

        let response = send(
            &app,
            Method::POST,
            "/api/v1/user",
            Some(&admin_token),
            Some(json!({
                "email": "new@example.com",
                "firstName": "New",
                "lastName": "Hire",
                "roles": ["expert"]
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let activation = mailer.last_token(MailKind::AccountActivation).unwrap();
        let response = send(
            &app,
            Method::PUT,
            "/api/v1/user/activate",
            None,
            Some(json!({ "token": activation, "password": "Expert#Pass1" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let token = login(&app, "new@example.com", "Expert#Pass1").await;
        let response = send(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
        assert_eq!(json_body(response).await["roles"], json!(["expert"]));
    }

    #[tokio::test]
    async fn role_change_invalidates_existing_session() {
        let (state, _mailer, _dir) = test_state();
        let id = seed_active(&state, "t@example.com", "Tender#Pass1", &["tender"]);
        let db = state.db.clone();
        let app = router(state);
        let token = login(&app, "t@example.com", "Tender#Pass1").await;

        db.remove_user_role(id, "tender").unwrap();

        let response = send(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "stale_roles");
    }

    #[tokio::test]
    async fn password_reset_flow_over_http() {
        let (state, mailer, _dir) = test_state();
        seed_active(&state, "t@example.com", "Tender#Pass1", &["tender"]);
        let app = router(state);

        let response = send(
            &app,
            Method::POST,
            "/api/v1/user/forgot-password",
            None,
            Some(json!({ "email": "t@example.com" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let reset = mailer.last_token(MailKind::PasswordReset).unwrap();

        let body = json!({ "token": reset, "password": "Brand#New2" });
        let response = send(
            &app,
            Method::PUT,
            "/api/v1/user/reset-password",
            None,
            Some(body.clone()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &app,
            Method::PUT,
            "/api/v1/user/reset-password",
            None,
            Some(body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        login(&app, "t@example.com", "Brand#New2").await;
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (state, _mailer, _dir) = test_state();
        let app = router(state);

        let response = send(&app, Method::GET, "/api-doc/openapi.json", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = json_body(response).await;
        assert!(doc["paths"]["/api/v1/login"].is_object());
    }

    #[tokio::test]
    async fn user_profile_is_public() {
        let (state, _mailer, _dir) = test_state();
        let id = seed_active(&state, "t@example.com", "Tender#Pass1", &["tender"]);
        let app = router(state);

        let uri = format!("/api/v1/user-profile/{id}");
        let response = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["user"]["email"], "t@example.com");

        let response = send(&app, Method::GET, "/api/v1/user-profile/999", None, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
