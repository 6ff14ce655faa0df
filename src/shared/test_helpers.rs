use crate::features::auth::model::AuthenticatedUser;
use crate::shared::constants::ROLE_ADMIN;

use axum::{extract::Request, middleware::Next, response::Response, Router};

pub fn create_admin_user() -> AuthenticatedUser {
    AuthenticatedUser {
        sub: "test-admin".to_string(),
        roles: vec![ROLE_ADMIN.to_string()],
    }
}

pub fn create_regular_user() -> AuthenticatedUser {
    AuthenticatedUser {
        sub: "test-user".to_string(),
        roles: vec!["viewer".to_string()],
    }
}

async fn inject_admin_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_admin_user());
    next.run(request).await
}

async fn inject_user_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_regular_user());
    next.run(request).await
}

/// Skip JWT validation and authenticate every request as an admin
pub fn with_admin_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_admin_middleware))
}

/// Authenticate every request as a user without admin roles
pub fn with_user_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_user_middleware))
}

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
