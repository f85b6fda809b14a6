use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{expenses, groups, members, settlements, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/groups", post(groups::create).get(groups::list))
        .route(
            "/groups/{group_id}",
            get(groups::get)
                .patch(groups::update)
                .delete(groups::remove),
        )
        .route(
            "/groups/{group_id}/members",
            get(members::list).post(members::create),
        )
        .route(
            "/groups/{group_id}/members/{member_id}",
            axum::routing::patch(members::update).delete(members::remove),
        )
        .route(
            "/groups/{group_id}/expenses",
            get(expenses::list).post(expenses::create),
        )
        .route(
            "/groups/{group_id}/expenses/{expense_id}",
            get(expenses::get)
                .patch(expenses::update)
                .delete(expenses::remove),
        )
        .route("/groups/{group_id}/balances", get(settlements::balances))
        .route("/groups/{group_id}/settlements", get(settlements::list))
        .route("/groups/{group_id}/reconcile", post(settlements::reconcile))
        .route(
            "/groups/{group_id}/settlements/{settlement_id}/settle",
            post(settlements::settle),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ActiveValue, Database};
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let account = user::ActiveModel {
            username: ActiveValue::Set("alice".to_string()),
            password: ActiveValue::Set("password".to_string()),
        };
        user::Entity::insert(account).exec(&db).await.unwrap();

        let engine = Engine::builder()
            .database(db.clone())
            .build()
            .await
            .unwrap();
        router(ServerState {
            engine: Arc::new(engine),
            db,
        })
    }

    fn basic_auth() -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:password");
        format!("Basic {encoded}")
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected() {
        let router = test_router().await;
        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/groups")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        // Missing Authorization header is rejected by the extractor.
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_and_list_groups_roundtrip() {
        let router = test_router().await;

        let response = router
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/groups")
                    .header(header::AUTHORIZATION, basic_auth())
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"Trip","description":"summer"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/groups")
                    .header(header::AUTHORIZATION, basic_auth())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["groups"][0]["name"], "Trip");
        assert_eq!(parsed["groups"][0]["member_count"], 0);
    }

    #[tokio::test]
    async fn unknown_group_is_404() {
        let router = test_router().await;
        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/groups/does-not-exist")
                    .header(header::AUTHORIZATION, basic_auth())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
