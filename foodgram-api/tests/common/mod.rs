//! Common test utilities for the HTTP tests
//!
//! Builds the real router over a migrated database with an in-memory image
//! store. Tests return early when `DATABASE_URL` is not set.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use foodgram_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, JwtConfig, MediaConfig},
};
use foodgram_shared::{
    auth::jwt::{create_token, Claims},
    db::{
        migrations::run_migrations,
        pool::{create_pool, PoolSettings},
    },
    media::MemoryImageStore,
    models::{
        ingredient::Ingredient,
        tag::Tag,
        user::{CreateUser, User},
    },
};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const PUBLIC_URL: &str = "http://foodgram.test";
pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub images: Arc<MemoryImageStore>,
    pub user: User,
    pub token: String,
}

pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

fn test_config(database_url: String) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
            public_url: PUBLIC_URL.to_string(),
            page_size: 6,
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections: 5,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        media: MediaConfig {
            root: "./media".to_string(),
        },
    }
}

impl TestContext {
    /// Router plus one authenticated user, or None without a database
    pub async fn new() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping API test");
            return None;
        };

        let db = create_pool(PoolSettings {
            url: url.clone(),
            max_connections: 5,
            ..Default::default()
        })
        .await
        .expect("Failed to create pool");
        run_migrations(&db).await.expect("Failed to run migrations");

        let images = Arc::new(MemoryImageStore::new());
        let state = AppState::with_images(db.clone(), test_config(url), images.clone());
        let app = build_router(state);

        let user = create_user(&db).await;
        let token = token_for(&user);

        Some(Self {
            db,
            app,
            images,
            user,
            token,
        })
    }

    /// Sends a request, authenticated when `token` is given
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Request as the context's own user
    pub async fn send_as_user(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.send(method, uri, Some(&self.token), body).await
    }

    /// Creates a recipe over HTTP and returns its JSON
    pub async fn create_recipe(&self, token: &str, tags: &[&Tag], ingredients: &[(&Ingredient, i32)]) -> Value {
        let body = serde_json::json!({
            "name": unique("recipe"),
            "text": "Mix and bake",
            "cooking_time": 20,
            "image": IMAGE,
            "tags": tags.iter().map(|t| t.id).collect::<Vec<_>>(),
            "ingredients": ingredients
                .iter()
                .map(|(i, amount)| serde_json::json!({"id": i.id, "amount": amount}))
                .collect::<Vec<_>>(),
        });

        let response = self.send(Method::POST, "/api/recipes/", Some(token), Some(body)).await;
        assert_status(&response, StatusCode::CREATED);
        body_json(response).await
    }
}

pub fn token_for(user: &User) -> String {
    create_token(&Claims::new(user.id), JWT_SECRET).expect("Failed to create token")
}

pub async fn create_user(db: &PgPool) -> User {
    let username = unique("user");
    User::create(
        db,
        CreateUser {
            email: format!("{username}@example.com"),
            username,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        },
    )
    .await
    .expect("Failed to create user")
}

pub async fn create_tag(db: &PgPool) -> Tag {
    let slug = unique("tag");
    Tag::create(db, &slug, &slug).await.expect("Failed to create tag")
}

pub async fn create_ingredient(db: &PgPool, unit: &str) -> Ingredient {
    Ingredient::create(db, &unique("Ingredient"), unit)
        .await
        .expect("Failed to create ingredient")
}

pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
