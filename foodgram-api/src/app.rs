/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use foodgram_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use foodgram_shared::{
    auth::middleware::create_identity_middleware,
    media::{FsImageStore, ImageStore},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Recipe images and avatars
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    /// Creates state backed by a filesystem image store under `MEDIA_ROOT`
    pub fn new(db: PgPool, config: Config) -> Self {
        let images = Arc::new(FsImageStore::new(&config.media.root));
        Self::with_images(db, config, images)
    }

    pub fn with_images(db: PgPool, config: Config, images: Arc<dyn ImageStore>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            images,
        }
    }

    /// Public URL of a stored image
    pub fn media_url(&self, key: &str) -> String {
        self.config.media_url(key)
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Routes
///
/// ```text
/// /health
/// /s/:code                                  short-link redirect
/// /api/
/// ├── recipes/                              GET list, POST create
/// ├── recipes/download_shopping_cart/       GET text export
/// ├── recipes/:id/                          GET, PATCH, DELETE
/// ├── recipes/:id/favorite/                 POST, DELETE
/// ├── recipes/:id/shopping_cart/            POST, DELETE
/// ├── recipes/:id/get-link/                 GET
/// ├── tags/, tags/:id/                      GET
/// ├── ingredients/, ingredients/:id/        GET
/// ├── users/                                GET paginated list
/// ├── users/me/                             GET
/// ├── users/me/avatar/                      PUT, DELETE
/// ├── users/subscriptions/                  GET
/// ├── users/:id/                            GET
/// └── users/:id/subscribe/                  POST, DELETE
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing, identity.
/// Identity runs for every route; handlers that need a user take
/// `AuthContext`, the others take `Option<AuthContext>`.
pub fn build_router(state: AppState) -> Router {
    let recipe_routes = Router::new()
        .route(
            "/recipes/",
            get(routes::recipes::list_recipes).post(routes::recipes::create_recipe),
        )
        .route(
            "/recipes/download_shopping_cart/",
            get(routes::recipes::download_shopping_cart),
        )
        .route(
            "/recipes/:id/",
            get(routes::recipes::get_recipe)
                .patch(routes::recipes::update_recipe)
                .delete(routes::recipes::delete_recipe),
        )
        .route(
            "/recipes/:id/favorite/",
            post(routes::recipes::add_favorite).delete(routes::recipes::remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart/",
            post(routes::recipes::add_to_shopping_cart)
                .delete(routes::recipes::remove_from_shopping_cart),
        )
        .route("/recipes/:id/get-link/", get(routes::recipes::get_link));

    let reference_routes = Router::new()
        .route("/tags/", get(routes::tags::list_tags))
        .route("/tags/:id/", get(routes::tags::get_tag))
        .route("/ingredients/", get(routes::ingredients::list_ingredients))
        .route("/ingredients/:id/", get(routes::ingredients::get_ingredient));

    let user_routes = Router::new()
        .route("/users/", get(routes::users::list_users))
        .route("/users/me/", get(routes::users::me))
        .route(
            "/users/me/avatar/",
            put(routes::users::set_avatar).delete(routes::users::remove_avatar),
        )
        .route("/users/subscriptions/", get(routes::users::subscriptions))
        .route("/users/:id/", get(routes::users::get_user))
        .route(
            "/users/:id/subscribe/",
            post(routes::users::subscribe).delete(routes::users::unsubscribe),
        );

    let api_routes = Router::new()
        .merge(recipe_routes)
        .merge(reference_routes)
        .merge(user_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/s/:code", get(routes::links::follow_short_link))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(create_identity_middleware(
            state.config.jwt.secret.clone(),
        )))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
