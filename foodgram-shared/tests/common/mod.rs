//! Common fixtures for the database-backed tests
//!
//! Tests share one database and run concurrently, so every fixture gets a
//! unique name. Without `DATABASE_URL` the helpers return `None` and the
//! calling test returns early.

#![allow(dead_code)]

use foodgram_shared::db::migrations::run_migrations;
use foodgram_shared::db::pool::{create_pool, PoolSettings};
use foodgram_shared::media::MemoryImageStore;
use foodgram_shared::models::ingredient::Ingredient;
use foodgram_shared::models::tag::Tag;
use foodgram_shared::models::user::{CreateUser, User};
use foodgram_shared::services::associations::{AssociationSet, IngredientLine};
use foodgram_shared::services::recipes::{create_recipe, RecipeDetail, RecipeInput};
use sqlx::PgPool;
use uuid::Uuid;

pub const IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub fn database_url() -> Option<String> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping database test");
            None
        }
    }
}

/// Pool with migrations applied, or None when no database is configured
pub async fn test_pool() -> Option<PgPool> {
    let url = database_url()?;
    let pool = create_pool(PoolSettings {
        url,
        max_connections: 5,
        ..Default::default()
    })
    .await
    .expect("Failed to create pool");

    run_migrations(&pool).await.expect("Failed to run migrations");
    Some(pool)
}

pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

pub async fn create_user(pool: &PgPool) -> User {
    let username = unique("user");
    User::create(
        pool,
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

pub async fn create_tag(pool: &PgPool) -> Tag {
    let slug = unique("tag");
    Tag::create(pool, &slug, &slug)
        .await
        .expect("Failed to create tag")
}

pub async fn create_ingredient(pool: &PgPool, name: &str, unit: &str) -> Ingredient {
    Ingredient::create(pool, name, unit)
        .await
        .expect("Failed to create ingredient")
}

pub fn line(ingredient: &Ingredient, amount: i32) -> IngredientLine {
    IngredientLine {
        ingredient_id: ingredient.id,
        amount,
    }
}

pub async fn create_test_recipe(
    pool: &PgPool,
    images: &MemoryImageStore,
    author: &User,
    tags: &[&Tag],
    lines: Vec<IngredientLine>,
) -> RecipeDetail {
    let associations = AssociationSet::new(tags.iter().map(|t| t.id).collect(), lines)
        .expect("Invalid associations");

    create_recipe(
        pool,
        images,
        author.id,
        RecipeInput {
            name: unique("recipe"),
            text: "Mix and bake".to_string(),
            cooking_time: 30,
            image: IMAGE.to_string(),
            associations,
        },
    )
    .await
    .expect("Failed to create recipe")
}
