/// HTTP tests for the Foodgram API
///
/// Drive the full router (identity, validation, error mapping) against a
/// real database. Skipped when `DATABASE_URL` is not set.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{
    assert_status, body_bytes, body_json, create_ingredient, create_tag, create_user, token_for,
    TestContext, IMAGE, PUBLIC_URL,
};
use foodgram_shared::models::recipe::{Recipe, RecipeFilter};
use serde_json::json;
use sqlx::PgPool;

async fn recipes_by(db: &PgPool, author_id: i64) -> i64 {
    let filter = RecipeFilter {
        author_id: Some(author_id),
        ..Default::default()
    };
    Recipe::count(db, &filter).await.unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let Some(ctx) = TestContext::new().await else { return };

    let response = ctx.send(Method::GET, "/health", None, None).await;
    assert_status(&response, StatusCode::OK);
    assert!(response.headers().get(header::X_CONTENT_TYPE_OPTIONS).is_some());

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["migrations"], "up_to_date");
}

#[tokio::test]
async fn test_anonymous_write_is_unauthorized() {
    let Some(ctx) = TestContext::new().await else { return };

    let response = ctx
        .send(Method::POST, "/api/recipes/", None, Some(json!({"name": "x"})))
        .await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
    assert!(body_json(response).await["errors"].is_string());

    let response = ctx.send(Method::GET, "/api/users/me/", None, None).await;
    assert_status(&response, StatusCode::UNAUTHORIZED);

    let response = ctx
        .send(Method::GET, "/api/recipes/download_shopping_cart/", None, None)
        .await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let Some(ctx) = TestContext::new().await else { return };

    let response = ctx
        .send(Method::GET, "/api/tags/", Some("not-a-jwt"), None)
        .await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reference_data() {
    let Some(ctx) = TestContext::new().await else { return };
    let tag = create_tag(&ctx.db).await;
    let ingredient = create_ingredient(&ctx.db, "g").await;

    let response = ctx.send(Method::GET, "/api/tags/", None, None).await;
    assert_status(&response, StatusCode::OK);
    let tags = body_json(response).await;
    assert!(tags.as_array().unwrap().iter().any(|t| t["slug"] == tag.slug));

    let response = ctx
        .send(Method::GET, &format!("/api/tags/{}/", tag.id), None, None)
        .await;
    assert_status(&response, StatusCode::OK);
    assert_eq!(body_json(response).await["name"], tag.name);

    let response = ctx.send(Method::GET, "/api/tags/0/", None, None).await;
    assert_status(&response, StatusCode::NOT_FOUND);

    let uri = format!("/api/ingredients/?name={}", ingredient.name.to_lowercase());
    let response = ctx.send(Method::GET, &uri, None, None).await;
    assert_status(&response, StatusCode::OK);
    let found = body_json(response).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["measurement_unit"], "g");
}

#[tokio::test]
async fn test_create_and_get_recipe() {
    let Some(ctx) = TestContext::new().await else { return };
    let tag = create_tag(&ctx.db).await;
    let flour = create_ingredient(&ctx.db, "g").await;

    let created = ctx.create_recipe(&ctx.token, &[&tag], &[(&flour, 250)]).await;
    let id = created["id"].as_i64().unwrap();

    assert_eq!(created["author"]["id"], ctx.user.id);
    assert_eq!(created["tags"][0]["id"], tag.id);
    assert_eq!(created["ingredients"][0]["amount"], 250);
    assert_eq!(created["ingredients"][0]["measurement_unit"], "g");
    assert_eq!(created["is_favorited"], false);
    assert!(created["image"]
        .as_str()
        .unwrap()
        .starts_with(&format!("{}/media/recipes/", PUBLIC_URL)));

    let response = ctx
        .send(Method::GET, &format!("/api/recipes/{}/", id), None, None)
        .await;
    assert_status(&response, StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["name"], created["name"]);
    assert_eq!(fetched["author"]["is_subscribed"], false);
}

#[tokio::test]
async fn test_create_recipe_validation_body() {
    let Some(ctx) = TestContext::new().await else { return };

    let response = ctx
        .send_as_user(
            Method::POST,
            "/api/recipes/",
            Some(json!({
                "name": "",
                "text": "Mix",
                "cooking_time": 0,
                "image": IMAGE,
                "tags": [],
                "ingredients": []
            })),
        )
        .await;

    assert_status(&response, StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["name"].is_array());
    assert!(body["cooking_time"].is_array());
}

#[tokio::test]
async fn test_create_recipe_requires_tags() {
    let Some(ctx) = TestContext::new().await else { return };
    let flour = create_ingredient(&ctx.db, "g").await;

    let response = ctx
        .send_as_user(
            Method::POST,
            "/api/recipes/",
            Some(json!({
                "name": "Bread",
                "text": "Bake",
                "cooking_time": 40,
                "image": IMAGE,
                "tags": [],
                "ingredients": [{"id": flour.id, "amount": 500}]
            })),
        )
        .await;

    assert_status(&response, StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["tags"].is_array());
    assert_eq!(recipes_by(&ctx.db, ctx.user.id).await, 0);
}

#[tokio::test]
async fn test_create_recipe_rejects_duplicate_ingredients() {
    let Some(ctx) = TestContext::new().await else { return };
    let tag = create_tag(&ctx.db).await;
    let flour = create_ingredient(&ctx.db, "g").await;

    let response = ctx
        .send_as_user(
            Method::POST,
            "/api/recipes/",
            Some(json!({
                "name": "Bread",
                "text": "Bake",
                "cooking_time": 40,
                "image": IMAGE,
                "tags": [tag.id],
                "ingredients": [
                    {"id": flour.id, "amount": 500},
                    {"id": flour.id, "amount": 100}
                ]
            })),
        )
        .await;

    assert_status(&response, StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["ingredients"].is_array());
    assert_eq!(recipes_by(&ctx.db, ctx.user.id).await, 0);
}

#[tokio::test]
async fn test_update_and_delete_are_author_only() {
    let Some(ctx) = TestContext::new().await else { return };
    let tag = create_tag(&ctx.db).await;
    let flour = create_ingredient(&ctx.db, "g").await;
    let sugar = create_ingredient(&ctx.db, "g").await;

    let created = ctx.create_recipe(&ctx.token, &[&tag], &[(&flour, 100)]).await;
    let uri = format!("/api/recipes/{}/", created["id"]);

    let stranger = create_user(&ctx.db).await;
    let patch = json!({
        "name": "Renamed",
        "tags": [tag.id],
        "ingredients": [{"id": sugar.id, "amount": 5}]
    });

    let response = ctx
        .send(Method::PATCH, &uri, Some(&token_for(&stranger)), Some(patch.clone()))
        .await;
    assert_status(&response, StatusCode::FORBIDDEN);

    // Ownership is checked before the payload
    let invalid = json!({"cooking_time": 0, "tags": [], "ingredients": []});
    let response = ctx
        .send(Method::PATCH, &uri, Some(&token_for(&stranger)), Some(invalid.clone()))
        .await;
    assert_status(&response, StatusCode::FORBIDDEN);

    let response = ctx.send_as_user(Method::PATCH, &uri, Some(invalid)).await;
    assert_status(&response, StatusCode::BAD_REQUEST);

    let response = ctx.send_as_user(Method::PATCH, &uri, Some(patch)).await;
    assert_status(&response, StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(updated["ingredients"][0]["id"], sugar.id);

    let response = ctx
        .send(Method::DELETE, &uri, Some(&token_for(&stranger)), None)
        .await;
    assert_status(&response, StatusCode::FORBIDDEN);

    let response = ctx.send_as_user(Method::DELETE, &uri, None).await;
    assert_status(&response, StatusCode::NO_CONTENT);

    let response = ctx.send(Method::GET, &uri, None, None).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorite_toggle() {
    let Some(ctx) = TestContext::new().await else { return };
    let tag = create_tag(&ctx.db).await;
    let flour = create_ingredient(&ctx.db, "g").await;
    let created = ctx.create_recipe(&ctx.token, &[&tag], &[(&flour, 100)]).await;
    let uri = format!("/api/recipes/{}/favorite/", created["id"]);

    let response = ctx.send_as_user(Method::POST, &uri, None).await;
    assert_status(&response, StatusCode::CREATED);
    let summary = body_json(response).await;
    assert_eq!(summary["id"], created["id"]);
    assert!(summary.get("author").is_none());

    let response = ctx.send_as_user(Method::POST, &uri, None).await;
    assert_status(&response, StatusCode::CONFLICT);

    let response = ctx
        .send_as_user(Method::GET, &format!("/api/recipes/{}/", created["id"]), None)
        .await;
    assert_eq!(body_json(response).await["is_favorited"], true);

    let response = ctx.send_as_user(Method::DELETE, &uri, None).await;
    assert_status(&response, StatusCode::NO_CONTENT);

    let response = ctx.send_as_user(Method::DELETE, &uri, None).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shopping_cart_download() {
    let Some(ctx) = TestContext::new().await else { return };
    let tag = create_tag(&ctx.db).await;
    let salt = create_ingredient(&ctx.db, "g").await;

    let first = ctx.create_recipe(&ctx.token, &[&tag], &[(&salt, 5)]).await;
    let second = ctx.create_recipe(&ctx.token, &[&tag], &[(&salt, 10)]).await;

    for recipe in [&first, &second] {
        let response = ctx
            .send_as_user(
                Method::POST,
                &format!("/api/recipes/{}/shopping_cart/", recipe["id"]),
                None,
            )
            .await;
        assert_status(&response, StatusCode::CREATED);
    }

    let response = ctx
        .send_as_user(Method::GET, "/api/recipes/download_shopping_cart/", None)
        .await;
    assert_status(&response, StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"shopping_cart.txt\""
    );

    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.starts_with("customer order\nИнгредиенты:\n"));
    assert!(text.contains(&format!("{}15g\n", salt.name)));
}

#[tokio::test]
async fn test_list_filters_and_pagination() {
    let Some(ctx) = TestContext::new().await else { return };
    let tag = create_tag(&ctx.db).await;
    let other_tag = create_tag(&ctx.db).await;
    let flour = create_ingredient(&ctx.db, "g").await;

    let author = create_user(&ctx.db).await;
    let author_token = token_for(&author);
    for _ in 0..3 {
        ctx.create_recipe(&author_token, &[&tag], &[(&flour, 100)]).await;
    }
    let favorite = ctx.create_recipe(&author_token, &[&other_tag], &[(&flour, 100)]).await;

    let uri = format!("/api/recipes/?author={}&tags={}&limit=2", author.id, tag.slug);
    let response = ctx.send(Method::GET, &uri, None, None).await;
    assert_status(&response, StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    assert!(page["previous"].is_null());
    assert!(page["next"].as_str().unwrap().contains("page=2"));

    let next = page["next"].as_str().unwrap().trim_start_matches(PUBLIC_URL).to_string();
    let response = ctx.send(Method::GET, &next, None, None).await;
    let page = body_json(response).await;
    assert_eq!(page["results"].as_array().unwrap().len(), 1);
    assert!(page["next"].is_null());

    ctx.send_as_user(
        Method::POST,
        &format!("/api/recipes/{}/favorite/", favorite["id"]),
        None,
    )
    .await;

    let response = ctx
        .send_as_user(Method::GET, "/api/recipes/?is_favorited=1", None)
        .await;
    let page = body_json(response).await;
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["id"], favorite["id"]);

    let response = ctx
        .send(Method::GET, "/api/recipes/?page=abc", None, None)
        .await;
    assert_status(&response, StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["page"].is_array());
}

#[tokio::test]
async fn test_subscriptions() {
    let Some(ctx) = TestContext::new().await else { return };
    let tag = create_tag(&ctx.db).await;
    let flour = create_ingredient(&ctx.db, "g").await;

    let author = create_user(&ctx.db).await;
    let author_token = token_for(&author);
    for _ in 0..3 {
        ctx.create_recipe(&author_token, &[&tag], &[(&flour, 100)]).await;
    }

    let uri = format!("/api/users/{}/subscribe/?recipes_limit=2", author.id);
    let response = ctx.send_as_user(Method::POST, &uri, None).await;
    assert_status(&response, StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["id"], author.id);
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 2);
    assert_eq!(body["recipes_count"], 3);

    let response = ctx.send_as_user(Method::POST, &uri, None).await;
    assert_status(&response, StatusCode::CONFLICT);

    let own = format!("/api/users/{}/subscribe/", ctx.user.id);
    let response = ctx.send_as_user(Method::POST, &own, None).await;
    assert_status(&response, StatusCode::BAD_REQUEST);

    let response = ctx
        .send_as_user(Method::GET, "/api/users/subscriptions/", None)
        .await;
    assert_status(&response, StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["username"], author.username);

    let response = ctx
        .send_as_user(Method::DELETE, &format!("/api/users/{}/subscribe/", author.id), None)
        .await;
    assert_status(&response, StatusCode::NO_CONTENT);

    let response = ctx
        .send_as_user(Method::DELETE, &format!("/api/users/{}/subscribe/", author.id), None)
        .await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_users() {
    let Some(ctx) = TestContext::new().await else { return };
    let followed = create_user(&ctx.db).await;
    let other = create_user(&ctx.db).await;

    let response = ctx
        .send_as_user(Method::POST, &format!("/api/users/{}/subscribe/", followed.id), None)
        .await;
    assert_status(&response, StatusCode::CREATED);

    let mut usernames = Vec::new();
    let mut subscribed = std::collections::HashMap::new();
    let mut next = Some("/api/users/?limit=100".to_string());
    while let Some(uri) = next {
        let response = ctx.send_as_user(Method::GET, &uri, None).await;
        assert_status(&response, StatusCode::OK);
        let page = body_json(response).await;
        assert!(page["count"].as_i64().unwrap() >= 3);

        for user in page["results"].as_array().unwrap() {
            let username = user["username"].as_str().unwrap().to_string();
            subscribed.insert(username.clone(), user["is_subscribed"].as_bool().unwrap());
            usernames.push(username);
        }
        next = page["next"]
            .as_str()
            .map(|url| url.trim_start_matches(PUBLIC_URL).to_string());
    }

    let generated: Vec<&String> = usernames.iter().filter(|u| u.starts_with("user-")).collect();
    let mut sorted = generated.clone();
    sorted.sort();
    assert_eq!(generated, sorted);
    assert_eq!(subscribed.get(&followed.username), Some(&true));
    assert_eq!(subscribed.get(&other.username), Some(&false));
    assert_eq!(subscribed.get(&ctx.user.username), Some(&false));

    let response = ctx.send(Method::GET, "/api/users/?limit=1", None, None).await;
    assert_status(&response, StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["results"].as_array().unwrap().len(), 1);
    assert_eq!(page["results"][0]["is_subscribed"], false);
    assert!(page["next"].as_str().unwrap().contains("page=2"));
}

#[tokio::test]
async fn test_avatar_lifecycle() {
    let Some(ctx) = TestContext::new().await else { return };

    let payload = format!(
        "data:image/png;base64,{}",
        common::unique("avatar").replace('-', "")
    );
    let response = ctx
        .send_as_user(Method::PUT, "/api/users/me/avatar/", Some(json!({"avatar": payload})))
        .await;
    assert_status(&response, StatusCode::OK);
    let avatar = body_json(response).await["avatar"].as_str().unwrap().to_string();
    assert!(avatar.starts_with(&format!("{}/media/users/", PUBLIC_URL)));

    let response = ctx.send_as_user(Method::GET, "/api/users/me/", None).await;
    assert_eq!(body_json(response).await["avatar"], avatar);

    let response = ctx
        .send_as_user(Method::DELETE, "/api/users/me/avatar/", None)
        .await;
    assert_status(&response, StatusCode::NO_CONTENT);

    let response = ctx
        .send_as_user(Method::DELETE, "/api/users/me/avatar/", None)
        .await;
    assert_status(&response, StatusCode::NOT_FOUND);

    let response = ctx.send_as_user(Method::GET, "/api/users/me/", None).await;
    assert!(body_json(response).await["avatar"].is_null());
}

#[tokio::test]
async fn test_short_link_redirect() {
    let Some(ctx) = TestContext::new().await else { return };
    let tag = create_tag(&ctx.db).await;
    let flour = create_ingredient(&ctx.db, "g").await;
    let created = ctx.create_recipe(&ctx.token, &[&tag], &[(&flour, 100)]).await;

    let response = ctx
        .send(
            Method::GET,
            &format!("/api/recipes/{}/get-link/", created["id"]),
            None,
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let link = body_json(response).await["short-link"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(link.starts_with(&format!("{}/s/", PUBLIC_URL)));

    let path = link.trim_start_matches(PUBLIC_URL);
    let response = ctx.send(Method::GET, path, None, None).await;
    assert_status(&response, StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        format!("{}/recipes/{}", PUBLIC_URL, created["id"]).as_str()
    );

    let response = ctx.send(Method::GET, "/s/doesnotexist", None, None).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}
