mod common;

use common::test_server::TestServer;
use reqwest::{Client, StatusCode, multipart};
use serde_json::{Value, json};

const PASSWORD: &str = "correct horse battery";

async fn signup(client: &Client, base_url: &str, email: &str, display_name: &str) -> Value {
    let resp = client
        .post(format!("{base_url}/signup"))
        .json(&json!({
            "email": email,
            "password": PASSWORD,
            "display_name": display_name,
        }))
        .send()
        .await
        .expect("signup");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("parse signup response")
}

async fn login(client: &Client, base_url: &str, email: &str) -> String {
    let resp: Value = client
        .post(format!("{base_url}/login"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("login")
        .json()
        .await
        .expect("parse login response");
    resp["data"]["token"].as_str().expect("token").to_string()
}

async fn create_brewery(client: &Client, base_url: &str, token: &str, name: &str) -> String {
    let resp: Value = client
        .post(format!("{base_url}/breweries"))
        .bearer_auth(token)
        .json(&json!({
            "name": name,
            "location": "Portland, OR",
            "date_of_founding": "1988",
        }))
        .send()
        .await
        .expect("create brewery")
        .json()
        .await
        .expect("parse brewery response");
    resp["data"]["id"].as_str().expect("brewery id").to_string()
}

async fn create_beer(
    client: &Client,
    base_url: &str,
    token: &str,
    brewery_id: &str,
    name: &str,
) -> String {
    let resp: Value = client
        .post(format!("{base_url}/beers"))
        .bearer_auth(token)
        .json(&json!({
            "name": name,
            "brewery_id": brewery_id,
            "description": "A hazy IPA with citrus notes",
            "style": "IPA",
            "ibu": 60,
            "abv": 6.5,
            "color": "amber",
        }))
        .send()
        .await
        .expect("create beer")
        .json()
        .await
        .expect("parse beer response");
    resp["data"]["id"].as_str().expect("beer id").to_string()
}

fn photo_part() -> multipart::Part {
    multipart::Part::bytes(vec![0u8; 128])
        .file_name("photo.png")
        .mime_str("image/png")
        .expect("mime")
}

fn review_form(rating: &str, review: &str, beer_id: &str, photos: usize) -> multipart::Form {
    let mut form = multipart::Form::new()
        .text("rating", rating.to_string())
        .text("review", review.to_string())
        .text("beer_id", beer_id.to_string());
    for _ in 0..photos {
        form = form.part("photos", photo_part());
    }
    form
}

#[tokio::test]
async fn test_signup_login_and_profile() {
    let server = TestServer::start().await;
    let client = Client::new();
    let base = &server.base_url;

    let created = signup(&client, base, "ada@example.com", "ada lovelace").await;
    let user_id = created["data"]["id"].as_str().expect("user id").to_string();
    assert!(created["data"].get("password_hash").is_none());

    // Duplicate email is a conflict.
    let resp = client
        .post(format!("{base}/signup"))
        .json(&json!({
            "email": "ada@example.com",
            "password": PASSWORD,
            "display_name": "someone else",
        }))
        .send()
        .await
        .expect("dup signup");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Wrong password is rejected without disclosing which field failed.
    let resp = client
        .post(format!("{base}/login"))
        .json(&json!({ "email": "ada@example.com", "password": "wrong password" }))
        .send()
        .await
        .expect("bad login");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let token = login(&client, base, "ada@example.com").await;

    // Public profile is visible without auth.
    let resp: Value = client
        .get(format!("{base}/users/{user_id}"))
        .send()
        .await
        .expect("get profile")
        .json()
        .await
        .expect("parse profile");
    assert_eq!(resp["data"]["display_name"], "ada lovelace");

    // Self profile update works.
    let resp = client
        .put(format!("{base}/users/{user_id}"))
        .bearer_auth(&token)
        .json(&json!({ "present_location": "London" }))
        .send()
        .await
        .expect("update profile");
    assert_eq!(resp.status(), StatusCode::OK);

    // Another user cannot edit it.
    signup(&client, base, "grace@example.com", "grace hopper").await;
    let other_token = login(&client, base, "grace@example.com").await;
    let resp = client
        .put(format!("{base}/users/{user_id}"))
        .bearer_auth(&other_token)
        .json(&json!({ "present_location": "elsewhere" }))
        .send()
        .await
        .expect("forbidden update");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_auth_required() {
    let server = TestServer::start().await;
    let client = Client::new();
    let base = &server.base_url;

    let resp = client
        .post(format!("{base}/breweries"))
        .json(&json!({ "name": "x", "location": "y", "date_of_founding": "1999" }))
        .send()
        .await
        .expect("no token");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(format!("{base}/breweries"))
        .bearer_auth("taproom_deadbeef_000000000000000000000000")
        .json(&json!({ "name": "x", "location": "y", "date_of_founding": "1999" }))
        .send()
        .await
        .expect("bad token");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_review_lifecycle_without_photos() {
    let server = TestServer::start().await;
    let client = Client::new();
    let base = &server.base_url;

    signup(&client, base, "drinker@example.com", "beer drinker").await;
    let token = login(&client, base, "drinker@example.com").await;
    let brewery_id = create_brewery(&client, base, &token, "Cascade Brewing").await;
    let beer_id = create_beer(&client, base, &token, &brewery_id, "Hop Czar").await;

    // Create with no photos.
    let resp = client
        .post(format!("{base}/beers/review"))
        .bearer_auth(&token)
        .multipart(review_form("4", "Great beer, loved it.", &beer_id, 0))
        .send()
        .await
        .expect("create review");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("parse review");
    let review_id = body["data"]["id"].as_str().expect("review id").to_string();
    assert_eq!(body["data"]["rating"], 4);

    // Reading it back shows an empty photos array.
    let resp: Value = client
        .get(format!("{base}/beers/review/{review_id}"))
        .send()
        .await
        .expect("get review")
        .json()
        .await
        .expect("parse get review");
    assert_eq!(resp["data"]["photos"], json!([]));

    // A second review for the same (user, beer) pair is a conflict.
    let resp = client
        .post(format!("{base}/beers/review"))
        .bearer_auth(&token)
        .multipart(review_form("5", "Changed my mind, amazing.", &beer_id, 0))
        .send()
        .await
        .expect("dup review");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Deleting the first frees the pair.
    let resp = client
        .delete(format!("{base}/beers/review/{review_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("delete review");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .post(format!("{base}/beers/review"))
        .bearer_auth(&token)
        .multipart(review_form("5", "Changed my mind, amazing.", &beer_id, 0))
        .send()
        .await
        .expect("recreate review");
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_review_photo_slots() {
    let server = TestServer::start().await;
    let client = Client::new();
    let base = &server.base_url;

    signup(&client, base, "snapper@example.com", "photo snapper").await;
    let token = login(&client, base, "snapper@example.com").await;
    let brewery_id = create_brewery(&client, base, &token, "Cascade Brewing").await;
    let beer_id = create_beer(&client, base, &token, &brewery_id, "Hop Czar").await;

    // Five photos on create never touches storage.
    let resp = client
        .post(format!("{base}/beers/review"))
        .bearer_auth(&token)
        .multipart(review_form("4", "Great beer, loved it.", &beer_id, 5))
        .send()
        .await
        .expect("too many photos");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Three photos get slots 0..2.
    let resp = client
        .post(format!("{base}/beers/review"))
        .bearer_auth(&token)
        .multipart(review_form("4", "Great beer, loved it.", &beer_id, 3))
        .send()
        .await
        .expect("create with photos");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("parse review");
    let review_id = body["data"]["id"].as_str().expect("review id").to_string();
    let photos = body["data"]["photos"].as_array().expect("photos");
    let positions: Vec<i64> = photos
        .iter()
        .map(|p| p["position"].as_i64().unwrap())
        .collect();
    assert_eq!(positions, [0, 1, 2]);

    // Photo files landed under uploads/{brewery}/{beer}/.
    let photo_dir = server
        .data_dir()
        .join("uploads")
        .join("Cascade Brewing")
        .join("Hop Czar");
    assert_eq!(std::fs::read_dir(&photo_dir).expect("photo dir").count(), 3);

    // Adding two more to three existing must fail before any slot is taken.
    let form = multipart::Form::new()
        .text("rating", "4")
        .text("review", "Great beer, loved it.")
        .text("deleted", "[]")
        .part("photos", photo_part())
        .part("photos", photo_part());
    let resp = client
        .put(format!("{base}/beers/review/{review_id}"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .expect("over-limit edit");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(&photo_dir).expect("photo dir").count(), 3);

    // Deleting one and adding two fills the freed slot plus slot 3.
    let first_photo_id = photos[0]["id"].as_str().expect("photo id").to_string();
    let form = multipart::Form::new()
        .text("rating", "5")
        .text("review", "Even better on a second tasting.")
        .text("deleted", format!("[\"{first_photo_id}\"]"))
        .part("photos", photo_part())
        .part("photos", photo_part());
    let resp = client
        .put(format!("{base}/beers/review/{review_id}"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .expect("edit review");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("parse edited review");
    let mut positions: Vec<i64> = body["data"]["photos"]
        .as_array()
        .expect("photos")
        .iter()
        .map(|p| p["position"].as_i64().unwrap())
        .collect();
    positions.sort_unstable();
    assert_eq!(positions, [0, 1, 2, 3]);
    assert_eq!(std::fs::read_dir(&photo_dir).expect("photo dir").count(), 4);

    // Single-photo delete endpoint removes the row and the file.
    let body_photos = body["data"]["photos"].as_array().expect("photos");
    let photo_id = body_photos[0]["id"].as_str().expect("photo id");
    let resp = client
        .delete(format!("{base}/beers/review/photo/{photo_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("delete photo");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(std::fs::read_dir(&photo_dir).expect("photo dir").count(), 3);
}

#[tokio::test]
async fn test_oversized_photo_rejected() {
    let server = TestServer::start().await;
    let client = Client::new();
    let base = &server.base_url;

    signup(&client, base, "big@example.com", "big uploader").await;
    let token = login(&client, base, "big@example.com").await;
    let brewery_id = create_brewery(&client, base, &token, "Cascade Brewing").await;
    let beer_id = create_beer(&client, base, &token, &brewery_id, "Hop Czar").await;

    let oversized = multipart::Part::bytes(vec![0u8; 1_000_001])
        .file_name("huge.png")
        .mime_str("image/png")
        .expect("mime");
    let form = multipart::Form::new()
        .text("rating", "4")
        .text("review", "Great beer, loved it.")
        .text("beer_id", beer_id)
        .part("photos", oversized);

    let resp = client
        .post(format!("{base}/beers/review"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .expect("oversized photo");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_favorites_flow() {
    let server = TestServer::start().await;
    let client = Client::new();
    let base = &server.base_url;

    signup(&client, base, "fan@example.com", "beer fanatic").await;
    let token = login(&client, base, "fan@example.com").await;
    let brewery_id = create_brewery(&client, base, &token, "Cascade Brewing").await;
    let beer_id = create_beer(&client, base, &token, &brewery_id, "Hop Czar").await;

    // First favorite creates a row.
    let resp = client
        .post(format!("{base}/favorites"))
        .bearer_auth(&token)
        .json(&json!({ "table": "beers", "target_id": beer_id }))
        .send()
        .await
        .expect("add favorite");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("parse favorite");
    let favorite_id = body["data"]["id"].as_str().expect("favorite id").to_string();

    // Favoriting again succeeds without creating a second row.
    let resp = client
        .post(format!("{base}/favorites"))
        .bearer_auth(&token)
        .json(&json!({ "table": "beers", "target_id": beer_id }))
        .send()
        .await
        .expect("re-add favorite");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("parse re-add");
    assert_eq!(body["data"]["message"], "Already favorited");

    // Favoriting a missing beer is a 404.
    let resp = client
        .post(format!("{base}/favorites"))
        .bearer_auth(&token)
        .json(&json!({ "table": "beers", "target_id": "nope" }))
        .send()
        .await
        .expect("missing target");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Brewery favorite plus beer favorite both appear under "all".
    let resp = client
        .post(format!("{base}/favorites"))
        .bearer_auth(&token)
        .json(&json!({ "table": "breweries", "target_id": brewery_id }))
        .send()
        .await
        .expect("add brewery favorite");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = client
        .get(format!("{base}/favorites/all"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list all")
        .json()
        .await
        .expect("parse list");
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["data"].as_array().expect("data").len(), 2);

    // Existence check.
    let body: Value = client
        .get(format!("{base}/favorites/beers/{beer_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("exists")
        .json()
        .await
        .expect("parse exists");
    assert_eq!(body["data"]["favorited"], true);

    // Remove, then removing again is a 404.
    let resp = client
        .delete(format!("{base}/favorites/beers/{favorite_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("remove favorite");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .delete(format!("{base}/favorites/beers/{favorite_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("remove again");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = client
        .get(format!("{base}/favorites/beers/{beer_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("exists after remove")
        .json()
        .await
        .expect("parse exists");
    assert_eq!(body["data"]["favorited"], false);
}

#[tokio::test]
async fn test_recent_feed_pagination() {
    let server = TestServer::start().await;
    let client = Client::new();
    let base = &server.base_url;

    signup(&client, base, "busy@example.com", "busy creator").await;
    let token = login(&client, base, "busy@example.com").await;
    let brewery_id = create_brewery(&client, base, &token, "Cascade Brewing").await;
    for n in 0..4 {
        create_beer(&client, base, &token, &brewery_id, &format!("Beer {n}")).await;
    }

    let mut seen: Vec<(String, String)> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;

    loop {
        let url = match &cursor {
            Some(c) => format!("{base}/recent?limit=2&cursor={}", urlencoding::encode(c)),
            None => format!("{base}/recent?limit=2"),
        };
        let body: Value = client
            .get(url)
            .send()
            .await
            .expect("recent page")
            .json()
            .await
            .expect("parse recent");

        for item in body["data"].as_array().expect("data") {
            let key = (
                item["table_name"].as_str().expect("table").to_string(),
                item["id"].as_str().expect("id").to_string(),
            );
            assert!(!seen.contains(&key), "feed repeated {key:?}");
            seen.push(key);
        }

        pages += 1;
        assert!(pages < 50, "feed did not terminate");
        match body["next_cursor"].as_str() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    // Admin user + test user + brewery + 4 beers.
    assert_eq!(seen.len(), 7);
    assert!(seen.contains(&("breweries".to_string(), brewery_id)));
}

#[tokio::test]
async fn test_admin_surface() {
    let server = TestServer::start().await;
    let client = Client::new();
    let base = &server.base_url;

    let created = signup(&client, base, "plain@example.com", "plain user").await;
    let user_id = created["data"]["id"].as_str().expect("user id").to_string();
    let user_token = login(&client, base, "plain@example.com").await;

    // Activity log is admin-only.
    let resp = client
        .get(format!("{base}/activity"))
        .bearer_auth(&user_token)
        .send()
        .await
        .expect("activity as user");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = client
        .get(format!("{base}/activity"))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("activity as admin")
        .json()
        .await
        .expect("parse activity");
    // Signup above was recorded.
    assert!(body["pagination"]["total"].as_i64().expect("total") >= 1);

    // Role changes are admin-only and take effect immediately.
    let resp = client
        .put(format!("{base}/users/{user_id}/role"))
        .bearer_auth(&user_token)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .expect("role as user");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .put(format!("{base}/users/{user_id}/role"))
        .bearer_auth(&server.admin_token)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .expect("role as admin");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/users"))
        .bearer_auth(&user_token)
        .send()
        .await
        .expect("list users as new admin");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_search_and_stores() {
    let server = TestServer::start().await;
    let client = Client::new();
    let base = &server.base_url;

    signup(&client, base, "owner@example.com", "store owner").await;
    let token = login(&client, base, "owner@example.com").await;
    let brewery_id = create_brewery(&client, base, &token, "Cascade Brewing").await;
    let beer_id = create_beer(&client, base, &token, &brewery_id, "Cascade Lager").await;

    let body: Value = client
        .get(format!("{base}/search?q=cascade"))
        .send()
        .await
        .expect("search")
        .json()
        .await
        .expect("parse search");
    assert_eq!(body["data"].as_array().expect("results").len(), 2);

    // Stores start unverified and hidden from the default listing.
    let resp: Value = client
        .post(format!("{base}/stores"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Bottle Shop",
            "location": "Portland, OR",
            "date_of_founding": "2010",
        }))
        .send()
        .await
        .expect("create store")
        .json()
        .await
        .expect("parse store");
    let store_id = resp["data"]["id"].as_str().expect("store id").to_string();

    let body: Value = client
        .get(format!("{base}/stores"))
        .send()
        .await
        .expect("list stores")
        .json()
        .await
        .expect("parse stores");
    assert_eq!(body["data"].as_array().expect("stores").len(), 0);

    let resp = client
        .put(format!("{base}/stores/verified/{store_id}"))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("verify store");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = client
        .get(format!("{base}/stores"))
        .send()
        .await
        .expect("list stores again")
        .json()
        .await
        .expect("parse stores");
    assert_eq!(body["data"].as_array().expect("stores").len(), 1);

    // Menu entries join beer details.
    let resp = client
        .post(format!("{base}/stores/menu"))
        .bearer_auth(&token)
        .json(&json!({
            "store_id": store_id,
            "beer_id": beer_id,
            "size": "pint",
            "price": 7.5,
        }))
        .send()
        .await
        .expect("create menu item");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = client
        .get(format!("{base}/stores/{store_id}/menu"))
        .send()
        .await
        .expect("store menu")
        .json()
        .await
        .expect("parse menu");
    let menu = body["data"].as_array().expect("menu");
    assert_eq!(menu.len(), 1);
    assert_eq!(menu[0]["beer_name"], "Cascade Lager");
}
