//! List engine behaviour over HTTP

mod common;

use common::{FakeMedia, TestApp, UsersOffline};
use http::StatusCode;
use serde_json::json;
use std::sync::Arc;

use trusty_cms::query::{compile, QueryParams};
use trusty_cms::repository::{FilterDescriptor, MemoryStore};

async fn seed_posts(app: &TestApp, count: usize, category: &str) {
    for i in 0..count {
        app.seed(
            "blog_posts",
            json!({
                "id": format!("blog_{category}_{i:02}"),
                "title": format!("Post {i}"),
                "category": category,
                "author": "Editorial",
                "createdAt": format!("2024-03-{:02}T10:00:00.000Z", i + 1),
            }),
        )
        .await;
    }
}

#[tokio::test]
async fn test_second_page_of_a_category() {
    let app = TestApp::new().await;
    seed_posts(&app, 12, "design").await;
    seed_posts(&app, 4, "tech").await;

    let (status, body) = app.get("/api/blog?category=design&page=2&limit=5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 5);
    assert_eq!(
        body["pagination"],
        json!({ "next": { "page": 3, "limit": 5 }, "prev": { "page": 1, "limit": 5 } })
    );
    // newest first: March 12 down to March 1, skipping the first five
    let ids: Vec<&str> = body["data"].as_array().unwrap().iter().map(|d| d["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["blog_design_06", "blog_design_05", "blog_design_04", "blog_design_03", "blog_design_02"]);
}

#[tokio::test]
async fn test_last_page_has_no_next() {
    let app = TestApp::new().await;
    seed_posts(&app, 12, "design").await;

    let (_, body) = app.get("/api/blog?page=3&limit=5").await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["pagination"], json!({ "prev": { "page": 2, "limit": 5 } }));

    let (_, body) = app.get("/api/blog?page=4&limit=5").await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_first_page_has_no_prev() {
    let app = TestApp::new().await;
    seed_posts(&app, 3, "design").await;

    let (_, body) = app.get("/api/blog").await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["pagination"], json!({}));
}

#[tokio::test]
async fn test_literal_operator_word_is_not_rewritten() {
    let app = TestApp::new().await;
    app.seed("services", json!({ "id": "svc_1", "title": "gte", "order": 1 })).await;
    app.seed("services", json!({ "id": "svc_2", "title": "Consulting", "order": 2 })).await;

    let (status, body) = app.get("/api/services?title=gte").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], "svc_1");
}

#[tokio::test]
async fn test_bracketed_operator_compares() {
    let app = TestApp::new().await;
    for order in 1..=4 {
        app.seed("services", json!({ "id": format!("svc_{order}"), "title": "S", "order": order }))
            .await;
    }

    let (_, body) = app.get("/api/services?order[gte]=3").await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["order"], 3);
    assert_eq!(body["data"][1]["order"], 4);

    let (_, body) = app.get("/api/services?order[in]=1,4").await;
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_unsupported_operator_is_a_bad_request() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/services?order[near]=3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[test]
fn test_compiled_filter_recompiles_to_itself() {
    let params = QueryParams::parse("age[gte]=5&status=gte&tags=a&tags=b").unwrap();
    let compiled = compile(&params, &[]).unwrap();
    let again = FilterDescriptor::from_json(&compiled.to_json()).unwrap();
    assert_eq!(compiled, again);
}

#[tokio::test]
async fn test_select_and_sort() {
    let app = TestApp::new().await;
    app.seed("services", json!({ "id": "svc_b", "title": "Beta", "order": 2, "icon": "b" })).await;
    app.seed("services", json!({ "id": "svc_a", "title": "Alpha", "order": 1, "icon": "a" })).await;

    let (_, body) = app.get("/api/services").await;
    assert_eq!(body["data"][0]["id"], "svc_a");

    let (_, body) = app.get("/api/services?sort=-title&select=title").await;
    assert_eq!(body["data"][0], json!({ "id": "svc_b", "title": "Beta" }));
}

#[tokio::test]
async fn test_featured_testimonials() {
    let app = TestApp::new().await;
    app.seed("testimonials", json!({ "id": "tst_1", "content": "Great", "rating": 5, "featured": true, "order": 1 }))
        .await;
    app.seed("testimonials", json!({ "id": "tst_2", "content": "Fine", "rating": 3, "featured": false, "order": 2 }))
        .await;

    let (_, body) = app.get("/api/testimonials?featured=true").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], "tst_1");

    let (_, body) = app.get("/api/testimonials").await;
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_author_is_expanded() {
    let app = TestApp::new().await;
    app.seed("users", json!({ "id": "usr_1", "name": "Ama Mensah", "email": "ama@trusty.test", "password": "x" }))
        .await;
    app.seed("blog_posts", json!({ "id": "blog_1", "title": "Hello", "author": "usr_1", "createdAt": "2024-01-01T00:00:00.000Z" }))
        .await;

    let (_, body) = app.get("/api/blog").await;
    assert_eq!(body["data"][0]["author"], json!({ "id": "usr_1", "name": "Ama Mensah" }));

    let (_, body) = app.get("/api/blog/blog_1").await;
    assert_eq!(body["data"]["author"]["name"], "Ama Mensah");
}

#[tokio::test]
async fn test_failed_expansion_still_lists() {
    let app = TestApp::with(
        Arc::new(UsersOffline(MemoryStore::new())),
        Arc::new(FakeMedia::default()),
        None,
    )
    .await;
    app.seed("blog_posts", json!({ "id": "blog_1", "title": "Hello", "author": "usr_1", "createdAt": "2024-01-01T00:00:00.000Z" }))
        .await;

    let (status, body) = app.get("/api/blog").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["author"], "usr_1");

    let (status, body) = app.get("/api/blog/tag/none").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_category_and_tag_routes() {
    let app = TestApp::new().await;
    app.seed("blog_posts", json!({ "id": "blog_1", "category": "design", "tags": ["rust", "web"], "createdAt": "2024-01-01T00:00:00.000Z" }))
        .await;
    app.seed("blog_posts", json!({ "id": "blog_2", "category": "design", "tags": ["go"], "createdAt": "2024-01-02T00:00:00.000Z" }))
        .await;
    app.seed("blog_posts", json!({ "id": "blog_3", "category": "news", "tags": ["rust"], "createdAt": "2024-01-03T00:00:00.000Z" }))
        .await;

    let (_, body) = app.get("/api/blog/category/design").await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["id"], "blog_2");
    assert!(body.get("pagination").is_none());

    let (_, body) = app.get("/api/blog/tag/rust").await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["id"], "blog_3");

    let (_, body) = app.get("/api/blog?tags=go,web").await;
    assert_eq!(body["count"], 2);
}
