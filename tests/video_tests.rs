use actix_web::{http, test};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use video_catalog_backend::config::UploadLimits;

mod common;

fn video_body(categories: &[Uuid], genres: &[Uuid]) -> serde_json::Value {
    json!({
        "title": "The Long Road",
        "description": "A road movie",
        "year_launched": 2010,
        "opened": true,
        "rating": "14",
        "duration": 120,
        "categories_id": categories,
        "genres_id": genres,
    })
}

fn ids(resource: &serde_json::Value, key: &str) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = resource[key]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().parse().unwrap())
        .collect();
    ids.sort();
    ids
}

#[sqlx::test]
async fn test_video_store_with_relations(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::setup_test_app(pool.clone(), common::local_store(dir.path()).await, UploadLimits::default()).await;
    let c1 = common::create_category(&pool, "Action").await;
    let g1 = common::create_genre(&pool, "Thriller", &[c1]).await;

    let req = test::TestRequest::post()
        .uri("/api/videos")
        .set_json(&video_body(&[c1], &[g1]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), http::StatusCode::CREATED);

    let body = test::read_body(resp).await;
    let video: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(video["title"], "The Long Road");
    assert_eq!(video["rating"], "14");
    assert_eq!(video["opened"], true);
    assert!(video["thumb_file"].is_null());
    assert!(video["video_file"].is_null());
    assert_eq!(ids(&video, "categories"), vec![c1]);
    assert_eq!(ids(&video, "genres"), vec![g1]);

    let id: Uuid = video["id"].as_str().unwrap().parse().unwrap();
    assert_eq!(common::linked(&pool, "category_video", "video_id", "category_id", id).await, vec![c1]);
    assert_eq!(common::linked(&pool, "genre_video", "video_id", "genre_id", id).await, vec![g1]);

    let req = test::TestRequest::get()
        .uri(&format!("/api/videos/{}", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body = test::read_body(resp).await;
    let shown: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(shown["id"], video["id"]);
    assert_eq!(ids(&shown, "genres"), vec![g1]);
}

#[sqlx::test]
async fn test_video_update_leaves_omitted_relations(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::setup_test_app(pool.clone(), common::local_store(dir.path()).await, UploadLimits::default()).await;
    let c1 = common::create_category(&pool, "Action").await;
    let c2 = common::create_category(&pool, "Drama").await;
    let g1 = common::create_genre(&pool, "Thriller", &[c1, c2]).await;

    let req = test::TestRequest::post()
        .uri("/api/videos")
        .set_json(&video_body(&[c1], &[g1]))
        .to_request();
    let body = test::read_body(test::call_service(&app, req).await).await;
    let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    let mut update = video_body(&[c2], &[]);
    update.as_object_mut().unwrap().remove("genres_id");
    update["title"] = json!("The Longer Road");

    let req = test::TestRequest::put()
        .uri(&format!("/api/videos/{}", id))
        .set_json(&update)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body = test::read_body(resp).await;
    let updated: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(updated["title"], "The Longer Road");
    assert_eq!(ids(&updated, "categories"), vec![c2]);
    assert_eq!(ids(&updated, "genres"), vec![g1]);

    assert_eq!(common::linked(&pool, "category_video", "video_id", "category_id", id).await, vec![c2]);
    assert_eq!(common::linked(&pool, "genre_video", "video_id", "genre_id", id).await, vec![g1]);
}

#[sqlx::test]
async fn test_video_update_replaces_full_sets(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::setup_test_app(pool.clone(), common::local_store(dir.path()).await, UploadLimits::default()).await;
    let c1 = common::create_category(&pool, "Action").await;
    let c2 = common::create_category(&pool, "Drama").await;
    let c3 = common::create_category(&pool, "Comedy").await;
    let g1 = common::create_genre(&pool, "Thriller", &[c1, c2, c3]).await;
    let g2 = common::create_genre(&pool, "Noir", &[c1, c2, c3]).await;

    let req = test::TestRequest::post()
        .uri("/api/videos")
        .set_json(&video_body(&[c1, c2], &[g1]))
        .to_request();
    let body = test::read_body(test::call_service(&app, req).await).await;
    let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/videos/{}", id))
        .set_json(&video_body(&[c2, c3], &[g2, g2]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    assert_eq!(
        common::linked(&pool, "category_video", "video_id", "category_id", id).await,
        common::sorted(vec![c2, c3])
    );
    assert_eq!(common::linked(&pool, "genre_video", "video_id", "genre_id", id).await, vec![g2]);
}

#[sqlx::test]
async fn test_video_store_rejects_bad_references(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::setup_test_app(pool.clone(), common::local_store(dir.path()).await, UploadLimits::default()).await;
    let c1 = common::create_category(&pool, "Action").await;
    let g1 = common::create_genre(&pool, "Thriller", &[c1]).await;
    let deleted_category = common::create_category(&pool, "Gone").await;
    common::soft_delete(&pool, "categories", deleted_category).await;

    let bodies = [
        video_body(&[c1, deleted_category], &[g1]),
        video_body(&[c1], &[g1, Uuid::new_v4()]),
        video_body(&[Uuid::new_v4()], &[g1]),
    ];
    for body in bodies {
        let req = test::TestRequest::post()
            .uri("/api/videos")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    assert_eq!(common::count(&pool, "SELECT COUNT(*) FROM videos").await, 0);
    assert_eq!(common::count(&pool, "SELECT COUNT(*) FROM category_video").await, 0);
    assert_eq!(common::count(&pool, "SELECT COUNT(*) FROM genre_video").await, 0);
}

#[sqlx::test]
async fn test_video_genre_must_belong_to_a_category(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::setup_test_app(pool.clone(), common::local_store(dir.path()).await, UploadLimits::default()).await;
    let c1 = common::create_category(&pool, "Action").await;
    let c2 = common::create_category(&pool, "Drama").await;
    let g2 = common::create_genre(&pool, "Melodrama", &[c2]).await;

    let req = test::TestRequest::post()
        .uri("/api/videos")
        .set_json(&video_body(&[c1], &[g2]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), http::StatusCode::UNPROCESSABLE_ENTITY);

    let body = test::read_body(resp).await;
    let errors: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(errors["errors"]["genres_id"].is_array());
    assert_eq!(common::count(&pool, "SELECT COUNT(*) FROM videos").await, 0);
}

#[sqlx::test]
async fn test_video_validation(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::setup_test_app(pool.clone(), common::local_store(dir.path()).await, UploadLimits::default()).await;
    let c1 = common::create_category(&pool, "Action").await;
    let g1 = common::create_genre(&pool, "Thriller", &[c1]).await;

    let mut missing_lists = video_body(&[c1], &[g1]);
    missing_lists.as_object_mut().unwrap().remove("categories_id");
    missing_lists.as_object_mut().unwrap().remove("genres_id");

    let mut bad_year = video_body(&[c1], &[g1]);
    bad_year["year_launched"] = json!(99);

    let mut bad_rating = video_body(&[c1], &[g1]);
    bad_rating["rating"] = json!("21");

    let mut empty_title = video_body(&[c1], &[g1]);
    empty_title["title"] = json!("");

    for body in [missing_lists, bad_year, bad_rating, empty_title, video_body(&[], &[g1])] {
        let req = test::TestRequest::post()
            .uri("/api/videos")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    assert_eq!(common::count(&pool, "SELECT COUNT(*) FROM videos").await, 0);
}

#[sqlx::test]
async fn test_video_update_unknown_id(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::setup_test_app(pool.clone(), common::local_store(dir.path()).await, UploadLimits::default()).await;
    let c1 = common::create_category(&pool, "Action").await;
    let g1 = common::create_genre(&pool, "Thriller", &[c1]).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/videos/{}", Uuid::new_v4()))
        .set_json(&video_body(&[c1], &[g1]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);

    assert_eq!(common::count(&pool, "SELECT COUNT(*) FROM category_video").await, 0);
    assert_eq!(common::count(&pool, "SELECT COUNT(*) FROM genre_video").await, 0);
}

#[sqlx::test]
async fn test_video_soft_delete_and_restore(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::setup_test_app(pool.clone(), common::local_store(dir.path()).await, UploadLimits::default()).await;
    let id = common::create_video(&pool, "Old Reel").await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/videos/{}", id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), http::StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/videos/{}", id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), http::StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/videos").to_request();
    let body = test::read_body(test::call_service(&app, req).await).await;
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert!(listed.is_empty());

    let req = test::TestRequest::get()
        .uri("/api/videos?with_trashed=true")
        .to_request();
    let body = test::read_body(test::call_service(&app, req).await).await;
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed.len(), 1);
    assert!(!listed[0]["deleted_at"].is_null());

    let req = test::TestRequest::post()
        .uri(&format!("/api/videos/{}/restore", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get()
        .uri(&format!("/api/videos/{}", id))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());
}

#[sqlx::test]
async fn test_video_hides_deleted_relations(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::setup_test_app(pool.clone(), common::local_store(dir.path()).await, UploadLimits::default()).await;
    let c1 = common::create_category(&pool, "Action").await;
    let c2 = common::create_category(&pool, "Drama").await;
    let g1 = common::create_genre(&pool, "Thriller", &[c1, c2]).await;

    let req = test::TestRequest::post()
        .uri("/api/videos")
        .set_json(&video_body(&[c1, c2], &[g1]))
        .to_request();
    let body = test::read_body(test::call_service(&app, req).await).await;
    let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    common::soft_delete(&pool, "categories", c2).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/videos/{}", id))
        .to_request();
    let body = test::read_body(test::call_service(&app, req).await).await;
    let shown: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ids(&shown, "categories"), vec![c1]);

    // The join row itself survives the soft delete
    assert_eq!(
        common::linked(&pool, "category_video", "video_id", "category_id", id).await,
        common::sorted(vec![c1, c2])
    );
}

#[sqlx::test]
async fn test_video_reports_every_invalid_field(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::setup_test_app(pool.clone(), common::local_store(dir.path()).await, UploadLimits::default()).await;
    let id = common::create_video(&pool, "Old Reel").await;

    let body = json!({
        "title": "",
        "description": "",
        "year_launched": "s",
        "opened": "s",
        "rating": 0,
        "duration": "s",
        "categories_id": "",
        "genres_id": "",
    });

    let requests = [
        test::TestRequest::post().uri("/api/videos"),
        test::TestRequest::put().uri(&format!("/api/videos/{}", id)),
    ];
    for request in requests {
        let resp = test::call_service(&app, request.set_json(&body).to_request()).await;
        assert_eq!(resp.status(), http::StatusCode::UNPROCESSABLE_ENTITY);

        let body = test::read_body(resp).await;
        let errors: serde_json::Value = serde_json::from_slice(&body).unwrap();
        for field in [
            "title",
            "description",
            "year_launched",
            "opened",
            "rating",
            "duration",
            "categories_id",
            "genres_id",
        ] {
            assert!(errors["errors"][field].is_array(), "no error for {}", field);
        }
        assert_eq!(errors["errors"]["rating"][0], "The selected rating is invalid.");
        assert_eq!(errors["errors"]["year_launched"][0], "The year_launched must be an integer.");
        assert!(errors["errors"].get("body").is_none());
    }

    let title = sqlx::query_scalar::<_, String>("SELECT title FROM videos WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(title, "Old Reel");
}
