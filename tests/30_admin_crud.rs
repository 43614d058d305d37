// End-to-end CRUD flows through the generic view engine.
mod common;

use axum::http::{header, StatusCode};

use common::*;

#[tokio::test]
async fn create_redirects_to_list_and_list_shows_the_record() {
    let app = test_app();

    let response = member_post(&app, "/area/create", "name=Math").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert_eq!(location.as_deref(), Some("/area/"));

    let body = expect_template(
        member_get(&app, "/area/").await,
        "admin/area/list.html",
        StatusCode::OK,
    )
    .await;
    assert!(body.contains("Math"));
}

#[tokio::test]
async fn duplicate_create_redisplays_the_form_with_the_echoed_value() {
    let app = test_app();

    assert_eq!(
        member_post(&app, "/area/create", "name=Math").await.status(),
        StatusCode::FOUND
    );

    // Second submission with the same unique value: 200 redisplay, never a
    // transport-level client error.
    let body = expect_template(
        member_post(&app, "/area/create", "name=Math").await,
        "admin/area/create.html",
        StatusCode::OK,
    )
    .await;
    assert!(body.contains("error"));
    assert!(body.contains("Math"));
    assert!(body.contains("\"fields\":{\"name\":\"Math\"}"));
}

#[tokio::test]
async fn missing_required_field_redisplays_with_error() {
    let app = test_app();
    let body = expect_template(
        member_post(&app, "/projeto/create", "title=Site&initial_description=&final_description=done")
            .await,
        "admin/projeto/create.html",
        StatusCode::OK,
    )
    .await;
    assert!(body.contains("initial_description"));
    assert!(body.contains("Site"));
}

#[tokio::test]
async fn create_screen_for_duvida_lists_areas_for_the_selector() {
    let app = test_app();
    member_post(&app, "/area/create", "name=Math").await;

    let body = expect_template(
        member_get(&app, "/duvida/create").await,
        "admin/duvida/create.html",
        StatusCode::OK,
    )
    .await;
    assert!(body.contains("\"areas\""));
    assert!(body.contains("Math"));
}

#[tokio::test]
async fn duvida_with_dangling_area_reference_is_rejected_and_not_persisted() {
    let app = test_app();
    member_post(&app, "/area/create", "name=Math").await;

    let body = expect_template(
        member_post(&app, "/duvida/create", "title=How&body=Explain&area_id=99").await,
        "admin/duvida/create.html",
        StatusCode::OK,
    )
    .await;
    assert!(body.contains("error"));

    // Nothing persisted, area list unaffected.
    let duvidas = body_string(member_get(&app, "/duvida/").await).await;
    assert!(!duvidas.contains("How"));
    let areas = body_string(member_get(&app, "/area/").await).await;
    assert!(areas.contains("Math"));
}

#[tokio::test]
async fn duvida_with_existing_area_saves() {
    let app = test_app();
    member_post(&app, "/area/create", "name=Math").await;

    let response = member_post(&app, "/duvida/create", "title=How&body=Explain&area_id=1").await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let body = body_string(member_get(&app, "/duvida/").await).await;
    assert!(body.contains("How"));
}

#[tokio::test]
async fn detail_and_edit_routes_render_different_templates_for_the_same_id() {
    let app = test_app();
    member_post(&app, "/tag/create", "name=rust").await;

    let detail = expect_template(
        member_get(&app, "/tag/1/details").await,
        "admin/tag/details.html",
        StatusCode::OK,
    )
    .await;
    assert!(detail.contains("rust"));

    let edit = expect_template(
        member_get(&app, "/tag/1/edit").await,
        "admin/tag/edit.html",
        StatusCode::OK,
    )
    .await;
    assert!(edit.contains("rust"));
}

#[tokio::test]
async fn edit_screen_for_duvida_includes_the_area_selector() {
    let app = test_app();
    member_post(&app, "/area/create", "name=Math").await;
    member_post(&app, "/duvida/create", "title=How&body=Explain&area_id=1").await;

    let body = expect_template(
        member_get(&app, "/duvida/1/edit").await,
        "admin/duvida/edit.html",
        StatusCode::OK,
    )
    .await;
    assert!(body.contains("\"areas\""));
}

#[tokio::test]
async fn absent_ids_yield_404_on_detail_edit_and_update() {
    let app = test_app();
    let cookie = member_cookie();

    for (method, path, form) in [
        ("GET", "/tag/42/details", None),
        ("GET", "/tag/42/edit", None),
        ("POST", "/tag/42/edit", Some("name=rust")),
    ] {
        let response = request(&app, method, path, Some(&cookie), form).await;
        assert_eq!(
            response.status(),
            StatusCode::NOT_FOUND,
            "{} {} should 404",
            method,
            path
        );
    }
}

#[tokio::test]
async fn update_redirects_and_persists_the_new_value() {
    let app = test_app();
    member_post(&app, "/tag/create", "name=rust").await;

    let response = member_post(&app, "/tag/1/edit", "name=axum").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/tag/")
    );

    let body = body_string(member_get(&app, "/tag/").await).await;
    assert!(body.contains("axum"));
    assert!(!body.contains("rust"));
}

#[tokio::test]
async fn update_into_anothers_unique_value_redisplays_the_edit_form() {
    let app = test_app();
    member_post(&app, "/tag/create", "name=rust").await;
    member_post(&app, "/tag/create", "name=axum").await;

    let body = expect_template(
        member_post(&app, "/tag/2/edit", "name=rust").await,
        "admin/tag/edit.html",
        StatusCode::OK,
    )
    .await;
    assert!(body.contains("error"));
    assert!(body.contains("\"id\":2"));
    assert!(body.contains("rust"));
}

#[tokio::test]
async fn delete_removes_the_record_and_repeating_it_404s() {
    let app = test_app();
    let cookie = member_cookie();
    member_post(&app, "/tag/create", "name=rust").await;

    let response = request(&app, "DELETE", "/tag/1", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(member_get(&app, "/tag/").await).await;
    assert!(!body.contains("rust"));

    // Deleting a missing id is an error, not a no-op.
    let again = request(&app, "DELETE", "/tag/1", Some(&cookie), None).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn entities_are_isolated_per_route_segment() {
    let app = test_app();
    member_post(&app, "/area/create", "name=Math").await;
    member_post(&app, "/tag/create", "name=rust").await;

    let areas = body_string(member_get(&app, "/area/").await).await;
    assert!(areas.contains("Math") && !areas.contains("rust"));

    let tags = body_string(member_get(&app, "/tag/").await).await;
    assert!(tags.contains("rust") && !tags.contains("Math"));
}
