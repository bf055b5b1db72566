//! HTTP API tests driving the router in-process.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use common::TestApp;
use entities::store::Store;
use entities::types::NewStudyStep;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    // "OK" is not JSON, so the helper reports a null body.
    assert_eq!(response.0, StatusCode::OK);
}

#[tokio::test]
async fn test_signup_login_logout() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;

    let (status, body) = app.get("/api/v1/account", Some(&lizzy.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "lizzy");
    assert!(body["data"].get("password").is_none());

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/account/signup",
            None,
            Some(json!({ "username": "lizzy", "password": "another one" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["data"].is_null());

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/account/login",
            None,
            Some(json!({ "username": "lizzy", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/account/login",
            None,
            Some(json!({ "username": "lizzy", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["auth_token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 50);

    // Logging in replaces the previous token.
    let (status, _) = app.get("/api/v1/account", Some(&lizzy.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::POST, "/api/v1/account/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/api/v1/account", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_and_malformed_auth() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/v1/account", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");

    let (status, _) = app.get("/api/v1/texts", Some("not-a-real-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/v1/texts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["texts"], json!([]));
}

#[tokio::test]
async fn test_upload_registers_text_with_blank_slate() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    let content = "It is a truth universally acknowledged.";

    let (status, body) = app.upload(&lizzy.token, "Pride and Prejudice", content).await;
    assert_eq!(status, StatusCode::CREATED);
    let text = &body["data"]["text"];
    assert_eq!(text["title"], "Pride and Prejudice");
    assert_eq!(text["md5sum"], hex::encode(Sha256::digest(content.as_bytes())));
    assert_eq!(text["uploaded_by"], lizzy.id);
    assert_eq!(text["is_public"], false);
    assert_eq!(body["data"]["needs_processing"], true);
    let text_id = text["id"].as_i64().unwrap();
    let annotation_id = body["data"]["annotation_id"].as_i64().unwrap();

    let original = app
        .store
        .storage()
        .original_path(text["md5sum"].as_str().unwrap())
        .unwrap();
    assert_eq!(std::fs::read_to_string(original).unwrap(), content);

    let (status, body) = app
        .get(&format!("/api/v1/texts/{text_id}/annotations"), Some(&lizzy.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let annotations = body["data"].as_array().unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0]["annotation_id"], annotation_id);
    assert_eq!(annotations[0]["method"], "unannotated");
    assert!(annotations[0]["parent_annotation_id"].is_null());

    let (status, body) = app
        .get(&format!("/api/v1/texts/{text_id}/permissions"), Some(&lizzy.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["user_id"], lizzy.id);
    assert_eq!(body["data"][0]["permission"], 3);

    let owner_grant = app
        .store
        .get_annotation_permission(lizzy.id, annotation_id)
        .unwrap()
        .unwrap();
    assert_eq!(owner_grant.permission, entities::types::PermissionLevel::Owner);

    // Same content again: a new text row sharing the stored content.
    let (status, body) = app.upload(&lizzy.token, "Second copy", content).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(body["data"]["text"]["id"], text_id);
    assert_eq!(body["data"]["text"]["md5sum"], text["md5sum"]);

    let spooled: Vec<_> = std::fs::read_dir(app.config.upload_dir())
        .unwrap()
        .collect();
    assert!(spooled.is_empty());
}

#[tokio::test]
async fn test_upload_validation() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;

    let (status, _) = app.upload(&lizzy.token, "   ", "content").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.upload(&lizzy.token, "Empty", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_text_visibility() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    let jane = app.signup("jane").await;
    let (text_id, _) = app.upload_text(&lizzy, "Private", "secret words").await;
    let uri = format!("/api/v1/texts/{text_id}");

    let (status, _) = app.get(&uri, Some(&jane.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = app.get("/api/v1/texts", Some(&jane.token)).await;
    assert_eq!(body["data"]["texts"], json!([]));
    let (_, body) = app.get("/api/v1/texts", Some(&lizzy.token)).await;
    assert_eq!(body["data"]["texts"][0]["id"], text_id);
    assert_eq!(body["data"]["texts"][0]["annotation_count"], 1);
    assert_eq!(body["data"]["texts"][0]["permission"], 3);

    let (status, _) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&jane.token),
            Some(json!({ "is_public": true })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&lizzy.token),
            Some(json!({ "is_public": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_public"], true);
    assert_eq!(body["data"]["title"], "Private");

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/v1/texts", None).await;
    assert_eq!(body["data"]["texts"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/v1/texts/999", Some(&lizzy.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_text_listing_window() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    let mut ids = Vec::new();
    for n in 0..4 {
        let (id, _) = app
            .upload_text(&lizzy, &format!("Text {n}"), &format!("content {n}"))
            .await;
        ids.push(id);
    }

    let (_, body) = app
        .get(
            &format!("/api/v1/texts?start_id={}&count=2", ids[1]),
            Some(&lizzy.token),
        )
        .await;
    let page = &body["data"];
    let listed: Vec<i64> = page["texts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(listed, vec![ids[1], ids[2]]);
    assert_eq!(page["upload_count"], 4);
    assert_eq!(page["start_id"], ids[1]);
    assert_eq!(page["end_id"], ids[2]);
    assert_eq!(page["returned_count"], 2);
}

#[tokio::test]
async fn test_text_listing_count_skips_unreadable_texts() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    app.upload_text(&lizzy, "Private", "private words").await;
    let (public_id, _) = app.upload_text(&lizzy, "Public", "public words").await;
    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/texts/{public_id}"),
            Some(&lizzy.token),
            Some(json!({ "is_public": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/v1/texts?count=1", None).await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["returned_count"], 1);
    assert_eq!(page["texts"][0]["id"], public_id);
    assert_eq!(page["end_id"], public_id);
    assert_eq!(page["upload_count"], 2);

    let (_, body) = app.get("/api/v1/texts?start_id=999", None).await;
    assert_eq!(body["data"]["returned_count"], 0);
    assert_eq!(body["data"]["end_id"], Value::Null);
}

#[tokio::test]
async fn test_update_text_trims_title() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    let (text_id, _) = app.upload_text(&lizzy, "  Persuasion  ", "words").await;
    let uri = format!("/api/v1/texts/{text_id}");

    let (_, body) = app.get(&uri, Some(&lizzy.token)).await;
    assert_eq!(body["data"]["title"], "Persuasion");

    let (status, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&lizzy.token),
            Some(json!({ "title": "  Emma \n" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Emma");

    let (status, _) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&lizzy.token),
            Some(json!({ "title": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_text_permission_management() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    let jane = app.signup("jane").await;
    let (text_id, _) = app.upload_text(&lizzy, "Shared", "shared words").await;
    let permissions = format!("/api/v1/texts/{text_id}/permissions");
    let text_uri = format!("/api/v1/texts/{text_id}");

    let (status, body) = app
        .request(
            Method::POST,
            &permissions,
            Some(&lizzy.token),
            Some(json!({ "username": "jane", "permission": "write" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user_id"], jane.id);
    assert_eq!(body["data"]["permission"], 2);
    let permission_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .request(
            Method::POST,
            &permissions,
            Some(&lizzy.token),
            Some(json!({ "user_id": jane.id, "permission": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request(
            Method::POST,
            &permissions,
            Some(&lizzy.token),
            Some(json!({ "username": "jane", "permission": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(
            Method::PATCH,
            &text_uri,
            Some(&jane.token),
            Some(json!({ "title": "Renamed by Jane" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Renamed by Jane");

    // WRITE does not allow managing permissions.
    let (status, _) = app.get(&permissions, Some(&jane.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("{permissions}/{permission_id}"),
            Some(&lizzy.token),
            Some(json!({ "permission": "read" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["permission"], 1);

    let (status, _) = app
        .request(
            Method::PATCH,
            &text_uri,
            Some(&jane.token),
            Some(json!({ "title": "Again" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&text_uri, Some(&jane.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("{permissions}/{permission_id}"),
            Some(&lizzy.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&text_uri, Some(&jane.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("{permissions}/{permission_id}"),
            Some(&lizzy.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fork_and_patch_annotation() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    let jane = app.signup("jane").await;
    let (text_id, blank_id) = app.upload_text(&lizzy, "Novel", "Elizabeth met Darcy.").await;

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/texts/{text_id}/annotations/{blank_id}?label=draft"),
            Some(&lizzy.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["parent_annotation_id"], blank_id);
    assert_eq!(body["data"]["method"], "manual");
    assert_eq!(body["data"]["label"], "draft");
    assert_eq!(body["data"]["annotation"]["last_entity_id"], 0);
    let annotation_id = body["data"]["annotation_id"].as_i64().unwrap();
    let uri = format!("/api/v1/annotations/{annotation_id}");

    let (status, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&lizzy.token),
            Some(json!({
                "patch": {
                    "last_entity_id": 2,
                    "entities": {
                        "1": { "name": "Elizabeth" },
                        "2": { "name": "Darcy" }
                    },
                    "locations": {
                        "1": { "start": 0, "end": 0, "entity_id": "1" }
                    }
                }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let graph = &body["data"]["annotation"];
    assert_eq!(graph["last_entity_id"], 2);
    assert_eq!(graph["entities"]["1"]["name"], "Elizabeth");
    assert_eq!(graph["locations"]["1"]["entity_id"], "1");

    let (status, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&lizzy.token),
            Some(json!({
                "patch": { "entities": { "2": "DELETE" } },
                "label": "first pass"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["annotation"]["entities"].get("2").is_none());
    assert_eq!(body["data"]["label"], "first pass");

    let (status, _) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&lizzy.token),
            Some(json!({ "patch": { "entities": { "3": 42 } } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(Method::PATCH, &uri, Some(&lizzy.token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The parent is untouched.
    let (_, body) = app
        .get(&format!("/api/v1/annotations/{blank_id}"), Some(&lizzy.token))
        .await;
    assert_eq!(body["data"]["annotation"]["entities"], json!({}));

    let (status, _) = app.get(&uri, Some(&jane.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/v1/annotations/999", Some(&lizzy.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/v1/annotations", Some(&jane.token)).await;
    assert_eq!(body["data"], json!([]));
    let (_, body) = app.get("/api/v1/annotations", Some(&lizzy.token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let (_, body) = app.get("/api/v1/account/annotations", Some(&lizzy.token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let (_, body) = app.get("/api/v1/account/annotations", Some(&jane.token)).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_annotation_sharing() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    let jane = app.signup("jane").await;
    let (_, annotation_id) = app.upload_text(&lizzy, "Novel", "words").await;
    let uri = format!("/api/v1/annotations/{annotation_id}");
    let permissions = format!("{uri}/permissions");

    let (status, _) = app
        .request(
            Method::POST,
            &permissions,
            Some(&jane.token),
            Some(json!({ "username": "jane", "permission": "owner" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::POST,
            &permissions,
            Some(&lizzy.token),
            Some(json!({ "username": "jane", "permission": "write" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&jane.token),
            Some(json!({ "is_public": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_public"], true);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&permissions, Some(&lizzy.token)).await;
    assert_eq!(status, StatusCode::OK);
    // The owner grant from the upload plus Jane's.
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_text_tokens() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    let (text_id, _) = app.upload_text(&lizzy, "Novel", "Elizabeth met Darcy.").await;
    let uri = format!("/api/v1/texts/{text_id}/tokens");

    let (status, _) = app.get(&uri, Some(&lizzy.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let path = app.store.text_content_path(text_id).unwrap().unwrap();
    std::fs::write(&path, r#"{"tokens":["Elizabeth","met","Darcy","."]}"#).unwrap();

    let (status, body) = app.get(&uri, Some(&lizzy.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tokens"][2], "Darcy");
}

#[tokio::test]
async fn test_study_steps() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    let jane = app.signup("jane").await;
    let (_, base_id) = app.upload_text(&lizzy, "Study text", "words").await;

    let store = &app.store;
    let study_id = store.add_study("Reading study", Some(Utc::now()), None).unwrap();
    let group_id = store.add_study_group(study_id, Some("A")).unwrap();
    let first = store
        .add_study_step(&NewStudyStep {
            study_id,
            label: "Annotate",
            base_annotation_id: Some(base_id),
            url: None,
        })
        .unwrap();
    let second = store
        .add_study_step(&NewStudyStep {
            study_id,
            label: "Survey",
            base_annotation_id: None,
            url: Some("https://example.org/survey"),
        })
        .unwrap();
    store.add_study_step_ordering(group_id, second, 2).unwrap();
    store.add_study_step_ordering(group_id, first, 1).unwrap();
    let participant = store
        .add_study_participant(study_id, lizzy.id, Some(group_id))
        .unwrap();
    store
        .add_study_participant_step(participant, first, Some(base_id))
        .unwrap();

    let (status, body) = app.get("/api/v1/studies", Some(&lizzy.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Reading study");
    assert_eq!(body["data"][0]["group_id"], group_id);

    let (status, body) = app
        .get(&format!("/api/v1/studies/{study_id}"), Some(&lizzy.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let steps = body["data"]["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["label"], "Annotate");
    assert_eq!(steps[0]["annotation_id"], base_id);
    assert_eq!(steps[1]["label"], "Survey");
    assert!(steps[1]["annotation_id"].is_null());

    let (_, body) = app.get("/api/v1/studies", Some(&jane.token)).await;
    assert_eq!(body["data"], json!([]));
    let (status, _) = app
        .get(&format!("/api/v1/studies/{study_id}"), Some(&jane.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/v1/studies", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_record_study_data() {
    let app = TestApp::new();
    let lizzy = app.signup("lizzy").await;
    let jane = app.signup("jane").await;

    let store = &app.store;
    let study_id = store.add_study("Logged study", None, None).unwrap();
    let group_id = store.add_study_group(study_id, Some("A")).unwrap();
    let step = store
        .add_study_step(&NewStudyStep {
            study_id,
            label: "Annotate",
            base_annotation_id: None,
            url: None,
        })
        .unwrap();
    let unordered = store
        .add_study_step(&NewStudyStep {
            study_id,
            label: "Hidden",
            base_annotation_id: None,
            url: None,
        })
        .unwrap();
    store.add_study_step_ordering(group_id, step, 1).unwrap();
    store
        .add_study_participant(study_id, lizzy.id, Some(group_id))
        .unwrap();

    let uri = format!("/api/v1/studies/{study_id}/steps/{step}/data");
    let events = json!({ "data": [
        { "name": "pageload", "timestamp": 1590000000000_i64 },
        { "name": "blur", "timestamp": 1590000002000_i64 }
    ]});

    let (status, body) = app
        .request(Method::POST, &uri, Some(&lizzy.token), Some(events.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let study_data_id = body["data"]["study_data_id"].as_i64().unwrap();

    let records = store.get_study_data(study_id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].study_data_id, study_data_id);
    assert_eq!(records[0].participant_username, "lizzy");
    let names: Vec<_> = records[0]
        .events()
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec![Some(json!("pageload")), Some(json!("blur"))]);

    // Not a participant.
    let (status, _) = app
        .request(Method::POST, &uri, Some(&jane.token), Some(events.clone()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A step outside the participant's ordering.
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/studies/{study_id}/steps/{unordered}/data"),
            Some(&lizzy.token),
            Some(events.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(Method::POST, &uri, Some(&lizzy.token), Some(json!({ "data": [] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.request(Method::POST, &uri, None, Some(events)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.get_study_data(study_id).unwrap().len(), 1);
}
