//! End-to-end HTTP tests over the assembled router: auth, the ingestion
//! lifecycle, review scheduling, quiz grading, chat gating, and quotas.

#[path = "helpers/mod.rs"]
mod helpers;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use glossa_core::models::{LearningStage, MaterialStatus, SubscriptionStatus};
use glossa_db::test_support::fixtures::{
    create_test_flashcard, create_test_material, create_test_subscription,
};

use helpers::{api_path, bearer_for, setup_test_app, TestApp};

/// Poll the status endpoint until the material settles, mirroring how the
/// client polls during processing.
async fn wait_for_settled(app: &TestApp, token: &str, material_id: Uuid) -> String {
    for _ in 0..200 {
        let response = app
            .client()
            .get(&api_path(&format!("/materials/{}/status", material_id)))
            .authorization_bearer(token)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: Value = response.json();
        let status = body["processing_status"].as_str().unwrap().to_string();
        if status == "completed" || status == "failed" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("material {} never settled", material_id);
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = setup_test_app();

    let response = app.client().get(&api_path("/materials")).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .client()
        .get(&api_path("/materials"))
        .authorization_bearer("not-a-jwt")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    // Liveness stays public.
    let response = app.client().get("/health/live").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_echoes_token_identity() {
    let app = setup_test_app();
    let user_id = Uuid::new_v4();

    let response = app
        .client()
        .get(&api_path("/auth/me"))
        .authorization_bearer(&bearer_for(user_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["id"].as_str().unwrap(), user_id.to_string());
    assert_eq!(body["email"], "ana@example.com");
}

#[tokio::test]
async fn test_material_ingestion_lifecycle() {
    let app = setup_test_app();
    let user_id = Uuid::new_v4();
    let token = bearer_for(user_id);

    // Register a YouTube material; it starts out pending with no cards.
    let response = app
        .client()
        .post(&api_path("/materials/upload/youtube"))
        .authorization_bearer(&token)
        .json(&json!({
            "title": "Spanish podcast ep. 12",
            "url": "https://www.youtube.com/watch?v=abc123"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let material: Value = response.json();
    assert_eq!(material["processing_status"], "pending");
    assert_eq!(material["source_type"], "youtube");
    assert!(material["processed_text"].is_null());
    let material_id: Uuid = material["id"].as_str().unwrap().parse().unwrap();

    // Kick off ingestion; the request returns as soon as the claim lands.
    let response = app
        .client()
        .post(&api_path(&format!("/materials/{}/process", material_id)))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);

    // A second start while processing is an invalid transition, not a
    // second extraction.
    let response = app
        .client()
        .post(&api_path(&format!("/materials/{}/process", material_id)))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let settled = wait_for_settled(&app, &token, material_id).await;
    assert_eq!(settled, "completed");

    // Completed material carries its text and the extracted cards at stage 0.
    let response = app
        .client()
        .get(&api_path(&format!("/materials/{}", material_id)))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let detail: Value = response.json();
    assert_eq!(detail["processing_status"], "completed");
    assert!(detail["processed_text"].as_str().is_some());
    let flashcards = detail["flashcards"].as_array().unwrap();
    assert_eq!(flashcards.len(), 2);
    for card in flashcards {
        assert_eq!(card["learning_stage"], 0);
    }

    // Fresh cards are due immediately.
    let response = app
        .client()
        .get(&api_path("/cards/review"))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let due: Value = response.json();
    assert_eq!(due.as_array().unwrap().len(), 2);

    // Completed is terminal: no restart without delete-and-recreate.
    let response = app
        .client()
        .post(&api_path(&format!("/materials/{}/process", material_id)))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_failed_ingestion_is_observed_via_polling_and_retryable() {
    let app = setup_test_app();
    let user_id = Uuid::new_v4();
    let token = bearer_for(user_id);
    app.generator.set_failure("model unavailable");

    let response = app
        .client()
        .post(&api_path("/materials/upload/youtube"))
        .authorization_bearer(&token)
        .json(&json!({
            "title": "Noticias",
            "url": "https://www.youtube.com/watch?v=xyz"
        }))
        .await;
    let material: Value = response.json();
    let material_id: Uuid = material["id"].as_str().unwrap().parse().unwrap();

    // The trigger call itself succeeds; the failure only shows up in polling.
    let response = app
        .client()
        .post(&api_path(&format!("/materials/{}/process", material_id)))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    assert_eq!(wait_for_settled(&app, &token, material_id).await, "failed");

    // No partial cards from the failed attempt.
    assert_eq!(app.cards.card_count(), 0);

    // An explicit retry after the provider recovers goes through.
    app.generator.clear_failure();
    let response = app
        .client()
        .post(&api_path(&format!("/materials/{}/process", material_id)))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    assert_eq!(wait_for_settled(&app, &token, material_id).await, "completed");
    assert_eq!(app.cards.card_count(), 2);
}

#[tokio::test]
async fn test_review_know_advances_and_forgot_resets() {
    let app = setup_test_app();
    let user_id = Uuid::new_v4();
    let token = bearer_for(user_id);

    let material = create_test_material(user_id, MaterialStatus::Completed);
    let card = create_test_flashcard(user_id, material.id, LearningStage::Learning2);
    let card_id = card.id;
    app.materials.add_material(material);
    app.cards.add_card(card);

    let response = app
        .client()
        .post(&api_path(&format!("/cards/{}/review", card_id)))
        .authorization_bearer(&token)
        .json(&json!({ "quality": "know" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let outcome: Value = response.json();
    assert_eq!(outcome["learning_stage"], 3);

    let response = app
        .client()
        .post(&api_path(&format!("/cards/{}/review", card_id)))
        .authorization_bearer(&token)
        .json(&json!({ "quality": "forgot" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let outcome: Value = response.json();
    assert_eq!(outcome["learning_stage"], 0);

    // Another user cannot review the card, and cannot tell it exists.
    let response = app
        .client()
        .post(&api_path(&format!("/cards/{}/review", card_id)))
        .authorization_bearer(&bearer_for(Uuid::new_v4()))
        .json(&json!({ "quality": "know" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_card_stats_bucket_boundaries() {
    let app = setup_test_app();
    let user_id = Uuid::new_v4();
    let token = bearer_for(user_id);

    let material = create_test_material(user_id, MaterialStatus::Completed);
    let material_id = material.id;
    app.materials.add_material(material);
    // One card per stage: only 1-2 count as learning, 3-4 fall outside
    // every named bucket.
    for stage in [
        LearningStage::New,
        LearningStage::Learning1,
        LearningStage::Learning2,
        LearningStage::Review1,
        LearningStage::Review2,
        LearningStage::Mastered,
    ] {
        app.cards.add_card(create_test_flashcard(user_id, material_id, stage));
    }

    let response = app
        .client()
        .get(&api_path("/cards/stats"))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let stats: Value = response.json();
    assert_eq!(stats["total_cards"], 6);
    assert_eq!(stats["new_cards"], 1);
    assert_eq!(stats["learning"], 2);
    assert_eq!(stats["mastered"], 1);
    assert_eq!(stats["due_for_review"], 6);
}

#[tokio::test]
async fn test_quiz_generation_grading_and_single_submission() {
    let app = setup_test_app();
    let user_id = Uuid::new_v4();
    let token = bearer_for(user_id);

    let material = create_test_material(user_id, MaterialStatus::Completed);
    let material_id = material.id;
    app.materials.add_material(material);

    let response = app
        .client()
        .post(&api_path("/quizzes"))
        .authorization_bearer(&token)
        .json(&json!({ "material_id": material_id, "num_questions": 5 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let quiz: Value = response.json();
    let quiz_id: Uuid = quiz["id"].as_str().unwrap().parse().unwrap();
    assert_eq!(quiz["total_questions"], 5);
    assert!(quiz["score"].is_null());
    assert!(quiz["completed_at"].is_null());

    // Wrong answer count is rejected before any grading happens.
    let response = app
        .client()
        .post(&api_path(&format!("/quizzes/{}/submit", quiz_id)))
        .authorization_bearer(&token)
        .json(&json!({ "answers": ["meaning 0"] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    // The scripted quiz cycles multiple-choice, true/false, fill-blank.
    // Three answers match after trim + case folding, two miss.
    let response = app
        .client()
        .post(&api_path(&format!("/quizzes/{}/submit", quiz_id)))
        .authorization_bearer(&token)
        .json(&json!({
            "answers": ["  Meaning 0 ", "TRUE", "gato", "wrong", "false"]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let result: Value = response.json();
    assert_eq!(result["score"], 3);
    assert_eq!(result["total_questions"], 5);
    let results = result["results"].as_array().unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results[0]["is_correct"], true);
    assert_eq!(results[3]["is_correct"], false);
    assert!(results[4]["explanation"].as_str().is_some());

    // Second submission is rejected; the stored score does not move.
    let response = app
        .client()
        .post(&api_path(&format!("/quizzes/{}/submit", quiz_id)))
        .authorization_bearer(&token)
        .json(&json!({
            "answers": ["meaning 0", "true", "gato", "meaning 3", "true"]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "ALREADY_SUBMITTED");

    let response = app
        .client()
        .get(&api_path(&format!("/quizzes/{}", quiz_id)))
        .authorization_bearer(&token)
        .await;
    let quiz: Value = response.json();
    assert_eq!(quiz["score"], 3);
    assert!(quiz["completed_at"].as_str().is_some());
}

#[tokio::test]
async fn test_quiz_requires_completed_material_and_no_partial_on_failure() {
    let app = setup_test_app();
    let user_id = Uuid::new_v4();
    let token = bearer_for(user_id);

    // Pending material: generation refused up front.
    let pending = create_test_material(user_id, MaterialStatus::Pending);
    let pending_id = pending.id;
    app.materials.add_material(pending);

    let response = app
        .client()
        .post(&api_path("/quizzes"))
        .authorization_bearer(&token)
        .json(&json!({ "material_id": pending_id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    // Collaborator failure surfaces as 502 and persists nothing.
    let completed = create_test_material(user_id, MaterialStatus::Completed);
    let completed_id = completed.id;
    app.materials.add_material(completed);
    app.generator.set_failure("model unavailable");

    let response = app
        .client()
        .post(&api_path("/quizzes"))
        .authorization_bearer(&token)
        .json(&json!({ "material_id": completed_id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);

    app.generator.clear_failure();
    let response = app
        .client()
        .get(&api_path(&format!("/quizzes/material/{}", completed_id)))
        .authorization_bearer(&token)
        .await;
    let quizzes: Value = response.json();
    assert_eq!(quizzes.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_free_tier_weekly_upload_quota() {
    let app = setup_test_app();
    let user_id = Uuid::new_v4();
    let token = bearer_for(user_id);
    app.subscriptions
        .add_subscription(create_test_subscription(user_id, SubscriptionStatus::Free));

    let body = json!({
        "title": "Cuentos",
        "url": "https://example.com/cuentos"
    });

    let response = app
        .client()
        .post(&api_path("/materials/upload/youtube"))
        .authorization_bearer(&token)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let response = app
        .client()
        .post(&api_path("/materials/upload/youtube"))
        .authorization_bearer(&token)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::PAYMENT_REQUIRED);
    let error: Value = response.json();
    assert_eq!(error["code"], "QUOTA_EXCEEDED");

    // The denied attempt created nothing.
    let response = app
        .client()
        .get(&api_path("/materials"))
        .authorization_bearer(&token)
        .await;
    let materials: Value = response.json();
    assert_eq!(materials.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_chat_gated_by_tier_and_appends_exchange() {
    let app = setup_test_app();
    let user_id = Uuid::new_v4();
    let token = bearer_for(user_id);

    let material = create_test_material(user_id, MaterialStatus::Completed);
    let material_id = material.id;
    app.materials.add_material(material);
    app.subscriptions
        .add_subscription(create_test_subscription(user_id, SubscriptionStatus::Free));

    let response = app
        .client()
        .post(&api_path(&format!("/chat/{}", material_id)))
        .authorization_bearer(&token)
        .json(&json!({ "message": "What does 'el gato' mean?" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    // After an upgrade the same call succeeds and persists both turns.
    app.subscriptions.add_subscription(create_test_subscription(
        user_id,
        SubscriptionStatus::Active,
    ));

    let response = app
        .client()
        .post(&api_path(&format!("/chat/{}", material_id)))
        .authorization_bearer(&token)
        .json(&json!({ "message": "What does 'el gato' mean?" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let exchange: Value = response.json();
    assert_eq!(exchange["user_message"]["role"], "user");
    assert_eq!(exchange["assistant_message"]["role"], "assistant");

    let response = app
        .client()
        .get(&api_path(&format!("/chat/{}", material_id)))
        .authorization_bearer(&token)
        .await;
    let history: Value = response.json();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[1]["role"], "assistant");
}

#[tokio::test]
async fn test_ownership_is_enforced_without_leaking_existence() {
    let app = setup_test_app();
    let owner = Uuid::new_v4();
    let stranger_token = bearer_for(Uuid::new_v4());

    let material = create_test_material(owner, MaterialStatus::Completed);
    let material_id = material.id;
    app.materials.add_material(material);

    for path in [
        format!("/materials/{}", material_id),
        format!("/materials/{}/status", material_id),
        format!("/chat/{}", material_id),
    ] {
        let response = app
            .client()
            .get(&api_path(&path))
            .authorization_bearer(&stranger_token)
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{}", path);
    }

    let response = app
        .client()
        .delete(&api_path(&format!("/materials/{}", material_id)))
        .authorization_bearer(&stranger_token)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_material_cascades_to_cards() {
    let app = setup_test_app();
    let user_id = Uuid::new_v4();
    let token = bearer_for(user_id);

    let material = create_test_material(user_id, MaterialStatus::Completed);
    let material_id = material.id;
    app.materials.add_material(material);
    app.cards.add_card(create_test_flashcard(
        user_id,
        material_id,
        LearningStage::New,
    ));

    let response = app
        .client()
        .delete(&api_path(&format!("/materials/{}", material_id)))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert_eq!(app.cards.card_count(), 0);
}

#[tokio::test]
async fn test_first_touch_provisions_trial_subscription() {
    let app = setup_test_app();
    let token = bearer_for(Uuid::new_v4());

    let response = app
        .client()
        .get(&api_path("/payments/subscription"))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let subscription: Value = response.json();
    assert_eq!(subscription["status"], "trialing");
    assert_eq!(subscription["upload_limit"], 10);
    assert_eq!(subscription["quizzes_per_material_limit"], 10);
    assert_eq!(subscription["uploads_this_week"], 0);
}
