//! End-to-end scenarios against a live redis, driving the engine directly
//! (no HTTP layer) the way `engine::mod`'s own doc comment describes it:
//! `new_request`/`cancel_request`/`get_resource_req_resp` are the only
//! entry points a caller needs.

mod common;

use std::sync::Arc;

use qrm::engine::Engine;
use qrm::models::{ResourcesByName, ResourcesByTags, ResourcesRequest};

/// S1: a single-name request is filled immediately against idle resources
#[tokio::test]
async fn s1_single_name_fill() {
    let shared = Arc::new(common::shared("s1").await);
    common::seed_resources(&shared, 3).await;

    let request = ResourcesRequest {
        names: vec![ResourcesByName {
            names: vec!["r1".to_owned()],
            count: 1,
        }],
        token: "t".to_owned(),
        ..ResourcesRequest::default()
    };
    let response = Engine::new_request(&shared, request).await.unwrap();
    assert!(!response.request_complete);
    assert!(response.token.starts_with("t_"));

    let filled = common::wait_for_completion(&shared, &response.token, 50).await;
    assert!(filled.is_valid);
    assert_eq!(filled.names, vec!["r1".to_owned()]);

    let status = Engine::get_resource_req_resp(&shared, &response.token)
        .await
        .unwrap();
    assert_eq!(status.names, vec!["r1".to_owned()]);

    let r1 = qrm::backends::resources::get_by_name("r1", &shared)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(r1.token.as_deref(), Some(response.token.as_str()));
}

/// S2: a second requester queues behind the first, then is released once
/// the first token is cancelled
#[tokio::test]
async fn s2_queueing_and_cancel_releases_next() {
    let shared = Arc::new(common::shared("s2").await);
    common::seed_resources(&shared, 3).await;

    let first = Engine::new_request(
        &shared,
        ResourcesRequest {
            names: vec![ResourcesByName {
                names: vec!["r1".to_owned()],
                count: 1,
            }],
            token: "t".to_owned(),
            ..ResourcesRequest::default()
        },
    )
    .await
    .unwrap();
    common::wait_for_completion(&shared, &first.token, 50).await;

    let second = Engine::new_request(
        &shared,
        ResourcesRequest {
            names: vec![ResourcesByName {
                names: vec!["r1".to_owned()],
                count: 1,
            }],
            token: "u".to_owned(),
            ..ResourcesRequest::default()
        },
    )
    .await
    .unwrap();
    assert!(!second.request_complete);

    let pending = Engine::get_resource_req_resp(&shared, &second.token)
        .await
        .unwrap();
    assert!(!pending.request_complete);
    assert!(pending.names.is_empty());

    Engine::cancel_request(&shared, &first.token).await.unwrap();

    let released = common::wait_for_completion(&shared, &second.token, 50).await;
    assert_eq!(released.names, vec!["r1".to_owned()]);
}

/// S3: a partial fill blocks a third requester until the partial holder is
/// cancelled
#[tokio::test]
async fn s3_partial_fill_blocks_third_request() {
    let shared = Arc::new(common::shared("s3").await);
    common::seed_resources(&shared, 3).await;

    let t = Engine::new_request(
        &shared,
        ResourcesRequest {
            names: vec![ResourcesByName {
                names: vec!["r1".to_owned()],
                count: 1,
            }],
            token: "t".to_owned(),
            ..ResourcesRequest::default()
        },
    )
    .await
    .unwrap();
    common::wait_for_completion(&shared, &t.token, 50).await;

    let u = Engine::new_request(
        &shared,
        ResourcesRequest {
            names: vec![ResourcesByName {
                names: vec!["r1".to_owned(), "r2".to_owned()],
                count: 2,
            }],
            token: "u".to_owned(),
            ..ResourcesRequest::default()
        },
    )
    .await
    .unwrap();

    // u partially fills on r2 but can't proceed past r1 until t releases it
    for _ in 0..50 {
        if qrm::backends::resources::get_by_name("r2", &shared)
            .await
            .unwrap()
            .and_then(|resource| resource.token)
            .as_deref()
            == Some(u.token.as_str())
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    let v = Engine::new_request(
        &shared,
        ResourcesRequest {
            names: vec![ResourcesByName {
                names: vec!["r2".to_owned()],
                count: 1,
            }],
            token: "v".to_owned(),
            ..ResourcesRequest::default()
        },
    )
    .await
    .unwrap();
    let v_pending = Engine::get_resource_req_resp(&shared, &v.token).await.unwrap();
    assert!(!v_pending.request_complete);

    Engine::cancel_request(&shared, &u.token).await.unwrap();

    let v_done = common::wait_for_completion(&shared, &v.token, 50).await;
    assert_eq!(v_done.names, vec!["r2".to_owned()]);
}

/// S4: a tag-ordered request's final `names` follow the order the tag
/// groups were submitted in, not fill order
#[tokio::test]
async fn s4_tag_response_ordering() {
    let shared = Arc::new(common::shared("s4").await);
    common::seed_resources(&shared, 3).await;
    common::tag(&shared, "r1", "A").await;
    common::tag(&shared, "r2", "B").await;
    common::tag(&shared, "r3", "A").await;

    let response = Engine::new_request(
        &shared,
        ResourcesRequest {
            tags: vec![
                ResourcesByTags {
                    tags: vec!["B".to_owned()],
                    count: 1,
                },
                ResourcesByTags {
                    tags: vec!["A".to_owned()],
                    count: 1,
                },
            ],
            token: "w".to_owned(),
            ..ResourcesRequest::default()
        },
    )
    .await
    .unwrap();
    let filled = common::wait_for_completion(&shared, &response.token, 50).await;
    assert_eq!(filled.names, vec!["r2".to_owned(), "r1".to_owned()]);
}

/// S5: resubmitting the same by-name request with an already-valid token
/// returns immediately, with no date suffix and no worker spawned
#[tokio::test]
async fn s5_token_refresh() {
    let shared = Arc::new(common::shared("s5").await);
    common::seed_resources(&shared, 3).await;

    let request = ResourcesRequest {
        names: vec![ResourcesByName {
            names: vec!["r1".to_owned(), "r2".to_owned()],
            count: 2,
        }],
        token: "t".to_owned(),
        ..ResourcesRequest::default()
    };
    let first = Engine::new_request(&shared, request.clone()).await.unwrap();
    common::wait_for_completion(&shared, &first.token, 50).await;

    let refresh = Engine::new_request(
        &shared,
        ResourcesRequest {
            token: "t".to_owned(),
            ..request
        },
    )
    .await
    .unwrap();
    assert!(refresh.request_complete);
    assert_eq!(refresh.token, "t");
    let mut names = refresh.names.clone();
    names.sort();
    assert_eq!(names, vec!["r1".to_owned(), "r2".to_owned()]);
}

/// S6: a request for a tag with no matching resources is invalid
#[tokio::test]
async fn s6_validation_missing_tag() {
    let shared = Arc::new(common::shared("s6").await);
    common::seed_resources(&shared, 3).await;

    let response = Engine::new_request(
        &shared,
        ResourcesRequest {
            tags: vec![ResourcesByTags {
                tags: vec!["ghost".to_owned()],
                count: 1,
            }],
            token: "x".to_owned(),
            ..ResourcesRequest::default()
        },
    )
    .await
    .unwrap();
    assert!(!response.is_valid);
    assert!(response
        .message
        .as_deref()
        .unwrap_or_default()
        .contains("no matched resources for tags"));
}

/// Invariant 3: a cancelled token disappears from open requests and
/// last-seen bookkeeping
#[tokio::test]
async fn cancel_clears_bookkeeping() {
    let shared = Arc::new(common::shared("cancel-bookkeeping").await);
    common::seed_resources(&shared, 1).await;

    let response = Engine::new_request(
        &shared,
        ResourcesRequest {
            names: vec![ResourcesByName {
                names: vec!["r1".to_owned()],
                count: 1,
            }],
            token: "t".to_owned(),
            auto_managed: true,
            ..ResourcesRequest::default()
        },
    )
    .await
    .unwrap();
    common::wait_for_completion(&shared, &response.token, 50).await;

    Engine::cancel_request(&shared, &response.token).await.unwrap();

    let last_update = qrm::backends::bookkeeping::get_all_tokens_last_update(&shared)
        .await
        .unwrap();
    assert!(!last_update.contains_key(&response.token));
    let auto_managed = qrm::backends::bookkeeping::get_all_auto_managed_tokens(&shared)
        .await
        .unwrap();
    assert!(!auto_managed.contains(&response.token));
}

/// Invariant 4: `GenerateToken` (reached via a completed fill) leaves
/// `GetTokenResources`/`IsRequestFilled` consistent with the grant
#[tokio::test]
async fn generate_token_leaves_resources_and_filled_consistent() {
    let shared = Arc::new(common::shared("invariant4").await);
    common::seed_resources(&shared, 1).await;

    let response = Engine::new_request(
        &shared,
        ResourcesRequest {
            names: vec![ResourcesByName {
                names: vec!["r1".to_owned()],
                count: 1,
            }],
            token: "t".to_owned(),
            ..ResourcesRequest::default()
        },
    )
    .await
    .unwrap();
    common::wait_for_completion(&shared, &response.token, 50).await;

    let owned = qrm::backends::tokens::get_token_resources(&response.token, &shared)
        .await
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].name, "r1");

    let filled = qrm::backends::tokens::is_request_filled(&response.token, &shared)
        .await
        .unwrap();
    assert!(filled);
}
