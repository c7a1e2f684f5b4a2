// End-to-end board behavior over the REST roster store, against a mocked
// data service.

use pipeline_board::board::{Board, MoveStatus};
use pipeline_board::config::RemoteConfig;
use pipeline_board::remote::RestRosterStore;
use pipeline_board::stages::{StageId, StageRegistry};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_for(server: &MockServer) -> Arc<RestRosterStore> {
    let config = RemoteConfig {
        base_url: server.uri(),
        api_key: Some("anon-key".to_string()),
        retry_delay_ms: 1,
        ..RemoteConfig::default()
    };
    Arc::new(RestRosterStore::new(&config).unwrap())
}

fn rows(stage_of_two: &str) -> serde_json::Value {
    json!([
        {"id": 1, "name": "Acme", "organization": "Acme SA", "email": "contato@acme.test",
         "pipeline_stage": "lead", "pipeline_position": 0},
        {"id": 2, "name": "Borges", "organization": null, "email": null,
         "pipeline_stage": stage_of_two, "pipeline_position": 0},
        {"id": 3, "name": "Cunha", "organization": null, "email": null,
         "pipeline_stage": "desconhecido", "pipeline_position": 4}
    ])
}

#[tokio::test]
async fn test_successful_move_patches_and_refetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows("lead")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows("proposta")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clients"))
        .and(query_param("id", "eq.2"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(json!({"pipeline_stage": "proposta", "pipeline_position": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2}])))
        .expect(1)
        .mount(&server)
        .await;

    let board = Board::load(store_for(&server), StageRegistry::default()).await.unwrap();

    // Unknown stage keys fall back to the first stage
    assert_eq!(board.partition().await.ids(StageId::Lead), vec![1, 2, 3]);

    let ticket = board.move_client(2, "proposta", None).await.unwrap();
    assert_eq!(ticket.settled().await, MoveStatus::Succeeded);

    let partition = board.partition().await;
    assert_eq!(partition.ids(StageId::Proposta), vec![2]);
    assert_eq!(partition.ids(StageId::Lead), vec![1, 3]);
}

#[tokio::test]
async fn test_rejected_write_rolls_back_from_fresh_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows("lead")))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "22P02",
            "message": "invalid input value for enum pipeline_stage"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let board = Board::load(store_for(&server), StageRegistry::default()).await.unwrap();
    let before = board.partition().await;
    let mut notifications = board.subscribe();

    let ticket = board.move_client(1, "fechado", Some(0)).await.unwrap();
    assert!(board.partition().await.ids(StageId::Fechado).contains(&1));

    let status = ticket.settled().await;
    assert!(matches!(status, MoveStatus::Failed { ref reason } if reason.contains("invalid input value")));
    assert_eq!(*board.partition().await, *before);

    let notification = notifications.recv().await.unwrap();
    assert!(notification.message().contains("client 1"));
}

#[tokio::test]
async fn test_missing_row_fails_the_move() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows("lead")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let board = Board::load(store_for(&server), StageRegistry::default()).await.unwrap();
    let ticket = board.move_client(2, "negociacao", None).await.unwrap();

    match ticket.settled().await {
        MoveStatus::Failed { reason } => assert!(reason.contains("client 2 not found")),
        other => panic!("expected failure, got {other:?}"),
    }
}
