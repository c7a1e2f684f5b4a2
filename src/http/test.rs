#[cfg(test)]
mod tests {
    use crate::config::RemoteConfig;
    use crate::http::RateLimitedHttpClient;
    use crate::remote::RemoteError;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> RemoteConfig {
        RemoteConfig {
            base_url: server.uri(),
            api_key: Some("test-key".to_string()),
            ..RemoteConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let config = RemoteConfig {
            base_url: "http://localhost:1".to_string(),
            api_key: None,
            ..RemoteConfig::default()
        };
        let err = RateLimitedHttpClient::new(&config).unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[tokio::test]
    async fn test_cached_get_hits_server_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/clients"))
            .and(header("apikey", "test-key"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let client = RateLimitedHttpClient::new(&config_for(&server)).unwrap();
        let first: Value = client.get_json("rest/v1/clients", true).await.unwrap();
        let second: Value = client.get_json("rest/v1/clients", true).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&server)
            .await;

        let client = RateLimitedHttpClient::new(&config_for(&server)).unwrap();
        let _: Value = client.get_json("rest/v1/clients", true).await.unwrap();
        client.clear_cache().await;
        let _: Value = client.get_json("rest/v1/clients", true).await.unwrap();
    }

    #[tokio::test]
    async fn test_pattern_invalidation_only_drops_matching_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/organizations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = RateLimitedHttpClient::new(&config_for(&server)).unwrap();
        let _: Value = client.get_json("rest/v1/clients", true).await.unwrap();
        let _: Value = client.get_json("rest/v1/organizations", true).await.unwrap();

        client.invalidate_cache_pattern("clients").await;

        let _: Value = client.get_json("rest/v1/clients", true).await.unwrap();
        let _: Value = client.get_json("rest/v1/organizations", true).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/clients"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "invalid input value for enum"})),
            )
            .mount(&server)
            .await;

        let client = RateLimitedHttpClient::new(&config_for(&server)).unwrap();
        let err = client
            .patch_json("rest/v1/clients", &json!({"pipeline_stage": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Validation("invalid input value for enum".to_string()));
    }
}
