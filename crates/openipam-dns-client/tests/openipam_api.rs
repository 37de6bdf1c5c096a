//! Integration tests for the OpenIPAM client
//!
//! Uses wiremock to stand in for the OpenIPAM REST API.

use std::time::Duration;

use openipam_dns_client::OpenIpamClient;
use openipam_dns_core::traits::{DeleteResult, RecordApi};
use openipam_dns_core::{
    ChallengeRecord, CleanupOutcome, Credentials, Error, ManagerConfig, RecordManager,
};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "0123456789abcdef0123456789abcdef01234567";
const NAME: &str = "_acme-challenge.example.usu.edu";

fn client_for(server: &MockServer) -> OpenIpamClient {
    let credentials = Credentials::new(TOKEN, Some(format!("{}/api/", server.uri()))).unwrap();
    OpenIpamClient::new(&credentials, Duration::from_secs(5), false).unwrap()
}

fn record() -> ChallengeRecord {
    ChallengeRecord::new("example.usu.edu", "tokenXYZ", 300).unwrap()
}

mod create {
    use super::*;

    #[tokio::test]
    async fn posts_form_with_token_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/dns/add/"))
            .and(header("Authorization", format!("Token {}", TOKEN).as_str()))
            .and(body_string_contains("dns_type=TXT"))
            .and(body_string_contains(format!("name={}", NAME).as_str()))
            .and(body_string_contains("content=tokenXYZ"))
            .and(body_string_contains("ttl=300"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 981})))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server).create_txt_record(&record()).await.unwrap();

        assert_eq!(created.id.as_deref(), Some("981"));
    }

    #[tokio::test]
    async fn empty_created_body_has_no_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/dns/add/"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let created = client_for(&server).create_txt_record(&record()).await.unwrap();

        assert!(created.id.is_none());
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/dns/add/"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "Invalid token."})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_txt_record(&record())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Authentication(_)), "got {:?}", err);
        assert!(!err.to_string().contains(TOKEN), "token leaked into error");
    }

    #[tokio::test]
    async fn rate_limit_and_server_errors_are_distinct() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/dns/add/"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/dns/add/"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server);

        let first = client.create_txt_record(&record()).await.unwrap_err();
        assert!(matches!(first, Error::RateLimited(_)), "got {:?}", first);

        let second = client.create_txt_record(&record()).await.unwrap_err();
        assert!(matches!(second, Error::Provider { .. }), "got {:?}", second);
        assert!(second.to_string().contains("transient"));
    }

    #[tokio::test]
    async fn slow_api_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/dns/add/"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let credentials = Credentials::new(TOKEN, Some(format!("{}/api/", server.uri()))).unwrap();
        let client = OpenIpamClient::new(&credentials, Duration::from_millis(200), false).unwrap();

        let err = client.create_txt_record(&record()).await.unwrap_err();

        assert!(matches!(err, Error::Timeout(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn dry_run_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let credentials = Credentials::new(TOKEN, Some(format!("{}/api/", server.uri()))).unwrap();
        let client = OpenIpamClient::new(&credentials, Duration::from_secs(5), true).unwrap();

        assert!(client.create_txt_record(&record()).await.is_ok());
    }
}

mod find {
    use super::*;

    #[tokio::test]
    async fn queries_by_name_and_follows_pages() {
        let server = MockServer::start().await;

        // Mounted first so it wins over the unpaged mock below
        Mock::given(method("GET"))
            .and(path("/api/dns/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 2,
                "next": null,
                "results": [{"id": 2, "name": NAME, "content": "value_B", "dns_type": "TXT"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/dns/"))
            .and(query_param("name", NAME))
            .and(header("Authorization", format!("Token {}", TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 2,
                "next": format!("{}/api/dns/?name={}&page=2", server.uri(), NAME),
                "results": [{"id": 1, "name": NAME, "content": "value_A", "dns_type": "TXT"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let records = client_for(&server).find_txt_records(NAME).await.unwrap();

        let contents: Vec<&str> = records.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["value_A", "value_B"]);
        assert_eq!(records[1].id, "2");
    }

    #[tokio::test]
    async fn pagination_link_to_another_host_is_not_followed() {
        let api = MockServer::start().await;
        let elsewhere = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dns/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "next": format!("{}/api/dns/?page=2", elsewhere.uri()),
                "results": [{"id": 1, "name": NAME, "content": "value_A", "dns_type": "TXT"}]
            })))
            .mount(&api)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&elsewhere)
            .await;

        let err = client_for(&api).find_txt_records(NAME).await.unwrap_err();

        assert!(matches!(err, Error::Provider { .. }), "got {:?}", err);
        let leaked = elsewhere.received_requests().await.unwrap_or_default();
        assert!(leaked.is_empty(), "API token sent to {}", elsewhere.uri());
    }

    #[tokio::test]
    async fn bare_array_listing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dns/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let records = client_for(&server).find_txt_records(NAME).await.unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn garbage_listing_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dns/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).find_txt_records(NAME).await.unwrap_err();

        assert!(matches!(err, Error::Provider { .. }), "got {:?}", err);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deletes_by_id() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/dns/981/delete/"))
            .and(header("Authorization", format!("Token {}", TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).delete_record("981").await.unwrap();

        assert_eq!(result, DeleteResult::Deleted);
    }

    #[tokio::test]
    async fn not_found_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/dns/981/delete/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client_for(&server).delete_record("981").await.unwrap();

        assert_eq!(result, DeleteResult::NotFound);
    }

    #[tokio::test]
    async fn forbidden_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server).delete_record("981").await.unwrap_err();

        assert!(matches!(err, Error::Authentication(_)));
    }
}

mod lifecycle {
    use super::*;

    fn manager_for(server: &MockServer) -> RecordManager {
        let (manager, _events) = RecordManager::new(
            Box::new(client_for(server)),
            ManagerConfig::with_propagation_seconds(0),
        )
        .unwrap();
        manager
    }

    #[tokio::test]
    async fn cleanup_leaves_sibling_challenge_record() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dns/"))
            .and(query_param("name", NAME))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "next": null,
                "results": [
                    {"id": 1, "name": NAME, "content": "value_A", "dns_type": "TXT"},
                    {"id": 2, "name": NAME, "content": "value_B", "dns_type": "TXT"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/dns/1/delete/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/dns/2/delete/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = manager_for(&server).cleanup("example.usu.edu", "value_A").await;

        assert!(
            matches!(outcome, CleanupOutcome::Deleted { ref record_id, .. } if record_id == "1"),
            "got {:?}",
            outcome
        );
    }

    #[tokio::test]
    async fn perform_with_rejected_token_fails_without_listing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/dns/add/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let err = manager_for(&server)
            .perform("example.usu.edu", "tokenXYZ")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RecordCreation { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn cleanup_server_error_is_warning() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dns/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let outcome = manager_for(&server).cleanup("example.usu.edu", "tokenXYZ").await;

        assert!(matches!(outcome, CleanupOutcome::Warning { .. }), "got {:?}", outcome);
    }
}
