// Token lifecycle against a mock authorization server:
//  - cached token reuse and the 60s freshness margin
//  - credential placement (Basic header vs form body)
//  - error classes leave the cache untouched

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    use crate::cache::token::CachedToken;
    use crate::cache::token_cache::TokenCache;
    use crate::errors::AgentError;
    use crate::helpers::time::now_millis;
    use crate::sources::oauth2::{TokenAcquirer, FRESHNESS_MARGIN_SECONDS};
    use crate::tests::common::*;

    async fn acquirer_for(opts: MockOptions, client_secret: &str) -> (TokenAcquirer, MockCounters) {
        let (_handle, addr, counters) = spawn_mock_api(opts).await;
        let cfg = test_config(addr, client_secret);
        let acquirer = TokenAcquirer::new(build_reqwest_client(), cfg.auth, TokenCache::new());
        (acquirer, counters)
    }

    #[tokio::test]
    async fn fresh_token_is_reused_without_network() {
        let (acquirer, counters) = acquirer_for(MockOptions::default(), "").await;

        let first = acquirer.acquire_or_refresh().await.unwrap();
        let second = acquirer.acquire_or_refresh().await.unwrap();

        assert_eq!(first.access_token, "abc");
        assert_eq!(first.expires_in, 1800);
        assert_eq!(second.access_token, "abc");
        assert!(second.expires_in >= FRESHNESS_MARGIN_SECONDS as u64);
        assert!(second.expires_in <= 1800);
        assert_eq!(counters.token(), 1, "second call must be served from cache");
    }

    #[tokio::test]
    async fn near_expiry_token_is_refreshed() {
        let (acquirer, counters) = acquirer_for(MockOptions::default(), "").await;
        // 30s left: inside the freshness margin
        acquirer
            .cache()
            .put(CachedToken::new("stale".into(), now_millis() + 30_000))
            .await;

        let token = acquirer.acquire_or_refresh().await.unwrap();

        assert_eq!(token.access_token, "abc");
        assert_eq!(counters.token(), 1);
        assert_eq!(acquirer.cache().get().await.unwrap().access_token, "abc");
    }

    #[tokio::test]
    async fn cached_token_well_within_lifetime_skips_exchange() {
        let (acquirer, counters) = acquirer_for(MockOptions::default(), "").await;
        acquirer
            .cache()
            .put(CachedToken::new("warm".into(), now_millis() + 3_600_000))
            .await;

        let token = acquirer.acquire_or_refresh().await.unwrap();

        assert_eq!(token.access_token, "warm");
        assert!((3599..=3600).contains(&token.expires_in));
        assert_eq!(counters.token(), 0);
    }

    #[tokio::test]
    async fn short_lived_tokens_still_report_margin() {
        // a 90s token is fresh once, then every cached return stays >= 60
        let opts = MockOptions {
            token_body: json!({"access_token": "short", "expires_in": 90}).to_string(),
            ..MockOptions::default()
        };
        let (acquirer, _counters) = acquirer_for(opts, "").await;

        for _ in 0..3 {
            let token = acquirer.acquire_or_refresh().await.unwrap();
            assert!(token.expires_in >= FRESHNESS_MARGIN_SECONDS as u64);
        }
    }

    #[tokio::test]
    async fn tokens_shorter_than_margin_report_margin_and_are_never_reused() {
        let opts = MockOptions {
            token_body: json!({"access_token": "brief", "expires_in": 30}).to_string(),
            ..MockOptions::default()
        };
        let (acquirer, counters) = acquirer_for(opts, "").await;

        for _ in 0..2 {
            let token = acquirer.acquire_or_refresh().await.unwrap();
            assert_eq!(token.access_token, "brief");
            assert_eq!(token.expires_in, FRESHNESS_MARGIN_SECONDS as u64);
        }
        // a 30s token is inside the margin from the start
        assert_eq!(counters.token(), 2);
    }

    #[tokio::test]
    async fn without_secret_credentials_go_in_form_body() {
        let (acquirer, counters) = acquirer_for(MockOptions::default(), "").await;
        acquirer.acquire_or_refresh().await.unwrap();

        let captured = counters.token_requests.lock().unwrap().clone();
        assert_eq!(captured.len(), 1);
        let request = &captured[0];
        assert_eq!(request.authorization, None);
        assert_eq!(request.content_type.as_deref(), Some("application/x-www-form-urlencoded"));
        assert!(request.body.contains("grant_type=client_credentials"));
        assert!(request.body.contains("scope=openid"));
        assert!(request.body.contains("client_id=app"));
        assert!(request.body.contains("client_secret="));
    }

    #[tokio::test]
    async fn with_secret_credentials_go_in_basic_header() {
        let (acquirer, counters) = acquirer_for(MockOptions::default(), "s3cr3t").await;
        acquirer.acquire_or_refresh().await.unwrap();

        let captured = counters.token_requests.lock().unwrap().clone();
        let request = &captured[0];
        let expected = format!("Basic {}", STANDARD.encode("app:s3cr3t"));
        assert_eq!(request.authorization.as_deref(), Some(expected.as_str()));
        assert!(request.body.contains("grant_type=client_credentials"));
        assert!(!request.body.contains("client_id"));
        assert!(!request.body.contains("client_secret"));
        assert!(!request.body.contains("s3cr3t"));
    }

    #[tokio::test]
    async fn endpoint_rejection_is_transport_error_and_cache_untouched() {
        let opts = MockOptions {
            token_status: 401,
            token_body: "{\"error\":\"invalid_client\"}".into(),
            ..MockOptions::default()
        };
        let (acquirer, _counters) = acquirer_for(opts, "").await;

        match acquirer.acquire_or_refresh().await {
            Err(AgentError::TokenTransport { status, message }) => {
                assert_eq!(status, Some(401));
                assert!(message.contains("invalid_client"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(acquirer.cache().is_empty().await);
    }

    #[tokio::test]
    async fn non_json_body_is_parse_error() {
        let opts = MockOptions { token_body: "<html>oops</html>".into(), ..MockOptions::default() };
        let (acquirer, _counters) = acquirer_for(opts, "").await;

        assert!(matches!(acquirer.acquire_or_refresh().await, Err(AgentError::TokenParse(_))));
        assert!(acquirer.cache().is_empty().await);
    }

    #[tokio::test]
    async fn missing_fields_are_shape_errors() {
        let opts = MockOptions {
            token_body: json!({"token_type": "bearer", "expires_in": 10}).to_string(),
            ..MockOptions::default()
        };
        let (acquirer, _counters) = acquirer_for(opts, "").await;

        assert!(matches!(acquirer.acquire_or_refresh().await, Err(AgentError::TokenShape(_))));
        assert!(acquirer.cache().is_empty().await);
    }

    #[tokio::test]
    async fn refresh_always_exchanges() {
        let (acquirer, counters) = acquirer_for(MockOptions::default(), "").await;

        acquirer.acquire_or_refresh().await.unwrap();
        acquirer.refresh().await.unwrap();

        assert_eq!(counters.token(), 2);
    }

    #[tokio::test]
    async fn concurrent_cold_acquires_all_succeed() {
        let (acquirer, counters) = acquirer_for(MockOptions::default(), "").await;

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let acquirer = acquirer.clone();
                tokio::spawn(async move { acquirer.acquire_or_refresh().await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().access_token, "abc");
        }

        let exchanges = counters.token();
        assert!((1..=4).contains(&exchanges), "exchanges = {}", exchanges);
    }
}
