//! Contract tests every provider client must satisfy, driven through a
//! routed HTTP fake with realistic payloads.

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use serde_json::json;
use tokenscope_core::{
    Capability, HistoryRequest, HoldersRequest, ProviderErrorKind, ProviderId, TokenDataSource,
    PERCENT_SUM_TOLERANCE,
};

use support::{birdeye, codex, coingecko, token, RoutedHttpClient};

struct ProviderCase {
    id: ProviderId,
    http: Arc<RoutedHttpClient>,
    source: Arc<dyn TokenDataSource>,
    supports_history: bool,
    supports_holders: bool,
    supports_info: bool,
}

/// Each case answers every endpoint its provider offers with a well-formed payload.
fn provider_cases() -> Vec<ProviderCase> {
    let codex_http = RoutedHttpClient::new();
    codex_http.json(
        &["query Price"],
        json!({"data": {"getTokenPrices": [{"address": "DezX", "priceUsd": "0.0000212"}]}}),
    );
    codex_http.json(
        &["query Holders"],
        json!({"data": {
            "holders": {"count": 900000, "cursor": "c2", "items": [
                {"address": "a1", "shiftedBalance": "4000000000000"},
                {"address": "a2", "shiftedBalance": 1500000000000.0}
            ]},
            "token": {"info": {"totalSupply": "88870000000000"}}
        }}),
    );
    codex_http.json(
        &["query Bars"],
        json!({"data": {"getBars": {
            "t": [1_700_000_000, 1_700_086_400, 1_700_172_800],
            "c": [0.000011, null, 0.000013],
            "volume": ["1000", "1100", "1200"]
        }}}),
    );
    codex_http.json(
        &["query TokenInfo"],
        json!({"data": {"token": {
            "address": "DezX", "decimals": 5, "name": "Bonk", "symbol": "BONK",
            "info": {"circulatingSupply": "80000000000000", "totalSupply": "88870000000000"}
        }}}),
    );

    let birdeye_http = RoutedHttpClient::new();
    birdeye_http.json(
        &["/defi/price"],
        json!({"success": true, "data": {"value": 0.0000213, "priceChange24h": -2.5, "liquidity": 12_500_000.0}}),
    );
    birdeye_http.json(
        &["/defi/history_price"],
        json!({"success": true, "data": {"items": [
            {"unixTime": 1_700_000_000, "value": 0.000011},
            {"unixTime": 1_700_086_400, "value": 0.000012}
        ]}}),
    );
    birdeye_http.json(
        &["/defi/token_overview"],
        json!({"success": true, "data": {"supply": 88_870_000_000_000.0, "holder": 850_000}}),
    );
    birdeye_http.json(
        &["/defi/v3/token/holder"],
        json!({"success": true, "data": {"items": [
            {"owner": "o1", "ui_amount": 3_000_000_000_000.0},
            {"owner": "o2", "ui_amount": 1_000_000_000_000.0}
        ]}}),
    );

    let coingecko_http = RoutedHttpClient::new();
    coingecko_http.json(
        &["/simple/price"],
        json!({"bonk": {"usd": 0.0000214, "usd_24h_change": 1.1, "usd_market_cap": 1.4e9}}),
    );

    vec![
        ProviderCase {
            id: ProviderId::Codex,
            source: Arc::new(codex(Arc::clone(&codex_http))),
            http: codex_http,
            supports_history: true,
            supports_holders: true,
            supports_info: true,
        },
        ProviderCase {
            id: ProviderId::Birdeye,
            source: Arc::new(birdeye(Arc::clone(&birdeye_http))),
            http: birdeye_http,
            supports_history: true,
            supports_holders: true,
            supports_info: false,
        },
        ProviderCase {
            id: ProviderId::Coingecko,
            source: Arc::new(coingecko(Arc::clone(&coingecko_http))),
            http: coingecko_http,
            supports_history: false,
            supports_holders: false,
            supports_info: false,
        },
    ]
}

#[tokio::test]
async fn price_returns_valid_snapshot_for_all_providers() {
    for case in provider_cases() {
        let snapshot = case
            .source
            .price(&token("bonk"))
            .await
            .unwrap_or_else(|error| panic!("provider '{}' price failed: {error}", case.id));

        assert_eq!(snapshot.token, token("bonk"), "provider '{}': token", case.id);
        assert!(snapshot.price > 0.0, "provider '{}': price must be positive", case.id);
        assert_eq!(case.source.id(), case.id);
    }
}

#[tokio::test]
async fn capability_matrix_matches_operations() {
    let history = HistoryRequest::new(token("bonk"), 3).expect("valid request");
    let holders = HoldersRequest::new(token("bonk"), 2, None).expect("valid request");

    for case in provider_cases() {
        let capabilities = case.source.capabilities();
        assert_eq!(
            capabilities.supports(Capability::PriceHistory),
            case.supports_history,
            "provider '{}': history capability",
            case.id
        );
        assert_eq!(
            capabilities.supports(Capability::Holders),
            case.supports_holders,
            "provider '{}': holders capability",
            case.id
        );
        assert_eq!(
            capabilities.supports(Capability::TokenInfo),
            case.supports_info,
            "provider '{}': info capability",
            case.id
        );

        let history_result = case.source.price_history(&history).await;
        if case.supports_history {
            let points = history_result
                .unwrap_or_else(|error| panic!("provider '{}' history failed: {error}", case.id));
            assert!(!points.is_empty(), "provider '{}': history points", case.id);
            assert!(
                points.windows(2).all(|pair| pair[0].ts < pair[1].ts),
                "provider '{}': history ascending",
                case.id
            );
        } else {
            let error = history_result.expect_err("history should be unsupported");
            assert_eq!(error.kind(), ProviderErrorKind::Unsupported, "provider '{}'", case.id);
        }

        let holders_result = case.source.holders(&holders).await;
        if case.supports_holders {
            let page = holders_result
                .unwrap_or_else(|error| panic!("provider '{}' holders failed: {error}", case.id));
            assert!(
                page.percent_sum() <= 100.0 + PERCENT_SUM_TOLERANCE,
                "provider '{}': percent sum",
                case.id
            );
            assert!(
                page.holders
                    .windows(2)
                    .all(|pair| pair[0].balance >= pair[1].balance),
                "provider '{}': holders sorted largest first",
                case.id
            );
            assert!(page.count >= page.holders.len() as u64);
        } else {
            let error = holders_result.expect_err("holders should be unsupported");
            assert_eq!(error.kind(), ProviderErrorKind::Unsupported, "provider '{}'", case.id);
        }

        let info_result = case.source.token_info(&token("bonk")).await;
        if case.supports_info {
            let info = info_result
                .unwrap_or_else(|error| panic!("provider '{}' info failed: {error}", case.id));
            assert_eq!(info.symbol, "BONK");
            assert_eq!(info.decimals, Some(5));
        } else {
            assert!(info_result.is_err(), "provider '{}': info unsupported", case.id);
        }
    }
}

#[tokio::test]
async fn unsupported_operations_never_reach_the_network() {
    for case in provider_cases() {
        let before = case.http.requests().len();
        let holders = HoldersRequest::new(token("bonk"), 5, None).expect("valid request");

        if !case.supports_holders {
            let _ = case.source.holders(&holders).await;
        }
        if !case.supports_info {
            let _ = case.source.token_info(&token("bonk")).await;
        }

        assert_eq!(
            case.http.requests().len(),
            before,
            "provider '{}': unsupported calls must not send requests",
            case.id
        );
    }
}

#[tokio::test]
async fn server_errors_are_retried_and_client_errors_are_not() {
    for (status, expected_attempts) in [(503_u16, 3_usize), (404, 1)] {
        let http = RoutedHttpClient::new();
        http.status(&["query Price"], status);
        let source = codex(Arc::clone(&http));

        let error = source
            .price(&token("jup"))
            .await
            .expect_err("upstream failure should surface");

        assert_eq!(error.kind(), ProviderErrorKind::Transport);
        assert_eq!(error.status(), Some(status));
        assert_eq!(http.count("query Price"), expected_attempts, "status {status}");
    }
}

#[tokio::test]
async fn malformed_payloads_fail_validation_without_retry() {
    let http = RoutedHttpClient::new();
    http.json(
        &["/defi/v3/token/holder"],
        json!({"success": true, "data": {"items": [{"owner": "o1", "ui_amount": "lots"}]}}),
    );
    http.json(&["/defi/token_overview"], json!({"success": true, "data": {"holder": 10}}));
    http.json(&["/defi/price"], json!({"success": true, "data": {"liquidity": 5.0}}));
    let source = birdeye(Arc::clone(&http));

    let holders = HoldersRequest::new(token("wif"), 10, None).expect("valid request");
    let holders_error = source.holders(&holders).await.expect_err("non-numeric amount");
    let price_error = source.price(&token("wif")).await.expect_err("missing value");

    assert_eq!(holders_error.kind(), ProviderErrorKind::Validation);
    assert!(holders_error.message().contains("items[0].ui_amount"));
    assert_eq!(price_error.kind(), ProviderErrorKind::Validation);
    assert!(!holders_error.is_retryable());
    assert_eq!(http.count("/defi/v3/token/holder"), 1);
    assert_eq!(http.count("/defi/price"), 1);
}

#[tokio::test]
async fn credentials_travel_in_provider_specific_headers() {
    let cases = provider_cases();
    for case in &cases {
        let _ = case.source.price(&token("bonk")).await;
    }

    let header = |case: &ProviderCase, name: &str| {
        case.http
            .requests()
            .first()
            .and_then(|request| request.headers.get(name).cloned())
    };

    assert_eq!(header(&cases[0], "authorization").as_deref(), Some("codex-test-key"));
    assert_eq!(header(&cases[1], "x-api-key").as_deref(), Some("birdeye-test-key"));
    assert_eq!(header(&cases[2], "x-cg-demo-api-key"), None);
}
