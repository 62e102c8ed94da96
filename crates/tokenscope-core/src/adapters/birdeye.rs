use std::sync::Arc;

use serde_json::Value;

use crate::adapters::{domain_error, normalize_holders, ProviderTransport};
use crate::data_source::{
    CapabilitySet, HistoryRequest, HoldersRequest, ProviderCaches, ProviderError, ProviderFuture,
    TokenDataSource,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::validation::{ResponseValidator, ValidationErrors};
use crate::{AssetCatalog, HolderPage, PricePoint, PriceSnapshot, ProviderId, TokenId, UtcDateTime};

pub const BIRDEYE_BASE_URL: &str = "https://public-api.birdeye.so";

const SECONDS_PER_DAY: i64 = 86_400;

/// Secondary provider: REST API with prices, liquidity, history and holders.
#[derive(Debug, Clone)]
pub struct BirdeyeAdapter {
    transport: ProviderTransport,
    catalog: Arc<AssetCatalog>,
    caches: ProviderCaches,
    base_url: String,
}

impl BirdeyeAdapter {
    pub fn new(
        http: Arc<dyn HttpClient>,
        api_key: impl Into<String>,
        catalog: Arc<AssetCatalog>,
        policy: ProviderPolicy,
        cache_entries: usize,
    ) -> Self {
        let auth = HttpAuth::Header {
            name: String::from("x-api-key"),
            value: api_key.into(),
        };

        Self {
            caches: ProviderCaches::new(policy.ttls, cache_entries),
            transport: ProviderTransport::new(http, auth, policy),
            catalog,
            base_url: String::from(BIRDEYE_BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn get(&self, path: &str) -> HttpRequest {
        HttpRequest::get(format!("{}{path}", self.base_url))
            .with_header("accept", "application/json")
            .with_header("x-chain", "solana")
    }

    /// Sends the request and unwraps Birdeye's `{success, data}` envelope.
    async fn fetch_data(&self, request: HttpRequest, context: &str) -> Result<Value, ProviderError> {
        let mut body = self.transport.send_json(request).await?;

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request unsuccessful");
            return Err(ProviderError::validation(
                ProviderId::Birdeye,
                &ValidationErrors::single(context, message),
            ));
        }

        match body.get_mut("data").map(Value::take) {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(ProviderError::validation(
                ProviderId::Birdeye,
                &ValidationErrors::single(context, "data: missing required field"),
            )),
        }
    }

    async fn fetch_price(&self, token: &TokenId) -> Result<PriceSnapshot, ProviderError> {
        let request = self.get("/defi/price").with_query([
            ("address", Some(self.catalog.address_for(token))),
            ("include_liquidity", Some(String::from("true"))),
        ]);
        let data = self.fetch_data(request, "birdeye price").await?;
        parse_price(token, &data)
    }

    async fn fetch_history(&self, req: &HistoryRequest) -> Result<Vec<PricePoint>, ProviderError> {
        let to = UtcDateTime::now().unix_seconds();
        let from = UtcDateTime::now().start_of_day().unix_seconds()
            - i64::from(req.days) * SECONDS_PER_DAY;

        let request = self.get("/defi/history_price").with_query([
            ("address", Some(self.catalog.address_for(&req.token))),
            ("address_type", Some(String::from("token"))),
            ("type", Some(String::from("1D"))),
            ("time_from", Some(from.to_string())),
            ("time_to", Some(to.to_string())),
        ]);
        let data = self.fetch_data(request, "birdeye history").await?;
        parse_history(&data)
    }

    async fn fetch_holders(&self, req: &HoldersRequest) -> Result<HolderPage, ProviderError> {
        let offset = parse_offset(req.cursor.as_deref())?;
        let address = self.catalog.address_for(&req.token);
        let asset = self.catalog.resolve(&req.token);

        // Holder rows carry balances only; supply and holder count come from the overview.
        let overview_request = self
            .get("/defi/token_overview")
            .with_query([("address", Some(address.clone()))]);
        let overview = self.fetch_data(overview_request, "birdeye overview").await?;
        let mut v = ResponseValidator::new("birdeye overview");
        let supply = v
            .optional_f64(&overview, "supply")
            .or_else(|| asset.and_then(|asset| asset.total_supply));
        let holder_count = v.optional_u64(&overview, "holder");

        let request = self.get("/defi/v3/token/holder").with_query([
            ("address", Some(address)),
            ("offset", Some(offset.to_string())),
            ("limit", Some(req.limit.to_string())),
        ]);
        let data = self.fetch_data(request, "birdeye holders").await?;
        parse_holders(req, &data, offset, supply, holder_count)
    }
}

impl TokenDataSource for BirdeyeAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Birdeye
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, false, true, true, false)
    }

    fn caches(&self) -> &ProviderCaches {
        &self.caches
    }

    fn price<'a>(&'a self, token: &'a TokenId) -> ProviderFuture<'a, PriceSnapshot> {
        Box::pin(self.fetch_price(token))
    }

    fn price_history<'a>(&'a self, req: &'a HistoryRequest) -> ProviderFuture<'a, Vec<PricePoint>> {
        Box::pin(self.fetch_history(req))
    }

    fn holders<'a>(&'a self, req: &'a HoldersRequest) -> ProviderFuture<'a, HolderPage> {
        Box::pin(self.fetch_holders(req))
    }
}

/// Birdeye pages by offset; the cursor we hand out is the next offset.
fn parse_offset(cursor: Option<&str>) -> Result<usize, ProviderError> {
    match cursor {
        None => Ok(0),
        Some(cursor) => cursor.trim().parse::<usize>().map_err(|_| {
            ProviderError::validation_message(
                ProviderId::Birdeye,
                format!("birdeye cursor must be a numeric offset, got '{cursor}'"),
            )
        }),
    }
}

fn parse_price(token: &TokenId, data: &Value) -> Result<PriceSnapshot, ProviderError> {
    let mut v = ResponseValidator::new("birdeye price");
    let price = v.required_f64(data, "value");
    let change_24h = v.optional_f64(data, "priceChange24h");
    let liquidity = v.optional_f64(data, "liquidity");

    let price = v
        .finish(|| price)
        .map_err(|errors| ProviderError::validation(ProviderId::Birdeye, &errors))?;

    PriceSnapshot::new(token.clone(), price, change_24h, None, None, liquidity)
        .map_err(|error| domain_error(ProviderId::Birdeye, "birdeye price", error))
}

fn parse_history(data: &Value) -> Result<Vec<PricePoint>, ProviderError> {
    let mut v = ResponseValidator::new("birdeye history");
    let items = v.required_array(data, "items").unwrap_or_default();

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let row = v.nested(format!("items[{index}]"), |v| {
            let ts = v.required_u64(item, "unixTime");
            let price = v.required_f64(item, "value");
            ts.zip(price)
        });
        rows.extend(row);
    }

    let rows = v
        .finish(|| Some(rows))
        .map_err(|errors| ProviderError::validation(ProviderId::Birdeye, &errors))?;

    rows.into_iter()
        .map(|(ts, price)| {
            let ts = UtcDateTime::from_unix_seconds(ts as i64)?;
            PricePoint::new(ts.start_of_day(), price, None)
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| domain_error(ProviderId::Birdeye, "birdeye history", error))
}

fn parse_holders(
    req: &HoldersRequest,
    data: &Value,
    offset: usize,
    supply: Option<f64>,
    holder_count: Option<u64>,
) -> Result<HolderPage, ProviderError> {
    let mut v = ResponseValidator::new("birdeye holders");
    let items = v.required_array(data, "items").unwrap_or_default();

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let row = v.nested(format!("items[{index}]"), |v| {
            let owner = v.required_str(item, "owner");
            let amount = v.required_f64(item, "ui_amount");
            if amount.is_some_and(|amount| amount < 0.0) {
                v.error("ui_amount: negative balance");
            }
            owner.zip(amount)
        });
        rows.extend(row);
    }

    let rows = v
        .finish(|| Some(rows))
        .map_err(|errors| ProviderError::validation(ProviderId::Birdeye, &errors))?;

    let page_len = rows.len();
    let cursor = (page_len == req.limit).then(|| (offset + page_len).to_string());
    let holders = normalize_holders(rows, supply)
        .map_err(|error| domain_error(ProviderId::Birdeye, "birdeye holders", error))?;

    HolderPage::new(
        req.token.clone(),
        holder_count.unwrap_or((offset + page_len) as u64),
        holders,
        cursor,
    )
    .map_err(|error| domain_error(ProviderId::Birdeye, "birdeye holders", error))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::adapters::test_support::ScriptedHttpClient;
    use crate::data_source::ProviderErrorKind;
    use crate::http_client::HttpResponse;

    fn adapter(client: Arc<ScriptedHttpClient>) -> BirdeyeAdapter {
        BirdeyeAdapter::new(
            client,
            "birdeye-key",
            Arc::new(AssetCatalog::builtin()),
            ProviderPolicy::birdeye_default().without_backoff(),
            16,
        )
        .with_base_url("https://birdeye.test")
    }

    fn wif() -> TokenId {
        TokenId::parse("wif").expect("valid token")
    }

    #[tokio::test]
    async fn price_includes_liquidity_and_uses_api_key_header() {
        let client = Arc::new(ScriptedHttpClient::json(json!({
            "success": true,
            "data": {"value": 2.41, "priceChange24h": -3.2, "liquidity": 15500000.5, "updateUnixTime": 1}
        })));

        let snapshot = adapter(Arc::clone(&client))
            .price(&wif())
            .await
            .expect("price should parse");

        assert_eq!(snapshot.price, 2.41);
        assert_eq!(snapshot.change_24h, Some(-3.2));
        assert_eq!(snapshot.liquidity_usd, Some(15_500_000.5));

        let requests = client.recorded_requests();
        assert_eq!(
            requests[0].headers.get("x-api-key").map(String::as_str),
            Some("birdeye-key")
        );
        assert!(requests[0]
            .url
            .starts_with("https://birdeye.test/defi/price?address=EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm"));
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_a_validation_error() {
        let client = Arc::new(ScriptedHttpClient::json(json!({
            "success": false,
            "message": "Unauthorized"
        })));

        let error = adapter(client)
            .price(&wif())
            .await
            .expect_err("unsuccessful response must fail");

        assert_eq!(error.kind(), ProviderErrorKind::Validation);
        assert!(error.message().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn holders_page_uses_overview_supply_and_offset_cursor() {
        let client = Arc::new(ScriptedHttpClient::new(vec![
            Ok(HttpResponse::ok_json(
                json!({"success": true, "data": {"supply": 1000.0, "holder": 250000}}).to_string(),
            )),
            Ok(HttpResponse::ok_json(
                json!({"success": true, "data": {"items": [
                    {"owner": "a", "ui_amount": 100.0},
                    {"owner": "b", "ui_amount": 50.0}
                ]}})
                .to_string(),
            )),
        ]));
        let req = HoldersRequest::new(wif(), 2, Some(String::from("4"))).expect("valid request");

        let page = adapter(Arc::clone(&client))
            .holders(&req)
            .await
            .expect("holders should parse");

        assert_eq!(page.count, 250_000);
        assert_eq!(page.cursor.as_deref(), Some("6"));
        assert!((page.holders[0].percent_of_supply - 10.0).abs() < 1e-9);
        assert!((page.holders[1].percent_of_supply - 5.0).abs() < 1e-9);

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].url.contains("offset=4"));
    }

    #[tokio::test]
    async fn holders_reject_invalid_rows() {
        let client = Arc::new(ScriptedHttpClient::new(vec![
            Ok(HttpResponse::ok_json(r#"{"success":true,"data":{}}"#)),
            Ok(HttpResponse::ok_json(
                r#"{"success":true,"data":{"items":[{"owner":"a","ui_amount":"lots"}]}}"#,
            )),
        ]));
        let req = HoldersRequest::new(wif(), 10, None).expect("valid request");

        let error = adapter(client)
            .holders(&req)
            .await
            .expect_err("non-numeric amount must fail");

        assert_eq!(error.kind(), ProviderErrorKind::Validation);
        assert!(error.message().contains("items[0].ui_amount"));
    }

    #[test]
    fn history_items_become_daily_points() {
        let data = json!({"items": [
            {"unixTime": 1704067200, "value": 1.0},
            {"unixTime": 1704160000, "value": "1.1"}
        ]});

        let points = parse_history(&data).expect("history should parse");
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].ts.format_rfc3339(), "2024-01-02T00:00:00Z");
    }

    #[test]
    fn non_numeric_cursor_is_rejected() {
        assert!(parse_offset(Some("abc")).is_err());
        assert_eq!(parse_offset(Some(" 20 ")).ok(), Some(20));
    }
}
