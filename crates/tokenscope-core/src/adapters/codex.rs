use std::sync::Arc;

use serde_json::{json, Value};

use crate::adapters::{domain_error, normalize_holders, ProviderTransport};
use crate::data_source::{
    CapabilitySet, HistoryRequest, HoldersRequest, ProviderCaches, ProviderError, ProviderFuture,
    TokenDataSource,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::validation::ResponseValidator;
use crate::{
    AssetCatalog, HolderPage, PricePoint, PriceSnapshot, ProviderId, TokenId, TokenInfo,
    UtcDateTime,
};

pub const CODEX_GRAPHQL_URL: &str = "https://graph.codex.io/graphql";

const SECONDS_PER_DAY: i64 = 86_400;

const TOKEN_INFO_QUERY: &str = "query TokenInfo($address: String!, $networkId: Int!) {
  token(input: { address: $address, networkId: $networkId }) {
    address
    decimals
    name
    symbol
    info { circulatingSupply totalSupply }
  }
}";

const HOLDERS_QUERY: &str = "query Holders($tokenId: String!, $limit: Int, $cursor: String, $address: String!, $networkId: Int!) {
  holders(input: { tokenId: $tokenId, limit: $limit, cursor: $cursor }) {
    count
    cursor
    items { address shiftedBalance }
  }
  token(input: { address: $address, networkId: $networkId }) {
    info { totalSupply }
  }
}";

const BARS_QUERY: &str = "query Bars($symbol: String!, $from: Int!, $to: Int!) {
  getBars(symbol: $symbol, from: $from, to: $to, resolution: \"1D\", removeLeadingNullValues: true) {
    t
    c
    volume
  }
}";

const PRICE_QUERY: &str = "query Price($inputs: [GetPriceInput]) {
  getTokenPrices(inputs: $inputs) { address priceUsd }
}";

/// Primary provider: GraphQL API with holders, bars, prices and metadata.
#[derive(Debug, Clone)]
pub struct CodexAdapter {
    transport: ProviderTransport,
    catalog: Arc<AssetCatalog>,
    caches: ProviderCaches,
    endpoint: String,
}

impl CodexAdapter {
    pub fn new(
        http: Arc<dyn HttpClient>,
        api_key: impl Into<String>,
        catalog: Arc<AssetCatalog>,
        policy: ProviderPolicy,
        cache_entries: usize,
    ) -> Self {
        // Codex expects the raw key, without a Bearer prefix.
        let auth = HttpAuth::Header {
            name: String::from("authorization"),
            value: api_key.into(),
        };

        Self {
            caches: ProviderCaches::new(policy.ttls, cache_entries),
            transport: ProviderTransport::new(http, auth, policy),
            catalog,
            endpoint: String::from(CODEX_GRAPHQL_URL),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn query(&self, query: &str, variables: Value) -> Result<Value, ProviderError> {
        let body = json!({ "query": query, "variables": variables });
        let response = self
            .transport
            .send_json(HttpRequest::post_json(&self.endpoint, &body))
            .await?;

        // GraphQL reports resolver failures in-band with a 200 status.
        if let Some(errors) = response
            .get("errors")
            .and_then(Value::as_array)
            .filter(|errors| !errors.is_empty())
        {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|error| error.get("message").and_then(Value::as_str))
                .collect();
            return Err(ProviderError::validation_message(
                ProviderId::Codex,
                format!("codex graphql errors: {}", messages.join("; ")),
            ));
        }

        Ok(response)
    }

    fn token_ref(&self, token: &TokenId) -> (String, u64) {
        (
            self.catalog.address_for(token),
            self.catalog.network_id_for(token),
        )
    }

    async fn fetch_token_info(&self, token: &TokenId) -> Result<TokenInfo, ProviderError> {
        let (address, network_id) = self.token_ref(token);
        let body = self
            .query(
                TOKEN_INFO_QUERY,
                json!({ "address": address, "networkId": network_id }),
            )
            .await?;

        let network = self.catalog.resolve(token).map(|asset| asset.network.clone());
        parse_token_info(token, &body, network)
    }

    async fn fetch_holders(&self, req: &HoldersRequest) -> Result<HolderPage, ProviderError> {
        let (address, network_id) = self.token_ref(&req.token);
        let body = self
            .query(
                HOLDERS_QUERY,
                json!({
                    "tokenId": format!("{address}:{network_id}"),
                    "limit": req.limit,
                    "cursor": req.cursor,
                    "address": address,
                    "networkId": network_id,
                }),
            )
            .await?;

        let supply_hint = self
            .catalog
            .resolve(&req.token)
            .and_then(|asset| asset.total_supply);
        parse_holders(&req.token, &body, supply_hint)
    }

    async fn fetch_history(&self, req: &HistoryRequest) -> Result<Vec<PricePoint>, ProviderError> {
        let (address, network_id) = self.token_ref(&req.token);
        let to = UtcDateTime::now().unix_seconds();
        let from = UtcDateTime::now().start_of_day().unix_seconds()
            - i64::from(req.days) * SECONDS_PER_DAY;

        let body = self
            .query(
                BARS_QUERY,
                json!({ "symbol": format!("{address}:{network_id}"), "from": from, "to": to }),
            )
            .await?;

        parse_bars(&body)
    }

    async fn fetch_price(&self, token: &TokenId) -> Result<PriceSnapshot, ProviderError> {
        let (address, network_id) = self.token_ref(token);
        let body = self
            .query(
                PRICE_QUERY,
                json!({ "inputs": [{ "address": address, "networkId": network_id }] }),
            )
            .await?;

        parse_price(token, &body)
    }
}

impl TokenDataSource for CodexAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Codex
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, false, true, true, true)
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

    fn token_info<'a>(&'a self, token: &'a TokenId) -> ProviderFuture<'a, TokenInfo> {
        Box::pin(self.fetch_token_info(token))
    }
}

fn parse_token_info(
    token: &TokenId,
    body: &Value,
    network: Option<String>,
) -> Result<TokenInfo, ProviderError> {
    let mut v = ResponseValidator::new("codex token");
    let Some(data) = v.required_object(body, "data.token") else {
        return Err(invalid(v));
    };

    let name = v.required_str(data, "name");
    let symbol = v.required_str(data, "symbol");
    let address = v.optional_str(data, "address");
    let decimals = v.optional_u64(data, "decimals");
    let total_supply = v.optional_f64(data, "info.totalSupply");
    let circulating_supply = v.optional_f64(data, "info.circulatingSupply");

    if decimals.is_some_and(|decimals| decimals > u64::from(u8::MAX)) {
        v.error("decimals: out of range");
    }

    let (name, symbol) = v
        .finish(|| Some((name?, symbol?)))
        .map_err(|errors| ProviderError::validation(ProviderId::Codex, &errors))?;

    TokenInfo::new(
        token.clone(),
        name,
        symbol,
        address,
        network,
        decimals.map(|decimals| decimals as u8),
        total_supply,
        circulating_supply,
    )
    .map_err(|error| domain_error(ProviderId::Codex, "codex token", error))
}

fn parse_holders(
    token: &TokenId,
    body: &Value,
    supply_hint: Option<f64>,
) -> Result<HolderPage, ProviderError> {
    let mut v = ResponseValidator::new("codex holders");
    let Some(holders) = v.required_object(body, "data.holders") else {
        return Err(invalid(v));
    };

    let count = v.required_u64(holders, "count");
    let cursor = v.optional_str(holders, "cursor");
    let items = v.required_array(holders, "items").unwrap_or_default();
    let supply = v
        .optional_f64(body, "data.token.info.totalSupply")
        .or(supply_hint);

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let row = v.nested(format!("items[{index}]"), |v| {
            let address = v.required_str(item, "address");
            let balance = v.required_f64(item, "shiftedBalance");
            if balance.is_some_and(|balance| balance < 0.0) {
                v.error("shiftedBalance: negative balance");
            }
            address.zip(balance)
        });
        rows.extend(row);
    }

    let count = v
        .finish(|| count)
        .map_err(|errors| ProviderError::validation(ProviderId::Codex, &errors))?;

    let holders = normalize_holders(rows, supply)
        .map_err(|error| domain_error(ProviderId::Codex, "codex holders", error))?;
    HolderPage::new(token.clone(), count, holders, cursor)
        .map_err(|error| domain_error(ProviderId::Codex, "codex holders", error))
}

fn parse_bars(body: &Value) -> Result<Vec<PricePoint>, ProviderError> {
    let mut v = ResponseValidator::new("codex bars");
    let Some(bars) = v.required_object(body, "data.getBars") else {
        return Err(invalid(v));
    };

    let times = v.required_array(bars, "t").unwrap_or_default();
    let closes = v.required_array(bars, "c").unwrap_or_default();
    let volumes = bars
        .get("volume")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    if times.len() != closes.len() {
        v.error(format!(
            "t/c length mismatch: {} timestamps, {} closes",
            times.len(),
            closes.len()
        ));
    }

    let mut points = Vec::with_capacity(times.len());
    for (index, (ts, close)) in times.iter().zip(closes).enumerate() {
        // Gaps in thin markets come back as null closes.
        if close.is_null() {
            continue;
        }

        let point = v.nested(format!("bars[{index}]"), |v| {
            let ts = v.required_u64(ts, "");
            let close = v.required_f64(close, "");
            let volume = volumes.get(index).and_then(|volume| v.optional_f64(volume, ""));
            Some((ts?, close?, volume))
        });
        points.extend(point);
    }

    let points = v
        .finish(|| Some(points))
        .map_err(|errors| ProviderError::validation(ProviderId::Codex, &errors))?;

    points
        .into_iter()
        .map(|(ts, close, volume)| {
            let ts = UtcDateTime::from_unix_seconds(ts as i64)?;
            PricePoint::new(ts.start_of_day(), close, volume)
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| domain_error(ProviderId::Codex, "codex bars", error))
}

fn parse_price(token: &TokenId, body: &Value) -> Result<PriceSnapshot, ProviderError> {
    let mut v = ResponseValidator::new("codex price");
    let Some(first) = v.required(body, "data.getTokenPrices.0") else {
        return Err(invalid(v));
    };

    let price = v.required_f64(first, "priceUsd");
    let price = v
        .finish(|| price)
        .map_err(|errors| ProviderError::validation(ProviderId::Codex, &errors))?;

    PriceSnapshot::new(token.clone(), price, None, None, None, None)
        .map_err(|error| domain_error(ProviderId::Codex, "codex price", error))
}

fn invalid(v: ResponseValidator) -> ProviderError {
    match v.finish(|| None::<()>) {
        Err(errors) => ProviderError::validation(ProviderId::Codex, &errors),
        Ok(()) => ProviderError::validation_message(ProviderId::Codex, "codex response incomplete"),
    }
}
