use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::adapters::{domain_error, ProviderTransport};
use crate::data_source::{
    CapabilitySet, ProviderCaches, ProviderError, ProviderFuture, TokenDataSource,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::validation::ResponseValidator;
use crate::{AssetCatalog, PriceSnapshot, ProviderId, TokenId};

pub const COINGECKO_PUBLIC_URL: &str = "https://api.coingecko.com/api/v3";

/// Tertiary provider: batch USD prices keyed by CoinGecko coin id.
#[derive(Debug, Clone)]
pub struct CoingeckoAdapter {
    transport: ProviderTransport,
    catalog: Arc<AssetCatalog>,
    caches: ProviderCaches,
    base_url: String,
}

impl CoingeckoAdapter {
    /// Without a key the public tier is used.
    pub fn new(
        http: Arc<dyn HttpClient>,
        api_key: Option<String>,
        catalog: Arc<AssetCatalog>,
        policy: ProviderPolicy,
        cache_entries: usize,
    ) -> Self {
        let auth = match api_key {
            Some(key) => HttpAuth::Header {
                name: String::from("x-cg-demo-api-key"),
                value: key,
            },
            None => HttpAuth::None,
        };

        Self {
            caches: ProviderCaches::new(policy.ttls, cache_entries),
            transport: ProviderTransport::new(http, auth, policy),
            catalog,
            base_url: String::from(COINGECKO_PUBLIC_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_prices(
        &self,
        tokens: &[TokenId],
    ) -> Result<BTreeMap<TokenId, PriceSnapshot>, ProviderError> {
        let listed: Vec<(&TokenId, String)> = tokens
            .iter()
            .filter_map(|token| self.catalog.coingecko_id_for(token).map(|id| (token, id)))
            .collect();

        if listed.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut ids: Vec<&str> = listed.iter().map(|(_, id)| id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();

        let request = HttpRequest::get(format!("{}/simple/price", self.base_url)).with_query([
            ("ids", Some(ids.join(","))),
            ("vs_currencies", Some(String::from("usd"))),
            ("include_24hr_change", Some(String::from("true"))),
            ("include_24hr_vol", Some(String::from("true"))),
            ("include_market_cap", Some(String::from("true"))),
        ]);
        let body = self.transport.send_json(request).await?;
        parse_simple_prices(&listed, &body)
    }

    async fn fetch_price(&self, token: &TokenId) -> Result<PriceSnapshot, ProviderError> {
        if self.catalog.coingecko_id_for(token).is_none() {
            return Err(ProviderError::unknown_token(ProviderId::Coingecko, token));
        }

        let mut prices = self.fetch_prices(std::slice::from_ref(token)).await?;
        prices.remove(token).ok_or_else(|| {
            ProviderError::validation_message(
                ProviderId::Coingecko,
                format!("coingecko price: no quote returned for '{token}'"),
            )
        })
    }
}

impl TokenDataSource for CoingeckoAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Coingecko
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, false, false, false)
    }

    fn caches(&self) -> &ProviderCaches {
        &self.caches
    }

    fn price<'a>(&'a self, token: &'a TokenId) -> ProviderFuture<'a, PriceSnapshot> {
        Box::pin(self.fetch_price(token))
    }

    fn batch_prices<'a>(
        &'a self,
        tokens: &'a [TokenId],
    ) -> ProviderFuture<'a, BTreeMap<TokenId, PriceSnapshot>> {
        Box::pin(self.fetch_prices(tokens))
    }
}

/// Tokens whose id is absent from the response are left out; a present entry
/// with a malformed shape fails the whole batch.
fn parse_simple_prices(
    listed: &[(&TokenId, String)],
    body: &Value,
) -> Result<BTreeMap<TokenId, PriceSnapshot>, ProviderError> {
    let mut v = ResponseValidator::new("coingecko simple price");
    if !body.is_object() {
        v.error("expected object keyed by coin id");
    }

    let mut rows = Vec::with_capacity(listed.len());
    for (token, id) in listed {
        let Some(entry) = body.get(id.as_str()) else {
            debug!(token = %token, coin_id = %id, "coingecko returned no quote");
            continue;
        };

        let row = v.nested(id.clone(), |v| {
            let price = v.required_f64(entry, "usd")?;
            Some((
                (*token).clone(),
                price,
                v.optional_f64(entry, "usd_24h_change"),
                v.optional_f64(entry, "usd_24h_vol"),
                v.optional_f64(entry, "usd_market_cap"),
            ))
        });
        rows.extend(row);
    }

    let rows = v
        .finish(|| Some(rows))
        .map_err(|errors| ProviderError::validation(ProviderId::Coingecko, &errors))?;

    rows.into_iter()
        .map(|(token, price, change, volume, market_cap)| {
            PriceSnapshot::new(token.clone(), price, change, volume, market_cap, None)
                .map(|snapshot| (token, snapshot))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()
        .map_err(|error| domain_error(ProviderId::Coingecko, "coingecko simple price", error))
}
