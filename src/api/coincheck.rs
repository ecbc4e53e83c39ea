use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::time::{sleep, Duration};

use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::models::{Balance, BuyFill, Quote, RateAmount, SellFill, Side};

const COINCHECK_API_BASE: &str = "https://coincheck.com";
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const RATE_LIMIT_PER_SEC: u32 = 5;
const REQUEST_TIMEOUT_SECS: u64 = 30;

type CoincheckRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// API key pair for private endpoints
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// `hex(HMAC-SHA256(secret, nonce + url + body))`
pub fn sign(secret: &str, nonce: u64, url: &str, body: &str) -> Result<String, ExchangeError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Fatal(format!("HMAC key error: {}", e)))?;
    mac.update(nonce.to_string().as_bytes());
    mac.update(url.as_bytes());
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Coincheck serializes most numbers as strings
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn required_number(value: &Value, field: &str) -> Result<f64, ExchangeError> {
    number(value).ok_or_else(|| ExchangeError::Fatal(format!("missing numeric field {}", field)))
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    last: Value,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: Value,
    #[serde(default)]
    amount: Value,
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    rate: Value,
    price: Value,
    amount: Value,
}

/// Client for the Coincheck REST API, bound to one trading pair
pub struct CoincheckClient {
    client: Client,
    base_url: String,
    pair: String,
    coin: String,
    credentials: Option<Credentials>,
    rate_limiter: Arc<CoincheckRateLimiter>,
    last_nonce: AtomicU64,
    initial_backoff: Duration,
}

impl CoincheckClient {
    pub fn new(pair: &str, credentials: Option<Credentials>) -> Result<Self, ExchangeError> {
        Self::with_base_url(COINCHECK_API_BASE, pair, credentials)
    }

    /// Point the client at another host (tests, proxies)
    pub fn with_base_url(
        base_url: &str,
        pair: &str,
        credentials: Option<Credentials>,
    ) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExchangeError::Fatal(format!("HTTP client setup failed: {}", e)))?;

        let quota = Quota::per_second(
            NonZeroU32::new(RATE_LIMIT_PER_SEC).unwrap_or(NonZeroU32::MIN),
        );
        let coin = pair.split('_').next().unwrap_or(pair).to_string();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            pair: pair.to_string(),
            coin,
            credentials,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            last_nonce: AtomicU64::new(0),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Override the first retry delay (doubles per attempt)
    pub fn with_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Strictly increasing microsecond nonce
    fn next_nonce(&self) -> u64 {
        let now = Utc::now().timestamp_micros().max(0) as u64;
        let previous = self
            .last_nonce
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }

    async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T, ExchangeError> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        Self::parse(response).await
    }

    async fn get_private<T: DeserializeOwned>(&self, path: &str) -> Result<T, ExchangeError> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, path);
        let (key, nonce, signature) = self.auth(&url, "")?;

        let response = self
            .client
            .get(&url)
            .header("ACCESS-KEY", key)
            .header("ACCESS-NONCE", nonce)
            .header("ACCESS-SIGNATURE", signature)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn post_private<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, ExchangeError> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, path);
        let body = body.to_string();
        let (key, nonce, signature) = self.auth(&url, &body)?;

        let response = self
            .client
            .post(&url)
            .header("ACCESS-KEY", key)
            .header("ACCESS-NONCE", nonce)
            .header("ACCESS-SIGNATURE", signature)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    fn auth(&self, url: &str, body: &str) -> Result<(String, String, String), ExchangeError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ExchangeError::Fatal("API credentials required".to_string()))?;
        let nonce = self.next_nonce();
        let signature = sign(&credentials.secret, nonce, url, body)?;
        Ok((credentials.access_key.clone(), nonce.to_string(), signature))
    }

    /// Map HTTP status and `success: false` bodies onto the error classes
    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ExchangeError> {
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExchangeError::Fatal(format!("{}: {}", status, body)));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(ExchangeError::Transient(format!("{}: {}", status, body)));
        }

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                return Err(ExchangeError::Rejected(format!("{}: {}", status, body)))
            }
            Err(e) => return Err(ExchangeError::Fatal(format!("malformed response: {}", e))),
        };

        if !status.is_success() || value.get("success") == Some(&Value::Bool(false)) {
            let message = value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            return Err(ExchangeError::Rejected(message));
        }

        serde_json::from_value(value)
            .map_err(|e| ExchangeError::Fatal(format!("unexpected response shape: {}", e)))
    }

    async fn fetch_price_once(&self) -> Result<f64, ExchangeError> {
        let ticker: TickerResponse = self
            .get_public(&format!("/api/ticker?pair={}", self.pair))
            .await?;
        required_number(&ticker.last, "last")
    }
}

impl Exchange for CoincheckClient {
    /// Retries transient failures with exponential backoff
    async fn get_last_price(&mut self) -> Result<f64, ExchangeError> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.fetch_price_once().await {
                Ok(price) => {
                    if attempt > 1 {
                        tracing::info!(
                            "✓ Fetched {} ticker after {} attempts",
                            self.pair,
                            attempt
                        );
                    }
                    return Ok(price);
                }
                Err(e) if e.is_transient() => {
                    if attempt < MAX_RETRIES {
                        let backoff = self.initial_backoff * 2_u32.pow(attempt - 1);
                        tracing::warn!(
                            "Attempt {}/{} failed for {} ticker: {}. Retrying in {}ms...",
                            attempt,
                            MAX_RETRIES,
                            self.pair,
                            e,
                            backoff.as_millis()
                        );
                        sleep(backoff).await;
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| ExchangeError::Transient("all retry attempts failed".to_string())))
    }

    async fn place_market_buy(&mut self, currency_amount: f64) -> Result<BuyFill, ExchangeError> {
        let body = json!({
            "pair": self.pair,
            "order_type": "market_buy",
            "market_buy_amount": currency_amount,
        });
        let order: OrderResponse = self.post_private("/api/exchange/orders", &body).await?;

        // Market buys usually report no amount; estimate the fill from a quote
        let filled = match number(&order.amount).filter(|a| *a > 0.0) {
            Some(amount) => amount,
            None => match self
                .get_rate(Side::Buy, RateAmount::Currency(currency_amount))
                .await
            {
                Ok(quote) => quote.amount,
                Err(e) => {
                    tracing::warn!("Could not estimate fill for buy order: {}", e);
                    0.0
                }
            },
        };

        Ok(BuyFill {
            order_id: order_id(&order.id),
            filled_asset_amount: filled,
            cost_amount: currency_amount,
        })
    }

    /// Sells at most the available balance; an unknown or oversized amount
    /// sells everything held
    async fn place_market_sell(&mut self, asset_amount: f64) -> Result<SellFill, ExchangeError> {
        let available = self.get_balance().await?.asset;
        let amount = if asset_amount <= 0.0 || asset_amount > available {
            available
        } else {
            asset_amount
        };
        if amount <= 0.0 {
            return Err(ExchangeError::Rejected(format!("no {} to sell", self.coin)));
        }

        let body = json!({
            "pair": self.pair,
            "order_type": "market_sell",
            "amount": amount,
        });
        let order: OrderResponse = self.post_private("/api/exchange/orders", &body).await?;

        Ok(SellFill {
            order_id: order_id(&order.id),
            sold_asset_amount: amount,
        })
    }

    async fn get_rate(&self, side: Side, amount: RateAmount) -> Result<Quote, ExchangeError> {
        let sizing = match amount {
            RateAmount::Asset(asset) => format!("amount={}", asset),
            RateAmount::Currency(currency) => format!("price={}", currency),
        };
        let path = format!(
            "/api/exchange/orders/rate?order_type={}&pair={}&{}",
            side.as_str(),
            self.pair,
            sizing
        );
        let rate: RateResponse = self.get_public(&path).await?;

        Ok(Quote {
            rate: required_number(&rate.rate, "rate")?,
            price: required_number(&rate.price, "price")?,
            amount: required_number(&rate.amount, "amount")?,
        })
    }

    async fn get_balance(&self) -> Result<Balance, ExchangeError> {
        let balances: HashMap<String, Value> = self.get_private("/api/accounts/balance").await?;
        let field = |key: &str| balances.get(key).and_then(number).unwrap_or(0.0);

        Ok(Balance {
            currency: field("jpy"),
            asset: field(&self.coin),
        })
    }
}

fn order_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
