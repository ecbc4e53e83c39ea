use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use crate::api::Credentials;
use crate::backtest::MarketScenario;
use crate::error::{ConfigError, ExchangeError};
use crate::exchange::Exchange;
use crate::execution::TradeAmount;
use crate::models::{RateAmount, Side};
use crate::risk::CircuitBreakers;
use crate::scheduler::SchedulerConfig;
use crate::strategy::{Algorithm, SignalConfig};

pub const SUPPORTED_COINS: [&str; 4] = ["btc", "etc", "fct", "mona"];

/// Smallest tradable amount in JPY for every coin but btc
pub const MIN_TRADE_AMOUNT: f64 = 500.0;

/// Smallest btc order; its quote price is the btc minimum
pub const BTC_MIN_ORDER: f64 = 0.005;

const DEFAULT_CONFIG_FILE: &str = "config/default";

fn default_coin() -> String {
    "btc".to_string()
}

fn default_algorithm() -> String {
    Algorithm::Difference.as_str().to_string()
}

fn default_interval() -> usize {
    60
}

fn default_tick_seconds() -> f64 {
    1.0
}

fn default_cooldown_hours() -> f64 {
    5.0
}

fn default_market() -> String {
    "coincheck".to_string()
}

fn default_api_base_url() -> String {
    "https://coincheck.com".to_string()
}

fn default_project_name() -> String {
    "spotbot".to_string()
}

fn default_scenario() -> MarketScenario {
    MarketScenario::Sideways
}

fn default_seed() -> u64 {
    42
}

/// Raw settings as loaded from file, environment and flags
///
/// Env vars map by lowercased name (`AMOUNT` → `amount`). `amount` and
/// `simulation` stay strings so empty values keep their meaning.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_coin")]
    pub coin: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default = "default_interval")]
    pub interval: usize,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,
    #[serde(default)]
    pub simulation: Option<String>,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: f64,
    #[serde(default)]
    pub series_capacity: Option<usize>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_scenario")]
    pub scenario: MarketScenario,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            coin: default_coin(),
            algorithm: default_algorithm(),
            amount: None,
            interval: default_interval(),
            tick_seconds: default_tick_seconds(),
            simulation: None,
            market: default_market(),
            cooldown_hours: default_cooldown_hours(),
            series_capacity: None,
            access_key: None,
            api_secret: None,
            api_base_url: default_api_base_url(),
            database_url: None,
            redis_url: None,
            project_name: default_project_name(),
            scenario: default_scenario(),
            seed: default_seed(),
        }
    }
}

/// Command-line values that win over file and environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub coin: Option<String>,
    pub algorithm: Option<String>,
    pub amount: Option<String>,
    pub interval: Option<usize>,
    pub simulation: bool,
    pub market: Option<String>,
}

impl Settings {
    /// Layer `path` (or `config/default.toml` if present) < env < `overrides`
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, config::ConfigError> {
        let builder = Config::builder();
        let builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        let builder = builder.add_source(Environment::default());

        Self::build(Self::apply_overrides(builder, overrides)?)
    }

    fn apply_overrides(
        builder: ConfigBuilder<config::builder::DefaultState>,
        overrides: &Overrides,
    ) -> Result<ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        builder
            .set_override_option("coin", overrides.coin.clone())?
            .set_override_option("algorithm", overrides.algorithm.clone())?
            .set_override_option("amount", overrides.amount.clone())?
            .set_override_option("interval", overrides.interval.map(|i| i as i64))?
            .set_override_option("market", overrides.market.clone())?
            .set_override_option(
                "simulation",
                overrides.simulation.then(|| "true".to_string()),
            )
    }

    fn build(
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// Check every option and produce the runtime configuration
    pub fn validate(&self) -> Result<TraderConfig, ConfigError> {
        let coin = self.coin.trim().to_ascii_lowercase();
        if !SUPPORTED_COINS.contains(&coin.as_str()) {
            return Err(ConfigError::InvalidCoin(self.coin.clone()));
        }

        let algorithm: Algorithm = self.algorithm.parse()?;
        let signal = SignalConfig::default();
        let amount = parse_amount(self.amount.as_deref())?;
        let simulation = parse_simulation(self.simulation.as_deref());

        if self.interval == 0 {
            return Err(invalid("interval", self.interval));
        }
        if !self.tick_seconds.is_finite() || self.tick_seconds < 0.0 {
            return Err(invalid("tick_seconds", self.tick_seconds));
        }
        if !self.cooldown_hours.is_finite() || self.cooldown_hours < 0.0 {
            return Err(invalid("cooldown_hours", self.cooldown_hours));
        }

        let lookback = algorithm.lookback(&signal);
        let series_capacity = self
            .series_capacity
            .unwrap_or_else(|| algorithm.default_capacity(&signal));
        if series_capacity < lookback {
            return Err(invalid("series_capacity", series_capacity));
        }

        let mode = if simulation {
            ExecutionMode::Simulation {
                market: self.market.parse()?,
            }
        } else {
            ExecutionMode::Live
        };

        let credentials = match (non_empty(&self.access_key), non_empty(&self.api_secret)) {
            (Some(access_key), Some(secret)) => Some(Credentials {
                access_key: access_key.to_string(),
                secret: secret.to_string(),
            }),
            (None, _) if mode == ExecutionMode::Live => {
                return Err(ConfigError::MissingCredentials("ACCESS_KEY"))
            }
            (_, None) if mode == ExecutionMode::Live => {
                return Err(ConfigError::MissingCredentials("API_SECRET"))
            }
            _ => None,
        };

        // Simulation never waits out a breaker cooldown
        let cooldown = if simulation {
            chrono::Duration::zero()
        } else {
            chrono::Duration::seconds((self.cooldown_hours * 3600.0).round() as i64)
        };

        Ok(TraderConfig {
            pair: format!("{}_jpy", coin),
            coin,
            algorithm,
            signal,
            amount,
            interval: self.interval,
            tick_period: Duration::from_secs_f64(self.tick_seconds),
            mode,
            cooldown,
            series_capacity,
            credentials,
            api_base_url: self.api_base_url.clone(),
            database_url: non_empty(&self.database_url).map(str::to_string),
            redis_url: non_empty(&self.redis_url).map(str::to_string),
            project_name: self.project_name.clone(),
            scenario: self.scenario,
            seed: self.seed,
        })
    }
}

fn invalid(field: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        value: value.to_string(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Empty or absent means spend the full balance
fn parse_amount(raw: Option<&str>) -> Result<TradeAmount, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(TradeAmount::FullBalance);
    };

    match raw.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(TradeAmount::Fixed(amount)),
        _ => Err(invalid("amount", raw)),
    }
}

/// Empty, absent or exactly `false` means live trading; any other value
/// (including `False`) simulates
fn parse_simulation(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        None => false,
        Some(v) => !(v.is_empty() || v == "false"),
    }
}

/// Where simulated trading gets its prices and quotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSource {
    Coincheck,
    Synthetic,
}

impl std::str::FromStr for MarketSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coincheck" => Ok(MarketSource::Coincheck),
            "synthetic" => Ok(MarketSource::Synthetic),
            _ => Err(invalid("market", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Live,
    Simulation { market: MarketSource },
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct TraderConfig {
    pub coin: String,
    pub pair: String,
    pub algorithm: Algorithm,
    pub signal: SignalConfig,
    pub amount: TradeAmount,
    pub interval: usize,
    pub tick_period: Duration,
    pub mode: ExecutionMode,
    pub cooldown: chrono::Duration,
    pub series_capacity: usize,
    pub credentials: Option<Credentials>,
    pub api_base_url: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub project_name: String,
    pub scenario: MarketScenario,
    pub seed: u64,
}

impl TraderConfig {
    pub fn is_live(&self) -> bool {
        self.mode == ExecutionMode::Live
    }

    pub fn scheduler_config(&self, starting_profit: f64) -> SchedulerConfig {
        SchedulerConfig {
            pair: self.pair.clone(),
            algorithm: self.algorithm,
            signal: self.signal.clone(),
            amount: self.amount,
            interval: self.interval,
            tick_period: self.tick_period,
            series_capacity: self.series_capacity,
            breaker: CircuitBreakers {
                cooldown: self.cooldown,
                ..Default::default()
            },
            starting_profit,
        }
    }

    /// Smallest amount this coin may trade, in JPY
    pub async fn minimum_amount<E: Exchange>(&self, exchange: &E) -> Result<f64, ConfigError> {
        let quote = exchange
            .get_rate(Side::Sell, RateAmount::Asset(BTC_MIN_ORDER))
            .await
            .map_err(startup_error)?;

        Ok(if self.coin == "btc" {
            quote.price
        } else {
            MIN_TRADE_AMOUNT
        })
    }

    /// Startup checks against the exchange: the API key works and the
    /// trade amount clears the minimum; returns the amount a buy would spend
    pub async fn verify_exchange<E: Exchange>(&self, exchange: &E) -> Result<f64, ConfigError> {
        let min = self.minimum_amount(exchange).await?;

        let needs_balance = self.is_live() || self.amount == TradeAmount::FullBalance;
        let balance = if needs_balance {
            Some(exchange.get_balance().await.map_err(startup_error)?)
        } else {
            None
        };

        let amount = match (self.amount, balance) {
            (TradeAmount::Fixed(amount), _) => amount,
            (TradeAmount::FullBalance, Some(balance)) => balance.currency,
            (TradeAmount::FullBalance, None) => 0.0,
        };

        if amount < min {
            return Err(ConfigError::AmountBelowMinimum { amount, min });
        }
        Ok(amount)
    }
}

fn startup_error(error: ExchangeError) -> ConfigError {
    match error {
        ExchangeError::Transient(message) => ConfigError::ExchangeUnavailable(message),
        ExchangeError::Rejected(_) | ExchangeError::Fatal(_) => {
            tracing::error!("API key check failed: {}", error);
            ConfigError::InvalidApiKey
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::SyntheticMarket;
    use crate::exchange::SimulatedExchange;
    use config::FileFormat;

    fn simulated(settings: Settings) -> Settings {
        Settings {
            simulation: Some("true".to_string()),
            ..settings
        }
    }

    fn from_toml(toml: &str) -> Settings {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Settings::build(builder).unwrap()
    }

    #[test]
    fn test_defaults_need_credentials_when_live() {
        let err = Settings::default().validate().unwrap_err();
        assert_eq!(err, ConfigError::MissingCredentials("ACCESS_KEY"));
    }

    #[test]
    fn test_simulation_defaults() {
        let config = simulated(Settings::default()).validate().unwrap();
        assert_eq!(config.pair, "btc_jpy");
        assert_eq!(config.algorithm, Algorithm::Difference);
        assert_eq!(config.amount, TradeAmount::FullBalance);
        assert_eq!(config.series_capacity, 3);
        assert_eq!(config.cooldown, chrono::Duration::zero());
        assert_eq!(
            config.mode,
            ExecutionMode::Simulation {
                market: MarketSource::Coincheck
            }
        );
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_live_config_keeps_cooldown() {
        let config = Settings {
            access_key: Some("key".to_string()),
            api_secret: Some("secret".to_string()),
            simulation: Some("false".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert!(config.is_live());
        assert_eq!(config.cooldown, chrono::Duration::hours(5));
    }

    #[test]
    fn test_invalid_coin() {
        let err = simulated(Settings {
            coin: "doge".to_string(),
            ..Default::default()
        })
        .validate()
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidCoin("doge".to_string()));
    }

    #[test]
    fn test_algorithm_is_case_insensitive() {
        let config = simulated(Settings {
            algorithm: "bollinger_bands".to_string(),
            coin: "MONA".to_string(),
            ..Default::default()
        })
        .validate()
        .unwrap();
        assert_eq!(config.algorithm, Algorithm::BollingerBands);
        assert_eq!(config.pair, "mona_jpy");
        assert_eq!(config.series_capacity, 26);
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!(parse_amount(None).unwrap(), TradeAmount::FullBalance);
        assert_eq!(parse_amount(Some("  ")).unwrap(), TradeAmount::FullBalance);
        assert_eq!(parse_amount(Some("5000")).unwrap(), TradeAmount::Fixed(5000.0));
        assert!(parse_amount(Some("-1")).is_err());
        assert!(parse_amount(Some("lots")).is_err());
    }

    #[test]
    fn test_simulation_flag_parsing() {
        assert!(!parse_simulation(None));
        assert!(!parse_simulation(Some("")));
        assert!(!parse_simulation(Some("false")));
        assert!(parse_simulation(Some("true")));
        assert!(parse_simulation(Some("1")));
    }

    #[test]
    fn test_miscased_false_still_simulates() {
        assert!(parse_simulation(Some("False")));
        assert!(parse_simulation(Some("FALSE")));

        let config = Settings {
            simulation: Some("FALSE".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert!(!config.is_live());
    }

    #[test]
    fn test_capacity_below_lookback_rejected() {
        let err = simulated(Settings {
            algorithm: "MACD".to_string(),
            series_capacity: Some(10),
            ..Default::default()
        })
        .validate()
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "series_capacity",
                ..
            }
        ));
    }

    #[test]
    fn test_toml_values_coerce_to_strings() {
        let settings = from_toml(
            r#"
            coin = "etc"
            amount = 5000
            simulation = true
            market = "synthetic"
            scenario = "drawdown_test"
            "#,
        );
        let config = settings.validate().unwrap();
        assert_eq!(config.amount, TradeAmount::Fixed(5000.0));
        assert_eq!(
            config.mode,
            ExecutionMode::Simulation {
                market: MarketSource::Synthetic
            }
        );
        assert_eq!(config.scenario, MarketScenario::DrawdownTest);
    }

    #[test]
    fn test_overrides_win() {
        let builder = Config::builder().add_source(File::from_str(
            r#"coin = "etc""#,
            FileFormat::Toml,
        ));
        let overrides = Overrides {
            coin: Some("fct".to_string()),
            interval: Some(5),
            simulation: true,
            ..Default::default()
        };
        let settings =
            Settings::build(Settings::apply_overrides(builder, &overrides).unwrap()).unwrap();

        assert_eq!(settings.coin, "fct");
        assert_eq!(settings.interval, 5);
        assert_eq!(settings.simulation.as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_btc_minimum_is_quote_price() {
        let config = simulated(Settings {
            amount: Some("10000".to_string()),
            ..Default::default()
        })
        .validate()
        .unwrap();
        let exchange = SimulatedExchange::new(SyntheticMarket::scripted(vec![5_000_000.0]));

        let err = config.verify_exchange(&exchange).await.unwrap_err();
        assert_eq!(
            err,
            ConfigError::AmountBelowMinimum {
                amount: 10_000.0,
                min: 25_000.0
            }
        );
    }

    #[tokio::test]
    async fn test_full_balance_clears_minimum() {
        let config = simulated(Settings {
            coin: "mona".to_string(),
            ..Default::default()
        })
        .validate()
        .unwrap();
        let exchange = SimulatedExchange::new(SyntheticMarket::scripted(vec![300.0]));

        assert_eq!(config.verify_exchange(&exchange).await.unwrap(), 100_000.0);
    }

    #[tokio::test]
    async fn test_small_fixed_amount_rejected() {
        let config = simulated(Settings {
            coin: "mona".to_string(),
            amount: Some("100".to_string()),
            ..Default::default()
        })
        .validate()
        .unwrap();
        let exchange = SimulatedExchange::new(SyntheticMarket::scripted(vec![300.0]));

        assert!(matches!(
            config.verify_exchange(&exchange).await,
            Err(ConfigError::AmountBelowMinimum { .. })
        ));
    }
}
