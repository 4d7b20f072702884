use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

/// 按数量的团队折扣档位: quantity >= min_quantity 时适用 rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkTier {
    pub min_quantity: u32,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// 国家代码 -> PPP 折扣率 (0..=1)
    #[serde(default)]
    pub ppp_rates: HashMap<String, Decimal>,
    #[serde(default = "default_bulk_tiers")]
    pub bulk_tiers: Vec<BulkTier>,
}

fn default_bulk_tiers() -> Vec<BulkTier> {
    vec![
        BulkTier {
            min_quantity: 5,
            rate: dec!(0.05),
        },
        BulkTier {
            min_quantity: 10,
            rate: dec!(0.10),
        },
        BulkTier {
            min_quantity: 20,
            rate: dec!(0.15),
        },
        BulkTier {
            min_quantity: 50,
            rate: dec!(0.20),
        },
    ]
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            ppp_rates: HashMap::new(),
            bulk_tiers: default_bulk_tiers(),
        }
    }
}

impl PricingConfig {
    /// Rejects rates outside 0..=1 and country keys that are not two letters;
    /// normalizes country keys to upper case.
    pub fn validated(mut self) -> AppResult<Self> {
        let mut ppp_rates = HashMap::with_capacity(self.ppp_rates.len());
        for (country, rate) in self.ppp_rates {
            let code = crate::utils::normalize_country_code(&country)
                .map_err(|_| AppError::ConfigError(format!("invalid PPP country code: {country}")))?;
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(AppError::ConfigError(format!(
                    "PPP rate for {code} must be between 0 and 1"
                )));
            }
            ppp_rates.insert(code, rate);
        }
        self.ppp_rates = ppp_rates;

        for tier in &self.bulk_tiers {
            if tier.min_quantity < 2 || tier.rate < Decimal::ZERO || tier.rate > Decimal::ONE {
                return Err(AppError::ConfigError(format!(
                    "invalid bulk tier: min_quantity={} rate={}",
                    tier.min_quantity, tier.rate
                )));
            }
        }
        self.bulk_tiers.sort_by_key(|t| t.min_quantity);
        Ok(self)
    }

    pub fn ppp_rate(&self, country: &str) -> Option<Decimal> {
        self.ppp_rates.get(country).copied()
    }

    /// Rate of the highest tier the quantity reaches.
    pub fn bulk_rate(&self, quantity: u32) -> Option<Decimal> {
        self.bulk_tiers
            .iter()
            .filter(|t| quantity >= t.min_quantity)
            .map(|t| t.rate)
            .max()
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    pricing: PricingConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        // PPP_RATES="IN=0.6,BR=0.5"
        if let Ok(v) = env::var("PPP_RATES") {
            let mut rates = HashMap::new();
            for pair in v.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (country, rate) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("PPP_RATES 格式错误: {pair}"))?;
                let rate: Decimal = rate
                    .trim()
                    .parse()
                    .map_err(|e| format!("PPP_RATES 折扣率无效 {pair}: {e}"))?;
                rates.insert(country.trim().to_string(), rate);
            }
            config.pricing.ppp_rates = rates;
        }

        config.pricing = config.pricing.validated()?;

        Ok(config)
    }
}
