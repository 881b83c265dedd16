use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
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
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

/// websocket 推送相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_client_timeout")]
    pub client_timeout_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            client_timeout_secs: default_client_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// 通知消息中金额前的货币符号
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            leaderboard_limit: default_leaderboard_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_heartbeat_interval() -> u64 {
    5
}

fn default_client_timeout() -> u64 {
    30
}

fn default_currency_symbol() -> String {
    "₦".to_string()
}

fn default_leaderboard_limit() -> u64 {
    10
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
                // 无配置文件：使用环境变量与默认值构建
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
                        port: get_env_parse("SERVER_PORT", 4000u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                        run_migrations: get_env_parse("DB_RUN_MIGRATIONS", true),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    realtime: RealtimeConfig {
                        heartbeat_interval_secs: get_env_parse(
                            "WS_HEARTBEAT_INTERVAL_SECS",
                            default_heartbeat_interval(),
                        ),
                        client_timeout_secs: get_env_parse(
                            "WS_CLIENT_TIMEOUT_SECS",
                            default_client_timeout(),
                        ),
                    },
                    ledger: LedgerConfig {
                        currency_symbol: get_env("LEDGER_CURRENCY_SYMBOL")
                            .unwrap_or_else(default_currency_symbol),
                        leaderboard_limit: get_env_parse(
                            "LEDGER_LEADERBOARD_LIMIT",
                            default_leaderboard_limit(),
                        ),
                    },
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
        if let Ok(v) = env::var("DB_RUN_MIGRATIONS")
            && let Ok(b) = v.parse()
        {
            config.database.run_migrations = b;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("WS_HEARTBEAT_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            config.realtime.heartbeat_interval_secs = n;
        }
        if let Ok(v) = env::var("WS_CLIENT_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            config.realtime.client_timeout_secs = n;
        }
        if let Ok(v) = env::var("LEDGER_CURRENCY_SYMBOL") {
            config.ledger.currency_symbol = v;
        }
        if let Ok(v) = env::var("LEDGER_LEADERBOARD_LIMIT")
            && let Ok(n) = v.parse()
        {
            config.ledger.leaderboard_limit = n;
        }

        Ok(config)
    }
}
