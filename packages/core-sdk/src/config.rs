use std::{fmt, str::FromStr};

use anyhow::{Context, Result};

use crate::models::UnknownVariant;

pub const ENV_API_BASE_URL: &str = "AIGW_CONSOLE_API_BASE_URL";
pub const ENV_API_VERSION: &str = "AIGW_CONSOLE_API_VERSION";
pub const ENV_ENVIRONMENT: &str = "AIGW_CONSOLE_ENVIRONMENT";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8081";
pub const DEFAULT_API_VERSION: &str = "v1";

/**
 * \brief 运行环境。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(UnknownVariant {
                kind: "environment",
                value: s.to_string(),
            }),
        }
    }
}

/**
 * \brief 控制台客户端配置。启动时读取一次，之后只读，显式传入各组件。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /** \brief 后端基地址，如 http://localhost:8081 */
    pub api_base_url: String,
    /** \brief API 版本，默认 v1 */
    pub api_version: String,
    pub environment: Environment,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            environment: Environment::Development,
        }
    }
}

impl AppConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    /**
     * \brief 从进程环境变量读取配置。
     */
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /**
     * \brief 通过任意查找函数读取配置，便于测试注入。空值视为未设置。
     */
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base_url = get(ENV_API_BASE_URL).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_version = get(ENV_API_VERSION).unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let environment = match get(ENV_ENVIRONMENT) {
            Some(raw) => raw
                .parse::<Environment>()
                .with_context(|| format!("invalid {}", ENV_ENVIRONMENT))?,
            None => Environment::Development,
        };

        Ok(Self {
            api_base_url,
            api_version,
            environment,
        })
    }

    /**
     * \brief 拼接完整 API 前缀：`<base>/api/<version>`。
     */
    pub fn full_api_url(&self) -> String {
        format!(
            "{}/api/{}",
            self.api_base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
