use reqwest::{header::CONTENT_TYPE, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::{config::AppConfig, telemetry};

/**
 * \brief 通用 HTTP 请求错误。
 */
#[derive(Debug, Error)]
pub enum ApiError {
    /** \brief 请求未完成（连接失败等） */
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /** \brief 服务端返回非 2xx */
    #[error("HTTP error! status: {status} - {status_text}")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("empty response body for {method} {path}")]
    EmptyBody { method: Method, path: String },
}

impl ApiError {
    /**
     * \brief 非 2xx 时的状态码。
     */
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown Status").to_string()
}

/**
 * \brief 面向控制台后端的 JSON 请求封装：单次请求，无重试、无超时。
 */
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    debug: bool,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.full_api_url(),
            debug: config.is_development(),
        })
    }

    /**
     * \brief 完整 API 前缀，如 http://localhost:8081/api/v1
     */
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /**
     * \brief 发送请求；204 或空响应体返回 None，否则解析 JSON。
     * \param path 以 / 开头的相对路径
     * \param body 可选请求体，存在时以 JSON 编码
     */
    pub async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let result = match self.execute(method.clone(), &url, body).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).map(Some).map_err(ApiError::from),
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };
        self.trace_failure(&method, &url, &result);
        result
    }

    async fn execute<B>(&self, method: Method, url: &str, body: Option<&B>) -> ApiResult<Option<Vec<u8>>>
    where
        B: Serialize + ?Sized,
    {
        let mut req = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.body(serde_json::to_vec(body)?);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                status_text: status_text(status),
                body: text,
            });
        }

        let bytes = resp.bytes().await?;
        if status == StatusCode::NO_CONTENT || bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(bytes.to_vec()))
    }

    fn trace_failure<T>(&self, method: &Method, url: &str, result: &ApiResult<T>) {
        if let Err(err) = result {
            if self.debug {
                telemetry::log_error("api.request", &format!("{} {} failed: {}", method, url, err));
            }
        }
    }

    async fn expect_body<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(method.clone(), path, body)
            .await?
            .ok_or_else(|| ApiError::EmptyBody {
                method,
                path: path.to_string(),
            })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.expect_body::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.expect_body(Method::POST, path, Some(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.expect_body(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.expect_body(Method::PATCH, path, Some(body)).await
    }

    /**
     * \brief DELETE 请求，忽略任何响应体。
     */
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let result = self
            .execute::<()>(Method::DELETE, &url, None)
            .await
            .map(|_| ());
        self.trace_failure(&Method::DELETE, &url, &result);
        result
    }
}
