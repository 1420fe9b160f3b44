use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::cors::CorsLayer;

use crate::{models::ProviderResource, telemetry};

/** \brief 未指定 namespace 时使用的默认值。 */
pub const DEFAULT_NAMESPACE: &str = "default";

type ProviderKey = (String, String);

/**
 * \brief 本地开发后端的共享状态：按 (namespace, name) 存放 Provider，进程退出即丢失。
 */
#[derive(Clone, Default)]
pub struct AppState {
    providers: Arc<RwLock<BTreeMap<ProviderKey, ProviderResource>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * \brief 预置 Provider（未脱敏），主要用于测试。
     */
    pub async fn insert(&self, mut provider: ProviderResource) {
        let namespace = provider
            .namespace
            .get_or_insert_with(|| DEFAULT_NAMESPACE.to_string())
            .clone();
        self.providers
            .write()
            .await
            .insert((namespace, provider.name.clone()), provider);
    }

    /**
     * \brief 读取已保存的 Provider（未脱敏），主要用于测试。
     */
    pub async fn get(&self, namespace: &str, name: &str) -> Option<ProviderResource> {
        self.providers
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.providers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.providers.read().await.is_empty()
    }
}

/**
 * \brief 构建路由，API 前缀为 /api/<version>。
 */
pub fn router(state: AppState, api_version: &str) -> Router {
    let prefix = format!("/api/{}/llm/providers", api_version.trim_matches('/'));
    Router::new()
        .route("/health", get(health_check))
        .route(&prefix, get(list_providers).post(create_provider))
        .route(
            &format!("{}/{{name}}", prefix),
            get(get_provider).put(update_provider).delete(delete_provider),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/**
 * \brief 启动本地开发后端。
 * \param addr 监听地址，如 "127.0.0.1:8081"
 */
pub async fn run(addr: &str, api_version: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    println!("Server listening on http://{}", addr);
    serve(listener, AppState::new(), api_version).await
}

/**
 * \brief 在已绑定的监听器上提供服务。
 */
pub async fn serve(listener: TcpListener, state: AppState, api_version: &str) -> Result<()> {
    axum::serve(listener, router(state, api_version)).await?;
    Ok(())
}

#[derive(Deserialize, Debug, Default)]
struct NamespaceQuery {
    namespace: Option<String>,
}

impl NamespaceQuery {
    fn resolve(self) -> String {
        self.namespace
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }
}

type ApiResponse<T> = Result<T, (StatusCode, String)>;

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

/**
 * \brief 列出命名空间下的 Provider（脱敏）。
 */
async fn list_providers(
    State(state): State<AppState>,
    Query(q): Query<NamespaceQuery>,
) -> Json<Vec<ProviderResource>> {
    let namespace = q.resolve();
    let guard = state.providers.read().await;
    let items = guard
        .iter()
        .filter(|((ns, _), _)| *ns == namespace)
        .map(|(_, p)| p.mask_secrets())
        .collect();
    Json(items)
}

async fn get_provider(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<NamespaceQuery>,
) -> ApiResponse<Json<ProviderResource>> {
    let namespace = q.resolve();
    let guard = state.providers.read().await;
    guard
        .get(&(namespace.clone(), name.clone()))
        .map(|p| Json(p.mask_secrets()))
        .ok_or_else(|| not_found(&namespace, &name))
}

/**
 * \brief 新增 Provider，名称为空返回 400，重名返回 409。
 */
async fn create_provider(
    State(state): State<AppState>,
    Query(q): Query<NamespaceQuery>,
    Json(mut provider): Json<ProviderResource>,
) -> ApiResponse<(StatusCode, Json<ProviderResource>)> {
    if provider.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Provider name is required".to_string(),
        ));
    }
    let namespace = match provider.namespace.take().filter(|ns| !ns.is_empty()) {
        Some(ns) => ns,
        None => q.resolve(),
    };
    provider.namespace = Some(namespace.clone());

    let mut guard = state.providers.write().await;
    let key = (namespace.clone(), provider.name.clone());
    if guard.contains_key(&key) {
        return Err((
            StatusCode::CONFLICT,
            format!(
                "provider '{}' already exists in namespace '{}'",
                provider.name, namespace
            ),
        ));
    }
    let masked = provider.mask_secrets();
    guard.insert(key, provider);
    telemetry::log_event(
        "server.provider",
        &format!("create name={} namespace={}", masked.name, namespace),
    );
    Ok((StatusCode::CREATED, Json(masked)))
}

/**
 * \brief 原地更新 Provider，名称以路径为准。仍为脱敏占位值的密钥沿用已保存的值。
 */
async fn update_provider(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<NamespaceQuery>,
    Json(mut provider): Json<ProviderResource>,
) -> ApiResponse<Json<ProviderResource>> {
    let namespace = q.resolve();
    let key = (namespace.clone(), name.clone());
    let mut guard = state.providers.write().await;
    let slot = guard
        .get_mut(&key)
        .ok_or_else(|| not_found(&namespace, &name))?;
    provider.name = name.clone();
    provider.namespace = Some(namespace.clone());
    provider
        .auth
        .credentials
        .restore_masked(&slot.auth.credentials);
    *slot = provider;
    telemetry::log_event(
        "server.provider",
        &format!("update name={} namespace={}", name, namespace),
    );
    Ok(Json(slot.mask_secrets()))
}

async fn delete_provider(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<NamespaceQuery>,
) -> ApiResponse<StatusCode> {
    let namespace = q.resolve();
    let removed = state
        .providers
        .write()
        .await
        .remove(&(namespace.clone(), name.clone()));
    match removed {
        Some(_) => {
            telemetry::log_event(
                "server.provider",
                &format!("delete name={} namespace={}", name, namespace),
            );
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(not_found(&namespace, &name)),
    }
}

fn not_found(namespace: &str, name: &str) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!("LLM provider not found: {}/{}", namespace, name),
    )
}
