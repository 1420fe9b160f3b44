use thiserror::Error;

use crate::{
    api::{ApiClient, ApiError},
    config::AppConfig,
    models::{ProviderDisplay, ProviderForm, ProviderResource},
    telemetry,
    transform::{form_to_resource, resource_to_display},
};

/** \brief Provider 集合的相对路径。 */
pub const PROVIDERS_ENDPOINT: &str = "/llm/providers";

/**
 * \brief Provider 操作错误。
 */
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("provider '{name}' not found: {source}")]
    NotFound { name: String, source: ApiError },

    /** \brief 重建前发现密钥仍是脱敏占位值，未做任何修改 */
    #[error("provider '{name}' still carries masked secrets; supply the real values before re-creating it")]
    MaskedSecret { name: String },

    /** \brief 替换时旧资源已删除、新资源创建失败 */
    #[error(
        "replace of provider '{name}' partially failed: the previous resource was deleted but re-creating it failed: {source}"
    )]
    ReplacePartiallyFailed {
        name: String,
        resource: Box<ProviderResource>,
        source: ApiError,
    },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/**
 * \brief `/llm/providers` 集合的类型化客户端。
 */
#[derive(Debug, Clone)]
pub struct ProviderClient {
    api: ApiClient,
    namespace: Option<String>,
}

impl ProviderClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            namespace: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> ProviderResult<Self> {
        Ok(Self::new(ApiClient::new(config)?))
    }

    /**
     * \brief 限定命名空间；未设置时由服务端取默认值。
     */
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn collection_path(&self) -> String {
        format!("{}{}", PROVIDERS_ENDPOINT, self.query())
    }

    fn item_path(&self, name: &str) -> String {
        format!(
            "{}/{}{}",
            PROVIDERS_ENDPOINT,
            urlencoding::encode(name),
            self.query()
        )
    }

    fn query(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("?namespace={}", urlencoding::encode(ns)),
            None => String::new(),
        }
    }

    /**
     * \brief 列出后端原始资源。
     */
    pub async fn list_raw(&self) -> ProviderResult<Vec<ProviderResource>> {
        Ok(self.api.get(&self.collection_path()).await?)
    }

    /**
     * \brief 列出展示模型。
     */
    pub async fn list(&self) -> ProviderResult<Vec<ProviderDisplay>> {
        let providers = self.list_raw().await?;
        Ok(providers.iter().map(resource_to_display).collect())
    }

    /**
     * \brief 按名称获取原始资源，任何非 2xx 均视为 NotFound。
     */
    pub async fn get_raw(&self, name: &str) -> ProviderResult<ProviderResource> {
        self.api
            .get(&self.item_path(name))
            .await
            .map_err(|err| match err {
                ApiError::Status { .. } => ProviderError::NotFound {
                    name: name.to_string(),
                    source: err,
                },
                other => ProviderError::Api(other),
            })
    }

    pub async fn get(&self, name: &str) -> ProviderResult<ProviderDisplay> {
        let provider = self.get_raw(name).await?;
        Ok(resource_to_display(&provider))
    }

    /**
     * \brief 由表单构建资源并创建，返回服务端给出的资源。
     */
    pub async fn create(&self, form: &ProviderForm) -> ProviderResult<ProviderResource> {
        let resource = form_to_resource(form);
        let created = self.create_resource(&resource).await?;
        telemetry::log_event(
            "providers",
            &format!("create name={} schema={}", created.name, created.schema),
        );
        Ok(created)
    }

    async fn create_resource(&self, resource: &ProviderResource) -> Result<ProviderResource, ApiError> {
        self.api.post(&self.collection_path(), resource).await
    }

    /**
     * \brief 删除；204 或空响应均视为成功。
     */
    pub async fn delete(&self, name: &str) -> ProviderResult<()> {
        self.api.delete(&self.item_path(name)).await?;
        telemetry::log_event("providers", &format!("delete name={}", name));
        Ok(())
    }

    /**
     * \brief 原地更新（PUT）。名称以路径参数为准，创建后不可修改。
     */
    pub async fn update(&self, name: &str, form: &ProviderForm) -> ProviderResult<ProviderResource> {
        let mut resource = form_to_resource(form);
        resource.name = name.to_string();
        let updated: ProviderResource = self.api.put(&self.item_path(name), &resource).await?;
        telemetry::log_event("providers", &format!("update name={}", name));
        Ok(updated)
    }

    /**
     * \brief 先删除再重建。非原子：删除成功而重建失败时返回
     * `ReplacePartiallyFailed`，其中带有未能写入的资源，供调用方重试。
     *
     * 重建无法找回已删除的密钥，含脱敏占位值时直接拒绝，不发请求。
     */
    pub async fn replace(&self, name: &str, form: &ProviderForm) -> ProviderResult<ProviderResource> {
        let mut resource = form_to_resource(form);
        resource.name = name.to_string();
        if resource.auth.credentials.has_masked_secret() {
            return Err(ProviderError::MaskedSecret {
                name: name.to_string(),
            });
        }

        self.api.delete(&self.item_path(name)).await?;
        match self.create_resource(&resource).await {
            Ok(created) => {
                telemetry::log_event("providers", &format!("replace name={}", name));
                Ok(created)
            }
            Err(source) => {
                telemetry::log_error(
                    "providers",
                    &format!("replace name={} lost after delete: {}", name, source),
                );
                Err(ProviderError::ReplacePartiallyFailed {
                    name: name.to_string(),
                    resource: Box::new(resource),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ProviderClient {
        ProviderClient::from_config(&AppConfig::new("http://localhost:8081")).unwrap()
    }

    #[test]
    fn item_path_encodes_name() {
        let c = client();
        assert_eq!(c.item_path("my provider/1"), "/llm/providers/my%20provider%2F1");
        assert_eq!(c.collection_path(), "/llm/providers");
    }

    #[test]
    fn namespace_is_added_as_query() {
        let c = client().with_namespace("team a");
        assert_eq!(c.namespace(), Some("team a"));
        assert_eq!(c.collection_path(), "/llm/providers?namespace=team%20a");
        assert_eq!(c.item_path("gpt"), "/llm/providers/gpt?namespace=team%20a");

        let c = client().with_namespace("");
        assert_eq!(c.namespace(), None);
    }

    #[test]
    fn not_found_message_carries_status() {
        let err = ProviderError::NotFound {
            name: "gpt".into(),
            source: ApiError::Status {
                status: 404,
                status_text: "Not Found".into(),
                body: String::new(),
            },
        };
        assert_eq!(
            err.to_string(),
            "provider 'gpt' not found: HTTP error! status: 404 - Not Found"
        );
    }
}
