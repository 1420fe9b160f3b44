use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/** \brief TLS 默认信任的 CA 集合。 */
pub const DEFAULT_CA_CERTIFICATES: &str = "System";

/** \brief 表单默认端口。 */
pub const DEFAULT_PORT: u16 = 443;

/** \brief 脱敏后统一替换的占位值。 */
pub const MASKED_SECRET_VALUE: &str = "********";

/**
 * \brief 解析枚举字符串失败。
 */
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/**
 * \brief Provider 类型判别字段（schema）。
 *
 * 后端有时返回简写 `AWS` / `GCP`，反序列化时一并接受。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Schema {
    #[default]
    #[serde(rename = "OpenAI")]
    OpenAI,
    #[serde(rename = "AWSBedrock", alias = "AWS")]
    AwsBedrock,
    #[serde(rename = "AzureOpenAI")]
    AzureOpenAI,
    #[serde(rename = "GCPVertexAI", alias = "GCP")]
    GcpVertexAI,
}

impl Schema {
    pub const ALL: [Schema; 4] = [
        Schema::OpenAI,
        Schema::AwsBedrock,
        Schema::AzureOpenAI,
        Schema::GcpVertexAI,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Schema::OpenAI => "OpenAI",
            Schema::AwsBedrock => "AWSBedrock",
            Schema::AzureOpenAI => "AzureOpenAI",
            Schema::GcpVertexAI => "GCPVertexAI",
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Schema {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Schema::OpenAI),
            "awsbedrock" | "aws" => Ok(Schema::AwsBedrock),
            "azureopenai" | "azure" => Ok(Schema::AzureOpenAI),
            "gcpvertexai" | "gcp" => Ok(Schema::GcpVertexAI),
            _ => Err(UnknownVariant {
                kind: "schema",
                value: s.to_string(),
            }),
        }
    }
}

/**
 * \brief 认证方式。后端部分接口使用小写写法，反序列化时兼容。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthType {
    #[default]
    #[serde(rename = "APIKey", alias = "apiKey")]
    ApiKey,
    #[serde(rename = "AWS", alias = "aws")]
    Aws,
    #[serde(rename = "Azure", alias = "azure")]
    Azure,
    #[serde(rename = "GCP", alias = "gcp")]
    Gcp,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::ApiKey => "APIKey",
            AuthType::Aws => "AWS",
            AuthType::Azure => "Azure",
            AuthType::Gcp => "GCP",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apikey" | "api-key" => Ok(AuthType::ApiKey),
            "aws" => Ok(AuthType::Aws),
            "azure" => Ok(AuthType::Azure),
            "gcp" => Ok(AuthType::Gcp),
            _ => Err(UnknownVariant {
                kind: "auth type",
                value: s.to_string(),
            }),
        }
    }
}

/**
 * \brief 简化的 Secret 引用。
 */
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
    pub namespace: String,
}

/**
 * \brief AWS Bedrock 凭据。
 */
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsAuth {
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
}

/**
 * \brief GCP Vertex AI 凭据，基于 Workload Identity Federation。
 *
 * 后六个字段为旧版兼容字段，原样透传。
 */
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpAuth {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub workload_identity_pool_name: String,
    #[serde(default)]
    pub workload_identity_provider_name: String,
    #[serde(default)]
    pub service_account_name: String,
    /** \brief OIDC issuer，例如 https://token.actions.githubusercontent.com */
    #[serde(default)]
    pub oidc_issuer: String,
    #[serde(default)]
    pub oidc_client_id: String,
    #[serde(default)]
    pub oidc_client_secret: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
}

/**
 * \brief Azure OpenAI 凭据。
 */
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/**
 * \brief 凭据载荷，每种认证方式恰好对应一个变体。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    ApiKey(String),
    Aws(AwsAuth),
    Azure(AzureAuth),
    Gcp(GcpAuth),
}

impl Credentials {
    /**
     * \brief 构造指定认证方式的空凭据。
     */
    pub fn empty(auth_type: AuthType) -> Self {
        match auth_type {
            AuthType::ApiKey => Credentials::ApiKey(String::new()),
            AuthType::Aws => Credentials::Aws(AwsAuth::default()),
            AuthType::Azure => Credentials::Azure(AzureAuth::default()),
            AuthType::Gcp => Credentials::Gcp(GcpAuth::default()),
        }
    }

    pub fn auth_type(&self) -> AuthType {
        match self {
            Credentials::ApiKey(_) => AuthType::ApiKey,
            Credentials::Aws(_) => AuthType::Aws,
            Credentials::Azure(_) => AuthType::Azure,
            Credentials::Gcp(_) => AuthType::Gcp,
        }
    }
}

/**
 * \brief 认证配置。
 *
 * 线上格式保持后端的 `{type, apiKey?, aws?, azure?, gcp?}` 结构，
 * 内存中用 [`Credentials`] 保证只存在一种子对象。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AuthConfigWire", into = "AuthConfigWire")]
pub struct AuthConfig {
    pub credentials: Credentials,
    pub secret_ref: Option<SecretRef>,
}

impl AuthConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            secret_ref: None,
        }
    }

    pub fn auth_type(&self) -> AuthType {
        self.credentials.auth_type()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthConfigWire {
    #[serde(rename = "type")]
    auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret_ref: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aws: Option<AwsAuth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    azure: Option<AzureAuth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gcp: Option<GcpAuth>,
}

impl From<AuthConfigWire> for AuthConfig {
    fn from(wire: AuthConfigWire) -> Self {
        // 只取与 type 匹配的子对象，其余忽略。
        let credentials = match wire.auth_type {
            AuthType::ApiKey => Credentials::ApiKey(wire.api_key.unwrap_or_default()),
            AuthType::Aws => Credentials::Aws(wire.aws.unwrap_or_default()),
            AuthType::Azure => Credentials::Azure(wire.azure.unwrap_or_default()),
            AuthType::Gcp => Credentials::Gcp(wire.gcp.unwrap_or_default()),
        };
        AuthConfig {
            credentials,
            secret_ref: wire.secret_ref,
        }
    }
}

impl From<AuthConfig> for AuthConfigWire {
    fn from(auth: AuthConfig) -> Self {
        let mut wire = AuthConfigWire {
            auth_type: auth.credentials.auth_type(),
            secret_ref: auth.secret_ref,
            api_key: None,
            aws: None,
            azure: None,
            gcp: None,
        };
        match auth.credentials {
            Credentials::ApiKey(key) => wire.api_key = Some(key),
            Credentials::Aws(aws) => wire.aws = Some(aws),
            Credentials::Azure(azure) => wire.azure = Some(azure),
            Credentials::Gcp(gcp) => wire.gcp = Some(gcp),
        }
        wire
    }
}

/**
 * \brief Provider API 的网络地址。
 */
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Backend {
    pub host: String,
    pub port: u16,
}

/**
 * \brief 上游 TLS 校验设置。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsValidation {
    #[serde(default)]
    pub hostname: String,
    #[serde(rename = "wellKnownCACertificates", default = "default_ca_certificates")]
    pub well_known_ca_certificates: String,
}

fn default_ca_certificates() -> String {
    DEFAULT_CA_CERTIFICATES.to_string()
}

/**
 * \brief 后端形态的 Provider 资源，以 name 为唯一键。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResource {
    pub name: String,
    /** \brief 所在命名空间，后端未返回时为空。 */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub schema: Schema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub auth: AuthConfig,
    pub backend: Backend,
    pub tls: TlsValidation,
}

/**
 * \brief 扁平的表单模型，所有认证字段都平铺在顶层。
 */
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderForm {
    pub name: String,
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub auth_type: AuthType,

    /** \brief APIKey 方式使用的密钥 */
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_secret_access_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_workload_identity_pool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_workload_identity_provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_service_account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_oidc_issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_oidc_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_oidc_client_secret: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_client_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_service_account_project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_auth_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_token_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_api_key: Option<String>,

    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_hostname: Option<String>,
    #[serde(
        rename = "tlsWellKnownCACertificates",
        skip_serializing_if = "Option::is_none"
    )]
    pub tls_well_known_ca_certificates: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/**
 * \brief 展示状态。当前不做健康探测，始终为 Active。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    #[default]
    Active,
    Inactive,
    Error,
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderStatus::Active => "active",
            ProviderStatus::Inactive => "inactive",
            ProviderStatus::Error => "error",
        };
        f.pad(s)
    }
}

/**
 * \brief 列表展示用的 Provider 摘要。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDisplay {
    pub name: String,
    /** \brief 即 schema */
    #[serde(rename = "type")]
    pub provider_type: Schema,
    pub model: String,
    pub endpoint: String,
    pub status: ProviderStatus,
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
}

fn mask(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        MASKED_SECRET_VALUE.to_string()
    }
}

fn mask_opt(value: &Option<String>) -> Option<String> {
    value.as_deref().map(mask)
}

impl AwsAuth {
    /**
     * \brief 返回脱敏副本：access key 与 secret 均被替换。
     */
    pub fn mask_secrets(&self) -> Self {
        Self {
            region: self.region.clone(),
            access_key_id: mask_opt(&self.access_key_id),
            secret_access_key: mask_opt(&self.secret_access_key),
        }
    }
}

impl GcpAuth {
    /**
     * \brief 返回脱敏副本：OIDC client secret 与旧版 private key 被替换。
     */
    pub fn mask_secrets(&self) -> Self {
        Self {
            oidc_client_secret: mask(&self.oidc_client_secret),
            private_key: mask_opt(&self.private_key),
            ..self.clone()
        }
    }
}

impl AzureAuth {
    pub fn mask_secrets(&self) -> Self {
        Self {
            api_key: mask_opt(&self.api_key),
            ..self.clone()
        }
    }
}

impl Credentials {
    pub fn mask_secrets(&self) -> Self {
        match self {
            Credentials::ApiKey(key) => Credentials::ApiKey(mask(key)),
            Credentials::Aws(aws) => Credentials::Aws(aws.mask_secrets()),
            Credentials::Azure(azure) => Credentials::Azure(azure.mask_secrets()),
            Credentials::Gcp(gcp) => Credentials::Gcp(gcp.mask_secrets()),
        }
    }
}

impl ProviderResource {
    /**
     * \brief 返回脱敏副本，原对象保持不变；空值不做替换。
     */
    pub fn mask_secrets(&self) -> Self {
        Self {
            auth: AuthConfig {
                credentials: self.auth.credentials.mask_secrets(),
                secret_ref: self.auth.secret_ref.clone(),
            },
            ..self.clone()
        }
    }
}

fn keep_stored(incoming: &mut String, stored: &str) {
    if incoming == MASKED_SECRET_VALUE {
        *incoming = stored.to_string();
    }
}

fn keep_stored_opt(incoming: &mut Option<String>, stored: &Option<String>) {
    if incoming.as_deref() == Some(MASKED_SECRET_VALUE) {
        *incoming = stored.clone();
    }
}

fn is_masked(value: Option<&str>) -> bool {
    value == Some(MASKED_SECRET_VALUE)
}

impl Credentials {
    /**
     * \brief 把仍为脱敏占位值的密钥还原为 stored 中的值。
     *
     * 认证方式不同时不做任何处理。
     */
    pub fn restore_masked(&mut self, stored: &Credentials) {
        match (self, stored) {
            (Credentials::ApiKey(key), Credentials::ApiKey(old)) => keep_stored(key, old),
            (Credentials::Aws(aws), Credentials::Aws(old)) => {
                keep_stored_opt(&mut aws.access_key_id, &old.access_key_id);
                keep_stored_opt(&mut aws.secret_access_key, &old.secret_access_key);
            }
            (Credentials::Gcp(gcp), Credentials::Gcp(old)) => {
                keep_stored(&mut gcp.oidc_client_secret, &old.oidc_client_secret);
                keep_stored_opt(&mut gcp.private_key, &old.private_key);
            }
            (Credentials::Azure(azure), Credentials::Azure(old)) => {
                keep_stored_opt(&mut azure.api_key, &old.api_key);
            }
            _ => {}
        }
    }

    /**
     * \brief 是否还有密钥字段是脱敏占位值。
     */
    pub fn has_masked_secret(&self) -> bool {
        match self {
            Credentials::ApiKey(key) => key == MASKED_SECRET_VALUE,
            Credentials::Aws(aws) => {
                is_masked(aws.access_key_id.as_deref())
                    || is_masked(aws.secret_access_key.as_deref())
            }
            Credentials::Gcp(gcp) => {
                gcp.oidc_client_secret == MASKED_SECRET_VALUE
                    || is_masked(gcp.private_key.as_deref())
            }
            Credentials::Azure(azure) => is_masked(azure.api_key.as_deref()),
        }
    }
}
