use crate::models::{
    AuthConfig, AuthType, AwsAuth, AzureAuth, Backend, Credentials, GcpAuth, ProviderDisplay,
    ProviderForm, ProviderResource, ProviderStatus, Schema, TlsValidation,
    DEFAULT_CA_CERTIFICATES, DEFAULT_PORT,
};

/** \brief Azure 默认地址，需替换为实际资源名。 */
pub const AZURE_PLACEHOLDER_HOST: &str = "your-resource.openai.azure.com";

/** \brief Vertex AI 默认地址，需替换为实际区域。 */
pub const GCP_PLACEHOLDER_HOST: &str = "us-central1-aiplatform.googleapis.com";

/**
 * \brief 选择 schema 后预填的默认值。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDefaults {
    pub auth_type: AuthType,
    pub host: &'static str,
}

/**
 * \brief 根据 schema 查表给出默认认证方式与地址。
 */
pub fn schema_defaults(schema: Schema) -> SchemaDefaults {
    match schema {
        Schema::OpenAI => SchemaDefaults {
            auth_type: AuthType::ApiKey,
            host: "api.openai.com",
        },
        Schema::AwsBedrock => SchemaDefaults {
            auth_type: AuthType::Aws,
            host: "bedrock-runtime.us-east-1.amazonaws.com",
        },
        Schema::AzureOpenAI => SchemaDefaults {
            auth_type: AuthType::Azure,
            host: AZURE_PLACEHOLDER_HOST,
        },
        Schema::GcpVertexAI => SchemaDefaults {
            auth_type: AuthType::Gcp,
            host: GCP_PLACEHOLDER_HOST,
        },
    }
}

impl ProviderForm {
    /**
     * \brief 以 schema 默认值创建一个新表单。
     */
    pub fn for_schema(name: impl Into<String>, schema: Schema) -> Self {
        let mut form = ProviderForm {
            name: name.into(),
            port: DEFAULT_PORT,
            ..Default::default()
        };
        form.select_schema(schema);
        form
    }

    /**
     * \brief 切换 schema：重置 authType/host，并把所有认证字段清空为空串，
     * 避免上一种 Provider 的凭据混入新的载荷。
     */
    pub fn select_schema(&mut self, schema: Schema) {
        let defaults = schema_defaults(schema);
        self.schema = schema;
        self.auth_type = defaults.auth_type;
        self.host = defaults.host.to_string();
        self.clear_auth_fields();
    }

    fn clear_auth_fields(&mut self) {
        let empty = || Some(String::new());
        self.api_key = empty();

        self.aws_region = empty();
        self.aws_access_key_id = empty();
        self.aws_secret_access_key = empty();

        self.gcp_project_id = empty();
        self.gcp_location = empty();
        self.gcp_workload_identity_pool_name = empty();
        self.gcp_workload_identity_provider_name = empty();
        self.gcp_service_account_name = empty();
        self.gcp_oidc_issuer = empty();
        self.gcp_oidc_client_id = empty();
        self.gcp_oidc_client_secret = empty();
        self.gcp_private_key = empty();
        self.gcp_client_email = empty();
        self.gcp_service_account_project_id = empty();
        self.gcp_client_id = empty();
        self.gcp_auth_uri = empty();
        self.gcp_token_uri = empty();

        self.azure_client_id = empty();
        self.azure_tenant_id = empty();
        self.azure_api_key = empty();
    }
}

fn or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/**
 * \brief 表单 → 后端资源。
 *
 * 不做任何校验，只按 authType 组装对应的凭据，其余字段丢弃；
 * 缺失的必填字段以空串传给服务端，由服务端负责拒绝。
 */
pub fn form_to_resource(form: &ProviderForm) -> ProviderResource {
    let credentials = match form.auth_type {
        AuthType::ApiKey => Credentials::ApiKey(or_empty(&form.api_key)),
        AuthType::Aws => Credentials::Aws(AwsAuth {
            region: or_empty(&form.aws_region),
            access_key_id: Some(or_empty(&form.aws_access_key_id)),
            secret_access_key: Some(or_empty(&form.aws_secret_access_key)),
        }),
        AuthType::Gcp => Credentials::Gcp(GcpAuth {
            project_id: or_empty(&form.gcp_project_id),
            location: or_empty(&form.gcp_location),
            workload_identity_pool_name: or_empty(&form.gcp_workload_identity_pool_name),
            workload_identity_provider_name: or_empty(&form.gcp_workload_identity_provider_name),
            service_account_name: or_empty(&form.gcp_service_account_name),
            oidc_issuer: or_empty(&form.gcp_oidc_issuer),
            oidc_client_id: or_empty(&form.gcp_oidc_client_id),
            oidc_client_secret: or_empty(&form.gcp_oidc_client_secret),
            private_key: form.gcp_private_key.clone(),
            client_email: form.gcp_client_email.clone(),
            service_account_project_id: form.gcp_service_account_project_id.clone(),
            client_id: form.gcp_client_id.clone(),
            auth_uri: form.gcp_auth_uri.clone(),
            token_uri: form.gcp_token_uri.clone(),
        }),
        AuthType::Azure => Credentials::Azure(AzureAuth {
            client_id: Some(or_empty(&form.azure_client_id)),
            tenant_id: Some(or_empty(&form.azure_tenant_id)),
            api_key: Some(or_empty(&form.azure_api_key)),
        }),
    };

    ProviderResource {
        name: form.name.clone(),
        namespace: None,
        schema: form.schema,
        version: form.version.clone(),
        auth: AuthConfig::new(credentials),
        backend: Backend {
            host: form.host.clone(),
            port: form.port,
        },
        tls: TlsValidation {
            hostname: non_empty(&form.tls_hostname).unwrap_or_else(|| form.host.clone()),
            well_known_ca_certificates: non_empty(&form.tls_well_known_ca_certificates)
                .unwrap_or_else(|| DEFAULT_CA_CERTIFICATES.to_string()),
        },
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/**
 * \brief 后端资源 → 展示模型。status 固定为 active，不做实时探测。
 */
pub fn resource_to_display(resource: &ProviderResource) -> ProviderDisplay {
    let endpoint = format!("{}:{}", resource.backend.host, resource.backend.port);
    let model = match resource.version.as_deref() {
        Some(version) if !version.is_empty() => format!("{}-{}", resource.schema, version),
        _ => resource.schema.to_string(),
    };
    ProviderDisplay {
        name: resource.name.clone(),
        provider_type: resource.schema,
        model,
        endpoint,
        status: ProviderStatus::Active,
        auth_type: resource.auth.auth_type(),
        created_at: None,
        last_used: None,
    }
}

/**
 * \brief 后端资源 → 表单，仅用于编辑时预填。
 */
pub fn resource_to_form(resource: &ProviderResource) -> ProviderForm {
    let mut form = ProviderForm {
        name: resource.name.clone(),
        schema: resource.schema,
        version: resource.version.clone(),
        auth_type: resource.auth.auth_type(),
        host: resource.backend.host.clone(),
        port: resource.backend.port,
        tls_hostname: Some(resource.tls.hostname.clone()),
        tls_well_known_ca_certificates: Some(resource.tls.well_known_ca_certificates.clone()),
        ..Default::default()
    };

    match &resource.auth.credentials {
        Credentials::ApiKey(key) => form.api_key = Some(key.clone()),
        Credentials::Aws(aws) => {
            form.aws_region = Some(aws.region.clone());
            form.aws_access_key_id = aws.access_key_id.clone();
            form.aws_secret_access_key = aws.secret_access_key.clone();
        }
        Credentials::Gcp(gcp) => {
            form.gcp_project_id = Some(gcp.project_id.clone());
            form.gcp_location = Some(gcp.location.clone());
            form.gcp_workload_identity_pool_name = Some(gcp.workload_identity_pool_name.clone());
            form.gcp_workload_identity_provider_name =
                Some(gcp.workload_identity_provider_name.clone());
            form.gcp_service_account_name = Some(gcp.service_account_name.clone());
            form.gcp_oidc_issuer = Some(gcp.oidc_issuer.clone());
            form.gcp_oidc_client_id = Some(gcp.oidc_client_id.clone());
            form.gcp_oidc_client_secret = Some(gcp.oidc_client_secret.clone());
            form.gcp_private_key = gcp.private_key.clone();
            form.gcp_client_email = gcp.client_email.clone();
            form.gcp_service_account_project_id = gcp.service_account_project_id.clone();
            form.gcp_client_id = gcp.client_id.clone();
            form.gcp_auth_uri = gcp.auth_uri.clone();
            form.gcp_token_uri = gcp.token_uri.clone();
        }
        Credentials::Azure(azure) => {
            form.azure_client_id = azure.client_id.clone();
            form.azure_tenant_id = azure.tenant_id.clone();
            form.azure_api_key = azure.api_key.clone();
        }
    }
    form
}

/**
 * \brief 按名称、schema、host 做不区分大小写的子串搜索。
 */
pub fn filter_providers<'a>(
    providers: &'a [ProviderResource],
    term: &str,
) -> Vec<&'a ProviderResource> {
    let needle = term.trim().to_lowercase();
    providers
        .iter()
        .filter(|p| {
            needle.is_empty()
                || p.name.to_lowercase().contains(&needle)
                || p.schema.as_str().to_lowercase().contains(&needle)
                || p.backend.host.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_form(auth_type: AuthType) -> ProviderForm {
        ProviderForm {
            name: "p1".into(),
            schema: Schema::OpenAI,
            auth_type,
            host: "api.example.com".into(),
            port: 8443,
            ..Default::default()
        }
    }

    #[test]
    fn api_key_form_produces_only_api_key() {
        let form = ProviderForm {
            api_key: Some("sk-123".into()),
            aws_region: Some("us-east-1".into()),
            azure_api_key: Some("leak".into()),
            ..base_form(AuthType::ApiKey)
        };
        let resource = form_to_resource(&form);
        assert_eq!(resource.auth.credentials, Credentials::ApiKey("sk-123".into()));
        assert_eq!(
            serde_json::to_value(&resource.auth).unwrap(),
            json!({"type": "APIKey", "apiKey": "sk-123"})
        );
    }

    #[test]
    fn aws_fields_default_to_empty_strings() {
        let form = ProviderForm {
            aws_region: Some("eu-central-1".into()),
            ..base_form(AuthType::Aws)
        };
        let resource = form_to_resource(&form);
        assert_eq!(
            resource.auth.credentials,
            Credentials::Aws(AwsAuth {
                region: "eu-central-1".into(),
                access_key_id: Some(String::new()),
                secret_access_key: Some(String::new()),
            })
        );
    }

    #[test]
    fn gcp_canonical_fields_default_and_legacy_pass_through() {
        let form = ProviderForm {
            gcp_project_id: Some("proj".into()),
            gcp_client_email: Some("sa@proj.iam.gserviceaccount.com".into()),
            ..base_form(AuthType::Gcp)
        };
        let resource = form_to_resource(&form);
        let Credentials::Gcp(ref gcp) = resource.auth.credentials else {
            panic!("expected GCP credentials");
        };
        assert_eq!(gcp.project_id, "proj");
        assert_eq!(gcp.location, "");
        assert_eq!(gcp.workload_identity_pool_name, "");
        assert_eq!(gcp.workload_identity_provider_name, "");
        assert_eq!(gcp.service_account_name, "");
        assert_eq!(gcp.oidc_issuer, "");
        assert_eq!(gcp.oidc_client_id, "");
        assert_eq!(gcp.oidc_client_secret, "");
        assert_eq!(gcp.client_email.as_deref(), Some("sa@proj.iam.gserviceaccount.com"));
        assert_eq!(gcp.private_key, None);
        assert_eq!(gcp.token_uri, None);

        let wire = serde_json::to_value(&resource.auth).unwrap();
        assert_eq!(wire["gcp"]["oidcClientSecret"], "");
        assert!(wire["gcp"].get("privateKey").is_none());
    }

    #[test]
    fn azure_fields_default_to_empty_strings() {
        let form = ProviderForm {
            azure_tenant_id: Some("tenant".into()),
            ..base_form(AuthType::Azure)
        };
        let resource = form_to_resource(&form);
        assert_eq!(
            resource.auth.credentials,
            Credentials::Azure(AzureAuth {
                client_id: Some(String::new()),
                tenant_id: Some("tenant".into()),
                api_key: Some(String::new()),
            })
        );
    }

    #[test]
    fn tls_defaults_to_host_and_system_ca() {
        let resource = form_to_resource(&base_form(AuthType::ApiKey));
        assert_eq!(resource.tls.hostname, "api.example.com");
        assert_eq!(resource.tls.well_known_ca_certificates, "System");
        assert_eq!(resource.backend.port, 8443);

        let form = ProviderForm {
            tls_hostname: Some("tls.example.com".into()),
            tls_well_known_ca_certificates: Some("Custom".into()),
            ..base_form(AuthType::ApiKey)
        };
        let resource = form_to_resource(&form);
        assert_eq!(resource.tls.hostname, "tls.example.com");
        assert_eq!(resource.tls.well_known_ca_certificates, "Custom");
    }

    #[test]
    fn display_derives_model_and_endpoint() {
        let form = ProviderForm {
            version: Some("4".into()),
            host: "api.openai.com".into(),
            port: 443,
            ..base_form(AuthType::ApiKey)
        };
        let display = resource_to_display(&form_to_resource(&form));
        assert_eq!(display.model, "OpenAI-4");
        assert_eq!(display.endpoint, "api.openai.com:443");
        assert_eq!(display.status, ProviderStatus::Active);
        assert_eq!(display.auth_type, AuthType::ApiKey);

        let mut resource = form_to_resource(&form);
        resource.version = None;
        assert_eq!(resource_to_display(&resource).model, "OpenAI");
        resource.version = Some(String::new());
        assert_eq!(resource_to_display(&resource).model, "OpenAI");
    }

    #[test]
    fn round_trip_keeps_populated_fields() {
        let forms = vec![
            ProviderForm {
                api_key: Some("sk".into()),
                ..base_form(AuthType::ApiKey)
            },
            ProviderForm {
                aws_region: Some("us-east-1".into()),
                aws_access_key_id: Some("AKIA".into()),
                aws_secret_access_key: Some("secret".into()),
                ..base_form(AuthType::Aws)
            },
            ProviderForm {
                gcp_project_id: Some("proj".into()),
                gcp_location: Some("us-central1".into()),
                gcp_oidc_issuer: Some("https://issuer".into()),
                gcp_private_key: Some("key".into()),
                ..base_form(AuthType::Gcp)
            },
            ProviderForm {
                azure_client_id: Some("cid".into()),
                azure_tenant_id: Some("tid".into()),
                azure_api_key: Some("key".into()),
                ..base_form(AuthType::Azure)
            },
        ];

        for form in forms {
            let back = resource_to_form(&form_to_resource(&form));
            let before = serde_json::to_value(&form).unwrap();
            let after = serde_json::to_value(&back).unwrap();
            for (key, value) in before.as_object().unwrap() {
                assert_eq!(after.get(key), Some(value), "field {key} changed");
            }
        }
    }

    #[test]
    fn selecting_schema_resets_defaults_and_clears_credentials() {
        let mut form = ProviderForm::for_schema("p", Schema::OpenAI);
        assert_eq!(form.auth_type, AuthType::ApiKey);
        assert_eq!(form.host, "api.openai.com");
        assert_eq!(form.port, 443);

        form.api_key = Some("sk-live".into());
        form.gcp_oidc_client_secret = Some("secret".into());
        form.select_schema(Schema::AwsBedrock);

        assert_eq!(form.schema, Schema::AwsBedrock);
        assert_eq!(form.auth_type, AuthType::Aws);
        assert_eq!(form.host, "bedrock-runtime.us-east-1.amazonaws.com");
        assert_eq!(form.api_key.as_deref(), Some(""));
        assert_eq!(form.gcp_oidc_client_secret.as_deref(), Some(""));
        assert_eq!(form.azure_api_key.as_deref(), Some(""));
        assert_eq!(form.name, "p");
    }

    #[test]
    fn schema_defaults_cover_every_schema() {
        for schema in Schema::ALL {
            let defaults = schema_defaults(schema);
            assert!(!defaults.host.is_empty());
        }
        assert_eq!(schema_defaults(Schema::AzureOpenAI).auth_type, AuthType::Azure);
        assert_eq!(schema_defaults(Schema::GcpVertexAI).auth_type, AuthType::Gcp);
    }

    #[test]
    fn filter_matches_name_schema_and_host() {
        let mut a = form_to_resource(&ProviderForm::for_schema("openai-gpt4", Schema::OpenAI));
        a.backend.host = "api.openai.com".into();
        let b = form_to_resource(&ProviderForm::for_schema("claude", Schema::AwsBedrock));

        let providers = vec![a, b];
        assert_eq!(filter_providers(&providers, "").len(), 2);
        assert_eq!(filter_providers(&providers, "GPT4")[0].name, "openai-gpt4");
        assert_eq!(filter_providers(&providers, "bedrock")[0].name, "claude");
        assert_eq!(filter_providers(&providers, "amazonaws")[0].name, "claude");
        assert!(filter_providers(&providers, "vertex").is_empty());
    }
}
