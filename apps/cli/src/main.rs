use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use aigw_console_sdk::{
    config::{AppConfig, Environment},
    models::{AuthType, ProviderDisplay, ProviderForm, ProviderResource, Schema},
    providers::{ProviderClient, ProviderError},
    server, telemetry,
    transform::{filter_providers, resource_to_display, resource_to_form},
};

/**
 * \brief 网关控制台命令行入口，管理 LLM Provider 配置。
 */
#[derive(Parser, Debug)]
#[command(name = "aigw-console", version, about = "AI gateway console: manage LLM providers")]
struct Cli {
    /** \brief 覆盖 AIGW_CONSOLE_API_BASE_URL */
    #[arg(long, global = true)]
    api_base_url: Option<String>,
    /** \brief 覆盖 AIGW_CONSOLE_API_VERSION */
    #[arg(long, global = true)]
    api_version: Option<String>,
    /** \brief 覆盖 AIGW_CONSOLE_ENVIRONMENT */
    #[arg(long, global = true)]
    environment: Option<Environment>,
    #[arg(long, global = true)]
    namespace: Option<String>,
    /** \brief 非开发环境下也写入 logs/aigw-console.log */
    #[arg(long, global = true, default_value_t = false)]
    telemetry: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief 列出 Provider。
     */
    List {
        /** \brief 输出后端原始资源 */
        #[arg(long, default_value_t = false)]
        raw: bool,
        /** \brief 按名称 / schema / host 过滤 */
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /**
     * \brief 查看单个 Provider。
     */
    Get {
        name: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /**
     * \brief 新建 Provider。
     */
    Create {
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: FormArgs,
    },

    /**
     * \brief 原地更新 Provider（PUT），名称不可修改。
     */
    Update {
        name: String,
        #[command(flatten)]
        fields: FormArgs,
    },

    /**
     * \brief 删除后重建 Provider；若重建失败会明确提示旧资源已被删除。
     */
    Replace {
        name: String,
        #[command(flatten)]
        fields: FormArgs,
    },

    Delete {
        name: String,
    },

    /**
     * \brief 打印生效的配置。
     */
    Config,

    /**
     * \brief 启动内存版本地开发后端。
     */
    Serve {
        #[arg(long, default_value = "127.0.0.1:8081")]
        addr: String,
    },
}

/**
 * \brief 表单字段。新建时以 schema 默认值为底，编辑时以已保存的资源为底，
 * 显式参数逐项覆盖。
 */
#[derive(Args, Debug, Default)]
struct FormArgs {
    /** \brief 从 JSON 文件读取完整表单（camelCase 字段） */
    #[arg(long)]
    form: Option<PathBuf>,
    #[arg(long)]
    schema: Option<Schema>,
    #[arg(long = "model-version")]
    version: Option<String>,
    #[arg(long)]
    auth_type: Option<AuthType>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    api_key: Option<String>,

    #[arg(long)]
    aws_region: Option<String>,
    #[arg(long)]
    aws_access_key_id: Option<String>,
    #[arg(long)]
    aws_secret_access_key: Option<String>,

    #[arg(long)]
    gcp_project_id: Option<String>,
    #[arg(long)]
    gcp_location: Option<String>,
    #[arg(long)]
    gcp_workload_identity_pool_name: Option<String>,
    #[arg(long)]
    gcp_workload_identity_provider_name: Option<String>,
    #[arg(long)]
    gcp_service_account_name: Option<String>,
    #[arg(long)]
    gcp_oidc_issuer: Option<String>,
    #[arg(long)]
    gcp_oidc_client_id: Option<String>,
    #[arg(long)]
    gcp_oidc_client_secret: Option<String>,

    #[arg(long)]
    azure_client_id: Option<String>,
    #[arg(long)]
    azure_tenant_id: Option<String>,
    #[arg(long)]
    azure_api_key: Option<String>,

    #[arg(long)]
    tls_hostname: Option<String>,
    #[arg(long)]
    tls_ca_certificates: Option<String>,
}

impl FormArgs {
    /**
     * \brief 把参数叠加到 base 上。--form 文件整体替换 base；--schema 与当前不同时
     * 重置为该 schema 的默认值。
     */
    fn apply(self, base: ProviderForm) -> Result<ProviderForm> {
        let mut form = match &self.form {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read form file {} failed", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parse form file {} failed", path.display()))?
            }
            None => base,
        };
        if let Some(schema) = self.schema {
            if schema != form.schema {
                form.select_schema(schema);
            }
        }

        set(&mut form.version, self.version);
        set(&mut form.api_key, self.api_key);
        set(&mut form.aws_region, self.aws_region);
        set(&mut form.aws_access_key_id, self.aws_access_key_id);
        set(&mut form.aws_secret_access_key, self.aws_secret_access_key);
        set(&mut form.gcp_project_id, self.gcp_project_id);
        set(&mut form.gcp_location, self.gcp_location);
        set(
            &mut form.gcp_workload_identity_pool_name,
            self.gcp_workload_identity_pool_name,
        );
        set(
            &mut form.gcp_workload_identity_provider_name,
            self.gcp_workload_identity_provider_name,
        );
        set(&mut form.gcp_service_account_name, self.gcp_service_account_name);
        set(&mut form.gcp_oidc_issuer, self.gcp_oidc_issuer);
        set(&mut form.gcp_oidc_client_id, self.gcp_oidc_client_id);
        set(&mut form.gcp_oidc_client_secret, self.gcp_oidc_client_secret);
        set(&mut form.azure_client_id, self.azure_client_id);
        set(&mut form.azure_tenant_id, self.azure_tenant_id);
        set(&mut form.azure_api_key, self.azure_api_key);
        set(&mut form.tls_hostname, self.tls_hostname);
        set(&mut form.tls_well_known_ca_certificates, self.tls_ca_certificates);
        if let Some(auth_type) = self.auth_type {
            form.auth_type = auth_type;
        }
        if let Some(host) = self.host {
            form.host = host;
        }
        if let Some(port) = self.port {
            form.port = port;
        }
        Ok(form)
    }
}

fn new_form(fields: FormArgs, name: Option<String>) -> Result<ProviderForm> {
    let mut form = fields.apply(ProviderForm::for_schema(String::new(), Schema::default()))?;
    if let Some(name) = name {
        form.name = name;
    }
    if form.name.trim().is_empty() {
        bail!("provider name is required (use --name or a form file)");
    }
    Ok(form)
}

/**
 * \brief 编辑表单：读取已保存的资源预填，未给出的字段保持原值。
 */
async fn edit_form(client: &ProviderClient, name: &str, fields: FormArgs) -> Result<ProviderForm> {
    let current = client
        .get_raw(name)
        .await
        .with_context(|| format!("Failed to load provider '{}'", name))?;
    let mut form = fields.apply(resource_to_form(&current))?;
    form.name = name.to_string();
    Ok(form)
}

fn set(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::from_env().context("load configuration failed")?;
    if let Some(url) = &cli.api_base_url {
        config.api_base_url = url.clone();
    }
    if let Some(version) = &cli.api_version {
        config.api_version = version.clone();
    }
    if let Some(environment) = cli.environment {
        config.environment = environment;
    }
    Ok(config)
}

fn print_table(rows: &[ProviderDisplay]) {
    if rows.is_empty() {
        println!("No providers found");
        return;
    }
    println!(
        "{:<24} {:<12} {:<20} {:<44} {:<8} {}",
        "NAME", "TYPE", "MODEL", "ENDPOINT", "AUTH", "STATUS"
    );
    for p in rows {
        println!(
            "{:<24} {:<12} {:<20} {:<44} {:<8} {}",
            p.name, p.provider_type, p.model, p.endpoint, p.auth_type, p.status
        );
    }
}

fn print_resource(resource: &ProviderResource, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(resource)?);
    } else {
        print_table(&[resource_to_display(resource)]);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    telemetry::init(&config, cli.telemetry);

    let mut client = ProviderClient::from_config(&config).context("create API client failed")?;
    if let Some(ns) = &cli.namespace {
        client = client.with_namespace(ns.clone());
    }

    match cli.command {
        Commands::List { raw, search, json } => {
            let providers = client.list_raw().await.context("Failed to load providers")?;
            let term = search.unwrap_or_default();
            let matched: Vec<ProviderResource> = filter_providers(&providers, &term)
                .into_iter()
                .cloned()
                .collect();
            let display: Vec<ProviderDisplay> = matched.iter().map(resource_to_display).collect();
            if raw {
                println!("{}", serde_json::to_string_pretty(&matched)?);
            } else if json {
                println!("{}", serde_json::to_string_pretty(&display)?);
            } else {
                print_table(&display);
            }
        }
        Commands::Get { name, json } => {
            let provider = client
                .get_raw(&name)
                .await
                .with_context(|| format!("Failed to load provider '{}'", name))?;
            print_resource(&provider, json)?;
        }
        Commands::Create { name, fields } => {
            let form = new_form(fields, name)?;
            let created = client
                .create(&form)
                .await
                .context("Failed to create provider")?;
            println!("Created provider {}", created.name);
            print_resource(&created, false)?;
        }
        Commands::Update { name, fields } => {
            let form = edit_form(&client, &name, fields).await?;
            let updated = client
                .update(&name, &form)
                .await
                .context("Failed to update provider")?;
            println!("Updated provider {}", updated.name);
            print_resource(&updated, false)?;
        }
        Commands::Replace { name, fields } => {
            let form = edit_form(&client, &name, fields).await?;
            match client.replace(&name, &form).await {
                Ok(created) => {
                    println!("Replaced provider {}", created.name);
                    print_resource(&created, false)?;
                }
                Err(err @ ProviderError::ReplacePartiallyFailed { .. }) => {
                    if let ProviderError::ReplacePartiallyFailed { resource, .. } = &err {
                        eprintln!("Resource that could not be re-created:");
                        eprintln!("{}", serde_json::to_string_pretty(resource)?);
                    }
                    return Err(err).context("Provider was deleted but not re-created");
                }
                Err(err @ ProviderError::MaskedSecret { .. }) => {
                    return Err(err).context("Pass the secret flags again to replace this provider");
                }
                Err(err) => return Err(err).context("Failed to replace provider"),
            }
        }
        Commands::Delete { name } => {
            client
                .delete(&name)
                .await
                .with_context(|| format!("Failed to delete provider '{}'", name))?;
            println!("Deleted provider {}", name);
        }
        Commands::Config => {
            println!("api base url : {}", config.api_base_url);
            println!("api version  : {}", config.api_version);
            println!("environment  : {}", config.environment);
            println!("full api url : {}", config.full_api_url());
            println!(
                "namespace    : {}",
                client.namespace().unwrap_or(server::DEFAULT_NAMESPACE)
            );
        }
        Commands::Serve { addr } => {
            server::run(&addr, &config.api_version).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigw_console_sdk::{
        models::{AzureAuth, Credentials},
        server::AppState,
    };

    async fn dev_backend() -> (ProviderClient, AppState) {
        let state = AppState::new();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server::serve(listener, state.clone(), "v1"));
        let client =
            ProviderClient::from_config(&AppConfig::new(format!("http://{}", addr))).unwrap();
        (client, state)
    }

    #[tokio::test]
    async fn update_changes_only_the_given_flags() {
        let (client, state) = dev_backend().await;
        let mut form = ProviderForm::for_schema("my-azure", Schema::AzureOpenAI);
        form.host = "corp.openai.azure.com".into();
        form.azure_tenant_id = Some("tenant".into());
        form.azure_api_key = Some("real-key".into());
        client.create(&form).await.unwrap();

        let cli = Cli::try_parse_from(["aigw-console", "update", "my-azure", "--port", "8443"])
            .unwrap();
        let Commands::Update { name, fields } = cli.command else {
            panic!("expected the update command");
        };
        let edit = edit_form(&client, &name, fields).await.unwrap();
        assert_eq!(edit.schema, Schema::AzureOpenAI);
        assert_eq!(edit.auth_type, AuthType::Azure);
        assert_eq!(edit.host, "corp.openai.azure.com");
        assert_eq!(edit.port, 8443);

        client.update(&name, &edit).await.unwrap();
        let stored = state.get("default", "my-azure").await.unwrap();
        assert_eq!(stored.schema, Schema::AzureOpenAI);
        assert_eq!(stored.backend.port, 8443);
        assert_eq!(
            stored.auth.credentials,
            Credentials::Azure(AzureAuth {
                client_id: Some(String::new()),
                tenant_id: Some("tenant".into()),
                api_key: Some("real-key".into()),
            })
        );
    }

    #[tokio::test]
    async fn edit_switching_schema_resets_defaults() {
        let (client, _) = dev_backend().await;
        client
            .create(&ProviderForm::for_schema("edge", Schema::OpenAI))
            .await
            .unwrap();

        let args = FormArgs {
            schema: Some(Schema::AwsBedrock),
            aws_region: Some("eu-west-1".into()),
            ..Default::default()
        };
        let edit = edit_form(&client, "edge", args).await.unwrap();
        assert_eq!(edit.name, "edge");
        assert_eq!(edit.auth_type, AuthType::Aws);
        assert_eq!(edit.host, "bedrock-runtime.us-east-1.amazonaws.com");
        assert_eq!(edit.aws_region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn flags_override_schema_defaults() {
        let args = FormArgs {
            schema: Some(Schema::AwsBedrock),
            aws_region: Some("eu-west-1".into()),
            port: Some(8443),
            ..Default::default()
        };
        let form = new_form(args, Some("bedrock".into())).unwrap();
        assert_eq!(form.name, "bedrock");
        assert_eq!(form.auth_type, AuthType::Aws);
        assert_eq!(form.host, "bedrock-runtime.us-east-1.amazonaws.com");
        assert_eq!(form.port, 8443);
        assert_eq!(form.aws_region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn name_is_required() {
        let err = new_form(FormArgs::default(), None).unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn cli_parses_create_flags() {
        let cli = Cli::try_parse_from([
            "aigw-console",
            "--namespace",
            "team-a",
            "create",
            "--name",
            "gpt",
            "--schema",
            "OpenAI",
            "--api-key",
            "sk-1",
        ])
        .unwrap();
        assert_eq!(cli.namespace.as_deref(), Some("team-a"));
        match cli.command {
            Commands::Create { name, fields } => {
                let form = new_form(fields, name).unwrap();
                assert_eq!(form.api_key.as_deref(), Some("sk-1"));
                assert_eq!(form.host, "api.openai.com");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
