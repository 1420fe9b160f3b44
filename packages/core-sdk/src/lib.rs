pub mod api;
pub mod config;
pub mod models;
pub mod providers;
pub mod server;
pub mod telemetry;
pub mod transform;

/**
 * \brief SDK 预导入集合，方便外部引用常用模块。
 */
pub mod prelude {
    pub use crate::api::{ApiClient, ApiError};
    pub use crate::config::{AppConfig, Environment};
    pub use crate::models::{
        AuthConfig, AuthType, Credentials, ProviderDisplay, ProviderForm, ProviderResource,
        Schema,
    };
    pub use crate::providers::{ProviderClient, ProviderError};
    pub use crate::transform::{form_to_resource, resource_to_display, resource_to_form};
    pub use crate::{server, telemetry};
}
