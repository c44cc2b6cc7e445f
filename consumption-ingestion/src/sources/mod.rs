pub mod consumption_client;
pub mod http_provider;
pub mod provider_api;
pub mod provider_source;

pub use consumption_client::ConsumptionClient;
pub use http_provider::HttpProviderApi;
pub use provider_api::ProviderApi;
pub use provider_source::ProviderSource;
