//! Dashport Embed — short-lived embed credentials for BI dashboards.
//!
//! [`EmbedBroker`] checks that the caller may view a dashboard and then
//! obtains a credential from the dashboard's backend: a Power BI embed
//! token through the service principal flow, or a signed Metabase
//! embedding JWT.

pub mod broker;
pub mod config;
pub mod error;
pub mod metabase;
pub mod powerbi;
pub mod url;

pub use broker::{EmbedBroker, EmbedCredential};
pub use config::{EmbedConfig, MetabaseConfig, PowerBiConfig};
pub use error::EmbedError;
pub use metabase::{MetabaseEmbed, MetabaseSigner};
pub use powerbi::{PowerBiClient, PowerBiEmbed};
