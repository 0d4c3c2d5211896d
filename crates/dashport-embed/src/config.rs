//! BI backend configuration.

pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_POWERBI_API_URL: &str = "https://api.powerbi.com";
pub const POWERBI_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";

/// Azure AD service principal used for Power BI embedding.
#[derive(Debug, Clone)]
pub struct PowerBiConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Azure AD authority base URL.
    pub authority_url: String,
    /// Power BI REST API base URL.
    pub api_url: String,
}

impl PowerBiConfig {
    pub fn new(tenant_id: String, client_id: String, client_secret: String) -> Self {
        Self {
            tenant_id,
            client_id,
            client_secret,
            authority_url: DEFAULT_AUTHORITY_URL.into(),
            api_url: DEFAULT_POWERBI_API_URL.into(),
        }
    }
}

/// Metabase static embedding settings.
#[derive(Debug, Clone)]
pub struct MetabaseConfig {
    pub site_url: String,
    /// Embedding secret shared with the Metabase instance.
    pub secret_key: String,
}

/// Both backends are optional; a missing one only fails requests for
/// dashboards of that type.
#[derive(Debug, Clone, Default)]
pub struct EmbedConfig {
    pub powerbi: Option<PowerBiConfig>,
    pub metabase: Option<MetabaseConfig>,
}
