use clap::Args;
use educe::Educe;
use url::Url;

use crate::projection::ProjectionSettings;

#[derive(Args, Debug, Educe, Clone)]
#[educe(Default)]
pub struct ProjectionConfig {
    /// Base of the permalinks of related articles
    #[educe(Default = Url::parse("http://localhost/").unwrap())]
    #[arg(long, env, default_value_t = Url::parse("http://localhost/").unwrap())]
    pub site_url: Url,
    /// Block attribute holding the stable block identifier
    #[educe(Default = "purpleId".into())]
    #[arg(long, env, default_value = "purpleId")]
    pub block_id_attribute: String,
    /// Metadata keys with this prefix are projected as custom fields
    #[educe(Default = "purple_custom_meta_".into())]
    #[arg(long, env, default_value = "purple_custom_meta_")]
    pub custom_field_prefix: String,
}

impl ProjectionConfig {
    pub fn into_settings(self) -> ProjectionSettings {
        ProjectionSettings {
            site_url: self.site_url,
            block_id_attribute: self.block_id_attribute,
            custom_field_prefix: self.custom_field_prefix,
        }
    }
}
