use clap::Args;
use educe::Educe;
use url::Url;

use crate::error::ConfigurationError;

#[derive(Args, Debug, Educe, Clone)]
#[educe(Default)]
pub struct RedisConfig {
    /// Log the store commands instead of sending them. Nothing gets projected.
    #[clap(long, env = "POSTMIRROR_DRY_RUN", default_value_t = false)]
    pub dry_run: bool,
    #[educe(Default = Url::parse("redis://127.0.0.1:6379").unwrap())]
    #[arg(long, env, default_value_t = Url::parse("redis://127.0.0.1:6379").unwrap())]
    /// Redis url like `redis://[:PASSWORD@]HOST[:PORT][/DATABASE]`
    pub redis_url: Url,
}

impl RedisConfig {
    pub fn into_cache_config(self) -> cache::Config {
        if self.dry_run {
            cache::Config::DryRun
        } else {
            cache::Config::Redis {
                url: self.redis_url,
            }
        }
    }

    /// Opens the connection every projection goes through and checks that the store answers
    pub async fn connect(self) -> Result<cache::Connection, ConfigurationError> {
        let client = cache::Client::new(self.into_cache_config())?;
        let mut conn = client.get_connection().await?;
        conn.ping()
            .await
            .map_err(ConfigurationError::StoreUnreachable)?;
        Ok(conn)
    }
}
