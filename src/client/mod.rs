pub mod healthcheck;
pub mod listen;
mod postgres_config;
pub mod projection_commands;
mod projection_config;
mod redis_config;
mod telemetry_config;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use listen::ListenArgs;
pub use postgres_config::PostgresConfig;
use projection_commands::DocumentArgs;
pub use projection_config::ProjectionConfig;
pub use redis_config::RedisConfig;
pub use telemetry_config::TelemetryConfig;
pub use telemetry_config::TelemetryKind;

#[derive(Parser, Debug)]
#[command(author, version)]
pub struct Client {
    #[command(flatten)]
    pub postgres_config: PostgresConfig,
    #[command(flatten)]
    pub redis_config: RedisConfig,
    #[command(flatten)]
    pub telemetry_config: TelemetryConfig,
    #[command(flatten)]
    pub projection_config: ProjectionConfig,
    #[arg(long, env, value_enum, default_value_t = Color::Auto)]
    pub color: Color,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Debug, Default, Clone)]
pub enum Color {
    Never,
    Always,
    #[default]
    Auto,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about, long_about = "Projects the current state of one document")]
    Project(DocumentArgs),
    #[command(about, long_about = "Removes the records of a document and of its children")]
    Delete(DocumentArgs),
    #[command(about, long_about = "Projects every document again")]
    Sweep,
    #[command(about, long_about = "Writes the user and taxonomy term records")]
    SyncReferences,
    #[command(
        about,
        long_about = "Handles the content events read from stdin, one JSON object per line"
    )]
    Listen(ListenArgs),
    #[command(about, long_about = "Healthcheck")]
    Healthcheck,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn cli_is_consistent() {
        Client::command().debug_assert();
    }

    #[test]
    fn store_defaults_to_a_local_redis() {
        let client = Client::try_parse_from(["postmirror", "sweep"]).unwrap();

        assert!(matches!(client.command, Commands::Sweep));
        assert_eq!(
            RedisConfig::default().redis_url.as_str(),
            "redis://127.0.0.1:6379"
        );
        assert!(!RedisConfig::default().dry_run);
    }

    #[test]
    fn document_commands_take_an_id() {
        let client = Client::try_parse_from(["postmirror", "--dry-run", "delete", "42"]).unwrap();

        assert!(client.redis_config.dry_run);
        assert!(matches!(
            client.command,
            Commands::Delete(DocumentArgs { id: 42 })
        ));
        assert!(Client::try_parse_from(["postmirror", "project"]).is_err());
    }
}
