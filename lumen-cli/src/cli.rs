use clap::{Args, Parser, Subcommand};
use lumen_core::ProviderKind;
use lumen_eval::MetricKind;
use lumen_telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(about = "Lumen metric evaluation server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Score a single output and print the result as JSON
    Score(ScoreArgs),
}

/// Default judge model, used when a request carries no `model`.
#[derive(Args, Debug, Clone)]
pub struct JudgeArgs {
    #[arg(long, env = "LUMEN_JUDGE_PROVIDER", default_value = "openai")]
    pub judge_provider: ProviderKind,

    #[arg(long, env = "LUMEN_JUDGE_MODEL", default_value = "gpt-4o-mini")]
    pub judge_model: String,

    /// Endpoint override (required for azure and custom providers)
    #[arg(long, env = "LUMEN_JUDGE_BASE_URL")]
    pub judge_base_url: Option<String>,

    /// Upper bound on one judge call, in seconds
    #[arg(long, env = "LUMEN_JUDGE_TIMEOUT_SECS", default_value = "30")]
    pub judge_timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "LUMEN_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "LUMEN_PORT", default_value = "8080")]
    pub port: u16,

    /// SQLite URL, e.g. `sqlite://lumen.db`. Definitions and results stay in memory when unset.
    #[arg(long, env = "LUMEN_DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(flatten)]
    pub judge: JudgeArgs,

    /// Allowed CORS origin; repeat for several. All origins are allowed when none is given.
    #[arg(long = "allowed-origin", env = "LUMEN_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    #[arg(long, env = "LUMEN_MAX_BODY_BYTES")]
    pub max_body_bytes: Option<usize>,

    #[arg(long, env = "LUMEN_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "LUMEN_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    /// OTLP collector endpoint for span export
    #[arg(long, env = "LUMEN_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Development mode: detailed error messages in responses
    #[arg(long, env = "LUMEN_DEV")]
    pub dev: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[arg(short, long)]
    pub metric: MetricKind,

    #[arg(short, long)]
    pub output: String,

    #[arg(short, long, default_value = "")]
    pub input: String,

    #[arg(short, long)]
    pub reference: Option<String>,

    /// Context passage; repeat for several
    #[arg(long)]
    pub context: Vec<String>,

    /// Heuristic config as JSON, e.g. '{"pattern": "^\\d+$"}'
    #[arg(long)]
    pub config: Option<String>,

    #[command(flatten)]
    pub judge: JudgeArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["lumen", "serve"]).unwrap();
        let Commands::Serve(args) = cli.command else { panic!("expected serve") };
        assert_eq!(args.port, 8080);
        assert_eq!(args.judge.judge_provider, ProviderKind::OpenAI);
        assert_eq!(args.log_format, LogFormat::Pretty);
        assert!(args.allowed_origins.is_empty());
        assert!(!args.dev);
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "lumen",
            "serve",
            "--port",
            "9000",
            "--judge-provider",
            "anthropic",
            "--judge-model",
            "claude-3-5-haiku-latest",
            "--allowed-origin",
            "https://a.example,https://b.example",
            "--log-format",
            "json",
            "--dev",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else { panic!("expected serve") };
        assert_eq!(args.port, 9000);
        assert_eq!(args.judge.judge_provider, ProviderKind::Anthropic);
        assert_eq!(args.allowed_origins.len(), 2);
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.dev);
    }

    #[test]
    fn test_score_rejects_unknown_metric() {
        assert!(Cli::try_parse_from(["lumen", "score", "--metric", "vibes", "--output", "x"]).is_err());

        let cli =
            Cli::try_parse_from(["lumen", "score", "--metric", "is_json", "--output", "{}"]).unwrap();
        let Commands::Score(args) = cli.command else { panic!("expected score") };
        assert_eq!(args.metric, MetricKind::IsJson);
    }
}
