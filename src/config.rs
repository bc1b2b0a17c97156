//! Process-level configuration.
//!
//! Read once at startup via `clap`, with `env` fallbacks so the coordinator
//! can be configured identically from a `.env` file (loaded with `dotenv`
//! before parsing) or from the process environment in a container.

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "jeopardy-coordinator", about = "Live Jeopardy-style game coordinator")]
pub struct CoordinatorConfig {
    /// Address the WebSocket/HTTP server binds to.
    #[arg(long, env = "JEOPARDY_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Durable store connection string (Postgres).
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Emit structured JSON logs instead of human-readable ones.
    #[arg(long, env = "JEOPARDY_LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// How often the ephemeral state store sweeps expired game entries.
    #[arg(long, env = "JEOPARDY_GC_INTERVAL_SECS", default_value_t = 3600)]
    pub gc_interval_secs: u64,
}

impl CoordinatorConfig {
    /// Load a `.env` file (if present) and parse configuration from the
    /// environment and command line.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_required_args_given() {
        let cfg = CoordinatorConfig::parse_from([
            "jeopardy-coordinator",
            "--database-url",
            "postgres://localhost/jeopardy",
        ]);
        assert_eq!(cfg.bind, "0.0.0.0:8080");
        assert!(!cfg.log_json);
        assert_eq!(cfg.gc_interval_secs, 3600);
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let cfg = CoordinatorConfig::parse_from([
            "jeopardy-coordinator",
            "--bind",
            "127.0.0.1:9000",
            "--database-url",
            "postgres://localhost/jeopardy",
            "--log-json",
        ]);
        assert_eq!(cfg.bind, "127.0.0.1:9000");
        assert!(cfg.log_json);
    }
}
