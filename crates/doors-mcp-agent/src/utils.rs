use anyhow::Result;
use doors::DoorsConfig;
use rmcp::{schemars, schemars::JsonSchema};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetTestcasesArgs {
    #[schemars(
        description = "Full path to the DOORS testcase module, e.g. \"/Project/System/SysT/SysTS\""
    )]
    pub module_path: String,
    #[schemars(
        description = "Existing directory where the export is written as output.md, e.g. \"C:\\\\doors_export\""
    )]
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateScriptArgs {
    #[schemars(description = "Full path to the DOORS testcase module")]
    pub module_path: String,
    #[schemars(description = "Existing directory the script would write output.md into")]
    pub output_path: String,
}

#[derive(Clone)]
pub struct DoorsWrapper {
    /// Fixed settings; `None` reads the environment on every call. `.env`
    /// only fills variables that are not already set in the process.
    pub config: Option<DoorsConfig>,
    pub tool_router: rmcp::handler::server::tool::ToolRouter<Self>,
}

pub fn log_level_from_env() -> Level {
    env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO)
}

pub fn log_dir() -> PathBuf {
    if let Ok(custom_dir) = env::var("DOORS_LOG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        dirs::data_local_dir()
            .unwrap_or_else(env::temp_dir)
            .join("doors-mcp-agent")
            .join("logs")
    }
}

fn log_filter(level: Level) -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("rmcp::service=warn".parse()?)
        .add_directive("rmcp::transport=warn".parse()?)
        .add_directive("hyper::proto=error".parse()?)
        .add_directive("axum::serve=error".parse()?))
}

/// Logs to stderr and to a daily rolling file. Stdout stays free for the
/// JSON-RPC stream of the stdio transport.
pub fn init_logging() -> Result<()> {
    use tracing_appender::rolling;

    let log_level = log_level_from_env();
    let log_dir = log_dir();

    let file_layer = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(rolling::daily(&log_dir, "doors-mcp-agent.log"))
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(log_filter(log_level)?),
        ),
        Err(e) => {
            eprintln!("Failed to create log directory {}: {e}", log_dir.display());
            None
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_filter(log_filter(log_level)?),
        )
        .with(file_layer)
        .try_init()?;

    tracing::debug!("Writing logs to {}", log_dir.display());
    Ok(())
}
