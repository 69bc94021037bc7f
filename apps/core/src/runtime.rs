use std::path::PathBuf;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::config::{self, ConfigError};
use crate::contract::CoreResponse;
use crate::core_service::{CoreService, ServiceError};
use crate::logging;
use crate::search_engine::SearchOutcome;
use crate::transport::{encode, handle_json, view_response, TransportResponse};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub config_path: Option<PathBuf>,
    /// Run one search, print it and exit.
    pub query: Option<String>,
}

pub fn parse_cli_args(args: &[String]) -> Result<RuntimeOptions, String> {
    let mut options = RuntimeOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().ok_or("--config requires a path")?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--query" => {
                let value = iter.next().ok_or("--query requires a value")?;
                options.query = Some(value.clone());
            }
            other => {
                if let Some(value) = other.strip_prefix("--config=") {
                    options.config_path = Some(PathBuf::from(value));
                } else if let Some(value) = other.strip_prefix("--query=") {
                    options.query = Some(value.to_string());
                } else {
                    return Err(format!("unknown argument: {other}"));
                }
            }
        }
    }
    Ok(options)
}

pub fn run_with_options(options: RuntimeOptions) -> Result<(), RuntimeError> {
    if let Err(error) = logging::init(&logging::logs_dir()) {
        eprintln!("[quickbar-core] logging disabled: {error}");
    }

    let config = config::load(options.config_path.as_deref())?;
    if !config.config_path.exists() {
        config::save(&config)?;
        info!(path = %config.config_path.display(), "wrote default config");
    }
    info!(
        config_path = %config.config_path.display(),
        history_db_path = %config.history_db_path.display(),
        max_results = config.max_results,
        debounce_ms = config.debounce_ms,
        "starting quickbar core"
    );

    let service = CoreService::builder(config).with_runtime_providers().build()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match options.query {
            Some(query) => {
                let response = TransportResponse::Ok {
                    response: view_response(service.search(&query).await),
                };
                let mut stdout = tokio::io::stdout();
                write_line(&mut stdout, &encode(&response)).await
            }
            None => serve(&service, tokio::io::stdin(), tokio::io::stdout()).await,
        }
    })
}

/// Answers one JSON request per input line and interleaves debounced search
/// results as they are published. Returns when the input closes.
pub async fn serve<R, W>(
    service: &CoreService,
    input: R,
    mut output: W,
) -> Result<(), RuntimeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut updates = service.take_updates();
    if updates.is_none() {
        warn!("search updates already taken; debounced results will not be forwarded");
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("request stream closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = handle_json(service, &line).await;
                write_line(&mut output, &response).await?;
            }
            Some(outcome) = next_update(&mut updates) => {
                let response = TransportResponse::Ok {
                    response: CoreResponse::Results(outcome.into()),
                };
                write_line(&mut output, &encode(&response)).await?;
            }
        }
    }
    Ok(())
}

async fn next_update(
    updates: &mut Option<UnboundedReceiver<SearchOutcome>>,
) -> Option<SearchOutcome> {
    match updates {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> Result<(), RuntimeError> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::{parse_cli_args, serve, RuntimeOptions};
    use crate::config::Config;
    use crate::core_service::CoreService;
    use crate::currency::MockRateFetcher;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_config_and_query_flags() {
        assert_eq!(parse_cli_args(&[]).unwrap(), RuntimeOptions::default());
        assert_eq!(
            parse_cli_args(&args(&["--config", "/tmp/q.json", "--query=2+2"])).unwrap(),
            RuntimeOptions {
                config_path: Some(PathBuf::from("/tmp/q.json")),
                query: Some("2+2".into()),
            }
        );
        assert!(parse_cli_args(&args(&["--query"])).is_err());
        assert!(parse_cli_args(&args(&["--verbose"])).is_err());
    }

    #[tokio::test]
    async fn serves_one_response_per_request_line() {
        let service = CoreService::builder(Config::default())
            .with_rate_fetcher(Arc::new(MockRateFetcher::new()))
            .build()
            .unwrap();
        let input = concat!(
            "{\"kind\":\"search\",\"payload\":{\"query\":\"2+2\"}}\n",
            "\n",
            "{\"kind\":\"execute\",\"payload\":{}}\n",
            "not json\n",
        );
        let mut output = Vec::new();

        serve(&service, input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["status"], "ok");
        assert_eq!(lines[0]["response"]["kind"], "results");
        assert_eq!(lines[1]["response"]["kind"], "executed");
        assert_eq!(lines[2]["error"]["code"], "invalid_json");
    }
}
