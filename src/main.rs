use std::sync::Arc;

use tracing::{info, warn};

use compliance_scout::adapters::{OpenAiReasoner, TesseractOcr, UnavailableOcr, WhisperTranscriber};
use compliance_scout::core::services::{Ocr, Services};
use compliance_scout::http;
use compliance_scout::{MemoryStore, Pipeline, PipelineConfig};

fn parse_port_from_args() -> Option<u16> {
    let mut args = std::env::args().peekable();
    while let Some(a) = args.next() {
        if a == "--port" {
            if let Some(v) = args.next() {
                if let Ok(p) = v.parse::<u16>() {
                    return Some(p);
                }
            }
        } else if let Some(rest) = a.strip_prefix("--port=") {
            if let Ok(p) = rest.parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

fn port_from_env() -> Option<u16> {
    for k in ["COMPLIANCE_SCOUT_PORT", "PORT"] {
        if let Ok(v) = std::env::var(k) {
            if let Ok(p) = v.trim().parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting compliance-scout");

    let config = Arc::new(PipelineConfig::from_env());
    let http_client = reqwest::Client::builder()
        .timeout(config.fetch_timeout)
        .build()?;

    let reasoner = Arc::new(OpenAiReasoner::from_env(http_client.clone()));
    let transcriber = Arc::new(WhisperTranscriber::from_env(http_client.clone()));
    let ocr: Arc<dyn Ocr> = match TesseractOcr::discover() {
        Ok(ocr) => Arc::new(ocr),
        Err(e) => {
            warn!("{e}; image and scanned-PDF audits will be rejected");
            Arc::new(UnavailableOcr)
        }
    };
    let store = Arc::new(MemoryStore::new());

    let services = Services::new(config, reasoner, transcriber, ocr, store)
        .map_err(|e| anyhow::anyhow!("service init: {e}"))?;
    let pipeline = Arc::new(Pipeline::new(services));

    let port = parse_port_from_args().or_else(port_from_env).unwrap_or(8080);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, http::router(pipeline))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
