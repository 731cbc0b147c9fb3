//! Console host for locbridge.
//!
//! Reads one JSON message per line from stdin and prints one JSON response
//! per line to stdout:
//!
//! ```text
//! {"id": 1, "method": "hasPermission"}
//! {"id": 1, "status": "success", "value": true}
//! ```
//!
//! A line of the form `{"permission_result": "grantedFine"}` stands in for
//! the OS answering a permission prompt.
//!
//! Run with: cargo run -p locbridge-console
//!
//! Set `LOCBRIDGE_CONFIG` to a JSON file to override the bridge settings and
//! `LOCBRIDGE_MEMORY=1` to use the in-memory platform instead of the OS one.

use std::env;
use std::fs;

use async_channel::{Receiver, Sender};
use locbridge::location::{LocationPlatform, MemoryPlatform};
use locbridge::permission::PermissionState;
use locbridge::{BridgeConfig, BridgeMessage, Dispatcher, Request, Response};
use log::{error, info, warn};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Line {
    Request(Request),
    PermissionResult { permission_result: PermissionState },
}

impl From<Line> for BridgeMessage {
    fn from(line: Line) -> Self {
        match line {
            Line::Request(request) => Self::Request(request),
            Line::PermissionResult { permission_result } => {
                Self::PermissionResult(permission_result)
            }
        }
    }
}

fn load_config() -> BridgeConfig {
    let Ok(path) = env::var("LOCBRIDGE_CONFIG") else {
        return BridgeConfig::default();
    };

    let loaded = fs::read_to_string(&path)
        .map_err(|err| err.to_string())
        .and_then(|text| BridgeConfig::from_json(&text).map_err(|err| err.to_string()));
    match loaded {
        Ok(config) => {
            info!("loaded bridge config from {path}");
            config
        }
        Err(err) => {
            warn!("ignoring bridge config {path}: {err}");
            BridgeConfig::default()
        }
    }
}

async fn read_stdin(inbound: Sender<BridgeMessage>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("failed to read stdin: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Line>(&line) {
            Ok(message) => {
                if inbound.send(message.into()).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!("skipping malformed line: {err}"),
        }
    }
    inbound.close();
}

async fn write_stdout(outbound: Receiver<Response>) {
    let mut stdout = tokio::io::stdout();
    while let Ok(response) = outbound.recv().await {
        let mut line = match serde_json::to_string(&response) {
            Ok(line) => line,
            Err(err) => {
                error!("failed to encode response {}: {err}", response.id);
                continue;
            }
        };
        line.push('\n');
        if let Err(err) = stdout.write_all(line.as_bytes()).await {
            error!("failed to write stdout: {err}");
            break;
        }
        let _ = stdout.flush().await;
    }
}

async fn run<P: LocationPlatform>(platform: P, config: &BridgeConfig) {
    let bridge = Dispatcher::with_config(platform, config);
    let (inbound_tx, inbound_rx) = async_channel::unbounded();
    let (outbound_tx, outbound_rx) = async_channel::unbounded();

    tokio::join!(
        read_stdin(inbound_tx),
        bridge.serve(inbound_rx, outbound_tx),
        write_stdout(outbound_rx),
    );
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
async fn run_native(config: &BridgeConfig) {
    info!("using the native location platform");
    run(locbridge::location::sys::NativePlatform::default(), config).await;
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
async fn run_native(config: &BridgeConfig) {
    warn!("no native location platform on this target, using the in-memory one");
    run(memory_platform(), config).await;
}

fn memory_platform() -> MemoryPlatform {
    MemoryPlatform::with_permission(PermissionState::GrantedFine)
}

// CoreLocation wants the main thread, so everything runs on one.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config();
    info!("locbridge console on channel {}", config.channel);

    if env::var_os("LOCBRIDGE_MEMORY").is_some() {
        info!("using the in-memory location platform");
        run(memory_platform(), &config).await;
    } else {
        run_native(&config).await;
    }
}
