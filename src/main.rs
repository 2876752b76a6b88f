//! SimFlow demo runner
//!
//! Usage: `simflow [config.toml]`
//!
//! Builds the demo graph under the configured root triggers, runs it for the
//! configured duration, stops every worker and prints trigger statistics as JSON.

use anyhow::Context;
use simflow::config::RuntimeConfig;
use simflow::demo;
use simflow::graph::ChannelFaultSink;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::load(&path).with_context(|| format!("Loading {}", path))?,
        None => RuntimeConfig::default(),
    };

    let _log_guard = init_logging(&config)?;
    tracing::info!("Starting SimFlow demo ({} root triggers)", config.triggers.len());

    let (sink, faults) = ChannelFaultSink::new(config.fault_channel_capacity);
    let sink = Arc::new(sink);
    let mut demo = demo::build(&config, sink.clone()).context("Building demo graph")?;

    demo.network.start_all().context("Starting root triggers")?;
    std::thread::sleep(config.run_duration());

    tracing::info!("Shutting down...");
    demo.network.stop_all(true);

    let mut fault_count = 0;
    for fault in faults.try_iter() {
        tracing::warn!("Fault during run: {:?}", fault);
        fault_count += 1;
    }

    let report = demo.report(fault_count, sink.dropped())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Console logging, plus a non-blocking file layer when the config names a file.
///
/// `RUST_LOG` overrides the configured filter. The returned guard flushes the
/// file writer on drop.
fn init_logging(
    config: &RuntimeConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter))
    };

    let (file_layer, guard) = match &config.logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Log file {:?} has no file name", path))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter()))
        .with(file_layer)
        .init();

    Ok(guard)
}
