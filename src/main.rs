//! FGK Risk Review - demo host
//!
//! Mounts one panel in a local dashboard, configures it with the sample
//! data source, completes that data source and prints what the panel renders.
//!
//! Usage: `fgk-riskreview [SETTINGS.toml] [CONFIG.json]`

use anyhow::Context;
use fgk_riskreview::{
    config::default_settings_path,
    host::{Dashboard, LocalHost},
    render::TextRenderer,
    sample::{sample_data_source, sample_records, SAMPLE_DATA_SOURCE},
    DataSourceRef, InstanceId, MountTarget, PanelAdapter, PanelConfig, PanelSettings,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fgk_riskreview=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let meta = PanelAdapter::registration_meta();
    tracing::info!("Starting {} {} demo host", meta.title, meta.version);

    let mut args = std::env::args().skip(1);
    let settings_path = args.next().map(PathBuf::from).or_else(default_settings_path);
    let config_path = args.next().map(PathBuf::from);

    let settings = match settings_path {
        Some(path) => {
            tracing::info!("Using settings from {:?}", path);
            PanelSettings::load_or_default(path)
        }
        None => PanelSettings::default(),
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read panel config {:?}", path))?;
            let value: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse panel config {:?}", path))?;
            PanelConfig::from_value_lenient(&value)
        }
        None => PanelConfig::default()
            .with_title_col_name("title")
            .with_data_source(DataSourceRef::Definition(sample_data_source())),
    };

    let host = LocalHost::with_renderer_factory(|_| Box::new(TextRenderer::new(std::io::stdout())));
    let mut dashboard = Dashboard::new(host);
    let instance = InstanceId::new("fgk-riskreview-1");

    dashboard
        .add_panel(instance.clone(), &MountTarget::new("#panel"), settings)?
        .set_config(config);

    let data_source = dashboard
        .panel(&instance)
        .and_then(|p| p.get_config().data_source)
        .map(|ds| ds.name().to_string())
        .unwrap_or_else(|| SAMPLE_DATA_SOURCE.to_string());

    let queued = dashboard
        .host()
        .complete_data_source(&data_source, sample_records());
    let completed_at = dashboard
        .host()
        .registry()
        .entry(&data_source)
        .map(|entry| entry.updated_at.to_rfc3339())
        .unwrap_or_default();
    tracing::info!(data_source = %data_source, queued, %completed_at, "Data source completed");
    dashboard.pump();

    let snapshot = dashboard.snapshot_configs()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    tracing::info!("Shutting down...");
    Ok(())
}
