use crate::domain::surface::{HistorySource, LiveSource, SurfaceConfig, SurfaceKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub surfaces: SurfacesSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SurfacesSettings {
    #[serde(default)]
    pub gauge: SurfaceSettings,
    #[serde(default)]
    pub pie: SurfaceSettings,
    #[serde(default)]
    pub line: SurfaceSettings,
    #[serde(default)]
    pub temperature: SurfaceSettings,
}

/// Per-kind overrides. Anything left out keeps the built-in default.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SurfaceSettings {
    pub poll_interval_ms: Option<u64>,
    pub live_source: Option<LiveSource>,
    pub last_n: Option<usize>,
    pub history_source: Option<HistorySource>,
}

impl SurfaceSettings {
    pub fn apply(&self, mut config: SurfaceConfig) -> SurfaceConfig {
        if let Some(ms) = self.poll_interval_ms.filter(|ms| *ms > 0) {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(source) = self.live_source {
            config.live_source = source;
        }
        if let Some(n) = self.last_n.filter(|n| *n > 0) {
            config.last_n = n;
        }
        if let Some(source) = self.history_source {
            config.history_source = source;
        }
        config
    }
}

impl DashboardConfig {
    /// Resolved configuration for every surface kind.
    pub fn surface_configs(&self) -> HashMap<SurfaceKind, SurfaceConfig> {
        let s = &self.surfaces;
        [
            (SurfaceKind::Gauge, &s.gauge),
            (SurfaceKind::Pie, &s.pie),
            (SurfaceKind::Line, &s.line),
            (SurfaceKind::Temperature, &s.temperature),
        ]
        .into_iter()
        .map(|(kind, settings)| (kind, settings.apply(SurfaceConfig::for_kind(kind))))
        .collect()
    }
}

fn default_bind() -> String {
    "0.0.0.0:8090".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
