//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use docline_core::DEFAULT_MAX_DEPTH;
use docline_core::{CursorFields, HttpConfig, JobInfo, OutputFormat, Resolution};
use docline_elastic::ElasticConfig;
use serde::Deserialize;

/// Global configuration for docline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub elastic: ElasticConfig,
    pub export: ExportConfig,
    pub http: HttpSection,
    pub run_log: RunLogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub format: OutputFormat,
    /// Zstd level for Parquet output
    pub compression_level: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./output"),
            format: OutputFormat::Tsv,
            compression_level: 3,
        }
    }
}

/// `[export]`: job identity, flattening and paging.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    #[serde(flatten)]
    pub job: JobInfo,
    #[serde(flatten)]
    pub cursor: CursorFields,
    pub max_depth: usize,
    pub resolution: Resolution,
    pub page_limit: Option<usize>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            job: JobInfo::default(),
            cursor: CursorFields::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            resolution: Resolution::default(),
            page_limit: None,
        }
    }
}

/// `[http]`: timeouts in seconds and retry budget per request.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub connect_timeout: u64,
    pub request_timeout: u64,
    pub max_retries: u32,
}

impl Default for HttpSection {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            connect_timeout: defaults.connect_timeout.as_secs(),
            request_timeout: defaults.request_timeout.as_secs(),
            max_retries: defaults.max_retries,
        }
    }
}

impl HttpSection {
    pub fn to_http_config(self) -> HttpConfig {
        HttpConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            request_timeout: Duration::from_secs(self.request_timeout),
            max_retries: self.max_retries,
        }
    }
}

/// `[run_log]`: where run records are appended.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunLogConfig {
    pub path: PathBuf,
    /// When false, records only go to the log output
    pub enabled: bool,
}

impl Default for RunLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./docline_runs.jsonl"),
            enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./docline.toml (current directory)
    /// 2. ~/.config/docline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("docline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "docline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output.dir, PathBuf::from("./output"));
        assert_eq!(config.output.format, OutputFormat::Tsv);
        assert_eq!(config.export.max_depth, 20);
        assert_eq!(config.export.resolution, Resolution::KeyTable);
        assert_eq!(config.export.cursor.order_field, "auditProcessedDateTimeUtc");
        assert_eq!(config.elastic.page_size, 1000);
        assert!(config.run_log.enabled);
        assert_eq!(config.http.to_http_config(), HttpConfig::default());
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[output]
dir = "/tmp/claims"
format = "parquet"
compression_level = 6

[elastic]
url = "https://es.internal:9200"
index = "rta_claim_headers-*"
username = "${ES_USER}"
password = "${ES_PASSWORD}"
page_size = 500

[elastic.query.query.range.auditProcessedDateTimeUtc]
gte = "2024-01-01"

[export]
job_name = "Initial_load_from_elasticsearch"
job_id = 8
command = "elasticsearch_data_export"
table_name = "rta_claim_headers"
order_field = "updatedAt"
unique_field = "id"
resolution = "heuristic"
page_limit = 3

[http]
request_timeout = 60
max_retries = 5

[run_log]
path = "/var/log/docline/runs.jsonl"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.output.dir, PathBuf::from("/tmp/claims"));
        assert_eq!(config.output.format, OutputFormat::Parquet);
        assert_eq!(config.output.compression_level, 6);
        assert_eq!(config.elastic.page_size, 500);
        assert_eq!(config.elastic.username.as_deref(), Some("${ES_USER}"));
        let query = config.elastic.query.as_ref().unwrap();
        assert_eq!(
            query["query"]["range"]["auditProcessedDateTimeUtc"]["gte"],
            "2024-01-01"
        );
        assert_eq!(config.export.job.job_id, 8);
        assert_eq!(config.export.job.table_name, "rta_claim_headers");
        assert_eq!(config.export.cursor.order_field, "updatedAt");
        assert_eq!(config.export.cursor.unique_field, "id");
        assert_eq!(config.export.resolution, Resolution::Heuristic);
        assert_eq!(config.export.page_limit, Some(3));
        assert_eq!(config.export.max_depth, 20);
        assert_eq!(config.http.request_timeout, 60);
        assert_eq!(config.http.connect_timeout, 30);
        assert_eq!(config.http.max_retries, 5);
        assert_eq!(config.run_log.path, PathBuf::from("/var/log/docline/runs.jsonl"));
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docline.toml");
        std::fs::write(&path, "[output]\nformat = \"csv\"\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }
}
