use crate::constants;
use crate::error::ConfigError;
use crate::types::{DuplicatePolicy, ReportFormat, UndefinedPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsConfig {
    #[serde(default = "default_qrels")]
    pub qrels: String,
    #[serde(default = "default_results")]
    pub results: String,
    #[serde(default = "default_output")]
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_precision_cutoff")]
    pub precision_cutoff: usize,
    #[serde(default = "default_average_precision_cutoff")]
    pub average_precision_cutoff: usize,
    #[serde(default = "default_undefined_policy")]
    pub undefined_policy: String,
    #[serde(default)]
    pub include_unretrieved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_judgement_duplicates")]
    pub judgement_duplicates: String,
    #[serde(default = "default_result_duplicates")]
    pub result_duplicates: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Worker threads for per-query evaluation; 0 lets rayon decide.
    #[serde(default)]
    pub parallelism: usize,
}

fn default_qrels() -> String {
    constants::DEFAULT_QRELS_PATH.into()
}
fn default_results() -> String {
    constants::DEFAULT_RESULTS_PATH.into()
}
fn default_output() -> String {
    constants::DEFAULT_OUTPUT_PATH.into()
}
fn default_precision_cutoff() -> usize {
    constants::DEFAULT_PRECISION_CUTOFF
}
fn default_average_precision_cutoff() -> usize {
    constants::DEFAULT_AVERAGE_PRECISION_CUTOFF
}
fn default_undefined_policy() -> String {
    UndefinedPolicy::Exclude.as_str().into()
}
fn default_judgement_duplicates() -> String {
    DuplicatePolicy::KeepLast.as_str().into()
}
fn default_result_duplicates() -> String {
    DuplicatePolicy::KeepFirst.as_str().into()
}
fn default_report_format() -> String {
    ReportFormat::Text.as_str().into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            qrels: default_qrels(),
            results: default_results(),
            output: default_output(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            precision_cutoff: default_precision_cutoff(),
            average_precision_cutoff: default_average_precision_cutoff(),
            undefined_policy: default_undefined_policy(),
            include_unretrieved: false,
        }
    }
}

impl MetricsConfig {
    pub fn undefined_policy_typed(&self) -> UndefinedPolicy {
        UndefinedPolicy::parse_policy(&self.undefined_policy).unwrap_or_default()
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            judgement_duplicates: default_judgement_duplicates(),
            result_duplicates: default_result_duplicates(),
        }
    }
}

impl LoadConfig {
    pub fn judgement_duplicates_typed(&self) -> DuplicatePolicy {
        DuplicatePolicy::parse_policy(&self.judgement_duplicates)
            .unwrap_or(DuplicatePolicy::KeepLast)
    }

    pub fn result_duplicates_typed(&self) -> DuplicatePolicy {
        DuplicatePolicy::parse_policy(&self.result_duplicates).unwrap_or(DuplicatePolicy::KeepFirst)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: default_report_format(),
        }
    }
}

impl ReportConfig {
    pub fn format_typed(&self) -> ReportFormat {
        ReportFormat::parse_format(&self.format).unwrap_or_default()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with layered precedence:
    /// 1. Explicit config file (from `--config` flag, highest priority)
    /// 2. Project config: `<working_dir>/.releval.toml`
    /// 3. Global config: `~/.releval/config.toml`
    /// 4. Built-in defaults (lowest priority)
    ///
    /// Environment overrides (`RELEVAL_<SECTION>_<KEY>`) are applied on top.
    pub fn load_with_file(
        working_dir: Option<&Path>,
        config_file: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let global = dirs::home_dir().map(|home| {
            home.join(constants::DEFAULT_CONFIG_DIR)
                .join("config.toml")
        });
        Self::load_layers(
            global.as_deref(),
            working_dir,
            config_file,
            |key| std::env::var(key).ok(),
        )
    }

    fn load_layers<F>(
        global_path: Option<&Path>,
        working_dir: Option<&Path>,
        config_file: Option<&Path>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Only explicitly-set fields of a higher layer override lower layers.
        let mut merged = toml::Value::Table(toml::map::Map::new());

        if let Some(global_path) = global_path
            && global_path.exists()
        {
            let raw = load_toml_value(global_path)?;
            merge_toml_values(&mut merged, &raw);
        }

        if let Some(dir) = working_dir {
            let project_path = dir.join(constants::PROJECT_CONFIG_FILE);
            if project_path.exists() {
                let raw = load_toml_value(&project_path)?;
                merge_toml_values(&mut merged, &raw);
            }
        }

        if let Some(cf) = config_file {
            if !cf.exists() {
                return Err(ConfigError::NotFound {
                    path: cf.display().to_string(),
                });
            }
            let raw = load_toml_value(cf)?;
            merge_toml_values(&mut merged, &raw);
        }

        let config_str =
            toml::to_string(&merged).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        apply_env_overrides(&mut config, env);
        config.normalize();
        Ok(config)
    }

    /// Replace invalid values with defaults, warning about each one.
    pub fn normalize(&mut self) {
        self.metrics.precision_cutoff = clamp_min_usize_with_warning(
            self.metrics.precision_cutoff,
            1,
            default_precision_cutoff(),
            "metrics.precision_cutoff",
        );
        self.metrics.average_precision_cutoff = clamp_min_usize_with_warning(
            self.metrics.average_precision_cutoff,
            1,
            default_average_precision_cutoff(),
            "metrics.average_precision_cutoff",
        );
        self.metrics.undefined_policy = normalize_choice(
            &self.metrics.undefined_policy,
            |raw| UndefinedPolicy::parse_policy(raw).map(|p| p.as_str()),
            default_undefined_policy(),
            "metrics.undefined_policy",
        );
        self.load.judgement_duplicates = normalize_choice(
            &self.load.judgement_duplicates,
            |raw| DuplicatePolicy::parse_policy(raw).map(|p| p.as_str()),
            default_judgement_duplicates(),
            "load.judgement_duplicates",
        );
        self.load.result_duplicates = normalize_choice(
            &self.load.result_duplicates,
            |raw| DuplicatePolicy::parse_policy(raw).map(|p| p.as_str()),
            default_result_duplicates(),
            "load.result_duplicates",
        );
        self.report.format = normalize_choice(
            &self.report.format,
            |raw| ReportFormat::parse_format(raw).map(|f| f.as_str()),
            default_report_format(),
            "report.format",
        );
        if self.logging.level.trim().is_empty() {
            self.logging.level = default_log_level();
        }
        for (path, fallback) in [
            (&mut self.inputs.qrels, default_qrels()),
            (&mut self.inputs.results, default_results()),
            (&mut self.inputs.output, default_output()),
        ] {
            if path.trim().is_empty() {
                *path = fallback;
            } else {
                *path = expand_tilde(path.trim());
            }
        }
    }

    pub fn qrels_path(&self) -> PathBuf {
        PathBuf::from(&self.inputs.qrels)
    }

    pub fn results_path(&self) -> PathBuf {
        PathBuf::from(&self.inputs.results)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.inputs.output)
    }
}

/// Load a TOML file as a raw `toml::Value` (preserving only explicitly-set fields).
fn load_toml_value(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    content
        .parse::<toml::Value>()
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))
}

/// Deep-merge `overlay` into `base`. Only keys present in `overlay` are written.
fn merge_toml_values(base: &mut toml::Value, overlay: &toml::Value) {
    if let (toml::Value::Table(base_map), toml::Value::Table(overlay_map)) = (base, overlay) {
        for (key, overlay_val) in overlay_map {
            if let Some(base_val) = base_map.get_mut(key) {
                if base_val.is_table() && overlay_val.is_table() {
                    merge_toml_values(base_val, overlay_val);
                } else {
                    *base_val = overlay_val.clone();
                }
            } else {
                base_map.insert(key.clone(), overlay_val.clone());
            }
        }
    }
}

/// Convention: `RELEVAL_<SECTION>_<KEY>` in UPPER_SNAKE_CASE.
fn apply_env_overrides<F>(config: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env("RELEVAL_INPUTS_QRELS") {
        config.inputs.qrels = v;
    }
    if let Some(v) = env("RELEVAL_INPUTS_RESULTS") {
        config.inputs.results = v;
    }
    if let Some(v) = env("RELEVAL_INPUTS_OUTPUT") {
        config.inputs.output = v;
    }
    if let Some(v) = env("RELEVAL_METRICS_PRECISION_CUTOFF")
        && let Ok(n) = v.trim().parse()
    {
        config.metrics.precision_cutoff = n;
    }
    if let Some(v) = env("RELEVAL_METRICS_AVERAGE_PRECISION_CUTOFF")
        && let Ok(n) = v.trim().parse()
    {
        config.metrics.average_precision_cutoff = n;
    }
    if let Some(v) = env("RELEVAL_METRICS_UNDEFINED_POLICY") {
        config.metrics.undefined_policy = v;
    }
    if let Some(v) = env("RELEVAL_METRICS_INCLUDE_UNRETRIEVED")
        && let Some(parsed) = parse_env_bool(&v)
    {
        config.metrics.include_unretrieved = parsed;
    }
    if let Some(v) = env("RELEVAL_LOAD_JUDGEMENT_DUPLICATES") {
        config.load.judgement_duplicates = v;
    }
    if let Some(v) = env("RELEVAL_LOAD_RESULT_DUPLICATES") {
        config.load.result_duplicates = v;
    }
    if let Some(v) = env("RELEVAL_REPORT_FORMAT") {
        config.report.format = v;
    }
    if let Some(v) = env("RELEVAL_LOGGING_LEVEL") {
        config.logging.level = v;
    }
    if let Some(v) = env("RELEVAL_RUNTIME_PARALLELISM")
        && let Ok(n) = v.trim().parse()
    {
        config.runtime.parallelism = n;
    }
}

fn parse_env_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn normalize_choice<F>(raw: &str, parse: F, fallback: String, field: &str) -> String
where
    F: Fn(&str) -> Option<&'static str>,
{
    match parse(raw) {
        Some(canonical) => canonical.to_string(),
        None => {
            tracing::warn!(
                field,
                value = raw,
                fallback = %fallback,
                "unknown config value; falling back to default"
            );
            fallback
        }
    }
}

fn clamp_min_usize_with_warning(value: usize, min: usize, fallback: usize, field: &str) -> usize {
    if value < min {
        tracing::warn!(
            field,
            value,
            min,
            fallback,
            "config value below minimum; falling back to default"
        );
        fallback
    } else {
        value
    }
}

fn expand_tilde(path: &str) -> String {
    if path.starts_with('~')
        && let Some(home) = dirs::home_dir()
    {
        return path.replacen('~', &home.to_string_lossy(), 1);
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_match_constants() {
        let config = Config::default();
        assert_eq!(config.inputs.qrels, "qrels");
        assert_eq!(config.inputs.results, "index");
        assert_eq!(config.inputs.output, "index");
        assert_eq!(config.metrics.precision_cutoff, 10);
        assert_eq!(config.metrics.average_precision_cutoff, 45);
        assert_eq!(
            config.metrics.undefined_policy_typed(),
            UndefinedPolicy::Exclude
        );
        assert_eq!(
            config.load.judgement_duplicates_typed(),
            DuplicatePolicy::KeepLast
        );
        assert_eq!(
            config.load.result_duplicates_typed(),
            DuplicatePolicy::KeepFirst
        );
        assert_eq!(config.report.format_typed(), ReportFormat::Text);
    }

    #[test]
    fn explicit_file_overrides_project_file_field_by_field() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(constants::PROJECT_CONFIG_FILE),
            "[metrics]\nprecision_cutoff = 5\naverage_precision_cutoff = 20\n",
        )
        .unwrap();
        let explicit = dir.path().join("override.toml");
        std::fs::write(&explicit, "[metrics]\nprecision_cutoff = 3\n").unwrap();

        let config =
            Config::load_layers(None, Some(dir.path()), Some(&explicit), no_env).unwrap();
        assert_eq!(config.metrics.precision_cutoff, 3);
        assert_eq!(config.metrics.average_precision_cutoff, 20);
    }

    #[test]
    fn global_layer_is_lowest_priority() {
        let dir = tempdir().unwrap();
        let global = dir.path().join("global.toml");
        std::fs::write(&global, "[report]\nformat = \"json\"\n[runtime]\nparallelism = 2\n")
            .unwrap();
        std::fs::write(
            dir.path().join(constants::PROJECT_CONFIG_FILE),
            "[runtime]\nparallelism = 4\n",
        )
        .unwrap();

        let config = Config::load_layers(Some(&global), Some(dir.path()), None, no_env).unwrap();
        assert_eq!(config.report.format_typed(), ReportFormat::Json);
        assert_eq!(config.runtime.parallelism, 4);
    }

    #[test]
    fn env_overrides_win_over_files() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(constants::PROJECT_CONFIG_FILE),
            "[metrics]\nundefined_policy = \"exclude\"\n",
        )
        .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("RELEVAL_METRICS_UNDEFINED_POLICY", "fail"),
            ("RELEVAL_METRICS_INCLUDE_UNRETRIEVED", "yes"),
            ("RELEVAL_INPUTS_QRELS", "judgements.tsv"),
            ("RELEVAL_METRICS_PRECISION_CUTOFF", "not-a-number"),
        ]);

        let config = Config::load_layers(None, Some(dir.path()), None, |key| {
            env.get(key).map(|value| value.to_string())
        })
        .unwrap();
        assert_eq!(config.metrics.undefined_policy_typed(), UndefinedPolicy::Fail);
        assert!(config.metrics.include_unretrieved);
        assert_eq!(config.inputs.qrels, "judgements.tsv");
        assert_eq!(config.metrics.precision_cutoff, 10);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let explicit = dir.path().join("bad.toml");
        std::fs::write(
            &explicit,
            "[metrics]\nprecision_cutoff = 0\nundefined_policy = \"ignore\"\n\
             [load]\njudgement_duplicates = \"KEEP_FIRST\"\nresult_duplicates = \"random\"\n\
             [report]\nformat = \"xml\"\n[inputs]\noutput = \"  \"\n",
        )
        .unwrap();

        let config = Config::load_layers(None, None, Some(&explicit), no_env).unwrap();
        assert_eq!(config.metrics.precision_cutoff, 10);
        assert_eq!(config.metrics.undefined_policy, "exclude");
        assert_eq!(config.load.judgement_duplicates, "keep_first");
        assert_eq!(config.load.result_duplicates, "keep_first");
        assert_eq!(config.report.format, "text");
        assert_eq!(config.inputs.output, "index");
    }

    #[test]
    fn missing_explicit_file_is_reported() {
        let dir = tempdir().unwrap();
        let err = Config::load_layers(None, None, Some(&dir.path().join("nope.toml")), no_env)
            .expect_err("missing config file must fail");
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let explicit = dir.path().join("broken.toml");
        std::fs::write(&explicit, "[metrics\nprecision_cutoff = 3\n").unwrap();
        let err = Config::load_layers(None, None, Some(&explicit), no_env)
            .expect_err("broken toml must fail");
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn parse_env_bool_supports_common_truthy_falsey_values() {
        assert_eq!(parse_env_bool("ON"), Some(true));
        assert_eq!(parse_env_bool(" 0 "), Some(false));
        assert_eq!(parse_env_bool("maybe"), None);
    }
}
