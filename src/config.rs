use std::path::PathBuf;

const DEFAULT_PARAMS_PATH: &str = "params.yaml";
const DEFAULT_MODEL_PATH: &str = "models/model.json";
const DEFAULT_DATA_DIR: &str = "data/processed";
const DEFAULT_METRICS_PATH: &str = "reports/metrics.json";
const DEFAULT_ERROR_LOG: &str = "errors.log";
const DEFAULT_TRACKING_DIR: &str = "dvclive";
const DEFAULT_LOGGER_NAME: &str = "Model Evaluation";

#[derive(Debug, Clone)]
pub struct Config {
    pub params_path: PathBuf,
    pub model_path: PathBuf,
    pub data_dir: PathBuf,
    pub metrics_path: PathBuf,
    pub error_log: PathBuf,
    pub tracking_dir: PathBuf,
    pub logger_name: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            params_path: env_path("MODEL_EVAL_PARAMS", DEFAULT_PARAMS_PATH),
            model_path: env_path("MODEL_EVAL_MODEL", DEFAULT_MODEL_PATH),
            data_dir: env_path("MODEL_EVAL_DATA_DIR", DEFAULT_DATA_DIR),
            metrics_path: env_path("MODEL_EVAL_METRICS", DEFAULT_METRICS_PATH),
            error_log: env_path("MODEL_EVAL_ERROR_LOG", DEFAULT_ERROR_LOG),
            tracking_dir: env_path("MODEL_EVAL_TRACKING_DIR", DEFAULT_TRACKING_DIR),
            logger_name: std::env::var("MODEL_EVAL_LOGGER")
                .unwrap_or_else(|_| DEFAULT_LOGGER_NAME.into()),
        }
    }

    /// Resolve every path against `root`. Absolute paths are kept as-is.
    #[cfg(test)]
    pub fn rooted_at(mut self, root: &std::path::Path) -> Self {
        for path in [
            &mut self.params_path,
            &mut self.model_path,
            &mut self.data_dir,
            &mut self.metrics_path,
            &mut self.error_log,
            &mut self.tracking_dir,
        ] {
            *path = root.join(&*path);
        }
        self
    }

    pub fn print_banner(&self) {
        tracing::info!("╔══════════════════════════════════════════════════╗");
        tracing::info!("║           model-eval v{}                      ║", env!("CARGO_PKG_VERSION"));
        tracing::info!("╠══════════════════════════════════════════════════╣");
        tracing::info!("║  Params:            {:<28}║", self.params_path.display());
        tracing::info!("║  Model:             {:<28}║", self.model_path.display());
        tracing::info!("║  Data dir:          {:<28}║", self.data_dir.display());
        tracing::info!("║  Metrics out:       {:<28}║", self.metrics_path.display());
        tracing::info!("║  Error log:         {:<28}║", self.error_log.display());
        tracing::info!("║  Tracking dir:      {:<28}║", self.tracking_dir.display());
        tracing::info!("╚══════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            params_path: PathBuf::from(DEFAULT_PARAMS_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            metrics_path: PathBuf::from(DEFAULT_METRICS_PATH),
            error_log: PathBuf::from(DEFAULT_ERROR_LOG),
            tracking_dir: PathBuf::from(DEFAULT_TRACKING_DIR),
            logger_name: DEFAULT_LOGGER_NAME.to_string(),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_config_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.params_path, PathBuf::from("params.yaml"));
        assert_eq!(cfg.data_dir, PathBuf::from("data/processed"));
        assert_eq!(cfg.metrics_path, PathBuf::from("reports/metrics.json"));
        assert_eq!(cfg.logger_name, "Model Evaluation");
    }

    #[test]
    fn test_env_path_fallback() {
        assert_eq!(
            env_path("NONEXISTENT_MODEL_EVAL_VAR_XYZ", "fallback.yaml"),
            PathBuf::from("fallback.yaml")
        );
    }

    #[test]
    fn test_rooted_at() {
        let cfg = Config::default().rooted_at(Path::new("/work"));
        assert_eq!(cfg.model_path, PathBuf::from("/work/models/model.json"));
        assert_eq!(cfg.tracking_dir, PathBuf::from("/work/dvclive"));
    }

    #[test]
    fn test_rooted_at_keeps_absolute() {
        let mut cfg = Config::default();
        cfg.error_log = PathBuf::from("/var/log/eval.log");
        let cfg = cfg.rooted_at(Path::new("/work"));
        assert_eq!(cfg.error_log, PathBuf::from("/var/log/eval.log"));
    }
}
