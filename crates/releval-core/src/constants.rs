/// Judgement grade that marks an item as relevant. Every other grade is non-relevant.
pub const RELEVANT_GRADE: i64 = 1;

/// Default cutoff for precision@k.
pub const DEFAULT_PRECISION_CUTOFF: usize = 10;

/// Default cutoff for average precision.
pub const DEFAULT_AVERAGE_PRECISION_CUTOFF: usize = 45;

/// Recall levels of the (non-interpolated) recall-precision table.
pub const RECALL_PRECISION_LEVELS: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];

/// Recall levels of the 11-point interpolated precision curve.
pub const INTERPOLATED_RECALL_LEVELS: [f64; 11] =
    [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Default judgement file path.
pub const DEFAULT_QRELS_PATH: &str = "qrels";

/// Default retrieved-results file path.
pub const DEFAULT_RESULTS_PATH: &str = "index";

/// Default report path.
pub const DEFAULT_OUTPUT_PATH: &str = "index";

/// Default config directory name under home.
pub const DEFAULT_CONFIG_DIR: &str = ".releval";

/// Project config file name, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = ".releval.toml";

/// Version tag of the evaluation report.
pub const REPORT_VERSION: &str = "releval-report-v1";
