//! Source-name patterns and defaults shared across the ingester.
//! Pattern order matters: dispatch takes the first pattern contained in a source name.

pub const LANDER_SATURN_PATTERN: &str = "lander_saturn";
pub const LANDER_VENUS_PATTERN: &str = "lander_venus";
pub const ROCKET_SATURN_PATTERN: &str = "rocket_saturn";
pub const ROCKET_VENUS_PATTERN: &str = "rocket_venus";

// Defaults used when neither the config file nor the environment set a value
pub const DEFAULT_BUCKET: &str = "de-assignment-data-bucket";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_CONFIG_FILE: &str = "craft_ingest.toml";

/// Format of the timestamp suffix embedded in source object names
pub const SOURCE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Format used when writing timestamps to output CSV files
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Extension appended to the craft type name for output files
pub const OUTPUT_EXTENSION: &str = "csv";

/// Emit a progress line every this many completed work units
pub const PROGRESS_EVERY: usize = 25;
