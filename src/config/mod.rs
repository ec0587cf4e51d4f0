mod loader;

pub use loader::{internal_name, Config, IncrementalConfig, KeepEntry, KeepKind, ReportConfig};
