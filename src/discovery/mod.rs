mod file_finder;

pub use file_finder::{FileFinder, InputKind};
