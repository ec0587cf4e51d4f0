use crate::classfile::ClassFile;
use crate::config::Config;
use crate::graph::ClassInput;
use ignore::WalkBuilder;
use miette::{IntoDiagnostic, Result, WrapErr};
use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use zip::ZipArchive;

/// Kind of input path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Directory,
    Archive,
    ClassFile,
}

impl InputKind {
    /// Determine the input kind from a path
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(InputKind::Directory);
        }
        match path.extension()?.to_str()? {
            "jar" | "zip" => Some(InputKind::Archive),
            "class" => Some(InputKind::ClassFile),
            _ => None,
        }
    }
}

/// Finds class files in directories, jars and loose class files
pub struct FileFinder<'a> {
    config: &'a Config,
}

impl<'a> FileFinder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Collect class inputs from `paths`, resolved against `root`, in path order
    pub fn find_classes(&self, root: &Path, paths: &[PathBuf]) -> Result<Vec<ClassInput>> {
        let targets: Vec<PathBuf> = paths.iter().map(|p| root.join(p)).collect();

        let batches: Vec<Result<Vec<ClassInput>>> = targets
            .par_iter()
            .map(|target| self.scan_target(target))
            .collect();

        let mut inputs = Vec::new();
        for batch in batches {
            inputs.extend(batch?);
        }
        debug!("Found {} classes in {} inputs", inputs.len(), targets.len());
        Ok(inputs)
    }

    fn scan_target(&self, target: &Path) -> Result<Vec<ClassInput>> {
        if !target.exists() {
            miette::bail!("Input does not exist: {}", target.display());
        }

        match InputKind::from_path(target) {
            Some(InputKind::Directory) => self.scan_directory(target),
            Some(InputKind::Archive) => self.read_archive(target),
            Some(InputKind::ClassFile) => Ok(vec![read_class_file(target)?]),
            None => {
                trace!("Skipping non-class input: {}", target.display());
                Ok(Vec::new())
            }
        }
    }

    /// Walk a directory of class files; names come from paths relative to it
    fn scan_directory(&self, dir: &Path) -> Result<Vec<ClassInput>> {
        // Build outputs are usually git-ignored, so only .ignore files apply
        let walker = WalkBuilder::new(dir)
            .hidden(true)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(true)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut inputs = Vec::new();
        for entry in walker.filter_map(|entry| entry.ok()) {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("class") {
                continue;
            }
            if self.config.should_exclude(path) {
                trace!("Excluding: {}", path.display());
                continue;
            }

            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let name = class_name_from_path(&relative.to_string_lossy());
            if is_metadata_class(&name) {
                continue;
            }

            let bytes = std::fs::read(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to read class file: {}", path.display()))?;
            inputs.push(ClassInput::new(name, bytes));
        }
        Ok(inputs)
    }

    /// Read every class entry of a jar
    fn read_archive(&self, path: &Path) -> Result<Vec<ClassInput>> {
        let file = File::open(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to open archive: {}", path.display()))?;
        let mut archive = ZipArchive::new(file)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read archive: {}", path.display()))?;

        let mut inputs = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).into_diagnostic()?;
            if !entry.is_file() || !entry.name().ends_with(".class") {
                continue;
            }
            let entry_name = entry.name().to_string();
            if self
                .config
                .should_exclude(Path::new(&format!("{}!/{}", path.display(), entry_name)))
            {
                trace!("Excluding: {}!/{}", path.display(), entry_name);
                continue;
            }

            let name = class_name_from_path(&entry_name);
            if is_metadata_class(&name) {
                continue;
            }

            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to read {} from {}", entry_name, path.display()))?;
            inputs.push(ClassInput::new(name, bytes));
        }
        debug!("Read {} classes from {}", inputs.len(), path.display());
        Ok(inputs)
    }
}

/// A loose class file is named by its own declaration. Unreadable headers
/// fall back to the file stem and fail later as malformed input.
fn read_class_file(path: &Path) -> Result<ClassInput> {
    let bytes = std::fs::read(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read class file: {}", path.display()))?;
    let name = match ClassFile::peek_name(&bytes) {
        Ok(name) => name,
        Err(_) => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    Ok(ClassInput::new(name, bytes))
}

/// `com/example/Main.class` → `com/example/Main`
fn class_name_from_path(path: &str) -> String {
    path.trim_end_matches(".class").replace('\\', "/")
}

fn is_metadata_class(name: &str) -> bool {
    name.ends_with("module-info") || name.ends_with("package-info")
}
