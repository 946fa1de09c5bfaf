//! Project loading: reading the file, picking the format specific parser
//! and seeding the macro map.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use roxmltree::Document;

use crate::error::ProjectError;
use crate::format::{self, Format};
use crate::macros::MacroMap;
use crate::model::{Project, with_trailing_separator};
use crate::vsvars::{self, VsVars};
use crate::{vcproj, vcxproj};

// ═══════════════════════════════════════════════════════════════════════════════
//  Location
// ═══════════════════════════════════════════════════════════════════════════════

/// Where a project file lives. Every relative path inside the project is
/// resolved against `directory`, never against the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    pub absolute_path: PathBuf,
    pub directory: PathBuf,
}

impl Location {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let absolute_path = std::path::absolute(&path).unwrap_or_else(|_| path.clone());
        let directory = absolute_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self { path, absolute_path, directory }
    }

    /// `demo.vcproj`
    pub fn file_name(&self) -> &str {
        self.absolute_path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
    }

    /// `demo`
    pub fn file_stem(&self) -> &str {
        self.absolute_path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
    }

    /// `.vcproj`, or `""` without an extension.
    pub fn extension(&self) -> String {
        self.absolute_path
            .extension()
            .and_then(OsStr::to_str)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }

    pub(crate) fn new_project(&self, format: Format) -> Project {
        Project {
            format,
            path: self.path.clone(),
            absolute_path: self.absolute_path.clone(),
            directory: self.directory.clone(),
            ..Default::default()
        }
    }
}

/// Fill the project-level macros once the project name is known.
pub(crate) fn seed_project_macros(
    macros: &mut MacroMap,
    location: &Location,
    name: &str,
    root_namespace: &str,
) {
    let directory = with_trailing_separator(&location.directory.to_string_lossy());
    let path = location.absolute_path.to_string_lossy();

    for token in ["ProjectName", "InputName", "TargetName", "SafeInputName"] {
        macros.set(token, name);
    }
    for token in ["RootNameSpace", "SafeRootNamespace"] {
        macros.set(token, root_namespace);
    }
    for token in ["ProjectDir", "InputDir"] {
        macros.set(token, directory.as_str());
    }
    for token in ["ProjectPath", "InputPath"] {
        macros.set(token, &*path);
    }
    for token in ["ProjectFileName", "InputFileName"] {
        macros.set(token, location.file_name());
    }
    let extension = location.extension();
    for token in ["ProjectExt", "InputExt"] {
        macros.set(token, extension.as_str());
    }
}

/// Remove a leading UTF-8 byte-order mark.
pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Read an XML file into a string, tolerating non UTF-8 bytes (older
/// projects declare `Windows-1252`).
pub(crate) fn read_text(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_project_file(path: &Path) -> Result<String, ProjectError> {
    if std::fs::metadata(path).is_err() {
        return Err(ProjectError::NotFound { path: path.to_path_buf() });
    }
    read_text(path).map_err(|source| ProjectError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ProjectBuilder – seeding macros before a parse
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for loading a [`Project`] with pre-set macro values.
///
/// Seeds are applied to the fresh macro map before any project attribute
/// is read, so `$(SolutionDir)` or `$(VCInstallDir)` references resolve.
/// Project and configuration level macros still override seeds.
///
/// # Example
/// ```no_run
/// use vcproj_rs::ProjectBuilder;
///
/// let project = ProjectBuilder::new()
///     .macro_value("SolutionDir", "../")
///     .vsvars_file(r"C:\VS9\Common7\Tools\vsvars32.bat")
///     .unwrap()
///     .parse("demo.vcproj")
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProjectBuilder {
    /// Exact macro assignments.
    defines: Vec<(String, String)>,
    /// Environment style variables, matched against the vocabulary
    /// ignoring case.
    environment: VsVars,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-set one macro. `name` may be `SolutionDir` or `$(SolutionDir)`.
    pub fn macro_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }

    /// Pre-set many macros. Later entries override earlier ones.
    pub fn macros<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.defines
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Read `@SET` lines from the contents of a Visual Studio environment
    /// script.
    pub fn vsvars(mut self, content: &str) -> Self {
        self.environment.extend(vsvars::parse_vsvars(content));
        self
    }

    /// Read a Visual Studio environment script from disk.
    pub fn vsvars_file(mut self, path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let vars = vsvars::parse_vsvars_file(path).map_err(|source| ProjectError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        self.environment.extend(vars);
        Ok(self)
    }

    /// Match the process environment against the macro vocabulary.
    /// Entries already taken from a script win.
    pub fn system_env(mut self) -> Self {
        for (key, value) in std::env::vars() {
            if !self.environment.keys().any(|k| k.eq_ignore_ascii_case(&key)) {
                self.environment.insert(key, value);
            }
        }
        self
    }

    /// Fresh macro map for `format` with every seed applied.
    pub fn macro_map(&self, format: Format) -> MacroMap {
        let mut macros = match format {
            Format::Vcxproj => MacroMap::vcxproj(),
            _ => MacroMap::vcproj(),
        };
        let seeded = vsvars::seed_macros(&self.environment, &mut macros);
        for (name, value) in &self.defines {
            macros.set(name, value.as_str());
        }
        debug!(environment = seeded, defines = self.defines.len(); "Seeded macros");
        macros
    }

    /// Load and parse a project file from disk.
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Project, ProjectError> {
        let path = path.as_ref();
        info!(path:? = path; "Loading project");
        let source = read_project_file(path)?;
        self.parse_source(&source, path)
    }

    /// Parse project text that was read from `path`. The path only
    /// provides the directory relative file names are resolved against.
    pub fn parse_source(&self, source: &str, path: impl AsRef<Path>) -> Result<Project, ProjectError> {
        let location = Location::new(path);
        let text = strip_bom(source);

        if text.trim().is_empty() {
            return Err(ProjectError::Empty { path: location.path });
        }
        if format::is_solution(text) {
            return Err(ProjectError::UnsupportedFormat {
                path: location.path,
                format: Format::Solution,
            });
        }

        let doc = Document::parse(text)?;
        let format = format::detect_document(&doc);
        debug!(format:% = format; "Detected project format");

        let mut macros = self.macro_map(format);
        let mut project = match format {
            Format::Vcproj => vcproj::parse(&doc, &location, &mut macros)?,
            Format::Vcxproj => vcxproj::parse(&doc, &location, &mut macros)?,
            other => {
                return Err(ProjectError::UnsupportedFormat {
                    path: location.path,
                    format: other,
                });
            }
        };

        if project.files.is_empty() {
            let message = format!("{}: project contains no files", location.path.display());
            warn!("{message}");
            project.warnings.push(message);
        }

        info!(
            name = project.name.as_str(),
            configurations = project.configurations.len(),
            files = project.files.len();
            "Parsed project"
        );
        Ok(project)
    }
}

impl Project {
    /// Load a project file with an unseeded macro map.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        ProjectBuilder::new().parse(path)
    }

    /// Parse project text as if it had been read from `path`.
    pub fn parse_str(source: &str, path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        ProjectBuilder::new().parse_source(source, path)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
