//! Print selected properties of one (or every) configuration instead of a
//! Makefile, for splicing into hand-written build scripts:
//!
//! ```text
//! $ vstomake demo.vcproj -D='$(CPPFLAGS) =' --config 'Debug|Win32'
//! $(CPPFLAGS) =-DWIN32 -D_DEBUG -D_CONSOLE
//! ```

use crate::error::ProjectError;
use crate::makefile::{
    defines, flags, forced_includes, include_directories, libraries, library_directories,
};
use crate::model::{Configuration, Project};

/// One property family that can be dumped. Declaration order is output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DumpField {
    /// `-c`: the configuration names of the project.
    Configurations,
    /// `-i`
    ForcedIncludes,
    /// `-I`
    IncludeDirectories,
    /// `-l`
    Libraries,
    /// `-L`
    LibraryDirectories,
    /// `-D`
    Defines,
    /// `-s`: C and C++ sources built by the configuration.
    Sources,
}

impl DumpField {
    pub const ALL: [DumpField; 7] = [
        DumpField::Configurations,
        DumpField::ForcedIncludes,
        DumpField::IncludeDirectories,
        DumpField::Libraries,
        DumpField::LibraryDirectories,
        DumpField::Defines,
        DumpField::Sources,
    ];

    /// Command line letter selecting this field.
    pub fn flag(self) -> char {
        match self {
            DumpField::Configurations => 'c',
            DumpField::ForcedIncludes => 'i',
            DumpField::IncludeDirectories => 'I',
            DumpField::Libraries => 'l',
            DumpField::LibraryDirectories => 'L',
            DumpField::Defines => 'D',
            DumpField::Sources => 's',
        }
    }

    pub fn from_flag(flag: char) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.flag() == flag)
    }

    fn is_per_configuration(self) -> bool {
        self != DumpField::Configurations
    }
}

/// Which configurations a dump covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpTarget {
    /// A single configuration by composite name (`Debug|Win32`).
    Configuration(String),
    All,
}

/// What to dump, and with which prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRequest {
    fields: Vec<(DumpField, String)>,
    pub target: DumpTarget,
}

impl DumpRequest {
    pub fn new(target: DumpTarget) -> Self {
        Self { fields: Vec::new(), target }
    }

    /// Request `field`, printed after `prefix`. Requesting a field twice
    /// keeps the last prefix.
    pub fn field(mut self, field: DumpField, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = prefix,
            None => {
                self.fields.push((field, prefix));
                self.fields.sort_by_key(|(f, _)| *f);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = DumpField> + '_ {
        self.fields.iter().map(|(f, _)| *f)
    }

    fn needs_configuration(&self) -> bool {
        self.fields().any(DumpField::is_per_configuration)
    }
}

/// Replace the prefix placeholders with the values of `config`.
pub fn expand_prefix(prefix: &str, project: &Project, config: &Configuration) -> String {
    [
        ("$(Name)", project.name.as_str()),
        ("$(Platform)", config.platform.as_str()),
        ("$(Configuration)", config.configuration_name.as_str()),
        ("$(IntDir)", config.intermediate_directory.as_str()),
        ("$(OutDir)", config.output_directory.as_str()),
    ]
    .into_iter()
    .fold(prefix.to_string(), |text, (token, value)| text.replace(token, value))
}

fn render_configuration(out: &mut String, project: &Project, config: &Configuration, request: &DumpRequest) {
    for (field, prefix) in &request.fields {
        let value = match field {
            DumpField::Configurations => continue,
            DumpField::ForcedIncludes => flags("-include ", &forced_includes(config)),
            DumpField::IncludeDirectories => flags("-I", &include_directories(config)),
            DumpField::Libraries => flags("-l", &libraries(config)),
            DumpField::LibraryDirectories => flags("-L", &library_directories(config)),
            DumpField::Defines => flags("-D", &defines(config)),
            DumpField::Sources => project
                .files_of(config)
                .filter(|f| f.is_source())
                .map(|f| f.unix_path())
                .collect::<Vec<_>>()
                .join("\\\n"),
        };
        out.push_str(&format!("{}{value}\n", expand_prefix(prefix, project, config)));
    }
}

/// Render the requested properties.
///
/// Configuration names (`-c`) are listed once, before any per
/// configuration output. Naming a configuration the project does not have
/// fails with [`ProjectError::UnknownConfiguration`], unless only `-c` was
/// requested.
pub fn render(project: &Project, request: &DumpRequest) -> Result<String, ProjectError> {
    let mut out = String::new();

    if let Some((_, prefix)) = request.fields.iter().find(|(f, _)| *f == DumpField::Configurations) {
        for config in &project.configurations {
            out.push_str(&format!("{}{}\n", expand_prefix(prefix, project, config), config.name));
        }
    }

    if !request.needs_configuration() {
        return Ok(out);
    }

    match &request.target {
        DumpTarget::All => {
            for config in &project.configurations {
                render_configuration(&mut out, project, config, request);
            }
        }
        DumpTarget::Configuration(name) => {
            let config = project
                .configuration(name)
                .ok_or_else(|| ProjectError::UnknownConfiguration(name.clone()))?;
            render_configuration(&mut out, project, config, request);
        }
    }

    Ok(out)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
