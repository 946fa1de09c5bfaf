//! Normalized, format-independent project model.
//!
//! A [`Project`] owns every [`File`] in one arena (`Project::files`).
//! Configurations and filters refer to files through [`FileId`] indices
//! only, so growing the arena never invalidates a reference.

use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

use indexmap::IndexMap;

use crate::format::Format;

// ═══════════════════════════════════════════════════════════════════════════════
//  Tool interfaces
// ═══════════════════════════════════════════════════════════════════════════════

pub const VC_CL_COMPILER_TOOL: &str = "VCCLCompilerTool";
pub const VC_LINKER_TOOL: &str = "VCLinkerTool";
pub const VC_LIBRARIAN_TOOL: &str = "VCLibrarianTool";
pub const VC_RESOURCE_COMPILER_TOOL: &str = "VCResourceCompilerTool";
pub const VC_MIDL_TOOL: &str = "VCMidlTool";
pub const VC_MANIFEST_TOOL: &str = "VCManifestTool";
pub const VC_CUSTOM_BUILD_TOOL: &str = "VCCustomBuildTool";
pub const VC_PRE_BUILD_EVENT_TOOL: &str = "VCPreBuildEventTool";
pub const VC_PRE_LINK_EVENT_TOOL: &str = "VCPreLinkEventTool";
pub const VC_POST_BUILD_EVENT_TOOL: &str = "VCPostBuildEventTool";

/// Flat `property name → value` settings of one tool interface.
pub type ToolProperties = IndexMap<String, String>;

/// `tool interface name → properties` for one configuration.
pub type ToolMap = IndexMap<String, ToolProperties>;

/// Split a semicolon separated property value, dropping empty entries.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(';').map(str::trim).filter(|s| !s.is_empty())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Typed property access
// ═══════════════════════════════════════════════════════════════════════════════

/// How the raw string of a tool property should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    /// `a;b;c`
    List,
    /// `a;b c` – separated by semicolons and/or whitespace (library lists).
    Words,
    /// `true` / `false`
    Bool,
    /// Small integer option codes (`Optimization="2"`).
    Number,
}

/// A tool property decoded according to its [`PropertyKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue<'a> {
    Text(&'a str),
    List(Vec<&'a str>),
    Bool(bool),
    Number(i64),
}

use PropertyKind::*;

/// Known `(tool, property) → kind` pairs. Anything missing is [`Text`].
const PROPERTY_KINDS: &[(&str, &str, PropertyKind)] = &[
    (VC_CL_COMPILER_TOOL, "AdditionalIncludeDirectories", List),
    (VC_CL_COMPILER_TOOL, "AdditionalUsingDirectories", List),
    (VC_CL_COMPILER_TOOL, "PreprocessorDefinitions", List),
    (VC_CL_COMPILER_TOOL, "UndefinePreprocessorDefinitions", List),
    (VC_CL_COMPILER_TOOL, "ForcedIncludeFiles", List),
    (VC_CL_COMPILER_TOOL, "DisableSpecificWarnings", List),
    (VC_CL_COMPILER_TOOL, "Optimization", Number),
    (VC_CL_COMPILER_TOOL, "WarningLevel", Number),
    (VC_CL_COMPILER_TOOL, "RuntimeLibrary", Number),
    (VC_CL_COMPILER_TOOL, "DebugInformationFormat", Number),
    (VC_CL_COMPILER_TOOL, "UsePrecompiledHeader", Number),
    (VC_CL_COMPILER_TOOL, "CompileAs", Number),
    (VC_CL_COMPILER_TOOL, "ExceptionHandling", Number),
    (VC_CL_COMPILER_TOOL, "BasicRuntimeChecks", Number),
    (VC_CL_COMPILER_TOOL, "MinimalRebuild", Bool),
    (VC_CL_COMPILER_TOOL, "WarnAsError", Bool),
    (VC_CL_COMPILER_TOOL, "RuntimeTypeInfo", Bool),
    (VC_CL_COMPILER_TOOL, "BufferSecurityCheck", Bool),
    (VC_CL_COMPILER_TOOL, "EnableIntrinsicFunctions", Bool),
    (VC_CL_COMPILER_TOOL, "EnableFunctionLevelLinking", Bool),
    (VC_CL_COMPILER_TOOL, "WholeProgramOptimization", Bool),
    (VC_CL_COMPILER_TOOL, "Detect64BitPortabilityProblems", Bool),
    (VC_LINKER_TOOL, "AdditionalDependencies", Words),
    (VC_LINKER_TOOL, "AdditionalLibraryDirectories", List),
    (VC_LINKER_TOOL, "IgnoreDefaultLibraryNames", List),
    (VC_LINKER_TOOL, "GenerateDebugInformation", Bool),
    (VC_LINKER_TOOL, "LinkIncremental", Number),
    (VC_LINKER_TOOL, "SubSystem", Number),
    (VC_LINKER_TOOL, "TargetMachine", Number),
    (VC_LINKER_TOOL, "OptimizeReferences", Number),
    (VC_LINKER_TOOL, "EnableCOMDATFolding", Number),
    (VC_LIBRARIAN_TOOL, "AdditionalDependencies", Words),
    (VC_LIBRARIAN_TOOL, "AdditionalLibraryDirectories", List),
    (VC_LIBRARIAN_TOOL, "IgnoreAllDefaultLibraries", Bool),
    (VC_RESOURCE_COMPILER_TOOL, "AdditionalIncludeDirectories", List),
    (VC_RESOURCE_COMPILER_TOOL, "PreprocessorDefinitions", List),
    (VC_PRE_BUILD_EVENT_TOOL, "ExcludedFromBuild", Bool),
    (VC_PRE_LINK_EVENT_TOOL, "ExcludedFromBuild", Bool),
    (VC_POST_BUILD_EVENT_TOOL, "ExcludedFromBuild", Bool),
];

/// Kind of the given tool property according to the declarative table.
pub fn property_kind(tool: &str, name: &str) -> PropertyKind {
    PROPERTY_KINDS
        .iter()
        .find(|(t, n, _)| *t == tool && *n == name)
        .map(|(_, _, kind)| *kind)
        .unwrap_or(Text)
}

fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Decode a raw property string. Values that do not fit their declared
/// kind fall back to [`PropertyValue::Text`].
pub fn decode_property(kind: PropertyKind, raw: &str) -> PropertyValue<'_> {
    match kind {
        Text => PropertyValue::Text(raw),
        List => PropertyValue::List(split_list(raw).collect()),
        Words => PropertyValue::List(
            raw.split(|c: char| c == ';' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        Bool => parse_bool(raw).map_or(PropertyValue::Text(raw), PropertyValue::Bool),
        Number => raw
            .trim()
            .parse()
            .map_or(PropertyValue::Text(raw), PropertyValue::Number),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Enumerations
// ═══════════════════════════════════════════════════════════════════════════════

/// `ConfigurationType` of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigurationType {
    #[default]
    Unknown,
    Application,
    DynamicLibrary,
    StaticLibrary,
    Utility,
}

impl ConfigurationType {
    /// Map the numeric `.vcproj` code. Unrecognized codes are `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Application,
            2 => Self::DynamicLibrary,
            4 => Self::StaticLibrary,
            10 => Self::Utility,
            _ => Self::Unknown,
        }
    }

    /// Parse a `.vcproj` attribute value (`"1"`, `"4"` …).
    pub fn from_attribute(value: &str) -> Self {
        value.trim().parse().map_or(Self::Unknown, Self::from_code)
    }

    /// Parse an MSBuild `<ConfigurationType>` value.
    pub fn from_msbuild(value: &str) -> Self {
        match value.trim() {
            "Application" => Self::Application,
            "DynamicLibrary" => Self::DynamicLibrary,
            "StaticLibrary" => Self::StaticLibrary,
            "Utility" | "Makefile" => Self::Utility,
            _ => Self::Unknown,
        }
    }
}

/// `CharacterSet` of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharacterSet {
    #[default]
    NotSet,
    Unicode,
    Mbcs,
}

impl CharacterSet {
    pub fn from_attribute(value: &str) -> Self {
        match value.trim() {
            "1" => Self::Unicode,
            "2" => Self::Mbcs,
            _ => Self::NotSet,
        }
    }

    pub fn from_msbuild(value: &str) -> Self {
        match value.trim() {
            "Unicode" => Self::Unicode,
            "MultiByte" => Self::Mbcs,
            _ => Self::NotSet,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  File
// ═══════════════════════════════════════════════════════════════════════════════

/// Index of a [`File`] inside [`Project::files`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

const C_EXTENSIONS: &[&str] = &["c"];
const CPP_EXTENSIONS: &[&str] = &["cc", "cpp", "cxx", "c++", "cp", "C", "CPP"];

/// One file referenced by the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    /// Path exactly as written in the project (`.\src\main.cpp`).
    pub relative_path: String,
    /// `relative_path` resolved against the project directory.
    pub absolute_path: PathBuf,
    /// Final path segment (`main.cpp`).
    pub name: String,
    /// Innermost filter (folder) the file was listed under.
    pub filter: Option<String>,
    /// Composite names of the configurations that exclude this file.
    pub excluded: Vec<String>,
    pub forced_include: bool,
    pub precompiled_header: bool,
    pub compile_as_c: bool,
}

impl File {
    pub fn is_excluded_from(&self, configuration: &str) -> bool {
        self.excluded.iter().any(|c| c == configuration)
    }

    /// Relative path with `/` separators and without a leading `./`.
    pub fn unix_path(&self) -> String {
        to_unix_path(&self.relative_path)
    }

    /// Extension without the dot, as written.
    pub fn extension(&self) -> Option<&str> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        (!stem.is_empty()).then_some(ext)
    }

    pub fn is_c_source(&self) -> bool {
        self.extension().is_some_and(|e| C_EXTENSIONS.contains(&e))
    }

    pub fn is_cpp_source(&self) -> bool {
        self.extension().is_some_and(|e| CPP_EXTENSIONS.contains(&e))
    }

    /// C or C++ translation unit.
    pub fn is_source(&self) -> bool {
        self.is_c_source() || self.is_cpp_source()
    }
}

/// `\` → `/`, leading `./` removed.
pub fn to_unix_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    match path.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

/// Final segment of a Windows or POSIX style path.
pub fn display_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Resolve a project-relative path (either separator style) against
/// `base`, folding `.` and `..` components lexically.
pub fn resolve_path(base: &Path, relative: &str) -> PathBuf {
    let relative = relative.trim().replace('\\', "/");
    let joined = if Path::new(&relative).is_absolute() {
        PathBuf::from(relative)
    } else {
        base.join(relative)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    resolved.push("..");
                }
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// Directory text with a trailing separator, `""` stays empty.
pub fn with_trailing_separator(dir: &str) -> String {
    if dir.is_empty() || dir.ends_with(['/', '\\']) {
        dir.to_string()
    } else {
        format!("{dir}{MAIN_SEPARATOR}")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Filter
// ═══════════════════════════════════════════════════════════════════════════════

/// A virtual folder of the project tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    /// The `Filter` attribute (`cpp;c;cc`), if any.
    pub extensions: Option<String>,
    pub files: Vec<FileId>,
    pub filters: Vec<Filter>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Number of files in this filter and all nested filters.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.filters.iter().map(Filter::file_count).sum::<usize>()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// One `(configuration, platform)` build variant, e.g. `Debug|Win32`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    /// Composite name, `"Debug|Win32"`.
    pub name: String,
    /// `"Debug"`
    pub configuration_name: String,
    /// `"Win32"`
    pub platform: String,
    pub output_directory: String,
    pub intermediate_directory: String,
    pub configuration_type: ConfigurationType,
    pub character_set: CharacterSet,
    pub tools: ToolMap,
    /// Resolved paths of inherited property sheets, in application order.
    pub property_sheets: Vec<PathBuf>,
    /// Every attribute of the configuration node, macro-expanded.
    pub attributes: IndexMap<String, String>,
    /// Files built by this configuration. Derived by the linker.
    pub files: Vec<FileId>,
}

impl Configuration {
    /// Create an empty configuration from its composite name.
    pub fn new(name: &str) -> Self {
        let (configuration_name, platform) = split_configuration_name(name);
        Self {
            name: name.to_string(),
            configuration_name: configuration_name.to_string(),
            platform: platform.to_string(),
            ..Default::default()
        }
    }

    /// `"DebugWin32"`: the composite name usable as a make target.
    pub fn rule_name(&self) -> String {
        let raw = format!("{}{}", self.configuration_name, self.platform);
        raw.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect()
    }

    pub fn tool(&self, tool: &str) -> Option<&ToolProperties> {
        self.tools.get(tool)
    }

    /// Raw string value of a tool property.
    pub fn tool_str(&self, tool: &str, name: &str) -> Option<&str> {
        self.tools.get(tool)?.get(name).map(String::as_str)
    }

    /// Decoded value of a tool property, typed through the property table.
    pub fn property(&self, tool: &str, name: &str) -> Option<PropertyValue<'_>> {
        let raw = self.tool_str(tool, name)?;
        Some(decode_property(property_kind(tool, name), raw))
    }

    /// List view of a property; a scalar becomes a one element list.
    pub fn tool_list(&self, tool: &str, name: &str) -> Vec<&str> {
        match self.property(tool, name) {
            Some(PropertyValue::List(items)) => items,
            Some(PropertyValue::Text(s)) if !s.trim().is_empty() => vec![s.trim()],
            _ => Vec::new(),
        }
    }

    pub fn tool_bool(&self, tool: &str, name: &str) -> Option<bool> {
        match self.property(tool, name)? {
            PropertyValue::Bool(b) => Some(b),
            PropertyValue::Text(s) => parse_bool(s),
            _ => None,
        }
    }

    pub fn tool_number(&self, tool: &str, name: &str) -> Option<i64> {
        match self.property(tool, name)? {
            PropertyValue::Number(n) => Some(n),
            PropertyValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Split `"Debug|Win32"` on the first `|`. A name without `|` has an
/// empty platform.
pub fn split_configuration_name(name: &str) -> (&str, &str) {
    name.split_once('|').unwrap_or((name, ""))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Project
// ═══════════════════════════════════════════════════════════════════════════════

/// A fully parsed project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub format: Format,
    pub name: String,
    pub guid: String,
    pub root_namespace: String,
    pub keyword: String,
    pub project_type: String,
    pub version: String,
    /// Path the project was loaded from, as given.
    pub path: PathBuf,
    pub absolute_path: PathBuf,
    /// Directory containing the project file.
    pub directory: PathBuf,
    pub platforms: Vec<String>,
    pub configurations: Vec<Configuration>,
    pub files: Vec<File>,
    pub filters: Vec<Filter>,
    /// Non-fatal problems found while parsing.
    pub warnings: Vec<String>,
}

impl Project {
    pub fn configuration(&self, name: &str) -> Option<&Configuration> {
        self.configurations.iter().find(|c| c.name == name)
    }

    pub fn file(&self, id: FileId) -> &File {
        &self.files[id.0]
    }

    /// Files built by `configuration`, in project order.
    pub fn files_of<'a>(
        &'a self,
        configuration: &'a Configuration,
    ) -> impl Iterator<Item = &'a File> + 'a {
        configuration.files.iter().map(move |id| self.file(*id))
    }

    /// Distinct configuration names (`Debug`, `Release`) in first-seen order.
    pub fn configuration_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for c in &self.configurations {
            if !names.contains(&c.configuration_name.as_str()) {
                names.push(&c.configuration_name);
            }
        }
        names
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
