//! MSBuild based `.vcxproj` projects (Visual Studio 2010 and later).
//!
//! Every configuration is evaluated separately, walking the project in
//! document order the way MSBuild does: property groups, item definition
//! groups and imports whose `Condition` holds for that configuration are
//! applied in turn, each one seeing the properties set before it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use roxmltree::{Document, Node};

use crate::condition::{self, Scope};
use crate::error::ProjectError;
use crate::format::Format;
use crate::macros::MacroMap;
use crate::model::{
    CharacterSet, Configuration, ConfigurationType, File, FileId, Filter, Project,
    ToolProperties, VC_CL_COMPILER_TOOL, VC_CUSTOM_BUILD_TOOL, VC_LIBRARIAN_TOOL, VC_LINKER_TOOL,
    VC_MANIFEST_TOOL, VC_MIDL_TOOL, VC_POST_BUILD_EVENT_TOOL, VC_PRE_BUILD_EVENT_TOOL,
    VC_PRE_LINK_EVENT_TOOL, VC_RESOURCE_COMPILER_TOOL, display_name, resolve_path,
    split_configuration_name, with_trailing_separator,
};
use crate::project::{Location, read_text, seed_project_macros, strip_bom};
use crate::vcproj::is_forced_include;

/// `ItemDefinitionGroup` child element → tool interface name.
const TOOL_ELEMENTS: &[(&str, &str)] = &[
    ("ClCompile", VC_CL_COMPILER_TOOL),
    ("Link", VC_LINKER_TOOL),
    ("Lib", VC_LIBRARIAN_TOOL),
    ("ResourceCompile", VC_RESOURCE_COMPILER_TOOL),
    ("Midl", VC_MIDL_TOOL),
    ("PreBuildEvent", VC_PRE_BUILD_EVENT_TOOL),
    ("PreLinkEvent", VC_PRE_LINK_EVENT_TOOL),
    ("PostBuildEvent", VC_POST_BUILD_EVENT_TOOL),
    ("CustomBuildStep", VC_CUSTOM_BUILD_TOOL),
    ("Manifest", VC_MANIFEST_TOOL),
];

/// Item types that name project files.
const FILE_ITEMS: &[&str] = &[
    "ClCompile",
    "ClInclude",
    "ResourceCompile",
    "None",
    "Text",
    "CustomBuild",
    "Midl",
    "Image",
];

/// Globals that identify a project. At least one must be present.
const GLOBAL_PROPERTIES: &[&str] = &["ProjectGuid", "RootNamespace", "Keyword", "ProjectName"];

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn children_named<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    element_children(node).filter(move |c| c.tag_name().name() == tag)
}

/// Return the text content of the first child element with the given tag name.
fn find_child_text<'a>(parent: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    element_children(parent)
        .find(|c| c.tag_name().name() == tag)
        .map(|c| c.text().unwrap_or_default().trim())
}

fn tool_interface(element: &str) -> &str {
    TOOL_ELEMENTS
        .iter()
        .find(|(tag, _)| *tag == element)
        .map_or(element, |(_, tool)| *tool)
}

/// Replace `%(Name)` metadata references with the current value of that
/// metadata in `properties` (`""` when unset) and trim stray separators.
fn expand_metadata(value: &str, properties: &ToolProperties) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("%(") {
        let Some(len) = rest[start + 2..].find(')') else {
            break;
        };
        result.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        if let Some(previous) = properties.get(name) {
            result.push_str(previous);
        }
        rest = &rest[start + 3 + len..];
    }
    result.push_str(rest);
    result.trim_matches(';').to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Configuration evaluation
// ═══════════════════════════════════════════════════════════════════════════════

/// State of one configuration while its project is being evaluated.
struct Evaluation {
    config: Configuration,
    macros: MacroMap,
    visited: Vec<PathBuf>,
}

impl Evaluation {
    fn new(name: &str, configuration: &str, platform: &str, base: &MacroMap) -> Self {
        let mut config = Configuration::new(name);
        config.configuration_name = configuration.to_string();
        config.platform = platform.to_string();

        let mut macros = base.clone();
        macros.set("Configuration", configuration);
        macros.set("Platform", platform);

        let mut evaluation = Self { config, macros, visited: Vec::new() };

        // Microsoft.Cpp.Default.props defaults; the project may override.
        let (out_dir, int_dir) = if platform.eq_ignore_ascii_case("Win32") || platform.is_empty() {
            ("$(SolutionDir)$(Configuration)\\", "$(Configuration)\\")
        } else {
            ("$(SolutionDir)$(Platform)\\$(Configuration)\\", "$(Platform)\\$(Configuration)\\")
        };
        evaluation.set_property("OutDir", out_dir);
        evaluation.set_property("IntDir", int_dir);
        evaluation.config.attributes.clear();
        evaluation
    }

    fn holds(&self, condition: Option<&str>, directory: &Path) -> Result<bool, ProjectError> {
        let properties = self.macros.to_vars();
        condition::holds(condition, &Scope { properties: &properties, directory })
    }

    fn set_property(&mut self, name: &str, raw: &str) {
        let value = self.macros.expand(raw.trim());
        match name {
            "OutDir" => {
                self.config.output_directory = value.clone();
                self.macros.set("TargetDir", with_trailing_separator(&value));
            }
            "IntDir" => self.config.intermediate_directory = value.clone(),
            "ConfigurationType" => {
                self.config.configuration_type = ConfigurationType::from_msbuild(&value);
            }
            "CharacterSet" => self.config.character_set = CharacterSet::from_msbuild(&value),
            _ => {}
        }
        self.macros.set(name, value.as_str());
        self.config.attributes.insert(name.to_string(), value);
    }

    fn apply_tool(&mut self, node: Node, directory: &Path) -> Result<(), ProjectError> {
        let tool = tool_interface(node.tag_name().name());
        let is_event = matches!(
            tool,
            VC_PRE_BUILD_EVENT_TOOL | VC_PRE_LINK_EVENT_TOOL | VC_POST_BUILD_EVENT_TOOL
        );

        for setting in element_children(node) {
            if !self.holds(setting.attribute("Condition"), directory)? {
                continue;
            }
            let name = match setting.tag_name().name() {
                "Command" if is_event => "CommandLine",
                other => other,
            };
            let properties = self.config.tools.entry(tool.to_string()).or_default();
            let raw = expand_metadata(setting.text().unwrap_or_default().trim(), properties);
            let value = self.macros.expand(&raw);
            properties.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn import(&mut self, project: &str, directory: &Path) -> Result<(), ProjectError> {
        let path = resolve_path(directory, &self.macros.expand(project));
        if self.visited.contains(&path) {
            return Ok(());
        }
        self.visited.push(path.clone());

        let text = match read_text(&path) {
            Ok(text) => text,
            Err(e) => {
                debug!(sheet:? = path, error:% = e; "Skipping unreadable import");
                return Ok(());
            }
        };
        let doc = match Document::parse(strip_bom(&text)) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(sheet:? = path, error:% = e; "Skipping malformed import");
                return Ok(());
            }
        };

        self.config.property_sheets.push(path.clone());
        let sheet_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.evaluate(doc.root_element(), &sheet_dir)?;
        debug!(sheet:? = path, configuration = self.config.name.as_str(); "Applied property sheet");
        Ok(())
    }

    /// Apply every element below `root` whose condition holds, in document
    /// order. `directory` is the directory of the file `root` came from.
    fn evaluate(&mut self, root: Node, directory: &Path) -> Result<(), ProjectError> {
        for child in element_children(root) {
            if !self.holds(child.attribute("Condition"), directory)? {
                continue;
            }
            match child.tag_name().name() {
                "PropertyGroup" => {
                    for property in element_children(child) {
                        if self.holds(property.attribute("Condition"), directory)? {
                            let text = property.text().unwrap_or_default();
                            self.set_property(property.tag_name().name(), text);
                        }
                    }
                }
                "ItemDefinitionGroup" => {
                    for tool in element_children(child) {
                        if self.holds(tool.attribute("Condition"), directory)? {
                            self.apply_tool(tool, directory)?;
                        }
                    }
                }
                "ImportGroup" => {
                    for import in children_named(child, "Import") {
                        if self.holds(import.attribute("Condition"), directory)? {
                            if let Some(project) = import.attribute("Project") {
                                self.import(project, directory)?;
                            }
                        }
                    }
                }
                "Import" => {
                    if let Some(project) = child.attribute("Project") {
                        self.import(project, directory)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn finish(mut self) -> (Configuration, MacroMap) {
        let output = self.config.output_directory.clone();
        self.macros.set("OutDir", output.as_str());
        self.macros.set("TargetDir", with_trailing_separator(&output));
        debug!(
            configuration = self.config.name.as_str(),
            output = output.as_str(),
            tools = self.config.tools.len(),
            sheets = self.config.property_sheets.len();
            "Built configuration"
        );
        (self.config, self.macros)
    }
}

/// `ProjectConfiguration` items in document order as
/// `(composite name, configuration, platform)`.
fn project_configurations(root: Node) -> Vec<(String, String, String)> {
    children_named(root, "ItemGroup")
        .flat_map(|group| children_named(group, "ProjectConfiguration"))
        .map(|item| {
            let name = item.attribute("Include").unwrap_or_default();
            let (cfg, plat) = split_configuration_name(name);
            let configuration = find_child_text(item, "Configuration").unwrap_or(cfg);
            let platform = find_child_text(item, "Platform").unwrap_or(plat);
            (name.to_string(), configuration.to_string(), platform.to_string())
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Files
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluate a condition against one configuration's final properties.
fn holds_for(
    condition: Option<&str>,
    macros: &MacroMap,
    directory: &Path,
) -> Result<bool, ProjectError> {
    let properties = macros.to_vars();
    condition::holds(condition, &Scope { properties: &properties, directory })
}

fn is_true(text: Option<&str>) -> bool {
    text.is_some_and(|t| t.trim().eq_ignore_ascii_case("true"))
}

/// Build the project's files from `ItemGroup` items and attach each one to
/// every configuration that builds it.
fn link_files(
    root: Node,
    directory: &Path,
    configurations: &mut [Configuration],
    evaluated: &[MacroMap],
) -> Result<Vec<File>, ProjectError> {
    let mut files = Vec::new();

    for group in children_named(root, "ItemGroup") {
        for item in element_children(group).filter(|c| FILE_ITEMS.contains(&c.tag_name().name())) {
            let Some(include) = item.attribute("Include") else {
                continue;
            };

            // Group and item conditions limit which configurations see the
            // item at all; ExcludedFromBuild metadata removes it further.
            let mut targets = Vec::with_capacity(configurations.len());
            let mut excluded = Vec::new();
            for (config, macros) in configurations.iter().zip(evaluated) {
                let present = holds_for(group.attribute("Condition"), macros, directory)?
                    && holds_for(item.attribute("Condition"), macros, directory)?;
                let mut build = present;
                for metadata in children_named(item, "ExcludedFromBuild") {
                    if is_true(metadata.text())
                        && holds_for(metadata.attribute("Condition"), macros, directory)?
                    {
                        build = false;
                        if present && !excluded.contains(&config.name) {
                            excluded.push(config.name.clone());
                        }
                    }
                }
                if !present && !excluded.contains(&config.name) {
                    excluded.push(config.name.clone());
                }
                targets.push(build);
            }

            let precompiled_header = children_named(item, "PrecompiledHeader")
                .any(|m| m.text().is_some_and(|t| t.trim().eq_ignore_ascii_case("Create")));
            let compile_as_c = children_named(item, "CompileAs")
                .any(|m| m.text().is_some_and(|t| t.trim() == "CompileAsC"));

            for relative_path in include.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                let mut file = File {
                    relative_path: relative_path.to_string(),
                    absolute_path: resolve_path(directory, relative_path),
                    name: display_name(relative_path).to_string(),
                    excluded: excluded.clone(),
                    precompiled_header,
                    compile_as_c,
                    ..Default::default()
                };
                file.forced_include = is_forced_include(&file.relative_path, configurations);

                let id = FileId(files.len());
                for (build, config) in targets.iter().zip(configurations.iter_mut()) {
                    if *build {
                        config.files.push(id);
                    }
                }
                files.push(file);
            }
        }
    }

    debug!(files = files.len(); "Linked files to configurations");
    Ok(files)
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// Find or create the filter at a `Source Files\Sub` style path.
fn filter_at<'f>(filters: &'f mut Vec<Filter>, path: &str) -> &'f mut Filter {
    let (head, tail) = match path.split_once('\\') {
        Some((head, tail)) => (head, Some(tail)),
        None => (path, None),
    };
    let index = match filters.iter().position(|f| f.name == head) {
        Some(index) => index,
        None => {
            filters.push(Filter::new(head));
            filters.len() - 1
        }
    };
    let filter = &mut filters[index];
    match tail {
        Some(rest) if !rest.is_empty() => filter_at(&mut filter.filters, rest),
        _ => filter,
    }
}

/// Read the folder tree from the `.vcxproj.filters` file next to the
/// project and assign files to it. Missing or malformed files yield no
/// filters.
fn read_filters(location: &Location, files: &mut [File]) -> Vec<Filter> {
    let mut path = location.absolute_path.clone().into_os_string();
    path.push(".filters");
    let path = PathBuf::from(path);

    let Ok(text) = read_text(&path) else {
        return Vec::new();
    };
    let doc = match Document::parse(strip_bom(&text)) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path:? = path, error:% = e; "Skipping malformed filters file");
            return Vec::new();
        }
    };

    let mut filters = Vec::new();
    let by_path: HashMap<String, FileId> = files
        .iter()
        .enumerate()
        .map(|(i, f)| (f.relative_path.to_ascii_lowercase(), FileId(i)))
        .collect();

    for group in children_named(doc.root_element(), "ItemGroup") {
        for item in element_children(group) {
            let Some(include) = item.attribute("Include") else {
                continue;
            };
            if item.tag_name().name() == "Filter" {
                let filter = filter_at(&mut filters, include);
                filter.extensions = find_child_text(item, "Extensions").map(String::from);
                continue;
            }
            let (Some(folder), Some(id)) = (
                find_child_text(item, "Filter"),
                by_path.get(&include.to_ascii_lowercase()),
            ) else {
                continue;
            };
            filter_at(&mut filters, folder).files.push(*id);
            files[id.0].filter = folder.rsplit('\\').next().map(String::from);
        }
    }

    debug!(path:? = path, filters = filters.len(); "Read filters");
    filters
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Project
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a `.vcxproj` document.
pub(crate) fn parse(
    doc: &Document,
    location: &Location,
    macros: &mut MacroMap,
) -> Result<Project, ProjectError> {
    let root = doc.root_element();
    let mut project = location.new_project(Format::Vcxproj);
    project.version = root.attribute("ToolsVersion").unwrap_or_default().to_string();

    let globals: Vec<Node> = children_named(root, "PropertyGroup")
        .filter(|g| !g.has_attribute("Condition"))
        .collect();
    let global = |tag: &str| globals.iter().find_map(|g| find_child_text(*g, tag));

    if !GLOBAL_PROPERTIES.iter().any(|p| global(*p).is_some()) && project.version.is_empty() {
        return Err(ProjectError::NoGlobalProperties { path: location.path.clone() });
    }
    project.guid = global("ProjectGuid").unwrap_or_default().to_string();
    project.root_namespace = global("RootNamespace").unwrap_or_default().to_string();
    project.keyword = global("Keyword").unwrap_or_default().to_string();
    project.project_type = "Visual C++".to_string();
    project.name = global("ProjectName")
        .filter(|n| !n.is_empty())
        .unwrap_or(location.file_stem())
        .to_string();

    seed_project_macros(macros, location, &project.name, &project.root_namespace);

    let mut evaluated = Vec::new();
    for (name, configuration, platform) in project_configurations(root) {
        if !project.platforms.contains(&platform) {
            project.platforms.push(platform.clone());
        }
        let mut evaluation = Evaluation::new(&name, &configuration, &platform, macros);
        evaluation.evaluate(root, &location.directory)?;
        let (config, config_macros) = evaluation.finish();
        project.configurations.push(config);
        evaluated.push(config_macros);
    }
    if project.configurations.is_empty() {
        return Err(ProjectError::NoConfigurations { path: location.path.clone() });
    }

    project.files = link_files(root, &location.directory, &mut project.configurations, &evaluated)?;
    project.filters = read_filters(location, &mut project.files);
    Ok(project)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PROJECT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project DefaultTargets="Build" ToolsVersion="4.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <ItemGroup Label="ProjectConfigurations">
    <ProjectConfiguration Include="Debug|Win32">
      <Configuration>Debug</Configuration>
      <Platform>Win32</Platform>
    </ProjectConfiguration>
    <ProjectConfiguration Include="Release|x64">
      <Configuration>Release</Configuration>
      <Platform>x64</Platform>
    </ProjectConfiguration>
  </ItemGroup>
  <PropertyGroup Label="Globals">
    <ProjectGuid>{6B1F2A55-0000-4000-8000-000000000002}</ProjectGuid>
    <RootNamespace>Tool</RootNamespace>
    <Keyword>Win32Proj</Keyword>
  </PropertyGroup>
  <Import Project="$(VCTargetsPath)\Microsoft.Cpp.Default.props" />
  <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Debug|Win32'" Label="Configuration">
    <ConfigurationType>Application</ConfigurationType>
    <CharacterSet>Unicode</CharacterSet>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Release|x64'" Label="Configuration">
    <ConfigurationType>StaticLibrary</ConfigurationType>
    <CharacterSet>MultiByte</CharacterSet>
  </PropertyGroup>
  <PropertyGroup>
    <OutDir Condition="'$(Configuration)'=='Debug'">$(SolutionDir)bin\$(Configuration)\</OutDir>
  </PropertyGroup>
  <ItemDefinitionGroup>
    <ClCompile>
      <PreprocessorDefinitions>WIN32;%(PreprocessorDefinitions)</PreprocessorDefinitions>
    </ClCompile>
  </ItemDefinitionGroup>
  <ItemDefinitionGroup Condition="'$(Configuration)'=='Debug'">
    <ClCompile>
      <PreprocessorDefinitions>_DEBUG;%(PreprocessorDefinitions)</PreprocessorDefinitions>
      <ForcedIncludeFiles>pch.h</ForcedIncludeFiles>
    </ClCompile>
    <Link>
      <AdditionalDependencies>ws2_32.lib;%(AdditionalDependencies)</AdditionalDependencies>
      <OutputFile>$(OutDir)$(ProjectName).exe</OutputFile>
    </Link>
    <PostBuildEvent>
      <Command>echo done</Command>
    </PostBuildEvent>
  </ItemDefinitionGroup>
  <ItemGroup>
    <ClCompile Include="src\main.cpp" />
    <ClCompile Include="src\pch.cpp">
      <PrecompiledHeader Condition="'$(Configuration)|$(Platform)'=='Debug|Win32'">Create</PrecompiledHeader>
    </ClCompile>
    <ClCompile Include="src\legacy.c">
      <CompileAs>CompileAsC</CompileAs>
      <ExcludedFromBuild Condition="'$(Configuration)|$(Platform)'=='Release|x64'">true</ExcludedFromBuild>
    </ClCompile>
    <ClInclude Include="src\pch.h" />
    <Reference Include="System" />
  </ItemGroup>
  <ItemGroup Condition="'$(Platform)'=='x64'">
    <ClCompile Include="src\x64_only.cpp" />
  </ItemGroup>
  <Import Project="$(VCTargetsPath)\Microsoft.Cpp.targets" />
</Project>
"#;

    fn parse_at(dir: &Path) -> Project {
        let doc = Document::parse(PROJECT).unwrap();
        let location = Location::new(dir.join("Tool.vcxproj"));
        let mut macros = MacroMap::vcxproj();
        parse(&doc, &location, &mut macros).unwrap()
    }

    fn file<'p>(project: &'p Project, name: &str) -> &'p File {
        project.files.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn globals_and_configurations() {
        let project = parse_at(Path::new("/work/tool"));
        assert_eq!(project.name, "Tool");
        assert_eq!(project.guid, "{6B1F2A55-0000-4000-8000-000000000002}");
        assert_eq!(project.version, "4.0");
        assert_eq!(project.platforms, vec!["Win32", "x64"]);

        let names: Vec<&str> = project.configurations.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Debug|Win32", "Release|x64"]);

        let debug = &project.configurations[0];
        assert_eq!(debug.configuration_type, ConfigurationType::Application);
        assert_eq!(debug.character_set, CharacterSet::Unicode);
        assert_eq!(debug.output_directory, "bin\\Debug\\");
        assert_eq!(debug.intermediate_directory, "Debug\\");

        let release = &project.configurations[1];
        assert_eq!(release.configuration_type, ConfigurationType::StaticLibrary);
        assert_eq!(release.character_set, CharacterSet::Mbcs);
        assert_eq!(release.output_directory, "x64\\Release\\");
        assert_eq!(release.intermediate_directory, "x64\\Release\\");
    }

    #[test]
    fn item_definitions_accumulate() {
        let project = parse_at(Path::new("/work/tool"));
        let debug = &project.configurations[0];
        assert_eq!(
            debug.tool_list(VC_CL_COMPILER_TOOL, "PreprocessorDefinitions"),
            vec!["_DEBUG", "WIN32"]
        );
        assert_eq!(debug.tool_str(VC_LINKER_TOOL, "OutputFile"), Some("bin\\Debug\\Tool.exe"));
        assert_eq!(debug.tool_str(VC_LINKER_TOOL, "AdditionalDependencies"), Some("ws2_32.lib"));
        assert_eq!(debug.tool_str(VC_POST_BUILD_EVENT_TOOL, "CommandLine"), Some("echo done"));

        let release = &project.configurations[1];
        assert_eq!(release.tool_str(VC_CL_COMPILER_TOOL, "PreprocessorDefinitions"), Some("WIN32"));
        assert!(release.tool(VC_LINKER_TOOL).is_none());
    }

    #[test]
    fn files_and_exclusions() {
        let project = parse_at(Path::new("/work/tool"));
        let names: Vec<&str> = project.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["main.cpp", "pch.cpp", "legacy.c", "pch.h", "x64_only.cpp"]);

        let legacy = file(&project, "legacy.c");
        assert!(legacy.compile_as_c);
        assert_eq!(legacy.excluded, vec!["Release|x64"]);

        let x64 = file(&project, "x64_only.cpp");
        assert_eq!(x64.excluded, vec!["Debug|Win32"]);

        assert!(file(&project, "pch.cpp").precompiled_header);
        assert!(file(&project, "pch.h").forced_include);
        assert!(!file(&project, "main.cpp").forced_include);

        for config in &project.configurations {
            for (index, f) in project.files.iter().enumerate() {
                assert_eq!(config.files.contains(&FileId(index)), !f.is_excluded_from(&config.name));
            }
        }
    }

    #[test]
    fn overlapping_exclusions_list_configuration_once() {
        let source = PROJECT.replace(
            r#"<ExcludedFromBuild Condition="'$(Configuration)|$(Platform)'=='Release|x64'">true</ExcludedFromBuild>"#,
            r#"<ExcludedFromBuild Condition="'$(Configuration)'=='Release'">true</ExcludedFromBuild>
      <ExcludedFromBuild Condition="'$(Platform)'=='x64'">true</ExcludedFromBuild>"#,
        );
        let doc = Document::parse(&source).unwrap();
        let location = Location::new(Path::new("/work/tool").join("Tool.vcxproj"));
        let project = parse(&doc, &location, &mut MacroMap::vcxproj()).unwrap();

        let legacy = file(&project, "legacy.c");
        assert_eq!(legacy.excluded, vec!["Release|x64"]);
        assert!(!project.configurations[1].files.contains(&FileId(2)));
        assert!(project.configurations[0].files.contains(&FileId(2)));
    }

    #[test]
    fn property_sheets_are_imported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("common.props"),
            r#"<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup><IntDir>obj\$(Configuration)\</IntDir></PropertyGroup>
  <ItemDefinitionGroup><ClCompile><WarningLevel>Level4</WarningLevel></ClCompile></ItemDefinitionGroup>
</Project>"#,
        )
        .unwrap();
        let source = PROJECT.replace(
            r#"<Import Project="$(VCTargetsPath)\Microsoft.Cpp.Default.props" />"#,
            r#"<ImportGroup Label="PropertySheets">
    <Import Project="common.props" Condition="exists('common.props')" />
    <Import Project="missing.props" />
  </ImportGroup>"#,
        );
        let doc = Document::parse(&source).unwrap();
        let location = Location::new(dir.path().join("Tool.vcxproj"));
        let project = parse(&doc, &location, &mut MacroMap::vcxproj()).unwrap();

        let debug = &project.configurations[0];
        assert_eq!(debug.intermediate_directory, "obj\\Debug\\");
        assert_eq!(debug.tool_str(VC_CL_COMPILER_TOOL, "WarningLevel"), Some("Level4"));
        assert_eq!(debug.property_sheets, vec![dir.path().join("common.props")]);
    }

    #[test]
    fn filters_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Tool.vcxproj.filters"),
            r#"<Project ToolsVersion="4.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <ItemGroup>
    <Filter Include="Source Files"><Extensions>cpp;c</Extensions></Filter>
    <Filter Include="Source Files\Legacy" />
    <Filter Include="Header Files" />
  </ItemGroup>
  <ItemGroup>
    <ClCompile Include="src\main.cpp"><Filter>Source Files</Filter></ClCompile>
    <ClCompile Include="src\legacy.c"><Filter>Source Files\Legacy</Filter></ClCompile>
    <ClInclude Include="src\pch.h"><Filter>Header Files</Filter></ClInclude>
  </ItemGroup>
</Project>"#,
        )
        .unwrap();
        let project = parse_at(dir.path());

        let names: Vec<&str> = project.filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Source Files", "Header Files"]);
        let source = &project.filters[0];
        assert_eq!(source.extensions.as_deref(), Some("cpp;c"));
        assert_eq!(source.files, vec![FileId(0)]);
        assert_eq!(source.filters[0].name, "Legacy");
        assert_eq!(source.filters[0].files, vec![FileId(2)]);
        assert_eq!(file(&project, "legacy.c").filter.as_deref(), Some("Legacy"));
    }

    #[test]
    fn metadata_references() {
        let mut props = ToolProperties::new();
        assert_eq!(expand_metadata("A;%(PreprocessorDefinitions)", &props), "A");
        props.insert("PreprocessorDefinitions".into(), "B;C".into());
        assert_eq!(expand_metadata("A;%(PreprocessorDefinitions)", &props), "A;B;C");
        assert_eq!(expand_metadata("%(Other);A", &props), "A");
    }

    #[test]
    fn missing_globals_is_fatal() {
        let doc = Document::parse("<Project><ItemGroup/></Project>").unwrap();
        let err = parse(&doc, &Location::new("x.vcxproj"), &mut MacroMap::vcxproj()).unwrap_err();
        assert!(matches!(err, ProjectError::NoGlobalProperties { .. }));
    }

    #[test]
    fn missing_configurations_is_fatal() {
        let doc = Document::parse(r#"<Project ToolsVersion="4.0"><ItemGroup/></Project>"#).unwrap();
        let err = parse(&doc, &Location::new("x.vcxproj"), &mut MacroMap::vcxproj()).unwrap_err();
        assert!(matches!(err, ProjectError::NoConfigurations { .. }));
    }
}
