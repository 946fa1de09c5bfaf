//! Visual Studio 2005/2008 `.vcproj` projects.
//!
//! The document is walked in the order Visual Studio itself evaluates it:
//! project attributes, platforms, then every configuration (each one
//! updating the shared [`MacroMap`] before its tools are read), and last
//! the `<Files>` tree, which is flattened and linked against the finished
//! configurations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use roxmltree::{Document, Node, NodeId};

use crate::error::ProjectError;
use crate::format::Format;
use crate::macros::MacroMap;
use crate::model::{
    CharacterSet, Configuration, ConfigurationType, File, FileId, Filter, Project, ToolMap,
    VC_CL_COMPILER_TOOL, display_name, resolve_path, split_list, with_trailing_separator,
};
use crate::project::{Location, read_text, seed_project_macros, strip_bom};

/// Root attributes that identify a project. At least one must be present.
const GLOBAL_PROPERTIES: &[&str] = &[
    "Name",
    "ProjectType",
    "Version",
    "ProjectGUID",
    "RootNamespace",
    "Keyword",
];

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    element_children(node).find(|c| c.tag_name().name() == tag)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tool Property Collector
// ═══════════════════════════════════════════════════════════════════════════════

/// Collect the `<Tool Name="…" Key="Value" …/>` children of `node` into
/// `tools`, macro-expanding every value.
///
/// Repeated tools merge; a repeated key keeps the value seen last.
pub fn collect_tool_properties(node: Node, macros: &MacroMap, tools: &mut ToolMap) {
    for tool in element_children(node).filter(|c| c.tag_name().name() == "Tool") {
        let Some(tool_name) = tool.attribute("Name") else {
            continue;
        };
        let properties = tools.entry(tool_name.to_string()).or_default();
        for attr in tool.attributes().filter(|a| a.name() != "Name") {
            properties.insert(attr.name().to_string(), macros.expand(attr.value()));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  File Tree Flattener
// ═══════════════════════════════════════════════════════════════════════════════

/// A node with `RelativePath` is a file.
fn is_file_node(node: &Node) -> bool {
    node.has_attribute("RelativePath")
}

/// A node with a `Name` but no `RelativePath` is a filter (folder).
fn is_filter_node(node: &Node) -> bool {
    !is_file_node(node) && node.has_attribute("Name")
}

/// Flatten the `<Files>` subtree into file nodes, depth-first in document
/// order. Nodes are classified by their attributes, not their tag names;
/// anything that is neither a file nor a filter is skipped together with
/// its children. Files are never descended into.
pub fn collect_file_nodes<'a, 'input>(files: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    fn walk<'a, 'input>(node: Node<'a, 'input>, out: &mut Vec<Node<'a, 'input>>) {
        for child in element_children(node) {
            if is_file_node(&child) {
                out.push(child);
            } else if is_filter_node(&child) {
                walk(child, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(files, &mut out);
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Property Sheet Resolver
// ═══════════════════════════════════════════════════════════════════════════════

/// Output and intermediate directory text of a configuration while it is
/// being built. Sheets may replace either; the final text is expanded
/// once all sheets are applied.
#[derive(Debug, Clone, Default)]
struct Directories {
    output: String,
    intermediate: String,
}

/// Apply every sheet listed in `sheets` (`a.vsprops;b.vsprops`) to
/// `config`, in list order. Entries are macro-expanded and resolved
/// against `base`.
///
/// Sheet values overwrite values the configuration already holds. A sheet
/// that cannot be read or parsed is skipped. Sheets listed by a sheet are
/// applied before that sheet's own directories and tools, so the listing
/// sheet wins. A sheet is never applied twice for the same configuration.
fn apply_property_sheets(
    sheets: &str,
    base: &Path,
    config: &mut Configuration,
    dirs: &mut Directories,
    macros: &mut MacroMap,
    visited: &mut Vec<PathBuf>,
) {
    for entry in split_list(sheets) {
        let path = resolve_path(base, &macros.expand(entry));
        if visited.contains(&path) {
            debug!(sheet:? = path; "Property sheet already applied");
            continue;
        }
        visited.push(path.clone());
        config.property_sheets.push(path.clone());

        let text = match read_text(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(sheet:? = path, error:% = e; "Skipping unreadable property sheet");
                continue;
            }
        };
        let doc = match Document::parse(strip_bom(&text)) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(sheet:? = path, error:% = e; "Skipping malformed property sheet");
                continue;
            }
        };
        let sheet = doc.root_element();

        if let Some(nested) = sheet.attribute("InheritedPropertySheets") {
            let sheet_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            apply_property_sheets(nested, &sheet_dir, config, dirs, macros, visited);
        }

        if let Some(output) = sheet.attribute("OutputDirectory") {
            dirs.output = output.to_string();
        }
        if let Some(intermediate) = sheet.attribute("IntermediateDirectory") {
            dirs.intermediate = intermediate.to_string();
        }

        for user_macro in element_children(sheet).filter(|c| c.tag_name().name() == "UserMacro") {
            if let Some(name) = user_macro.attribute("Name") {
                let value = macros.expand(user_macro.attribute("Value").unwrap_or_default());
                macros.set(name, value);
            }
        }

        collect_tool_properties(sheet, macros, &mut config.tools);
        debug!(sheet:? = path, configuration = config.name.as_str(); "Applied property sheet");
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Configuration Builder
// ═══════════════════════════════════════════════════════════════════════════════

fn set_output_macros(macros: &mut MacroMap, output: &str) {
    macros.set("OutDir", output);
    macros.set("TargetDir", with_trailing_separator(output));
}

/// Build one configuration from a `<Configuration>` node.
///
/// `macros` is updated as attributes are read, so later attributes, tools
/// and sheets see the configuration name, platform and directories.
pub fn build_configuration(node: Node, project_dir: &Path, macros: &mut MacroMap) -> Configuration {
    let mut config = Configuration::new(node.attribute("Name").unwrap_or_default());
    if node.has_attribute("Name") {
        macros.set("ConfigurationName", config.configuration_name.as_str());
        macros.set("PlatformName", config.platform.as_str());
        macros.set("Platform", config.platform.as_str());
    }

    let mut dirs = Directories::default();
    if let Some(output) = node.attribute("OutputDirectory") {
        dirs.output = macros.expand(output);
        set_output_macros(macros, &dirs.output);
    }
    if let Some(intermediate) = node.attribute("IntermediateDirectory") {
        dirs.intermediate = macros.expand(intermediate);
        macros.set("IntDir", dirs.intermediate.as_str());
    }

    let sheets = node.attribute("InheritedPropertySheets").unwrap_or_default();
    config.configuration_type =
        ConfigurationType::from_attribute(node.attribute("ConfigurationType").unwrap_or_default());
    config.character_set =
        CharacterSet::from_attribute(node.attribute("CharacterSet").unwrap_or_default());

    collect_tool_properties(node, macros, &mut config.tools);

    let mut visited = Vec::new();
    apply_property_sheets(sheets, project_dir, &mut config, &mut dirs, macros, &mut visited);

    config.output_directory = macros.expand(&dirs.output);
    config.intermediate_directory = macros.expand(&dirs.intermediate);
    set_output_macros(macros, &config.output_directory);
    macros.set("IntDir", config.intermediate_directory.as_str());

    config.attributes = node
        .attributes()
        .map(|a| (a.name().to_string(), macros.expand(a.value())))
        .collect();

    debug!(
        configuration = config.name.as_str(),
        output = config.output_directory.as_str(),
        tools = config.tools.len(),
        sheets = config.property_sheets.len();
        "Built configuration"
    );
    config
}

// ═══════════════════════════════════════════════════════════════════════════════
//  File / Configuration Linker
// ═══════════════════════════════════════════════════════════════════════════════

/// `ExcludedFromBuild` marks an exclusion unless it is explicitly off.
/// VS itself only writes the attribute when it is on, and older converters
/// treat mere presence as set; an explicit "false" is honoured here.
fn is_excluded_marker(value: &str) -> bool {
    let value = value.trim();
    !(value.eq_ignore_ascii_case("false") || value == "0")
}

/// `UsePrecompiledHeader` designates the header-creating source for any
/// value other than "none" (`0`) and "use" (`2`). Presence alone is not
/// enough, unlike converters that only check for the attribute.
fn is_create_precompiled_header(value: &str) -> bool {
    !matches!(value.trim(), "0" | "2")
}

/// Whether any configuration force-includes a fragment contained in
/// `relative_path`. Plain substring containment is used.
pub fn is_forced_include(relative_path: &str, configurations: &[Configuration]) -> bool {
    configurations.iter().any(|config| {
        config
            .tool_str(VC_CL_COMPILER_TOOL, "ForcedIncludeFiles")
            .is_some_and(|forced| split_list(forced).any(|f| relative_path.contains(f)))
    })
}

/// Build a [`File`] for every file node and attach its id to every
/// configuration that does not exclude it.
///
/// Returns the files in node order together with the node → id mapping
/// used to build the filter tree.
pub fn link_files(
    nodes: &[Node],
    project_dir: &Path,
    configurations: &mut [Configuration],
) -> (Vec<File>, HashMap<NodeId, FileId>) {
    let mut files = Vec::with_capacity(nodes.len());
    let mut ids = HashMap::with_capacity(nodes.len());

    for node in nodes {
        let Some(relative_path) = node.attribute("RelativePath") else {
            continue;
        };

        let mut file = File {
            relative_path: relative_path.to_string(),
            absolute_path: resolve_path(project_dir, relative_path),
            name: display_name(relative_path).to_string(),
            filter: node
                .parent_element()
                .filter(is_filter_node)
                .and_then(|p| p.attribute("Name"))
                .map(String::from),
            ..Default::default()
        };

        let mut targets = vec![true; configurations.len()];

        for file_config in element_children(*node)
            .filter(|c| c.tag_name().name() == "FileConfiguration")
        {
            let config_name = file_config.attribute("Name").unwrap_or_default();

            if file_config
                .attribute("ExcludedFromBuild")
                .is_some_and(is_excluded_marker)
            {
                if !file.is_excluded_from(config_name) {
                    file.excluded.push(config_name.to_string());
                }
                for (target, config) in targets.iter_mut().zip(configurations.iter()) {
                    if config.name == config_name {
                        *target = false;
                    }
                }
            }

            for tool in element_children(file_config).filter(|c| c.tag_name().name() == "Tool") {
                if tool
                    .attribute("UsePrecompiledHeader")
                    .is_some_and(is_create_precompiled_header)
                {
                    file.precompiled_header = true;
                }
                if let Some(compile_as) = tool.attribute("CompileAs") {
                    file.compile_as_c = compile_as.trim() == "1";
                }
            }
        }

        file.forced_include = is_forced_include(&file.relative_path, configurations);

        let id = FileId(files.len());
        for (included, config) in targets.iter().zip(configurations.iter_mut()) {
            if *included {
                config.files.push(id);
            }
        }
        ids.insert(node.id(), id);
        files.push(file);
    }

    debug!(files = files.len(); "Linked files to configurations");
    (files, ids)
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// Rebuild the folder hierarchy of the `<Files>` subtree.
pub fn collect_filters(files: Node, ids: &HashMap<NodeId, FileId>) -> Vec<Filter> {
    fn filter_from(node: Node, ids: &HashMap<NodeId, FileId>) -> Filter {
        let mut filter = Filter::new(node.attribute("Name").unwrap_or_default());
        filter.extensions = node.attribute("Filter").map(String::from);
        for child in element_children(node) {
            if is_file_node(&child) {
                filter.files.extend(ids.get(&child.id()).copied());
            } else if is_filter_node(&child) {
                filter.filters.push(filter_from(child, ids));
            }
        }
        filter
    }

    element_children(files)
        .filter(is_filter_node)
        .map(|node| filter_from(node, ids))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Project
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a `.vcproj` document. `macros` must be freshly initialised for
/// this parse.
pub(crate) fn parse(
    doc: &Document,
    location: &Location,
    macros: &mut MacroMap,
) -> Result<Project, ProjectError> {
    let root = doc.root_element();
    let mut project = location.new_project(Format::Vcproj);

    if !GLOBAL_PROPERTIES.iter().any(|p| root.has_attribute(*p)) {
        return Err(ProjectError::NoGlobalProperties { path: location.path.clone() });
    }
    let global = |name: &str| root.attribute(name).unwrap_or_default().to_string();
    project.name = global("Name");
    project.project_type = global("ProjectType");
    project.version = global("Version");
    project.guid = global("ProjectGUID");
    project.root_namespace = global("RootNamespace");
    project.keyword = global("Keyword");

    seed_project_macros(macros, location, &project.name, &project.root_namespace);

    if let Some(platforms) = child_element(root, "Platforms") {
        project.platforms = element_children(platforms)
            .filter_map(|p| p.attribute("Name"))
            .map(String::from)
            .collect();
    }

    if let Some(configurations) = child_element(root, "Configurations") {
        for node in element_children(configurations) {
            let config = build_configuration(node, &location.directory, macros);
            project.configurations.push(config);
        }
    }
    if project.configurations.is_empty() {
        return Err(ProjectError::NoConfigurations { path: location.path.clone() });
    }

    if let Some(files) = child_element(root, "Files") {
        let nodes = collect_file_nodes(files);
        let (linked, ids) = link_files(&nodes, &location.directory, &mut project.configurations);
        project.files = linked;
        project.filters = collect_filters(files, &ids);
    }

    Ok(project)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
