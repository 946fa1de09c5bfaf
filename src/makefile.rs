//! Render a parsed [`Project`] as a GNU Makefile.
//!
//! Every configuration gets its own family of rules named after the
//! composite configuration (`DebugWin32`, `DebugWin32Build`, ...). The
//! global flag variables pick up target-specific `CURRENT_*` values, so one
//! Makefile can hold every configuration side by side.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::ProjectError;
use crate::model::{
    Configuration, ConfigurationType, File, Project, VC_CL_COMPILER_TOOL, VC_LIBRARIAN_TOOL,
    VC_LINKER_TOOL, to_unix_path,
};

/// Object file extensions turned into `$(INTDIR)/%.o`.
const OBJECT_SOURCES: &[&str] = &["c", "cc", "cpp", "cxx"];

// ═══════════════════════════════════════════════════════════════════════════════
//  Flag helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// `AdditionalIncludeDirectories` of the compiler, `/` separated.
pub fn include_directories(config: &Configuration) -> Vec<String> {
    config
        .tool_list(VC_CL_COMPILER_TOOL, "AdditionalIncludeDirectories")
        .into_iter()
        .map(to_unix_path)
        .collect()
}

/// `ForcedIncludeFiles` of the compiler, `/` separated.
pub fn forced_includes(config: &Configuration) -> Vec<String> {
    config
        .tool_list(VC_CL_COMPILER_TOOL, "ForcedIncludeFiles")
        .into_iter()
        .map(to_unix_path)
        .collect()
}

pub fn defines(config: &Configuration) -> Vec<&str> {
    config.tool_list(VC_CL_COMPILER_TOOL, "PreprocessorDefinitions")
}

/// Linker (or librarian, for static libraries) library search paths.
pub fn library_directories(config: &Configuration) -> Vec<String> {
    config
        .tool_list(link_tool(config), "AdditionalLibraryDirectories")
        .into_iter()
        .map(to_unix_path)
        .collect()
}

/// `AdditionalDependencies` as bare library names: `ws2_32.lib` → `ws2_32`.
pub fn libraries(config: &Configuration) -> Vec<String> {
    config
        .tool_list(link_tool(config), "AdditionalDependencies")
        .into_iter()
        .map(|lib| {
            let name = to_unix_path(lib.trim_matches('"'));
            let cut = name.len().saturating_sub(4);
            match (name.get(..cut), name.get(cut..)) {
                (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".lib") => stem.to_string(),
                _ => name,
            }
        })
        .filter(|name| !name.is_empty())
        .collect()
}

fn link_tool(config: &Configuration) -> &'static str {
    match config.configuration_type {
        ConfigurationType::StaticLibrary => VC_LIBRARIAN_TOOL,
        _ => VC_LINKER_TOOL,
    }
}

/// Join `items`, each preceded by `flag`: `-I a -I b` style without the space.
pub(crate) fn flags<S: AsRef<str>>(flag: &str, items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("{flag}{}", item.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip characters make would choke on in a target name.
fn target_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Configuration directories come with trailing separators and Windows
/// slashes. Make wants neither.
fn make_dir(dir: &str) -> String {
    let dir = to_unix_path(dir);
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() { ".".to_string() } else { trimmed.to_string() }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Makefile
// ═══════════════════════════════════════════════════════════════════════════════

/// GNU Makefile view of a project. Rendered through [`fmt::Display`].
#[derive(Debug, Clone, Copy)]
pub struct Makefile<'p> {
    project: &'p Project,
}

impl<'p> Makefile<'p> {
    pub fn new(project: &'p Project) -> Self {
        Self { project }
    }

    pub fn project(&self) -> &'p Project {
        self.project
    }

    /// The rendered Makefile text.
    pub fn contents(&self) -> String {
        self.to_string()
    }

    /// Write `<dir>/Makefile`, replacing any existing file. Returns the path
    /// written.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ProjectError> {
        let path = dir.as_ref().join("Makefile");
        std::fs::write(&path, self.contents())?;
        info!(path:? = path, project = self.project.name.as_str(); "Makefile written");
        Ok(path)
    }

    fn rules(&self) -> Vec<ConfigurationRules<'p>> {
        self.project
            .configurations
            .iter()
            .map(|config| ConfigurationRules::new(self.project, config))
            .collect()
    }

    /// Configuration names (`Debug`) as make targets, sorted.
    fn general_rules(&self) -> BTreeSet<String> {
        self.project
            .configurations
            .iter()
            .map(|c| target_name(&c.configuration_name))
            .filter(|name| !name.is_empty())
            .collect()
    }

    fn write_globals(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let project_dir = to_unix_path(&self.project.directory.to_string_lossy());

        writeln!(f, "# Generated from {}", self.project.path.display())?;
        writeln!(f, "CFLAGS += $(CURRENT_CFLAGS)")?;
        writeln!(f, "CPPFLAGS += $(CURRENT_CPPFLAGS)")?;
        writeln!(
            f,
            "CXXFLAGS += --std=gnu++0x $(CURRENT_CXXFLAGS) -I{project_dir} -Wall -Wextra"
        )?;
        writeln!(f, "LDFLAGS += $(CURRENT_LDFLAGS)")?;
        writeln!(f, "ARFLAGS = -rcs $(CURRENT_ARFLAGS)")?;
        writeln!(f, "PROJECT_NAME := {}", self.project.name)?;
        writeln!(f, "OUTDIR = $(CURRENT_OUTDIR)")?;
        writeln!(f, "INTDIR = $(CURRENT_INTDIR)")?;
        writeln!(f, "TARGET = $(CURRENT_OUTDIR)/$(CURRENT_TARGET)")?;
        writeln!(f)
    }

    fn write_toplevel(
        &self,
        f: &mut fmt::Formatter<'_>,
        general: &BTreeSet<String>,
        rules: &[ConfigurationRules<'_>],
    ) -> fmt::Result {
        let specific: BTreeSet<&str> = rules.iter().map(|r| r.rule.as_str()).collect();

        writeln!(f, "default:")?;
        writeln!(f, "\t@echo \"Available build rules:\"")?;
        for name in general.iter().map(String::as_str).chain(specific.iter().copied()) {
            writeln!(f, "\t@echo \"  {name}\"")?;
        }
        writeln!(f, "\t@echo \"  all\"")?;
        writeln!(f, "\t@echo \"  clean\"")?;
        writeln!(f)?;

        let all: Vec<&str> = general.iter().map(String::as_str).collect();
        writeln!(f, ".PHONY: default all clean {}", all.join(" "))?;
        writeln!(f, "all: {}", all.join(" "))?;
        writeln!(f)?;

        writeln!(f, "clean:")?;
        for rule in rules {
            writeln!(f, "\t@rm -vf $({}_OBJS)", rule.rule)?;
        }
        writeln!(f)?;

        for name in general {
            let members: Vec<&str> = rules
                .iter()
                .filter(|r| target_name(&r.config.configuration_name) == *name)
                .map(|r| r.rule.as_str())
                .collect();
            writeln!(f, "{name}: {}", members.join(" "))?;
        }
        writeln!(f)
    }
}

impl fmt::Display for Makefile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules = self.rules();
        let general = self.general_rules();

        self.write_globals(f)?;
        self.write_toplevel(f, &general, &rules)?;
        for rule in &rules {
            rule.write(f)?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Per configuration rules
// ═══════════════════════════════════════════════════════════════════════════════

struct ConfigurationRules<'p> {
    config: &'p Configuration,
    rule: String,
    outdir: String,
    intdir: String,
    sources: Vec<&'p File>,
}

impl<'p> ConfigurationRules<'p> {
    fn new(project: &'p Project, config: &'p Configuration) -> Self {
        let sources: Vec<&File> = project.files_of(config).filter(|f| f.is_source()).collect();
        debug!(
            configuration = config.name.as_str(),
            sources = sources.len();
            "Rendering configuration rules"
        );
        Self {
            config,
            rule: config.rule_name(),
            outdir: make_dir(&config.output_directory),
            intdir: make_dir(&config.intermediate_directory),
            sources,
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#")?;
        writeln!(f, "# {}", self.config.name)?;
        writeln!(f, "#")?;
        self.write_sources(f)?;
        self.write_stats(f)?;
        self.write_objects(f)?;
        self.write_prebuild(f)?;
        self.write_build(f)?;

        let rule = &self.rule;
        writeln!(f, "{rule}: {rule}Prebuild {rule}Build")?;
        writeln!(f)?;
        writeln!(f, "clean.{rule}:")?;
        writeln!(f, "\t@rm -vf $({rule}_OBJS)")?;
        writeln!(f)
    }

    fn write_sources(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_SRCS :=", self.rule)?;
        for file in &self.sources {
            write!(f, " \\\n {}", file.unix_path())?;
        }
        writeln!(f)?;
        writeln!(f)
    }

    fn write_stats(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}Stats:", self.rule)?;
        writeln!(f, "\t@echo \"Configuration: {}\"", self.config.name)?;
        for var in ["CPPFLAGS", "CFLAGS", "CXXFLAGS", "ARFLAGS", "LDFLAGS", "INTDIR", "OUTDIR", "TARGET"] {
            writeln!(f, "\t@echo \"{var}: $({var})\"")?;
        }
        writeln!(f)
    }

    fn write_objects(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = &self.rule;
        let intdir = &self.intdir;

        writeln!(f, "{rule}_OBJS :=")?;
        for ext in OBJECT_SOURCES {
            writeln!(
                f,
                "{rule}_OBJS += $(patsubst %.{ext},{intdir}/%.o,$(notdir $(filter %.{ext},$({rule}_SRCS))))"
            )?;
        }
        writeln!(f)?;

        let mut patterns = BTreeSet::new();
        for file in self.sources.iter().filter(|f| !f.compile_as_c || f.is_c_source()) {
            let Some(ext) = file.extension() else {
                continue;
            };
            let path = file.unix_path();
            let dir = path.rsplit_once('/').map_or(".", |(dir, _)| dir);
            patterns.insert((dir.to_string(), ext.to_string()));
        }
        for (dir, ext) in &patterns {
            writeln!(f, "{intdir}/%.o : {dir}/%.{ext}")?;
            writeln!(f, "\t@echo $<")?;
            if ext == "c" {
                writeln!(f, "\t@$(CC) $(CPPFLAGS) $(CFLAGS) -c $< -o $(INTDIR)/$(notdir $@)")?;
            } else {
                writeln!(f, "\t@$(CXX) $(CPPFLAGS) $(CXXFLAGS) -c $< -o $(INTDIR)/$(notdir $@)")?;
            }
            writeln!(f)?;
        }

        // C++ extensions compiled as C need their own explicit rule.
        for file in self.sources.iter().filter(|f| f.compile_as_c && !f.is_c_source()) {
            let stem = file.name.rsplit_once('.').map_or(file.name.as_str(), |(s, _)| s);
            writeln!(f, "{intdir}/{stem}.o : {}", file.unix_path())?;
            writeln!(f, "\t@echo $<")?;
            writeln!(f, "\t@$(CC) -x c $(CPPFLAGS) $(CFLAGS) -c $< -o $(INTDIR)/$(notdir $@)")?;
            writeln!(f)?;
        }
        Ok(())
    }

    fn precompiled_source(&self) -> Option<&'p File> {
        self.sources.iter().copied().find(|f| f.precompiled_header)
    }

    fn write_prebuild(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = &self.rule;
        let pch = self.precompiled_source().map(|source| {
            let path = source.unix_path();
            let stem = path.rsplit_once('.').map_or(path.as_str(), |(s, _)| s);
            (path.clone(), format!("{stem}.h.gch"))
        });

        match &pch {
            Some((_, gch)) => writeln!(f, "{rule}Prebuild: {gch}")?,
            None => writeln!(f, "{rule}Prebuild:")?,
        }
        writeln!(f, "\tmkdir -p {}", self.intdir)?;
        writeln!(f, "\tmkdir -p {}", self.outdir)?;
        writeln!(f)?;

        if let Some((source, gch)) = pch {
            writeln!(f, "{gch}:")?;
            writeln!(f, "\t$(CXX) $(CPPFLAGS) $(CXXFLAGS) -c {source} -o {gch}")?;
            writeln!(f)?;
        }
        Ok(())
    }

    fn write_build(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = &self.rule;
        let build = format!("{rule}Build");
        let config = self.config;

        let includes = include_directories(config);
        let mut compile = flags("-include ", &forced_includes(config));
        let include_flags = flags("-I", &includes);
        if !include_flags.is_empty() {
            if !compile.is_empty() {
                compile.push(' ');
            }
            compile.push_str(&include_flags);
        }

        let mut link = flags("-L", &library_directories(config));
        let libs = flags("-l", &libraries(config));
        if !libs.is_empty() {
            if !link.is_empty() {
                link.push(' ');
            }
            link.push_str(&libs);
        }

        writeln!(f, "{build}:CURRENT_OUTDIR := {}", self.outdir)?;
        writeln!(f, "{build}:CURRENT_INTDIR := {}", self.intdir)?;
        writeln!(f, "{build}:CURRENT_CXXFLAGS := {compile}")?;
        writeln!(f, "{build}:CURRENT_CFLAGS := {include_flags}")?;
        writeln!(f, "{build}:CURRENT_CPPFLAGS := {}", flags("-D", &defines(config)))?;
        writeln!(f, "{build}:CURRENT_LDFLAGS := {link}")?;

        let recipe = match config.configuration_type {
            ConfigurationType::Application => Some((
                "$(PROJECT_NAME)",
                "$(CXX) $(CPPFLAGS) $(CXXFLAGS) $(OBJS) $(LDFLAGS) -o $(TARGET)",
            )),
            ConfigurationType::DynamicLibrary => Some((
                "lib$(PROJECT_NAME).so",
                "$(CXX) -shared $(CPPFLAGS) $(CXXFLAGS) $(OBJS) $(LDFLAGS) -o $(TARGET)",
            )),
            ConfigurationType::StaticLibrary => {
                Some(("lib$(PROJECT_NAME).a", "$(AR) $(ARFLAGS) $(TARGET) $(OBJS)"))
            }
            ConfigurationType::Utility | ConfigurationType::Unknown => None,
        };

        match recipe {
            Some((target, command)) => {
                writeln!(f, "{build}:CURRENT_TARGET := {target}")?;
                writeln!(f, "{build}:OBJS := $({rule}_OBJS)")?;
                writeln!(f, "{build}: {rule}Stats $({rule}_OBJS)")?;
                writeln!(f, "\t{command}")?;
            }
            None => writeln!(f, "{build}: {rule}Stats")?,
        }
        writeln!(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
