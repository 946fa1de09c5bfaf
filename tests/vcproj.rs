use std::fs;
use std::path::{MAIN_SEPARATOR, Path};

use pretty_assertions::assert_eq;

use vcproj_rs::dump::{self, DumpField, DumpRequest, DumpTarget};
use vcproj_rs::model::{VC_CL_COMPILER_TOOL, VC_LINKER_TOOL};
use vcproj_rs::{ConfigurationType, FileId, Format, Makefile, Project, ProjectBuilder, ProjectError};

const ENGINE: &str = r#"<?xml version="1.0" encoding="Windows-1252"?>
<VisualStudioProject
	ProjectType="Visual C++"
	Version="9.00"
	Name="Engine"
	RootNamespace="Engine"
	>
	<Platforms>
		<Platform Name="Win32" />
	</Platforms>
	<Configurations>
		<Configuration
			Name="Debug|Win32"
			OutputDirectory="$(SolutionDir)$(ConfigurationName)"
			IntermediateDirectory="$(ConfigurationName)"
			ConfigurationType="4"
			InheritedPropertySheets=".\props\common.vsprops"
			>
			<Tool Name="VCCLCompilerTool" PreprocessorDefinitions="LOCAL" AdditionalIncludeDirectories="include" />
		</Configuration>
		<Configuration
			Name="Release|Win32"
			OutputDirectory="out"
			IntermediateDirectory="obj\$(ConfigurationName)"
			ConfigurationType="1"
			>
			<Tool Name="VCLinkerTool" AdditionalDependencies="engine.lib" />
		</Configuration>
	</Configurations>
	<Files>
		<Filter Name="Source Files" Filter="cpp;c">
			<File RelativePath=".\src\engine.cpp" />
			<File RelativePath=".\src\debug_only.cpp">
				<FileConfiguration Name="Release|Win32" ExcludedFromBuild="true" />
			</File>
			<Filter Name="third_party">
				<File RelativePath="..\vendor\zlib.c" />
			</Filter>
		</Filter>
		<File RelativePath="readme.txt" />
	</Files>
</VisualStudioProject>
"#;

const COMMON_SHEET: &str = r#"<?xml version="1.0" encoding="Windows-1252"?>
<VisualStudioPropertySheet
	ProjectType="Visual C++"
	Version="8.00"
	Name="common"
	OutputDirectory="$(SolutionDir)sheet_out"
	InheritedPropertySheets="base.vsprops"
	>
	<UserMacro Name="EngineRoot" Value="$(ProjectDir)" />
	<Tool Name="VCCLCompilerTool" PreprocessorDefinitions="FROM_SHEET" />
	<Tool Name="VCLinkerTool" AdditionalLibraryDirectories="$(EngineRoot)lib" />
</VisualStudioPropertySheet>
"#;

const BASE_SHEET: &str = r#"<?xml version="1.0" encoding="Windows-1252"?>
<VisualStudioPropertySheet Name="base">
	<Tool Name="VCCLCompilerTool" PreprocessorDefinitions="FROM_BASE" WarningLevel="4" />
</VisualStudioPropertySheet>
"#;

fn write_engine(dir: &Path) -> std::path::PathBuf {
    let project_dir = dir.join("engine");
    fs::create_dir_all(project_dir.join("props")).unwrap();
    fs::write(project_dir.join("props").join("common.vsprops"), COMMON_SHEET).unwrap();
    fs::write(project_dir.join("props").join("base.vsprops"), BASE_SHEET).unwrap();
    let path = project_dir.join("Engine.vcproj");
    fs::write(&path, ENGINE).unwrap();
    path
}

fn parse_engine(dir: &Path) -> Project {
    let path = write_engine(dir);
    ProjectBuilder::new()
        .macro_value("SolutionDir", "../")
        .parse(path)
        .unwrap()
}

#[test]
fn reads_project_globals() {
    let dir = tempfile::tempdir().unwrap();
    let project = parse_engine(dir.path());

    assert_eq!(project.format, Format::Vcproj);
    assert_eq!(project.name, "Engine");
    assert_eq!(project.version, "9.00");
    assert_eq!(project.platforms, vec!["Win32"]);
    assert_eq!(project.directory, dir.path().join("engine"));
    assert!(project.warnings.is_empty());
}

#[test]
fn sheets_override_configuration_values() {
    let dir = tempfile::tempdir().unwrap();
    let project = parse_engine(dir.path());
    let debug = project.configuration("Debug|Win32").unwrap();

    assert_eq!(debug.tool_str(VC_CL_COMPILER_TOOL, "PreprocessorDefinitions"), Some("FROM_SHEET"));
    assert_eq!(debug.tool_number(VC_CL_COMPILER_TOOL, "WarningLevel"), Some(4));
    assert_eq!(debug.tool_str(VC_CL_COMPILER_TOOL, "AdditionalIncludeDirectories"), Some("include"));
    assert_eq!(debug.output_directory, "../sheet_out");
    assert_eq!(debug.intermediate_directory, "Debug");
    assert_eq!(debug.configuration_type, ConfigurationType::StaticLibrary);

    let props = dir.path().join("engine").join("props");
    assert_eq!(
        debug.property_sheets,
        vec![props.join("common.vsprops"), props.join("base.vsprops")]
    );
}

#[test]
fn listing_sheet_wins_over_nested_sheet() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("outer.vsprops"),
        r#"<VisualStudioPropertySheet Name="outer" OutputDirectory="outer_out" IntermediateDirectory="outer_obj" InheritedPropertySheets="inner.vsprops">
	<Tool Name="VCCLCompilerTool" WarningLevel="3" />
</VisualStudioPropertySheet>"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("inner.vsprops"),
        r#"<VisualStudioPropertySheet Name="inner" OutputDirectory="inner_out" IntermediateDirectory="inner_obj">
	<Tool Name="VCCLCompilerTool" WarningLevel="4" />
</VisualStudioPropertySheet>"#,
    )
    .unwrap();
    let path = dir.path().join("Layered.vcproj");
    fs::write(
        &path,
        r#"<VisualStudioProject ProjectType="Visual C++" Version="9.00" Name="Layered">
	<Configurations>
		<Configuration Name="Debug|Win32" OutputDirectory="own_out" InheritedPropertySheets="outer.vsprops" ConfigurationType="1" />
	</Configurations>
	<Files>
		<File RelativePath="main.cpp" />
	</Files>
</VisualStudioProject>"#,
    )
    .unwrap();

    let project = Project::from_file(&path).unwrap();
    let debug = project.configuration("Debug|Win32").unwrap();
    assert_eq!(debug.tool_number(VC_CL_COMPILER_TOOL, "WarningLevel"), Some(3));
    assert_eq!(debug.output_directory, "outer_out");
    assert_eq!(debug.intermediate_directory, "outer_obj");
}

#[test]
fn user_macros_from_sheets_expand() {
    let dir = tempfile::tempdir().unwrap();
    let project = parse_engine(dir.path());
    let debug = project.configuration("Debug|Win32").unwrap();

    let expected = format!("{}{MAIN_SEPARATOR}lib", dir.path().join("engine").display());
    assert_eq!(
        debug.tool_str(VC_LINKER_TOOL, "AdditionalLibraryDirectories"),
        Some(expected.as_str())
    );
}

#[test]
fn configurations_partition_files() {
    let dir = tempfile::tempdir().unwrap();
    let project = parse_engine(dir.path());

    let debug = project.configuration("Debug|Win32").unwrap();
    let release = project.configuration("Release|Win32").unwrap();
    assert_eq!(debug.files, vec![FileId(0), FileId(1), FileId(2), FileId(3)]);
    assert_eq!(release.files, vec![FileId(0), FileId(2), FileId(3)]);
    assert_eq!(release.intermediate_directory, r"obj\Release");

    let debug_only = &project.files[1];
    assert_eq!(debug_only.excluded, vec!["Release|Win32"]);

    for file in &project.files {
        let built = project
            .configurations
            .iter()
            .filter(|c| c.files.iter().any(|id| project.file(*id) == file))
            .count();
        assert_eq!(built + file.excluded.len(), project.configurations.len());
    }
}

#[test]
fn files_resolve_against_project_directory() {
    let dir = tempfile::tempdir().unwrap();
    let project = parse_engine(dir.path());

    let zlib = &project.files[2];
    assert_eq!(zlib.name, "zlib.c");
    assert_eq!(zlib.filter.as_deref(), Some("third_party"));
    assert_eq!(zlib.absolute_path, dir.path().join("vendor").join("zlib.c"));

    assert_eq!(project.filters.len(), 1);
    let sources = &project.filters[0];
    assert_eq!(sources.name, "Source Files");
    assert_eq!(sources.extensions.as_deref(), Some("cpp;c"));
    assert_eq!(sources.files, vec![FileId(0), FileId(1)]);
    assert_eq!(sources.filters[0].files, vec![FileId(2)]);
    assert_eq!(sources.file_count(), 3);
}

#[test]
fn makefile_for_engine() {
    let dir = tempfile::tempdir().unwrap();
    let project = parse_engine(dir.path());

    let written = Makefile::new(&project).write_to_dir(dir.path()).unwrap();
    let text = fs::read_to_string(written).unwrap();

    assert!(text.contains("PROJECT_NAME := Engine\n"));
    assert!(text.contains("all: Debug Release\n"));
    assert!(text.contains("ReleaseWin32_SRCS := \\\n src/engine.cpp \\\n ../vendor/zlib.c\n"));
    assert!(text.contains("DebugWin32Build:CURRENT_OUTDIR := ../sheet_out\n"));
    assert!(text.contains("DebugWin32Build:CURRENT_CPPFLAGS := -DFROM_SHEET\n"));
    assert!(text.contains("DebugWin32Build:CURRENT_TARGET := lib$(PROJECT_NAME).a\n"));
    assert!(text.contains("ReleaseWin32Build:CURRENT_LDFLAGS := -lengine\n"));
    assert!(text.contains("obj/Release/%.o : ../vendor/%.c\n"));
}

#[test]
fn dump_all_configurations() {
    let dir = tempfile::tempdir().unwrap();
    let project = parse_engine(dir.path());

    let request = DumpRequest::new(DumpTarget::All)
        .field(DumpField::Sources, "$(Configuration)=")
        .field(DumpField::Defines, "$(Name): ");
    let text = dump::render(&project, &request).unwrap();
    assert_eq!(
        text,
        "Engine: -DFROM_SHEET\n\
         Debug=src/engine.cpp\\\nsrc/debug_only.cpp\\\n../vendor/zlib.c\n\
         Engine: \n\
         Release=src/engine.cpp\\\n../vendor/zlib.c\n"
    );
}

#[test]
fn fatal_inputs() {
    let dir = tempfile::tempdir().unwrap();

    let missing = Project::from_file(dir.path().join("missing.vcproj"));
    assert!(matches!(missing, Err(ProjectError::NotFound { .. })));

    let empty = dir.path().join("empty.vcproj");
    fs::write(&empty, "").unwrap();
    assert!(matches!(Project::from_file(&empty), Err(ProjectError::Empty { .. })));

    let broken = dir.path().join("broken.vcproj");
    fs::write(&broken, "<VisualStudioProject Name=\"x\"").unwrap();
    assert!(matches!(Project::from_file(&broken), Err(ProjectError::Xml(_))));

    let solution = dir.path().join("demo.sln");
    fs::write(
        &solution,
        "\u{feff}\r\nMicrosoft Visual Studio Solution File, Format Version 10.00\r\n",
    )
    .unwrap();
    assert!(matches!(
        Project::from_file(&solution),
        Err(ProjectError::UnsupportedFormat { format: Format::Solution, .. })
    ));
}

#[test]
fn parsing_twice_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_engine(dir.path());
    let builder = ProjectBuilder::new().macro_value("SolutionDir", "../");
    assert_eq!(builder.parse(&path).unwrap(), builder.parse(&path).unwrap());
}
