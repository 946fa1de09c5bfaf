use std::fs;

use vcproj_rs::ProjectBuilder;
use vcproj_rs::app::{Invocation, run};
use vcproj_rs::dump::{DumpField, DumpRequest, DumpTarget};

const HELLO: &str = r#"<?xml version="1.0" encoding="Windows-1252"?>
<VisualStudioProject ProjectType="Visual C++" Version="9.00" Name="hello">
	<Configurations>
		<Configuration Name="Debug|Win32" OutputDirectory="$(SolutionDir)bin" IntermediateDirectory="$(ConfigurationName)" ConfigurationType="1">
			<Tool Name="VCCLCompilerTool" PreprocessorDefinitions="WIN32;_DEBUG;_CONSOLE" />
		</Configuration>
	</Configurations>
	<Files>
		<File RelativePath=".\hello.cpp" />
	</Files>
</VisualStudioProject>
"#;

const VSVARS: &str = "@SET VSINSTALLDIR=C:\\VS9\n@SET VCINSTALLDIR=C:\\VS9\\VC\n";

#[test]
fn writes_makefile_into_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("hello.vcproj");
    fs::write(&input, HELLO).unwrap();
    let out_dir = dir.path().join("build");
    fs::create_dir(&out_dir).unwrap();

    let mut invocation = Invocation::new(&input);
    invocation.output_dir = out_dir.clone();
    invocation.builder = ProjectBuilder::new().macro_value("SolutionDir", "../");

    let mut stdout = Vec::new();
    run(&invocation, &mut stdout).unwrap();

    let makefile = fs::read_to_string(out_dir.join("Makefile")).unwrap();
    assert!(makefile.contains("DebugWin32Build:CURRENT_OUTDIR := ../bin\n"));
    assert!(makefile.contains("DebugWin32_SRCS := \\\n hello.cpp\n"));
    assert!(String::from_utf8(stdout).unwrap().starts_with("Output: "));
}

#[test]
fn dumps_defines_for_a_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("hello.vcproj");
    fs::write(&input, HELLO).unwrap();
    let script = dir.path().join("vsvars32.bat");
    fs::write(&script, VSVARS).unwrap();

    let mut invocation = Invocation::new(&input);
    invocation.output_dir = dir.path().to_path_buf();
    invocation.builder = ProjectBuilder::new().vsvars_file(&script).unwrap();
    invocation.dump = Some(
        DumpRequest::new(DumpTarget::Configuration("Debug|Win32".into()))
            .field(DumpField::Defines, "$(CPPFLAGS) ="),
    );

    let mut stdout = Vec::new();
    run(&invocation, &mut stdout).unwrap();
    assert_eq!(
        String::from_utf8(stdout).unwrap(),
        "$(CPPFLAGS) =-DWIN32 -D_DEBUG -D_CONSOLE\n"
    );
    assert!(!dir.path().join("Makefile").exists());
}

#[test]
fn unknown_configuration_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("hello.vcproj");
    fs::write(&input, HELLO).unwrap();

    let mut invocation = Invocation::new(&input);
    invocation.output_dir = dir.path().to_path_buf();
    invocation.dump = Some(
        DumpRequest::new(DumpTarget::Configuration("Release|Win32".into()))
            .field(DumpField::Sources, ""),
    );

    let err = run(&invocation, &mut Vec::new()).unwrap_err();
    assert_eq!(err.to_string(), "Configuration 'Release|Win32' not found");
}
