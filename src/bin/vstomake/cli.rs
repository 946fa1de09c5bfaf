//! vstomake command line interface

use std::path::PathBuf;

use clap::Parser;

use vcproj_rs::ProjectBuilder;
use vcproj_rs::app::Invocation;
use vcproj_rs::dump::{DumpField, DumpRequest, DumpTarget};

/// Convert a Visual Studio project file to a GNU Makefile.
///
/// Any file named "Makefile" in the output directory is overwritten.
///
/// Giving any of -i/-I/-L/-l/-D/-s/-c prints properties of the project
/// instead of writing a Makefile. Each takes an optional prefix
/// (`-D='$(CPPFLAGS) ='`) in which $(Name), $(Platform), $(Configuration),
/// $(IntDir) and $(OutDir) are replaced.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Project file (*.vcproj, *.vcxproj)
    pub input: PathBuf,

    /// Output directory
    #[arg(default_value = ".")]
    pub output_dir: PathBuf,

    /// Print forced include files
    #[arg(short = 'i', value_name = "PREFIX", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub forced_includes: Option<String>,

    /// Print external include directories
    #[arg(short = 'I', value_name = "PREFIX", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub include_dirs: Option<String>,

    /// Print library directories used by the linker
    #[arg(short = 'L', value_name = "PREFIX", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub library_dirs: Option<String>,

    /// Print libraries passed to the linker
    #[arg(short = 'l', value_name = "PREFIX", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub libraries: Option<String>,

    /// Print preprocessor definitions
    #[arg(short = 'D', value_name = "PREFIX", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub defines: Option<String>,

    /// Print C and C++ sources
    #[arg(short = 's', value_name = "PREFIX", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub sources: Option<String>,

    /// Print configuration names
    #[arg(short = 'c', value_name = "PREFIX", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub configurations: Option<String>,

    /// Print properties of every configuration
    #[arg(short = 'a', conflicts_with = "config")]
    pub all: bool,

    /// Configuration to print properties of, e.g. "Debug|Win32"
    #[arg(long, value_name = "NAME")]
    pub config: Option<String>,

    /// Pre-set a macro, e.g. --define SolutionDir=../
    #[arg(long = "define", value_name = "NAME=VALUE", value_parser = parse_define)]
    pub defines_macros: Vec<(String, String)>,

    /// Seed macros from a Visual Studio environment script (vsvars32.bat)
    #[arg(long, value_name = "FILE")]
    pub vsvars: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

impl Cli {
    fn dump_fields(&self) -> Vec<(DumpField, &str)> {
        [
            (DumpField::Configurations, &self.configurations),
            (DumpField::ForcedIncludes, &self.forced_includes),
            (DumpField::IncludeDirectories, &self.include_dirs),
            (DumpField::Libraries, &self.libraries),
            (DumpField::LibraryDirectories, &self.library_dirs),
            (DumpField::Defines, &self.defines),
            (DumpField::Sources, &self.sources),
        ]
        .into_iter()
        .filter_map(|(field, prefix)| prefix.as_deref().map(|p| (field, p)))
        .collect()
    }

    fn dump_request(&self) -> Result<Option<DumpRequest>, String> {
        let fields = self.dump_fields();
        if fields.is_empty() {
            return Ok(None);
        }

        let target = match (&self.config, self.all) {
            (_, true) => DumpTarget::All,
            (Some(name), false) => DumpTarget::Configuration(name.clone()),
            (None, false) if fields.iter().all(|(f, _)| *f == DumpField::Configurations) => {
                DumpTarget::All
            }
            (None, false) => {
                return Err("no configuration given; use --config <NAME> or -a".to_string());
            }
        };

        let request = fields
            .into_iter()
            .fold(DumpRequest::new(target), |request, (field, prefix)| {
                request.field(field, prefix)
            });
        Ok(Some(request))
    }

    /// Resolve the arguments into an [`Invocation`].
    pub fn invocation(&self) -> Result<Invocation, String> {
        let mut builder = ProjectBuilder::new().macros(self.defines_macros.iter().cloned());
        if let Some(path) = &self.vsvars {
            builder = builder.vsvars_file(path).map_err(|e| e.to_string())?;
        }

        Ok(Invocation {
            input: self.input.clone(),
            output_dir: self.output_dir.clone(),
            dump: self.dump_request()?,
            builder,
        })
    }
}
