//! What `vstomake` does once its arguments are parsed: load the project,
//! then either write a Makefile or dump properties.

use std::io::Write;
use std::path::PathBuf;

use log::{debug, warn};

use crate::dump::{self, DumpRequest};
use crate::error::ProjectError;
use crate::makefile::Makefile;
use crate::project::ProjectBuilder;

/// A fully resolved `vstomake` invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub input: PathBuf,
    /// Directory receiving the `Makefile`. Must exist.
    pub output_dir: PathBuf,
    /// Dump properties instead of writing a Makefile.
    pub dump: Option<DumpRequest>,
    pub builder: ProjectBuilder,
}

impl Invocation {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: PathBuf::from("."),
            dump: None,
            builder: ProjectBuilder::new(),
        }
    }
}

/// Run one invocation, writing user facing output to `out`.
pub fn run(invocation: &Invocation, out: &mut impl Write) -> Result<(), ProjectError> {
    let dir = &invocation.output_dir;
    if !dir.exists() {
        return Err(ProjectError::NotFound { path: dir.clone() });
    }
    if !dir.is_dir() {
        return Err(ProjectError::NotADirectory { path: dir.clone() });
    }

    let project = invocation.builder.parse(&invocation.input)?;
    for warning in &project.warnings {
        warn!(warning = warning.as_str(); "Project warning");
    }

    match &invocation.dump {
        Some(request) => {
            debug!(request:?; "Dumping properties");
            let text = dump::render(&project, request)?;
            out.write_all(text.as_bytes())?;
        }
        None => {
            let written = Makefile::new(&project).write_to_dir(dir)?;
            let written = std::path::absolute(&written).unwrap_or(written);
            writeln!(out, "Output: {}", written.display())?;
        }
    }
    out.flush()?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
