//! Read Visual Studio C/C++ project files (`.vcproj`, `.vcxproj`) into a
//! normalized model of configurations, tools and files, and render that
//! model as a GNU Makefile.
//!
//! ```no_run
//! use vcproj_rs::{Makefile, Project};
//!
//! let project = Project::from_file("demo.vcproj")?;
//! for config in &project.configurations {
//!     println!("{}: {} files", config.name, config.files.len());
//! }
//! Makefile::new(&project).write_to_dir(".")?;
//! # Ok::<(), vcproj_rs::ProjectError>(())
//! ```

pub mod app;
pub mod condition;
pub mod dump;
pub mod error;
pub mod format;
pub mod macros;
pub mod makefile;
pub mod model;
pub mod project;
pub mod vcproj;
pub mod vcxproj;
pub mod vsvars;

pub use error::ProjectError;
pub use format::{Format, detect_format};
pub use macros::MacroMap;
pub use makefile::Makefile;
pub use model::{
    CharacterSet, Configuration, ConfigurationType, File, FileId, Filter, Project, PropertyValue,
};
pub use project::{Location, ProjectBuilder};
pub use vsvars::{parse_vsvars, parse_vsvars_file};
