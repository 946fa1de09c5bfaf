//! Project file format detection.

use std::fmt;

use roxmltree::Document;

const SOLUTION_HEADERS: &[&str] = &[
    "Microsoft Visual Studio Solution File, Format Version 10.00",
    "Microsoft Visual Studio Solution File, Format Version 11.00",
];

/// Kind of file handed to the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Unknown,
    /// Visual Studio 2005/2008 `.vcproj`
    Vcproj,
    /// MSBuild C++ project `.vcxproj`
    Vcxproj,
    /// `.sln`
    Solution,
    /// MSBuild C# project `.csproj`
    CSharp,
}

impl Format {
    pub fn is_supported(self) -> bool {
        matches!(self, Format::Vcproj | Format::Vcxproj)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Unknown => "unknown",
            Format::Vcproj => "vcproj",
            Format::Vcxproj => "vcxproj",
            Format::Solution => "solution",
            Format::CSharp => "csproj",
        };
        f.write_str(name)
    }
}

/// Whether `text` starts a Visual Studio 2008/2010 solution file.
pub fn is_solution(text: &str) -> bool {
    SOLUTION_HEADERS.iter().any(|header| text.contains(header))
}

/// Classify an already parsed XML document.
///
/// `<VisualStudioProject>` is a `.vcproj`. An MSBuild `<Project>` is
/// classified by the first `<Import Project="…">` naming either the C++
/// or the C# targets.
pub fn detect_document(doc: &Document) -> Format {
    let root = doc.root_element();
    match root.tag_name().name() {
        "VisualStudioProject" => Format::Vcproj,
        "Project" => root
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "Import")
            .filter_map(|n| n.attribute("Project"))
            .find_map(|target| {
                if target.contains("Microsoft.Cpp") {
                    Some(Format::Vcxproj)
                } else if target.contains("Microsoft.CSharp") {
                    Some(Format::CSharp)
                } else {
                    None
                }
            })
            .unwrap_or(Format::Unknown),
        _ => Format::Unknown,
    }
}

/// Classify raw file contents. Text that is neither a solution nor
/// well-formed XML is [`Format::Unknown`].
pub fn detect_format(text: &str) -> Format {
    if is_solution(text) {
        return Format::Solution;
    }
    match Document::parse(text.trim_start_matches('\u{feff}')) {
        Ok(doc) => detect_document(&doc),
        Err(_) => Format::Unknown,
    }
}
