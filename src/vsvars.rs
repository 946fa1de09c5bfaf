//! Read Visual Studio environment scripts (`vsvars32.bat`, `vcvarsall.bat`).
//!
//! These batch files live in `Common7\Tools` / `VC` of a Visual Studio
//! installation and set variables like `VSINSTALLDIR`, `VCINSTALLDIR` or
//! `FrameworkDir` through `@SET KEY=VALUE` lines. Their values back the
//! `$(VSInstallDir)`, `$(VCInstallDir)`, `$(FrameworkDir)` … macros that
//! project files reference.

use std::path::Path;

use indexmap::IndexMap;

use crate::macros::MacroMap;

/// Ordered `NAME → value` map read from an environment script.
pub type VsVars = IndexMap<String, String>;

/// Look `name` up case-insensitively, as `cmd.exe` does.
fn lookup<'a>(vars: &'a VsVars, name: &str) -> Option<&'a str> {
    vars.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Expand `%VAR%` references against the variables read so far, falling
/// back to the process environment. Batch parameters (`%~dp0`, `%1`) and a
/// lone `%` are copied through untouched.
fn expand_percent_vars(s: &str, vars: &VsVars) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('%') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let is_parameter = after.starts_with(|c: char| c == '~' || c.is_ascii_digit());
        match after.find('%') {
            Some(end) if !is_parameter && end > 0 => {
                let name = &after[..end];
                if let Some(value) = lookup(vars, name) {
                    result.push_str(value);
                } else if let Ok(value) = std::env::var(name) {
                    result.push_str(&value);
                }
                rest = &after[end + 1..];
            }
            _ => {
                result.push('%');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Split one `SET` statement body into key and value. Accepts both
/// `KEY=VALUE` and the quoted `"KEY=VALUE"` form.
fn split_assignment(body: &str) -> Option<(&str, &str)> {
    let body = body.trim();
    let body = match body.strip_prefix('"') {
        Some(quoted) => quoted.strip_suffix('"').unwrap_or(quoted),
        None => body,
    };
    let (key, value) = body.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then_some((key, value))
}

/// Parse the contents of an environment script into a variable map.
///
/// Only `SET` statements are honoured (`@SET`, `set`, `@set "K=V"`);
/// `SET /A` and `SET /P` are skipped along with every other command.
/// Later assignments replace earlier ones, keeping the first position.
///
/// ```
/// let vars = vcproj_rs::vsvars::parse_vsvars(
///     "@SET VSINSTALLDIR=C:\\VS9\n@SET VCINSTALLDIR=%VSINSTALLDIR%\\VC\n",
/// );
/// assert_eq!(vars["VCINSTALLDIR"], "C:\\VS9\\VC");
/// ```
pub fn parse_vsvars(content: &str) -> VsVars {
    let mut vars = VsVars::new();

    for line in content.lines() {
        let trimmed = line.trim();
        let rest = trimmed.strip_prefix('@').unwrap_or(trimmed);

        let Some(keyword) = rest.get(..3) else {
            continue;
        };
        if !keyword.eq_ignore_ascii_case("set") {
            continue;
        }
        let body = &rest[3..];
        if !body.starts_with(char::is_whitespace) || body.trim_start().starts_with('/') {
            continue;
        }

        let Some((key, raw_value)) = split_assignment(body) else {
            continue;
        };

        let value = if raw_value.contains('%') {
            expand_percent_vars(raw_value, &vars)
        } else {
            raw_value.to_string()
        };

        let existing = vars.keys().find(|k| k.eq_ignore_ascii_case(key)).cloned();
        vars.insert(existing.unwrap_or_else(|| key.to_string()), value);
    }

    vars
}

/// Read and parse an environment script from disk.
pub fn parse_vsvars_file(path: impl AsRef<Path>) -> std::io::Result<VsVars> {
    let bytes = std::fs::read(path)?;
    Ok(parse_vsvars(&String::from_utf8_lossy(&bytes)))
}

/// Copy every variable whose name matches a known macro token (ignoring
/// case) into `macros`. Returns the number of macros set.
pub fn seed_macros<'a>(
    vars: impl IntoIterator<Item = (&'a String, &'a String)>,
    macros: &mut MacroMap,
) -> usize {
    let mut seeded = 0;
    for (name, value) in vars {
        if let Some(token) = macros.find_token_ignore_case(name).map(str::to_string) {
            macros.set(&token, value.as_str());
            seeded += 1;
        }
    }
    seeded
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const VSVARS32: &str = r#"@SET VSINSTALLDIR=C:\Program Files\Microsoft Visual Studio 9.0
@SET VCINSTALLDIR=C:\Program Files\Microsoft Visual Studio 9.0\VC
@SET FrameworkDir=C:\WINDOWS\Microsoft.NET\Framework
@SET FrameworkVersion=v2.0.50727
@if "%VSINSTALLDIR%"=="" goto error_no_VSINSTALLDIR
@echo Setting environment for using Microsoft Visual Studio 2008 x86 tools.
@set DevEnvDir=%VSINSTALLDIR%\Common7\IDE
@rem Root of Visual Studio IDE installed files.
@set "WindowsSdkDir=C:\Program Files\Microsoft SDKs\Windows\v6.0A\"
@set /a COUNT=1
"#;

    #[test]
    fn reads_set_lines() {
        let vars = parse_vsvars(VSVARS32);
        assert_eq!(vars["VSINSTALLDIR"], r"C:\Program Files\Microsoft Visual Studio 9.0");
        assert_eq!(vars["FrameworkVersion"], "v2.0.50727");
        assert_eq!(vars["WindowsSdkDir"], r"C:\Program Files\Microsoft SDKs\Windows\v6.0A\");
        assert!(!vars.contains_key("COUNT"));
        assert_eq!(vars.len(), 6);
    }

    #[test]
    fn expands_percent_references() {
        let vars = parse_vsvars(VSVARS32);
        assert_eq!(
            vars["DevEnvDir"],
            r"C:\Program Files\Microsoft Visual Studio 9.0\Common7\IDE"
        );
    }

    #[test]
    fn keeps_batch_parameters() {
        let vars = parse_vsvars("@set ROOT=%~dp0..\\\n@set PCT=100%\n");
        assert_eq!(vars["ROOT"], "%~dp0..\\");
        assert_eq!(vars["PCT"], "100%");
    }

    #[test]
    fn reassignment_is_case_insensitive() {
        let vars = parse_vsvars("set Foo=1\nSET FOO=2\n");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["Foo"], "2");
    }

    #[test]
    fn seeds_matching_macros_only() {
        let vars = parse_vsvars(VSVARS32);
        let mut macros = MacroMap::vcproj();
        let seeded = seed_macros(&vars, &mut macros);

        assert_eq!(seeded, 5);
        assert_eq!(
            macros.get("$(VSInstallDir)"),
            Some(r"C:\Program Files\Microsoft Visual Studio 9.0")
        );
        assert_eq!(macros.get("$(FrameworkDir)"), Some(r"C:\WINDOWS\Microsoft.NET\Framework"));
        assert!(!macros.contains("$(WindowsSdkDir)"));
    }
}
