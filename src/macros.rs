//! Project build macros (`$(OutDir)`, `$(ProjectName)`, …).
//!
//! A [`MacroMap`] is created fresh for every parse with each token of a
//! fixed vocabulary set to the empty string, then filled in as the parser
//! discovers project and configuration attributes. Expansion only ever
//! replaces tokens present in the map; anything else is passed through.

use std::collections::HashMap;

use indexmap::IndexMap;

// ═══════════════════════════════════════════════════════════════════════════════
//  Vocabularies
// ═══════════════════════════════════════════════════════════════════════════════

/// Macros understood by Visual Studio 2008 (`.vcproj`) project files.
///
/// See "Macros for Build Commands and Properties" in the VS2008 docs.
pub const VCPROJ_MACROS: &[&str] = &[
    "$(ConfigurationName)",
    "$(DevEnvDir)",
    "$(FrameworkDir)",
    "$(FrameworkSDKDir)",
    "$(FrameworkVersion)",
    "$(FxCopDir)",
    "$(Inherit)",
    "$(InputDir)",
    "$(InputExt)",
    "$(InputFileName)",
    "$(InputName)",
    "$(InputPath)",
    "$(IntDir)",
    "$(NoInherit)",
    "$(OutDir)",
    "$(ParentName)",
    "$(PlatformName)",
    "$(Platform)",
    "$(ProjectDir)",
    "$(ProjectExt)",
    "$(ProjectFileName)",
    "$(ProjectName)",
    "$(ProjectPath)",
    "$(References)",
    "$(RemoteMachine)",
    "$(RootNameSpace)",
    "$(SafeInputName)",
    "$(SafeParentName)",
    "$(SafeRootNamespace)",
    "$(SolutionDir)",
    "$(SolutionExt)",
    "$(SolutionFileName)",
    "$(SolutionName)",
    "$(SolutionPath)",
    "$(StopEvaluating)",
    "$(TargetDir)",
    "$(TargetExt)",
    "$(TargetFileName)",
    "$(TargetName)",
    "$(TargetPath)",
    "$(VCInstallDir)",
    "$(VSInstallDir)",
    "$(WebDeployPath)",
    "$(WebDeployRoot)",
];

/// Macros understood by MSBuild based (`.vcxproj`) project files.
pub const VCXPROJ_MACROS: &[&str] = &[
    "$(Configuration)",
    "$(DevEnvDir)",
    "$(FrameworkDir)",
    "$(FrameworkSDKDir)",
    "$(FrameworkVersion)",
    "$(FxCopDir)",
    "$(InputDir)",
    "$(InputExt)",
    "$(InputFileName)",
    "$(InputName)",
    "$(InputPath)",
    "$(IntDir)",
    "$(OutDir)",
    "$(ParentName)",
    "$(Platform)",
    "$(ProjectDir)",
    "$(ProjectExt)",
    "$(ProjectFileName)",
    "$(ProjectName)",
    "$(ProjectPath)",
    "$(RemoteMachine)",
    "$(RootNameSpace)",
    "$(SafeInputName)",
    "$(SafeParentName)",
    "$(SafeRootNamespace)",
    "$(SolutionDir)",
    "$(SolutionExt)",
    "$(SolutionFileName)",
    "$(SolutionName)",
    "$(SolutionPath)",
    "$(TargetDir)",
    "$(TargetExt)",
    "$(TargetFileName)",
    "$(TargetName)",
    "$(TargetPath)",
    "$(VCInstallDir)",
    "$(VSInstallDir)",
    "$(WebDeployPath)",
    "$(WebDeployRoot)",
];

// ═══════════════════════════════════════════════════════════════════════════════
//  MacroMap
// ═══════════════════════════════════════════════════════════════════════════════

/// Current value of every known macro token for one parse.
///
/// Keys are full tokens (`"$(OutDir)"`). Insertion order is preserved so
/// that iteration over the map is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroMap {
    values: IndexMap<String, String>,
}

impl MacroMap {
    /// Create a map with every token of `vocabulary` set to `""`.
    pub fn new(vocabulary: &[&str]) -> Self {
        let values = vocabulary
            .iter()
            .map(|token| (token.to_string(), String::new()))
            .collect();
        Self { values }
    }

    /// Fresh map for a `.vcproj` parse.
    pub fn vcproj() -> Self {
        Self::new(VCPROJ_MACROS)
    }

    /// Fresh map for a `.vcxproj` parse.
    pub fn vcxproj() -> Self {
        Self::new(VCXPROJ_MACROS)
    }

    /// Normalize `name` to token form: `OutDir` and `$(OutDir)` both
    /// become `$(OutDir)`.
    pub fn token(name: &str) -> String {
        if name.starts_with("$(") && name.ends_with(')') {
            name.to_string()
        } else {
            format!("$({name})")
        }
    }

    /// Set the value of a macro. `token` may be given with or without the
    /// `$(…)` wrapper. Unknown tokens are added to the map.
    pub fn set(&mut self, token: &str, value: impl Into<String>) {
        self.values.insert(Self::token(token), value.into());
    }

    /// Current value of a macro, `None` if the token is not known.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.values.get(&Self::token(token)).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.values.contains_key(&Self::token(token))
    }

    /// All known tokens, in vocabulary order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Find the known token whose bare name equals `name` ignoring ASCII
    /// case (`VSINSTALLDIR` → `$(VSInstallDir)`).
    pub fn find_token_ignore_case(&self, name: &str) -> Option<&str> {
        self.tokens().find(|token| {
            token
                .strip_prefix("$(")
                .and_then(|t| t.strip_suffix(')'))
                .is_some_and(|bare| bare.eq_ignore_ascii_case(name))
        })
    }

    /// Expand every known macro token in `input`.
    ///
    /// The input is scanned once from left to right; substituted text is
    /// never scanned again, so a value that mentions its own token cannot
    /// loop. Tokens that are not in the map are left as written.
    pub fn expand(&self, input: &str) -> String {
        if !input.contains("$(") {
            return input.to_string();
        }

        let mut result = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("$(") {
            result.push_str(&rest[..start]);
            let candidate = &rest[start..];

            let Some(end) = candidate.find(')') else {
                result.push_str(candidate);
                rest = "";
                break;
            };

            match self.values.get(&candidate[..=end]) {
                Some(value) => {
                    result.push_str(value);
                    rest = &candidate[end + 1..];
                }
                None => {
                    // Not a known token; keep the '$' and rescan from the
                    // next character so nested tokens are still found.
                    result.push('$');
                    rest = &candidate[1..];
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// In-place form of [`expand`](Self::expand).
    pub fn expand_in_place(&self, input: &mut String) {
        if input.contains("$(") {
            *input = self.expand(input);
        }
    }

    /// Bare-name view (`"OutDir" → value`) used for MSBuild condition
    /// evaluation.
    pub fn to_vars(&self) -> HashMap<String, String> {
        self.values
            .iter()
            .map(|(token, value)| {
                let bare = token
                    .strip_prefix("$(")
                    .and_then(|t| t.strip_suffix(')'))
                    .unwrap_or(token);
                (bare.to_string(), value.clone())
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
