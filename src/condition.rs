//! MSBuild condition parser and evaluator.
//!
//! `.vcxproj` files gate property groups, item metadata and imports with
//! `Condition` attributes such as:
//!
//! - `'$(Configuration)|$(Platform)'=='Debug|Win32'`
//! - `'$(Configuration)'=='Release' and !Exists('$(SolutionDir)local.props')`
//! - `Exists('$(UserRootDir)\Microsoft.Cpp.$(Platform).user.props')`
//!
//! Uses [`chumsky`] for the grammar.
//!
//! ## Grammar (case-insensitive keywords)
//!
//! ```text
//! condition  = or
//! or         = and ('or' and)*
//! and        = unary ('and' unary)*
//! unary      = '!' unary | atom
//! atom       = comparison | function | '(' condition ')'
//! comparison = quoted ('==' | '!=') quoted
//! function   = ('Exists' | 'HasTrailingSlash') '(' quoted ')'
//! quoted     = "'" chars "'"
//! ```

use std::collections::HashMap;
use std::path::Path;

use chumsky::prelude::*;

use crate::error::ProjectError;
use crate::model::resolve_path;

// ═══════════════════════════════════════════════════════════════════════════════
//  AST
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `'lhs' == 'rhs'` / `'lhs' != 'rhs'`, compared ignoring ASCII case.
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    /// `Exists('path')` / `HasTrailingSlash('path')`.
    Call(Function, Operand),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// True when the path exists relative to the project directory.
    Exists,
    /// True when the text ends with `\` or `/`.
    HasTrailingSlash,
}

/// Text of one quoted operand, split into literal and `$(Property)` parts.
pub type Operand = Vec<Part>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Property(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Operand splitting
// ═══════════════════════════════════════════════════════════════════════════════

/// Split the raw text between quotes into [`Part`]s. An unterminated
/// `$(` is kept as text.
fn split_operand(s: &str) -> Operand {
    let mut parts = Vec::new();
    let mut rest = s;

    while let Some(start) = rest.find("$(") {
        let Some(len) = rest[start + 2..].find(')') else {
            break;
        };
        if start > 0 {
            parts.push(Part::Text(rest[..start].to_string()));
        }
        parts.push(Part::Property(rest[start + 2..start + 2 + len].to_string()));
        rest = &rest[start + 3 + len..];
    }

    if !rest.is_empty() {
        parts.push(Part::Text(rest.to_string()));
    }
    parts
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Chumsky parser
// ═══════════════════════════════════════════════════════════════════════════════

fn condition_parser<'a>() -> impl Parser<'a, &'a str, Condition, extra::Err<Simple<'a, char>>> {
    recursive(|condition| {
        let quoted = just('\'')
            .ignore_then(none_of('\'').repeated().to_slice())
            .then_ignore(just('\''))
            .map(split_operand);

        let op = just("==")
            .to(CompareOp::Equal)
            .or(just("!=").to(CompareOp::NotEqual));

        let comparison = quoted
            .padded()
            .then(op.padded())
            .then(quoted.padded())
            .map(|((lhs, op), rhs)| Condition::Compare { lhs, op, rhs });

        let word = any()
            .filter(|c: &char| c.is_ascii_alphabetic())
            .repeated()
            .at_least(1)
            .to_slice();

        let keyword = move |kw: &'static str| {
            word.filter(move |s: &&str| s.eq_ignore_ascii_case(kw)).padded()
        };

        let function = keyword("exists")
            .to(Function::Exists)
            .or(keyword("hastrailingslash").to(Function::HasTrailingSlash))
            .then(quoted.padded().delimited_by(just('('), just(')')))
            .map(|(function, arg)| Condition::Call(function, arg));

        let group = condition.delimited_by(just('(').padded(), just(')').padded());

        let atom = choice((comparison, function, group)).padded();

        let unary = recursive(|unary| {
            just('!')
                .padded()
                .ignore_then(unary)
                .map(|inner| Condition::Not(Box::new(inner)))
                .or(atom)
        });

        let and = unary.clone().foldl(
            keyword("and").ignore_then(unary).repeated(),
            |lhs, rhs| Condition::And(Box::new(lhs), Box::new(rhs)),
        );

        and.clone().foldl(
            keyword("or").ignore_then(and).repeated(),
            |lhs, rhs| Condition::Or(Box::new(lhs), Box::new(rhs)),
        )
    })
}

/// Parse a `Condition` attribute.
pub fn parse_condition(input: &str) -> Result<Condition, ProjectError> {
    condition_parser()
        .parse(input)
        .into_result()
        .map_err(|errs| ProjectError::Condition {
            condition: input.to_string(),
            message: errs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Evaluation
// ═══════════════════════════════════════════════════════════════════════════════

/// Property values visible to a condition, plus the directory `Exists`
/// resolves relative paths against.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub properties: &'a HashMap<String, String>,
    pub directory: &'a Path,
}

impl Scope<'_> {
    /// MSBuild property names are case-insensitive; unknown ones are `""`.
    fn property(&self, name: &str) -> &str {
        self.properties
            .get(name)
            .or_else(|| {
                self.properties
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map_or("", String::as_str)
    }

    fn expand(&self, operand: &[Part]) -> String {
        operand
            .iter()
            .map(|part| match part {
                Part::Text(s) => s.as_str(),
                Part::Property(name) => self.property(name),
            })
            .collect()
    }
}

pub fn evaluate(condition: &Condition, scope: &Scope) -> bool {
    match condition {
        Condition::Compare { lhs, op, rhs } => {
            let equal = scope.expand(lhs).eq_ignore_ascii_case(&scope.expand(rhs));
            match op {
                CompareOp::Equal => equal,
                CompareOp::NotEqual => !equal,
            }
        }
        Condition::Call(Function::Exists, arg) => {
            let path = scope.expand(arg);
            !path.trim().is_empty() && resolve_path(scope.directory, &path).exists()
        }
        Condition::Call(Function::HasTrailingSlash, arg) => {
            scope.expand(arg).ends_with(['\\', '/'])
        }
        Condition::Not(inner) => !evaluate(inner, scope),
        Condition::And(a, b) => evaluate(a, scope) && evaluate(b, scope),
        Condition::Or(a, b) => evaluate(a, scope) || evaluate(b, scope),
    }
}

/// Parse and evaluate an optional `Condition` attribute. A missing or
/// blank condition always holds.
pub fn holds(condition: Option<&str>, scope: &Scope) -> Result<bool, ProjectError> {
    match condition {
        Some(text) if !text.trim().is_empty() => Ok(evaluate(&parse_condition(text)?, scope)),
        _ => Ok(true),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
