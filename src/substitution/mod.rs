//! Substitution evaluator (§4.1, component A).
//!
//! Expands `$(arg …)`, `$(env …)`, `$(optenv …)`, `$(find …)` and
//! `$(anon …)` inside any attribute value, iterating to a fixed point
//! since a replacement may itself contain further substitutions.

pub mod anon;
pub mod pkg_locator;

use std::env;

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{LaunchError, Result};
use crate::scope::Scope;

use self::anon::AnonRegistry;
use self::pkg_locator::PackageLocator;

fn command_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\(([a-zA-Z_][a-zA-Z0-9_]*)((?: +[^()]*)?)\)").unwrap())
}

/// Context needed to resolve a `$(...)` substitution: the current
/// scope, the package locator, and the process-global anon-id memo.
pub struct SubstitutionContext<'a> {
    pub scope: &'a Scope,
    pub locator: &'a PackageLocator,
    pub anon: &'a AnonRegistry,
}

/// Resolves every substitution in `text`, iterating to a fixed point
/// (§4.1: "Resolution is iterated until a fixed point is reached").
/// A guard against pathological inputs bounds the number of passes.
pub fn resolve(text: &str, ctx: &SubstitutionContext<'_>) -> Result<String> {
    let mut current = text.to_string();
    for _ in 0..64 {
        let (next, changed) = resolve_one_pass(&current, ctx)?;
        if !changed {
            return Ok(next);
        }
        current = next;
    }
    Err(LaunchError::Parse {
        file: std::path::PathBuf::new(),
        reason: format!("substitution did not converge: {text}"),
    })
}

/// Performs a single left-to-right pass over every `$(...)` occurrence.
fn resolve_one_pass(text: &str, ctx: &SubstitutionContext<'_>) -> Result<(String, bool)> {
    let re = command_pattern();
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    let mut changed = false;

    for caps in re.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        out.push_str(&text[last_end..whole.start()]);
        let cmd = caps.get(1).unwrap().as_str();
        let args = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        let replacement = evaluate(cmd, args, ctx)?;
        out.push_str(&replacement);
        last_end = whole.end();
        changed = true;
    }
    out.push_str(&text[last_end..]);
    Ok((out, changed))
}

fn split_words(args: &str) -> Vec<&str> {
    args.split_whitespace().collect()
}

fn evaluate(cmd: &str, args: &str, ctx: &SubstitutionContext<'_>) -> Result<String> {
    match cmd {
        "arg" => {
            let name = args.trim();
            ctx.scope.get_arg(name).map(ToString::to_string).ok_or_else(|| {
                LaunchError::Parse {
                    file: std::path::PathBuf::new(),
                    reason: format!("arg '{name}' is not defined"),
                }
            })
        }
        "env" => {
            let name = args.trim();
            env::var(name).map_err(|_| LaunchError::MissingResource(format!(
                "environment variable '{name}' is not set"
            )))
        }
        "optenv" => {
            let words = split_words(args);
            let (name, default_words) = words.split_first().ok_or_else(|| {
                LaunchError::Parse {
                    file: std::path::PathBuf::new(),
                    reason: "optenv requires a variable name".into(),
                }
            })?;
            match env::var(name) {
                Ok(value) => Ok(value),
                Err(_) => Ok(default_words.join(" ")),
            }
        }
        "find" => {
            let pkg = args.trim();
            ctx.locator.find(pkg).map(|p| p.to_string_lossy().into_owned())
        }
        "anon" => {
            let id = args.trim();
            Ok(ctx.anon.resolve(id))
        }
        other => Err(LaunchError::Parse {
            file: std::path::PathBuf::new(),
            reason: format!("unknown substitution command '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(scope: &'a Scope, locator: &'a PackageLocator, anon: &'a AnonRegistry) -> SubstitutionContext<'a> {
        SubstitutionContext { scope, locator, anon }
    }

    #[test]
    fn fixed_point_resolution() {
        let mut scope = Scope::root();
        scope.set_arg("a", "$(arg b)");
        scope.set_arg("b", "42");
        let locator = PackageLocator::new(Vec::new());
        let anon = AnonRegistry::new();
        let c = ctx(&scope, &locator, &anon);
        assert_eq!(resolve("$(arg a)", &c).unwrap(), "42");
    }

    #[test]
    fn optenv_uses_default_when_absent() {
        let scope = Scope::root();
        let locator = PackageLocator::new(Vec::new());
        let anon = AnonRegistry::new();
        let c = ctx(&scope, &locator, &anon);
        std::env::remove_var("ROSLAUNCH_TEST_OPTENV_XYZ");
        let out = resolve("$(optenv ROSLAUNCH_TEST_OPTENV_XYZ a b c)", &c).unwrap();
        assert_eq!(out, "a b c");
    }

    #[test]
    fn missing_arg_is_error() {
        let scope = Scope::root();
        let locator = PackageLocator::new(Vec::new());
        let anon = AnonRegistry::new();
        let c = ctx(&scope, &locator, &anon);
        assert!(resolve("$(arg missing)", &c).is_err());
    }

    #[test]
    fn anon_is_memoized() {
        let scope = Scope::root();
        let locator = PackageLocator::new(Vec::new());
        let anon = AnonRegistry::new();
        let c = ctx(&scope, &locator, &anon);
        let a = resolve("$(anon foo)", &c).unwrap();
        let b = resolve("$(anon foo)", &c).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn left_to_right_multiple_substitutions() {
        let mut scope = Scope::root();
        scope.set_arg("x", "1");
        scope.set_arg("y", "2");
        let locator = PackageLocator::new(Vec::new());
        let anon = AnonRegistry::new();
        let c = ctx(&scope, &locator, &anon);
        assert_eq!(resolve("$(arg x)-$(arg y)", &c).unwrap(), "1-2");
    }
}
