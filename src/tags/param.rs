//! `<param>` (§4.2, §3 `ParamEntry`).

use std::fs;
use std::process::Command;

use crate::error::{LaunchError, Result};

use super::{AttrReader, Warnings};

/// The typed value carried by a `ParamEntry`/`<param>`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Binary(Vec<u8>),
}

/// `{name, typed value}`. Exactly one of `value`/`textfile`/`binfile`/
/// `command` is present on the tag; by the time parsing finishes it has
/// been reduced to a single typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTag {
    pub name: String,
    pub value: ParamValue,
}

impl ParamTag {
    pub fn parse(attrs: &AttrReader<'_, '_>, warnings: &mut Warnings) -> Result<Self> {
        attrs.warn_unknown(
            &["name", "value", "textfile", "binfile", "command", "type", "if", "unless"],
            warnings,
        );

        let name = attrs.require("name")?;
        let value = attrs.get("value")?;
        let textfile = attrs.get("textfile")?;
        let binfile = attrs.get("binfile")?;
        let command = attrs.get("command")?;
        let type_attr = attrs.get("type")?;

        let sources = [value.is_some(), textfile.is_some(), binfile.is_some(), command.is_some()];
        let set_count = sources.iter().filter(|b| **b).count();
        if set_count != 1 {
            return Err(LaunchError::parse(
                attrs.file(),
                format!(
                    "<param name=\"{name}\"> must set exactly one of value/textfile/binfile/command, found {set_count}"
                ),
            ));
        }

        let typed = if let Some(raw) = binfile {
            let bytes = fs::read(&raw).map_err(|e| LaunchError::io(format!("reading binfile '{raw}'"), e))?;
            ParamValue::Binary(bytes)
        } else {
            let text = if let Some(raw) = value {
                raw
            } else if let Some(path) = textfile {
                fs::read_to_string(&path)
                    .map_err(|e| LaunchError::io(format!("reading textfile '{path}'"), e))?
            } else if let Some(cmd) = command {
                run_command(&cmd, attrs)?
            } else {
                unreachable!("exactly one source was validated above")
            };
            typed_from_text(&text, type_attr.as_deref(), &name, attrs)?
        };

        Ok(ParamTag { name, value: typed })
    }
}

fn run_command(cmd: &str, attrs: &AttrReader<'_, '_>) -> Result<String> {
    let words = shell_split(cmd);
    let (program, args) = words.split_first().ok_or_else(|| {
        LaunchError::parse(attrs.file(), "<param command=\"...\"> must not be empty")
    })?;
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| LaunchError::io(format!("running command '{cmd}'"), e))?;
    if !output.status.success() {
        return Err(LaunchError::parse(
            attrs.file(),
            format!("invalid command: '{cmd}' exited with {}", output.status),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Minimal POSIX-ish whitespace/quote splitting for `command` attribute
/// text. Also reused by the local/remote process handles to split
/// `launch-prefix` and node `args` (§4.7).
pub(crate) fn shell_split(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = ' ';
    let mut has_current = false;
    for c in s.chars() {
        if in_quotes {
            if c == quote_char {
                in_quotes = false;
            } else {
                current.push(c);
            }
        } else if c == '"' || c == '\'' {
            in_quotes = true;
            quote_char = c;
            has_current = true;
        } else if c.is_whitespace() {
            if has_current {
                words.push(std::mem::take(&mut current));
                has_current = false;
            }
        } else {
            current.push(c);
            has_current = true;
        }
    }
    if has_current {
        words.push(current);
    }
    words
}

fn typed_from_text(
    text: &str,
    type_attr: Option<&str>,
    name: &str,
    attrs: &AttrReader<'_, '_>,
) -> Result<ParamValue> {
    match type_attr.unwrap_or("string") {
        "string" => Ok(ParamValue::String(text.to_string())),
        "int" => text.trim().parse::<i64>().map(ParamValue::Int).map_err(|_| {
            LaunchError::parse(attrs.file(), format!("param '{name}' value '{text}' is not a valid int"))
        }),
        "double" => text.trim().parse::<f64>().map(ParamValue::Double).map_err(|_| {
            LaunchError::parse(attrs.file(), format!("param '{name}' value '{text}' is not a valid double"))
        }),
        "boolean" => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(ParamValue::Bool(true)),
            "false" | "0" => Ok(ParamValue::Bool(false)),
            _ => Err(LaunchError::parse(
                attrs.file(),
                format!("param '{name}' value '{text}' is not a valid boolean"),
            )),
        },
        other => Err(LaunchError::parse(attrs.file(), format!("param '{name}' has unknown type '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;
    use crate::substitution::anon::AnonRegistry;
    use crate::substitution::pkg_locator::PackageLocator;
    use crate::substitution::SubstitutionContext;
    use std::path::PathBuf;

    #[test]
    fn shell_split_handles_quotes() {
        assert_eq!(shell_split("echo \"a b\" c"), vec!["echo", "a b", "c"]);
    }

    fn with_attrs<R>(f: impl FnOnce(&AttrReader<'_, '_>) -> R) -> R {
        let doc = roxmltree::Document::parse("<param name=\"n\"/>").unwrap();
        let node = doc.root_element();
        let scope = Scope::root();
        let locator = PackageLocator::new(Vec::new());
        let anon = AnonRegistry::new();
        let ctx = SubstitutionContext { scope: &scope, locator: &locator, anon: &anon };
        let file = PathBuf::from("<test>");
        let attrs = AttrReader::new(node, &ctx, &file, "param");
        f(&attrs)
    }

    #[test]
    fn typed_from_text_parses_int_double_and_bool() {
        with_attrs(|attrs| {
            assert_eq!(typed_from_text("3", Some("int"), "n", attrs).unwrap(), ParamValue::Int(3));
            assert_eq!(typed_from_text("2.5", Some("double"), "n", attrs).unwrap(), ParamValue::Double(2.5));
            assert_eq!(typed_from_text("true", Some("boolean"), "n", attrs).unwrap(), ParamValue::Bool(true));
            assert_eq!(typed_from_text("0", Some("boolean"), "n", attrs).unwrap(), ParamValue::Bool(false));
            assert!(typed_from_text("not-a-number", Some("int"), "n", attrs).is_err());
        });
    }
}
