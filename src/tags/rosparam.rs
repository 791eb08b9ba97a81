//! `<rosparam>` (§4.2, §3 `RosParamOp`).
//!
//! `load`'s source file (if any) is read eagerly here, at parse time,
//! while the arg/env scope that `subst_value` needs is still in hand;
//! the bootstrap step (F) only ever sees an already-resolved inline
//! body for `load`. `dump`'s `file` is an output target, read by
//! nobody — it is carried through unread since dumping is a documented
//! stub (§9 Open Question (c)).

use std::fs;
use std::path::PathBuf;

use crate::error::{LaunchError, Result};
use crate::substitution::{self, SubstitutionContext};

use super::{AttrReader, Warnings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosParamCommand {
    Load,
    Dump,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RosParamSource {
    Inline(String),
    File(PathBuf),
}

/// `{op, namespace, param name?, source, subst-value?}`. `namespace`
/// is filled in by the compiler from the enclosing scope, not parsed
/// off the tag itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RosParamTag {
    pub command: RosParamCommand,
    pub param: Option<String>,
    pub source: Option<RosParamSource>,
    pub subst_value: bool,
}

impl RosParamTag {
    pub fn parse(
        attrs: &AttrReader<'_, '_>,
        ctx: &SubstitutionContext<'_>,
        warnings: &mut Warnings,
    ) -> Result<Self> {
        attrs.warn_unknown(&["command", "param", "file", "subst_value", "ns", "if", "unless"], warnings);

        let command = match attrs.get("command")?.as_deref() {
            None | Some("load") => RosParamCommand::Load,
            Some("dump") => RosParamCommand::Dump,
            Some("delete") => RosParamCommand::Delete,
            Some(other) => {
                return Err(LaunchError::parse(
                    attrs.file(),
                    format!("<rosparam> has unknown command '{other}'"),
                ))
            }
        };

        let file = attrs.get("file")?;
        if command == RosParamCommand::Delete && file.is_some() {
            return Err(LaunchError::parse(attrs.file(), "<rosparam command=\"delete\"> forbids 'file'"));
        }

        let param = attrs.get("param")?;
        let subst_value = attrs.get_bool("subst_value", false)?;

        let source = match (command, file) {
            (RosParamCommand::Load, Some(path)) => {
                let raw_body = fs::read_to_string(&path)
                    .map_err(|e| LaunchError::io(format!("reading rosparam file '{path}'"), e))?;
                let body = if subst_value { substitution::resolve(&raw_body, ctx)? } else { raw_body };
                Some(RosParamSource::Inline(body))
            }
            (RosParamCommand::Load, None) => {
                let raw_body = attrs.node().text().unwrap_or("").to_string();
                let body = if subst_value { substitution::resolve(&raw_body, ctx)? } else { raw_body };
                Some(RosParamSource::Inline(body))
            }
            (RosParamCommand::Dump, Some(path)) => Some(RosParamSource::File(PathBuf::from(path))),
            (RosParamCommand::Dump, None) | (RosParamCommand::Delete, _) => None,
        };

        if command == RosParamCommand::Load {
            if let Some(RosParamSource::Inline(ref text)) = source {
                let root: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
                    LaunchError::parse(attrs.file(), format!("invalid inline YAML: {e}"))
                })?;
                if param.is_none() && !matches!(root, serde_yaml::Value::Mapping(_)) {
                    return Err(LaunchError::parse(
                        attrs.file(),
                        "<rosparam> with free-text YAML body requires 'param' unless the root is a mapping",
                    ));
                }
            }
        }

        Ok(RosParamTag { command, param, source, subst_value })
    }
}
