//! Tag model (§4.2, component B).
//!
//! One typed record per recognized XML element. Each tag enforces its
//! own fixed attribute schema; unknown attributes are warnings, not
//! failures, and the `if`/`unless` gating attributes are handled
//! uniformly here so every tag-specific parser gets them for free.

pub mod arg;
pub mod env;
pub mod group;
pub mod include;
pub mod launch;
pub mod machine;
pub mod node;
pub mod param;
pub mod remap;
pub mod rosparam;

use std::path::Path;

use roxmltree::Node;

use crate::error::{LaunchError, Result};
use crate::substitution::{self, SubstitutionContext};

pub use arg::ArgTag;
pub use env::EnvTag;
pub use group::GroupTag;
pub use include::IncludeTag;
pub use launch::LaunchTag;
pub use machine::MachineTag;
pub use node::{NodeTag, TestTag};
pub use param::ParamTag;
pub use remap::RemapTag;
pub use rosparam::RosParamTag;

/// A warning produced while parsing a tag: an unrecognized attribute,
/// tagged with the file and element it was found on (§4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagWarning {
    pub file: std::path::PathBuf,
    pub tag: String,
    pub message: String,
}

/// Sink that parsing passes collect warnings into, rather than
/// failing (§4.2: "unknown attributes cause a warning, not a failure").
#[derive(Debug, Default)]
pub struct Warnings(pub Vec<TagWarning>);

impl Warnings {
    pub fn push(&mut self, file: &Path, tag: &str, message: impl Into<String>) {
        self.0.push(TagWarning {
            file: file.to_path_buf(),
            tag: tag.to_string(),
            message: message.into(),
        });
    }
}

/// Parses the exact two-token Boolean text the grammar requires:
/// `true`/`false`, case-insensitively on input, with no other values
/// accepted (§4.2).
pub fn parse_bool_attr(value: &str, file: &Path, tag: &str, attr: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(LaunchError::parse(
            file,
            format!("attribute '{attr}' on <{tag}> must be 'true' or 'false', got '{value}'"),
        )),
    }
}

/// Evaluates the `if`/`unless` gating attributes on any element,
/// already substituted. Both present is a parse error; both absent
/// means enabled.
pub fn evaluate_gating(
    if_attr: Option<&str>,
    unless_attr: Option<&str>,
    file: &Path,
    tag: &str,
) -> Result<bool> {
    match (if_attr, unless_attr) {
        (Some(_), Some(_)) => Err(LaunchError::parse(
            file,
            format!("<{tag}> cannot have both 'if' and 'unless' attributes"),
        )),
        (Some(v), None) => parse_bool_attr(v, file, tag, "if"),
        (None, Some(v)) => Ok(!parse_bool_attr(v, file, tag, "unless")?),
        (None, None) => Ok(true),
    }
}

/// Collects the set of attribute names on `node` that are not in
/// `known`, emitting one warning per unrecognized attribute.
pub fn warn_unknown_attrs(
    node: Node<'_, '_>,
    known: &[&str],
    file: &Path,
    tag: &str,
    warnings: &mut Warnings,
) {
    for attr in node.attributes() {
        let name = attr.name();
        if !known.contains(&name) {
            warnings.push(file, tag, format!("unrecognized attribute '{name}'"));
        }
    }
}

/// Required string attribute lookup with a uniform error message.
pub fn require_attr<'a>(node: Node<'a, '_>, attr: &str, file: &Path, tag: &str) -> Result<&'a str> {
    node.attribute(attr).ok_or_else(|| {
        LaunchError::parse(file, format!("<{tag}> is missing required attribute '{attr}'"))
    })
}

/// Reads attributes off an element, applying substitution (§4.1) to
/// every value as it is read, since any attribute may contain
/// `$(...)` expressions.
pub struct AttrReader<'a, 'input> {
    node: Node<'a, 'input>,
    ctx: &'a SubstitutionContext<'a>,
    file: &'a Path,
    tag: &'a str,
}

impl<'a, 'input> AttrReader<'a, 'input> {
    pub fn new(
        node: Node<'a, 'input>,
        ctx: &'a SubstitutionContext<'a>,
        file: &'a Path,
        tag: &'a str,
    ) -> Self {
        AttrReader { node, ctx, file, tag }
    }

    pub fn node(&self) -> Node<'a, 'input> {
        self.node
    }

    pub fn file(&self) -> &Path {
        self.file
    }

    pub fn tag(&self) -> &str {
        self.tag
    }

    /// Raw, un-substituted attribute value (used for `name`/`if`/`unless`
    /// where substitution still applies, but callers sometimes need the
    /// literal text first, e.g. to decide gating before doing anything
    /// else).
    pub fn raw(&self, attr: &str) -> Option<&'a str> {
        self.node.attribute(attr)
    }

    pub fn get(&self, attr: &str) -> Result<Option<String>> {
        match self.node.attribute(attr) {
            Some(raw) => Ok(Some(substitution::resolve(raw, self.ctx)?)),
            None => Ok(None),
        }
    }

    pub fn require(&self, attr: &str) -> Result<String> {
        let raw = require_attr(self.node, attr, self.file, self.tag)?;
        substitution::resolve(raw, self.ctx)
    }

    pub fn get_bool(&self, attr: &str, default: bool) -> Result<bool> {
        match self.get(attr)? {
            Some(v) => parse_bool_attr(&v, self.file, self.tag, attr),
            None => Ok(default),
        }
    }

    pub fn warn_unknown(&self, known: &[&str], warnings: &mut Warnings) {
        warn_unknown_attrs(self.node, known, self.file, self.tag, warnings);
    }
}
