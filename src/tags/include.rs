//! `<include>`.

use crate::error::{LaunchError, Result};

use super::{AttrReader, Warnings};

/// `file` required (resolved path must exist); `clear_params` requires
/// `ns`. `arg`/`env` children are parsed by the compiler, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeTag {
    pub file: String,
    pub ns: Option<String>,
    pub clear_params: bool,
    pub pass_all_args: bool,
}

impl IncludeTag {
    pub fn parse(attrs: &AttrReader<'_, '_>, warnings: &mut Warnings) -> Result<Self> {
        attrs.warn_unknown(&["file", "ns", "clear_params", "pass_all_args", "if", "unless"], warnings);

        let file = attrs.require("file")?;
        let ns = attrs.get("ns")?;
        let clear_params = attrs.get_bool("clear_params", false)?;
        let pass_all_args = attrs.get_bool("pass_all_args", false)?;

        if clear_params && ns.is_none() {
            return Err(LaunchError::parse(attrs.file(), "<include clear_params=\"true\"> requires 'ns'"));
        }

        Ok(IncludeTag { file, ns, clear_params, pass_all_args })
    }
}
