//! `<group>`: identical parsing to `<launch>`, with an optional `ns`
//! and `clear_params` (which then requires `ns`). Acts as a scoped
//! block; its body is compiled the same way `<launch>`'s body is.

use crate::error::{LaunchError, Result};

use super::{AttrReader, Warnings};

#[derive(Debug, Clone, PartialEq)]
pub struct GroupTag {
    pub ns: Option<String>,
    pub clear_params: bool,
}

impl GroupTag {
    pub fn parse(attrs: &AttrReader<'_, '_>, warnings: &mut Warnings) -> Result<Self> {
        attrs.warn_unknown(&["ns", "clear_params", "if", "unless"], warnings);

        let ns = attrs.get("ns")?;
        let clear_params = attrs.get_bool("clear_params", false)?;
        if clear_params && ns.is_none() {
            return Err(LaunchError::parse(attrs.file(), "<group clear_params=\"true\"> requires 'ns'"));
        }
        Ok(GroupTag { ns, clear_params })
    }
}
