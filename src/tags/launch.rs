//! `<launch>`: the root element.

use crate::error::Result;

use super::{AttrReader, Warnings};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchTag {
    /// Stored verbatim and warned on at start-up, never interpreted.
    pub deprecated: Option<String>,
}

impl LaunchTag {
    pub fn parse(attrs: &AttrReader<'_, '_>, warnings: &mut Warnings) -> Result<Self> {
        attrs.warn_unknown(&["deprecated"], warnings);
        Ok(LaunchTag { deprecated: attrs.get("deprecated")? })
    }
}
