//! `<env>`.

use crate::error::Result;

use super::{AttrReader, Warnings};

/// `{name, value}`, both required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvTag {
    pub name: String,
    pub value: String,
}

impl EnvTag {
    pub fn parse(attrs: &AttrReader<'_, '_>, warnings: &mut Warnings) -> Result<Self> {
        attrs.warn_unknown(&["name", "value", "if", "unless"], warnings);
        Ok(EnvTag { name: attrs.require("name")?, value: attrs.require("value")? })
    }
}
