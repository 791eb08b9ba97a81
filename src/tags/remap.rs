//! `<remap>`.

use crate::error::{LaunchError, Result};

use super::{AttrReader, Warnings};

/// `{from, to}`, both required and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapTag {
    pub from: String,
    pub to: String,
}

impl RemapTag {
    pub fn parse(attrs: &AttrReader<'_, '_>, warnings: &mut Warnings) -> Result<Self> {
        attrs.warn_unknown(&["from", "to", "if", "unless"], warnings);
        let from = attrs.require("from")?;
        let to = attrs.require("to")?;
        if from.is_empty() || to.is_empty() {
            return Err(LaunchError::parse(
                attrs.file(),
                "<remap> requires non-empty 'from' and 'to' attributes",
            ));
        }
        Ok(RemapTag { from, to })
    }
}
