//! `<arg>` (§4.2, §3 `ArgBinding`).

use crate::error::{LaunchError, Result};

use super::{AttrReader, Warnings};

/// `{name, value?, default?, doc?}`. Exactly one of `value`/`default`
/// may be set; both absent means the arg is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTag {
    pub name: String,
    pub value: Option<String>,
    pub default: Option<String>,
    pub doc: Option<String>,
}

impl ArgTag {
    pub fn parse(attrs: &AttrReader<'_, '_>, warnings: &mut Warnings) -> Result<Self> {
        attrs.warn_unknown(&["name", "value", "default", "doc", "if", "unless"], warnings);

        let name = attrs.require("name")?;
        let value = attrs.get("value")?;
        let default = attrs.get("default")?;
        let doc = attrs.get("doc")?;

        if value.is_some() && default.is_some() {
            return Err(LaunchError::parse(
                attrs.file(),
                format!("<arg name=\"{name}\"> cannot set both 'value' and 'default'"),
            ));
        }

        Ok(ArgTag { name, value, default, doc })
    }

    /// Is this arg required (neither `value` nor `default` given)?
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.value.is_none() && self.default.is_none()
    }
}
