//! The `Scope` four-tuple (§3) carried down the launch tree.
//!
//! Value-typed, copy-on-write extension: a child scope is produced by
//! cloning the parent's maps and inserting on top, so a name bound in
//! a child never escapes to its parent (§8 "Scope containment").

use std::collections::BTreeMap;

/// Args, env, remappings and namespace carried down the launch tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope {
    args: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    remap: BTreeMap<String, String>,
    ns: String,
}

impl Scope {
    /// The empty root scope, with namespace `/`.
    #[must_use]
    pub fn root() -> Self {
        Scope { ns: String::from("/"), ..Scope::default() }
    }

    #[must_use]
    pub fn args(&self) -> &BTreeMap<String, String> {
        &self.args
    }

    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    #[must_use]
    pub fn remap(&self) -> &BTreeMap<String, String> {
        &self.remap
    }

    #[must_use]
    pub fn ns(&self) -> &str {
        &self.ns
    }

    pub fn get_arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }

    /// Binds `name` in place, for subsequent siblings in document order
    /// (§4.3 step 4: "enabled `arg` and `env` children extend the local
    /// scope in place").
    pub fn set_arg(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.args.insert(name.into(), value.into());
    }

    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.insert(name.into(), value.into());
    }

    pub fn add_remap(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.remap.insert(from.into(), to.into());
    }

    /// Resolve a channel name through any remapping in scope, returning
    /// the name unchanged if there is no remap for it.
    #[must_use]
    pub fn remap_channel<'a>(&'a self, name: &'a str) -> &'a str {
        self.remap.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Produces a child scope for a nested `<group>`/`<include>`, joining
    /// `child_ns` onto this scope's namespace per the §4.3/§8 rules: a
    /// leading `/` makes the namespace global (replaces the parent);
    /// otherwise it extends the parent with one separating `/`, with no
    /// doubled slashes in the result.
    #[must_use]
    pub fn push_namespace(&self, child_ns: Option<&str>) -> Scope {
        let mut child = self.clone();
        if let Some(ns) = child_ns {
            child.ns = join_namespace(&self.ns, ns);
        }
        child
    }

    /// A fresh scope for a recursively-included file: inherits args,
    /// env and remappings from the caller, but the caller supplies the
    /// new file's namespace explicitly (it is composed by the caller
    /// before recursing, per §4.3 step 5).
    #[must_use]
    pub fn child_for_include(&self, ns: String) -> Scope {
        Scope { ns, ..self.clone() }
    }

    /// Clone with `args` cleared, keeping `env`/`remap`/`ns`. An
    /// `<include>` without `pass_all_args` starts its child file with
    /// no inherited arg bindings — only the `<arg>` children the
    /// `<include>` element itself supplies.
    #[must_use]
    pub fn without_args(&self) -> Scope {
        let mut child = self.clone();
        child.args.clear();
        child
    }
}

/// Joins a parent namespace and a child `ns` attribute per §4.3/§8.
#[must_use]
pub fn join_namespace(parent: &str, child: &str) -> String {
    if let Some(stripped) = child.strip_prefix('/') {
        return normalize(&format!("/{stripped}"));
    }
    if parent.ends_with('/') {
        normalize(&format!("{parent}{child}"))
    } else {
        normalize(&format!("{parent}/{child}"))
    }
}

/// Collapses any run of `/` into a single `/`, preserving a single
/// leading `/`. Resolved names must never contain `//` (§4.3).
#[must_use]
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_slash = false;
    for c in path.chars() {
        if c == '/' {
            if last_was_slash {
                continue;
            }
            last_was_slash = true;
        } else {
            last_was_slash = false;
        }
        out.push(c);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Joins a namespace and a bare (no-slash) resolved name: `ns + "/" + name`.
#[must_use]
pub fn resolve_name(ns: &str, name: &str) -> String {
    join_namespace(ns, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_ns_replaces_parent() {
        assert_eq!(join_namespace("/foo/bar", "/baz"), "/baz");
    }

    #[test]
    fn relative_ns_extends_parent() {
        assert_eq!(join_namespace("/foo", "bar"), "/foo/bar");
        assert_eq!(join_namespace("/", "bar"), "/bar");
    }

    #[test]
    fn no_doubled_slashes() {
        assert_eq!(join_namespace("/foo/", "bar"), "/foo/bar");
        assert_eq!(normalize("/foo//bar///baz"), "/foo/bar/baz");
    }

    #[test]
    fn scope_containment() {
        let parent = Scope::root();
        let mut child = parent.clone();
        child.set_arg("x", "1");
        assert_eq!(child.get_arg("x"), Some("1"));
        assert_eq!(parent.get_arg("x"), None);
    }
}
