//! Launch-file compiler (§4.3, component C).
//!
//! Parses one file, recurses into `<include>` and `<group>`, maintains
//! scoped symbol tables, and detects include cycles.

pub mod tree;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node;

use crate::error::{LaunchError, Result};
use crate::scope::Scope;
use crate::substitution::anon::AnonRegistry;
use crate::substitution::pkg_locator::PackageLocator;
use crate::substitution::SubstitutionContext;
use crate::tags::{
    self, ArgTag, EnvTag, GroupTag, IncludeTag, LaunchTag, MachineTag, NodeTag, ParamTag,
    RemapTag, RosParamTag, TestTag, Warnings,
};

use self::tree::{Child, LaunchTree, ResolvedNode, ResolvedTest};

/// Drives compilation of a launch document (and everything it
/// transitively includes) into a [`LaunchTree`].
pub struct Compiler<'a> {
    pub locator: &'a PackageLocator,
    pub anon: &'a AnonRegistry,
    pub warnings: &'a mut Warnings,
    ancestors: Vec<PathBuf>,
}

impl<'a> Compiler<'a> {
    pub fn new(locator: &'a PackageLocator, anon: &'a AnonRegistry, warnings: &'a mut Warnings) -> Self {
        Compiler { locator, anon, warnings, ancestors: Vec::new() }
    }

    /// Compiles the top-level launch file named on the command line.
    /// `cli_args` are `name:=value` positional overrides, applied on
    /// top of the (empty) root scope before any `<arg>` inside the
    /// file is processed (§4.3 step 3).
    pub fn compile_root(&mut self, path: &Path, cli_args: &BTreeMap<String, String>) -> Result<LaunchTree> {
        let mut scope = Scope::root();
        for (name, value) in cli_args {
            scope.set_arg(name.clone(), value.clone());
        }
        let (tree, _declared) = self.compile_file(path, scope)?;
        Ok(tree)
    }

    /// Compiles one launch-file document, returning the tree and the
    /// set of `<arg>` names declared directly in it (used by the
    /// caller, if this was reached via `<include>`, to validate that
    /// every `<arg>` child it passed was actually consumed).
    fn compile_file(&mut self, path: &Path, scope: Scope) -> Result<(LaunchTree, HashSet<String>)> {
        let canonical = path.canonicalize().map_err(|e| {
            LaunchError::io(format!("reading launch file '{}'", path.display()), e)
        })?;

        if let Some(ancestor) = self.ancestors.iter().find(|a| **a == canonical) {
            return Err(LaunchError::Cycle { path: ancestor.display().to_string() });
        }

        let text = fs::read_to_string(&canonical)
            .map_err(|e| LaunchError::io(format!("reading launch file '{}'", path.display()), e))?;
        let doc = roxmltree::Document::parse(&text)
            .map_err(|e| LaunchError::parse(&canonical, format!("malformed XML: {e}")))?;

        let root_el = doc.root_element();
        if root_el.tag_name().name() != "launch" {
            return Err(LaunchError::parse(
                &canonical,
                format!("root element must be <launch>, found <{}>", root_el.tag_name().name()),
            ));
        }

        self.ancestors.push(canonical.clone());
        let result = self.compile_launch_body(root_el, &canonical, scope);
        self.ancestors.pop();
        result
    }

    fn compile_launch_body(
        &mut self,
        launch_el: Node<'_, '_>,
        file: &Path,
        mut scope: Scope,
    ) -> Result<(LaunchTree, HashSet<String>)> {
        let ctx = SubstitutionContext { scope: &scope, locator: self.locator, anon: self.anon };
        let attrs = tags::AttrReader::new(launch_el, &ctx, file, "launch");
        let launch_tag = LaunchTag::parse(&attrs, self.warnings)?;
        if let Some(deprecated) = &launch_tag.deprecated {
            self.warnings.push(file, "launch", format!("deprecated: {deprecated}"));
        }
        drop(attrs);

        let (children, declared_args) = self.compile_children(launch_el, file, &mut scope)?;

        Ok((
            LaunchTree {
                file: file.to_path_buf(),
                ns: scope.ns().to_string(),
                clear_params: false,
                deprecated: launch_tag.deprecated,
                children,
            },
            declared_args,
        ))
    }

    /// Iterates over element children in document order (§4.3 step 4),
    /// applying gating, folding `arg`/`env`/`remap` into `scope` in
    /// place, and recursing into `group`/`include`.
    fn compile_children(
        &mut self,
        parent_el: Node<'_, '_>,
        file: &Path,
        scope: &mut Scope,
    ) -> Result<(Vec<Child>, HashSet<String>)> {
        let mut children = Vec::new();
        let mut declared_args = HashSet::new();

        for el in parent_el.children().filter(Node::is_element) {
            let tag_name = el.tag_name().name().to_string();
            let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
            let attrs = tags::AttrReader::new(el, &ctx, file, &tag_name);
            let enabled = self.evaluate_gated(&attrs, file, &tag_name)?;
            drop(attrs);
            drop(ctx);

            if !enabled {
                continue;
            }

            match tag_name.as_str() {
                "arg" => {
                    let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
                    let attrs = tags::AttrReader::new(el, &ctx, file, "arg");
                    let arg = ArgTag::parse(&attrs, self.warnings)?;
                    declared_args.insert(arg.name.clone());
                    self.apply_arg(scope, &arg, file)?;
                }
                "env" => {
                    let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
                    let attrs = tags::AttrReader::new(el, &ctx, file, "env");
                    let env = EnvTag::parse(&attrs, self.warnings)?;
                    scope.set_env(env.name, env.value);
                }
                "remap" => {
                    let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
                    let attrs = tags::AttrReader::new(el, &ctx, file, "remap");
                    let remap = RemapTag::parse(&attrs, self.warnings)?;
                    scope.add_remap(remap.from, remap.to);
                }
                "param" => {
                    let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
                    let attrs = tags::AttrReader::new(el, &ctx, file, "param");
                    let param = ParamTag::parse(&attrs, self.warnings)?;
                    children.push(Child::Param {
                        param,
                        ns: scope.ns().to_string(),
                        source_file: file.to_path_buf(),
                    });
                }
                "rosparam" => {
                    let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
                    let attrs = tags::AttrReader::new(el, &ctx, file, "rosparam");
                    let op = RosParamTag::parse(&attrs, &ctx, self.warnings)?;
                    children.push(Child::RosParam {
                        op,
                        ns: scope.ns().to_string(),
                        source_file: file.to_path_buf(),
                    });
                }
                "machine" => {
                    let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
                    let attrs = tags::AttrReader::new(el, &ctx, file, "machine");
                    children.push(Child::Machine(MachineTag::parse(&attrs, self.warnings)?));
                }
                "node" => {
                    let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
                    let attrs = tags::AttrReader::new(el, &ctx, file, "node");
                    let node_tag = NodeTag::parse(&attrs, self.warnings)?;
                    let resolved = self.resolve_node(el, file, scope, node_tag)?;
                    children.push(Child::Node(resolved));
                }
                "test" => {
                    let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
                    let attrs = tags::AttrReader::new(el, &ctx, file, "test");
                    let test_tag = TestTag::parse(&attrs, self.warnings)?;
                    let resolved = self.resolve_test(el, file, scope, test_tag)?;
                    children.push(Child::Test(resolved));
                }
                "group" => {
                    let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
                    let attrs = tags::AttrReader::new(el, &ctx, file, "group");
                    let group_tag = GroupTag::parse(&attrs, self.warnings)?;
                    let mut child_scope = scope.push_namespace(group_tag.ns.as_deref());
                    let (nested_children, _) = self.compile_children(el, file, &mut child_scope)?;
                    children.push(Child::Nested(LaunchTree {
                        file: file.to_path_buf(),
                        ns: child_scope.ns().to_string(),
                        clear_params: group_tag.clear_params,
                        deprecated: None,
                        children: nested_children,
                    }));
                }
                "include" => {
                    let ctx = SubstitutionContext { scope, locator: self.locator, anon: self.anon };
                    let attrs = tags::AttrReader::new(el, &ctx, file, "include");
                    let include_tag = IncludeTag::parse(&attrs, self.warnings)?;
                    let nested = self.compile_include(el, file, scope, include_tag)?;
                    children.push(Child::Nested(nested));
                }
                _ => {
                    self.warnings.push(file, &tag_name, format!("unrecognized tag <{tag_name}>"));
                }
            }
        }

        Ok((children, declared_args))
    }

    fn evaluate_gated(&self, attrs: &tags::AttrReader<'_, '_>, file: &Path, tag: &str) -> Result<bool> {
        let if_value = attrs.get("if")?;
        let unless_value = attrs.get("unless")?;
        tags::evaluate_gating(if_value.as_deref(), unless_value.as_deref(), file, tag)
    }

    /// Applies an `<arg>` element to `scope` per §3/§8 `ArgBinding`
    /// rules: `value` always sets; `default` only fills a gap; neither
    /// requires the name already be bound (from an outer scope or CLI
    /// override), else it's a fatal "required arg not supplied".
    fn apply_arg(&self, scope: &mut Scope, arg: &ArgTag, file: &Path) -> Result<()> {
        if let Some(value) = &arg.value {
            scope.set_arg(arg.name.clone(), value.clone());
            return Ok(());
        }
        if scope.get_arg(&arg.name).is_some() {
            // Outer binding (caller scope or CLI) overrides an inner default.
            return Ok(());
        }
        if let Some(default) = &arg.default {
            scope.set_arg(arg.name.clone(), default.clone());
            return Ok(());
        }
        Err(LaunchError::parse(file, format!("required arg '{}' was not supplied", arg.name)))
    }

    fn resolve_node(
        &mut self,
        node_el: Node<'_, '_>,
        file: &Path,
        scope: &Scope,
        tag: NodeTag,
    ) -> Result<ResolvedNode> {
        let ns = scope.push_namespace(tag.ns.as_deref()).ns().to_string();
        let (env, remap, params, rosparams) = self.resolve_node_children(node_el, file, scope, &ns)?;
        Ok(ResolvedNode { tag, ns, env, remap, params, rosparams, source_file: file.to_path_buf() })
    }

    fn resolve_test(
        &mut self,
        node_el: Node<'_, '_>,
        file: &Path,
        scope: &Scope,
        tag: TestTag,
    ) -> Result<ResolvedTest> {
        let ns = scope.push_namespace(tag.ns.as_deref()).ns().to_string();
        let (env, remap, params, rosparams) = self.resolve_node_children(node_el, file, scope, &ns)?;
        Ok(ResolvedTest { tag, ns, env, remap, params, rosparams, source_file: file.to_path_buf() })
    }

    /// `<node>`/`<test>` children: `env`, `remap`, `param`, `rosparam`
    /// (§4.2). These extend a *copy* of the enclosing scope scoped to
    /// the node's own namespace; they never leak back out.
    #[allow(clippy::type_complexity)]
    fn resolve_node_children(
        &mut self,
        node_el: Node<'_, '_>,
        file: &Path,
        scope: &Scope,
        ns: &str,
    ) -> Result<(BTreeMap<String, String>, BTreeMap<String, String>, Vec<ParamTag>, Vec<RosParamTag>)> {
        let mut local_scope = scope.child_for_include(ns.to_string());
        let mut params = Vec::new();
        let mut rosparams = Vec::new();

        for el in node_el.children().filter(Node::is_element) {
            let tag_name = el.tag_name().name().to_string();
            let ctx = SubstitutionContext { scope: &local_scope, locator: self.locator, anon: self.anon };
            let attrs = tags::AttrReader::new(el, &ctx, file, &tag_name);
            let enabled = self.evaluate_gated(&attrs, file, &tag_name)?;
            if !enabled {
                continue;
            }
            match tag_name.as_str() {
                "env" => {
                    let env = EnvTag::parse(&attrs, self.warnings)?;
                    local_scope.set_env(env.name, env.value);
                }
                "remap" => {
                    let remap = RemapTag::parse(&attrs, self.warnings)?;
                    local_scope.add_remap(remap.from, remap.to);
                }
                "param" => params.push(ParamTag::parse(&attrs, self.warnings)?),
                "rosparam" => rosparams.push(RosParamTag::parse(&attrs, &ctx, self.warnings)?),
                other => self.warnings.push(file, other, format!("unexpected child <{other}> of node")),
            }
        }

        Ok((local_scope.env().clone(), local_scope.remap().clone(), params, rosparams))
    }

    /// `<include>` (§4.3 step 5): resolve the path, guard against
    /// cycles, build the child scope from the caller's args/env/remap
    /// plus the `<arg>`/`<env>` children of the `<include>` element,
    /// recurse, then verify every `<arg>` child was actually declared
    /// in the included file.
    fn compile_include(
        &mut self,
        include_el: Node<'_, '_>,
        file: &Path,
        scope: &Scope,
        tag: IncludeTag,
    ) -> Result<LaunchTree> {
        let resolved_path = resolve_include_path(file, &tag.file);
        if !resolved_path.exists() {
            return Err(LaunchError::MissingResource(format!(
                "included file '{}' does not exist",
                resolved_path.display()
            )));
        }

        let joined_ns = tag.ns.as_deref().map(|ns| scope.push_namespace(Some(ns)).ns().to_string());
        let mut child_scope = if tag.pass_all_args { scope.clone() } else { scope.without_args() };

        let mut supplied_args = Vec::new();
        for el in include_el.children().filter(Node::is_element) {
            let tag_name = el.tag_name().name().to_string();
            let ctx = SubstitutionContext { scope: &child_scope, locator: self.locator, anon: self.anon };
            let attrs = tags::AttrReader::new(el, &ctx, file, &tag_name);
            let enabled = self.evaluate_gated(&attrs, file, &tag_name)?;
            if !enabled {
                continue;
            }
            match tag_name.as_str() {
                "arg" => {
                    let arg = ArgTag::parse(&attrs, self.warnings)?;
                    let value = arg.value.clone().or(arg.default.clone()).ok_or_else(|| {
                        LaunchError::parse(file, format!("<include> <arg name=\"{}\"> needs a value", arg.name))
                    })?;
                    child_scope.set_arg(arg.name.clone(), value);
                    supplied_args.push(arg.name);
                }
                "env" => {
                    let env = EnvTag::parse(&attrs, self.warnings)?;
                    child_scope.set_env(env.name, env.value);
                }
                other => self.warnings.push(file, other, format!("unexpected child <{other}> of include")),
            }
        }

        if let Some(ns) = joined_ns {
            child_scope = child_scope.child_for_include(ns);
        }

        let (mut nested_tree, declared_args) = self.compile_file(&resolved_path, child_scope)?;

        for name in &supplied_args {
            if !declared_args.contains(name) {
                return Err(LaunchError::parse(
                    file,
                    format!("<include> supplied arg '{name}' which '{}' never declares", resolved_path.display()),
                ));
            }
        }

        nested_tree.clear_params = tag.clear_params;
        Ok(nested_tree)
    }
}

fn resolve_include_path(including_file: &Path, target: &str) -> PathBuf {
    let target_path = PathBuf::from(target);
    if target_path.is_absolute() {
        target_path
    } else {
        including_file
            .parent()
            .map(|dir| dir.join(&target_path))
            .unwrap_or(target_path)
    }
}
