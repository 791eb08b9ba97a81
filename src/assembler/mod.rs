//! Config assembler (§4.4, component D).
//!
//! Flattens a [`LaunchTree`](crate::compiler::tree::LaunchTree) into the
//! resolved, machine-assigned, namespace-qualified sets the bootstrap
//! step (F) and process handles (G/H) actually consume: nodes, tests,
//! params, rosparam operations, the consolidated machine list, and the
//! unified clear-params namespace set.

pub mod clearset;
pub mod machines;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::compiler::tree::{Child, LaunchTree};
use crate::error::{LaunchError, Result};
use crate::scope::resolve_name;
use crate::tags::machine::MachineTag;
use crate::tags::param::ParamValue;
use crate::tags::rosparam::{RosParamCommand, RosParamSource};
use crate::tags::{NodeTag, TestTag};

use self::machines::MachineRegistry;

/// A single resolved parameter assignment (§3 `ParamEntry`).
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    pub name: String,
    pub value: ParamValue,
    pub source_file: PathBuf,
}

/// A `<rosparam>` operation with its namespace resolved (§3 `RosParamOp`).
#[derive(Debug, Clone, PartialEq)]
pub struct RosParamOp {
    pub command: RosParamCommand,
    pub ns: String,
    pub param: Option<String>,
    pub source: Option<RosParamSource>,
    pub subst_value: bool,
    pub source_file: PathBuf,
}

/// A `<node>`, fully resolved and machine-assigned.
#[derive(Debug, Clone)]
pub struct AssembledNode {
    pub tag: NodeTag,
    pub ns: String,
    pub resolved_name: String,
    pub env: BTreeMap<String, String>,
    pub remap: BTreeMap<String, String>,
    pub machine: Option<MachineTag>,
    pub source_file: PathBuf,
}

/// A `<test>`, fully resolved and machine-assigned.
#[derive(Debug, Clone)]
pub struct AssembledTest {
    pub tag: TestTag,
    pub ns: String,
    pub resolved_name: String,
    pub env: BTreeMap<String, String>,
    pub remap: BTreeMap<String, String>,
    pub machine: Option<MachineTag>,
    pub source_file: PathBuf,
}

/// Everything the rest of the pipeline needs, flattened out of the tree.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub nodes: Vec<AssembledNode>,
    pub tests: Vec<AssembledTest>,
    pub params: Vec<ParamEntry>,
    pub rosparams: Vec<RosParamOp>,
    pub machines: Vec<MachineTag>,
    /// Namespaces to wipe on the registry before pushing any param in
    /// them, already unified (§4.4 shortest-prefix-wins).
    pub clear_params: Vec<String>,
}

/// Flattens `tree`, consolidates its machines, and assigns each node
/// and test to a machine.
pub fn assemble(tree: &LaunchTree) -> Result<Assembled> {
    let declared_machines = collect_machines(tree);
    let registry = MachineRegistry::build(&declared_machines)?;

    let mut nodes = Vec::new();
    let mut tests = Vec::new();
    let mut params = Vec::new();
    let mut rosparams = Vec::new();
    let mut clear_ns = Vec::new();
    let mut seen_node_names: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut seen_test_names: BTreeMap<String, PathBuf> = BTreeMap::new();

    tree.walk_blocks(&mut |block| {
        if block.clear_params {
            clear_ns.push(block.ns.clone());
        }
    });

    let mut assemble_err = None;
    tree.walk(&mut |child| {
        if assemble_err.is_some() {
            return;
        }
        match child {
            Child::Param { param, ns, source_file } => {
                params.push(ParamEntry {
                    name: resolve_name(ns, &param.name),
                    value: param.value.clone(),
                    source_file: source_file.clone(),
                });
            }
            Child::RosParam { op, ns, source_file } => {
                let resolved_ns = match &op.param {
                    Some(p) => resolve_name(ns, p),
                    None => ns.clone(),
                };
                rosparams.push(RosParamOp {
                    command: op.command,
                    ns: resolved_ns,
                    param: op.param.clone(),
                    source: op.source.clone(),
                    subst_value: op.subst_value,
                    source_file: source_file.clone(),
                });
            }
            Child::Machine(_) => {}
            Child::Node(resolved) => {
                if resolved.tag.clear_params {
                    clear_ns.push(resolve_name(&resolved.ns, &resolved.tag.name));
                }
                let resolved_name = resolve_name(&resolved.ns, &resolved.tag.name);
                if let Some(prior_file) = seen_node_names.get(&resolved_name) {
                    assemble_err = Some(LaunchError::parse(
                        resolved.source_file.clone(),
                        format!(
                            "duplicate node name '{resolved_name}' also defined in {}",
                            prior_file.display()
                        ),
                    ));
                    return;
                }
                match registry.resolve(resolved.tag.machine.as_deref()) {
                    Ok(machine) => {
                        seen_node_names.insert(resolved_name.clone(), resolved.source_file.clone());
                        nodes.push(AssembledNode {
                            resolved_name,
                            tag: resolved.tag.clone(),
                            ns: resolved.ns.clone(),
                            env: resolved.env.clone(),
                            remap: resolved.remap.clone(),
                            machine: machine.cloned(),
                            source_file: resolved.source_file.clone(),
                        })
                    }
                    Err(e) => assemble_err = Some(e),
                }
            }
            Child::Test(resolved) => {
                let resolved_name = resolve_name(&resolved.ns, &resolved.tag.test_name);
                if let Some(prior_file) = seen_test_names.get(&resolved_name) {
                    assemble_err = Some(LaunchError::parse(
                        resolved.source_file.clone(),
                        format!(
                            "duplicate test name '{resolved_name}' also defined in {}",
                            prior_file.display()
                        ),
                    ));
                    return;
                }
                match registry.resolve(resolved.tag.machine.as_deref()) {
                    Ok(machine) => {
                        seen_test_names.insert(resolved_name.clone(), resolved.source_file.clone());
                        tests.push(AssembledTest {
                            resolved_name,
                            tag: resolved.tag.clone(),
                            ns: resolved.ns.clone(),
                            env: resolved.env.clone(),
                            remap: resolved.remap.clone(),
                            machine: machine.cloned(),
                            source_file: resolved.source_file.clone(),
                        })
                    }
                    Err(e) => assemble_err = Some(e),
                }
            }
            Child::Nested(_) => {}
        }
    });

    if let Some(e) = assemble_err {
        return Err(e);
    }

    Ok(Assembled {
        nodes,
        tests,
        params,
        rosparams,
        machines: registry.canonical_machines().to_vec(),
        clear_params: clearset::unify(clear_ns),
    })
}

fn collect_machines(tree: &LaunchTree) -> Vec<MachineTag> {
    let mut machines = Vec::new();
    tree.walk(&mut |child| {
        if let Child::Machine(m) = child {
            machines.push(m.clone());
        }
    });
    machines
}
