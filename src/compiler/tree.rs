//! The compiled launch tree (§3 `LaunchTree`).
//!
//! Acyclic by construction (cycle detection during compilation, §4.3)
//! and strictly nested: the tree owns its children outright, with no
//! back-references, so a single ownership hierarchy works naturally
//! (§9 "Ownership of the launch tree").

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::tags::{MachineTag, NodeTag, ParamTag, RosParamTag, TestTag};

/// One `<node>`, fully resolved against its enclosing scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNode {
    pub tag: NodeTag,
    pub ns: String,
    pub env: BTreeMap<String, String>,
    pub remap: BTreeMap<String, String>,
    pub params: Vec<ParamTag>,
    pub rosparams: Vec<RosParamTag>,
    pub source_file: PathBuf,
}

/// One `<test>`, fully resolved against its enclosing scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTest {
    pub tag: TestTag,
    pub ns: String,
    pub env: BTreeMap<String, String>,
    pub remap: BTreeMap<String, String>,
    pub params: Vec<ParamTag>,
    pub rosparams: Vec<RosParamTag>,
    pub source_file: PathBuf,
}

/// One child of a `LaunchTree` block — the "remaining tag types"
/// after `arg`/`env`/`remap` have been folded into scope (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Param { param: ParamTag, ns: String, source_file: PathBuf },
    RosParam { op: RosParamTag, ns: String, source_file: PathBuf },
    Machine(MachineTag),
    Node(ResolvedNode),
    Test(ResolvedTest),
    /// A `<group>` or `<include>`: a nested, scoped block.
    Nested(LaunchTree),
}

/// A compiled `<launch>`/`<group>`/`<include>` block.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchTree {
    /// Source file this block's elements came from (the including
    /// file's path, for a `<group>`; the included file's path, for an
    /// `<include>`).
    pub file: PathBuf,
    /// Fully resolved namespace in effect for this block's children.
    pub ns: String,
    /// Whether this block's `clear_params` was set (only meaningful on
    /// `<group>`/`<include>`; always `false` on the root).
    pub clear_params: bool,
    /// Present only on the document root; `<launch deprecated="...">`.
    pub deprecated: Option<String>,
    pub children: Vec<Child>,
}

impl LaunchTree {
    /// Depth-first, pre-order walk over every `Child` in document
    /// order, recursing into nested blocks.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Child)) {
        for child in &self.children {
            if let Child::Nested(nested) = child {
                nested.walk(f);
            } else {
                f(child);
            }
        }
    }

    /// Like `walk`, but also invoked for each nested block itself
    /// (useful for clear-params collection, which cares about groups
    /// and includes, not just leaves).
    pub fn walk_blocks<'a>(&'a self, f: &mut dyn FnMut(&'a LaunchTree)) {
        f(self);
        for child in &self.children {
            if let Child::Nested(nested) = child {
                nested.walk_blocks(f);
            }
        }
    }
}
