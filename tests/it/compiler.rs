//! End-to-end compiler + assembler pipeline (§4.3/§4.4): scoping,
//! substitution, `<include>` arg-passing and namespacing, typed
//! params, and clear-params unification, all through real files on
//! disk rather than the in-isolation unit tests each stage also has.

use std::collections::BTreeMap;

use roslaunch::assembler;
use roslaunch::compiler::Compiler;
use roslaunch::error::LaunchError;
use roslaunch::substitution::anon::AnonRegistry;
use roslaunch::substitution::pkg_locator::PackageLocator;
use roslaunch::tags::param::ParamValue;
use roslaunch::tags::Warnings;

use crate::helpers::fixtures_dir;

fn locator() -> PackageLocator {
    PackageLocator::new(vec![fixtures_dir().join("pkgs")])
}

#[test]
fn scoped_launch_file_assembles_namespaced_nodes_and_params() {
    let anon = AnonRegistry::new();
    let mut warnings = Warnings::default();
    let loc = locator();
    let mut compiler = Compiler::new(&loc, &anon, &mut warnings);

    let tree = compiler
        .compile_root(&fixtures_dir().join("scoped.launch"), &BTreeMap::new())
        .unwrap();
    let assembled = assembler::assemble(&tree).unwrap();

    let mut node_names: Vec<&str> = assembled.nodes.iter().map(|n| n.resolved_name.as_str()).collect();
    node_names.sort_unstable();
    assert_eq!(node_names, vec!["/alpha/talker", "/beta/listener"]);
    assert!(assembled.nodes.iter().all(|n| n.machine.is_none()));

    let param = |name: &str| {
        assembled
            .params
            .iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| panic!("no such param '{name}'"))
    };

    assert_eq!(param("/global_param").value, ParamValue::String("top".to_string()));
    assert_eq!(param("/alpha/greeting").value, ParamValue::String("hello r2d2".to_string()));
    assert_eq!(param("/alpha/count").value, ParamValue::Int(3));
    assert_eq!(param("/beta/greeting").value, ParamValue::String("hi c3po".to_string()));
    match &param("/beta/pkg_dir").value {
        ParamValue::String(path) => assert!(path.ends_with("demo_pkg")),
        other => panic!("expected a string param, got {other:?}"),
    }

    assert_eq!(assembled.clear_params, vec!["/alpha".to_string()]);
}

#[test]
fn include_cycle_is_rejected() {
    let anon = AnonRegistry::new();
    let mut warnings = Warnings::default();
    let loc = locator();
    let mut compiler = Compiler::new(&loc, &anon, &mut warnings);

    let err = compiler
        .compile_root(&fixtures_dir().join("cycle_a.launch"), &BTreeMap::new())
        .unwrap_err();
    assert!(matches!(err, LaunchError::Cycle { .. }), "expected a Cycle error, got {err:?}");
}
