//! Machine consolidation and assignment (§4.4).
//!
//! Machines declared under different names but with identical
//! connection parameters are the same machine; the first declaration
//! is kept canonical and every later alias resolves to it. A node
//! that names no machine falls back to the single `default="true"`
//! machine if exactly one was declared, else to the local machine.

use std::collections::HashMap;

use crate::consts::LOCAL_MACHINE;
use crate::error::{LaunchError, Result};
use crate::tags::machine::{MachineDefault, MachineTag};

/// Consolidated machine set plus a name-to-canonical-index lookup.
#[derive(Debug, Clone, Default)]
pub struct MachineRegistry {
    canonical: Vec<MachineTag>,
    by_name: HashMap<String, usize>,
    default_index: Option<usize>,
}

impl MachineRegistry {
    /// Folds `declared` (document order) into a consolidated registry,
    /// merging any machine whose connection parameters match one
    /// already seen (§3 `MachineSpec` equality ignores `name`/`default`).
    pub fn build(declared: &[MachineTag]) -> Result<Self> {
        let mut canonical: Vec<MachineTag> = Vec::new();
        let mut by_name = HashMap::new();
        let mut default_index = None;

        for machine in declared {
            if by_name.contains_key(&machine.name) {
                return Err(LaunchError::parse(
                    std::path::PathBuf::new(),
                    format!("machine '{}' declared more than once", machine.name),
                ));
            }

            let existing = canonical.iter().position(|m| m.same_connection(machine));
            let index = match existing {
                Some(i) => i,
                None => {
                    canonical.push(machine.clone());
                    canonical.len() - 1
                }
            };
            by_name.insert(machine.name.clone(), index);

            if machine.default == MachineDefault::True {
                if default_index.is_some_and(|d| d != index) {
                    return Err(LaunchError::parse(
                        std::path::PathBuf::new(),
                        "more than one machine is marked default=\"true\"",
                    ));
                }
                default_index = Some(index);
            }
        }

        Ok(MachineRegistry { canonical, by_name, default_index })
    }

    #[must_use]
    pub fn canonical_machines(&self) -> &[MachineTag] {
        &self.canonical
    }

    /// Resolves a node's `machine` attribute (or absence of one) to a
    /// machine, or `None` meaning "run locally". `Some(LOCAL_MACHINE)`
    /// and an unset attribute are both treated as local.
    pub fn resolve(&self, requested: Option<&str>) -> Result<Option<&MachineTag>> {
        match requested {
            None => Ok(self.default_index.map(|i| &self.canonical[i])),
            Some(name) if name == LOCAL_MACHINE => Ok(None),
            Some(name) => {
                let index = self.by_name.get(name).ok_or_else(|| {
                    LaunchError::MissingResource(format!("unknown machine '{name}'"))
                })?;
                Ok(Some(&self.canonical[*index]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn machine(name: &str, address: &str, default: MachineDefault) -> MachineTag {
        MachineTag {
            name: name.to_string(),
            address: address.to_string(),
            ssh_port: 22,
            user: None,
            password: None,
            env_loader: None,
            timeout: Duration::from_secs(10),
            default,
        }
    }

    #[test]
    fn merges_aliases_with_identical_connection() {
        let declared = vec![
            machine("a", "10.0.0.1", MachineDefault::False),
            machine("b", "10.0.0.1", MachineDefault::False),
        ];
        let reg = MachineRegistry::build(&declared).unwrap();
        assert_eq!(reg.canonical_machines().len(), 1);
        let a = reg.resolve(Some("a")).unwrap().unwrap();
        let b = reg.resolve(Some("b")).unwrap().unwrap();
        assert_eq!(a.address, b.address);
    }

    #[test]
    fn distinct_connections_stay_separate() {
        let declared = vec![
            machine("a", "10.0.0.1", MachineDefault::False),
            machine("b", "10.0.0.2", MachineDefault::False),
        ];
        let reg = MachineRegistry::build(&declared).unwrap();
        assert_eq!(reg.canonical_machines().len(), 2);
    }

    #[test]
    fn unset_machine_falls_back_to_default() {
        let declared = vec![machine("a", "10.0.0.1", MachineDefault::True)];
        let reg = MachineRegistry::build(&declared).unwrap();
        assert!(reg.resolve(None).unwrap().is_some());
    }

    #[test]
    fn unset_machine_is_local_without_a_default() {
        let declared = vec![machine("a", "10.0.0.1", MachineDefault::False)];
        let reg = MachineRegistry::build(&declared).unwrap();
        assert!(reg.resolve(None).unwrap().is_none());
    }

    #[test]
    fn explicit_local_is_local() {
        let reg = MachineRegistry::build(&[]).unwrap();
        assert!(reg.resolve(Some(LOCAL_MACHINE)).unwrap().is_none());
    }

    #[test]
    fn unknown_machine_name_errors() {
        let reg = MachineRegistry::build(&[]).unwrap();
        assert!(reg.resolve(Some("nope")).is_err());
    }
}
