//! Clear-params unification (§4.4): a `<group clear_params="true">` or
//! `<include clear_params="true">` schedules its namespace to be wiped
//! on the registry before any of its params are pushed. Nested clears
//! are redundant — clearing `/foo` already clears everything under
//! `/foo/bar` — so the shortest prefix wins and the rest are dropped.

/// Keeps only the namespaces in `paths` that are not already covered
/// by a shorter (or equal) namespace also present in `paths`.
pub fn unify(mut paths: Vec<String>) -> Vec<String> {
    paths.sort_by_key(String::len);
    let mut kept: Vec<String> = Vec::new();
    'outer: for path in paths {
        for prefix in &kept {
            if covers(prefix, &path) {
                continue 'outer;
            }
        }
        kept.push(path);
    }
    kept.sort();
    kept
}

/// Does clearing `prefix` already clear everything under `path`?
fn covers(prefix: &str, path: &str) -> bool {
    if prefix == path || prefix == "/" {
        return true;
    }
    path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_redundant_nested_clears() {
        let unified = unify(vec!["/foo/bar".into(), "/foo".into(), "/baz".into()]);
        assert_eq!(unified, vec!["/baz".to_string(), "/foo".to_string()]);
    }

    #[test]
    fn root_clear_absorbs_everything() {
        let unified = unify(vec!["/".into(), "/foo".into(), "/bar/baz".into()]);
        assert_eq!(unified, vec!["/".to_string()]);
    }

    #[test]
    fn disjoint_namespaces_both_kept() {
        let unified = unify(vec!["/a".into(), "/ab".into()]);
        assert_eq!(unified, vec!["/a".to_string(), "/ab".to_string()]);
    }
}
