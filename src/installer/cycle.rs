// src/installer/cycle.rs

//! Three-colour depth-first search for dependency loops.
//!
//! The graph is never materialised: dependencies are pulled through a
//! callback, so the search expands into already stored tasks as it
//! discovers them.

use std::collections::HashMap;

use crate::errors::Result;
use crate::model::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// On the current DFS path.
    Grey,
    /// Fully explored, no loop through it.
    Black,
}

/// Search from every root along dependency edges. Returns the first loop
/// found as a path that starts and ends on the same task, e.g.
/// `[a, b, c, a]` for `a -> b -> c -> a`.
pub fn find_cycle<I, F>(roots: I, mut dependencies_of: F) -> Result<Option<Vec<TaskId>>>
where
    I: IntoIterator<Item = TaskId>,
    F: FnMut(&str) -> Result<Vec<TaskId>>,
{
    let mut colors: HashMap<TaskId, Color> = HashMap::new();

    for root in roots {
        if colors.contains_key(&root) {
            continue;
        }

        let deps = dependencies_of(&root)?;
        colors.insert(root.clone(), Color::Grey);
        let mut stack = vec![(root, deps.into_iter())];

        while let Some((_, pending)) = stack.last_mut() {
            match pending.next() {
                Some(next) => match colors.get(&next) {
                    Some(Color::Black) => {}
                    Some(Color::Grey) => {
                        let start = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                        let mut path: Vec<TaskId> =
                            stack[start..].iter().map(|(n, _)| n.clone()).collect();
                        path.push(next);
                        return Ok(Some(path));
                    }
                    None => {
                        let deps = dependencies_of(&next)?;
                        colors.insert(next.clone(), Color::Grey);
                        stack.push((next, deps.into_iter()));
                    }
                },
                None => {
                    if let Some((done, _)) = stack.pop() {
                        colors.insert(done, Color::Black);
                    }
                }
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn graph(edges: &[(&str, &str)]) -> BTreeMap<String, Vec<String>> {
        let mut g: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (from, to) in edges {
            g.entry(from.to_string()).or_default().push(to.to_string());
            g.entry(to.to_string()).or_default();
        }
        g
    }

    fn search(g: &BTreeMap<String, Vec<String>>, roots: &[&str]) -> Option<Vec<String>> {
        find_cycle(roots.iter().map(|r| r.to_string()), |id| {
            Ok(g.get(id).cloned().unwrap_or_default())
        })
        .unwrap()
    }

    #[test]
    fn diamond_has_no_cycle() {
        let g = graph(&[("d", "b"), ("d", "c"), ("b", "a"), ("c", "a")]);
        assert_eq!(search(&g, &["d", "c", "b", "a"]), None);
    }

    #[test]
    fn reports_the_loop_path() {
        let g = graph(&[("x", "a"), ("a", "b"), ("b", "c"), ("c", "a")]);
        let path = search(&g, &["x"]).unwrap();
        assert_eq!(path, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn follows_edges_beyond_the_roots() {
        // only "new" is a root; the loop lives entirely in discovered tasks
        let g = graph(&[("new", "old1"), ("old1", "old2"), ("old2", "old1")]);
        let path = search(&g, &["new"]).unwrap();
        assert_eq!(path.first(), path.last());
        assert!(path.contains(&"old2".to_string()));
    }

    #[test]
    fn lookup_errors_propagate() {
        let result = find_cycle(vec!["a".to_string()], |_| {
            Err(crate::errors::RexError::TaskMissing("a".into()))
        });
        assert!(result.is_err());
    }
}
