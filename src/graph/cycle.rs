// src/graph/cycle.rs

//! Iterative three-color cycle search shared by the requirement validator
//! and the milestone scheduler.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not yet visited.
    White,
    /// On the current DFS path.
    Gray,
    /// Fully explored.
    Black,
}

/// Find one cycle in the graph described by `nodes` and `successors`.
///
/// Every node in `nodes` is used as a DFS start (so all components are
/// covered). The returned path is closed: its first element is repeated as
/// the last element, and consecutive elements follow `successors` edges.
///
/// The search uses an explicit stack, so deep graphs do not grow the call
/// stack.
pub fn find_cycle<N, I, F>(nodes: I, mut successors: F) -> Option<Vec<N>>
where
    N: Clone + Eq + Hash,
    I: IntoIterator<Item = N>,
    F: FnMut(&N) -> Vec<N>,
{
    let mut color: HashMap<N, Color> = HashMap::new();

    for start in nodes {
        if color.get(&start).copied().unwrap_or(Color::White) != Color::White {
            continue;
        }

        // (node, its successors, index of the next successor to visit)
        let mut stack: Vec<(N, Vec<N>, usize)> = Vec::new();
        color.insert(start.clone(), Color::Gray);
        let succ = successors(&start);
        stack.push((start, succ, 0));

        loop {
            let next = match stack.last_mut() {
                None => break,
                Some((_, succ, idx)) => {
                    if *idx < succ.len() {
                        *idx += 1;
                        Some(succ[*idx - 1].clone())
                    } else {
                        None
                    }
                }
            };

            match next {
                Some(next) => match color.get(&next).copied().unwrap_or(Color::White) {
                    Color::White => {
                        color.insert(next.clone(), Color::Gray);
                        let succ = successors(&next);
                        stack.push((next, succ, 0));
                    }
                    Color::Gray => {
                        let pos = stack.iter().position(|(n, _, _)| *n == next)?;
                        let mut path: Vec<N> =
                            stack[pos..].iter().map(|(n, _, _)| n.clone()).collect();
                        path.push(next);
                        return Some(path);
                    }
                    Color::Black => {}
                },
                None => {
                    if let Some((done, _, _)) = stack.pop() {
                        color.insert(done, Color::Black);
                    }
                }
            }
        }
    }

    None
}
