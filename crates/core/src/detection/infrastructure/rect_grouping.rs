//! Clustering of raw cascade hits into final face boxes.
//!
//! A real face fires the cascade at many neighbouring positions and scales.
//! Hits are partitioned by [`Region::is_similar`] (union-find, transitive),
//! each cluster is averaged, weak clusters are dropped, and boxes nested in a
//! stronger box are discarded.

use std::collections::HashMap;

use crate::shared::region::Region;

/// Groups candidate boxes. A cluster survives only with more than
/// `min_neighbors` members; `min_neighbors == 0` disables grouping.
pub fn group_rectangles(candidates: &[Region], min_neighbors: usize, eps: f64) -> Vec<Region> {
    if min_neighbors == 0 || candidates.is_empty() {
        return candidates.to_vec();
    }

    let n = candidates.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if candidates[i].is_similar(&candidates[j], eps) {
                union(&mut parent, i, j);
            }
        }
    }

    // Class ids follow first appearance so output order is deterministic.
    let mut class_of_root: HashMap<usize, usize> = HashMap::new();
    let mut totals: Vec<[i64; 4]> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for (i, r) in candidates.iter().enumerate() {
        let root = find(&mut parent, i);
        let class = *class_of_root.entry(root).or_insert_with(|| {
            totals.push([0; 4]);
            counts.push(0);
            totals.len() - 1
        });
        let t = &mut totals[class];
        t[0] += r.x as i64;
        t[1] += r.y as i64;
        t[2] += r.width as i64;
        t[3] += r.height as i64;
        counts[class] += 1;
    }

    let averaged: Vec<Region> = totals
        .iter()
        .zip(&counts)
        .map(|(t, &count)| {
            let avg = |v: i64| (v as f64 / count as f64).round() as i32;
            Region::new(avg(t[0]), avg(t[1]), avg(t[2]), avg(t[3]))
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= min_neighbors {
            continue;
        }
        let swallowed = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            j != i
                && n2 > min_neighbors
                && r1.is_inside(r2, eps)
                && (n2 > n1.max(3) || n1 < 3)
        });
        if !swallowed {
            grouped.push(*r1);
        }
    }
    grouped
}

/// Find root of element `i` with path halving for amortized near-O(1).
fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}
