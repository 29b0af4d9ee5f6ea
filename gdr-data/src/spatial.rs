//! Nearest-neighbour and radius lookups over geographic points.
//!
//! Points are projected onto the unit sphere and stored in a 3-D k-d tree.
//! Chord length is monotonic in great-circle distance, so the tree can prune
//! with plain Euclidean bounds while results are reported in kilometres.
//! Equal distances are ordered by identifier.
use gdr_core::{coordinate::Coordinate, plant::PowerPlant, trend::TrendResult};
use gdr_utils::geo::km_to_chord;
use std::cmp::Ordering;

/// Anything with an identifier and a position.
pub trait Located {
    fn id(&self) -> &str;
    fn location(&self) -> Coordinate;
}

impl<T: Located + ?Sized> Located for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn location(&self) -> Coordinate {
        (**self).location()
    }
}

impl Located for PowerPlant {
    fn id(&self) -> &str {
        &self.id
    }

    fn location(&self) -> Coordinate {
        self.location
    }
}

impl Located for TrendResult {
    fn id(&self) -> &str {
        &self.station_id
    }

    fn location(&self) -> Coordinate {
        self.location
    }
}

/// A query hit.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'t, T> {
    pub item: &'t T,
    pub distance_km: f64,
}

#[derive(Debug)]
struct Node<T> {
    point: [f64; 3],
    item: T,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Static k-d tree; built once, queried read-only from many threads.
#[derive(Debug)]
pub struct KdTree<T> {
    nodes: Vec<Node<T>>,
    root: Option<usize>,
}

fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|i| (a[i] - b[i]).powi(2)).sum()
}

impl<T: Located> KdTree<T> {
    pub fn new(items: Vec<T>) -> Self {
        let mut nodes: Vec<Node<T>> = items
            .into_iter()
            .map(|item| Node {
                point: item.location().unit_vector(),
                item,
                axis: 0,
                left: None,
                right: None,
            })
            .collect();
        let mut order: Vec<usize> = (0..nodes.len()).collect();
        let root = Self::build(&mut nodes, &mut order, 0);
        KdTree { nodes, root }
    }

    /// Median split on the cycling axis; returns the subtree root.
    fn build(nodes: &mut [Node<T>], order: &mut [usize], depth: usize) -> Option<usize> {
        if order.is_empty() {
            return None;
        }
        let axis = depth % 3;
        let mid = order.len() / 2;
        order.select_nth_unstable_by(mid, |&a, &b| {
            nodes[a].point[axis].total_cmp(&nodes[b].point[axis])
        });
        let index = order[mid];
        let (lower, upper) = order.split_at_mut(mid);
        let left = Self::build(nodes, lower, depth + 1);
        let right = Self::build(nodes, &mut upper[1..], depth + 1);
        let node = &mut nodes[index];
        node.axis = axis;
        node.left = left;
        node.right = right;
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn rank(&self, a: (f64, usize), b: (f64, usize)) -> Ordering {
        a.0.total_cmp(&b.0)
            .then_with(|| self.nodes[a.1].item.id().cmp(self.nodes[b.1].item.id()))
    }

    fn neighbor(&self, index: usize, target: &Coordinate) -> Neighbor<'_, T> {
        let item = &self.nodes[index].item;
        Neighbor {
            item,
            distance_km: target.distance_km(&item.location()),
        }
    }

    /// Closest item to `target`.
    pub fn nearest(&self, target: Coordinate) -> Option<Neighbor<'_, T>> {
        self.k_nearest(target, 1).into_iter().next()
    }

    /// Up to `k` closest items, nearest first.
    pub fn k_nearest(&self, target: Coordinate, k: usize) -> Vec<Neighbor<'_, T>> {
        if k == 0 {
            return Vec::new();
        }
        let query = target.unit_vector();
        let mut best: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        self.search_nearest(self.root, &query, k, &mut best);
        best.into_iter()
            .map(|(_, index)| self.neighbor(index, &target))
            .collect()
    }

    fn search_nearest(
        &self,
        node: Option<usize>,
        query: &[f64; 3],
        k: usize,
        best: &mut Vec<(f64, usize)>,
    ) {
        let Some(index) = node else {
            return;
        };
        let current = &self.nodes[index];
        let candidate = (squared_distance(&current.point, query), index);
        let full = best.len() == k;
        if !full || best.last().is_some_and(|&worst| self.rank(candidate, worst).is_lt()) {
            let at = best
                .binary_search_by(|&entry| self.rank(entry, candidate))
                .unwrap_or_else(|at| at);
            best.insert(at, candidate);
            best.truncate(k);
        }

        let diff = query[current.axis] - current.point[current.axis];
        let (near, far) = if diff < 0.0 {
            (current.left, current.right)
        } else {
            (current.right, current.left)
        };
        self.search_nearest(near, query, k, best);
        // equal bound still explored so identifier ties resolve correctly
        let explore_far = best.len() < k || best.last().is_some_and(|&(worst, _)| diff * diff <= worst);
        if explore_far {
            self.search_nearest(far, query, k, best);
        }
    }

    /// All items within `radius_km` great-circle distance, nearest first.
    pub fn within_radius(&self, target: Coordinate, radius_km: f64) -> Vec<Neighbor<'_, T>> {
        if radius_km.is_nan() || radius_km < 0.0 {
            return Vec::new();
        }
        let query = target.unit_vector();
        // slack so float error in the chord bound never prunes a hit
        let bound = km_to_chord(radius_km) + 1e-9;
        let mut hits = Vec::new();
        self.search_radius(self.root, &query, bound * bound, &mut hits);

        let mut neighbors: Vec<Neighbor<'_, T>> = hits
            .into_iter()
            .map(|index| self.neighbor(index, &target))
            .filter(|n| n.distance_km <= radius_km)
            .collect();
        neighbors.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.item.id().cmp(b.item.id()))
        });
        neighbors
    }

    fn search_radius(&self, node: Option<usize>, query: &[f64; 3], bound2: f64, hits: &mut Vec<usize>) {
        let Some(index) = node else {
            return;
        };
        let current = &self.nodes[index];
        if squared_distance(&current.point, query) <= bound2 {
            hits.push(index);
        }
        let diff = query[current.axis] - current.point[current.axis];
        let (near, far) = if diff < 0.0 {
            (current.left, current.right)
        } else {
            (current.right, current.left)
        };
        self.search_radius(near, query, bound2, hits);
        if diff * diff <= bound2 {
            self.search_radius(far, query, bound2, hits);
        }
    }
}
