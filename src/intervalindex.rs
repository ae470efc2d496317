/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

//! The positional index of an annotation set: an AVL tree keyed on `(start, handle)`, where every
//! node is augmented with the maximum end offset in its subtree. Nodes live in an arena (a `Vec`)
//! with a free list, links are indices into it.
//!
//! Query costs, with `k` the size of the result:
//! * `overlapping`, `covering`: `O(log n + k)`, pruned on the subtree maximum end.
//! * `within`: `O(log n + m)` where `m` is the number of members starting inside the boundary.
//! * `startingat`, `start_ge`: ordered range scans over the key.

use std::cmp::Ordering;

use crate::annotation::AnnotationHandle;

const NIL: usize = usize::MAX;

#[derive(Debug, Clone)]
struct Node {
    start: usize,
    handle: AnnotationHandle,
    end: usize,
    /// Maximum end offset in the subtree rooted at this node
    maxend: usize,
    height: u32,
    left: usize,
    right: usize,
}

impl Node {
    fn key(&self) -> (usize, AnnotationHandle) {
        (self.start, self.handle)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct IntervalIndex {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: usize,
    len: usize,
}

impl Default for IntervalIndex {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NIL,
            len: 0,
        }
    }
}

impl IntervalIndex {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = NIL;
        self.len = 0;
    }

    /// Adds an interval. The handle must not be in the index yet.
    pub(crate) fn insert(&mut self, start: usize, end: usize, handle: AnnotationHandle) {
        let node = Node {
            start,
            handle,
            end,
            maxend: end,
            height: 1,
            left: NIL,
            right: NIL,
        };
        let index = if let Some(index) = self.free.pop() {
            self.nodes[index] = node;
            index
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        };
        self.root = self.insert_at(self.root, index);
        self.len += 1;
    }

    /// Removes an interval, returns whether it was present
    pub(crate) fn remove(&mut self, start: usize, handle: AnnotationHandle) -> bool {
        let (root, removed) = self.remove_at(self.root, (start, handle));
        self.root = root;
        if removed {
            self.len -= 1;
        }
        removed
    }

    fn height(&self, n: usize) -> u32 {
        if n == NIL {
            0
        } else {
            self.nodes[n].height
        }
    }

    fn maxend(&self, n: usize) -> usize {
        if n == NIL {
            0
        } else {
            self.nodes[n].maxend
        }
    }

    fn update(&mut self, n: usize) {
        let (left, right) = (self.nodes[n].left, self.nodes[n].right);
        let height = 1 + self.height(left).max(self.height(right));
        let maxend = self.nodes[n]
            .end
            .max(self.maxend(left))
            .max(self.maxend(right));
        let node = &mut self.nodes[n];
        node.height = height;
        node.maxend = maxend;
    }

    fn rotate_right(&mut self, y: usize) -> usize {
        let x = self.nodes[y].left;
        self.nodes[y].left = self.nodes[x].right;
        self.nodes[x].right = y;
        self.update(y);
        self.update(x);
        x
    }

    fn rotate_left(&mut self, x: usize) -> usize {
        let y = self.nodes[x].right;
        self.nodes[x].right = self.nodes[y].left;
        self.nodes[y].left = x;
        self.update(x);
        self.update(y);
        y
    }

    fn balance(&mut self, n: usize) -> usize {
        self.update(n);
        let (left, right) = (self.nodes[n].left, self.nodes[n].right);
        let (hl, hr) = (self.height(left), self.height(right));
        if hl > hr + 1 {
            if self.height(self.nodes[left].left) < self.height(self.nodes[left].right) {
                let l = self.rotate_left(left);
                self.nodes[n].left = l;
            }
            self.rotate_right(n)
        } else if hr > hl + 1 {
            if self.height(self.nodes[right].right) < self.height(self.nodes[right].left) {
                let r = self.rotate_right(right);
                self.nodes[n].right = r;
            }
            self.rotate_left(n)
        } else {
            n
        }
    }

    fn insert_at(&mut self, n: usize, new: usize) -> usize {
        if n == NIL {
            return new;
        }
        if self.nodes[new].key() < self.nodes[n].key() {
            let l = self.insert_at(self.nodes[n].left, new);
            self.nodes[n].left = l;
        } else {
            let r = self.insert_at(self.nodes[n].right, new);
            self.nodes[n].right = r;
        }
        self.balance(n)
    }

    fn remove_at(&mut self, n: usize, key: (usize, AnnotationHandle)) -> (usize, bool) {
        if n == NIL {
            return (NIL, false);
        }
        match key.cmp(&self.nodes[n].key()) {
            Ordering::Less => {
                let (l, removed) = self.remove_at(self.nodes[n].left, key);
                self.nodes[n].left = l;
                (self.balance(n), removed)
            }
            Ordering::Greater => {
                let (r, removed) = self.remove_at(self.nodes[n].right, key);
                self.nodes[n].right = r;
                (self.balance(n), removed)
            }
            Ordering::Equal => {
                let (left, right) = (self.nodes[n].left, self.nodes[n].right);
                self.free.push(n);
                if left == NIL {
                    (right, true)
                } else if right == NIL {
                    (left, true)
                } else {
                    let (r, min) = self.remove_min(right);
                    self.nodes[min].left = left;
                    self.nodes[min].right = r;
                    (self.balance(min), true)
                }
            }
        }
    }

    /// Detaches the leftmost node of a subtree, returns the new subtree root and the detached node
    fn remove_min(&mut self, n: usize) -> (usize, usize) {
        let left = self.nodes[n].left;
        if left == NIL {
            (self.nodes[n].right, n)
        } else {
            let (l, min) = self.remove_min(left);
            self.nodes[n].left = l;
            (self.balance(n), min)
        }
    }

    /// Iterates over all handles in key order (start, then handle)
    pub(crate) fn iter(&self) -> IntervalIndexIter<'_> {
        let mut iter = IntervalIndexIter {
            index: self,
            stack: Vec::with_capacity(self.height(self.root) as usize),
        };
        iter.push_left(self.root);
        iter
    }

    /// The maximum end offset over all intervals
    pub(crate) fn max_end(&self) -> Option<usize> {
        if self.root == NIL {
            None
        } else {
            Some(self.nodes[self.root].maxend)
        }
    }

    pub(crate) fn first(&self) -> Option<AnnotationHandle> {
        self.iter().next()
    }

    pub(crate) fn last(&self) -> Option<AnnotationHandle> {
        let mut n = self.root;
        if n == NIL {
            return None;
        }
        while self.nodes[n].right != NIL {
            n = self.nodes[n].right;
        }
        Some(self.nodes[n].handle)
    }

    /// All intervals sharing at least one position with `[qs, qe)`
    pub(crate) fn overlapping(&self, qs: usize, qe: usize) -> Vec<AnnotationHandle> {
        let mut result = Vec::new();
        self.visit_overlapping(self.root, qs, qe, &mut result);
        result
    }

    fn visit_overlapping(&self, n: usize, qs: usize, qe: usize, result: &mut Vec<AnnotationHandle>) {
        if n == NIL || self.nodes[n].maxend <= qs {
            return;
        }
        let node = &self.nodes[n];
        self.visit_overlapping(node.left, qs, qe, result);
        if node.start < qe {
            if node.end > qs {
                result.push(node.handle);
            }
            self.visit_overlapping(node.right, qs, qe, result);
        }
    }

    /// All intervals that lie within `[qs, qe]`
    pub(crate) fn within(&self, qs: usize, qe: usize) -> Vec<AnnotationHandle> {
        let mut result = Vec::new();
        self.visit_range(self.root, qs, qe, &mut |node| {
            if node.end <= qe {
                result.push(node.handle)
            }
        });
        result
    }

    /// All intervals that cover `[qs, qe]` completely
    pub(crate) fn covering(&self, qs: usize, qe: usize) -> Vec<AnnotationHandle> {
        let mut result = Vec::new();
        self.visit_covering(self.root, qs, qe, &mut result);
        result
    }

    fn visit_covering(&self, n: usize, qs: usize, qe: usize, result: &mut Vec<AnnotationHandle>) {
        if n == NIL || self.nodes[n].maxend < qe {
            return;
        }
        let node = &self.nodes[n];
        self.visit_covering(node.left, qs, qe, result);
        if node.start <= qs {
            if node.end >= qe {
                result.push(node.handle);
            }
            self.visit_covering(node.right, qs, qe, result);
        }
    }

    /// All intervals with exactly these offsets
    pub(crate) fn coextensive(&self, qs: usize, qe: usize) -> Vec<AnnotationHandle> {
        let mut result = Vec::new();
        self.visit_range(self.root, qs, qs, &mut |node| {
            if node.end == qe {
                result.push(node.handle)
            }
        });
        result
    }

    /// All intervals starting in `[lo, hi]`
    pub(crate) fn starting_between(&self, lo: usize, hi: usize) -> Vec<AnnotationHandle> {
        let mut result = Vec::new();
        self.visit_range(self.root, lo, hi, &mut |node| result.push(node.handle));
        result
    }

    /// All intervals ending in `[lo, hi]`, uses the maximum end to prune but is otherwise a scan
    pub(crate) fn ending_between(&self, lo: usize, hi: usize) -> Vec<AnnotationHandle> {
        let mut result = Vec::new();
        self.visit_ending(self.root, lo, hi, &mut result);
        result
    }

    fn visit_ending(&self, n: usize, lo: usize, hi: usize, result: &mut Vec<AnnotationHandle>) {
        if n == NIL || self.nodes[n].maxend < lo {
            return;
        }
        let node = &self.nodes[n];
        self.visit_ending(node.left, lo, hi, result);
        if node.start <= hi {
            if node.end >= lo && node.end <= hi {
                result.push(node.handle);
            }
            self.visit_ending(node.right, lo, hi, result);
        }
    }

    /// In-order visit of all nodes whose start lies in `[lo, hi]`
    fn visit_range<F>(&self, n: usize, lo: usize, hi: usize, f: &mut F)
    where
        F: FnMut(&Node),
    {
        if n == NIL {
            return;
        }
        let node = &self.nodes[n];
        if node.start >= lo {
            self.visit_range(node.left, lo, hi, f);
        }
        if node.start >= lo && node.start <= hi {
            f(node);
        }
        if node.start <= hi {
            self.visit_range(node.right, lo, hi, f);
        }
    }

    #[cfg(test)]
    /// Verifies the AVL and augmentation invariants, returns the height
    fn check(&self, n: usize) -> u32 {
        if n == NIL {
            return 0;
        }
        let node = &self.nodes[n];
        let hl = self.check(node.left);
        let hr = self.check(node.right);
        assert!(hl.abs_diff(hr) <= 1, "unbalanced node");
        assert_eq!(node.height, 1 + hl.max(hr));
        assert_eq!(
            node.maxend,
            node.end.max(self.maxend(node.left)).max(self.maxend(node.right))
        );
        if node.left != NIL {
            assert!(self.nodes[node.left].key() < node.key());
        }
        if node.right != NIL {
            assert!(self.nodes[node.right].key() > node.key());
        }
        node.height
    }
}

pub(crate) struct IntervalIndexIter<'a> {
    index: &'a IntervalIndex,
    stack: Vec<usize>,
}

impl<'a> IntervalIndexIter<'a> {
    fn push_left(&mut self, mut n: usize) {
        while n != NIL {
            self.stack.push(n);
            n = self.index.nodes[n].left;
        }
    }
}

impl<'a> Iterator for IntervalIndexIter<'a> {
    type Item = AnnotationHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let node = &self.index.nodes[n];
        self.push_left(node.right);
        Some(node.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Handle;

    fn h(i: usize) -> AnnotationHandle {
        AnnotationHandle::new(i)
    }

    #[test]
    fn insert_remove_balanced() {
        let mut index = IntervalIndex::default();
        for i in 0..200 {
            index.insert((i * 7) % 50, (i * 7) % 50 + (i % 5), h(i));
            index.check(index.root);
        }
        assert_eq!(index.len(), 200);
        for i in (0..200).step_by(3) {
            assert!(index.remove((i * 7) % 50, h(i)));
            index.check(index.root);
        }
        assert!(!index.remove(0, h(0)));
        assert_eq!(index.len(), 200 - 67);
        let keys: Vec<_> = index.iter().collect();
        assert_eq!(keys.len(), index.len());
    }

    #[test]
    fn queries() {
        let mut index = IntervalIndex::default();
        index.insert(0, 4, h(0));
        index.insert(1, 2, h(1));
        index.insert(3, 4, h(2));
        index.insert(5, 9, h(3));
        index.insert(4, 4, h(4));
        assert_eq!(index.within(0, 4), vec![h(0), h(1), h(2), h(4)]);
        assert_eq!(index.overlapping(3, 6), vec![h(0), h(2), h(4), h(3)]);
        assert_eq!(index.covering(3, 3), vec![h(0), h(2)]);
        assert_eq!(index.covering(1, 2), vec![h(0), h(1)]);
        assert_eq!(index.coextensive(3, 4), vec![h(2)]);
        assert_eq!(index.starting_between(4, usize::MAX), vec![h(4), h(3)]);
        assert_eq!(index.ending_between(4, 4), vec![h(0), h(2), h(4)]);
        assert_eq!(index.first(), Some(h(0)));
        assert_eq!(index.last(), Some(h(3)));
        assert_eq!(index.max_end(), Some(9));
    }
}
