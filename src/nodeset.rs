//! Compact set of node indices.
//!
//! Separation queries mark ancestors and visited nodes on every call, so the
//! marks live in a flat word vector instead of a hash set.

use petgraph::graph::NodeIndex;

/// A set of graph node indices backed by a vector of u64 words.
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    words: Vec<u64>,
    count: usize,
}

impl NodeSet {
    const BITS_PER_WORD: usize = 64;

    /// Creates an empty set able to hold `capacity` nodes without growing.
    pub fn new(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(Self::BITS_PER_WORD);
        Self {
            words: vec![0; num_words],
            count: 0,
        }
    }

    #[inline]
    fn word_and_bit(node: NodeIndex) -> (usize, usize) {
        let index = node.index();
        (index / Self::BITS_PER_WORD, index % Self::BITS_PER_WORD)
    }

    /// Returns the number of nodes in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn contains(&self, node: NodeIndex) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(node);
        match self.words.get(word_idx) {
            Some(word) => word & (1u64 << bit_idx) != 0,
            None => false,
        }
    }

    /// Adds a node. Returns true if it was not already present.
    #[inline]
    pub fn insert(&mut self, node: NodeIndex) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(node);
        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }

        let mask = 1u64 << bit_idx;
        let was_clear = self.words[word_idx] & mask == 0;
        if was_clear {
            self.words[word_idx] |= mask;
            self.count += 1;
        }
        was_clear
    }

    pub fn extend(&mut self, nodes: impl IntoIterator<Item = NodeIndex>) {
        for node in nodes {
            self.insert(node);
        }
    }

    /// Returns the nodes in ascending index order.
    pub fn iter(&self) -> NodeSetIter<'_> {
        NodeSetIter {
            set: self,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }
}

/// Iterator over the members of a [`NodeSet`].
pub struct NodeSetIter<'a> {
    set: &'a NodeSet,
    word_idx: usize,
    current_word: u64,
}

impl Iterator for NodeSetIter<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit_idx = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1;
                return Some(NodeIndex::new(self.word_idx * NodeSet::BITS_PER_WORD + bit_idx));
            }

            self.word_idx += 1;
            if self.word_idx >= self.set.words.len() {
                return None;
            }
            self.current_word = self.set.words[self.word_idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    #[test]
    fn test_empty() {
        let set = NodeSet::new(10);
        assert!(set.is_empty());
        assert!(!set.contains(idx(0)));
        assert!(!set.contains(idx(500)));
    }

    #[test]
    fn test_insert_contains() {
        let mut set = NodeSet::new(70);
        assert!(set.insert(idx(69)));
        assert!(!set.insert(idx(69)));
        assert!(set.contains(idx(69)));
        assert!(!set.contains(idx(5)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_grows_past_capacity() {
        let mut set = NodeSet::new(0);
        set.insert(idx(130));
        assert!(set.contains(idx(130)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_iter_across_words() {
        let mut set = NodeSet::new(128);
        set.extend([idx(65), idx(3), idx(64), idx(10)]);
        let members: Vec<_> = set.iter().map(|n| n.index()).collect();
        assert_eq!(members, vec![3, 10, 64, 65]);
    }
}
