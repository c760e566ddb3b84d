//! Partitioned pair collections: the distributed-collection primitives
//!
//! [`PairCollection`] is an unordered mapping from key to value split into
//! partitions; every reorg operator and the sort engine are composed from its
//! transforms. Transforms must be pure, and every producer must emit blocks
//! whose shape is consistent with the characteristics it reports.
//!
//! This crate runs the partitions in-process (in parallel through rayon when
//! the `rayon` feature is on), but placement uses the same deterministic
//! hashes a cluster deployment would, so partition-sensitive logic is
//! exercised identically.

use std::collections::HashMap;
use std::hash::Hash;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::block::MatrixBlock;
use crate::index::{partition_of, BlockIndex};

/// Unordered partitioned mapping from key to value
#[derive(Debug, Clone)]
pub struct PairCollection<K, V> {
    partitions: Vec<Vec<(K, V)>>,
}

/// Block-indexed matrix collection
pub type MatrixCollection = PairCollection<BlockIndex, MatrixBlock>;

/// Run a per-partition transform over all partitions
fn run_partitions<T, U, F>(parts: &[Vec<T>], f: F) -> Vec<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &[T]) -> Vec<U> + Send + Sync,
{
    #[cfg(feature = "rayon")]
    let out = parts
        .par_iter()
        .enumerate()
        .map(|(i, p)| f(i, p))
        .collect();
    #[cfg(not(feature = "rayon"))]
    let out = parts.iter().enumerate().map(|(i, p)| f(i, p)).collect();
    out
}

impl<K, V> PairCollection<K, V>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Build a collection by routing pairs through a partitioner
    pub fn from_pairs<P>(pairs: Vec<(K, V)>, num_partitions: usize, partitioner: P) -> Self
    where
        P: Fn(&K) -> usize,
    {
        let n = num_partitions.max(1);
        let mut partitions: Vec<Vec<(K, V)>> = (0..n).map(|_| Vec::new()).collect();
        for (k, v) in pairs {
            let p = partitioner(&k) % n;
            partitions[p].push((k, v));
        }
        Self { partitions }
    }

    /// Number of partitions
    #[inline]
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Total number of pairs across all partitions
    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    /// Whether the collection holds no pairs
    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(Vec::is_empty)
    }

    /// Borrow the raw partitions
    #[inline]
    pub fn partitions(&self) -> &[Vec<(K, V)>] {
        &self.partitions
    }

    /// Iterate all pairs, partition by partition
    pub fn iter(&self) -> impl Iterator<Item = &(K, V)> {
        self.partitions.iter().flatten()
    }

    /// Consume the collection into a flat pair list
    pub fn into_pairs(self) -> Vec<(K, V)> {
        self.partitions.into_iter().flatten().collect()
    }

    /// Pure per-pair transform; keys may be rewritten but pairs stay in
    /// their current partition until the next shuffle
    pub fn map<K2, V2, F>(&self, f: F) -> PairCollection<K2, V2>
    where
        K2: Clone + Send + Sync,
        V2: Clone + Send + Sync,
        F: Fn(&K, &V) -> (K2, V2) + Send + Sync,
    {
        PairCollection {
            partitions: run_partitions(&self.partitions, |_, part| {
                part.iter().map(|(k, v)| f(k, v)).collect()
            }),
        }
    }

    /// Pure per-value transform preserving keys
    pub fn map_values<V2, F>(&self, f: F) -> PairCollection<K, V2>
    where
        V2: Clone + Send + Sync,
        F: Fn(&V) -> V2 + Send + Sync,
    {
        self.map(|k, v| (k.clone(), f(v)))
    }

    /// Keep only pairs matching a predicate over (key, value)
    pub fn filter<F>(&self, pred: F) -> Self
    where
        F: Fn(&K, &V) -> bool + Send + Sync,
    {
        Self {
            partitions: run_partitions(&self.partitions, |_, part| {
                part.iter()
                    .filter(|(k, v)| pred(k, v))
                    .cloned()
                    .collect()
            }),
        }
    }

    /// One pair maps to zero or more output pairs
    pub fn flat_map<K2, V2, I, F>(&self, f: F) -> PairCollection<K2, V2>
    where
        K2: Clone + Send + Sync,
        V2: Clone + Send + Sync,
        I: IntoIterator<Item = (K2, V2)>,
        F: Fn(&K, &V) -> I + Send + Sync,
    {
        PairCollection {
            partitions: run_partitions(&self.partitions, |_, part| {
                part.iter().flat_map(|(k, v)| f(k, v)).collect()
            }),
        }
    }

    /// Whole-partition transform; `f` receives the partition id and contents
    pub fn map_partitions<K2, V2, F>(&self, f: F) -> PairCollection<K2, V2>
    where
        K2: Clone + Send + Sync,
        V2: Clone + Send + Sync,
        F: Fn(usize, &[(K, V)]) -> Vec<(K2, V2)> + Send + Sync,
    {
        PairCollection {
            partitions: run_partitions(&self.partitions, f),
        }
    }

    /// Shuffle pairs into `num_partitions` partitions by a custom function
    /// over (key, value)
    pub fn repartition_by<P>(self, num_partitions: usize, partitioner: P) -> Self
    where
        P: Fn(&K, &V) -> usize,
    {
        let n = num_partitions.max(1);
        let mut partitions: Vec<Vec<(K, V)>> = (0..n).map(|_| Vec::new()).collect();
        for (k, v) in self.partitions.into_iter().flatten() {
            let p = partitioner(&k, &v) % n;
            partitions[p].push((k, v));
        }
        Self { partitions }
    }

    /// Inner hash join with a collection holding at most one value per key
    ///
    /// The right side is broadcast; output pairs stay in the left side's
    /// partitions (a co-partitioned merge by key).
    pub fn join<V2>(&self, other: &PairCollection<K, V2>) -> PairCollection<K, (V, V2)>
    where
        K: Hash + Eq,
        V2: Clone + Send + Sync,
    {
        let table: HashMap<&K, &V2> = other.iter().map(|(k, v)| (k, v)).collect();
        PairCollection {
            partitions: run_partitions(&self.partitions, |_, part| {
                part.iter()
                    .filter_map(|(k, v)| {
                        table.get(k).map(|w| (k.clone(), (v.clone(), (*w).clone())))
                    })
                    .collect()
            }),
        }
    }

    /// Left-outer hash join; unmatched left pairs carry `None`
    pub fn left_join<V2>(
        &self,
        other: &PairCollection<K, V2>,
    ) -> PairCollection<K, (V, Option<V2>)>
    where
        K: Hash + Eq,
        V2: Clone + Send + Sync,
    {
        let table: HashMap<&K, &V2> = other.iter().map(|(k, v)| (k, v)).collect();
        PairCollection {
            partitions: run_partitions(&self.partitions, |_, part| {
                part.iter()
                    .map(|(k, v)| {
                        let w = table.get(k).map(|w| (*w).clone());
                        (k.clone(), (v.clone(), w))
                    })
                    .collect()
            }),
        }
    }

    /// Shuffle by key, then merge all values per key with `merge`
    pub fn reduce_by_key<P, F>(self, num_partitions: usize, partitioner: P, merge: F) -> Self
    where
        K: Hash + Eq,
        P: Fn(&K) -> usize,
        F: Fn(V, V) -> V + Send + Sync,
    {
        let routed = self.repartition_by(num_partitions, |k, _| partitioner(k));
        Self {
            partitions: run_partitions(&routed.partitions, |_, part| {
                let mut merged: HashMap<K, V> = HashMap::new();
                for (k, v) in part.iter().cloned() {
                    match merged.remove(&k) {
                        Some(acc) => {
                            merged.insert(k, merge(acc, v));
                        }
                        None => {
                            merged.insert(k, v);
                        }
                    }
                }
                merged.into_iter().collect()
            }),
        }
    }

    /// Shuffle by key, then gather all values per key into one list
    pub fn group_by_key<P>(
        self,
        num_partitions: usize,
        partitioner: P,
    ) -> PairCollection<K, Vec<V>>
    where
        K: Hash + Eq,
        P: Fn(&K) -> usize,
    {
        let routed = self.repartition_by(num_partitions, |k, _| partitioner(k));
        PairCollection {
            partitions: run_partitions(&routed.partitions, |_, part| {
                let mut grouped: HashMap<K, Vec<V>> = HashMap::new();
                for (k, v) in part.iter().cloned() {
                    grouped.entry(k).or_default().push(v);
                }
                grouped.into_iter().collect()
            }),
        }
    }

    /// Merge two collections partition-wise
    pub fn union(mut self, other: Self) -> Self {
        while self.partitions.len() < other.partitions.len() {
            self.partitions.push(Vec::new());
        }
        for (i, part) in other.partitions.into_iter().enumerate() {
            self.partitions[i].extend(part);
        }
        self
    }
}

impl MatrixCollection {
    /// Build a block collection with the standard block-index partitioner
    pub fn from_blocks(blocks: Vec<(BlockIndex, MatrixBlock)>, num_partitions: usize) -> Self {
        let n = num_partitions.max(1);
        Self::from_pairs(blocks, n, |ix| partition_of(ix, n))
    }
}
