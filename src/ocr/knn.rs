/// Brute-force k-nearest-neighbor index over sample bitmaps
use rayon::prelude::*;

/// Neighbors consulted per lookup
pub const K: usize = 3;

#[derive(Debug, Clone)]
pub struct KnnIndex {
    dimension: usize,
    vectors: Vec<Vec<u8>>,
    labels: Vec<char>,
}

impl KnnIndex {
    /// Build from equally sized bitmaps; caller guarantees the sizes
    pub fn new(dimension: usize, entries: impl IntoIterator<Item = (char, Vec<u8>)>) -> Self {
        let (labels, vectors) = entries.into_iter().unzip();
        Self {
            dimension,
            vectors,
            labels,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Majority label among the `k` closest samples (squared Euclidean).
    ///
    /// Ties between labels go to the one owning the closest sample, and
    /// equal distances are ordered by insertion, so lookups are stable.
    pub fn nearest(&self, query: &[u8], k: usize) -> Option<char> {
        if query.len() != self.dimension || self.vectors.is_empty() || k == 0 {
            return None;
        }

        let mut distances: Vec<(u64, usize)> = self
            .vectors
            .par_iter()
            .enumerate()
            .map(|(index, vector)| (squared_distance(vector, query), index))
            .collect();
        distances.sort_unstable();
        distances.truncate(k);

        // (label, votes, rank of its closest sample)
        let mut tally: Vec<(char, usize, usize)> = Vec::with_capacity(k);
        for (rank, &(_, index)) in distances.iter().enumerate() {
            let label = self.labels[index];
            match tally.iter_mut().find(|(l, _, _)| *l == label) {
                Some(entry) => entry.1 += 1,
                None => tally.push((label, 1, rank)),
            }
        }

        tally
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
            .map(|(label, _, _)| label)
    }
}

fn squared_distance(a: &[u8], b: &[u8]) -> u64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as i64 - y as i64;
            (d * d) as u64
        })
        .sum()
}
