//Copyright 2024 Felix Engl
//
//Licensed under the Apache License, Version 2.0 (the "License");
//you may not use this file except in compliance with the License.
//You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
//Unless required by applicable law or agreed to in writing, software
//distributed under the License is distributed on an "AS IS" BASIS,
//WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//See the License for the specific language governing permissions and
//limitations under the License.

use std::collections::VecDeque;
use rand::Rng;

/// Vose's alias method, draws from a discrete distribution in constant time.
///
/// Building the table is linear in the number of outcomes.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    prob: Vec<f64>,
    alias: Vec<usize>,
}

impl AliasTable {
    /// Builds the table for the non-negative, unnormalized `weights`.
    ///
    /// If the weights do not sum up to a positive finite value the table falls back to
    /// a uniform distribution.
    pub fn new(weights: &[f64]) -> Self {
        let n = weights.len();
        let mut prob = vec![1.0; n];
        let mut alias: Vec<usize> = (0..n).collect();
        if n == 0 {
            return Self { prob, alias };
        }

        let sum: f64 = weights.iter().sum();
        if !sum.is_finite() || sum <= 0.0 {
            log::warn!("The alias table got the weight sum {sum} for {n} outcomes, falling back to uniform.");
            return Self { prob, alias };
        }

        let scale = n as f64 / sum;
        let mut scaled: Vec<f64> = weights.iter().map(|&w| w * scale).collect();

        let mut small = VecDeque::with_capacity(n);
        let mut large = VecDeque::with_capacity(n);
        for (i, &p) in scaled.iter().enumerate() {
            if p < 1.0 {
                small.push_back(i);
            } else {
                large.push_back(i);
            }
        }

        while let (Some(&l), Some(&g)) = (small.front(), large.front()) {
            small.pop_front();
            large.pop_front();
            prob[l] = scaled[l];
            alias[l] = g;
            scaled[g] = (scaled[g] + scaled[l]) - 1.0;
            if scaled[g] < 1.0 {
                small.push_back(g);
            } else {
                large.push_back(g);
            }
        }

        // numerical residue
        for i in small.into_iter().chain(large) {
            prob[i] = 1.0;
            alias[i] = i;
        }

        Self { prob, alias }
    }

    pub fn len(&self) -> usize {
        self.prob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prob.is_empty()
    }

    /// Draws an outcome, [None] if the table is empty.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let i = rng.random_range(0..self.len());
        let u: f64 = rng.random();
        if u <= self.prob[i] {
            Some(i)
        } else {
            Some(self.alias[i])
        }
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::sampler::alias::AliasTable;

    fn frequencies(table: &AliasTable, draws: usize, seed: u64) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut counts = vec![0usize; table.len()];
        for _ in 0..draws {
            counts[table.generate(&mut rng).unwrap()] += 1;
        }
        counts
    }

    fn chi_squared(weights: &[f64], counts: &[usize]) -> f64 {
        let total_weight: f64 = weights.iter().sum();
        let draws: usize = counts.iter().sum();
        weights.iter().zip(counts).map(|(&w, &observed)| {
            let expected = w / total_weight * draws as f64;
            let diff = observed as f64 - expected;
            diff * diff / expected
        }).sum()
    }

    #[test]
    fn matches_distribution() {
        let weights = [0.1, 0.2, 0.3, 0.4];
        let table = AliasTable::new(&weights);
        let counts = frequencies(&table, 200_000, 42);
        // 3 degrees of freedom, 99.9% quantile
        let statistic = chi_squared(&weights, &counts);
        assert!(statistic < 16.27, "chi squared {statistic} for {counts:?}");
    }

    #[test]
    fn matches_unnormalized_skewed_distribution() {
        let weights = [7.0, 0.5, 0.5, 1.0, 12.0, 3.0];
        let table = AliasTable::new(&weights);
        let counts = frequencies(&table, 150_000, 7);
        // 5 degrees of freedom, 99.9% quantile
        let statistic = chi_squared(&weights, &counts);
        assert!(statistic < 20.52, "chi squared {statistic} for {counts:?}");
    }

    #[test]
    fn never_draws_zero_weights() {
        let table = AliasTable::new(&[0.0, 1.0, 0.0, 3.0]);
        let counts = frequencies(&table, 10_000, 1);
        assert_eq!(0, counts[0]);
        assert_eq!(0, counts[2]);
    }

    #[test]
    fn degenerate_inputs() {
        let mut rng = StdRng::seed_from_u64(1);
        let empty = AliasTable::new(&[]);
        assert!(empty.is_empty());
        assert_eq!(None, empty.generate(&mut rng));

        let single = AliasTable::new(&[0.3]);
        assert_eq!(Some(0), single.generate(&mut rng));

        let zeros = AliasTable::new(&[0.0, 0.0, 0.0]);
        let counts = frequencies(&zeros, 3_000, 3);
        assert!(counts.iter().all(|&c| c > 0), "{counts:?}");
    }
}
