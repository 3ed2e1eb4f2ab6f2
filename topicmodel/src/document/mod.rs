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

mod token;
mod sentence;

pub use token::*;
pub use sentence::*;
use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use crate::model::{Probability, TopicId, TopicTo};
use crate::vocabulary::WordId;

/// A topic and its probability in a document.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub probability: Probability,
}

impl Display for Topic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.id, self.probability)
    }
}

/// The per topic bookkeeping of a document under inference.
///
/// `topic_sum[t]` is the number of items currently assigned to `t`, so the sum over all
/// topics always equals the number of items. `accum_topic_sum` collects `topic_sum` after
/// every accumulated iteration and is what the distributions are computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCounts {
    topic_sum: TopicTo<usize>,
    accum_topic_sum: TopicTo<u64>,
}

impl TopicCounts {
    pub fn new(num_topics: usize) -> Self {
        Self {
            topic_sum: vec![0; num_topics],
            accum_topic_sum: vec![0; num_topics],
        }
    }

    pub fn num_topics(&self) -> usize {
        self.topic_sum.len()
    }

    pub fn topic_sum(&self, topic_id: TopicId) -> usize {
        self.topic_sum[topic_id]
    }

    pub fn topic_sums(&self) -> &[usize] {
        &self.topic_sum
    }

    pub fn accum_topic_sums(&self) -> &[u64] {
        &self.accum_topic_sum
    }

    fn check_topic(&self, topic_id: TopicId) {
        assert!(
            topic_id < self.num_topics(),
            "Topic {topic_id} out of range! The document has {} topics.",
            self.num_topics()
        );
    }

    /// Counts a new item with `topic_id`.
    pub(crate) fn add(&mut self, topic_id: TopicId) {
        self.check_topic(topic_id);
        self.topic_sum[topic_id] += 1;
    }

    /// Moves one item from `old_topic` to `new_topic`.
    pub(crate) fn transfer(&mut self, old_topic: TopicId, new_topic: TopicId) {
        self.check_topic(new_topic);
        if old_topic == new_topic {
            return;
        }
        self.topic_sum[old_topic] -= 1;
        self.topic_sum[new_topic] += 1;
    }

    pub fn accumulate(&mut self) {
        for (accum, &current) in self.accum_topic_sum.iter_mut().zip(self.topic_sum.iter()) {
            *accum += current as u64;
        }
    }

    fn accum_total(&self) -> u64 {
        self.accum_topic_sum.iter().sum()
    }

    /// The accumulated topics with a non-zero share, most probable first.
    /// Empty if nothing was accumulated.
    pub fn sparse_topic_dist(&self) -> Vec<Topic> {
        let total = self.accum_total();
        if total == 0 {
            return Vec::new();
        }
        let mut topics: Vec<Topic> = self.accum_topic_sum
            .iter()
            .enumerate()
            .filter(|(_, &accum)| accum > 0)
            .map(|(id, &accum)| Topic { id, probability: accum as f64 / total as f64 })
            .collect();
        topics.sort_by(|a, b| b.probability.total_cmp(&a.probability).then(a.id.cmp(&b.id)));
        topics
    }

    /// The accumulated distribution over all topics, all zero if nothing was accumulated.
    pub fn dense_topic_dist(&self) -> TopicTo<Probability> {
        let total = self.accum_total();
        if total == 0 {
            return vec![0.0; self.num_topics()];
        }
        self.accum_topic_sum.iter().map(|&accum| accum as f64 / total as f64).collect()
    }
}

/// Something in a document that carries exactly one topic.
pub trait TopicItem {
    /// Whether leaving the item out of its own topic reduces the document count only
    /// if one of its word counts was reduced.
    const WORD_GATES_DOC_DISCOUNT: bool;

    fn topic(&self) -> TopicId;

    /// The words scored together under [TopicItem::topic].
    fn word_ids(&self) -> &[WordId];
}

/// A document under inference.
pub trait Document {
    type Item: TopicItem;

    fn items(&self) -> &[Self::Item];

    fn counts(&self) -> &TopicCounts;

    /// Assigns `new_topic` to the item at `index` and updates the topic counts.
    /// Does nothing if the topic does not change.
    ///
    /// # Panics
    /// If `new_topic` is not a topic of this document.
    fn set_topic(&mut self, index: usize, new_topic: TopicId);

    /// Adds the current topic counts to the accumulated ones.
    fn accumulate(&mut self);

    fn item(&self, index: usize) -> &Self::Item {
        &self.items()[index]
    }

    fn len(&self) -> usize {
        self.items().len()
    }

    fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    fn num_topics(&self) -> usize {
        self.counts().num_topics()
    }

    fn topic_sum(&self, topic_id: TopicId) -> usize {
        self.counts().topic_sum(topic_id)
    }

    fn sparse_topic_dist(&self) -> Vec<Topic> {
        self.counts().sparse_topic_dist()
    }

    fn dense_topic_dist(&self) -> TopicTo<Probability> {
        self.counts().dense_topic_dist()
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::document::{Topic, TopicCounts};

    #[test]
    fn transfer_keeps_the_total() {
        let mut counts = TopicCounts::new(3);
        counts.add(0);
        counts.add(0);
        counts.add(2);
        counts.transfer(0, 1);
        assert_eq!(&[1, 1, 1], counts.topic_sums());
        counts.transfer(1, 1);
        assert_eq!(&[1, 1, 1], counts.topic_sums());
        assert_eq!(3usize, counts.topic_sums().iter().sum::<usize>());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn rejects_unknown_topics() {
        let mut counts = TopicCounts::new(2);
        counts.add(2);
    }

    #[test]
    fn empty_accumulation_is_degenerate() {
        let mut counts = TopicCounts::new(4);
        counts.add(1);
        assert!(counts.sparse_topic_dist().is_empty());
        assert_eq!(vec![0.0; 4], counts.dense_topic_dist());
    }

    #[test]
    fn distributions_follow_accumulation() {
        let mut counts = TopicCounts::new(4);
        counts.add(1);
        counts.add(1);
        counts.add(3);
        counts.accumulate();
        counts.transfer(1, 0);
        counts.accumulate();
        assert_eq!(&[1, 3, 0, 2], counts.accum_topic_sums());

        let dense = counts.dense_topic_dist();
        assert_eq!(4, dense.len());
        assert_relative_eq!(1.0, dense.iter().sum::<f64>(), epsilon = 1e-9);
        assert_relative_eq!(0.5, dense[1]);

        let sparse = counts.sparse_topic_dist();
        assert_eq!(vec![1, 3, 0], sparse.iter().map(|t| t.id).collect::<Vec<_>>());
        assert!(sparse.windows(2).all(|w| w[0].probability >= w[1].probability));
        assert_relative_eq!(1.0, sparse.iter().map(|t| t.probability).sum::<f64>(), epsilon = 1e-9);
    }

    #[test]
    fn ties_are_ordered_by_id() {
        let mut counts = TopicCounts::new(3);
        counts.add(2);
        counts.add(0);
        counts.accumulate();
        let sparse = counts.sparse_topic_dist();
        assert_eq!(vec![0, 2], sparse.iter().map(|t| t.id).collect::<Vec<_>>());
        assert_eq!("0:0.5", Topic { id: 0, probability: 0.5 }.to_string());
    }
}
