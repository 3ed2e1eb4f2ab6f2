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

pub mod config;
mod classic_serialisation;

use std::cmp::Reverse;
use std::fmt::{Display, Formatter};
use std::io;
use std::io::Write;
use std::ops::Range;
use arcstr::ArcStr;
use itertools::Itertools;
use thiserror::Error;
use crate::enums::ModelType;
use crate::vocabulary::{BasicVocabulary, EfficientStringVocabulary, SearchableVocabulary, WordId};

pub type TopicTo<T> = Vec<T>;
pub type WordTo<T> = Vec<T>;
pub type Probability = f64;
pub type TopicId = usize;
pub type Count = u64;

/// One non-zero cell of the word-topic matrix.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TopicCount {
    pub topic_id: TopicId,
    pub count: Count,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("A topic model needs at least one topic!")]
    NoTopics,
    #[error("The hyperparameter {name} has the value {value} which is illegal!")]
    IllegalHyperparameter {
        name: &'static str,
        value: f64
    },
    #[error("Term id {word_id} out of range! The vocabulary has {vocab_size} entries.")]
    WordOutOfRange {
        word_id: WordId,
        vocab_size: usize
    },
    #[error("Topic {topic_id} of term {word_id} out of range! The model has {num_topics} topics.")]
    TopicOutOfRange {
        word_id: WordId,
        topic_id: TopicId,
        num_topics: usize
    },
    #[error("Topic count error! Term {word_id} has the count {count} for topic {topic_id}.")]
    NonPositiveCount {
        word_id: WordId,
        topic_id: TopicId,
        count: i64
    }
}

/// A pretrained topic model as used for inference.
///
/// The word-topic counts are stored sparse: every word keeps only the topics it was
/// assigned to during training, sorted by the topic id. `topic_sum` is the column sum of
/// that matrix. LDA and Sentence-LDA share this layout.
///
/// The model is never modified after construction.
#[derive(Debug, Clone)]
pub struct TopicModel {
    word_topic: WordTo<Vec<TopicCount>>,
    topic_sum: TopicTo<Count>,
    vocabulary: EfficientStringVocabulary,
    num_topics: usize,
    alpha: f64,
    alpha_sum: f64,
    beta: f64,
    beta_sum: f64,
    model_type: ModelType,
}

impl TopicModel {
    /// Builds a model from `(word_id, topic_id, count)` entries.
    ///
    /// Entries of the same word and topic are summed up. Fails if any id is out of range,
    /// any count is not positive or the hyperparameters are not positive and finite.
    pub fn new(
        num_topics: usize,
        alpha: f64,
        beta: f64,
        model_type: ModelType,
        vocabulary: EfficientStringVocabulary,
        entries: impl IntoIterator<Item=(WordId, TopicId, i64)>,
    ) -> Result<Self, ModelError> {
        if num_topics == 0 {
            return Err(ModelError::NoTopics);
        }
        for (name, value) in [("alpha", alpha), ("beta", beta)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ModelError::IllegalHyperparameter { name, value });
            }
        }

        let vocab_size = vocabulary.len();
        let mut word_topic: WordTo<Vec<TopicCount>> = vec![Vec::new(); vocab_size];
        let mut topic_sum: TopicTo<Count> = vec![0; num_topics];

        for (word_id, topic_id, count) in entries {
            let row = word_topic
                .get_mut(word_id)
                .ok_or(ModelError::WordOutOfRange { word_id, vocab_size })?;
            if topic_id >= num_topics {
                return Err(ModelError::TopicOutOfRange { word_id, topic_id, num_topics });
            }
            if count <= 0 {
                return Err(ModelError::NonPositiveCount { word_id, topic_id, count });
            }
            let count = count as Count;
            row.push(TopicCount { topic_id, count });
            topic_sum[topic_id] += count;
        }

        for row in word_topic.iter_mut() {
            row.sort_unstable();
            row.dedup_by(|current, previous| {
                if current.topic_id == previous.topic_id {
                    previous.count += current.count;
                    true
                } else {
                    false
                }
            });
            row.shrink_to_fit();
        }

        Ok(Self {
            word_topic,
            topic_sum,
            vocabulary,
            num_topics,
            alpha,
            alpha_sum: alpha * num_topics as f64,
            beta,
            beta_sum: beta * vocab_size as f64,
            model_type,
        })
    }

    /// The id of `word`, [None] if it is out of vocabulary.
    pub fn term_id(&self, word: &str) -> Option<WordId> {
        self.vocabulary.get_id(word)
    }

    /// The count of `word_id` in `topic_id`, 0 if the pair was never observed.
    pub fn word_topic(&self, word_id: WordId, topic_id: TopicId) -> Count {
        let row = self.word_topic_row(word_id);
        row.binary_search_by_key(&topic_id, |entry| entry.topic_id)
            .map_or(0, |pos| row[pos].count)
    }

    /// All non-zero topic counts of `word_id`, sorted by topic id.
    pub fn word_topic_row(&self, word_id: WordId) -> &[TopicCount] {
        self.word_topic.get(word_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn topic_sum(&self, topic_id: TopicId) -> Count {
        self.topic_sum[topic_id]
    }

    pub fn topic_sums(&self) -> &[Count] {
        &self.topic_sum
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn topic_ids(&self) -> Range<TopicId> {
        0..self.num_topics
    }

    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_sum(&self) -> f64 {
        self.alpha_sum
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn beta_sum(&self) -> f64 {
        self.beta_sum
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn vocabulary(&self) -> &EfficientStringVocabulary {
        &self.vocabulary
    }

    /// The `k` words with the highest share of `topic_id`, best first.
    /// Returns [None] if the topic does not exist.
    pub fn top_words(&self, topic_id: TopicId, k: usize) -> Option<Vec<(&ArcStr, Probability)>> {
        const EPS: f64 = 1e-8;
        let topic_sum = *self.topic_sum.get(topic_id)? as f64;
        Some(
            self.vocabulary
                .ids()
                .filter_map(|word_id| {
                    match self.word_topic(word_id, topic_id) {
                        0 => None,
                        count => Some((word_id, count))
                    }
                })
                .sorted_by_key(|&(word_id, count)| (Reverse(count), word_id))
                .take(k)
                .filter_map(|(word_id, count)| {
                    self.vocabulary
                        .get_value_by_id(word_id)
                        .map(|word| (word, count as f64 / (topic_sum + EPS)))
                })
                .collect()
        )
    }

    /// Writes the `k` best words of `topic_id` as `word\tprobability` lines.
    pub fn show_topic_to(&self, out: &mut impl Write, topic_id: TopicId, k: usize) -> io::Result<()> {
        match self.top_words(topic_id, k) {
            None => {
                writeln!(out, "{topic_id} is illegal")
            }
            Some(words) => {
                for (word, probability) in words {
                    writeln!(out, "{word}\t{probability}")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for TopicModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TopicModel({}): #num_topics = {} #vocab_size = {} alpha = {} beta = {}",
            self.model_type,
            self.num_topics,
            self.vocab_size(),
            self.alpha,
            self.beta
        )
    }
}


#[cfg(test)]
pub mod test {
    use arcstr::ArcStr;
    use crate::enums::ModelType;
    use crate::model::{ModelError, TopicCount, TopicModel};
    use crate::vocabulary::Vocabulary;
    use crate::voc;

    /// Two topics, "a" belongs to topic 0 and "b" to topic 1.
    pub fn create_test_model() -> TopicModel {
        create_test_model_of_type(ModelType::LDA)
    }

    pub fn create_test_model_of_type(model_type: ModelType) -> TopicModel {
        let voc: Vocabulary<ArcStr> = voc!["a", "b"];
        TopicModel::new(
            2,
            0.1,
            0.01,
            model_type,
            voc,
            vec![
                (0, 0, 8),
                (0, 1, 1),
                (1, 0, 1),
                (1, 1, 8),
            ]
        ).unwrap()
    }

    /// A bigger model, word `i` prefers topic `i % 4`, "rare" was never counted.
    pub fn create_four_topic_model() -> TopicModel {
        let voc: Vocabulary<ArcStr> = voc!["w0", "w1", "w2", "w3", "w4", "w5", "w6", "w7", "rare"];
        let mut entries = Vec::new();
        for word_id in 0..8usize {
            entries.push((word_id, word_id % 4, 20));
            entries.push((word_id, (word_id + 1) % 4, 2));
        }
        TopicModel::new(4, 0.1, 0.01, ModelType::LDA, voc, entries).unwrap()
    }

    #[test]
    fn computes_sums_and_hyperparameters() {
        let model = create_test_model();
        assert_eq!(2, model.num_topics());
        assert_eq!(2, model.vocab_size());
        assert_eq!(9, model.topic_sum(0));
        assert_eq!(9, model.topic_sum(1));
        approx::assert_relative_eq!(0.2, model.alpha_sum());
        approx::assert_relative_eq!(0.02, model.beta_sum());
    }

    #[test]
    fn topic_sum_is_column_sum() {
        let model = create_four_topic_model();
        for topic_id in model.topic_ids() {
            let column: u64 = (0..model.vocab_size()).map(|w| model.word_topic(w, topic_id)).sum();
            assert_eq!(column, model.topic_sum(topic_id));
        }
    }

    #[test]
    fn sparse_lookup() {
        let model = create_four_topic_model();
        assert_eq!(20, model.word_topic(5, 1));
        assert_eq!(2, model.word_topic(5, 2));
        assert_eq!(0, model.word_topic(5, 3));
        assert_eq!(0, model.word_topic(8, 0));
        assert!(model.word_topic_row(8).is_empty());
        assert_eq!(Some(1), model.term_id("w1"));
        assert_eq!(None, model.term_id("nope"));
    }

    #[test]
    fn rows_are_sorted_and_merged() {
        let voc: Vocabulary<ArcStr> = voc!["x"];
        let model = TopicModel::new(3, 0.1, 0.01, ModelType::LDA, voc, vec![(0, 2, 1), (0, 0, 4), (0, 2, 3)]).unwrap();
        assert_eq!(
            &[TopicCount { topic_id: 0, count: 4 }, TopicCount { topic_id: 2, count: 4 }],
            model.word_topic_row(0)
        );
        assert_eq!(4, model.topic_sum(2));
    }

    #[test]
    fn rejects_illegal_input() {
        let build = |num_topics, alpha, entries: Vec<(usize, usize, i64)>| {
            let voc: Vocabulary<ArcStr> = voc!["x", "y"];
            TopicModel::new(num_topics, alpha, 0.01, ModelType::LDA, voc, entries)
        };
        assert!(matches!(build(0, 0.1, vec![]), Err(ModelError::NoTopics)));
        assert!(matches!(build(2, -1.0, vec![]), Err(ModelError::IllegalHyperparameter { name: "alpha", .. })));
        assert!(matches!(build(2, 0.1, vec![(2, 0, 1)]), Err(ModelError::WordOutOfRange { word_id: 2, .. })));
        assert!(matches!(build(2, 0.1, vec![(0, 2, 1)]), Err(ModelError::TopicOutOfRange { topic_id: 2, .. })));
        assert!(matches!(build(2, 0.1, vec![(0, 1, 0)]), Err(ModelError::NonPositiveCount { count: 0, .. })));
        assert!(matches!(build(2, 0.1, vec![(0, 1, -3)]), Err(ModelError::NonPositiveCount { count: -3, .. })));
    }

    #[test]
    fn shows_top_words() {
        let model = create_four_topic_model();
        let top = model.top_words(1, 3).unwrap();
        assert_eq!(3, top.len());
        assert_eq!("w1", top[0].0.as_str());
        assert_eq!("w5", top[1].0.as_str());
        assert_eq!("w0", top[2].0.as_str());
        assert!(top[0].1 >= top[1].1 && top[1].1 >= top[2].1);
        assert!(model.top_words(4, 3).is_none());

        let mut out = Vec::new();
        model.show_topic_to(&mut out, 1, 2).unwrap();
        let shown = String::from_utf8(out).unwrap();
        assert_eq!(2, shown.lines().count());
        assert!(shown.starts_with("w1\t"));
    }
}
