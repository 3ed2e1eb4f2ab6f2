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

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use crate::document::{Document, TopicCounts, TopicItem};
use crate::model::TopicId;
use crate::vocabulary::WordId;

/// A group of words that share one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub topic: TopicId,
    pub word_ids: Vec<WordId>,
}

impl TopicItem for Sentence {
    const WORD_GATES_DOC_DISCOUNT: bool = false;

    fn topic(&self) -> TopicId {
        self.topic
    }

    fn word_ids(&self) -> &[WordId] {
        &self.word_ids
    }
}

/// A document of sentences, used for SLDA inference.
#[derive(Debug, Clone)]
pub struct SentenceDocument {
    sentences: Vec<Sentence>,
    counts: TopicCounts,
}

impl SentenceDocument {
    pub fn new(num_topics: usize) -> Self {
        Self::with_capacity(num_topics, 0)
    }

    pub fn with_capacity(num_topics: usize, capacity: usize) -> Self {
        Self {
            sentences: Vec::with_capacity(capacity),
            counts: TopicCounts::new(num_topics),
        }
    }

    /// Appends a sentence with its initial topic.
    ///
    /// # Panics
    /// If `topic` is not a topic of this document.
    pub fn add_sentence(&mut self, topic: TopicId, word_ids: Vec<WordId>) {
        self.counts.add(topic);
        self.sentences.push(Sentence { topic, word_ids });
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }
}

impl Document for SentenceDocument {
    type Item = Sentence;

    fn items(&self) -> &[Sentence] {
        &self.sentences
    }

    fn counts(&self) -> &TopicCounts {
        &self.counts
    }

    fn set_topic(&mut self, index: usize, new_topic: TopicId) {
        let sentence = &mut self.sentences[index];
        self.counts.transfer(sentence.topic, new_topic);
        sentence.topic = new_topic;
    }

    fn accumulate(&mut self) {
        self.counts.accumulate()
    }
}

/// Splits a flat list of words into consecutive pseudo sentences of `words_per_sentence` words.
/// The last sentence holds the remainder. A size of 0 is treated as 1.
pub fn chunk_sentences<S>(words: impl IntoIterator<Item = S>, words_per_sentence: usize) -> Vec<Vec<S>> {
    words
        .into_iter()
        .chunks(words_per_sentence.max(1))
        .into_iter()
        .map(|chunk| chunk.collect())
        .collect()
}

#[cfg(test)]
mod test {
    use crate::document::{chunk_sentences, Document, SentenceDocument, TopicItem};

    #[test]
    fn sentences_count_once() {
        let mut doc = SentenceDocument::new(4);
        doc.add_sentence(3, vec![0, 1, 2]);
        doc.add_sentence(3, vec![5]);
        assert_eq!(2, doc.len());
        assert_eq!(2, doc.topic_sum(3));
        assert_eq!(&[0, 1, 2], doc.item(0).word_ids());

        doc.set_topic(0, 0);
        assert_eq!(1, doc.topic_sum(0));
        assert_eq!(1, doc.topic_sum(3));
        assert_eq!(0, doc.sentences()[0].topic());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn rejects_topic_out_of_range() {
        let mut doc = SentenceDocument::new(4);
        doc.add_sentence(4, vec![0]);
    }

    #[test]
    fn chunks_words() {
        let words = ["a", "b", "c", "d", "e", "f", "g"];
        let sentences = chunk_sentences(words, 3);
        assert_eq!(vec![vec!["a", "b", "c"], vec!["d", "e", "f"], vec!["g"]], sentences);
        assert_eq!(7, chunk_sentences(words, 0).len());
        assert!(chunk_sentences(Vec::<&str>::new(), 5).is_empty());
    }
}
