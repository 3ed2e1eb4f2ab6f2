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

use std::slice::from_ref;
use serde::{Deserialize, Serialize};
use crate::document::{Document, TopicCounts, TopicItem};
use crate::model::TopicId;
use crate::vocabulary::WordId;

/// A single word and its current topic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub topic: TopicId,
    pub word_id: WordId,
}

impl TopicItem for Token {
    const WORD_GATES_DOC_DISCOUNT: bool = true;

    fn topic(&self) -> TopicId {
        self.topic
    }

    fn word_ids(&self) -> &[WordId] {
        from_ref(&self.word_id)
    }
}

/// A bag of tokens, used for LDA inference.
#[derive(Debug, Clone)]
pub struct TokenDocument {
    tokens: Vec<Token>,
    counts: TopicCounts,
}

impl TokenDocument {
    pub fn new(num_topics: usize) -> Self {
        Self::with_capacity(num_topics, 0)
    }

    pub fn with_capacity(num_topics: usize, capacity: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(capacity),
            counts: TopicCounts::new(num_topics),
        }
    }

    /// Appends a token with its initial topic.
    ///
    /// # Panics
    /// If `topic` is not a topic of this document.
    pub fn add_token(&mut self, topic: TopicId, word_id: WordId) {
        self.counts.add(topic);
        self.tokens.push(Token { topic, word_id });
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl Document for TokenDocument {
    type Item = Token;

    fn items(&self) -> &[Token] {
        &self.tokens
    }

    fn counts(&self) -> &TopicCounts {
        &self.counts
    }

    fn set_topic(&mut self, index: usize, new_topic: TopicId) {
        let token = &mut self.tokens[index];
        self.counts.transfer(token.topic, new_topic);
        token.topic = new_topic;
    }

    fn accumulate(&mut self) {
        self.counts.accumulate()
    }
}
