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

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use topicinfer_toolkit::from_str_ex::ParseEx;
use crate::enums::ReadError;
use crate::model::config::ModelConfig;
use crate::model::{TopicId, TopicModel};
use crate::vocabulary::{Vocabulary, WordId};

impl TopicModel {
    /// Loads the model described by the config file `conf_file` inside of `model_dir`.
    pub fn load_from_conf(model_dir: impl AsRef<Path>, conf_file: impl AsRef<Path>) -> Result<Self, ReadError> {
        let config = ModelConfig::load(model_dir.as_ref().join(conf_file))?;
        Self::load(model_dir, &config)
    }

    /// Loads the vocabulary and the word topic file named by `config` from `model_dir`.
    pub fn load(model_dir: impl AsRef<Path>, config: &ModelConfig) -> Result<Self, ReadError> {
        let word_topic_path = model_dir.as_ref().join(&config.word_topic_file);
        let vocab_path = model_dir.as_ref().join(&config.vocab_file);
        log::info!("Loading model: {}", word_topic_path.display());

        let vocabulary = Vocabulary::load_vocab_info(&vocab_path).map_err(|source| {
            ReadError::Vocabulary { path: vocab_path.clone(), source }
        })?;

        log::info!("Loading word topic from {}", word_topic_path.display());
        let file = File::open(&word_topic_path).map_err(|source| {
            ReadError::IO { path: word_topic_path.clone(), source }
        })?;
        let entries = Self::read_word_topic(BufReader::new(file))?;

        let model = Self::new(
            config.num_topics,
            config.alpha,
            config.beta,
            config.model_type,
            vocabulary,
            entries
        )?;
        log::info!(
            "Model Info: #num_topics = {} #vocab_size = {} alpha = {} beta = {}",
            model.num_topics(),
            model.vocab_size(),
            model.alpha(),
            model.beta()
        );
        Ok(model)
    }

    /// Reads the entries of a word topic file.
    ///
    /// Every line has the form `word_id topic_id:count topic_id:count ...`. Range and sign
    /// checks happen in [TopicModel::new].
    pub fn read_word_topic(reader: impl BufRead) -> Result<Vec<(WordId, TopicId, i64)>, ReadError> {
        let mut entries = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(word_id) = fields.next() else {
                continue
            };
            let word_id: WordId = word_id.parse_ex_tagged("term id").map_err(|err| {
                ReadError::ParseInt { line: line_no, position: 0, err }
            })?;
            for (position, field) in fields.enumerate().map(|(pos, field)| (pos + 1, field)) {
                let (topic_id, count) = field.split_once(':').ok_or(ReadError::WordTopicFormat {
                    line: line_no,
                    position,
                    reason: "Topic count format error! Expected topic_id:count."
                })?;
                let topic_id: TopicId = topic_id.parse_ex_tagged("topic id").map_err(|err| {
                    ReadError::ParseInt { line: line_no, position, err }
                })?;
                let count: i64 = count.parse_ex_tagged("count").map_err(|err| {
                    ReadError::ParseInt { line: line_no, position, err }
                })?;
                entries.push((word_id, topic_id, count));
            }
        }
        Ok(entries)
    }
}
