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

use std::path::Path;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::document::{Document, SentenceDocument, TokenDocument};
use crate::enums::{ModelType, ReadError, SamplerType};
use crate::model::TopicModel;
use crate::sampler::{Sampler, SamplerKind};

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum InferenceError {
    #[error("The number of iterations has to be greater than 0!")]
    NoIterations,
    #[error("The burn in of {burn_in_iter} iterations has to be shorter than the {total_iter} total iterations!")]
    BurnInTooLong {
        burn_in_iter: usize,
        total_iter: usize
    }
}

/// A validated number of burn in and total iterations.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IterationSchedule {
    burn_in_iter: usize,
    total_iter: usize,
}

impl IterationSchedule {
    pub fn new(burn_in_iter: usize, total_iter: usize) -> Result<Self, InferenceError> {
        if total_iter == 0 {
            Err(InferenceError::NoIterations)
        } else if burn_in_iter >= total_iter {
            Err(InferenceError::BurnInTooLong { burn_in_iter, total_iter })
        } else {
            Ok(Self { burn_in_iter, total_iter })
        }
    }

    pub fn burn_in_iter(&self) -> usize {
        self.burn_in_iter
    }

    pub fn total_iter(&self) -> usize {
        self.total_iter
    }

    /// The number of iterations that are accumulated.
    pub fn accumulated_iter(&self) -> usize {
        self.total_iter - self.burn_in_iter
    }
}

/// The settings of an [InferenceEngine].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub burn_in_iter: usize,
    pub total_iter: usize,
    /// Every inference call starts a new random generator with this seed.
    pub seed: u64,
}

impl InferenceConfig {
    pub const DEFAULT_BURN_IN_ITER: usize = 20;
    pub const DEFAULT_TOTAL_ITER: usize = 50;
    pub const DEFAULT_SEED: u64 = 2147483647;

    pub fn schedule(&self) -> Result<IterationSchedule, InferenceError> {
        IterationSchedule::new(self.burn_in_iter, self.total_iter)
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            burn_in_iter: Self::DEFAULT_BURN_IN_ITER,
            total_iter: Self::DEFAULT_TOTAL_ITER,
            seed: Self::DEFAULT_SEED,
        }
    }
}

/// Infers the topic distribution of documents with a pretrained model.
///
/// The engine is immutable, every call works on its own document and random generator,
/// so one engine can be shared between threads.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    model: TopicModel,
    sampler: SamplerKind,
    config: InferenceConfig,
    schedule: IterationSchedule,
}

impl InferenceEngine {
    pub fn new(model: TopicModel, sampler_type: SamplerType) -> Self {
        let sampler = SamplerKind::new(sampler_type, &model);
        Self {
            model,
            sampler,
            config: InferenceConfig::default(),
            schedule: IterationSchedule {
                burn_in_iter: InferenceConfig::DEFAULT_BURN_IN_ITER,
                total_iter: InferenceConfig::DEFAULT_TOTAL_ITER,
            },
        }
    }

    /// Replaces the config, fails if the iterations are illegal.
    pub fn with_config(mut self, config: InferenceConfig) -> Result<Self, InferenceError> {
        self.schedule = config.schedule()?;
        self.config = config;
        Ok(self)
    }

    /// Loads the model described by `conf_file` in `model_dir`.
    pub fn load(
        model_dir: impl AsRef<Path>,
        conf_file: impl AsRef<Path>,
        sampler_type: SamplerType,
    ) -> Result<Self, ReadError> {
        let model = TopicModel::load_from_conf(model_dir, conf_file)?;
        log::info!("Using {sampler_type} for the {} model.", model.model_type());
        Ok(Self::new(model, sampler_type))
    }

    pub fn model(&self) -> &TopicModel {
        &self.model
    }

    delegate::delegate! {
        to self.model {
            pub fn model_type(&self) -> ModelType;
            pub fn num_topics(&self) -> usize;
        }
    }

    pub fn sampler_type(&self) -> SamplerType {
        self.sampler.sampler_type()
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    fn new_rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.config.seed)
    }

    /// Infers the topics of a tokenized document, one topic per word.
    pub fn infer_tokens<I: AsRef<str>>(&self, words: impl IntoIterator<Item = I>) -> TokenDocument {
        self.infer_tokens_with_rng(words, &mut self.new_rng())
    }

    pub fn infer_tokens_with_rng<I: AsRef<str>, R: Rng>(
        &self,
        words: impl IntoIterator<Item = I>,
        rng: &mut R,
    ) -> TokenDocument {
        let num_topics = self.model.num_topics();
        let mut doc = TokenDocument::new(num_topics);
        let mut seen = 0usize;
        for word in words {
            seen += 1;
            if let Some(word_id) = self.model.term_id(word.as_ref()) {
                doc.add_token(rng.random_range(0..num_topics), word_id);
            }
        }
        log::debug!("Inferring {} tokens, {} of {seen} words are out of vocabulary.", doc.len(), seen - doc.len());
        self.run(&mut doc, self.schedule, rng);
        doc
    }

    /// Infers the topics of a document of sentences, one topic per sentence.
    /// Sentences without any known word are dropped.
    pub fn infer_sentences<S, I>(&self, sentences: impl IntoIterator<Item = S>) -> SentenceDocument
    where
        S: IntoIterator<Item = I>,
        I: AsRef<str>,
    {
        self.infer_sentences_with_rng(sentences, &mut self.new_rng())
    }

    pub fn infer_sentences_with_rng<S, I, R>(
        &self,
        sentences: impl IntoIterator<Item = S>,
        rng: &mut R,
    ) -> SentenceDocument
    where
        S: IntoIterator<Item = I>,
        I: AsRef<str>,
        R: Rng,
    {
        let num_topics = self.model.num_topics();
        let mut doc = SentenceDocument::new(num_topics);
        let mut seen = 0usize;
        for sentence in sentences {
            seen += 1;
            let word_ids: Vec<_> = sentence
                .into_iter()
                .filter_map(|word| self.model.term_id(word.as_ref()))
                .collect();
            if !word_ids.is_empty() {
                doc.add_sentence(rng.random_range(0..num_topics), word_ids);
            }
        }
        log::debug!("Inferring {} sentences, dropped {} without known words.", doc.len(), seen - doc.len());
        self.run(&mut doc, self.schedule, rng);
        doc
    }

    /// Samples `doc` for the total iterations of `schedule` and accumulates the topic counts
    /// after the burn in.
    pub fn run<D: Document, R: Rng>(&self, doc: &mut D, schedule: IterationSchedule, rng: &mut R) {
        for iter in 0..schedule.total_iter {
            self.sampler.sample_doc(&self.model, doc, rng);
            if iter >= schedule.burn_in_iter {
                doc.accumulate();
            }
        }
        log::trace!("Finished {} iterations for a document of {} items.", schedule.total_iter, doc.len());
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::thread;
    use approx::assert_relative_eq;
    use itertools::Itertools;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::document::{chunk_sentences, Document};
    use crate::enums::{ModelType, SamplerType};
    use crate::inference::{InferenceConfig, InferenceEngine, InferenceError, IterationSchedule};
    use crate::model::test::{create_four_topic_model, create_test_model, create_test_model_of_type};

    const SAMPLERS: [SamplerType; 2] = [SamplerType::GibbsSampling, SamplerType::MetropolisHastings];

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn long_run() -> InferenceConfig {
        InferenceConfig { burn_in_iter: 20, total_iter: 60, ..InferenceConfig::default() }
    }

    #[test]
    fn validates_schedule() {
        assert_eq!(Err(InferenceError::NoIterations), IterationSchedule::new(0, 0));
        assert_eq!(
            Err(InferenceError::BurnInTooLong { burn_in_iter: 5, total_iter: 5 }),
            IterationSchedule::new(5, 5)
        );
        assert_eq!(10, IterationSchedule::new(0, 10).unwrap().accumulated_iter());

        let engine = InferenceEngine::new(create_test_model(), SamplerType::GibbsSampling);
        let bad = InferenceConfig { burn_in_iter: 60, total_iter: 20, seed: 1 };
        assert!(engine.with_config(bad).is_err());
    }

    #[test]
    fn config_defaults() {
        let config: InferenceConfig = serde_json::from_str(r#"{"seed": 7}"#).unwrap();
        assert_eq!(20, config.burn_in_iter);
        assert_eq!(50, config.total_iter);
        assert_eq!(7, config.seed);
        assert_eq!(2147483647, InferenceConfig::default().seed);
    }

    #[test]
    fn favours_the_dominant_topic() {
        init_logger();
        for sampler_type in SAMPLERS {
            let engine = InferenceEngine::new(create_test_model(), sampler_type)
                .with_config(long_run())
                .unwrap();
            assert_eq!(sampler_type, engine.sampler_type());
            let doc = engine.infer_tokens(["a", "a", "a"]);
            let dense = doc.dense_topic_dist();
            assert_eq!(2, dense.len());
            assert!(dense[0] > 0.8, "{sampler_type}: {dense:?}");
            let sparse = doc.sparse_topic_dist();
            assert_eq!(0, sparse[0].id);
        }
    }

    #[test]
    fn distributions_are_normalized() {
        init_logger();
        let words = (0..40).map(|i| format!("w{}", (i * 7) % 9)).collect_vec();
        for sampler_type in SAMPLERS {
            let engine = InferenceEngine::new(create_four_topic_model(), sampler_type);
            let doc = engine.infer_tokens(&words);
            let dense = doc.dense_topic_dist();
            assert_eq!(4, dense.len());
            assert!(dense.iter().all(|&p| p >= 0.0));
            assert_relative_eq!(1.0, dense.iter().sum::<f64>(), epsilon = 1e-4);

            let sparse = doc.sparse_topic_dist();
            assert!(sparse.iter().all(|t| t.probability > 0.0));
            assert!(sparse.iter().tuple_windows().all(|(a, b)| a.probability >= b.probability));
            assert_relative_eq!(1.0, sparse.iter().map(|t| t.probability).sum::<f64>(), epsilon = 1e-4);
        }
    }

    #[test]
    fn is_deterministic() {
        for sampler_type in SAMPLERS {
            let engine = InferenceEngine::new(create_four_topic_model(), sampler_type);
            let words = ["w0", "w4", "w1", "unknown", "w0", "w5", "w2"];
            let first = engine.infer_tokens(words).dense_topic_dist();
            let _ = engine.infer_tokens(["w3", "w7"]);
            let second = engine.infer_tokens(words).dense_topic_dist();
            assert_eq!(first, second);

            let mut rng = StdRng::seed_from_u64(InferenceConfig::DEFAULT_SEED);
            let explicit = engine.infer_tokens_with_rng(words, &mut rng).dense_topic_dist();
            assert_eq!(first, explicit);
        }
    }

    #[test]
    fn concurrent_calls_agree() {
        for sampler_type in SAMPLERS {
            let engine = InferenceEngine::new(create_four_topic_model(), sampler_type);
            let words = ["w1", "w5", "w5", "w2", "w6", "w0"];
            let (left, right) = thread::scope(|scope| {
                let left = scope.spawn(|| engine.infer_tokens(words).dense_topic_dist());
                let right = scope.spawn(|| engine.infer_tokens(words).dense_topic_dist());
                (left.join().unwrap(), right.join().unwrap())
            });
            assert_eq!(left, right);
        }
    }

    #[test]
    fn out_of_vocabulary_documents_are_empty() {
        let engine = InferenceEngine::new(create_test_model(), SamplerType::MetropolisHastings);
        let doc = engine.infer_tokens(["x", "y"]);
        assert!(doc.is_empty());
        assert!(doc.sparse_topic_dist().is_empty());
        assert_eq!(vec![0.0, 0.0], doc.dense_topic_dist());

        let doc = engine.infer_sentences([vec!["x"], vec!["a", "y"]]);
        assert_eq!(1, doc.len());
        assert_eq!(vec![0], doc.sentences()[0].word_ids);
    }

    #[test]
    fn infers_sentences() {
        init_logger();
        for sampler_type in SAMPLERS {
            let engine = InferenceEngine::new(create_test_model_of_type(ModelType::SLDA), sampler_type)
                .with_config(long_run())
                .unwrap();
            assert_eq!(ModelType::SLDA, engine.model_type());
            let words = ["b", "b", "a", "b", "b", "b", "b", "b", "a", "b"];
            let doc = engine.infer_sentences(chunk_sentences(words, 5));
            assert_eq!(2, doc.len());
            let dense = doc.dense_topic_dist();
            assert!(dense[1] > 0.8, "{sampler_type}: {dense:?}");
            assert_eq!(doc.len(), (0..engine.num_topics()).map(|t| doc.topic_sum(t)).sum::<usize>());
        }
    }

    #[test]
    fn loads_from_a_model_directory() {
        init_logger();
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("vocab_info.txt"), "0\ta\t0\t0\t0\n0\tb\t1\t0\t0\n").unwrap();
        fs::write(dir.path().join("model.txt"), "0 0:8 1:1\n1 1:8 0:1\n").unwrap();
        fs::write(
            dir.path().join("slda.conf"),
            "type: SLDA\nnum_topics: 2\nalpha: 0.1\nbeta: 0.01\nword_topic_file: \"model.txt\"\nvocab_file: \"vocab_info.txt\"\n"
        ).unwrap();

        let engine = InferenceEngine::load(dir.path(), "slda.conf", SamplerType::GibbsSampling).unwrap();
        assert_eq!(ModelType::SLDA, engine.model_type());
        assert_eq!(SamplerType::GibbsSampling, engine.sampler_type());
        assert_eq!(2, engine.model().vocab_size());
        assert_eq!(&InferenceConfig::default(), engine.config());

        assert!(InferenceEngine::load(dir.path(), "missing.conf", SamplerType::MetropolisHastings).is_err());
    }
}
