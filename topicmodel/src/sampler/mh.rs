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

use rand::Rng;
use crate::document::{Document, TopicItem};
use crate::model::{TopicId, TopicModel, TopicTo, WordTo};
use crate::sampler::alias::AliasTable;
use crate::sampler::{proportional, Sampler};
use crate::vocabulary::WordId;

pub const DEFAULT_MH_STEPS: usize = 2;

/// Metropolis-Hastings sampling with alternating document and word proposals.
///
/// The word proposals are drawn from alias tables built once for the model passed to
/// [MHSampler::new], the sampler has to be used with that model.
#[derive(Debug, Clone)]
pub struct MHSampler {
    mh_steps: usize,
    alias_tables: WordTo<AliasTable>,
    topic_indexes: WordTo<TopicTo<TopicId>>,
    prob_sum: WordTo<f64>,
    beta_alias: AliasTable,
    beta_prior_sum: f64,
}

impl MHSampler {
    pub fn new(model: &TopicModel) -> Self {
        Self::with_mh_steps(model, DEFAULT_MH_STEPS)
    }

    pub fn with_mh_steps(model: &TopicModel, mh_steps: usize) -> Self {
        let vocab_size = model.vocab_size();
        let mut alias_tables = Vec::with_capacity(vocab_size);
        let mut topic_indexes = Vec::with_capacity(vocab_size);
        let mut prob_sum: WordTo<f64> = Vec::with_capacity(vocab_size);

        let mut weights = Vec::new();
        for word_id in 0..vocab_size {
            weights.clear();
            let row = model.word_topic_row(word_id);
            weights.extend(row.iter().map(|cell| {
                cell.count as f64 / (model.topic_sum(cell.topic_id) as f64 + model.beta_sum())
            }));
            prob_sum.push(weights.iter().sum());
            topic_indexes.push(row.iter().map(|cell| cell.topic_id).collect());
            alias_tables.push(AliasTable::new(&weights));
        }

        let beta_weights: TopicTo<f64> = model
            .topic_sums()
            .iter()
            .map(|&topic_sum| model.beta() / (topic_sum as f64 + model.beta_sum()))
            .collect();
        let beta_prior_sum = beta_weights.iter().sum();

        log::debug!("Built the alias tables for {vocab_size} words and {} topics.", model.num_topics());

        Self {
            mh_steps,
            alias_tables,
            topic_indexes,
            prob_sum,
            beta_alias: AliasTable::new(&beta_weights),
            beta_prior_sum,
        }
    }

    pub fn mh_steps(&self) -> usize {
        self.mh_steps
    }

    /// The summed word proposal weight of `word_id` without the prior.
    pub fn prob_sum(&self, word_id: WordId) -> f64 {
        self.prob_sum[word_id]
    }

    pub fn beta_prior_sum(&self) -> f64 {
        self.beta_prior_sum
    }

    /// Draws a topic from the word proposal of `word_id`.
    pub fn propose<R: Rng>(&self, word_id: WordId, rng: &mut R) -> TopicId {
        let prob_sum = self.prob_sum[word_id];
        let dart = rng.random::<f64>() * (prob_sum + self.beta_prior_sum);
        if dart < prob_sum {
            if let Some(slot) = self.alias_tables[word_id].generate(rng) {
                return self.topic_indexes[word_id][slot];
            }
        }
        // the prior table covers all topics of a model
        self.beta_alias.generate(rng).unwrap_or_default()
    }

    fn doc_proposal<D: Document, R: Rng>(
        &self,
        model: &TopicModel,
        doc: &D,
        item: &D::Item,
        current: TopicId,
        rng: &mut R,
    ) -> TopicId {
        let len = doc.len() as f64;
        let dart = rng.random::<f64>() * (len + model.alpha_sum());
        let proposed = if dart < len {
            doc.item(dart as usize).topic()
        } else {
            rng.random_range(0..model.num_topics())
        };
        if proposed == current {
            return current;
        }
        let density = |topic_id: TopicId| doc.topic_sum(topic_id) as f64 + model.alpha();
        if accept(
            rng,
            proportional(model, doc, item, current),
            proportional(model, doc, item, proposed),
            density(current),
            density(proposed),
        ) {
            proposed
        } else {
            current
        }
    }

    fn word_proposal<D: Document, R: Rng>(
        &self,
        model: &TopicModel,
        doc: &D,
        item: &D::Item,
        mut current: TopicId,
        rng: &mut R,
    ) -> TopicId {
        for &word_id in item.word_ids() {
            let proposed = self.propose(word_id, rng);
            if proposed == current {
                continue;
            }
            let density = |topic_id: TopicId| {
                (model.word_topic(word_id, topic_id) as f64 + model.beta())
                    / (model.topic_sum(topic_id) as f64 + model.beta_sum())
            };
            if accept(
                rng,
                proportional(model, doc, item, current),
                proportional(model, doc, item, proposed),
                density(current),
                density(proposed),
            ) {
                current = proposed;
            }
        }
        current
    }
}

fn accept<R: Rng>(rng: &mut R, score_old: f64, score_new: f64, proposal_old: f64, proposal_new: f64) -> bool {
    let transition = (score_new * proposal_old) / (score_old * proposal_new);
    rng.random::<f64>() < transition
}

impl Sampler for MHSampler {
    fn sample_item<D: Document, R: Rng>(&self, model: &TopicModel, doc: &D, index: usize, rng: &mut R) -> TopicId {
        let item = doc.item(index);
        let mut topic = item.topic();
        for _ in 0..self.mh_steps {
            topic = self.doc_proposal(model, doc, item, topic, rng);
            topic = self.word_proposal(model, doc, item, topic, rng);
        }
        topic
    }
}
