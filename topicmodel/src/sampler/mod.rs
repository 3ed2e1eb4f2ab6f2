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

pub mod alias;
mod gibbs;
mod mh;

pub use gibbs::*;
pub use mh::*;
use rand::Rng;
use crate::document::{Document, TopicItem};
use crate::enums::SamplerType;
use crate::model::{TopicId, TopicModel};

/// Draws new topics for the items of a document.
///
/// The model is lent per call, a sampler does not own it.
pub trait Sampler {
    /// Draws a topic for the item at `index` without changing the document.
    fn sample_item<D: Document, R: Rng>(&self, model: &TopicModel, doc: &D, index: usize, rng: &mut R) -> TopicId;

    /// One full pass over the document, every item gets a newly drawn topic.
    fn sample_doc<D: Document, R: Rng>(&self, model: &TopicModel, doc: &mut D, rng: &mut R) {
        for index in 0..doc.len() {
            let topic = self.sample_item(model, doc, index, rng);
            doc.set_topic(index, topic);
        }
    }
}

/// The unnormalized collapsed Gibbs score of `topic_id` for `item`.
///
/// If `topic_id` is the current topic of `item` the own contribution is left out: for every
/// word with a count term greater than 1 the count term and the topic sum term lose 1, and
/// the document term loses 1 if it is greater than 1. For items with
/// [TopicItem::WORD_GATES_DOC_DISCOUNT] the document term is only reduced together with a
/// reduced word.
/// A token scores one factor, a sentence one factor per word.
pub fn proportional<D: Document>(model: &TopicModel, doc: &D, item: &D::Item, topic_id: TopicId) -> f64 {
    let leave_out = topic_id == item.topic();
    let topic_term = model.topic_sum(topic_id) as f64 + model.beta_sum();
    let mut word_discounted = false;
    let likelihood: f64 = item.word_ids().iter().map(|&word_id| {
        let mut word_term = model.word_topic(word_id, topic_id) as f64 + model.beta();
        let mut topic_term = topic_term;
        if leave_out && word_term > 1.0 {
            word_term -= 1.0;
            topic_term -= 1.0;
            word_discounted = true;
        }
        word_term / topic_term
    }).product();

    let doc_discount = if D::Item::WORD_GATES_DOC_DISCOUNT {
        word_discounted
    } else {
        leave_out
    };
    let mut doc_term = doc.topic_sum(topic_id) as f64 + model.alpha();
    if doc_discount && doc_term > 1.0 {
        doc_term -= 1.0;
    }
    doc_term * likelihood
}

/// One of the available samplers.
#[derive(Debug, Clone)]
pub enum SamplerKind {
    Gibbs(GibbsSampler),
    MetropolisHastings(MHSampler),
}

impl SamplerKind {
    /// Creates the sampler of `sampler_type` for `model`.
    pub fn new(sampler_type: SamplerType, model: &TopicModel) -> Self {
        match sampler_type {
            SamplerType::GibbsSampling => Self::Gibbs(GibbsSampler),
            SamplerType::MetropolisHastings => Self::MetropolisHastings(MHSampler::new(model)),
        }
    }

    pub fn sampler_type(&self) -> SamplerType {
        match self {
            SamplerKind::Gibbs(_) => SamplerType::GibbsSampling,
            SamplerKind::MetropolisHastings(_) => SamplerType::MetropolisHastings,
        }
    }
}

impl Sampler for SamplerKind {
    fn sample_item<D: Document, R: Rng>(&self, model: &TopicModel, doc: &D, index: usize, rng: &mut R) -> TopicId {
        match self {
            SamplerKind::Gibbs(sampler) => sampler.sample_item(model, doc, index, rng),
            SamplerKind::MetropolisHastings(sampler) => sampler.sample_item(model, doc, index, rng),
        }
    }
}
