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
use crate::document::Document;
use crate::model::{TopicId, TopicModel};
use crate::sampler::{proportional, Sampler};

/// Collapsed Gibbs sampling, scores every topic for every item.
#[derive(Debug, Copy, Clone, Default)]
pub struct GibbsSampler;

impl Sampler for GibbsSampler {
    fn sample_item<D: Document, R: Rng>(&self, model: &TopicModel, doc: &D, index: usize, rng: &mut R) -> TopicId {
        let item = doc.item(index);
        let mut total = 0.0;
        let cumulative: Vec<f64> = model
            .topic_ids()
            .map(|topic_id| {
                total += proportional(model, doc, item, topic_id);
                total
            })
            .collect();
        let dart = rng.random::<f64>() * total;
        cumulative
            .partition_point(|&accum| accum <= dart)
            .min(model.num_topics() - 1)
    }
}
