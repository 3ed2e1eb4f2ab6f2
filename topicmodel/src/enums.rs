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

use std::num::ParseIntError;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;
use topicinfer_toolkit::from_str_ex::ParseErrorEx;
use crate::model::config::ConfigError;
use crate::model::ModelError;
use crate::vocabulary::LoadVocabularyError;

/// The kind of model stored in a model directory. Both share the same storage format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Display, AsRefStr, EnumString, Serialize, Deserialize)]
pub enum ModelType {
    /// Latent Dirichlet Allocation, one topic per token.
    #[default]
    LDA,
    /// Sentence-LDA, one topic per sentence.
    SLDA
}

/// The sampling algorithm used by an inference engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Display, AsRefStr, EnumString, Serialize, Deserialize)]
pub enum SamplerType {
    #[strum(to_string = "GibbsSampling", serialize = "gibbs")]
    GibbsSampling,
    #[default]
    #[strum(to_string = "MetropolisHastings", serialize = "mh")]
    MetropolisHastings
}

/// The errors while reading a model directory
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{path}: {source}")]
    IO {
        path: PathBuf,
        #[source]
        source: std::io::Error
    },
    #[error(transparent)]
    Read(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Some kind of error in the vocabulary {path}")]
    Vocabulary {
        path: PathBuf,
        #[source]
        source: LoadVocabularyError
    },
    #[error("Model file format error at {line}:{position}: {reason}")]
    WordTopicFormat {
        line: usize,
        position: usize,
        reason: &'static str
    },
    #[error("Failed at {line}:{position} with {err}")]
    ParseInt {
        line: usize,
        position: usize,
        #[source]
        err: ParseErrorEx<ParseIntError>
    },
    #[error(transparent)]
    Model(#[from] ModelError),
}
