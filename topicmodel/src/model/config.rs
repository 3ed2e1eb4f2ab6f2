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

use std::collections::HashSet;
use std::fs;
use std::num::{ParseFloatError, ParseIntError};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag};
use nom::character::complete::{alpha1, alphanumeric1, char, space0};
use nom::combinator::{all_consuming, opt, recognize, rest};
use nom::multi::many0_count;
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated, tuple};
use nom::{Finish, IResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use topicinfer_toolkit::from_str_ex::{ParseErrorEx, ParseEx};
use crate::enums::ModelType;

/// Errors while reading a [ModelConfig].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Malformed config line {line}: {content:?}")]
    Malformed {
        line: usize,
        content: String
    },
    #[error("Unknown config key {key:?} in line {line}")]
    UnknownKey {
        line: usize,
        key: String
    },
    #[error("The config key {key:?} in line {line} was already set")]
    DuplicateKey {
        line: usize,
        key: String
    },
    #[error("The config key {0:?} is missing")]
    MissingKey(&'static str),
    #[error(transparent)]
    Int(#[from] ParseErrorEx<ParseIntError>),
    #[error(transparent)]
    Float(#[from] ParseErrorEx<ParseFloatError>),
    #[error(transparent)]
    ModelType(#[from] ParseErrorEx<strum::ParseError>),
}

/// Describes a model directory: the hyperparameters and where the model files are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// LDA or SLDA
    #[serde(rename = "type", default)]
    pub model_type: ModelType,
    pub num_topics: usize,
    pub alpha: f64,
    pub beta: f64,
    /// Relative to the model directory
    pub word_topic_file: PathBuf,
    /// Relative to the model directory
    pub vocab_file: PathBuf,
}

impl ModelConfig {
    /// Reads a config file. Files ending with `.json` are read as json, everything else in the
    /// `key: value` format.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        log::info!("Loading config: {}", path.as_ref().display());
        let content = fs::read_to_string(path.as_ref())?;
        if path.as_ref().extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            Ok(serde_json::from_str(&content)?)
        } else {
            content.parse()
        }
    }
}

fn key<'a, E: nom::error::ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, &'a str, E> {
    recognize(pair(alpha1, many0_count(alt((alphanumeric1, tag("_"))))))(s)
}

fn value<'a, E: nom::error::ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, &'a str, E> {
    alt((
        delimited(char('"'), is_not("\""), char('"')),
        is_not(" \t#\""),
    ))(s)
}

/// `key: value` with an optional trailing `# comment`.
fn parse_line<'a, E: nom::error::ParseError<&'a str>>(s: &'a str) -> IResult<&'a str, (&'a str, &'a str), E> {
    terminated(
        delimited(
            space0,
            separated_pair(key, tuple((space0, char(':'), space0)), value),
            space0,
        ),
        opt(preceded(char('#'), rest)),
    )(s)
}

impl FromStr for ModelConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut model_type = None;
        let mut num_topics = None;
        let mut alpha = None;
        let mut beta = None;
        let mut word_topic_file = None;
        let mut vocab_file = None;
        let mut seen = HashSet::new();

        for (line_no, line) in s.lines().enumerate() {
            let line_no = line_no + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (_, (key, value)) = all_consuming(parse_line::<nom::error::Error<&str>>)(trimmed)
                .finish()
                .map_err(|_| ConfigError::Malformed { line: line_no, content: line.to_string() })?;
            if !seen.insert(key) {
                return Err(ConfigError::DuplicateKey { line: line_no, key: key.to_string() });
            }
            match key {
                "type" => model_type = Some(value.parse_ex_tagged::<ModelType>("type")?),
                "num_topics" => num_topics = Some(value.parse_ex_tagged::<usize>("num_topics")?),
                "alpha" => alpha = Some(value.parse_ex_tagged::<f64>("alpha")?),
                "beta" => beta = Some(value.parse_ex_tagged::<f64>("beta")?),
                "word_topic_file" => word_topic_file = Some(PathBuf::from(value)),
                "vocab_file" => vocab_file = Some(PathBuf::from(value)),
                other => return Err(ConfigError::UnknownKey { line: line_no, key: other.to_string() }),
            }
        }

        Ok(Self {
            model_type: model_type.unwrap_or_default(),
            num_topics: num_topics.ok_or(ConfigError::MissingKey("num_topics"))?,
            alpha: alpha.ok_or(ConfigError::MissingKey("alpha"))?,
            beta: beta.ok_or(ConfigError::MissingKey("beta"))?,
            word_topic_file: word_topic_file.ok_or(ConfigError::MissingKey("word_topic_file"))?,
            vocab_file: vocab_file.ok_or(ConfigError::MissingKey("vocab_file"))?,
        })
    }
}
