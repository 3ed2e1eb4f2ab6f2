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

use std::str::FromStr;
use sealed::sealed;
use thiserror::Error;

/// A parse error that remembers what was parsed and, optionally, which field it belonged to.
#[derive(Debug, Error)]
#[error("{}failed to parse {parse_target:?}: {source}", .tag.map(|v| format!("{v}: ")).unwrap_or_default())]
pub struct ParseErrorEx<E> {
    parse_target: String,
    tag: Option<&'static str>,
    #[source]
    source: E
}

impl<E> ParseErrorEx<E> {
    pub fn new(parse_target: impl Into<String>, tag: Option<&'static str>, source: E) -> Self {
        Self { parse_target: parse_target.into(), tag, source }
    }

    /// The text that failed to parse.
    pub fn parse_target(&self) -> &str {
        &self.parse_target
    }

    /// The name of the field, if the caller provided one.
    pub fn tag(&self) -> Option<&'static str> {
        self.tag
    }

    pub fn into_source(self) -> E {
        self.source
    }
}

/// Parsing with [ParseErrorEx] instead of the bare [FromStr::Err].
#[sealed]
pub trait ParseEx {
    fn parse_ex<F: FromStr>(&self) -> Result<F, ParseErrorEx<F::Err>>;
    fn parse_ex_tagged<F: FromStr>(&self, tag: &'static str) -> Result<F, ParseErrorEx<F::Err>>;
}

#[sealed]
impl ParseEx for str {
    fn parse_ex<F: FromStr>(&self) -> Result<F, ParseErrorEx<F::Err>> {
        self.parse().map_err(|err| ParseErrorEx::new(self, None, err))
    }

    fn parse_ex_tagged<F: FromStr>(&self, tag: &'static str) -> Result<F, ParseErrorEx<F::Err>> {
        self.parse().map_err(|err| ParseErrorEx::new(self, Some(tag), err))
    }
}
