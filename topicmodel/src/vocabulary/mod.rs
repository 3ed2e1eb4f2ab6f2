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

mod traits;

pub use traits::*;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufRead, BufReader};
use std::num::ParseIntError;
use std::ops::Range;
use std::path::Path;
use arcstr::ArcStr;
use itertools::Itertools;
use thiserror::Error;
use topicinfer_toolkit::from_str_ex::{ParseErrorEx, ParseEx};

pub type WordId = usize;
pub type EfficientStringVocabulary = Vocabulary<ArcStr>;

/// The minimum number of tab separated columns of a line in a vocab info file.
pub const MIN_VOCAB_COLUMNS: usize = 5;
const WORD_COLUMN: usize = 1;
const ID_COLUMN: usize = 2;

#[macro_export]
macro_rules! voc {
    () => {
        $crate::vocabulary::Vocabulary::default()
    };
    ($($value: expr),+ $(,)?) => {
        {
            let mut __voc = $crate::vocabulary::Vocabulary::default();
            $(
                $crate::vocabulary::VocabularyMut::add_value(&mut __voc, $value.into());
            )+
            __voc
        }
    };
}


/// A vocabulary mapping between an usize id and a specific object (word)
#[derive(Clone, Debug)]
pub struct Vocabulary<T> {
    id2entry: Vec<T>,
    entry2id: HashMap<T, WordId>,
}

impl<T> Default for Vocabulary<T> {
    fn default() -> Self {
        Self {
            id2entry: Vec::new(),
            entry2id: HashMap::new(),
        }
    }
}

impl<T> BasicVocabulary<T> for Vocabulary<T> {
    fn len(&self) -> usize {
        self.id2entry.len()
    }

    fn ids(&self) -> Range<WordId> {
        0..self.id2entry.len()
    }

    fn get_value_by_id(&self, id: WordId) -> Option<&T> {
        self.id2entry.get(id)
    }

    fn contains_id(&self, id: WordId) -> bool {
        self.id2entry.len() > id
    }
}

impl<T> SearchableVocabulary<T> for Vocabulary<T> where T: Eq + Hash {
    fn get_id<Q: ?Sized>(&self, value: &Q) -> Option<WordId>
    where
        T: Borrow<Q>,
        Q: Hash + Eq
    {
        self.entry2id.get(value).copied()
    }

    fn contains_value<Q: ?Sized>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq
    {
        self.entry2id.contains_key(value)
    }
}

impl<T> VocabularyMut<T> for Vocabulary<T> where T: Eq + Hash + Clone {
    fn add_value(&mut self, value: T) -> WordId {
        match self.entry2id.entry(value) {
            Entry::Occupied(entry) => {
                *entry.get()
            }
            Entry::Vacant(entry) => {
                let pos = self.id2entry.len();
                self.id2entry.push(entry.key().clone());
                entry.insert(pos);
                pos
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadVocabularyError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("line {line}: expected at least 5 tab separated columns but found {found}")]
    ColumnCount {
        line: usize,
        found: usize
    },
    #[error("line {line}: {source}")]
    Id {
        line: usize,
        #[source]
        source: ParseErrorEx<ParseIntError>
    },
    #[error("the id {id} of {word:?} is outside of the vocabulary of size {size}")]
    IdOutOfRange {
        word: ArcStr,
        id: WordId,
        size: usize
    },
    #[error("the id {id} is assigned to {first:?} and {second:?}")]
    DuplicateId {
        id: WordId,
        first: ArcStr,
        second: ArcStr
    }
}

impl Vocabulary<ArcStr> {
    /// Loads a vocab info file.
    ///
    /// Every line consists of at least [MIN_VOCAB_COLUMNS] tab separated columns, where the
    /// second one is the word and the third one its id. If a word occurs twice, the first
    /// occurrence wins. The ids have to cover `0..len` without gaps.
    pub fn load_vocab_info(path: impl AsRef<Path>) -> Result<Self, LoadVocabularyError> {
        log::info!("Loading vocab: {}", path.as_ref().display());
        let voc = Self::load_vocab_info_from(BufReader::new(File::open(path)?))?;
        log::info!("Load vocabulary success! #vocabulary size = {}", voc.len());
        Ok(voc)
    }

    /// Same as [Vocabulary::load_vocab_info] but reads from `reader`.
    pub fn load_vocab_info_from(reader: impl BufRead) -> Result<Self, LoadVocabularyError> {
        let mut entry2id: HashMap<ArcStr, WordId> = HashMap::new();
        let mut in_file_order: Vec<(ArcStr, WordId)> = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let columns = line.split('\t').collect_vec();
            if columns.len() < MIN_VOCAB_COLUMNS {
                return Err(LoadVocabularyError::ColumnCount { line: line_no + 1, found: columns.len() });
            }
            let word = ArcStr::from(columns[WORD_COLUMN]);
            let id: WordId = columns[ID_COLUMN]
                .trim()
                .parse_ex_tagged("id")
                .map_err(|source| LoadVocabularyError::Id { line: line_no + 1, source })?;
            match entry2id.entry(word) {
                Entry::Occupied(entry) => {
                    log::error!("Duplicate word [{}] in vocab file", entry.key());
                }
                Entry::Vacant(entry) => {
                    in_file_order.push((entry.key().clone(), id));
                    entry.insert(id);
                }
            }
        }

        let size = in_file_order.len();
        let mut slots: Vec<Option<ArcStr>> = vec![None; size];
        for (word, id) in in_file_order {
            match slots.get_mut(id) {
                None => {
                    return Err(LoadVocabularyError::IdOutOfRange { word, id, size });
                }
                Some(Some(first)) => {
                    return Err(LoadVocabularyError::DuplicateId { id, first: first.clone(), second: word });
                }
                Some(slot) => {
                    *slot = Some(word);
                }
            }
        }

        // size entries without a duplicate id fill every slot.
        let id2entry: Vec<ArcStr> = slots.into_iter().flatten().collect();
        Ok(Self { id2entry, entry2id })
    }
}
