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

use std::borrow::Borrow;
use std::hash::Hash;
use std::ops::Range;
use crate::vocabulary::WordId;

/// A basic vocabulary, maps dense ids to words.
pub trait BasicVocabulary<T> {
    /// The number of entries in the vocabulary
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the ids
    fn ids(&self) -> Range<WordId>;

    /// Get the word for a specific `id` or none
    fn get_value_by_id(&self, id: WordId) -> Option<&T>;

    /// Check if the `id` is contained in this
    fn contains_id(&self, id: WordId) -> bool;
}

/// Allows to search a vocabulary by a query
pub trait SearchableVocabulary<T>: BasicVocabulary<T> where T: Eq + Hash {

    /// Retrieves the id for `q`, [None] means out of vocabulary.
    fn get_id<Q: ?Sized>(&self, q: &Q) -> Option<WordId>
    where
        T: Borrow<Q>,
        Q: Hash + Eq;

    fn contains_value<Q: ?Sized>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq;
}

/// A vocabulary that can be modified
pub trait VocabularyMut<T>: SearchableVocabulary<T> where T: Eq + Hash + Clone {
    /// Adds the `value` to the vocabulary and returns the associated id
    fn add_value(&mut self, value: T) -> WordId;

    /// Adds any `value` that can be converted into `T`
    fn add<V: Into<T>>(&mut self, value: V) -> WordId {
        self.add_value(value.into())
    }
}
