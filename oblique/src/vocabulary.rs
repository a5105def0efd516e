//! Bidirectional map between surface forms and word identifiers.

use hashbrown::HashMap;

use crate::common::{WordId, NULL_SURFACE, NULL_WORD};
use crate::utils::FromU32;

/// Interner assigning dense [`WordId`]s to surface forms.
///
/// Identifier [`NULL_WORD`] is reserved for the synthetic NULL source word
/// and is present from construction. Both sides of a corpus share a single
/// vocabulary.
#[derive(Clone)]
pub struct Vocabulary {
    word2id: HashMap<String, WordId>,
    id2word: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    /// Creates a new vocabulary containing only the NULL word.
    pub fn new() -> Self {
        let mut word2id = HashMap::new();
        word2id.insert(NULL_SURFACE.to_string(), NULL_WORD);
        Self {
            word2id,
            id2word: vec![NULL_SURFACE.to_string()],
        }
    }

    /// Rebuilds a vocabulary from an ordered list of surfaces, as stored in
    /// a model file. The first surface must be the NULL word.
    pub fn from_surfaces(surfaces: Vec<String>) -> Self {
        debug_assert_eq!(surfaces.first().map(String::as_str), Some(NULL_SURFACE));
        let mut word2id = HashMap::with_capacity(surfaces.len());
        for (id, surface) in surfaces.iter().enumerate() {
            word2id.insert(surface.clone(), id as WordId);
        }
        Self {
            word2id,
            id2word: surfaces,
        }
    }

    /// Returns the identifier of `surface`, interning it if unseen.
    pub fn intern(&mut self, surface: &str) -> WordId {
        if let Some(&id) = self.word2id.get(surface) {
            return id;
        }
        let id = WordId::try_from(self.id2word.len()).unwrap();
        self.word2id.insert(surface.to_string(), id);
        self.id2word.push(surface.to_string());
        id
    }

    /// Returns the identifier of `surface` if it has been interned.
    #[inline(always)]
    pub fn get(&self, surface: &str) -> Option<WordId> {
        self.word2id.get(surface).copied()
    }

    /// Returns the surface form of `word`.
    ///
    /// # Panics
    ///
    /// Panics if `word` was not issued by this vocabulary.
    #[inline(always)]
    pub fn surface(&self, word: WordId) -> &str {
        &self.id2word[usize::from_u32(word)]
    }

    /// Returns the ordered list of interned surfaces.
    #[inline(always)]
    pub fn surfaces(&self) -> &[String] {
        &self.id2word
    }

    /// Returns the number of interned words, including the NULL word.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.id2word.len()
    }

    /// Checks if the vocabulary contains only the NULL word.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.id2word.len() == 1
    }
}
