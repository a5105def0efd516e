//! Common settings in Oblique.
use bincode::config::{self, Fixint, LittleEndian};

/// Identifier of a word interned in a [`Vocabulary`](crate::Vocabulary).
pub type WordId = u32;

/// Reserved identifier of the synthetic NULL source word.
pub const NULL_WORD: WordId = 0;

/// Surface form of the NULL source word.
pub const NULL_SURFACE: &str = "<eps>";

/// Gets the common bincode configuration of serialization.
pub const fn bincode_config() -> config::Configuration<LittleEndian, Fixint> {
    config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
        .write_fixed_array_length()
}
