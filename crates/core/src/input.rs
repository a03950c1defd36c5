//! Input decoding for the cumulative USSD text.
//!
//! Every round trip carries the whole dialogue so far, with one entry per
//! prior turn joined by `*` (e.g. `1*Jane Wanjiru*3`). The decoder turns that
//! into discrete entries, the latest entry, and the "input level".

use serde::{Deserialize, Serialize};

/// Separator between entries in the cumulative text.
pub const INPUT_DELIMITER: char = '*';

/// The decoded view of one cumulative input string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInput {
    /// Non-empty entries in the order the user typed them
    pub entries: Vec<String>,

    /// The last non-empty entry, or `""` if there is none
    pub latest: String,

    /// Number of non-empty entries
    pub level: usize,
}

impl DecodedInput {
    /// Whether `latest` is one of the given menu options.
    pub fn is_one_of(&self, options: &[&str]) -> bool {
        options.contains(&self.latest.as_str())
    }
}

/// Decode a cumulative input string.
///
/// Empty segments are dropped, so `""` and `"**"` both decode to level 0.
pub fn decode(text: &str) -> DecodedInput {
    let entries: Vec<String> = text
        .split(INPUT_DELIMITER)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    DecodedInput {
        latest: entries.last().cloned().unwrap_or_default(),
        level: entries.len(),
        entries,
    }
}
