//! "TeamA x TeamB" query parsing shared by both sports

use crate::error::{BotError, Result};

/// The two sides named in a query, in the order given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamPair {
    pub home: String,
    pub away: String,
}

/// Split a query on the whole-word separators `x` / `vs` (case-insensitive,
/// `vs.` included). Exactly two non-empty names must remain.
pub fn parse_query(input: &str) -> Result<TeamPair> {
    let mut parts = Vec::new();
    let mut start = 0;

    for (word_start, word_end) in words(input) {
        if !is_separator(&input[word_start..word_end]) {
            continue;
        }
        parts.push(&input[start..word_start]);
        start = if input[word_end..].starts_with('.') {
            word_end + 1
        } else {
            word_end
        };
    }
    parts.push(&input[start..]);

    let names: Vec<&str> = parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    match names.as_slice() {
        [home, away] => Ok(TeamPair {
            home: home.to_string(),
            away: away.to_string(),
        }),
        [] | [_] => Err(BotError::Input("two team names are required".to_string())),
        more => Err(BotError::Input(format!(
            "only two teams can be compared, found {}",
            more.len()
        ))),
    }
}

fn is_separator(word: &str) -> bool {
    word.eq_ignore_ascii_case("x") || word.eq_ignore_ascii_case("vs")
}

/// Byte ranges of alphanumeric runs
fn words(input: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut current: Option<usize> = None;

    for (idx, ch) in input.char_indices() {
        match (ch.is_alphanumeric(), current) {
            (true, None) => current = Some(idx),
            (false, Some(begin)) => {
                spans.push((begin, idx));
                current = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = current {
        spans.push((begin, input.len()));
    }

    spans
}
