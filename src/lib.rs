use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

pub mod report;
pub mod session;

/// Whitespace as players type it: Unicode white space except NEL (U+0085), which stays part of a name.
const SPACE: &str = r"[\s&&[^\x{85}]]";

lazy_static! {
    /// An ordinal list marker at the start of a line, like `12. `
    static ref ORDINAL_PREFIX: Regex = Regex::new(&format!(r"^{0}*[0-9]+\.{0}*", SPACE)).unwrap();
    /// Zero-width, bidirectional and other invisible formatting marks
    static ref INVISIBLE_MARKS: Regex =
        Regex::new(r"[\x{200B}-\x{200F}\x{202A}-\x{202E}\x{2060}-\x{206F}\x{FEFF}]").unwrap();
    /// A score like `21-15` or `7 - 3`
    static ref SCORE: Regex = Regex::new(&format!(r"[0-9]{{1,2}}{0}*-{0}*[0-9]{{1,2}}", SPACE)).unwrap();
}

fn is_space(c: char) -> bool {
    c.is_whitespace() && c != '\u{85}'
}

fn tokens(team: &str) -> Vec<&str> {
    team.split(is_space).filter(|token| !token.is_empty()).collect()
}

/// The ways a single non-empty line can fail to describe a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("Invalid format. Could not find a score (e.g., 21-15).")]
    MissingScore,
    #[error("Missing players on one or both teams.")]
    MissingPlayers,
}

/// A malformed line, identified by its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Line {line_number}: {kind}")]
pub struct ParseError {
    pub line_number: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// The message shown next to the line number
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// One line that split cleanly into two teams around a score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMatch<'a> {
    pub team1: Vec<&'a str>,
    pub team2: Vec<&'a str>,
    pub score: &'a str,
}

impl<'a> ParsedMatch<'a> {
    /// Every player on the line, team1 first.
    pub fn players(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.team1.iter().chain(self.team2.iter()).copied()
    }
}

/// Games played per player, iterated in the order players were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerTally {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl PlayerTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more game for `player`.
    pub fn record(&mut self, player: &str) {
        match self.index.get(player).copied() {
            Some(position) => self.entries[position].1 += 1,
            None => {
                self.index.insert(player.to_owned(), self.entries.len());
                self.entries.push((player.to_owned(), 1));
            }
        }
    }

    pub fn get(&self, player: &str) -> Option<usize> {
        self.index.get(player).map(|&position| self.entries[position].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts, i.e. the number of player slots across every parsed match.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.entries.iter().map(|(player, count)| (player.as_str(), *count))
    }
}

/// Output of one parse pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub tally: PlayerTally,
    /// In input line order
    pub errors: Vec<ParseError>,
}

/// Parser for game logs with one match per line, e.g. `1. Alice Bob 21-15 Carol Dave`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogParser;

impl LogParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse the whole log. Never fails: malformed lines are collected as errors and skipped.
    pub fn parse(&self, raw_text: &str) -> ParseResult {
        let mut result = ParseResult::default();
        let mut matches = 0;
        for (index, raw_line) in raw_text.split('\n').enumerate() {
            let line_number = index + 1;
            // Blank lines, and lines that are only a list marker or invisible marks, don't count
            let cleaned_line = match clean_line(raw_line) {
                Some(line) => line,
                None => {
                    trace!("line {}: empty, skipping", line_number);
                    continue;
                }
            };
            match parse_line(&cleaned_line) {
                Ok(parsed) => {
                    matches += 1;
                    for player in parsed.players() {
                        result.tally.record(player);
                    }
                }
                Err(kind) => {
                    let error = ParseError { line_number, kind };
                    debug!("{}", error);
                    result.errors.push(error);
                }
            }
        }
        debug!(
            "parsed {} matches: {} players, {} errors",
            matches,
            result.tally.len(),
            result.errors.len()
        );
        result
    }
}

/// Parse a game log with the default [`LogParser`].
pub fn parse(raw_text: &str) -> ParseResult {
    LogParser::new().parse(raw_text)
}

/// Strip the ordinal prefix and invisible marks from a line, then trim it.
/// Returns `None` if nothing is left.
pub fn clean_line(raw_line: &str) -> Option<String> {
    let without_prefix = ORDINAL_PREFIX.replace(raw_line, "");
    let visible = INVISIBLE_MARKS.replace_all(&without_prefix, "");
    let cleaned = visible.trim_matches(is_space);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_owned())
    }
}

/// Split an already cleaned line into two teams around the first score in it.
pub fn parse_line(line: &str) -> Result<ParsedMatch<'_>, ParseErrorKind> {
    let score = SCORE.find(line).ok_or(ParseErrorKind::MissingScore)?;
    let team1 = line[..score.start()].trim_matches(is_space);
    let team2 = line[score.end()..].trim_matches(is_space);
    if team1.is_empty() || team2.is_empty() {
        return Err(ParseErrorKind::MissingPlayers);
    }
    Ok(ParsedMatch {
        team1: tokens(team1),
        team2: tokens(team2),
        score: score.as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    fn counts(result: &ParseResult) -> HashMap<&str, usize> {
        result.tally.iter().collect()
    }

    #[test]
    fn test_single_match() {
        let result = parse("Alice Bob 21-15 Carol Dave");
        assert_eq!(counts(&result), hashmap! {"Alice" => 1, "Bob" => 1, "Carol" => 1, "Dave" => 1});
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let result = parse("");
        assert!(result.tally.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(result, ParseResult::default());
    }

    #[test]
    fn test_score_only_is_missing_players() {
        let result = parse("21-15");
        assert!(result.tally.is_empty());
        assert_eq!(
            result.errors,
            vec![ParseError {
                line_number: 1,
                kind: ParseErrorKind::MissingPlayers
            }]
        );
        assert_eq!(result.errors[0].to_string(), "Line 1: Missing players on one or both teams.");
    }

    #[test]
    fn test_one_sided_line_is_missing_players() {
        let result = parse("Alice Bob 21-15\n21-15 Carol");
        let kinds: Vec<_> = result.errors.iter().map(|e| (e.line_number, e.kind)).collect();
        assert_eq!(kinds, vec![(1, ParseErrorKind::MissingPlayers), (2, ParseErrorKind::MissingPlayers)]);
        assert!(result.tally.is_empty());
    }

    #[test]
    fn test_no_score_is_missing_score() {
        let result = parse("Alice Bob vs Carol");
        assert!(result.tally.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line_number, 1);
        assert_eq!(result.errors[0].kind, ParseErrorKind::MissingScore);
        assert_eq!(result.errors[0].message(), "Invalid format. Could not find a score (e.g., 21-15).");
    }

    #[test]
    fn test_ordinal_prefix_and_blank_lines() {
        let result = parse("1. Alice 10-8 Bob\n\n2. Carol 5-5 Dave");
        assert_eq!(counts(&result), hashmap! {"Alice" => 1, "Bob" => 1, "Carol" => 1, "Dave" => 1});
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_zero_width_space_is_stripped() {
        let result = parse("Alice\u{200B} 10-2 Bob");
        assert_eq!(counts(&result), hashmap! {"Alice" => 1, "Bob" => 1});
    }

    #[test]
    fn test_other_invisible_marks_are_stripped() {
        let result = parse("\u{FEFF}\u{202E}Alice 3-1 Bob\u{2060}\u{200F}");
        assert_eq!(counts(&result), hashmap! {"Alice" => 1, "Bob" => 1});
    }

    #[test]
    fn test_repeated_players_accumulate() {
        let result = parse("A B 1-0\nA C 2-1");
        assert_eq!(counts(&result), hashmap! {"A" => 2, "B" => 1, "C" => 1});
        let order: Vec<_> = result.tally.iter().map(|(player, _)| player).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let result = parse("alice 1-0 Alice");
        assert_eq!(result.tally.get("alice"), Some(1));
        assert_eq!(result.tally.get("Alice"), Some(1));
        assert_eq!(result.tally.get("ALICE"), None);
    }

    #[test]
    fn test_skipped_lines_produce_nothing() {
        let result = parse("   \n\t\n12. \n\u{200B}\u{200D}\n 3.\u{FEFF} ");
        assert_eq!(result, ParseResult::default());
    }

    #[test]
    fn test_errors_keep_line_order_and_good_lines_still_count() {
        let result = parse("no score here\nA 1-0 B\n\n21-15\nC 2 - 1 D");
        let kinds: Vec<_> = result.errors.iter().map(|e| (e.line_number, e.kind)).collect();
        assert_eq!(kinds, vec![(1, ParseErrorKind::MissingScore), (4, ParseErrorKind::MissingPlayers)]);
        assert_eq!(counts(&result), hashmap! {"A" => 1, "B" => 1, "C" => 1, "D" => 1});
    }

    #[test]
    fn test_next_line_char_is_part_of_a_name() {
        let result = parse("Alice\u{85}Bob 1-0 Carol\n\u{85}Dave 2 -\u{85}1 Erin");
        assert_eq!(counts(&result), hashmap! {"Alice\u{85}Bob" => 1, "Carol" => 1});
        // NEL is neither trimmed nor allowed around the score
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ParseErrorKind::MissingScore);
        assert_eq!(clean_line("\u{85}Dave 1-0 Erin\u{85}"), Some(String::from("\u{85}Dave 1-0 Erin\u{85}")));
    }

    #[test]
    fn test_other_unicode_spaces_separate_names() {
        let result = parse("Alice\u{A0}Bob\u{3000}1\u{2002}-\u{2002}0\u{2028}Carol");
        assert_eq!(counts(&result), hashmap! {"Alice" => 1, "Bob" => 1, "Carol" => 1});
    }

    #[test]
    fn test_first_score_wins() {
        let parsed = parse_line("Alice 21-15 Bob 3-2 Carol").unwrap();
        assert_eq!(parsed.team1, vec!["Alice"]);
        assert_eq!(parsed.team2, vec!["Bob", "3-2", "Carol"]);
        assert_eq!(parsed.score, "21-15");
    }

    #[test]
    fn test_spaced_score() {
        let parsed = parse_line("Alice   7 - 3   Bob Carol").unwrap();
        assert_eq!(parsed.score, "7 - 3");
        assert_eq!(parsed.players().collect::<Vec<_>>(), vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn test_long_numbers_match_leftmost_digits() {
        // Only two digits fit on each side, the rest stays in the team text
        let parsed = parse_line("Alice 121-150 Bob").unwrap();
        assert_eq!(parsed.score, "21-15");
        assert_eq!(parsed.team1, vec!["Alice", "1"]);
        assert_eq!(parsed.team2, vec!["0", "Bob"]);
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("  12.  Alice 1-0 Bob  "), Some(String::from("Alice 1-0 Bob")));
        assert_eq!(clean_line("Alice 1-0 Bob\r"), Some(String::from("Alice 1-0 Bob")));
        assert_eq!(clean_line("1.2.3 Alice"), Some(String::from("2.3 Alice")));
        assert_eq!(clean_line(" 7. "), None);
        assert_eq!(clean_line(""), None);
    }

    #[test]
    fn test_tally_total_matches_token_count() {
        let text = "1. A B C 21-19 D E\nF 3-0 G\nbroken line\nH I 5-5";
        let result = parse(text);
        // 5 + 2 tokens from the two good lines, the last line has an empty team2
        assert_eq!(result.tally.total(), 7);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = "1. Alice Bob 21-15 Carol Dave\nBob 3-1 Alice\n???\n";
        assert_eq!(parse(text), parse(text));
    }
}
