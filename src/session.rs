use crate::{parse, ParseResult};
use log::{debug, warn};

/// A copy of the input taken at some revision, safe to parse away from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub revision: u64,
    pub text: String,
}

impl Snapshot {
    pub fn parse(&self) -> ParseResult {
        parse(&self.text)
    }
}

/// Holds the text being edited and the result currently on display.
///
/// Every edit or reset bumps the revision. A result is only displayed if it was computed from a snapshot at least as
/// new as the one behind the result already on display, so a slow pass over old input can't replace a newer result.
#[derive(Debug, Default)]
pub struct Session {
    input: String,
    revision: u64,
    displayed: Option<(u64, ParseResult)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with pre-filled input, e.g. text restored on reload.
    pub fn with_input(text: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.set_input(text);
        session
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the input and take a snapshot of it.
    pub fn set_input(&mut self, text: impl Into<String>) -> Snapshot {
        self.input = text.into();
        self.revision += 1;
        Snapshot {
            revision: self.revision,
            text: self.input.clone(),
        }
    }

    /// Clear the input.
    pub fn reset(&mut self) -> Snapshot {
        debug!("resetting input at revision {}", self.revision);
        self.set_input(String::new())
    }

    /// Offer a finished result for display. Returns `false`, leaving the display alone, if a result from a newer
    /// snapshot is already showing.
    pub fn publish(&mut self, revision: u64, result: ParseResult) -> bool {
        if let Some((displayed_revision, _)) = &self.displayed {
            if revision < *displayed_revision {
                warn!("dropping stale result for revision {} (showing {})", revision, displayed_revision);
                return false;
            }
        }
        self.displayed = Some((revision, result));
        true
    }

    /// Parse the current input and display the result.
    pub fn refresh(&mut self) -> &ParseResult {
        // The current revision is never older than the one on display
        let result = parse(&self.input);
        &self.displayed.insert((self.revision, result)).1
    }

    /// The result on display, if any pass has been published yet.
    pub fn result(&self) -> Option<&ParseResult> {
        self.displayed.as_ref().map(|(_, result)| result)
    }

    /// Whether the result on display reflects the current input.
    pub fn is_current(&self) -> bool {
        matches!(&self.displayed, Some((revision, _)) if *revision == self.revision)
    }
}
