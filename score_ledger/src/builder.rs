pub use crate::config::*;
use crate::AccumulatedState;

/// A builder for recording scores without going through sheets.
///
/// The same rules apply as when reading period files: the first name seen for an
/// identifier is kept, and a later score for the same period replaces the earlier one.
///
/// ```
/// use score_ledger::builder::Builder;
/// use score_ledger::ColumnNames;
///
/// let state = Builder::new()
///     .add_score("S1", "100", Some("Anna"), 50.0)
///     .add_score("S2", "100", Some("Ann"), 20.0)
///     .add_score("S2", "101", None, 30.0)
///     .build();
///
/// let table = state.build_summary(&ColumnNames::default());
/// assert_eq!(table.rows[0].participant.display_name.as_deref(), Some("Anna"));
/// assert_eq!(table.rows[0].total, 70.0);
/// assert_eq!(table.rows[1].scores, vec![0.0, 30.0]);
/// ```
pub struct Builder {
    pub(crate) _state: AccumulatedState,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _state: AccumulatedState::new(),
        }
    }

    pub fn add_score(self, period: &str, id: &str, name: Option<&str>, score: f64) -> Builder {
        self.add_entry(
            &PeriodLabel(period.to_string()),
            Participant {
                id: id.to_string(),
                display_name: name.map(|s| s.to_string()),
                contact: None,
            },
            score,
        )
    }

    /// Adds a score, with the full identity of the participant.
    pub fn add_entry(mut self, period: &PeriodLabel, participant: Participant, score: f64) -> Builder {
        self._state.add_score(participant, period, score);
        self
    }

    pub fn build(self) -> AccumulatedState {
        self._state
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}
