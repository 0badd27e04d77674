//! Output formatting utilities.

use objgraph_core::{RenumberOutcome, RenumberRecord, STREAM_NOTE};
use serde::Serialize;

/// Formats a report as pretty JSON.
pub fn format_json<T: Serialize + ?Sized>(report: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Text lines for one renumbering record.
pub fn renumber_lines(record: &RenumberRecord) -> Vec<String> {
    let mut lines = vec![format!(
        "input {} -> renumbered {}",
        record.original, record.renumbered
    )];
    match record.outcome {
        RenumberOutcome::Deleted => lines.push("deleted".to_string()),
        RenumberOutcome::Equivalent { streams_skipped }
        | RenumberOutcome::Different { streams_skipped } => {
            lines.extend(std::iter::repeat(STREAM_NOTE.to_string()).take(streams_skipped));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use objgraph_model::ObjGen;

    #[test]
    fn deleted_record() {
        let record = RenumberRecord {
            original: ObjGen::new(7, 0),
            renumbered: ObjGen::NONE,
            outcome: RenumberOutcome::Deleted,
        };
        assert_eq!(
            renumber_lines(&record),
            vec!["input 7/0 -> renumbered 0/0", "deleted"]
        );
    }

    #[test]
    fn stream_notes_follow_the_record() {
        let record = RenumberRecord {
            original: ObjGen::new(3, 0),
            renumbered: ObjGen::new(5, 0),
            outcome: RenumberOutcome::Equivalent { streams_skipped: 2 },
        };
        let lines = renumber_lines(&record);
        assert_eq!(lines[0], "input 3/0 -> renumbered 5/0");
        assert_eq!(&lines[1..], &[STREAM_NOTE, STREAM_NOTE]);
    }
}
