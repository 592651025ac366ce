//! Exchange format codec
//!
//! The backup file is a flat CSV document: one header row and one row per
//! training session. The same format is used for local export/import, so
//! it stays readable by spreadsheet tools.
//!
//! The format is lossy on purpose: local record ids are not written, dates
//! are truncated to whole seconds and only the first [`MAX_STEP_COLUMNS`]
//! step durations are kept.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::domain::{AnxietyScore, Step, TrainingSession};

/// Number of per-step duration columns
pub const MAX_STEP_COLUMNS: usize = 10;

/// Date layout used in the `Date` column (always UTC)
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FIXED_HEADERS: [&str; 7] = [
    "Date",
    "Total Duration (s)",
    "Completed Steps",
    "Total Steps",
    "Session Completed",
    "Anxiety Score",
    "Notes",
];

const NO_SCORE: &str = "N/A";

/// Written by some spreadsheet applications at the start of a CSV export
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Errors raised while encoding or decoding the exchange format
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Underlying CSV reader/writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The header row does not look like a PawSync export
    #[error("Unexpected header: {0}")]
    UnexpectedHeader(String),

    /// A cell could not be parsed
    #[error("Invalid value {value:?} in column '{column}' of row {row}")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
    },

    /// Writer output could not be turned into text
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Returns the 17 header names in column order
pub fn headers() -> Vec<String> {
    FIXED_HEADERS
        .iter()
        .map(|h| (*h).to_string())
        .chain((1..=MAX_STEP_COLUMNS).map(|i| format!("Step {i} Duration (s)")))
        .collect()
}

/// Encodes the full session set into CSV text
///
/// An empty set still produces the header row.
pub fn encode_sessions(sessions: &[TrainingSession]) -> Result<String, ExchangeError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers())?;

    for session in sessions {
        let mut row = vec![
            session.date.format(DATE_FORMAT).to_string(),
            session.total_duration_seconds.to_string(),
            session.completed_steps().to_string(),
            session.steps.len().to_string(),
            if session.completed { "Yes" } else { "No" }.to_string(),
            session
                .anxiety_score
                .map_or_else(|| NO_SCORE.to_string(), |s| s.label().to_string()),
            session.notes.clone().unwrap_or_default(),
        ];
        row.extend((0..MAX_STEP_COLUMNS).map(|i| {
            session
                .steps
                .get(i)
                .map(|s| s.duration_seconds.to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExchangeError::Encoding(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| ExchangeError::Encoding(e.to_string()))?;

    debug!(sessions = sessions.len(), bytes = text.len(), "Encoded sessions");
    Ok(text)
}

/// Decodes CSV text into a fresh session set
///
/// Empty or whitespace-only input and a header-only document both yield an
/// empty set. Every decoded session and step gets a new local id.
pub fn decode_sessions(content: &str) -> Result<Vec<TrainingSession>, ExchangeError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let header = reader.headers()?.clone();
    let first = header
        .get(0)
        .map(|h| h.trim_start_matches(BYTE_ORDER_MARK).trim());
    if header.len() < FIXED_HEADERS.len() || first != Some("Date") {
        return Err(ExchangeError::UnexpectedHeader(
            header.iter().collect::<Vec<_>>().join(","),
        ));
    }

    let mut sessions = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        // Header is row 1
        let row = index + 2;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        sessions.push(decode_row(&record, row)?);
    }

    debug!(sessions = sessions.len(), "Decoded sessions");
    Ok(sessions)
}

fn decode_row(record: &csv::StringRecord, row: usize) -> Result<TrainingSession, ExchangeError> {
    let cell = |i: usize| record.get(i).unwrap_or("").trim();

    let date_raw = cell(0);
    let date = parse_date(date_raw).ok_or_else(|| ExchangeError::InvalidField {
        row,
        column: FIXED_HEADERS[0],
        value: date_raw.to_string(),
    })?;

    let total_duration_seconds = parse_number(cell(1), row, FIXED_HEADERS[1])?;
    let completed_steps = parse_number(cell(2), row, FIXED_HEADERS[2])? as usize;

    let completed = cell(4).eq_ignore_ascii_case("yes");

    let anxiety_score = match cell(5) {
        "" | NO_SCORE => None,
        label => Some(
            label
                .parse::<AnxietyScore>()
                .map_err(|_| ExchangeError::InvalidField {
                    row,
                    column: FIXED_HEADERS[5],
                    value: label.to_string(),
                })?,
        ),
    };

    // Notes keep their inner whitespace; only an empty cell means "no notes"
    let notes = record
        .get(6)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let mut steps = Vec::new();
    for i in 0..MAX_STEP_COLUMNS {
        let raw = cell(FIXED_HEADERS.len() + i);
        if raw.is_empty() {
            continue;
        }
        let duration = parse_number(raw, row, "Step Duration (s)")?;
        steps.push(Step::new(duration, steps.len() < completed_steps));
    }

    let mut session = TrainingSession::new(date, steps);
    session.total_duration_seconds = total_duration_seconds;
    session.completed = completed;
    session.anxiety_score = anxiety_score;
    session.notes = notes;
    Ok(session)
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

fn parse_number(raw: &str, row: usize, column: &'static str) -> Result<u32, ExchangeError> {
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<u32>().map_err(|_| ExchangeError::InvalidField {
        row,
        column,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(notes: &str) -> TrainingSession {
        let date = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        let mut session = TrainingSession::new(
            date,
            vec![Step::new(30, true), Step::new(60, true), Step::new(480, true)],
        )
        .with_anxiety_score(AnxietyScore::Calm)
        .with_notes(notes);
        session.total_duration_seconds = 635;
        session
    }

    fn first_row(csv: &str) -> csv::StringRecord {
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        reader.records().next().unwrap().unwrap()
    }

    #[test]
    fn test_header_row_has_17_columns() {
        let csv = encode_sessions(&[]).unwrap();
        let header: Vec<&str> = csv.lines().next().unwrap().split(',').collect();
        assert_eq!(header.len(), 17);
        assert_eq!(header[0], "Date");
        assert_eq!(header[1], "Total Duration (s)");
        assert_eq!(header[5], "Anxiety Score");
        assert_eq!(header[6], "Notes");
        assert_eq!(header[7], "Step 1 Duration (s)");
        assert_eq!(header[16], "Step 10 Duration (s)");
    }

    #[test]
    fn test_anxiety_labels_are_written() {
        for (score, label) in [
            (Some(AnxietyScore::Calm), "Calm"),
            (Some(AnxietyScore::Coping), "Coping"),
            (Some(AnxietyScore::Panicking), "Panicking"),
            (None, "N/A"),
        ] {
            let mut session = sample("");
            session.anxiety_score = score;
            let row = first_row(&encode_sessions(&[session]).unwrap());
            assert_eq!(&row[5], label);
        }
    }

    #[test]
    fn test_quotes_in_notes_are_doubled() {
        let csv = encode_sessions(&[sample("He said \"good boy\"")]).unwrap();
        assert!(csv.contains("\"He said \"\"good boy\"\"\""));
    }

    #[test]
    fn test_empty_input_yields_empty_set() {
        assert!(decode_sessions("").unwrap().is_empty());
        assert!(decode_sessions("   \n ").unwrap().is_empty());
    }

    #[test]
    fn test_leading_byte_order_mark_is_accepted() {
        let csv = format!("\u{feff}{}", encode_sessions(&[sample("bom")]).unwrap());
        let restored = decode_sessions(&csv).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].notes.as_deref(), Some("bom"));
    }

    #[test]
    fn test_header_only_yields_empty_set() {
        let csv = encode_sessions(&[]).unwrap();
        assert!(decode_sessions(&csv).unwrap().is_empty());
    }

    #[test]
    fn test_decode_restores_session_fields() {
        let original = sample("Great session, very calm!");
        let restored = decode_sessions(&encode_sessions(&[original.clone()]).unwrap()).unwrap();
        assert_eq!(restored.len(), 1);
        let restored = &restored[0];

        assert_eq!(restored.date, original.date);
        assert_eq!(restored.total_duration_seconds, 635);
        assert!(restored.completed);
        assert_eq!(restored.anxiety_score, Some(AnxietyScore::Calm));
        assert_eq!(restored.notes.as_deref(), Some("Great session, very calm!"));
        let durations: Vec<u32> = restored.steps.iter().map(|s| s.duration_seconds).collect();
        assert_eq!(durations, vec![30, 60, 480]);
        assert_ne!(restored.id, original.id);
    }

    #[test]
    fn test_first_completed_steps_are_marked() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let session = TrainingSession::new(
            date,
            vec![Step::new(10, true), Step::new(20, false), Step::new(30, false)],
        );
        let restored = decode_sessions(&encode_sessions(&[session]).unwrap()).unwrap();
        let flags: Vec<bool> = restored[0].steps.iter().map(|s| s.completed).collect();
        assert_eq!(flags, vec![true, false, false]);
        assert!(!restored[0].completed);
    }

    #[test]
    fn test_steps_beyond_ten_are_truncated() {
        let steps = (1..=12).map(|i| Step::new(i * 10, true)).collect();
        let session = TrainingSession::new(Utc::now(), steps);
        let csv = encode_sessions(&[session]).unwrap();

        let row = first_row(&csv);
        assert_eq!(&row[3], "12");
        assert_eq!(row.len(), 17);

        let restored = decode_sessions(&csv).unwrap();
        assert_eq!(restored[0].steps.len(), MAX_STEP_COLUMNS);
    }

    #[test]
    fn test_multiple_sessions_keep_order() {
        let mut second = sample("");
        second.anxiety_score = Some(AnxietyScore::Panicking);
        second.steps = vec![Step::new(120, false)];
        let restored = decode_sessions(&encode_sessions(&[sample("a"), second]).unwrap()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[1].anxiety_score, Some(AnxietyScore::Panicking));
        assert_eq!(restored[1].steps[0].duration_seconds, 120);
        assert!(restored[1].notes.is_none());
    }

    #[test]
    fn test_foreign_header_is_rejected() {
        let err = decode_sessions("name,age\nrex,4\n").unwrap_err();
        assert!(matches!(err, ExchangeError::UnexpectedHeader(_)));
    }

    #[test]
    fn test_bad_number_reports_row_and_column() {
        let mut csv = headers().join(",");
        csv.push_str("\n2024-06-15 09:30:00,abc,0,0,No,N/A,,,,,,,,,,,\n");
        match decode_sessions(&csv).unwrap_err() {
            ExchangeError::InvalidField { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Total Duration (s)");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
