//! CSV persistence for the split ledger.
//!
//! ```text
//! Date,Symbol,Ratio,Problems,Usable flag,Last update
//! 06/09/2014,AAPL,7,05/06/2014;two sources disagree,false,06/10/2014
//! ```
//!
//! `Problems` holds alternating `date;text` pairs joined with `;`.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::path::Path;

use super::event::{SplitEvent, SplitProblem};
use crate::error::{MarketDataError, Result};

/// Expected header row.
pub const HEADER: [&str; 6] = [
    "Date",
    "Symbol",
    "Ratio",
    "Problems",
    "Usable flag",
    "Last update",
];

/// Day format used in every date column.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

pub(super) fn read_events(path: &Path) -> Result<Vec<SplitEvent>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_path(path)?;

    let headers = reader.headers()?;
    if headers.iter().ne(HEADER) {
        return Err(MarketDataError::invalid_argument(format!(
            "splits database header mismatch in {}: expected \"{}\", got \"{}\"",
            path.display(),
            HEADER.join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut events = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let event = parse_row(&record).map_err(|e| {
            // Header is line 1.
            MarketDataError::invalid_argument(format!(
                "{} line {}: {e}",
                path.display(),
                index + 2
            ))
        })?;
        events.push(event);
    }
    Ok(events)
}

pub(super) fn write_events<'a>(
    path: &Path,
    events: impl Iterator<Item = &'a SplitEvent>,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(MarketDataError::invalid_argument(format!(
                "parent directory of the path given does not exist: {}",
                path.display()
            )));
        }
    }

    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(HEADER)?;
    for event in events {
        writer.write_record([
            format_date(event.date),
            event.symbol.clone(),
            format_ratio(event.ratio),
            format_problems(&event.problems),
            event.usable.to_string(),
            format_date(event.last_update),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Ratio with at least one fractional digit (`7.0`, `0.5`).
fn format_ratio(ratio: f64) -> String {
    format!("{ratio:?}")
}

fn parse_row(record: &StringRecord) -> Result<SplitEvent> {
    let [date, symbol, ratio, problems, usable, last_update] = fields(record)?;

    let ratio: f64 = ratio.trim().parse().map_err(|_| {
        MarketDataError::invalid_argument(format!("failed to parse split ratio \"{ratio}\""))
    })?;

    let mut event = SplitEvent::new(parse_date(date)?, symbol, ratio)?
        .with_usable(parse_bool(usable)?)
        .with_last_update(parse_date(last_update)?);
    event.problems = parse_problems(problems)?;
    Ok(event)
}

fn fields(record: &StringRecord) -> Result<[&str; 6]> {
    let fields: Vec<&str> = record.iter().collect();
    <[&str; 6]>::try_from(fields).map_err(|fields| {
        MarketDataError::invalid_argument(format!(
            "splits database rows must have exactly 6 fields, got {} in \"{}\"",
            fields.len(),
            fields.join(",")
        ))
    })
}

/// Parse a `MM/DD/YYYY` day.
///
/// # Errors
///
/// Returns `InvalidArgument` if the text is not a valid day.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|e| {
        MarketDataError::invalid_argument(format!("failed to parse date \"{text}\": {e}"))
    })
}

/// Format a day as `MM/DD/YYYY`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_bool(text: &str) -> Result<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(MarketDataError::invalid_argument(format!(
            "failed to parse usable flag \"{text}\""
        ))),
    }
}

/// Parse alternating `date;text` pairs.
///
/// # Errors
///
/// Returns `InvalidArgument` on an odd number of values or a bad date.
pub fn parse_problems(text: &str) -> Result<Vec<SplitProblem>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let parts: Vec<&str> = text.split(';').collect();
    if parts.len() % 2 != 0 {
        return Err(MarketDataError::invalid_argument(format!(
            "failed to parse problems field, uneven number of values in \"{text}\""
        )));
    }

    parts
        .chunks_exact(2)
        .map(|pair| -> Result<SplitProblem> {
            Ok(SplitProblem::new(parse_date(pair[0])?, pair[1].trim()))
        })
        .collect()
}

/// Join problems as `date;text` pairs. Separators inside the text become `|`.
#[must_use]
pub fn format_problems(problems: &[SplitProblem]) -> String {
    problems
        .iter()
        .map(|problem| {
            format!(
                "{};{}",
                format_date(problem.date),
                problem.text.replace([';', ','], "|")
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dates_use_month_first() {
        assert_eq!(parse_date("06/09/2014").unwrap(), day(2014, 6, 9));
        assert_eq!(parse_date(" 6/9/2014 ").unwrap(), day(2014, 6, 9));
        assert_eq!(format_date(day(2014, 6, 9)), "06/09/2014");
        assert!(parse_date("2014-06-09").is_err());
    }

    #[test]
    fn problems_parse_in_pairs() {
        let problems = parse_problems("05/06/2014;first; 05/07/2014 ; second ").unwrap();

        assert_eq!(
            problems,
            vec![
                SplitProblem::new(day(2014, 5, 6), "first"),
                SplitProblem::new(day(2014, 5, 7), "second"),
            ]
        );
        assert!(parse_problems("").unwrap().is_empty());
    }

    #[test]
    fn odd_problem_count_is_rejected() {
        assert!(matches!(
            parse_problems("05/06/2014;first;05/07/2014"),
            Err(MarketDataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn separators_in_problem_text_are_replaced() {
        let problems = vec![SplitProblem::new(day(2014, 5, 6), "a;b,c")];

        assert_eq!(format_problems(&problems), "05/06/2014;a|b|c");
    }

    #[test]
    fn row_must_have_six_fields() {
        let record = StringRecord::from(vec!["06/09/2014", "AAPL", "7"]);

        assert!(matches!(
            parse_row(&record),
            Err(MarketDataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn row_parses_every_column() {
        let record = StringRecord::from(vec![
            "06/09/2014",
            "AAPL",
            "7.0",
            "06/10/2014;late report",
            "FALSE",
            "06/10/2014",
        ]);

        let event = parse_row(&record).unwrap();

        assert_eq!(event.date, day(2014, 6, 9));
        assert!((event.ratio - 7.0).abs() < f64::EPSILON);
        assert!(!event.usable);
        assert_eq!(event.problems.len(), 1);
        assert_eq!(event.last_update, day(2014, 6, 10));
    }

    #[test]
    fn bad_ratio_and_flag_are_rejected() {
        let bad_ratio =
            StringRecord::from(vec!["06/09/2014", "AAPL", "seven", "", "true", "06/10/2014"]);
        let bad_flag = StringRecord::from(vec!["06/09/2014", "AAPL", "7", "", "maybe", "06/10/2014"]);

        assert!(parse_row(&bad_ratio).is_err());
        assert!(parse_row(&bad_flag).is_err());
    }

    #[test]
    fn ratios_keep_a_fractional_digit() {
        assert_eq!(format_ratio(7.0), "7.0");
        assert_eq!(format_ratio(0.5), "0.5");
        assert_eq!(format_ratio(1.5), "1.5");
    }

    #[test]
    fn written_rows_match_existing_databases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splits.csv");
        let event = SplitEvent::new(day(2014, 6, 9), "AAPL", 7.0)
            .unwrap()
            .with_last_update(day(2014, 6, 10));

        write_events(&path, std::iter::once(&event)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(HEADER.join(",").as_str()));
        assert_eq!(lines.next(), Some("06/09/2014,AAPL,7.0,,true,06/10/2014"));
        assert_eq!(lines.next(), None);
        assert_eq!(read_events(&path).unwrap(), vec![event]);
    }
}
