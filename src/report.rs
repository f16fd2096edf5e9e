use crate::{ParseError, ParseResult, PlayerTally};
use anyhow::{anyhow, Context, Result};
use json::JsonValue;
use std::{io::Write, str::FromStr};

/// Row shown in place of the standings when nobody has played yet.
pub const NO_DATA: &str = "No player data to display.";

/// How a report is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Csv,
    Json,
}

impl Format {
    pub const VARIANTS: &'static [&'static str] = &["text", "csv", "json"];
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            _ => Err(anyhow!("unknown report format {:?}, expected one of {:?}", s, Self::VARIANTS)),
        }
    }
}

/// Players sorted by games played, most first. Players with the same count keep the order they were first seen in.
pub fn standings(tally: &PlayerTally) -> Vec<(&str, usize)> {
    let mut rows: Vec<_> = tally.iter().collect();
    // `sort_by` is stable, so ties stay in insertion order
    rows.sort_by(|(_, a), (_, b)| b.cmp(a));
    rows
}

/// One `Line N: message` per error, or `None` when there is nothing to show.
pub fn error_panel(errors: &[ParseError]) -> Option<String> {
    if errors.is_empty() {
        None
    } else {
        Some(errors.iter().map(ParseError::to_string).collect::<Vec<_>>().join("\n"))
    }
}

/// Write the standings table for `result` in the given format.
pub fn write_report<W: Write>(result: &ParseResult, format: Format, writer: W) -> Result<()> {
    match format {
        Format::Text => write_text(&result.tally, writer),
        Format::Csv => write_csv(&result.tally, writer),
        Format::Json => write_json(result, writer),
    }
}

fn write_text<W: Write>(tally: &PlayerTally, mut writer: W) -> Result<()> {
    let rows = standings(tally);
    if rows.is_empty() {
        writeln!(writer, "{}", NO_DATA)?;
        return Ok(());
    }
    // Width of the name column, at least as wide as the header
    let width = rows.iter().map(|(player, _)| player.chars().count()).max().unwrap_or(0).max("Player".len());
    writeln!(writer, "{:<width$}  Games", "Player", width = width)?;
    for (player, games) in rows {
        writeln!(writer, "{:<width$}  {:>5}", player, games, width = width)?;
    }
    Ok(())
}

fn write_csv<W: Write>(tally: &PlayerTally, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["Player", "Games"])?;
    for (player, games) in standings(tally) {
        writer.write_record([player, games.to_string().as_str()])?;
    }
    writer.flush().context("failed to flush csv report")?;
    Ok(())
}

fn write_json<W: Write>(result: &ParseResult, mut writer: W) -> Result<()> {
    let mut report = JsonValue::new_object();
    report["players"] = JsonValue::new_array();
    for (player, games) in standings(&result.tally) {
        let mut row = JsonValue::new_object();
        row["name"] = player.into();
        row["games"] = games.into();
        report["players"].push(row)?;
    }
    report["errors"] = JsonValue::new_array();
    for error in &result.errors {
        let mut entry = JsonValue::new_object();
        entry["line"] = error.line_number.into();
        entry["message"] = error.message().into();
        report["errors"].push(entry)?;
    }
    writeln!(writer, "{}", report.pretty(2))?;
    Ok(())
}
