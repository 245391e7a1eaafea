//! Terminal rendering of command results.
//!
//! Rendering is split into `format_*` functions that build strings (tested
//! below) and a single `print_result` that writes them out.

use catalogapp::api::{CmdMessage, CmdResult, EntryRow, MessageLevel};
use catalogapp::entries::{EntrySnapshot, HistoryRecord};
use catalogapp::search::{SearchResults, SimpleResults};
use colored::*;
use serde_json::Value as Json;

pub fn print_result(result: &CmdResult) {
    for line in format_result(result) {
        println!("{}", line);
    }
}

pub fn format_result(result: &CmdResult) -> Vec<String> {
    let mut lines = Vec::new();
    for snapshot in &result.snapshots {
        lines.extend(format_snapshot(snapshot));
    }
    for export in &result.exports {
        lines.push(serde_json::to_string_pretty(export).unwrap_or_else(|_| export.to_string()));
    }
    for row in &result.listed_entries {
        lines.push(format_row(row));
    }
    if !result.history.is_empty() {
        lines.extend(format_history(&result.history));
    }
    for candidate in &result.candidates {
        let entity = candidate
            .entity
            .as_ref()
            .map(|e| format!("{}/", e.name))
            .unwrap_or_default();
        lines.push(format!("{} {}{}", format!("#{}", candidate.id).dimmed(), entity, candidate.name));
    }
    if let Some(found) = &result.search {
        lines.extend(format_search(found));
    }
    if let Some(found) = &result.simple_search {
        lines.extend(format_simple(found));
    }
    for message in &result.messages {
        lines.push(format_message(message));
    }
    lines
}

fn format_message(message: &CmdMessage) -> String {
    match message.level {
        MessageLevel::Info => message.content.dimmed().to_string(),
        MessageLevel::Success => message.content.green().to_string(),
        MessageLevel::Warning => message.content.yellow().to_string(),
        MessageLevel::Error => message.content.red().to_string(),
    }
}

fn format_row(row: &EntryRow) -> String {
    let name = if row.is_active {
        row.name.normal()
    } else {
        row.name.red()
    };
    format!("{} {}/{}", format!("#{}", row.id).dimmed(), row.entity, name)
}

fn plain(value: &Json) -> String {
    match value {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_snapshot(snapshot: &EntrySnapshot) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}/{}",
        format!("#{}", snapshot.id).dimmed(),
        snapshot.entity.name,
        snapshot.name.bold()
    )];
    let width = snapshot.attrs.iter().map(|a| a.name.len()).max().unwrap_or(0);
    for attr in &snapshot.attrs {
        let marker = if attr.is_mandatory { "*" } else { " " };
        let name = format!("{:width$}", attr.name, width = width);
        lines.push(format!("  {}{}  {}", marker, name.yellow(), plain(&attr.value)));
    }
    lines
}

fn format_history(records: &[HistoryRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let current = plain(&record.current.value.to_plain(false));
            let previous = record
                .previous
                .as_ref()
                .map(|p| plain(&p.value.to_plain(false)))
                .unwrap_or_default();
            format!(
                "{} {} {}: {} -> {}",
                record.current.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                format!("(by #{})", record.current.created_by).dimmed(),
                record.attribute.yellow(),
                previous,
                current
            )
        })
        .collect()
}

fn format_search(found: &SearchResults) -> Vec<String> {
    let mut lines = Vec::new();
    for result in &found.results {
        lines.push(format!(
            "{} {}/{}",
            format!("#{}", result.entry.id).dimmed(),
            result.entity.name,
            result.entry.name.bold()
        ));
        for attr in &result.attrs {
            let value = match (&attr.value, attr.is_readable) {
                (_, false) => "(hidden)".dimmed().to_string(),
                (Some(value), true) => plain(&value.to_plain(false)),
                (None, true) => String::new(),
            };
            lines.push(format!("  {}  {}", attr.name.yellow(), value));
        }
        if !result.referrals.is_empty() {
            let names: Vec<_> = result.referrals.iter().map(|r| r.name.as_str()).collect();
            lines.push(format!("  {}  {}", "referred by".dimmed(), names.join(", ")));
        }
    }
    lines.push(format!("{} entries", found.total).dimmed().to_string());
    lines
}

fn format_simple(found: &SimpleResults) -> Vec<String> {
    let mut lines: Vec<String> = found
        .results
        .iter()
        .map(|hit| {
            let matched = match (&hit.attr, &hit.value) {
                (Some(attr), Some(value)) => format!("  {}={}", attr.yellow(), value),
                _ => String::new(),
            };
            format!(
                "{} {}/{}{}",
                format!("#{}", hit.entry.id).dimmed(),
                hit.entity.name,
                hit.entry.name,
                matched
            )
        })
        .collect();
    lines.push(format!("{} entries", found.total).dimmed().to_string());
    lines
}
