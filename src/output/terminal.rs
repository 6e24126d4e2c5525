// Colored terminal output for classifications, history, and feedback.
//
// This module handles all terminal-specific formatting. The CLI commands in
// main.rs delegate here.

use colored::Colorize;

use crate::batch::BatchOutcome;
use crate::db::models::{ClassificationRecord, FeedbackRecord};
use crate::decision::Classification;

/// Display one classification in full.
pub fn display_classification(record: &ClassificationRecord) {
    println!(
        "\n{}",
        format!("=== {} ===", super::truncate_chars(&record.text, 60)).bold()
    );
    println!(
        "  Classification: {}",
        colorize_classification(record.classification)
    );
    println!("  Confidence: {:.2}", record.confidence);

    if record.toxic_signals.is_empty() {
        println!("  Signals: {}", "none".dimmed());
    } else {
        println!("  Signals: {}", record.toxic_signals.join(", ").red());
    }
    if record.has_emoji {
        println!("  Contains emoji: yes");
    }

    if let Some(suggestion) = &record.positive_suggestion {
        println!("\n  {} {}", "Suggestion:".bold(), suggestion);
    }
    if let Some(rewritten) = &record.rewritten_text {
        println!("  {} {}", "Rewrite:".bold(), rewritten.green());
    }
}

/// Display a batch result table plus a per-tier summary.
pub fn display_batch(outcome: &BatchOutcome) {
    println!(
        "\n{}",
        format!("=== Batch Results ({} lines) ===", outcome.total).bold()
    );
    println!();
    display_history_rows(&outcome.results);

    let toxic = count(&outcome.results, Classification::Toxic);
    let offensive = count(&outcome.results, Classification::Offensive);
    println!();
    if toxic > 0 {
        println!("  {} {} toxic lines", "!!".red().bold(), toxic);
    }
    if offensive > 0 {
        println!("  {} {} offensive lines", "~".yellow(), offensive);
    }
    if toxic == 0 && offensive == 0 {
        println!("  {} all lines neutral", "ok".green());
    }
}

/// Display stored classifications, newest first.
pub fn display_history(records: &[ClassificationRecord]) {
    if records.is_empty() {
        println!("No history yet. Run `mellow classify \"some text\"` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== History ({} records) ===", records.len()).bold()
    );
    println!();
    display_history_rows(records);
}

fn display_history_rows(records: &[ClassificationRecord]) {
    println!(
        "  {:<19}  {:<10}  {:>5}  {:<6}  {}",
        "When".dimmed(),
        "Class".dimmed(),
        "Conf".dimmed(),
        "Source".dimmed(),
        "Text".dimmed(),
    );
    println!("  {}", "-".repeat(78).dimmed());

    for record in records {
        // Pad before coloring so escape codes don't skew the column width.
        let class = format!("{:<10}", record.classification.as_str());
        println!(
            "  {:<19}  {}  {:>5.2}  {:<6}  {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            colorize_classification_str(record.classification, &class),
            record.confidence,
            record.source.as_str(),
            super::truncate_chars(&record.text, 60),
        );
    }
}

/// Display stored feedback, newest first.
pub fn display_feedback(records: &[FeedbackRecord]) {
    if records.is_empty() {
        println!("No feedback submitted yet.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Feedback ({} corrections) ===", records.len()).bold()
    );
    println!();

    for record in records {
        let original = record
            .original_classification
            .map(|c| colorize_classification(c).to_string())
            .unwrap_or_else(|| "?".dimmed().to_string());
        println!(
            "  {}  {} -> {}  \"{}\"",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            original,
            colorize_classification(record.corrected_classification),
            super::truncate_chars(&record.original_text, 60),
        );
        if let Some(comment) = &record.comment {
            println!("      {}", comment.dimmed());
        }
    }
}

fn count(records: &[ClassificationRecord], classification: Classification) -> usize {
    records
        .iter()
        .filter(|r| r.classification == classification)
        .count()
}

fn colorize_classification(classification: Classification) -> colored::ColoredString {
    colorize_classification_str(classification, classification.as_str())
}

fn colorize_classification_str(
    classification: Classification,
    text: &str,
) -> colored::ColoredString {
    match classification {
        Classification::Toxic => text.red().bold(),
        Classification::Offensive => text.yellow(),
        Classification::Neutral => text.green(),
    }
}
