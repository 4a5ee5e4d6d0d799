// src/utils/log.rs

//! Banner-style helpers for pass reports.
//!
//! Everything goes through the `log` facade so the CLI's `env_logger`
//! decides formatting and filtering.

use chrono::Local;

const RULE_WIDTH: usize = 60;

/// Log a boxed header line.
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    ::log::info!("{border}");
    ::log::info!("  {title}");
    ::log::info!("{border}");
}

/// Log a summary section with a local timestamp on the title.
pub fn summary(title: &str, items: &[(&str, String)]) {
    ::log::info!(
        "[SUMMARY] {} ({})",
        title,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    for line in summary_lines(items) {
        ::log::info!("{line}");
    }
}

fn summary_lines(items: &[(&str, String)]) -> Vec<String> {
    let width = items.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    items
        .iter()
        .map(|(key, value)| format!("    {key:<width$} : {value}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines_align_keys() {
        let lines = summary_lines(&[("posted", "3".into()), ("spam", "1".into())]);
        assert_eq!(lines, vec!["    posted : 3", "    spam   : 1"]);
    }

    #[test]
    fn test_summary_lines_empty() {
        assert!(summary_lines(&[]).is_empty());
    }
}
