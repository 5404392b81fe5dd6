//! Console rendering for the `offline` CLI.
//!
//! Human output goes to stdout and diagnostics to stderr. With `--json`
//! only [`Output::json`] documents and errors are printed.

use console::{style, StyledObject};
use offline_worker::{CacheStatus, MetricsSnapshot};
use serde::Serialize;

/// Kind of a one-line message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warn,
    Error,
}

impl Tone {
    fn marker(self) -> StyledObject<&'static str> {
        match self {
            Self::Info => style("ℹ").blue(),
            Self::Success => style("✓").green(),
            Self::Warn => style("⚠").yellow(),
            Self::Error => style("✗").red(),
        }
    }

    fn is_diagnostic(self) -> bool {
        matches!(self, Self::Warn | Self::Error)
    }
}

#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Print a marked message. Errors still reach stderr in JSON mode.
    pub fn say(&self, tone: Tone, msg: &str) {
        if self.json {
            if tone == Tone::Error {
                eprintln!("{}", serde_json::json!({ "error": msg }));
            }
            return;
        }

        if tone.is_diagnostic() {
            eprintln!("{} {}", tone.marker(), msg);
        } else {
            println!("{} {}", tone.marker(), msg);
        }
    }

    pub fn info(&self, msg: &str) {
        self.say(Tone::Info, msg);
    }

    pub fn success(&self, msg: &str) {
        self.say(Tone::Success, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.say(Tone::Warn, msg);
    }

    pub fn error(&self, msg: &str) {
        self.say(Tone::Error, msg);
    }

    /// Only with `--verbose`.
    pub fn debug(&self, msg: &str) {
        if self.verbose && !self.json {
            eprintln!("{} {}", style("→").dim(), style(msg).dim());
        }
    }

    pub fn header(&self, msg: &str) {
        if !self.json {
            println!("\n{}", style(msg).bold().underlined());
        }
    }

    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => self.error(&format!("failed to encode output: {}", e)),
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if !self.json {
            println!("  {}: {}", style(key).dim(), value);
        }
    }

    pub fn list_item(&self, item: &str) {
        if !self.json {
            println!("  {} {}", style("•").dim(), item);
        }
    }

    /// A routed URL, padded to `url_width`, with the page an alias serves.
    pub fn route(
        &self,
        url: &str,
        rule: &str,
        strategy: &str,
        canonical: Option<&str>,
        url_width: usize,
    ) {
        if self.json {
            return;
        }
        println!(
            "  {:url_width$}  {:<16}  {}",
            url,
            rule,
            style(strategy).cyan(),
            url_width = url_width
        );
        if let Some(canonical) = canonical {
            println!(
                "  {:url_width$}  {} {}",
                "",
                style("serves").dim(),
                canonical,
                url_width = url_width
            );
        }
    }

    /// One entry of the rule table, in evaluation order.
    pub fn rule(&self, position: usize, name: &str, strategy: &str, matcher: &str) {
        if !self.json {
            println!(
                "  {:>2}. {:<16}  {}  {}",
                position,
                name,
                style(format!("{:<20}", strategy)).cyan(),
                style(matcher).dim()
            );
        }
    }

    /// A simulation step that did not produce a response.
    pub fn step(&self, num: usize, total: usize, msg: &str) {
        if !self.json {
            println!("{} {}", progress(num, total), msg);
        }
    }

    /// A simulation step answered with a response.
    pub fn served(&self, num: usize, total: usize, served: &Served<'_>) {
        if self.json {
            return;
        }
        println!(
            "{} {} {} {} {}",
            progress(num, total),
            status_badge(served.status),
            served.http_status,
            served.request,
            style(format!("({}, {})", served.rule, format_bytes(served.bytes as u64))).dim()
        );
    }

    /// A message a connected view received.
    pub fn view_event(&self, payload: &str) {
        if !self.json {
            println!("      {} {}", style("⇢ view").magenta(), payload);
        }
    }

    /// Engine counters after a run.
    pub fn metrics(&self, snapshot: &MetricsSnapshot) {
        if self.json {
            return;
        }
        for line in snapshot.to_summary().lines() {
            println!("  {}", line);
        }
    }
}

/// What [`Output::served`] prints for one response.
pub struct Served<'a> {
    pub status: CacheStatus,
    pub http_status: u16,
    pub request: &'a str,
    pub rule: &'a str,
    pub bytes: usize,
}

fn progress(num: usize, total: usize) -> StyledObject<String> {
    style(format!("[{}/{}]", num, total)).dim()
}

/// Colored badge for where a response came from.
pub fn status_badge(status: CacheStatus) -> String {
    let label = format!("{:<8}", status.to_string());
    match status {
        CacheStatus::Hit => style(label).green().to_string(),
        CacheStatus::Fallback => style(label).yellow().to_string(),
        CacheStatus::Miss | CacheStatus::Network => style(label).cyan().to_string(),
        CacheStatus::Bypass => style(label).dim().to_string(),
    }
}

/// Body size for display.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    match bytes {
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_diagnostics_go_to_stderr() {
        assert!(Tone::Warn.is_diagnostic());
        assert!(Tone::Error.is_diagnostic());
        assert!(!Tone::Success.is_diagnostic());
    }

    #[test]
    fn test_badges_are_padded() {
        console::set_colors_enabled(false);
        assert_eq!(status_badge(CacheStatus::Hit), "HIT     ");
        assert_eq!(status_badge(CacheStatus::Fallback), "FALLBACK");
    }
}
