use chrono::{NaiveDate, TimeZone};
use clap::Args;

use drinkwater_core::{spawn_history_poller, HistoryEntry};

use super::OutputFormat;
use crate::app::App;
use crate::config::Config;

/// Show logged drinks, newest first
#[derive(Args)]
pub struct HistoryCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Keep running and print new entries as they arrive
    #[arg(long, short)]
    pub watch: bool,
}

impl HistoryCommand {
    pub async fn run(&self, app: &App, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        app.require_sign_in()?;

        let mut rx = app.session.subscribe();
        let mut shown = rx.borrow_and_update().history.clone();
        self.print(&shown)?;

        if !self.watch {
            return Ok(());
        }

        let poller = spawn_history_poller(app.session.clone(), config.poll_interval());
        tracing::debug!(period = ?config.poll_interval(), "Watching history");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let history = rx.borrow_and_update().history.clone();
                    if history != shown {
                        println!();
                        self.print(&history)?;
                        shown = history;
                    }
                }
            }
        }

        poller.dispose();
        Ok(())
    }

    fn print(&self, history: &[HistoryEntry]) -> Result<(), serde_json::Error> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(history)?),
            OutputFormat::Text => print!("{}", render_text(history, &chrono::Local)),
        }
        Ok(())
    }
}

/// One calendar day of entries, newest first.
#[derive(Debug, PartialEq)]
struct Day<'a> {
    date: NaiveDate,
    total: u32,
    entries: Vec<&'a HistoryEntry>,
}

/// Groups newest-first entries by calendar day in `tz`, keeping the order.
fn group_by_day<'a, Tz: TimeZone>(history: &'a [HistoryEntry], tz: &Tz) -> Vec<Day<'a>> {
    let mut days: Vec<Day<'a>> = Vec::new();
    for entry in history {
        let date = entry.timestamp.with_timezone(tz).date_naive();
        match days.last_mut() {
            Some(day) if day.date == date => {
                day.total = day.total.saturating_add(entry.amount);
                day.entries.push(entry);
            }
            _ => days.push(Day {
                date,
                total: entry.amount,
                entries: vec![entry],
            }),
        }
    }
    days
}

fn render_text<Tz>(history: &[HistoryEntry], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if history.is_empty() {
        return "No drinks logged yet.\n".to_string();
    }

    let mut out = String::new();
    for day in group_by_day(history, tz) {
        out.push_str(&format!(
            "{}  (total {}ml)\n",
            day.date.format("%Y-%m-%d"),
            day.total
        ));
        for entry in day.entries {
            out.push_str(&format!(
                "  {}  {:>5}ml\n",
                entry.timestamp.with_timezone(tz).format("%H:%M"),
                entry.amount
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(amount: u32, at: &str) -> HistoryEntry {
        HistoryEntry::new(amount, at.parse().unwrap())
    }

    #[test]
    fn test_group_by_day() {
        let history = vec![
            entry(300, "2024-03-02T09:15:00Z"),
            entry(200, "2024-03-01T21:00:00Z"),
            entry(500, "2024-03-01T08:30:00Z"),
        ];

        let days = group_by_day(&history, &Utc);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(days[0].total, 300);
        assert_eq!(days[1].total, 700);
        assert_eq!(days[1].entries[0].amount, 200);
    }

    #[test]
    fn test_render_text() {
        let history = vec![
            entry(300, "2024-03-02T09:15:00Z"),
            entry(200, "2024-03-01T21:00:00Z"),
        ];

        let text = render_text(&history, &Utc);
        assert_eq!(
            text,
            "2024-03-02  (total 300ml)\n  09:15    300ml\n\
             2024-03-01  (total 200ml)\n  21:00    200ml\n"
        );
    }

    #[test]
    fn test_render_empty_history() {
        assert_eq!(render_text(&[], &Utc), "No drinks logged yet.\n");
    }
}
