//! Rendering of the usage list. Rendering is a function of the records alone, nothing is kept
//! between refreshes.

use std::{fmt::Display, io::Write};

use ansi_term::Colour;
use anyhow::Result;
use clap::ValueEnum;

use crate::usage::{record::UsageRecord, screen::PresentationState};

const DEFAULT_BAR_WIDTH: usize = 20;
const NO_ICON: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

pub struct ListPresenter {
    format: OutputFormat,
    colored: bool,
    bar_width: usize,
}

impl ListPresenter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self {
            format,
            colored,
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }

    #[cfg(test)]
    fn with_bar_width(self, bar_width: usize) -> Self {
        Self { bar_width, ..self }
    }

    /// Writes one row per record: icon, name, duration, percentage and a percentage bar.
    pub fn render(&self, records: &[UsageRecord], out: &mut impl Write) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, records)?;
                writeln!(out)?;
            }
            OutputFormat::Table => {
                let icon_width = records
                    .iter()
                    .map(|v| icon_text(v).chars().count())
                    .max()
                    .unwrap_or(0);
                let name_width = records
                    .iter()
                    .map(|v| v.display_name.chars().count())
                    .max()
                    .unwrap_or(0);
                for record in records {
                    writeln!(
                        out,
                        "{:<icon_width$}  {:<name_width$}  {:>14}  {:>4}  {}",
                        icon_text(record),
                        record.display_name,
                        record.duration_text,
                        record.percentage.to_string(),
                        self.bar(*record.percentage.clamped()),
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Renders whatever the state calls for. [PresentationState::ShowingResults] is rendered as the
    /// list itself.
    pub fn render_state(&self, state: &PresentationState, out: &mut impl Write) -> Result<()> {
        match state {
            PresentationState::NoPermission => {
                writeln!(
                    out,
                    "Usage access is not granted. Allow it with `usagestats access --mode allowed`."
                )?;
            }
            PresentationState::PermissionGrantedIdle => {
                writeln!(out, "Usage access granted. Run `usagestats show` to list usage.")?;
            }
            PresentationState::ShowingResults(records) => self.render(records, out)?,
        }
        Ok(())
    }

    fn bar(&self, percentage: u32) -> String {
        let filled = self.bar_width * percentage as usize / 100;
        let full = "#".repeat(filled);
        let empty = ".".repeat(self.bar_width - filled);
        if self.colored {
            format!("[{}{}]", Colour::Green.paint(full), Colour::Fixed(240).paint(empty))
        } else {
            format!("[{full}{empty}]")
        }
    }
}

fn icon_text(record: &UsageRecord) -> String {
    record
        .icon
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| NO_ICON.to_string())
}
