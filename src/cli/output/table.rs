//! Table output formatting for CLI commands
//!
//! Phase progress, phase catalogue and workflow history rendered with
//! comfy-table. Colors follow `NO_COLOR` and dumb terminals.

use crate::domain::models::PhaseStatus;
use crate::domain::ports::{ArchivedWorkflow, WorkflowSnapshot};
use crate::services::workflow_engine::{PhaseInfo, PhaseSummary};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Per-phase progress of the active workflow
    pub fn format_phases(&self, phases: &[PhaseSummary]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["#", "Phase", "Status", "Attempts", "Completed", "Error"]));

        for phase in phases {
            table.add_row(vec![
                Cell::new(phase.phase.number()),
                Cell::new(phase.title),
                self.status_cell(phase.status),
                Cell::new(phase.attempts),
                Cell::new(
                    phase
                        .completed_at
                        .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                ),
                Cell::new(phase.error.as_deref().map_or_else(|| "-".to_string(), |e| truncate_text(e, 50))),
            ]);
        }

        table.to_string()
    }

    /// Phase catalogue with descriptions
    pub fn format_phase_info(&self, phases: &[PhaseInfo]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["#", "Name", "Description", "Status"]));

        for info in phases {
            let status = match info.status {
                Some(status) => self.status_cell(status),
                None => Cell::new("-"),
            };
            table.add_row(vec![
                Cell::new(info.phase.number()),
                Cell::new(info.name),
                Cell::new(info.description),
                status,
            ]);
        }

        table.to_string()
    }

    /// Saved snapshots, oldest first
    pub fn format_history(&self, snapshots: &[WorkflowSnapshot]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Seq", "Saved", "Status", "Progress", "Next"]));

        for snapshot in snapshots {
            let wf = &snapshot.workflow;
            table.add_row(vec![
                Cell::new(snapshot.sequence),
                Cell::new(snapshot.saved_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                Cell::new(wf.status.as_str()),
                Cell::new(wf.progress()),
                Cell::new(wf.next_action()),
            ]);
        }

        table.to_string()
    }

    pub fn format_archives(&self, archives: &[ArchivedWorkflow]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Archive", "Archived", "Status", "Progress"]));

        for archive in archives {
            table.add_row(vec![
                Cell::new(&archive.archive_id),
                Cell::new(archive.archived_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                Cell::new(archive.workflow.status.as_str()),
                Cell::new(archive.workflow.progress()),
            ]);
        }

        table.to_string()
    }

    fn status_cell(&self, status: PhaseStatus) -> Cell {
        if self.use_colors {
            Cell::new(status.as_str()).fg(status_color(status))
        } else {
            Cell::new(format!("{} {}", status_icon(status), status))
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if let Some(width) = self.max_width {
            table.set_width(width);
        }
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

const fn status_color(status: PhaseStatus) -> Color {
    match status {
        PhaseStatus::Completed => Color::Green,
        PhaseStatus::InProgress => Color::Cyan,
        PhaseStatus::Failed => Color::Red,
        PhaseStatus::Pending => Color::White,
    }
}

const fn status_icon(status: PhaseStatus) -> &'static str {
    match status {
        PhaseStatus::Completed => "✓",
        PhaseStatus::InProgress => "⟳",
        PhaseStatus::Failed => "✗",
        PhaseStatus::Pending => "○",
    }
}

/// Truncate text to `max_len` characters, appending "..." when cut.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
