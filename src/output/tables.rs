use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::pipeline::PipelineStatus;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cells(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn status_color(status: &str) -> TableColor {
    match status {
        "succeeded" => TableColor::Green,
        "failed" => TableColor::Red,
        "errored" => TableColor::DarkYellow,
        "aborted" => TableColor::DarkRed,
        "started" | "pending" => TableColor::Yellow,
        "paused" => TableColor::Blue,
        _ => TableColor::DarkGrey,
    }
}

pub fn status_cell(status: PipelineStatus) -> Cell {
    Cell::new(status.as_str()).fg(status_color(status.as_str()))
}

pub fn version_cell(version: &str, new_version: bool) -> Cell {
    if version.is_empty() {
        Cell::new("-").fg(TableColor::DarkGrey)
    } else if new_version {
        Cell::new(format!("{version} ★ new")).fg(TableColor::Magenta)
    } else {
        Cell::new(version)
    }
}
