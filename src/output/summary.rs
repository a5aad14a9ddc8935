use std::fmt::Write;

use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color as TableColor};

use crate::pipeline::{BuildStep, Pipeline};
use crate::scheduler::DashboardView;

use super::styling::{alert, build_status, figure, marker, muted};
use super::tables::{create_table, header_cells, status_cell, version_cell};

/// Prints the dashboard for the current view to stdout.
///
/// Only pipelines flagged `show` are listed, newest finish first. A failed
/// poll adds a red banner above the (stale) table instead of blanking it,
/// and a skipped refresh is marked as cached.
pub fn print_dashboard(view: &DashboardView, now: DateTime<Utc>) {
    println!("{}", render_dashboard(view, now));
}

pub fn render_dashboard(view: &DashboardView, now: DateTime<Utc>) -> String {
    let mut output = String::new();

    if let Some(error) = &view.error {
        let _ = writeln!(
            output,
            "{} {}\n",
            alert("⚠ Refresh failed, showing last known state:"),
            alert(error)
        );
    }

    let shown: Vec<&Pipeline> = view.pipelines.iter().filter(|p| p.is_shown()).collect();
    let paused = view.pipelines.iter().filter(|p| p.paused).count();

    let freshness = if view.refreshed || view.error.is_some() {
        String::new()
    } else {
        format!("   {}", muted("(cached)"))
    };
    let _ = writeln!(
        output,
        "{} {}   {} {}   {} {}   {}{freshness}",
        muted("Pipelines:"),
        figure(view.pipelines.len()),
        muted("Shown:"),
        figure(shown.len()),
        muted("Paused:"),
        figure(paused),
        muted(now.format("%Y-%m-%d %H:%M:%S UTC"))
    );

    if shown.is_empty() {
        let _ = writeln!(output, "{}", figure("No pipelines to show."));
        return output;
    }

    let mut table = create_table();
    table.set_header(header_cells(&["Pipeline", "Status", "Version", "Finished", "Jobs"]));

    for pipeline in shown {
        let name = if pipeline.finished_recently {
            format!("{} ●", pipeline.name)
        } else {
            pipeline.name.clone()
        };

        table.add_row(vec![
            Cell::new(name),
            status_cell(pipeline.status),
            version_cell(&pipeline.build_version, pipeline.new_version),
            Cell::new(format_finished(pipeline.end_time, now)).fg(TableColor::DarkGrey),
            Cell::new(format_steps(&pipeline.build_steps)),
        ]);
    }

    let _ = writeln!(output, "{table}");
    let _ = writeln!(
        output,
        "{} {}",
        marker("●"),
        muted("finished since the previous refresh")
    );
    output
}

fn format_steps(steps: &[BuildStep]) -> String {
    steps
        .iter()
        .map(|step| {
            build_status(&step.status, format!("{} #{}", step.name, step.build_name)).to_string()
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn format_finished(end_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(end_time) = end_time else {
        return "never".to_string();
    };

    let elapsed = now - end_time;
    if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}d ago", elapsed.num_days())
    }
}
