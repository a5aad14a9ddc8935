mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_json;
pub use progress::PollProgress;
use styling::{muted, title};
pub use summary::print_dashboard;

/// Prints the radiator banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        title("📡 Concourse Radiator"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Pipeline health at a glance")
    );
}
