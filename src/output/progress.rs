use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{alert, figure, success};

/// Spinner shown on stderr while a one-shot poll runs
pub struct PollProgress {
    pb: ProgressBar,
}

impl PollProgress {
    pub fn start(url: &str) -> Self {
        let pb = create_spinner(figure(format!("Polling {url}")).to_string());
        Self { pb }
    }

    pub fn finish(self, pipeline_count: usize) {
        self.pb.finish_with_message(
            success(format!("Fetched {pipeline_count} pipelines ✓")).to_string(),
        );
    }

    pub fn fail(self, error: &str) {
        self.pb
            .finish_with_message(alert(format!("Poll failed: {error}")).to_string());
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
