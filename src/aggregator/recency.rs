use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::info;

use crate::pipeline::Pipeline;

/// Last observed end time per pipeline name.
///
/// Entries are overwritten, never evicted; the map is bounded by the number of
/// pipelines the server has ever reported.
#[derive(Debug, Default)]
pub struct RecencyCache {
    last_end_times: HashMap<String, DateTime<Utc>>,
}

impl RecencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags every pipeline whose end time changed since the previous poll.
    pub fn detect(&mut self, pipelines: &mut [Pipeline]) {
        for pipeline in pipelines {
            pipeline.finished_recently = self.observe(&pipeline.name, pipeline.end_time);
        }
    }

    /// Edge-triggered: true exactly once per distinct end time.
    ///
    /// A pipeline with no finished build has nothing to report and leaves its
    /// entry untouched.
    pub fn observe(&mut self, name: &str, end_time: Option<DateTime<Utc>>) -> bool {
        let Some(end_time) = end_time else {
            return false;
        };

        if self.last_end_times.get(name) == Some(&end_time) {
            return false;
        }

        info!("Pipeline {name} has recently finished");
        self.last_end_times.insert(name.to_owned(), end_time);
        true
    }

    #[cfg(test)]
    pub fn last_end_time(&self, name: &str) -> Option<DateTime<Utc>> {
        self.last_end_times.get(name).copied()
    }
}
