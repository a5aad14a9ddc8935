use crate::pipeline::{Display, Pipeline};

/// Orders pipelines newest-finished first and decides which ones are shown.
///
/// Nothing is removed: pipelines past the cut-off are only flagged `Hide`.
/// The cut-off is checked before counting, so up to `max_allowed + 1`
/// pipelines end up shown.
pub fn order_pipelines(pipelines: &mut [Pipeline], max_allowed: usize) {
    // `None` sorts below any instant, so never-finished pipelines go last.
    pipelines.sort_by(|a, b| b.end_time.cmp(&a.end_time));

    let mut shown = 0;
    for pipeline in pipelines.iter_mut() {
        if pipeline.paused || shown > max_allowed {
            pipeline.display = Display::Hide;
        } else {
            pipeline.display = Display::Show;
            shown += 1;
        }

        pipeline
            .build_steps
            .sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
    }
}
