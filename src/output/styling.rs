use std::fmt::Display;

use console::{style, StyledObject};

/// Radiator palette for text written outside the dashboard table.
pub fn title(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

pub fn muted(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn figure(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn alert(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn success(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn marker(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

/// Colours `text` by a Concourse build status, matching the table's status cells.
pub fn build_status(status: &str, text: impl Display) -> StyledObject<String> {
    let text = style(text.to_string());
    match status {
        "succeeded" => text.green(),
        "failed" => text.bright().red(),
        "aborted" => text.red(),
        "errored" => text.yellow(),
        "started" | "pending" => text.bright().yellow(),
        "paused" => text.blue(),
        _ => text.dim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(styled: StyledObject<String>) -> String {
        styled.force_styling(true).to_string()
    }

    #[test]
    fn test_build_status_palette() {
        assert_eq!(
            rendered(build_status("succeeded", "unit #4")),
            rendered(style("unit #4".to_string()).green())
        );
        assert_eq!(
            rendered(build_status("failed", "unit #4")),
            rendered(style("unit #4".to_string()).bright().red())
        );
        assert_eq!(
            rendered(build_status("started", "unit #4")),
            rendered(style("unit #4".to_string()).bright().yellow())
        );
    }

    #[test]
    fn test_unknown_build_status_is_muted() {
        assert_eq!(
            rendered(build_status("mystery", "x")),
            rendered(muted("x"))
        );
    }
}
