use std::io::Write;

use crate::error::Result;
use crate::pipeline::Pipeline;

/// Writes the full snapshot, hidden pipelines included, as JSON.
pub fn export_json(pipelines: &[Pipeline], pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(pipelines)?
    } else {
        serde_json::to_string(pipelines)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}
