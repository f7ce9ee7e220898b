use std::path::Path;

use anyhow::Context as _;

use crate::cli::ExportArgs;
use crate::formats::Narrative;
use crate::generate::write_output;

pub fn run(args: ExportArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.story)
        .with_context(|| format!("read story: {}", args.story))?;
    let narrative: Narrative = serde_json::from_str(&raw).context("parse story json")?;
    let text = narrative.to_text();

    let out = match (args.out, args.out_dir) {
        (Some(out), _) => out,
        (None, Some(dir)) => Path::new(&dir)
            .join(narrative.text_file_name())
            .to_str()
            .map(str::to_owned)
            .with_context(|| format!("output path is not utf-8: {dir}"))?,
        (None, None) => {
            println!("{text}");
            return Ok(());
        }
    };

    write_output(&out, &text, args.force)?;
    tracing::info!(out = %out, scenes = narrative.scenes.len(), "exported story text");
    Ok(())
}
