use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::blocks::BlockDocument;
use crate::treatment::Treatment;

/// Renders the whole treatment as a Markdown document: title, chapters in
/// display order, block text as paragraphs. Markup inside blocks is dropped.
pub fn render_markdown(treatment: &Treatment) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", treatment.title));
    out.push_str(&format!(
        "_Updated {}_\n",
        treatment.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    let mut chapters = treatment.chapters.iter().collect::<Vec<_>>();
    chapters.sort_by_key(|c| c.order);

    for chapter in chapters {
        out.push_str(&format!("\n## {}\n", chapter.title));
        let text = BlockDocument::parse(&chapter.content)
            .map(|doc| doc.plain_text())
            .unwrap_or_default();
        for paragraph in text.lines().filter(|l| !l.is_empty()) {
            out.push('\n');
            out.push_str(paragraph);
            out.push('\n');
        }
    }

    out
}

/// Writes the rendered document. Refuses to clobber an existing file unless
/// `force` is set.
pub fn write_output(path: &Path, content: &str, force: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("open output file: {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("write output file: {}", path.display()))?;
    Ok(())
}
