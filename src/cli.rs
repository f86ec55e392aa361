use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::blocks::BlockDocument;
use crate::client::{GenerateError, GenerationClient};
use crate::export;
use crate::generator::Generator;
use crate::patch::{PatchOutcome, apply_replacement};
use crate::prompts::SmartEditAction;
use crate::storage::LocalFsStorage;
use crate::store::DocumentStore;
use crate::treatment::{Chapter, Genre, SettingsPatch, Tone, Treatment};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Data directory holding the treatment collection.
    #[arg(long, env = "TREATFORGE_DATA_DIR", default_value = ".treatforge")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a treatment with the default chapter set.
    New(NewArgs),
    /// List all treatments.
    List,
    /// Delete a treatment.
    Delete(TreatmentArgs),
    /// Rename a treatment.
    Rename(RenameArgs),
    Chapter {
        #[command(subcommand)]
        command: ChapterCommand,
    },
    /// Update generation settings for a treatment.
    Settings(SettingsArgs),
    Generate {
        #[command(subcommand)]
        command: GenerateCommand,
    },
    Edit {
        #[command(subcommand)]
        command: EditCommand,
    },
    Version {
        #[command(subcommand)]
        command: VersionCommand,
    },
    /// Render a treatment as Markdown.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Treatment title.
    #[arg(long)]
    pub title: String,
}

#[derive(Debug, Args)]
pub struct TreatmentArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// New title (must be non-empty).
    #[arg(long)]
    pub title: String,
}

#[derive(Debug, Subcommand)]
pub enum ChapterCommand {
    /// Append a custom chapter.
    Add(ChapterAddArgs),
    /// Remove a custom chapter. Default chapters cannot be removed.
    Remove(ChapterRefArgs),
    /// Rename a chapter.
    Rename(ChapterRenameArgs),
    /// List chapters in display order.
    List(TreatmentArgs),
    /// Reorder chapters by id. Every chapter must appear exactly once.
    Reorder(ChapterReorderArgs),
    /// Set a chapter's word count target.
    Limit(ChapterLimitArgs),
}

#[derive(Debug, Args)]
pub struct ChapterAddArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// Chapter title.
    #[arg(long)]
    pub title: String,
}

#[derive(Debug, Args)]
pub struct ChapterRefArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// Chapter id.
    #[arg(long)]
    pub chapter: String,
}

#[derive(Debug, Args)]
pub struct ChapterRenameArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// Chapter id.
    #[arg(long)]
    pub chapter: String,

    /// New chapter title.
    #[arg(long)]
    pub title: String,
}

#[derive(Debug, Args)]
pub struct ChapterReorderArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// Chapter id in the new position; repeat once per chapter.
    #[arg(long = "id", required = true)]
    pub ids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ChapterLimitArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// Chapter id.
    #[arg(long)]
    pub chapter: String,

    /// Target word count.
    #[arg(long)]
    pub words: u32,
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// Writing tone: DIRECT, CONVERSATIONAL, FUNNY or POETIC.
    #[arg(long)]
    pub tone: Option<String>,

    /// Genre vertical, e.g. CARS, TECH, FASHION, OTHER.
    #[arg(long)]
    pub genre: Option<String>,

    /// Client brief. Pass an empty string to clear.
    #[arg(long)]
    pub brief: Option<String>,

    /// Director's notes. Pass an empty string to clear.
    #[arg(long)]
    pub notes: Option<String>,

    /// Chemistry call notes. Pass an empty string to clear.
    #[arg(long)]
    pub chemistry_notes: Option<String>,

    /// Reel reference link; repeat to supply several. Replaces the stored
    /// list.
    #[arg(long = "reel-link")]
    pub reel_links: Vec<String>,

    /// Writing sample whose style generated text should emulate.
    #[arg(long)]
    pub style_emulation: Option<String>,

    /// Extra instructions appended to every chapter prompt.
    #[arg(long)]
    pub additional_prompts: Option<String>,

    /// Topline mode: short summary chapters.
    #[arg(long)]
    pub topline: Option<bool>,

    /// Run generated chapter text through the naturalizer.
    #[arg(long)]
    pub naturalize: Option<bool>,

    #[arg(long)]
    pub tighten: Option<bool>,

    #[arg(long)]
    pub quips: Option<bool>,

    #[arg(long)]
    pub curveball: Option<bool>,

    #[arg(long)]
    pub character_bios: Option<bool>,

    #[arg(long)]
    pub references: Option<bool>,

    #[arg(long)]
    pub script_ideas: Option<bool>,

    #[arg(long)]
    pub bonus_outputs: Option<bool>,
}

#[derive(Debug, Subcommand)]
pub enum GenerateCommand {
    /// Draft one chapter and store it as the chapter's content.
    Chapter(ChapterRefArgs),
    /// Suggest alternative titles for a chapter.
    Titles(ChapterRefArgs),
    /// Generate the enabled extras (bios, references, script ideas, bonus
    /// lists) from the brief.
    Extras(TreatmentArgs),
}

#[derive(Debug, Subcommand)]
pub enum EditCommand {
    /// Ask the service for a rewrite of a passage. Nothing is applied.
    Suggest(EditSuggestArgs),
    /// Replace a passage inside a chapter with approved text.
    Apply(EditApplyArgs),
}

#[derive(Debug, Args)]
pub struct EditSuggestArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// Chapter id.
    #[arg(long)]
    pub chapter: String,

    /// Edit action: shorten, expand or tighten.
    #[arg(long)]
    pub action: String,

    /// The passage to rewrite.
    #[arg(long)]
    pub text: String,
}

#[derive(Debug, Args)]
pub struct EditApplyArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// Chapter id.
    #[arg(long)]
    pub chapter: String,

    /// The passage to replace, as it reads in the chapter.
    #[arg(long)]
    pub old: String,

    /// The approved replacement text.
    #[arg(long)]
    pub new: String,
}

#[derive(Debug, Subcommand)]
pub enum VersionCommand {
    /// Snapshot the current chapter list.
    Save(TreatmentArgs),
    /// List saved versions.
    List(TreatmentArgs),
    /// Restore a version. The current state is snapshotted first.
    Load(VersionLoadArgs),
}

#[derive(Debug, Args)]
pub struct VersionLoadArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// Version id.
    #[arg(long)]
    pub version: String,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Treatment id.
    #[arg(long)]
    pub treatment: String,

    /// Output file path. Omit to print to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Overwrite the output file if it exists.
    #[arg(long)]
    pub force: bool,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut store = open_store(&cli.data_dir)?;

    match cli.command {
        Command::New(args) => {
            let id = store.create_treatment(args.title)?;
            println!("{id}");
        }
        Command::List => {
            for treatment in store.treatments() {
                println!(
                    "{}  {}  {} chapters  updated {}",
                    treatment.id,
                    treatment.title,
                    treatment.chapters.len(),
                    treatment.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Delete(args) => {
            store.delete_treatment(&args.treatment)?;
        }
        Command::Rename(args) => {
            select(&mut store, &args.treatment)?;
            anyhow::ensure!(!args.title.trim().is_empty(), "title must be non-empty");
            store.rename_treatment(&args.title)?;
        }
        Command::Chapter { command } => run_chapter(&mut store, command)?,
        Command::Settings(args) => run_settings(&mut store, args)?,
        Command::Generate { command } => run_generate(&mut store, command).await?,
        Command::Edit { command } => run_edit(&mut store, command).await?,
        Command::Version { command } => run_version(&mut store, command)?,
        Command::Export(args) => {
            select(&mut store, &args.treatment)?;
            let markdown = export::render_markdown(store.active().expect("selected"));
            match args.out {
                Some(path) => export::write_output(&path, &markdown, args.force)?,
                None => print!("{markdown}"),
            }
        }
    }

    Ok(())
}

fn open_store(data_dir: &std::path::Path) -> anyhow::Result<DocumentStore> {
    let storage = LocalFsStorage::new(data_dir);
    let (store, report) = DocumentStore::open(Box::new(storage)).context("open store")?;
    if report.collection_discarded {
        tracing::warn!("stored collection was corrupt and has been discarded");
    }
    for (treatment_id, chapter_id) in &report.reset_chapters {
        tracing::warn!(treatment_id, chapter_id, "chapter content was reset on load");
    }
    Ok(store)
}

fn select(store: &mut DocumentStore, id: &str) -> anyhow::Result<()> {
    if !store.select_treatment(id) {
        anyhow::bail!("no treatment with id {id}");
    }
    Ok(())
}

/// The selected treatment and one of its chapters, cloned out of the store
/// so generation can run while the store stays mutable.
fn selected_chapter(
    store: &mut DocumentStore,
    treatment_id: &str,
    chapter_id: &str,
) -> anyhow::Result<(Treatment, Chapter)> {
    select(store, treatment_id)?;
    let treatment = store.active().expect("selected").clone();
    let chapter = treatment
        .chapter(chapter_id)
        .with_context(|| format!("no chapter with id {chapter_id}"))?
        .clone();
    Ok((treatment, chapter))
}

fn run_chapter(store: &mut DocumentStore, command: ChapterCommand) -> anyhow::Result<()> {
    match command {
        ChapterCommand::Add(args) => {
            select(store, &args.treatment)?;
            let id = store
                .add_chapter(args.title, true)?
                .context("no active treatment")?;
            println!("{id}");
        }
        ChapterCommand::Remove(args) => {
            select(store, &args.treatment)?;
            store.remove_chapter(&args.chapter)?;
        }
        ChapterCommand::Rename(args) => {
            select(store, &args.treatment)?;
            store.rename_chapter(&args.chapter, &args.title)?;
        }
        ChapterCommand::List(args) => {
            select(store, &args.treatment)?;
            let treatment = store.active().expect("selected");
            for chapter in &treatment.chapters {
                let words = BlockDocument::parse(&chapter.content)
                    .map(|doc| doc.word_count())
                    .unwrap_or(0);
                println!(
                    "{:>2}. {}  {}  {} words{}",
                    chapter.order + 1,
                    chapter.id,
                    chapter.title,
                    words,
                    if chapter.is_custom { "  (custom)" } else { "" }
                );
            }
        }
        ChapterCommand::Reorder(args) => {
            select(store, &args.treatment)?;
            let treatment = store.active().expect("selected");
            let mut reordered = Vec::with_capacity(args.ids.len());
            for id in &args.ids {
                let chapter = treatment
                    .chapter(id)
                    .with_context(|| format!("no chapter with id {id}"))?;
                reordered.push(chapter.clone());
            }
            store.reorder_chapters(reordered)?;
        }
        ChapterCommand::Limit(args) => {
            select(store, &args.treatment)?;
            store.set_word_count_limit(&args.chapter, args.words)?;
        }
    }
    Ok(())
}

fn run_settings(store: &mut DocumentStore, args: SettingsArgs) -> anyhow::Result<()> {
    select(store, &args.treatment)?;
    let current = store.active().expect("selected").settings.clone();

    let mut patch = SettingsPatch::default();
    if let Some(tone) = args.tone {
        patch.tone = Some(parse_tone(&tone)?);
    }
    if let Some(genre) = args.genre {
        patch.genre = Some(parse_genre(&genre)?);
    }
    if let Some(brief) = args.brief {
        patch.brief = Some((!brief.is_empty()).then_some(brief));
    }
    if let Some(notes) = args.notes {
        patch.notes = Some((!notes.is_empty()).then_some(notes));
    }
    if let Some(chemistry) = args.chemistry_notes {
        patch.chemistry_call_notes = Some((!chemistry.is_empty()).then_some(chemistry));
    }
    if !args.reel_links.is_empty() {
        patch.reel_links = Some(args.reel_links);
    }
    if let Some(style) = args.style_emulation {
        patch.style_emulation = Some((!style.is_empty()).then_some(style));
    }
    if let Some(additional) = args.additional_prompts {
        patch.additional_prompts = Some((!additional.is_empty()).then_some(additional));
    }
    patch.topline_mode = args.topline;
    patch.naturalize_text = args.naturalize;
    patch.enable_character_bios = args.character_bios;
    patch.enable_references = args.references;
    patch.enable_script_ideas = args.script_ideas;
    patch.enable_bonus_outputs = args.bonus_outputs;

    if args.tighten.is_some() || args.quips.is_some() || args.curveball.is_some() {
        let mut modes = current.creative_modes;
        if let Some(tighten) = args.tighten {
            modes.tighten = tighten;
        }
        if let Some(quips) = args.quips {
            modes.quips = quips;
        }
        if let Some(curveball) = args.curveball {
            modes.curveball = curveball;
        }
        patch.creative_modes = Some(modes);
    }

    store.update_settings(patch)?;
    let settings = &store.active().expect("selected").settings;
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

async fn run_generate(store: &mut DocumentStore, command: GenerateCommand) -> anyhow::Result<()> {
    let generator = Generator::new(GenerationClient::from_env()?);
    let cancel = cancel_on_ctrl_c();

    match command {
        GenerateCommand::Chapter(args) => {
            let (treatment, chapter) = selected_chapter(store, &args.treatment, &args.chapter)?;
            store.set_generating(true);
            let result = generator.generate_chapter(&treatment, &chapter, &cancel).await;
            store.set_generating(false);

            let text = match result {
                Ok(text) => text,
                Err(err) => return report_generate_error(err),
            };
            let doc = BlockDocument::from_paragraphs(
                text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()),
            );
            store.update_chapter_content(&chapter.id, doc.to_json())?;
            println!("{text}");
        }
        GenerateCommand::Titles(args) => {
            let (treatment, chapter) = selected_chapter(store, &args.treatment, &args.chapter)?;
            store.set_generating(true);
            let result = generator.alternative_titles(&treatment, &chapter, &cancel).await;
            store.set_generating(false);

            let titles = match result {
                Ok(titles) => titles,
                Err(err) => return report_generate_error(err),
            };
            store.set_alternative_titles(&chapter.id, titles.clone())?;
            for title in titles {
                println!("{title}");
            }
        }
        GenerateCommand::Extras(args) => {
            select(store, &args.treatment)?;
            let treatment = store.active().expect("selected").clone();
            anyhow::ensure!(
                treatment
                    .settings
                    .brief
                    .as_deref()
                    .is_some_and(|b| !b.trim().is_empty()),
                "extras need a brief; set one with `settings --brief`"
            );

            store.set_generating(true);
            let result = generator.generate_extras(&treatment, &cancel).await;
            store.set_generating(false);

            let extras = match result {
                Ok(extras) => extras,
                Err(err) => return report_generate_error(err),
            };
            if extras.is_empty() {
                println!("no extras enabled; turn some on with `settings`");
            } else {
                println!("{}", serde_json::to_string_pretty(&extras)?);
                store.set_generated_extras(Some(extras));
            }
        }
    }

    Ok(())
}

async fn run_edit(store: &mut DocumentStore, command: EditCommand) -> anyhow::Result<()> {
    match command {
        EditCommand::Suggest(args) => {
            let generator = Generator::new(GenerationClient::from_env()?);
            let cancel = cancel_on_ctrl_c();
            let action = SmartEditAction::parse(&args.action)?;
            let (treatment, chapter) = selected_chapter(store, &args.treatment, &args.chapter)?;

            store.set_generating(true);
            let result = generator
                .smart_edit(&treatment, &chapter, &args.text, action, &cancel)
                .await;
            store.set_generating(false);

            match result {
                Ok(revised) => println!("{revised}"),
                Err(err) => return report_generate_error(err),
            }
        }
        EditCommand::Apply(args) => {
            select(store, &args.treatment)?;
            let treatment = store.active().expect("selected");
            let chapter = treatment
                .chapter(&args.chapter)
                .with_context(|| format!("no chapter with id {}", args.chapter))?;
            let mut doc = BlockDocument::parse(&chapter.content)
                .context("chapter content is not a block document")?;

            match apply_replacement(&mut doc, &args.old, &args.new) {
                PatchOutcome::Replaced { block_index } => {
                    let chapter_id = chapter.id.clone();
                    store.update_chapter_content(&chapter_id, doc.to_json())?;
                    println!("replaced text in block {block_index}");
                }
                PatchOutcome::NotFound => {
                    anyhow::bail!("text not found in chapter; nothing was changed");
                }
            }
        }
    }
    Ok(())
}

fn run_version(store: &mut DocumentStore, command: VersionCommand) -> anyhow::Result<()> {
    match command {
        VersionCommand::Save(args) => {
            select(store, &args.treatment)?;
            let id = store.save_version()?.context("no active treatment")?;
            println!("{id}");
        }
        VersionCommand::List(args) => {
            select(store, &args.treatment)?;
            let treatment = store.active().expect("selected");
            for version in &treatment.versions {
                println!(
                    "{}  {}  {} chapters",
                    version.id,
                    version.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    version.chapters.len()
                );
            }
        }
        VersionCommand::Load(args) => {
            select(store, &args.treatment)?;
            if !store.load_version(&args.version)? {
                anyhow::bail!("no version with id {}", args.version);
            }
        }
    }
    Ok(())
}

/// Cancellation is a user action, not a failure; it exits cleanly after
/// telling the user. Everything else propagates.
fn report_generate_error(err: GenerateError) -> anyhow::Result<()> {
    if err.is_cancelled() {
        eprintln!("Generation cancelled");
        return Ok(());
    }
    Err(err.into())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    token
}

fn parse_tone(raw: &str) -> anyhow::Result<Tone> {
    let normalized = raw.trim().to_ascii_uppercase();
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| anyhow::anyhow!("unknown tone: {raw}"))
}

fn parse_genre(raw: &str) -> anyhow::Result<Genre> {
    let normalized = raw.trim().to_ascii_uppercase();
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| anyhow::anyhow!("unknown genre: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_and_genre_parse_case_insensitively() {
        assert_eq!(parse_tone("poetic").unwrap(), Tone::Poetic);
        assert_eq!(parse_tone(" FUNNY ").unwrap(), Tone::Funny);
        assert!(parse_tone("sarcastic").is_err());

        assert_eq!(parse_genre("cars").unwrap(), Genre::Cars);
        assert!(parse_genre("westerns").is_err());
    }

    #[test]
    fn cli_parses_a_generate_chapter_invocation() {
        let cli = Cli::try_parse_from([
            "treatforge",
            "--data-dir",
            "/tmp/tf",
            "generate",
            "chapter",
            "--treatment",
            "t1",
            "--chapter",
            "c1",
        ])
        .unwrap();

        match cli.command {
            Command::Generate {
                command: GenerateCommand::Chapter(args),
            } => {
                assert_eq!(args.treatment, "t1");
                assert_eq!(args.chapter, "c1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
