use tokio_util::sync::CancellationToken;

use crate::blocks::BlockDocument;
use crate::client::{GenerateError, GenerationClient, GenerationParams, session_id};
use crate::extras::{
    self, BonusKind as BonusOutputKind, BonusOutput, GeneratedExtras,
};
use crate::naturalize::naturalize;
use crate::prompts::{
    self, BonusKind, SmartEditAction, build_alternative_titles_prompt, build_chapter_prompt,
    build_system_prompt,
};
use crate::treatment::{Chapter, Tone, Treatment, TreatmentSettings};

/// Service-side style hint derived from the writing tone.
pub fn style_for(tone: Tone) -> &'static str {
    match tone {
        Tone::Direct => "formal",
        Tone::Conversational | Tone::Funny => "casual",
        Tone::Poetic => "poetic",
    }
}

/// The brief and director inputs, concatenated for the request's
/// `additional_context` field. Empty when nothing is set.
pub fn build_additional_context(settings: &TreatmentSettings) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(brief) = settings.brief.as_deref()
        && !brief.trim().is_empty()
    {
        parts.push(format!("BRIEF:\n{brief}"));
    }
    if let Some(notes) = settings.notes.as_deref()
        && !notes.trim().is_empty()
    {
        parts.push(format!("DIRECTOR'S NOTES:\n{notes}"));
    }
    if let Some(chemistry) = settings.chemistry_call_notes.as_deref()
        && !chemistry.trim().is_empty()
    {
        parts.push(format!("CHEMISTRY CALL NOTES:\n{chemistry}"));
    }
    if !settings.reel_links.is_empty() {
        parts.push(format!("REEL REFERENCES:\n{}", settings.reel_links.join("\n")));
    }
    if let Some(additional) = settings.additional_prompts.as_deref()
        && !additional.trim().is_empty()
    {
        parts.push(format!("ADDITIONAL INSTRUCTIONS:\n{additional}"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Plain text of every other chapter, as cross-section context for a
/// chapter generation call.
fn sibling_context(treatment: &Treatment, chapter_id: &str) -> String {
    let mut context = String::new();
    for other in &treatment.chapters {
        if other.id == chapter_id {
            continue;
        }
        let Some(doc) = BlockDocument::parse(&other.content) else {
            continue;
        };
        let text = doc.plain_text();
        if text.is_empty() {
            continue;
        }
        if !context.is_empty() {
            context.push_str("\n\n");
        }
        context.push_str(&other.title);
        context.push_str(":\n");
        context.push_str(&text);
    }
    context
}

fn parse_titles(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(3)
        .map(str::to_owned)
        .collect()
}

/// Drives the generation service for one treatment at a time: chapter
/// drafts, title suggestions, smart edits, and the optional extras bundle.
pub struct Generator {
    client: GenerationClient,
}

impl Generator {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    /// Generates a full draft for one chapter. The result is passed through
    /// the naturalizer when the treatment has it enabled.
    pub async fn generate_chapter(
        &self,
        treatment: &Treatment,
        chapter: &Chapter,
        cancel: &CancellationToken,
    ) -> Result<String, GenerateError> {
        let settings = &treatment.settings;
        let context = sibling_context(treatment, &chapter.id);
        let task = format!(
            "{}\n{}",
            build_system_prompt(settings),
            build_chapter_prompt(chapter, settings, &context)
        );
        let params = GenerationParams {
            style: Some(style_for(settings.tone).to_owned()),
            additional_context: build_additional_context(settings),
            temperature: Some(0.85),
            top_p: Some(0.9),
            top_k: Some(50),
            max_tokens: Some(2000),
        };

        let session = session_id(&treatment.id, &chapter.id, "chapter");
        let text = self.client.generate(&session, &task, &params, cancel).await?;

        if settings.naturalize_text {
            Ok(naturalize(&text))
        } else {
            Ok(text)
        }
    }

    /// Suggests up to three alternative titles for a chapter.
    pub async fn alternative_titles(
        &self,
        treatment: &Treatment,
        chapter: &Chapter,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, GenerateError> {
        let settings = &treatment.settings;
        let task = build_alternative_titles_prompt(&chapter.title, settings);
        let params = GenerationParams {
            style: Some(style_for(settings.tone).to_owned()),
            temperature: Some(0.8),
            max_tokens: Some(200),
            ..GenerationParams::default()
        };

        let session = session_id(&treatment.id, &chapter.id, "titles");
        let text = self.client.generate(&session, &task, &params, cancel).await?;
        Ok(parse_titles(&text))
    }

    /// Rewrites a passage per the requested action. Shorten and tighten run
    /// cool and clipped; expand keeps the treatment's own voice.
    pub async fn smart_edit(
        &self,
        treatment: &Treatment,
        chapter: &Chapter,
        text: &str,
        action: SmartEditAction,
        cancel: &CancellationToken,
    ) -> Result<String, GenerateError> {
        let settings = &treatment.settings;
        let task = prompts::build_smart_edit_prompt(text, action, settings);
        let params = match action {
            SmartEditAction::Shorten | SmartEditAction::Tighten => GenerationParams {
                style: Some("minimal".to_owned()),
                temperature: Some(0.5),
                top_p: Some(0.85),
                top_k: Some(40),
                max_tokens: Some(1500),
                ..GenerationParams::default()
            },
            SmartEditAction::Expand => GenerationParams {
                style: Some(style_for(settings.tone).to_owned()),
                temperature: Some(0.7),
                max_tokens: Some(2000),
                ..GenerationParams::default()
            },
        };

        let session = session_id(&treatment.id, &chapter.id, "smart-edit");
        let revised = self.client.generate(&session, &task, &params, cancel).await?;
        let revised = revised.trim();

        if settings.naturalize_text {
            Ok(naturalize(revised))
        } else {
            Ok(revised.to_owned())
        }
    }

    /// Generates whichever extras the settings enable. Requires a non-empty
    /// brief. Cancellation aborts the whole bundle; any other per-call
    /// failure is logged and the remaining extras still run.
    pub async fn generate_extras(
        &self,
        treatment: &Treatment,
        cancel: &CancellationToken,
    ) -> Result<GeneratedExtras, GenerateError> {
        let settings = &treatment.settings;
        let mut out = GeneratedExtras::default();

        let Some(brief) = settings
            .brief
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
        else {
            return Ok(out);
        };

        if settings.enable_character_bios {
            let task = prompts::build_character_bios_prompt(brief, settings);
            match self.extras_call(treatment, "bios", &task, cancel).await {
                Ok(text) => out.character_bios = Some(extras::parse_character_bios(&text)),
                Err(err) => Self::tolerate(err, "character bios")?,
            }
        }

        if settings.enable_references {
            let task = prompts::build_references_prompt(brief, settings);
            match self.extras_call(treatment, "references", &task, cancel).await {
                Ok(text) => out.references = Some(extras::parse_references(&text)),
                Err(err) => Self::tolerate(err, "references")?,
            }
        }

        if settings.enable_script_ideas {
            let task = prompts::build_script_ideas_prompt(brief, settings);
            match self.extras_call(treatment, "script-ideas", &task, cancel).await {
                Ok(text) => out.script_ideas = Some(extras::parse_script_ideas(&text)),
                Err(err) => Self::tolerate(err, "script ideas")?,
            }
        }

        if settings.enable_bonus_outputs {
            let mut bonuses = Vec::new();
            for (kind, out_kind, unit, title) in [
                (BonusKind::Playlist, BonusOutputKind::Playlist, "bonus-playlist", "Playlist"),
                (
                    BonusKind::Watchlist,
                    BonusOutputKind::Watchlist,
                    "bonus-watchlist",
                    "Watchlist",
                ),
            ] {
                let task = prompts::build_bonus_outputs_prompt(kind, brief, settings);
                match self.extras_call(treatment, unit, &task, cancel).await {
                    Ok(text) => {
                        let items = extras::parse_list_items(&text);
                        if !items.is_empty() {
                            bonuses.push(BonusOutput {
                                kind: out_kind,
                                title: title.to_owned(),
                                items,
                            });
                        }
                    }
                    Err(err) => Self::tolerate(err, unit)?,
                }
            }
            if !bonuses.is_empty() {
                out.bonus_outputs = Some(bonuses);
            }
        }

        Ok(out)
    }

    async fn extras_call(
        &self,
        treatment: &Treatment,
        unit: &str,
        task: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GenerateError> {
        let params = GenerationParams {
            style: Some(style_for(treatment.settings.tone).to_owned()),
            temperature: Some(0.7),
            max_tokens: Some(1500),
            ..GenerationParams::default()
        };
        let session = session_id(&treatment.id, "extras", unit);
        self.client.generate(&session, task, &params, cancel).await
    }

    /// Cancellation stops the bundle; every other failure degrades to a
    /// warning so the remaining extras still get their chance.
    fn tolerate(err: GenerateError, unit: &str) -> Result<(), GenerateError> {
        if err.is_cancelled() {
            return Err(err);
        }
        tracing::warn!(unit, error = %err, "extras generation failed");
        Ok(())
    }
}
