use crate::treatment::{Chapter, Genre, Tone, TreatmentSettings};

/// Word targets used when neither the chapter nor the settings carry a
/// limit.
pub const TOPLINE_WORD_LIMIT: u32 = 100;
pub const DEFAULT_WORD_LIMIT: u32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartEditAction {
    Shorten,
    Expand,
    Tighten,
}

impl SmartEditAction {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "shorten" => Ok(Self::Shorten),
            "expand" => Ok(Self::Expand),
            "tighten" => Ok(Self::Tighten),
            other => anyhow::bail!("unsupported smart edit action: {other}"),
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Self::Shorten => {
                "Reduce this text by approximately 30-40% while preserving the key ideas \
                 and impact. Remove redundancy and unnecessary words."
            }
            Self::Expand => {
                "Expand this text by approximately 50% with more detail, examples, and \
                 vivid description. Add depth without padding."
            }
            Self::Tighten => {
                "Tighten this text to make it punchier and more impactful. Every word \
                 should earn its place. Remove any fluff."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusKind {
    Playlist,
    Watchlist,
    Moodboard,
}

impl BonusKind {
    fn instruction(&self) -> &'static str {
        match self {
            Self::Playlist => {
                "Create a music playlist (10-15 tracks) that captures the mood and energy \
                 of this project. Include artist - song title format."
            }
            Self::Watchlist => {
                "Create a watchlist (8-12 films/shows/commercials) for visual research \
                 that informs this project's style and approach."
            }
            Self::Moodboard => {
                "Suggest 10-15 visual references (photos, art, films, locations) that \
                 could inspire the mood board for this project."
            }
        }
    }
}

fn tone_description(tone: Tone) -> &'static str {
    match tone {
        Tone::Direct => "Clear, confident, straightforward. Get to the point. No fluff.",
        Tone::Conversational => {
            "Warm, engaging, like talking to a colleague. Natural and approachable."
        }
        Tone::Funny => {
            "Witty, playful, with clever observations. Make them smile while staying professional."
        }
        Tone::Poetic => {
            "Evocative, lyrical, painting pictures with words. Elegant and atmospheric."
        }
    }
}

fn genre_guidelines(genre: Genre) -> &'static str {
    match genre {
        Genre::Cars => {
            "- Emphasize movement, power, design, and emotion\n\
             - Reference automotive cinematography conventions\n\
             - Consider the relationship between driver and machine"
        }
        Genre::Tech => {
            "- Focus on innovation, simplicity, and human benefit\n\
             - Avoid jargon; make complex ideas accessible\n\
             - Show, don't just tell"
        }
        Genre::Sports => {
            "- Capture energy, determination, and triumph\n\
             - Reference iconic sports moments and cinematography\n\
             - Balance action with human story"
        }
        Genre::Fashion => {
            "- Emphasize style, attitude, and aspiration\n\
             - Reference fashion photography and film aesthetics\n\
             - Consider movement, texture, and mood"
        }
        Genre::Beauty => {
            "- Focus on transformation, confidence, and intimacy\n\
             - Lighting and closeup work are crucial\n\
             - Balance aspiration with authenticity"
        }
        Genre::Lifestyle => {
            "- Create relatable, aspirational moments\n\
             - Focus on real emotions and genuine connections\n\
             - Show the brand fitting naturally into life"
        }
        Genre::Food => {
            "- Make it look delicious and irresistible\n\
             - Consider texture, color, and appetite appeal\n\
             - Balance beautiful imagery with human enjoyment"
        }
        Genre::Travel => {
            "- Evoke wanderlust and discovery\n\
             - Balance iconic locations with intimate moments\n\
             - Consider cultural authenticity"
        }
        Genre::Luxury => {
            "- Emphasize craftsmanship, exclusivity, and desire\n\
             - Every detail matters\n\
             - Sophisticated, never ostentatious"
        }
        Genre::Healthcare => {
            "- Balance professionalism with empathy\n\
             - Focus on human impact and trust\n\
             - Avoid fear-based messaging"
        }
        Genre::Finance => {
            "- Build trust and clarity\n\
             - Make complex ideas simple and relatable\n\
             - Focus on human outcomes, not just numbers"
        }
        Genre::Other => "",
    }
}

fn chapter_guidance(chapter_title: &str) -> &'static str {
    match chapter_title {
        "INTRO" => {
            "Set up the vision. Hook them immediately. What's the big idea? What feeling \
             will this create?"
        }
        "APPROACH" => {
            "How will you bring this to life? What's your methodology and philosophy for \
             this specific project?"
        }
        "TONE" => {
            "Describe the emotional atmosphere. Reference films, music, moments. Make \
             them feel it."
        }
        "CASTING" => {
            "Who are we casting and why? What qualities are you looking for? How will \
             they embody the vision?"
        }
        "PERFORMANCE" => {
            "How will you direct the talent? What's the performance style? Natural? \
             Stylized? How will you get there?"
        }
        "CAMERA" => {
            "Describe your visual approach. Movement, lenses, framing. How does the \
             camera serve the story?"
        }
        "LOOK & FEEL" => {
            "Paint the picture. Color palette, lighting, mood, texture. Reference visual \
             influences."
        }
        "EDIT" => {
            "Pacing, rhythm, structure. How will the edit enhance the narrative and \
             emotion?"
        }
        "MUSIC" => {
            "What role does music play? Genre, mood, specific tracks or original score? \
             How does it elevate the spot?"
        }
        "SOUND" => {
            "Sound design, effects, atmosphere. How does audio complete the world?"
        }
        "SCRIPTS" => {
            "If there's dialogue or VO, how will it be delivered? What's the writing \
             style and tone?"
        }
        "CONCLUSION" => {
            "Bring it home. Remind them why your vision wins. What makes this treatment \
             special?"
        }
        _ => "Provide compelling, specific content for this section.",
    }
}

/// Renders the system instruction block. Pure: identical settings produce
/// byte-identical output.
pub fn build_system_prompt(settings: &TreatmentSettings) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are an expert commercial director and treatment writer. You help directors \
         craft compelling, professional treatments for commercial pitches.\n\n",
    );
    prompt.push_str(&format!("TONE: {}\n", tone_description(settings.tone)));
    prompt.push_str(&format!("GENRE: {}\n\n", settings.genre.as_str()));

    if let Some(style) = settings.style_emulation.as_deref()
        && !style.trim().is_empty()
    {
        prompt.push_str(&format!("WRITING STYLE TO EMULATE:\n{style}\n\n"));
    }

    if settings.creative_modes.tighten {
        prompt.push_str(
            "CREATIVE MODE: TIGHTEN - Use concise, punchy language. Every word must earn \
             its place.\n",
        );
    }
    if settings.creative_modes.quips {
        prompt.push_str(
            "CREATIVE MODE: QUIPS - Inject wit, humor, and memorable one-liners \
             throughout.\n",
        );
    }
    if settings.creative_modes.curveball {
        prompt.push_str(
            "CREATIVE MODE: CURVEBALL - Take unexpected angles and surprising \
             approaches.\n",
        );
    }

    prompt.push_str(
        "\nGUIDELINES:\n\
         - Write in a confident, professional voice that sounds like a real director, not AI\n\
         - Be specific and visual in your descriptions\n\
         - Avoid clichés, corporate jargon, and AI-typical phrases\n\
         - Use active voice and strong verbs\n\
         - Make every sentence count\n",
    );
    if settings.naturalize_text {
        prompt.push_str(
            "- Write naturally - NO phrases like \"in conclusion,\" \"it's worth \
             noting,\" \"additionally,\" etc.\n",
        );
    }
    prompt.push_str(
        "- Focus on the creative vision and execution\n\
         - Reference the brief and director's vision throughout\n",
    );

    let genre_notes = genre_guidelines(settings.genre);
    if !genre_notes.is_empty() {
        prompt.push('\n');
        prompt.push_str(genre_notes);
        prompt.push('\n');
    }

    prompt
}

/// Effective word target for a chapter: its own limit, else the settings
/// limit keyed by chapter id, else the mode default.
pub fn word_limit_for(chapter: &Chapter, settings: &TreatmentSettings) -> u32 {
    chapter
        .word_count_limit
        .or_else(|| settings.word_count_limits.get(&chapter.id).copied())
        .unwrap_or(if settings.topline_mode {
            TOPLINE_WORD_LIMIT
        } else {
            DEFAULT_WORD_LIMIT
        })
}

pub fn build_chapter_prompt(
    chapter: &Chapter,
    settings: &TreatmentSettings,
    context: &str,
) -> String {
    let word_limit = word_limit_for(chapter, settings);

    let mut prompt = format!("Write the \"{}\" section of the treatment.\n\n", chapter.title);

    if let Some(brief) = settings.brief.as_deref()
        && !brief.trim().is_empty()
    {
        prompt.push_str(&format!("BRIEF:\n{brief}\n\n"));
    }
    if let Some(notes) = settings.notes.as_deref()
        && !notes.trim().is_empty()
    {
        prompt.push_str(&format!("DIRECTOR'S NOTES:\n{notes}\n\n"));
    }
    if let Some(chemistry) = settings.chemistry_call_notes.as_deref()
        && !chemistry.trim().is_empty()
    {
        prompt.push_str(&format!("CHEMISTRY CALL NOTES:\n{chemistry}\n\n"));
    }
    if !settings.reel_links.is_empty() {
        prompt.push_str(&format!(
            "DIRECTOR'S REEL REFERENCES:\n{}\n\n",
            settings.reel_links.join("\n")
        ));
    }
    if let Some(additional) = settings.additional_prompts.as_deref()
        && !additional.trim().is_empty()
    {
        prompt.push_str(&format!("ADDITIONAL INSTRUCTIONS:\n{additional}\n\n"));
    }

    if !context.is_empty() {
        prompt.push_str(&format!("OTHER SECTIONS FOR CONTEXT:\n{context}\n\n"));
    }

    prompt.push_str(chapter_guidance(&chapter.title));
    prompt.push_str("\n\n");

    if settings.topline_mode {
        prompt.push_str(&format!(
            "MODE: TOPLINE - Provide a concise summary (max {word_limit} words)\n"
        ));
    }
    prompt.push_str(&format!("TARGET LENGTH: {word_limit} words (approximate)\n\n"));
    prompt.push_str(
        "Write ONLY the content for this section. Do not include the chapter title or \
         any meta-commentary.",
    );

    prompt
}

pub fn build_smart_edit_prompt(
    text: &str,
    action: SmartEditAction,
    settings: &TreatmentSettings,
) -> String {
    format!(
        "{system}\n\
         \n\
         TASK: {task}\n\
         \n\
         ORIGINAL TEXT:\n\
         {text}\n\
         \n\
         Provide ONLY the revised text, with no preamble or explanation.",
        system = build_system_prompt(settings),
        task = action.instruction(),
    )
}

pub fn build_alternative_titles_prompt(
    chapter_title: &str,
    settings: &TreatmentSettings,
) -> String {
    format!(
        "{system}\n\
         \n\
         TASK: Suggest 3 alternative titles for the chapter currently called \"{chapter_title}\".\n\
         \n\
         Make them:\n\
         - Creative and engaging\n\
         - Appropriate for the tone and genre\n\
         - Professional but not boring\n\
         - Each should offer a different flavor/angle\n\
         \n\
         Provide ONLY the three titles, one per line, with no numbering or explanation.",
        system = build_system_prompt(settings),
    )
}

pub fn build_character_bios_prompt(brief: &str, settings: &TreatmentSettings) -> String {
    format!(
        "{system}\n\
         \n\
         BRIEF:\n\
         {brief}\n\
         \n\
         TASK: Create detailed character biographies for the main characters/talent in \
         this commercial.\n\
         \n\
         For each character, provide:\n\
         - Name/Role\n\
         - Brief description (2-3 sentences)\n\
         - Key traits (3-5 bullet points)\n\
         - Background/context\n\
         \n\
         Provide 2-4 character bios in a clear, structured format.",
        system = build_system_prompt(settings),
    )
}

pub fn build_references_prompt(brief: &str, settings: &TreatmentSettings) -> String {
    format!(
        "{system}\n\
         \n\
         BRIEF:\n\
         {brief}\n\
         \n\
         TASK: Suggest 3-5 film, TV, or commercial references that inform the visual \
         style and approach.\n\
         \n\
         For each reference, provide:\n\
         - Title\n\
         - Type (film/TV/commercial)\n\
         - Brief rationale (why it's relevant to this project)\n\
         \n\
         Make references specific and meaningful, not generic.",
        system = build_system_prompt(settings),
    )
}

pub fn build_script_ideas_prompt(brief: &str, settings: &TreatmentSettings) -> String {
    format!(
        "{system}\n\
         \n\
         BRIEF:\n\
         {brief}\n\
         \n\
         TASK: Generate 3-5 alternative scene or script ideas that could work for this \
         commercial.\n\
         \n\
         For each idea, provide:\n\
         - Scene number/name\n\
         - Description\n\
         - Sample dialogue (if applicable)\n\
         - Alternative approach or variation\n\
         \n\
         Be creative and offer distinct options.",
        system = build_system_prompt(settings),
    )
}

pub fn build_bonus_outputs_prompt(
    kind: BonusKind,
    brief: &str,
    settings: &TreatmentSettings,
) -> String {
    format!(
        "{system}\n\
         \n\
         BRIEF:\n\
         {brief}\n\
         \n\
         TASK: {task}\n\
         \n\
         Provide a clear list with brief context where helpful.",
        system = build_system_prompt(settings),
        task = kind.instruction(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::treatment::{CreativeModes, Treatment};

    #[test]
    fn system_prompt_is_deterministic() {
        let mut settings = TreatmentSettings::default();
        settings.tone = Tone::Direct;
        settings.genre = Genre::Cars;
        settings.creative_modes = CreativeModes {
            tighten: true,
            quips: false,
            curveball: true,
        };
        settings.style_emulation = Some("Short declaratives.".to_owned());

        assert_eq!(build_system_prompt(&settings), build_system_prompt(&settings));
    }

    #[test]
    fn system_prompt_reflects_tone_genre_and_modes() {
        let mut settings = TreatmentSettings::default();
        settings.tone = Tone::Poetic;
        settings.genre = Genre::Food;
        settings.creative_modes.quips = true;

        let prompt = build_system_prompt(&settings);
        assert!(prompt.contains("Evocative, lyrical"));
        assert!(prompt.contains("GENRE: FOOD"));
        assert!(prompt.contains("CREATIVE MODE: QUIPS"));
        assert!(!prompt.contains("CREATIVE MODE: TIGHTEN"));
        assert!(prompt.contains("delicious and irresistible"));
    }

    #[test]
    fn other_genre_gets_no_genre_guidance() {
        let settings = TreatmentSettings::default();
        let prompt = build_system_prompt(&settings);
        assert!(prompt.contains("GENRE: OTHER"));
        assert!(!prompt.contains("Emphasize movement"));
    }

    #[test]
    fn naturalize_flag_toggles_guideline_line() {
        let mut settings = TreatmentSettings::default();
        assert!(build_system_prompt(&settings).contains("Write naturally"));
        settings.naturalize_text = false;
        assert!(!build_system_prompt(&settings).contains("Write naturally"));
    }

    #[test]
    fn word_limit_prefers_chapter_then_settings_then_mode_default() {
        let mut treatment = Treatment::with_default_chapters("Spot");
        let chapter_id = treatment.chapters[0].id.clone();
        let mut settings = treatment.settings.clone();

        assert_eq!(word_limit_for(&treatment.chapters[0], &settings), DEFAULT_WORD_LIMIT);

        settings.topline_mode = true;
        assert_eq!(word_limit_for(&treatment.chapters[0], &settings), TOPLINE_WORD_LIMIT);

        settings.word_count_limits.insert(chapter_id, 250);
        assert_eq!(word_limit_for(&treatment.chapters[0], &settings), 250);

        treatment.chapters[0].word_count_limit = Some(120);
        assert_eq!(word_limit_for(&treatment.chapters[0], &settings), 120);
    }

    #[test]
    fn chapter_prompt_includes_guidance_and_custom_fallback() {
        let treatment = Treatment::with_default_chapters("Spot");
        let settings = treatment.settings.clone();

        let intro = build_chapter_prompt(&treatment.chapters[0], &settings, "");
        assert!(intro.contains("Set up the vision."));

        let custom = Chapter::new("B-ROLL", true, 12);
        let prompt = build_chapter_prompt(&custom, &settings, "");
        assert!(prompt.contains("Provide compelling, specific content for this section."));
    }

    #[test]
    fn chapter_prompt_renders_optional_blocks_only_when_set() {
        let treatment = Treatment::with_default_chapters("Spot");
        let mut settings = treatment.settings.clone();
        let chapter = &treatment.chapters[0];

        let bare = build_chapter_prompt(chapter, &settings, "");
        assert!(!bare.contains("BRIEF:"));
        assert!(!bare.contains("OTHER SECTIONS FOR CONTEXT:"));

        settings.brief = Some("Electric sedan launch.".to_owned());
        settings.reel_links = vec!["https://example.com/reel".to_owned()];
        let full = build_chapter_prompt(chapter, &settings, "TONE:\nMoody.");
        assert!(full.contains("BRIEF:\nElectric sedan launch."));
        assert!(full.contains("DIRECTOR'S REEL REFERENCES:\nhttps://example.com/reel"));
        assert!(full.contains("OTHER SECTIONS FOR CONTEXT:\nTONE:\nMoody."));
    }

    #[test]
    fn smart_edit_action_parse_accepts_known_actions() {
        assert_eq!(SmartEditAction::parse("shorten").unwrap(), SmartEditAction::Shorten);
        assert_eq!(SmartEditAction::parse(" Expand ").unwrap(), SmartEditAction::Expand);
        assert!(SmartEditAction::parse("rewrite").is_err());
    }
}
