use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blocks::BlockDocument;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tone {
    Direct,
    Conversational,
    Funny,
    Poetic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    Cars,
    Tech,
    Sports,
    Fashion,
    Beauty,
    Lifestyle,
    Food,
    Travel,
    Luxury,
    Healthcare,
    Finance,
    Other,
}

impl Genre {
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Cars => "CARS",
            Genre::Tech => "TECH",
            Genre::Sports => "SPORTS",
            Genre::Fashion => "FASHION",
            Genre::Beauty => "BEAUTY",
            Genre::Lifestyle => "LIFESTYLE",
            Genre::Food => "FOOD",
            Genre::Travel => "TRAVEL",
            Genre::Luxury => "LUXURY",
            Genre::Healthcare => "HEALTHCARE",
            Genre::Finance => "FINANCE",
            Genre::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreativeModes {
    pub tighten: bool,
    pub quips: bool,
    pub curveball: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentSettings {
    pub tone: Tone,
    pub genre: Genre,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_emulation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chemistry_call_notes: Option<String>,
    #[serde(default)]
    pub reel_links: Vec<String>,
    /// Chapter id -> target word count, applied when the chapter itself
    /// carries no limit.
    #[serde(default)]
    pub word_count_limits: HashMap<String, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_prompts: Option<String>,
    pub topline_mode: bool,
    pub naturalize_text: bool,
    pub creative_modes: CreativeModes,
    pub enable_script_ideas: bool,
    pub enable_character_bios: bool,
    pub enable_references: bool,
    pub enable_bonus_outputs: bool,
}

impl Default for TreatmentSettings {
    fn default() -> Self {
        Self {
            tone: Tone::Conversational,
            genre: Genre::Other,
            style_emulation: None,
            brief: None,
            notes: None,
            chemistry_call_notes: None,
            reel_links: Vec::new(),
            word_count_limits: HashMap::new(),
            additional_prompts: None,
            topline_mode: false,
            naturalize_text: true,
            creative_modes: CreativeModes::default(),
            enable_script_ideas: false,
            enable_character_bios: false,
            enable_references: false,
            enable_bonus_outputs: false,
        }
    }
}

/// Partial overlay applied by `DocumentStore::update_settings`. Fields left
/// as `None` keep the current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub tone: Option<Tone>,
    pub genre: Option<Genre>,
    pub style_emulation: Option<Option<String>>,
    pub brief: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub chemistry_call_notes: Option<Option<String>>,
    pub reel_links: Option<Vec<String>>,
    pub additional_prompts: Option<Option<String>>,
    pub topline_mode: Option<bool>,
    pub naturalize_text: Option<bool>,
    pub creative_modes: Option<CreativeModes>,
    pub enable_script_ideas: Option<bool>,
    pub enable_character_bios: Option<bool>,
    pub enable_references: Option<bool>,
    pub enable_bonus_outputs: Option<bool>,
}

impl TreatmentSettings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(tone) = patch.tone {
            self.tone = tone;
        }
        if let Some(genre) = patch.genre {
            self.genre = genre;
        }
        if let Some(style_emulation) = patch.style_emulation {
            self.style_emulation = style_emulation;
        }
        if let Some(brief) = patch.brief {
            self.brief = brief;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(chemistry_call_notes) = patch.chemistry_call_notes {
            self.chemistry_call_notes = chemistry_call_notes;
        }
        if let Some(reel_links) = patch.reel_links {
            self.reel_links = reel_links;
        }
        if let Some(additional_prompts) = patch.additional_prompts {
            self.additional_prompts = additional_prompts;
        }
        if let Some(topline_mode) = patch.topline_mode {
            self.topline_mode = topline_mode;
        }
        if let Some(naturalize_text) = patch.naturalize_text {
            self.naturalize_text = naturalize_text;
        }
        if let Some(creative_modes) = patch.creative_modes {
            self.creative_modes = creative_modes;
        }
        if let Some(enable_script_ideas) = patch.enable_script_ideas {
            self.enable_script_ideas = enable_script_ideas;
        }
        if let Some(enable_character_bios) = patch.enable_character_bios {
            self.enable_character_bios = enable_character_bios;
        }
        if let Some(enable_references) = patch.enable_references {
            self.enable_references = enable_references;
        }
        if let Some(enable_bonus_outputs) = patch.enable_bonus_outputs {
            self.enable_bonus_outputs = enable_bonus_outputs;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// Serialized block document (`BlockDocument` as JSON).
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_titles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count_limit: Option<u32>,
    pub is_custom: bool,
    pub order: usize,
}

impl Chapter {
    pub fn new(title: impl Into<String>, is_custom: bool, order: usize) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            content: BlockDocument::empty().to_json(),
            alternative_titles: None,
            word_count_limit: None,
            is_custom,
            order,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub treatment_id: String,
    pub timestamp: DateTime<Utc>,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    pub id: String,
    pub title: String,
    pub chapters: Vec<Chapter>,
    pub settings: TreatmentSettings,
    #[serde(default)]
    pub versions: Vec<Version>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_CHAPTERS: [&str; 12] = [
    "INTRO",
    "APPROACH",
    "TONE",
    "CASTING",
    "PERFORMANCE",
    "CAMERA",
    "LOOK & FEEL",
    "EDIT",
    "MUSIC",
    "SOUND",
    "SCRIPTS",
    "CONCLUSION",
];

impl Treatment {
    /// A fresh treatment with the fixed default chapter set, each chapter
    /// holding an empty block document.
    pub fn with_default_chapters(title: impl Into<String>) -> Self {
        let now = Utc::now();
        let chapters = DEFAULT_CHAPTERS
            .iter()
            .enumerate()
            .map(|(order, chapter_title)| Chapter::new(*chapter_title, false, order))
            .collect();

        Self {
            id: new_id(),
            title: title.into(),
            chapters,
            settings: TreatmentSettings::default(),
            versions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == chapter_id)
    }

    pub fn chapter_mut(&mut self, chapter_id: &str) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|c| c.id == chapter_id)
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
