use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterBio {
    pub name: String,
    pub description: String,
    pub traits: Vec<String>,
    pub background: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Film,
    Tv,
    Commercial,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    pub title: String,
    pub kind: ReferenceKind,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptIdea {
    pub scene_number: usize,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_approach: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BonusKind {
    Playlist,
    Watchlist,
    Moodboard,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BonusOutput {
    pub kind: BonusKind,
    pub title: String,
    pub items: Vec<String>,
}

/// Session-only creative supplements. Never persisted with the treatment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedExtras {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_bios: Option<Vec<CharacterBio>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_ideas: Option<Vec<ScriptIdea>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_outputs: Option<Vec<BonusOutput>>,
}

impl GeneratedExtras {
    pub fn is_empty(&self) -> bool {
        self.character_bios.is_none()
            && self.references.is_none()
            && self.script_ideas.is_none()
            && self.bonus_outputs.is_none()
    }
}

fn paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .flat_map(|p| p.split("\r\n\r\n"))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

fn is_bullet_line(line: &str) -> bool {
    line.contains('-') || line.contains('•')
}

fn strip_bullet_marker(line: &str) -> String {
    line.trim()
        .trim_start_matches(['-', '•'])
        .trim()
        .to_owned()
}

fn first_quoted(text: &str) -> Option<String> {
    let start = text.find('"')?;
    let rest = &text[start + 1..];
    let end = rest.find('"')?;
    let quoted = rest[..end].trim();
    if quoted.is_empty() {
        return None;
    }
    Some(quoted.to_owned())
}

fn label_value(line: &str) -> Option<&str> {
    for label in ["Name", "Character", "Role"] {
        let Some(rest) = strip_prefix_ignore_case(line.trim(), label) else {
            continue;
        };
        let rest = rest.trim_start_matches(':').trim();
        if !rest.is_empty() {
            return Some(rest);
        }
    }
    None
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() < prefix.len() {
        return None;
    }
    let (head, tail) = text.split_at(prefix.len());
    if head.eq_ignore_ascii_case(prefix) {
        Some(tail)
    } else {
        None
    }
}

/// Best-effort split of free-form bio text into records: blank-line
/// paragraphs, first line as the name, bullet lines as traits, last line as
/// background. Partially-empty records are fine.
pub fn parse_character_bios(text: &str) -> Vec<CharacterBio> {
    let mut bios = Vec::new();

    for section in paragraphs(text) {
        let lines = section.lines().map(str::trim).collect::<Vec<_>>();
        let Some(first) = lines.first() else {
            continue;
        };

        let name = label_value(first).unwrap_or(first).to_owned();
        let description = lines
            .iter()
            .skip(1)
            .take(2)
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_owned();
        let traits = lines
            .iter()
            .filter(|l| is_bullet_line(l))
            .map(|l| strip_bullet_marker(l))
            .filter(|t| !t.is_empty())
            .collect();
        let background = lines.last().copied().unwrap_or_default().to_owned();

        bios.push(CharacterBio {
            name,
            description,
            traits,
            background,
        });
    }

    bios
}

/// One reference per non-empty line: quoted substring as title (else text
/// before the first dash), a `(film|tv|commercial)` tag as the kind, the
/// after-dash remainder as rationale.
pub fn parse_references(text: &str) -> Vec<Reference> {
    let mut references = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let title = first_quoted(line)
            .or_else(|| {
                line.split(['-', '–'])
                    .next()
                    .map(|s| s.trim().to_owned())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| line.to_owned());

        let lowered = line.to_lowercase();
        let kind = if lowered.contains("(tv)") {
            ReferenceKind::Tv
        } else if lowered.contains("(commercial)") {
            ReferenceKind::Commercial
        } else {
            ReferenceKind::Film
        };

        let rationale = line
            .split(['-', '–'])
            .skip(1)
            .collect::<Vec<_>>()
            .join("-")
            .trim()
            .to_owned();

        references.push(Reference {
            title,
            kind,
            rationale,
        });
    }

    references
}

/// Blank-line paragraphs as scenes, numbered in order; the first quoted
/// substring inside a scene is treated as sample dialogue.
pub fn parse_script_ideas(text: &str) -> Vec<ScriptIdea> {
    paragraphs(text)
        .into_iter()
        .enumerate()
        .map(|(idx, section)| ScriptIdea {
            scene_number: idx + 1,
            description: section.to_owned(),
            dialogue: first_quoted(section),
            alternative_approach: None,
        })
        .collect()
}

/// Line-per-item list for playlists, watchlists, and moodboards.
pub fn parse_list_items(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}
