//! Static content index: datasets of themed sections holding effect entries.
//!
//! Records are validated at load time. A malformed entry is dropped and a
//! malformed theme is replaced by a neutral one; both are reported through
//! `ContentIndex::issues` instead of rendering as blanks.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ContentError, ContentResult};

/// Number of card slots rendered per section.
pub const SECTION_SLOTS: usize = 3;

/// One demo/effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub name: Option<String>,
    pub description: String,
    pub url: String,
    pub tags: Vec<String>,
    pub interactive: Vec<String>,
    pub has_real_code: bool,
    pub is_heavy: bool,
    pub status: Option<String>,
}

impl Entry {
    /// Tag membership, ignoring ASCII case ("WebGL" and "webgl" are one tag).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Lower-cased `title + description + tags`, space separated.
    pub fn searchable_text(&self) -> String {
        let mut text = String::with_capacity(
            self.title.len() + self.description.len() + self.tags.len() * 8,
        );
        text.push_str(&self.title);
        text.push(' ');
        text.push_str(&self.description);
        for tag in &self.tags {
            text.push(' ');
            text.push_str(tag);
        }
        text.to_lowercase()
    }

    /// Whether this entry gets a live embedded preview managed by the pool.
    /// Heavy entries only ever get a launch affordance.
    pub fn is_poolable(&self) -> bool {
        self.has_real_code && !self.is_heavy
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "file")]
    url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    interactive: Vec<String>,
    #[serde(default)]
    has_real_code: Option<bool>,
    #[serde(default)]
    is_heavy: bool,
    #[serde(default)]
    status: Option<String>,
}

impl RawEntry {
    fn validate(self, context: &str) -> ContentResult<Entry> {
        let title = non_blank(self.title).ok_or_else(|| ContentError::MissingField {
            context: context.to_string(),
            field: "title",
        })?;
        let url = non_blank(self.url).ok_or_else(|| ContentError::MissingField {
            context: context.to_string(),
            field: "url",
        })?;
        let id = match self.id {
            None => derive_id(&url),
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => {
                return Err(ContentError::InvalidField {
                    context: context.to_string(),
                    field: "id",
                })
            }
        };

        Ok(Entry {
            id,
            title,
            name: self.name,
            description: self.description,
            url,
            tags: self.tags,
            interactive: self.interactive,
            has_real_code: self.has_real_code.unwrap_or(true),
            is_heavy: self.is_heavy,
            status: self.status,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// File stem of the locator, e.g. `effects/pulse.html` → `pulse`.
fn derive_id(url: &str) -> String {
    let trimmed = url.trim_start_matches("./");
    let file = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let stem = file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file);
    if stem.is_empty() {
        trimmed.to_string()
    } else {
        stem.to_string()
    }
}

/// Per-section parameters for the background visualizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    pub name: String,
    pub geometry: String,
    pub density: f32,
    pub rotation: [f32; 4],
    pub color: [f32; 3],
}

impl Theme {
    fn fallback(index: usize) -> Self {
        Self {
            name: format!("Section {}", index + 1),
            geometry: "hypercube".into(),
            density: 8.0,
            rotation: [0.3, 0.2, 0.4, 0.1],
            color: [0.0, 1.0, 1.0],
        }
    }

    /// URL-safe section identifier: "Neural Awakening" → "neural-awakening".
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[derive(Debug, Deserialize)]
struct RawTheme {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    geometry: String,
    #[serde(default)]
    density: Option<f32>,
    #[serde(default)]
    rotation: Vec<f32>,
    #[serde(default, alias = "color")]
    colors: Vec<f32>,
}

impl RawTheme {
    fn validate(self, index: usize) -> ContentResult<Theme> {
        let name = non_blank(self.name).unwrap_or_else(|| format!("Section {}", index + 1));
        let invalid = |reason: String| ContentError::InvalidTheme {
            name: name.clone(),
            reason,
        };

        let density = match self.density {
            Some(d) if d.is_finite() && d > 0.0 => d,
            Some(d) => return Err(invalid(format!("density must be positive, got {d}"))),
            None => return Err(invalid("missing density".into())),
        };
        let rotation = <[f32; 4]>::try_from(self.rotation.as_slice()).map_err(|_| {
            invalid(format!("rotation needs 4 components, got {}", self.rotation.len()))
        })?;
        let color = <[f32; 3]>::try_from(self.colors.as_slice()).map_err(|_| {
            invalid(format!("colors needs 3 components, got {}", self.colors.len()))
        })?;

        Ok(Theme {
            name: name.clone(),
            geometry: self.geometry,
            density,
            rotation,
            color,
        })
    }
}

/// A themed group of entries. Only the first `SECTION_SLOTS` are shown as cards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSection {
    pub theme: Theme,
    pub entries: Vec<Entry>,
}

impl ContentSection {
    /// Entry shown in card slot `slot`, `None` for a hidden slot.
    pub fn slot(&self, slot: usize) -> Option<&Entry> {
        if slot < SECTION_SLOTS {
            self.entries.get(slot)
        } else {
            None
        }
    }

    pub fn filled_slots(&self) -> usize {
        self.entries.len().min(SECTION_SLOTS)
    }
}

/// Label and launch text for heavy entries rendered without a live preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeavyPreview {
    pub label: String,
    pub button: String,
    pub description: Vec<String>,
}

impl Default for HeavyPreview {
    fn default() -> Self {
        Self {
            label: "⚡ MEGA SYSTEM".into(),
            button: "◆ Launch System".into(),
            description: vec!["125 WebGL visualizers".into()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawHeavyPreview {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    button: Option<String>,
    #[serde(default)]
    description: Option<Vec<String>>,
}

impl From<RawHeavyPreview> for HeavyPreview {
    fn from(raw: RawHeavyPreview) -> Self {
        let defaults = HeavyPreview::default();
        Self {
            label: raw.label.unwrap_or(defaults.label),
            button: raw.button.unwrap_or(defaults.button),
            description: raw.description.unwrap_or(defaults.description),
        }
    }
}

/// Position of a card: section index and slot index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntryLocation {
    pub section: usize,
    pub slot: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDataset {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    log_prefix: Option<String>,
    #[serde(default)]
    heavy_preview: Option<RawHeavyPreview>,
    #[serde(default)]
    content_sets: Vec<Vec<Value>>,
    #[serde(default)]
    polytop_themes: Vec<Value>,
}

/// One curated gallery: ordered sections, each paired with a theme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub key: String,
    pub title: String,
    pub subtitle: String,
    pub log_prefix: String,
    pub heavy_preview: HeavyPreview,
    pub sections: Vec<ContentSection>,
}

impl Dataset {
    /// Validate one dataset record. Recoverable problems are pushed onto `issues`.
    fn from_value(key: &str, value: Value, issues: &mut Vec<ContentError>) -> ContentResult<Self> {
        let raw: RawDataset = serde_json::from_value(value)?;

        if raw.polytop_themes.len() != raw.content_sets.len() {
            issues.push(ContentError::SectionMismatch {
                dataset: key.to_string(),
                themes: raw.polytop_themes.len(),
                sets: raw.content_sets.len(),
            });
        }

        let mut seen_ids: HashMap<String, usize> = HashMap::new();
        let mut sections = Vec::new();
        let mut overfull = 0;

        for (index, (theme_value, set)) in raw
            .polytop_themes
            .into_iter()
            .zip(raw.content_sets)
            .enumerate()
        {
            let theme = serde_json::from_value::<RawTheme>(theme_value)
                .map_err(ContentError::from)
                .and_then(|t| t.validate(index))
                .unwrap_or_else(|e| {
                    issues.push(e);
                    Theme::fallback(index)
                });

            let mut entries = Vec::with_capacity(set.len());
            for (slot, entry_value) in set.into_iter().enumerate() {
                let context = format!("{key} section {} entry {}", index + 1, slot + 1);
                let entry = serde_json::from_value::<RawEntry>(entry_value)
                    .map_err(ContentError::from)
                    .and_then(|raw| raw.validate(&context));
                match entry {
                    Ok(mut entry) => {
                        let count = seen_ids.entry(entry.id.clone()).or_insert(0);
                        *count += 1;
                        if *count > 1 {
                            entry.id = format!("{}-{}", entry.id, count);
                        }
                        entries.push(entry);
                    }
                    Err(e) => issues.push(e),
                }
            }
            if entries.len() > SECTION_SLOTS {
                overfull += 1;
            }
            sections.push(ContentSection { theme, entries });
        }

        if sections.is_empty() {
            return Err(ContentError::EmptyDataset(key.to_string()));
        }
        if overfull > 0 {
            issues.push(ContentError::OverfullSections {
                dataset: key.to_string(),
                sections: overfull,
                slots: SECTION_SLOTS,
            });
        }

        Ok(Self {
            key: key.to_string(),
            title: raw.title.unwrap_or_else(|| "Visual Codex".into()),
            subtitle: raw.subtitle.unwrap_or_else(|| "4D Polytopal Visualizer".into()),
            log_prefix: raw.log_prefix.unwrap_or_else(|| "Visual Codex System".into()),
            heavy_preview: raw.heavy_preview.map(HeavyPreview::from).unwrap_or_default(),
            sections,
        })
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn section(&self, index: usize) -> Option<&ContentSection> {
        self.sections.get(index)
    }

    /// Every entry in position order, including those beyond the card slots.
    pub fn entries(&self) -> impl Iterator<Item = (EntryLocation, &Entry)> {
        self.sections.iter().enumerate().flat_map(|(section, s)| {
            s.entries
                .iter()
                .enumerate()
                .map(move |(slot, entry)| (EntryLocation { section, slot }, entry))
        })
    }

    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }

    pub fn entry_at(&self, location: EntryLocation) -> Option<&Entry> {
        self.sections
            .get(location.section)
            .and_then(|s| s.entries.get(location.slot))
    }

    pub fn find_by_id(&self, id: &str) -> Option<(EntryLocation, &Entry)> {
        self.entries().find(|(_, e)| e.id == id)
    }

    /// Match a page path against entry locators: exact first, then suffix.
    pub fn find_by_file(&self, file: &str) -> Option<(EntryLocation, &Entry)> {
        let normalized = file.trim_start_matches("./");
        if normalized.is_empty() {
            return None;
        }
        self.entries()
            .find(|(_, e)| e.url == normalized)
            .or_else(|| self.entries().find(|(_, e)| e.url.ends_with(normalized)))
    }

    /// All positions holding `url`, earliest first.
    pub fn locations_of_url(&self, url: &str) -> Vec<EntryLocation> {
        self.entries()
            .filter(|(_, e)| e.url == url)
            .map(|(loc, _)| loc)
            .collect()
    }

    /// Distinct tags in first-seen spelling, sorted case-insensitively.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: BTreeMap<String, String> = BTreeMap::new();
        for (_, entry) in self.entries() {
            for tag in &entry.tags {
                tags.entry(tag.to_lowercase()).or_insert_with(|| tag.clone());
            }
        }
        tags.into_values().collect()
    }

    pub fn section_by_slug(&self, slug: &str) -> Option<usize> {
        let wanted = slugify(slug);
        self.sections.iter().position(|s| s.theme.slug() == wanted)
    }
}

/// Registry of datasets keyed by lower-cased dataset key.
#[derive(Debug, Default)]
pub struct ContentIndex {
    datasets: BTreeMap<String, Arc<Dataset>>,
    issues: Vec<ContentError>,
}

impl ContentIndex {
    pub fn from_json(text: &str) -> ContentResult<Self> {
        let root: BTreeMap<String, Value> = serde_json::from_str(text)?;
        let mut index = ContentIndex::default();

        for (key, value) in root {
            let key = key.to_lowercase();
            match Dataset::from_value(&key, value, &mut index.issues) {
                Ok(dataset) => {
                    index.datasets.insert(key, Arc::new(dataset));
                }
                Err(e) => {
                    tracing::warn!("Skipping dataset {key}: {e}");
                    index.issues.push(e);
                }
            }
        }

        for issue in &index.issues {
            tracing::warn!("Content index: {issue}");
        }

        if index.datasets.is_empty() {
            return Err(ContentError::EmptyIndex);
        }
        Ok(index)
    }

    pub fn load(path: &Path) -> ContentResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn get(&self, key: &str) -> Option<Arc<Dataset>> {
        self.datasets.get(&key.to_lowercase()).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn datasets(&self) -> impl Iterator<Item = &Arc<Dataset>> {
        self.datasets.values()
    }

    pub fn issues(&self) -> &[ContentError] {
        &self.issues
    }

    /// Pick the dataset to show: requested key, then a hash naming a dataset,
    /// then `default_key`, then the first available key.
    pub fn resolve(
        &self,
        requested: Option<&str>,
        hash: Option<&str>,
        default_key: &str,
    ) -> Option<Arc<Dataset>> {
        if let Some(dataset) = requested.and_then(|k| self.get(k)) {
            return Some(dataset);
        }
        if let Some(dataset) = hash.and_then(|h| self.get(h.trim_start_matches('#'))) {
            return Some(dataset);
        }
        if let Some(key) = requested {
            tracing::warn!("Requested dataset {key:?} is unavailable, falling back to default");
        }
        self.get(default_key)
            .or_else(|| self.datasets.values().next().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "proper": {
            "title": "Visual Codex Proper",
            "contentSets": [
                [
                    {"title": "WebGL Framework", "description": "Hypercube core", "tags": ["WebGL", "Core"], "url": "effects/core.html"},
                    {"title": "CSS Glitch", "description": "RGB split", "tags": ["CSS"], "url": "demos/glitch.html"},
                    {"title": "Mega", "description": "125 visualizers", "tags": ["WebGL"], "url": "demos/mega.html", "isHeavy": true},
                    {"title": "Overflow", "description": "fourth entry", "tags": ["CSS"], "url": "demos/overflow.html"}
                ],
                [
                    {"title": "Core Again", "description": "same page", "tags": ["WebGL"], "url": "effects/core.html"}
                ]
            ],
            "polytopThemes": [
                {"name": "Holographic Genesis", "geometry": "hypercube", "rotation": [0.3, 0.2, 0.4, 0.1], "density": 5.0, "colors": [1.0, 0.0, 1.0]},
                {"name": "Plasma Emergence", "geometry": "octaplex", "rotation": [0.4, 0.3, 0.2, 0.5], "density": 6.5, "colors": [0.0, 1.0, 1.0]}
            ]
        },
        "twin": {
            "heavyPreview": {"label": "⚙ Automation Artifact"},
            "contentSets": [[{"file": "effects/a.html", "title": "A", "id": 7}]],
            "polytopThemes": [{"name": "Aurora Bloom", "rotation": [0.1, 0.2], "density": 6.0, "colors": [0.5, 0.9, 1.0]}]
        }
    }"#;

    #[test]
    fn loads_sections_and_slots() {
        let index = ContentIndex::from_json(INDEX).unwrap();
        let proper = index.get("proper").unwrap();
        assert_eq!(proper.section_count(), 2);
        let first = proper.section(0).unwrap();
        assert_eq!(first.entries.len(), 4);
        assert_eq!(first.filled_slots(), 3);
        assert_eq!(first.slot(1).unwrap().title, "CSS Glitch");
        assert!(first.slot(3).is_none());
        assert!(proper.section(1).unwrap().slot(1).is_none());
        assert_eq!(proper.entry_count(), 5);
        assert!(index.issues().iter().any(|e| matches!(
            e,
            ContentError::OverfullSections { dataset, sections: 1, .. } if dataset == "proper"
        )));
    }

    #[test]
    fn derives_and_dedups_ids() {
        let index = ContentIndex::from_json(INDEX).unwrap();
        let proper = index.get("proper").unwrap();
        assert_eq!(proper.section(0).unwrap().entries[0].id, "core");
        assert_eq!(proper.section(1).unwrap().entries[0].id, "core-2");
        let twin = index.get("twin").unwrap();
        assert_eq!(twin.section(0).unwrap().entries[0].id, "7");
        assert_eq!(twin.section(0).unwrap().entries[0].url, "effects/a.html");
    }

    #[test]
    fn invalid_theme_is_flagged_and_replaced() {
        let index = ContentIndex::from_json(INDEX).unwrap();
        let twin = index.get("twin").unwrap();
        assert_eq!(twin.section(0).unwrap().theme.name, "Section 1");
        assert!(index
            .issues()
            .iter()
            .any(|e| matches!(e, ContentError::InvalidTheme { name, .. } if name == "Aurora Bloom")));
        assert_eq!(twin.heavy_preview.label, "⚙ Automation Artifact");
        assert_eq!(twin.heavy_preview.button, "◆ Launch System");
    }

    #[test]
    fn entry_missing_title_is_rejected() {
        let json = r#"{"x": {"contentSets": [[{"url": "a.html"}, {"title": "B", "url": "b.html"}]],
            "polytopThemes": [{"name": "T", "rotation": [0,0,0,0], "density": 1.0, "colors": [0,0,0]}]}}"#;
        let index = ContentIndex::from_json(json).unwrap();
        let x = index.get("x").unwrap();
        assert_eq!(x.section(0).unwrap().entries.len(), 1);
        assert!(matches!(
            index.issues()[0],
            ContentError::MissingField { field: "title", .. }
        ));
    }

    #[test]
    fn empty_or_garbage_index_is_an_error() {
        assert!(matches!(ContentIndex::from_json("{}"), Err(ContentError::EmptyIndex)));
        assert!(matches!(ContentIndex::from_json("not json"), Err(ContentError::Parse(_))));
    }

    #[test]
    fn searchable_text_and_tags() {
        let index = ContentIndex::from_json(INDEX).unwrap();
        let proper = index.get("proper").unwrap();
        let entry = proper.section(0).unwrap().slot(0).unwrap();
        assert_eq!(entry.searchable_text(), "webgl framework hypercube core webgl core");
        assert!(entry.has_tag("webgl"));
        assert_eq!(proper.tags(), vec!["Core", "CSS", "WebGL"]);
    }

    #[test]
    fn lookups_by_file_and_slug() {
        let index = ContentIndex::from_json(INDEX).unwrap();
        let proper = index.get("proper").unwrap();
        let (loc, _) = proper.find_by_file("./demos/glitch.html").unwrap();
        assert_eq!(loc, EntryLocation { section: 0, slot: 1 });
        let (loc, _) = proper.find_by_file("glitch.html").unwrap();
        assert_eq!(loc.slot, 1);
        assert_eq!(proper.section_by_slug("plasma-emergence"), Some(1));
        assert_eq!(proper.section_by_slug("Plasma Emergence"), Some(1));
        assert_eq!(proper.locations_of_url("effects/core.html").len(), 2);
    }

    #[test]
    fn resolve_falls_back_in_order() {
        let index = ContentIndex::from_json(INDEX).unwrap();
        assert_eq!(index.resolve(Some("TWIN"), None, "proper").unwrap().key, "twin");
        assert_eq!(index.resolve(Some("nope"), Some("#twin"), "proper").unwrap().key, "twin");
        assert_eq!(index.resolve(Some("nope"), None, "proper").unwrap().key, "proper");
        assert_eq!(index.resolve(None, None, "missing").unwrap().key, "proper");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Neural -- Awakening! "), "neural-awakening");
        assert_eq!(slugify("120cell"), "120cell");
    }
}
