//! Shareable links: `?gallery=<key>&section=<slug>&wafer=<n>#<slug>`.
//!
//! Parsing never fails. Unknown or malformed parameters are dropped and the
//! caller falls back to defaults; `wafer` is 1-based on the wire.

use url::{form_urlencoded, Url};
use vitrine_core::content::SECTION_SLOTS;
use vitrine_core::Dataset;

/// Base used to resolve relative links such as `?section=x`.
pub const DEFAULT_BASE: &str = "https://vitrine.local/";

const DATASET_PARAMS: [&str; 3] = ["gallery", "dataset", "mode"];
const CARD_PARAMS: [&str; 2] = ["wafer", "card"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLink {
    /// Lower-cased dataset key.
    pub dataset: Option<String>,
    /// Section slug or 1-based section number, as written.
    pub section: Option<String>,
    /// Zero-based card slot.
    pub card: Option<usize>,
    /// Fragment without the leading `#`.
    pub hash: Option<String>,
}

/// Where a link lands inside one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTarget {
    pub section: usize,
    pub spotlight: Option<usize>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl DeepLink {
    /// Parse an absolute URL or a relative reference (`?a=b#c`, `page.html?...`).
    pub fn parse(input: &str) -> Self {
        let parsed = Url::parse(input).or_else(|_| {
            Url::parse(DEFAULT_BASE).and_then(|base| base.join(input.trim()))
        });
        match parsed {
            Ok(url) => Self::from_url(&url),
            Err(e) => {
                tracing::warn!("Ignoring malformed link {input:?}: {e}");
                Self::default()
            }
        }
    }

    pub fn from_url(url: &Url) -> Self {
        let mut link = DeepLink::default();
        let mut dataset_rank = usize::MAX;
        let mut card_rank = usize::MAX;
        for (key, value) in url.query_pairs() {
            if let Some(rank) = DATASET_PARAMS.iter().position(|p| *p == key) {
                if rank < dataset_rank {
                    if let Some(v) = non_empty(&value) {
                        link.dataset = Some(v.to_lowercase());
                        dataset_rank = rank;
                    }
                }
            } else if key == "section" {
                if link.section.is_none() {
                    link.section = non_empty(&value);
                }
            } else if let Some(rank) = CARD_PARAMS.iter().position(|p| *p == key) {
                if rank < card_rank {
                    if let Some(card) = parse_card(&value) {
                        link.card = Some(card);
                        card_rank = rank;
                    }
                }
            }
        }
        link.hash = url.fragment().and_then(non_empty);
        link
    }

    /// Section index inside `dataset`: the `section` parameter (slug or
    /// 1-based number), else a hash naming a section.
    pub fn section_index(&self, dataset: &Dataset) -> Option<usize> {
        let last = dataset.section_count().checked_sub(1)?;
        if let Some(section) = &self.section {
            if let Some(index) = dataset.section_by_slug(section) {
                return Some(index);
            }
            if let Ok(number) = section.parse::<usize>() {
                return Some(number.saturating_sub(1).min(last));
            }
            tracing::debug!("Unknown section {section:?} in link");
        }
        self.hash
            .as_deref()
            .and_then(|hash| dataset.section_by_slug(hash))
    }

    /// Resolve against `dataset`, clamping out-of-range values. A spotlight
    /// on an empty slot is dropped.
    pub fn target(&self, dataset: &Dataset) -> LinkTarget {
        let section = self.section_index(dataset).unwrap_or(0);
        let filled = dataset.section(section).map_or(0, |s| s.filled_slots());
        let spotlight = self.card.filter(|card| *card < filled);
        LinkTarget { section, spotlight }
    }
}

/// 1-based card number → slot. Out-of-range numbers are clamped into the
/// slot range; non-numbers are dropped.
fn parse_card(value: &str) -> Option<usize> {
    let number: i64 = value.trim().parse().ok()?;
    let slot = (number.max(1) - 1) as usize;
    Some(slot.min(SECTION_SLOTS - 1))
}

/// Query string for a dataset/section/spotlight state.
pub fn build_query(dataset: &str, section_slug: &str, spotlight: Option<usize>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("gallery", dataset);
    query.append_pair("section", section_slug);
    if let Some(slot) = spotlight {
        query.append_pair("wafer", &(slot + 1).to_string());
    }
    query.finish()
}

/// Canonical link for a state. Without a base page the link is relative.
pub fn build_link(
    base: Option<&Url>,
    dataset: &str,
    section_slug: &str,
    spotlight: Option<usize>,
) -> String {
    let query = build_query(dataset, section_slug, spotlight);
    match base {
        Some(base) => {
            let mut url = base.clone();
            url.set_query(Some(&query));
            url.set_fragment(Some(section_slug));
            url.to_string()
        }
        None => format!("?{query}#{section_slug}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::ContentIndex;

    const INDEX: &str = r#"{
        "proper": {
            "contentSets": [
                [{"title": "A", "url": "a.html"}, {"title": "B", "url": "b.html"}, {"title": "C", "url": "c.html"}],
                [{"title": "D", "url": "d.html"}]
            ],
            "polytopThemes": [
                {"name": "Neural Awakening", "geometry": "hypercube", "density": 8, "rotation": [0,0,0,0], "colors": [0,1,1]},
                {"name": "Quantum Drift", "geometry": "torus", "density": 6, "rotation": [0,0,0,0], "colors": [1,0,1]}
            ]
        }
    }"#;

    fn dataset() -> std::sync::Arc<Dataset> {
        ContentIndex::from_json(INDEX).unwrap().get("proper").unwrap()
    }

    #[test]
    fn parses_full_link() {
        let link = DeepLink::parse(
            "https://example.org/gallery.html?gallery=Proper&section=quantum-drift&wafer=1#quantum-drift",
        );
        assert_eq!(link.dataset.as_deref(), Some("proper"));
        assert_eq!(link.section.as_deref(), Some("quantum-drift"));
        assert_eq!(link.card, Some(0));
        assert_eq!(
            link.target(&dataset()),
            LinkTarget {
                section: 1,
                spotlight: Some(0)
            }
        );
    }

    #[test]
    fn relative_links_and_aliases() {
        let link = DeepLink::parse("?mode=twin&dataset=proper&card=3");
        assert_eq!(link.dataset.as_deref(), Some("proper"));
        assert_eq!(link.card, Some(2));

        let link = DeepLink::parse("#neural-awakening");
        assert_eq!(link.target(&dataset()).section, 0);
        assert_eq!(link.hash.as_deref(), Some("neural-awakening"));
    }

    #[test]
    fn malformed_values_fall_back() {
        let data = dataset();
        let link = DeepLink::parse("?section=nowhere&wafer=banana");
        assert_eq!(link.card, None);
        assert_eq!(
            link.target(&data),
            LinkTarget {
                section: 0,
                spotlight: None
            }
        );

        let link = DeepLink::parse("?section=99&wafer=-4");
        assert_eq!(link.card, Some(0));
        assert_eq!(link.target(&data).section, 1);

        // Section 2 has a single card; wafer 3 points at an empty slot.
        let link = DeepLink::parse("?section=quantum-drift&wafer=3");
        assert_eq!(link.target(&data).spotlight, None);

        assert_eq!(DeepLink::parse("http://[::1"), DeepLink::default());
    }

    #[test]
    fn build_round_trips_through_parse() {
        let base = Url::parse("https://example.org/gallery.html?utm=x#old").unwrap();
        let link = build_link(Some(&base), "proper", "quantum-drift", Some(0));
        assert_eq!(
            link,
            "https://example.org/gallery.html?gallery=proper&section=quantum-drift&wafer=1#quantum-drift"
        );
        assert_eq!(
            DeepLink::parse(&link).target(&dataset()),
            LinkTarget {
                section: 1,
                spotlight: Some(0)
            }
        );
        assert_eq!(
            build_link(None, "proper", "neural-awakening", None),
            "?gallery=proper&section=neural-awakening#neural-awakening"
        );
    }
}
