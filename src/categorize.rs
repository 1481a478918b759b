//! Category assignment against the fixed gaming taxonomy.
//!
//! Feeds declare categories in every shape imaginable ("PS5", "Playstation 5",
//! "Upcoming Relises", structured Atom terms). [`normalize_category_entry`]
//! folds those onto [`TAXONOMY`] through an alias table. When a feed declares
//! nothing useful, [`derive_categories_from_keywords`] scans the article text
//! for per-category keywords.
//!
//! Keyword matching is plain substring search over lowercased text, so short
//! keywords such as `pc` or `nes` also fire inside longer words. That
//! generosity is accepted: a wrong extra tag is cheaper than an untagged story.

use crate::models::{
    ARCADES, Article, Category, MOBILE_GAMES, PC_GAMES, POPULAR, PS5_GAMES, RETRO_GAMES,
    RawCategory, TAXONOMY, TRENDING, UPCOMING_RELEASES,
};
use crate::text::{create_excerpt, slugify, split_into_paragraphs};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Most categories an article may carry.
pub const MAX_CATEGORIES_PER_ARTICLE: usize = 4;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static CATEGORY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("arcade", "arcades"),
        ("arcades", "arcades"),
        ("arcade-games", "arcades"),
        ("retro", "retro-games"),
        ("retro-games", "retro-games"),
        ("retro-gaming", "retro-games"),
        ("classic-games", "retro-games"),
        ("pc", "pc-games"),
        ("pc-games", "pc-games"),
        ("computer-games", "pc-games"),
        ("gaming", "pc-games"),
        ("ps5", "ps5-games"),
        ("ps5-games", "ps5-games"),
        ("ps-5", "ps5-games"),
        ("playstation", "ps5-games"),
        ("playstation-5", "ps5-games"),
        ("mobile", "mobile-games"),
        ("mobile-games", "mobile-games"),
        ("smartphone-games", "mobile-games"),
        ("android-games", "mobile-games"),
        ("ios-games", "mobile-games"),
        ("upcoming", "upcoming-releases"),
        ("upcoming-releases", "upcoming-releases"),
        ("upcoming-release", "upcoming-releases"),
        ("new-releases", "upcoming-releases"),
        ("upcoming-relises", "upcoming-releases"),
        ("coming-soon", "upcoming-releases"),
        ("trending", "trending"),
        ("trending-games", "trending"),
        ("hot-games", "trending"),
        ("popular", "popular"),
        ("popular-games", "popular"),
        ("fan-favorites", "popular"),
    ])
});

/// Keyword lists, in taxonomy order.
const CATEGORY_KEYWORDS: [(Category, &[&str]); 8] = [
    (
        ARCADES,
        &["arcade", "coin-op", "arcade cabinet", "cabinet", "beat-em-up", "joystick", "pinball"],
    ),
    (
        RETRO_GAMES,
        &["retro", "classic", "8-bit", "16-bit", "nostalgia", "snes", "nes", "megadrive", "atari"],
    ),
    (
        PC_GAMES,
        &["pc", "steam", "windows", "pc gaming", "pc game", "mod", "gpu", "keyboard", "mouse"],
    ),
    (
        PS5_GAMES,
        &[
            "ps5",
            "playstation 5",
            "dual sense",
            "sony",
            "ps5 exclusive",
            "ps5 game",
            "console exclusive",
        ],
    ),
    (
        MOBILE_GAMES,
        &[
            "mobile game",
            "mobile games",
            "android",
            "ios",
            "smartphone",
            "touchscreen",
            "app store",
            "google play",
        ],
    ),
    (
        UPCOMING_RELEASES,
        &[
            "upcoming",
            "release date",
            "coming soon",
            "launching",
            "announcement",
            "preorder",
            "new release",
        ],
    ),
    (
        TRENDING,
        &["trending", "viral", "buzz", "hot title", "currently popular", "charting", "going viral"],
    ),
    (
        POPULAR,
        &[
            "popular",
            "fan favorite",
            "best-selling",
            "top seller",
            "player favorite",
            "top rated",
            "most played",
        ],
    ),
];

fn resolve_name_or_slug(value: Option<&str>) -> Option<Category> {
    let value = value.filter(|v| !v.is_empty())?;
    let mut slug = slugify(value);
    if slug == "general" {
        slug = PC_GAMES.slug.to_string();
    }
    let slug = CATEGORY_ALIASES
        .get(slug.as_str())
        .copied()
        .unwrap_or(slug.as_str());
    Category::from_slug(slug)
}

/// Map a declared feed category onto the taxonomy.
///
/// Objects try `slug` first, then the first of `name`, `label`, `title`.
/// A blank string means "uncategorized" and lands in PC Games; anything the
/// alias table cannot place is `None`.
pub fn normalize_category_entry(category: &RawCategory) -> Option<Category> {
    match category {
        RawCategory::Object {
            name,
            label,
            title,
            slug,
        } => {
            let display = [name, label, title]
                .into_iter()
                .filter_map(|value| value.as_deref())
                .find(|value| !value.is_empty());
            resolve_name_or_slug(slug.as_deref()).or_else(|| resolve_name_or_slug(display))
        }
        RawCategory::Name(name) if !name.trim().is_empty() => resolve_name_or_slug(Some(name)),
        RawCategory::Name(_) => Some(PC_GAMES),
    }
}

/// Normalize a feed's declared categories, dropping the unplaceable ones.
/// A feed that declares nothing is treated as declaring PC Games.
pub fn normalize_declared(declared: &[RawCategory]) -> Vec<Category> {
    if declared.is_empty() {
        return vec![PC_GAMES];
    }
    declared.iter().filter_map(normalize_category_entry).collect()
}

/// Every taxonomy entry with a keyword hit in the article text, in taxonomy order.
/// Falls back to PC Games when nothing matches.
pub fn derive_categories_from_keywords(
    title: &str,
    original_content: &str,
    content: &str,
) -> Vec<Category> {
    let joined = format!("{title} {original_content} {content}").to_lowercase();
    let haystack = WHITESPACE_RUN.replace_all(&joined, " ");

    let detected: Vec<Category> = CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|keyword| haystack.contains(keyword)))
        .map(|(category, _)| *category)
        .collect();

    if detected.is_empty() {
        vec![PC_GAMES]
    } else {
        detected
    }
}

/// Final category list for an article: 1 to [`MAX_CATEGORIES_PER_ARTICLE`]
/// unique entries.
///
/// Declared categories win unless they are empty or nothing but PC Games
/// (the feed's default bucket), in which case the text is scanned.
pub fn resolve_categories(
    declared: &[Category],
    title: &str,
    original_content: &str,
    content: &str,
) -> Vec<Category> {
    let candidates = if declared.is_empty() || declared.iter().all(|c| *c == PC_GAMES) {
        derive_categories_from_keywords(title, original_content, content)
    } else {
        declared.to_vec()
    };

    let mut resolved: Vec<Category> = candidates.into_iter().unique_by(|c| c.slug).collect();
    if resolved.is_empty() {
        resolved.push(PC_GAMES);
    }
    resolved.truncate(MAX_CATEGORIES_PER_ARTICLE);
    resolved
}

/// Backfill derived fields on every article and return the store-wide categories.
///
/// Articles missing `paragraphs` get them split from `content` (or
/// `original_content`), missing excerpts are rebuilt, and categories are
/// re-resolved. The returned list is the taxonomy restricted to entries that
/// at least one article carries, in taxonomy order.
pub fn build_category_map(
    articles: &mut [Article],
    excerpt_min_words: usize,
    excerpt_max_words: usize,
) -> Vec<Category> {
    for article in articles.iter_mut() {
        if article.paragraphs.is_empty() {
            let source = if article.content.is_empty() {
                &article.original_content
            } else {
                &article.content
            };
            article.paragraphs = split_into_paragraphs(source);
        }

        if article.excerpt.is_empty() {
            article.excerpt = create_excerpt(
                &article.paragraphs,
                &article.content,
                &article.original_content,
                excerpt_min_words,
                excerpt_max_words,
            );
        }

        article.categories = resolve_categories(
            &article.categories,
            &article.title,
            &article.original_content,
            &article.content,
        );
    }

    TAXONOMY
        .iter()
        .copied()
        .filter(|category| {
            articles
                .iter()
                .any(|article| article.categories.contains(category))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::sample_article;

    fn name(value: &str) -> RawCategory {
        RawCategory::Name(value.to_string())
    }

    fn slugs(categories: &[Category]) -> Vec<&'static str> {
        categories.iter().map(|c| c.slug).collect()
    }

    #[test]
    fn test_alias_table_is_complete() {
        assert_eq!(CATEGORY_ALIASES.len(), 33);
        for target in CATEGORY_ALIASES.values() {
            assert!(Category::from_slug(target).is_some(), "{target} not in taxonomy");
        }
    }

    #[test]
    fn test_normalize_strings() {
        assert_eq!(normalize_category_entry(&name("Arcade Games")), Some(ARCADES));
        assert_eq!(normalize_category_entry(&name("Playstation 5")), Some(PS5_GAMES));
        assert_eq!(normalize_category_entry(&name("Upcoming Relises")), Some(UPCOMING_RELEASES));
        assert_eq!(normalize_category_entry(&name("General")), Some(PC_GAMES));
        assert_eq!(normalize_category_entry(&name("???")), Some(PC_GAMES));
        assert_eq!(normalize_category_entry(&name("  ")), Some(PC_GAMES));
        assert_eq!(normalize_category_entry(&name("Xbox")), None);
    }

    #[test]
    fn test_normalize_objects() {
        let retro = RawCategory::Object {
            name: Some("Retro".to_string()),
            label: None,
            title: None,
            slug: Some("zzz".to_string()),
        };
        assert_eq!(normalize_category_entry(&retro), Some(RETRO_GAMES));

        let by_label = RawCategory::Object {
            name: None,
            label: Some("Hot Games".to_string()),
            title: None,
            slug: None,
        };
        assert_eq!(normalize_category_entry(&by_label), Some(TRENDING));

        let empty = RawCategory::Object {
            name: None,
            label: None,
            title: None,
            slug: None,
        };
        assert_eq!(normalize_category_entry(&empty), None);
    }

    #[test]
    fn test_normalize_declared_defaults_to_pc() {
        assert_eq!(normalize_declared(&[]), vec![PC_GAMES]);
        assert_eq!(normalize_declared(&[name("Xbox"), name("Retro")]), vec![RETRO_GAMES]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            slugs(&derive_categories_from_keywords(
                "Sony reveals PS5 exclusive",
                "The DualSense update ships today",
                ""
            )),
            vec!["ps5-games"]
        );
        assert_eq!(slugs(&derive_categories_from_keywords("Quiet day", "", "")), vec!["pc-games"]);
        assert_eq!(
            slugs(&derive_categories_from_keywords(
                "Android   hit goes viral",
                "Coming soon to Google Play",
                ""
            )),
            vec!["mobile-games", "upcoming-releases", "trending"]
        );
    }

    #[test]
    fn test_resolve_caps_at_four_in_taxonomy_order() {
        let resolved = resolve_categories(
            &[],
            "Arcade cabinet revival",
            "classic 8-bit nostalgia, coin-op joy",
            "top rated popular fan favorite trending upcoming",
        );
        assert_eq!(
            slugs(&resolved),
            vec!["arcades", "retro-games", "pc-games", "upcoming-releases"]
        );
    }

    #[test]
    fn test_resolve_prefers_declared_and_dedups() {
        let resolved = resolve_categories(
            &[TRENDING, PC_GAMES, TRENDING],
            "Sony reveals PS5 exclusive",
            "",
            "",
        );
        assert_eq!(resolved, vec![TRENDING, PC_GAMES]);

        let only_pc = resolve_categories(&[PC_GAMES], "Sony reveals PS5 exclusive", "", "");
        assert_eq!(only_pc, vec![PS5_GAMES]);
    }

    #[test]
    fn test_build_category_map_backfills_and_filters() {
        let mut first = sample_article();
        first.title = "Sony reveals PS5 exclusive".to_string();
        first.original_content = String::new();
        first.content = "First paragraph.\n\nSecond paragraph.".to_string();
        first.paragraphs.clear();
        first.excerpt.clear();
        first.categories = vec![PC_GAMES];

        let mut second = sample_article();
        second.title = "Quiet day".to_string();
        second.original_content = String::new();
        second.content = "Nothing to see.".to_string();
        second.categories = vec![];

        let mut articles = vec![first, second];
        let store = build_category_map(&mut articles, 30, 50);

        assert_eq!(articles[0].paragraphs, vec!["First paragraph.", "Second paragraph."]);
        assert_eq!(articles[0].excerpt, "First paragraph. Second paragraph.");
        assert_eq!(articles[0].categories, vec![PS5_GAMES]);
        assert_eq!(articles[1].categories, vec![PC_GAMES]);
        assert_eq!(store, vec![PC_GAMES, PS5_GAMES]);
    }

    #[test]
    fn test_build_category_map_is_stable() {
        let mut articles = vec![sample_article()];
        let first = build_category_map(&mut articles, 30, 50);
        let snapshot = articles.clone();
        let second = build_category_map(&mut articles, 30, 50);
        assert_eq!(first, second);
        assert_eq!(snapshot, articles);
    }
}
