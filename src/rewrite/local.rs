//! Deterministic local rewrite.
//!
//! Used whenever the remote service is unavailable or hands back something
//! too close to the source. It is a lexical transform, not a paraphrase:
//!
//! 1. sentences of a paragraph are rotated (first sentence moves to the end),
//! 2. a fixed dictionary of gaming-news words is swapped for alternatives,
//! 3. the paragraph is opened with a stock reporting phrase,
//! 4. the headline gets a stock prefix.
//!
//! Every "choice" is `stable_hash(key) % n`, so the same input always yields
//! the same output across runs and machines.
//!
//! [`distinct_rewrite_article`] re-checks that result against the source. A
//! body with few dictionary words can stay too close to it, so every sentence
//! then gets its own stock phrase, and as a last resort sentences are kept
//! only while the body stays under the threshold.

use super::RewrittenArticle;
use crate::text::{
    capitalize_sentence, condense_whitespace, ensure_sentence_termination, is_body_too_similar,
    is_title_similar, split_into_paragraphs, stable_hash,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Headline used when neither the title nor the body offers anything to work with.
pub const GENERIC_HEADLINE: &str = "Latest gaming development";

const TITLE_PREFIXES: [&str; 5] = [
    "Fresh Insight:",
    "Game Watch:",
    "Industry Brief:",
    "Play Update:",
    "Gaming Spotlight:",
];

const INTRO_PHRASES: [&str; 5] = [
    "According to the latest update, ",
    "In a fresh development, ",
    "Industry observers note that ",
    "As part of the ongoing story, ",
    "The report highlights that ",
];

const SYNONYMS: [(&str, [&str; 3]); 35] = [
    ("announce", ["unveil", "reveal", "detail"]),
    ("announced", ["unveiled", "revealed", "detailed"]),
    ("announcement", ["reveal", "debut", "disclosure"]),
    ("game", ["title", "release", "experience"]),
    ("games", ["titles", "releases", "experiences"]),
    ("gaming", ["interactive entertainment", "game industry", "play"]),
    ("player", ["fan", "gamer", "player community"]),
    ("players", ["fans", "gamers", "player communities"]),
    ("studio", ["developer", "team", "game studio"]),
    ("studios", ["developers", "teams", "game studios"]),
    ("company", ["publisher", "firm", "organization"]),
    ("companies", ["publishers", "firms", "organizations"]),
    ("update", ["patch", "refresh", "revision"]),
    ("updated", ["patched", "refreshed", "revised"]),
    ("launch", ["debut", "rollout", "arrival"]),
    ("launches", ["debuts", "rollouts", "arrivals"]),
    ("release", ["launch", "rollout", "drop"]),
    ("released", ["launched", "rolled out", "dropped"]),
    ("releases", ["launches", "rollouts", "drops"]),
    ("new", ["fresh", "recent", "brand-new"]),
    ("latest", ["newest", "current", "most recent"]),
    ("feature", ["capability", "function", "mechanic"]),
    ("features", ["capabilities", "functions", "mechanics"]),
    ("event", ["showcase", "presentation", "gathering"]),
    ("fans", ["supporters", "enthusiasts", "followers"]),
    ("hardware", ["gear", "equipment", "devices"]),
    ("software", ["applications", "programs", "tools"]),
    ("platform", ["ecosystem", "service", "system"]),
    ("platforms", ["ecosystems", "services", "systems"]),
    ("community", ["audience", "crowd", "fan base"]),
    ("global", ["worldwide", "international", "planetwide"]),
    ("world", ["global stage", "worldwide scene", "planet"]),
    ("trend", ["movement", "pattern", "momentum"]),
    ("trending", ["surging", "rising", "gaining momentum"]),
    ("popular", ["fan-favorite", "well-liked", "widely played"]),
];

// Longest keys first so `announcement` wins over `announce`.
static SYNONYM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let mut keys: Vec<&str> = SYNONYMS.iter().map(|(key, _)| *key).collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()));
    let alternation = keys
        .iter()
        .map(|key| regex::escape(key))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\b")).unwrap()
});

fn alternatives_for(word: &str) -> Option<&'static [&'static str; 3]> {
    let lowered = word.to_lowercase();
    SYNONYMS
        .iter()
        .find(|(key, _)| *key == lowered)
        .map(|(_, alternatives)| alternatives)
}

/// Carry the case pattern of `original` (ALL CAPS, Capitalized, lower) onto `replacement`.
fn preserve_case(original: &str, replacement: &str) -> String {
    if original.is_empty() {
        return replacement.to_string();
    }
    if original == original.to_uppercase() {
        return replacement.to_uppercase();
    }
    let starts_upper = original.chars().next().is_some_and(char::is_uppercase);
    if starts_upper {
        capitalize_sentence(replacement)
    } else {
        replacement.to_string()
    }
}

/// Swap dictionary words for one of their alternatives, keeping case.
pub fn apply_synonym_replacements(text: &str) -> String {
    SYNONYM_PATTERN
        .replace_all(text, |caps: &Captures<'_>| {
            let matched = &caps[0];
            match alternatives_for(matched) {
                Some(alternatives) => {
                    let choice = alternatives[stable_hash(matched) as usize % alternatives.len()];
                    preserve_case(matched, choice)
                }
                None => matched.to_string(),
            }
        })
        .into_owned()
}

/// Split after `.`, `!` or `?` when followed by whitespace.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut previous: Option<char> = None;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if ch.is_whitespace() && matches!(previous, Some('.' | '!' | '?')) {
            sentences.push(&paragraph[start..index]);
            while chars.next_if(|(_, next)| next.is_whitespace()).is_some() {}
            start = chars.peek().map_or(paragraph.len(), |(next_index, _)| *next_index);
            previous = None;
            continue;
        }
        previous = Some(ch);
    }
    sentences.push(&paragraph[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Rewrite one paragraph. Returns an empty string for an empty paragraph.
pub fn rewrite_paragraph(paragraph: &str) -> String {
    let mut sentences = split_sentences(paragraph);
    if sentences.is_empty() {
        return String::new();
    }
    if sentences.len() > 1 {
        sentences.rotate_left(1);
    }

    let intro = INTRO_PHRASES[stable_hash(paragraph) as usize % INTRO_PHRASES.len()];

    let rewritten: Vec<String> = sentences
        .iter()
        .enumerate()
        .map(|(index, sentence)| {
            let mut transformed = apply_synonym_replacements(sentence);
            if index == 0 {
                transformed = format!("{intro}{}", lowercase_first(&transformed));
            }
            ensure_sentence_termination(&capitalize_sentence(&transformed))
        })
        .collect();

    condense_whitespace(&rewritten.join(" "))
}

/// Prefixed, synonym-swapped headline.
///
/// If the result still normalizes to the original headline, the first 60
/// characters of the first reference paragraph stand in for the title, or
/// [`GENERIC_HEADLINE`] when there is no reference text.
pub fn generate_unique_title(title: &str, reference_paragraphs: &[String]) -> String {
    let prefix = TITLE_PREFIXES[stable_hash(title) as usize % TITLE_PREFIXES.len()];
    let base = capitalize_sentence(&apply_synonym_replacements(title));
    let candidate = format!("{prefix} {base}").trim().to_string();

    if !is_title_similar(title, &candidate) {
        return candidate;
    }

    let detail: String = reference_paragraphs
        .first()
        .map(|paragraph| paragraph.chars().take(60).collect())
        .unwrap_or_default();
    let detail = capitalize_sentence(&apply_synonym_replacements(&detail));
    if detail.is_empty() {
        format!("{prefix} {GENERIC_HEADLINE}")
    } else {
        format!("{prefix} {detail}")
    }
}

fn synthesize_paragraph(text: &str) -> String {
    let condensed = condense_whitespace(text);
    if condensed.is_empty() {
        return String::new();
    }
    ensure_sentence_termination(&capitalize_sentence(&apply_synonym_replacements(&condensed)))
}

/// Rewrite a whole article without any network access.
///
/// `original_paragraphs` are used when given, otherwise `content` is split.
/// The result always has at least one paragraph: when every paragraph
/// rewrites to nothing, one is synthesized from the body, then the title,
/// then [`GENERIC_HEADLINE`].
pub fn local_rewrite_article(
    title: &str,
    content: &str,
    original_paragraphs: &[String],
) -> RewrittenArticle {
    let split;
    let base: &[String] = if original_paragraphs.is_empty() {
        split = split_into_paragraphs(content);
        &split
    } else {
        original_paragraphs
    };

    let mut paragraphs: Vec<String> = base
        .iter()
        .map(|paragraph| rewrite_paragraph(paragraph))
        .filter(|paragraph| !paragraph.is_empty())
        .collect();

    if paragraphs.is_empty() {
        let synthesized = [content, title]
            .into_iter()
            .map(synthesize_paragraph)
            .find(|paragraph| !paragraph.is_empty())
            .unwrap_or_else(|| format!("{GENERIC_HEADLINE}."));
        paragraphs.push(synthesized);
    }

    let body = paragraphs.join("\n\n");
    let title = generate_unique_title(title, &paragraphs);

    RewrittenArticle {
        title,
        body,
        paragraphs,
    }
}

fn with_intro(sentence: &str) -> String {
    let intro = INTRO_PHRASES[stable_hash(sentence) as usize % INTRO_PHRASES.len()];
    let transformed = format!("{intro}{}", lowercase_first(&apply_synonym_replacements(sentence)));
    ensure_sentence_termination(&capitalize_sentence(&transformed))
}

/// Rotated sentences, each opened with its own stock phrase.
fn thorough_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = split_sentences(paragraph);
    if sentences.len() > 1 {
        sentences.rotate_left(1);
    }
    sentences.into_iter().map(with_intro).collect()
}

fn assemble(groups: &[Vec<String>]) -> Vec<String> {
    groups
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| condense_whitespace(&group.join(" ")))
        .collect()
}

/// Longest prefix of `sentence`, by whole words, accepted by `fits`.
fn leading_words(sentence: &str, fits: impl Fn(&str) -> bool) -> Option<String> {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    (1..words.len())
        .rev()
        .map(|count| with_intro(&words[..count].join(" ")))
        .find(|candidate| fits(candidate))
}

fn finish(title: &str, paragraphs: Vec<String>) -> RewrittenArticle {
    RewrittenArticle {
        title: generate_unique_title(title, &paragraphs),
        body: paragraphs.join("\n\n"),
        paragraphs,
    }
}

/// [`local_rewrite_article`], re-validated against the source text.
///
/// Tries in order, keeping the first body whose similarity to the source is
/// below `threshold`:
///
/// 1. the standard local rewrite,
/// 2. a rewrite that opens every sentence with a stock phrase,
/// 3. a digest built by keeping each sentence only if the body stays under
///    the threshold,
/// 4. the longest leading part of the first sentence that fits,
/// 5. [`GENERIC_HEADLINE`].
///
/// Only the last step can still reach the threshold, and only for a source
/// whose whole vocabulary is that headline.
pub fn distinct_rewrite_article(
    title: &str,
    content: &str,
    original_paragraphs: &[String],
    threshold: f64,
) -> RewrittenArticle {
    let standard = local_rewrite_article(title, content, original_paragraphs);
    let source = if content.trim().is_empty() {
        original_paragraphs.join("\n\n")
    } else {
        content.to_string()
    };
    let fits = |body: &str| !body.is_empty() && !is_body_too_similar(&source, body, threshold);
    if fits(&standard.body) {
        return standard;
    }

    let split;
    let base: &[String] = if original_paragraphs.is_empty() {
        split = split_into_paragraphs(content);
        &split
    } else {
        original_paragraphs
    };

    let groups: Vec<Vec<String>> = base.iter().map(|paragraph| thorough_sentences(paragraph)).collect();
    let thorough = assemble(&groups);
    if fits(&thorough.join("\n\n")) {
        return finish(title, thorough);
    }

    let mut digest: Vec<Vec<String>> = vec![Vec::new(); groups.len()];
    for (index, group) in groups.iter().enumerate() {
        for sentence in group {
            digest[index].push(sentence.clone());
            if !fits(&assemble(&digest).join("\n\n")) {
                digest[index].pop();
            }
        }
    }
    let digest = assemble(&digest);
    if !digest.is_empty() {
        return finish(title, digest);
    }

    let first_sentence = base
        .iter()
        .flat_map(|paragraph| split_sentences(paragraph))
        .next()
        .unwrap_or_default();
    let paragraph = leading_words(first_sentence, fits).unwrap_or_else(|| format!("{GENERIC_HEADLINE}."));
    finish(title, vec![paragraph])
}
