//! Plain-text helpers used by every stage of the pipeline.
//!
//! Everything here is pure and cheap: HTML stripping for feed summaries,
//! whitespace and paragraph normalization, the token-set similarity used to
//! reject rewrites that stay too close to the source, the deterministic hash
//! that drives the local rewriter's "random" picks, and the slug/excerpt
//! builders the controller stamps onto each article.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static BR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<\s*br\s*/?>").unwrap());
static BLOCK_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</\s*(p|div|article|section|li|h[1-6])\s*>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)&[a-z0-9#]+;").unwrap());
static TRAILING_BLANKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").unwrap());
static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}|\r\n\r\n").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_ALNUM_OR_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());
static NON_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"`]"#).unwrap());
static DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// Characters accepted as the end of a sentence.
pub const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', '…'];

/// Longest slug produced by [`create_article_slug_from_title`].
pub const MAX_SLUG_LENGTH: usize = 120;

/// Slug used when a title has nothing slug-worthy in it.
pub const FALLBACK_ARTICLE_SLUG: &str = "tech-brief";

fn entity_replacement(entity: &str) -> Option<&'static str> {
    Some(match entity {
        "&nbsp;" => " ",
        "&amp;" => "&",
        "&lt;" => "<",
        "&gt;" => ">",
        "&quot;" => "\"",
        "&#39;" => "'",
        "&rsquo;" | "&lsquo;" => "'",
        "&rdquo;" | "&ldquo;" => "\"",
        _ => return None,
    })
}

/// Decode the small set of entities feeds actually use. Anything else is left as-is.
pub fn decode_html_entities(value: &str) -> String {
    ENTITY
        .replace_all(value, |caps: &regex::Captures<'_>| {
            let entity = &caps[0];
            entity_replacement(entity).unwrap_or(entity).to_string()
        })
        .into_owned()
}

/// Turn an HTML fragment into text, keeping block boundaries as blank lines.
///
/// `<br>` becomes a newline, closing block tags (`p`, `div`, `article`,
/// `section`, `li`, `h1`-`h6`) become a paragraph break and every other tag
/// becomes a single space. The result is not condensed; pair it with
/// [`condense_whitespace`].
pub fn strip_html(html: &str) -> String {
    let with_breaks = BR_TAG.replace_all(html, "\n");
    let with_blocks = BLOCK_CLOSE.replace_all(&with_breaks, "\n\n");
    let without_tags = ANY_TAG.replace_all(&with_blocks, " ");
    decode_html_entities(&without_tags)
}

/// Normalize line endings, drop trailing blanks, cap blank runs at one empty line, trim.
pub fn condense_whitespace(value: &str) -> String {
    let unix = value.replace("\r\n", "\n");
    let no_trailing = TRAILING_BLANKS.replace_all(&unix, "\n");
    EXTRA_NEWLINES
        .replace_all(&no_trailing, "\n\n")
        .trim()
        .to_string()
}

/// Split text on blank lines into single-line paragraphs, dropping empty ones.
pub fn split_into_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK
        .split(text)
        .map(|paragraph| WHITESPACE_RUN.replace_all(paragraph, " ").trim().to_string())
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}

/// Lowercase and blank out everything that is not `[a-z0-9]` or whitespace.
pub fn normalize_for_comparison(value: &str) -> String {
    let lowered = condense_whitespace(value).to_lowercase();
    NON_ALNUM_OR_SPACE.replace_all(&lowered, " ").into_owned()
}

/// Tokens longer than three characters. Short words carry little signal.
pub fn tokenize_for_similarity(value: &str) -> Vec<String> {
    normalize_for_comparison(value)
        .split_whitespace()
        .filter(|token| token.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

/// `|A ∩ B| / |A ∪ B|` over the token sets, or `0.0` when either side is empty.
pub fn jaccard_similarity<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_set: HashSet<&str> = a.iter().map(AsRef::as_ref).collect();
    let b_set: HashSet<&str> = b.iter().map(AsRef::as_ref).collect();
    let intersection = a_set.intersection(&b_set).count();
    let union = a_set.union(&b_set).count();
    intersection as f64 / union as f64
}

/// Whether `candidate` reuses too much of `original`'s vocabulary.
pub fn is_body_too_similar(original: &str, candidate: &str, threshold: f64) -> bool {
    let similarity = jaccard_similarity(
        &tokenize_for_similarity(original),
        &tokenize_for_similarity(candidate),
    );
    similarity >= threshold
}

/// Titles that only differ by case, punctuation or spacing count as the same title.
pub fn is_title_similar(original: &str, candidate: &str) -> bool {
    normalize_for_comparison(original) == normalize_for_comparison(candidate)
}

/// Deterministic 31-based rolling hash over UTF-16 code units.
///
/// The accumulator wraps at 32 bits like a signed integer and the absolute
/// value is returned, so `i32::MIN` maps to `2^31`. Only used to make
/// choices repeatable for identical input; it is not a quality hash.
pub fn stable_hash(value: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in value.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    hash.unsigned_abs()
}

/// Trim and upper-case the first character.
pub fn capitalize_sentence(sentence: &str) -> String {
    let trimmed = sentence.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// Append a period unless the sentence already ends in `.`, `!`, `?` or `…`.
pub fn ensure_sentence_termination(sentence: &str) -> String {
    if sentence.ends_with(SENTENCE_TERMINATORS) {
        sentence.to_string()
    } else {
        format!("{sentence}.")
    }
}

/// Build a preview of `min_words..=max_words` words.
///
/// The source text is the paragraphs joined by spaces, else `content`, else
/// `original_content`. When words had to be dropped and the cut does not
/// land on a sentence terminator, an ellipsis is appended.
pub fn create_excerpt(
    paragraphs: &[String],
    content: &str,
    original_content: &str,
    min_words: usize,
    max_words: usize,
) -> String {
    let source = if !paragraphs.is_empty() {
        paragraphs.join(" ")
    } else if !content.is_empty() {
        condense_whitespace(content)
    } else {
        condense_whitespace(original_content)
    };

    let normalized = condense_whitespace(&source);
    let words: Vec<&str> = normalized.split_whitespace().collect();
    if words.is_empty() {
        return String::new();
    }

    let desired = max_words.min(min_words.max(words.len()));
    let mut excerpt = words[..desired.min(words.len())].join(" ");
    if !excerpt.ends_with(SENTENCE_TERMINATORS) && words.len() > desired {
        excerpt.push('…');
    }
    excerpt
}

/// Category-style slug: lowercase, non-alphanumeric runs become `-`.
/// Empty input slugs to `general`.
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let dashed = NON_ALNUM_RUN.replace_all(&lowered, "-");
    let slug = dashed.trim_matches('-');
    if slug.is_empty() {
        "general".to_string()
    } else {
        slug.to_string()
    }
}

/// Article slug derived from a headline, capped at [`MAX_SLUG_LENGTH`].
pub fn create_article_slug_from_title(title: &str) -> String {
    if title.trim().is_empty() {
        return FALLBACK_ARTICLE_SLUG.to_string();
    }

    let lowered = title.to_lowercase();
    let unquoted = QUOTES.replace_all(&lowered, "");
    let spaced = NON_ALNUM_OR_SPACE.replace_all(&unquoted, " ");
    let cleaned = WHITESPACE_RUN.replace_all(&spaced, " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return FALLBACK_ARTICLE_SLUG.to_string();
    }

    let hyphenated = WHITESPACE_RUN.replace_all(cleaned, "-");
    let mut slug = DASH_RUN.replace_all(&hyphenated, "-").into_owned();

    if slug.len() > MAX_SLUG_LENGTH {
        let trimmed = slug[..MAX_SLUG_LENGTH].trim_end_matches('-');
        if !trimmed.is_empty() {
            slug = trimmed.to_string();
        }
    }
    slug
}

/// Pick `base`, `base-2`, `base-3`, … whichever is free, and mark it used.
pub fn ensure_unique_slug(base: &str, used: &mut HashSet<String>) -> String {
    let base = if base.is_empty() { "article" } else { base };
    let mut candidate = base.to_string();
    let mut counter = 2;
    while used.contains(&candidate) {
        candidate = format!("{base}-{counter}");
        counter += 1;
    }
    used.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_breaks_and_entities() {
        let html = "<p>Hello&nbsp;<b>world</b> &amp; friends</p><p>Second &hellip; line<br/>next</p>";
        let text = condense_whitespace(&strip_html(html));
        assert_eq!(text, "Hello  world  & friends\n\n Second &hellip; line\nnext");
    }

    #[test]
    fn test_decode_is_case_sensitive_on_lookup() {
        assert_eq!(decode_html_entities("&AMP; &amp; &rsquo;"), "&AMP; & '");
    }

    #[test]
    fn test_condense_whitespace() {
        assert_eq!(condense_whitespace("  a  \t\r\nb\n\n\n\n\nc  "), "a\nb\n\nc");
        assert_eq!(condense_whitespace(""), "");
    }

    #[test]
    fn test_split_into_paragraphs() {
        let paragraphs = split_into_paragraphs("First  para\nline two\n\n\n\nSecond para\n\n   \n\nThird");
        assert_eq!(paragraphs, vec!["First para line two", "Second para", "Third"]);
        assert!(split_into_paragraphs("   ").is_empty());
    }

    #[test]
    fn test_tokenize_for_similarity() {
        assert_eq!(
            tokenize_for_similarity("The NEW game-studio, (2024) is big!"),
            vec!["game", "studio", "2024"]
        );
    }

    #[test]
    fn test_jaccard_similarity() {
        let a = ["alpha", "beta", "gamma"];
        let b = ["beta", "gamma", "delta"];
        assert!((jaccard_similarity(&a, &b) - 0.5).abs() < f64::EPSILON);
        let empty: [&str; 0] = [];
        assert_eq!(jaccard_similarity(&a, &empty), 0.0);
        assert_eq!(jaccard_similarity(&a, &a), 1.0);
    }

    #[test]
    fn test_similarity_helpers() {
        assert!(is_body_too_similar("Quick brown foxes jump", "quick BROWN foxes, jump!", 0.8));
        assert!(!is_body_too_similar("", "anything here", 0.8));
        assert!(is_title_similar("Big NEWS today", "big news today"));
        assert!(!is_title_similar("Big News: Today!", "big news today"));
        assert!(!is_title_similar("Big News", "Other News"));
    }

    #[test]
    fn test_stable_hash_matches_reference_values() {
        assert_eq!(stable_hash(""), 0);
        assert_eq!(stable_hash("a"), 97);
        assert_eq!(stable_hash("new"), 108960);
        assert_eq!(stable_hash("game"), 3165170);
        assert_eq!(stable_hash("gaming"), 1253231569);
        assert_eq!(stable_hash("GAMING"), 2095065135);
        assert_eq!(stable_hash("hello world"), 1794106052);
    }

    #[test]
    fn test_capitalize_and_terminate() {
        assert_eq!(capitalize_sentence("  hello there "), "Hello there");
        assert_eq!(capitalize_sentence("   "), "");
        assert_eq!(ensure_sentence_termination("Done"), "Done.");
        assert_eq!(ensure_sentence_termination("Done?"), "Done?");
        assert_eq!(ensure_sentence_termination("Done…"), "Done…");
    }

    #[test]
    fn test_excerpt_bounds_for_long_body() {
        let body = (0..200).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let excerpt = create_excerpt(&[body], "", "", 30, 50);
        let words = excerpt.split_whitespace().count();
        assert!((30..=50).contains(&words));
        assert!(excerpt.ends_with("word49…"));
    }

    #[test]
    fn test_excerpt_short_body_kept_whole() {
        let excerpt = create_excerpt(&["Short text here.".to_string()], "", "", 30, 50);
        assert_eq!(excerpt, "Short text here.");
        assert_eq!(create_excerpt(&[], "", "", 30, 50), "");
        assert_eq!(create_excerpt(&[], "", "From the original.", 30, 50), "From the original.");
    }

    #[test]
    fn test_excerpt_no_ellipsis_on_sentence_boundary() {
        let mut words: Vec<String> = (0..49).map(|i| format!("w{i}")).collect();
        words.push("end.".to_string());
        words.extend((0..20).map(|i| format!("x{i}")));
        let excerpt = create_excerpt(&[words.join(" ")], "", "", 30, 50);
        assert!(excerpt.ends_with("end."));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  PS 5 "), "ps-5");
        assert_eq!(slugify("Retro Games"), "retro-games");
        assert_eq!(slugify("???"), "general");
    }

    #[test]
    fn test_article_slug_from_title() {
        assert_eq!(
            create_article_slug_from_title("  Elden Ring: \"Shadow\" of the Erdtree  Review! "),
            "elden-ring-shadow-of-the-erdtree-review"
        );
        assert_eq!(create_article_slug_from_title("!!!"), FALLBACK_ARTICLE_SLUG);
        assert_eq!(create_article_slug_from_title(""), FALLBACK_ARTICLE_SLUG);

        let long = "word ".repeat(40);
        let slug = create_article_slug_from_title(&long);
        assert!(slug.len() <= MAX_SLUG_LENGTH);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_ensure_unique_slug_suffixes() {
        let mut used = HashSet::new();
        assert_eq!(ensure_unique_slug("same-title", &mut used), "same-title");
        assert_eq!(ensure_unique_slug("same-title", &mut used), "same-title-2");
        assert_eq!(ensure_unique_slug("same-title", &mut used), "same-title-3");
        assert_eq!(used.len(), 3);
    }
}
