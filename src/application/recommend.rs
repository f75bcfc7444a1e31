//! Related-article scoring.
//!
//! Weighted bag-of-tokens cosine similarity: categories weigh heaviest,
//! then title, description, and a capped slice of the body. Works for mixed
//! ASCII/CJK text by tokenizing ASCII runs as words and CJK as single
//! characters.

use std::collections::HashMap;

use crate::application::reading_time::{is_cjk, strip_tags};
use crate::domain::articles::ArticleRecord;

const TITLE_WEIGHT: f64 = 3.0;
const DESCRIPTION_WEIGHT: f64 = 2.0;
const BODY_WEIGHT: f64 = 1.0;
const CATEGORY_WEIGHT: f64 = 4.0;
const BODY_TOKEN_CAP: usize = 400;

fn tokenize(text: &str) -> Vec<String> {
    let text = strip_tags(text).to_lowercase();
    let mut tokens = Vec::new();
    let mut word = String::new();

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            word.push(ch);
            continue;
        }
        if word.len() >= 2 {
            tokens.push(std::mem::take(&mut word));
        } else {
            word.clear();
        }
        if is_cjk(ch) {
            tokens.push(ch.to_string());
        }
    }
    if word.len() >= 2 {
        tokens.push(word);
    }

    tokens
}

fn weights(article: &ArticleRecord) -> HashMap<String, f64> {
    let mut map: HashMap<String, f64> = HashMap::new();
    let mut add = |token: String, weight: f64| *map.entry(token).or_default() += weight;

    for token in tokenize(&article.title) {
        add(token, TITLE_WEIGHT);
    }
    for token in tokenize(&article.description) {
        add(token, DESCRIPTION_WEIGHT);
    }
    for token in tokenize(&article.content).into_iter().take(BODY_TOKEN_CAP) {
        add(token, BODY_WEIGHT);
    }
    for category in &article.categories {
        for token in tokenize(category) {
            add(token, CATEGORY_WEIGHT);
        }
    }

    map
}

fn cosine_similarity(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let mut dot = 0.0;
    let mut a2 = 0.0;
    for (token, wa) in a {
        a2 += wa * wa;
        if let Some(wb) = b.get(token) {
            dot += wa * wb;
        }
    }
    let b2: f64 = b.values().map(|wb| wb * wb).sum();
    if a2 == 0.0 || b2 == 0.0 {
        return 0.0;
    }
    dot / (a2.sqrt() * b2.sqrt())
}

/// Rank `candidates` by similarity to `current`, best first, excluding the
/// article itself.
pub fn related_articles(
    current: &ArticleRecord,
    candidates: &[ArticleRecord],
    limit: usize,
) -> Vec<ArticleRecord> {
    let current_weights = weights(current);
    let mut scored: Vec<(f64, &ArticleRecord)> = candidates
        .iter()
        .filter(|candidate| candidate.id != current.id)
        .map(|candidate| (cosine_similarity(&current_weights, &weights(candidate)), candidate))
        .collect();

    scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, article)| article.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, title: &str, categories: &[&str]) -> ArticleRecord {
        ArticleRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            content: String::new(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            eyecatch: None,
            published_at: None,
            revised_at: None,
        }
    }

    #[test]
    fn tokenizes_ascii_words_and_cjk_chars() {
        let tokens = tokenize("Rust入門 guide");
        assert!(tokens.contains(&"rust".to_string()));
        assert!(tokens.contains(&"入".to_string()));
        assert!(tokens.contains(&"門".to_string()));
        assert!(tokens.contains(&"guide".to_string()));
    }

    #[test]
    fn single_letter_ascii_tokens_are_dropped() {
        assert!(tokenize("a b c").is_empty());
    }

    #[test]
    fn shared_category_beats_unrelated_title() {
        let current = article("b1", "Async patterns", &["rust"]);
        let same_category = article("b2", "Totally different words", &["rust"]);
        let unrelated = article("b3", "Cooking pasta", &["food"]);

        let related = related_articles(&current, &[unrelated, same_category], 2);
        assert_eq!(related[0].id, "b2");
    }

    #[test]
    fn excludes_self_and_honors_limit() {
        let current = article("b1", "Rust", &["rust"]);
        let candidates = vec![
            article("b1", "Rust", &["rust"]),
            article("b2", "Rust too", &["rust"]),
            article("b3", "Rust three", &["rust"]),
        ];
        let related = related_articles(&current, &candidates, 1);
        assert_eq!(related.len(), 1);
        assert_ne!(related[0].id, "b1");
    }
}
