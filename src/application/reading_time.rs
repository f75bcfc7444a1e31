//! Estimated reading time for article bodies.
//!
//! Mixed-script aware: CJK characters are counted individually while ASCII
//! words count as five characters, against a 400 characters-per-minute pace.
//! Embedded images add twelve seconds each. Results are ceiled to whole
//! minutes with a floor of one.

const CHARS_PER_MINUTE: u64 = 400;
const SECONDS_PER_IMAGE: u64 = 12;
const ASCII_WORD_WEIGHT: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingTime {
    pub minutes: u32,
    pub chars: u64,
    pub label: String,
}

pub fn estimate(content: &str) -> ReadingTime {
    if content.trim().is_empty() {
        return ReadingTime {
            minutes: 1,
            chars: 0,
            label: label_for(1),
        };
    }

    let text = strip_tags(content);

    let mut cjk_chars: u64 = 0;
    let mut other_chars: u64 = 0;
    let mut ascii_words: u64 = 0;
    let mut in_word = false;

    for ch in text.chars() {
        if is_cjk(ch) {
            cjk_chars += 1;
            in_word = false;
        } else if ch.is_ascii_alphabetic() {
            if !in_word {
                ascii_words += 1;
                in_word = true;
            }
        } else {
            in_word = false;
            if !ch.is_whitespace() {
                other_chars += 1;
            }
        }
    }

    let chars = cjk_chars + ascii_words * ASCII_WORD_WEIGHT + other_chars;
    let image_seconds = count_images(content) * SECONDS_PER_IMAGE;

    let total_seconds = chars * 60 / CHARS_PER_MINUTE + image_seconds;
    let minutes = total_seconds.div_ceil(60).max(1);
    let minutes = u32::try_from(minutes).unwrap_or(u32::MAX);

    ReadingTime {
        minutes,
        chars,
        label: label_for(minutes),
    }
}

fn label_for(minutes: u32) -> String {
    if minutes < 60 {
        format!("{minutes} min read")
    } else {
        let hours = minutes / 60;
        let rest = minutes % 60;
        if rest == 0 {
            format!("{hours} hr read")
        } else {
            format!("{hours} hr {rest} min read")
        }
    }
}

/// Drop everything between `<` and `>`; good enough for CMS-produced HTML.
pub fn strip_tags(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for ch in content.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn count_images(content: &str) -> u64 {
    let lower = content.to_lowercase();
    let mut count = 0;
    let mut rest = lower.as_str();
    while let Some(pos) = rest.find("<img") {
        count += 1;
        rest = &rest[pos + 4..];
    }
    count
}

pub fn is_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{3040}'..='\u{309F}'   // hiragana
        | '\u{30A0}'..='\u{30FF}' // katakana
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_reads_in_one_minute() {
        let result = estimate("");
        assert_eq!(result.minutes, 1);
        assert_eq!(result.chars, 0);
    }

    #[test]
    fn short_content_floors_at_one_minute() {
        assert_eq!(estimate("<p>hello world</p>").minutes, 1);
    }

    #[test]
    fn tags_are_not_counted() {
        let with_tags = estimate("<div class=\"very-long-class-name\">abc</div>");
        let without = estimate("abc");
        assert_eq!(with_tags.chars, without.chars);
    }

    #[test]
    fn cjk_text_counts_per_character() {
        // 800 CJK characters at 400 chars/minute is exactly two minutes.
        let body: String = std::iter::repeat('日').take(800).collect();
        assert_eq!(estimate(&body).minutes, 2);
    }

    #[test]
    fn images_add_viewing_time() {
        let body: String = std::iter::repeat('日').take(400).collect();
        let plain = estimate(&body);
        let with_images = estimate(&format!("{body}<img src=\"a.png\"><img src=\"b.png\">"));
        assert_eq!(plain.minutes, 1);
        // 400 chars = 60s, plus 24s of images, ceils to 2 minutes.
        assert_eq!(with_images.minutes, 2);
    }

    #[test]
    fn long_labels_use_hours() {
        assert_eq!(label_for(60), "1 hr read");
        assert_eq!(label_for(75), "1 hr 15 min read");
        assert_eq!(label_for(3), "3 min read");
    }
}
