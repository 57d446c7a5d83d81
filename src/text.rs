//! Text derivation helpers: slugs, HTML stripping, reading time, SEO
//! metadata defaults.

use std::sync::OnceLock;

use regex::Regex;

const WORDS_PER_MINUTE: u32 = 200;

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// Converts a title to a URL-safe slug: lowercase ASCII letters, digits and
/// hyphens only. Turkish characters are transliterated so Turkish titles
/// produce readable slugs.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_hyphen = true;

    for c in text.chars() {
        let mapped: Option<char> = match c {
            'ç' | 'Ç' => Some('c'),
            'ğ' | 'Ğ' => Some('g'),
            'ı' | 'İ' => Some('i'),
            'ö' | 'Ö' => Some('o'),
            'ş' | 'Ş' => Some('s'),
            'ü' | 'Ü' => Some('u'),
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            _ => None,
        };

        match mapped {
            Some(c) => {
                slug.push(c);
                last_hyphen = false;
            }
            None => {
                if !last_hyphen {
                    slug.push('-');
                    last_hyphen = true;
                }
            }
        }
    }

    slug.trim_end_matches('-').to_string()
}

/// Removes HTML tags, leaving text content only.
pub fn strip_html(html: &str) -> String {
    tag_regex().replace_all(html, "").into_owned()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated reading time in minutes: word count of the tag-stripped
/// content divided by 200 words per minute, rounded up.
pub fn reading_time(content: &str) -> u32 {
    let words = word_count(&strip_html(content)) as u32;
    words.div_ceil(WORDS_PER_MINUTE)
}

/// Cuts text down to `max_len` characters, appending an ellipsis when
/// anything was removed. Cuts on a char boundary.
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_len).collect();
    format!("{}...", cut.trim_end())
}

/// Default SEO meta description: the first 160 characters of the
/// tag-stripped content.
pub fn meta_description(content: &str) -> String {
    truncate(&strip_html(content), 160)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust & Web  "), "rust-web");
        assert_eq!(slugify("Next.js 16!"), "next-js-16");
    }

    #[test]
    fn slugify_transliterates_turkish() {
        assert_eq!(slugify("Yapay Zeka"), "yapay-zeka");
        assert_eq!(slugify("Web Geliştirme"), "web-gelistirme");
        assert_eq!(slugify("ÇĞİÖŞÜ çğıöşü"), "cgiosu-cgiosu");
    }

    #[test]
    fn slugify_output_is_url_safe() {
        let slug = slugify("Ünlü Başlık: %100 Kesin! (test)");
        assert!(!slug.is_empty());
        assert!(slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert!(!slug.starts_with('-'));
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn strip_html_removes_tags() {
        assert_eq!(
            strip_html("<h2>Title</h2><p>Some <strong>bold</strong> text</p>"),
            "TitleSome bold text"
        );
    }

    #[test]
    fn reading_time_rounds_up() {
        let content = format!("<p>{}</p>", vec!["word"; 401].join(" "));
        assert_eq!(reading_time(&content), 3);
        assert_eq!(reading_time("<p>short</p>"), 1);
        assert_eq!(reading_time(""), 0);
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcde...");
    }

    #[test]
    fn meta_description_is_bounded() {
        let content = format!("<p>{}</p>", "a".repeat(500));
        let desc = meta_description(&content);
        assert!(desc.chars().count() <= 163);
        assert!(desc.ends_with("..."));
    }
}
