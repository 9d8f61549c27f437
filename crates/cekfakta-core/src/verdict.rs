use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// The six classification categories the agent answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Valid,
    Hoax,
    Clickbait,
    Satire,
    Opinion,
    Unverified,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Valid => "VALID",
            Verdict::Hoax => "HOAX",
            Verdict::Clickbait => "CLICKBAIT",
            Verdict::Satire => "SATIRE",
            Verdict::Opinion => "OPINION",
            Verdict::Unverified => "UNVERIFIED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "VALID" => Some(Verdict::Valid),
            "HOAX" => Some(Verdict::Hoax),
            "CLICKBAIT" => Some(Verdict::Clickbait),
            "SATIRE" => Some(Verdict::Satire),
            "OPINION" => Some(Verdict::Opinion),
            "UNVERIFIED" => Some(Verdict::Unverified),
            _ => None,
        }
    }

    pub fn all() -> Vec<Verdict> {
        vec![
            Verdict::Valid,
            Verdict::Hoax,
            Verdict::Clickbait,
            Verdict::Satire,
            Verdict::Opinion,
            Verdict::Unverified,
        ]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Verdict::Valid => "Factual & confirmed by credible sources",
            Verdict::Hoax => "False, fabricated, or manipulated content",
            Verdict::Clickbait => "Misleading title/caption but content is real",
            Verdict::Satire => "Humor/Parody, not meant to be factual",
            Verdict::Opinion => "Subjective views/commentary, not news reports",
            Verdict::Unverified => "Lacking credible evidence to confirm/deny",
        }
    }

    /// Find the category an answer leads with, e.g. `[HOAX]` or `**VALID**`
    /// on its own line. Mentions inside running prose are ignored.
    pub fn detect(answer: &str) -> Option<Self> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = PATTERN
            .get_or_init(|| {
                Regex::new(
                    r"(?im)^[\s>#*_\[(]*(?:\d+\.\s*)?(VALID|HOAX|CLICKBAIT|SATIRE|OPINION|UNVERIFIED)[\s*_\])]*(?::|$)",
                )
                .ok()
            })
            .as_ref()?;

        pattern
            .captures(answer)
            .and_then(|caps| caps.get(1))
            .and_then(|m| Verdict::from_str(m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_bracketed_category() {
        assert_eq!(Verdict::detect("[HOAX]\nThe Moon is rock."), Some(Verdict::Hoax));
    }

    #[test]
    fn test_detect_markdown_variants() {
        assert_eq!(Verdict::detect("**VALID**\nConfirmed."), Some(Verdict::Valid));
        assert_eq!(Verdict::detect("## Satire\nfrom a parody site"), Some(Verdict::Satire));
        assert_eq!(Verdict::detect("UNVERIFIED: no sources found"), Some(Verdict::Unverified));
        assert_eq!(Verdict::detect("6. UNVERIFIED"), Some(Verdict::Unverified));
    }

    #[test]
    fn test_detect_ignores_prose_mentions() {
        assert_eq!(Verdict::detect("This is not a hoax in my opinion, just late."), None);
        assert_eq!(Verdict::detect("An error occurred: timeout"), None);
    }

    #[test]
    fn test_detect_uses_first_line_category() {
        let answer = "[CLICKBAIT]\nThe headline overstates it.\n[OPINION] pieces were also found";
        assert_eq!(Verdict::detect(answer), Some(Verdict::Clickbait));
    }

    #[test]
    fn test_from_str_round_trip() {
        for verdict in Verdict::all() {
            assert_eq!(Verdict::from_str(verdict.as_str()), Some(verdict));
        }
    }
}
