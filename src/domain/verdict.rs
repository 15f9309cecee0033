use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictSource {
    Whitelist,
    KeywordMatch,
    Default,
    LocalHeuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchLocation {
    Title,
    Url,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedTerm {
    pub location: MatchLocation,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceVerdict {
    pub is_relevant: bool,
    pub score: f64,
    pub is_low_confidence: bool,
    pub matched_terms: Vec<MatchedTerm>,
    pub match_count: usize,
    pub source: VerdictSource,
}

impl RelevanceVerdict {
    pub fn whitelisted() -> Self {
        Self {
            is_relevant: true,
            score: 1.0,
            is_low_confidence: false,
            matched_terms: Vec::new(),
            match_count: 0,
            source: VerdictSource::Whitelist,
        }
    }

    /// Used when no keywords are available: the page is shown.
    pub fn fail_open() -> Self {
        Self {
            is_relevant: true,
            score: 0.5,
            is_low_confidence: false,
            matched_terms: Vec::new(),
            match_count: 0,
            source: VerdictSource::Default,
        }
    }

    pub fn message(&self) -> String {
        let percent = (self.score * 100.0).round() as i64;
        match self.source {
            VerdictSource::Whitelist => "This domain is always allowed.".to_string(),
            VerdictSource::Default => {
                "No keywords available for relevance check. Please generate keywords.".to_string()
            }
            _ if self.is_relevant => {
                format!("This page is relevant to your task ({percent}% match).")
            }
            _ if self.is_low_confidence => {
                format!("This page has low relevance to your task ({percent}% match).")
            }
            _ => format!("This page appears irrelevant to your task ({percent}% match)."),
        }
    }
}

/// Which local heuristic settled a video decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalRule {
    MissingInput,
    Sports,
    Distraction,
    KeywordMatch,
    LargeSetAbsence,
    TaskWords,
    DistractingCategory,
    StrictDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDecision {
    pub is_decisive: bool,
    pub is_relevant: bool,
    pub rule: LocalRule,
}

impl LocalDecision {
    pub fn relevant(rule: LocalRule) -> Self {
        Self {
            is_decisive: true,
            is_relevant: true,
            rule,
        }
    }

    pub fn irrelevant(rule: LocalRule) -> Self {
        Self {
            is_decisive: true,
            is_relevant: false,
            rule,
        }
    }
}

/// What the presentation layer should do with an element or tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Directive {
    Reveal,
    SuppressWithOverlay,
    CloseHostSurface,
}

impl Directive {
    pub fn for_page(verdict: &RelevanceVerdict, auto_close: bool) -> Self {
        if verdict.is_relevant {
            Directive::Reveal
        } else if verdict.is_low_confidence || !auto_close {
            Directive::SuppressWithOverlay
        } else {
            Directive::CloseHostSurface
        }
    }

    pub fn for_element(is_relevant: bool) -> Self {
        if is_relevant {
            Directive::Reveal
        } else {
            Directive::SuppressWithOverlay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword_verdict(is_relevant: bool, is_low_confidence: bool) -> RelevanceVerdict {
        RelevanceVerdict {
            is_relevant,
            score: 0.2,
            is_low_confidence,
            matched_terms: Vec::new(),
            match_count: 0,
            source: VerdictSource::KeywordMatch,
        }
    }

    #[test]
    fn low_confidence_pages_are_overlaid_not_closed() {
        let verdict = keyword_verdict(false, true);
        assert_eq!(
            Directive::for_page(&verdict, true),
            Directive::SuppressWithOverlay
        );
    }

    #[test]
    fn irrelevant_pages_close_only_with_auto_close() {
        let verdict = keyword_verdict(false, false);
        assert_eq!(Directive::for_page(&verdict, true), Directive::CloseHostSurface);
        assert_eq!(
            Directive::for_page(&verdict, false),
            Directive::SuppressWithOverlay
        );
    }

    #[test]
    fn source_serializes_kebab_case() {
        let json = serde_json::to_string(&VerdictSource::KeywordMatch).unwrap();
        assert_eq!(json, "\"keyword-match\"");
    }
}
