use crate::{
    config::RelevanceConfig,
    domain::{KeywordSet, MatchLocation, MatchedTerm, PageSignal, RelevanceVerdict, VerdictSource},
};

/// Weighted keyword scorer for full pages.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    config: RelevanceConfig,
}

impl RelevanceScorer {
    pub fn new(config: RelevanceConfig) -> Self {
        Self { config }
    }

    /// Title and url hits are counted independently; a body hit only counts
    /// when neither of them matched the same keyword. The total is normalised
    /// by the keyword count and clamped to 1.0.
    pub fn score(&self, signal: &PageSignal, keywords: &KeywordSet) -> RelevanceVerdict {
        if keywords.is_empty() {
            return RelevanceVerdict::fail_open();
        }

        let title = signal.title.to_lowercase();
        let url = signal.url.to_lowercase();
        let body = signal.body_text.to_lowercase();

        let mut total = 0.0;
        let mut matches = Vec::new();

        for keyword in keywords.iter() {
            let mut matched = false;
            if title.contains(keyword) {
                total += self.config.title_weight;
                matches.push(term(MatchLocation::Title, keyword));
                matched = true;
            }
            if url.contains(keyword) {
                total += self.config.url_weight;
                matches.push(term(MatchLocation::Url, keyword));
                matched = true;
            }
            if !matched && body.contains(keyword) {
                total += self.config.content_weight;
                matches.push(term(MatchLocation::Content, keyword));
            }
        }

        let score = (total / keywords.len() as f64).min(1.0);
        let is_relevant = score >= self.config.threshold;
        let is_low_confidence = !is_relevant && score >= self.config.threshold_low;
        let match_count = matches.len();
        matches.truncate(self.config.matched_terms_limit);

        tracing::info!(
            target: "relevance",
            url = %signal.url,
            score = %format!("{score:.2}"),
            matches = match_count,
            "[{}]",
            if is_relevant { "RELEVANT" } else { "IRRELEVANT" }
        );

        RelevanceVerdict {
            is_relevant,
            score,
            is_low_confidence,
            matched_terms: matches,
            match_count,
            source: VerdictSource::KeywordMatch,
        }
    }
}

fn term(location: MatchLocation, keyword: &str) -> MatchedTerm {
    MatchedTerm {
        location,
        keyword: keyword.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(RelevanceConfig::default())
    }

    fn filler(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("zzfiller{i}")).collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn empty_keywords_fail_open() {
        let signal = PageSignal::new("https://example.com", "Anything", "");
        let verdict = scorer().score(&signal, &KeywordSet::default());
        assert!(verdict.is_relevant);
        assert_close(verdict.score, 0.5);
        assert_eq!(verdict.source, VerdictSource::Default);
    }

    #[test]
    fn scoring_is_deterministic() {
        let signal = PageSignal::new(
            "https://blog.example.com/rust-async",
            "Async Rust in depth",
            "futures and executors",
        );
        let keywords = KeywordSet::from_raw(["rust", "async", "executors", "garden"]);
        let first = scorer().score(&signal, &keywords);
        let second = scorer().score(&signal, &keywords);
        assert_eq!(first, second);
    }

    #[test]
    fn title_and_url_both_count_but_body_only_alone() {
        // "rust": title 3 + url 2, body ignored; "executors": body 1. 6 / 30 keywords.
        let signal = PageSignal::new(
            "https://blog.example.com/rust",
            "Rust notes",
            "rust executors",
        );
        let mut raw = vec!["rust".to_string(), "executors".to_string()];
        raw.extend(filler(28));
        let verdict = scorer().score(&signal, &KeywordSet::from_raw(raw));
        assert_close(verdict.score, 0.2);
        assert_eq!(verdict.match_count, 3);
        assert_eq!(verdict.matched_terms[0].location, MatchLocation::Title);
        assert_eq!(verdict.matched_terms[1].location, MatchLocation::Url);
        assert_eq!(verdict.matched_terms[2].location, MatchLocation::Content);
    }

    #[test]
    fn score_is_normalised_by_keyword_count() {
        let mut raw = vec!["python".to_string()];
        raw.extend(filler(9));
        let signal = PageSignal::new("https://example.com/", "Python guide", "");
        let verdict = scorer().score(&signal, &KeywordSet::from_raw(raw));
        assert_close(verdict.score, 3.0 / 10.0);
        assert!(verdict.is_relevant);
    }

    #[test]
    fn adding_a_title_match_follows_the_denominator_arithmetic() {
        let mut raw = vec!["python".to_string()];
        raw.extend(filler(9));
        let signal = PageSignal::new("https://example.com/", "Python guide", "");

        let before = scorer().score(&signal, &KeywordSet::from_raw(raw.clone()));
        raw.push("guide".to_string());
        let after = scorer().score(&signal, &KeywordSet::from_raw(raw));

        // old contribution shrinks by 10/11, the new keyword adds 3/11.
        assert_close(before.score, 0.3);
        assert_close(after.score, before.score * 10.0 / 11.0 + 3.0 / 11.0);
        assert_close(after.score, 6.0 / 11.0);
        assert!(after.score >= before.score);
    }

    #[test]
    fn low_confidence_band_is_between_thresholds() {
        // one body hit out of five keywords: 1/5 = 0.2
        let signal = PageSignal::new("https://example.com/", "Notes", "kubernetes basics");
        let mut raw = vec!["kubernetes".to_string()];
        raw.extend(filler(4));
        let verdict = scorer().score(&signal, &KeywordSet::from_raw(raw));
        assert_close(verdict.score, 0.2);
        assert!(!verdict.is_relevant);
        assert!(verdict.is_low_confidence);
    }

    #[test]
    fn below_low_threshold_is_plain_irrelevant() {
        let signal = PageSignal::new("https://example.com/", "Celebrity news", "");
        let keywords = KeywordSet::from_raw(filler(20));
        let verdict = scorer().score(&signal, &keywords);
        assert_close(verdict.score, 0.0);
        assert!(!verdict.is_relevant);
        assert!(!verdict.is_low_confidence);
    }

    #[test]
    fn matched_terms_are_truncated_but_counted() {
        let raw: Vec<String> = (0..15).map(|i| format!("term{i:02}")).collect();
        let title = raw.join(" ");
        let signal = PageSignal::new("https://example.com/", title, "");
        let verdict = scorer().score(&signal, &KeywordSet::from_raw(raw));
        assert_eq!(verdict.matched_terms.len(), 10);
        assert_eq!(verdict.match_count, 15);
        assert_close(verdict.score, 1.0);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let signal = PageSignal::new("https://EXAMPLE.com/Tokio", "TOKIO Runtime", "");
        let keywords = KeywordSet::from_raw(["Tokio"]);
        let verdict = scorer().score(&signal, &keywords);
        assert_eq!(verdict.match_count, 2);
        assert_close(verdict.score, 1.0);
    }
}
