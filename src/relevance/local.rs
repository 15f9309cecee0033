use crate::domain::{KeywordSet, LocalDecision, LocalRule};

use super::vocabulary::{
    contains_any, count_hits, DISTRACTING_TERMS, DISTRACTION_TERMS, FITNESS_TASK_MARKERS,
    FITNESS_TITLE_MARKERS, SPORTS_MIN_HITS, SPORTS_TASK_MARKERS, SPORTS_TERMS, TECH_TASK_MARKERS,
};

/// Fast rule layer for short, noisy video titles.
///
/// Rules run in a fixed order and the first one that decides wins. Without
/// affirmative evidence of relevance the answer is "irrelevant".
#[derive(Debug, Clone)]
pub struct LocalHeuristicClassifier {
    large_keyword_set_size: usize,
}

impl LocalHeuristicClassifier {
    pub fn new(large_keyword_set_size: usize) -> Self {
        Self {
            large_keyword_set_size,
        }
    }

    pub fn classify(
        &self,
        title: &str,
        task: &str,
        description: &str,
        keywords: &KeywordSet,
    ) -> LocalDecision {
        if title.trim().is_empty() || task.trim().is_empty() {
            return LocalDecision::irrelevant(LocalRule::MissingInput);
        }

        let title = title.to_lowercase();
        let task = task.to_lowercase();
        let combined = format!("{} {}", title, description.to_lowercase());
        let task_words: Vec<&str> = task
            .split_whitespace()
            .filter(|word| word.chars().count() > 3)
            .collect();

        if let Some(decision) = sports_rule(&title, &task, &combined) {
            return decision;
        }

        if contains_any(&combined, DISTRACTION_TERMS) {
            return LocalDecision::irrelevant(LocalRule::Distraction);
        }

        let task_word_hits = task_words
            .iter()
            .filter(|word| combined.contains(*word))
            .count();

        if !keywords.is_empty() {
            let keyword_hits = keywords.iter().filter(|k| combined.contains(k)).count();
            if keyword_hits >= 1 {
                return LocalDecision::relevant(LocalRule::KeywordMatch);
            }
            if keywords.len() > self.large_keyword_set_size && task_word_hits == 0 {
                return LocalDecision::irrelevant(LocalRule::LargeSetAbsence);
            }
        }

        if task_word_hits >= 1 {
            return LocalDecision::relevant(LocalRule::TaskWords);
        }

        if contains_any(&combined, DISTRACTING_TERMS) {
            return LocalDecision::irrelevant(LocalRule::DistractingCategory);
        }

        LocalDecision::irrelevant(LocalRule::StrictDefault)
    }
}

fn sports_rule(title: &str, task: &str, combined: &str) -> Option<LocalDecision> {
    if count_hits(combined, SPORTS_TERMS) < SPORTS_MIN_HITS {
        return None;
    }

    if !contains_any(task, SPORTS_TASK_MARKERS) {
        return Some(LocalDecision::irrelevant(LocalRule::Sports));
    }
    if contains_any(task, TECH_TASK_MARKERS) {
        return Some(LocalDecision::irrelevant(LocalRule::Sports));
    }
    if contains_any(task, FITNESS_TASK_MARKERS) && !contains_any(title, FITNESS_TITLE_MARKERS) {
        return Some(LocalDecision::irrelevant(LocalRule::Sports));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LocalHeuristicClassifier {
        LocalHeuristicClassifier::new(200)
    }

    #[test]
    fn missing_title_or_task_fails_closed() {
        let keywords = KeywordSet::from_raw(["python"]);
        let no_title = classifier().classify("  ", "learn python", "", &keywords);
        assert_eq!(no_title, LocalDecision::irrelevant(LocalRule::MissingInput));
        let no_task = classifier().classify("Python basics", "", "", &keywords);
        assert!(no_task.is_decisive);
        assert!(!no_task.is_relevant);
    }

    #[test]
    fn python_tutorial_matches_generated_keyword() {
        let keywords = KeywordSet::from_raw(["python", "tutorial", "programming"]);
        let decision = classifier().classify(
            "Python Tutorial for Beginners",
            "learn python programming",
            "",
            &keywords,
        );
        assert_eq!(decision, LocalDecision::relevant(LocalRule::KeywordMatch));
    }

    #[test]
    fn sports_highlights_rejected_for_tech_task() {
        let keywords = KeywordSet::from_raw(["python", "tutorial", "programming"]);
        let decision = classifier().classify(
            "Crazy NBA Highlights Reaction",
            "learn python programming",
            "basketball game insane plays",
            &keywords,
        );
        assert_eq!(decision, LocalDecision::irrelevant(LocalRule::Sports));
    }

    #[test]
    fn sports_task_lets_sports_content_through_to_keywords() {
        let keywords = KeywordSet::from_raw(["tactics", "pressing"]);
        let decision = classifier().classify(
            "Premier League pressing tactics explained",
            "study football tactics",
            "match analysis of the team shape",
            &keywords,
        );
        assert_eq!(decision, LocalDecision::relevant(LocalRule::KeywordMatch));
    }

    #[test]
    fn coding_override_beats_sports_task() {
        let keywords = KeywordSet::from_raw(["tracker"]);
        let decision = classifier().classify(
            "NBA match recap",
            "code a basketball stats tracker",
            "team scores tonight",
            &keywords,
        );
        assert_eq!(decision, LocalDecision::irrelevant(LocalRule::Sports));
    }

    #[test]
    fn fitness_task_rejects_team_sport_without_fitness_title() {
        let keywords = KeywordSet::from_raw(["conditioning"]);
        let rejected = classifier().classify(
            "Soccer match recap",
            "football fitness conditioning",
            "team goal penalty",
            &keywords,
        );
        assert_eq!(rejected, LocalDecision::irrelevant(LocalRule::Sports));

        let kept = classifier().classify(
            "Soccer conditioning workout",
            "football fitness conditioning",
            "team drills",
            &keywords,
        );
        assert_eq!(kept, LocalDecision::relevant(LocalRule::KeywordMatch));
    }

    #[test]
    fn distraction_term_beats_keyword_match() {
        let keywords = KeywordSet::from_raw(["python"]);
        let decision = classifier().classify(
            "Python prank on my roommate",
            "learn python programming",
            "",
            &keywords,
        );
        assert_eq!(decision, LocalDecision::irrelevant(LocalRule::Distraction));
    }

    #[test]
    fn large_keyword_set_without_any_hit_is_irrelevant() {
        let keywords = KeywordSet::from_raw((0..250).map(|i| format!("kwterm{i}")));
        let decision = classifier().classify(
            "Random Vlog Day in My Life",
            "learn python programming",
            "",
            &keywords,
        );
        assert_eq!(decision, LocalDecision::irrelevant(LocalRule::LargeSetAbsence));
    }

    #[test]
    fn task_word_fallback_keeps_small_keyword_sets_honest() {
        let keywords = KeywordSet::from_raw(["kwterm"]);
        let decision = classifier().classify(
            "Cooking pasta at home",
            "italian cooking",
            "",
            &keywords,
        );
        assert_eq!(decision, LocalDecision::relevant(LocalRule::TaskWords));
    }

    #[test]
    fn distracting_category_rejects_when_nothing_matched() {
        let decision = classifier().classify(
            "Inside a billionaire mansion",
            "learn rust",
            "",
            &KeywordSet::default(),
        );
        assert_eq!(
            decision,
            LocalDecision::irrelevant(LocalRule::DistractingCategory)
        );
    }

    #[test]
    fn nothing_proven_means_irrelevant() {
        let decision = classifier().classify(
            "Quiet afternoon walk",
            "learn rust",
            "",
            &KeywordSet::default(),
        );
        assert_eq!(decision, LocalDecision::irrelevant(LocalRule::StrictDefault));
    }
}
