//! Curated term lists used by the local video heuristics. All entries are lowercase.

pub const SPORTS_TERMS: &[&str] = &[
    // general
    "sports", "game", "match", "player", "team", "league", "championship", "tournament",
    "highlights", "score", "scores", "scoring", "play", "plays", "playing", "vs", "versus",
    "competition",
    // disciplines
    "football", "soccer", "nfl", "basketball", "nba", "baseball", "mlb", "hockey", "nhl",
    "tennis", "golf", "cricket", "rugby", "volleyball", "boxing", "mma", "ufc", "wrestling",
    "olympics", "athletics", "swimming", "gymnastics",
    // american football
    "quarterback", "touchdown", "field goal", "interception", "tackle", "fumble", "penalty",
    "yard", "yards", "rushing", "passing", "kick", "punt", "goal",
    // soccer
    "free kick", "corner", "offside", "fifa", "striker", "midfielder", "defender",
    "goalkeeper", "goalie", "premier league", "la liga", "bundesliga",
    // clubs and events
    "manchester", "liverpool", "arsenal", "chelsea", "barcelona", "madrid", "juventus",
    "bayern", "cowboys", "patriots", "lakers", "celtics", "yankees", "world cup",
    "champions league", "super bowl",
];

/// Minimum distinct sports terms before content counts as sports.
pub const SPORTS_MIN_HITS: usize = 2;

pub const SPORTS_TASK_MARKERS: &[&str] = &["sport", "football", "soccer", "basketball"];

pub const TECH_TASK_MARKERS: &[&str] =
    &["cod", "program", "develop", "software", "computer", "tech"];

pub const FITNESS_TASK_MARKERS: &[&str] = &["fitness", "workout", "exercise", "gym"];

pub const FITNESS_TITLE_MARKERS: &[&str] = &["workout", "exercise", "fitness"];

/// Any hit makes a video irrelevant, whatever the task keywords say.
pub const DISTRACTION_TERMS: &[&str] = &[
    // entertainment
    "funny", "prank", "reaction", "meme", "gossip", "scandal", "challenge", "crazy", "insane",
    "incredible", "epic", "amazing", "shocking", "unbelievable", "viral", "top 10", "top ten",
    "ranked", "compilation", "fails", "moments", "caught on camera", "gone wrong", "clickbait",
    "drama", "exposed", "reveal", "secret", "leaked",
    // social media
    "influencer", "celebrity", "famous", "trending", "tiktok", "instagram",
    // gaming
    "gameplay", "playthrough", "walkthrough", "stream", "streaming", "live", "gaming", "gamer",
    "fortnite", "minecraft", "roblox", "among us", "battle royale",
    // formats
    "react", "reacts", "reacting", "review", "reviews", "reviewing", "unboxing", "haul",
    "shopping", "try on", "trying", "testing", "taste test", "mukbang", "asmr", "satisfying",
    "relaxing", "sleep", "meditation",
    // clickbait
    "you won't believe", "must see", "watch this", "mind blowing", "changed my life",
    "never seen before", "shocking truth", "this happened", "i can't believe", "gone sexual",
    "police called", "arrested", "3am", "do not try",
    // music
    "official video", "official audio", "music video", "lyric video", "concert",
    "live performance", "behind the scenes", "making of", "dance", "choreography",
];

pub const DISTRACTING_TERMS: &[&str] = &[
    "prank", "funny", "fail", "epic", "react", "drama", "scandal", "shocking", "secret",
    "exposed", "clickbait", "gone wrong", "insane", "cringe", "fight", "crazy", "intense",
    "extreme", "viral", "challenge", "trend", "hype", "controversy", "reaction",
    "caught on camera", "you won't believe", "unbelievable", "cops called", "arrested",
    "gone sexual", "prank call", "social experiment", "fidget spinner", "try not to laugh",
    "savage", "roast", "destroyed", "owned", "trolling", "rage", "screaming", "freakout",
    "public", "embarrassing", "shameful", "celebrity", "gossip", "tea", "storytime",
    "story time", "mukbang", "eating show", "food challenge", "most expensive", "gold",
    "diamond", "billionaire", "mansion", "luxury", "rich", "lamborghini", "ferrari",
];

pub fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

pub fn count_hits(text: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|term| text.contains(*term)).count()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn term_lists_are_lowercase_and_unique() {
        for list in [
            SPORTS_TERMS,
            DISTRACTION_TERMS,
            DISTRACTING_TERMS,
        ] {
            let mut seen = HashSet::new();
            for term in list {
                assert_eq!(*term, term.to_lowercase());
                assert!(seen.insert(*term), "duplicate term {term}");
            }
        }
    }

    #[test]
    fn count_hits_counts_distinct_terms() {
        assert_eq!(count_hits("nba basketball game", SPORTS_TERMS), 3);
        assert_eq!(count_hits("quiet library", SPORTS_TERMS), 0);
    }
}
