pub const WHITELIST_CATEGORY: &str = "GENERAL";
pub const MIXED_CATEGORY: &str = "MIXED_USE";

pub const DEFAULT_WHITELIST: &[&str] = &[
    "google.com/search",
    "bing.com/search",
    "search.yahoo.com",
    "duckduckgo.com",
    "scholar.google.com",
    "wikipedia.org",
    "stackoverflow.com",
    "github.com",
    "docs.google.com",
    "sheets.google.com",
    "drive.google.com",
    "calendar.google.com",
    "notion.so",
    "roamresearch.com",
    "obsidian.md",
    "mail.google.com",
    "outlook.com",
    "youtube.com",
    "reddit.com",
];

pub const DEFAULT_BLACKLIST: &[(&str, &[&str])] = &[
    (
        "SOCIAL_MEDIA",
        &[
            "facebook.com",
            "twitter.com",
            "instagram.com",
            "tiktok.com",
            "snapchat.com",
            "pinterest.com",
            "tumblr.com",
            "linkedin.com/feed",
            "quora.com",
        ],
    ),
    (
        "ENTERTAINMENT",
        &[
            "netflix.com",
            "hulu.com",
            "disneyplus.com",
            "hbomax.com",
            "primevideo.com",
            "twitch.tv",
            "vimeo.com",
            "dailymotion.com",
            "imdb.com",
            "rottentomatoes.com",
            "metacritic.com",
            "crunchyroll.com",
            "funimation.com",
        ],
    ),
    (
        "SHOPPING",
        &[
            "amazon.com",
            "ebay.com",
            "walmart.com",
            "target.com",
            "bestbuy.com",
            "etsy.com",
            "wish.com",
            "aliexpress.com",
            "wayfair.com",
            "homedepot.com",
            "newegg.com",
            "zappos.com",
        ],
    ),
    (
        "GAMING",
        &[
            "steam.com",
            "epicgames.com",
            "ea.com",
            "blizzard.com",
            "playstation.com",
            "xbox.com",
            "nintendo.com",
            "roblox.com",
            "ign.com",
            "gamespot.com",
            "kotaku.com",
            "polygon.com",
        ],
    ),
];

pub const DEFAULT_MIXED: &[&str] = &["medium.com", "github.com", "linkedin.com"];
