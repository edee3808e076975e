/// Prompt construction and completion parsing
use crate::platforms::Platform;

pub const TITLE_SYSTEM: &str =
    "You are a social media content specialist who writes attention-grabbing titles.";
pub const DESCRIPTION_SYSTEM: &str =
    "You are a social media content specialist who writes engaging post descriptions.";

pub const TITLE_TEMPERATURE: f32 = 0.8;
pub const TITLE_MAX_TOKENS: u32 = 200;
pub const DESCRIPTION_TEMPERATURE: f32 = 0.8;
pub const DESCRIPTION_MAX_TOKENS: u32 = 500;

/// Unknown or absent platform names fall back to the generic guideline
fn parse_platform(platform: Option<&str>) -> Option<Platform> {
    platform.and_then(|p| p.parse().ok())
}

fn title_guideline(platform: Option<Platform>) -> &'static str {
    match platform {
        Some(Platform::Youtube) => "a compelling YouTube title under 60 characters",
        Some(Platform::Wechat) => "a short, punchy WeChat Channels title under 30 characters",
        Some(Platform::Tiktok) => "a trending TikTok title using popular hashtags",
        Some(Platform::Instagram) => "an Instagram title, emoji welcome",
        Some(Platform::Facebook) => "a Facebook title that invites interaction",
        Some(Platform::Xiaohongshu) => "a Xiaohongshu title with relevant topic tags",
        Some(Platform::Twitter) => "a Twitter/X title within 280 characters",
        None => "an attention-grabbing title",
    }
}

fn description_guideline(platform: Option<Platform>) -> &'static str {
    match platform {
        Some(Platform::Youtube) => "a detailed YouTube description with keywords and tags, 300-500 words",
        Some(Platform::Wechat) => "a concise WeChat Channels description, 100-200 words",
        Some(Platform::Tiktok) => "a short TikTok description with topic hashtags, 100-150 words",
        Some(Platform::Instagram) => "an Instagram caption with emoji and hashtags, 150-300 words",
        Some(Platform::Facebook) => "a Facebook description that encourages interaction, 200-300 words",
        Some(Platform::Xiaohongshu) => {
            "a Xiaohongshu recommendation-style description with emoji and topic tags, 200-400 words"
        }
        Some(Platform::Twitter) => "a short Twitter/X description within 280 characters",
        None => "a detailed description, 200-300 words",
    }
}

fn tone_description(tone: Option<&str>) -> &'static str {
    match tone {
        Some("professional") => "professional and formal",
        Some("casual") => "relaxed and casual",
        Some("enthusiastic") => "enthusiastic and energetic",
        Some("informative") => "informative and educational",
        Some("humorous") => "humorous and playful",
        _ => "natural and friendly",
    }
}

fn keywords_line(keywords: Option<&str>) -> String {
    keywords
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| format!("Keywords: {}\n", k))
        .unwrap_or_default()
}

fn platform_label(platform: Option<&str>) -> &str {
    platform.filter(|p| !p.trim().is_empty() && *p != "default").unwrap_or("general")
}

pub fn title_prompt(image_description: &str, platform: Option<&str>, keywords: Option<&str>) -> String {
    format!(
        "Write 3 titles for a social media post based on the following.\n\n\
         Image content: {}\n\
         {}\
         Target platform: {}\n\
         Requirement: {}\n\n\
         Return exactly 3 titles, one per line, without numbering or commentary.\n\
         Titles should be creative, eye-catching and spark curiosity.",
        image_description.trim(),
        keywords_line(keywords),
        platform_label(platform),
        title_guideline(parse_platform(platform)),
    )
}

pub fn description_prompt(
    image_description: &str,
    platform: Option<&str>,
    keywords: Option<&str>,
    tone: Option<&str>,
) -> String {
    format!(
        "Write a description for a social media post based on the following.\n\n\
         Image content: {}\n\
         {}\
         Target platform: {}\n\
         Tone: {}\n\
         Requirement: {}\n\n\
         Return only the description, without a heading or commentary.\n\
         It should make people want to read on and like, comment or share.\n\
         Add emoji and hashtags where the platform suits them.",
        image_description.trim(),
        keywords_line(keywords),
        platform_label(platform),
        tone_description(tone),
        description_guideline(parse_platform(platform)),
    )
}

/// Split a completion into titles: one per non-blank line, numbering removed
pub fn parse_titles(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(strip_numbering)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Remove a leading `1.` or `1)` marker
fn strip_numbering(line: &str) -> &str {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return line;
    }
    match line[digits..].strip_prefix(['.', ')']) {
        Some(rest) => rest.trim(),
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_titles_strips_numbering_and_blanks() {
        let content = "1. Sunrise over the bay\n\n2) Golden hour magic \n3.Morning calm\n";
        assert_eq!(
            parse_titles(content),
            vec!["Sunrise over the bay", "Golden hour magic", "Morning calm"]
        );
    }

    #[test]
    fn test_parse_titles_keeps_leading_numbers_without_marker() {
        assert_eq!(parse_titles("2024 in review"), vec!["2024 in review"]);
    }

    #[test]
    fn test_title_prompt_uses_platform_guideline() {
        let prompt = title_prompt("a cat on a sofa", Some("wechat"), Some("pets, cozy"));
        assert!(prompt.contains("a cat on a sofa"));
        assert!(prompt.contains("Keywords: pets, cozy"));
        assert!(prompt.contains("under 30 characters"));
        assert!(prompt.contains("Target platform: wechat"));
    }

    #[test]
    fn test_unknown_platform_and_tone_fall_back() {
        let prompt = description_prompt("a cat", Some("myspace"), None, Some("sarcastic"));
        assert!(prompt.contains("200-300 words"));
        assert!(prompt.contains("natural and friendly"));
        assert!(!prompt.contains("Keywords:"));

        let prompt = description_prompt("a cat", Some("default"), None, None);
        assert!(prompt.contains("Target platform: general"));
    }

    #[test]
    fn test_description_tone() {
        let prompt = description_prompt("a cat", Some("twitter"), None, Some("humorous"));
        assert!(prompt.contains("humorous and playful"));
        assert!(prompt.contains("280 characters"));
    }
}
