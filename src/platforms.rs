/// Static publishing platform catalog
///
/// Limits here are input-time hints for the task form; nothing enforces them
/// against published content.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported publishing targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Wechat,
    Tiktok,
    Instagram,
    Facebook,
    Xiaohongshu,
    Twitter,
}

impl Platform {
    /// Every platform, in catalog order
    pub const ALL: [Platform; 7] = [
        Platform::Youtube,
        Platform::Wechat,
        Platform::Tiktok,
        Platform::Instagram,
        Platform::Facebook,
        Platform::Xiaohongshu,
        Platform::Twitter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Wechat => "wechat",
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Xiaohongshu => "xiaohongshu",
            Platform::Twitter => "twitter",
        }
    }

    pub fn config(&self) -> &'static PlatformConfig {
        platform_config(*self)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("Unknown platform: {}", s))
    }
}

/// Display and validation hints for one platform
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    pub id: Platform,
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_title_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_description_length: Option<usize>,
    pub supported_formats: &'static [&'static str],
    /// Megabytes
    pub max_image_size: u32,
}

impl PlatformConfig {
    /// Whether a file name carries one of the accepted extensions
    pub fn accepts_file(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        self.supported_formats.iter().any(|ext| lower.ends_with(ext))
    }

    /// Whether a byte size fits under the platform's image limit
    pub fn accepts_size(&self, bytes: u64) -> bool {
        bytes <= u64::from(self.max_image_size) * 1024 * 1024
    }
}

static PLATFORM_CONFIGS: [PlatformConfig; 7] = [
    PlatformConfig {
        id: Platform::Youtube,
        name: "YouTube",
        icon: "📺",
        color: "#FF0000",
        max_title_length: Some(100),
        max_description_length: Some(5000),
        supported_formats: &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"],
        max_image_size: 2,
    },
    PlatformConfig {
        id: Platform::Wechat,
        name: "微信视频号",
        icon: "💬",
        color: "#07C160",
        max_title_length: Some(30),
        max_description_length: Some(1000),
        supported_formats: &[".jpg", ".jpeg", ".png"],
        max_image_size: 5,
    },
    PlatformConfig {
        id: Platform::Tiktok,
        name: "TikTok",
        icon: "🎵",
        color: "#000000",
        max_title_length: Some(150),
        max_description_length: Some(2200),
        supported_formats: &[".jpg", ".jpeg", ".png", ".webp"],
        max_image_size: 3,
    },
    PlatformConfig {
        id: Platform::Instagram,
        name: "Instagram",
        icon: "📷",
        color: "#E4405F",
        max_title_length: None,
        max_description_length: Some(2200),
        supported_formats: &[".jpg", ".jpeg", ".png"],
        max_image_size: 8,
    },
    PlatformConfig {
        id: Platform::Facebook,
        name: "Facebook",
        icon: "👍",
        color: "#1877F2",
        max_title_length: None,
        max_description_length: Some(63206),
        supported_formats: &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"],
        max_image_size: 4,
    },
    PlatformConfig {
        id: Platform::Xiaohongshu,
        name: "小红书",
        icon: "📕",
        color: "#FF2442",
        max_title_length: Some(20),
        max_description_length: Some(1000),
        supported_formats: &[".jpg", ".jpeg", ".png"],
        max_image_size: 5,
    },
    PlatformConfig {
        id: Platform::Twitter,
        name: "Twitter/X",
        icon: "🐦",
        color: "#1DA1F2",
        max_title_length: None,
        max_description_length: Some(280),
        supported_formats: &[".jpg", ".jpeg", ".png", ".gif", ".webp"],
        max_image_size: 5,
    },
];

/// Look up the static configuration for a platform
pub fn platform_config(platform: Platform) -> &'static PlatformConfig {
    // Catalog order matches Platform::ALL
    &PLATFORM_CONFIGS[platform as usize]
}

/// All platform configurations in catalog order
pub fn all_platforms() -> &'static [PlatformConfig] {
    &PLATFORM_CONFIGS
}

/// Length in user-perceived characters, matching how the form counts
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
