use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an ad.
///
/// `Draft` -> `Generated` -> (`Regenerated` on full regeneration) -> `Evaluated`.
/// `Published` is accepted when reading but nothing transitions into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdStatus {
    Draft,
    Generated,
    Regenerated,
    Evaluated,
    Published,
}

impl AdStatus {
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::Generated,
        Self::Regenerated,
        Self::Evaluated,
        Self::Published,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Generated => "generated",
            Self::Regenerated => "regenerated",
            Self::Evaluated => "evaluated",
            Self::Published => "published",
        }
    }
}

/// How an ad row came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdType {
    ProductGen,
    Regen,
    RegenImage,
    Evaluate,
}

impl AdType {
    pub const ALL: [Self; 4] = [Self::ProductGen, Self::Regen, Self::RegenImage, Self::Evaluate];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProductGen => "product_gen",
            Self::Regen => "regen",
            Self::RegenImage => "regen_image",
            Self::Evaluate => "evaluate",
        }
    }
}

/// Advertising platforms the model may recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "google_ads")]
    GoogleAds,
    #[serde(rename = "meta_ads")]
    MetaAds,
    #[serde(rename = "linkedin")]
    LinkedIn,
    #[serde(rename = "twitter")]
    Twitter,
    #[serde(rename = "instagram")]
    Instagram,
    #[serde(rename = "tiktok")]
    TikTok,
}

impl Platform {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleAds => "google_ads",
            Self::MetaAds => "meta_ads",
            Self::LinkedIn => "linkedin",
            Self::Twitter => "twitter",
            Self::Instagram => "instagram",
            Self::TikTok => "tiktok",
        }
    }

    /// Maps the loose names models tend to produce ("Google Ads", "facebook")
    /// onto a known platform.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "google" | "adwords" => Some(Self::GoogleAds),
            "meta" | "facebook" | "facebook_ads" => Some(Self::MetaAds),
            "x" | "x_twitter" => Some(Self::Twitter),
            _ => key.parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! str_enum_impls {
    ($ty:ty, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == normalized)
                    .ok_or_else(|| UnknownVariant(s.to_string()))
            }
        }
    };
}

str_enum_impls!(
    AdStatus,
    [
        AdStatus::Draft,
        AdStatus::Generated,
        AdStatus::Regenerated,
        AdStatus::Evaluated,
        AdStatus::Published,
    ]
);

str_enum_impls!(
    AdType,
    [AdType::ProductGen, AdType::Regen, AdType::RegenImage, AdType::Evaluate]
);

str_enum_impls!(
    Platform,
    [
        Platform::GoogleAds,
        Platform::MetaAds,
        Platform::LinkedIn,
        Platform::Twitter,
        Platform::Instagram,
        Platform::TikTok,
    ]
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_strings() {
        for status in AdStatus::ALL {
            assert_eq!(status.as_str().parse::<AdStatus>().unwrap(), status);
        }
        assert_eq!("GENERATED".parse::<AdStatus>().unwrap(), AdStatus::Generated);
        assert!("archived".parse::<AdStatus>().is_err());
    }

    #[test]
    fn test_platform_names() {
        assert_eq!("linkedin".parse::<Platform>().unwrap(), Platform::LinkedIn);
        assert_eq!(
            serde_json::to_string(&Platform::TikTok).unwrap(),
            "\"tiktok\""
        );
        assert_eq!(AdType::RegenImage.to_string(), "regen_image");
    }

    #[test]
    fn test_platform_normalize_accepts_loose_names() {
        assert_eq!(Platform::normalize(" Google Ads "), Some(Platform::GoogleAds));
        assert_eq!(Platform::normalize("Facebook"), Some(Platform::MetaAds));
        assert_eq!(Platform::normalize("tik-tok"), None);
        assert_eq!(Platform::normalize("TikTok"), Some(Platform::TikTok));
        assert_eq!(Platform::normalize("myspace"), None);
    }
}
