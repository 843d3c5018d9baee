//! Locating the generated image inside a chat-messages reply.
//!
//! The upstream app may answer with a file attachment, markdown, raw HTML,
//! a bare link, an inline data URI, or only ids we can build a link from.
//! Each shape is one strategy; they run in order and the first hit wins.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

type Strategy = fn(&Value, &str) -> Option<String>;

/// Strategies in priority order. The name is only used for logging.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("files", from_files),
    ("markdown", from_markdown),
    ("html_img", from_html_img),
    ("bare_url", from_bare_url),
    ("data_uri", from_data_uri),
    ("metadata", from_metadata),
    ("top_level", from_top_level),
    ("constructed", from_conversation_file),
];

const FILE_URL_KEYS: &[&str] = &[
    "url",
    "remote_url",
    "download_url",
    "file_url",
    "path",
    "src",
    "href",
];

const METADATA_KEYS: &[&str] = &["image_url", "url", "image", "file_url", "download_url"];

const TOP_LEVEL_KEYS: &[&str] = &[
    "image_url",
    "image",
    "url",
    "file_url",
    "media_url",
    "download_url",
];

const IMAGE_INDICATORS: &[&str] = &[
    ".jpg",
    ".jpeg",
    ".png",
    ".gif",
    ".webp",
    ".svg",
    ".bmp",
    "cloud.dify.ai",
    "storage",
    "cdn",
    "amazonaws",
    "cloudinary",
    "imgix",
    "cloudfront",
    "imgur",
    "image",
    "media",
    "assets",
    "dify",
    "file",
    "download",
];

/// Runs every strategy against `response` and returns the first match
/// together with the name of the strategy that produced it.
#[must_use]
pub fn extract_image_url(response: &Value, base_url: &str) -> Option<(&'static str, String)> {
    STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(response, base_url).map(|url| (*name, url)))
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

fn answer(response: &Value) -> &str {
    response
        .get("answer")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn files(response: &Value) -> &[Value] {
    response
        .get("files")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn http_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
        .map(str::to_string)
}

fn first_http_field(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| http_string(object.get(*key)))
}

fn from_files(response: &Value, _base_url: &str) -> Option<String> {
    files(response)
        .iter()
        .find_map(|file| first_http_field(file, FILE_URL_KEYS))
}

fn from_markdown(response: &Value, _base_url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"!\[[^\]]*\]\((https?://[^)\s]+)");

    re.captures(answer(response))
        .map(|caps| caps[1].trim().to_string())
}

fn from_html_img(response: &Value, _base_url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r#"<img[^>]+src=["']([^"']+)["']"#);

    re.captures(answer(response))
        .map(|caps| caps[1].trim().to_string())
}

fn from_bare_url(response: &Value, _base_url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r#"https?://[^\s<>"{}|\\^`\[\]'()]+"#);

    re.find_iter(answer(response))
        .map(|m| m.as_str().trim())
        .find(|url| {
            let lower = url.to_ascii_lowercase();
            IMAGE_INDICATORS.iter().any(|ind| lower.contains(ind))
        })
        .map(str::to_string)
}

fn from_data_uri(response: &Value, _base_url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"data:image/[^;\s]+;base64,[A-Za-z0-9+/=]+");

    re.find(answer(response)).map(|m| m.as_str().to_string())
}

fn from_metadata(response: &Value, _base_url: &str) -> Option<String> {
    response
        .get("metadata")
        .filter(|m| m.is_object())
        .and_then(|m| first_http_field(m, METADATA_KEYS))
}

fn from_top_level(response: &Value, _base_url: &str) -> Option<String> {
    first_http_field(response, TOP_LEVEL_KEYS)
}

fn from_conversation_file(response: &Value, base_url: &str) -> Option<String> {
    let conversation_id = response.get("conversation_id").and_then(Value::as_str)?;

    let file_id = files(response).iter().find_map(|file| {
        file.get("id")
            .or_else(|| file.get("file_id"))
            .and_then(Value::as_str)
    })?;

    let root = base_url.trim_end_matches('/');
    let root = root.strip_suffix("/v1").unwrap_or(root);
    Some(format!(
        "{root}/files/conversations/{conversation_id}/files/{file_id}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://api.dify.ai/v1";

    #[test]
    fn test_files_win_over_answer() {
        let response = json!({
            "answer": "![img](https://cdn.example.com/from-answer.png)",
            "files": [{"type": "image", "remote_url": "https://files.example.com/a.png"}],
        });

        let (strategy, url) = extract_image_url(&response, BASE).unwrap();
        assert_eq!(strategy, "files");
        assert_eq!(url, "https://files.example.com/a.png");
    }

    #[test]
    fn test_markdown_before_bare_url() {
        let response = json!({
            "answer": "See https://cdn.example.com/other.jpg or ![ad](https://img.example.com/ad.png)",
        });

        let (strategy, url) = extract_image_url(&response, BASE).unwrap();
        assert_eq!(strategy, "markdown");
        assert_eq!(url, "https://img.example.com/ad.png");
    }

    #[test]
    fn test_html_img_tag() {
        let response = json!({"answer": r#"<p><img alt="x" src="https://x.test/pic.webp"></p>"#});

        assert_eq!(
            extract_image_url(&response, BASE),
            Some(("html_img", "https://x.test/pic.webp".to_string()))
        );
    }

    #[test]
    fn test_bare_url_requires_indicator() {
        let response = json!({"answer": "Visit https://example.com/about for details"});
        assert_eq!(extract_image_url(&response, BASE), None);

        let response = json!({"answer": "Here: https://example.com/render.PNG done"});
        assert_eq!(
            extract_image_url(&response, BASE),
            Some(("bare_url", "https://example.com/render.PNG".to_string()))
        );
    }

    #[test]
    fn test_data_uri() {
        let response = json!({"answer": "inline data:image/png;base64,iVBORw0KGgo= end"});

        assert_eq!(
            extract_image_url(&response, BASE),
            Some(("data_uri", "data:image/png;base64,iVBORw0KGgo=".to_string()))
        );
    }

    #[test]
    fn test_metadata_then_top_level() {
        let response = json!({
            "answer": "no links here",
            "metadata": {"image": "https://meta.test/i"},
            "image_url": "https://top.test/i",
        });
        assert_eq!(
            extract_image_url(&response, BASE),
            Some(("metadata", "https://meta.test/i".to_string()))
        );

        let response = json!({"answer": "", "media_url": "https://top.test/m"});
        assert_eq!(
            extract_image_url(&response, BASE),
            Some(("top_level", "https://top.test/m".to_string()))
        );
    }

    #[test]
    fn test_constructed_conversation_url() {
        let response = json!({
            "answer": "done",
            "conversation_id": "conv-1",
            "files": [{"file_id": "f-9", "type": "image"}],
        });

        assert_eq!(
            extract_image_url(&response, BASE),
            Some((
                "constructed",
                "https://api.dify.ai/files/conversations/conv-1/files/f-9".to_string()
            ))
        );
    }

    #[test]
    fn test_strategy_order_is_stable() {
        let names: Vec<_> = STRATEGIES.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            [
                "files",
                "markdown",
                "html_img",
                "bare_url",
                "data_uri",
                "metadata",
                "top_level",
                "constructed"
            ]
        );
    }
}
