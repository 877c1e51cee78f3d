//! Prompts sent to the describe model.

use scaffold_core::defaults::MAX_TAGS;
use scaffold_core::Asset;

/// Prompt for an image asset.
pub fn image_prompt() -> String {
    format!(
        "You are to analyze the content of this image and generate a short and concise json \
         object like the following with no more than {MAX_TAGS} tags \
         {{\"title\": \"bowl of penne\", \"tags\": [\"red\", \"bowl\", \"penne\", \"pasta\", \"food\"]}}. \
         Don't include any other text."
    )
}

/// Prompt for a web page asset, with the page details appended as JSON.
pub fn page_prompt(url: &str, title: Option<&str>, description: Option<&str>) -> String {
    let details = serde_json::json!({
        "url": url,
        "title": title,
        "description": description,
    });
    format!(
        "You are to analyze the content of this web page and generate a short and concise json \
         object like the following with no more than {MAX_TAGS} tags \
         {{\"title\": \"a blog post on typescript's powers with bun\", \"tags\": [\"ts\", \"bun\", \"typescript\", \"blog\", \"kieran\"]}}. \
         Don't include any other text.\n\n{details}"
    )
}

/// Prompt for any asset.
pub fn prompt_for(asset: &Asset) -> String {
    match asset {
        Asset::Image { .. } => image_prompt(),
        Asset::Page {
            url,
            title,
            description,
        } => page_prompt(url, title.as_deref(), description.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_prompt_caps_tags() {
        let prompt = image_prompt();
        assert!(prompt.contains("no more than 5 tags"));
        assert!(prompt.contains("\"title\": \"bowl of penne\""));
    }

    #[test]
    fn test_page_prompt_embeds_details() {
        let prompt = page_prompt("https://bun.sh", Some("Bun"), None);
        assert!(prompt.contains("web page"));
        assert!(prompt.contains("\"url\":\"https://bun.sh\""));
        assert!(prompt.contains("\"title\":\"Bun\""));
    }
}
