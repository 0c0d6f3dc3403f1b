use std::collections::HashMap;

use serde::Deserialize;

const KEYRING_SERVER: &str = "anthropic-api";

/// Label used when categorization fails or produces nothing usable.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Best-fit placement for a captured item, as suggested by the AI model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Categorization {
    pub list: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
}

/// Call the Anthropic Messages API to fix spelling and grammar in captured
/// text without changing its meaning.
pub async fn correct_text(api_key: &str, text: &str) -> Result<String, String> {
    let system_prompt = "You correct spelling and grammar in short task titles and notes. \
         Return ONLY the corrected text, no quotes, no explanation. \
         Keep the wording and meaning unchanged; fix mistakes only. \
         If the text is already correct, return it verbatim.";

    // Cap input to stay well within the token budget
    let user_msg: String = text.chars().take(2000).collect();

    let body = serde_json::json!({
        "model": "claude-haiku-4-5-20251001",
        "max_tokens": 300,
        "system": system_prompt,
        "messages": [
            { "role": "user", "content": user_msg }
        ]
    });

    let text_out = send_message(api_key, &body).await?;
    let corrected = text_out.trim();
    if corrected.is_empty() {
        return Err("Empty correction response".to_string());
    }
    Ok(corrected.to_string())
}

/// Graceful wrapper: on any failure the original text comes back unchanged.
pub async fn correct_text_or_original(api_key: &str, text: &str) -> String {
    match correct_text(api_key, text).await {
        Ok(corrected) => corrected,
        Err(e) => {
            log::warn!("Text correction failed, keeping original: {}", e);
            text.to_string()
        }
    }
}

/// Ask the model for a best-fit list, category and priority for an item.
pub async fn categorize(
    api_key: &str,
    title: &str,
    list_names: &[String],
    category_names: &[String],
) -> Result<Categorization, String> {
    let system_prompt = build_categorize_prompt(list_names, category_names);

    let body = serde_json::json!({
        "model": "claude-haiku-4-5-20251001",
        "max_tokens": 200,
        "system": system_prompt,
        "messages": [
            { "role": "user", "content": title.chars().take(500).collect::<String>() }
        ]
    });

    let text = send_message(api_key, &body).await?;

    // Strip markdown code fences if present
    let json_str = text
        .trim()
        .strip_prefix("```json")
        .or_else(|| text.trim().strip_prefix("```"))
        .unwrap_or(text.trim());
    let json_str = json_str.strip_suffix("```").unwrap_or(json_str).trim();

    serde_json::from_str::<Categorization>(json_str)
        .map_err(|e| format!("Failed to parse categorization: {} — raw: {}", e, text))
}

/// Graceful wrapper: failures and malformed responses degrade to
/// `Uncategorized` with no list or priority suggestion.
pub async fn categorize_or_default(
    api_key: &str,
    title: &str,
    list_names: &[String],
    category_names: &[String],
) -> Categorization {
    match categorize(api_key, title, list_names, category_names).await {
        Ok(result) => result,
        Err(e) => {
            log::warn!("Categorization failed, using fallback: {}", e);
            Categorization {
                list: None,
                category: Some(UNCATEGORIZED.to_string()),
                priority: None,
            }
        }
    }
}

fn build_categorize_prompt(list_names: &[String], category_names: &[String]) -> String {
    let mut prompt = String::from(
        "You place personal tasks and reminders. Return ONLY a JSON object, no explanation.\n\n\
         Fields:\n\
         - \"list\": the best-fit list from the allowed list names, or null\n\
         - \"category\": a short free-text category for the item, or null\n\
         - \"priority\": \"now\" (urgent), \"high\" (important), \"low\", or null\n\n",
    );

    if !list_names.is_empty() {
        prompt.push_str("Available lists (pick from these only): ");
        prompt.push_str(&list_names.join(", "));
        prompt.push_str("\n\n");
    }

    if !category_names.is_empty() {
        // Limit to the most recent 50 categories to avoid huge prompts
        let names: Vec<&str> = category_names.iter().take(50).map(|s| s.as_str()).collect();
        prompt.push_str("Categories already in use (prefer reusing one): ");
        prompt.push_str(&names.join(", "));
        prompt.push_str("\n\n");
    }

    prompt
}

/// POST a Messages API request and pull the first content block's text.
async fn send_message(api_key: &str, body: &serde_json::Value) -> Result<String, String> {
    let client = reqwest::Client::new();
    let resp = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| format!("API request failed: {}", e))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(format!("API error {}: {}", status, text));
    }

    let api_resp: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| format!("Failed to parse API response: {}", e))?;

    api_resp["content"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|block| block["text"].as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| "No text in API response".to_string())
}

/// Verify the API key with a minimal request.
pub async fn test_api_key(api_key: &str) -> Result<String, String> {
    let body = serde_json::json!({
        "model": "claude-haiku-4-5-20251001",
        "max_tokens": 4,
        "messages": [
            { "role": "user", "content": "Reply with OK" }
        ]
    });

    let client = reqwest::Client::new();
    let resp = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;

    if resp.status().is_success() {
        Ok("API key valid".to_string())
    } else if resp.status().as_u16() == 401 {
        Err("Invalid API key".to_string())
    } else {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        Err(format!("API error {}: {}", status, text))
    }
}

/// Store the Anthropic API key in the system keyring.
pub async fn store_api_key(key: &str) -> Result<(), String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    let mut attrs = HashMap::new();
    attrs.insert("service", super::keyring::SERVICE_NAME);
    attrs.insert("server", KEYRING_SERVER);

    keyring
        .create_item(
            "Minder Anthropic API Key",
            &attrs,
            key.as_bytes(),
            true,
        )
        .await
        .map_err(|e| format!("Failed to store API key: {}", e))?;

    Ok(())
}

/// Load the Anthropic API key from the system keyring.
pub async fn load_api_key() -> Result<Option<String>, String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    let mut attrs = HashMap::new();
    attrs.insert("service", super::keyring::SERVICE_NAME);
    attrs.insert("server", KEYRING_SERVER);

    let items = keyring
        .search_items(&attrs)
        .await
        .map_err(|e| format!("Failed to search keyring: {}", e))?;

    if let Some(item) = items.first() {
        let secret_bytes = item
            .secret()
            .await
            .map_err(|e| format!("Failed to read secret: {}", e))?;
        let key = String::from_utf8(secret_bytes.to_vec())
            .map_err(|e| format!("Invalid UTF-8 in secret: {}", e))?;
        if !key.is_empty() {
            return Ok(Some(key));
        }
    }

    Ok(None)
}
