use serde::{Deserialize, Serialize};

/// Persona for the identification call. The model is asked for JSON so the
/// reply can be normalized into an `AnalysisResult`.
const DEVELOPER_INSTRUCTION: &str = "You are a helpful assistant meant to identify the species of aquatic animal in the image. Return your response in valid JSON format with the following structure: { 'species': string, 'facts': string[] }. The species field should contain the identified species name, and the facts field should contain an array of interesting facts about the animal.";

const USER_PROMPT: &str = "What's in this image?";

#[derive(Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
pub struct ImageUrl {
    pub url: String,
    pub detail: &'static str,
}

#[derive(Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

/// Builds the one outbound identification request: the fixed developer
/// instruction plus a user turn carrying the prompt and the image as a
/// low-detail inline data URI.
pub fn identify_request(
    model: &str,
    base64_image: &str,
    max_tokens: u32,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage {
                role: "developer",
                content: vec![ContentPart::Text {
                    text: DEVELOPER_INSTRUCTION.to_string(),
                }],
            },
            ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: USER_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/jpeg;base64,{}", base64_image),
                            detail: "low",
                        },
                    },
                ],
            },
        ],
        max_tokens,
    }
}
