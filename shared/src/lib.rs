use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
pub struct AnalyzeRequest {
    #[serde(rename = "base64Image", default)]
    pub base64_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnalysisResult {
    pub species: String,
    pub facts: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// One identified fish sighting. Created on save, removed on delete,
/// never mutated in place.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CatchRecord {
    pub id: String,
    pub image: String,
    pub species: String,
    pub facts: Vec<String>,
    pub location: Location,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewCatch {
    pub image: String,
    pub species: String,
    pub facts: Vec<String>,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct HealthStatus {
    pub status: String,
    #[serde(rename = "openaiKeySet")]
    pub openai_key_set: bool,
    pub timestamp: String,
}
