use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct UploadPaste {
    pub uri: String,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
