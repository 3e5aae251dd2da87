use async_trait::async_trait;
use triage_types::{ImageAnalysisResult, ImageData, ImageUploadConfig, Language};

/// Input for an image analysis
#[derive(Debug, Clone)]
pub struct ImageAnalysisRequest {
    /// Base64 encoded image bytes
    pub payload: String,
    pub media_type: String,
    pub image_category: String,
    pub context_prompt: Option<String>,
    pub language: Language,
}

impl ImageAnalysisRequest {
    pub fn new(image: &ImageData, upload: &ImageUploadConfig, language: Language) -> Self {
        Self {
            payload: image.payload.clone(),
            media_type: image.media_type.clone(),
            image_category: upload.image_category.clone(),
            context_prompt: upload.analysis_prompt.clone(),
            language,
        }
    }
}

/// External collaborator that turns an uploaded photo into findings
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, request: ImageAnalysisRequest) -> anyhow::Result<ImageAnalysisResult>;
}
