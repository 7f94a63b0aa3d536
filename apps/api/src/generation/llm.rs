use async_trait::async_trait;
use tracing::info;

use crate::generation::prompts::{build_generate_prompt, build_regenerate_prompt};
use crate::generation::{ContentGenerator, GeneratedContent, GeneratedField, GenerationContext};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, LlmError};

/// `ContentGenerator` backed by the Anthropic Messages API.
#[derive(Clone)]
pub struct LlmContentGenerator {
    llm: LlmClient,
}

impl LlmContentGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate(
        &self,
        context: &GenerationContext,
        fields: &[GeneratedField],
    ) -> Result<GeneratedContent, LlmError> {
        let prompt = build_generate_prompt(context, fields);
        let content: GeneratedContent = self.llm.call_json(&prompt, JSON_ONLY_SYSTEM).await?;
        let content = content.retain(fields);

        info!(
            requested = fields.len(),
            empty = content.is_empty(),
            "CV content generated"
        );
        Ok(content)
    }

    async fn regenerate(
        &self,
        context: &GenerationContext,
        field: GeneratedField,
    ) -> Result<GeneratedContent, LlmError> {
        let prompt = build_regenerate_prompt(context, field);
        let content: GeneratedContent = self.llm.call_json(&prompt, JSON_ONLY_SYSTEM).await?;

        info!(field = field.key(), "CV field regenerated");
        Ok(content.retain(&[field]))
    }
}
