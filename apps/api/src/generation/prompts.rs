// Prompt templates for CV content generation.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::generation::{GeneratedField, GenerationContext};
use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::models::cv::Locale;

/// Generation prompt. Replace `{language}`, `{schema}`, `{grounding}`,
/// `{context}` and `{instructions}` before sending.
pub const GENERATE_PROMPT_TEMPLATE: &str = r#"Write CV content in {language} for the candidate described below.

Return a JSON object with exactly these keys:
{schema}

Field guidance:
- tagline: one line, at most 12 words, no trailing period.
- profile_summary: 3 to 5 sentences in first person without "I" at the start of every sentence.
- languages: spoken languages with a CEFR or plain-word level.
- certifications: one string per certification, name first.

{grounding}

CONTEXT:
{context}

{instructions}"#;

/// Regeneration prompt for a single field. Replace `{field}`, `{current}` and the
/// placeholders of `GENERATE_PROMPT_TEMPLATE`.
pub const REGENERATE_PROMPT_TEMPLATE: &str = r#"Rewrite the "{field}" of this CV. Its current value is:
{current}

Produce a noticeably different alternative that still fits the candidate.

"#;

pub fn language_name(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "English",
        Locale::De => "German",
    }
}

fn schema_line(field: GeneratedField) -> &'static str {
    match field {
        GeneratedField::Tagline => r#"  "tagline": "string""#,
        GeneratedField::ProfileSummary => r#"  "profile_summary": "string""#,
        GeneratedField::Languages => {
            r#"  "languages": [{"language": "string", "level": "string"}]"#
        }
        GeneratedField::Certifications => r#"  "certifications": ["string"]"#,
    }
}

fn schema(fields: &[GeneratedField]) -> String {
    let lines: Vec<&str> = fields.iter().map(|f| schema_line(*f)).collect();
    format!("{{\n{}\n}}", lines.join(",\n"))
}

fn render_context(context: &GenerationContext) -> String {
    let mut out = String::new();

    if !context.full_name.trim().is_empty() {
        out.push_str(&format!("Name: {}\n", context.full_name));
    }

    if !context.werbeflaechen.is_empty() {
        out.push_str("\nSelf-marketing questionnaire:\n");
        for (question, answer) in &context.werbeflaechen {
            out.push_str(&format!("- {question}: {answer}\n"));
        }
    }

    if !context.experience.is_empty() {
        out.push_str("\nExperience:\n");
        for entry in &context.experience {
            out.push_str(&format!("- {} at {}", entry.position, entry.company));
            if let Some(period) = &entry.period {
                out.push_str(&format!(" ({period})"));
            }
            out.push('\n');
            for highlight in &entry.highlights {
                out.push_str(&format!("  * {highlight}\n"));
            }
        }
    }

    for (label, values) in [
        ("Education", &context.education),
        ("Skills", &context.skills),
        ("Key competences", &context.competences),
    ] {
        if !values.is_empty() {
            out.push_str(&format!("\n{label}: {}\n", values.join("; ")));
        }
    }

    if !context.current.certifications.is_empty() {
        out.push_str(&format!(
            "\nCertifications listed so far: {}\n",
            context.current.certifications.join("; ")
        ));
    }

    out
}

fn fill(template: &str, context: &GenerationContext, fields: &[GeneratedField]) -> String {
    let instructions = context
        .instructions
        .as_deref()
        .map(|i| format!("ADDITIONAL INSTRUCTIONS FROM THE USER:\n{i}"))
        .unwrap_or_default();

    template
        .replace("{language}", language_name(context.locale))
        .replace("{schema}", &schema(fields))
        .replace("{grounding}", GROUNDING_INSTRUCTION)
        .replace("{context}", &render_context(context))
        .replace("{instructions}", &instructions)
}

pub fn build_generate_prompt(context: &GenerationContext, fields: &[GeneratedField]) -> String {
    fill(GENERATE_PROMPT_TEMPLATE, context, fields)
}

pub fn build_regenerate_prompt(context: &GenerationContext, field: GeneratedField) -> String {
    let current = match field {
        GeneratedField::Tagline => context.current.tagline.clone().unwrap_or_default(),
        GeneratedField::ProfileSummary => {
            context.current.profile_summary.clone().unwrap_or_default()
        }
        GeneratedField::Languages => serde_json::to_string(&context.current.languages)
            .unwrap_or_default(),
        GeneratedField::Certifications => {
            serde_json::to_string(&context.current.certifications).unwrap_or_default()
        }
    };
    let current = if current.trim().is_empty() {
        "(empty)".to_string()
    } else {
        current
    };

    let preface = REGENERATE_PROMPT_TEMPLATE
        .replace("{field}", field.key())
        .replace("{current}", &current);
    preface + &fill(GENERATE_PROMPT_TEMPLATE, context, &[field])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cv::CvContent;
    use std::collections::BTreeMap;

    fn context() -> GenerationContext {
        let mut werbeflaechen = BTreeMap::new();
        werbeflaechen.insert("What sets you apart?".to_string(), "Calm under pressure".to_string());
        GenerationContext {
            locale: Locale::De,
            full_name: "Alex Muster".to_string(),
            werbeflaechen,
            experience: Vec::new(),
            education: vec!["MSc, TU Berlin".to_string()],
            skills: vec!["Rust".to_string()],
            competences: Vec::new(),
            current: CvContent {
                tagline: Some("Backend engineer".to_string()),
                ..CvContent::default()
            },
            instructions: None,
        }
    }

    #[test]
    fn test_generate_prompt_lists_only_requested_keys() {
        let prompt = build_generate_prompt(&context(), &[GeneratedField::Tagline]);
        assert!(prompt.contains("\"tagline\": \"string\""));
        assert!(!prompt.contains("\"profile_summary\": \"string\""));
        assert!(prompt.contains("in German"));
        assert!(prompt.contains("What sets you apart?: Calm under pressure"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{instructions}"));
    }

    #[test]
    fn test_regenerate_prompt_includes_current_value() {
        let prompt = build_regenerate_prompt(&context(), GeneratedField::Tagline);
        assert!(prompt.starts_with("Rewrite the \"tagline\""));
        assert!(prompt.contains("Backend engineer"));

        let empty = build_regenerate_prompt(&context(), GeneratedField::ProfileSummary);
        assert!(empty.contains("(empty)"));
    }
}
