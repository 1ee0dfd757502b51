//! Prompt templates for JSON resume extraction

const FULL_TEMPLATE: &str = r#"Extract the candidate's details from the resume below and reply with a single JSON object and nothing else.

Use exactly these keys:
{
  "full_name": string or null,
  "email": string or null,
  "phone_number": string or null,
  "work_experience": [
    {
      "company_name": string or null,
      "customer_name": string or null,
      "role": string or null,
      "duration": string or null,
      "skills_technologies": [string],
      "industry": string or null,
      "location": string or null
    }
  ]
}

Rules:
- Use null for any value that is not stated in the resume.
- Use [] when there is no work experience or no listed technologies.
- Leave out any experience entry you cannot read with confidence.
- Do not wrap the JSON in markdown and do not add commentary.

<RESUME>
{resume}
</RESUME>"#;

const HEAD_TEMPLATE: &str = r#"The text below is the top of a resume. Reply with a single JSON object and nothing else.

Use exactly these keys:
{
  "full_name": string or null,
  "email": string or null,
  "phone_number": string or null
}

Use null for any value that is not stated. Do not add commentary.

<RESUME_HEAD>
{resume}
</RESUME_HEAD>"#;

const CHUNK_TEMPLATE: &str = r#"The text below is part of the work history section of a resume. Reply with a single JSON object and nothing else.

Use exactly this shape:
{
  "work_experience": [
    {
      "company_name": string or null,
      "customer_name": string or null,
      "role": string or null,
      "duration": string or null,
      "skills_technologies": [string],
      "industry": string or null,
      "location": string or null
    }
  ]
}

Use null for unknown values and [] for missing lists. Leave out entries you cannot read with confidence.

<EXPERIENCE>
{resume}
</EXPERIENCE>"#;

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub full: String,
    pub head: String,
    pub chunk: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            full: FULL_TEMPLATE.to_string(),
            head: HEAD_TEMPLATE.to_string(),
            chunk: CHUNK_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Whole-document prompt: identity plus work history
    pub fn render_full(&self, resume: &str) -> String {
        self.full.replace("{resume}", resume.trim())
    }

    /// Identity-only prompt for the chunked fallback
    pub fn render_head(&self, head: &str) -> String {
        self.head.replace("{resume}", head.trim())
    }

    /// Work-history-only prompt for one batch of experience text
    pub fn render_chunk(&self, chunk: &str) -> String {
        self.chunk.replace("{resume}", chunk.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_embed_text() {
        let templates = PromptTemplates::default();

        let full = templates.render_full("  Jane Doe\nAcme  ");
        assert!(full.contains("<RESUME>\nJane Doe\nAcme\n</RESUME>"));
        assert!(full.contains("\"work_experience\""));

        let head = templates.render_head("Jane Doe");
        assert!(head.contains("\"phone_number\""));
        assert!(!head.contains("work_experience"));

        let chunk = templates.render_chunk("Client: Acme");
        assert!(chunk.contains("Client: Acme"));
        assert!(!chunk.contains("full_name"));
    }
}
