//! Prompt templates for the document parser and the field-extraction model.

use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;

pub const FIELD_EXTRACTION_FILE: &str = "field_extraction.txt";
pub const PARSING_INSTRUCTION_FILE: &str = "parsing_instruction.txt";

/// Placeholder in the field-extraction template replaced by the report text.
pub const EXTRACTED_TEXT_PLACEHOLDER: &str = "{extracted_text}";

const EMBEDDED_FIELD_EXTRACTION: &str = include_str!("../../../prompts/field_extraction.txt");
const EMBEDDED_PARSING_INSTRUCTION: &str = include_str!("../../../prompts/parsing_instruction.txt");

/// Loaded prompt templates. Read once at startup.
#[derive(Debug, Clone)]
pub struct Prompts {
    pub field_extraction: String,
    pub parsing_instruction: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            field_extraction: EMBEDDED_FIELD_EXTRACTION.to_string(),
            parsing_instruction: EMBEDDED_PARSING_INSTRUCTION.to_string(),
        }
    }
}

impl Prompts {
    /// Load templates from `dir`, using the embedded copy for any missing file.
    pub fn load(dir: &Path) -> Result<Self> {
        let defaults = Self::default();
        let field_extraction = read_or(dir, FIELD_EXTRACTION_FILE, defaults.field_extraction)?;
        let parsing_instruction =
            read_or(dir, PARSING_INSTRUCTION_FILE, defaults.parsing_instruction)?;
        Ok(Self {
            field_extraction,
            parsing_instruction,
        })
    }

    /// Substitute the report text into the field-extraction template.
    pub fn render_field_extraction(&self, extracted_text: &str) -> String {
        self.field_extraction
            .replace(EXTRACTED_TEXT_PLACEHOLDER, extracted_text)
    }
}

fn read_or(dir: &Path, name: &str, fallback: String) -> Result<String> {
    let path = dir.join(name);
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            info!("Loaded prompt template {}", path.display());
            Ok(content)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} not found, using embedded template", path.display());
            Ok(fallback)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_template_has_placeholder() {
        let prompts = Prompts::default();
        assert!(prompts.field_extraction.contains(EXTRACTED_TEXT_PLACEHOLDER));
        assert!(!prompts.parsing_instruction.is_empty());
    }

    #[test]
    fn test_render_substitutes_text() {
        let prompts = Prompts {
            field_extraction: "Report:\n{extracted_text}\nJSON: {\"lab_results\": []}".into(),
            parsing_instruction: String::new(),
        };
        let rendered = prompts.render_field_extraction("Hemoglobin: 14.2");
        assert_eq!(rendered, "Report:\nHemoglobin: 14.2\nJSON: {\"lab_results\": []}");
    }

    #[test]
    fn test_load_overrides_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PARSING_INSTRUCTION_FILE), "custom instruction").unwrap();

        let prompts = Prompts::load(dir.path()).unwrap();
        assert_eq!(prompts.parsing_instruction, "custom instruction");
        assert_eq!(prompts.field_extraction, EMBEDDED_FIELD_EXTRACTION);
    }
}
