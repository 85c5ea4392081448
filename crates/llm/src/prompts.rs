//! Prompt templates for summarization and profile analysis

use chatprofile_common::{AppConfig, ProfileError, Result};
use std::path::Path;
use std::str::FromStr;

/// Summary instruction (English)
pub const SUMMARY_PROMPT_EN: &str = r#"You are an expert at summarizing conversations. Your task is to condense the provided text while keeping the elements most relevant to a personality and behavior analysis. Focus on preserving:
    1. Main topics discussed
    2. Language patterns and frequent expressions
    3. Emotional tone and general attitude
    4. Social interactions and conversation dynamics
    5. Recurring interests and concerns
    Provide a concise but informative summary that captures the essence of the conversations and is useful for a later personality analysis."#;

/// Analysis instruction (English)
pub const ANALYSIS_PROMPT_EN: &str = r#"You are an expert analyst of psychological profiles and human behavior. Based on the provided conversation summary, produce a detailed analysis of the person's profile, including:

    1. Dominant personality traits
    2. Interests and passions
    3. Communication patterns
    4. Social interaction style
    5. Possible motivations and values
    6. General emotional state
    7. Level of formality and education
    8. Use of humor and creativity
    9. Assertiveness and leadership
    10. Recurring concerns or topics

    Provide a detailed, well-grounded analysis, citing specific examples from the summary when possible. Conclude with a concise but complete psychological profile of the person.
    Produce this in markdown format."#;

/// Summary instruction (Spanish)
pub const SUMMARY_PROMPT_ES: &str = r#"Eres un experto en resumir conversaciones. Tu tarea es condensar el texto proporcionado, manteniendo los elementos más relevantes para un análisis de personalidad y comportamiento. Enfócate en preservar:
    1. Temas principales discutidos
    2. Patrones de lenguaje y expresiones frecuentes
    3. Tono emocional y actitud general
    4. Interacciones sociales y dinámicas de conversación
    5. Intereses y preocupaciones recurrentes
    Proporciona un resumen conciso pero informativo que capture la esencia de las conversaciones y sea útil para un análisis posterior de personalidad."#;

/// Analysis instruction (Spanish)
pub const ANALYSIS_PROMPT_ES: &str = r#"Eres un analista experto en perfiles psicológicos y comportamiento humano. Basándote en el resumen de conversaciones proporcionado, genera un análisis detallado del perfil de la persona, incluyendo:

    1. Rasgos de personalidad dominantes
    2. Intereses y pasiones
    3. Patrones de comunicación
    4. Estilo de interacción social
    5. Posibles motivaciones y valores
    6. Estado emocional general
    7. Nivel de formalidad y educación
    8. Uso del humor y creatividad
    9. Asertividad y liderazgo
    10. Preocupaciones o temas recurrentes

    Proporciona un análisis detallado y fundamentado, citando ejemplos específicos del resumen cuando sea posible. Concluye con un perfil psicológico conciso pero completo de la persona.
    Generar esto en formato markdown."#;

/// Language of the built-in instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptLanguage {
    #[default]
    English,
    Spanish,
}

impl FromStr for PromptLanguage {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "es" | "spanish" | "español" => Ok(Self::Spanish),
            other => Err(ProfileError::config(format!("Unsupported prompt language: {}", other))),
        }
    }
}

/// Instructions used by the two completion stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    /// System instruction for each chunk summary
    pub summary: String,

    /// System instruction for the final analysis
    pub analysis: String,
}

impl Prompts {
    /// Built-in instructions for a language
    pub fn builtin(language: PromptLanguage) -> Self {
        let (summary, analysis) = match language {
            PromptLanguage::English => (SUMMARY_PROMPT_EN, ANALYSIS_PROMPT_EN),
            PromptLanguage::Spanish => (SUMMARY_PROMPT_ES, ANALYSIS_PROMPT_ES),
        };

        Self {
            summary: summary.to_string(),
            analysis: analysis.to_string(),
        }
    }

    /// Built-in instructions, with per-stage overrides read from files
    pub fn load(
        language: PromptLanguage,
        summary_file: Option<&Path>,
        analysis_file: Option<&Path>,
    ) -> Result<Self> {
        let mut prompts = Self::builtin(language);

        if let Some(path) = summary_file {
            prompts.summary = read_prompt(path)?;
        }
        if let Some(path) = analysis_file {
            prompts.analysis = read_prompt(path)?;
        }

        Ok(prompts)
    }

    /// Instructions selected by the application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::load(
            config.prompt_language.parse()?,
            config.summary_prompt_file.as_deref(),
            config.analysis_prompt_file.as_deref(),
        )
    }
}

fn read_prompt(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ProfileError::config(format!("Failed to read prompt file {}: {}", path.display(), e))
    })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(ProfileError::config(format!("Prompt file {} is empty", path.display())));
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_language_parsing() {
        assert_eq!("en".parse::<PromptLanguage>().unwrap(), PromptLanguage::English);
        assert_eq!("ES".parse::<PromptLanguage>().unwrap(), PromptLanguage::Spanish);
        assert!("fr".parse::<PromptLanguage>().is_err());
    }

    #[test]
    fn test_builtin_prompts() {
        let en = Prompts::builtin(PromptLanguage::English);
        assert!(en.summary.contains("summarizing conversations"));
        assert!(en.analysis.contains("markdown"));

        let es = Prompts::builtin(PromptLanguage::Spanish);
        assert!(es.analysis.starts_with("Eres un analista"));
    }

    #[test]
    fn test_prompt_file_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  Summarize tersely.  ").unwrap();

        let prompts = Prompts::load(PromptLanguage::English, Some(file.path()), None).unwrap();
        assert_eq!(prompts.summary, "Summarize tersely.");
        assert_eq!(prompts.analysis, ANALYSIS_PROMPT_EN);
    }

    #[test]
    fn test_empty_prompt_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = Prompts::load(PromptLanguage::English, None, Some(file.path()));
        assert!(matches!(result, Err(ProfileError::Config(_))));
    }

    #[test]
    fn test_from_config() {
        let mut config = AppConfig::default();
        config.prompt_language = "es".to_string();
        let prompts = Prompts::from_config(&config).unwrap();
        assert_eq!(prompts.summary, SUMMARY_PROMPT_ES);
    }
}
