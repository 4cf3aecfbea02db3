use serde::Deserialize;
use std::fs;
use std::sync::Arc;
use thiserror::Error;
use log::info;

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Persona file IO error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Persona JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Persona template '{0}' is empty")]
    EmptyTemplate(&'static str),
}

fn default_anonymous_name() -> String {
    "friend".to_string()
}

fn default_confirm() -> bool {
    true
}

/// Persona text, versioned as data next to the binary.
///
/// Templates may reference `{display_name}`, `{birth_datetime}` and `{today}`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PersonaConfig {
    #[serde(default)]
    pub version: Option<String>,
    /// Sent as a provider-level system instruction when present.
    #[serde(default)]
    pub system: Option<String>,
    pub instructions: String,
    pub acknowledgment: String,
    #[serde(default = "default_confirm")]
    pub confirm_birth_datetime: bool,
    #[serde(default)]
    pub birth_datetime_statement: String,
    #[serde(default)]
    pub birth_datetime_confirmation: String,
    #[serde(default = "default_anonymous_name")]
    pub anonymous_name: String,
}

impl PersonaConfig {
    pub fn preamble_len(&self) -> usize {
        if self.confirm_birth_datetime { 4 } else { 2 }
    }

    fn validate(&self) -> Result<(), PersonaError> {
        if self.instructions.trim().is_empty() {
            return Err(PersonaError::EmptyTemplate("instructions"));
        }
        if self.acknowledgment.trim().is_empty() {
            return Err(PersonaError::EmptyTemplate("acknowledgment"));
        }
        if self.confirm_birth_datetime {
            if self.birth_datetime_statement.trim().is_empty() {
                return Err(PersonaError::EmptyTemplate("birth_datetime_statement"));
            }
            if self.birth_datetime_confirmation.trim().is_empty() {
                return Err(PersonaError::EmptyTemplate("birth_datetime_confirmation"));
            }
        }
        Ok(())
    }
}

pub struct PersonaVars<'a> {
    pub display_name: &'a str,
    pub birth_datetime: &'a str,
    pub today: &'a str,
}

pub fn render(template: &str, vars: &PersonaVars<'_>) -> String {
    template
        .replace("{display_name}", vars.display_name)
        .replace("{birth_datetime}", vars.birth_datetime)
        .replace("{today}", vars.today)
}

pub fn parse_persona(json: &str, path: &str) -> Result<PersonaConfig, PersonaError> {
    let config: PersonaConfig = serde_json::from_str(json).map_err(|source| PersonaError::Json {
        path: path.to_string(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn load_persona(path: &str) -> Result<Arc<PersonaConfig>, PersonaError> {
    let file_content = fs::read_to_string(path).map_err(|source| PersonaError::Io {
        path: path.to_string(),
        source,
    })?;
    let config = parse_persona(&file_content, path)?;
    info!(
        "Loaded persona from '{}' (version {})",
        path,
        config.version.as_deref().unwrap_or("unversioned")
    );
    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_every_placeholder() {
        let vars = PersonaVars {
            display_name: "Mina",
            birth_datetime: "1990-01-01 08:00",
            today: "2024-03-01",
        };
        let out = render("{display_name} born {birth_datetime}, today {today}, again {display_name}", &vars);
        assert_eq!(out, "Mina born 1990-01-01 08:00, today 2024-03-01, again Mina");
    }

    #[test]
    fn parse_applies_defaults() {
        let persona = parse_persona(
            r#"{
                "instructions": "You are an astrologer.",
                "acknowledgment": "Hello!",
                "birth_datetime_statement": "I was born {birth_datetime}.",
                "birth_datetime_confirmation": "Noted: {birth_datetime}."
            }"#,
            "inline"
        ).unwrap();
        assert!(persona.confirm_birth_datetime);
        assert_eq!(persona.anonymous_name, "friend");
        assert_eq!(persona.preamble_len(), 4);
        assert!(persona.system.is_none());
    }

    #[test]
    fn confirmation_templates_required_when_enabled() {
        let err = parse_persona(
            r#"{ "instructions": "x", "acknowledgment": "y" }"#,
            "inline"
        ).unwrap_err();
        assert!(matches!(err, PersonaError::EmptyTemplate("birth_datetime_statement")));
    }

    #[test]
    fn confirmation_pair_can_be_disabled() {
        let persona = parse_persona(
            r#"{ "instructions": "x", "acknowledgment": "y", "confirm_birth_datetime": false }"#,
            "inline"
        ).unwrap();
        assert_eq!(persona.preamble_len(), 2);
    }

    #[test]
    fn malformed_json_reports_path() {
        let err = parse_persona("{", "json/broken.json").unwrap_err();
        assert!(err.to_string().contains("json/broken.json"));
    }

    #[test]
    fn bundled_persona_file_parses() {
        let persona = load_persona(concat!(env!("CARGO_MANIFEST_DIR"), "/json/persona.json")).unwrap();
        assert_eq!(persona.preamble_len(), 4);
    }
}
