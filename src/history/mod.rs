use crate::config::persona::{ render, PersonaConfig, PersonaVars };
use crate::models::chat::Turn;

#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Drop line breaks from history texts before they are sent.
    pub strip_newlines: bool,
    /// Value for the `{today}` placeholder. Supplied by the caller so that
    /// composing stays a pure function of its inputs.
    pub today: String,
}

pub fn normalize_text(text: &str, options: &ComposeOptions) -> String {
    if options.strip_newlines {
        text.chars().filter(|c| *c != '\n' && *c != '\r').collect()
    } else {
        text.to_string()
    }
}

fn preamble(
    persona: &PersonaConfig,
    birth_datetime: &str,
    display_name: Option<&str>,
    options: &ComposeOptions
) -> Vec<Turn> {
    let display_name = display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&persona.anonymous_name);
    let vars = PersonaVars {
        display_name,
        birth_datetime,
        today: &options.today,
    };

    let mut turns = Vec::with_capacity(persona.preamble_len());
    turns.push(Turn::user(render(&persona.instructions, &vars)));
    turns.push(Turn::assistant(render(&persona.acknowledgment, &vars)));
    if persona.confirm_birth_datetime {
        turns.push(Turn::user(render(&persona.birth_datetime_statement, &vars)));
        turns.push(Turn::assistant(render(&persona.birth_datetime_confirmation, &vars)));
    }
    turns
}

/// Builds the persona preamble followed by the caller's history.
///
/// The two history slices are zipped by index: `user[i]` then `assistant[i]`
/// for every `i` until both run out. They are not required to be the same
/// length and are never modified.
pub fn compose(
    persona: &PersonaConfig,
    birth_datetime: &str,
    display_name: Option<&str>,
    prior_user_texts: &[String],
    prior_assistant_texts: &[String],
    options: &ComposeOptions
) -> Vec<Turn> {
    let mut turns = preamble(persona, birth_datetime, display_name, options);
    turns.reserve(prior_user_texts.len() + prior_assistant_texts.len());

    let rounds = prior_user_texts.len().max(prior_assistant_texts.len());
    for i in 0..rounds {
        if let Some(text) = prior_user_texts.get(i) {
            turns.push(Turn::user(normalize_text(text, options)));
        }
        if let Some(text) = prior_assistant_texts.get(i) {
            turns.push(Turn::assistant(normalize_text(text, options)));
        }
    }

    turns
}
