//! Prompt templates for the gate, critique and presence calls.

/// Reply the model may give in passive mode when nothing is worth saying.
pub const SENTINEL: &str = "<no response necessary>";

/// Sent when a presence reply comes back empty.
pub const PRESENCE_FALLBACK: &str = "I'm here. Try saying something accurate for once.";

/// Display form of the bot name used inside prompts ("snoid" -> "Snoid").
pub fn persona_name(bot_name: &str) -> String {
    let mut chars = bot_name.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Yes/no question for the cheap model.
pub fn gate_prompt(transcript: &str) -> String {
    format!(
        "You are a fact-checking assistant. Below is a chat transcript. \
         Judge ONLY the final line; earlier lines are context. \
         Reply with exactly 'yes' if the final line contains a factual inaccuracy \
         and exactly 'no' otherwise.\n\nTranscript:\n{transcript}"
    )
}

/// Critique request for the expensive model.
///
/// With `force_response` the sentinel is forbidden and the model must answer.
pub fn critique_prompt(persona: &str, transcript: &str, force_response: bool) -> String {
    let escape = if force_response {
        format!(
            "You were addressed directly, so you must reply. \
             Never answer with \"{SENTINEL}\"."
        )
    } else {
        format!(
            "If the final line has nothing worth correcting, reply with exactly \
             \"{SENTINEL}\" and nothing else."
        )
    };
    format!(
        "You are {persona}, a terse and critical fact checker. \
         Point out factual inaccuracies in the final line of the transcript below; \
         earlier lines are context only. Respond in at most two sentences, \
         and be extremely terse and critical. {escape}\n\nTranscript:\n{transcript}"
    )
}

/// In-character acknowledgement of a greeting.
pub fn presence_prompt(persona: &str, transcript: &str) -> String {
    format!(
        "You are {persona}, a terse and critical fact checker. \
         Someone in the chat just greeted you by name. \
         Acknowledge them in one short, in-character sentence.\n\nTranscript:\n{transcript}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_is_capitalized() {
        assert_eq!(persona_name("snoid"), "Snoid");
        assert_eq!(persona_name("  élan "), "Élan");
        assert_eq!(persona_name(""), "");
    }

    #[test]
    fn gate_prompt_ends_with_transcript() {
        let prompt = gate_prompt("alice: 2+2=5");
        assert!(prompt.contains("'yes'"));
        assert!(prompt.ends_with("Transcript:\nalice: 2+2=5"));
    }

    #[test]
    fn forced_critique_forbids_sentinel() {
        let forced = critique_prompt("Snoid", "bob: hi", true);
        assert!(forced.contains("must reply"));
        assert!(forced.contains("Never answer"));

        let optional = critique_prompt("Snoid", "bob: hi", false);
        assert!(optional.contains(&format!("\"{SENTINEL}\" and nothing else")));
        assert!(!optional.contains("Never answer"));
    }

    #[test]
    fn presence_prompt_names_persona() {
        let prompt = presence_prompt("Snoid", "bob: hey snoid");
        assert!(prompt.starts_with("You are Snoid"));
        assert!(prompt.ends_with("bob: hey snoid"));
    }
}
