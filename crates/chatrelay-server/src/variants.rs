//! Endpoint variant table.
//!
//! The chat endpoints differ only in template text, sampling settings,
//! provider-fixedness, and document augmentation. One parameterized relay
//! handler serves all of them, configured from this table.

use chatrelay_chat::{GenerationSettings, ProviderKind};
use chatrelay_core::Result;

/// Configuration of one chat endpoint variant.
pub struct ChatVariant {
    /// Route segment under `/api/chat/`.
    pub name: &'static str,
    /// Prompt template with `{name}` placeholders.
    pub template: &'static str,
    pub temperature: f64,
    pub openai_model: &'static str,
    pub gemini_model: &'static str,
    /// When set, the variant ignores the `modelType` selector entirely.
    pub fixed_provider: Option<ProviderKind>,
    /// Whether the prompt is augmented with an uploaded document.
    pub uses_document: bool,
}

/// Bare pass-through of the current message.
pub const BASIC: ChatVariant = ChatVariant {
    name: "basic",
    template: "{message}",
    temperature: 0.8,
    openai_model: "gpt-3.5-turbo",
    gemini_model: "gemini-1.5-flash",
    fixed_provider: None,
    uses_document: false,
};

/// Conversation with history; the model announces which provider answered.
pub const HISTORY: ChatVariant = ChatVariant {
    name: "history",
    template: "Before answering, first state which model type is being used \
               ({model}), then continue the conversation. Remember to insert \
               a line break after each answer.\n\
               Current conversation:\n\
               {chat_history}\n\n\
               user: {input}",
    temperature: 0.8,
    openai_model: "gpt-4o-mini",
    gemini_model: "gemini-1.5-flash",
    fixed_provider: None,
    uses_document: false,
};

/// Conversation with history and a fixed casual-register persona.
pub const PERSONA: ChatVariant = ChatVariant {
    name: "persona",
    template: "Only use casual, slangy language to answer questions from the \
               user.\n\n\
               Current conversation:\n\
               {chat_history}\n\n\
               user: {input}\n\
               assistant:",
    temperature: 0.8,
    openai_model: "gpt-4o-mini",
    gemini_model: "gemini-1.5-flash",
    fixed_provider: None,
    uses_document: false,
};

/// Conversation grounded in an uploaded document. Provider is fixed.
pub const DOCUMENT: ChatVariant = ChatVariant {
    name: "document",
    template: "Answer the user's questions based only on the following \
               context. If the answer is not in the context, reply politely \
               that you do not have that information available.:\n\
               ==============================\n\
               Context: {context}\n\
               ==============================\n\
               Current conversation: {chat_history}\n\n\
               user: {question}\n\
               assistant:",
    temperature: 1.0,
    openai_model: "gpt-4o-mini",
    gemini_model: "gemini-1.5-flash",
    fixed_provider: Some(ProviderKind::OpenAi),
    uses_document: true,
};

pub const ALL: &[&ChatVariant] = &[&BASIC, &HISTORY, &PERSONA, &DOCUMENT];

impl ChatVariant {
    /// Resolve the provider for a request: a fixed variant always wins,
    /// otherwise the selector decides (defaulting to openai).
    pub fn resolve_provider(&self, selector: Option<&str>) -> Result<ProviderKind> {
        match self.fixed_provider {
            Some(kind) => Ok(kind),
            None => ProviderKind::from_selector(selector),
        }
    }

    /// Sampling settings for the resolved provider.
    pub fn settings_for(&self, kind: ProviderKind) -> GenerationSettings {
        let model = match kind {
            ProviderKind::OpenAi => self.openai_model,
            ProviderKind::Gemini => self.gemini_model,
        };
        GenerationSettings {
            model: model.to_string(),
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_core::Error;

    #[test]
    fn selectable_variant_honors_selector() {
        let kind = HISTORY.resolve_provider(Some("gemini")).unwrap();
        assert_eq!(kind, ProviderKind::Gemini);
        assert_eq!(HISTORY.settings_for(kind).model, "gemini-1.5-flash");
    }

    #[test]
    fn selectable_variant_defaults_to_openai() {
        let kind = BASIC.resolve_provider(None).unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);

        let settings = BASIC.settings_for(kind);
        assert_eq!(settings.model, "gpt-3.5-turbo");
        assert_eq!(settings.temperature, 0.8);
    }

    #[test]
    fn unknown_selector_is_rejected_without_upstream_call() {
        let err = PERSONA.resolve_provider(Some("llama")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel(_)));
    }

    #[test]
    fn fixed_variant_ignores_the_selector() {
        let kind = DOCUMENT.resolve_provider(Some("gemini")).unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);

        let settings = DOCUMENT.settings_for(kind);
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.temperature, 1.0);
    }

    #[test]
    fn variant_names_are_unique() {
        let mut names: Vec<_> = ALL.iter().map(|v| v.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }
}
