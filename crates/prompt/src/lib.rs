//! # Prompt
//!
//! Chat message types shared by the LLM client and the relay, plus everything the coach persona
//! sends to the model that is not user input.
//!
//! ## Request layout
//!
//! - **System**: [`CoachPrompt::system_instruction`], followed by `"\n\n" + facts` when the session
//!   has a cached dossier.
//! - **History**: every stored turn, in order (user and assistant).
//!
//! ## Control token
//!
//! A user message consisting exactly of [`CONTROL_TOKEN`] asks the model for the dossier (a bullet
//! list of what it knows about the client). It is a reserved input: a user who types the lone
//! emoji enters the same flow.

/// Role of a message, one-to-one with OpenAI Chat Completions API `role` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    /// System instruction (API `role: "system"`).
    System,
    /// User message (API `role: "user"`).
    User,
    /// Assistant message (API `role: "assistant"`).
    Assistant,
}

impl MessageRole {
    /// The API wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single chat message, one-to-one with one element of OpenAI `messages` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Reserved user input that requests the dossier instead of a conversational reply.
pub const CONTROL_TOKEN: &str = "💾";

/// True iff `content` is exactly the control token.
pub fn is_control_message(content: &str) -> bool {
    content == CONTROL_TOKEN
}

/// Separator between the persona instruction and the cached facts in the system message.
pub const FACTS_SEPARATOR: &str = "\n\n";

/// Persona texts parameterised by the bot's display name.
#[derive(Debug, Clone)]
pub struct CoachPrompt {
    bot_name: String,
}

impl CoachPrompt {
    pub fn new(bot_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
        }
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// First user turn of a new appointment.
    pub fn greeting(&self) -> String {
        format!("Hi {}!", self.bot_name)
    }

    /// The fixed persona instruction.
    pub fn system_instruction(&self) -> String {
        format!(
            "You are {name}, an experienced business coach with more than 20 years of experience.
You will be assisting and advising your client with all their questions.
You have a positive, optimistic attitude.

If you don't know the name and pronouns of your client, you will start by asking that.
Otherwise, you will greet them by name.
You will start the conversation with a little bit of smalltalk.
Then you will enquire about their current concerns on their project, and advise them as best as possible.
When many options are available, you will help them to narrow them down by asking additional questions.

When you receive a message consisting of a sole \"{token}\" you will respond with a message listing the facts that you have learned so far about your client, one per line, in bullet point format, where the first bullet point should indicate their name and preferred pronouns, and the following bullet points should include facts gathered during previous conversations.",
            name = self.bot_name,
            token = CONTROL_TOKEN,
        )
    }

    /// System message for a request: the instruction, plus the cached facts when present.
    pub fn system_message(&self, facts: Option<&str>) -> ChatMessage {
        let mut content = self.system_instruction();
        if let Some(facts) = facts {
            content.push_str(FACTS_SEPARATOR);
            content.push_str(facts);
        }
        ChatMessage::system(content)
    }

    /// Full request body: system message first, then the history unchanged.
    pub fn compose_request<I>(&self, facts: Option<&str>, history: I) -> Vec<ChatMessage>
    where
        I: IntoIterator<Item = ChatMessage>,
    {
        std::iter::once(self.system_message(facts))
            .chain(history)
            .collect()
    }
}
