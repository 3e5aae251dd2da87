//! Model constants for the supported provider

/// OpenAI model constants
pub mod openai {
    /// GPT-5 - reasoning model used for deep assessments
    pub const GPT_5_ID: &str = "gpt-5";
    pub const GPT_5_NAME: &str = "GPT-5";

    /// GPT-5 Mini - faster, cheaper reasoning model for question generation
    pub const GPT_5_MINI_ID: &str = "gpt-5-mini";
    pub const GPT_5_MINI_NAME: &str = "GPT-5 Mini";

    /// GPT-5 Nano - smallest GPT-5 variant
    pub const GPT_5_NANO_ID: &str = "gpt-5-nano";
    pub const GPT_5_NANO_NAME: &str = "GPT-5 Nano";

    /// GPT-4o - non-reasoning flagship model
    pub const GPT_4O_ID: &str = "gpt-4o";
    pub const GPT_4O_NAME: &str = "GPT-4o";

    /// GPT-4o Mini
    pub const GPT_4O_MINI_ID: &str = "gpt-4o-mini";
    pub const GPT_4O_MINI_NAME: &str = "GPT-4o Mini";
}
