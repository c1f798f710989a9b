//! Google Generative AI (Gemini) adapter: planning, image generation and
//! image editing over `generateContent`.

pub mod error;
pub mod provider;

pub mod gen_ai {
    pub mod image_model;
    pub mod prompt;
}

pub use gen_ai::image_model::{GoogleGenAiClient, GoogleGenAiConfig};
pub use provider::GoogleClientFactory;

#[cfg(test)]
#[path = "../tests/image_model_tests.rs"]
mod image_model_tests;
