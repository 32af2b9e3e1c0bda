//! Remote language services and request classification
//!
//! - **config**: endpoints, models and sampling parameters
//! - **completion**: chat completion client and the `CompletionService` seam
//! - **image**: image-generation client and the `ImageService` seam
//! - **intent**: keyword classifier deciding when to ask for an image
//! - **prompts**: fixed greeting, system instruction and apology texts

pub mod completion;
pub mod config;
pub mod image;
pub mod intent;
pub mod prompts;

pub use completion::{
    parse_completion, ChatMessage, ChatRole, CompletionRequest, CompletionService,
    OpenRouterClient,
};
pub use config::{CompletionConfig, ImageConfig};
pub use image::{parse_image_url, ImageRequest, ImageService, OpenAIImageClient};
pub use intent::{ImageIntentClassifier, MatchMode, IMAGE_TRIGGERS};
pub use prompts::{APOLOGY, GREETING, SYSTEM_PROMPT};
