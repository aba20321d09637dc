//! Survey-to-publish pipeline for generated promotion copy.
//!
//! Three stages share state only through a [`SessionStore`]:
//! [`SubmissionEncoder`] turns survey answers and images into a generation
//! request, [`normalize_ideas`] turns whatever the generator returns into
//! selectable ideas, and [`GenerationSession`] publishes or regenerates.

pub mod encoder;
pub mod error;
pub mod ideas;
pub mod ports;
mod recover;
pub mod relay;
pub mod session;

pub use encoder::{build_request, EncodedSubmission, ImageSelection, SubmissionEncoder};
pub use error::FlowError;
pub use ideas::{normalize_ideas, restore_ideas, split_concatenated};
pub use ports::{AuthTokens, FileStore, GenerationApi, PublishApi, StaticToken};
pub use relay::{GenerationSession, PublishOutcome};
pub use session::{
    keys, FileSessionStore, MemorySessionStore, SessionError, SessionStore, SessionStoreExt,
};
