pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use client::{ClientSettings, PromoApiClient};
pub use error::PromoApiError;
pub use types::{parse_upload_response, storage_key_from_url, UploadedAsset};
