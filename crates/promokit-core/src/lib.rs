pub mod app_config;
pub mod config;
pub mod form;
pub mod survey;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use form::{
    extract_first_time_range, norm_time, parse_time_range, split_region_keywords, strip_handle,
    to_list, DEFAULT_CLOSE, DEFAULT_OPEN,
};
pub use survey::load_survey;
pub use types::{
    BusinessHours, GenerateAdRequest, ImageFile, PromotionIdea, PublishContext, PublishRequest,
    SurveyFormValues, Tone, VariantId,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read survey file {path}: {source}")]
    SurveyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse survey file: {0}")]
    SurveyFileParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}
