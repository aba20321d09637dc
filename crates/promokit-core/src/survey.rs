use std::path::Path;

use crate::types::SurveyFormValues;
use crate::ConfigError;

/// Load and validate survey answers from a YAML (or JSON) file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or is missing
/// a required answer.
pub fn load_survey(path: &Path) -> Result<SurveyFormValues, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SurveyFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let values: SurveyFormValues = serde_yaml::from_str(&content)?;
    validate_survey(&values)?;
    Ok(values)
}

fn validate_survey(values: &SurveyFormValues) -> Result<(), ConfigError> {
    let required = [
        ("store_name", &values.store_name),
        ("region_keyword", &values.region_keyword),
        ("address", &values.address),
        ("price_range", &values.price_range),
        ("category", &values.category),
        ("hours", &values.hours),
        ("intro", &values.intro),
    ];

    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "survey field '{field}' must be non-empty"
            )));
        }
    }

    if let Some(limit) = values.hashtag_limit {
        if !(1..=30).contains(&limit) {
            return Err(ConfigError::Validation(format!(
                "hashtag_limit {limit} is out of range; must be 1..=30"
            )));
        }
    }
    if let Some(count) = values.num_variants {
        if !(1..=5).contains(&count) {
            return Err(ConfigError::Validation(format!(
                "num_variants {count} is out of range; must be 1..=5"
            )));
        }
    }

    Ok(())
}
