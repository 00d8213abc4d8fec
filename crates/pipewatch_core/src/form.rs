use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    #[default]
    Full,
    Step,
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunType::Full => f.write_str("full"),
            RunType::Step => f.write_str("step"),
        }
    }
}

/// Raw user input for starting a job, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartForm {
    pub region: String,
    pub category: String,
    pub run_type: RunType,
    /// Step number as typed; only consulted for [`RunType::Step`].
    pub step: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("select a region and enter a business category")]
    MissingRegionOrCategory,
    #[error("enter a valid step number for a single-step run (got {0:?})")]
    InvalidStep(String),
}

/// Body of `POST /start_pipeline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartRequest {
    pub region: String,
    pub category: String,
    pub run_type: RunType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl StartRequest {
    pub fn summary(&self) -> String {
        match &self.step {
            Some(step) => format!(
                "Region: {}, Category: {}, Type: {}, Step: {}",
                self.region, self.category, self.run_type, step
            ),
            None => format!(
                "Region: {}, Category: {}, Type: {}",
                self.region, self.category, self.run_type
            ),
        }
    }
}

impl StartForm {
    pub fn validate(&self) -> Result<StartRequest, ValidationError> {
        let region = self.region.trim();
        let category = self.category.trim();
        if region.is_empty() || category.is_empty() {
            return Err(ValidationError::MissingRegionOrCategory);
        }

        let step = match self.run_type {
            RunType::Full => None,
            RunType::Step => {
                let raw = self.step.as_deref().unwrap_or("").trim();
                match raw.parse::<u32>() {
                    Ok(number) if number > 0 => Some(number.to_string()),
                    _ => return Err(ValidationError::InvalidStep(raw.to_string())),
                }
            }
        };

        Ok(StartRequest {
            region: region.to_string(),
            category: category.to_string(),
            run_type: self.run_type,
            step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{RunType, StartForm, ValidationError};

    fn form(region: &str, category: &str) -> StartForm {
        StartForm {
            region: region.to_string(),
            category: category.to_string(),
            ..StartForm::default()
        }
    }

    #[test]
    fn blank_category_is_rejected() {
        let err = form("Lombardia", "   ").validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingRegionOrCategory);
    }

    #[test]
    fn step_run_requires_positive_step() {
        let mut input = form("Lombardia", "ristoranti");
        input.run_type = RunType::Step;
        input.step = Some("0".to_string());
        assert!(matches!(input.validate(), Err(ValidationError::InvalidStep(_))));

        input.step = Some("abc".to_string());
        assert!(matches!(input.validate(), Err(ValidationError::InvalidStep(_))));

        input.step = Some(" 3 ".to_string());
        let request = input.validate().unwrap();
        assert_eq!(request.step.as_deref(), Some("3"));
    }

    #[test]
    fn full_run_serializes_without_step() {
        let mut input = form(" Lombardia ", " ristoranti ");
        input.step = Some("7".to_string());
        let request = input.validate().unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "region": "Lombardia",
                "category": "ristoranti",
                "run_type": "full"
            })
        );
    }
}
