//! Project entity model and DTOs.

use serde::{Deserialize, Serialize};
use sheetflow_core::error::CoreError;
use sheetflow_core::types::{new_id, EntityId, Timestamp};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `projects` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub title: String,
    pub description: String,
    pub created_at: Timestamp,
}

/// DTO for `POST /api/v1/projects`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 200, message = "Title can not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description can not be empty"))]
    pub description: String,
}

impl CreateProject {
    /// Validate the input and build a new project owned by `owner_id`.
    pub fn into_project(self, owner_id: EntityId) -> Result<Project, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return Err(CoreError::Validation(
                "Title or description can not be empty".into(),
            ));
        }

        Ok(Project {
            id: new_id(),
            owner_id,
            title: self.title.trim().to_string(),
            description: self.description,
            created_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn blank_title_is_rejected() {
        let input = CreateProject {
            title: "   ".into(),
            description: "brackets".into(),
        };
        assert_matches!(
            input.into_project(new_id()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn empty_description_is_rejected() {
        let input = CreateProject {
            title: "Rack".into(),
            description: String::new(),
        };
        assert_matches!(
            input.into_project(new_id()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn valid_input_builds_owned_project() {
        let owner = new_id();
        let project = CreateProject {
            title: " Rack ".into(),
            description: "Server rack panels".into(),
        }
        .into_project(owner)
        .unwrap();
        assert_eq!(project.owner_id, owner);
        assert_eq!(project.title, "Rack");
    }
}
