use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, tags::repo::Tag, validate::required_text};

/// Fields exposed for a tag; `id` is read-only.
pub const TAG_FIELDS: &[&str] = &["id", "name"];

/// Writable attributes of a tag, as nested in recipe payloads or sent on rename.
/// An `id` key in input is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagPayload {
    pub name: String,
}

impl TagPayload {
    pub fn validated(self) -> Result<Self, AppError> {
        Ok(Self {
            name: required_text(&self.name, "tag name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRepr {
    pub id: Uuid,
    pub name: String,
}

impl From<Tag> for TagRepr {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TagListQuery {
    #[serde(default)]
    pub assigned_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_exposes_exactly_tag_fields() {
        let repr = TagRepr::from(Tag {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "vegan".into(),
        });
        let value = serde_json::to_value(&repr).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, TAG_FIELDS);
    }

    #[test]
    fn payload_ignores_client_supplied_id() {
        let payload: TagPayload =
            serde_json::from_str(r#"{"id": "not-even-a-uuid", "name": " vegan "}"#).unwrap();
        assert_eq!(payload.validated().unwrap().name, "vegan");
    }

    #[test]
    fn blank_name_is_rejected() {
        let payload = TagPayload { name: "  ".into() };
        assert!(matches!(payload.validated(), Err(AppError::Validation(_))));
    }
}
