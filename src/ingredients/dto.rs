use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, ingredients::repo::Ingredient, validate::required_text};

pub const INGREDIENT_FIELDS: &[&str] = &["id", "name"];

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientPayload {
    pub name: String,
}

impl IngredientPayload {
    pub fn validated(self) -> Result<Self, AppError> {
        Ok(Self {
            name: required_text(&self.name, "ingredient name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientRepr {
    pub id: Uuid,
    pub name: String,
}

impl From<Ingredient> for IngredientRepr {
    fn from(i: Ingredient) -> Self {
        Self { id: i.id, name: i.name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_hides_owner() {
        let repr = IngredientRepr::from(Ingredient {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "salt".into(),
        });
        let value = serde_json::to_value(&repr).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, INGREDIENT_FIELDS);
    }
}
