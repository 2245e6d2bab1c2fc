use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    recipes::repo::{NewRecipe, Recipe},
    tags::{
        dto::{TagPayload, TagRepr},
        repo::Tag,
    },
    validate::{optional_text, required_text},
};

/// Fields of the list representation; `id` is read-only.
pub const RECIPE_FIELDS: &[&str] = &["id", "title", "time_minutes", "price", "link", "tags"];

/// Fields the detail representation adds on top of [`RECIPE_FIELDS`].
pub const RECIPE_DETAIL_EXTRA_FIELDS: &[&str] = &["description"];

pub fn recipe_detail_fields() -> Vec<&'static str> {
    RECIPE_FIELDS
        .iter()
        .chain(RECIPE_DETAIL_EXTRA_FIELDS)
        .copied()
        .collect()
}

const PRICE_SCALE: u32 = 2;
// NUMERIC(5, 2)
const PRICE_LIMIT: i64 = 1000;

/// A recipe together with the tags currently associated with it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRecipe {
    pub recipe: Recipe,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeRepr {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<TagRepr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetailRepr {
    #[serde(flatten)]
    pub base: RecipeRepr,
    pub description: String,
}

impl From<TaggedRecipe> for RecipeRepr {
    fn from(TaggedRecipe { recipe, tags }: TaggedRecipe) -> Self {
        let mut price = recipe.price;
        price.rescale(PRICE_SCALE);
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price,
            link: recipe.link,
            tags: tags.into_iter().map(TagRepr::from).collect(),
        }
    }
}

impl From<TaggedRecipe> for RecipeDetailRepr {
    fn from(tagged: TaggedRecipe) -> Self {
        let description = tagged.recipe.description.clone();
        Self {
            base: tagged.into(),
            description,
        }
    }
}

/// Body of `POST /recipes`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeCreate {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<TagPayload>,
}

impl RecipeCreate {
    pub fn validated(self) -> Result<Self, AppError> {
        Ok(Self {
            title: required_text(&self.title, "title")?,
            time_minutes: self.time_minutes,
            price: check_price(self.price)?,
            link: optional_text(&self.link, "link")?,
            description: self.description.trim().to_string(),
            tags: validate_tags(self.tags)?,
        })
    }

    /// Splits off the nested tag list from the column values.
    pub fn into_parts(self) -> (NewRecipe, Vec<TagPayload>) {
        let new = NewRecipe {
            title: self.title,
            time_minutes: self.time_minutes,
            price: self.price,
            link: self.link,
            description: self.description,
        };
        (new, self.tags)
    }
}

/// Body of `PUT /recipes/:id`. The required columns are overwritten; `link`,
/// `description` and `tags` only when supplied.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeReplace {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub tags: Option<Option<Vec<TagPayload>>>,
}

impl From<RecipeReplace> for RecipePatch {
    fn from(r: RecipeReplace) -> Self {
        Self {
            title: Some(r.title),
            time_minutes: Some(r.time_minutes),
            price: Some(r.price),
            link: r.link,
            description: r.description,
            tags: r.tags,
        }
    }
}

/// Partial update. A missing key leaves the stored value alone. `tags` is
/// `None` when absent and `Some(None)` for an explicit `null`, which
/// [`RecipePatch::validated`] rejects; `Some(Some(vec![]))` clears every
/// association.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub tags: Option<Option<Vec<TagPayload>>>,
}

// Wraps whatever is present, so an explicit `null` is told apart from a missing key.
fn present<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(de).map(Some)
}

impl RecipePatch {
    pub fn validated(self) -> Result<Self, AppError> {
        let tags = match self.tags {
            None => None,
            Some(None) => return Err(AppError::validation("tags may not be null")),
            Some(Some(list)) => Some(Some(validate_tags(list)?)),
        };
        Ok(Self {
            title: self.title.map(|t| required_text(&t, "title")).transpose()?,
            time_minutes: self.time_minutes,
            price: self.price.map(check_price).transpose()?,
            link: self.link.map(|l| optional_text(&l, "link")).transpose()?,
            description: self.description.map(|d| d.trim().to_string()),
            tags,
        })
    }

    /// Removes the tag list, `None` when the key was absent.
    pub fn take_tags(&mut self) -> Option<Vec<TagPayload>> {
        self.tags.take().flatten()
    }

    /// Shallow field-by-field overwrite; `tags` is not touched here.
    pub fn apply_to(&self, recipe: &mut Recipe) {
        if let Some(title) = &self.title {
            recipe.title = title.clone();
        }
        if let Some(minutes) = self.time_minutes {
            recipe.time_minutes = minutes;
        }
        if let Some(price) = self.price {
            recipe.price = price;
        }
        if let Some(link) = &self.link {
            recipe.link = link.clone();
        }
        if let Some(description) = &self.description {
            recipe.description = description.clone();
        }
    }
}

/// `?tags=<uuid>,<uuid>`
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
}

impl RecipeListQuery {
    pub fn tag_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let Some(raw) = self.tags.as_deref() else {
            return Ok(Vec::new());
        };
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Uuid::parse_str(s).map_err(|_| AppError::validation(format!("invalid tag id {s:?}")))
            })
            .collect()
    }
}

fn check_price(price: Decimal) -> Result<Decimal, AppError> {
    if price.round_dp(PRICE_SCALE) != price {
        return Err(AppError::validation("price must have at most 2 decimal places"));
    }
    if price.abs() >= Decimal::from(PRICE_LIMIT) {
        return Err(AppError::validation("price must be less than 1000"));
    }
    Ok(price)
}

fn validate_tags(tags: Vec<TagPayload>) -> Result<Vec<TagPayload>, AppError> {
    tags.into_iter().map(TagPayload::validated).collect()
}
