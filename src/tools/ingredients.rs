//! Ingredient Tools
//!
//! Search and CRUD for ingredients. TFDA reference records are read-only.

use rmcp::schemars;
use serde::{Deserialize, Serialize};

use crate::api::{ApiResponse, Empty};
use crate::db::Database;
use crate::models::{
    Ingredient, IngredientCreate, IngredientSource, NutrientKey, NutrientProfile, Nutrients,
    SourceFilter,
};
use super::validation::Validator;

const SEARCH_LIMIT: i64 = 20;

/// Ingredient editor form; every nutrient is required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct IngredientForm {
    #[serde(default)]
    pub food_name: String,
    pub calories_kcal: Option<f64>,
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub saturated_fat_g: Option<f64>,
    pub trans_fat_g: Option<f64>,
    pub carbohydrate_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    /// Cost per 100 g
    pub cost_per_unit: Option<f64>,
    #[serde(default)]
    pub unit_name: Option<String>,
}

impl IngredientForm {
    pub fn nutrient(&self, key: NutrientKey) -> Option<f64> {
        match key {
            NutrientKey::CaloriesKcal => self.calories_kcal,
            NutrientKey::ProteinG => self.protein_g,
            NutrientKey::FatG => self.fat_g,
            NutrientKey::SaturatedFatG => self.saturated_fat_g,
            NutrientKey::TransFatG => self.trans_fat_g,
            NutrientKey::CarbohydrateG => self.carbohydrate_g,
            NutrientKey::SugarG => self.sugar_g,
            NutrientKey::SodiumMg => self.sodium_mg,
        }
    }

    pub fn set_nutrient(&mut self, key: NutrientKey, value: Option<f64>) {
        let slot = match key {
            NutrientKey::CaloriesKcal => &mut self.calories_kcal,
            NutrientKey::ProteinG => &mut self.protein_g,
            NutrientKey::FatG => &mut self.fat_g,
            NutrientKey::SaturatedFatG => &mut self.saturated_fat_g,
            NutrientKey::TransFatG => &mut self.trans_fat_g,
            NutrientKey::CarbohydrateG => &mut self.carbohydrate_g,
            NutrientKey::SugarG => &mut self.sugar_g,
            NutrientKey::SodiumMg => &mut self.sodium_mg,
        };
        *slot = value;
    }
}

/// Search result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub source: IngredientSource,
    #[serde(flatten)]
    pub details: NutrientProfile,
}

impl From<Ingredient> for IngredientSummary {
    fn from(item: Ingredient) -> Self {
        Self {
            id: item.id,
            name: item.food_name,
            source: item.source,
            details: item.profile,
        }
    }
}

/// Full ingredient detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientDetail {
    pub id: i64,
    pub food_name: String,
    #[serde(default)]
    pub source: IngredientSource,
    #[serde(default)]
    pub tfda_id: Option<String>,
    #[serde(flatten)]
    pub profile: NutrientProfile,
    #[serde(default)]
    pub used_in_recipes: Vec<String>,
}

/// `{data: ...}` payload of the detail endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientData {
    pub data: IngredientDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRef {
    pub id: i64,
    pub name: String,
}

/// `{ingredient: {id, name}}` payload of create and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientSaved {
    pub ingredient: IngredientRef,
}

/// Validate the form into a name and profile
fn validate(form: &IngredientForm) -> Result<(String, NutrientProfile), crate::api::FieldErrors> {
    let mut v = Validator::new();
    v.length("food_name", &form.food_name, 1, 128);

    let mut nutrients = Nutrients::zero();
    for key in NutrientKey::ALL {
        let value = v.at_least(key.as_str(), form.nutrient(key), 0.0);
        nutrients.set(key, value);
    }
    let cost_per_unit = v.at_least("cost_per_unit", form.cost_per_unit, 0.0);

    let unit_name = form
        .unit_name
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or("g")
        .to_string();
    v.length("unit_name", &unit_name, 1, 16);

    v.finish()?;
    Ok((
        form.food_name.trim().to_string(),
        NutrientProfile {
            nutrients,
            cost_per_unit,
            unit_name,
        },
    ))
}

fn name_taken(name: &str) -> ApiResponse<IngredientSaved> {
    let message = format!("The name \"{}\" is already in use; choose another.", name);
    let mut errors = crate::api::FieldErrors::new();
    errors.insert("food_name".to_string(), vec![message.clone()]);
    ApiResponse::invalid(message, errors)
}

/// Search by name; an empty query lists the filter's ingredients
pub fn search_ingredients(db: &Database, query: &str, source: SourceFilter) -> Result<Vec<IngredientSummary>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let items = Ingredient::search(&conn, query, source, SEARCH_LIMIT)
        .map_err(|e| format!("Search failed: {}", e))?;
    Ok(items.into_iter().map(IngredientSummary::from).collect())
}

pub fn get_ingredient(db: &Database, id: i64) -> Result<ApiResponse<IngredientData>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let Some(item) = Ingredient::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get ingredient: {}", e))?
    else {
        return Ok(ApiResponse::failure("Ingredient not found."));
    };
    let used_in_recipes = Ingredient::used_in_recipes(&conn, id)
        .map_err(|e| format!("Failed to get recipe usage: {}", e))?;

    Ok(ApiResponse::success(
        "",
        IngredientData {
            data: IngredientDetail {
                id: item.id,
                food_name: item.food_name,
                source: item.source,
                tfda_id: item.tfda_id,
                profile: item.profile,
                used_in_recipes,
            },
        },
    ))
}

pub fn create_ingredient(db: &Database, form: IngredientForm) -> Result<ApiResponse<IngredientSaved>, String> {
    let (food_name, profile) = match validate(&form) {
        Ok(valid) => valid,
        Err(errors) => return Ok(ApiResponse::invalid("Validation failed.", errors)),
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    if Ingredient::user_name_taken(&conn, &food_name, None).map_err(|e| format!("Database error: {}", e))? {
        return Ok(name_taken(&food_name));
    }

    let item = Ingredient::create(
        &conn,
        &IngredientCreate {
            food_name,
            source: IngredientSource::User,
            tfda_id: None,
            profile,
        },
    )
    .map_err(|e| format!("Failed to create ingredient: {}", e))?;
    tracing::info!(id = item.id, name = %item.food_name, "ingredient created");

    Ok(ApiResponse::success(
        "Ingredient added.",
        IngredientSaved {
            ingredient: IngredientRef {
                id: item.id,
                name: item.food_name,
            },
        },
    ))
}

pub fn update_ingredient(db: &Database, id: i64, form: IngredientForm) -> Result<ApiResponse<IngredientSaved>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let Some(existing) = Ingredient::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? else {
        return Ok(ApiResponse::failure("Ingredient not found."));
    };
    if existing.source == IngredientSource::Tfda {
        return Ok(ApiResponse::failure("TFDA reference ingredients cannot be edited."));
    }

    let (food_name, profile) = match validate(&form) {
        Ok(valid) => valid,
        Err(errors) => return Ok(ApiResponse::invalid("Validation failed.", errors)),
    };
    if Ingredient::user_name_taken(&conn, &food_name, Some(id)).map_err(|e| format!("Database error: {}", e))? {
        return Ok(name_taken(&food_name));
    }

    let item = Ingredient::update(&conn, id, &food_name, &profile)
        .map_err(|e| format!("Failed to update ingredient: {}", e))?
        .ok_or_else(|| format!("Ingredient {} disappeared during update", id))?;

    Ok(ApiResponse::success(
        "Ingredient updated.",
        IngredientSaved {
            ingredient: IngredientRef {
                id: item.id,
                name: item.food_name,
            },
        },
    ))
}

/// Delete a shop ingredient; blocked while any recipe uses it
pub fn delete_ingredient(db: &Database, id: i64) -> Result<ApiResponse<Empty>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let Some(existing) = Ingredient::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? else {
        return Ok(ApiResponse::failure("Ingredient not found."));
    };
    if existing.source == IngredientSource::Tfda {
        return Ok(ApiResponse::failure("TFDA reference ingredients cannot be deleted."));
    }

    let used_in = Ingredient::used_in_recipes(&conn, id).map_err(|e| format!("Database error: {}", e))?;
    if !used_in.is_empty() {
        tracing::warn!(id, recipes = ?used_in, "ingredient delete blocked");
        return Ok(ApiResponse::failure(format!(
            "\"{}\" is used by recipes: {}. Remove it from those recipes first.",
            existing.food_name,
            used_in.join(", ")
        )));
    }

    Ingredient::delete(&conn, id).map_err(|e| format!("Failed to delete ingredient: {}", e))?;
    Ok(ApiResponse::ok(format!("Ingredient \"{}\" deleted.", existing.food_name)))
}
