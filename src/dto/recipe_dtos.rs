use serde::{ Deserialize, Serialize };

use crate::models::Recipe;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateRecipeRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub status: String,
    pub data: Recipe,
}

impl RecipeResponse {
    pub fn success(recipe: Recipe) -> Self {
        Self {
            status: "success".to_string(),
            data: recipe,
        }
    }
}
