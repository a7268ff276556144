use std::collections::HashMap;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    dto::recipe_dtos::CreateRecipeRequest,
    errors::{ ErrorMessage, HttpError },
    logger::AppLogger,
    models::Recipe,
    utils::ownership::{ ensure_owner, Caller },
};

const ORIGIN: &str = "RecipeService";

/// Recipe catalogue kept in memory. Every state change is reported through the
/// application logger, so records pick up whatever request context is current.
pub struct RecipeService {
    recipes: RwLock<HashMap<Uuid, Recipe>>,
    logger: AppLogger,
}

impl RecipeService {
    pub fn new(logger: AppLogger) -> Self {
        Self {
            recipes: RwLock::new(HashMap::new()),
            logger,
        }
    }

    pub async fn create_recipe(
        &self,
        owner_id: Option<&str>,
        request: CreateRecipeRequest
    ) -> Result<Recipe, HttpError> {
        let title = request.title.trim();
        if title.is_empty() {
            self.logger.warn(
                json!({
                    "message": "Recipe creation rejected: title is empty",
                    "userId": owner_id,
                }),
                Some(ORIGIN),
                Some(StatusCode::BAD_REQUEST.as_u16())
            );
            return Err(HttpError::bad_request(ErrorMessage::RecipeTitleRequired.to_string()));
        }

        let owner_id = owner_id.ok_or_else(||
            HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string())
        )?;

        let recipe = Recipe {
            id: Uuid::new_v4(),
            user_id: owner_id.to_string(),
            title: title.to_string(),
            description: request.description.filter(|d| !d.trim().is_empty()),
            created_at: Utc::now(),
        };

        self.recipes.write().await.insert(recipe.id, recipe.clone());

        self.logger.log(
            json!({
                "message": "Recipe created",
                "recipeId": recipe.id.to_string(),
                "title": recipe.title,
            }),
            Some(ORIGIN),
            Some(StatusCode::CREATED.as_u16())
        );

        Ok(recipe)
    }

    pub async fn get_recipe(&self, recipe_id: Uuid) -> Result<Recipe, HttpError> {
        self.recipes
            .read().await
            .get(&recipe_id)
            .cloned()
            .ok_or_else(|| HttpError::not_found(ErrorMessage::RecipeNotFound.to_string()))
    }

    pub async fn delete_recipe(&self, recipe_id: Uuid, caller: &Caller) -> Result<Recipe, HttpError> {
        let mut recipes = self.recipes.write().await;

        let recipe = recipes
            .get(&recipe_id)
            .ok_or_else(|| HttpError::not_found(ErrorMessage::RecipeNotFound.to_string()))?;

        ensure_owner(&self.logger, recipe, &recipe_id.to_string(), Recipe::owner, caller)?;

        let removed = recipes
            .remove(&recipe_id)
            .ok_or_else(|| HttpError::not_found(ErrorMessage::RecipeNotFound.to_string()))?;
        drop(recipes);

        self.logger.log(
            json!({
                "message": "Recipe deleted",
                "recipeId": recipe_id.to_string(),
            }),
            Some(ORIGIN),
            Some(StatusCode::OK.as_u16())
        );

        Ok(removed)
    }

    pub async fn count(&self) -> usize {
        self.recipes.read().await.len()
    }
}
