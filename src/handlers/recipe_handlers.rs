use std::sync::Arc;

use axum::{ extract::{ Path, State }, http::StatusCode, Extension, Json };
use uuid::Uuid;

use crate::{
    dto::recipe_dtos::{ CreateRecipeRequest, RecipeResponse },
    errors::{ ErrorMessage, HttpError },
    middleware::auth::AuthUser,
    AppState,
};

fn parse_recipe_id(raw: &str) -> Result<Uuid, HttpError> {
    Uuid::parse_str(raw).map_err(|_| HttpError::not_found(ErrorMessage::RecipeNotFound.to_string()))
}

/// POST /v1/recipes
pub async fn create_recipe(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthUser>>,
    Json(body): Json<CreateRecipeRequest>
) -> Result<(StatusCode, Json<RecipeResponse>), HttpError> {
    let owner = user.map(|Extension(user)| user.user_id);
    let recipe = state.recipes.create_recipe(owner.as_deref(), body).await?;

    Ok((StatusCode::CREATED, Json(RecipeResponse::success(recipe))))
}

/// GET /v1/recipes/{id}
pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    Path(recipe_id): Path<String>
) -> Result<Json<RecipeResponse>, HttpError> {
    let recipe = state.recipes.get_recipe(parse_recipe_id(&recipe_id)?).await?;
    Ok(Json(RecipeResponse::success(recipe)))
}

/// DELETE /v1/recipes/{id}
pub async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthUser>>,
    Path(recipe_id): Path<String>
) -> Result<Json<RecipeResponse>, HttpError> {
    let Some(Extension(user)) = user else {
        return Err(HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()));
    };

    let recipe = state.recipes.delete_recipe(parse_recipe_id(&recipe_id)?, &user.caller()).await?;
    Ok(Json(RecipeResponse::success(recipe)))
}
