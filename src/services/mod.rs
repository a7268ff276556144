pub mod recipe_service;
