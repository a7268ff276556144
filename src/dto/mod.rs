pub mod recipe_dtos;
