pub mod general_handlers;
pub mod recipe_handlers;
