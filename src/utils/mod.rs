pub mod flatten;
pub mod ownership;
pub mod token;
