// import modules
mod api_log;
mod recipe;

// export modules
pub use api_log::*;
pub use recipe::*;
