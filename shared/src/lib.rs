pub mod constants;
pub mod wheel;
