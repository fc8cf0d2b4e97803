pub mod generate_code;
pub mod health;
