pub mod challenge;
pub mod health;
pub mod password;
pub mod signin;
pub mod state;
pub mod types;
pub mod users;
pub mod verify;

mod utils;

#[cfg(test)]
mod tests;
