/// API route handlers, one module per resource
///
/// - `health`: Health check
/// - `recipes`: Recipes, favorites, shopping cart, short links
/// - `tags`, `ingredients`: Reference data
/// - `users`: Profiles, avatars, subscriptions
/// - `links`: Short-link redirect

pub mod health;
pub mod ingredients;
pub mod links;
pub mod recipes;
pub mod tags;
pub mod users;
