/// Domain services
///
/// Services own transaction boundaries and turn repository results into
/// [`crate::error::ServiceError`]s. They never see HTTP types.
///
/// - `associations`: atomic rewrite of a recipe's tags and ingredients
/// - `shopping_list`: aggregated text export of a user's cart
/// - `marks`: favorite and shopping-cart toggles
/// - `follows`: subscriptions between users
/// - `recipes`: recipe lifecycle, read model and short links
/// - `users`: profiles and avatars

pub mod associations;
pub mod follows;
pub mod marks;
pub mod recipes;
pub mod shopping_list;
pub mod users;
