/// Database records for Foodgram
///
/// Records are plain data. Every query is an associated function (or a free
/// function for the join tables) that takes its executor explicitly, so the
/// same call works against a pool, a connection or an open transaction.
///
/// # Models
///
/// - `user`: author profiles mirrored from the identity provider
/// - `follow`: directed subscriptions between users
/// - `tag`: immutable tag reference data
/// - `ingredient`: immutable ingredient reference data
/// - `recipe`: recipes plus batch loaders for their associations
/// - `mark`: favorites and shopping-cart membership
///
/// # Example
///
/// ```no_run
/// use foodgram_shared::models::tag::Tag;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let mut tx = pool.begin().await?;
/// let tags = Tag::list(&mut *tx).await?;
/// tx.commit().await?;
/// println!("{} tags", tags.len());
/// # Ok(())
/// # }
/// ```

pub mod follow;
pub mod ingredient;
pub mod mark;
pub mod recipe;
pub mod tag;
pub mod user;
