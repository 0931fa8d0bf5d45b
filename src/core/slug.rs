//! Unique URL slugs for catalog entities.

use crate::{
    core::validation,
    errors::{Error, Result},
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

async fn slug_taken<E, C>(
    db: &C,
    slug_column: E::Column,
    id_column: E::Column,
    slug: &str,
    except: Option<i64>,
) -> Result<bool>
where
    E: EntityTrait,
    E::Model: Send + Sync,
    C: ConnectionTrait,
{
    let mut query = E::find().filter(slug_column.eq(slug));
    if let Some(id) = except {
        query = query.filter(id_column.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

/// Picks the slug for a row of `E`.
///
/// An explicit slug must be free (or belong to `except`); a slug derived from
/// `title` gets a numeric suffix until it is free.
///
/// # Errors
/// Returns [`Error::Validation`] on field `slug` when an explicit slug is
/// already taken.
pub async fn resolve_slug<E, C>(
    db: &C,
    slug_column: E::Column,
    id_column: E::Column,
    explicit: Option<&str>,
    title: &str,
    except: Option<i64>,
) -> Result<String>
where
    E: EntityTrait,
    E::Model: Send + Sync,
    C: ConnectionTrait,
{
    if let Some(slug) = validation::optional_text("slug", explicit, 255)? {
        if slug_taken::<E, C>(db, slug_column, id_column, &slug, except).await? {
            return Err(Error::validation("slug", "has already been taken"));
        }
        return Ok(slug);
    }

    let base = match validation::slugify(title) {
        s if s.is_empty() => "item".to_string(),
        s => s,
    };
    let mut candidate = base.clone();
    let mut suffix = 2;
    while slug_taken::<E, C>(db, slug_column, id_column, &candidate, except).await? {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    Ok(candidate)
}
