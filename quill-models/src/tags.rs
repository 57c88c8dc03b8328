use crate::{post_tags::PostTag, schema::tags, Connection, Error, Result};
use chrono::NaiveDateTime;
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};
use heck::KebabCase;
use itertools::Itertools;

#[derive(Clone, Identifiable, Queryable, Serialize)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub creation_date: NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "tags"]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}

impl Tag {
    get!(tags);
    find_by!(tags, find_by_slug, slug as &str);
    find_by!(tags, find_by_name, name as &str);

    pub fn insert(conn: &Connection, new: NewTag) -> Result<Self> {
        let slug = if new.slug.is_empty() {
            new.name.to_kebab_case()
        } else {
            new.slug
        };
        if slug.is_empty() {
            return Err(Error::InvalidValue);
        }
        diesel::insert_into(tags::table)
            .values(NewTag {
                name: new.name,
                slug,
            })
            .execute(conn)
            .map_err(|err| match err {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => Error::SlugAlreadyExists,
                _ => Error::Db(err),
            })?;
        tags::table
            .order(tags::id.desc())
            .first(conn)
            .map_err(Error::from)
    }

    /// Finds a tag by name, creating it when it doesn't exist yet.
    pub fn find_or_insert(conn: &Connection, name: &str) -> Result<Self> {
        Tag::find_by_name(conn, name).or_else(|_| {
            Tag::insert(
                conn,
                NewTag {
                    name: name.to_owned(),
                    slug: String::new(),
                },
            )
        })
    }

    pub fn list(conn: &Connection) -> Result<Vec<Tag>> {
        tags::table
            .order(tags::name.asc())
            .load(conn)
            .map_err(Error::from)
    }

    /// Tags ranked by how many posts use them, most used first. Ties
    /// break on tag id so the order is stable.
    pub fn popular(conn: &Connection, limit: usize) -> Result<Vec<(Tag, i64)>> {
        let usage = PostTag::list(conn)?
            .into_iter()
            .map(|pt| pt.tag_id)
            .counts();
        let mut ranked = usage
            .into_iter()
            .map(|(tag_id, count)| (tag_id, count as i64))
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(tag_id, count)| Tag::get(conn, tag_id).map(|tag| (tag, count)))
            .collect()
    }

    pub fn delete(&self, conn: &Connection) -> Result<()> {
        diesel::delete(self).execute(conn)?;
        Ok(())
    }
}
