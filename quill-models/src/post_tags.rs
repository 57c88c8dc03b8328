use crate::{posts::Post, schema::post_tags, tags::Tag, Connection, Error, Result};
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};

#[derive(Clone, Identifiable, Queryable, Associations)]
#[belongs_to(Post)]
#[belongs_to(Tag)]
#[table_name = "post_tags"]
pub struct PostTag {
    pub id: i32,
    pub post_id: i32,
    pub tag_id: i32,
}

#[derive(Insertable)]
#[table_name = "post_tags"]
pub struct NewPostTag {
    pub post_id: i32,
    pub tag_id: i32,
}

impl PostTag {
    insert!(post_tags, NewPostTag);

    pub fn list(conn: &Connection) -> Result<Vec<PostTag>> {
        post_tags::table.load(conn).map_err(Error::from)
    }

    pub fn delete_for_post(conn: &Connection, post_id: i32) -> Result<()> {
        diesel::delete(post_tags::table.filter(post_tags::post_id.eq(post_id)))
            .execute(conn)?;
        Ok(())
    }
}
