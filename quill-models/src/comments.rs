use crate::{posts::Post, safe_string::SafeString, schema::comments, Connection, Error, Result};
use chrono::NaiveDateTime;
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};

#[derive(Clone, Debug, Identifiable, Queryable, Associations, Serialize)]
#[belongs_to(Post)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub author_name: String,
    pub author_email: String,
    pub content: SafeString,
    pub approved: bool,
    pub creation_date: NaiveDateTime,
}

// `approved` is deliberately not a field here: every comment enters
// the moderation queue unapproved.
#[derive(Insertable)]
#[table_name = "comments"]
pub struct NewComment {
    pub post_id: i32,
    pub author_name: String,
    pub author_email: String,
    pub content: SafeString,
    pub creation_date: Option<NaiveDateTime>,
}

impl Comment {
    insert!(comments, NewComment);
    get!(comments);

    pub fn get_post(&self, conn: &Connection) -> Result<Post> {
        Post::get(conn, self.post_id)
    }

    /// Approved comments of a post, oldest first: what the public
    /// comment thread shows.
    pub fn list_for_post(conn: &Connection, post_id: i32) -> Result<Vec<Comment>> {
        comments::table
            .filter(comments::post_id.eq(post_id))
            .filter(comments::approved.eq(true))
            .order(comments::creation_date.asc())
            .load(conn)
            .map_err(Error::from)
    }

    /// Every comment whatever its state, newest first, for the
    /// moderation queue.
    pub fn admin_page(conn: &Connection, (min, max): (i32, i32)) -> Result<Vec<Comment>> {
        comments::table
            .order(comments::creation_date.desc())
            .offset(min.into())
            .limit((max - min).into())
            .load(conn)
            .map_err(Error::from)
    }

    pub fn count(conn: &Connection) -> Result<i64> {
        comments::table.count().get_result(conn).map_err(Error::from)
    }

    pub fn count_pending(conn: &Connection) -> Result<i64> {
        comments::table
            .filter(comments::approved.eq(false))
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn count_approved(conn: &Connection) -> Result<i64> {
        comments::table
            .filter(comments::approved.eq(true))
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    /// Flips the moderation state, in either direction.
    pub fn toggle_approval(&self, conn: &Connection) -> Result<Comment> {
        diesel::update(self)
            .set(comments::approved.eq(!self.approved))
            .execute(conn)?;
        Comment::get(conn, self.id)
    }

    pub fn delete(&self, conn: &Connection) -> Result<()> {
        diesel::delete(self).execute(conn)?;
        Ok(())
    }
}
