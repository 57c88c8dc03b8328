use crate::{
    post_tags::{NewPostTag, PostTag},
    safe_string::SafeString,
    schema::{comments, post_tags, posts, tags},
    tags::Tag,
    users::User,
    Connection, Error, Result, CONFIG,
};
use chrono::{NaiveDateTime, Utc};
use diesel::{
    self, BelongingToDsl, BoolExpressionMethods, ExpressionMethods, QueryDsl, RunQueryDsl,
    TextExpressionMethods,
};
use heck::KebabCase;

sql_function!(fn lower(string: diesel::sql_types::Text) -> diesel::sql_types::Text);

pub mod post_status {
    pub const DRAFT: &str = "draft";
    pub const PUBLISHED: &str = "published";
}

#[derive(Clone, Debug, Identifiable, Queryable, Associations, AsChangeset, Serialize)]
#[changeset_options(treat_none_as_null = "true")]
#[belongs_to(User, foreign_key = "author_id")]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub author_id: i32,
    pub content: SafeString,
    pub excerpt: String,
    pub cover_id: Option<i32>,
    pub status: String,
    pub creation_date: NaiveDateTime,
    pub update_date: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
    pub views: i32,
}

#[derive(Default, Insertable)]
#[table_name = "posts"]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub author_id: i32,
    pub content: SafeString,
    pub excerpt: String,
    pub cover_id: Option<i32>,
    pub status: String,
    pub creation_date: Option<NaiveDateTime>,
    pub published_at: Option<NaiveDateTime>,
}

impl Post {
    get!(posts);
    last!(posts);
    find_by!(posts, find_by_slug, slug as &str);

    /// Inserts a new post, deriving the slug from the title when none
    /// is given. The `published_at` watermark is stamped here when the
    /// post is born already published.
    pub fn insert(conn: &Connection, new: NewPost) -> Result<Self> {
        let mut new = new;
        if new.slug.is_empty() {
            new.slug = new.title.to_kebab_case();
        }
        if new.slug.is_empty() {
            return Err(Error::InvalidValue);
        }
        if new.status.is_empty() {
            new.status = post_status::DRAFT.to_owned();
        }
        if new.status != post_status::DRAFT && new.status != post_status::PUBLISHED {
            return Err(Error::InvalidValue);
        }
        new.published_at = if new.status == post_status::PUBLISHED {
            new.published_at.or_else(|| Some(Utc::now().naive_utc()))
        } else {
            None
        };
        diesel::insert_into(posts::table)
            .values(new)
            .execute(conn)
            .map_err(|err| match err {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => Error::SlugAlreadyExists,
                _ => Error::Db(err),
            })?;
        Self::last(conn)
    }

    /// Saves the current state of the post. The slug is never
    /// regenerated, and a `published_at` watermark already in the
    /// database is never lost or moved.
    pub fn update(&self, conn: &Connection) -> Result<Self> {
        let mut changes = self.clone();
        changes.update_date = Utc::now().naive_utc();
        let stored: Option<NaiveDateTime> = posts::table
            .find(self.id)
            .select(posts::published_at)
            .first(conn)?;
        changes.published_at = stored.or_else(|| {
            if changes.status == post_status::PUBLISHED {
                Some(changes.update_date)
            } else {
                None
            }
        });
        diesel::update(self).set(&changes).execute(conn)?;
        Post::get(conn, self.id)
    }

    /// Marks the post as published. Re-publishing an already published
    /// post is a no-op: the watermark keeps its original value.
    pub fn publish(&self, conn: &Connection) -> Result<Self> {
        let now = Utc::now().naive_utc();
        diesel::update(self)
            .set((
                posts::status.eq(post_status::PUBLISHED),
                posts::update_date.eq(now),
                posts::published_at.eq(self.published_at.unwrap_or(now)),
            ))
            .execute(conn)?;
        Post::get(conn, self.id)
    }

    /// Counts a view directly in the database, so that concurrent
    /// readers don't lose each other's increments.
    pub fn register_view(&self, conn: &Connection) -> Result<()> {
        diesel::update(self)
            .set(posts::views.eq(posts::views + 1))
            .execute(conn)?;
        Ok(())
    }

    pub fn is_published(&self) -> bool {
        self.status == post_status::PUBLISHED
    }

    pub fn url(&self) -> String {
        format!("{}/posts/{}", CONFIG.base_url, self.slug)
    }

    pub fn count(conn: &Connection) -> Result<i64> {
        posts::table
            .filter(posts::status.eq(post_status::PUBLISHED))
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn count_all(conn: &Connection) -> Result<i64> {
        posts::table.count().get_result(conn).map_err(Error::from)
    }

    /// Published posts, newest first, within a pagination window.
    pub fn page(conn: &Connection, (min, max): (i32, i32)) -> Result<Vec<Post>> {
        posts::table
            .filter(posts::status.eq(post_status::PUBLISHED))
            .order(posts::creation_date.desc())
            .offset(min.into())
            .limit((max - min).into())
            .load(conn)
            .map_err(Error::from)
    }

    /// Every post whatever its status, newest first, for the admin
    /// listing.
    pub fn admin_page(conn: &Connection, (min, max): (i32, i32)) -> Result<Vec<Post>> {
        posts::table
            .order(posts::creation_date.desc())
            .offset(min.into())
            .limit((max - min).into())
            .load(conn)
            .map_err(Error::from)
    }

    pub fn page_for_author(
        conn: &Connection,
        author: &User,
        (min, max): (i32, i32),
    ) -> Result<Vec<Post>> {
        posts::table
            .filter(posts::author_id.eq(author.id))
            .filter(posts::status.eq(post_status::PUBLISHED))
            .order(posts::creation_date.desc())
            .offset(min.into())
            .limit((max - min).into())
            .load(conn)
            .map_err(Error::from)
    }

    pub fn count_for_author(conn: &Connection, author: &User) -> Result<i64> {
        posts::table
            .filter(posts::author_id.eq(author.id))
            .filter(posts::status.eq(post_status::PUBLISHED))
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn page_for_tag(conn: &Connection, tag: &Tag, (min, max): (i32, i32)) -> Result<Vec<Post>> {
        let ids = PostTag::belonging_to(tag).select(post_tags::post_id);
        posts::table
            .filter(posts::id.eq_any(ids))
            .filter(posts::status.eq(post_status::PUBLISHED))
            .order(posts::creation_date.desc())
            .offset(min.into())
            .limit((max - min).into())
            .load(conn)
            .map_err(Error::from)
    }

    pub fn count_for_tag(conn: &Connection, tag: &Tag) -> Result<i64> {
        let ids = PostTag::belonging_to(tag).select(post_tags::post_id);
        posts::table
            .filter(posts::id.eq_any(ids))
            .filter(posts::status.eq(post_status::PUBLISHED))
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    /// The most viewed published posts, for the front page.
    pub fn featured(conn: &Connection, limit: i64) -> Result<Vec<Post>> {
        posts::table
            .filter(posts::status.eq(post_status::PUBLISHED))
            .order(posts::views.desc())
            .limit(limit)
            .load(conn)
            .map_err(Error::from)
    }

    /// The most recently published posts.
    pub fn recents(conn: &Connection, limit: i64) -> Result<Vec<Post>> {
        posts::table
            .filter(posts::status.eq(post_status::PUBLISHED))
            .order(posts::published_at.desc())
            .limit(limit)
            .load(conn)
            .map_err(Error::from)
    }

    /// Case-insensitive substring search over title, content and
    /// excerpt. Only published posts are searched, and a blank query
    /// matches nothing.
    pub fn search(conn: &Connection, query: &str, (min, max): (i32, i32)) -> Result<Vec<Post>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }
        let pattern = format!("%{}%", query.to_lowercase());
        posts::table
            .filter(posts::status.eq(post_status::PUBLISHED))
            .filter(
                lower(posts::title)
                    .like(pattern.clone())
                    .or(lower(posts::content).like(pattern.clone()))
                    .or(lower(posts::excerpt).like(pattern)),
            )
            .order(posts::creation_date.desc())
            .offset(min.into())
            .limit((max - min).into())
            .load(conn)
            .map_err(Error::from)
    }

    pub fn search_count(conn: &Connection, query: &str) -> Result<i64> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(0);
        }
        let pattern = format!("%{}%", query.to_lowercase());
        posts::table
            .filter(posts::status.eq(post_status::PUBLISHED))
            .filter(
                lower(posts::title)
                    .like(pattern.clone())
                    .or(lower(posts::content).like(pattern.clone()))
                    .or(lower(posts::excerpt).like(pattern)),
            )
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    /// Published posts sharing at least one tag with this one, newest
    /// first, excluding the post itself.
    pub fn related(&self, conn: &Connection, limit: i64) -> Result<Vec<Post>> {
        let tag_ids: Vec<i32> = PostTag::belonging_to(self)
            .select(post_tags::tag_id)
            .load(conn)?;
        let post_ids = post_tags::table
            .filter(post_tags::tag_id.eq_any(tag_ids))
            .select(post_tags::post_id);
        posts::table
            .filter(posts::id.eq_any(post_ids))
            .filter(posts::id.ne(self.id))
            .filter(posts::status.eq(post_status::PUBLISHED))
            .order(posts::published_at.desc())
            .limit(limit)
            .load(conn)
            .map_err(Error::from)
    }

    pub fn tags(&self, conn: &Connection) -> Result<Vec<Tag>> {
        let ids: Vec<i32> = PostTag::belonging_to(self)
            .select(post_tags::tag_id)
            .load(conn)?;
        tags::table
            .filter(tags::id.eq_any(ids))
            .order(tags::name.asc())
            .load(conn)
            .map_err(Error::from)
    }

    /// Replaces the tag set of this post with the given names,
    /// creating tags that don't exist yet.
    pub fn set_tags(&self, conn: &Connection, names: &[&str]) -> Result<Vec<Tag>> {
        PostTag::delete_for_post(conn, self.id)?;
        names
            .iter()
            .map(|name| {
                let tag = Tag::find_or_insert(conn, name)?;
                PostTag::insert(
                    conn,
                    NewPostTag {
                        post_id: self.id,
                        tag_id: tag.id,
                    },
                )?;
                Ok(tag)
            })
            .collect()
    }

    pub fn comment_count(&self, conn: &Connection) -> Result<i64> {
        comments::table
            .filter(comments::post_id.eq(self.id))
            .filter(comments::approved.eq(true))
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn get_author(&self, conn: &Connection) -> Result<User> {
        User::get(conn, self.author_id)
    }

    pub fn delete(&self, conn: &Connection) -> Result<()> {
        diesel::delete(self).execute(conn)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{tests::db, users::tests::fill_database as fill_users};
    use chrono::Duration;
    use diesel::Connection as _;

    // Three posts over three users: two published with distinct
    // timestamps and view counts, one draft.
    pub(crate) fn fill_database(conn: &crate::Connection) -> (Vec<User>, Vec<Post>) {
        let users = fill_users(conn);
        let base = Utc::now().naive_utc() - Duration::days(2);
        let fixtures = [
            ("Hello world", "Welcome to this blog", 12, true),
            ("Tuning Diesel queries", "Indexes beat loops", 54, true),
            ("Work in progress", "Not ready for readers yet", 0, false),
        ];
        let posts = fixtures
            .iter()
            .enumerate()
            .map(|(i, (title, content, views, published))| {
                let date = base + Duration::hours(i as i64);
                let post = Post::insert(
                    conn,
                    NewPost {
                        title: (*title).to_owned(),
                        author_id: users[i % users.len()].id,
                        content: SafeString::new(content),
                        excerpt: format!("About {}", title.to_lowercase()),
                        status: if *published {
                            post_status::PUBLISHED.to_owned()
                        } else {
                            post_status::DRAFT.to_owned()
                        },
                        creation_date: Some(date),
                        published_at: if *published { Some(date) } else { None },
                        ..NewPost::default()
                    },
                )
                .unwrap();
                diesel::update(&post)
                    .set(posts::views.eq(views))
                    .execute(conn)
                    .unwrap();
                Post::get(conn, post.id).unwrap()
            })
            .collect();
        (users, posts)
    }

    #[test]
    fn slug_derivation_and_uniqueness() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (users, _) = fill_database(&conn);
            let post = Post::insert(
                &conn,
                NewPost {
                    title: "My First Post!".to_owned(),
                    author_id: users[0].id,
                    ..NewPost::default()
                },
            )
            .unwrap();
            assert_eq!(post.slug, "my-first-post");
            assert_eq!(post.status, post_status::DRAFT);
            assert!(post.published_at.is_none());

            match Post::insert(
                &conn,
                NewPost {
                    title: "My first post".to_owned(),
                    slug: "my-first-post".to_owned(),
                    author_id: users[0].id,
                    ..NewPost::default()
                },
            ) {
                Err(Error::SlugAlreadyExists) => (),
                other => panic!("unexpected result: {:?}", other),
            }

            // a title that produces no slug at all is refused
            assert!(Post::insert(
                &conn,
                NewPost {
                    title: "!!!".to_owned(),
                    author_id: users[0].id,
                    ..NewPost::default()
                },
            )
            .is_err());
            Ok(())
        });
    }

    #[test]
    fn publication_watermark() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (users, _) = fill_database(&conn);
            let draft = Post::insert(
                &conn,
                NewPost {
                    title: "Going live".to_owned(),
                    author_id: users[0].id,
                    ..NewPost::default()
                },
            )
            .unwrap();
            assert!(draft.published_at.is_none());

            let published = draft.publish(&conn).unwrap();
            let watermark = published.published_at.unwrap();
            assert_eq!(published.status, post_status::PUBLISHED);

            // re-publishing doesn't move the watermark
            let republished = published.publish(&conn).unwrap();
            assert_eq!(republished.published_at, Some(watermark));

            // neither does an ordinary edit
            let mut edited = republished.clone();
            edited.title = "Gone live".to_owned();
            let edited = edited.update(&conn).unwrap();
            assert_eq!(edited.published_at, Some(watermark));
            assert_eq!(edited.title, "Gone live");
            // and the slug stays what it was at creation
            assert_eq!(edited.slug, "going-live");
            Ok(())
        });
    }

    #[test]
    fn listing_hides_drafts() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (_, posts) = fill_database(&conn);
            assert_eq!(Post::count(&conn).unwrap(), 2);
            assert_eq!(Post::count_all(&conn).unwrap(), 3);

            let page = Post::page(&conn, (0, crate::ITEMS_PER_PAGE)).unwrap();
            assert_eq!(page.len(), 2);
            // newest first
            assert_eq!(page[0].id, posts[1].id);
            assert!(page.iter().all(Post::is_published));

            let admin = Post::admin_page(&conn, (0, crate::ITEMS_PER_PAGE)).unwrap();
            assert_eq!(admin.len(), 3);
            assert_eq!(admin[0].id, posts[2].id);
            Ok(())
        });
    }

    #[test]
    fn featured_and_recents() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (_, posts) = fill_database(&conn);
            let featured = Post::featured(&conn, 3).unwrap();
            assert_eq!(featured[0].id, posts[1].id);
            assert_eq!(featured.len(), 2);

            let recents = Post::recents(&conn, 5).unwrap();
            assert_eq!(recents[0].id, posts[1].id);
            assert_eq!(recents.len(), 2);
            Ok(())
        });
    }

    #[test]
    fn search() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            fill_database(&conn);
            let window = (0, crate::ITEMS_PER_PAGE);

            // blank queries match nothing, not everything
            assert!(Post::search(&conn, "", window).unwrap().is_empty());
            assert!(Post::search(&conn, "   ", window).unwrap().is_empty());

            let found = Post::search(&conn, "DIESEL", window).unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].title, "Tuning Diesel queries");

            // body text is searched too
            assert_eq!(Post::search_count(&conn, "indexes beat").unwrap(), 1);

            // drafts stay invisible even on an exact match
            assert!(Post::search(&conn, "ready for readers", window)
                .unwrap()
                .is_empty());
            Ok(())
        });
    }

    #[test]
    fn views_count_every_hit() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (_, posts) = fill_database(&conn);
            let before = posts[0].views;
            posts[0].register_view(&conn).unwrap();
            posts[0].register_view(&conn).unwrap();
            assert_eq!(Post::get(&conn, posts[0].id).unwrap().views, before + 2);
            Ok(())
        });
    }

    #[test]
    fn related_posts() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (_, posts) = fill_database(&conn);
            posts[0].set_tags(&conn, &["rust", "blogging"]).unwrap();
            posts[1].set_tags(&conn, &["rust"]).unwrap();
            posts[2].set_tags(&conn, &["rust"]).unwrap();

            let related = posts[0].related(&conn, 3).unwrap();
            // the draft shares a tag but stays hidden, and the post
            // itself is excluded
            assert_eq!(related.len(), 1);
            assert_eq!(related[0].id, posts[1].id);
            Ok(())
        });
    }

    #[test]
    fn tag_pages() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (users, posts) = fill_database(&conn);
            let tags = posts[0].set_tags(&conn, &["rust"]).unwrap();
            posts[2].set_tags(&conn, &["rust"]).unwrap();

            let page = Post::page_for_tag(&conn, &tags[0], (0, crate::ITEMS_PER_PAGE)).unwrap();
            assert_eq!(page.len(), 1);
            assert_eq!(Post::count_for_tag(&conn, &tags[0]).unwrap(), 1);

            let by_author =
                Post::page_for_author(&conn, &users[0], (0, crate::ITEMS_PER_PAGE)).unwrap();
            assert_eq!(by_author.len(), 1);
            assert_eq!(by_author[0].id, posts[0].id);
            Ok(())
        });
    }
}
