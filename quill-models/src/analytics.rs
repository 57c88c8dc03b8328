use crate::{
    comments::Comment,
    posts::Post,
    schema::{analytics, comments, posts},
    subscribers::Subscriber,
    users::User,
    Connection, Error, Result,
};
use chrono::{NaiveDate, Utc};
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};
use itertools::Itertools;

const TOP_LIMIT: usize = 5;
const RECENT_LIMIT: i64 = 5;

/// Everything the admin dashboard shows, computed fresh on each call.
#[derive(Serialize)]
pub struct DashboardStats {
    pub total_posts: i64,
    pub published_posts: i64,
    pub total_views: i64,
    pub total_comments: i64,
    pub pending_comments: i64,
    pub approved_comments: i64,
    pub active_subscribers: i64,
    pub top_authors: Vec<(User, i64)>,
    pub top_posts: Vec<(Post, i64)>,
    pub recent_posts: Vec<Post>,
    pub recent_comments: Vec<Comment>,
}

impl DashboardStats {
    pub fn compute(conn: &Connection) -> Result<DashboardStats> {
        let total_views: Option<i64> = posts::table
            .select(diesel::dsl::sum(posts::views))
            .first(conn)?;

        let author_ids: Vec<i32> = posts::table.select(posts::author_id).load(conn)?;
        let top_authors = rank(author_ids)
            .into_iter()
            .take(TOP_LIMIT)
            .map(|(id, n)| User::get(conn, id).map(|user| (user, n)))
            .collect::<Result<Vec<_>>>()?;

        let commented_ids: Vec<i32> = comments::table
            .filter(comments::approved.eq(true))
            .select(comments::post_id)
            .load(conn)?;
        let top_posts = rank(commented_ids)
            .into_iter()
            .take(TOP_LIMIT)
            .map(|(id, n)| Post::get(conn, id).map(|post| (post, n)))
            .collect::<Result<Vec<_>>>()?;

        Ok(DashboardStats {
            total_posts: Post::count_all(conn)?,
            published_posts: Post::count(conn)?,
            total_views: total_views.unwrap_or(0),
            total_comments: Comment::count(conn)?,
            pending_comments: Comment::count_pending(conn)?,
            approved_comments: Comment::count_approved(conn)?,
            active_subscribers: Subscriber::count_active(conn)?,
            top_authors,
            top_posts,
            recent_posts: posts::table
                .order(posts::creation_date.desc())
                .limit(RECENT_LIMIT)
                .load(conn)?,
            recent_comments: comments::table
                .order(comments::creation_date.desc())
                .limit(RECENT_LIMIT)
                .load(conn)?,
        })
    }
}

// Occurrence counting is done here rather than in SQL, since diesel
// 1.x has no group_by. Ties break on the smaller id so the ranking is
// stable.
fn rank(ids: Vec<i32>) -> Vec<(i32, i64)> {
    let mut ranked = ids
        .into_iter()
        .counts()
        .into_iter()
        .map(|(id, n)| (id, n as i64))
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}

/// A per-day snapshot of the headline numbers, one row per date.
#[derive(Clone, Debug, Identifiable, Queryable, Serialize)]
#[table_name = "analytics"]
pub struct Analytics {
    pub id: i32,
    pub date: NaiveDate,
    pub posts_count: i32,
    pub comments_count: i32,
    pub views_count: i32,
    pub new_subscribers: i32,
}

#[derive(Insertable)]
#[table_name = "analytics"]
pub struct NewAnalytics {
    pub date: NaiveDate,
    pub posts_count: i32,
    pub comments_count: i32,
    pub views_count: i32,
    pub new_subscribers: i32,
}

impl Analytics {
    get!(analytics);
    find_by!(analytics, find_by_date, date as NaiveDate);

    /// Records (or refreshes) the snapshot for the given date.
    pub fn record_for(conn: &Connection, date: NaiveDate) -> Result<Analytics> {
        let views: Option<i64> = posts::table
            .select(diesel::dsl::sum(posts::views))
            .first(conn)?;
        let new_subscribers = Subscriber::list(conn)?
            .iter()
            .filter(|sub| sub.subscription_date.date() == date)
            .count() as i32;
        let snapshot = NewAnalytics {
            date,
            posts_count: Post::count_all(conn)? as i32,
            comments_count: Comment::count(conn)? as i32,
            views_count: views.unwrap_or(0) as i32,
            new_subscribers,
        };

        if let Ok(existing) = Analytics::find_by_date(conn, date) {
            diesel::update(&existing)
                .set((
                    analytics::posts_count.eq(snapshot.posts_count),
                    analytics::comments_count.eq(snapshot.comments_count),
                    analytics::views_count.eq(snapshot.views_count),
                    analytics::new_subscribers.eq(snapshot.new_subscribers),
                ))
                .execute(conn)?;
            return Analytics::get(conn, existing.id);
        }
        diesel::insert_into(analytics::table)
            .values(snapshot)
            .execute(conn)?;
        Analytics::find_by_date(conn, date)
    }

    pub fn record_today(conn: &Connection) -> Result<Analytics> {
        Analytics::record_for(conn, Utc::now().naive_utc().date())
    }

    pub fn history(conn: &Connection, limit: i64) -> Result<Vec<Analytics>> {
        analytics::table
            .order(analytics::date.desc())
            .limit(limit)
            .load(conn)
            .map_err(Error::from)
    }
}
