use crate::{schema::subscribers, Connection, Error, Result};
use chrono::NaiveDateTime;
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};

#[derive(Clone, Debug, Identifiable, Queryable, Serialize)]
pub struct Subscriber {
    pub id: i32,
    pub email: String,
    pub active: bool,
    pub subscription_date: NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "subscribers"]
pub struct NewSubscriber {
    pub email: String,
    pub subscription_date: Option<NaiveDateTime>,
}

impl Subscriber {
    insert!(subscribers, NewSubscriber);
    get!(subscribers);
    find_by!(subscribers, find_by_email, email as &str);

    /// Signs an address up for the newsletter. Subscribing twice is
    /// not an error, the boolean tells whether a row was created.
    pub fn subscribe(conn: &Connection, email: &str) -> Result<(Subscriber, bool)> {
        if let Ok(existing) = Subscriber::find_by_email(conn, email) {
            return Ok((existing, false));
        }
        Subscriber::insert(
            conn,
            NewSubscriber {
                email: email.to_owned(),
                subscription_date: None,
            },
        )
        .map(|sub| (sub, true))
    }

    pub fn list(conn: &Connection) -> Result<Vec<Subscriber>> {
        subscribers::table
            .order(subscribers::subscription_date.desc())
            .load(conn)
            .map_err(Error::from)
    }

    pub fn page(conn: &Connection, (min, max): (i32, i32)) -> Result<Vec<Subscriber>> {
        subscribers::table
            .order(subscribers::subscription_date.desc())
            .offset(min.into())
            .limit((max - min).into())
            .load(conn)
            .map_err(Error::from)
    }

    pub fn count(conn: &Connection) -> Result<i64> {
        subscribers::table
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn count_active(conn: &Connection) -> Result<i64> {
        subscribers::table
            .filter(subscribers::active.eq(true))
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn set_active(&self, conn: &Connection, active: bool) -> Result<Subscriber> {
        diesel::update(self)
            .set(subscribers::active.eq(active))
            .execute(conn)?;
        Subscriber::get(conn, self.id)
    }

    pub fn delete(&self, conn: &Connection) -> Result<()> {
        diesel::delete(self).execute(conn)?;
        Ok(())
    }
}
