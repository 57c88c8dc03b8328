#![allow(clippy::new_ret_no_self)]

#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type Connection = diesel::SqliteConnection;

#[cfg(all(not(feature = "sqlite"), feature = "postgres"))]
pub type Connection = diesel::PgConnection;

/// All the possible errors that can be encountered in this crate.
#[derive(Debug)]
pub enum Error {
    Db(diesel::result::Error),
    Io(std::io::Error),
    Migration(diesel_migrations::RunMigrationsError),
    NotFound,
    InvalidValue,
    SlugAlreadyExists,
    UserAlreadyExists,
    WeakPassword(users::PasswordError),
    Forbidden(admin::Denial),
    NoRecipients,
    DeliveryFailed(newsletter::DeliveryReport),
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Error::NotFound,
            _ => Error::Db(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<diesel_migrations::RunMigrationsError> for Error {
    fn from(err: diesel_migrations::RunMigrationsError) -> Self {
        Error::Migration(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Adds a function to a model, that returns the first
/// matching row for a given list of columns.
///
/// Usage: `find_by!(model_table, name_of_the_function, column1 as String, column2 as i32);`
macro_rules! find_by {
    ($table:ident, $fn:ident, $($col:ident as $type:ty),+) => {
        pub fn $fn(conn: &crate::Connection, $($col: $type),+) -> Result<Self> {
            $table::table
                $(.filter($table::$col.eq($col)))+
                .first(conn)
                .map_err(Error::from)
        }
    };
}

/// List all rows of a model, with constraints.
///
/// Usage: `list_by!(model_table, name_of_the_function, column1 as String);`
macro_rules! list_by {
    ($table:ident, $fn:ident, $($col:ident as $type:ty),+) => {
        pub fn $fn(conn: &crate::Connection, $($col: $type),+) -> Result<Vec<Self>> {
            $table::table
                $(.filter($table::$col.eq($col)))+
                .load::<Self>(conn)
                .map_err(Error::from)
        }
    };
}

/// Adds a function to a model to retrieve a row by its ID
///
/// Usage: `get!(model_table);`
macro_rules! get {
    ($table:ident) => {
        pub fn get(conn: &crate::Connection, id: i32) -> Result<Self> {
            $table::table
                .filter($table::id.eq(id))
                .first(conn)
                .map_err(Error::from)
        }
    };
}

/// Adds a function to a model to insert a new row
///
/// Usage: `insert!(model_table, NewModelType);`
macro_rules! insert {
    ($table:ident, $from:ty) => {
        last!($table);
        pub fn insert(conn: &crate::Connection, new: $from) -> Result<Self> {
            diesel::insert_into($table::table)
                .values(new)
                .execute(conn)?;
            Self::last(conn)
        }
    };
}

/// Returns the last row of a table.
///
/// Usage: `last!(model_table);`
macro_rules! last {
    ($table:ident) => {
        pub fn last(conn: &crate::Connection) -> Result<Self> {
            $table::table
                .order_by($table::id.desc())
                .first(conn)
                .map_err(Error::from)
        }
    };
}

pub const ITEMS_PER_PAGE: i32 = 6;

pub use config::CONFIG;

pub mod admin;
pub mod analytics;
pub mod comments;
pub mod config;
pub mod db_conn;
pub mod mail;
pub mod medias;
pub mod migrations;
pub mod newsletter;
pub mod post_tags;
pub mod posts;
pub mod safe_string;
pub mod schema;
pub mod subscribers;
pub mod tags;
pub mod users;

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        db_conn::{DbConn, DbPool, PragmaForeignKey},
        migrations, Connection as Conn, CONFIG,
    };
    use diesel::r2d2::ConnectionManager;

    // The connection pool is shared by all tests, with a single
    // connection so that concurrent test transactions serialize.
    lazy_static! {
        static ref DB_POOL: DbPool = {
            let pool = DbPool::builder()
                .max_size(1)
                .connection_customizer(Box::new(PragmaForeignKey))
                .build(ConnectionManager::<Conn>::new(CONFIG.database_url.as_str()))
                .unwrap();
            migrations::run(&pool.get().unwrap()).expect("Migrations error");
            pool
        };
    }

    pub fn db() -> DbConn {
        DbConn(DB_POOL.get().unwrap())
    }
}
