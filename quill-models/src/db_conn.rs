use crate::{Connection, CONFIG};
use diesel::r2d2::{
    ConnectionManager, CustomizeConnection, Error as ConnError, Pool, PooledConnection,
};
use std::ops::Deref;

pub type DbPool = Pool<ConnectionManager<Connection>>;

/// A single connection taken from the managed pool.
pub struct DbConn(pub PooledConnection<ConnectionManager<Connection>>);

// For the convenience of using an &DbConn as an &Connection.
impl Deref for DbConn {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// SQLite does not enforce foreign keys unless asked to on each
/// connection, so every pooled connection gets the pragma.
#[derive(Debug)]
pub struct PragmaForeignKey;

impl CustomizeConnection<Connection, ConnError> for PragmaForeignKey {
    fn on_acquire(&self, _conn: &mut Connection) -> std::result::Result<(), ConnError> {
        #[cfg(feature = "sqlite")]
        {
            use diesel::connection::SimpleConnection;
            _conn
                .batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 2000;")
                .map_err(ConnError::QueryError)?;
        }
        Ok(())
    }
}

pub fn init_pool() -> Option<DbPool> {
    let manager = ConnectionManager::<Connection>::new(CONFIG.database_url.as_str());
    let mut builder = DbPool::builder().connection_customizer(Box::new(PragmaForeignKey));
    if let Some(max_size) = CONFIG.db_max_size {
        builder = builder.max_size(max_size);
    }
    builder.build(manager).ok()
}
