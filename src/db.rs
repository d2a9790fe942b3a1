use diesel::{Connection, ConnectionError, PgConnection, QueryResult};
use log::info;
use tokio::sync::Mutex;

/// The one database connection of the process.
///
/// Opened in `main` before the server starts and handed to the services that
/// need it. Statements run one at a time behind the lock. Dropping the last
/// handle closes the connection.
pub struct Database {
    connection: Mutex<PgConnection>,
}

impl Database {
    pub fn establish(database_url: &str) -> Result<Self, ConnectionError> {
        let connection = PgConnection::establish(database_url)?;
        info!("Database connection established");
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub async fn run<T, F>(&self, query: F) -> QueryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> QueryResult<T>,
    {
        let mut connection = self.connection.lock().await;
        query(&mut connection)
    }
}
