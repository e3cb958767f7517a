use diesel::ConnectionResult;
use diesel::prelude::*;

pub mod schema;

/// Synchronous connection, used for running migrations at startup. Request
/// handlers go through the async pool instead.
pub fn establish_connection(db_url: &str) -> ConnectionResult<PgConnection> {
    PgConnection::establish(db_url)
}
