use std::sync::Arc;

use diesel::prelude::*;
use eyre::Result;

use crate::db::Database;
use crate::models::User;

pub trait UserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl UserStore for UserService {
    async fn find_user_by_email(&self, user_email: &str) -> Result<Option<User>> {
        use crate::schema::users::dsl::*;

        Ok(self
            .db
            .run(|connection| {
                users
                    .filter(email.eq(user_email))
                    .select(User::as_select())
                    .first(connection)
                    .optional()
            })
            .await?)
    }
}
