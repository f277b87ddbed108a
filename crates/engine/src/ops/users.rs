use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, User, users, util::normalize_optional_text};

use super::{Engine, with_tx};

impl Engine {
    /// Returns the stored user for an identity-provider subject, creating it
    /// on first sight.
    ///
    /// Existing users keep their stored email and name.
    pub async fn ensure_user(
        &self,
        user_id: &str,
        email: &str,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultEngine<User> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(EngineError::Unauthorized("missing caller identity".to_string()));
        }
        let email = email.trim();
        if !email.contains('@') {
            return Err(EngineError::InvalidArgument(format!("invalid email: {email}")));
        }

        with_tx!(self, |db_tx| {
            if let Some(existing) = users::Entity::find_by_id(user_id.to_string())
                .one(&db_tx)
                .await?
            {
                return Ok(User::from(existing));
            }

            let model = users::ActiveModel {
                id: ActiveValue::Set(user_id.to_string()),
                email: ActiveValue::Set(email.to_string()),
                name: ActiveValue::Set(normalize_optional_text(name)),
                created_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(user_id, "registered user");

            Ok(User::from(model))
        })
    }

    pub async fn user(&self, user_id: &str) -> ResultEngine<User> {
        self.require_user(&self.database, user_id)
            .await
            .map(User::from)
    }
}
