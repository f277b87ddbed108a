use sea_orm::{ConnectionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, accounts, transactions, users};

use super::Engine;

/// Generates a `require_*_owned` lookup that distinguishes a missing row
/// (`KeyNotFound`) from a row owned by another user (`Unauthorized`).
macro_rules! impl_require_owned {
    ($fn_name:ident, $entity:path, $model:path, $label:literal) => {
        pub(super) async fn $fn_name<C: ConnectionTrait>(
            &self,
            db: &C,
            id: Uuid,
            user_id: &str,
        ) -> ResultEngine<$model> {
            let model = <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(concat!($label, " not exists").to_string()))?;
            if model.user_id != user_id {
                return Err(EngineError::Unauthorized(
                    concat!($label, " belongs to another user").to_string(),
                ));
            }
            Ok(model)
        }
    };
}

impl Engine {
    impl_require_owned!(
        require_account_owned,
        accounts::Entity,
        accounts::Model,
        "account"
    );

    impl_require_owned!(
        require_transaction_owned,
        transactions::Entity,
        transactions::Model,
        "transaction"
    );

    /// Resolve the calling identity to a stored user.
    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        if user_id.trim().is_empty() {
            return Err(EngineError::Unauthorized("missing caller identity".to_string()));
        }
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::Unauthorized("unknown user".to_string()))
    }
}
