//! Message retrieval: by owner, by owner + filter, and the unrestricted
//! admin listing.

use std::sync::Arc;

use courier_db::Database;
use courier_types::models::{MessageFilter, MessageRecord, User};

use crate::error::DispatchError;
use crate::quota::run_blocking;
use crate::records::assemble_messages;

#[derive(Clone)]
pub struct MessageQueryService {
    db: Arc<Database>,
}

impl MessageQueryService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn messages_for_owner(
        &self,
        user: &User,
        filter: MessageFilter,
    ) -> Result<Vec<MessageRecord>, DispatchError> {
        self.load(Some(user.id.to_string()), filter).await
    }

    pub async fn all_messages(
        &self,
        filter: MessageFilter,
    ) -> Result<Vec<MessageRecord>, DispatchError> {
        self.load(None, filter).await
    }

    /// Lifetime total for one user, independent of the daily counter.
    pub async fn count_by_owner(&self, user: &User) -> Result<i64, DispatchError> {
        let db = self.db.clone();
        let user_id = user.id.to_string();
        run_blocking(move || db.count_messages_by_user(&user_id)).await
    }

    async fn load(
        &self,
        owner: Option<String>,
        filter: MessageFilter,
    ) -> Result<Vec<MessageRecord>, DispatchError> {
        let db = self.db.clone();
        let (messages, deliveries) = run_blocking(move || {
            let messages = db.get_messages(owner.as_deref(), &filter)?;
            let ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
            let deliveries = db.get_deliveries_for_messages(&ids)?;
            Ok((messages, deliveries))
        })
        .await?;

        Ok(assemble_messages(messages, deliveries))
    }
}
