//! Admin moderation: bans, prompt suspensions and the audit trail.

use db::{
    DBService,
    models::{
        admin_action::{AdminAction, AdminActionKind},
        prompt::{Prompt, PromptStatus},
        user::User,
    },
};
use thiserror::Error;
use tracing::info;
use utils::pagination::{PageQuery, Paged};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user not found")]
    UserNotFound,
    #[error("prompt not found")]
    PromptNotFound,
    #[error("prompt is not suspended")]
    NotSuspended,
    #[error("prompt is not published")]
    NotPublished,
}

#[derive(Clone)]
pub struct ModerationService {
    db: DBService,
}

impl ModerationService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub async fn ban_user(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        note: Option<&str>,
    ) -> Result<(), ModerationError> {
        let mut tx = self.db.pool.begin().await?;
        if User::set_banned(&mut *tx, user_id, true).await? == 0 {
            return Err(ModerationError::UserNotFound);
        }
        AdminAction::record(&mut *tx, admin_id, AdminActionKind::BanUser, user_id, note).await?;
        tx.commit().await?;

        info!(admin_id = %admin_id, user_id = %user_id, "user banned");
        Ok(())
    }

    pub async fn unban_user(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        note: Option<&str>,
    ) -> Result<(), ModerationError> {
        let mut tx = self.db.pool.begin().await?;
        if User::set_banned(&mut *tx, user_id, false).await? == 0 {
            return Err(ModerationError::UserNotFound);
        }
        AdminAction::record(&mut *tx, admin_id, AdminActionKind::UnbanUser, user_id, note).await?;
        tx.commit().await?;

        info!(admin_id = %admin_id, user_id = %user_id, "user unbanned");
        Ok(())
    }

    /// Pull a published prompt from the storefront.
    pub async fn suspend_prompt(
        &self,
        admin_id: Uuid,
        prompt_id: Uuid,
        note: Option<&str>,
    ) -> Result<(), ModerationError> {
        let prompt = Prompt::find_by_id(&self.db.pool, prompt_id)
            .await?
            .ok_or(ModerationError::PromptNotFound)?;
        if prompt.status != PromptStatus::Published {
            return Err(ModerationError::NotPublished);
        }

        let mut tx = self.db.pool.begin().await?;
        Prompt::update_status(&mut *tx, prompt.id, PromptStatus::Suspended).await?;
        AdminAction::record(
            &mut *tx,
            admin_id,
            AdminActionKind::SuspendPrompt,
            prompt.id,
            note,
        )
        .await?;
        tx.commit().await?;

        info!(admin_id = %admin_id, prompt_id = %prompt_id, "prompt suspended");
        Ok(())
    }

    pub async fn restore_prompt(
        &self,
        admin_id: Uuid,
        prompt_id: Uuid,
        note: Option<&str>,
    ) -> Result<(), ModerationError> {
        let prompt = Prompt::find_by_id(&self.db.pool, prompt_id)
            .await?
            .ok_or(ModerationError::PromptNotFound)?;
        if prompt.status != PromptStatus::Suspended {
            return Err(ModerationError::NotSuspended);
        }

        let mut tx = self.db.pool.begin().await?;
        Prompt::update_status(&mut *tx, prompt.id, PromptStatus::Published).await?;
        AdminAction::record(
            &mut *tx,
            admin_id,
            AdminActionKind::RestorePrompt,
            prompt.id,
            note,
        )
        .await?;
        tx.commit().await?;

        info!(admin_id = %admin_id, prompt_id = %prompt_id, "prompt restored");
        Ok(())
    }

    pub async fn audit_log(&self, page: &PageQuery) -> Result<Paged<AdminAction>, ModerationError> {
        let actions = AdminAction::list(&self.db.pool, page.per_page(), page.offset()).await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admin_actions")
            .fetch_one(&self.db.pool)
            .await?;
        Ok(Paged::new(actions, page, total))
    }

    pub async fn list_users(&self, page: &PageQuery) -> Result<Paged<User>, ModerationError> {
        let users = User::list(&self.db.pool, page.per_page(), page.offset()).await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db.pool)
            .await?;
        Ok(Paged::new(users, page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_ban_and_unban_write_audit_rows() {
        let db = test_db().await;
        let admin = create_admin(&db, "admin@test.com").await;
        let target = create_user(&db, "target@test.com").await;

        let moderation = ModerationService::new(db.clone());
        moderation
            .ban_user(admin.id, target.id, Some("spam"))
            .await
            .unwrap();

        let banned = User::find_by_id(&db.pool, target.id).await.unwrap().unwrap();
        assert!(banned.banned);

        moderation.unban_user(admin.id, target.id, None).await.unwrap();
        let unbanned = User::find_by_id(&db.pool, target.id).await.unwrap().unwrap();
        assert!(!unbanned.banned);

        let log = moderation.audit_log(&PageQuery::default()).await.unwrap();
        assert_eq!(log.total, 2);
        assert!(
            log.items
                .iter()
                .any(|a| a.action == AdminActionKind::BanUser && a.target_id == target.id)
        );
    }

    #[tokio::test]
    async fn test_ban_unknown_user_fails_without_audit_row() {
        let db = test_db().await;
        let admin = create_admin(&db, "admin@test.com").await;

        let moderation = ModerationService::new(db);
        assert!(matches!(
            moderation.ban_user(admin.id, Uuid::new_v4(), None).await,
            Err(ModerationError::UserNotFound)
        ));

        let log = moderation.audit_log(&PageQuery::default()).await.unwrap();
        assert_eq!(log.total, 0);
    }

    #[tokio::test]
    async fn test_suspend_restore_prompt() {
        let db = test_db().await;
        let admin = create_admin(&db, "admin@test.com").await;
        let seller = create_seller(&db, "seller@test.com").await;
        let prompt = published_prompt(&db, &seller, "Bad Prompt", 1000).await;

        let moderation = ModerationService::new(db.clone());
        moderation
            .suspend_prompt(admin.id, prompt.id, Some("reported"))
            .await
            .unwrap();

        let suspended = Prompt::find_by_id(&db.pool, prompt.id).await.unwrap().unwrap();
        assert_eq!(suspended.status, PromptStatus::Suspended);

        // Suspending again is rejected.
        assert!(matches!(
            moderation.suspend_prompt(admin.id, prompt.id, None).await,
            Err(ModerationError::NotPublished)
        ));

        moderation.restore_prompt(admin.id, prompt.id, None).await.unwrap();
        let restored = Prompt::find_by_id(&db.pool, prompt.id).await.unwrap().unwrap();
        assert_eq!(restored.status, PromptStatus::Published);
    }
}
