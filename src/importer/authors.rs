//! Author phase
//!
//! Channel-level `wp:author` declarations become users in the target store,
//! deduplicated by email. Declarations without an email get a placeholder
//! address derived from the login, so re-importing the same document still
//! finds the user it created the first time.

use super::{Importable, PhaseContext};
use crate::error::Result;
use crate::resolver::MapKind;
use crate::store::NewUser;
use crate::types::{RecordKind, TargetId};
use crate::wxr::AuthorRecord;
use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Placeholder address for source users whose export carries no email
///
/// The domain is undeliverable; these users must never receive mail until
/// a real address is set.
pub(super) fn placeholder_email(login: &str) -> String {
    format!("{login}@imported.placeholder")
}

/// Random credential for created users; imported accounts start without a
/// usable password and go through a reset flow instead.
pub(super) fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[async_trait]
impl Importable for AuthorRecord {
    const KIND: RecordKind = RecordKind::Author;

    fn natural_key(&self) -> String {
        if self.email.is_empty() {
            placeholder_email(&self.login)
        } else {
            self.email.clone()
        }
    }

    fn describe(&self) -> &str {
        &self.login
    }

    async fn find_existing(&self, ctx: &PhaseContext<'_>, key: &str) -> Result<Option<TargetId>> {
        let user = ctx.store.get_user_by_email(key).await?;
        Ok(user.map(|u| TargetId::new(u.id)))
    }

    async fn create(&self, ctx: &PhaseContext<'_>, key: &str) -> Result<TargetId> {
        let display_name = if self.display_name.is_empty() {
            self.login.clone()
        } else {
            self.display_name.clone()
        };
        ctx.store
            .insert_user(&NewUser {
                email: key.to_string(),
                login: self.login.clone(),
                display_name,
                password: random_password(),
                role: "author".to_string(),
                // Imported users skip email verification
                email_verified: true,
            })
            .await
    }

    async fn record_mapping(&self, ctx: &PhaseContext<'_>, _key: &str, id: TargetId) {
        // Posts reference authors by login, not by email
        ctx.resolver
            .record(MapKind::Users, self.login.clone(), id)
            .await;
    }
}
