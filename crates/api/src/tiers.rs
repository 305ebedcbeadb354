//! Effective tier of a caller and the gating decision built on it.

use atelier_core::tier::Tier;
use atelier_core::types::DbId;
use atelier_db::repositories::LicenseRepo;
use atelier_db::DbPool;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;

/// Tier of the user's active, unexpired license; `free` without one.
pub async fn effective_tier(pool: &DbPool, user_id: DbId) -> AppResult<Tier> {
    let tier = match LicenseRepo::find_active_for_user(pool, user_id).await? {
        Some(license) => Tier::parse(&license.tier)?,
        None => Tier::Free,
    };
    Ok(tier)
}

/// What a caller may see of tier-gated content.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub tier: Tier,
    /// Admins read everything regardless of license.
    pub is_admin: bool,
}

impl Viewer {
    pub const ANONYMOUS: Viewer = Viewer {
        tier: Tier::Free,
        is_admin: false,
    };

    pub async fn resolve(pool: &DbPool, user: Option<&AuthUser>) -> AppResult<Self> {
        match user {
            None => Ok(Self::ANONYMOUS),
            Some(user) => Ok(Viewer {
                tier: effective_tier(pool, user.user_id).await?,
                is_admin: user.is_admin(),
            }),
        }
    }

    pub fn can_read(&self, required: Tier) -> bool {
        self.is_admin || self.tier.can_access(required)
    }
}
