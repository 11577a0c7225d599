//! Domain layer: entities, lifecycle rules and the ports they are stored
//! and observed through.

pub mod admin_number;
pub mod commit;
pub mod deal;
pub mod event;
pub mod kyc;
pub mod order;
pub mod otp;
pub mod payment;
pub mod ports;
pub mod wallet;

use uuid::Uuid;

use crate::error::{MarketError, Result};

/// Authenticated caller identity, supplied per request by the hosting
/// service's auth boundary. The core trusts `is_admin` for admin-only
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(MarketError::Unauthorized(
                "operation requires admin privileges".to_string(),
            ))
        }
    }
}
