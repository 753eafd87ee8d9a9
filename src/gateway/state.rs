use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::Database;
use crate::fx::FxService;
use crate::wallet::WalletService;

/// Shared application state for the gateway
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthService>,
    pub fx: Arc<FxService>,
    pub wallets: Arc<WalletService>,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        auth: Arc<AuthService>,
        fx: Arc<FxService>,
        wallets: Arc<WalletService>,
    ) -> Self {
        Self {
            db,
            auth,
            fx,
            wallets,
        }
    }
}
