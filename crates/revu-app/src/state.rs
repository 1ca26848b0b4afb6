use std::sync::Arc;

use revu_auth::{ConfirmationCodes, TokenManager};
use revu_dal::Pool;

use crate::mailer::Mailer;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

/// The `Garde` extractor validates with the default (empty) garde context,
/// which requires `(): FromRef<AppState>`.
impl axum::extract::FromRef<AppState> for () {
    fn from_ref(_: &AppState) -> Self {}
}

impl AppState {
    pub fn new(
        app_config: AppConfig,
        pool: Pool,
        tokens: TokenManager,
        codes: ConfirmationCodes,
        mailer: Mailer,
    ) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                app_config,
                pool,
                tokens,
                codes,
                mailer,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }

    pub fn codes(&self) -> &ConfirmationCodes {
        &self.state.codes
    }

    pub fn mailer(&self) -> &Mailer {
        &self.state.mailer
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
    tokens: TokenManager,
    codes: ConfirmationCodes,
    mailer: Mailer,
}

pub struct AppConfig {
    pub default_page_size: u32,
}
