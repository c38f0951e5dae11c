use seatdesk_config::Settings;
use seatdesk_services::{
    AuthService, InvitationNotifier, Licensing,
    dao::Store,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub licensing: Licensing,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn InvitationNotifier>,
        settings: Settings,
    ) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let licensing = Licensing::new(store, notifier, &settings.licensing);

        Self {
            settings,
            auth,
            licensing,
        }
    }
}
