use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use seatdesk_api::{build_router, state::AppState};
use seatdesk_config::{
    AppSettings, DatabaseSettings, JwtSettings, LicensingSettings, Settings, StorageBackend,
};
use seatdesk_services::{
    AuthService, MemoryStore,
    notify::{InvitationLetter, InvitationNotifier},
};
use tokio::net::TcpListener;

pub const TEST_CMS_KEY: &str = "test-cms-key";

/// Keeps every letter the app sends so tests can read the tokens back.
#[derive(Debug, Default, Clone)]
pub struct Outbox {
    letters: Arc<Mutex<Vec<InvitationLetter>>>,
}

impl Outbox {
    pub fn last_for(&self, email: &str) -> Option<InvitationLetter> {
        self.letters
            .lock()
            .iter()
            .rev()
            .find(|l| l.invitation.email == email)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.letters.lock().len()
    }
}

#[async_trait]
impl InvitationNotifier for Outbox {
    async fn send(&self, letter: &InvitationLetter) -> anyhow::Result<()> {
        self.letters.lock().push(letter.clone());
        Ok(())
    }
}

/// A running test application backed by its own in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub store: MemoryStore,
    pub outbox: Outbox,
    pub settings: Settings,
    pub auth: AuthService,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn a new test server. Each call gets a fresh store, so tests
    /// never see each other's rows.
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(|_| {}).await
    }

    /// Spawn a test server with customized settings.
    ///
    /// The `mutator` closure receives a `&mut Settings` after defaults are applied.
    pub async fn spawn_with_settings(mutator: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = test_settings();
        mutator(&mut settings);

        let store = MemoryStore::new();
        let outbox = Outbox::default();
        let app_state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(outbox.clone()),
            settings.clone(),
        );
        let app = build_router(app_state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            base_url,
            auth: AuthService::new(settings.jwt.clone()),
            store,
            outbox,
            settings,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Bearer token for an admin of `team_id`.
    pub fn admin_token(&self, admin_id: &str, team_id: &str) -> String {
        self.auth
            .issue_token(admin_id, team_id, false, chrono::Duration::hours(1))
            .expect("Failed to issue admin token")
    }
}

pub fn test_settings() -> Settings {
    Settings {
        app: AppSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
        },
        database: DatabaseSettings {
            backend: StorageBackend::Memory,
            url: String::new(),
            name: "seatdesk_test".to_string(),
            max_pool_size: None,
            min_pool_size: None,
        },
        jwt: JwtSettings {
            secret: "test-secret-key-for-integration-tests".to_string(),
            issuer: "seatdesk-test".to_string(),
        },
        licensing: LicensingSettings {
            max_workers: 4,
            invitation_expiration_days: 7,
            site_base_url: "https://seatdesk.test".to_string(),
            cms_api_key: TEST_CMS_KEY.to_string(),
        },
    }
}
