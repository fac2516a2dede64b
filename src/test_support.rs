//! 测试夹具：内存数据库上装配完整的 AppState

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Method, Request};
use uuid::Uuid;

use crate::application::commands::{AddClinicMember, CreateClinic, CreatePatient, Register};
use crate::application::ports::{PatientRecord, RefreshTokenRepositoryPort, UserRecord};
use crate::application::Actor;
use crate::domain::patient::Species;
use crate::domain::ClinicRole;
use crate::infrastructure::adapters::{BcryptPasswordHasher, JwtConfig, JwtTokenService};
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::http::{AppPorts, AppState, HttpServer, ServerConfig};
use crate::infrastructure::memory::{InMemoryRateLimiter, RateLimitConfig};
use crate::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteAppointmentRepository,
    SqliteClinicAccessRepository, SqliteClinicRepository, SqliteDashboardRepository,
    SqliteInvoiceRepository, SqliteMedicalRecordRepository, SqlitePatientRepository,
    SqliteProductRepository, SqliteRefreshTokenRepository, SqliteUserRepository,
};

pub const TEST_PASSWORD: &str = "s3cretpass";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub publisher: Arc<EventPublisher>,
    pub refresh_repo: Arc<dyn RefreshTokenRepositoryPort>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_rate_limit(RateLimitConfig::default()).await
    }

    pub async fn with_rate_limit(rate_limit: RateLimitConfig) -> Self {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let refresh_repo: Arc<dyn RefreshTokenRepositoryPort> =
            Arc::new(SqliteRefreshTokenRepository::new(pool.clone()));
        let tokens = Arc::new(JwtTokenService::new(&JwtConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 7 * 24 * 3600,
        }));

        let ports = AppPorts {
            user_repo: Arc::new(SqliteUserRepository::new(pool.clone())),
            refresh_repo: refresh_repo.clone(),
            clinic_repo: Arc::new(SqliteClinicRepository::new(pool.clone())),
            access_repo: Arc::new(SqliteClinicAccessRepository::new(pool.clone())),
            patient_repo: Arc::new(SqlitePatientRepository::new(pool.clone())),
            appointment_repo: Arc::new(SqliteAppointmentRepository::new(pool.clone())),
            record_repo: Arc::new(SqliteMedicalRecordRepository::new(pool.clone())),
            invoice_repo: Arc::new(SqliteInvoiceRepository::new(pool.clone())),
            product_repo: Arc::new(SqliteProductRepository::new(pool.clone())),
            dashboard_repo: Arc::new(SqliteDashboardRepository::new(pool.clone())),
            tokens,
            // 最低 cost，测试不关心哈希强度
            hasher: Arc::new(BcryptPasswordHasher::new(4)),
            identity: None,
        };

        let publisher = Arc::new(EventPublisher::new());
        let rate_limiter = Arc::new(InMemoryRateLimiter::new(rate_limit));
        let state = Arc::new(AppState::new(ports, publisher.clone(), rate_limiter));

        Self {
            state,
            publisher,
            refresh_repo,
        }
    }

    /// 带全部中间件的 Router
    pub fn router(&self) -> Router {
        HttpServer::new(ServerConfig::default(), self.state.clone()).router()
    }

    /// 注册用户，密码为 TEST_PASSWORD
    pub async fn user(&self, email: &str) -> UserRecord {
        self.session(email).await.user
    }

    /// 注册用户并返回访问令牌
    pub async fn access_token(&self, email: &str) -> (UserRecord, String) {
        let session = self.session(email).await;
        (session.user, session.access_token)
    }

    async fn session(
        &self,
        email: &str,
    ) -> crate::application::commands::handlers::AuthSession {
        self.state
            .register_handler
            .handle(Register {
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                phone: None,
            })
            .await
            .unwrap()
    }

    pub async fn clinic(&self, owner_id: Uuid) -> Uuid {
        self.state
            .create_clinic_handler
            .handle(CreateClinic {
                owner_id,
                name: "Happy Paws".to_string(),
                address: None,
                phone: None,
                email: None,
            })
            .await
            .unwrap()
            .clinic
            .id
    }

    pub async fn member(&self, clinic_id: Uuid, owner_id: Uuid, email: &str, role: ClinicRole) {
        self.state
            .add_clinic_member_handler
            .handle(AddClinicMember {
                actor: Actor::new(owner_id, clinic_id),
                email: email.to_string(),
                role,
            })
            .await
            .unwrap();
    }

    pub async fn patient(&self, actor: Actor, name: &str) -> PatientRecord {
        self.state
            .create_patient_handler
            .handle(create_patient_cmd(actor, name))
            .await
            .unwrap()
    }
}

pub fn create_patient_cmd(actor: Actor, name: &str) -> CreatePatient {
    CreatePatient {
        actor,
        name: name.to_string(),
        species: Species::Dog,
        breed: Some("Beagle".to_string()),
        sex: None,
        birth_date: None,
        weight_kg: Some(12.5),
        microchip_id: None,
        color: None,
        owner_name: "Ann Smith".to_string(),
        owner_phone: Some("+1 555 0100".to_string()),
        owner_email: None,
        notes: None,
    }
}

/// 构造 JSON 请求，token 为 None 时不带 Authorization
pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
