//! 仓储测试公共夹具

use chrono::Utc;
use uuid::Uuid;

use super::{create_pool, run_migrations, DatabaseConfig, DbPool};
use super::{SqliteClinicRepository, SqlitePatientRepository, SqliteUserRepository};
use crate::application::ports::{
    ClinicAccessRecord, ClinicRecord, ClinicRepositoryPort, PatientRecord, PatientRepositoryPort,
    UserRecord, UserRepositoryPort,
};
use crate::domain::patient::{Sex, Species};
use crate::domain::ClinicRole;

pub(crate) async fn memory_pool() -> DbPool {
    let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

pub(crate) async fn seed_user(pool: &DbPool, email: &str) -> Uuid {
    let now = Utc::now();
    let user = UserRecord {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: Some("hash".to_string()),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        phone: None,
        google_id: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    SqliteUserRepository::new(pool.clone())
        .insert(&user)
        .await
        .unwrap();
    user.id
}

pub(crate) async fn seed_clinic(pool: &DbPool, owner: Uuid) -> Uuid {
    let now = Utc::now();
    let clinic = ClinicRecord {
        id: Uuid::new_v4(),
        name: "Happy Paws".to_string(),
        address: None,
        phone: None,
        email: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let access = ClinicAccessRecord {
        id: Uuid::new_v4(),
        user_id: owner,
        clinic_id: clinic.id,
        role: ClinicRole::Owner,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    SqliteClinicRepository::new(pool.clone())
        .create_with_owner(&clinic, &access)
        .await
        .unwrap();
    clinic.id
}

pub(crate) fn patient(clinic_id: Uuid, name: &str, owner: &str) -> PatientRecord {
    let now = Utc::now();
    PatientRecord {
        id: Uuid::new_v4(),
        clinic_id,
        name: name.to_string(),
        species: Species::Dog,
        breed: None,
        sex: Sex::Unknown,
        birth_date: None,
        weight_kg: Some(12.5),
        microchip_id: None,
        color: None,
        owner_name: owner.to_string(),
        owner_phone: None,
        owner_email: None,
        notes: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) async fn seed_patient(pool: &DbPool, clinic_id: Uuid, name: &str) -> PatientRecord {
    let record = patient(clinic_id, name, "Ann Smith");
    SqlitePatientRepository::new(pool.clone())
        .insert(&record)
        .await
        .unwrap();
    record
}
