//! SQLite Database - 数据库连接和迁移

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

/// 数据库配置
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 连接串，例如 sqlite:data/vetclinic.db?mode=rwc
    pub database_url: String,
    /// 最大连接数
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/vetclinic.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn new(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections,
        }
    }

    /// 内存数据库（测试用），单连接保证所有查询看到同一个库
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

/// 数据库连接池
pub type DbPool = Pool<Sqlite>;

/// 创建数据库连接池
///
/// PRAGMA 通过连接选项设置，对池中每个连接都生效
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000))
        .synchronous(SqliteSynchronous::Normal);

    let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
    if config.is_in_memory() {
        // 连接被回收时内存库会丢失
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await?;

    tracing::info!(
        max_connections = config.max_connections,
        "SQLite pool created with WAL mode, foreign keys and busy_timeout=5000ms"
    );

    Ok(pool)
}

/// 运行数据库迁移
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!(statements = SCHEMA.len(), "Database migrations completed");
    Ok(())
}

const SCHEMA: &[&str] = &[
    // 用户
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        phone TEXT,
        google_id TEXT UNIQUE,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    // refresh token（按 jti 登记，可吊销）
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        revoked_at TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user_id
    ON refresh_tokens(user_id)
    "#,
    // 诊所
    r#"
    CREATE TABLE IF NOT EXISTS clinics (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        address TEXT,
        phone TEXT,
        email TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    // 用户在诊所内的角色
    r#"
    CREATE TABLE IF NOT EXISTS clinic_access (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        clinic_id TEXT NOT NULL,
        role TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id),
        FOREIGN KEY (clinic_id) REFERENCES clinics(id),
        UNIQUE (user_id, clinic_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_clinic_access_clinic_id
    ON clinic_access(clinic_id)
    "#,
    // 患者
    r#"
    CREATE TABLE IF NOT EXISTS patients (
        id TEXT PRIMARY KEY,
        clinic_id TEXT NOT NULL,
        name TEXT NOT NULL,
        species TEXT NOT NULL,
        breed TEXT,
        sex TEXT NOT NULL DEFAULT 'UNKNOWN',
        birth_date TEXT,
        weight_kg REAL,
        microchip_id TEXT,
        color TEXT,
        owner_name TEXT NOT NULL,
        owner_phone TEXT,
        owner_email TEXT,
        notes TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (clinic_id) REFERENCES clinics(id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_patients_clinic_id
    ON patients(clinic_id, is_active)
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_patients_active_microchip
    ON patients(clinic_id, microchip_id)
    WHERE is_active = 1 AND microchip_id IS NOT NULL
    "#,
    // 预约
    r#"
    CREATE TABLE IF NOT EXISTS appointments (
        id TEXT PRIMARY KEY,
        clinic_id TEXT NOT NULL,
        patient_id TEXT NOT NULL,
        veterinarian_id TEXT NOT NULL,
        date TEXT NOT NULL,
        start_time TEXT NOT NULL,
        duration_minutes INTEGER NOT NULL,
        reason TEXT,
        notes TEXT,
        status TEXT NOT NULL DEFAULT 'SCHEDULED',
        is_active INTEGER NOT NULL DEFAULT 1,
        created_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (clinic_id) REFERENCES clinics(id),
        FOREIGN KEY (patient_id) REFERENCES patients(id),
        FOREIGN KEY (veterinarian_id) REFERENCES users(id)
    )
    "#,
    // 冲突检查按 (诊所, 兽医, 日期) 查询
    r#"
    CREATE INDEX IF NOT EXISTS idx_appointments_schedule
    ON appointments(clinic_id, veterinarian_id, date)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_appointments_clinic_date
    ON appointments(clinic_id, date)
    "#,
    // 病历
    r#"
    CREATE TABLE IF NOT EXISTS medical_records (
        id TEXT PRIMARY KEY,
        clinic_id TEXT NOT NULL,
        patient_id TEXT NOT NULL,
        veterinarian_id TEXT NOT NULL,
        appointment_id TEXT,
        visit_date TEXT NOT NULL,
        chief_complaint TEXT NOT NULL,
        diagnosis TEXT,
        treatment TEXT,
        prescriptions TEXT,
        weight_kg REAL,
        temperature_c REAL,
        notes TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (clinic_id) REFERENCES clinics(id),
        FOREIGN KEY (patient_id) REFERENCES patients(id),
        FOREIGN KEY (veterinarian_id) REFERENCES users(id),
        FOREIGN KEY (appointment_id) REFERENCES appointments(id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_medical_records_patient
    ON medical_records(clinic_id, patient_id)
    "#,
    // 发票
    r#"
    CREATE TABLE IF NOT EXISTS invoices (
        id TEXT PRIMARY KEY,
        clinic_id TEXT NOT NULL,
        patient_id TEXT,
        invoice_number TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'DRAFT',
        subtotal_cents INTEGER NOT NULL,
        tax_rate_bp INTEGER NOT NULL,
        tax_cents INTEGER NOT NULL,
        discount_cents INTEGER NOT NULL,
        total_cents INTEGER NOT NULL,
        due_date TEXT,
        notes TEXT,
        issued_at TEXT,
        paid_at TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (clinic_id) REFERENCES clinics(id),
        FOREIGN KEY (patient_id) REFERENCES patients(id),
        UNIQUE (clinic_id, invoice_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS invoice_items (
        invoice_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        description TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        unit_price_cents INTEGER NOT NULL,
        product_id TEXT,
        PRIMARY KEY (invoice_id, position),
        FOREIGN KEY (invoice_id) REFERENCES invoices(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id TEXT PRIMARY KEY,
        invoice_id TEXT NOT NULL,
        clinic_id TEXT NOT NULL,
        amount_cents INTEGER NOT NULL,
        method TEXT NOT NULL,
        reference TEXT,
        paid_at TEXT NOT NULL,
        recorded_by TEXT NOT NULL,
        FOREIGN KEY (invoice_id) REFERENCES invoices(id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_payments_invoice_id
    ON payments(invoice_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_payments_clinic_paid_at
    ON payments(clinic_id, paid_at)
    "#,
    // 产品与库存流水
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        clinic_id TEXT NOT NULL,
        name TEXT NOT NULL,
        sku TEXT,
        category TEXT NOT NULL,
        description TEXT,
        unit TEXT NOT NULL DEFAULT 'unit',
        price_cents INTEGER NOT NULL,
        cost_cents INTEGER,
        stock_quantity INTEGER NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0),
        min_stock INTEGER NOT NULL DEFAULT 0 CHECK (min_stock >= 0),
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (clinic_id) REFERENCES clinics(id)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_products_active_sku
    ON products(clinic_id, sku)
    WHERE is_active = 1 AND sku IS NOT NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_movements (
        id TEXT PRIMARY KEY,
        product_id TEXT NOT NULL,
        clinic_id TEXT NOT NULL,
        delta INTEGER NOT NULL,
        quantity_after INTEGER NOT NULL,
        reason TEXT,
        created_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (product_id) REFERENCES products(id)
    )
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_db() {
        let config = DatabaseConfig::in_memory();
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        // 迁移可重复执行
        run_migrations(&pool).await.unwrap();

        let (fk,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fk, 1);
    }
}
