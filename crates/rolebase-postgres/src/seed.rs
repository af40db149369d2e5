//! Fixed schema script for roles, permissions and employees.
//!
//! Every statement is idempotent (`IF NOT EXISTS`, `OR REPLACE`, drop then
//! create), so the script can be re-applied to an existing database.

use sqlx::Executor as _;
use tracing::{error, info, instrument};

use crate::{PoolManager, Result, RolebaseError};

/// Schema holding the application tables.
pub const SCHEMA: &str = "user";

/// Tables created by the script, in dependency order.
pub const TABLES: [&str; 4] = ["roles", "permissions", "role_permissions", "employees"];

const CONFIGURE_TIMEZONE: &str = "SET timezone = 'UTC'";

const CREATE_SCHEMAS: [&str; 2] = [
    r#"CREATE SCHEMA IF NOT EXISTS "public""#,
    r#"CREATE SCHEMA IF NOT EXISTS "user""#,
];

const CREATE_TABLE_ROLES: &str = r#"
CREATE TABLE IF NOT EXISTS "user".roles (
    id SERIAL PRIMARY KEY,
    name VARCHAR(50) NOT NULL UNIQUE,
    description TEXT NULL,
    is_active BOOLEAN DEFAULT true,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
)"#;

const CREATE_TABLE_PERMISSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS "user".permissions (
    id SERIAL PRIMARY KEY,
    resource VARCHAR(50) NOT NULL,
    action VARCHAR(50) NOT NULL,
    description TEXT NULL,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW(),
    CONSTRAINT permissions_resource_action_unique UNIQUE (resource, action),
    CONSTRAINT permissions_check CHECK (action IN ('create', 'read', 'update', 'delete'))
)"#;

const CREATE_TABLE_ROLE_PERMISSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS "user".role_permissions (
    id SERIAL PRIMARY KEY,
    permission_id INTEGER NOT NULL,
    role_id INTEGER NOT NULL,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW(),
    CONSTRAINT fk_role_permissions_role
        FOREIGN KEY (role_id) REFERENCES "user".roles(id) ON DELETE CASCADE,
    CONSTRAINT fk_permissions_permission
        FOREIGN KEY (permission_id) REFERENCES "user".permissions(id) ON DELETE CASCADE
)"#;

const CREATE_TABLE_EMPLOYEES: &str = r#"
CREATE TABLE IF NOT EXISTS "user".employees (
    id SERIAL PRIMARY KEY,
    first_name VARCHAR(100) NOT NULL,
    last_name VARCHAR(100) NOT NULL,
    email VARCHAR(150) NOT NULL UNIQUE,
    phone VARCHAR(20) NULL,
    address TEXT,
    is_active BOOL DEFAULT true,
    password VARCHAR(255) NOT NULL,
    role_id INTEGER NOT NULL,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW(),
    CONSTRAINT fk_employee_role
        FOREIGN KEY (role_id) REFERENCES "user".roles(id) ON DELETE CASCADE
)"#;

const CREATE_INDEXES: [&str; 7] = [
    r#"CREATE INDEX IF NOT EXISTS idx_permission_resource ON "user".permissions(resource)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_permission_action ON "user".permissions(action)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_role_permissions_role_id ON "user".role_permissions(role_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_role_permissions_permission ON "user".role_permissions(permission_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_employees_email ON "user".employees(email)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_employees_role_id ON "user".employees(role_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_employees_is_active ON "user".employees(is_active)"#,
];

const CREATE_FUNCTION_UPDATE_UPDATED_AT: &str = r#"
CREATE OR REPLACE FUNCTION public.update_updated_at_column()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = NOW();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql"#;

/// `DROP` + `CREATE` for the `updated_at` trigger on one table.
fn updated_at_trigger(schema: &str, table: &str) -> [String; 2] {
    [
        format!(r#"DROP TRIGGER IF EXISTS trigger_{table}_updated_at ON "{schema}".{table}"#),
        format!(
            r#"CREATE TRIGGER trigger_{table}_updated_at
    BEFORE UPDATE ON "{schema}".{table}
    FOR EACH ROW
    EXECUTE FUNCTION public.update_updated_at_column()"#
        ),
    ]
}

/// The full script, one statement per entry, in execution order.
pub fn statements() -> Vec<String> {
    let mut statements = vec![CONFIGURE_TIMEZONE.to_string()];
    statements.extend(CREATE_SCHEMAS.iter().map(|s| s.to_string()));
    statements.extend(
        [
            CREATE_TABLE_ROLES,
            CREATE_TABLE_PERMISSIONS,
            CREATE_TABLE_ROLE_PERMISSIONS,
            CREATE_TABLE_EMPLOYEES,
        ]
        .iter()
        .map(|s| s.trim().to_string()),
    );
    statements.extend(CREATE_INDEXES.iter().map(|s| s.to_string()));
    statements.push(CREATE_FUNCTION_UPDATE_UPDATED_AT.trim().to_string());
    for table in TABLES {
        statements.extend(updated_at_trigger(SCHEMA, table));
    }
    statements
}

/// Applies the script in one transaction and returns the statement count.
///
/// # Errors
///
/// Returns the first failing statement's error; nothing is applied then.
#[instrument(skip(manager))]
pub async fn run_seeder(manager: &PoolManager) -> Result<usize> {
    let statements = statements();
    let count = statements.len();
    info!(statements = count, "Running schema seeder");

    manager
        .run_in_transaction(move |conn| {
            Box::pin(async move {
                for (index, sql) in statements.iter().enumerate() {
                    (&mut *conn).execute(sql.as_str()).await.map_err(|e| {
                        let err = RolebaseError::from(e);
                        error!(statement = index, error = %err, "Seeder statement failed");
                        err
                    })?;
                }
                Ok::<_, RolebaseError>(count)
            })
        })
        .await?;

    info!(statements = count, "Schema seeded");
    Ok(count)
}
