use common::Role;
use sea_orm::sea_query::{
    Index, IndexCreateStatement, MysqlQueryBuilder, OnConflict, PostgresQueryBuilder,
    SqliteQueryBuilder,
};
use sea_orm::*;
use tracing::info;

use crate::config::BootstrapAdmin;
use crate::entity::{comment, upload_intent, user};
use crate::models::auth::normalize_email;
use crate::utils::hash;

/// Create the configured admin account unless an admin already exists.
pub async fn seed_bootstrap_admin(
    db: &DatabaseConnection,
    admin: Option<&BootstrapAdmin>,
) -> Result<(), DbErr> {
    let Some(admin) = admin else {
        return Ok(());
    };

    let existing = user::Entity::find()
        .filter(user::Column::Role.eq(Role::Admin))
        .count(db)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let password = hash::hash_password(&admin.password)
        .map_err(|e| DbErr::Custom(format!("Failed to hash bootstrap password: {}", e)))?;
    let now = chrono::Utc::now();
    let model = user::ActiveModel {
        name: Set(admin.name.clone()),
        email: Set(normalize_email(&admin.email)),
        password: Set(password),
        role: Set(Role::Admin),
        department: Set(admin.department.clone()),
        student_id: Set(None),
        supervisor_title: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let result = user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) => info!(email = %admin.email, "Seeded bootstrap admin"),
        Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }
    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: IndexCreateStatement) {
    let sql = match db.get_database_backend() {
        DbBackend::Postgres => stmt.to_string(PostgresQueryBuilder),
        DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        DbBackend::MySql => stmt.to_string(MysqlQueryBuilder),
        _ => stmt.to_string(PostgresQueryBuilder),
    };

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Thread listing: WHERE project_id = ? AND thread = ? ORDER BY created_at
    create_index(
        db,
        "idx_comment_project_thread_created",
        Index::create()
            .if_not_exists()
            .name("idx_comment_project_thread_created")
            .table(comment::Entity)
            .col(comment::Column::ProjectId)
            .col(comment::Column::Thread)
            .col(comment::Column::CreatedAt)
            .to_owned(),
    )
    .await;

    // Reconciler scan: WHERE issued_at < ?
    create_index(
        db,
        "idx_upload_intent_issued",
        Index::create()
            .if_not_exists()
            .name("idx_upload_intent_issued")
            .table(upload_intent::Entity)
            .col(upload_intent::Column::IssuedAt)
            .to_owned(),
    )
    .await;

    Ok(())
}
