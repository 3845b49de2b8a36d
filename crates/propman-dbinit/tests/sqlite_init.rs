//! End-to-end runs against an in-memory SQLite database.

use std::fs;

use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use tempfile::TempDir;

use propman_dbinit::prelude::*;

struct Sqlite(SqliteConnection);

impl SqlExecutor for Sqlite {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        sqlx::raw_sql(sql).execute(&mut self.0).await?;
        Ok(())
    }
}

async fn memory_db() -> Sqlite {
    Sqlite(
        SqliteConnection::connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory SQLite"),
    )
}

fn write(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

const TABLES: &str = "\
CREATE TABLE properties (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    website TEXT,
    room_count INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE rooms (
    id INTEGER PRIMARY KEY,
    property_id INTEGER NOT NULL REFERENCES properties(id),
    label TEXT
);
";

const TRIGGERS: &str = "\
DELIMITER //
CREATE TRIGGER rooms_count AFTER INSERT ON rooms
FOR EACH ROW
BEGIN
    UPDATE properties SET room_count = room_count + 1 WHERE id = NEW.property_id;
END //
DELIMITER ;
";

const DEMO_DATA: &str = "\
INSERT INTO properties (id, name, website) VALUES (1, 'Green PG', 'https://green.example.com//home');
INSERT INTO rooms (property_id, label) VALUES (1, 'A1');
INSERT INTO rooms (property_id, label) VALUES (1, 'A2');
";

#[tokio::test]
async fn root_file_with_includes_trigger_and_follow_up() {
    let dir = TempDir::new().unwrap();
    write(&dir, "tables.sql", TABLES);
    write(&dir, "triggers_body.sql", TRIGGERS);
    write(
        &dir,
        "init.sql",
        "SOURCE tables.sql;\nSELECT * FROM missing_table;\nSOURCE triggers_body.sql;\n",
    );
    write(&dir, "assign_demo_data.sql", DEMO_DATA);

    let mut db = memory_db().await;
    let report = Initializer::new(InitPlan::new(dir.path()))
        .run(&mut db)
        .await
        .unwrap();

    assert_eq!(report.strategy, Strategy::Root);
    assert_eq!(report.failed(), 1);
    let failure = report.failures().next().unwrap();
    assert!(failure.preview.starts_with("SELECT * FROM missing_table"));

    let rooms: i64 = sqlx::query_scalar("SELECT room_count FROM properties WHERE id = 1")
        .fetch_one(&mut db.0)
        .await
        .unwrap();
    assert_eq!(rooms, 2);

    let website: String = sqlx::query_scalar("SELECT website FROM properties WHERE id = 1")
        .fetch_one(&mut db.0)
        .await
        .unwrap();
    assert_eq!(website, "https://green.example.com//home");
}

#[tokio::test]
async fn fallback_files_skip_database_selection() {
    let dir = TempDir::new().unwrap();
    write(&dir, "schema.sql", TABLES);
    write(
        &dir,
        "functions.sql",
        "USE propman;\nCREATE VIEW property_names AS SELECT name FROM properties;\n",
    );
    write(&dir, "triggers.sql", &format!("USE propman;\n{TRIGGERS}"));
    write(&dir, "schema_update.sql", DEMO_DATA);

    let mut db = memory_db().await;
    let report = Initializer::new(InitPlan::new(dir.path()))
        .run(&mut db)
        .await
        .unwrap();

    assert_eq!(report.strategy, Strategy::Fallback);
    assert_eq!(report.failed(), 0);

    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM property_names")
        .fetch_all(&mut db.0)
        .await
        .unwrap();
    assert_eq!(names, vec!["Green PG".to_string()]);

    let rooms: i64 = sqlx::query_scalar("SELECT room_count FROM properties WHERE id = 1")
        .fetch_one(&mut db.0)
        .await
        .unwrap();
    assert_eq!(rooms, 2);
}

#[tokio::test]
async fn root_path_that_is_not_a_file_uses_fallback() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("init.sql")).unwrap();
    write(&dir, "schema.sql", TABLES);

    let mut db = memory_db().await;
    let report = Initializer::new(InitPlan::new(dir.path()))
        .run(&mut db)
        .await
        .unwrap();

    assert_eq!(report.strategy, Strategy::Fallback);
    assert_eq!(report.failed(), 0);
}
