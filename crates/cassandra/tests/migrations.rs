use std::sync::Arc;

use migrate_cassandra::{CassandraDriver, MemorySession, StatementSplitter, VERSION_TABLE};
use migrate_driver::{Direction, Driver, DriverError, MigrationFile};

async fn driver_with_memory_session() -> (CassandraDriver, Arc<MemorySession>) {
    let session = Arc::new(MemorySession::new());
    let driver = CassandraDriver::with_session(session.clone()).await.unwrap();
    (driver, session)
}

/// Statements that were not bookkeeping writes
fn migration_statements(session: &MemorySession) -> Vec<String> {
    session
        .executed_statements()
        .into_iter()
        .filter(|s| !s.contains(VERSION_TABLE))
        .collect()
}

#[tokio::test]
async fn test_up_then_down_leaves_no_version_row() {
    let (driver, session) = driver_with_memory_session().await;

    let mut up = MigrationFile::new(7, "users", Direction::Up, "CREATE TABLE users (id uuid PRIMARY KEY);");
    driver.migrate(&mut up).await.unwrap();
    assert_eq!(session.recorded_versions(), vec![7]);
    assert!(session.has_table("users"));

    let mut down = MigrationFile::new(7, "users", Direction::Down, "DROP TABLE users;");
    driver.migrate(&mut down).await.unwrap();
    assert!(session.recorded_versions().is_empty());
    assert!(!session.has_table("users"));
    assert_eq!(driver.version().await.unwrap(), 0);
}

#[tokio::test]
async fn test_versions_are_most_recent_first() {
    let (driver, _session) = driver_with_memory_session().await;

    for version in [3, 1, 2] {
        let mut file = MigrationFile::new(version, format!("m{}", version), Direction::Up, "");
        driver.migrate(&mut file).await.unwrap();
    }

    assert_eq!(driver.versions().await.unwrap(), vec![3, 2, 1]);
    assert_eq!(driver.version().await.unwrap(), 3);
}

#[tokio::test]
async fn test_failed_statement_compensates_version_but_keeps_earlier_statements() {
    let (driver, session) = driver_with_memory_session().await;

    let mut file = MigrationFile::new(
        42,
        "broken",
        Direction::Up,
        "CREATE TABLE accounts (id uuid PRIMARY KEY);\nCREAT TABLE typo (id int);\nDROP TABLE accounts;",
    );
    let err = driver.migrate(&mut file).await.unwrap_err();

    assert!(matches!(err, DriverError::Execution(msg) if msg.contains("no viable alternative")));
    assert!(session.recorded_versions().is_empty());
    assert!(session.has_table("accounts"));
    assert_eq!(
        migration_statements(&session),
        vec!["CREATE TABLE accounts (id uuid PRIMARY KEY)".to_string()]
    );
    assert!(driver.versions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_compensation_is_appended_to_original_error() {
    let (driver, session) = driver_with_memory_session().await;
    session.fail_on("DROP TABLE missing");
    session.fail_on("DELETE FROM");

    let mut file = MigrationFile::new(9, "drop", Direction::Up, "DROP TABLE missing;");
    let err = driver.migrate(&mut file).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("DROP TABLE missing"));
    assert!(message.contains("; failed to rollback version: "));
    assert!(matches!(err.root_cause(), DriverError::Execution(msg) if msg.contains("DROP TABLE missing")));
    assert_eq!(session.recorded_versions(), vec![9]);
}

#[tokio::test]
async fn test_failed_bookkeeping_insert_still_compensates() {
    let (driver, session) = driver_with_memory_session().await;
    session.fail_on("INSERT INTO");

    let mut file = MigrationFile::new(5, "never_runs", Direction::Up, "CREATE TABLE t (x int);");
    driver.migrate(&mut file).await.unwrap_err();

    assert!(!session.has_table("t"));
    assert!(session
        .executed_statements()
        .iter()
        .any(|s| s.starts_with("DELETE FROM schema_migrations")));
}

#[tokio::test]
async fn test_failed_down_migration_deletes_version_again() {
    let (driver, session) = driver_with_memory_session().await;

    let mut up = MigrationFile::new(11, "orders", Direction::Up, "CREATE TABLE orders (id int PRIMARY KEY);");
    driver.migrate(&mut up).await.unwrap();

    let mut down = MigrationFile::new(11, "orders", Direction::Down, "DROP TABLE orders; DROP TABLE gone;");
    driver.migrate(&mut down).await.unwrap_err();

    let deletes = session
        .executed_statements()
        .iter()
        .filter(|s| s.starts_with("DELETE FROM schema_migrations"))
        .count();
    assert_eq!(deletes, 2);
    assert!(session.recorded_versions().is_empty());
    assert!(!session.has_table("orders"));
}

#[tokio::test]
async fn test_blank_statements_are_skipped() {
    let (driver, session) = driver_with_memory_session().await;

    let mut file = MigrationFile::new(1, "split", Direction::Up, "CREATE TABLE t (x int);  ; DROP TABLE t;");
    driver.migrate(&mut file).await.unwrap();

    assert_eq!(
        migration_statements(&session),
        vec!["CREATE TABLE t (x int)".to_string(), "DROP TABLE t".to_string()]
    );
}

#[tokio::test]
async fn test_migrate_reads_file_from_disk() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("20240301_events.up.cql");
    std::fs::write(
        &path,
        "-- events table\nCREATE TABLE events (id timeuuid PRIMARY KEY, body text);\n",
    )
    .unwrap();

    let (driver, session) = driver_with_memory_session().await;
    let mut file = MigrationFile::from_path(&path).unwrap();
    driver.migrate(&mut file).await.unwrap();

    assert_eq!(driver.version().await.unwrap(), 20240301);
    assert!(file.content().is_some());
    assert_eq!(migration_statements(&session).len(), 1);
}

#[tokio::test]
async fn test_scan_failure_keeps_partial_versions() {
    let (driver, session) = driver_with_memory_session().await;
    for version in [10, 30, 20] {
        let mut file = MigrationFile::new(version, "v", Direction::Up, "");
        driver.migrate(&mut file).await.unwrap();
    }

    session.fail_scan_after(2);
    let err = driver.versions().await.unwrap_err();
    assert_eq!(err.partial_versions(), Some(&[20, 10][..]));
    assert!(driver.version().await.is_err());
}

#[tokio::test]
async fn test_execute_passes_statement_through() {
    let (driver, session) = driver_with_memory_session().await;

    driver.execute("CREATE TABLE direct (id int PRIMARY KEY)").await.unwrap();
    assert!(session.has_table("direct"));
    assert!(driver.execute("SELEKT * FROM direct").await.is_err());
    assert!(session.recorded_versions().is_empty());
}

#[tokio::test]
async fn test_close_releases_session() {
    let (driver, session) = driver_with_memory_session().await;
    let driver: Box<dyn Driver> = Box::new(driver);

    driver.close().await.unwrap();
    assert!(session.is_closed());
}

struct LineSplitter;

impl StatementSplitter for LineSplitter {
    fn split<'a>(&self, content: &'a str) -> Vec<&'a str> {
        content.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
    }
}

#[tokio::test]
async fn test_custom_splitter() {
    let session = Arc::new(MemorySession::new());
    let driver = CassandraDriver::with_session(session.clone())
        .await
        .unwrap()
        .with_splitter(LineSplitter);

    let mut file = MigrationFile::new(2, "lines", Direction::Up, "CREATE TABLE a (x int)\nCREATE TABLE b (x int)");
    driver.migrate(&mut file).await.unwrap();

    assert!(session.has_table("a"));
    assert!(session.has_table("b"));
}

#[tokio::test]
async fn test_open_rejects_bad_configuration_before_connecting() {
    for url in [
        "cassandra://localhost/ks?consistency=sometimes",
        "cassandra://localhost/ks?protocol=abc",
        "cassandra://user@localhost/ks",
        "cassandra://localhost/",
    ] {
        let err = CassandraDriver::open(url).await.err().unwrap();
        assert!(err.is_configuration(), "{} should be a configuration error, got {}", url, err);
    }

    let err = CassandraDriver::open("cassandra://user@localhost/ks").await.err().unwrap();
    assert!(err.to_string().contains("Missing password"));
}
