use super::*;
use std::sync::Mutex;
use strata_core::{CoreError, Driver, Mode};
use strata_db::SqliteDatabase;

const PROD_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS migration_history (version TEXT NOT NULL PRIMARY KEY, created_at BIGINT NOT NULL);
CREATE TABLE IF NOT EXISTS note (id INTEGER PRIMARY KEY, body TEXT NOT NULL);
";

const DEV_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS migration_history (version TEXT NOT NULL PRIMARY KEY, created_at BIGINT NOT NULL);
CREATE TABLE IF NOT EXISTS note (id INTEGER PRIMARY KEY, body TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS scratch (x INTEGER);
";

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl MigrationObserver for Recorder {
    fn on_bootstrap_start(&self, kind: SchemaKind) {
        self.push(format!("bootstrap_start {kind}"));
    }
    fn on_bootstrap_done(&self, kind: SchemaKind) {
        self.push(format!("bootstrap_done {kind}"));
    }
    fn on_migration_start(&self, from: Version, to: Version) {
        self.push(format!("migration_start {from} -> {to}"));
    }
    fn on_bucket_start(&self, version: Version) {
        self.push(format!("bucket_start {version}"));
    }
    fn on_bucket_done(&self, version: Version) {
        self.push(format!("bucket_done {version}"));
    }
    fn on_migration_done(&self, applied: &[Version]) {
        self.push(format!("migration_done {}", applied.len()));
    }
}

fn catalog(extra: &[(&str, &str)]) -> ScriptCatalog {
    let mut files = vec![
        ("migration/prod/LATEST__SCHEMA.sql", PROD_SCHEMA),
        ("migration/dev/LATEST__SCHEMA.sql", DEV_SCHEMA),
        ("seed/10__note.sql", "INSERT INTO note (body) VALUES ('hello'); INSERT INTO note (body) VALUES ('a; b');"),
    ];
    files.extend_from_slice(extra);
    ScriptCatalog::from_files(
        files
            .into_iter()
            .map(|(path, content)| (path, content.as_bytes().to_vec())),
    )
    .unwrap()
}

/// Buckets 0.9, 0.10, 0.11. 0.9 is not re-runnable, 0.11 depends on 0.10.
fn bucket_files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("migration/prod/0.9/00__nine.sql", "CREATE TABLE nine (x INTEGER);"),
        ("migration/prod/0.10/00__ten.sql", "CREATE TABLE ten (x INTEGER);"),
        ("migration/prod/0.11/00__eleven.sql", "INSERT INTO ten (x) VALUES (11);"),
        ("migration/prod/0.11/01__eleven.sql", "CREATE TABLE eleven (x INTEGER);"),
    ]
}

fn profile(mode: Mode, version: &str) -> Profile {
    Profile::new(mode, Driver::Sqlite, ":memory:").with_version(version)
}

/// A prod database whose latest recorded version is `version`.
fn database_at(version: &str) -> SqliteDatabase {
    let db = SqliteDatabase::in_memory().unwrap();
    db.execute_batch(PROD_SCHEMA).unwrap();
    db.execute(&format!(
        "INSERT INTO migration_history (version, created_at) VALUES ('{version}', 1)"
    ))
    .unwrap();
    db
}

fn history(db: &dyn Database) -> Vec<String> {
    db.list_migration_history(&MigrationHistoryFind::default())
        .unwrap()
        .into_iter()
        .map(|h| h.version)
        .collect()
}

#[test]
fn test_prod_bootstrap_records_application_version() {
    let db = SqliteDatabase::in_memory().unwrap();
    let catalog = catalog(&bucket_files());
    let profile = profile(Mode::Prod, "0.11.2");
    let recorder = Arc::new(Recorder::default());

    let outcome = Migrator::new(&db, &catalog, &profile)
        .with_observer(recorder.clone())
        .migrate(&Context::background())
        .unwrap();

    assert_eq!(
        outcome,
        MigrationOutcome::ProdBootstrap {
            version: Version::new(0, 11, 2)
        }
    );
    assert_eq!(history(&db), vec!["0.11.2"]);
    assert!(db.relation_exists("note").unwrap());
    assert!(!db.relation_exists("nine").unwrap());
    assert_eq!(
        recorder.events(),
        vec!["bootstrap_start prod", "bootstrap_done prod"]
    );
}

#[test]
fn test_buckets_apply_in_version_order() {
    let db = database_at("0.9.0");
    let catalog = catalog(&bucket_files());
    let profile = profile(Mode::Prod, "0.11.0");
    let recorder = Arc::new(Recorder::default());

    let outcome = Migrator::new(&db, &catalog, &profile)
        .with_observer(recorder.clone())
        .migrate(&Context::background())
        .unwrap();

    assert_eq!(
        outcome,
        MigrationOutcome::Incremental {
            applied: vec![Version::new(0, 10, 0), Version::new(0, 11, 0)]
        }
    );
    assert_eq!(history(&db), vec!["0.9.0", "0.10.0", "0.11.0"]);
    assert!(!db.relation_exists("nine").unwrap());
    assert_eq!(db.query_count("SELECT * FROM ten WHERE x = 11").unwrap(), 1);
    assert_eq!(
        recorder.events(),
        vec![
            "migration_start 0.9.0 -> 0.11.0",
            "bucket_start 0.10.0",
            "bucket_done 0.10.0",
            "bucket_start 0.11.0",
            "bucket_done 0.11.0",
            "migration_done 2",
        ]
    );
}

#[test]
fn test_buckets_above_application_version_wait() {
    let db = database_at("0.9.0");
    let mut files = bucket_files();
    files.push(("migration/prod/0.12/00__twelve.sql", "CREATE TABLE twelve (x INTEGER);"));
    let catalog = catalog(&files);
    let profile = profile(Mode::Prod, "0.11.4");

    let outcome = Migrator::new(&db, &catalog, &profile)
        .migrate(&Context::background())
        .unwrap();

    assert_eq!(
        outcome,
        MigrationOutcome::Incremental {
            applied: vec![Version::new(0, 10, 0), Version::new(0, 11, 0)]
        }
    );
    assert!(!db.relation_exists("twelve").unwrap());
}

#[test]
fn test_second_migrate_is_noop() {
    let db = database_at("0.9.0");
    let catalog = catalog(&bucket_files());
    let profile = profile(Mode::Prod, "0.11.0");
    let migrator = Migrator::new(&db, &catalog, &profile);

    migrator.migrate(&Context::background()).unwrap();
    let before = history(&db);
    let outcome = migrator.migrate(&Context::background()).unwrap();

    assert_eq!(
        outcome,
        MigrationOutcome::UpToDate {
            latest: Version::new(0, 11, 0)
        }
    );
    assert_eq!(history(&db), before);
    assert_eq!(db.query_count("SELECT * FROM ten").unwrap(), 1);
}

#[test]
fn test_patch_release_does_not_migrate() {
    let db = database_at("0.11.0");
    let catalog = catalog(&bucket_files());
    let profile = profile(Mode::Prod, "0.11.9");

    let outcome = Migrator::new(&db, &catalog, &profile)
        .migrate(&Context::background())
        .unwrap();
    assert_eq!(
        outcome,
        MigrationOutcome::UpToDate {
            latest: Version::new(0, 11, 0)
        }
    );
}

#[test]
fn test_bootstrapped_patch_version_still_gets_next_minor() {
    let db = database_at("0.10.3");
    db.execute_batch("CREATE TABLE ten (x INTEGER)").unwrap();
    let catalog = catalog(&bucket_files());
    let profile = profile(Mode::Prod, "0.11.0");

    let outcome = Migrator::new(&db, &catalog, &profile)
        .migrate(&Context::background())
        .unwrap();
    assert_eq!(
        outcome,
        MigrationOutcome::Incremental {
            applied: vec![Version::new(0, 11, 0)]
        }
    );
}

#[test]
fn test_failed_bucket_resumes_on_next_call() {
    let db = database_at("0.9.0");
    let mut broken = bucket_files();
    broken[3] = (
        "migration/prod/0.11/01__eleven.sql",
        "CREATE TABLE eleven (x INTEGER); INSERT INTO no_such_table VALUES (1);",
    );
    let profile = profile(Mode::Prod, "0.11.0");

    let err = Migrator::new(&db, &catalog(&broken), &profile)
        .migrate(&Context::background())
        .unwrap_err();
    match &err {
        StoreError::Bucket {
            version, script, ..
        } => {
            assert_eq!(*version, Version::new(0, 11, 0));
            assert_eq!(script, "migration/prod/0.11/01__eleven.sql");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(history(&db), vec!["0.9.0", "0.10.0"]);
    assert!(!db.relation_exists("eleven").unwrap());
    assert_eq!(db.query_count("SELECT * FROM ten").unwrap(), 0);

    let outcome = Migrator::new(&db, &catalog(&bucket_files()), &profile)
        .migrate(&Context::background())
        .unwrap();
    assert_eq!(
        outcome,
        MigrationOutcome::Incremental {
            applied: vec![Version::new(0, 11, 0)]
        }
    );
    assert_eq!(history(&db), vec!["0.9.0", "0.10.0", "0.11.0"]);
    assert_eq!(db.query_count("SELECT * FROM ten").unwrap(), 1);
}

#[test]
fn test_failed_bootstrap_records_nothing() {
    let db = SqliteDatabase::in_memory().unwrap();
    let catalog = ScriptCatalog::from_files([
        (
            "migration/prod/LATEST__SCHEMA.sql",
            format!("{PROD_SCHEMA}\nCREATE TABLE broken (;").into_bytes(),
        ),
    ])
    .unwrap();
    let profile = profile(Mode::Prod, "0.11.0");

    let err = Migrator::new(&db, &catalog, &profile)
        .migrate(&Context::background())
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Bootstrap {
            kind: SchemaKind::Prod,
            ..
        }
    ));
    assert!(!db.relation_exists("migration_history").unwrap());
}

#[test]
fn test_cancelled_context_applies_nothing() {
    let db = database_at("0.9.0");
    let catalog = catalog(&bucket_files());
    let profile = profile(Mode::Prod, "0.11.0");
    let ctx = Context::background();
    ctx.cancel();

    let err = Migrator::new(&db, &catalog, &profile)
        .migrate(&ctx)
        .unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(history(&db), vec!["0.9.0"]);
}

#[test]
fn test_cancellation_mid_bucket_rolls_back() {
    struct CancelOnBucket(Context);
    impl MigrationObserver for CancelOnBucket {
        fn on_bucket_start(&self, version: Version) {
            if version == Version::new(0, 11, 0) {
                self.0.cancel();
            }
        }
    }

    let db = database_at("0.9.0");
    let catalog = catalog(&bucket_files());
    let profile = profile(Mode::Prod, "0.11.0");
    let ctx = Context::background();

    let err = Migrator::new(&db, &catalog, &profile)
        .with_observer(Arc::new(CancelOnBucket(ctx.clone())))
        .migrate(&ctx)
        .unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(history(&db), vec!["0.9.0", "0.10.0"]);
    assert!(!db.relation_exists("eleven").unwrap());
}

#[test]
fn test_invalid_recorded_version() {
    let db = database_at("not-a-version");
    let catalog = catalog(&bucket_files());
    let profile = profile(Mode::Prod, "0.11.0");

    let err = Migrator::new(&db, &catalog, &profile)
        .migrate(&Context::background())
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Core(CoreError::InvalidVersionFormat { .. })
    ));
}

#[test]
fn test_dev_mode_ignores_history() {
    let db = database_at("0.9.0");
    let catalog = catalog(&bucket_files());
    let profile = profile(Mode::Dev, "0.11.0");

    let outcome = Migrator::new(&db, &catalog, &profile)
        .migrate(&Context::background())
        .unwrap();
    assert_eq!(outcome, MigrationOutcome::DevBootstrap { seeded: false });
    assert!(db.relation_exists("scratch").unwrap());
    assert!(!db.relation_exists("ten").unwrap());
    assert_eq!(history(&db), vec!["0.9.0"]);
    assert_eq!(db.query_count("SELECT * FROM note").unwrap(), 0);
}

#[test]
fn test_demo_mode_seeds_fresh_database_once() {
    let db = SqliteDatabase::in_memory().unwrap();
    let catalog = catalog(&[]);
    let profile = profile(Mode::Demo, "0.11.0");
    let migrator = Migrator::new(&db, &catalog, &profile);

    let first = migrator.migrate(&Context::background()).unwrap();
    assert_eq!(first, MigrationOutcome::DevBootstrap { seeded: true });
    assert_eq!(db.query_count("SELECT * FROM note").unwrap(), 2);

    let second = migrator.migrate(&Context::background()).unwrap();
    assert_eq!(second, MigrationOutcome::DevBootstrap { seeded: false });
    assert_eq!(db.query_count("SELECT * FROM note").unwrap(), 2);
}
