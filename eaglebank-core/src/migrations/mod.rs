//! Database migrations - embedded SQL files
//!
//! Each entry is `(file name, sql)`, compiled in with `include_str!` and
//! applied in list order by `MigrationService`.

/// All migrations, oldest first
///
/// New schema changes go in a new `NNN_description.sql` file appended here;
/// applied files are never edited.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
