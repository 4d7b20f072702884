pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_catalog;
mod m20260301_000002_create_access;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_catalog::Migration),
            Box::new(m20260301_000002_create_access::Migration),
        ]
    }
}
