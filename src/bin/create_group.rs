//! CLI tool to create a post group.
//!
//! Usage: `cargo run --bin yatube-create-group -- <slug> <title> [description]`
//!
//! Reads `config.yml` (and `YATUBE_*` overrides) to find the database.

use anyhow::{bail, Result};
use std::path::Path;

use yatube::config::Config;
use yatube::db::{self, repositories::SqlxGroupRepository};
use yatube::models::CreateGroupInput;
use yatube::services::GroupService;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(slug), Some(title)) = (args.next(), args.next()) else {
        bail!("usage: yatube-create-group <slug> <title> [description]");
    };
    let description = args.collect::<Vec<_>>().join(" ");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let service = GroupService::new(SqlxGroupRepository::boxed(pool.clone()));
    let group = service
        .create(CreateGroupInput {
            title,
            slug,
            description,
        })
        .await?;

    println!("Created group '{}' at /group/{}/", group.title, group.slug);
    pool.close().await;
    Ok(())
}
