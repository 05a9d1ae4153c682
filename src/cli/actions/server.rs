use crate::api;
use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{anyhow, Result};
use url::Url;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port, dsn } => {
            let dsn = Url::parse(&dsn)?;

            if !matches!(dsn.scheme(), "postgres" | "postgresql") {
                return Err(anyhow!("unsupported DSN scheme: {}", dsn.scheme()));
            }

            api::new(port, dsn.to_string(), globals).await?;
        }
    }

    Ok(())
}
