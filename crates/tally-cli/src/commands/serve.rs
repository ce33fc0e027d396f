//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::auth::MASTER_PASSWORD_ENV;
use tally_core::PasswordGate;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
    allowed_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting Tally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let allowed_origins: Vec<String> = allowed_origins
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let session_ttl = tally_server::session_ttl_from_env();

    let password_gate = if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
        None
    } else {
        let gate = PasswordGate::from_env().with_context(|| {
            format!(
                "Set {} to the shared master password, or use --no-auth for local development",
                MASTER_PASSWORD_ENV
            )
        })?;
        println!(
            "   🔒 Authentication: master password ({}), sessions last {}h",
            MASTER_PASSWORD_ENV,
            session_ttl.num_hours()
        );
        Some(gate)
    };

    if !allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", allowed_origins.join(", "));
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = tally_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins,
        password_gate,
        session_ttl,
    };

    let static_dir_str = static_dir
        .map(|p| {
            p.to_str()
                .with_context(|| format!("Static dir is not valid UTF-8: {}", p.display()))
        })
        .transpose()?;
    tally_server::serve_with_config(db, host, port, static_dir_str, config).await?;

    Ok(())
}
