use std::path::Path;

use anyhow::Result;
use cairn_core::config::CairnConfig;

/// Validate the configuration at `path` and print the resulting
/// deployment plan.
pub fn run(path: &Path) -> Result<()> {
    if !path.exists() {
        println!("{} not found, checking defaults and environment only", path.display());
    }

    let config = CairnConfig::load_from(path)?;
    config.validate()?;

    let scheme = if config.server.tls_cert_path.is_some() { "https" } else { "http" };
    let workers = match config.server.workers {
        Some(n) => n.to_string(),
        None => "auto".to_string(),
    };

    println!("Configuration OK");
    println!();
    println!("  listen       {}://{}:{}", scheme, config.server.host, config.server.port);
    println!("  workers      {}", workers);
    println!(
        "  keep-alive   {} requests / {}s window",
        config.server.keep_alive_max, config.server.receive_timeout
    );
    println!("  body limit   {} bytes", config.server.max_body_size);
    println!("  banner       {}", config.server.software);

    if config.deploy.applications.is_empty() {
        println!();
        println!("  no applications configured (static handler only)");
        return Ok(());
    }

    for app in &config.deploy.applications {
        println!();
        println!("  application \"{}\"", app.name);
        println!("    webapp    {}", app.webapp_path);
        println!("    context   {}", app.context_path());
        for vhost in &app.vhosts {
            if vhost.aliases.is_empty() {
                println!("    vhost     {}", vhost.name);
            } else {
                println!("    vhost     {} (aliases: {})", vhost.name, vhost.aliases.join(", "));
            }
        }
        for mapping in &app.servlet_mappings {
            println!("    mapping   {} -> {}", mapping.url_pattern, mapping.handler);
        }
        for secured in &app.secured_urls {
            println!("    secured   {} (realm \"{}\")", secured.url_pattern, secured.realm);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn valid_config_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cairn.toml");
        fs::write(
            &path,
            r#"
            [server]
            port = 9590

            [[deploy.applications]]
            name = "shop"
            webapp_path = "/var/www/shop"

            [[deploy.applications.vhosts]]
            name = "shop.test"
            aliases = ["www.shop.test"]

            [[deploy.applications.servlet_mappings]]
            url_pattern = "*.php"
            handler = "php"
            "#,
        )
        .unwrap();

        assert!(run(&path).is_ok());
    }

    #[test]
    fn missing_file_checks_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");
        assert!(run(&path).is_ok());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cairn.toml");
        fs::write(
            &path,
            r#"
            [server]
            keep_alive_max = 0
            "#,
        )
        .unwrap();

        let err = run(&path).unwrap_err();
        assert!(err.to_string().contains("keep_alive_max"));
    }

    #[test]
    fn broken_toml_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cairn.toml");
        fs::write(&path, "[server\nport = not a number").unwrap();

        assert!(run(&path).is_err());
    }

    #[test]
    fn duplicate_application_names_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cairn.toml");
        fs::write(
            &path,
            r#"
            [[deploy.applications]]
            name = "twin"
            webapp_path = "/var/www/a"

            [[deploy.applications]]
            name = "twin"
            webapp_path = "/var/www/b"
            "#,
        )
        .unwrap();

        let err = run(&path).unwrap_err();
        assert!(err.to_string().contains("Duplicate application name"));
    }
}
