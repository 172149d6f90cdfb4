//! Command handlers.

use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;

use addeva_sdk::{
    extract_meta_api_key, jwt, ApiClient, ApiRequest, ClientConfig, CredentialStore,
    FileStorage, LogNotifier, Method, Navigator, SimulatedPage,
};

use crate::{ApiKeyAction, Cli, Commands, RequestArgs, TokenAction};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(skew) = cli.skew {
        config.skew_secs = skew;
    }

    let storage = match cli.storage_file {
        Some(path) => FileStorage::new(path),
        None => FileStorage::in_config_dir()
            .context("no config directory on this platform; pass --storage-file")?,
    };
    info!(path = %storage.path().display(), "using credential storage");
    let credentials = CredentialStore::new(Arc::new(storage), config.storage_keys.clone());

    match cli.command {
        Commands::Request(args) => {
            let page = Arc::new(SimulatedPage::at(&cli.location));
            let notifier = Arc::new(LogNotifier::new());
            let client = ApiClient::new(config, credentials, page.clone(), notifier.clone());

            match client.request(build_request(args)?).await {
                Ok(value) => {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                    Ok(())
                }
                Err(e) => {
                    if e.is_login_required() {
                        if let Some(url) = page.navigations().last() {
                            eprintln!("redirected to {url}");
                        } else if let Some(notice) = notifier.current() {
                            eprintln!("{notice}");
                        } else {
                            eprintln!("already at {}", page.current_location());
                        }
                    }
                    Err(e.into())
                }
            }
        }
        Commands::Token { action } => {
            token_command(&credentials, action, config.skew_secs);
            Ok(())
        }
        Commands::ApiKey { action } => api_key_command(&credentials, action),
    }
}

fn build_request(args: RequestArgs) -> anyhow::Result<ApiRequest> {
    let mut req = ApiRequest::new(args.path).method(args.method);

    if let Some(json) = args.json {
        let value: serde_json::Value =
            serde_json::from_str(&json).context("--json is not valid JSON")?;
        req = req.json(value);
    } else if let Some(data) = args.data {
        req = req.text(data);
    }

    for (name, value) in args.headers {
        req = req.header(name, value);
    }
    Ok(req)
}

fn token_command(credentials: &CredentialStore, action: TokenAction, skew_secs: i64) {
    match action {
        TokenAction::Set { token } => {
            if jwt::decode_payload(&token).is_none() {
                eprintln!("warning: token has no decodable payload; expiry cannot be checked");
            }
            credentials.set_auth_token(token.trim());
            println!("token stored");
        }
        TokenAction::Clear => {
            credentials.clear_auth();
            println!("token cleared");
        }
        TokenAction::Show => {
            println!("{}", describe_token(credentials.auth_token().as_deref(), skew_secs));
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn describe_token(token: Option<&str>, skew_secs: i64) -> String {
    let Some(token) = token else {
        return "no token stored".to_string();
    };
    let Some(claims) = jwt::decode_payload(token) else {
        return "token stored, payload not decodable".to_string();
    };

    let claims = serde_json::to_string_pretty(&claims).unwrap_or_default();
    let status = match jwt::expiry(token) {
        None => "no expiry".to_string(),
        Some(exp) => {
            let when = chrono::DateTime::from_timestamp(exp as i64, 0)
                .map_or_else(|| exp.to_string(), |t| t.to_rfc3339());
            if jwt::is_expired(token, skew_secs) {
                format!("expired (exp {when}, skew {skew_secs}s)")
            } else {
                format!("valid until {when} (skew {skew_secs}s)")
            }
        }
    };
    format!("{claims}\n{status}")
}

fn api_key_command(credentials: &CredentialStore, action: ApiKeyAction) -> anyhow::Result<()> {
    match action {
        ApiKeyAction::Seed { meta, html } => {
            let meta = match html {
                Some(path) => {
                    let page = fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    extract_meta_api_key(&page)
                }
                None => meta,
            };
            if meta.is_none() {
                bail!("no API key given: pass --meta or an --html page with an x-api-key meta tag");
            }
            if credentials.seed_api_key(meta.as_deref()) {
                println!("API key stored");
            } else {
                println!("API key unchanged");
            }
        }
        ApiKeyAction::Show => match credentials.api_key() {
            Some(key) => println!("{key}"),
            None => println!("no API key stored"),
        },
    }
    Ok(())
}

/// Parse an HTTP method, case-insensitively.
pub fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.trim().to_ascii_uppercase().as_bytes())
        .map_err(|e| format!("invalid method {s:?}: {e}"))
}

/// Parse `Name: value`.
pub fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got {s:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {s:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use addeva_sdk::RequestBody;
    use clap::Parser;

    #[test]
    fn method_is_case_insensitive() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method(" Delete ").unwrap(), Method::DELETE);
        assert!(parse_method("NOT A METHOD").is_err());
    }

    #[test]
    fn header_parsing() {
        assert_eq!(
            parse_header("x-api-key: custom").unwrap(),
            ("x-api-key".to_string(), "custom".to_string())
        );
        assert_eq!(
            parse_header("Authorization:Bearer a:b").unwrap(),
            ("Authorization".to_string(), "Bearer a:b".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn request_args_build_json_request() {
        let cli = Cli::try_parse_from([
            "addeva-cli",
            "request",
            "/api/addeva/contact",
            "--json",
            r#"{"name":"Sato"}"#,
            "-H",
            "x-api-key: custom",
        ])
        .unwrap();
        let Commands::Request(args) = cli.command else {
            panic!("expected request command");
        };
        let req = build_request(args).unwrap();

        assert_eq!(req.method_ref(), &Method::POST);
        assert_eq!(
            req.body_ref(),
            &RequestBody::Json(serde_json::json!({ "name": "Sato" }))
        );
        assert_eq!(req.headers(), &[("x-api-key".to_string(), "custom".to_string())]);
    }

    #[test]
    fn raw_data_is_text_body() {
        let cli = Cli::try_parse_from(["addeva-cli", "request", "/x", "-X", "put", "-d", "a=1"])
            .unwrap();
        let Commands::Request(args) = cli.command else {
            panic!("expected request command");
        };
        let req = build_request(args).unwrap();
        assert_eq!(req.method_ref(), &Method::PUT);
        assert_eq!(req.body_ref(), &RequestBody::Text("a=1".into()));
    }

    #[test]
    fn json_and_data_conflict() {
        let res = Cli::try_parse_from([
            "addeva-cli", "request", "/x", "--json", "{}", "--data", "raw",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn invalid_json_is_rejected() {
        let cli = Cli::try_parse_from(["addeva-cli", "request", "/x", "--json", "{oops"]).unwrap();
        let Commands::Request(args) = cli.command else {
            panic!("expected request command");
        };
        assert!(build_request(args).is_err());
    }

    #[test]
    fn describe_missing_and_opaque_tokens() {
        assert_eq!(describe_token(None, 30), "no token stored");
        assert_eq!(
            describe_token(Some("opaque"), 30),
            "token stored, payload not decodable"
        );
    }

    #[test]
    fn seed_from_html_file() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("index.html");
        fs::write(&page, r#"<head><meta name="x-api-key" content="page-key"></head>"#).unwrap();

        let credentials = CredentialStore::in_memory();
        api_key_command(
            &credentials,
            ApiKeyAction::Seed {
                meta: None,
                html: Some(page),
            },
        )
        .unwrap();
        assert_eq!(credentials.api_key().as_deref(), Some("page-key"));
    }

    #[test]
    fn seed_without_source_fails() {
        let credentials = CredentialStore::in_memory();
        let res = api_key_command(
            &credentials,
            ApiKeyAction::Seed {
                meta: None,
                html: None,
            },
        );
        assert!(res.is_err());
    }
}
