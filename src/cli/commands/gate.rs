use anyhow::{bail, Context};
use axum::http::HeaderMap;
use serde_json::json;

use crate::app::AppState;
use crate::cli::OutputFormat;
use crate::config;
use crate::gate::{classify as classify_path, Decision, GateRequest};
use crate::session::RequestCookies;

pub fn classify(path: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let class = classify_path(path);
    match output_format {
        OutputFormat::Json => println!("{}", json!({ "path": path, "class": class })),
        OutputFormat::Text => println!("{} -> {:?}", path, class),
    }
    Ok(())
}

pub async fn evaluate(path: &str, raw_cookies: &[String], output_format: OutputFormat) -> anyhow::Result<()> {
    let cookies = parse_cookie_args(raw_cookies)?;
    let state = AppState::from_config(config::config()).context("failed to initialize session authority")?;

    let headers = HeaderMap::new();
    let decision = state
        .gate
        .evaluate(&GateRequest::new(path, &cookies, &headers))
        .await;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&decision)?),
        OutputFormat::Text => match &decision {
            Decision::Forward => println!("forward"),
            Decision::ForwardWithCookies { user, cookies_to_set } => {
                println!("forward as {}", user.id);
                for cookie in cookies_to_set {
                    println!("  set-cookie {}", cookie.name);
                }
            }
            Decision::Redirect { .. } => {
                println!("redirect {}", decision.location().unwrap_or_default());
            }
        },
    }
    Ok(())
}

fn parse_cookie_args(raw_cookies: &[String]) -> anyhow::Result<RequestCookies> {
    let mut cookies = RequestCookies::new();
    for raw in raw_cookies {
        let Some((name, value)) = raw.split_once('=') else {
            bail!("cookie '{}' must be NAME=VALUE", raw);
        };
        cookies = cookies.with(name.trim(), value.trim());
    }
    Ok(cookies)
}
