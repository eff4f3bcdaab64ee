//! `aer fetch-verify`: fetch each format twice from a live endpoint, require
//! identical bytes, and check the JSON against its declared contract.

use std::time::Duration;

use aer_bundle::verify::{verify_idempotent_fetch, IdempotencyError};
use aer_bundle::{verify_parts, BundleParts};
use aer_kernel::proof::hash::Sha256Digest;
use aer_report::schema_v1::validate_declared;
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::Url;

use super::{print_report, Outcome};
use crate::config::CliConfig;
use crate::FetchVerifyArgs;

#[derive(Debug, thiserror::Error)]
enum FetchFailure {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} on {url}: {body}")]
    Status { status: u16, url: Url, body: String },
}

struct Endpoints {
    json: Url,
    pdf: Url,
    headers: HeaderMap,
}

fn join(base: &str, suffix: &str) -> Result<Url> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), suffix.trim_start_matches('/'));
    Url::parse(&raw).with_context(|| format!("invalid URL: {raw}"))
}

fn auth_headers(args: &FetchVerifyArgs) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(bearer) = &args.bearer {
        let value = if bearer.starts_with("Bearer ") {
            bearer.clone()
        } else {
            format!("Bearer {bearer}")
        };
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&value).context("invalid bearer value")?);
    }
    if let Some(cookie) = &args.cookie {
        headers.insert(COOKIE, HeaderValue::from_str(cookie).context("invalid cookie value")?);
    }
    Ok(headers)
}

fn endpoints(args: &FetchVerifyArgs) -> Result<Endpoints> {
    if let (Some(json), Some(pdf)) = (&args.json_url, &args.pdf_url) {
        return Ok(Endpoints {
            json: Url::parse(json).with_context(|| format!("invalid URL: {json}"))?,
            pdf: Url::parse(pdf).with_context(|| format!("invalid URL: {pdf}"))?,
            headers: auth_headers(args)?,
        });
    }

    let tokens = match (&args.token, &args.token_json, &args.token_pdf) {
        (Some(t), _, _) => Some((t.as_str(), t.as_str())),
        (None, Some(j), Some(p)) => Some((j.as_str(), p.as_str())),
        _ => None,
    };

    if let Some((json_token, pdf_token)) = tokens {
        let mut json = join(&args.base_url, "external/aer.json")?;
        json.query_pairs_mut().append_pair("token", json_token);
        let mut pdf = join(&args.base_url, "external/aer.pdf")?;
        pdf.query_pairs_mut().append_pair("token", pdf_token);
        return Ok(Endpoints {
            json,
            pdf,
            headers: HeaderMap::new(),
        });
    }

    let (Some(clinic), Some(client), Some(start), Some(end)) =
        (&args.clinic_id, &args.client_id, &args.start, &args.end)
    else {
        bail!("internal mode needs --clinic-id, --client-id, --start and --end (or pass a token)");
    };
    let headers = auth_headers(args)?;
    if headers.is_empty() {
        bail!("internal mode needs --bearer or --cookie");
    }

    let path = format!("reports/aer/{clinic}/{client}");
    let mut json = join(&args.base_url, &path)?;
    let mut pdf = join(&args.base_url, &format!("{path}.pdf"))?;
    for url in [&mut json, &mut pdf] {
        let mut query = url.query_pairs_mut();
        query.append_pair("start", start).append_pair("end", end);
        if let Some(program) = &args.program {
            query.append_pair("program", program);
        }
    }
    Ok(Endpoints { json, pdf, headers })
}

fn fetch(client: &Client, url: &Url, headers: &HeaderMap) -> Result<Vec<u8>, FetchFailure> {
    tracing::debug!(%url, "fetching");
    let response = client.get(url.clone()).headers(headers.clone()).send()?;
    let status = response.status();
    let body = response.bytes()?.to_vec();
    if !status.is_success() {
        return Err(FetchFailure::Status {
            status: status.as_u16(),
            url: url.clone(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    Ok(body)
}

/// Payload, or the two differing digests.
type Fetched = std::result::Result<Vec<u8>, (Sha256Digest, Sha256Digest)>;

/// Two fetches of `url`; a digest mismatch is a verdict, anything else an error.
fn fetch_twice(client: &Client, url: &Url, headers: &HeaderMap) -> Result<Fetched> {
    match verify_idempotent_fetch(|| fetch(client, url, headers)) {
        Ok((bytes, _)) => Ok(Ok(bytes)),
        Err(IdempotencyError::Mismatch { first, second }) => Ok(Err((first, second))),
        Err(e @ IdempotencyError::Fetch { .. }) => Err(anyhow::Error::new(e)),
    }
}

pub fn run(args: &FetchVerifyArgs, config: &CliConfig) -> Result<Outcome> {
    let endpoints = endpoints(args)?;
    let client = Client::builder()
        .timeout(Duration::from_secs(config.fetch.timeout_secs()))
        .build()
        .context("failed to build HTTP client")?;

    let json = fetch_twice(&client, &endpoints.json, &endpoints.headers)?;
    let pdf = fetch_twice(&client, &endpoints.pdf, &endpoints.headers)?;
    let (json, pdf) = match (json, pdf) {
        (Ok(json), Ok(pdf)) => (json, pdf),
        (json, pdf) => {
            if let Err((a, b)) = json {
                eprintln!("FAIL: JSON hash mismatch: {a} vs {b}");
            }
            if let Err((a, b)) = pdf {
                eprintln!("FAIL: PDF hash mismatch: {a} vs {b}");
            }
            println!("FAIL");
            return Ok(Outcome::Fail);
        }
    };

    if let Some(path) = &args.manifest {
        let manifest = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let report = verify_parts(BundleParts {
            json: &json,
            document: &pdf,
            manifest: &manifest,
        });
        return Ok(print_report(&report));
    }

    println!("JSON_SHA256={}", aer_kernel::proof::hash::sha256(&json));
    println!("PDF_SHA256={}", aer_kernel::proof::hash::sha256(&pdf));
    let value: serde_json::Value = match serde_json::from_slice(&json) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("FAIL: JSON payload does not parse: {e}");
            println!("FAIL");
            return Ok(Outcome::Fail);
        }
    };
    if let Err(violations) = validate_declared(&value) {
        eprintln!("FAIL: schema validation failed");
        for v in violations {
            eprintln!("  {v}");
        }
        println!("FAIL");
        return Ok(Outcome::Fail);
    }
    println!("PASS");
    Ok(Outcome::Pass)
}
