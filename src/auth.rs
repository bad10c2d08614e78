// One-shot TikTok token utility: OAuth 2.0 authorization code with PKCE.
// The user opens the printed URL, authorizes the app, pastes the code shown
// on the redirect page, and gets an access token to put in `.env`.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dialoguer::Input;
use rand::RngCore;
use reqwest::Url;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::api::ApiClient;
use crate::config::Settings;

const AUTHORIZE_URL: &str = "https://www.tiktok.com/v2/auth/authorize/";
const TOKEN_URL: &str = "https://open.tiktokapis.com/v2/oauth/token/";
const SCOPE: &str = "video.publish";

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Pkce {
            verifier,
            challenge,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

pub fn authorize_url(client_key: &str, redirect_uri: &str, pkce: &Pkce) -> Result<Url> {
    Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_key", client_key),
            ("scope", SCOPE),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", "S256"),
        ],
    )
    .context("failed to build authorization URL")
}

pub fn exchange_code(
    api: &ApiClient,
    token_url: &str,
    client_key: &str,
    client_secret: &str,
    redirect_uri: &str,
    code: &str,
    pkce: &Pkce,
) -> Result<TokenResponse> {
    let res = api
        .http()
        .post(token_url)
        .form(&[
            ("client_key", client_key),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
            ("code_verifier", pkce.verifier.as_str()),
        ])
        .send()
        .context("failed to send token request")?;
    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().unwrap_or_default();
        bail!("token exchange failed: {} - {}", status, txt);
    }
    res.json().context("parsing token response json")
}

/// Interactive flow behind `reelpost tiktok-auth`.
pub fn run(settings: &Settings) -> Result<()> {
    let client_key = std::env::var("TIKTOK_CLIENT_KEY")
        .ok()
        .or_else(|| settings.tiktok.client_key.clone())
        .context("TIKTOK_CLIENT_KEY is not set")?;
    let client_secret =
        std::env::var("TIKTOK_CLIENT_SECRET").context("TIKTOK_CLIENT_SECRET is not set")?;
    let redirect_uri = settings
        .tiktok
        .redirect_uri
        .clone()
        .context("tiktok.redirect_uri is not configured")?;

    let pkce = Pkce::generate();
    let url = authorize_url(&client_key, &redirect_uri, &pkce)?;
    println!("Open this URL in your browser and authorize the app:\n\n  {url}\n");

    let code: String = Input::new()
        .with_prompt("Code shown after authorization")
        .interact_text()?;
    let code = code.trim();
    if code.is_empty() {
        bail!("no authorization code given");
    }

    let api = ApiClient::new()?;
    let token = exchange_code(&api, TOKEN_URL, &client_key, &client_secret, &redirect_uri, code, &pkce)?;
    let Some(access_token) = token.access_token else {
        bail!(
            "token exchange returned no access token: {} {}",
            token.error.unwrap_or_default(),
            token.error_description.unwrap_or_default()
        );
    };

    println!("Access token  : {access_token}");
    println!("Refresh token : {}", token.refresh_token.as_deref().unwrap_or("N/A"));
    match token.expires_in {
        Some(secs) => println!("Expires in    : {secs}s"),
        None => println!("Expires in    : ?"),
    }
    println!("\nAdd to your .env:\nTIKTOK_ACCESS_TOKEN=\"{access_token}\"");
    Ok(())
}
