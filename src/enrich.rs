//! Optional company enrichment via the Harmonic API.
//!
//! Given a website domain, fetch the company's structured profile,
//! condense it to the investor-relevant core, and summarize that into a
//! short narrative for the synthesis prompt. Inside the analysis
//! pipeline every failure here degrades to "no enrichment" — the deck
//! analysis never fails because a third-party lookup did. The standalone
//! `/enrich` endpoint is the exception: there the lookup is the product,
//! so errors surface.

use crate::config::AnalysisConfig;
use crate::error::PitchlensError;
use crate::llm::{chat_with_retry, ChatClient, ChatMessage, CompletionOptions};
use crate::prompts::ENRICHMENT_SYSTEM_PROMPT;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Failures talking to the enrichment provider.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("enrichment request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("enrichment provider returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

// ────────────────────────────────────────────────────────────────────
// Profile types
// ────────────────────────────────────────────────────────────────────

/// The provider's company record. Every field is optional — coverage
/// varies wildly by company, and absent data must deserialize cleanly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub funding_rounds: Vec<FundingRound>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub employees: Vec<Employee>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub employee_highlights: Vec<EmployeeHighlight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_media: Option<SocialMedia>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundingRound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub investors: Vec<Investor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Investor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub investor_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Employee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seniority_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeeHighlight {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialMedia {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_followers: Option<u64>,
}

// ────────────────────────────────────────────────────────────────────
// Condensation
// ────────────────────────────────────────────────────────────────────

/// Highlight categories worth a model's attention. Everything else
/// ("Remote friendly", press fluff) is noise at memo-writing time.
const HIGHLIGHT_CATEGORIES: &[&str] = &[
    "prior exit",
    "major tech company experience",
    "top university",
    "prior vc backed",
    "deep technical background",
    "seasoned operator",
];

/// The investor-relevant core of a [`CompanyProfile`], bounded in size
/// so it fits a prompt: employees truncated, highlights filtered,
/// funding history kept whole.
#[derive(Debug, Clone, Serialize)]
pub struct CondensedProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founded_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub funding_rounds: Vec<FundingRound>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub employees: Vec<Employee>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub employee_highlights: Vec<EmployeeHighlight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_media: Option<SocialMedia>,
}

/// Condense a raw profile for prompting. `max_employees` bounds the
/// roster; highlights are kept only when their category is on the
/// allow-list (case-insensitive).
pub fn condense(profile: &CompanyProfile, max_employees: usize) -> CondensedProfile {
    let employees = profile
        .employees
        .iter()
        .take(max_employees)
        .cloned()
        .collect();

    let employee_highlights = profile
        .employee_highlights
        .iter()
        .filter(|h| {
            let category = h.category.to_lowercase();
            HIGHLIGHT_CATEGORIES.iter().any(|allowed| category == *allowed)
        })
        .cloned()
        .collect();

    CondensedProfile {
        name: profile.name.clone(),
        description: profile.description.clone(),
        founded_date: profile.founded_date.clone(),
        employee_count: profile.employee_count,
        funding_total: profile.funding_total,
        website_domain: profile.website_domain.clone(),
        industry: profile.industry.clone(),
        funding_rounds: profile.funding_rounds.clone(),
        employees,
        employee_highlights,
        social_media: profile.social_media.clone(),
    }
}

/// Turn a condensed profile into the short narrative fed to synthesis.
pub async fn summarize_profile(
    client: &dyn ChatClient,
    profile: &CondensedProfile,
    config: &AnalysisConfig,
) -> Result<String, PitchlensError> {
    let profile_json = serde_json::to_string_pretty(profile)
        .map_err(|e| PitchlensError::Internal(format!("profile serialization: {e}")))?;

    let messages = vec![
        ChatMessage::system(ENRICHMENT_SYSTEM_PROMPT),
        ChatMessage::user(profile_json),
    ];
    let options = CompletionOptions {
        model: Some(config.text_model.clone()),
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
    };

    let response = chat_with_retry(
        client,
        &messages,
        &options,
        config.max_retries,
        config.retry_backoff_ms,
        "enrichment summary",
    )
    .await?;

    Ok(response.content)
}

// ────────────────────────────────────────────────────────────────────
// Provider client
// ────────────────────────────────────────────────────────────────────

/// Lookup seam. `Ok(None)` means the provider has no record for the
/// domain; `Err` means the lookup itself failed.
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    async fn fetch(&self, domain: &str) -> Result<Option<CompanyProfile>, EnrichError>;
}

/// Harmonic returns a bare object for an exact domain match and an
/// array for fuzzier ones; accept both and take the first.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LookupResponse {
    Many(Vec<CompanyProfile>),
    One(Box<CompanyProfile>),
}

/// HTTP client for the Harmonic company-data API.
#[derive(Debug, Clone)]
pub struct HarmonicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HarmonicClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.harmonic.ai";

    pub fn new(api_key: impl Into<String>, timeout_seconds: u64) -> Result<Self, EnrichError> {
        Self::with_base_url(api_key, Self::DEFAULT_BASE_URL, timeout_seconds)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self, EnrichError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(HarmonicClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl EnrichmentClient for HarmonicClient {
    async fn fetch(&self, domain: &str) -> Result<Option<CompanyProfile>, EnrichError> {
        debug!("Enrichment lookup for domain {}", domain);

        // Enrichment-by-domain is a POST on this API, query-keyed.
        let response = self
            .client
            .post(format!("{}/companies", self.base_url))
            .query(&[("website_domain", domain), ("apikey", &self.api_key)])
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!("No enrichment record for {}", domain);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Status { status, body });
        }

        let profile = match response.json::<LookupResponse>().await? {
            LookupResponse::One(profile) => Some(*profile),
            LookupResponse::Many(mut profiles) => {
                if profiles.is_empty() {
                    None
                } else {
                    Some(profiles.remove(0))
                }
            }
        };

        if let Some(p) = &profile {
            info!(
                "Enriched {}: {} ({} employees on record)",
                domain,
                p.name.as_deref().unwrap_or("unnamed"),
                p.employee_count.map_or_else(|| "?".into(), |n| n.to_string()),
            );
        }
        Ok(profile)
    }
}
