//! API route handlers for the gateway.

use axum::Json;
use axum::extract::{Path, Query, State};
use leadflow_campaign::{build_recipient_set, unique_categories};
use leadflow_core::types::{LeadPatch, NewLead, NewUser, Recipient, UserPatch};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ApiError;
use crate::server::AppState;

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "leadflow-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "campaign": state.campaign.status().status,
    }))
}

// ── Leads ─────────────────────────────────

pub async fn list_leads(State(state): State<Arc<AppState>>) -> ApiResult {
    let leads = state.db.list_leads()?;
    Ok(Json(serde_json::json!({"ok": true, "leads": leads})))
}

pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewLead>,
) -> ApiResult {
    let lead = state.db.create_lead(&body)?;
    tracing::info!("📇 Lead created: {} (id={})", lead.name, lead.id);
    Ok(Json(serde_json::json!({"ok": true, "lead": lead})))
}

/// A body carrying only `status` is a column move; anything else is a full edit.
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<LeadPatch>,
) -> ApiResult {
    let lead = match body.status {
        Some(status) if body.is_status_only() => state.db.update_lead_status(id, status)?,
        _ => state.db.update_lead(id, &body)?,
    };
    Ok(Json(serde_json::json!({"ok": true, "lead": lead})))
}

pub async fn delete_lead(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult {
    state.db.delete_lead(id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

pub async fn list_categories(State(state): State<Arc<AppState>>) -> ApiResult {
    let categories = state.db.categories()?;
    Ok(Json(serde_json::json!({"ok": true, "categories": categories})))
}

// ── Users ─────────────────────────────────

pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult {
    let users = state.db.list_users()?;
    Ok(Json(serde_json::json!({"ok": true, "users": users})))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewUser>,
) -> ApiResult {
    let user = state.db.create_user(&body)?;
    Ok(Json(serde_json::json!({"ok": true, "user": user})))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<UserPatch>,
) -> ApiResult {
    let user = state.db.update_user(id, &body)?;
    Ok(Json(serde_json::json!({"ok": true, "user": user})))
}

pub async fn delete_user(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult {
    state.db.delete_user(id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub date: Option<String>,
    pub user_id: Option<i64>,
}

/// Daily goal progress. `date` defaults to today (UTC).
pub async fn daily_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult {
    let date = query
        .date
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());
    let metrics = state.db.daily_metrics(&date, query.user_id)?;
    Ok(Json(serde_json::json!({"ok": true, "date": date, "metrics": metrics})))
}

// ── Campaign ──────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartCampaign {
    pub message: String,
    /// Defaults to every lead on the board.
    #[serde(default)]
    pub lead_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub category: Option<String>,
}

fn campaign_snapshot(state: &AppState) -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "channel": state.campaign.channel_name(),
        "campaign": state.campaign.status(),
        "recipients": state.campaign.recipients(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipientFilter {
    #[serde(default)]
    pub lead_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Snapshot the board in creation order and apply the selection and category filter.
fn snapshot_recipients(
    state: &AppState,
    lead_ids: Option<Vec<i64>>,
    category: Option<&str>,
) -> Result<(Vec<Recipient>, Vec<Recipient>), ApiError> {
    let leads = state.db.list_leads_in_order()?;
    let all: Vec<Recipient> = leads.iter().map(Recipient::from).collect();
    let selected: HashSet<i64> = match lead_ids {
        Some(ids) => ids.into_iter().collect(),
        None => all.iter().map(|r| r.id).collect(),
    };
    let recipients = build_recipient_set(&all, &selected, category);
    Ok((all, recipients))
}

/// Who a campaign would reach with this filter, without starting it.
pub async fn campaign_preview(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecipientFilter>,
) -> ApiResult {
    let (all, recipients) = snapshot_recipients(&state, body.lead_ids, body.category.as_deref())?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "categories": unique_categories(&all),
        "recipients": recipients,
    })))
}

pub async fn campaign_start(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartCampaign>,
) -> ApiResult {
    let (_, recipients) = snapshot_recipients(&state, body.lead_ids, body.category.as_deref())?;
    state.campaign.start(&body.message, recipients)?;
    Ok(Json(campaign_snapshot(&state)))
}

pub async fn campaign_pause(State(state): State<Arc<AppState>>) -> ApiResult {
    state.campaign.pause()?;
    Ok(Json(campaign_snapshot(&state)))
}

pub async fn campaign_resume(State(state): State<Arc<AppState>>) -> ApiResult {
    state.campaign.resume()?;
    Ok(Json(campaign_snapshot(&state)))
}

pub async fn campaign_stop(State(state): State<Arc<AppState>>) -> ApiResult {
    state.campaign.stop();
    Ok(Json(campaign_snapshot(&state)))
}

pub async fn campaign_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(campaign_snapshot(&state))
}

pub async fn campaign_events(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true, "events": state.campaign.history()}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_campaign::CampaignStatus;
    use leadflow_channels::DryRunChannel;
    use leadflow_core::config::LeadflowConfig;
    use leadflow_core::types::LeadStatus;
    use leadflow_store::LeadDb;

    fn test_state() -> State<Arc<AppState>> {
        let db = Arc::new(LeadDb::open(std::path::Path::new(":memory:")).unwrap());
        State(Arc::new(AppState::new(
            &LeadflowConfig::default(),
            db,
            Arc::new(DryRunChannel::new()),
        )))
    }

    fn add_lead(state: &State<Arc<AppState>>, name: &str, category: &str, contact: &str) -> i64 {
        state
            .db
            .create_lead(&NewLead {
                name: name.into(),
                category: Some(category.into()),
                contact: Some(contact.into()),
                ..Default::default()
            })
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_health_check() {
        let json = health_check(test_state()).await.0;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "leadflow-gateway");
        assert_eq!(json["campaign"], "idle");
    }

    #[tokio::test]
    async fn test_list_leads_and_categories() {
        let state = test_state();
        add_lead(&state, "Clínica A", "Clínica", "11 90000-0001");
        add_lead(&state, "Academia B", "Academia", "11 90000-0002");

        let leads = list_leads(state.clone()).await.unwrap().0;
        assert_eq!(leads["leads"].as_array().unwrap().len(), 2);

        let cats = list_categories(state).await.unwrap().0;
        assert_eq!(cats["categories"], serde_json::json!(["Academia", "Clínica"]));
    }

    #[tokio::test]
    async fn test_full_update_keeps_other_fields() {
        let state = test_state();
        let id = add_lead(&state, "Loja", "Varejo", "11 90000-0003");
        let patch = LeadPatch {
            notes: Some("retornar sexta".into()),
            status: Some(LeadStatus::FollowUp),
            ..Default::default()
        };
        let json = update_lead(state, Path(id), Json(patch)).await.unwrap().0;
        assert_eq!(json["lead"]["status"], "follow_up");
        assert_eq!(json["lead"]["notes"], "retornar sexta");
        assert_eq!(json["lead"]["category"], "Varejo");
    }

    #[tokio::test]
    async fn test_daily_metrics_defaults_to_today() {
        let state = test_state();
        let json = daily_metrics(state, Query(MetricsQuery::default())).await.unwrap().0;
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        assert_eq!(json["date"], today);
        assert_eq!(json["metrics"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_routes() {
        let state = test_state();
        let body = NewUser {
            name: "Carla".into(),
            email: "carla@empresa.com".into(),
            role: "vendedor".into(),
            daily_goal: 4,
        };
        let created = create_user(state.clone(), Json(body)).await.unwrap().0;
        let id = created["user"]["id"].as_i64().unwrap();

        let patch = UserPatch {
            role: Some("gestor".into()),
            ..Default::default()
        };
        let updated = update_user(state.clone(), Path(id), Json(patch)).await.unwrap().0;
        assert_eq!(updated["user"]["role"], "gestor");

        delete_user(state.clone(), Path(id)).await.unwrap();
        let users = list_users(state).await.unwrap().0;
        assert_eq!(users["users"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_campaign_start_filters_by_category_and_selection() {
        let state = test_state();
        let a = add_lead(&state, "Clínica A", "Clínica", "11 90000-0001");
        let _b = add_lead(&state, "Academia B", "Academia", "11 90000-0002");
        let c = add_lead(&state, "Clínica C", "clínica", "11 90000-0003");
        let d = add_lead(&state, "Clínica D", "Clínica", "11 90000-0004");

        let body = StartCampaign {
            message: "Olá!".into(),
            lead_ids: Some(vec![d, a, c]),
            category: Some("CLÍNICA".into()),
        };
        let json = campaign_start(state.clone(), Json(body)).await.unwrap().0;
        let ids: Vec<i64> = json["recipients"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![a, c, d]);
        assert_eq!(json["campaign"]["status"], "running");
        assert_eq!(json["channel"], "dry-run");

        let err = campaign_resume(state.clone()).await.unwrap_err();
        assert!(matches!(err, ApiError::Campaign(_)));

        campaign_pause(state.clone()).await.unwrap();
        assert_eq!(state.campaign.status().status, CampaignStatus::Paused);

        let stopped = campaign_stop(state.clone()).await.unwrap().0;
        assert_eq!(stopped["campaign"]["status"], "idle");

        let events = campaign_events(state).await.0;
        let kinds: Vec<&str> = events["events"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["event"]["kind"].as_str())
            .collect();
        assert!(kinds.contains(&"started"));
        assert!(kinds.contains(&"stopped"));
    }

    #[tokio::test]
    async fn test_campaign_preview() {
        let state = test_state();
        let a = add_lead(&state, "Clínica A", "Clínica", "11 90000-0001");
        add_lead(&state, "Loja B", "Loja", "11 90000-0002");

        let body = RecipientFilter {
            lead_ids: None,
            category: Some("clínica".into()),
        };
        let json = campaign_preview(state.clone(), Json(body)).await.unwrap().0;
        assert_eq!(json["categories"], serde_json::json!(["Clínica", "Loja"]));
        let recipients = json["recipients"].as_array().unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0]["id"], a);
        assert_eq!(state.campaign.status().status, CampaignStatus::Idle);
    }

    #[tokio::test]
    async fn test_campaign_start_rejects_blank_message() {
        let state = test_state();
        add_lead(&state, "Loja", "Varejo", "11 90000-0005");
        let body = StartCampaign {
            message: "  ".into(),
            lead_ids: None,
            category: None,
        };
        let err = campaign_start(state, Json(body)).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
