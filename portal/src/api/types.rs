use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MeResponse {
    pub user_id: i64,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    #[serde(rename = "Current balance")]
    pub current_balance: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdjustBalanceRequest {
    pub email: String,
    pub amount: f64,
}

/// One entry of a recommendation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramLinkStatus {
    #[serde(default)]
    pub linked: bool,
    #[serde(default)]
    pub telegram_id: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TelegramLinkInitRequest {
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramLinkInitResponse {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientRecord {
    pub user_id: i64,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub code_gender: Option<String>,
    #[serde(default)]
    pub flag_own_car: Option<String>,
    #[serde(default)]
    pub flag_own_realty: Option<String>,
    #[serde(default)]
    pub cnt_children: Option<i64>,
    #[serde(default)]
    pub amt_income_total: Option<f64>,
    #[serde(default)]
    pub name_income_type: Option<String>,
    #[serde(default)]
    pub name_education_type: Option<String>,
    #[serde(default)]
    pub name_family_status: Option<String>,
    #[serde(default)]
    pub name_housing_type: Option<String>,
    #[serde(default)]
    pub days_birth: Option<i64>,
    #[serde(default)]
    pub days_employed: Option<i64>,
    #[serde(default)]
    pub flag_work_phone: Option<i64>,
    #[serde(default)]
    pub flag_phone: Option<i64>,
    #[serde(default)]
    pub flag_email: Option<i64>,
    #[serde(default)]
    pub occupation_type: Option<String>,
    #[serde(default)]
    pub cnt_fam_members: Option<i64>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub days_employed_bin: Option<String>,
}

/// Partial update sent by the manager page; absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_own_car: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_own_realty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnt_children: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amt_income_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_income_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_education_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_family_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_housing_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_birth: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_employed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_work_phone: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_phone: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_email: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnt_fam_members: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_employed_bin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSummary {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManagerSummary {
    pub user_id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreRecord {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub client_id: i64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreditRecord {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub client_id: i64,
    pub amount_total: f64,
    pub annual_rate: f64,
    #[serde(default)]
    pub payment_history: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientDashboard {
    pub client: ClientRecord,
    #[serde(default)]
    pub manager: Option<ManagerSummary>,
    #[serde(default)]
    pub credit: Option<CreditRecord>,
    #[serde(default)]
    pub score: Option<ScoreRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub login: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientDetail {
    pub client: ClientRecord,
    pub user: UserRecord,
}
