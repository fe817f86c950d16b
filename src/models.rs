use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

pub const DEFAULT_PAY: &str = "Not listed";
pub const DEFAULT_NOTES: &str = "No notes";
pub const NOT_AVAILABLE: &str = "N/A";
pub const MAX_RATING: u8 = 5;
pub const UNKNOWN_STATUS: &str = "Unknown";

static URL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://").expect("static regex"));

/// Where an application stands. Anything outside the four known values is kept
/// verbatim in `Other` so legacy data survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Status {
    Applied,
    Recruiter,
    Interview,
    Rejected,
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Applied => "Applied",
            Status::Recruiter => "Recruiter",
            Status::Interview => "Interview",
            Status::Rejected => "Rejected",
            Status::Other(raw) => raw,
        }
    }

    /// Lenient parse used for stored data: matches the known names
    /// case-insensitively and buckets everything else as `Other`.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Status::default();
        }
        raw.parse().unwrap_or_else(|_| Status::Other(raw.to_string()))
    }

    /// Rank used by the status sort. Unknown values land after Rejected.
    pub fn priority(&self) -> u8 {
        match self {
            Status::Interview => 0,
            Status::Recruiter => 1,
            Status::Applied => 2,
            Status::Rejected => 3,
            Status::Other(_) => 4,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Status::Rejected)
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "applied" => Ok(Status::Applied),
            "recruiter" => Ok(Status::Recruiter),
            "interview" => Ok(Status::Interview),
            "rejected" => Ok(Status::Rejected),
            _ => Err(format!(
                "unknown status '{}' (expected Applied, Recruiter, Interview or Rejected)",
                s
            )),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Other(UNKNOWN_STATUS.to_string())
    }
}

// Stored statuses may be null, numbers or anything else an older client
// wrote; none of those may fail the record.
impl<'de> Deserialize<'de> for Status {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(raw) => Status::parse_lenient(&raw),
            Value::Number(n) => Status::Other(n.to_string()),
            Value::Bool(b) => Status::Other(b.to_string()),
            _ => Status::default(),
        })
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub position: String,
    #[serde(default = "default_pay", deserialize_with = "pay_or_default")]
    pub pay: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_applied: String,
    #[serde(default = "not_available", deserialize_with = "string_or_not_available")]
    pub contact_name: String,
    #[serde(default, deserialize_with = "lenient_contacts")]
    pub additional_contacts: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default = "not_available", deserialize_with = "string_or_not_available")]
    pub follow_up_date: String,
    #[serde(default = "default_notes", deserialize_with = "notes_or_default")]
    pub notes: String,
    #[serde(default, deserialize_with = "deserialize_rating")]
    pub likelihood_rating: u8,
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_url: String,
    #[serde(default, deserialize_with = "lenient_phone", skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

fn default_pay() -> String {
    DEFAULT_PAY.to_string()
}

fn default_notes() -> String {
    DEFAULT_NOTES.to_string()
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

// Older clients wrote nulls, numbers and strings interchangeably.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn pay_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_else(default_pay))
}

fn notes_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_else(default_notes))
}

fn string_or_not_available<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_else(not_available))
}

fn lenient_phone<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).filter(|p| !p.trim().is_empty()))
}

fn lenient_contacts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
        Value::String(text) => parse_contacts(&text),
        _ => Vec::new(),
    })
}

// The id is the one field a record cannot do without.
fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| serde::de::Error::custom("id out of range")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid id '{}'", s))),
        other => Err(serde::de::Error::custom(format!("invalid id {}", other))),
    }
}

fn deserialize_rating<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    };
    Ok(clamp_rating(raw))
}

pub fn clamp_rating(raw: i64) -> u8 {
    raw.clamp(0, MAX_RATING as i64) as u8
}

impl JobRecord {
    pub fn from_form(form: RecordForm, id: i64) -> Self {
        Self {
            id,
            job_name: form.job_name.trim().to_string(),
            position: form.position.trim().to_string(),
            pay: non_empty(form.pay).unwrap_or_else(default_pay),
            location: form.location.trim().to_string(),
            date_applied: form.date_applied.trim().to_string(),
            contact_name: non_empty(form.contact_name).unwrap_or_else(not_available),
            additional_contacts: parse_contacts(&form.additional_contacts.join("\n")),
            source: form.source.trim().to_string(),
            status: form.status,
            follow_up_date: non_empty(form.follow_up_date).unwrap_or_else(not_available),
            notes: non_empty(form.notes).unwrap_or_else(default_notes),
            likelihood_rating: clamp_rating(form.likelihood_rating.unwrap_or(0)),
            job_url: normalize_url(form.job_url.as_deref().unwrap_or("")),
            contact_phone: None,
        }
    }

    pub fn applied_on(&self) -> Option<NaiveDate> {
        parse_date(&self.date_applied)
    }

    pub fn follow_up_on(&self) -> Option<NaiveDate> {
        if self.follow_up_date == NOT_AVAILABLE {
            return None;
        }
        parse_date(&self.follow_up_date)
    }

    pub fn is_rejected(&self) -> bool {
        self.status.is_rejected()
    }

    /// Primary contact followed by the additional ones, skipping the "N/A"
    /// placeholder.
    pub fn contacts(&self) -> Vec<&str> {
        let mut contacts = Vec::new();
        if !self.contact_name.is_empty() && self.contact_name != NOT_AVAILABLE {
            contacts.push(self.contact_name.as_str());
        }
        contacts.extend(self.additional_contacts.iter().map(String::as_str));
        contacts
    }

    pub fn has_notes(&self) -> bool {
        self.notes != DEFAULT_NOTES && !self.notes.trim().is_empty()
    }
}

/// Input for a new application, already split into fields.
#[derive(Debug, Clone, clap::Args)]
pub struct RecordForm {
    /// Company name
    #[arg(long = "company")]
    pub job_name: String,

    /// Position title
    #[arg(long)]
    pub position: String,

    /// Location or "Remote"
    #[arg(long)]
    pub location: String,

    /// Where the posting was found
    #[arg(long)]
    pub source: String,

    /// Date applied (YYYY-MM-DD)
    #[arg(long = "applied")]
    pub date_applied: String,

    /// Applied, Recruiter, Interview or Rejected
    #[arg(long, default_value = "Applied")]
    pub status: Status,

    /// Pay range as free text
    #[arg(long)]
    pub pay: Option<String>,

    /// Primary contact
    #[arg(long = "contact")]
    pub contact_name: Option<String>,

    /// Additional contact, may be repeated or newline separated
    #[arg(long = "also")]
    pub additional_contacts: Vec<String>,

    /// Follow up date (YYYY-MM-DD)
    #[arg(long = "follow-up")]
    pub follow_up_date: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Likelihood of an offer, 0 to 5
    #[arg(long = "rating")]
    pub likelihood_rating: Option<i64>,

    /// Posting URL; https:// is added when no scheme is given
    #[arg(long = "url")]
    pub job_url: Option<String>,
}

/// Changes applied to an existing application. Unset fields are left alone;
/// the id is never touched.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RecordEdit {
    #[arg(long = "company")]
    pub job_name: Option<String>,
    #[arg(long)]
    pub position: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long = "applied")]
    pub date_applied: Option<String>,
    #[arg(long)]
    pub status: Option<Status>,
    #[arg(long)]
    pub pay: Option<String>,
    #[arg(long = "contact")]
    pub contact_name: Option<String>,
    /// Replaces the additional contacts when given
    #[arg(long = "also")]
    pub additional_contacts: Option<Vec<String>>,
    #[arg(long = "follow-up")]
    pub follow_up_date: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long = "rating")]
    pub likelihood_rating: Option<i64>,
    #[arg(long = "url")]
    pub job_url: Option<String>,
    /// Contact phone; pass an empty string to remove it
    #[arg(long = "phone")]
    pub contact_phone: Option<String>,
}

impl RecordEdit {
    pub fn is_empty(&self) -> bool {
        self.job_name.is_none()
            && self.position.is_none()
            && self.location.is_none()
            && self.source.is_none()
            && self.date_applied.is_none()
            && self.status.is_none()
            && self.pay.is_none()
            && self.contact_name.is_none()
            && self.additional_contacts.is_none()
            && self.follow_up_date.is_none()
            && self.notes.is_none()
            && self.likelihood_rating.is_none()
            && self.job_url.is_none()
            && self.contact_phone.is_none()
    }

    pub fn apply(&self, record: &mut JobRecord) {
        if let Some(v) = required(&self.job_name) {
            record.job_name = v;
        }
        if let Some(v) = required(&self.position) {
            record.position = v;
        }
        if let Some(v) = required(&self.location) {
            record.location = v;
        }
        if let Some(v) = required(&self.source) {
            record.source = v;
        }
        if let Some(v) = required(&self.date_applied) {
            record.date_applied = v;
        }
        if let Some(status) = &self.status {
            record.status = status.clone();
        }
        if let Some(pay) = &self.pay {
            record.pay = non_empty(Some(pay.clone())).unwrap_or_else(default_pay);
        }
        if let Some(name) = required(&self.contact_name) {
            record.contact_name = name;
        } else if record.contact_name.trim().is_empty() {
            record.contact_name = not_available();
        }
        if let Some(contacts) = &self.additional_contacts {
            record.additional_contacts = parse_contacts(&contacts.join("\n"));
        }
        if let Some(date) = &self.follow_up_date {
            record.follow_up_date = non_empty(Some(date.clone())).unwrap_or_else(not_available);
        }
        if let Some(notes) = &self.notes {
            record.notes = non_empty(Some(notes.clone())).unwrap_or_else(default_notes);
        }
        if let Some(rating) = self.likelihood_rating {
            record.likelihood_rating = clamp_rating(rating);
        }
        if let Some(url) = &self.job_url {
            record.job_url = normalize_url(url);
        }
        if let Some(phone) = &self.contact_phone {
            record.contact_phone = non_empty(Some(phone.clone()));
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: &Option<String>) -> Option<String> {
    non_empty(value.clone())
}

/// Adds `https://` unless the URL already carries an http(s) scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    if URL_SCHEME.is_match(url) {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// One contact per line; lines are trimmed and blanks dropped.
pub fn parse_contacts(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Long form used in listings, e.g. "January 5, 2024".
pub fn format_date(raw: &str) -> String {
    if raw.trim().is_empty() || raw == NOT_AVAILABLE {
        return NOT_AVAILABLE.to_string();
    }
    match parse_date(raw) {
        Some(date) => date.format("%B %-d, %Y").to_string(),
        None => raw.to_string(),
    }
}

/// Creation timestamp id, bumped past the largest existing id so two adds in
/// the same millisecond never collide.
pub fn next_id(existing: &[JobRecord], now_ms: i64) -> i64 {
    let max = existing.iter().map(|r| r.id).max().unwrap_or(i64::MIN);
    now_ms.max(max.saturating_add(1))
}

#[cfg(test)]
pub(crate) fn record(id: i64, status: Status, rating: u8, date: &str) -> JobRecord {
    JobRecord {
        id,
        job_name: format!("Company {}", id),
        position: "Engineer".to_string(),
        pay: default_pay(),
        location: "Remote".to_string(),
        date_applied: date.to_string(),
        contact_name: not_available(),
        additional_contacts: Vec::new(),
        source: "LinkedIn".to_string(),
        status,
        follow_up_date: not_available(),
        notes: default_notes(),
        likelihood_rating: rating,
        job_url: String::new(),
        contact_phone: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RecordForm {
        RecordForm {
            job_name: " Acme ".to_string(),
            position: "Backend Engineer".to_string(),
            location: "Remote".to_string(),
            source: "Referral".to_string(),
            date_applied: "2024-03-01".to_string(),
            status: Status::Applied,
            pay: None,
            contact_name: Some("".to_string()),
            additional_contacts: vec!["Jane Doe\r\n\n  Bob  ".to_string()],
            follow_up_date: None,
            notes: None,
            likelihood_rating: Some(9),
            job_url: Some("acme.dev/jobs/1".to_string()),
        }
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("http://x.com"), "http://x.com");
        assert_eq!(normalize_url("HTTPS://X.com"), "HTTPS://X.com");
        assert_eq!(normalize_url("  "), "");
        assert_eq!(normalize_url(" www.x.com/a "), "https://www.x.com/a");
    }

    #[test]
    fn test_parse_contacts_drops_blank_lines() {
        assert_eq!(
            parse_contacts("Alice\r\n\n  Bob \n\t\nCarol"),
            vec!["Alice", "Bob", "Carol"]
        );
        assert!(parse_contacts("").is_empty());
    }

    #[test]
    fn test_from_form_applies_defaults() {
        let record = JobRecord::from_form(form(), 42);
        assert_eq!(record.id, 42);
        assert_eq!(record.job_name, "Acme");
        assert_eq!(record.pay, DEFAULT_PAY);
        assert_eq!(record.contact_name, NOT_AVAILABLE);
        assert_eq!(record.additional_contacts, vec!["Jane Doe", "Bob"]);
        assert_eq!(record.follow_up_date, NOT_AVAILABLE);
        assert_eq!(record.notes, DEFAULT_NOTES);
        assert_eq!(record.likelihood_rating, 5);
        assert_eq!(record.job_url, "https://acme.dev/jobs/1");
        assert_eq!(record.contact_phone, None);
    }

    #[test]
    fn test_rating_is_clamped() {
        assert_eq!(clamp_rating(-3), 0);
        assert_eq!(clamp_rating(3), 3);
        assert_eq!(clamp_rating(12), 5);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("interview".parse::<Status>().unwrap(), Status::Interview);
        assert_eq!(" Rejected ".parse::<Status>().unwrap(), Status::Rejected);
        assert!("Ghosted".parse::<Status>().is_err());
        assert_eq!(
            Status::parse_lenient("Ghosted"),
            Status::Other("Ghosted".to_string())
        );
        assert_eq!(Status::Other("x".to_string()).priority(), 4);
    }

    #[test]
    fn test_deserialize_legacy_record() {
        let raw = r#"{
            "id": 1700000000000,
            "jobName": "Acme",
            "position": "Dev",
            "location": "NYC",
            "dateApplied": "2024-01-02",
            "source": "Indeed",
            "status": "Phone Screen",
            "likelihoodRating": "4"
        }"#;
        let record: JobRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.status, Status::Other("Phone Screen".to_string()));
        assert_eq!(record.likelihood_rating, 4);
        assert_eq!(record.pay, DEFAULT_PAY);
        assert_eq!(record.notes, DEFAULT_NOTES);
        assert!(record.additional_contacts.is_empty());

        let raw = r#"{"id":1,"jobName":"a","position":"b","location":"c",
            "dateApplied":"2024-01-02","source":"d","status":"applied",
            "likelihoodRating":17}"#;
        let record: JobRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.status, Status::Applied);
        assert_eq!(record.likelihood_rating, 5);
    }

    #[test]
    fn test_non_string_status_lands_in_unknown_bucket() {
        let base = r#"{"id":3,"jobName":"Acme","position":"Dev","location":"NYC",
            "dateApplied":"2024-01-02","source":"Indeed","#;

        let record: JobRecord = serde_json::from_str(&format!("{}\"status\":null}}", base)).unwrap();
        assert_eq!(record.status, Status::Other(UNKNOWN_STATUS.to_string()));
        assert_eq!(record.status.priority(), 4);

        let record: JobRecord = serde_json::from_str(&format!("{}\"status\":2}}", base)).unwrap();
        assert_eq!(record.status, Status::Other("2".to_string()));
        assert_eq!(record.status.priority(), 4);

        let record: JobRecord = serde_json::from_str(&format!("{}\"status\":{{\"a\":1}}}}", base)).unwrap();
        assert_eq!(record.status.priority(), 4);

        let record: JobRecord = serde_json::from_str(r#"{"id":4}"#).unwrap();
        assert_eq!(record.status.priority(), 4);
        assert!(!record.is_rejected());

        // The unknown bucket survives being written back.
        let again: JobRecord = serde_json::from_value(serde_json::to_value(&record).unwrap()).unwrap();
        assert_eq!(again, record);
    }

    #[test]
    fn test_null_and_missing_fields_take_defaults() {
        let raw = r#"{"id":"17","jobName":"Keep","position":null,"location":null,
            "dateApplied":null,"source":7,"status":"Interview","pay":null,
            "contactName":null,"additionalContacts":["Ann",null,3],"followUpDate":null,
            "notes":null,"likelihoodRating":null,"jobUrl":null,"contactPhone":5550100}"#;
        let record: JobRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.id, 17);
        assert_eq!(record.job_name, "Keep");
        assert_eq!(record.position, "");
        assert_eq!(record.location, "");
        assert_eq!(record.source, "7");
        assert_eq!(record.pay, DEFAULT_PAY);
        assert_eq!(record.contact_name, NOT_AVAILABLE);
        assert_eq!(record.additional_contacts, vec!["Ann", "3"]);
        assert_eq!(record.follow_up_date, NOT_AVAILABLE);
        assert_eq!(record.notes, DEFAULT_NOTES);
        assert_eq!(record.likelihood_rating, 0);
        assert_eq!(record.contact_phone.as_deref(), Some("5550100"));
    }

    #[test]
    fn test_record_without_usable_id_is_rejected() {
        assert!(serde_json::from_str::<JobRecord>(r#"{"jobName":"x"}"#).is_err());
        assert!(serde_json::from_str::<JobRecord>(r#"{"id":null}"#).is_err());
        assert!(serde_json::from_str::<JobRecord>(r#"{"id":"abc"}"#).is_err());
    }

    #[test]
    fn test_serializes_camel_case_fields() {
        let value = serde_json::to_value(record(7, Status::Interview, 2, "2024-01-01")).unwrap();
        assert_eq!(value["jobName"], "Company 7");
        assert_eq!(value["dateApplied"], "2024-01-01");
        assert_eq!(value["likelihoodRating"], 2);
        assert_eq!(value["status"], "Interview");
        assert!(value.get("contactPhone").is_none());
    }

    #[test]
    fn test_edit_keeps_id_and_applies_fields() {
        let mut record = record(9, Status::Applied, 1, "2024-01-01");
        let edit = RecordEdit {
            status: Some(Status::Interview),
            notes: Some("  ".to_string()),
            likelihood_rating: Some(-1),
            job_url: Some("jobs.example.com".to_string()),
            contact_phone: Some("555-0100".to_string()),
            additional_contacts: Some(vec!["A\n\nB".to_string()]),
            ..Default::default()
        };
        edit.apply(&mut record);
        assert_eq!(record.id, 9);
        assert_eq!(record.status, Status::Interview);
        assert_eq!(record.notes, DEFAULT_NOTES);
        assert_eq!(record.likelihood_rating, 0);
        assert_eq!(record.job_url, "https://jobs.example.com");
        assert_eq!(record.contact_phone.as_deref(), Some("555-0100"));
        assert_eq!(record.additional_contacts, vec!["A", "B"]);
        assert_eq!(record.contact_name, NOT_AVAILABLE);
    }

    #[test]
    fn test_parse_and_format_dates() {
        assert_eq!(format_date("2024-01-05"), "January 5, 2024");
        assert_eq!(format_date(""), "N/A");
        assert_eq!(format_date("N/A"), "N/A");
        assert_eq!(format_date("soon"), "soon");
        assert!(parse_date("2024-13-40").is_none());
        assert_eq!(
            parse_date("2024-02-03T10:00:00Z"),
            NaiveDate::from_ymd_opt(2024, 2, 3)
        );
    }

    #[test]
    fn test_next_id_never_collides() {
        let existing = vec![record(1_000, Status::Applied, 0, "")];
        assert_eq!(next_id(&existing, 500), 1_001);
        assert_eq!(next_id(&existing, 5_000), 5_000);
        assert_eq!(next_id(&[], 5_000), 5_000);
    }

    #[test]
    fn test_contacts_skip_placeholder() {
        let mut r = record(1, Status::Applied, 0, "2024-01-01");
        r.additional_contacts = vec!["Bob".to_string()];
        assert_eq!(r.contacts(), vec!["Bob"]);
        r.contact_name = "Alice".to_string();
        assert_eq!(r.contacts(), vec!["Alice", "Bob"]);
    }
}
