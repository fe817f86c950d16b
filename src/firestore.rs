use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::sync::{document_key, DocumentClient, RemoteDocument, SyncPlan};

const COLLECTION: &str = "jobApplications";
const PROBE_COLLECTION: &str = "__init_check__";
const PAGE_SIZE: &str = "300";
// Firestore rejects a commit with more writes than this.
const MAX_COMMIT_WRITES: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Firestore REST client scoped to `users/{uid}/jobApplications`.
#[derive(Debug)]
pub struct FirestoreClient {
    client: reqwest::blocking::Client,
    base_url: String,
    project_id: String,
    api_key: String,
    id_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(config: &RemoteConfig, id_token: Option<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: config.firestore_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            id_token,
        }
    }

    fn database(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_name(&self, uid: &str, key: &str) -> String {
        format!("{}/users/{}/{}/{}", self.database(), uid, COLLECTION, key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn request(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        let builder = builder.query(&[("key", self.api_key.as_str())]);
        match &self.id_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send(&self, builder: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response, RemoteError> {
        let response = self.request(builder).send()?;
        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    fn commit_body(&self, uid: &str, plan: &SyncPlan) -> Result<Value, RemoteError> {
        let mut writes = Vec::with_capacity(plan.len());
        for record in &plan.upserts {
            let value = serde_json::to_value(record)
                .map_err(|e| RemoteError::Decode(e.to_string()))?;
            let Value::Object(fields) = value else {
                return Err(RemoteError::Decode("record is not an object".to_string()));
            };
            writes.push(json!({
                "update": {
                    "name": self.document_name(uid, &document_key(record)),
                    "fields": encode_fields(&fields),
                }
            }));
        }
        for key in &plan.deletions {
            writes.push(json!({ "delete": self.document_name(uid, key) }));
        }
        Ok(json!({ "writes": writes }))
    }
}

impl DocumentClient for FirestoreClient {
    fn probe(&self) -> Result<(), RemoteError> {
        let url = self.url(&format!("{}/{}", self.database(), PROBE_COLLECTION));
        self.send(self.client.get(url).query(&[("pageSize", "1")]))?;
        Ok(())
    }

    fn list(&self, uid: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
        let url = self.url(&format!("{}/users/{}/{}", self.database(), uid, COLLECTION));
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut builder = self.client.get(&url).query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                builder = builder.query(&[("pageToken", token.as_str())]);
            }
            let page: ListResponse = self.send(builder)?.json()?;
            documents.extend(page.documents.into_iter().map(into_remote_document));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(uid, count = documents.len(), "listed remote documents");
        Ok(documents)
    }

    fn apply_batch(&self, uid: &str, plan: &SyncPlan) -> Result<(), RemoteError> {
        if plan.len() > MAX_COMMIT_WRITES {
            tracing::warn!(
                uid,
                writes = plan.len(),
                limit = MAX_COMMIT_WRITES,
                "batch is over the commit write limit and will likely be rejected"
            );
        }
        let body = self.commit_body(uid, plan)?;
        let url = self.url(&format!("{}:commit", self.database()));
        self.send(self.client.post(url).json(&body))?;
        Ok(())
    }
}

// A document whose fields cannot be decoded keeps its key with null fields,
// so it stays visible to the reconciler as unreadable instead of failing
// the whole listing.
fn into_remote_document(doc: FirestoreDocument) -> RemoteDocument {
    let key = doc.name.rsplit('/').next().unwrap_or_default().to_string();
    let fields = decode_fields(&doc.fields).unwrap_or_else(|e| {
        tracing::warn!(key = %key, error = %e, "could not decode document fields");
        Value::Null
    });
    RemoteDocument { key, fields }
}

// --- Typed value encoding ---

pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // Firestore sends and expects 64-bit integers as strings.
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Value, RemoteError> {
    let mut out = Map::new();
    for (name, value) in fields {
        out.insert(name.clone(), decode_value(value)?);
    }
    Ok(Value::Object(out))
}

pub fn decode_value(value: &Value) -> Result<Value, RemoteError> {
    let Some((kind, inner)) = value.as_object().and_then(|m| m.iter().next()) else {
        return Err(RemoteError::Decode(format!("untyped value {}", value)));
    };
    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" | "doubleValue" | "stringValue" | "timestampValue" | "referenceValue"
        | "bytesValue" | "geoPointValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| RemoteError::Decode(format!("bad integer {}", s)))?,
            other => other.clone(),
        },
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Value::Array(values)
        }
        "mapValue" => match inner.get("fields").and_then(Value::as_object) {
            Some(fields) => decode_fields(fields)?,
            None => Value::Object(Map::new()),
        },
        other => return Err(RemoteError::Decode(format!("unsupported value type {}", other))),
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{record, JobRecord, Status};

    #[test]
    fn test_encode_record_fields() {
        let mut r = record(1_700_000_000_123, Status::Interview, 4, "2024-01-01");
        r.additional_contacts = vec!["Ann".to_string()];
        let Value::Object(fields) = serde_json::to_value(&r).unwrap() else {
            panic!("record should serialize to an object");
        };
        let encoded = encode_fields(&fields);
        assert_eq!(encoded["id"], json!({ "integerValue": "1700000000123" }));
        assert_eq!(encoded["status"], json!({ "stringValue": "Interview" }));
        assert_eq!(
            encoded["additionalContacts"],
            json!({ "arrayValue": { "values": [{ "stringValue": "Ann" }] } })
        );
    }

    #[test]
    fn test_decode_firestore_document() {
        let doc = json!({
            "id": { "integerValue": "42" },
            "jobName": { "stringValue": "Acme" },
            "position": { "stringValue": "Dev" },
            "location": { "stringValue": "Remote" },
            "dateApplied": { "stringValue": "2024-05-01" },
            "source": { "stringValue": "Referral" },
            "status": { "stringValue": "Recruiter" },
            "likelihoodRating": { "integerValue": "3" },
            "additionalContacts": { "arrayValue": {} },
            "contactPhone": { "nullValue": null },
            "extra": { "mapValue": { "fields": { "ok": { "booleanValue": true } } } }
        });
        let decoded = decode_fields(doc.as_object().unwrap()).unwrap();
        assert_eq!(decoded["extra"], json!({ "ok": true }));
        let record: JobRecord = serde_json::from_value(decoded).unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.status, Status::Recruiter);
        assert_eq!(record.likelihood_rating, 3);
        assert!(record.additional_contacts.is_empty());
        assert_eq!(record.contact_phone, None);
    }

    #[test]
    fn test_round_trip_preserves_record() {
        let r = record(5, Status::Other("Offer".to_string()), 2, "2024-03-03");
        let Value::Object(fields) = serde_json::to_value(&r).unwrap() else {
            panic!("record should serialize to an object");
        };
        let back: JobRecord =
            serde_json::from_value(decode_fields(&encode_fields(&fields)).unwrap()).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_decode_rejects_untyped_values() {
        assert!(decode_value(&json!("plain")).is_err());
        assert!(decode_value(&json!({ "vectorValue": {} })).is_err());
        assert_eq!(
            decode_value(&json!({ "geoPointValue": { "latitude": 1.5 } })).unwrap(),
            json!({ "latitude": 1.5 })
        );
        assert!(decode_value(&json!({ "integerValue": "x" })).is_err());
    }

    #[test]
    fn test_undecodable_document_keeps_its_key() {
        let page: ListResponse = serde_json::from_value(json!({
            "documents": [
                {
                    "name": "projects/p/databases/(default)/documents/users/u1/jobApplications/1",
                    "fields": {
                        "id": { "integerValue": "1" },
                        "jobName": { "stringValue": "Acme" },
                        "logo": { "bytesValue": "AAEC" }
                    }
                },
                {
                    "name": "projects/p/databases/(default)/documents/users/u1/jobApplications/2",
                    "fields": { "id": { "integerValue": "2" }, "odd": { "fancyValue": 1 } }
                }
            ]
        }))
        .unwrap();
        let docs: Vec<RemoteDocument> = page.documents.into_iter().map(into_remote_document).collect();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].key, "1");
        assert_eq!(docs[0].decode().unwrap().job_name, "Acme");
        assert_eq!(docs[1].key, "2");
        assert_eq!(docs[1].fields, Value::Null);
        assert!(docs[1].decode().is_err());
    }

    #[test]
    fn test_commit_body_writes() {
        let config = RemoteConfig {
            project_id: "demo".to_string(),
            ..RemoteConfig::default()
        };
        let client = FirestoreClient::new(&config, None);
        let plan = SyncPlan {
            upserts: vec![record(7, Status::Applied, 1, "2024-01-01")],
            deletions: vec!["3".to_string()],
        };
        let body = client.commit_body("u1", &plan).unwrap();
        let writes = body["writes"].as_array().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(
            writes[0]["update"]["name"],
            "projects/demo/databases/(default)/documents/users/u1/jobApplications/7"
        );
        assert_eq!(writes[0]["update"]["fields"]["id"], json!({ "integerValue": "7" }));
        assert_eq!(
            writes[1]["delete"],
            "projects/demo/databases/(default)/documents/users/u1/jobApplications/3"
        );
    }

    #[test]
    fn test_document_names() {
        let config = RemoteConfig {
            project_id: "demo".to_string(),
            api_key: "k".to_string(),
            ..RemoteConfig::default()
        };
        let client = FirestoreClient::new(&config, None);
        assert_eq!(
            client.document_name("u1", "7"),
            "projects/demo/databases/(default)/documents/users/u1/jobApplications/7"
        );
        assert_eq!(
            client.url("x"),
            "https://firestore.googleapis.com/v1/x"
        );
    }
}
