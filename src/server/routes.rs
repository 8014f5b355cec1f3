use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use crate::server::AppState;
use crate::grading::RawScores;
use crate::messaging::{MessageLog, SendMessage};
use crate::model::{
    lenient_text, MarkSheetRow, Message, NewStudent, ParentsInput, StudentOverview, StudentPatch,
    StudentRecord,
};
use crate::records::RecordService;
use crate::Error;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct CreateStudentBody {
    #[serde(flatten)]
    pub student: NewStudent,
    #[serde(default)]
    pub parents: Option<ParentsInput>,
}

#[derive(Deserialize)]
pub struct UpdateStudentBody {
    #[serde(flatten)]
    pub patch: StudentPatch,
    #[serde(default)]
    pub parents: Option<ParentsInput>,
}

#[derive(Deserialize)]
pub struct MarksBody {
    #[serde(default, deserialize_with = "lenient_text")]
    pub rollno: Option<String>,
    #[serde(flatten)]
    pub scores: RawScores,
}

#[derive(Deserialize)]
pub struct MessagesParams {
    pub rollno: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

/// Map a core error onto its HTTP status
pub fn reject(err: Error) -> ApiError {
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::Storage(e) => {
            tracing::error!("storage failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse { error: err.to_string(), kind: err.kind() }))
}

/// Unwrap a JSON body, reporting a malformed one as a validation error
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| reject(Error::Validation(rejection.body_text())))
}

fn query_params<T>(params: std::result::Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| reject(Error::Validation(rejection.body_text())))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "database": state.database_path.display().to_string(),
    }))
}

pub async fn list_students(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<StudentOverview>>> {
    let mut store = state.store.lock().await;
    let rows = RecordService::new(&mut store).list_students().map_err(reject)?;
    Ok(Json(rows))
}

pub async fn get_student(
    State(state): State<Arc<AppState>>,
    Path(rollno): Path<String>,
) -> ApiResult<Json<StudentRecord>> {
    let mut store = state.store.lock().await;
    let record = RecordService::new(&mut store).get_student_record(&rollno).map_err(reject)?;
    Ok(Json(record))
}

pub async fn create_student(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CreateStudentBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let body = json_body(payload)?;
    let mut store = state.store.lock().await;
    RecordService::new(&mut store)
        .create_student_record(body.student, body.parents)
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(json!({ "ok": true }))))
}

pub async fn update_student(
    State(state): State<Arc<AppState>>,
    Path(rollno): Path<String>,
    payload: std::result::Result<Json<UpdateStudentBody>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let body = json_body(payload)?;
    let mut store = state.store.lock().await;
    RecordService::new(&mut store)
        .update_student_record(&rollno, body.patch, body.parents)
        .map_err(reject)?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    Path(rollno): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut store = state.store.lock().await;
    RecordService::new(&mut store).delete_student_record(&rollno).map_err(reject)?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn list_marks(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<MarkSheetRow>>> {
    let mut store = state.store.lock().await;
    let rows = RecordService::new(&mut store).list_mark_sheets().map_err(reject)?;
    Ok(Json(rows))
}

pub async fn upsert_marks(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<MarksBody>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let body = json_body(payload)?;
    let rollno = body.rollno.unwrap_or_default();
    let mut store = state.store.lock().await;
    let summary = RecordService::new(&mut store)
        .upsert_marks_record(&rollno, &body.scores)
        .map_err(reject)?;
    Ok(Json(json!({ "ok": true, "avg": summary.avg, "grade": summary.grade })))
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<MessagesParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Message>>> {
    let rollno = query_params(params)?.rollno.unwrap_or_default();
    let mut store = state.store.lock().await;
    let messages = MessageLog::new(&mut store).list_for_student(&rollno).map_err(reject)?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SendMessage>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let body = json_body(payload)?;
    let mut store = state.store.lock().await;
    let sent = MessageLog::new(&mut store).send(body).map_err(reject)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "id": sent.id, "timestamp": sent.timestamp })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use std::path::PathBuf;

    fn state() -> Arc<AppState> {
        let store = SqliteStore::open_in_memory().unwrap();
        Arc::new(AppState::new(store, PathBuf::from(":memory:")))
    }

    fn body<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<Json<T>, JsonRejection> {
        Ok(Json(serde_json::from_value(value).unwrap()))
    }

    fn raw_body<T: serde::de::DeserializeOwned>(bytes: &str) -> Result<Json<T>, JsonRejection> {
        Json::from_bytes(bytes.as_bytes())
    }

    fn params(rollno: Option<&str>) -> Result<Query<MessagesParams>, QueryRejection> {
        Ok(Query(MessagesParams { rollno: rollno.map(str::to_string) }))
    }

    #[tokio::test]
    async fn test_create_get_student() {
        let state = state();

        let (status, _) = create_student(
            State(state.clone()),
            body(json!({
                "rollno": "S100", "name": "Kavya", "class": "9", "DOB": "2011-01-01",
                "parents": { "parentsname": "Raman" }
            })),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(record) = get_student(State(state.clone()), Path("S100".to_string())).await.unwrap();
        assert_eq!(record.student.dob, "2011-01-01");
        assert_eq!(record.marks.unwrap().avg(), 0.0);
        assert_eq!(record.parents.unwrap().parentsname, "Raman");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let state = state();

        let (status, Json(err)) = create_student(State(state.clone()), body(json!({ "rollno": "S1" })))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, "validation");

        create_student(State(state.clone()), body(json!({ "rollno": "S1", "name": "A" })))
            .await
            .unwrap();
        let (status, _) = create_student(State(state.clone()), body(json!({ "rollno": "S1", "name": "B" })))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = get_student(State(state.clone()), Path("S404".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = delete_student(State(state.clone()), Path("S404".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_marks_routes() {
        let state = state();
        create_student(State(state.clone()), body(json!({ "rollno": "S001", "name": "Arun" })))
            .await
            .unwrap();

        let Json(result) = upsert_marks(
            State(state.clone()),
            body(json!({
                "rollno": "S001", "tamil": 85, "english": "92", "maths": 88, "science": 79, "social": 90
            })),
        )
        .await
        .unwrap();
        assert_eq!(result, json!({ "ok": true, "avg": 86.8, "grade": "A" }));

        let (status, _) = upsert_marks(State(state.clone()), body(json!({ "rollno": "S404", "tamil": 1 })))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = upsert_marks(State(state.clone()), body(json!({ "tamil": 1 })))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let Json(rows) = list_marks(State(state.clone())).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].marks.as_ref().unwrap().scores().english, 92);
    }

    #[tokio::test]
    async fn test_update_and_list() {
        let state = state();
        create_student(
            State(state.clone()),
            body(json!({ "rollno": "S001", "name": "Arun", "section": "A", "class": "10" })),
        )
        .await
        .unwrap();

        update_student(State(state.clone()), Path("S001".to_string()), body(json!({ "section": "B" })))
            .await
            .unwrap();

        let Json(rows) = list_students(State(state.clone())).await.unwrap();
        assert_eq!(rows[0].student.section, "B");
        assert_eq!(rows[0].student.class, "10");

        let (status, _) = update_student(State(state.clone()), Path("S404".to_string()), body(json!({})))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_message_routes() {
        let state = state();
        create_student(State(state.clone()), body(json!({ "rollno": "S001", "name": "Arun" })))
            .await
            .unwrap();

        let (status, Json(sent)) = send_message(
            State(state.clone()),
            body(json!({ "rollno": "S001", "fromid": "T01", "toid": "S001", "content": "Hello" })),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(sent["timestamp"].as_str().unwrap().ends_with('Z'));

        let Json(messages) = list_messages(
            State(state.clone()),
            params(Some("S001")),
        )
        .await
        .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status, "delivered");

        let (status, _) = list_messages(State(state.clone()), params(None))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_message(State(state.clone()), body(json!({ "rollno": "S001" })))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_numeric_text_fields_are_accepted() {
        let state = state();
        create_student(
            State(state.clone()),
            body(json!({ "rollno": 101, "name": "Kavya", "class": 9, "parents": { "phonenumber": 9876543210u64 } })),
        )
        .await
        .unwrap();

        let Json(record) = get_student(State(state.clone()), Path("101".to_string())).await.unwrap();
        assert_eq!(record.student.class, "9");
        assert_eq!(record.parents.unwrap().phonenumber, "9876543210");

        let Json(result) = upsert_marks(State(state.clone()), body(json!({ "rollno": 101, "tamil": 50 })))
            .await
            .unwrap();
        assert_eq!(result["grade"], json!("C"));

        let (status, _) = send_message(
            State(state.clone()),
            body(json!({
                "rollno": "101", "fromid": 7, "toid": 101, "content": "Hello", "phonenumber": 9876543210u64
            })),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(messages) = list_messages(State(state.clone()), params(Some("101"))).await.unwrap();
        assert_eq!(messages[0].fromid, "7");
        assert_eq!(messages[0].toid, "101");
        assert_eq!(messages[0].phonenumber.as_deref(), Some("9876543210"));
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_validation_errors() {
        let state = state();

        let (status, Json(err)) = send_message(
            State(state.clone()),
            raw_body(r#"{"rollno": "S001", "fromid": true, "toid": "T01", "content": "hi"}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, "validation");

        let (status, Json(err)) = create_student(State(state.clone()), raw_body(r#"{"rollno": ["S1"], "name": "A"}"#))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, "validation");

        let (status, _) = upsert_marks(State(state.clone()), raw_body("not json"))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(value) = health(State(state())).await;
        assert_eq!(value["ok"], json!(true));
        assert_eq!(value["database"], json!(":memory:"));
    }
}
