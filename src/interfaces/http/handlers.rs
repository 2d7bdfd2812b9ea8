use super::{ApiError, ApiResult, AppState};
use crate::application::ml::ModelInfo;
use crate::application::ml::eda_service::{self, EdaReport};
use crate::domain::errors::PipelineError;
use crate::domain::ml::ModelParams;
use crate::infrastructure::csv_source;
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
};
use polars::prelude::DataFrame;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub message: String,
    pub model_name: String,
    #[serde(flatten)]
    pub info: ModelInfo,
}

/// Multipart fields of a request, text fields kept raw
#[derive(Default)]
struct FormFields {
    file: Option<Bytes>,
    text: Vec<(String, String)>,
}

impl FormFields {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = FormFields::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await?;
                info!("Received file: {} ({} bytes)", file_name, data.len());
                form.file = Some(data);
            } else {
                let value = field.text().await?;
                form.text.push((name, value));
            }
        }
        Ok(form)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.text
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn require_file(&mut self) -> ApiResult<Bytes> {
        self.file
            .take()
            .ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))
    }
}

fn parse_field<T: std::str::FromStr>(form: &FormFields, name: &str, default: T) -> ApiResult<T> {
    match form.get(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid value for {}: '{}'", name, raw))),
    }
}

fn parse_flag(form: &FormFields, name: &str) -> ApiResult<bool> {
    match form.get(name).map(str::to_lowercase).as_deref() {
        None | Some("false" | "0" | "off" | "no") => Ok(false),
        Some("true" | "1" | "on" | "yes") => Ok(true),
        Some(other) => Err(ApiError::BadRequest(format!(
            "Invalid value for {}: '{}'",
            name, other
        ))),
    }
}

/// Where the training data comes from, in order of precedence
enum TrainingSource {
    Upload(Bytes),
    File(PathBuf),
}

impl TrainingSource {
    fn from_form(form: &mut FormFields, local_data_path: &std::path::Path) -> ApiResult<Self> {
        if parse_flag(form, "use_local_file")? {
            if !local_data_path.is_file() {
                return Err(ApiError::NotFound(format!(
                    "Local data file not found: {}",
                    local_data_path.display()
                )));
            }
            return Ok(TrainingSource::File(local_data_path.to_path_buf()));
        }
        if let Some(data) = form.file.take() {
            return Ok(TrainingSource::Upload(data));
        }
        if let Some(path) = form.get("file_path") {
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(ApiError::NotFound(format!("File not found: {}", path.display())));
            }
            return Ok(TrainingSource::File(path));
        }
        Err(ApiError::BadRequest("No file provided".to_string()))
    }

    fn read(&self) -> Result<DataFrame, PipelineError> {
        match self {
            TrainingSource::Upload(data) => csv_source::read_csv_bytes(data),
            TrainingSource::File(path) => {
                info!("Loading training data from {}", path.display());
                csv_source::read_csv_path(path)
            }
        }
    }
}

/// Runs a CPU-bound pipeline off the async runtime
async fn run_blocking<T, F>(job: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ApiError::Internal(format!("Worker task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub async fn train(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<TrainResponse>> {
    let mut form = FormFields::read(multipart).await?;

    let defaults = ModelParams::default();
    let params = ModelParams {
        max_iter: parse_field(&form, "max_iter", defaults.max_iter)?,
        c: parse_field(&form, "C", defaults.c)?,
    };
    params
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let source = TrainingSource::from_form(&mut form, &state.config.storage.local_data_path)?;

    let training = state.training.clone();
    let prediction = state.prediction.clone();
    let (model_name, info) = run_blocking(move || {
        let df = source.read()?;
        let model_name = training.train(df, params)?;
        let info = prediction.get_model_info(&model_name)?;
        Ok((model_name, info))
    })
    .await?;

    Ok(Json(TrainResponse {
        message: format!("Model {} trained and saved.", model_name),
        model_name,
        info,
    }))
}

pub async fn predict(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Vec<Map<String, Value>>>> {
    let mut form = FormFields::read(multipart).await?;
    let model_name = form
        .get("model_name")
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("model_name is required".to_string()))?;
    let data = form.require_file()?;

    let prediction = state.prediction.clone();
    let rows = run_blocking(move || {
        let df = csv_source::read_csv_bytes(&data)?;
        prediction.predict(&model_name, df)
    })
    .await?;

    Ok(Json(rows))
}

pub async fn model_info(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
) -> ApiResult<Json<ModelInfo>> {
    let prediction = state.prediction.clone();
    let info = run_blocking(move || prediction.get_model_info(&model_name)).await?;
    Ok(Json(info))
}

pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let prediction = state.prediction.clone();
    let models = run_blocking(move || prediction.list_models()).await?;
    Ok(Json(models))
}

pub async fn eda(multipart: Multipart) -> ApiResult<Json<EdaReport>> {
    let mut form = FormFields::read(multipart).await?;
    let data = form.require_file()?;

    let report = run_blocking(move || {
        let df = csv_source::read_csv_bytes(&data)?;
        eda_service::get_plots(&df)
    })
    .await?;

    info!("EDA produced {} plots", report.plots.len());
    Ok(Json(report))
}
