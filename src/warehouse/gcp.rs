//! BigQuery warehouse backed by `gcp-bigquery-client`.
//!
//! Responses are read through their REST JSON shape (`rows[].f[].v`,
//! `datasets[].datasetReference`, ...) so that nested and repeated columns
//! decode the same way everywhere. List calls and query results are read
//! page by page until BigQuery stops returning a page token.

use crate::error::{BqError, BqResult};
use crate::models::{ConnectionSettings, QueryJob, QueryParam, Row, TableSpec};
use crate::warehouse::{RowError, Warehouse};
use async_trait::async_trait;
use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::model::{
    dataset::Dataset, get_query_results_parameters::GetQueryResultsParameters,
    query_parameter::QueryParameter, query_parameter_type::QueryParameterType,
    query_parameter_value::QueryParameterValue, query_request::QueryRequest,
    table_data_insert_all_request::TableDataInsertAllRequest,
};
use gcp_bigquery_client::{Client, dataset, table};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::path::Path;
use tracing::{debug, info, warn};

/// Warehouse talking to the BigQuery REST API.
pub struct GcpWarehouse {
    client: Client,
    project_id: String,
}

impl GcpWarehouse {
    /// Build a client for the configured project.
    ///
    /// A configured key file that exists is tried first as a service account
    /// key. If it is missing or not a service account key, Application Default
    /// Credentials are used instead.
    pub async fn connect(settings: &ConnectionSettings) -> BqResult<Self> {
        settings.validate()?;

        let from_key_file = match settings.key_file.as_deref() {
            Some(path) if path.exists() => Self::client_from_key_file(settings, path).await,
            Some(_) => {
                warn!("Configured key file does not exist, using Application Default Credentials");
                None
            }
            None => None,
        };

        let client = match from_key_file {
            Some(client) => client,
            None => Self::client_from_adc(settings).await?,
        };

        Ok(Self {
            client,
            project_id: settings.project.clone(),
        })
    }

    fn builder(settings: &ConnectionSettings) -> ClientBuilder {
        match &settings.api_endpoint {
            Some(endpoint) => {
                let mut builder = ClientBuilder::new();
                builder.with_v2_base_url(endpoint.clone());
                builder
            }
            None => ClientBuilder::new(),
        }
    }

    async fn client_from_key_file(settings: &ConnectionSettings, path: &Path) -> Option<Client> {
        let path = path.to_str()?;
        match Self::builder(settings)
            .build_from_service_account_key_file(path)
            .await
        {
            Ok(client) => {
                info!("Using service account credentials from key file");
                Some(client)
            }
            Err(e) => {
                debug!(error = %e, "Key file rejected as service account key");
                info!(
                    "Key file is not a service account file, falling back to Application Default Credentials"
                );
                None
            }
        }
    }

    async fn client_from_adc(settings: &ConnectionSettings) -> BqResult<Client> {
        let client = Self::builder(settings)
            .build_from_application_default_credentials()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load any credentials");
                BqError::credentials(
                    "Could not load credentials. Please run 'gcloud auth application-default login' \
                     or provide a valid service account key file.",
                )
            })?;
        info!("Using Application Default Credentials");
        Ok(client)
    }

    fn query_request(job: &QueryJob) -> QueryRequest {
        let mut request = QueryRequest::new(job.sql.clone());
        request.location = job.location.clone();
        if !job.params.is_empty() {
            request.parameter_mode = Some("NAMED".to_string());
            request.query_parameters = Some(job.params.iter().map(to_query_parameter).collect());
        }
        request
    }
}

fn to_query_parameter(param: &QueryParam) -> QueryParameter {
    QueryParameter {
        name: Some(param.name.clone()),
        parameter_type: Some(QueryParameterType {
            r#type: param.param_type.as_str().to_string(),
            array_type: None,
            struct_types: None,
        }),
        parameter_value: Some(QueryParameterValue {
            value: Some(param.value.clone()),
            array_values: None,
            struct_values: None,
        }),
    }
}

fn to_json<T: Serialize>(value: &T) -> BqResult<JsonValue> {
    serde_json::to_value(value)
        .map_err(|e| BqError::internal(format!("Failed to read BigQuery response: {}", e)))
}

/// Collect reference ids from every page of a list call.
///
/// `fetch` is called with the page token of the previous response, `None` for
/// the first page.
async fn list_all_pages<F, Fut>(
    mut fetch: F,
    list_key: &str,
    ref_key: &str,
    id_key: &str,
) -> BqResult<Vec<String>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = BqResult<JsonValue>>,
{
    let mut ids = Vec::new();
    let mut page_token = None;
    loop {
        let page = fetch(page_token.take()).await?;
        ids.extend(rest::reference_ids(&page, list_key, ref_key, id_key));
        match rest::string_field(&page, "nextPageToken") {
            Some(token) => page_token = Some(token),
            None => return Ok(ids),
        }
    }
}

/// Wait for a query job to finish and collect the rows of every result page.
///
/// `first` is the `jobs.query` response. `fetch` calls `getQueryResults` with
/// the page token to read, or `None` while the job is still running.
async fn collect_query_rows<F, Fut>(first: JsonValue, mut fetch: F) -> BqResult<Vec<Row>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = BqResult<JsonValue>>,
{
    let mut page = first;
    let mut schema = None;
    let mut rows = Vec::new();
    loop {
        let page_token = if rest::job_complete(&page) {
            if schema.is_none() {
                schema = page.get("schema").cloned();
            }
            rows.extend(rest::decode_rows_with(schema.as_ref(), &page));
            match rest::string_field(&page, "pageToken") {
                Some(token) => Some(token),
                None => return Ok(rows),
            }
        } else {
            debug!("Query job still running, polling for results");
            None
        };
        page = fetch(page_token).await?;
    }
}

#[async_trait]
impl Warehouse for GcpWarehouse {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn query(&self, job: &QueryJob) -> BqResult<Vec<Row>> {
        let response = self
            .client
            .job()
            .query(&self.project_id, Self::query_request(job))
            .await?;
        let response = to_json(&response)?;

        let Some(job_ref) = rest::job_reference(&response) else {
            // no job to poll; the response is all there is
            return Ok(rest::decode_rows(&response));
        };
        let location = job_ref.location.or_else(|| job.location.clone());
        let job_id = job_ref.job_id;
        let this = self;

        collect_query_rows(response, move |page_token| {
            let params = GetQueryResultsParameters {
                location: location.clone(),
                page_token,
                ..Default::default()
            };
            let job_id = job_id.clone();
            async move {
                let page = this
                    .client
                    .job()
                    .get_query_results(&this.project_id, &job_id, params)
                    .await?;
                to_json(&page)
            }
        })
        .await
    }

    async fn list_datasets(&self) -> BqResult<Vec<String>> {
        let this = self;
        list_all_pages(
            move |page_token| async move {
                let mut options = dataset::ListOptions::default();
                if let Some(token) = page_token {
                    options = options.page_token(token);
                }
                to_json(&this.client.dataset().list(&this.project_id, options).await?)
            },
            "datasets",
            "datasetReference",
            "datasetId",
        )
        .await
    }

    async fn list_tables(&self, dataset_id: &str) -> BqResult<Vec<String>> {
        let this = self;
        list_all_pages(
            move |page_token| async move {
                let mut options = table::ListOptions::default();
                if let Some(token) = page_token {
                    options = options.page_token(token);
                }
                to_json(
                    &this
                        .client
                        .table()
                        .list(&this.project_id, dataset_id, options)
                        .await?,
                )
            },
            "tables",
            "tableReference",
            "tableId",
        )
        .await
    }

    async fn create_dataset(&self, dataset_id: &str, location: &str) -> BqResult<()> {
        let mut dataset = Dataset::new(&self.project_id, dataset_id);
        dataset.location = Some(location.to_string());
        self.client.dataset().create(dataset).await?;
        Ok(())
    }

    async fn create_table(&self, dataset_id: &str, table: &TableSpec) -> BqResult<()> {
        // DDL keeps REQUIRED columns as NOT NULL.
        let job = QueryJob::new(table.ddl(&self.project_id, dataset_id));
        self.query(&job).await?;
        Ok(())
    }

    async fn insert_rows(
        &self,
        dataset_id: &str,
        table_id: &str,
        rows: Vec<JsonValue>,
    ) -> BqResult<Vec<RowError>> {
        let mut request = TableDataInsertAllRequest::new();
        for row in rows {
            request.add_row(None, row)?;
        }

        let response = self
            .client
            .tabledata()
            .insert_all(&self.project_id, dataset_id, table_id, request)
            .await?;
        let response = to_json(&response)?;
        Ok(rest::insert_errors(&response))
    }

    fn name(&self) -> &'static str {
        "bigquery"
    }
}

/// Decoding of BigQuery REST payloads.
pub(crate) mod rest {
    use super::RowError;
    use crate::models::Row;
    use serde_json::Value as JsonValue;

    fn array<'a>(value: &'a JsonValue, key: &str) -> &'a [JsonValue] {
        value
            .get(key)
            .and_then(JsonValue::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Job id and location from `jobReference`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct JobRef {
        pub job_id: String,
        pub location: Option<String>,
    }

    pub fn job_reference(response: &JsonValue) -> Option<JobRef> {
        let reference = response.get("jobReference")?;
        Some(JobRef {
            job_id: string_field(reference, "jobId")?,
            location: string_field(reference, "location"),
        })
    }

    /// A non-empty string field, such as a page token.
    pub fn string_field(value: &JsonValue, key: &str) -> Option<String> {
        value
            .get(key)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    /// `jobComplete` defaults to true when absent.
    pub fn job_complete(response: &JsonValue) -> bool {
        response.get("jobComplete").and_then(JsonValue::as_bool) != Some(false)
    }

    /// Convert `rows[].f[].v` into rows keyed by `schema.fields[].name`.
    pub fn decode_rows(response: &JsonValue) -> Vec<Row> {
        decode_rows_with(response.get("schema"), response)
    }

    /// Like [`decode_rows`], with the schema taken from an earlier page.
    pub fn decode_rows_with(schema: Option<&JsonValue>, response: &JsonValue) -> Vec<Row> {
        let fields = schema.map(|schema| array(schema, "fields")).unwrap_or(&[]);

        array(response, "rows")
            .iter()
            .map(|row| decode_record(fields, row))
            .collect()
    }

    fn decode_record(fields: &[JsonValue], record: &JsonValue) -> Row {
        let cells = array(record, "f");
        fields
            .iter()
            .zip(cells)
            .map(|(field, cell)| {
                let name = field
                    .get("name")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_string();
                let value = cell.get("v").unwrap_or(&JsonValue::Null);
                (name, decode_field(field, value))
            })
            .collect()
    }

    fn decode_field(field: &JsonValue, value: &JsonValue) -> JsonValue {
        let mode = field.get("mode").and_then(JsonValue::as_str).unwrap_or("");
        if mode.eq_ignore_ascii_case("REPEATED") {
            let items = value.as_array().map(Vec::as_slice).unwrap_or(&[]);
            return JsonValue::Array(
                items
                    .iter()
                    .map(|item| decode_scalar(field, item.get("v").unwrap_or(&JsonValue::Null)))
                    .collect(),
            );
        }
        decode_scalar(field, value)
    }

    fn decode_scalar(field: &JsonValue, value: &JsonValue) -> JsonValue {
        if value.is_null() {
            return JsonValue::Null;
        }
        let field_type = field
            .get("type")
            .and_then(JsonValue::as_str)
            .unwrap_or("STRING")
            .to_ascii_uppercase();

        match field_type.as_str() {
            "RECORD" | "STRUCT" => JsonValue::Object(decode_record(array(field, "fields"), value)),
            "INTEGER" | "INT64" => value
                .as_str()
                .and_then(|s| s.parse::<i64>().ok())
                .map(JsonValue::from)
                .unwrap_or_else(|| value.clone()),
            "FLOAT" | "FLOAT64" => value
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .and_then(|f| serde_json::Number::from_f64(f).map(JsonValue::Number))
                .unwrap_or_else(|| value.clone()),
            "BOOLEAN" | "BOOL" => match value.as_str() {
                Some(s) if s.eq_ignore_ascii_case("true") => JsonValue::Bool(true),
                Some(s) if s.eq_ignore_ascii_case("false") => JsonValue::Bool(false),
                _ => value.clone(),
            },
            _ => value.clone(),
        }
    }

    /// Collect `<list_key>[].<ref_key>.<id_key>` from a list response.
    pub fn reference_ids(list: &JsonValue, list_key: &str, ref_key: &str, id_key: &str) -> Vec<String> {
        array(list, list_key)
            .iter()
            .filter_map(|entry| entry.get(ref_key)?.get(id_key)?.as_str())
            .map(String::from)
            .collect()
    }

    /// Collect `insertErrors[]` from an insertAll response.
    pub fn insert_errors(response: &JsonValue) -> Vec<RowError> {
        array(response, "insertErrors")
            .iter()
            .map(|entry| {
                let index = entry.get("index").and_then(JsonValue::as_u64).unwrap_or(0) as usize;
                let message = array(entry, "errors")
                    .iter()
                    .map(|e| {
                        let reason = e.get("reason").and_then(JsonValue::as_str).unwrap_or("error");
                        let message = e.get("message").and_then(JsonValue::as_str).unwrap_or("");
                        format!("{}: {}", reason, message)
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                RowError { index, message }
            })
            .collect()
    }
}
