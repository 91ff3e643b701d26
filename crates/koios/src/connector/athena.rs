use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_athena::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_athena::Client;
use tracing::{debug, info};

use super::{
    param, param_or, Column, ConnectParams, Connector, DriverKind, FieldKind, FormField,
    QueryResult,
};
use crate::error::{Error, Result};
use crate::util::quote_literal;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub(super) const FIELDS: &[FormField] = &[
    FormField {
        key: "db",
        label: "Database",
        default: "",
        kind: FieldKind::Text,
    },
    FormField {
        key: "output_location",
        label: "Output Location",
        default: "",
        kind: FieldKind::Text,
    },
    FormField {
        key: "workgroup",
        label: "Workgroup",
        default: "primary",
        kind: FieldKind::Text,
    },
    FormField {
        key: "access_key_id",
        label: "AWS Access Key ID",
        default: "",
        kind: FieldKind::Text,
    },
    FormField {
        key: "secret_access_key",
        label: "AWS Secret Access Key",
        default: "",
        kind: FieldKind::Secret,
    },
    FormField {
        key: "region",
        label: "AWS Region",
        default: "",
        kind: FieldKind::Text,
    },
];

/// URL-encoded key/value set of the non-empty parameters.
pub(super) fn target(params: &ConnectParams) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.iter().filter(|(_, v)| !v.is_empty()) {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

pub(super) fn display_name(params: &ConnectParams) -> String {
    param_or(params, "db", "Athena").to_string()
}

fn sdk_error<E: std::error::Error>(e: E) -> Error {
    Error::query(DisplayErrorContext(e))
}

/// Amazon Athena, reached through the AWS SDK with static credentials.
pub struct AthenaConnector {
    client: Client,
    database: String,
    output_location: String,
    workgroup: String,
    name: String,
}

impl AthenaConnector {
    /// Builds the client and checks the credentials against the work group.
    pub async fn open(params: &ConnectParams, name: String) -> Result<Self> {
        let region = param(params, "region").trim();
        let access_key = param(params, "access_key_id").trim();
        let secret_key = param(params, "secret_access_key");
        if region.is_empty() {
            return Err(Error::connect("athena", "region is required"));
        }
        if access_key.is_empty() || secret_key.is_empty() {
            return Err(Error::connect(
                "athena",
                "access_key_id and secret_access_key are required",
            ));
        }

        let config = aws_sdk_athena::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "koios",
            ))
            .build();
        let client = Client::from_conf(config);
        let workgroup = param_or(params, "workgroup", "primary").to_string();

        client
            .get_work_group()
            .work_group(&workgroup)
            .send()
            .await
            .map_err(|e| Error::connect("athena", DisplayErrorContext(e)))?;

        info!(db = %name, region, workgroup = %workgroup, "connected to athena");
        Ok(Self {
            client,
            database: param(params, "db").to_string(),
            output_location: param(params, "output_location").to_string(),
            workgroup,
            name,
        })
    }

    async fn wait_for(&self, execution_id: &str) -> Result<()> {
        loop {
            let out = self
                .client
                .get_query_execution()
                .query_execution_id(execution_id)
                .send()
                .await
                .map_err(sdk_error)?;

            let status = out.query_execution().and_then(|e| e.status());
            match status.and_then(|s| s.state()) {
                Some(QueryExecutionState::Succeeded) => return Ok(()),
                Some(QueryExecutionState::Failed) | Some(QueryExecutionState::Cancelled) => {
                    let reason = status
                        .and_then(|s| s.state_change_reason())
                        .unwrap_or("query did not complete");
                    return Err(Error::query(reason));
                }
                _ => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
    }

    async fn fetch(&self, execution_id: &str) -> Result<QueryResult> {
        let mut result = QueryResult::default();
        let mut next_token: Option<String> = None;
        let mut first_page = true;

        loop {
            let page = self
                .client
                .get_query_results()
                .query_execution_id(execution_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(sdk_error)?;

            if let Some(set) = page.result_set() {
                if result.columns.is_empty() {
                    if let Some(meta) = set.result_set_metadata() {
                        result.columns = meta
                            .column_info()
                            .iter()
                            .map(|c| c.name().to_string())
                            .collect();
                    }
                }

                for (i, row) in set.rows().iter().enumerate() {
                    let cells: Vec<String> = row
                        .data()
                        .iter()
                        .map(|d| d.var_char_value().unwrap_or("NULL").to_string())
                        .collect();
                    // SELECT results repeat the header as the first row.
                    if first_page && i == 0 && cells == result.columns {
                        continue;
                    }
                    result.rows.push(cells);
                }
            }

            first_page = false;
            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(result)
    }
}

#[async_trait]
impl Connector for AthenaConnector {
    fn driver(&self) -> DriverKind {
        DriverKind::Athena
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = {} ORDER BY table_name",
            quote_literal(&self.database)
        );
        let result = self.run_query(&sql).await?;
        Ok(result
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
        let sql = format!(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = {} AND table_name = {} ORDER BY ordinal_position",
            quote_literal(&self.database),
            quote_literal(table)
        );
        let result = self.run_query(&sql).await?;
        if result.rows.is_empty() {
            return Err(Error::query(format!("no such table: {table}")));
        }

        Ok(result
            .rows
            .into_iter()
            .map(|mut row| {
                let data_type = row.pop().unwrap_or_default();
                let name = row.pop().unwrap_or_default();
                Column { name, data_type }
            })
            .collect())
    }

    async fn run_query(&self, text: &str) -> Result<QueryResult> {
        let mut request = self
            .client
            .start_query_execution()
            .query_string(text)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&self.database)
                    .build(),
            )
            .work_group(&self.workgroup);
        if !self.output_location.is_empty() {
            request = request.result_configuration(
                ResultConfiguration::builder()
                    .output_location(&self.output_location)
                    .build(),
            );
        }

        let started = request.send().await.map_err(sdk_error)?;
        let execution_id = started
            .query_execution_id()
            .ok_or_else(|| Error::query("athena returned no query execution id"))?
            .to_string();
        debug!(execution_id = %execution_id, "athena query started");

        self.wait_for(&execution_id).await?;
        self.fetch(&execution_id).await
    }
}
