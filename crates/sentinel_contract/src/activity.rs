//! Built-in contract for the Activity analytics schema.
//!
//! `ACTIVITY.EVENTS` is the append-only event log every other object reads
//! from; `ACTIVITY_CCODE` holds derived views and generated artifacts; `MCP`
//! holds the ingestion procedure and the dashboard stage.

use crate::contract::{ColumnSpec, ParamSpec, RoutineSpec, SchemaContract, StageSpec, ViewSpec};
use crate::types::DataType;

pub const ACTIVITY_CONTRACT_VERSION: &str = "2.0.0";
pub const ACTIVITY_DATABASE: &str = "CLAUDE_BI";

/// Schema and table of the event log.
pub const EVENTS_SCHEMA: &str = "ACTIVITY";
pub const EVENTS_TABLE: &str = "EVENTS";

const ACTIVITY_SUMMARY_SQL: &str = "\
SELECT
    COUNT(*) AS TOTAL_EVENTS,
    COUNT(DISTINCT ACTOR_ID) AS UNIQUE_CUSTOMERS,
    COUNT(DISTINCT ACTION) AS UNIQUE_ACTIVITIES,
    MAX(OCCURRED_AT) AS LAST_EVENT
FROM ACTIVITY.EVENTS";

// Casts to TIMESTAMP keep the view free of session time zone functions.
const ACTIVITY_COUNTS_24H_SQL: &str = "\
SELECT
    DATE_TRUNC('hour', CAST(OCCURRED_AT AS TIMESTAMP)) AS HOUR,
    ACTION AS ACTIVITY,
    COUNT(*) AS EVENT_COUNT,
    COUNT(DISTINCT ACTOR_ID) AS UNIQUE_CUSTOMERS
FROM ACTIVITY.EVENTS
WHERE CAST(OCCURRED_AT AS TIMESTAMP) >= CAST(CURRENT_TIMESTAMP AS TIMESTAMP) - INTERVAL '24 HOURS'
GROUP BY 1, 2";

const LOG_CLAUDE_EVENT_BODY: &str = "\
BEGIN
    INSERT INTO ACTIVITY.EVENTS
        (EVENT_ID, OCCURRED_AT, ACTION, ACTOR_ID, OBJECT_TYPE, OBJECT_ID, ATTRIBUTES, SOURCE)
    SELECT
        COALESCE(:EVENT_PAYLOAD:event_id::STRING, 'act_' || UUID_STRING()),
        COALESCE(:EVENT_PAYLOAD:occurred_at::TIMESTAMP_TZ, CURRENT_TIMESTAMP()),
        :EVENT_PAYLOAD:action::STRING,
        COALESCE(:EVENT_PAYLOAD:actor_id::STRING, CURRENT_USER()),
        :EVENT_PAYLOAD:object:type::STRING,
        :EVENT_PAYLOAD:object:id::STRING,
        :EVENT_PAYLOAD:attributes,
        COALESCE(:EVENT_PAYLOAD:source::STRING, 'claude_code');
    RETURN OBJECT_CONSTRUCT('ok', TRUE);
END";

/// Columns of `ACTIVITY.EVENTS`.
pub fn events_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::required("EVENT_ID", DataType::String).primary_key(),
        ColumnSpec::required("OCCURRED_AT", DataType::TimestampTz),
        ColumnSpec::required("ACTION", DataType::String),
        ColumnSpec::required("ACTOR_ID", DataType::String),
        ColumnSpec::optional("OBJECT_TYPE", DataType::String),
        ColumnSpec::optional("OBJECT_ID", DataType::String),
        ColumnSpec::optional("ATTRIBUTES", DataType::Variant),
        ColumnSpec::required("SOURCE", DataType::String),
        ColumnSpec::optional("INGESTED_AT", DataType::TimestampTz),
    ]
}

/// The full Activity contract.
///
/// Procedures and stages are Snowflake objects; callers validating another
/// dialect can drop them with [`SchemaContract::without_kind`].
pub fn activity_contract() -> SchemaContract {
    SchemaContract::new(ACTIVITY_CONTRACT_VERSION)
        .with_database(ACTIVITY_DATABASE)
        .with_table(EVENTS_SCHEMA, EVENTS_TABLE, events_columns())
        .with_table(
            "ACTIVITY_CCODE",
            "ARTIFACTS",
            vec![
                ColumnSpec::required("ARTIFACT_ID", DataType::String).primary_key(),
                ColumnSpec::required("ARTIFACT_TYPE", DataType::String),
                ColumnSpec::optional("TITLE", DataType::String),
                ColumnSpec::optional("CONTENT", DataType::Variant),
                ColumnSpec::optional("CREATED_BY", DataType::String),
                ColumnSpec::required("CREATED_AT", DataType::TimestampTz),
            ],
        )
        .with_view(
            "ACTIVITY_CCODE",
            "VW_ACTIVITY_SUMMARY",
            ViewSpec::new(vec![
                "TOTAL_EVENTS",
                "UNIQUE_CUSTOMERS",
                "UNIQUE_ACTIVITIES",
                "LAST_EVENT",
            ])
            .with_definition(ACTIVITY_SUMMARY_SQL),
        )
        .with_view(
            "ACTIVITY_CCODE",
            "VW_ACTIVITY_COUNTS_24H",
            ViewSpec::new(vec!["HOUR", "ACTIVITY", "EVENT_COUNT", "UNIQUE_CUSTOMERS"])
                .with_definition(ACTIVITY_COUNTS_24H_SQL),
        )
        .with_procedure(
            "MCP",
            "LOG_CLAUDE_EVENT",
            RoutineSpec::new(vec![ParamSpec::new("EVENT_PAYLOAD", DataType::Variant)])
                .returns("VARIANT")
                .language("SQL")
                .body(LOG_CLAUDE_EVENT_BODY),
        )
        .with_stage("MCP", "DASH_APPS", StageSpec::default())
}
