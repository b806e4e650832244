//! Per-request persistence backend selection.
//!
//! A request may pin its backend with the `X-Database-Provider` header.
//! Without one, the configured default applies. An explicit value that is
//! not recognized is an error, never a fallback.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{StorageConfig, StorageType};

/// Header carrying the request's backend directive.
pub const DATABASE_PROVIDER_HEADER: &str = "x-database-provider";

/// Which persistence backend services a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum BackendDirective {
    /// Key-value store (DynamoDB).
    #[default]
    PrimaryKv,
    /// Document store behind the ORM layer (MongoDB).
    PrimaryOrm,
}

impl BackendDirective {
    pub const ALL: [BackendDirective; 2] = [BackendDirective::PrimaryKv, BackendDirective::PrimaryOrm];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendDirective::PrimaryKv => "PRIMARY_KV",
            BackendDirective::PrimaryOrm => "PRIMARY_ORM",
        }
    }
}

impl fmt::Display for BackendDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendDirective {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRIMARY_KV" | "KV" | "DYNAMODB" => Ok(BackendDirective::PrimaryKv),
            "PRIMARY_ORM" | "ORM" | "PRISMA" | "MONGODB" => Ok(BackendDirective::PrimaryOrm),
            _ => Err(BackendError::Unsupported(s.to_string())),
        }
    }
}

impl TryFrom<String> for BackendDirective {
    type Error = BackendError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Backend selection errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Unsupported backend directive: {0:?}")]
    Unsupported(String),
}

/// Resolve the directive for one request.
///
/// Absent or blank input yields `default`; recognized input wins; anything
/// else fails with [`BackendError::Unsupported`].
pub fn resolve(
    requested: Option<&str>,
    default: BackendDirective,
) -> Result<BackendDirective, BackendError> {
    match requested.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value.parse(),
    }
}

/// Where a DynamoDB backend lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DynamoEnvironment {
    Local,
    Aws,
}

impl DynamoEnvironment {
    /// An endpoint override means DynamoDB Local; otherwise the SDK default.
    pub fn detect(endpoint: Option<&str>) -> Self {
        match endpoint {
            Some(e) if !e.trim().is_empty() => DynamoEnvironment::Local,
            _ => DynamoEnvironment::Aws,
        }
    }
}

/// Description of the store behind a directive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendInfo {
    pub provider: BackendDirective,
    pub store: StorageType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamo_environment: Option<DynamoEnvironment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl BackendInfo {
    pub fn describe(directive: BackendDirective, config: &StorageConfig) -> Self {
        let store = config.store_for(directive);

        match store {
            StorageType::Memory => Self {
                provider: directive,
                store,
                description: "In-memory store".to_string(),
                dynamo_environment: None,
                endpoint: None,
                database: None,
            },
            StorageType::Dynamo => {
                let environment = DynamoEnvironment::detect(config.dynamo.endpoint.as_deref());
                let description = match environment {
                    DynamoEnvironment::Local => "DynamoDB Local (development)",
                    DynamoEnvironment::Aws => "DynamoDB AWS (production)",
                };
                Self {
                    provider: directive,
                    store,
                    description: description.to_string(),
                    dynamo_environment: Some(environment),
                    endpoint: Some(
                        config
                            .dynamo
                            .endpoint
                            .clone()
                            .unwrap_or_else(|| "AWS default".to_string()),
                    ),
                    database: Some(config.dynamo.table.clone()),
                }
            }
            StorageType::Mongodb => Self {
                provider: directive,
                store,
                description: "MongoDB".to_string(),
                dynamo_environment: None,
                endpoint: None,
                database: Some(config.mongodb.database.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absent_uses_default() {
        assert_eq!(
            resolve(None, BackendDirective::PrimaryKv),
            Ok(BackendDirective::PrimaryKv)
        );
        assert_eq!(
            resolve(None, BackendDirective::PrimaryOrm),
            Ok(BackendDirective::PrimaryOrm)
        );
    }

    #[test]
    fn test_resolve_blank_uses_default() {
        assert_eq!(
            resolve(Some("  "), BackendDirective::PrimaryOrm),
            Ok(BackendDirective::PrimaryOrm)
        );
    }

    #[test]
    fn test_resolve_explicit_wins() {
        assert_eq!(
            resolve(Some("PRIMARY_ORM"), BackendDirective::PrimaryKv),
            Ok(BackendDirective::PrimaryOrm)
        );
        assert_eq!(
            resolve(Some("PRIMARY_KV"), BackendDirective::PrimaryOrm),
            Ok(BackendDirective::PrimaryKv)
        );
    }

    #[test]
    fn test_resolve_invalid_is_error() {
        assert_eq!(
            resolve(Some("BOGUS"), BackendDirective::PrimaryKv),
            Err(BackendError::Unsupported("BOGUS".to_string()))
        );
    }

    #[test]
    fn test_parse_aliases_case_insensitive() {
        assert_eq!("dynamodb".parse::<BackendDirective>(), Ok(BackendDirective::PrimaryKv));
        assert_eq!("Prisma".parse::<BackendDirective>(), Ok(BackendDirective::PrimaryOrm));
        assert_eq!("mongodb".parse::<BackendDirective>(), Ok(BackendDirective::PrimaryOrm));
        assert_eq!(" primary_orm ".parse::<BackendDirective>(), Ok(BackendDirective::PrimaryOrm));
    }

    #[test]
    fn test_display_round_trips() {
        for directive in BackendDirective::ALL {
            assert_eq!(directive.to_string().parse::<BackendDirective>(), Ok(directive));
        }
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let json = serde_json::to_string(&BackendDirective::PrimaryOrm).unwrap();
        assert_eq!(json, "\"PRIMARY_ORM\"");

        let parsed: BackendDirective = serde_json::from_str("\"dynamodb\"").unwrap();
        assert_eq!(parsed, BackendDirective::PrimaryKv);

        assert!(serde_json::from_str::<BackendDirective>("\"postgres\"").is_err());
    }

    #[test]
    fn test_dynamo_environment_detect() {
        assert_eq!(
            DynamoEnvironment::detect(Some("http://localhost:8000")),
            DynamoEnvironment::Local
        );
        assert_eq!(DynamoEnvironment::detect(None), DynamoEnvironment::Aws);
        assert_eq!(DynamoEnvironment::detect(Some("")), DynamoEnvironment::Aws);
    }

    #[test]
    fn test_backend_info_describes_configured_store() {
        let mut config = StorageConfig::default();
        config.dynamo.endpoint = Some("http://localhost:8000".to_string());

        let kv = BackendInfo::describe(BackendDirective::PrimaryKv, &config);
        assert_eq!(kv.store, StorageType::Dynamo);
        assert_eq!(kv.dynamo_environment, Some(DynamoEnvironment::Local));
        assert_eq!(kv.endpoint.as_deref(), Some("http://localhost:8000"));

        let orm = BackendInfo::describe(BackendDirective::PrimaryOrm, &config);
        assert_eq!(orm.store, StorageType::Mongodb);
        assert_eq!(orm.database.as_deref(), Some("folio"));
        assert!(orm.dynamo_environment.is_none());
    }
}
