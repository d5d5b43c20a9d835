//! MongoDB adapter for the durable tier
//!
//! Documents live in the `proxy` collection as `{key, value}` with a unique
//! index on `key`.

use std::time::Duration;

use mongodb::bson::{doc, Document as BsonDocument};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, DeleteOptions, FindOneOptions, IndexOptions, ReplaceOptions, ServerAddress,
    WriteConcern,
};
use mongodb::sync::{Client, Collection};
use mongodb::IndexModel;
use tracing::info;

use crate::doc::{Document, DocumentStore, UpsertAck};
use crate::error::{Error, Result};

const BACKEND: &str = "mongodb";

/// Collection holding the cached documents
const COLLECTION: &str = "proxy";

/// Server error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

/// Server error code for an operation that ran past its `maxTimeMS`
const MAX_TIME_EXPIRED: i32 = 50;

/// Server error code for a write concern that was not satisfied in time
const WRITE_CONCERN_FAILED: i32 = 64;

/// Connection settings for [`MongoStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoOptions {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database name
    pub db_name: String,
    /// Bound on connecting, on server selection and on each operation
    pub timeout: Duration,
}

impl MongoOptions {
    /// Default bound on a single call
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Options for `host:port` and `db_name` with the default timeout
    pub fn new(host: impl Into<String>, port: u16, db_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            db_name: db_name.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Document store backed by a MongoDB collection
pub struct MongoStore {
    collection: Collection<BsonDocument>,
    timeout: Duration,
}

impl MongoStore {
    /// Build a client for the server described by `options`.
    ///
    /// The driver connects lazily; an unreachable server surfaces on the
    /// first call.
    pub fn connect(options: &MongoOptions) -> Result<Self> {
        let client_options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: options.host.clone(),
                port: Some(options.port),
            }])
            .connect_timeout(options.timeout)
            .server_selection_timeout(options.timeout)
            .build();
        let client = Client::with_options(client_options).map_err(|e| classify(e, None))?;
        let collection = client
            .database(&options.db_name)
            .collection::<BsonDocument>(COLLECTION);

        info!(
            host = %options.host,
            port = options.port,
            db = %options.db_name,
            "configured mongodb client"
        );
        Ok(Self {
            collection,
            timeout: options.timeout,
        })
    }
}

impl DocumentStore for MongoStore {
    fn ensure_unique_key(&self) -> Result<()> {
        self.collection
            .create_index(unique_key_index(), None)
            .map_err(|e| classify(e, None))?;
        info!(collection = COLLECTION, "ensured unique index on key");
        Ok(())
    }

    fn find(&self, key: &str) -> Result<Option<Document>> {
        self.collection
            .find_one(doc! { "key": key }, find_options(self.timeout))
            .map_err(|e| classify(e, Some(key)))?
            .map(|found| from_bson(&found))
            .transpose()
    }

    fn upsert(&self, doc: &Document) -> Result<UpsertAck> {
        let options = ReplaceOptions::builder()
            .upsert(true)
            .write_concern(write_concern(self.timeout))
            .build();
        let result = self
            .collection
            .replace_one(doc! { "key": doc.key.as_str() }, to_bson(doc), options)
            .map_err(|e| classify(e, Some(&doc.key)))?;
        Ok(UpsertAck {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted: result.upserted_id.is_some(),
        })
    }

    fn delete_all(&self, key: &str) -> Result<u64> {
        let result = self
            .collection
            .delete_many(
                doc! { "key": key },
                DeleteOptions::builder()
                    .write_concern(write_concern(self.timeout))
                    .build(),
            )
            .map_err(|e| classify(e, Some(key)))?;
        Ok(result.deleted_count)
    }
}

fn unique_key_index() -> IndexModel {
    IndexModel::builder()
        .keys(doc! { "key": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn find_options(timeout: Duration) -> FindOneOptions {
    FindOneOptions::builder().max_time(timeout).build()
}

fn write_concern(timeout: Duration) -> WriteConcern {
    WriteConcern::builder().w_timeout(timeout).build()
}

fn to_bson(doc: &Document) -> BsonDocument {
    doc! { "key": doc.key.as_str(), "value": doc.value.as_str() }
}

fn from_bson(found: &BsonDocument) -> Result<Document> {
    Ok(Document::new(field(found, "key")?, field(found, "value")?))
}

fn field<'a>(found: &'a BsonDocument, name: &str) -> Result<&'a str> {
    found.get_str(name).map_err(|e| Error::Corrupt {
        backend: BACKEND,
        reason: format!("field '{}': {}", name, e),
    })
}

fn classify(err: mongodb::error::Error, key: Option<&str>) -> Error {
    let reason = err.to_string();
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == DUPLICATE_KEY => {
            Error::ConstraintViolation {
                backend: BACKEND,
                key: key.unwrap_or_default().to_string(),
            }
        }
        ErrorKind::Command(command) if command.code == DUPLICATE_KEY => Error::ConstraintViolation {
            backend: BACKEND,
            key: key.unwrap_or_default().to_string(),
        },
        ErrorKind::Command(command) if command.code == MAX_TIME_EXPIRED => Error::Timeout {
            backend: BACKEND,
            reason,
        },
        ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == MAX_TIME_EXPIRED => {
            Error::Timeout {
                backend: BACKEND,
                reason,
            }
        }
        ErrorKind::Write(WriteFailure::WriteConcernError(failure))
            if failure.code == WRITE_CONCERN_FAILED =>
        {
            Error::Timeout {
                backend: BACKEND,
                reason,
            }
        }
        ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => Error::Timeout {
            backend: BACKEND,
            reason,
        },
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => Error::Unavailable {
            backend: BACKEND,
            reason,
        },
        _ => Error::Rejected {
            backend: BACKEND,
            reason,
        },
    }
}
