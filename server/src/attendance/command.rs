use std::time::Instant;

use super::{RecordKey, Status, StoreError};

/// Insert or overwrite a single record, unless `deadline` passes before the document is replaced
#[hannibal::message(result = "Result<(), StoreError>")]
#[derive(Debug)]
pub struct Upsert {
    pub key: RecordKey,
    pub status: Status,
    pub deadline: Instant,
}
