use async_std::task;
use async_trait::async_trait;
use hannibal::{Actor, Context, Handler};

use std::time::{Duration, Instant};

use super::{command::*, settle, Document, StoreError};
use crate::storage::{FileError, JsonFile};

/// Sole owner of write access to the attendance document
///
/// A cycle always runs to completion before the next message is taken,
/// even when whoever asked for it has stopped waiting.
pub struct AttendanceWriter {
    file: JsonFile,
    io_timeout: Duration,
}

impl AttendanceWriter {
    pub fn new(file: JsonFile, io_timeout: Duration) -> Self {
        Self { file, io_timeout }
    }

    async fn upsert(&self, Upsert { key, status, deadline }: Upsert) -> Result<(), StoreError> {
        let file = self.file.clone();
        tracing::debug!("setting {} to {}", key, status);

        let cycle = task::spawn_blocking(move || {
            if Instant::now() >= deadline {
                return Err(FileError::DeadlinePassed {
                    path: file.path().to_owned(),
                });
            }
            let mut document = file.load::<Document>()?.unwrap_or_default();
            document.insert(key.to_string(), status.to_string());
            file.persist(&document, Some(deadline))
        });

        settle(self.io_timeout, cycle.await)
    }
}

#[async_trait]
impl Actor for AttendanceWriter {
    const NAME: &'static str = module_path!();

    async fn started(&mut self, _ctx: &mut Context<Self>) -> hannibal::Result<()> {
        tracing::trace!("starting writer for {}", self.file.path().display());
        Ok(())
    }

    async fn stopped(&mut self, _ctx: &mut Context<Self>) {
        tracing::trace!("shutting down writer for {}", self.file.path().display());
    }
}

#[async_trait]
impl Handler<Upsert> for AttendanceWriter {
    #[tracing::instrument(level = tracing::Level::DEBUG, skip_all)]
    async fn handle(&mut self, _ctx: &mut Context<Self>, cmd: Upsert) -> Result<(), StoreError> {
        let result = self.upsert(cmd).await;
        match &result {
            Err(StoreError::Timeout(limit)) => tracing::warn!("abandoned attendance write after {:?}", limit),
            Err(error) => tracing::error!("failed to persist attendance: {}", error),
            Ok(()) => {}
        }
        result
    }
}
