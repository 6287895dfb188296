use async_trait::async_trait;

use crate::location::Location;

/// Called once for every module the moment it is expanded, with the source
/// text that was just read. An error aborts the walk.
pub trait FileSink: Send + Sync {
    fn on_file(&self, location: &Location, source: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait AsyncFileSink: Send + Sync {
    async fn on_file(&self, location: &Location, source: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl<T: FileSink> AsyncFileSink for T {
    async fn on_file(&self, location: &Location, source: &str) -> anyhow::Result<()> {
        FileSink::on_file(self, location, source)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl FileSink for NoopSink {
    fn on_file(&self, _location: &Location, _source: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<F> FileSink for F
where
    F: Fn(&Location, &str) -> anyhow::Result<()> + Send + Sync,
{
    fn on_file(&self, location: &Location, source: &str) -> anyhow::Result<()> {
        self(location, source)
    }
}
