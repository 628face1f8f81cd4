pub mod client;

pub use client::BackendClient;

/// Produces raw evaluation reports for files already stored by the backend.
#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    async fn generate(&self, file_paths: &[String]) -> anyhow::Result<String>;
    fn name(&self) -> &str;
}
