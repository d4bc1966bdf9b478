//! Where a job's bytes come from

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use uuid::Uuid;

pub type ByteStream = Box<dyn AsyncRead + Unpin + Send>;

/// Opens the uploaded bytes of a job; each stream is read once
#[async_trait]
pub trait ByteSource: Send + Sync {
    async fn open(&self, job_id: Uuid) -> std::io::Result<ByteStream>;
}

/// Uploads stored as `<upload_dir>/<job-id>.csv`
#[derive(Debug, Clone)]
pub struct UploadDirSource {
    upload_dir: PathBuf,
}

impl UploadDirSource {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn path_for(&self, job_id: Uuid) -> PathBuf {
        self.upload_dir.join(format!("{}.csv", job_id))
    }
}

#[async_trait]
impl ByteSource for UploadDirSource {
    async fn open(&self, job_id: Uuid) -> std::io::Result<ByteStream> {
        let file = tokio::fs::File::open(self.path_for(job_id)).await?;
        Ok(Box::new(tokio::io::BufReader::new(file)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_opens_job_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = UploadDirSource::new(dir.path());
        let id = Uuid::new_v4();
        std::fs::write(source.path_for(id), "name\n").unwrap();

        let mut contents = String::new();
        source.open(id).await.unwrap().read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "name\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = UploadDirSource::new(dir.path());
        let err = source.open(Uuid::new_v4()).await.err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
