//! Isolated handler fixture built on the public partloader API

use partloader::scratch::{FileScratch, MemoryScratch};
use partloader::{
    AccountIdentity, LoaderConfig, MemoryQueryEngine, PartitionHandler, PollPolicy, ScratchStore,
    StatusMode,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const ACCOUNT_ID: &str = "123456789012";
pub const REGION: &str = "us-east-1";
pub const DATABASE: &str = "analytics";
pub const TABLE: &str = "events";
pub const BUCKET: &str = "landing-bucket";

pub struct LoaderFixture {
    pub engine: Arc<MemoryQueryEngine>,
    pub scratch: Arc<dyn ScratchStore>,
    pub handler: PartitionHandler,
    temp_dir: tempfile::TempDir,
}

impl LoaderFixture {
    /// Fixture with a file-backed snapshot at `<tmp>/partitions`
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_engine(Arc::new(Self::catalog()))
    }

    pub fn with_engine(
        engine: Arc<MemoryQueryEngine>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let _ = env_logger::builder().is_test(true).try_init();
        let temp_dir = tempfile::tempdir()?;
        let scratch: Arc<dyn ScratchStore> = Arc::new(FileScratch::open(temp_dir.path())?);
        let handler = Self::handler_for(engine.clone(), scratch.clone(), temp_dir.path())?;
        Ok(Self {
            engine,
            scratch,
            handler,
            temp_dir: temp_dir,
        })
    }

    /// Empty catalog holding the test table
    pub fn catalog() -> MemoryQueryEngine {
        let engine = MemoryQueryEngine::new();
        engine.create_table(DATABASE, TABLE);
        engine
    }

    pub fn config(cache_dir: &Path) -> LoaderConfig {
        let mut config = LoaderConfig::new(
            REGION,
            DATABASE,
            TABLE,
            vec!["year".to_string(), "month".to_string()],
        );
        config.cache_file = cache_dir.join("partitions");
        config.poll = PollPolicy::unbounded(Duration::ZERO);
        config.status_mode = StatusMode::Strict;
        config
    }

    /// Another handler sharing this fixture's catalog and scratch store
    pub fn sibling(&self) -> Result<PartitionHandler, Box<dyn std::error::Error>> {
        Self::handler_for(self.engine.clone(), self.scratch.clone(), self.temp_dir.path())
    }

    pub fn handler_for(
        engine: Arc<MemoryQueryEngine>,
        scratch: Arc<dyn ScratchStore>,
        cache_dir: &Path,
    ) -> Result<PartitionHandler, Box<dyn std::error::Error>> {
        let identity = AccountIdentity::new(ACCOUNT_ID, REGION)?;
        Ok(PartitionHandler::new(
            Self::config(cache_dir),
            engine,
            identity,
            scratch,
        )?)
    }

    /// Handler over an in-memory scratch store
    pub fn in_memory(
        engine: Arc<MemoryQueryEngine>,
        scratch: MemoryScratch,
    ) -> Result<PartitionHandler, Box<dyn std::error::Error>> {
        Self::handler_for(engine, Arc::new(scratch), Path::new("/tmp"))
    }

    pub fn snapshot(&self) -> Option<Vec<String>> {
        self.scratch
            .read("partitions")
            .expect("scratch read")
            .map(|raw| serde_json::from_slice(&raw).expect("snapshot is a JSON array"))
    }

    pub fn add_statements(&self) -> Vec<String> {
        self.engine
            .submitted_queries()
            .into_iter()
            .filter(|q| q.starts_with("ALTER TABLE"))
            .collect()
    }
}

/// Notification payload for one created object
pub fn event_json(key: &str) -> String {
    serde_json::json!({
        "Records": [{
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": { "name": BUCKET },
                "object": { "key": key, "size": 1024 }
            }
        }]
    })
    .to_string()
}
