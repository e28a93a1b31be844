//! Common test utilities

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use trendlens::config::{EngineConfig, PlatformConfig};
use trendlens::engine::Engine;
use trendlens::keywords::{KeywordIndex, KeywordIndexHandle};
use trendlens::store::{FileCorpusStore, StoredItem};

/// On-disk corpus fixture following the crawler's batch layout
pub struct FixtureCorpus {
    dir: TempDir,
}

impl FixtureCorpus {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create fixture dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write one platform file into a batch directory
    pub fn write_batch(&self, date: &str, time: &str, platform: &str, titles: &[&str]) {
        let dir = self.root().join(date).join(time);
        std::fs::create_dir_all(&dir).expect("create batch dir");
        let items: Vec<StoredItem> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| StoredItem {
                title: title.to_string(),
                rank: i as u32 + 1,
                url: Some(format!("https://example.com/{platform}/{i}")),
            })
            .collect();
        std::fs::write(
            dir.join(format!("{platform}.json")),
            serde_json::to_string(&items).expect("serialize items"),
        )
        .expect("write platform file");
    }

    /// Write raw bytes as a platform file (for corruption scenarios)
    #[allow(dead_code)]
    pub fn write_raw(&self, date: &str, time: &str, platform: &str, content: &str) {
        let dir = self.root().join(date).join(time);
        std::fs::create_dir_all(&dir).expect("create batch dir");
        std::fs::write(dir.join(format!("{platform}.json")), content).expect("write raw file");
    }
}

/// Build an engine over a fixture corpus with the given word-group source
#[allow(dead_code)]
pub fn make_engine(corpus: &FixtureCorpus, word_groups: &str, platforms: &[(&str, &str)]) -> Engine {
    let mut config = EngineConfig::default();
    config.platforms = platforms
        .iter()
        .map(|(id, name)| PlatformConfig {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect();

    let index = KeywordIndex::parse(word_groups).expect("parse word groups");
    let store = Arc::new(FileCorpusStore::new(corpus.root()));
    Engine::new(config, store, KeywordIndexHandle::new(index))
}
