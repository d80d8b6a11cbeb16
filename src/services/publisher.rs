use crate::errors::Result;
use crate::storage::{files, DataStore, GithubStore};
use crate::util;
use log::info;
use std::fs;

/// Pushes the local data pack to the GitHub store so the server can read it.
pub struct PublisherService {
    store: DataStore,
    remote: GithubStore,
}

impl PublisherService {
    pub fn new(store: DataStore, remote: GithubStore) -> Self {
        Self { store, remote }
    }

    /// Uploads every pack file present locally; returns how many were sent.
    pub async fn publish(&self) -> Result<usize> {
        let stamp = util::date_key(util::naive_date_to_int(&util::today_kst()));
        let mut uploaded = 0;

        for file in files::PACK {
            if !self.store.exists(file) {
                info!("{} not present locally, skipped", file);
                continue;
            }
            let content = fs::read(self.store.path(file))?;
            self.remote.put_file(file, &content, &format!("Update {} ({})", file, stamp)).await?;
            uploaded += 1;
        }

        info!("Published {} files", uploaded);
        Ok(uploaded)
    }
}
